// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the IR builder.

use super::*;
use crate::diagnostics::DiagnosticCollector;
use crate::env::LanguageVersion;
use crate::ir::{IncDecFlags, SpecialCall};

fn tokens(builder: &IrBuilder<'_>, id: NodeId) -> Vec<Token> {
    builder
        .tree()
        .children(id)
        .iter()
        .map(|&c| builder.tree().token(c))
        .collect()
}

fn call_stmt(builder: &mut IrBuilder<'_>, name: &str) -> NodeId {
    let callee = builder.create_name(name);
    let call = builder.create_call_or_new(Token::Call, callee, &[]);
    builder.create_expr_statement_no_return(call, None)
}

#[test]
fn test_switch_layout() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let x = b.create_name("x");
    let switch_block = b.create_switch(x, Some(1));
    for value in [1.0, 2.0] {
        let case = b.create_number(value);
        let body = b.create_block(&[], None);
        b.add_switch_case(switch_block, Some(case), body).unwrap();
    }
    let body = b.create_block(&[], None);
    b.add_switch_case(switch_block, None, body).unwrap();
    b.close_switch(switch_block).unwrap();

    assert_eq!(
        tokens(&b, switch_block),
        vec![
            Token::Switch,
            Token::Goto,
            Token::Target,
            Token::Block,
            Token::Target,
            Token::Block,
            Token::Target,
            Token::Block,
            Token::Target,
        ]
    );
    let switch = b.switch_node(switch_block).unwrap();
    let jump = b.tree().jump_of(switch).unwrap().clone();
    let children = b.tree().children(switch_block).to_vec();
    assert_eq!(jump.target, Some(children[8]));
    assert_eq!(jump.default_target, Some(children[6]));
    let goto = b.tree().jump_of(children[1]).unwrap();
    assert_eq!(goto.target, Some(children[6]));
    assert!(b.tree().validate_jump_targets(switch_block).is_ok());
}

#[test]
fn test_switch_without_default_jumps_to_break() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let x = b.create_name("x");
    let switch_block = b.create_switch(x, None);
    let case = b.create_number(1.0);
    let body = b.create_block(&[], None);
    b.add_switch_case(switch_block, Some(case), body).unwrap();
    b.close_switch(switch_block).unwrap();

    let children = b.tree().children(switch_block).to_vec();
    let goto = b.tree().jump_of(children[1]).unwrap();
    assert_eq!(goto.target, children.last().copied());
}

#[test]
fn test_close_switch_rejects_other_blocks() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let block = b.create_block(&[], None);
    assert!(b.close_switch(block).is_err());
    let lp = b.create_loop_node(None);
    assert!(matches!(
        b.close_switch(lp),
        Err(InternalError::UnexpectedNode { expected: Token::Block, found: Token::Loop })
    ));
}

#[test]
fn test_while_loop_layout() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let lp = b.create_loop_node(Some(3));
    let cond = b.create_name("c");
    let body = b.create_block(&[], None);
    b.create_while(lp, cond, body).unwrap();

    assert_eq!(
        tokens(&b, lp),
        vec![
            Token::Goto,
            Token::Target,
            Token::Block,
            Token::Empty,
            Token::Target,
            Token::IfEq,
            Token::Target,
        ]
    );
    let children = b.tree().children(lp).to_vec();
    let jump = b.tree().jump_of(lp).unwrap();
    assert_eq!(jump.target, Some(children[6]));
    assert_eq!(jump.continue_target, Some(children[4]));
    assert_eq!(b.tree().jump_of(children[5]).unwrap().target, Some(children[1]));
}

#[test]
fn test_do_while_has_no_leading_goto() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let lp = b.create_loop_node(None);
    let body = b.create_block(&[], None);
    let cond = b.create_name("c");
    b.create_do_while(lp, body, cond).unwrap();
    assert_eq!(
        tokens(&b, lp),
        vec![Token::Target, Token::Block, Token::Target, Token::IfEq, Token::Target]
    );
}

#[test]
fn test_for_loop_continues_at_increment() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let lp = b.create_loop_node(None);
    let init = b.create_name("i");
    let incr = b.create_name("j");
    let body = b.create_block(&[], None);
    b.create_for(lp, Some(init), None, Some(incr), body).unwrap();

    assert_eq!(
        tokens(&b, lp),
        vec![
            Token::ExprVoid,
            Token::Goto,
            Token::Target,
            Token::Block,
            Token::Target,
            Token::ExprVoid,
            Token::Empty,
            Token::Target,
            Token::IfEq,
            Token::Target,
        ]
    );
    let children = b.tree().children(lp).to_vec();
    assert_eq!(b.tree().jump_of(lp).unwrap().continue_target, Some(children[4]));
    // a missing condition is always true
    let cond = b.tree().first_child(children[8]).unwrap();
    assert_eq!(b.tree().token(cond), Token::True);
}

#[test]
fn test_for_in_uses_shared_local_block() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let lp = b.create_loop_node(None);
    let lhs = b.create_var(&[("k".to_string(), None)], None);
    let obj = b.create_name("o");
    let body = b.create_block(&[], None);
    let result = b
        .create_for_in(lp, lhs, obj, body, false, None, &mut reporter)
        .unwrap();

    assert_eq!(b.tree().token(result), Token::LocalBlock);
    assert_eq!(b.tree().children(result), &[lp]);
    let children = b.tree().children(lp).to_vec();
    assert_eq!(b.tree().token(children[0]), Token::Var);
    assert_eq!(b.tree().token(children[1]), Token::EnumInitKeys);
    assert_eq!(
        b.tree().get(children[1]).props().local_block,
        Some(result)
    );
    assert_eq!(reporter.error_count(), 0);
}

#[test]
fn test_for_in_reports_bad_lhs() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let lp = b.create_loop_node(None);
    let lhs = b.create_number(1.0);
    let obj = b.create_name("o");
    let body = b.create_block(&[], None);
    let result = b
        .create_for_in(lp, lhs, obj, body, true, Some(4), &mut reporter)
        .unwrap();
    assert_eq!(result, obj);
    assert!(reporter.has_error(MessageId::BadForInLhs));
}

#[test]
fn test_for_in_reports_multiple_declarators() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let lp = b.create_loop_node(None);
    let lhs = b.create_var(&[("a".to_string(), None), ("b".to_string(), None)], None);
    let obj = b.create_name("o");
    let body = b.create_block(&[], None);
    b.create_for_in(lp, lhs, obj, body, false, None, &mut reporter)
        .unwrap();
    assert!(reporter.has_error(MessageId::MultipleForInIndex));
}

#[test]
fn test_empty_try_short_circuits() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let try_block = b.create_block(&[], None);
    let body = b.create_block(&[], None);
    let handlers = vec![CatchHandler {
        name: "e".into(),
        guard: None,
        body,
        line: None,
    }];
    let result = b
        .create_try_catch_finally(try_block, handlers, None, None, &mut reporter)
        .unwrap();
    assert_eq!(result, try_block);
}

#[test]
fn test_guarded_catch_rethrows() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, true);
    let mut reporter = DiagnosticCollector::new();
    let stmt = call_stmt(&mut b, "f");
    let try_block = b.create_block(&[stmt], None);
    let guard = b.create_name("g");
    let body = b.create_block(&[], None);
    let handlers = vec![CatchHandler {
        name: "e".into(),
        guard: Some(guard),
        body,
        line: None,
    }];
    let result = b
        .create_try_catch_finally(try_block, handlers, None, None, &mut reporter)
        .unwrap();

    let try_node = b.tree().first_child(result).unwrap();
    assert_eq!(
        tokens(&b, try_node),
        vec![
            Token::Block,
            Token::Goto,
            Token::Target,
            Token::LocalBlock,
            Token::Rethrow,
            Token::Target,
        ]
    );
    assert!(b.requires_activation());
    assert!(b.tree().validate_jump_targets(result).is_ok());
}

#[test]
fn test_try_finally_layout() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let a = call_stmt(&mut b, "a");
    let try_block = b.create_block(&[a], None);
    let f = call_stmt(&mut b, "f");
    let finally_block = b.create_block(&[f], None);
    let result = b
        .create_try_catch_finally(try_block, Vec::new(), Some(finally_block), None, &mut reporter)
        .unwrap();

    let try_node = b.tree().first_child(result).unwrap();
    assert_eq!(
        tokens(&b, try_node),
        vec![
            Token::Block,
            Token::Jsr,
            Token::Goto,
            Token::Target,
            Token::Finally,
            Token::Target,
        ]
    );
    let children = b.tree().children(try_node).to_vec();
    assert_eq!(
        b.tree().jump_of(try_node).unwrap().finally_target,
        Some(children[3])
    );
}

#[test]
fn test_unconditional_catch_not_last_is_reported() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let stmt = call_stmt(&mut b, "f");
    let try_block = b.create_block(&[stmt], None);
    let first = b.create_block(&[], None);
    let second = b.create_block(&[], None);
    let guard = b.create_name("g");
    let handlers = vec![
        CatchHandler {
            name: "e".into(),
            guard: None,
            body: first,
            line: Some(2),
        },
        CatchHandler {
            name: "e".into(),
            guard: Some(guard),
            body: second,
            line: Some(3),
        },
    ];
    b.create_try_catch_finally(try_block, handlers, None, None, &mut reporter)
        .unwrap();
    assert!(reporter.has_error(MessageId::CatchUnreachable));
    assert_eq!(reporter.errors()[0].line, Some(2));
}

#[test]
fn test_with_requires_activation_only_in_functions() {
    let env = CompilerEnv::default();
    let mut script = IrBuilder::new(&env, false);
    let obj = script.create_name("o");
    let body = script.create_block(&[], None);
    let with = script.create_with(obj, body, None);
    assert_eq!(
        tokens(&script, with),
        vec![Token::EnterWith, Token::With, Token::LeaveWith]
    );
    assert!(!script.requires_activation());

    let mut function = IrBuilder::new(&env, true);
    let obj = function.create_name("o");
    let body = function.create_block(&[], None);
    function.create_with(obj, body, None);
    assert!(function.requires_activation());
}

#[test]
fn test_if_with_literal_condition_picks_branch() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let cond = b.create_leaf(Token::False);
    let yes = b.create_block(&[], None);
    let no = b.create_block(&[], None);
    assert_eq!(b.create_if(cond, yes, Some(no), None), no);

    let cond = b.create_number(1.0);
    assert_eq!(b.create_if(cond, yes, None, None), yes);

    let cond = b.create_name("c");
    let result = b.create_if(cond, yes, Some(no), None);
    assert_eq!(
        tokens(&b, result),
        vec![
            Token::IfNe,
            Token::Block,
            Token::Goto,
            Token::Target,
            Token::Block,
            Token::Target,
        ]
    );
}

#[test]
fn test_string_concatenation_folds() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let a = b.create_string("a");
    let one = b.create_number(1.0);
    let folded = b.create_binary(Token::Add, a, one);
    assert_eq!(b.tree().token(folded), Token::String);
    assert_eq!(b.tree().get(folded).string(), Some("a1"));

    let half = b.create_number(0.5);
    let s = b.create_string("x");
    let folded = b.create_binary(Token::Add, half, s);
    assert_eq!(b.tree().get(folded).string(), Some("0.5x"));
}

#[test]
fn test_arithmetic_identities_keep_coercion() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let zero = b.create_number(0.0);
    let x = b.create_name("x");
    let neg = b.create_binary(Token::Sub, zero, x);
    assert_eq!(b.tree().token(neg), Token::Neg);
    assert_eq!(b.tree().children(neg), &[x]);

    let y = b.create_name("y");
    let one = b.create_number(1.0);
    let pos = b.create_binary(Token::Mul, y, one);
    assert_eq!(b.tree().token(pos), Token::Pos);

    let z = b.create_name("z");
    let zero = b.create_number(0.0);
    let kept = b.create_binary(Token::Mul, z, zero);
    assert_eq!(b.tree().token(kept), Token::Mul);

    let six = {
        let two = b.create_number(2.0);
        let three = b.create_number(3.0);
        b.create_binary(Token::Mul, two, three)
    };
    assert_eq!(b.tree().get(six).number(), Some(6.0));
}

#[test]
fn test_logical_folding_keeps_unknown_operand() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let t = b.create_leaf(Token::True);
    let x = b.create_name("x");
    assert_eq!(b.create_binary(Token::And, t, x), x);

    let f = b.create_leaf(Token::False);
    let y = b.create_name("y");
    assert_eq!(b.create_binary(Token::And, f, y), f);

    let x = b.create_name("x");
    let t = b.create_leaf(Token::True);
    let kept = b.create_binary(Token::Or, x, t);
    assert_eq!(b.tree().token(kept), Token::Or);
}

#[test]
fn test_unary_rewrites() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let x = b.create_name("x");
    let typeof_x = b.create_unary(Token::TypeOf, x).unwrap();
    assert_eq!(b.tree().token(typeof_x), Token::TypeOfName);

    let five = b.create_number(5.0);
    let not_five = b.create_unary(Token::BitNot, five).unwrap();
    assert_eq!(b.tree().get(not_five).number(), Some(-6.0));

    let zero = b.create_number(0.0);
    let not_zero = b.create_unary(Token::Not, zero).unwrap();
    assert_eq!(b.tree().token(not_zero), Token::True);

    let y = b.create_name("y");
    let del = b.create_unary(Token::DelProp, y).unwrap();
    assert_eq!(tokens(&b, del), vec![Token::BindName, Token::String]);

    let f = b.create_name("f");
    let call = b.create_call_or_new(Token::Call, f, &[]);
    let del = b.create_unary(Token::DelProp, call).unwrap();
    assert_eq!(tokens(&b, del), vec![Token::Call, Token::True]);
}

#[test]
fn test_assignment_forms() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();

    let x = b.create_name("x");
    let one = b.create_number(1.0);
    let set = b
        .create_assignment(Token::AssignAdd, x, one, None, &mut reporter)
        .unwrap();
    assert_eq!(b.tree().token(set), Token::SetName);
    assert_eq!(tokens(&b, set), vec![Token::BindName, Token::Add]);

    let o = b.create_name("o");
    let get = b.create_property_get(o, "p");
    let two = b.create_number(2.0);
    let set = b
        .create_assignment(Token::AssignMul, get, two, None, &mut reporter)
        .unwrap();
    assert_eq!(b.tree().token(set), Token::SetPropOp);
    let op = b.tree().last_child(set).unwrap();
    assert_eq!(tokens(&b, op), vec![Token::UseStack, Token::Number]);

    let f = b.create_name("f");
    let call = b.create_call_or_new(Token::Call, f, &[]);
    let three = b.create_number(3.0);
    let set = b
        .create_assignment(Token::Assign, call, three, None, &mut reporter)
        .unwrap();
    assert_eq!(b.tree().token(set), Token::SetRef);
    assert_eq!(tokens(&b, set), vec![Token::RefCall, Token::Number]);
    assert_eq!(reporter.error_count(), 0);
}

#[test]
fn test_bad_assignment_target_reports() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let left = b.create_number(1.0);
    let right = b.create_name("x");
    let result = b
        .create_assignment(Token::Assign, left, right, Some(9), &mut reporter)
        .unwrap();
    assert_eq!(result, right);
    assert!(reporter.has_error(MessageId::BadAssignLeft));
}

#[test]
fn test_inc_dec_flags_and_errors() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let mut reporter = DiagnosticCollector::new();
    let x = b.create_name("x");
    let dec = b
        .create_inc_dec(Token::Dec, true, x, None, &mut reporter)
        .unwrap();
    assert_eq!(
        b.tree().get(dec).props().incr_decr,
        Some(IncDecFlags::DECREMENT | IncDecFlags::POST)
    );

    let s = b.create_string("s");
    b.create_inc_dec(Token::Inc, false, s, None, &mut reporter)
        .unwrap();
    assert!(reporter.has_error(MessageId::BadIncrement));
}

#[test]
fn test_activation_triggers() {
    let env = CompilerEnv::builder()
        .language_version(LanguageVersion::V1_2)
        .activation_name("trace")
        .build()
        .unwrap();

    let mut b = IrBuilder::new(&env, true);
    b.create_name("x");
    let o = b.create_name("o");
    b.create_property_get(o, "size");
    assert!(!b.requires_activation());
    b.create_name("arguments");
    assert!(b.requires_activation());

    let mut b = IrBuilder::new(&env, true);
    b.create_name("trace");
    assert!(b.requires_activation());

    let mut b = IrBuilder::new(&env, true);
    let o = b.create_name("o");
    b.create_property_get(o, "length");
    assert!(b.requires_activation());

    let mut b = IrBuilder::new(&env, true);
    let eval = b.create_name("eval");
    let call = b.create_call_or_new(Token::Call, eval, &[]);
    assert_eq!(b.tree().get(call).props().special_call, Some(SpecialCall::Eval));
    assert!(b.requires_activation());
}

#[test]
fn test_special_property_uses_reference() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let o = b.create_name("o");
    let get = b.create_property_get(o, "__proto__");
    assert_eq!(b.tree().token(get), Token::GetRef);
    let reference = b.tree().first_child(get).unwrap();
    assert_eq!(
        b.tree().get(reference).props().special_name.as_deref(),
        Some("__proto__")
    );
}

#[test]
fn test_array_literal_records_holes() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, false);
    let one = b.create_number(1.0);
    let two = b.create_number(2.0);
    let array = b.create_array_literal(&[Some(one), None, Some(two)]);
    assert_eq!(b.tree().children(array), &[one, two]);
    assert_eq!(b.tree().get(array).props().skip_indexes, Some(vec![1]));
}

#[test]
fn test_finish_function_binds_name_and_returns() {
    let env = CompilerEnv::default();
    let mut b = IrBuilder::new(&env, true);
    let stmt = call_stmt(&mut b, "g");
    let body = b.create_block(&[stmt], None);
    let unit = b
        .finish_function(Some("f".into()), FunctionType::Expression, body, Some(1))
        .unwrap();

    let children = unit.tree.children(unit.root).to_vec();
    assert_eq!(unit.tree.token(children[0]), Token::ExprVoid);
    assert_eq!(unit.tree.token(*children.last().unwrap()), Token::Return);
    assert!(unit.vars.has("f"));
    assert!(!unit.needs_activation);
}

#[test]
fn test_nested_functions_force_activation() {
    let env = CompilerEnv::default();
    let mut inner = IrBuilder::new(&env, true);
    let body = inner.create_block(&[], None);
    let inner = inner
        .finish_function(Some("g".into()), FunctionType::ExpressionStatement, body, None)
        .unwrap();

    let mut outer = IrBuilder::new(&env, true);
    outer.declare_var("g");
    let node = outer.add_function(inner);
    assert_eq!(outer.tree().get(node).props().function_index, Some(0));
    let statement = outer.create_expr_statement_no_return(node, None);
    let body = outer.create_block(&[statement], None);
    let unit = outer
        .finish_function(Some("f".into()), FunctionType::Statement, body, None)
        .unwrap();
    assert!(unit.needs_activation);
    assert!(!unit.vars.has("g"));
}
