// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution order of normalized control flow.

mod common;

use common::*;
use spacey_frontend::Token;
use spacey_frontend::ast::*;

fn switch(cases: Vec<(Option<f64>, Vec<Statement>)>) -> Statement {
    Statement::new(StatementKind::Switch(SwitchStatement {
        discriminant: Expression::ident("x"),
        cases: cases
            .into_iter()
            .map(|(test, consequent)| SwitchCase {
                test: test.map(Expression::number),
                consequent,
            })
            .collect(),
    }))
}

fn fallthrough() -> Statement {
    switch(vec![
        (Some(1.0), vec![call("a")]),
        (Some(2.0), vec![call("b")]),
        (None, vec![call("c")]),
    ])
}

#[test]
fn test_switch_falls_through_in_source_order() {
    let script = compile(vec![fallthrough(), call("after")]);
    assert_eq!(trace(&script.unit, Some(0)), vec!["a", "b", "c", "after", "end"]);
    assert_eq!(trace(&script.unit, Some(1)), vec!["b", "c", "after", "end"]);
}

#[test]
fn test_switch_without_match_runs_default() {
    let script = compile(vec![fallthrough(), call("after")]);
    assert_eq!(trace(&script.unit, None), vec!["c", "after", "end"]);
}

#[test]
fn test_switch_without_default_skips_to_end() {
    let script = compile(vec![
        switch(vec![
            (Some(1.0), vec![call("a"), Statement::new(StatementKind::Break(None))]),
            (Some(2.0), vec![call("b")]),
        ]),
        call("after"),
    ]);
    assert_eq!(trace(&script.unit, None), vec!["after", "end"]);
    assert_eq!(trace(&script.unit, Some(0)), vec!["a", "after", "end"]);
}

#[test]
fn test_finally_runs_once_after_block() {
    let script = compile(vec![
        try_finally(vec![call("a"), call("b")], vec![call("f")]),
        call("after"),
    ]);
    assert_eq!(trace(&script.unit, None), vec!["a", "b", "f", "after", "end"]);
}

#[test]
fn test_finally_runs_once_when_block_throws() {
    let script = compile(vec![
        try_finally(vec![call("a"), call("boom"), call("b")], vec![call("f")]),
        call("after"),
    ]);
    assert_eq!(trace(&script.unit, None), vec!["a", "boom", "f", "throw"]);
}

#[test]
fn test_return_evaluated_before_finally() {
    let body = vec![try_finally(
        vec![Statement::ret(Some(Expression::call(Expression::ident("value"), vec![])))],
        vec![call("f")],
    )];
    let script = compile(vec![function("g", &[], body)]);
    let g = script.unit.function(0).unwrap();
    assert_eq!(trace(g, None), vec!["value", "f", "return"]);
}

#[test]
fn test_return_runs_nested_finallies_innermost_first() {
    let inner = try_finally(
        vec![Statement::ret(Some(Expression::call(Expression::ident("value"), vec![])))],
        vec![call("inner")],
    );
    let outer = try_finally(vec![inner], vec![call("outer")]);
    let script = compile(vec![function("g", &[], vec![outer])]);
    let g = script.unit.function(0).unwrap();

    assert_eq!(trace(g, None), vec!["value", "inner", "outer", "return"]);
    assert_eq!(nodes_with(g, Token::ReturnResult).len(), 1);
}

#[test]
fn test_break_runs_finally_then_leaves_loop() {
    let body = try_finally(
        vec![call("a"), Statement::new(StatementKind::Break(None)), call("skipped")],
        vec![call("f")],
    );
    let script = compile(vec![forever(vec![body]), call("after")]);
    assert_eq!(trace(&script.unit, None), vec!["a", "f", "after", "end"]);
    assert_eq!(nodes_with(&script.unit, Token::Break).len(), 0);
}

#[test]
fn test_throw_through_nested_finallies() {
    let inner = try_finally(vec![call("boom")], vec![call("inner")]);
    let outer = try_finally(vec![inner], vec![call("outer")]);
    let script = compile(vec![outer]);
    assert_eq!(
        trace(&script.unit, None),
        vec!["boom", "inner", "outer", "throw"]
    );
}
