// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiled-unit publication and source regeneration.

mod common;

use std::sync::Arc;

use common::*;
use spacey_frontend::ast::*;
use spacey_frontend::codec::SourceEncoder;
use spacey_frontend::ir::FunctionType;
use spacey_frontend::unit::{Bytecode, Instruction, OpCode, Operand};
use spacey_frontend::{CompiledUnit, DecompileFlags, DecompileProperties, Token, decompile};

fn sample() -> Vec<Statement> {
    let inner = Statement::ret(Some(Expression::Function(Box::new(Function::new(
        None,
        &["y"],
        vec![Statement::ret(Some(Expression::ident("y")))],
    )))));
    vec![
        function("outer", &["a", "b"], vec![Statement::var(vec![("c", None)]), inner]),
        call("outer"),
    ]
}

/// Marks each unit's line and records its parameter count as the only instruction.
fn emit(unit: &spacey_frontend::UnitIr) -> Bytecode {
    let mut bytecode = Bytecode::new();
    if let Some(line) = unit.line {
        bytecode.mark_line(line);
    }
    bytecode.emit(Instruction::with_operand(
        OpCode::Op(Token::Return),
        Operand::ArgCount(unit.vars.param_count() as u8),
    ));
    bytecode
}

#[test]
fn test_published_tree_mirrors_ir() {
    let script = compile(sample());
    let root = CompiledUnit::from_script_ir(&script, emit);

    assert!(!root.is_function());
    assert_eq!(root.function_count(), 1);
    assert_eq!(root.encoded_range(), 0..script.encoded_source.len());

    let outer = root.function(0).unwrap();
    assert_eq!(outer.name(), Some("outer"));
    assert_eq!(outer.function_type(), Some(FunctionType::Statement));
    assert_eq!(outer.param_count(), 2);
    assert_eq!(outer.param_and_var_count(), 3);
    assert_eq!(outer.param_or_var_name(0), Some("a"));
    assert_eq!(outer.param_or_var_name(2), Some("c"));
    assert!(outer.needs_activation());

    let anonymous = outer.function(0).unwrap();
    assert_eq!(anonymous.name(), None);
    assert_eq!(anonymous.function_type(), Some(FunctionType::Expression));
    assert!(!anonymous.needs_activation());
    assert_eq!(
        anonymous.bytecode().instructions[0].operand,
        Some(Operand::ArgCount(1))
    );
}

#[test]
fn test_parent_links_are_weak() {
    let script = compile(sample());
    let root = CompiledUnit::from_script_ir(&script, emit);
    let outer = Arc::clone(root.function(0).unwrap());
    let anonymous = Arc::clone(outer.function(0).unwrap());

    assert!(Arc::ptr_eq(&anonymous.parent().unwrap(), &outer));
    assert!(Arc::ptr_eq(&outer.parent().unwrap(), &root));
    assert_eq!(anonymous.source_name(), root.source_name());

    drop(root);
    assert!(outer.parent().is_none());
}

#[test]
fn test_descriptor_read_from_many_threads() {
    let script = compile(sample());
    let root = CompiledUnit::from_script_ir(&script, emit);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let root = Arc::clone(&root);
            std::thread::spawn(move || {
                let outer = root.function(0).unwrap();
                (outer.param_count(), outer.line_numbers().to_vec())
            })
        })
        .collect();
    for handle in handles {
        let (params, lines) = handle.join().unwrap();
        assert_eq!(params, 2);
        assert!(lines.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_decompile_each_unit() {
    let script = compile(sample());
    let root = CompiledUnit::from_script_ir(&script, emit);
    let props = DecompileProperties::new();

    assert_eq!(
        root.decompile(DecompileFlags::empty(), &props).unwrap(),
        "\nfunction outer(a, b) {\n    var c;\n    return function (y) {\n        return y;\n    };\n}\nouter();\n\n"
    );

    let outer = root.function(0).unwrap();
    assert_eq!(
        outer.decompile(DecompileFlags::ONLY_BODY, &props).unwrap(),
        "var c;\nreturn function (y) {\n    return y;\n};\n"
    );

    let anonymous = outer.function(0).unwrap();
    assert_eq!(
        anonymous.decompile(DecompileFlags::TO_SOURCE, &props).unwrap(),
        "(function (y) {return y;})"
    );
}

#[test]
fn test_numbers_read_back_equal() {
    for value in [0.0, 1.0, 65535.0, 65536.0, 4_294_967_296.0, 0.5, 1e21, 3.25e-7] {
        let mut encoder = SourceEncoder::new();
        encoder.add_number(value).unwrap();
        let text = decompile(
            encoder.finish().as_slice(),
            DecompileFlags::TO_SOURCE,
            &DecompileProperties::new(),
        )
        .unwrap();
        assert_eq!(text.parse::<f64>().unwrap(), value, "{text}");
    }
}
