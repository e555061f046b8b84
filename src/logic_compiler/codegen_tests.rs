// Code Generation Tests for logic bytecode

#[cfg(test)]
mod tests {
    use crate::logic_compiler::ast::{Expr, Stmt};
    use crate::logic_compiler::codegen::LogicCodeGen;
    use crate::logic_compiler::codegen_references::patch_offset;
    use crate::logic_compiler::commands::CommandSet;
    use crate::logic_compiler::error::{CompilerError, SourceLocation};
    use crate::logic_compiler::lowering::Lowering;
    use crate::logic_compiler::parser::Parser;
    use crate::logic_compiler::preprocessor::{MacroTable, Preprocessor};
    use crate::logic_compiler::source::MemoryLoader;
    use crate::logic_compiler::symbols::SymbolTables;
    use std::path::Path;
    use test_log::test;

    fn here() -> SourceLocation {
        SourceLocation::new("test.lgc".into(), 1)
    }

    fn lowered(source: &str) -> Vec<Stmt> {
        let commands = CommandSet::builtin();
        let loader = MemoryLoader::new();
        let mut preprocessor = Preprocessor::new(&loader, MacroTable::new(), SymbolTables::default());
        let tokens = preprocessor
            .process_source(source, Path::new("test.lgc"))
            .unwrap();
        let (_, mut symbols) = preprocessor.into_parts();
        let statements = Parser::new(tokens, &commands).parse().unwrap();
        Lowering::new(&commands, &mut symbols)
            .lower_program(statements)
            .unwrap()
    }

    fn compile(source: &str) -> Result<Vec<u8>, CompilerError> {
        let commands = CommandSet::builtin();
        LogicCodeGen::new(&commands).generate(&lowered(source))
    }

    #[test]
    fn test_if_with_comparison() {
        let code = compile("if (v1 > 5) { increment(v1); }").unwrap();
        assert_eq!(code, vec![0xFF, 0x05, 0x01, 0x05, 0xFF, 0x02, 0x00, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_if_else() {
        let code = compile("if (f1) increment(v1); else decrement(v1);").unwrap();
        assert_eq!(
            code,
            vec![
                0xFF, 0x07, 0x01, 0xFF, 0x05, 0x00, // if (isset(f1)), skip 5 when false
                0x01, 0x01, // increment(v1)
                0xFE, 0x02, 0x00, // jump over else
                0x02, 0x01, // decrement(v1)
                0x00,
            ]
        );
    }

    #[test]
    fn test_while_loop() {
        let code = compile("while (f1) increment(v1);").unwrap();
        assert_eq!(
            code,
            vec![0xFF, 0x07, 0x01, 0xFF, 0x05, 0x00, 0x01, 0x01, 0xFE, 0xF5, 0xFF, 0x00]
        );
    }

    #[test]
    fn test_endless_while_loop() {
        let code = compile("while (1) increment(v1);").unwrap();
        assert_eq!(code, vec![0x01, 0x01, 0xFE, 0xFB, 0xFF, 0x00]);
    }

    #[test]
    fn test_do_while_loop() {
        let code = compile("do increment(v1); while (f1);").unwrap();
        assert_eq!(
            code,
            vec![0x01, 0x01, 0xFF, 0x07, 0x01, 0xFF, 0x03, 0x00, 0xFE, 0xF5, 0xFF, 0x00]
        );
    }

    #[test]
    fn test_or_group_is_delimited() {
        let code = compile("if (f1 || f2) return;").unwrap();
        assert_eq!(
            code,
            vec![0xFF, 0xFC, 0x07, 0x01, 0x07, 0x02, 0xFC, 0xFF, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_not_prefix() {
        let code = compile("if (!f1) return;").unwrap();
        assert_eq!(code, vec![0xFF, 0xFD, 0x07, 0x01, 0xFF, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_nested_groups() {
        let code = compile("if (f1 && (f2 || f3) && f4) return;").unwrap();
        assert_eq!(
            code,
            vec![
                0xFF, 0x07, 0x01, 0xFC, 0x07, 0x02, 0x07, 0x03, 0xFC, 0x07, 0x04, 0xFF, 0x01, 0x00,
                0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_same_kind_group_is_not_rewrapped() {
        let commands = CommandSet::builtin();
        let isset = |n| Expr::Call {
            name: "isset".to_string(),
            args: vec![Expr::Flag(n)],
            location: here(),
        };
        // An And nested directly in an And (built by hand, not flattened)
        let program = vec![Stmt::If {
            cond: Expr::And(vec![isset(1), Expr::And(vec![isset(2), isset(3)])]),
            then_branch: Box::new(Stmt::call("return", vec![], &here())),
            else_branch: None,
            location: here(),
        }];
        let code = LogicCodeGen::new(&commands).generate(&program).unwrap();
        assert_eq!(
            code,
            vec![0xFF, 0x07, 0x01, 0x07, 0x02, 0x07, 0x03, 0xFF, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_said_emits_count_and_word_operands() {
        let code = compile("if (said(w1, w300)) return;").unwrap();
        assert_eq!(
            code,
            vec![0xFF, 0x0E, 0x02, 0x01, 0x00, 0x2C, 0x01, 0xFF, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_ternary_argument() {
        let code = compile("print(f1 ? \"a\" : \"b\");").unwrap();
        assert_eq!(
            code,
            vec![
                0xFF, 0x07, 0x01, 0xFF, 0x05, 0x00, 0x65, 0x01, 0xFE, 0x02, 0x00, 0x65, 0x02, 0x00,
            ]
        );
    }

    #[test]
    fn test_assignment_opcodes() {
        assert_eq!(compile("v5 = v3;").unwrap(), vec![0x04, 0x05, 0x03, 0x00]);
        assert_eq!(compile("v5 += 10;").unwrap(), vec![0x05, 0x05, 0x0A, 0x00]);
        assert_eq!(compile("*v1 = v2;").unwrap(), vec![0x09, 0x01, 0x02, 0x00]);
        assert_eq!(compile("*v1 = 7;").unwrap(), vec![0x0B, 0x01, 0x07, 0x00]);
    }

    #[test]
    fn test_forward_goto() {
        let code = compile("goto done; increment(v1); done: return;").unwrap();
        assert_eq!(code, vec![0xFE, 0x02, 0x00, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_backward_goto() {
        let code = compile("top: increment(v1); goto(top);").unwrap();
        assert_eq!(code, vec![0x01, 0x01, 0xFE, 0xFB, 0xFF, 0x00]);
    }

    #[test]
    fn test_goto_into_constant_false_branch() {
        let code = compile("goto skip; if (0) { skip: increment(v1); } return;").unwrap();
        assert_eq!(code, vec![0xFE, 0x03, 0x00, 0xFE, 0x02, 0x00, 0x01, 0x01, 0x00]);

        let code = compile("while (0) { top: increment(v1); } goto top;").unwrap();
        assert_eq!(code, vec![0xFE, 0x02, 0x00, 0x01, 0x01, 0xFE, 0xFB, 0xFF, 0x00]);
    }

    #[test]
    fn test_goto_into_untaken_else() {
        // increment; jump over else; [here: decrement]; return
        let code = compile("if (1) increment(v1); else { here: decrement(v1); } goto here;").unwrap();
        assert_eq!(
            code,
            vec![0x01, 0x01, 0xFE, 0x02, 0x00, 0x02, 0x01, 0xFE, 0xFB, 0xFF, 0x00]
        );
    }

    #[test]
    fn test_patch_offset_bounds() {
        let mut code = vec![0xFE, 0x00, 0x00, 0x00];
        patch_offset(&mut code, 1, -5).unwrap();
        assert_eq!(code, vec![0xFE, 0xFB, 0xFF, 0x00]);

        match patch_offset(&mut code, 3, 1) {
            Err(CompilerError::CodeGenError(message)) => assert!(message.contains("4-byte")),
            other => panic!("expected code generation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_labels_are_aggregated() {
        match compile("goto a; goto b; goto a;") {
            Err(CompilerError::UnresolvedLabels(names)) => {
                assert_eq!(names, vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("expected unresolved labels, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_label() {
        let error = compile("here: increment(v1);\nhere: return;").unwrap_err();
        match error {
            CompilerError::DuplicateLabel(name, location) => {
                assert_eq!(name, "here");
                assert_eq!(location.line, 2);
            }
            other => panic!("expected duplicate label, got {:?}", other),
        }
    }

    #[test]
    fn test_jump_out_of_range() {
        let commands = CommandSet::builtin();
        let increment = Stmt::call("increment", vec![Expr::Variable(1)], &here());
        let program = vec![
            Stmt::Goto {
                label: "far".to_string(),
                location: here(),
            },
            Stmt::Block(vec![increment; 17000]),
            Stmt::Label {
                name: "far".to_string(),
                location: here(),
            },
        ];
        assert!(matches!(
            LogicCodeGen::new(&commands).generate(&program),
            Err(CompilerError::JumpOutOfRange(_))
        ));
    }

    #[test]
    fn test_unlowered_input_is_rejected() {
        let commands = CommandSet::builtin();
        let program = vec![Stmt::If {
            cond: Expr::Flag(1),
            then_branch: Box::new(Stmt::Empty),
            else_branch: None,
            location: here(),
        }];
        assert!(matches!(
            LogicCodeGen::new(&commands).generate(&program),
            Err(CompilerError::CodeGenError(_))
        ));

        let program = vec![Stmt::call("increment", vec![Expr::Flag(1)], &here())];
        assert!(matches!(
            LogicCodeGen::new(&commands).generate(&program),
            Err(CompilerError::TypeMismatch(_, _, _))
        ));
    }

    #[test]
    fn test_generator_is_reusable() {
        let commands = CommandSet::builtin();
        let program = lowered("goto end; increment(v1); end: return;");
        let mut codegen = LogicCodeGen::new(&commands);
        let first = codegen.generate(&program).unwrap();
        let second = codegen.generate(&program).unwrap();
        assert_eq!(first, second);
    }
}
