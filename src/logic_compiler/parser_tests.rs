// Parser tests

#[cfg(test)]
mod tests {
    use crate::logic_compiler::ast::{AssignOp, Expr, MathOp, Stmt};
    use crate::logic_compiler::commands::CommandSet;
    use crate::logic_compiler::error::CompilerError;
    use crate::logic_compiler::lexer::Lexer;
    use crate::logic_compiler::parser::Parser;
    use test_log::test;

    fn parse(source: &str) -> Result<Vec<Stmt>, CompilerError> {
        let commands = CommandSet::builtin();
        let tokens = Lexer::new(source, "test.lgc".into())
            .tokenize()?
            .into_iter()
            .flat_map(|line| line.tokens)
            .collect();
        Parser::new(tokens, &commands).parse()
    }

    fn parse_one(source: &str) -> Stmt {
        let mut statements = parse(source).unwrap();
        assert_eq!(statements.len(), 1, "expected one statement in {:?}", source);
        statements.remove(0)
    }

    fn expression(source: &str) -> Expr {
        match parse_one(&format!("if ({}) return;", source)) {
            Stmt::If { cond, .. } => cond,
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_action_call() {
        match parse_one("assignn(v1, 5);") {
            Stmt::Call { name, args, location } => {
                assert_eq!(name, "assignn");
                assert_eq!(args, vec![Expr::Variable(1), Expr::Number(5)]);
                assert_eq!(location.line, 1);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_command_names() {
        match parse_one("set.view(o1, 2);") {
            Stmt::Call { name, .. } => assert_eq!(name, "set.view"),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(parse("frobnicate(v1);"), Err(CompilerError::UnknownCommand(name, _)) if name == "frobnicate"));
        // Tests are not actions
        assert!(matches!(parse("isset(f1);"), Err(CompilerError::UnknownCommand(_, _))));
        assert!(matches!(parse("if (increment(v1)) return;"), Err(CompilerError::UnknownCommand(_, _))));
    }

    #[test]
    fn test_wrong_arity() {
        assert!(matches!(
            parse("assignn(v1);"),
            Err(CompilerError::WrongArity(name, 2, 1, _)) if name == "assignn"
        ));
        assert!(matches!(parse("if (said()) return;"), Err(CompilerError::WrongArity(_, 1, 0, _))));
    }

    #[test]
    fn test_return_forms() {
        assert!(parse_one("return;").is_return());
        assert!(parse_one("return();").is_return());
    }

    #[test]
    fn test_labels_and_goto() {
        let statements = parse("start:\ngoto start;\ngoto(start);\nLabel.two:").unwrap();
        assert!(matches!(&statements[0], Stmt::Label { name, .. } if name == "start"));
        assert!(matches!(&statements[1], Stmt::Goto { label, .. } if label == "start"));
        assert!(matches!(&statements[2], Stmt::Goto { label, .. } if label == "start"));
        assert!(matches!(&statements[3], Stmt::Label { name, .. } if name == "Label.two"));
    }

    #[test]
    fn test_if_else_chain() {
        match parse_one("if (f1) { increment(v1); } else if (f2) decrement(v1); else { }") {
            Stmt::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => {
                assert!(matches!(*then_branch, Stmt::Block(ref inner) if inner.len() == 1));
                assert!(matches!(*else_branch, Stmt::If { else_branch: Some(_), .. }));
            }
            other => panic!("expected if/else, got {:?}", other),
        }
    }

    #[test]
    fn test_loops() {
        assert!(matches!(parse_one("while (f1) increment(v1);"), Stmt::While { .. }));
        assert!(matches!(parse_one("do { increment(v1); } while (v1 < 5);"), Stmt::Do { .. }));
        assert!(matches!(
            parse("do increment(v1); while (f1)"),
            Err(CompilerError::UnexpectedEndOfInput(_, _))
        ));
    }

    #[test]
    fn test_assignment_forms() {
        assert!(matches!(
            parse_one("v1 = v2;"),
            Stmt::Assign { target: Expr::Variable(1), op: AssignOp::Assign, value: Expr::Variable(2), .. }
        ));
        assert!(matches!(parse_one("v1 += 3;"), Stmt::Assign { op: AssignOp::Add, .. }));
        assert!(matches!(parse_one("v1 /= v2;"), Stmt::Assign { op: AssignOp::Divide, .. }));
        assert!(matches!(
            parse_one("*v4 = 1;"),
            Stmt::Assign { target: Expr::VariableValue(4), .. }
        ));
        assert!(matches!(parse_one("f3 = !f3;"), Stmt::Assign { target: Expr::Flag(3), value: Expr::Not(_), .. }));
    }

    #[test]
    fn test_increment_forms() {
        for source in ["v1++;", "++v1;"] {
            assert!(matches!(parse_one(source), Stmt::Call { name, args, .. } if name == "increment" && args == vec![Expr::Variable(1)]));
        }
        for source in ["v1--;", "--v1;"] {
            assert!(matches!(parse_one(source), Stmt::Call { name, .. } if name == "decrement"));
        }
    }

    #[test]
    fn test_invalid_assignment_targets() {
        assert!(matches!(parse("m1 = 3;"), Err(CompilerError::InvalidAssignment(_, _))));
        assert!(matches!(parse("v1 3;"), Err(CompilerError::ExpectedToken(_, _, _))));
    }

    #[test]
    fn test_reference_range_checked() {
        assert!(matches!(parse("v256 = 1;"), Err(CompilerError::ValueOutOfRange(256, _, _))));
        assert!(parse("if (said(w65535)) return;").is_ok());
    }

    #[test]
    fn test_comparison_becomes_test_call() {
        match expression("v1 > 5") {
            Expr::Call { name, args, .. } => {
                assert_eq!(name, "greatern");
                assert_eq!(args, vec![Expr::Variable(1), Expr::Number(5)]);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // && binds tighter than ||
        match expression("f1 || f2 && f3") {
            Expr::Or(operands) => {
                assert_eq!(operands[0], Expr::Flag(1));
                assert!(matches!(&operands[1], Expr::And(inner) if inner.len() == 2));
            }
            other => panic!("expected or, got {:?}", other),
        }

        // Arithmetic binds tighter than comparison, and folds
        match expression("v1 == 2 + 3 * 4") {
            Expr::Call { args, .. } => assert_eq!(args[1], Expr::Number(14)),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_chains_are_flattened() {
        assert!(matches!(expression("f1 && f2 && (f3 && f4)"), Expr::And(operands) if operands.len() == 4));
    }

    #[test]
    fn test_constants_in_expressions() {
        assert_eq!(expression("true"), Expr::Number(1));
        assert_eq!(expression("!false"), Expr::Number(1));
        assert_eq!(expression("3 > 4"), Expr::Number(0));
        assert_eq!(expression("-2 + 5"), Expr::Number(3));
        assert_eq!(expression("'A'"), Expr::Number(65));
        assert_eq!(expression("1 && f2"), Expr::Flag(2));
        assert_eq!(expression("0 && f2"), Expr::Number(0));
        assert_eq!(expression("1 || f2"), Expr::Number(1));
    }

    #[test]
    fn test_ternary_is_kept_for_lowering() {
        match parse_one("v1 = f2 ? 3 : v4;") {
            Stmt::Assign { value: Expr::Conditional { cond, .. }, .. } => assert_eq!(*cond, Expr::Flag(2)),
            other => panic!("expected conditional assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_math_with_references_is_kept() {
        match parse_one("v1 = v1 * 2;") {
            Stmt::Assign { value: Expr::Math { op, .. }, .. } => assert_eq!(op, MathOp::Multiply),
            other => panic!("expected math assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_string_arguments_stay_literal() {
        match parse_one("print(\"Hello\\n\");") {
            Stmt::Call { args, .. } => assert_eq!(args, vec![Expr::Literal("Hello\n".to_string())]),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_input() {
        assert!(matches!(
            parse("if (f1) { increment(v1);"),
            Err(CompilerError::UnexpectedEndOfInput(_, _))
        ));
        assert!(matches!(parse("}"), Err(CompilerError::UnexpectedToken(_, _))));
        assert!(matches!(parse("else return;"), Err(CompilerError::UnexpectedToken(_, _))));
        assert!(matches!(parse("increment(v1"), Err(CompilerError::UnexpectedEndOfInput(_, _))));
    }

    #[test]
    fn test_error_location_is_reported() {
        let error = parse("increment(v1);\n\nfrobnicate();").unwrap_err();
        assert_eq!(error.location().map(|loc| loc.line), Some(3));
    }
}
