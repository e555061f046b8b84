// Directive expression tests

#[cfg(test)]
mod tests {
    use crate::logic_compiler::directive_expr::evaluate;
    use crate::logic_compiler::error::{CompilerError, SourceLocation};
    use crate::logic_compiler::lexer::{Lexer, Token};
    use crate::logic_compiler::preprocessor::MacroTable;
    use test_log::test;

    fn tokens(text: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(text, "expr".into());
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .flat_map(|line| line.tokens)
            .collect()
    }

    fn eval_with(text: &str, macros: &MacroTable) -> Result<i32, CompilerError> {
        evaluate(&tokens(text), macros, &SourceLocation::new("expr".into(), 1))
    }

    fn eval(text: &str) -> i32 {
        eval_with(text, &MacroTable::new()).unwrap()
    }

    fn macros(defs: &[(&str, &str)]) -> MacroTable {
        defs.iter()
            .map(|(name, body)| (name.to_string(), tokens(body)))
            .collect()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3 == 7"), 1);
        assert_eq!(eval("(1 + 2) * 3"), 9);
        assert_eq!(eval("1 << 2 + 1"), 8);
        assert_eq!(eval("6 & 3 | 8"), 10);
        assert_eq!(eval("5 ^ 1 == 1"), 4);
        assert_eq!(eval("10 - 4 - 3"), 3);
        assert_eq!(eval("17 / 5 % 2"), 1);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("3 < 4"), 1);
        assert_eq!(eval("3 <= 3"), 1);
        assert_eq!(eval("3 > 4"), 0);
        assert_eq!(eval("4 >= 5"), 0);
        assert_eq!(eval("4 != 5"), 1);
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval("!0"), 1);
        assert_eq!(eval("!7"), 0);
        assert_eq!(eval("-3 + +5"), 2);
        assert_eq!(eval("~0"), -1);
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("0x10"), 16);
        assert_eq!(eval("010"), 8);
        assert_eq!(eval("'A'"), 65);
        assert_eq!(eval("'\\n'"), 10);
        assert_eq!(eval("5L"), 5);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(eval("2147483647 + 1"), i32::MIN);
        assert_eq!(eval("65536 * 65536"), 0);
    }

    #[test]
    fn test_oversized_literals_wrap() {
        assert_eq!(eval("99999999999999999999"), 1661992959);
        assert_eq!(eval("99999999999999999999 > 0"), 1);
        assert_eq!(eval("0x100000001"), 1);
        assert_eq!(eval("0xFFFFFFFF"), -1);
    }

    #[test]
    fn test_defined() {
        let empty = MacroTable::new();
        let with_foo = macros(&[("FOO", "")]);

        assert_eq!(eval_with("defined(FOO)", &empty).unwrap(), 0);
        assert_eq!(eval_with("defined(FOO)", &with_foo).unwrap(), 1);
        assert_eq!(eval_with("defined FOO", &with_foo).unwrap(), 1);
        assert_eq!(eval_with("!defined(FOO)", &empty).unwrap(), 1);
        assert_eq!(eval_with("!defined(FOO)", &with_foo).unwrap(), 0);
    }

    #[test]
    fn test_defined_does_not_expand_its_operand() {
        let table = macros(&[("A", "B")]);
        assert_eq!(eval_with("defined(A)", &table).unwrap(), 1);
        assert_eq!(eval_with("defined(B)", &table).unwrap(), 0);
    }

    #[test]
    fn test_macro_expansion() {
        let table = macros(&[("VERSION", "3"), ("NEXT", "VERSION + 1"), ("PLUS", "+")]);
        assert_eq!(eval_with("NEXT == 4", &table).unwrap(), 1);
        assert_eq!(eval_with("VERSION PLUS 2", &table).unwrap(), 5);
    }

    #[test]
    fn test_unknown_identifier_is_zero() {
        assert_eq!(eval("UNKNOWN"), 0);
        assert_eq!(eval("UNKNOWN + 2"), 2);
    }

    #[test]
    fn test_self_referential_macro_terminates() {
        let table = macros(&[("LOOP", "LOOP + 1")]);
        assert_eq!(eval_with("LOOP", &table).unwrap(), 1);
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(eval("0 && 1 / 0"), 0);
        assert_eq!(eval("1 || 1 / 0"), 1);
        assert!(eval_with("1 && 1 / 0", &MacroTable::new()).is_err());
    }

    #[test]
    fn test_errors() {
        let empty = MacroTable::new();
        for bad in ["", "1 +", "(1", "1 2", "defined(", "defined(X", "defined 3", "\"s\""] {
            assert!(
                matches!(eval_with(bad, &empty), Err(CompilerError::ExpressionError(_, _))),
                "expected error for {:?}",
                bad
            );
        }
    }
}
