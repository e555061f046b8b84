// Lexer tests

#[cfg(test)]
mod tests {
    use crate::logic_compiler::error::CompilerError;
    use crate::logic_compiler::lexer::{parse_integer, replace_trigraphs, unquote, Lexer, Line, TokenKind};
    use test_log::test;

    fn lex(input: &str) -> Vec<Line> {
        let mut lexer = Lexer::new(input, "test.lgc".into());
        lexer.tokenize().unwrap()
    }

    fn texts(input: &str) -> Vec<Vec<String>> {
        lex(input)
            .into_iter()
            .map(|line| line.tokens.into_iter().map(|t| t.text).collect())
            .collect()
    }

    fn flat(input: &str) -> Vec<String> {
        texts(input).into_iter().flatten().collect()
    }

    #[test]
    fn test_each_trigraph() {
        assert_eq!(replace_trigraphs("??="), "#");
        assert_eq!(replace_trigraphs("??/"), "\\");
        assert_eq!(replace_trigraphs("??'"), "^");
        assert_eq!(replace_trigraphs("??("), "[");
        assert_eq!(replace_trigraphs("??)"), "]");
        assert_eq!(replace_trigraphs("??!"), "|");
        assert_eq!(replace_trigraphs("??<"), "{");
        assert_eq!(replace_trigraphs("??>"), "}");
        assert_eq!(replace_trigraphs("??-"), "~");
        assert_eq!(replace_trigraphs("??x ?? ?"), "??x ?? ?");
    }

    #[test]
    fn test_trigraphs_replaced_inside_string_literals() {
        let tokens = flat("print(\"a??!b\");");
        assert_eq!(tokens[2], "\"a|b\"");
    }

    #[test]
    fn test_trigraph_directive_marker() {
        assert_eq!(flat("??=define X 1"), vec!["#", "define", "X", "1"]);
    }

    #[test]
    fn test_line_splicing() {
        let lines = lex("v1\\\n= 5;\nv2 = 3;");
        assert_eq!(lines.len(), 2);
        let first: Vec<&str> = lines[0].tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(first, vec!["v1", "=", "5", ";"]);
        assert_eq!(lines[0].location.line, 1);
        assert_eq!(lines[1].location.line, 3);
    }

    #[test]
    fn test_line_comment_continues_through_splice() {
        assert_eq!(flat("a // comment \\\nstill comment\nb"), vec!["a", "b"]);
    }

    #[test]
    fn test_block_comment_across_lines() {
        let lines = texts("a /* start\nhidden tokens\nend */ b\nc");
        assert_eq!(lines[0], vec!["a"]);
        assert!(lines[1].is_empty());
        assert_eq!(lines[2], vec!["b"]);
        assert_eq!(lines[3], vec!["c"]);
    }

    #[test]
    fn test_block_comment_opened_by_spliced_slash() {
        assert_eq!(flat("a /\\\n* hidden */ b"), vec!["a", "b"]);
    }

    #[test]
    fn test_stray_comment_end_is_two_tokens() {
        assert_eq!(flat("a */ b"), vec!["a", "*", "/", "b"]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("a /* never\nclosed", "x.lgc".into());
        match lexer.tokenize() {
            Err(CompilerError::UnterminatedComment(loc)) => {
                assert_eq!(loc.line, 1);
                assert_eq!(&*loc.file, "x.lgc");
            }
            other => panic!("expected unterminated comment, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("print(\"oops);", "x.lgc".into());
        assert!(matches!(
            lexer.tokenize(),
            Err(CompilerError::UnterminatedLiteral(_))
        ));
    }

    #[test]
    fn test_multi_character_operators() {
        assert_eq!(
            flat("++ -- << >> <= >= == != && || -> <: :> ::"),
            vec!["++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "->", "<:", ":>", "::"]
        );
    }

    #[test]
    fn test_compound_assignment_is_two_tokens() {
        assert_eq!(flat("v5 += 10;"), vec!["v5", "+", "=", "10", ";"]);
    }

    #[test]
    fn test_token_kinds() {
        let lines = lex("name 42 1.5e+3 \"str\" 'c' ;");
        let kinds: Vec<TokenKind> = lines[0].tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::StringLiteral,
                TokenKind::CharLiteral,
                TokenKind::Punctuation,
            ]
        );
        assert_eq!(lines[0].tokens[2].text, "1.5e+3");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let tokens = flat(r#"print("say \"hi\"");"#);
        assert_eq!(tokens[2], r#""say \"hi\"""#);
        assert_eq!(unquote(&tokens[2]), "say \"hi\"");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""a\nb\tc\\""#), "a\nb\tc\\");
        assert_eq!(unquote("'x'"), "x");
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("0x1F"), Some(31));
        assert_eq!(parse_integer("017"), Some(15));
        assert_eq!(parse_integer("0"), Some(0));
        assert_eq!(parse_integer("1.5"), None);
    }

    #[test]
    fn test_crlf_line_endings() {
        let lines = texts("a\r\nb\r\n");
        assert_eq!(lines[0], vec!["a"]);
        assert_eq!(lines[1], vec!["b"]);
    }
}
