// Logic Source Lexer
// Splits source text into per-line token sequences

use crate::logic_compiler::error::{CompilerError, SourceLocation};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLiteral, // "..."
    CharLiteral,   // '...'
    Punctuation,
}

/// A token is its source text plus where it came from. Classification is
/// coarse; the preprocessor and parser look at `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Token {
            kind,
            text: text.into(),
            location,
        }
    }

    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::StringLiteral && self.kind != TokenKind::CharLiteral && self.text == text
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_string(&self) -> bool {
        self.kind == TokenKind::StringLiteral
    }
}

/// One logical source line. Lines stay separate until preprocessing is done
/// because directives are line-oriented.
#[derive(Debug, Clone)]
pub struct Line {
    pub location: SourceLocation,
    pub tokens: Vec<Token>,
    pub include_depth: usize,
}

const TRIGRAPHS: [(char, char); 9] = [
    ('=', '#'),
    ('/', '\\'),
    ('\'', '^'),
    ('(', '['),
    (')', ']'),
    ('!', '|'),
    ('<', '{'),
    ('>', '}'),
    ('-', '~'),
];

// Longest first so "<<" wins over "<"
const OPERATORS: [&str; 14] = [
    "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "->", "<:", ":>", "::",
];

pub struct Lexer {
    source: String,
    file: Rc<str>,
    in_block_comment: Option<SourceLocation>,
}

impl Lexer {
    pub fn new(source: &str, file: Rc<str>) -> Self {
        Lexer {
            source: source.to_string(),
            file,
            in_block_comment: None,
        }
    }

    /// Tokenize the whole source into logical lines. Lines that end up with
    /// no tokens (blank, comment-only) are kept so line bookkeeping stays simple.
    pub fn tokenize(&mut self) -> Result<Vec<Line>, CompilerError> {
        let text = replace_trigraphs(&self.source);
        let mut lines = Vec::new();

        for (line_number, content) in splice_lines(&text) {
            let location = SourceLocation::new(self.file.clone(), line_number);
            let tokens = self.tokenize_line(&content, &location)?;
            lines.push(Line {
                location,
                tokens,
                include_depth: 0,
            });
        }

        if let Some(start) = self.in_block_comment.take() {
            return Err(CompilerError::UnterminatedComment(start));
        }

        log::debug!("lexed {} line(s) from {}", lines.len(), self.file);
        Ok(lines)
    }

    fn tokenize_line(
        &mut self,
        content: &str,
        location: &SourceLocation,
    ) -> Result<Vec<Token>, CompilerError> {
        let chars: Vec<char> = content.chars().collect();
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            if self.in_block_comment.is_some() {
                match find_comment_end(&chars, pos) {
                    Some(end) => {
                        self.in_block_comment = None;
                        pos = end;
                        continue;
                    }
                    None => break,
                }
            }

            let ch = chars[pos];
            let next = chars.get(pos + 1).copied();

            if ch.is_whitespace() {
                pos += 1;
                continue;
            }

            match (ch, next) {
                ('/', Some('/')) => break,
                ('/', Some('*')) => {
                    self.in_block_comment = Some(location.clone());
                    pos += 2;
                    continue;
                }
                ('*', Some('/')) => {
                    // Stray comment terminator: two ordinary tokens
                    tokens.push(Token::new(TokenKind::Punctuation, "*", location.clone()));
                    tokens.push(Token::new(TokenKind::Punctuation, "/", location.clone()));
                    pos += 2;
                    continue;
                }
                _ => {}
            }

            let start = pos;
            let kind = if ch.is_ascii_alphabetic() || ch == '_' {
                pos = read_identifier(&chars, pos);
                TokenKind::Identifier
            } else if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
                pos = read_number(&chars, pos);
                TokenKind::Number
            } else if ch == '"' || ch == '\'' {
                pos = read_quoted(&chars, pos)
                    .ok_or_else(|| CompilerError::UnterminatedLiteral(location.clone()))?;
                if ch == '"' {
                    TokenKind::StringLiteral
                } else {
                    TokenKind::CharLiteral
                }
            } else {
                pos += operator_length(&chars, pos);
                TokenKind::Punctuation
            };

            let text: String = chars[start..pos].iter().collect();
            tokens.push(Token::new(kind, text, location.clone()));
        }

        Ok(tokens)
    }
}

/// Replace the nine `??x` trigraph sequences with the character they stand for.
pub fn replace_trigraphs(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '?' && chars.get(i + 1) == Some(&'?') {
            if let Some(&third) = chars.get(i + 2) {
                if let Some(&(_, replacement)) = TRIGRAPHS.iter().find(|(t, _)| *t == third) {
                    out.push(replacement);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Join physical lines ending in a backslash with their successor. Each
/// logical line keeps the number of its first physical line.
fn splice_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in text.split('\n').enumerate() {
        let physical = raw.strip_suffix('\r').unwrap_or(raw);
        let (number, mut content) = pending.take().unwrap_or((index + 1, String::new()));

        match physical.strip_suffix('\\') {
            Some(head) => {
                content.push_str(head);
                pending = Some((number, content));
            }
            None => {
                content.push_str(physical);
                lines.push((number, content));
            }
        }
    }

    if let Some(last) = pending {
        lines.push(last);
    }

    lines
}

fn find_comment_end(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1))
        .find(|&i| chars[i] == '*' && chars[i + 1] == '/')
        .map(|i| i + 2)
}

fn read_identifier(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
        pos += 1;
    }
    pos
}

// pp-number: digits, letters, dots, and a sign directly after an exponent marker
fn read_number(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() {
        let ch = chars[pos];
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
            pos += 1;
        } else if (ch == '+' || ch == '-') && matches!(chars[pos - 1], 'e' | 'E' | 'p' | 'P') {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

fn read_quoted(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let mut pos = start + 1;

    while pos < chars.len() {
        match chars[pos] {
            '\\' => pos += 2,
            ch if ch == quote => return Some(pos + 1),
            _ => pos += 1,
        }
    }

    None
}

fn operator_length(chars: &[char], pos: usize) -> usize {
    if let Some(&next) = chars.get(pos + 1) {
        let pair: String = [chars[pos], next].iter().collect();
        if OPERATORS.contains(&pair.as_str()) {
            return 2;
        }
    }
    1
}

/// Strip the quotes from a string or character literal and process escapes.
pub fn unquote(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        ""
    };
    let mut value = String::new();
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('0') => value.push('\0'),
            Some(other) => value.push(other),
            None => {}
        }
    }

    value
}

/// Parse a decimal, `0x` hexadecimal or leading-zero octal integer literal.
pub fn parse_integer(text: &str) -> Option<i64> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };

    if digits.is_empty() {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
