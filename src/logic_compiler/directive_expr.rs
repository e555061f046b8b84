// Constant expression evaluation for #if / #elif
//
// Works directly on a directive's trailing tokens. Macro names are expanded by
// pushing their replacement back onto the input; each pushed token remembers
// which macros produced it so a macro never expands inside itself.

use crate::logic_compiler::error::{CompilerError, SourceLocation};
use crate::logic_compiler::lexer::{unquote, Token, TokenKind};
use crate::logic_compiler::preprocessor::MacroTable;
use std::rc::Rc;

struct Pending {
    token: Token,
    hidden: Rc<Vec<String>>,
}

pub struct DirectiveEvaluator<'a> {
    input: Vec<Pending>, // reversed; next token is at the end
    macros: &'a MacroTable,
    location: SourceLocation,
}

/// Evaluate `tokens` as an integer constant expression.
pub fn evaluate(tokens: &[Token], macros: &MacroTable, location: &SourceLocation) -> Result<i32, CompilerError> {
    let mut evaluator = DirectiveEvaluator::new(tokens, macros, location.clone());
    evaluator.evaluate()
}

fn binary_precedence(op: &str) -> Option<u8> {
    let precedence = match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | "<=" | ">" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    };
    Some(precedence)
}

impl<'a> DirectiveEvaluator<'a> {
    pub fn new(tokens: &[Token], macros: &'a MacroTable, location: SourceLocation) -> Self {
        let none = Rc::new(Vec::new());
        let input = tokens
            .iter()
            .rev()
            .map(|token| Pending {
                token: token.clone(),
                hidden: none.clone(),
            })
            .collect();
        DirectiveEvaluator {
            input,
            macros,
            location,
        }
    }

    pub fn evaluate(&mut self) -> Result<i32, CompilerError> {
        if self.peek()?.is_none() {
            return Err(self.error("empty expression"));
        }
        let value = self.expression(1, true)?;
        if let Some(text) = self.peek()?.map(|t| t.text.clone()) {
            return Err(self.error(&format!("unexpected token '{}'", text)));
        }
        Ok(value)
    }

    fn error(&self, message: &str) -> CompilerError {
        CompilerError::ExpressionError(message.to_string(), self.location.clone())
    }

    /// Next input entry with macro names expanded in place.
    fn next_pending(&mut self) -> Option<Pending> {
        while let Some(pending) = self.input.pop() {
            let name = &pending.token.text;
            if pending.token.is_identifier() && !pending.hidden.contains(name) {
                if let Some(replacement) = self.macros.get(name) {
                    let mut hidden = (*pending.hidden).clone();
                    hidden.push(name.clone());
                    let hidden = Rc::new(hidden);
                    for token in replacement.iter().rev() {
                        self.input.push(Pending {
                            token: token.clone(),
                            hidden: hidden.clone(),
                        });
                    }
                    continue;
                }
            }
            return Some(pending);
        }
        None
    }

    fn next(&mut self) -> Result<Option<Token>, CompilerError> {
        Ok(self.next_pending().map(|pending| pending.token))
    }

    fn next_raw(&mut self) -> Option<Token> {
        self.input.pop().map(|pending| pending.token)
    }

    fn peek(&mut self) -> Result<Option<&Token>, CompilerError> {
        // Expand so the head of the input is a real token, then leave it there
        if let Some(pending) = self.next_pending() {
            self.input.push(pending);
        }
        Ok(self.input.last().map(|pending| &pending.token))
    }

    fn expect_next(&mut self) -> Result<Token, CompilerError> {
        self.next()?.ok_or_else(|| self.error("unexpected end of expression"))
    }

    fn expression(&mut self, min_precedence: u8, live: bool) -> Result<i32, CompilerError> {
        let mut lhs = self.unary(live)?;

        loop {
            let (op, precedence) = match self.peek()? {
                Some(token) if token.kind == TokenKind::Punctuation => match binary_precedence(&token.text) {
                    Some(p) if p >= min_precedence => (token.text.clone(), p),
                    _ => break,
                },
                _ => break,
            };
            self.next()?;

            lhs = match op.as_str() {
                "&&" => {
                    let rhs = self.expression(precedence + 1, live && lhs != 0)?;
                    (lhs != 0 && rhs != 0) as i32
                }
                "||" => {
                    let rhs = self.expression(precedence + 1, live && lhs == 0)?;
                    (lhs != 0 || rhs != 0) as i32
                }
                _ => {
                    let rhs = self.expression(precedence + 1, live)?;
                    self.apply(&op, lhs, rhs, live)?
                }
            };
        }

        Ok(lhs)
    }

    fn apply(&self, op: &str, lhs: i32, rhs: i32, live: bool) -> Result<i32, CompilerError> {
        let value = match op {
            "|" => lhs | rhs,
            "^" => lhs ^ rhs,
            "&" => lhs & rhs,
            "==" => (lhs == rhs) as i32,
            "!=" => (lhs != rhs) as i32,
            "<" => (lhs < rhs) as i32,
            "<=" => (lhs <= rhs) as i32,
            ">" => (lhs > rhs) as i32,
            ">=" => (lhs >= rhs) as i32,
            "<<" => lhs.wrapping_shl(rhs as u32),
            ">>" => lhs.wrapping_shr(rhs as u32),
            "+" => lhs.wrapping_add(rhs),
            "-" => lhs.wrapping_sub(rhs),
            "*" => lhs.wrapping_mul(rhs),
            "/" | "%" if rhs == 0 => {
                if live {
                    return Err(self.error("division by zero"));
                }
                0
            }
            "/" => lhs.wrapping_div(rhs),
            "%" => lhs.wrapping_rem(rhs),
            _ => return Err(self.error(&format!("unknown operator '{}'", op))),
        };
        Ok(value)
    }

    fn unary(&mut self, live: bool) -> Result<i32, CompilerError> {
        let token = self.expect_next()?;

        match token.kind {
            TokenKind::Punctuation => match token.text.as_str() {
                "!" => Ok((self.unary(live)? == 0) as i32),
                "+" => self.unary(live),
                "-" => Ok(self.unary(live)?.wrapping_neg()),
                "~" => Ok(!self.unary(live)?),
                "(" => {
                    let value = self.expression(1, live)?;
                    match self.next()? {
                        Some(close) if close.is(")") => Ok(value),
                        Some(other) => Err(self.error(&format!("expected ')' but found '{}'", other.text))),
                        None => Err(self.error("unexpected end of expression, expected ')'")),
                    }
                }
                other => Err(self.error(&format!("unexpected token '{}'", other))),
            },
            TokenKind::Number => {
                let digits = token.text.trim_end_matches(['u', 'U', 'l', 'L']);
                parse_wrapping(digits)
                    .ok_or_else(|| self.error(&format!("invalid number '{}'", token.text)))
            }
            TokenKind::CharLiteral => unquote(&token.text)
                .chars()
                .next()
                .map(|ch| ch as i32)
                .ok_or_else(|| self.error("empty character literal")),
            TokenKind::Identifier if token.text == "defined" => self.defined(),
            // Identifiers left after expansion count as zero
            TokenKind::Identifier => Ok(0),
            TokenKind::StringLiteral => Err(self.error(&format!("unexpected token '{}'", token.text))),
        }
    }

    fn defined(&mut self) -> Result<i32, CompilerError> {
        let token = self
            .next_raw()
            .ok_or_else(|| self.error("expected macro name after 'defined'"))?;

        let name = if token.is("(") {
            let name = self
                .next_raw()
                .filter(|t| t.is_identifier())
                .ok_or_else(|| self.error("malformed 'defined(...)'"))?;
            match self.next_raw() {
                Some(close) if close.is(")") => name,
                _ => return Err(self.error("expected ')' after 'defined(name'")),
            }
        } else if token.is_identifier() {
            token
        } else {
            return Err(self.error(&format!("malformed 'defined': unexpected '{}'", token.text)));
        };

        Ok(self.macros.contains_key(&name.text) as i32)
    }
}

/// Integer literal reduced modulo 2^32, so oversized constants wrap like
/// every other directive arithmetic result.
fn parse_wrapping(text: &str) -> Option<i32> {
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
    digits.chars().try_fold(0i32, |value, ch| {
        let digit = ch.to_digit(radix)?;
        Some(value.wrapping_mul(radix as i32).wrapping_add(digit as i32))
    })
}

#[cfg(test)]
#[path = "directive_expr_tests.rs"]
mod tests;
