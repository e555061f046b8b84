// Logic Language Recursive Descent Parser
//
// Works on the flat token stream left by the preprocessor. Comparisons are
// turned into test calls as soon as both operands are known; everything that
// depends on argument kinds or on ternary hoisting is left to lowering.

use crate::logic_compiler::ast::*;
use crate::logic_compiler::commands::{CommandSet, ParamKind};
use crate::logic_compiler::error::{CompilerError, SourceLocation};
use crate::logic_compiler::lexer::{parse_integer, unquote, Token, TokenKind};
use crate::logic_compiler::lowering;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    commands: &'a CommandSet,
    end_location: SourceLocation,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, commands: &'a CommandSet) -> Self {
        let end_location = tokens
            .last()
            .map(|token| token.location.clone())
            .unwrap_or_else(|| SourceLocation::new("<input>".into(), 1));
        Parser {
            tokens,
            current: 0,
            commands,
            end_location,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, CompilerError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        log::debug!("parsed {} top-level statement(s)", statements.len());
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, CompilerError> {
        let token = self.expect_token("statement")?;
        let location = token.location.clone();

        match token.kind {
            TokenKind::Punctuation => match token.text.as_str() {
                ";" => {
                    self.advance();
                    Ok(Stmt::Empty)
                }
                "{" => self.parse_block(),
                "++" | "--" => {
                    self.advance();
                    let variable = self.parse_variable()?;
                    self.consume(";")?;
                    let name = if token.text == "++" { "increment" } else { "decrement" };
                    Ok(Stmt::call(name, vec![variable], &location))
                }
                "*" => {
                    self.advance();
                    let target = match self.parse_variable()? {
                        Expr::Variable(n) => Expr::VariableValue(n),
                        other => other,
                    };
                    self.parse_assignment(target, location)
                }
                _ => Err(CompilerError::UnexpectedToken(token.text.clone(), location)),
            },
            TokenKind::Identifier => match token.text.as_str() {
                "if" => self.parse_if_stmt(),
                "while" => self.parse_while_stmt(),
                "do" => self.parse_do_stmt(),
                "return" => self.parse_return_stmt(),
                "goto" => self.parse_goto_stmt(),
                "else" => Err(CompilerError::UnexpectedToken(token.text.clone(), location)),
                _ => {
                    if let Some(reference) = typed_reference(&token)? {
                        self.advance();
                        return self.parse_reference_stmt(reference, location);
                    }

                    let name = self.parse_dotted_name()?;
                    if self.match_token(":") {
                        Ok(Stmt::Label { name, location })
                    } else if self.check("(") {
                        self.parse_call_stmt(name, location)
                    } else {
                        let found = self.peek().map_or("end of input".to_string(), |t| t.text.clone());
                        Err(CompilerError::ExpectedToken("'(' or ':'".to_string(), found, location))
                    }
                }
            },
            _ => Err(CompilerError::UnexpectedToken(token.text.clone(), location)),
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, CompilerError> {
        self.consume("{")?;
        let mut statements = Vec::new();

        while !self.check("}") {
            if self.is_at_end() {
                return Err(CompilerError::UnexpectedEndOfInput(
                    "'}'".to_string(),
                    self.end_location.clone(),
                ));
            }
            statements.push(self.parse_statement()?);
        }

        self.consume("}")?;
        Ok(Stmt::Block(statements))
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, CompilerError> {
        let location = self.advance_location();
        let cond = self.parse_parenthesized()?;
        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_token("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            location,
        })
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, CompilerError> {
        let location = self.advance_location();
        let cond = self.parse_parenthesized()?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::While {
            cond,
            body,
            location,
        })
    }

    fn parse_do_stmt(&mut self) -> Result<Stmt, CompilerError> {
        let location = self.advance_location();
        let body = Box::new(self.parse_statement()?);
        self.consume("while")?;
        let cond = self.parse_parenthesized()?;
        self.consume(";")?;

        Ok(Stmt::Do {
            body,
            cond,
            location,
        })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, CompilerError> {
        let location = self.advance_location();
        if self.match_token("(") {
            self.consume(")")?;
        }
        self.consume(";")?;
        Ok(Stmt::call("return", Vec::new(), &location))
    }

    // goto label; | goto(label); with dotted label names
    fn parse_goto_stmt(&mut self) -> Result<Stmt, CompilerError> {
        let location = self.advance_location();
        let parenthesized = self.match_token("(");
        let label = self.parse_dotted_name()?;
        if parenthesized {
            self.consume(")")?;
        }
        self.consume(";")?;
        Ok(Stmt::Goto { label, location })
    }

    /// Statements starting with `vN` or `fN`.
    fn parse_reference_stmt(&mut self, target: Expr, location: SourceLocation) -> Result<Stmt, CompilerError> {
        if let Expr::Variable(_) = target {
            for (operator, command) in [("++", "increment"), ("--", "decrement")] {
                if self.match_token(operator) {
                    self.consume(";")?;
                    return Ok(Stmt::call(command, vec![target], &location));
                }
            }
        }

        match target {
            Expr::Variable(_) | Expr::Flag(_) => self.parse_assignment(target, location),
            other => Err(CompilerError::InvalidAssignment(
                format!("cannot assign to {}", other.describe()),
                location,
            )),
        }
    }

    fn parse_assignment(&mut self, target: Expr, location: SourceLocation) -> Result<Stmt, CompilerError> {
        let op = if self.match_token("=") {
            AssignOp::Assign
        } else {
            let op = match self.peek().map(|t| t.text.as_str()) {
                Some("+") => AssignOp::Add,
                Some("-") => AssignOp::Subtract,
                Some("*") => AssignOp::Multiply,
                Some("/") => AssignOp::Divide,
                _ => {
                    let found = self.peek().map_or("end of input".to_string(), |t| t.text.clone());
                    return Err(CompilerError::ExpectedToken(
                        "assignment operator".to_string(),
                        found,
                        location,
                    ));
                }
            };
            self.advance();
            self.consume("=")?;
            op
        };

        let value = self.parse_expression()?;
        self.consume(";")?;

        Ok(Stmt::Assign {
            target,
            op,
            value,
            location,
        })
    }

    fn parse_call_stmt(&mut self, name: String, location: SourceLocation) -> Result<Stmt, CompilerError> {
        let descriptor = self
            .commands
            .actions
            .get(&name)
            .ok_or_else(|| CompilerError::UnknownCommand(name.clone(), location.clone()))?;
        let args = self.parse_arguments()?;
        descriptor.check_arity(args.len(), &location)?;
        self.consume(";")?;

        Ok(Stmt::Call {
            name,
            args,
            location,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, CompilerError> {
        self.consume("(")?;
        let mut args = Vec::new();

        if self.match_token(")") {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if !self.match_token(",") {
                break;
            }
        }

        self.consume(")")?;
        Ok(args)
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, CompilerError> {
        self.consume("(")?;
        let expr = self.parse_expression()?;
        self.consume(")")?;
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, CompilerError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, CompilerError> {
        let cond = self.parse_logical_or()?;

        if self.match_token("?") {
            let then_expr = self.parse_expression()?;
            self.consume(":")?;
            let else_expr = self.parse_ternary()?;
            Ok(Expr::conditional(cond, then_expr, else_expr))
        } else {
            Ok(cond)
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, CompilerError> {
        let mut operands = vec![self.parse_logical_and()?];

        while self.match_token("||") {
            operands.push(self.parse_logical_and()?);
        }

        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            Expr::or(operands)
        })
    }

    fn parse_logical_and(&mut self) -> Result<Expr, CompilerError> {
        let mut operands = vec![self.parse_equality()?];

        while self.match_token("&&") {
            operands.push(self.parse_equality()?);
        }

        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            Expr::and(operands)
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, CompilerError> {
        let mut expr = self.parse_relational()?;

        while let Some(operator) = self.match_any(&["==", "!="]) {
            let location = self.previous_location();
            let rhs = self.parse_relational()?;
            expr = lowering::comparison(&operator, expr, rhs, &location)?;
        }

        Ok(expr)
    }

    fn parse_relational(&mut self) -> Result<Expr, CompilerError> {
        let mut expr = self.parse_additive()?;

        while let Some(operator) = self.match_any(&["<", "<=", ">", ">="]) {
            let location = self.previous_location();
            let rhs = self.parse_additive()?;
            expr = lowering::comparison(&operator, expr, rhs, &location)?;
        }

        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompilerError> {
        let mut expr = self.parse_multiplicative()?;

        while let Some(operator) = self.match_any(&["+", "-"]) {
            let op = if operator == "+" { MathOp::Add } else { MathOp::Subtract };
            let rhs = self.parse_multiplicative()?;
            expr = Expr::math(op, expr, rhs);
        }

        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompilerError> {
        let mut expr = self.parse_unary()?;

        while let Some(operator) = self.match_any(&["*", "/"]) {
            let op = if operator == "*" { MathOp::Multiply } else { MathOp::Divide };
            let rhs = self.parse_unary()?;
            expr = Expr::math(op, expr, rhs);
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompilerError> {
        if self.match_token("!") {
            return Ok(Expr::not(self.parse_unary()?));
        }
        if self.match_token("-") {
            let operand = self.parse_unary()?;
            return Ok(Expr::math(MathOp::Subtract, Expr::Number(0), operand));
        }
        if self.match_token("+") {
            return self.parse_unary();
        }
        if self.match_token("*") {
            return match self.parse_variable()? {
                Expr::Variable(n) => Ok(Expr::VariableValue(n)),
                other => Ok(other),
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, CompilerError> {
        let token = self.expect_token("expression")?;

        match token.kind {
            TokenKind::Number => {
                self.advance();
                parse_integer(&token.text).map(Expr::Number).ok_or_else(|| {
                    CompilerError::ParseError(format!("invalid number '{}'", token.text), token.location)
                })
            }
            TokenKind::CharLiteral => {
                self.advance();
                let value = unquote(&token.text).chars().next().map_or(0, |ch| ch as i64);
                Ok(Expr::Number(value))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::Literal(unquote(&token.text)))
            }
            TokenKind::Punctuation if token.text == "(" => self.parse_parenthesized(),
            TokenKind::Identifier if token.text == "true" || token.text == "false" => {
                self.advance();
                Ok(Expr::Number((token.text == "true") as i64))
            }
            TokenKind::Identifier => {
                if let Some(reference) = typed_reference(&token)? {
                    self.advance();
                    return Ok(reference);
                }

                let name = self.parse_dotted_name()?;
                if !self.check("(") {
                    return Err(CompilerError::UnexpectedToken(name, token.location));
                }

                let descriptor = self
                    .commands
                    .tests
                    .get(&name)
                    .ok_or_else(|| CompilerError::UnknownCommand(name.clone(), token.location.clone()))?;
                let args = self.parse_arguments()?;
                descriptor.check_arity(args.len(), &token.location)?;

                Ok(Expr::Call {
                    name,
                    args,
                    location: token.location,
                })
            }
            TokenKind::Punctuation => Err(CompilerError::UnexpectedToken(token.text, token.location)),
        }
    }

    fn parse_variable(&mut self) -> Result<Expr, CompilerError> {
        let token = self.expect_token("variable")?;
        match typed_reference(&token)? {
            Some(variable @ Expr::Variable(_)) => {
                self.advance();
                Ok(variable)
            }
            _ => Err(CompilerError::ExpectedToken(
                "variable".to_string(),
                token.text,
                token.location,
            )),
        }
    }

    // name ( '.' name )*
    fn parse_dotted_name(&mut self) -> Result<String, CompilerError> {
        let token = self.expect_token("name")?;
        if !token.is_identifier() {
            return Err(CompilerError::ExpectedToken(
                "name".to_string(),
                token.text,
                token.location,
            ));
        }
        self.advance();

        let mut name = token.text;
        while self.check(".") && self.peek_next().is_some_and(|t| t.is_identifier()) {
            self.advance();
            name.push('.');
            name.push_str(&self.advance().text);
        }
        Ok(name)
    }

    // Helper methods
    fn match_token(&mut self, text: &str) -> bool {
        if self.check(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, texts: &[&str]) -> Option<String> {
        let found = texts.iter().find(|text| self.check(text))?.to_string();
        self.advance();
        Some(found)
    }

    fn check(&self, text: &str) -> bool {
        self.peek().is_some_and(|token| token.is(text))
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    /// Consume the current token, returning its location.
    fn advance_location(&mut self) -> SourceLocation {
        self.advance().location.clone()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn previous_location(&self) -> SourceLocation {
        self.previous().location.clone()
    }

    fn expect_token(&self, expected: &str) -> Result<Token, CompilerError> {
        self.peek().cloned().ok_or_else(|| {
            CompilerError::UnexpectedEndOfInput(expected.to_string(), self.end_location.clone())
        })
    }

    fn consume(&mut self, text: &str) -> Result<(), CompilerError> {
        match self.peek() {
            Some(token) if token.is(text) => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(CompilerError::ExpectedToken(
                format!("'{}'", text),
                token.text.clone(),
                token.location.clone(),
            )),
            None => Err(CompilerError::UnexpectedEndOfInput(
                format!("'{}'", text),
                self.end_location.clone(),
            )),
        }
    }
}

/// `v3`, `f12`, `m1`, `o0`, `i4`, `s2`, `w100`, `c7`: a prefix letter and a
/// decimal index. Anything else is not a typed reference.
fn typed_reference(token: &Token) -> Result<Option<Expr>, CompilerError> {
    if !token.is_identifier() {
        return Ok(None);
    }
    let mut chars = token.text.chars();
    let kind = match chars.next().and_then(ParamKind::from_code) {
        Some(ParamKind::Number) | None => return Ok(None),
        Some(kind) => kind,
    };
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }

    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    if value > kind.max_value() {
        return Err(CompilerError::ValueOutOfRange(
            value,
            kind.name().to_string(),
            token.location.clone(),
        ));
    }

    let expr = match kind {
        ParamKind::Variable => Expr::Variable(value as u8),
        ParamKind::Flag => Expr::Flag(value as u8),
        ParamKind::Message => Expr::Message(value as u8),
        ParamKind::Object => Expr::RoomObject(value as u8),
        ParamKind::Item => Expr::Item(value as u8),
        ParamKind::String => Expr::String(value as u8),
        ParamKind::Controller => Expr::Controller(value as u8),
        ParamKind::Word => Expr::Word(value as u16),
        ParamKind::Number => Expr::Number(value),
    };
    Ok(Some(expr))
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
