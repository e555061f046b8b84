// Lowering: parsed statements -> code generator input
//
// After lowering:
// - no `Conditional`, `Math`, `Literal` or `VariableValue` node remains
// - every call argument is a typed operand matching its parameter kind
// - conditions are trees of And/Or/Not over test calls, with Not only
//   directly above a call
// - constant conditions have been resolved structurally; the only constant
//   left is `Number(1)` as the condition of an endless `while`/`do`
// - a branch a constant condition removes survives only if it holds a label,
//   and then sits behind a `goto` past its end
// - the program ends with `return`

use crate::logic_compiler::ast::*;
use crate::logic_compiler::commands::{CommandDescriptor, CommandSet, ParamKind};
use crate::logic_compiler::error::{CompilerError, SourceLocation};
use crate::logic_compiler::symbols::SymbolTables;

pub struct Lowering<'a> {
    commands: &'a CommandSet,
    symbols: &'a mut SymbolTables,
    skip_labels: usize,
}

impl<'a> Lowering<'a> {
    pub fn new(commands: &'a CommandSet, symbols: &'a mut SymbolTables) -> Self {
        Lowering {
            commands,
            symbols,
            skip_labels: 0,
        }
    }

    pub fn lower_program(&mut self, statements: Vec<Stmt>) -> Result<Vec<Stmt>, CompilerError> {
        let end_location = statements
            .iter()
            .rev()
            .find_map(statement_location)
            .cloned()
            .unwrap_or_else(|| SourceLocation::new("<input>".into(), 1));

        let mut lowered = statements
            .into_iter()
            .map(|stmt| self.lower_statement(stmt))
            .collect::<Result<Vec<_>, _>>()?;

        if !lowered.last().is_some_and(Stmt::is_return) {
            log::debug!("appending implicit return");
            lowered.push(Stmt::call("return", Vec::new(), &end_location));
        }
        Ok(lowered)
    }

    pub fn lower_statement(&mut self, stmt: Stmt) -> Result<Stmt, CompilerError> {
        match stmt {
            Stmt::Call {
                name,
                args,
                location,
            } => self.lower_call(name, args, location),
            Stmt::Assign {
                target,
                op,
                value,
                location,
            } => self.lower_assignment(target, op, value, location),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                location,
            } => {
                let cond = self.lower_condition(cond, &location)?;
                match cond.as_constant() {
                    Some(0) => {
                        let skipped = self.unreachable(*then_branch, &location)?;
                        let taken = match else_branch {
                            Some(branch) => self.lower_statement(*branch)?,
                            None => Stmt::Empty,
                        };
                        Ok(match skipped {
                            Some(skipped) => Stmt::Block(vec![skipped, taken]),
                            None => taken,
                        })
                    }
                    Some(_) => {
                        let taken = self.lower_statement(*then_branch)?;
                        let skipped = match else_branch {
                            Some(branch) => self.unreachable(*branch, &location)?,
                            None => None,
                        };
                        Ok(match skipped {
                            Some(skipped) => Stmt::Block(vec![taken, skipped]),
                            None => taken,
                        })
                    }
                    None => Ok(Stmt::If {
                        cond,
                        then_branch: Box::new(self.lower_statement(*then_branch)?),
                        else_branch: else_branch
                            .map(|branch| self.lower_statement(*branch).map(Box::new))
                            .transpose()?,
                        location,
                    }),
                }
            }
            Stmt::While {
                cond,
                body,
                location,
            } => {
                let cond = self.lower_condition(cond, &location)?;
                if cond.as_constant() == Some(0) {
                    return Ok(self.unreachable(*body, &location)?.unwrap_or(Stmt::Empty));
                }
                Ok(Stmt::While {
                    cond,
                    body: Box::new(self.lower_statement(*body)?),
                    location,
                })
            }
            Stmt::Do {
                body,
                cond,
                location,
            } => {
                let cond = self.lower_condition(cond, &location)?;
                let body = self.lower_statement(*body)?;
                if cond.as_constant() == Some(0) {
                    return Ok(body);
                }
                Ok(Stmt::Do {
                    body: Box::new(body),
                    cond,
                    location,
                })
            }
            Stmt::Block(statements) => Ok(Stmt::Block(
                statements
                    .into_iter()
                    .map(|stmt| self.lower_statement(stmt))
                    .collect::<Result<_, _>>()?,
            )),
            Stmt::Label { .. } | Stmt::Goto { .. } | Stmt::Empty => Ok(stmt),
        }
    }

    /// A branch removed by a constant condition. It is dropped unless a label
    /// inside it can still be reached by `goto`; then it is kept behind an
    /// unconditional jump.
    fn unreachable(&mut self, stmt: Stmt, location: &SourceLocation) -> Result<Option<Stmt>, CompilerError> {
        if !contains_label(&stmt) {
            return Ok(None);
        }

        // Not an identifier, so it cannot clash with a label in the source
        let skip = format!(".skip{}", self.skip_labels);
        self.skip_labels += 1;
        log::debug!("{}: keeping unreachable code for its labels", location);

        Ok(Some(Stmt::Block(vec![
            Stmt::Goto {
                label: skip.clone(),
                location: location.clone(),
            },
            self.lower_statement(stmt)?,
            Stmt::Label {
                name: skip,
                location: location.clone(),
            },
        ])))
    }

    fn lower_call(&mut self, name: String, args: Vec<Expr>, location: SourceLocation) -> Result<Stmt, CompilerError> {
        // A ternary argument turns the call into an if/else around two calls
        if let Some((cond, then_args, else_args)) = hoist_list(&args) {
            let branch = |args| {
                Box::new(Stmt::Call {
                    name: name.clone(),
                    args,
                    location: location.clone(),
                })
            };
            let stmt = Stmt::If {
                cond,
                then_branch: branch(then_args),
                else_branch: Some(branch(else_args)),
                location: location.clone(),
            };
            return self.lower_statement(stmt);
        }

        let commands = self.commands;
        let descriptor = commands
            .actions
            .get(&name)
            .ok_or_else(|| CompilerError::UnknownCommand(name.clone(), location.clone()))?;
        let args = self.resolve_arguments(descriptor, args, &location)?;

        Ok(Stmt::Call {
            name,
            args,
            location,
        })
    }

    fn lower_assignment(
        &mut self,
        target: Expr,
        op: AssignOp,
        value: Expr,
        location: SourceLocation,
    ) -> Result<Stmt, CompilerError> {
        if let Some((cond, then_value, else_value)) = hoist(&value) {
            let branch = |value| {
                Box::new(Stmt::Assign {
                    target: target.clone(),
                    op,
                    value,
                    location: location.clone(),
                })
            };
            let stmt = Stmt::If {
                cond,
                then_branch: branch(then_value),
                else_branch: Some(branch(else_value)),
                location: location.clone(),
            };
            return self.lower_statement(stmt);
        }

        let stmt = match (target, op) {
            (Expr::Variable(v), AssignOp::Assign) => match value {
                Expr::VariableValue(p) => {
                    Stmt::call("rindirect", vec![Expr::Variable(v), Expr::Variable(p)], &location)
                }
                Expr::Math { op: math, lhs, rhs } => {
                    // Only `v = v op x` (or `v = x op v` when op commutes) fits one command
                    let operand = match (*lhs, *rhs) {
                        (Expr::Variable(l), rhs) if l == v => rhs,
                        (lhs, Expr::Variable(r)) if r == v && matches!(math, MathOp::Add | MathOp::Multiply) => lhs,
                        _ => {
                            return Err(CompilerError::InvalidAssignment(
                                format!("v{} = ... {} ... needs v{} as an operand", v, math.symbol(), v),
                                location,
                            ))
                        }
                    };
                    in_place_call(v, compound_op(math), operand, &location)?
                }
                value => in_place_call(v, AssignOp::Assign, value, &location)?,
            },
            (Expr::Variable(v), op) => in_place_call(v, op, value, &location)?,
            (Expr::VariableValue(p), AssignOp::Assign) => {
                let name = match value {
                    Expr::Number(_) => "lindirectn",
                    Expr::Variable(_) => "lindirectv",
                    other => {
                        return Err(CompilerError::InvalidAssignment(
                            format!("cannot store {} through *v{}", other.describe(), p),
                            location,
                        ))
                    }
                };
                Stmt::call(name, vec![Expr::Variable(p), value], &location)
            }
            (Expr::Flag(f), AssignOp::Assign) => match value {
                Expr::Not(inner) if *inner == Expr::Flag(f) => Stmt::call("toggle", vec![Expr::Flag(f)], &location),
                Expr::Number(0) => Stmt::call("reset", vec![Expr::Flag(f)], &location),
                Expr::Number(_) => Stmt::call("set", vec![Expr::Flag(f)], &location),
                cond => Stmt::If {
                    cond,
                    then_branch: Box::new(Stmt::call("set", vec![Expr::Flag(f)], &location)),
                    else_branch: Some(Box::new(Stmt::call("reset", vec![Expr::Flag(f)], &location))),
                    location: location.clone(),
                },
            },
            (target, _) => {
                return Err(CompilerError::InvalidAssignment(
                    format!("unsupported assignment to {}", target.describe()),
                    location,
                ))
            }
        };

        self.lower_statement(stmt)
    }

    /// Lower an `if`/`while`/`do` condition. The result is either a constant
    /// or a tree of And/Or/Not over resolved test calls.
    pub fn lower_condition(&mut self, expr: Expr, location: &SourceLocation) -> Result<Expr, CompilerError> {
        if let Some((cond, then_expr, else_expr)) = hoist(&expr) {
            // c ? a : b  ==  (c && a) || (!c && b)
            let branches = Expr::or(vec![
                Expr::and(vec![cond.clone(), then_expr]),
                Expr::and(vec![Expr::not(cond), else_expr]),
            ]);
            return self.lower_condition(branches, location);
        }
        self.normalize(expr, false, location)
    }

    // Pushes negation down to the leaves (De Morgan) while resolving tests
    fn normalize(&mut self, expr: Expr, negate: bool, location: &SourceLocation) -> Result<Expr, CompilerError> {
        match expr {
            Expr::Number(value) => Ok(Expr::Number(((value != 0) != negate) as i64)),
            Expr::Not(inner) => self.normalize(*inner, !negate, location),
            Expr::And(operands) => {
                let operands = self.normalize_all(operands, negate, location)?;
                Ok(if negate { Expr::or(operands) } else { Expr::and(operands) })
            }
            Expr::Or(operands) => {
                let operands = self.normalize_all(operands, negate, location)?;
                Ok(if negate { Expr::and(operands) } else { Expr::or(operands) })
            }
            Expr::Flag(f) => self.test_call("isset", vec![Expr::Flag(f)], negate, location),
            // A bare variable is true when non-zero
            Expr::Variable(v) => self.test_call(
                "equaln",
                vec![Expr::Variable(v), Expr::Number(0)],
                !negate,
                location,
            ),
            Expr::Call {
                name,
                args,
                location,
            } => self.test_call(&name, args, negate, &location),
            other => Err(CompilerError::TypeMismatch(
                "condition".to_string(),
                other.describe(),
                location.clone(),
            )),
        }
    }

    fn normalize_all(
        &mut self,
        operands: Vec<Expr>,
        negate: bool,
        location: &SourceLocation,
    ) -> Result<Vec<Expr>, CompilerError> {
        operands
            .into_iter()
            .map(|operand| self.normalize(operand, negate, location))
            .collect()
    }

    fn test_call(
        &mut self,
        name: &str,
        args: Vec<Expr>,
        negate: bool,
        location: &SourceLocation,
    ) -> Result<Expr, CompilerError> {
        let commands = self.commands;
        let descriptor = commands
            .tests
            .get(name)
            .ok_or_else(|| CompilerError::UnknownCommand(name.to_string(), location.clone()))?;
        let args = self.resolve_arguments(descriptor, args, location)?;

        let call = Expr::Call {
            name: name.to_string(),
            args,
            location: location.clone(),
        };
        Ok(if negate { Expr::Not(Box::new(call)) } else { call })
    }

    fn resolve_arguments(
        &mut self,
        descriptor: &CommandDescriptor,
        args: Vec<Expr>,
        location: &SourceLocation,
    ) -> Result<Vec<Expr>, CompilerError> {
        descriptor.check_arity(args.len(), location)?;

        let mut resolved = Vec::with_capacity(args.len());
        for (index, arg) in args.into_iter().enumerate() {
            let kind = descriptor.param_kind(index).ok_or_else(|| {
                CompilerError::WrongArity(descriptor.name.clone(), index, index + 1, location.clone())
            })?;
            resolved.push(self.resolve_operand(kind, arg, location)?);
        }
        Ok(resolved)
    }

    /// Check an argument against its declared kind. String literals in
    /// message, word and item positions are looked up (messages are
    /// allocated on first use).
    fn resolve_operand(&mut self, kind: ParamKind, arg: Expr, location: &SourceLocation) -> Result<Expr, CompilerError> {
        let resolved = match (kind, arg) {
            (ParamKind::Number, Expr::Number(value)) => {
                if !(0..=kind.max_value()).contains(&value) {
                    return Err(CompilerError::ValueOutOfRange(
                        value,
                        kind.name().to_string(),
                        location.clone(),
                    ));
                }
                Expr::Number(value)
            }
            (ParamKind::Variable, arg @ Expr::Variable(_))
            | (ParamKind::Flag, arg @ Expr::Flag(_))
            | (ParamKind::Message, arg @ Expr::Message(_))
            | (ParamKind::Object, arg @ Expr::RoomObject(_))
            | (ParamKind::Item, arg @ Expr::Item(_))
            | (ParamKind::String, arg @ Expr::String(_))
            | (ParamKind::Word, arg @ Expr::Word(_))
            | (ParamKind::Controller, arg @ Expr::Controller(_)) => arg,
            (ParamKind::Message, Expr::Literal(text)) => {
                Expr::Message(self.symbols.messages.number_for(&text, location)?)
            }
            (ParamKind::Word, Expr::Literal(text)) => {
                let words = &self.symbols.words;
                let number = words
                    .number_of(&text)
                    .or_else(|| words.number_of(&text.to_lowercase()))
                    .ok_or_else(|| CompilerError::UndefinedSymbol(format!("word \"{}\"", text), location.clone()))?;
                Expr::Word(number)
            }
            (ParamKind::Item, Expr::Literal(text)) => {
                let number = self
                    .symbols
                    .items
                    .number_of(&text)
                    .ok_or_else(|| CompilerError::UndefinedSymbol(format!("item \"{}\"", text), location.clone()))?;
                Expr::Item(number)
            }
            (kind, other) => {
                return Err(CompilerError::TypeMismatch(
                    kind.name().to_string(),
                    other.describe(),
                    location.clone(),
                ))
            }
        };
        Ok(resolved)
    }
}

/// Lower `lhs <op> rhs` to a test call. Comparisons of two numbers fold; a
/// number on the left is swapped to the right; `<=`, `>=` and `!=` become the
/// negation of `>`, `<` and `==`.
pub fn comparison(operator: &str, lhs: Expr, rhs: Expr, location: &SourceLocation) -> Result<Expr, CompilerError> {
    if let Some((cond, then_lhs, else_lhs)) = hoist(&lhs) {
        let then_expr = comparison(operator, then_lhs, rhs.clone(), location)?;
        let else_expr = comparison(operator, else_lhs, rhs, location)?;
        return Ok(Expr::conditional(cond, then_expr, else_expr));
    }
    if let Some((cond, then_rhs, else_rhs)) = hoist(&rhs) {
        let then_expr = comparison(operator, lhs.clone(), then_rhs, location)?;
        let else_expr = comparison(operator, lhs, else_rhs, location)?;
        return Ok(Expr::conditional(cond, then_expr, else_expr));
    }

    match (lhs, rhs) {
        (Expr::Number(a), Expr::Number(b)) => {
            let result = match operator {
                "==" => a == b,
                "!=" => a != b,
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                ">=" => a >= b,
                _ => return Err(unknown_comparison(operator, location)),
            };
            Ok(Expr::Number(result as i64))
        }
        (number @ Expr::Number(_), variable @ Expr::Variable(_)) => {
            comparison(swapped(operator), variable, number, location)
        }
        (lhs @ Expr::Variable(_), rhs @ (Expr::Number(_) | Expr::Variable(_))) => {
            let (base, negated) = match operator {
                "==" => ("equal", false),
                "!=" => ("equal", true),
                "<" => ("less", false),
                ">=" => ("less", true),
                ">" => ("greater", false),
                "<=" => ("greater", true),
                _ => return Err(unknown_comparison(operator, location)),
            };
            let suffix = if matches!(rhs, Expr::Number(_)) { 'n' } else { 'v' };
            let call = Expr::Call {
                name: format!("{}{}", base, suffix),
                args: vec![lhs, rhs],
                location: location.clone(),
            };
            Ok(if negated { Expr::not(call) } else { call })
        }
        (lhs, rhs) => Err(CompilerError::InvalidComparison(
            format!("cannot compare {} with {}", lhs.describe(), rhs.describe()),
            location.clone(),
        )),
    }
}

fn swapped(operator: &str) -> &str {
    match operator {
        "<" => ">",
        ">" => "<",
        "<=" => ">=",
        ">=" => "<=",
        other => other,
    }
}

fn unknown_comparison(operator: &str, location: &SourceLocation) -> CompilerError {
    CompilerError::InvalidComparison(format!("unknown operator '{}'", operator), location.clone())
}

/// Find the first ternary below `expr` and float it up: returns its
/// condition and `expr` rebuilt once with the "then" value and once with the
/// "else" value in its place.
pub fn hoist(expr: &Expr) -> Option<(Expr, Expr, Expr)> {
    match expr {
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => Some(((**cond).clone(), (**then_expr).clone(), (**else_expr).clone())),
        Expr::Math { op, lhs, rhs } => {
            if let Some((cond, a, b)) = hoist(lhs) {
                return Some((cond, Expr::math(*op, a, (**rhs).clone()), Expr::math(*op, b, (**rhs).clone())));
            }
            hoist(rhs).map(|(cond, a, b)| {
                (cond, Expr::math(*op, (**lhs).clone(), a), Expr::math(*op, (**lhs).clone(), b))
            })
        }
        Expr::Not(inner) => hoist(inner).map(|(cond, a, b)| (cond, Expr::not(a), Expr::not(b))),
        Expr::And(operands) => hoist_list(operands).map(|(cond, a, b)| (cond, Expr::and(a), Expr::and(b))),
        Expr::Or(operands) => hoist_list(operands).map(|(cond, a, b)| (cond, Expr::or(a), Expr::or(b))),
        Expr::Call {
            name,
            args,
            location,
        } => hoist_list(args).map(|(cond, a, b)| {
            let call = |args| Expr::Call {
                name: name.clone(),
                args,
                location: location.clone(),
            };
            (cond, call(a), call(b))
        }),
        _ => None,
    }
}

fn hoist_list(items: &[Expr]) -> Option<(Expr, Vec<Expr>, Vec<Expr>)> {
    items.iter().enumerate().find_map(|(index, item)| {
        hoist(item).map(|(cond, a, b)| {
            let mut then_items = items.to_vec();
            let mut else_items = items.to_vec();
            then_items[index] = a;
            else_items[index] = b;
            (cond, then_items, else_items)
        })
    })
}

fn compound_op(op: MathOp) -> AssignOp {
    match op {
        MathOp::Add => AssignOp::Add,
        MathOp::Subtract => AssignOp::Subtract,
        MathOp::Multiply => AssignOp::Multiply,
        MathOp::Divide => AssignOp::Divide,
    }
}

// vN op= number | variable
fn in_place_call(v: u8, op: AssignOp, operand: Expr, location: &SourceLocation) -> Result<Stmt, CompilerError> {
    let (by_number, by_variable) = match op {
        AssignOp::Assign => ("assignn", "assignv"),
        AssignOp::Add => ("addn", "addv"),
        AssignOp::Subtract => ("subn", "subv"),
        AssignOp::Multiply => ("mul.n", "mul.v"),
        AssignOp::Divide => ("div.n", "div.v"),
    };
    let name = match operand {
        Expr::Number(_) => by_number,
        Expr::Variable(_) => by_variable,
        other => {
            return Err(CompilerError::InvalidAssignment(
                format!("cannot assign {} to v{}", other.describe(), v),
                location.clone(),
            ))
        }
    };
    Ok(Stmt::call(name, vec![Expr::Variable(v), operand], location))
}

fn contains_label(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Label { .. } => true,
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => contains_label(then_branch) || else_branch.as_deref().is_some_and(contains_label),
        Stmt::While { body, .. } | Stmt::Do { body, .. } => contains_label(body),
        Stmt::Block(statements) => statements.iter().any(contains_label),
        Stmt::Call { .. } | Stmt::Assign { .. } | Stmt::Goto { .. } | Stmt::Empty => false,
    }
}

fn statement_location(stmt: &Stmt) -> Option<&SourceLocation> {
    match stmt {
        Stmt::Call { location, .. }
        | Stmt::Assign { location, .. }
        | Stmt::Label { location, .. }
        | Stmt::Goto { location, .. }
        | Stmt::If { location, .. }
        | Stmt::While { location, .. }
        | Stmt::Do { location, .. } => Some(location),
        Stmt::Block(statements) => statements.iter().rev().find_map(statement_location),
        Stmt::Empty => None,
    }
}

#[cfg(test)]
#[path = "lowering_tests.rs"]
mod tests;
