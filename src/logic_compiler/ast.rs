// Abstract Syntax Tree definitions for logic source
//
// Expression nodes are values: the constructors below (`and`, `or`, `not`,
// `math`, `conditional`) fold literal constants as nodes are built, so every
// tree rebuilt during lowering stays folded.

use crate::logic_compiler::error::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl MathOp {
    pub fn symbol(self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Subtract => "-",
            MathOp::Multiply => "*",
            MathOp::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Literal(String), // quoted string, escapes processed
    Number(i64),
    Variable(u8),
    Flag(u8),
    VariableValue(u8), // *vN
    Word(u16),
    Message(u8),
    Item(u8),
    Controller(u8),
    RoomObject(u8),
    String(u8),
    Math {
        op: MathOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

impl Expr {
    pub fn as_constant(&self) -> Option<i64> {
        match self {
            Expr::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// `&&` chain: nested chains are flattened, true constants dropped and a
    /// false constant makes the whole chain false.
    pub fn and(operands: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Expr::And(inner) => flat.extend(inner),
                Expr::Number(0) => return Expr::Number(0),
                Expr::Number(_) => {}
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Number(1),
            1 => flat.remove(0),
            _ => Expr::And(flat),
        }
    }

    /// `||` chain: the mirror image of [`Expr::and`].
    pub fn or(operands: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Expr::Or(inner) => flat.extend(inner),
                Expr::Number(0) => {}
                Expr::Number(_) => return Expr::Number(1),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Number(0),
            1 => flat.remove(0),
            _ => Expr::Or(flat),
        }
    }

    pub fn not(operand: Expr) -> Expr {
        match operand {
            Expr::Number(value) => Expr::Number((value == 0) as i64),
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    pub fn math(op: MathOp, lhs: Expr, rhs: Expr) -> Expr {
        if let (Expr::Number(a), Expr::Number(b)) = (&lhs, &rhs) {
            let folded = match op {
                MathOp::Add => a.checked_add(*b),
                MathOp::Subtract => a.checked_sub(*b),
                MathOp::Multiply => a.checked_mul(*b),
                MathOp::Divide => a.checked_div(*b),
            };
            if let Some(value) = folded {
                return Expr::Number(value);
            }
        }
        Expr::Math {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn conditional(cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        match cond {
            Expr::Number(0) => else_expr,
            Expr::Number(_) => then_expr,
            cond => Expr::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
        }
    }

    /// Short human description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::Call { name, .. } => format!("call to '{}'", name),
            Expr::And(_) | Expr::Or(_) | Expr::Not(_) => "boolean expression".to_string(),
            Expr::Literal(text) => format!("\"{}\"", text),
            Expr::Number(value) => format!("number {}", value),
            Expr::Variable(n) => format!("v{}", n),
            Expr::Flag(n) => format!("f{}", n),
            Expr::VariableValue(n) => format!("*v{}", n),
            Expr::Word(n) => format!("w{}", n),
            Expr::Message(n) => format!("m{}", n),
            Expr::Item(n) => format!("i{}", n),
            Expr::Controller(n) => format!("c{}", n),
            Expr::RoomObject(n) => format!("o{}", n),
            Expr::String(n) => format!("s{}", n),
            Expr::Math { op, .. } => format!("'{}' expression", op.symbol()),
            Expr::Conditional { .. } => "conditional expression".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Call {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },
    /// `target op= value`; lowered to a call before code generation.
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
        location: SourceLocation,
    },
    Label {
        name: String,
        location: SourceLocation,
    },
    Goto {
        label: String,
        location: SourceLocation,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Do {
        body: Box<Stmt>,
        cond: Expr,
        location: SourceLocation,
    },
    Block(Vec<Stmt>),
    Empty,
}

impl Stmt {
    pub fn call(name: &str, args: Vec<Expr>, location: &SourceLocation) -> Stmt {
        Stmt::Call {
            name: name.to_string(),
            args,
            location: location.clone(),
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Stmt::Call { name, .. } if name == "return")
    }
}
