use std::fmt::Display;
use std::rc::Rc;

use ordered_float::OrderedFloat;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Program(pub Vec<Stmt>);

/// A function declaration
/// Shared between the statement tree and every function value created from it
#[derive(Debug, PartialEq, Eq)]
pub struct FunDecl {
    pub name: String,
    pub line: usize,
    pub parameters: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
    Print(Expr),
    VarDecl {
        name: String,
        init: Option<Expr>,
    },
    Block(Vec<Stmt>),
    If {
        expr: Expr,
        then: Box<Stmt>,
        or_else: Option<Box<Stmt>>,
    },
    While {
        expr: Expr,
        body: Box<Stmt>,
    },
    FunDecl(Rc<FunDecl>),
    Return {
        line: usize,
        expr: Option<Expr>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    // Line of the token that runtime errors in this node are blamed on:
    // the operator, the variable name or the closing paren of a call
    pub line: usize,
    pub inner: ExprInner,
}

impl Expr {
    pub fn new(line: usize, inner: ExprInner) -> Expr {
        Expr { line, inner }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprInner {
    Literal(Literal),
    Group(Box<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    Variable {
        name: String,
    },
    Assignment {
        target: String,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Equal => f.write_str("=="),
            BinaryOp::NotEqual => f.write_str("!="),
            BinaryOp::LessThan => f.write_str("<"),
            BinaryOp::LessThanEqual => f.write_str("<="),
            BinaryOp::GreaterThan => f.write_str(">"),
            BinaryOp::GreaterThanEqual => f.write_str(">="),
            BinaryOp::Add => f.write_str("+"),
            BinaryOp::Subtract => f.write_str("-"),
            BinaryOp::Multiply => f.write_str("*"),
            BinaryOp::Divide => f.write_str("/"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negative,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Not => f.write_str("!"),
            UnaryOp::Negative => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOp::And => f.write_str("and"),
            LogicalOp::Or => f.write_str("or"),
        }
    }
}

/// Literal payloads, shared by tokens and literal expressions
/// Numbers are wrapped in OrderedFloat so the whole tree can be Eq
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(OrderedFloat<f64>),
    String(String),
    Boolean(bool),
    Nil,
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(OrderedFloat(dbl)) => write!(f, "{}", dbl),
            Literal::String(s) => f.write_str(s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Nil => f.write_str("nil"),
        }
    }
}
