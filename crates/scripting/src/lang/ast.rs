//! HSL Abstract Syntax Tree
//!
//! AST nodes for HSL language constructs. `Display` prints a node back as
//! HSL source with every compound expression parenthesized, so a printed
//! program reparses to a tree that prints identically.

use crate::lang::token::{Token, TokenKind};
use hsl_core::NodeId;
use std::fmt;
use std::rc::Rc;

/// Reserved name the constructor of a class is stored under
pub const INITIALIZER_NAME: &str = "<init>";

/// Literal value appearing in source
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Char(char),
    Bool(bool),
    Nil,
}

/// HSL expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value
    Literal(LiteralValue),

    /// Parenthesized expression
    Grouping(Box<Expr>),

    /// Variable reference
    Variable { name: Token, id: NodeId },

    /// Variable assignment (name = value)
    Assign {
        name: Token,
        value: Box<Expr>,
        id: NodeId,
    },

    /// Binary operation
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting `and`/`or` and boolean `xor`
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },

    /// Prefix `!` or `-`
    Unary {
        op: UnaryOp,
        operator: Token,
        operand: Box<Expr>,
    },

    /// `++`/`--` applied to a variable, property or index
    Update {
        op: UpdateOp,
        operator: Token,
        target: Box<Expr>,
        prefix: bool,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// `left ?: right`
    Elvis { left: Box<Expr>, right: Box<Expr> },

    /// Function call
    Call {
        callee: Box<Expr>,
        paren: Token,
        args: Vec<Expr>,
    },

    /// Member access (obj.prop)
    Get { object: Box<Expr>, name: Token },

    /// Property assignment (obj.prop = value)
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// Index access (obj[index])
    Index {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },

    /// Index assignment (obj[index] = value)
    SetIndex {
        object: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
        value: Box<Expr>,
    },

    /// Array literal
    Array { bracket: Token, elements: Vec<Expr> },

    /// This expression
    This { keyword: Token, id: NodeId },

    /// `super.method`
    Super {
        keyword: Token,
        method: Token,
        id: NodeId,
    },

    /// Anonymous function
    Lambda(Rc<FunctionDecl>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Shifts
    LeftShift,
    RightShift,
    UnsignedShift,
}

impl BinaryOp {
    pub fn from_kind(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,

            TokenKind::Equal => BinaryOp::Equal,
            TokenKind::BangEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,

            TokenKind::LeftShift => BinaryOp::LeftShift,
            TokenKind::RightShift => BinaryOp::RightShift,
            TokenKind::UnsignedShift => BinaryOp::UnsignedShift,

            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::UnsignedShift => ">>>",
        }
    }
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

impl LogicalOp {
    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Xor => "xor",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Increment/decrement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

/// Named or anonymous function
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// HSL statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression statement
    Expression(Expr),

    /// Print statement
    Print(Expr),

    /// Variable declaration
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Block statement
    Block(Vec<Stmt>),

    /// If statement
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// While loop
    While { condition: Expr, body: Box<Stmt> },

    /// `do body while (condition);`
    DoWhile { body: Box<Stmt>, condition: Expr },

    /// For loop
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// `repeat (count) body`
    Repeat {
        keyword: Token,
        count: Expr,
        body: Box<Stmt>,
    },

    /// Function declaration
    Function(Rc<FunctionDecl>),

    /// Class constructor; `function.name` is the synthesized `<init>` token
    Constructor {
        class_name: Token,
        function: Rc<FunctionDecl>,
    },

    /// Class declaration; `methods` holds `Function` and `Constructor` statements
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Stmt>,
    },

    /// Return statement
    Return { keyword: Token, value: Option<Expr> },

    /// Break statement
    Break { keyword: Token },

    /// Continue statement
    Continue { keyword: Token },

    /// Named test block
    Test {
        keyword: Token,
        name: String,
        body: Vec<Stmt>,
    },

    /// Module name declaration
    Module { name: Token },
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::String(s) => write!(f, "\"{}\"", escape(s, '"')),
            LiteralValue::Char(c) => write!(f, "'{}'", escape(&c.to_string(), '\'')),
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::Nil => write!(f, "nil"),
        }
    }
}

fn escape(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_params(f: &mut fmt::Formatter, params: &[Token]) -> fmt::Result {
    let names: Vec<&str> = params.iter().map(|p| p.lexeme.as_str()).collect();
    write!(f, "({})", names.join(", "))
}

fn write_body(f: &mut fmt::Formatter, body: &[Stmt]) -> fmt::Result {
    write!(f, "{{")?;
    for stmt in body {
        write!(f, " {}", stmt)?;
    }
    write!(f, " }}")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            // Compound forms print their own parentheses
            Expr::Grouping(inner) => match inner.as_ref() {
                Expr::Assign { .. } | Expr::Set { .. } | Expr::SetIndex { .. } | Expr::Lambda(_) => {
                    write!(f, "({})", inner)
                }
                _ => write!(f, "{}", inner),
            },
            Expr::Variable { name, .. } => write!(f, "{}", name.lexeme),
            Expr::Assign { name, value, .. } => write!(f, "{} = {}", name.lexeme, value),
            Expr::Binary { left, op, right, .. } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Logical { left, op, right } => {
                write!(f, "({} {} {})", left, op.keyword(), right)
            }
            Expr::Unary { op, operand, .. } => match op {
                UnaryOp::Negate => write!(f, "(-{})", operand),
                UnaryOp::Not => write!(f, "(!{})", operand),
            },
            Expr::Update { op, target, prefix, .. } => {
                if *prefix {
                    write!(f, "({}{})", op.symbol(), target)
                } else {
                    write!(f, "({}{})", target, op.symbol())
                }
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => write!(f, "({} ? {} : {})", condition, then_branch, else_branch),
            Expr::Elvis { left, right } => write!(f, "({} ?: {})", left, right),
            Expr::Call { callee, args, .. } => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Get { object, name } => write!(f, "{}.{}", object, name.lexeme),
            Expr::Set { object, name, value } => {
                write!(f, "{}.{} = {}", object, name.lexeme, value)
            }
            Expr::Index { object, index, .. } => write!(f, "{}[{}]", object, index),
            Expr::SetIndex {
                object, index, value, ..
            } => write!(f, "{}[{}] = {}", object, index, value),
            Expr::Array { elements, .. } => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            Expr::This { .. } => write!(f, "this"),
            Expr::Super { method, .. } => write!(f, "super.{}", method.lexeme),
            Expr::Lambda(function) => {
                write!(f, "fun ")?;
                write_params(f, &function.params)?;
                write!(f, " ")?;
                write_body(f, &function.body)
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stmt::Expression(expr) => write!(f, "{};", expr),
            Stmt::Print(expr) => write!(f, "print {};", expr),
            Stmt::Var { name, initializer } => match initializer {
                Some(init) => write!(f, "var {} = {};", name.lexeme, init),
                None => write!(f, "var {};", name.lexeme),
            },
            Stmt::Block(statements) => write_body(f, statements),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                write!(f, "if ({}) {}", condition, then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {}", else_branch)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => write!(f, "while ({}) {}", condition, body),
            Stmt::DoWhile { body, condition } => write!(f, "do {} while ({});", body, condition),
            Stmt::For {
                init,
                condition,
                increment,
                body,
            } => {
                write!(f, "for (")?;
                match init {
                    Some(init) => write!(f, "{}", init)?,
                    None => write!(f, ";")?,
                }
                if let Some(condition) = condition {
                    write!(f, " {}", condition)?;
                }
                write!(f, ";")?;
                if let Some(increment) = increment {
                    write!(f, " {}", increment)?;
                }
                write!(f, ") {}", body)
            }
            Stmt::Repeat { count, body, .. } => write!(f, "repeat ({}) {}", count, body),
            Stmt::Function(function) => {
                write!(f, "fun {}", function.name.lexeme)?;
                write_params(f, &function.params)?;
                write!(f, " ")?;
                write_body(f, &function.body)
            }
            Stmt::Constructor { class_name, function } => {
                write!(f, "{}", class_name.lexeme)?;
                write_params(f, &function.params)?;
                write!(f, " ")?;
                write_body(f, &function.body)
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                write!(f, "class {}", name.lexeme)?;
                if let Some(superclass) = superclass {
                    write!(f, " extends {}", superclass)?;
                }
                write_body(f, methods)
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => write!(f, "return {};", value),
                None => write!(f, "return;"),
            },
            Stmt::Break { .. } => write!(f, "break;"),
            Stmt::Continue { .. } => write!(f, "continue;"),
            Stmt::Test { name, body, .. } => {
                write!(f, "test \"{}\" ", escape(name, '"'))?;
                write_body(f, body)
            }
            Stmt::Module { name } => write!(f, "module {};", name.lexeme),
        }
    }
}

/// Print a whole program, one top-level statement per line
pub fn print_program(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(|stmt| stmt.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
