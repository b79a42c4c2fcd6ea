//! HSL front end
//!
//! Source text flows through [`lexer`] into tokens, through [`parser`] into
//! the [`ast`], and optionally through the [`resolver`] before execution.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;

pub use ast::{Expr, FunctionDecl, Stmt};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, Parser};
pub use resolver::{resolve, Resolution};
pub use token::{Literal, Token, TokenKind};
