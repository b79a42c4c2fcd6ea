//! HSL tokens

use std::fmt;

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LParen,         // (
    RParen,         // )
    LBrace,         // {
    RBrace,         // }
    Comma,          // ,
    Dot,            // .
    Semicolon,      // ;
    Colon,          // :

    // Arithmetic
    Minus,          // -
    Plus,           // +
    Slash,          // /
    Star,           // *
    Percent,        // %

    // Comparison and assignment
    Bang,           // !
    BangEqual,      // !=
    Assign,         // =
    Equal,          // ==
    Greater,        // >
    GreaterEqual,   // >=
    Less,           // <
    LessEqual,      // <=

    // Shifts
    LeftShift,      // <<
    RightShift,     // >>
    UnsignedShift,  // >>>

    // Increment/Decrement
    Increment,      // ++
    Decrement,      // --

    // Conditionals
    Question,       // ?
    Elvis,          // ?:

    // Literals
    Identifier,
    String,
    Number,
    Char,

    // Keywords
    Class,
    Else,
    False,
    Fun,
    For,
    Repeat,
    If,
    None,
    Or,
    And,
    Xor,
    Extends,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    Do,
    While,
    Break,
    Continue,
    Nil,
    Test,
    Module,

    // Structural markers
    Array,          // []
    ArrayOpen,      // [
    ArrayClose,     // ]
    EOF,
}

impl TokenKind {
    /// Keyword lookup for an identifier lexeme
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "class" => TokenKind::Class,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "fun" => TokenKind::Fun,
            "for" => TokenKind::For,
            "repeat" => TokenKind::Repeat,
            "if" => TokenKind::If,
            "none" => TokenKind::None,
            "or" => TokenKind::Or,
            "and" => TokenKind::And,
            "xor" => TokenKind::Xor,
            "extends" => TokenKind::Extends,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "do" => TokenKind::Do,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "nil" => TokenKind::Nil,
            "test" => TokenKind::Test,
            "module" => TokenKind::Module,
            _ => return None,
        };
        Some(kind)
    }

    /// Keywords that begin a statement; the parser resynchronizes on these
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::Repeat
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Test
                | TokenKind::Module
        )
    }
}

/// Decoded value of a literal token
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Char(char),
}

/// A lexed token with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            literal: None,
            line,
            column,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    /// A token that does not come from source text, positioned at `at`
    pub fn synthetic(kind: TokenKind, lexeme: &str, at: &Token) -> Self {
        Self::new(kind, lexeme, at.line, at.column)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EOF => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}
