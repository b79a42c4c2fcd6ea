//! HSL Lexer
//!
//! Turns source text into a materialized token list. Lexing never aborts:
//! bad input is reported and scanning resumes at the next character.

use crate::diagnostics::{ErrorReporter, Location, Phase};
use crate::lang::token::{Literal, Token, TokenKind};
use hsl_core::SourcePosition;
use std::iter::Peekable;
use std::str::Chars;

/// A problem found while scanning one token
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct LexError {
    pub position: SourcePosition,
    pub message: String,
}

/// HSL lexer
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    ch: Option<char>,
    /// Position of `ch`
    position: SourcePosition,
    /// Position where the current token began
    start: SourcePosition,
    lexeme: String,
}

/// Lex `source` completely, reporting bad input to `reporter`
pub fn tokenize(source: &str, reporter: &mut ErrorReporter) -> Vec<Token> {
    Lexer::new(source).tokenize(reporter)
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let ch = chars.next();
        Self {
            input: chars,
            ch,
            position: SourcePosition::start(),
            start: SourcePosition::start(),
            lexeme: String::new(),
        }
    }

    /// Scan every token; the list always ends with a single `EOF`
    pub fn tokenize(mut self, reporter: &mut ErrorReporter) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            match self.next_token() {
                Ok(token) => {
                    let done = token.kind == TokenKind::EOF;
                    tokens.push(token);
                    if done {
                        break;
                    }
                }
                Err(err) => {
                    let location = Location {
                        line: err.position.line,
                        column: Some(err.position.column),
                        lexeme: None,
                    };
                    reporter.error(Phase::Lexing, location, err.message);
                }
            }
        }

        tracing::debug!("Lexed {} tokens", tokens.len());
        tokens
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        self.start = self.position;
        self.lexeme.clear();

        let ch = match self.ch {
            None => return Ok(self.make(TokenKind::EOF)),
            Some(ch) => ch,
        };

        match ch {
            '0'..='9' => self.read_number(),
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.read_identifier()),
            '"' => self.read_string(),
            '\'' => self.read_char(),

            '(' => Ok(self.single(TokenKind::LParen)),
            ')' => Ok(self.single(TokenKind::RParen)),
            '{' => Ok(self.single(TokenKind::LBrace)),
            '}' => Ok(self.single(TokenKind::RBrace)),
            ',' => Ok(self.single(TokenKind::Comma)),
            '.' => Ok(self.single(TokenKind::Dot)),
            ';' => Ok(self.single(TokenKind::Semicolon)),
            ':' => Ok(self.single(TokenKind::Colon)),
            '/' => Ok(self.single(TokenKind::Slash)),
            '*' => Ok(self.single(TokenKind::Star)),
            '%' => Ok(self.single(TokenKind::Percent)),

            '[' => {
                self.advance();
                if self.ch == Some(']') {
                    self.advance();
                    Ok(self.make(TokenKind::Array))
                } else {
                    Ok(self.make(TokenKind::ArrayOpen))
                }
            }
            ']' => Ok(self.single(TokenKind::ArrayClose)),

            '+' => {
                self.advance();
                let kind = if self.eat('+') { TokenKind::Increment } else { TokenKind::Plus };
                Ok(self.make(kind))
            }

            '-' => {
                self.advance();
                let kind = if self.eat('-') { TokenKind::Decrement } else { TokenKind::Minus };
                Ok(self.make(kind))
            }

            '!' => {
                self.advance();
                let kind = if self.eat('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                Ok(self.make(kind))
            }

            '=' => {
                self.advance();
                let kind = if self.eat('=') { TokenKind::Equal } else { TokenKind::Assign };
                Ok(self.make(kind))
            }

            '<' => {
                self.advance();
                let kind = if self.eat('=') {
                    TokenKind::LessEqual
                } else if self.eat('<') {
                    TokenKind::LeftShift
                } else {
                    TokenKind::Less
                };
                Ok(self.make(kind))
            }

            '>' => {
                self.advance();
                let kind = if self.eat('=') {
                    TokenKind::GreaterEqual
                } else if self.eat('>') {
                    if self.eat('>') {
                        TokenKind::UnsignedShift
                    } else {
                        TokenKind::RightShift
                    }
                } else {
                    TokenKind::Greater
                };
                Ok(self.make(kind))
            }

            '?' => {
                self.advance();
                let kind = if self.eat(':') { TokenKind::Elvis } else { TokenKind::Question };
                Ok(self.make(kind))
            }

            _ => {
                self.advance();
                Err(self.error_at(self.start, format!("Unexpected character '{}'", ch)))
            }
        }
    }

    /// Read a number literal
    fn read_number(&mut self) -> Result<Token, LexError> {
        self.consume_digits();

        // A '.' only belongs to the number when a digit follows it
        if self.ch == Some('.') && matches!(self.input.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            self.consume_digits();
        }

        let value: f64 = self
            .lexeme
            .parse()
            .map_err(|_| self.error_at(self.start, format!("Invalid number: {}", self.lexeme)))?;

        Ok(self.make(TokenKind::Number).with_literal(Literal::Number(value)))
    }

    fn consume_digits(&mut self) {
        while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while matches!(self.ch, Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let kind = TokenKind::keyword(&self.lexeme).unwrap_or(TokenKind::Identifier);
        self.make(kind)
    }

    /// Read a string literal
    fn read_string(&mut self) -> Result<Token, LexError> {
        self.advance(); // Skip opening quote

        let mut s = String::new();

        while let Some(ch) = self.ch {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(self.make(TokenKind::String).with_literal(Literal::String(s)));
                }
                '\\' => {
                    self.advance();
                    if let Some(escaped) = self.read_escape() {
                        s.push(escaped);
                    }
                }
                _ => {
                    s.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error_at(self.start, "Unterminated string"))
    }

    /// Read a character literal holding exactly one character
    fn read_char(&mut self) -> Result<Token, LexError> {
        self.advance(); // Skip opening quote

        let value = match self.ch {
            Some('\'') => {
                self.advance();
                return Err(self.error_at(self.start, "Empty character literal"));
            }
            Some('\\') => {
                self.advance();
                self.read_escape()
            }
            Some('\n') | None => None,
            Some(c) => {
                self.advance();
                Some(c)
            }
        };

        match (value, self.ch) {
            (Some(c), Some('\'')) => {
                self.advance();
                Ok(self.make(TokenKind::Char).with_literal(Literal::Char(c)))
            }
            (Some(_), Some(c)) if c != '\n' => {
                // Skip the rest of the literal so scanning resumes after it
                while !matches!(self.ch, None | Some('\'') | Some('\n')) {
                    self.advance();
                }
                if self.ch == Some('\'') {
                    self.advance();
                    Err(self.error_at(self.start, "Character literal must hold exactly one character"))
                } else {
                    Err(self.error_at(self.start, "Unterminated character literal"))
                }
            }
            _ => Err(self.error_at(self.start, "Unterminated character literal")),
        }
    }

    /// Decode the character after a backslash
    fn read_escape(&mut self) -> Option<char> {
        let escaped = self.ch?;
        self.advance();
        Some(match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        })
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.ch {
                Some(c) if c.is_whitespace() => self.advance(),
                Some('/') if self.input.peek() == Some(&'/') => {
                    // Line comment
                    while self.ch.is_some() && self.ch != Some('\n') {
                        self.advance();
                    }
                }
                Some('/') if self.input.peek() == Some(&'*') => {
                    let opened = self.position;
                    self.advance();
                    self.advance();
                    loop {
                        match self.ch {
                            None => {
                                self.lexeme.clear();
                                return Err(self.error_at(opened, "Unterminated block comment"));
                            }
                            Some('*') if self.input.peek() == Some(&'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => self.advance(),
                        }
                    }
                }
                _ => {
                    self.lexeme.clear();
                    return Ok(());
                }
            }
        }
    }

    /// Consume the next char when it is `expected`
    fn eat(&mut self, expected: char) -> bool {
        if self.ch == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.ch {
            self.lexeme.push(c);
            self.position.advance(c);
        }
        self.ch = self.input.next();
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.make(kind)
    }

    fn make(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme.as_str(), self.start.line, self.start.column)
    }

    fn error_at(&self, position: SourcePosition, message: impl Into<String>) -> LexError {
        LexError {
            position,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize(source, &mut reporter);
        assert!(!reporter.has_errors(), "unexpected diagnostics: {:?}", reporter.diagnostics());
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("123 45.67");

        assert_eq!(lexer.next_token().unwrap().literal, Some(Literal::Number(123.0)));
        assert_eq!(lexer.next_token().unwrap().literal, Some(Literal::Number(45.67)));
    }

    #[test]
    fn test_number_followed_by_dot() {
        assert_eq!(
            kinds("1.foo"),
            vec![TokenKind::Number, TokenKind::Dot, TokenKind::Identifier, TokenKind::EOF]
        );
    }

    #[test]
    fn test_identifiers() {
        let mut lexer = Lexer::new("foo bar_baz");

        assert_eq!(lexer.next_token().unwrap().lexeme, "foo");
        let second = lexer.next_token().unwrap();
        assert_eq!(second.kind, TokenKind::Identifier);
        assert_eq!(second.lexeme, "bar_baz");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("class fun var repeat none xor extends test module nil"),
            vec![
                TokenKind::Class,
                TokenKind::Fun,
                TokenKind::Var,
                TokenKind::Repeat,
                TokenKind::None,
                TokenKind::Xor,
                TokenKind::Extends,
                TokenKind::Test,
                TokenKind::Module,
                TokenKind::Nil,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("++ -- ! == != < > <= >= << >> >>>"),
            vec![
                TokenKind::Increment,
                TokenKind::Decrement,
                TokenKind::Bang,
                TokenKind::Equal,
                TokenKind::BangEqual,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::LeftShift,
                TokenKind::RightShift,
                TokenKind::UnsignedShift,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_shift_assign_is_maximal_munch() {
        assert_eq!(
            kinds("a >>= 2"),
            vec![
                TokenKind::Identifier,
                TokenKind::RightShift,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_elvis_versus_ternary() {
        assert_eq!(
            kinds("a ?: b"),
            vec![TokenKind::Identifier, TokenKind::Elvis, TokenKind::Identifier, TokenKind::EOF]
        );
        assert_eq!(
            kinds("c ? a : b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_array_markers() {
        assert_eq!(
            kinds("[] [1]"),
            vec![
                TokenKind::Array,
                TokenKind::ArrayOpen,
                TokenKind::Number,
                TokenKind::ArrayClose,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_string() {
        let mut lexer = Lexer::new(r#""hello\tworld\"""#);
        let token = lexer.next_token().unwrap();

        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.literal, Some(Literal::String("hello\tworld\"".into())));
    }

    #[test]
    fn test_char() {
        let mut lexer = Lexer::new(r"'x' '\n'");

        assert_eq!(lexer.next_token().unwrap().literal, Some(Literal::Char('x')));
        assert_eq!(lexer.next_token().unwrap().literal, Some(Literal::Char('\n')));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n/* block\n comment */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::EOF]
        );
    }

    #[test]
    fn test_positions() {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize("var x;\n  print x;", &mut reporter);

        let print = &tokens[3];
        assert_eq!(print.kind, TokenKind::Print);
        assert_eq!((print.line, print.column), (2, 3));
    }

    #[test]
    fn test_unexpected_character_recovers() {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize("var @ x = 1;", &mut reporter);

        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(reporter.diagnostics()[0].phase, Phase::Lexing);
        assert_eq!(reporter.diagnostics()[0].column, Some(5));
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EOF));
    }

    #[test]
    fn test_unterminated_string() {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize("print \"oops", &mut reporter);

        assert_eq!(reporter.diagnostics()[0].message, "Unterminated string");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EOF));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize("print 1;\n  /* never closed\nprint 2;", &mut reporter);

        assert_eq!(reporter.diagnostics().len(), 1);
        let diagnostic = &reporter.diagnostics()[0];
        assert_eq!(diagnostic.message, "Unterminated block comment");
        assert_eq!((diagnostic.line, diagnostic.column), (2, Some(3)));
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EOF));
    }

    #[test]
    fn test_string_spans_lines() {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize("\"line one\nline two\" x", &mut reporter);

        assert!(!reporter.has_errors());
        assert_eq!(tokens[0].literal, Some(Literal::String("line one\nline two".into())));
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 11));
    }

    #[test]
    fn test_bad_char_literals() {
        let mut reporter = ErrorReporter::new();
        tokenize("'' 'ab' 'c", &mut reporter);

        let messages: Vec<_> = reporter.diagnostics().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Empty character literal",
                "Character literal must hold exactly one character",
                "Unterminated character literal",
            ]
        );
    }
}
