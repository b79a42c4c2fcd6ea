//! HSL Parser
//!
//! Recursive descent parser for HSL. Syntax errors are reported to the
//! [`ErrorReporter`] and the parser resynchronizes at the next statement
//! boundary, so one mistake does not hide the rest of the file.

use crate::diagnostics::{ErrorReporter, Phase};
use crate::lang::ast::*;
use crate::lang::token::{Literal, Token, TokenKind};
use hsl_core::{NodeId, StackBudget};
use std::rc::Rc;

/// Upper bound on declared parameters and call arguments
pub const MAX_ARGUMENTS: usize = 255;

/// Deepest allowed nesting of expressions and statements
pub const MAX_NESTING: usize = 256;

const DEEP_EXPRESSION: &str = "Expression nested too deeply.";
const DEEP_STATEMENT: &str = "Statement nested too deeply.";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
struct ParseError {
    token: Token,
    message: String,
}

type ParseResult<T> = Result<T, Box<ParseError>>;

fn parse_error(token: Token, message: impl Into<String>) -> Box<ParseError> {
    Box::new(ParseError {
        token,
        message: message.into(),
    })
}

/// HSL parser
pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    next_id: NodeId,
    depth: usize,
    stack: StackBudget,
    reporter: &'r mut ErrorReporter,
}

/// Parse a token list into top-level statements
pub fn parse(tokens: Vec<Token>, reporter: &mut ErrorReporter) -> Vec<Stmt> {
    Parser::new(tokens, reporter).parse()
}

impl<'r> Parser<'r> {
    /// Create a new parser
    pub fn new(mut tokens: Vec<Token>, reporter: &'r mut ErrorReporter) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::EOF) {
            let (line, column) = tokens.last().map(|t| (t.line, t.column)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenKind::EOF, "", line, column));
        }

        Self {
            tokens,
            current: 0,
            next_id: NodeId::new(0),
            depth: 0,
            stack: StackBudget::default(),
            reporter,
        }
    }

    /// Parse a script
    pub fn parse(mut self) -> Vec<Stmt> {
        self.stack = StackBudget::new(self.stack.limit());
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => self.recover(err),
            }
        }

        tracing::debug!("Parsed {} top-level statements", statements.len());
        statements
    }

    /// Parse a declaration
    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_token(TokenKind::Class) {
            self.class_declaration()
        } else if self.check(TokenKind::Fun) && self.check_next(TokenKind::Identifier) {
            self.advance();
            let name = self.advance();
            Ok(Stmt::Function(self.function_rest(name, "function")?))
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration()
        } else if self.match_token(TokenKind::Module) {
            self.module_declaration()
        } else {
            self.statement()
        }
    }

    /// Parse a class declaration
    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected class name.")?;

        let superclass = if self.match_token(TokenKind::Extends) {
            let super_name = self.consume(TokenKind::Identifier, "Expected superclass name.")?;
            Some(Expr::Variable {
                name: super_name,
                id: self.node_id(),
            })
        } else {
            None
        };

        self.consume(TokenKind::LBrace, "Expected '{' before class body.")?;

        let mut methods = Vec::new();
        let mut has_constructor = false;

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            self.match_token(TokenKind::Fun);
            let member = self.consume(TokenKind::Identifier, "Expected method name.")?;

            if member.lexeme == name.lexeme {
                if has_constructor {
                    self.error(&member, "A class can only have one constructor.");
                }
                has_constructor = true;

                let init = Token::synthetic(TokenKind::Identifier, INITIALIZER_NAME, &member);
                let function = self.function_rest(init, "constructor")?;
                methods.push(Stmt::Constructor {
                    class_name: member,
                    function,
                });
            } else {
                methods.push(Stmt::Function(self.function_rest(member, "method")?));
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// Parameters and body of a function whose name was already read
    fn function_rest(&mut self, name: Token, kind: &str) -> ParseResult<Rc<FunctionDecl>> {
        self.consume(TokenKind::LParen, &format!("Expected '(' after {} name.", kind))?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expected parameter name.")?);

                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RParen, "Expected ')' after parameters.")?;
        self.consume(TokenKind::LBrace, &format!("Expected '{{' before {} body.", kind))?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected variable name.")?;

        let initializer = if self.match_token(TokenKind::Assign) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn module_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected module name.")?;
        self.consume(TokenKind::Semicolon, "Expected ';' after module name.")?;
        Ok(Stmt::Module { name })
    }

    /// Parse a statement
    fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested(DEEP_STATEMENT, Self::statement_inner)
    }

    fn statement_inner(&mut self) -> ParseResult<Stmt> {
        if self.match_token(TokenKind::Print) {
            self.print_statement()
        } else if self.match_token(TokenKind::If) {
            self.if_statement()
        } else if self.match_token(TokenKind::While) {
            self.while_statement()
        } else if self.match_token(TokenKind::Do) {
            self.do_while_statement()
        } else if self.match_token(TokenKind::For) {
            self.for_statement()
        } else if self.match_token(TokenKind::Repeat) {
            self.repeat_statement()
        } else if self.match_token(TokenKind::Return) {
            self.return_statement()
        } else if self.match_token(TokenKind::Break) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Semicolon, "Expected ';' after 'break'.")?;
            Ok(Stmt::Break { keyword })
        } else if self.match_token(TokenKind::Continue) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Semicolon, "Expected ';' after 'continue'.")?;
            Ok(Stmt::Continue { keyword })
        } else if self.match_token(TokenKind::Test) {
            self.test_statement()
        } else if self.match_token(TokenKind::LBrace) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    /// Parse an if statement
    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LParen, "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// Parse a while statement
    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn do_while_statement(&mut self) -> ParseResult<Stmt> {
        let body = Box::new(self.statement()?);
        self.consume(TokenKind::While, "Expected 'while' after do body.")?;
        self.consume(TokenKind::LParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
        self.consume(TokenKind::Semicolon, "Expected ';' after do-while loop.")?;

        Ok(Stmt::DoWhile { body, condition })
    }

    /// Parse a for statement
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LParen, "Expected '(' after 'for'.")?;

        let init = if self.match_token(TokenKind::Semicolon) {
            None
        } else if self.match_token(TokenKind::Var) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RParen, "Expected ')' after for clauses.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For {
            init,
            condition,
            increment,
            body,
        })
    }

    fn repeat_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        self.consume(TokenKind::LParen, "Expected '(' after 'repeat'.")?;
        let count = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after repeat count.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::Repeat { keyword, count, body })
    }

    /// Parse a return statement
    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expected ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn test_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let name_token = self.consume(TokenKind::String, "Expected test name string.")?;
        let name = match name_token.literal {
            Some(Literal::String(name)) => name,
            _ => name_token.lexeme,
        };

        self.consume(TokenKind::LBrace, "Expected '{' before test body.")?;
        let body = self.block()?;

        Ok(Stmt::Test { keyword, name, body })
    }

    /// Statements up to the closing brace; the opening brace is already consumed
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.nested(DEEP_STATEMENT, Self::block_inner)
    }

    fn block_inner(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => self.recover(err),
            }
        }

        self.consume(TokenKind::RBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    /// Parse an expression statement
    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    /// Parse an expression
    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(DEEP_EXPRESSION, Self::assignment)
    }

    /// Parse assignment expression
    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.conditional()?;

        if self.match_token(TokenKind::Assign) {
            let equals = self.previous().clone();
            let value = Box::new(self.expression()?);

            return Ok(match expr {
                Expr::Variable { name, .. } => Expr::Assign {
                    name,
                    value,
                    id: self.node_id(),
                },
                Expr::Get { object, name } => Expr::Set { object, name, value },
                Expr::Index {
                    object,
                    bracket,
                    index,
                } => Expr::SetIndex {
                    object,
                    bracket,
                    index,
                    value,
                },
                other => {
                    self.error(&equals, "Invalid assignment target.");
                    other
                }
            });
        }

        Ok(expr)
    }

    /// Ternary and elvis, both right-associative
    fn conditional(&mut self) -> ParseResult<Expr> {
        let expr = self.binary(1)?;

        if self.match_token(TokenKind::Question) {
            let then_branch = self.expression()?;
            self.consume(TokenKind::Colon, "Expected ':' in conditional expression.")?;
            let else_branch = self.nested(DEEP_EXPRESSION, Self::conditional)?;
            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        if self.match_token(TokenKind::Elvis) {
            let right = self.nested(DEEP_EXPRESSION, Self::conditional)?;
            return Ok(Expr::Elvis {
                left: Box::new(expr),
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Binary and logical operators by precedence climbing. Operators binding
    /// at least as tightly as `min_precedence` are consumed here; every level
    /// is left-associative.
    fn binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while let Some(precedence) = binding_power(self.peek().kind).filter(|&p| p >= min_precedence) {
            let operator = self.advance();
            let right = Box::new(self.binary(precedence + 1)?);
            let left = Box::new(expr);

            expr = match operator.kind {
                TokenKind::Or => Expr::Logical {
                    left,
                    op: LogicalOp::Or,
                    right,
                },
                TokenKind::Xor => Expr::Logical {
                    left,
                    op: LogicalOp::Xor,
                    right,
                },
                TokenKind::And => Expr::Logical {
                    left,
                    op: LogicalOp::And,
                    right,
                },
                kind => {
                    let op = BinaryOp::from_kind(kind).ok_or_else(|| {
                        parse_error(operator.clone(), format!("Unexpected operator {}.", operator))
                    })?;
                    Expr::Binary {
                        left,
                        op,
                        operator,
                        right,
                    }
                }
            };
        }

        Ok(expr)
    }

    /// Parse unary expression
    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_tokens(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let op = match operator.kind {
                TokenKind::Bang => UnaryOp::Not,
                _ => UnaryOp::Negate,
            };
            let operand = self.nested(DEEP_EXPRESSION, Self::unary)?;
            return Ok(Expr::Unary {
                op,
                operator,
                operand: Box::new(operand),
            });
        }

        if self.match_tokens(&[TokenKind::Increment, TokenKind::Decrement]) {
            let operator = self.previous().clone();
            let target = self.nested(DEEP_EXPRESSION, Self::unary)?;
            if !is_assignable(&target) {
                return Err(parse_error(operator, "Invalid increment target."));
            }
            return Ok(Expr::Update {
                op: update_op(operator.kind),
                operator,
                target: Box::new(target),
                prefix: true,
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.call()?;

        if is_assignable(&expr) && self.match_tokens(&[TokenKind::Increment, TokenKind::Decrement]) {
            let operator = self.previous().clone();
            return Ok(Expr::Update {
                op: update_op(operator.kind),
                operator,
                target: Box::new(expr),
                prefix: false,
            });
        }

        Ok(expr)
    }

    /// Parse function call, member access or indexing
    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(TokenKind::LParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(TokenKind::Dot) {
                let name = self.consume(TokenKind::Identifier, "Expected property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.match_token(TokenKind::ArrayOpen) {
                let bracket = self.previous().clone();
                let index = self.expression()?;
                self.consume(TokenKind::ArrayClose, "Expected ']' after index.")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    bracket,
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = Vec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                if args.len() >= MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 arguments.");
                }
                args.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RParen, "Expected ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    /// Parse primary expression
    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.advance();

        match token.kind {
            TokenKind::True => Ok(Expr::Literal(LiteralValue::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(LiteralValue::Bool(false))),
            TokenKind::Nil | TokenKind::None => Ok(Expr::Literal(LiteralValue::Nil)),

            TokenKind::Number | TokenKind::String | TokenKind::Char => match token.literal {
                Some(Literal::Number(n)) => Ok(Expr::Literal(LiteralValue::Number(n))),
                Some(Literal::String(s)) => Ok(Expr::Literal(LiteralValue::String(s))),
                Some(Literal::Char(c)) => Ok(Expr::Literal(LiteralValue::Char(c))),
                None => Err(parse_error(token.clone(), format!("Malformed literal {}.", token))),
            },

            TokenKind::This => Ok(Expr::This {
                keyword: token,
                id: self.node_id(),
            }),

            TokenKind::Super => {
                self.consume(TokenKind::Dot, "Expected '.' after 'super'.")?;
                let method = self.consume(TokenKind::Identifier, "Expected superclass method name.")?;
                Ok(Expr::Super {
                    keyword: token,
                    method,
                    id: self.node_id(),
                })
            }

            TokenKind::Identifier => Ok(Expr::Variable {
                name: token,
                id: self.node_id(),
            }),

            TokenKind::LParen => {
                let expr = self.expression()?;
                self.consume(TokenKind::RParen, "Expected ')' after expression.")?;
                Ok(Expr::Grouping(Box::new(expr)))
            }

            TokenKind::ArrayOpen => {
                let mut elements = Vec::new();
                if !self.check(TokenKind::ArrayClose) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_token(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::ArrayClose, "Expected ']' after array elements.")?;
                Ok(Expr::Array {
                    bracket: token,
                    elements,
                })
            }

            TokenKind::Array => Ok(Expr::Array {
                bracket: token,
                elements: Vec::new(),
            }),

            TokenKind::Fun => {
                let name = Token::synthetic(TokenKind::Identifier, "<lambda>", &token);
                Ok(Expr::Lambda(self.function_rest(name, "'fun'")?))
            }

            _ => {
                // Leave the offending token for resynchronization
                if token.kind != TokenKind::EOF {
                    self.current -= 1;
                }
                Err(parse_error(token, "Expected expression."))
            }
        }
    }

    fn node_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// Run `parse` one nesting level deeper, refusing once the nesting limit
    /// or the stack budget is reached
    fn nested<T>(
        &mut self,
        message: &str,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= MAX_NESTING || self.stack.exhausted() {
            return Err(parse_error(self.peek().clone(), message));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Report a parse error and skip to the next statement boundary
    fn recover(&mut self, err: Box<ParseError>) {
        self.reporter.error(Phase::Parsing, &err.token, err.message);
        self.synchronize();
    }

    /// Report without unwinding
    fn error(&mut self, token: &Token, message: &str) {
        self.reporter.error(Phase::Parsing, token, message);
    }

    /// Discard tokens until just after a ';' or before a statement keyword or '}'
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            let next = self.peek().kind;
            if next.starts_statement() || next == TokenKind::RBrace {
                return;
            }
            self.advance();
        }
    }

    /// Check if current token matches
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .map_or(false, |token| token.kind == kind)
    }

    /// Match token and advance
    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    /// Match any of multiple tokens
    fn match_tokens(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.match_token(kind))
    }

    /// Consume a specific token or error
    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        Err(parse_error(self.peek().clone(), message))
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::EOF
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    /// Get previous token
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Advance to next token, returning the consumed one
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }
}

/// Precedence of a binary or logical operator, loosest first
fn binding_power(kind: TokenKind) -> Option<u8> {
    let precedence = match kind {
        TokenKind::Or | TokenKind::Xor => 1,
        TokenKind::And => 2,
        TokenKind::Equal | TokenKind::BangEqual => 3,
        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => 4,
        TokenKind::LeftShift | TokenKind::RightShift | TokenKind::UnsignedShift => 5,
        TokenKind::Minus | TokenKind::Plus => 6,
        TokenKind::Slash | TokenKind::Star | TokenKind::Percent => 7,
        _ => return None,
    };
    Some(precedence)
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr, Expr::Variable { .. } | Expr::Get { .. } | Expr::Index { .. })
}

fn update_op(kind: TokenKind) -> UpdateOp {
    match kind {
        TokenKind::Decrement => UpdateOp::Decrement,
        _ => UpdateOp::Increment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Vec<Stmt>, ErrorReporter) {
        let mut reporter = ErrorReporter::new();
        let tokens = tokenize(source, &mut reporter);
        let statements = parse(tokens, &mut reporter);
        (statements, reporter)
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        let (statements, reporter) = parse_source(source);
        assert!(!reporter.has_errors(), "unexpected diagnostics: {:?}", reporter.diagnostics());
        statements
    }

    fn printed(source: &str) -> String {
        print_program(&parse_ok(source))
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_ok("42;").len(), 1);
    }

    #[test]
    fn test_parse_function() {
        let statements = parse_ok("fun foo(a, b) { return a + b; }");
        match &statements[0] {
            Stmt::Function(function) => {
                assert_eq!(function.name.lexeme, "foo");
                assert_eq!(function.params.len(), 2);
                assert_eq!(function.body.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_class_with_inheritance() {
        let statements = parse_ok("class Derived extends Base { method() { return 42; } }");
        match &statements[0] {
            Stmt::Class {
                superclass, methods, ..
            } => {
                assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "Base"));
                assert_eq!(methods.len(), 1);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_constructor_gets_reserved_name() {
        let statements = parse_ok("class Point { Point(x, y) { this.x = x; } fun len() { return 0; } }");
        let Stmt::Class { methods, .. } = &statements[0] else {
            panic!("expected class");
        };
        match &methods[0] {
            Stmt::Constructor { class_name, function } => {
                assert_eq!(class_name.lexeme, "Point");
                assert_eq!(function.name.lexeme, INITIALIZER_NAME);
                assert_eq!(function.params.len(), 2);
            }
            other => panic!("expected constructor, got {:?}", other),
        }
        assert!(matches!(&methods[1], Stmt::Function(f) if f.name.lexeme == "len"));
    }

    #[test]
    fn test_duplicate_constructor() {
        let (_, reporter) = parse_source("class A { A() {} A(x) {} }");
        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(reporter.diagnostics()[0].message, "A class can only have one constructor.");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(printed("print 1 + 2 * 3 - 4;"), "print ((1 + (2 * 3)) - 4);");
        assert_eq!(printed("print 1 << 2 + 3 < 4;"), "print ((1 << (2 + 3)) < 4);");
        assert_eq!(printed("print a or b and c == d;"), "print (a or (b and (c == d)));");
        assert_eq!(printed("print a xor b or c;"), "print ((a xor b) or c);");
        assert_eq!(printed("print -a.b(c)[0];"), "print (-a.b(c)[0]);");
        assert_eq!(printed("print !++x;"), "print (!(++x));");
    }

    #[test]
    fn test_conditionals_bind_loosest() {
        assert_eq!(printed("x = a or b ? c : d;"), "x = ((a or b) ? c : d);");
        assert_eq!(printed("x = a ?: b ?: c;"), "x = (a ?: (b ?: c));");
        assert_eq!(printed("x = a ? b : c ? d : e;"), "x = (a ? b : (c ? d : e));");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 3;"), "a = b = 3;");
        let statements = parse_ok("a = b = 3;");
        let Stmt::Expression(Expr::Assign { value, .. }) = &statements[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(value.as_ref(), Expr::Assign { .. }));
    }

    #[test]
    fn test_set_expression_from_property_target() {
        let statements = parse_ok("a.b.c = 1;");
        match &statements[0] {
            Stmt::Expression(Expr::Set { object, name, .. }) => {
                assert_eq!(name.lexeme, "c");
                assert!(matches!(object.as_ref(), Expr::Get { .. }));
            }
            other => panic!("expected set, got {:?}", other),
        }
        assert!(matches!(
            &parse_ok("xs[0] = 1;")[0],
            Stmt::Expression(Expr::SetIndex { .. })
        ));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let (statements, reporter) = parse_source("1 + 2 = 3; print 4;");
        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(reporter.diagnostics()[0].message, "Invalid assignment target.");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_recovery_after_bad_var() {
        let (statements, reporter) = parse_source("var = ;\nprint 1;");
        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(reporter.diagnostics()[0].phase, Phase::Parsing);
        assert_eq!(reporter.diagnostics()[0].message, "Expected variable name.");
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));
    }

    #[test]
    fn test_recovery_inside_block() {
        let (statements, reporter) = parse_source("{ print ; print 2; }\nprint 3;");
        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(statements.len(), 2);
        let Stmt::Block(inner) = &statements[0] else {
            panic!("expected block");
        };
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_multiple_errors_reported() {
        let (_, reporter) = parse_source("var = 1;\nprint (;\nvar ok = 2;\nif x) print 1;");
        assert_eq!(reporter.diagnostics().len(), 3);
        let lines: Vec<_> = reporter.diagnostics().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_missing_semicolon_at_eof() {
        let (_, reporter) = parse_source("print 1");
        assert_eq!(reporter.diagnostics()[0].message, "Expected ';' after value.");
        assert_eq!(reporter.diagnostics()[0].lexeme, None);
    }

    #[test]
    fn test_statement_forms() {
        let source = r#"
module demo;
var i = 0;
while (i < 3) i = i + 1;
do { i--; } while (i > 0);
for (var j = 0; j < 2; j++) { continue; }
repeat (3) { break; }
if (i) print "yes"; else print "no";
test "adds" { print 1 + 1; }
"#;
        let statements = parse_ok(source);
        assert_eq!(statements.len(), 8);
        assert!(matches!(&statements[0], Stmt::Module { name } if name.lexeme == "demo"));
        assert!(matches!(&statements[3], Stmt::DoWhile { .. }));
        assert!(matches!(&statements[5], Stmt::Repeat { .. }));
        assert!(matches!(&statements[7], Stmt::Test { name, .. } if name == "adds"));
    }

    #[test]
    fn test_lambda_and_arrays() {
        assert_eq!(
            printed("var f = fun (a) { return [a, []]; };"),
            "var f = fun (a) { return [a, []]; };"
        );
    }

    #[test]
    fn test_invalid_increment_target() {
        let (_, reporter) = parse_source("++1;");
        assert_eq!(reporter.diagnostics()[0].message, "Invalid increment target.");
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let depth = 10_000;
        let source = format!("print {}1{};\nprint 2;", "(".repeat(depth), ")".repeat(depth));
        let (statements, reporter) = parse_source(&source);

        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(reporter.diagnostics()[0].message, "Expression nested too deeply.");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].to_string(), "print 2;");
    }

    #[test]
    fn test_long_unary_chain_is_rejected() {
        let source = format!("print {}1;", "-".repeat(10_000));
        let (_, reporter) = parse_source(&source);
        assert_eq!(reporter.diagnostics()[0].message, "Expression nested too deeply.");
    }

    #[test]
    fn test_deep_statements_are_rejected() {
        let source = format!("{}print 1;", "if (true) ".repeat(5_000));
        let (_, reporter) = parse_source(&source);
        assert!(reporter.has_errors());
        assert_eq!(reporter.diagnostics()[0].message, "Statement nested too deeply.");
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = format!("print {}1{};", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse_ok(&source).len(), 1);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let source = r#"
class Counter extends Base {
    Counter(start) { this.n = start; }
    fun bump() { this.n++; return this.n >> 1; }
}
fun make(x) { return fun (y) { return (x = x + y) * 2 ?: -x; }; }
for (var i = 0; i < 10; ++i) { if (!(i % 2 == 0) xor i > 5) print i; else continue; }
var s = "tab\there" + 'c' + [1, 2][0];
"#;
        let once = printed(source);
        let twice = printed(&once);
        assert_eq!(once, twice);
    }
}
