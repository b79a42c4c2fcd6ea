//! Static scope resolution
//!
//! Walks the tree once before execution. Every local variable reference gets
//! the number of scopes between its use and its declaration, so the
//! interpreter can jump straight to the right environment. Misplaced
//! `return`/`break`/`continue`/`this`/`super` and bad declarations are
//! reported as resolving diagnostics.

use crate::diagnostics::{ErrorReporter, Phase};
use crate::lang::ast::{Expr, FunctionDecl, Stmt};
use crate::lang::token::Token;
use hsl_core::NodeId;
use std::collections::{BTreeSet, HashMap};

/// Output of a resolve pass
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Scope distance of every resolved local reference
    pub locals: HashMap<NodeId, usize>,
    /// Names declared at the top level of the script
    pub declarations: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Resolve `statements`, reporting problems to `reporter`
pub fn resolve(statements: &[Stmt], reporter: &mut ErrorReporter) -> Resolution {
    let mut resolver = Resolver::new(reporter);
    resolver.resolve_statements(statements);
    tracing::debug!(
        "Resolved {} local references, {} top-level declarations",
        resolver.resolution.locals.len(),
        resolver.resolution.declarations.len()
    );
    resolver.resolution
}

struct Resolver<'r> {
    /// Local scopes only; an empty stack means global scope
    scopes: Vec<HashMap<String, bool>>,
    resolution: Resolution,
    function: FunctionKind,
    class: ClassKind,
    loop_depth: usize,
    in_test: bool,
    reporter: &'r mut ErrorReporter,
}

impl<'r> Resolver<'r> {
    fn new(reporter: &'r mut ErrorReporter) -> Self {
        Self {
            scopes: Vec::new(),
            resolution: Resolution::default(),
            function: FunctionKind::None,
            class: ClassKind::None,
            loop_depth: 0,
            in_test: false,
            reporter,
        }
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
                self.resolve_expr(condition);
                self.resolve_loop_body(body);
            }

            Stmt::For {
                init,
                condition,
                increment,
                body,
            } => {
                self.begin_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(condition) = condition {
                    self.resolve_expr(condition);
                }
                if let Some(increment) = increment {
                    self.resolve_expr(increment);
                }
                self.resolve_loop_body(body);
                self.end_scope();
            }

            Stmt::Repeat { count, body, .. } => {
                self.resolve_expr(count);
                self.resolve_loop_body(body);
            }

            Stmt::Function(function) => {
                self.declare(&function.name);
                self.define(&function.name);
                self.resolve_function(function, FunctionKind::Function);
            }

            Stmt::Constructor { function, .. } => {
                self.resolve_function(function, FunctionKind::Initializer);
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),

            Stmt::Return { keyword, value } => {
                if self.in_test {
                    self.error(keyword, "Can't return from a test block.");
                }
                if let Some(value) = value {
                    if self.function == FunctionKind::Initializer {
                        self.error(keyword, "Can't return a value from a constructor.");
                    }
                    self.resolve_expr(value);
                }
            }

            Stmt::Break { keyword } => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Can't use 'break' outside of a loop.");
                }
            }

            Stmt::Continue { keyword } => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Can't use 'continue' outside of a loop.");
                }
            }

            Stmt::Test { body, .. } => {
                let enclosing_test = std::mem::replace(&mut self.in_test, true);
                let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
                self.begin_scope();
                self.resolve_statements(body);
                self.end_scope();
                self.loop_depth = enclosing_loops;
                self.in_test = enclosing_test;
            }

            Stmt::Module { .. } => {}
        }
    }

    fn resolve_loop_body(&mut self, body: &Stmt) {
        self.loop_depth += 1;
        self.resolve_stmt(body);
        self.loop_depth -= 1;
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Stmt]) {
        let enclosing_class = self.class;
        self.class = ClassKind::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }
            self.class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define_name("super");
        }

        self.begin_scope();
        self.define_name("this");

        for method in methods {
            match method {
                Stmt::Function(function) => self.resolve_function(function, FunctionKind::Method),
                Stmt::Constructor { function, .. } => {
                    self.resolve_function(function, FunctionKind::Initializer)
                }
                other => self.resolve_stmt(other),
            }
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.class = enclosing_class;
    }

    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = std::mem::replace(&mut self.function, kind);
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        let enclosing_test = std::mem::replace(&mut self.in_test, false);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&function.body);
        self.end_scope();

        self.in_test = enclosing_test;
        self.loop_depth = enclosing_loops;
        self.function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Variable { name, id } => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    .map_or(false, |defined| !defined);
                if in_own_initializer {
                    self.error(name, "Can't read local variable in its own initializer.");
                }
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Assign { name, value, id } => {
                self.resolve_expr(value);
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Binary { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Elvis { left, right } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Unary { operand, .. } => self.resolve_expr(operand),

            Expr::Update { target, .. } => self.resolve_expr(target),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::Index { object, index, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }

            Expr::SetIndex {
                object, index, value, ..
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }

            Expr::Array { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }

            Expr::This { keyword, id } => {
                if self.class == ClassKind::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, "this");
            }

            Expr::Super { keyword, id, .. } => {
                match self.class {
                    ClassKind::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassKind::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, "super");
            }

            Expr::Lambda(function) => self.resolve_function(function, FunctionKind::Function),
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.resolution.locals.insert(id, depth);
                return;
            }
        }
        // Not found: global
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let duplicate = match self.scopes.last_mut() {
            None => {
                self.resolution.declarations.insert(name.lexeme.clone());
                false
            }
            Some(scope) => scope.insert(name.lexeme.clone(), false).is_some(),
        };

        if duplicate {
            self.error(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &Token) {
        self.define_name(&name.lexeme);
    }

    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.reporter.error(Phase::Resolving, token, message);
    }
}
