//! Tree-walking interpreter
//!
//! Statements produce a [`Flow`] telling the enclosing loop or call whether to
//! keep going, while expressions produce a [`Value`]. The first runtime error
//! unwinds everything and becomes the evaluation's outcome.

use crate::context::TestOutcome;
use crate::diagnostics::{ErrorReporter, Phase};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::lang::ast::{
    BinaryOp, Expr, FunctionDecl, LiteralValue, LogicalOp, Stmt, UnaryOp, UpdateOp,
    INITIALIZER_NAME,
};
use crate::lang::token::Token;
use crate::runtime::environment::{Env, Environment};
use crate::runtime::output::OutputSink;
use crate::runtime::value::{Arity, Class, Function, Instance, NativeFunction, Value};
use hsl_config::EngineConfig;
use hsl_core::{NodeId, StackBudget};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// Captured environments tracked before dead entries are pruned
const CAPTURE_PRUNE_MIN: usize = 64;

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    /// `break` at the given line
    Break(usize),
    /// `continue` at the given line
    Continue(usize),
}

type Exec = Result<Flow, RuntimeError>;
type Eval = Result<Value, RuntimeError>;

/// Evaluates a parsed program against a global environment
pub struct Interpreter {
    globals: Env,
    environment: Env,
    locals: HashMap<NodeId, usize>,
    resolved: bool,
    output: Arc<dyn OutputSink>,
    depth: usize,
    max_depth: usize,
    stack: StackBudget,
    /// Environments closures were created over
    captured: Vec<Weak<RefCell<Environment>>>,
    prune_at: usize,
    trace_statements: bool,
    tests: Vec<TestOutcome>,
    module_name: Option<String>,
}

impl Interpreter {
    pub fn new(output: Arc<dyn OutputSink>, config: &EngineConfig) -> Self {
        let globals = Environment::new_global();
        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            resolved: false,
            output,
            depth: 0,
            max_depth: config.max_call_depth,
            stack: StackBudget::new(config.max_stack_kib.saturating_mul(1024)),
            captured: Vec::new(),
            prune_at: CAPTURE_PRUNE_MIN,
            trace_statements: config.trace_statements,
            tests: Vec::new(),
            module_name: None,
        }
    }

    /// Use resolver distances; unresolved names are then treated as globals
    pub fn set_resolution(&mut self, locals: HashMap<NodeId, usize>) {
        self.locals = locals;
        self.resolved = true;
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    pub fn define_native(&mut self, native: NativeFunction) {
        let name = native.name.clone();
        self.define_global(&name, Value::Native(Rc::new(native)));
    }

    pub fn tests(&self) -> &[TestOutcome] {
        &self.tests
    }

    pub fn take_tests(&mut self) -> Vec<TestOutcome> {
        std::mem::take(&mut self.tests)
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Run a whole program. A top-level `return` ends it with that value.
    pub fn interpret(
        &mut self,
        statements: &[Stmt],
        reporter: &mut ErrorReporter,
    ) -> Result<Option<Value>, RuntimeError> {
        match self.run_program(statements) {
            Ok(result) => Ok(result),
            Err(err) => {
                reporter.error(Phase::Interpreting, &err, err.to_string());
                Err(err)
            }
        }
    }

    fn run_program(&mut self, statements: &[Stmt]) -> Result<Option<Value>, RuntimeError> {
        self.stack = StackBudget::new(self.stack.limit());

        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                Flow::Return(value) => return Ok(Some(value)),
                Flow::Break(line) => {
                    return Err(RuntimeError::at_line(RuntimeErrorKind::StrayControl("break"), line))
                }
                Flow::Continue(line) => {
                    return Err(RuntimeError::at_line(
                        RuntimeErrorKind::StrayControl("continue"),
                        line,
                    ))
                }
            }
        }
        Ok(None)
    }

    // ---- statements ----

    fn execute(&mut self, stmt: &Stmt) -> Exec {
        if self.trace_statements {
            tracing::trace!(statement = %stmt, "execute");
        }

        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.output.write_line(&value.to_string());
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::new_enclosed(self.environment.clone());
                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Break(_) => break,
                        Flow::Normal | Flow::Continue(_) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::DoWhile { body, condition } => {
                loop {
                    match self.execute(body)? {
                        Flow::Break(_) => break,
                        Flow::Normal | Flow::Continue(_) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    if !self.evaluate(condition)?.is_truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::For {
                init,
                condition,
                increment,
                body,
            } => {
                let env = Environment::new_enclosed(self.environment.clone());
                let previous = std::mem::replace(&mut self.environment, env);
                let result = self.run_for(init.as_deref(), condition.as_ref(), increment.as_ref(), body);
                self.environment = previous;
                result
            }

            Stmt::Repeat {
                keyword,
                count,
                body,
            } => {
                let times = match self.evaluate(count)? {
                    Value::Number(n) if n.is_finite() => n.max(0.0).floor() as u64,
                    other => {
                        return Err(RuntimeError::new(
                            RuntimeErrorKind::TypeMismatch(format!(
                                "Repeat count must be a finite number, got {}.",
                                other.type_name()
                            )),
                            keyword,
                        ))
                    }
                };
                for _ in 0..times {
                    match self.execute(body)? {
                        Flow::Break(_) => break,
                        Flow::Normal | Flow::Continue(_) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                let closure = self.environment.clone();
                self.capture(&closure);
                let function = Function::new(declaration.clone(), closure, false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            // Only meaningful as a class member
            Stmt::Constructor { .. } => Ok(Flow::Normal),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods)?;
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Break { keyword } => Ok(Flow::Break(keyword.line)),

            Stmt::Continue { keyword } => Ok(Flow::Continue(keyword.line)),

            Stmt::Test { keyword, name, body } => {
                self.run_test(keyword, name, body);
                Ok(Flow::Normal)
            }

            Stmt::Module { name } => {
                self.module_name = Some(name.lexeme.clone());
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` in `env`, restoring the current environment however they finish
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> Exec {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Exec {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn run_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> Exec {
        if let Some(init) = init {
            self.execute(init)?;
        }

        loop {
            if let Some(condition) = condition {
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            }

            match self.execute(body)? {
                Flow::Break(_) => break,
                Flow::Normal | Flow::Continue(_) => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }

            if let Some(increment) = increment {
                self.evaluate(increment)?;
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
    ) -> Result<(), RuntimeError> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::TypeMismatch(format!(
                            "Superclass must be a class, got {}.",
                            other.type_name()
                        )),
                        name,
                    ))
                }
            },
            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let closure = match &superclass {
            Some(superclass) => {
                let env = Environment::new_enclosed(self.environment.clone());
                env.borrow_mut().define("super", Value::Class(superclass.clone()));
                env
            }
            None => self.environment.clone(),
        };
        self.capture(&closure);

        let mut table = HashMap::new();
        for method in methods {
            match method {
                Stmt::Function(declaration) => {
                    let function = Function::new(declaration.clone(), closure.clone(), false);
                    table.insert(declaration.name.lexeme.clone(), Rc::new(function));
                }
                Stmt::Constructor { function, .. } => {
                    let function = Function::new(function.clone(), closure.clone(), true);
                    table.insert(INITIALIZER_NAME.to_string(), Rc::new(function));
                }
                _ => {}
            }
        }

        let class = Class {
            name: name.lexeme.clone(),
            superclass,
            methods: table,
        };
        tracing::trace!("Declared class {}", class.name);

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(Rc::new(class)));
        Ok(())
    }

    fn run_test(&mut self, keyword: &Token, name: &str, body: &[Stmt]) {
        let env = Environment::new_enclosed(self.environment.clone());
        let result = match self.execute_block(body, env) {
            Ok(Flow::Normal) => Ok(()),
            Ok(Flow::Return(_)) => Err(RuntimeError::new(RuntimeErrorKind::ReturnFromTest, keyword)),
            Ok(Flow::Break(line)) => Err(RuntimeError::at_line(RuntimeErrorKind::StrayControl("break"), line)),
            Ok(Flow::Continue(line)) => Err(RuntimeError::at_line(
                RuntimeErrorKind::StrayControl("continue"),
                line,
            )),
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(()) => TestOutcome::passed(name),
            Err(err) => TestOutcome::failed(name, format!("line {}: {}", err.line, err)),
        };

        if outcome.passed {
            tracing::debug!("Test '{}' passed", name);
        } else {
            tracing::debug!("Test '{}' failed", name);
        }
        self.tests.push(outcome);
    }

    // ---- expressions ----

    fn evaluate(&mut self, expr: &Expr) -> Eval {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::string(s),
                LiteralValue::Char(c) => Value::string(c.to_string()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { name, id } => self.look_up(name, *id),

            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;
                self.assign_variable(name, *id, value.clone())?;
                Ok(value)
            }

            Expr::Binary {
                left,
                op,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, operator, left, right)
            }

            Expr::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                match op {
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And | LogicalOp::Or => self.evaluate(right),
                    LogicalOp::Xor => {
                        let right = self.evaluate(right)?;
                        Ok(Value::Bool(left.is_truthy() != right.is_truthy()))
                    }
                }
            }

            Expr::Unary {
                op,
                operator,
                operand,
            } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Negate => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(type_error(
                            operator,
                            format!("Operand of '-' must be a number, got {}.", other.type_name()),
                        )),
                    },
                }
            }

            Expr::Update {
                op,
                operator,
                target,
                prefix,
            } => self.update(*op, operator, target, *prefix),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Elvis { left, right } => match self.evaluate(left)? {
                Value::Nil => self.evaluate(right),
                value => Ok(value),
            },

            Expr::Call {
                callee,
                paren,
                args,
            } => {
                let callee = self.evaluate(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg)?);
                }
                self.call(callee, values, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, &name.lexeme).ok_or_else(|| {
                    RuntimeError::new(RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()), name)
                }),
                _ => Err(RuntimeError::new(RuntimeErrorKind::NotAnInstance("properties"), name)),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(RuntimeErrorKind::NotAnInstance("fields"), name));
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::Index {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_get(&object, &index, bracket)
            }

            Expr::SetIndex {
                object,
                bracket,
                index,
                value,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                index_set(&object, &index, value.clone(), bracket)?;
                Ok(value)
            }

            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::array(values))
            }

            Expr::This { keyword, id } => self.look_up(keyword, *id),

            Expr::Super {
                keyword,
                method,
                id,
            } => self.super_method(keyword, method, *id),

            Expr::Lambda(declaration) => Ok(self.closure(declaration)),
        }
    }

    fn closure(&mut self, declaration: &Rc<FunctionDecl>) -> Value {
        let closure = self.environment.clone();
        self.capture(&closure);
        Value::Function(Rc::new(Function::new(declaration.clone(), closure, false)))
    }

    /// Remember `env` so it can be emptied when the interpreter is dropped
    fn capture(&mut self, env: &Env) {
        if self
            .captured
            .last()
            .is_some_and(|last| last.as_ptr() == Rc::as_ptr(env))
        {
            return;
        }
        if self.captured.len() >= self.prune_at {
            self.captured.retain(|weak| weak.strong_count() > 0);
            self.prune_at = (self.captured.len() * 2).max(CAPTURE_PRUNE_MIN);
        }
        self.captured.push(Rc::downgrade(env));
    }

    fn look_up(&self, name: &Token, id: NodeId) -> Eval {
        let value = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None if self.resolved => self.globals.borrow().get(&name.lexeme),
            None => self.environment.borrow().get(&name.lexeme),
        };
        value.ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()), name)
        })
    }

    fn assign_variable(&self, name: &Token, id: NodeId, value: Value) -> Result<(), RuntimeError> {
        let assigned = match self.locals.get(&id) {
            Some(&distance) => Environment::assign_at(&self.environment, distance, &name.lexeme, value),
            None if self.resolved => self.globals.borrow_mut().assign(&name.lexeme, value),
            None => self.environment.borrow_mut().assign(&name.lexeme, value),
        };
        if assigned {
            Ok(())
        } else {
            Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
                name,
            ))
        }
    }

    fn super_method(&self, keyword: &Token, method: &Token, id: NodeId) -> Eval {
        let (superclass, this) = match self.locals.get(&id) {
            Some(&distance) => (
                Environment::get_at(&self.environment, distance, "super"),
                distance
                    .checked_sub(1)
                    .and_then(|d| Environment::get_at(&self.environment, d, "this")),
            ),
            None => {
                let env = self.environment.borrow();
                (env.get("super"), env.get("this"))
            }
        };

        let (Some(Value::Class(superclass)), Some(Value::Instance(instance))) = (superclass, this) else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedVariable("super".to_string()),
                keyword,
            ));
        };

        // `super.Parent(...)` runs the superclass constructor
        let name = if method.lexeme == superclass.name {
            INITIALIZER_NAME
        } else {
            method.lexeme.as_str()
        };
        let function = superclass.find_method(name).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorKind::UndefinedProperty(method.lexeme.clone()), method)
        })?;
        Ok(Value::Function(Rc::new(function.bind(instance))))
    }

    fn update(&mut self, op: UpdateOp, operator: &Token, target: &Expr, prefix: bool) -> Eval {
        let delta = match op {
            UpdateOp::Increment => 1.0,
            UpdateOp::Decrement => -1.0,
        };
        let step = |old: Value| -> Result<(f64, f64), RuntimeError> {
            match old {
                Value::Number(n) => Ok((n, n + delta)),
                other => Err(type_error(
                    operator,
                    format!(
                        "Operand of '{}' must be a number, got {}.",
                        op.symbol(),
                        other.type_name()
                    ),
                )),
            }
        };

        let (old, new) = match target {
            Expr::Variable { name, id } => {
                let (old, new) = step(self.look_up(name, *id)?)?;
                self.assign_variable(name, *id, Value::Number(new))?;
                (old, new)
            }
            Expr::Get { object, name } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(RuntimeErrorKind::NotAnInstance("fields"), name));
                };
                let current = Instance::get(&instance, &name.lexeme).ok_or_else(|| {
                    RuntimeError::new(RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()), name)
                })?;
                let (old, new) = step(current)?;
                instance.borrow_mut().set(&name.lexeme, Value::Number(new));
                (old, new)
            }
            Expr::Index {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let (old, new) = step(index_get(&object, &index, bracket)?)?;
                index_set(&object, &index, Value::Number(new), bracket)?;
                (old, new)
            }
            _ => {
                return Err(type_error(
                    operator,
                    format!("Invalid operand for '{}'.", op.symbol()),
                ))
            }
        };

        Ok(Value::Number(if prefix { new } else { old }))
    }

    // ---- calls ----

    fn call(&mut self, callee: Value, args: Vec<Value>, paren: &Token) -> Eval {
        match callee {
            Value::Function(function) => {
                check_arity(Arity::Exact(function.arity()), args.len(), paren)?;
                self.call_function(&function, args, paren)
            }

            Value::Native(native) => {
                check_arity(native.arity, args.len(), paren)?;
                native
                    .call(&args)
                    .map_err(|kind| RuntimeError::new(kind, paren))
            }

            Value::Class(class) => {
                let instance = Rc::new(RefCell::new(Instance::new(class.clone())));
                match class.find_method(INITIALIZER_NAME) {
                    Some(initializer) => {
                        check_arity(Arity::Exact(initializer.arity()), args.len(), paren)?;
                        let bound = initializer.bind(instance.clone());
                        self.call_function(&bound, args, paren)?;
                    }
                    None => check_arity(Arity::Exact(0), args.len(), paren)?,
                }
                Ok(Value::Instance(instance))
            }

            _ => Err(RuntimeError::new(RuntimeErrorKind::NotCallable, paren)),
        }
    }

    fn call_function(&mut self, function: &Function, args: Vec<Value>, paren: &Token) -> Eval {
        if self.depth >= self.max_depth || self.stack.exhausted() {
            tracing::debug!(
                "Call depth {} reached with {} bytes of stack used",
                self.depth,
                self.stack.used()
            );
            return Err(RuntimeError::new(
                RuntimeErrorKind::StackOverflow(self.depth),
                paren,
            ));
        }

        let env = Environment::new_enclosed(function.closure.clone());
        for (param, arg) in function.declaration.params.iter().zip(args) {
            env.borrow_mut().define(&param.lexeme, arg);
        }

        self.depth += 1;
        let result = self.execute_block(&function.declaration.body, env);
        self.depth -= 1;

        let value = match result? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
            Flow::Break(line) => {
                return Err(RuntimeError::at_line(RuntimeErrorKind::StrayControl("break"), line))
            }
            Flow::Continue(line) => {
                return Err(RuntimeError::at_line(RuntimeErrorKind::StrayControl("continue"), line))
            }
        };

        if function.is_initializer {
            return Ok(Environment::get_at(&function.closure, 0, "this").unwrap_or(Value::Nil));
        }
        Ok(value)
    }
}

impl Drop for Interpreter {
    // Closures and the environments they capture hold each other; emptying
    // the environments frees both
    fn drop(&mut self) {
        let mut released = Vec::with_capacity(self.captured.len() + 1);
        for env in self.captured.drain(..).filter_map(|weak| weak.upgrade()) {
            released.push(env.borrow_mut().clear());
        }
        released.push(self.globals.borrow_mut().clear());
    }
}

fn check_arity(arity: Arity, got: usize, paren: &Token) -> Result<(), RuntimeError> {
    if arity.accepts(got) {
        Ok(())
    } else {
        Err(RuntimeError::new(
            RuntimeErrorKind::Arity {
                expected: arity,
                got,
            },
            paren,
        ))
    }
}

fn type_error(token: &Token, message: String) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::TypeMismatch(message), token)
}

fn binary(op: BinaryOp, operator: &Token, left: Value, right: Value) -> Eval {
    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::string(format!("{}{}", left, right))),
            _ => Err(type_error(
                operator,
                format!(
                    "Operands of '+' must be numbers or include a string, got {} and {}.",
                    left.type_name(),
                    right.type_name()
                ),
            )),
        },
        BinaryOp::Sub => arithmetic_op(op, operator, left, right, |a, b| a - b),
        BinaryOp::Mul => arithmetic_op(op, operator, left, right, |a, b| a * b),
        BinaryOp::Div => arithmetic_op(op, operator, left, right, |a, b| a / b),
        BinaryOp::Mod => arithmetic_op(op, operator, left, right, |a, b| a % b),

        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),

        BinaryOp::Less => comparison_op(op, operator, left, right, Ordering::is_lt),
        BinaryOp::Greater => comparison_op(op, operator, left, right, Ordering::is_gt),
        BinaryOp::LessEqual => comparison_op(op, operator, left, right, Ordering::is_le),
        BinaryOp::GreaterEqual => comparison_op(op, operator, left, right, Ordering::is_ge),

        BinaryOp::LeftShift => bitshift_op(op, operator, left, right, |a, b| {
            a.wrapping_shl((b & 63) as u32)
        }),
        BinaryOp::RightShift => bitshift_op(op, operator, left, right, |a, b| {
            a.wrapping_shr((b & 63) as u32)
        }),
        BinaryOp::UnsignedShift => bitshift_op(op, operator, left, right, |a, b| {
            ((a as u32) >> (b & 31) as u32) as i64
        }),
    }
}

fn arithmetic_op<F>(op: BinaryOp, operator: &Token, left: Value, right: Value, f: F) -> Eval
where
    F: FnOnce(f64, f64) -> f64,
{
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(type_error(
            operator,
            format!(
                "Operands of '{}' must be numbers, got {} and {}.",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

fn comparison_op<F>(op: BinaryOp, operator: &Token, left: Value, right: Value, f: F) -> Eval
where
    F: FnOnce(Ordering) -> bool,
{
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(type_error(
                operator,
                format!(
                    "Operands of '{}' must be two numbers or two strings, got {} and {}.",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
            ))
        }
    };
    // NaN compares false against everything
    Ok(Value::Bool(ordering.map_or(false, f)))
}

fn bitshift_op<F>(op: BinaryOp, operator: &Token, left: Value, right: Value, f: F) -> Eval
where
    F: FnOnce(i64, i64) -> i64,
{
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a as i64, *b as i64) as f64)),
        _ => Err(type_error(
            operator,
            format!(
                "Operands of '{}' must be numbers, got {} and {}.",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

/// Validate `index` against a container of length `len`
fn checked_index(index: &Value, len: usize, bracket: &Token) -> Result<usize, RuntimeError> {
    let Value::Number(n) = index else {
        return Err(type_error(
            bracket,
            format!("Index must be a number, got {}.", index.type_name()),
        ));
    };
    if n.fract() != 0.0 || *n < 0.0 || *n >= len as f64 {
        return Err(RuntimeError::new(
            RuntimeErrorKind::IndexOutOfRange { index: *n, len },
            bracket,
        ));
    }
    Ok(*n as usize)
}

fn index_get(object: &Value, index: &Value, bracket: &Token) -> Eval {
    match object {
        Value::Array(values) => {
            let values = values.borrow();
            let i = checked_index(index, values.len(), bracket)?;
            Ok(values[i].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let i = checked_index(index, len, bracket)?;
            Ok(s.chars().nth(i).map_or(Value::Nil, |c| Value::string(c.to_string())))
        }
        other => Err(type_error(
            bracket,
            format!("Only arrays and strings can be indexed, got {}.", other.type_name()),
        )),
    }
}

fn index_set(object: &Value, index: &Value, value: Value, bracket: &Token) -> Result<(), RuntimeError> {
    match object {
        Value::Array(values) => {
            let mut values = values.borrow_mut();
            let i = checked_index(index, values.len(), bracket)?;
            values[i] = value;
            Ok(())
        }
        other => Err(type_error(
            bracket,
            format!("Only array elements can be assigned, got {}.", other.type_name()),
        )),
    }
}
