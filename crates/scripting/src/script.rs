//! Script facade
//!
//! Owns a source text plus everything needed to run it: engine configuration,
//! host natives, the print destination and the diagnostic reporter. Each call
//! to [`Script::resolve`] or [`Script::evaluate`] starts from a clean slate.

use crate::builtins::Builtins;
use crate::context::{ScriptContext, Status};
use crate::diagnostics::{Diagnostic, ErrorReporter, Phase};
use crate::error::{Result, RuntimeErrorKind};
use crate::lang::ast::Stmt;
use crate::lang::lexer::tokenize;
use crate::lang::parser::parse;
use crate::lang::resolver::{resolve, Resolution};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::output::{OutputSink, StdoutSink};
use crate::runtime::value::{Arity, NativeFunction, Value};
use hsl_config::EngineConfig;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// A loaded HSL script
pub struct Script {
    name: String,
    source: String,
    config: EngineConfig,
    natives: Vec<NativeFunction>,
    output: Arc<dyn OutputSink>,
    reporter: ErrorReporter,
}

impl Script {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            name: "<script>".to_string(),
            source: source.into(),
            config: EngineConfig::default(),
            natives: Vec::new(),
            output: Arc::new(StdoutSink),
            reporter: ErrorReporter::new(),
        }
    }

    /// Read a script from disk; the file path becomes its name
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        Ok(Self::new(source).with_name(path.display().to_string()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Send `print` output somewhere other than stdout
    pub fn with_output(mut self, output: Arc<dyn OutputSink>) -> Self {
        self.output = output;
        self
    }

    /// Expose a host function to the script as a global
    pub fn bind_native<F>(&mut self, name: &str, arity: Arity, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, RuntimeErrorKind> + Send + Sync + 'static,
    {
        self.natives.retain(|native| native.name != name);
        self.natives.push(NativeFunction::new(name, arity, func));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diagnostics of the most recent run
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.reporter.diagnostics()
    }

    /// Lex, parse and resolve without executing anything
    pub fn resolve(&mut self) -> ScriptContext {
        match self.front_end(true) {
            Ok((_, resolution)) => {
                tracing::debug!("Resolved script '{}'", self.name);
                self.context(Status::Completed)
                    .with_declarations(resolution.declarations)
            }
            Err(phase) => self.rejected(phase),
        }
    }

    /// Run the full pipeline in a fresh global environment
    pub fn evaluate(&mut self) -> ScriptContext {
        let started = Instant::now();

        let (statements, resolution) = match self.front_end(self.config.resolve) {
            Ok(front) => front,
            Err(phase) => return self.rejected(phase),
        };

        let mut interpreter = Interpreter::new(self.output.clone(), &self.config);
        if self.config.resolve {
            interpreter.set_resolution(resolution.locals);
        }
        if self.config.builtins {
            for native in Builtins::new().iter() {
                interpreter.define_native(native.clone());
            }
        }
        for native in &self.natives {
            interpreter.define_native(native.clone());
        }

        let outcome = interpreter.interpret(&statements, &mut self.reporter);
        let globals = interpreter.globals().borrow().snapshot();
        let module_name = interpreter.module_name().map(str::to_string);
        let tests = interpreter.take_tests();

        let (status, result) = match outcome {
            Ok(result) => {
                tracing::info!(
                    "Script '{}' evaluated in {:?}",
                    self.name,
                    started.elapsed()
                );
                (Status::Completed, result)
            }
            Err(err) => {
                tracing::warn!("Script '{}' failed at line {}: {}", self.name, err.line, err);
                (Status::Failed(err), None)
            }
        };

        self.context(status)
            .with_declarations(resolution.declarations)
            .with_globals(globals)
            .with_result(result)
            .with_tests(tests, module_name)
    }

    /// Lexing and parsing, plus resolving when asked. Fails with the phase
    /// that reported diagnostics.
    fn front_end(&mut self, run_resolver: bool) -> std::result::Result<(Vec<Stmt>, Resolution), Phase> {
        self.reporter.clear();

        let tokens = tokenize(&self.source, &mut self.reporter);
        tracing::debug!("Lexed {} tokens from '{}'", tokens.len(), self.name);
        let statements = parse(tokens, &mut self.reporter);
        tracing::debug!("Parsed {} statements from '{}'", statements.len(), self.name);

        if self.reporter.has_errors_in(Phase::Lexing) {
            return Err(Phase::Lexing);
        }
        if self.reporter.has_errors() {
            return Err(Phase::Parsing);
        }

        if !run_resolver {
            return Ok((statements, Resolution::default()));
        }

        let resolution = resolve(&statements, &mut self.reporter);
        if self.reporter.has_errors() {
            return Err(Phase::Resolving);
        }
        Ok((statements, resolution))
    }

    fn rejected(&self, phase: Phase) -> ScriptContext {
        tracing::warn!(
            "Script '{}' rejected during {} with {} diagnostic(s)",
            self.name,
            phase,
            self.reporter.diagnostics().len()
        );
        self.context(Status::Rejected(phase))
    }

    fn context(&self, status: Status) -> ScriptContext {
        ScriptContext::new(status, self.reporter.diagnostics().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::output::CaptureSink;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_script_is_send_sync() {
        assert_send_sync::<Script>();
        assert_send_sync::<EngineConfig>();
        assert_send_sync::<CaptureSink>();
    }

    #[test]
    fn test_resolve_leaves_bindings_unset() {
        let mut script = Script::new("var a = 1;");
        let ctx = script.resolve();

        assert!(ctx.is_success());
        assert!(ctx.is_declared("a"));
        assert!(ctx.get("a").is_none());
    }

    #[test]
    fn test_evaluate_binds_globals() {
        let sink = CaptureSink::new();
        let mut script = Script::new("var a = 1; print a;").with_output(Arc::new(sink.clone()));
        let ctx = script.evaluate();

        assert!(ctx.is_success());
        assert_eq!(ctx.bindings().len(), 1);
        assert_eq!(ctx.get("a"), Some(&Value::Number(1.0)));
        assert!(ctx.natives().contains("clock"));
        assert_eq!(sink.lines(), vec!["1"]);
    }

    #[test]
    fn test_rejected_phase() {
        let mut script = Script::new("var = ;");
        let ctx = script.evaluate();
        assert_eq!(ctx.status(), &Status::Rejected(Phase::Parsing));

        let mut script = Script::new("var s = \"open;");
        assert_eq!(script.evaluate().status(), &Status::Rejected(Phase::Lexing));

        let mut script = Script::new("{ var x = x; }");
        assert_eq!(script.resolve().status(), &Status::Rejected(Phase::Resolving));
    }

    #[test]
    fn test_rerun_uses_fresh_globals() {
        let sink = CaptureSink::new();
        let mut script = Script::new("var n = 0; n = n + 1; print n;").with_output(Arc::new(sink.clone()));

        script.evaluate();
        script.evaluate();
        assert_eq!(sink.lines(), vec!["1", "1"]);
    }

    #[test]
    fn test_bind_native() {
        let sink = CaptureSink::new();
        let mut script = Script::new("print twice(21);").with_output(Arc::new(sink.clone()));
        script.bind_native("twice", Arity::Exact(1), |args| match &args[0] {
            Value::Number(n) => Ok(Value::Number(n * 2.0)),
            _ => Err(RuntimeErrorKind::Native("twice() needs a number".into())),
        });

        assert!(script.evaluate().is_success());
        assert_eq!(sink.lines(), vec!["42"]);
    }
}
