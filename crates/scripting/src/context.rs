//! Script execution context
//!
//! What a host gets back from [`crate::Script::resolve`] or
//! [`crate::Script::evaluate`]: the final global bindings, every diagnostic in
//! report order, the top-level return value and the recorded test results.

use crate::diagnostics::{Diagnostic, Phase};
use crate::error::{RuntimeError, ScriptError};
use crate::runtime::value::Value;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// Every requested phase ran to completion
    Completed,
    /// The front end reported diagnostics in this phase; later phases were skipped
    Rejected(Phase),
    /// A runtime error aborted execution
    Failed(RuntimeError),
}

/// Result of one `test "name" { ... }` block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestOutcome {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: None,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// Script execution context
#[derive(Debug, Clone)]
pub struct ScriptContext {
    /// Global bindings after execution, host natives excluded
    bindings: BTreeMap<String, Value>,

    /// Names of the native functions that were installed
    natives: BTreeSet<String>,

    /// Names declared at the top level of the script
    declarations: BTreeSet<String>,

    diagnostics: Vec<Diagnostic>,

    /// Value of a top-level `return`
    result: Option<Value>,

    tests: Vec<TestOutcome>,

    module_name: Option<String>,

    status: Status,
}

impl ScriptContext {
    pub(crate) fn new(status: Status, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            bindings: BTreeMap::new(),
            natives: BTreeSet::new(),
            declarations: BTreeSet::new(),
            diagnostics,
            result: None,
            tests: Vec::new(),
            module_name: None,
            status,
        }
    }

    pub(crate) fn with_declarations(mut self, declarations: BTreeSet<String>) -> Self {
        self.declarations = declarations;
        self
    }

    /// Split a global snapshot into script bindings and native names
    pub(crate) fn with_globals(mut self, globals: BTreeMap<String, Value>) -> Self {
        for (name, value) in globals {
            match value {
                Value::Native(_) => {
                    self.natives.insert(name);
                }
                value => {
                    self.bindings.insert(name, value);
                }
            }
        }
        self
    }

    pub(crate) fn with_result(mut self, result: Option<Value>) -> Self {
        self.result = result;
        self
    }

    pub(crate) fn with_tests(mut self, tests: Vec<TestOutcome>, module_name: Option<String>) -> Self {
        self.tests = tests;
        self.module_name = module_name;
        self
    }

    /// Value of a global binding
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    pub fn natives(&self) -> &BTreeSet<String> {
        &self.natives
    }

    /// Whether `name` is declared at the top level
    pub fn is_declared(&self, name: &str) -> bool {
        self.declarations.contains(name)
    }

    pub fn declarations(&self) -> &BTreeSet<String> {
        &self.declarations
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn tests(&self) -> &[TestOutcome] {
        &self.tests
    }

    pub fn failed_tests(&self) -> impl Iterator<Item = &TestOutcome> {
        self.tests.iter().filter(|test| !test.passed)
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Completed without diagnostics
    pub fn is_success(&self) -> bool {
        self.status == Status::Completed && self.diagnostics.is_empty()
    }

    /// Diagnostics as a JSON array
    pub fn diagnostics_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.diagnostics)
    }

    /// Test results as a JSON array
    pub fn tests_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.tests)
    }

    /// Turn a rejected or failed run into an error
    pub fn into_result(self) -> Result<Self, ScriptError> {
        match &self.status {
            Status::Completed => Ok(self),
            Status::Rejected(phase) => Err(ScriptError::Rejected {
                phase: *phase,
                count: self.diagnostics.len(),
            }),
            Status::Failed(err) => Err(ScriptError::Runtime(err.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::{Arity, NativeFunction};
    use std::rc::Rc;

    #[test]
    fn test_globals_split_natives() {
        let mut globals = BTreeMap::new();
        globals.insert("a".to_string(), Value::Number(1.0));
        globals.insert(
            "clock".to_string(),
            Value::Native(Rc::new(NativeFunction::new("clock", Arity::Exact(0), |_| {
                Ok(Value::Nil)
            }))),
        );

        let ctx = ScriptContext::new(Status::Completed, Vec::new()).with_globals(globals);
        assert_eq!(ctx.bindings().len(), 1);
        assert_eq!(ctx.get("a"), Some(&Value::Number(1.0)));
        assert!(ctx.natives().contains("clock"));
        assert!(ctx.is_success());
    }

    #[test]
    fn test_into_result() {
        let ctx = ScriptContext::new(Status::Rejected(Phase::Parsing), Vec::new());
        assert!(matches!(
            ctx.into_result(),
            Err(ScriptError::Rejected {
                phase: Phase::Parsing,
                ..
            })
        ));
    }

    #[test]
    fn test_tests_json() {
        let ctx = ScriptContext::new(Status::Completed, Vec::new())
            .with_tests(vec![TestOutcome::failed("adds", "boom")], None);
        let json = ctx.tests_json().unwrap();
        assert!(json.contains("\"passed\": false"));
        assert_eq!(ctx.failed_tests().count(), 1);
    }
}
