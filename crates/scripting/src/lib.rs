//! # HSL Scripting Engine
//!
//! This crate lexes, parses, resolves and interprets HSL, a small dynamically
//! typed scripting language meant to be embedded in a host application.
//!
//! ## Features
//! - Hand-written lexer and recursive-descent parser with error recovery
//! - Phase-tagged diagnostics collected across a whole run
//! - Optional static resolver for scope distances and misuse checks
//! - Tree-walking interpreter with closures, classes and inheritance
//! - Host natives, test blocks and pluggable `print` output
//!
//! ## Pipeline
//!
//! ```text
//! source -> Lexer -> tokens -> Parser -> AST -> Resolver -> Interpreter
//! ```
//!
//! [`Script::resolve`] stops after the resolver; [`Script::evaluate`] runs
//! everything and returns a [`ScriptContext`] with the final globals.

pub mod builtins;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod lang;
pub mod runtime;
pub mod script;

pub use builtins::Builtins;
pub use context::{ScriptContext, Status, TestOutcome};
pub use diagnostics::{Diagnostic, ErrorReporter, Phase};
pub use error::{Result, RuntimeError, RuntimeErrorKind, ScriptError};
pub use runtime::{Arity, CaptureSink, NativeFunction, OutputSink, StdoutSink, Value};
pub use script::Script;
