//! HSL runtime: values, environments, output sinks and the interpreter

pub mod environment;
pub mod interpreter;
pub mod output;
pub mod value;

pub use environment::{Env, Environment};
pub use interpreter::{Flow, Interpreter};
pub use output::{CaptureSink, OutputSink, StdoutSink};
pub use value::{Arity, Class, Function, Instance, NativeFunction, Value};
