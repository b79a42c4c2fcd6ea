//! HSL Core - Fundamental types shared by the engine crates

mod error;
mod types;
mod positions;
mod stack;

pub use error::*;
pub use types::*;
pub use positions::*;
pub use stack::*;
