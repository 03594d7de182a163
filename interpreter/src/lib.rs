pub mod context;
mod datetime;
pub mod diag;
pub mod error;
pub mod executor;
mod num;
mod rowspec;
mod verbs;
pub mod vm;

pub use context::{Activation, STOP_LOOP, STOP_PARAGRAPH, STOP_PROGRAM};
pub use diag::{DiagSink, Level};
pub use error::RuntimeError;
pub use executor::Interpreter;
