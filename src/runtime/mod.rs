pub mod environment;
pub mod error;
pub mod interpreter;
pub mod seq;
pub mod value;

pub use interpreter::{EvaluatedCall, Interpreter};
pub use seq::LazySeq;
