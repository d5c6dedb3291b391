use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Unknown symbol `{name}`")]
    UnknownSymbol { name: String },
    #[error("Value `{name}` has been moved")]
    MovedValue { name: String },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Operation not supported: {message}")]
    Unsupported { message: String },
}
