pub mod ast;
pub mod capability;
pub mod errors;
pub mod signature;
pub mod span;
pub mod spread;
pub mod type_syntax;
pub mod types;
