//! Trailing-argument resolution for callees with a spread parameter.
//!
//! A call's arguments beyond the fixed arity are classified one by one, composed into a single
//! lazy sequence and passed as one synthesized argument.

use crate::language::{capability::Requirement, span::Span, types::TypeExpr};
use std::{env, fmt};
use thiserror::Error;

mod chain;
mod classify;
mod resolve;

#[cfg(test)]
mod tests;

pub use chain::{build, AdaptedSegment, ChainPlan, ChainPlanError, Transfer};
pub use classify::{classify, AdaptationRule, Unresolved};
pub use resolve::{resolve, CallResolver};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Emit a lone segment's sequence directly instead of folding it through `Chain`.
    pub fuse_single_segment: bool,
    /// Resolve batches of call sites on the rayon pool.
    pub parallel: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            fuse_single_segment: true,
            parallel: false,
        }
    }
}

impl ResolveOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fuse_single_segment: env_flag("PRIME_SPREAD_FUSE_SINGLE")
                .unwrap_or(defaults.fuse_single_segment),
            parallel: env_flag("PRIME_SPREAD_PARALLEL").unwrap_or(defaults.parallel),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.trim() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallResolutionError {
    #[error("`{callee}` expects {expected} argument(s), got {found}")]
    Arity {
        callee: String,
        expected: Arity,
        found: usize,
        span: Span,
    },
    #[error(
        "trailing argument {index} of `{callee}` has type `{arg_type}`, which cannot be spread as `{element_type}`"
    )]
    UnresolvedTrailingArgument {
        callee: String,
        /// Position among the trailing arguments.
        index: usize,
        /// Position among all call arguments.
        position: usize,
        arg_type: TypeExpr,
        element_type: TypeExpr,
        attempted: Vec<Requirement>,
        span: Span,
    },
    #[error("invalid chain plan for `{callee}`: {source}")]
    Plan {
        callee: String,
        #[source]
        source: ChainPlanError,
        span: Span,
    },
}

impl CallResolutionError {
    pub fn span(&self) -> Span {
        match self {
            CallResolutionError::Arity { span, .. }
            | CallResolutionError::UnresolvedTrailingArgument { span, .. }
            | CallResolutionError::Plan { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CallResolutionError::Arity { .. } => "E0AR",
            CallResolutionError::UnresolvedTrailingArgument { .. } => "E0SP",
            CallResolutionError::Plan { .. } => "E0SPI",
        }
    }

    pub fn label(&self) -> String {
        match self {
            CallResolutionError::Arity { found, .. } => format!("{found} argument(s) supplied"),
            CallResolutionError::UnresolvedTrailingArgument {
                arg_type,
                element_type,
                ..
            } => format!("`{arg_type}` is neither `{element_type}` nor iterable over it"),
            CallResolutionError::Plan { .. } => "while building the spread argument".into(),
        }
    }

    pub fn help(&self) -> Option<String> {
        match self {
            CallResolutionError::UnresolvedTrailingArgument { attempted, .. }
                if !attempted.is_empty() =>
            {
                let rendered: Vec<String> =
                    attempted.iter().map(|req| format!("`{req}`")).collect();
                Some(format!("unsatisfied: {}", rendered.join(", ")))
            }
            CallResolutionError::Arity {
                expected: Arity::Exactly(n),
                found,
                ..
            } if found > n => Some("this function does not take trailing arguments".into()),
            _ => None,
        }
    }

    pub fn display_message(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}
