use crate::language::{
    errors::{SyntaxError, SyntaxErrors},
    spread::CallResolutionError,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

/// A malformed type or `impl` declaration, rendered against the text it was parsed from.
#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(prime_spread::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            span: err.to_source_span(),
            message: err.message.clone(),
            label: err.label.clone(),
            help: err.help.clone(),
            src,
        }
    }

    /// One diagnostic per error in a parse batch, in source order.
    pub fn from_errors(src: &NamedSource<String>, errors: &SyntaxErrors) -> Vec<Self> {
        errors
            .errors
            .iter()
            .map(|err| Self::from_error(src.clone(), err))
            .collect()
    }
}

/// A call that could not be elaborated, rendered against the file it came from.
#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct ResolutionDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl ResolutionDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &CallResolutionError) -> Self {
        Self {
            src,
            span: err.span().to_source_span(),
            help: err.help(),
            message: err.display_message(),
            label: err.label(),
        }
    }
}

pub fn emit_syntax_errors(path: &str, source: &str, errors: &SyntaxErrors) {
    let src = NamedSource::new(path, source.to_string());
    for diagnostic in SyntaxDiagnostic::from_errors(&src, errors) {
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn emit_resolution_errors(path: &str, source: &str, errors: &[CallResolutionError]) {
    let src = NamedSource::new(path, source.to_string());
    for err in errors {
        let diagnostic = ResolutionDiagnostic::from_error(src.clone(), err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}
