use crate::language::{span::Span, types::TypeExpr};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct FixedParam {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpreadParam {
    pub name: String,
    pub element_type: TypeExpr,
}

/// A parameter as written in a declaration. For a spread parameter `ty` is the element type.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub spread: bool,
    pub span: Span,
}

impl ParamDecl {
    pub fn fixed(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            spread: false,
            span: Span::default(),
        }
    }

    pub fn spread(name: impl Into<String>, element_type: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty: element_type,
            spread: true,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignatureError {
    #[error("only one spread parameter is allowed; `{second}` follows `{first}`")]
    MultipleSpreadParameters {
        first: String,
        second: String,
        span: Span,
    },
    #[error("spread parameter `{name}` must be the last parameter")]
    SpreadNotLast { name: String, span: Span },
    #[error("spread parameter `{name}` has unsized element type `{element_type}`")]
    UnsizedSpreadElement {
        name: String,
        element_type: TypeExpr,
        span: Span,
    },
}

impl SignatureError {
    pub fn span(&self) -> Span {
        match self {
            SignatureError::MultipleSpreadParameters { span, .. }
            | SignatureError::SpreadNotLast { span, .. }
            | SignatureError::UnsizedSpreadElement { span, .. } => *span,
        }
    }
}

/// Parameters of a callable. At most one spread parameter exists and it is always last.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSignature {
    fixed: Vec<FixedParam>,
    spread: Option<SpreadParam>,
}

impl ParameterSignature {
    pub fn fixed(params: Vec<FixedParam>) -> Self {
        Self {
            fixed: params,
            spread: None,
        }
    }

    pub fn with_spread(params: Vec<FixedParam>, spread: SpreadParam) -> Result<Self, SignatureError> {
        if !spread.element_type.is_sized() {
            return Err(SignatureError::UnsizedSpreadElement {
                name: spread.name,
                element_type: spread.element_type,
                span: Span::default(),
            });
        }
        Ok(Self {
            fixed: params,
            spread: Some(spread),
        })
    }

    /// Builds a signature from declaration order, enforcing the spread placement rules.
    pub fn from_decls(decls: Vec<ParamDecl>) -> Result<Self, SignatureError> {
        let mut first_spread: Option<&ParamDecl> = None;
        for decl in decls.iter().filter(|decl| decl.spread) {
            if let Some(first) = first_spread {
                return Err(SignatureError::MultipleSpreadParameters {
                    first: first.name.clone(),
                    second: decl.name.clone(),
                    span: decl.span,
                });
            }
            first_spread = Some(decl);
        }
        if let Some(position) = decls.iter().position(|decl| decl.spread) {
            if position + 1 != decls.len() {
                let decl = &decls[position];
                return Err(SignatureError::SpreadNotLast {
                    name: decl.name.clone(),
                    span: decl.span,
                });
            }
        }

        let mut fixed = Vec::with_capacity(decls.len());
        let mut spread = None;
        for decl in decls {
            if decl.spread {
                if !decl.ty.is_sized() {
                    return Err(SignatureError::UnsizedSpreadElement {
                        name: decl.name,
                        element_type: decl.ty,
                        span: decl.span,
                    });
                }
                spread = Some(SpreadParam {
                    name: decl.name,
                    element_type: decl.ty,
                });
            } else {
                fixed.push(FixedParam {
                    name: decl.name,
                    ty: decl.ty,
                });
            }
        }
        Ok(Self { fixed, spread })
    }

    pub fn fixed_params(&self) -> &[FixedParam] {
        &self.fixed
    }

    pub fn fixed_arity(&self) -> usize {
        self.fixed.len()
    }

    pub fn spread(&self) -> Option<&SpreadParam> {
        self.spread.as_ref()
    }
}
