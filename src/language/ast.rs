use crate::language::{span::Span, types::TypeExpr};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Identifier(Identifier),
    Literal(Literal),
    Tuple(Vec<Expr>, Span),
    ArrayLiteral(Vec<Expr>, Span),
    Range(RangeExpr),
    Reference {
        mutable: bool,
        expr: Box<Expr>,
        span: Span,
    },
    Move {
        expr: Box<Expr>,
        span: Span,
    },
    /// A synthesized lazy sequence; only produced by spread resolution.
    Seq(SeqExpr, Span),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(Identifier {
            name: name.into(),
            span: Span::default(),
        })
    }

    pub fn int(value: i128) -> Self {
        Expr::Literal(Literal::Int(value, Span::default()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into(), Span::default()))
    }

    pub fn borrow(expr: Expr) -> Self {
        let span = expr.span();
        Expr::Reference {
            mutable: false,
            expr: Box::new(expr),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(ident) => ident.span,
            Expr::Literal(lit) => lit.span(),
            Expr::Tuple(_, span)
            | Expr::ArrayLiteral(_, span)
            | Expr::Reference { span, .. }
            | Expr::Move { span, .. }
            | Expr::Seq(_, span) => *span,
            Expr::Range(range) => range.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i128, Span),
    Bool(bool, Span),
    String(String, Span),
    Rune(char, Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Int(_, span)
            | Literal::Bool(_, span)
            | Literal::String(_, span)
            | Literal::Rune(_, span) => *span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RangeExpr {
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub inclusive: bool,
    pub span: Span,
}

/// Lazy sequence of `item`. Sources are evaluated when the sequence expression is evaluated,
/// left to right; items are produced only when the sequence is iterated.
#[derive(Clone, Debug, PartialEq)]
pub enum SeqExpr {
    Empty {
        item: TypeExpr,
    },
    /// Exactly one value, moved or copied in.
    Once {
        value: Box<Expr>,
        item: TypeExpr,
    },
    /// Takes exclusive ownership of an iterable source.
    Owned {
        source: Box<Expr>,
        item: TypeExpr,
    },
    /// Reads a borrowed source and duplicates each `&item` into an `item`.
    Copied {
        source: Box<Expr>,
        item: TypeExpr,
    },
    Chain {
        left: Box<SeqExpr>,
        right: Box<SeqExpr>,
        item: TypeExpr,
    },
}

impl SeqExpr {
    pub fn item_type(&self) -> &TypeExpr {
        match self {
            SeqExpr::Empty { item }
            | SeqExpr::Once { item, .. }
            | SeqExpr::Owned { item, .. }
            | SeqExpr::Copied { item, .. }
            | SeqExpr::Chain { item, .. } => item,
        }
    }

    pub fn ty(&self) -> TypeExpr {
        TypeExpr::iterator(self.item_type().clone())
    }

    /// Non-chain sources in evaluation order.
    pub fn sources(&self) -> Vec<&SeqExpr> {
        match self {
            SeqExpr::Chain { left, right, .. } => {
                let mut sources = left.sources();
                sources.extend(right.sources());
                sources
            }
            other => vec![other],
        }
    }
}

/// How the surrounding type checker sees an argument being passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Shared,
    Unique,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallArgument {
    pub expr: Expr,
    pub ty: TypeExpr,
    pub ownership: Ownership,
    pub span: Span,
}

impl CallArgument {
    pub fn new(expr: Expr, ty: TypeExpr, ownership: Ownership) -> Self {
        let span = expr.span();
        Self {
            expr,
            ty,
            ownership,
            span,
        }
    }

    pub fn owned(expr: Expr, ty: TypeExpr) -> Self {
        Self::new(expr, ty, Ownership::Owned)
    }

    pub fn shared(expr: Expr, ty: TypeExpr) -> Self {
        Self::new(expr, ty, Ownership::Shared)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallSite {
    pub callee: String,
    pub args: Vec<CallArgument>,
    pub span: Span,
}

impl CallSite {
    pub fn new(callee: impl Into<String>, args: Vec<CallArgument>) -> Self {
        Self {
            callee: callee.into(),
            args,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// The single argument that replaces every trailing argument of a spread call.
#[derive(Clone, Debug, PartialEq)]
pub struct SpreadArgument {
    pub seq: SeqExpr,
    pub ty: TypeExpr,
    pub span: Span,
}

impl SpreadArgument {
    pub fn to_expr(&self) -> Expr {
        Expr::Seq(self.seq.clone(), self.span)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElaboratedCall {
    pub callee: String,
    pub fixed: Vec<CallArgument>,
    pub spread: Option<SpreadArgument>,
    pub span: Span,
}

impl ElaboratedCall {
    pub fn arity(&self) -> usize {
        self.fixed.len() + usize::from(self.spread.is_some())
    }
}
