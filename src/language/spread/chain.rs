use super::{classify::AdaptationRule, ResolveOptions};
use crate::language::{
    ast::{CallArgument, Expr, SeqExpr},
    types::TypeExpr,
};
use thiserror::Error;

/// How an argument's value reaches the synthesized sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Ownership moves into the sequence; the source binding is consumed.
    Move,
    /// The value is duplicated; the source stays usable.
    Copy,
    /// The source is only read through a shared reference.
    Borrow,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AdaptedSegment {
    pub argument_index: usize,
    pub rule: AdaptationRule,
    pub transfer: Transfer,
    pub argument: CallArgument,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChainPlanError {
    #[error("segment {index} yields `{found}` but the spread expects `{expected}`")]
    ItemMismatch {
        index: usize,
        found: String,
        expected: TypeExpr,
    },
    #[error("segment {index} does not follow segment {previous}")]
    OutOfOrder { index: usize, previous: usize },
    #[error("segment {index} has no adaptation")]
    Unresolved { index: usize },
}

/// Adapted trailing arguments in source order, all yielding `element_type`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPlan {
    element_type: TypeExpr,
    segments: Vec<AdaptedSegment>,
}

impl ChainPlan {
    pub fn new(element_type: TypeExpr) -> Self {
        Self {
            element_type,
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, segment: AdaptedSegment) -> Result<(), ChainPlanError> {
        let index = segment.argument_index;
        if let Some(last) = self.segments.last() {
            if last.argument_index >= index {
                return Err(ChainPlanError::OutOfOrder {
                    index,
                    previous: last.argument_index,
                });
            }
        }
        match &segment.rule {
            AdaptationRule::Unresolved(_) => return Err(ChainPlanError::Unresolved { index }),
            AdaptationRule::Empty => {}
            rule => {
                if rule.item_type() != Some(&self.element_type) {
                    return Err(ChainPlanError::ItemMismatch {
                        index,
                        found: rule
                            .item_type()
                            .map(TypeExpr::canonical_name)
                            .unwrap_or_default(),
                        expected: self.element_type.clone(),
                    });
                }
            }
        }
        self.segments.push(segment);
        Ok(())
    }

    pub fn element_type(&self) -> &TypeExpr {
        &self.element_type
    }

    pub fn segments(&self) -> &[AdaptedSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn transferred(argument: CallArgument, transfer: Transfer) -> Expr {
    match (transfer, argument.expr) {
        (Transfer::Move, expr @ Expr::Identifier(_)) => Expr::Move {
            span: expr.span(),
            expr: Box::new(expr),
        },
        (_, expr) => expr,
    }
}

fn adapt(segment: AdaptedSegment, item: &TypeExpr) -> SeqExpr {
    let item = item.clone();
    let source = Box::new(transferred(segment.argument, segment.transfer));
    match segment.rule {
        AdaptationRule::Direct(_) => SeqExpr::Once {
            value: source,
            item,
        },
        AdaptationRule::OwnedIterable(_) => SeqExpr::Owned { source, item },
        AdaptationRule::BorrowedCopyIterable(_) => SeqExpr::Copied { source, item },
        AdaptationRule::Empty | AdaptationRule::Unresolved(_) => SeqExpr::Empty { item },
    }
}

fn chain(left: SeqExpr, right: SeqExpr, item: &TypeExpr) -> SeqExpr {
    SeqExpr::Chain {
        left: Box::new(left),
        right: Box::new(right),
        item: item.clone(),
    }
}

/// Composes the plan into one sequence of `plan.element_type()`, folding left to right.
pub fn build(plan: ChainPlan, options: &ResolveOptions) -> SeqExpr {
    let ChainPlan {
        element_type,
        segments,
    } = plan;
    let mut adapted = segments
        .into_iter()
        .map(|segment| adapt(segment, &element_type));
    if !options.fuse_single_segment {
        let seed = SeqExpr::Empty {
            item: element_type.clone(),
        };
        return adapted.fold(seed, |acc, next| chain(acc, next, &element_type));
    }
    match adapted.next() {
        None => SeqExpr::Empty {
            item: element_type.clone(),
        },
        Some(first) => adapted.fold(first, |acc, next| chain(acc, next, &element_type)),
    }
}
