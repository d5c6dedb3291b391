use crate::language::{
    capability::{Capability, CapabilityOracle, CapabilityQuery, Requirement},
    types::TypeExpr,
};
use tracing::trace;

#[derive(Clone, Debug, PartialEq)]
pub enum AdaptationRule {
    /// Contributes no items.
    Empty,
    Direct(TypeExpr),
    OwnedIterable(TypeExpr),
    BorrowedCopyIterable(TypeExpr),
    Unresolved(Unresolved),
}

impl AdaptationRule {
    pub fn name(&self) -> &'static str {
        match self {
            AdaptationRule::Empty => "empty",
            AdaptationRule::Direct(_) => "direct",
            AdaptationRule::OwnedIterable(_) => "owned-iterable",
            AdaptationRule::BorrowedCopyIterable(_) => "borrowed-copy-iterable",
            AdaptationRule::Unresolved(_) => "unresolved",
        }
    }

    /// Item type the adapted segment yields.
    pub fn item_type(&self) -> Option<&TypeExpr> {
        match self {
            AdaptationRule::Direct(item)
            | AdaptationRule::OwnedIterable(item)
            | AdaptationRule::BorrowedCopyIterable(item) => Some(item),
            AdaptationRule::Empty | AdaptationRule::Unresolved(_) => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, AdaptationRule::Unresolved(_))
    }
}

/// No rule matched. `attempted` lists the requirements that were checked and failed.
#[derive(Clone, Debug, PartialEq)]
pub struct Unresolved {
    pub actual: TypeExpr,
    pub attempted: Vec<Requirement>,
}

/// `Ok(())` when the case applies; otherwise the failed requirement, if it was a capability.
type CaseCheck = fn(&TypeExpr, &TypeExpr, &dyn CapabilityOracle) -> Result<(), Option<Requirement>>;

struct AdaptationCase {
    name: &'static str,
    check: CaseCheck,
    adapt: fn(&TypeExpr) -> AdaptationRule,
}

/// Evaluated top to bottom; the first case that applies wins.
const ADAPTATION_CASES: [AdaptationCase; 3] = [
    AdaptationCase {
        name: "exact element type",
        check: exact_element,
        adapt: direct,
    },
    AdaptationCase {
        name: "iterable over element",
        check: iterable_over_element,
        adapt: owned_iterable,
    },
    AdaptationCase {
        name: "iterable over borrowed copy element",
        check: iterable_over_borrowed_copy,
        adapt: borrowed_copy_iterable,
    },
];

fn exact_element(
    arg: &TypeExpr,
    element: &TypeExpr,
    _: &dyn CapabilityOracle,
) -> Result<(), Option<Requirement>> {
    if arg == element {
        Ok(())
    } else {
        Err(None)
    }
}

fn iterable_over_element(
    arg: &TypeExpr,
    element: &TypeExpr,
    oracle: &dyn CapabilityOracle,
) -> Result<(), Option<Requirement>> {
    let requirement = Requirement::new(arg.clone(), CapabilityQuery::into_iterable(element.clone()));
    if requirement.holds(oracle) {
        Ok(())
    } else {
        Err(Some(requirement))
    }
}

fn iterable_over_borrowed_copy(
    arg: &TypeExpr,
    element: &TypeExpr,
    oracle: &dyn CapabilityOracle,
) -> Result<(), Option<Requirement>> {
    let iterable = Requirement::new(
        arg.clone(),
        CapabilityQuery::into_iterable(TypeExpr::shared_ref(element.clone())),
    );
    if !iterable.holds(oracle) {
        return Err(Some(iterable));
    }
    let copy = Requirement::new(element.clone(), CapabilityQuery::plain(Capability::Copy));
    if copy.holds(oracle) {
        Ok(())
    } else {
        Err(Some(copy))
    }
}

fn direct(element: &TypeExpr) -> AdaptationRule {
    AdaptationRule::Direct(element.clone())
}

fn owned_iterable(element: &TypeExpr) -> AdaptationRule {
    AdaptationRule::OwnedIterable(element.clone())
}

fn borrowed_copy_iterable(element: &TypeExpr) -> AdaptationRule {
    AdaptationRule::BorrowedCopyIterable(element.clone())
}

/// Decides how one trailing argument of type `arg_type` feeds a spread of `element_type`.
pub fn classify(
    arg_type: &TypeExpr,
    element_type: &TypeExpr,
    oracle: &dyn CapabilityOracle,
) -> AdaptationRule {
    if !element_type.is_sized() {
        return AdaptationRule::Unresolved(Unresolved {
            actual: arg_type.clone(),
            attempted: vec![Requirement::new(
                element_type.clone(),
                CapabilityQuery::plain(Capability::Sized),
            )],
        });
    }
    let mut attempted = Vec::new();
    for case in &ADAPTATION_CASES {
        match (case.check)(arg_type, element_type, oracle) {
            Ok(()) => {
                trace!(
                    arg_type = %arg_type,
                    element_type = %element_type,
                    case = case.name,
                    "trailing argument adapted"
                );
                return (case.adapt)(element_type);
            }
            Err(Some(requirement)) => attempted.push(requirement),
            Err(None) => {}
        }
    }
    AdaptationRule::Unresolved(Unresolved {
        actual: arg_type.clone(),
        attempted,
    })
}
