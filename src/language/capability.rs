//! Capability queries consumed by the spread resolver.
//!
//! The resolver only ever talks to a [`CapabilityOracle`]. [`ImplTable`] is the table-driven
//! oracle used when the pass runs outside a full type checker: it answers queries from declared
//! `impl` rules, optionally generic over type parameters.

use crate::language::{
    errors::{SyntaxError, SyntaxErrors},
    span::Span,
    type_syntax,
    types::TypeExpr,
};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    IntoIterable,
    Copy,
    Sized,
}

impl Capability {
    pub fn name(self) -> &'static str {
        match self {
            Capability::IntoIterable => "IntoIterable",
            Capability::Copy => "Copy",
            Capability::Sized => "Sized",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IntoIterable" => Some(Capability::IntoIterable),
            "Copy" => Some(Capability::Copy),
            "Sized" => Some(Capability::Sized),
            _ => None,
        }
    }

    /// Whether the capability carries an associated `Item` type.
    pub fn has_item(self) -> bool {
        matches!(self, Capability::IntoIterable)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A capability requirement, optionally pinning its associated item type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CapabilityQuery {
    pub capability: Capability,
    pub item: Option<TypeExpr>,
}

impl CapabilityQuery {
    pub fn plain(capability: Capability) -> Self {
        Self {
            capability,
            item: None,
        }
    }

    pub fn into_iterable(item: TypeExpr) -> Self {
        Self {
            capability: Capability::IntoIterable,
            item: Some(item),
        }
    }
}

impl fmt::Display for CapabilityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.item {
            Some(item) => write!(f, "{}<Item={}>", self.capability, item),
            None => write!(f, "{}", self.capability),
        }
    }
}

/// `subject: query`, e.g. `Vec[int32]: IntoIterable<Item=int32>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub subject: TypeExpr,
    pub query: CapabilityQuery,
}

impl Requirement {
    pub fn new(subject: TypeExpr, query: CapabilityQuery) -> Self {
        Self { subject, query }
    }

    pub fn holds(&self, oracle: &dyn CapabilityOracle) -> bool {
        oracle.satisfies(&self.subject, &self.query)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.query)
    }
}

/// Read-only capability resolution. Implementations must be pure: the same `(type, capability)`
/// pair always yields the same answer for the lifetime of the oracle.
pub trait CapabilityOracle {
    fn has_capability(&self, ty: &TypeExpr, capability: Capability) -> bool;

    fn resolve_associated_item_type(
        &self,
        ty: &TypeExpr,
        capability: Capability,
    ) -> Option<TypeExpr>;

    fn satisfies(&self, ty: &TypeExpr, query: &CapabilityQuery) -> bool {
        if !self.has_capability(ty, query.capability) {
            return false;
        }
        match &query.item {
            None => true,
            Some(expected) => {
                self.resolve_associated_item_type(ty, query.capability).as_ref() == Some(expected)
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImplError {
    #[error("`{capability}` is already implemented for `{target}`")]
    Duplicate { capability: Capability, target: String },
    #[error("`{capability}` requires an `Item` type")]
    MissingItem { capability: Capability },
    #[error("`{capability}` does not take an `Item` type")]
    UnexpectedItem { capability: Capability },
    #[error("`{capability}` is structural and cannot be declared")]
    Structural { capability: Capability },
    #[error("type parameter `{param}` in `Item` is not bound by target `{target}`")]
    UnboundParameter { param: String, target: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImplRule {
    pub capability: Capability,
    pub type_params: Vec<String>,
    pub target: TypeExpr,
    pub item: Option<TypeExpr>,
    pub span: Span,
}

impl ImplRule {
    pub fn copy(target: TypeExpr) -> Self {
        Self {
            capability: Capability::Copy,
            type_params: Vec::new(),
            target,
            item: None,
            span: Span::default(),
        }
    }

    pub fn into_iterable(type_params: &[&str], target: TypeExpr, item: TypeExpr) -> Self {
        Self {
            capability: Capability::IntoIterable,
            type_params: type_params.iter().map(|p| p.to_string()).collect(),
            target,
            item: Some(item),
            span: Span::default(),
        }
    }

    fn validate(&self) -> Result<(), ImplError> {
        if self.capability == Capability::Sized {
            return Err(ImplError::Structural {
                capability: self.capability,
            });
        }
        match (&self.item, self.capability.has_item()) {
            (None, true) => {
                return Err(ImplError::MissingItem {
                    capability: self.capability,
                })
            }
            (Some(_), false) => {
                return Err(ImplError::UnexpectedItem {
                    capability: self.capability,
                })
            }
            _ => {}
        }
        if let Some(item) = &self.item {
            for param in &self.type_params {
                if mentions(item, param) && !mentions(&self.target, param) {
                    return Err(ImplError::UnboundParameter {
                        param: param.clone(),
                        target: self.target.canonical_name(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Matches `ty` against the target pattern and returns the type parameter bindings.
    fn bind(&self, ty: &TypeExpr) -> Option<HashMap<String, TypeExpr>> {
        let mut bindings = HashMap::new();
        match_pattern(&self.target, ty, &self.type_params, &mut bindings).then_some(bindings)
    }
}

fn mentions(ty: &TypeExpr, param: &str) -> bool {
    match ty {
        TypeExpr::Named(name, args) => {
            (args.is_empty() && name == param) || args.iter().any(|arg| mentions(arg, param))
        }
        TypeExpr::Slice(inner) => mentions(inner, param),
        TypeExpr::Array { ty, .. } | TypeExpr::Reference { ty, .. } => mentions(ty, param),
        TypeExpr::Tuple(types) => types.iter().any(|ty| mentions(ty, param)),
        TypeExpr::Dyn(_) | TypeExpr::Unit => false,
    }
}

fn match_pattern(
    pattern: &TypeExpr,
    ty: &TypeExpr,
    params: &[String],
    bindings: &mut HashMap<String, TypeExpr>,
) -> bool {
    match (pattern, ty) {
        (TypeExpr::Named(name, args), _) if args.is_empty() && params.contains(name) => {
            match bindings.get(name) {
                Some(bound) => bound == ty,
                None => {
                    bindings.insert(name.clone(), ty.clone());
                    true
                }
            }
        }
        (TypeExpr::Named(p_name, p_args), TypeExpr::Named(name, args)) => {
            p_name == name
                && p_args.len() == args.len()
                && p_args
                    .iter()
                    .zip(args.iter())
                    .all(|(p, t)| match_pattern(p, t, params, bindings))
        }
        (TypeExpr::Slice(p), TypeExpr::Slice(t)) => match_pattern(p, t, params, bindings),
        (
            TypeExpr::Array { size: p_size, ty: p },
            TypeExpr::Array { size, ty: t },
        ) => p_size == size && match_pattern(p, t, params, bindings),
        (
            TypeExpr::Reference {
                mutable: p_mut,
                ty: p,
            },
            TypeExpr::Reference { mutable, ty: t },
        ) => p_mut == mutable && match_pattern(p, t, params, bindings),
        (TypeExpr::Tuple(p_types), TypeExpr::Tuple(types)) => {
            p_types.len() == types.len()
                && p_types
                    .iter()
                    .zip(types.iter())
                    .all(|(p, t)| match_pattern(p, t, params, bindings))
        }
        (TypeExpr::Dyn(p), TypeExpr::Dyn(t)) => p == t,
        (TypeExpr::Unit, TypeExpr::Unit) => true,
        _ => false,
    }
}

const SCALAR_TYPES: &[&str] = &[
    "int8", "int16", "int32", "int64", "isize", "uint8", "uint16", "uint32", "uint64", "usize",
    "float32", "float64", "bool", "rune",
];

/// Oracle backed by declared impl rules. The first declaration whose target matches wins.
#[derive(Clone, Debug, Default)]
pub struct ImplTable {
    rules: Vec<ImplRule>,
}

impl ImplTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in capabilities of the core types.
    pub fn prelude() -> Self {
        let mut table = Self::new();
        for name in SCALAR_TYPES {
            table.rules.push(ImplRule::copy(TypeExpr::named(*name)));
        }
        let t = || TypeExpr::named("T");
        let vec_t = || TypeExpr::generic("Vec", vec![t()]);
        let rules = [
            ImplRule::into_iterable(&["T"], vec_t(), t()),
            ImplRule::into_iterable(&["T"], TypeExpr::shared_ref(vec_t()), TypeExpr::shared_ref(t())),
            ImplRule::into_iterable(&["T"], TypeExpr::unique_ref(vec_t()), TypeExpr::unique_ref(t())),
            ImplRule::into_iterable(
                &["T"],
                TypeExpr::shared_ref(TypeExpr::slice(t())),
                TypeExpr::shared_ref(t()),
            ),
            ImplRule::into_iterable(&[], TypeExpr::named("string"), TypeExpr::named("rune")),
            ImplRule::into_iterable(
                &[],
                TypeExpr::shared_ref(TypeExpr::named("string")),
                TypeExpr::named("rune"),
            ),
            ImplRule::into_iterable(&["T"], TypeExpr::generic("Range", vec![t()]), t()),
            ImplRule::into_iterable(&["T"], TypeExpr::generic("Option", vec![t()]), t()),
            ImplRule::into_iterable(&["T"], TypeExpr::iterator(t()), t()),
        ];
        table.rules.extend(rules);
        table
    }

    /// Parses newline-separated `impl` declarations into a fresh table.
    pub fn parse(source: &str) -> Result<Self, SyntaxErrors> {
        let mut table = Self::new();
        table.extend_from_source(source)?;
        Ok(table)
    }

    /// Adds every declaration in `source`, collecting all syntax and validation errors.
    pub fn extend_from_source(&mut self, source: &str) -> Result<(), SyntaxErrors> {
        let rules = type_syntax::parse_impl_rules(source)?;
        let mut errors = Vec::new();
        for rule in rules {
            let span = rule.span;
            if let Err(err) = self.declare(rule) {
                errors.push(SyntaxError::new(err.to_string(), span));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SyntaxErrors::new(errors))
        }
    }

    pub fn declare(&mut self, rule: ImplRule) -> Result<(), ImplError> {
        rule.validate()?;
        if self
            .rules
            .iter()
            .any(|existing| existing.capability == rule.capability && existing.target == rule.target)
        {
            return Err(ImplError::Duplicate {
                capability: rule.capability,
                target: rule.target.canonical_name(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    fn lookup(&self, ty: &TypeExpr, capability: Capability) -> Option<&ImplRule> {
        self.rules
            .iter()
            .filter(|rule| rule.capability == capability)
            .find(|rule| rule.bind(ty).is_some())
    }

    fn is_copy(&self, ty: &TypeExpr) -> bool {
        match ty {
            TypeExpr::Unit => true,
            TypeExpr::Reference { mutable, .. } => !mutable,
            TypeExpr::Tuple(types) => types.iter().all(|ty| self.is_copy(ty)),
            TypeExpr::Array { ty, .. } => self.is_copy(ty),
            TypeExpr::Slice(_) | TypeExpr::Dyn(_) => false,
            TypeExpr::Named(..) => self.lookup(ty, Capability::Copy).is_some(),
        }
    }

    fn iterable_item(&self, ty: &TypeExpr) -> Option<TypeExpr> {
        match ty {
            TypeExpr::Array { ty: item, .. } => Some((**item).clone()),
            TypeExpr::Reference { mutable, ty: inner } => match &**inner {
                TypeExpr::Array { ty: item, .. } => Some(TypeExpr::Reference {
                    mutable: *mutable,
                    ty: item.clone(),
                }),
                _ => self.declared_item(ty),
            },
            _ => self.declared_item(ty),
        }
    }

    fn declared_item(&self, ty: &TypeExpr) -> Option<TypeExpr> {
        let rule = self.lookup(ty, Capability::IntoIterable)?;
        let bindings = rule.bind(ty)?;
        rule.item.as_ref().map(|item| item.substitute(&bindings))
    }
}

impl CapabilityOracle for ImplTable {
    fn has_capability(&self, ty: &TypeExpr, capability: Capability) -> bool {
        match capability {
            Capability::Sized => ty.is_sized(),
            Capability::Copy => self.is_copy(ty),
            Capability::IntoIterable => self.iterable_item(ty).is_some(),
        }
    }

    fn resolve_associated_item_type(
        &self,
        ty: &TypeExpr,
        capability: Capability,
    ) -> Option<TypeExpr> {
        match capability {
            Capability::IntoIterable => self.iterable_item(ty),
            Capability::Copy | Capability::Sized => None,
        }
    }
}
