use super::{
    chain::{build, AdaptedSegment, ChainPlan, Transfer},
    classify::{classify, AdaptationRule},
    Arity, CallResolutionError, ResolveOptions,
};
use crate::language::{
    ast::{CallArgument, CallSite, ElaboratedCall, Ownership, SpreadArgument},
    capability::{Capability, CapabilityOracle},
    signature::ParameterSignature,
    span::Span,
};
use rayon::prelude::*;
use tracing::{debug, trace, warn};

/// Rewrites call sites against their callee signatures.
///
/// The oracle is only ever read, so one resolver can serve any number of threads.
pub struct CallResolver<'a> {
    oracle: &'a (dyn CapabilityOracle + Sync),
    options: ResolveOptions,
}

impl<'a> CallResolver<'a> {
    pub fn new(oracle: &'a (dyn CapabilityOracle + Sync)) -> Self {
        Self {
            oracle,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn resolve(
        &self,
        call: CallSite,
        signature: &ParameterSignature,
    ) -> Result<ElaboratedCall, CallResolutionError> {
        let CallSite {
            callee,
            mut args,
            span,
        } = call;
        let fixed_arity = signature.fixed_arity();

        let Some(spread) = signature.spread() else {
            if args.len() != fixed_arity {
                return Err(CallResolutionError::Arity {
                    callee,
                    expected: Arity::Exactly(fixed_arity),
                    found: args.len(),
                    span,
                });
            }
            return Ok(ElaboratedCall {
                callee,
                fixed: args,
                spread: None,
                span,
            });
        };

        if args.len() < fixed_arity {
            return Err(CallResolutionError::Arity {
                callee,
                expected: Arity::AtLeast(fixed_arity),
                found: args.len(),
                span,
            });
        }

        let trailing = args.split_off(fixed_arity);
        let element_type = &spread.element_type;
        debug!(
            callee = %callee,
            fixed = fixed_arity,
            trailing = trailing.len(),
            element_type = %element_type,
            "resolving spread call"
        );

        let spread_span = trailing
            .iter()
            .map(|arg| arg.span)
            .reduce(Span::cover)
            .unwrap_or(span);
        let mut plan = ChainPlan::new(element_type.clone());
        for (index, argument) in trailing.into_iter().enumerate() {
            let rule = classify(&argument.ty, element_type, self.oracle);
            if let AdaptationRule::Unresolved(unresolved) = rule {
                warn!(
                    callee = %callee,
                    index,
                    arg_type = %unresolved.actual,
                    element_type = %element_type,
                    "trailing argument cannot be spread"
                );
                return Err(CallResolutionError::UnresolvedTrailingArgument {
                    callee,
                    index,
                    position: fixed_arity + index,
                    arg_type: unresolved.actual,
                    element_type: element_type.clone(),
                    attempted: unresolved.attempted,
                    span: argument.span,
                });
            }
            let transfer = self.transfer_for(&rule, &argument);
            trace!(index, rule = rule.name(), transfer = ?transfer, "segment planned");
            let segment = AdaptedSegment {
                argument_index: index,
                rule,
                transfer,
                argument,
            };
            if let Err(source) = plan.push(segment) {
                return Err(CallResolutionError::Plan {
                    callee,
                    source,
                    span,
                });
            }
        }

        let seq = build(plan, &self.options);
        let spread = SpreadArgument {
            ty: seq.ty(),
            seq,
            span: spread_span,
        };
        Ok(ElaboratedCall {
            callee,
            fixed: args,
            spread: Some(spread),
            span,
        })
    }

    /// Resolves independent call sites. Each failure is isolated to its call site; either every
    /// call resolves or all errors are returned, in input order.
    pub fn resolve_all(
        &self,
        calls: Vec<(CallSite, &ParameterSignature)>,
    ) -> Result<Vec<ElaboratedCall>, Vec<CallResolutionError>> {
        let results: Vec<Result<ElaboratedCall, CallResolutionError>> = if self.options.parallel {
            calls
                .into_par_iter()
                .map(|(call, signature)| self.resolve(call, signature))
                .collect()
        } else {
            calls
                .into_iter()
                .map(|(call, signature)| self.resolve(call, signature))
                .collect()
        };

        let mut resolved = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(call) => resolved.push(call),
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(resolved)
        } else {
            Err(errors)
        }
    }

    fn transfer_for(&self, rule: &AdaptationRule, argument: &CallArgument) -> Transfer {
        if matches!(rule, AdaptationRule::BorrowedCopyIterable(_)) {
            return Transfer::Borrow;
        }
        match argument.ownership {
            Ownership::Shared => Transfer::Copy,
            Ownership::Unique => Transfer::Move,
            Ownership::Owned => {
                if self.oracle.has_capability(&argument.ty, Capability::Copy) {
                    Transfer::Copy
                } else {
                    Transfer::Move
                }
            }
        }
    }
}

/// Resolves one call site with default options.
pub fn resolve(
    call: CallSite,
    signature: &ParameterSignature,
    oracle: &(dyn CapabilityOracle + Sync),
) -> Result<ElaboratedCall, CallResolutionError> {
    CallResolver::new(oracle).resolve(call, signature)
}
