use super::*;
use crate::language::{
    ast::{CallArgument, CallSite, ElaboratedCall, Expr, Ownership, SeqExpr},
    capability::{Capability, CapabilityOracle, ImplTable},
    signature::{FixedParam, ParameterSignature, SpreadParam},
    span::Span,
    type_syntax::parse_type,
    types::TypeExpr,
};
use crate::runtime::{
    value::{SliceValue, Value},
    Interpreter, LazySeq,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

fn ty(src: &str) -> TypeExpr {
    parse_type(src).expect("type")
}

fn int_slice(values: &[i128]) -> Value {
    Value::Slice(SliceValue::from_vec(
        values.iter().map(|v| Value::Int(*v)).collect(),
    ))
}

fn variadic(fixed: &[(&str, &str)], element: &str) -> ParameterSignature {
    let params = fixed
        .iter()
        .map(|(name, t)| FixedParam {
            name: name.to_string(),
            ty: ty(t),
        })
        .collect();
    ParameterSignature::with_spread(
        params,
        SpreadParam {
            name: "rest".into(),
            element_type: ty(element),
        },
    )
    .expect("signature")
}

fn int_arg(value: i128) -> CallArgument {
    CallArgument::owned(Expr::int(value), ty("int32"))
}

fn named_arg(name: &str, t: &str) -> CallArgument {
    CallArgument::owned(Expr::ident(name), ty(t))
}

fn borrowed_arg(name: &str, t: &str) -> CallArgument {
    CallArgument::shared(Expr::borrow(Expr::ident(name)), ty(t))
}

fn collect_ints(interpreter: &mut Interpreter, call: &ElaboratedCall) -> Vec<i128> {
    let evaluated = interpreter.eval_call(call).expect("eval");
    evaluated
        .spread
        .expect("spread")
        .filter_map(|v| v.as_int())
        .collect()
}

/// Records every capability query so tests can see which argument types were consulted.
struct CountingOracle {
    inner: ImplTable,
    queries: AtomicUsize,
    subjects: Mutex<Vec<TypeExpr>>,
}

impl CountingOracle {
    fn new() -> Self {
        Self {
            inner: ImplTable::prelude(),
            queries: AtomicUsize::new(0),
            subjects: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn was_queried(&self, ty: &TypeExpr) -> bool {
        self.subjects.lock().expect("subjects").contains(ty)
    }

    fn record(&self, ty: &TypeExpr) {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.subjects.lock().expect("subjects").push(ty.clone());
    }
}

impl CapabilityOracle for CountingOracle {
    fn has_capability(&self, ty: &TypeExpr, capability: Capability) -> bool {
        self.record(ty);
        self.inner.has_capability(ty, capability)
    }

    fn resolve_associated_item_type(
        &self,
        ty: &TypeExpr,
        capability: Capability,
    ) -> Option<TypeExpr> {
        self.record(ty);
        self.inner.resolve_associated_item_type(ty, capability)
    }
}

#[test]
fn fixed_callees_check_exact_arity_without_classifying() {
    let oracle = CountingOracle::new();
    let signature = ParameterSignature::fixed(vec![FixedParam {
        name: "x".into(),
        ty: ty("int32"),
    }]);
    let call = CallSite::new("f", vec![int_arg(1), int_arg(2), int_arg(3)]);
    let err = resolve(call, &signature, &oracle).unwrap_err();
    assert_eq!(
        err,
        CallResolutionError::Arity {
            callee: "f".into(),
            expected: Arity::Exactly(1),
            found: 3,
            span: Span::default(),
        }
    );
    assert_eq!(oracle.queries(), 0);

    let ok = resolve(CallSite::new("f", vec![int_arg(1)]), &signature, &oracle).expect("call");
    assert!(ok.spread.is_none());
    assert_eq!(ok.arity(), 1);
    assert_eq!(oracle.queries(), 0);
}

#[test]
fn spread_callees_need_every_fixed_argument() {
    let table = ImplTable::prelude();
    let signature = variadic(&[("a", "int32"), ("b", "int32")], "int32");
    let err = resolve(CallSite::new("f", vec![int_arg(1)]), &signature, &table).unwrap_err();
    assert!(matches!(
        err,
        CallResolutionError::Arity {
            expected: Arity::AtLeast(2),
            found: 1,
            ..
        }
    ));
    assert_eq!(err.code(), "E0AR");
}

#[test]
fn no_trailing_arguments_give_an_empty_sequence() {
    let table = ImplTable::prelude();
    let signature = variadic(&[("a", "int32")], "int32");
    let call = resolve(CallSite::new("f", vec![int_arg(1)]), &signature, &table).expect("call");
    let spread = call.spread.as_ref().expect("spread");
    assert_eq!(spread.seq, SeqExpr::Empty { item: ty("int32") });
    assert_eq!(spread.ty, ty("Iterator[int32]"));
    assert_eq!(call.arity(), 2);

    let mut interpreter = Interpreter::new();
    assert!(collect_ints(&mut interpreter, &call).is_empty());
}

#[test]
fn single_value_is_wrapped_once() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let call = resolve(CallSite::new("f", vec![int_arg(5)]), &signature, &table).expect("call");
    assert_eq!(
        call.spread.as_ref().map(|s| &s.seq),
        Some(&SeqExpr::Once {
            value: Box::new(Expr::int(5)),
            item: ty("int32"),
        })
    );
    let mut interpreter = Interpreter::new();
    assert_eq!(collect_ints(&mut interpreter, &call), vec![5]);
}

#[test]
fn values_and_collections_flatten_in_order() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let call = CallSite::new(
        "sum",
        vec![int_arg(1), int_arg(2), named_arg("v", "Vec[int32]")],
    );
    let elaborated = resolve(call, &signature, &table).expect("call");
    assert!(elaborated.fixed.is_empty());
    let spread = elaborated.spread.as_ref().expect("spread");
    let kinds: Vec<&str> = spread
        .seq
        .sources()
        .into_iter()
        .map(|source| match source {
            SeqExpr::Once { .. } => "once",
            SeqExpr::Owned { .. } => "owned",
            SeqExpr::Copied { .. } => "copied",
            SeqExpr::Empty { .. } => "empty",
            SeqExpr::Chain { .. } => "chain",
        })
        .collect();
    assert_eq!(kinds, vec!["once", "once", "owned"]);

    let mut interpreter = Interpreter::new();
    interpreter.declare("v", int_slice(&[10, 20]));
    assert_eq!(collect_ints(&mut interpreter, &elaborated), vec![1, 2, 10, 20]);
    assert!(interpreter.env().is_moved("v"));
}

#[test]
fn first_unresolved_argument_is_reported() {
    let oracle = CountingOracle::new();
    let signature = variadic(&[("x", "string")], "int32");
    let call = CallSite::new(
        "f",
        vec![
            named_arg("s", "string"),
            int_arg(1),
            named_arg("flag", "bool"),
            named_arg("other", "Option[bool]"),
        ],
    );
    let err = resolve(call, &signature, &oracle).unwrap_err();
    match &err {
        CallResolutionError::UnresolvedTrailingArgument {
            index,
            position,
            arg_type,
            element_type,
            attempted,
            ..
        } => {
            assert_eq!(*index, 1);
            assert_eq!(*position, 2);
            assert_eq!(arg_type, &ty("bool"));
            assert_eq!(element_type, &ty("int32"));
            assert_eq!(attempted.len(), 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.code(), "E0SP");
    assert!(err.help().expect("help").starts_with("unsatisfied:"));
    assert!(oracle.was_queried(&ty("bool")));
    assert!(!oracle.was_queried(&ty("Option[bool]")));
}

#[test]
fn exact_string_is_not_split_into_runes() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "string");
    let call = CallSite::new("join", vec![CallArgument::owned(Expr::string("ab"), ty("string"))]);
    let elaborated = resolve(call, &signature, &table).expect("call");
    let mut interpreter = Interpreter::new();
    let items: Vec<String> = interpreter
        .eval_call(&elaborated)
        .expect("eval")
        .spread
        .expect("spread")
        .map(|v| v.to_string())
        .collect();
    assert_eq!(items, vec!["ab".to_string()]);

    let runes = variadic(&[], "rune");
    let call = CallSite::new("chars", vec![CallArgument::owned(Expr::string("ab"), ty("string"))]);
    let elaborated = resolve(call, &runes, &table).expect("call");
    assert!(matches!(
        elaborated.spread.map(|s| s.seq),
        Some(SeqExpr::Owned { .. })
    ));
}

#[test]
fn borrowed_sources_stay_usable() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let call = CallSite::new(
        "sum",
        vec![
            borrowed_arg("w", "&Vec[int32]"),
            named_arg("v", "Vec[int32]"),
        ],
    );
    let elaborated = resolve(call, &signature, &table).expect("call");
    let mut interpreter = Interpreter::new();
    interpreter.declare("w", int_slice(&[1, 2]));
    interpreter.declare("v", int_slice(&[3]));
    assert_eq!(collect_ints(&mut interpreter, &elaborated), vec![1, 2, 3]);
    assert!(!interpreter.env().is_moved("w"));
    assert!(interpreter.env().is_moved("v"));
    assert_eq!(interpreter.env().moves(), ["v".to_string()]);
    assert_eq!(
        interpreter.env().get("w").map(|v| v.to_string()),
        Some("[1, 2]".to_string())
    );
}

#[test]
fn copy_values_are_not_moved() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let call = CallSite::new("f", vec![named_arg("n", "int32")]);
    let elaborated = resolve(call, &signature, &table).expect("call");
    let mut interpreter = Interpreter::new();
    interpreter.declare("n", Value::Int(4));
    assert_eq!(collect_ints(&mut interpreter, &elaborated), vec![4]);
    assert!(!interpreter.env().is_moved("n"));
}

#[test]
fn arguments_are_evaluated_before_iteration_in_source_order() {
    let table = ImplTable::prelude();
    let signature = variadic(&[("x", "int32")], "int32");
    let call = CallSite::new(
        "f",
        vec![
            named_arg("a", "int32"),
            named_arg("b", "int32"),
            borrowed_arg("c", "&Vec[int32]"),
            named_arg("d", "Vec[int32]"),
        ],
    );
    let elaborated = resolve(call, &signature, &table).expect("call");
    let mut interpreter = Interpreter::new();
    interpreter.declare("a", Value::Int(1));
    interpreter.declare("b", Value::Int(2));
    interpreter.declare("c", int_slice(&[3]));
    interpreter.declare("d", int_slice(&[4]));
    let evaluated = interpreter.eval_call(&elaborated).expect("eval");
    assert_eq!(
        interpreter.trace(),
        ["a", "b", "c", "d"].map(String::from).as_slice()
    );
    let items: Vec<i128> = evaluated
        .spread
        .expect("spread")
        .filter_map(|v| v.as_int())
        .collect();
    assert_eq!(items, vec![2, 3, 4]);
    assert_eq!(evaluated.fixed.len(), 1);
}

#[test]
fn fused_and_unfused_sequences_yield_the_same_items() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let call = CallSite::new("f", vec![named_arg("v", "Vec[int32]")]);

    let fused = CallResolver::new(&table)
        .resolve(call.clone(), &signature)
        .expect("fused");
    let unfused = CallResolver::new(&table)
        .with_options(ResolveOptions {
            fuse_single_segment: false,
            ..ResolveOptions::default()
        })
        .resolve(call, &signature)
        .expect("unfused");
    assert!(matches!(
        fused.spread.as_ref().map(|s| &s.seq),
        Some(SeqExpr::Owned { .. })
    ));
    assert!(matches!(
        unfused.spread.as_ref().map(|s| &s.seq),
        Some(SeqExpr::Chain { .. })
    ));

    for call in [fused, unfused] {
        let mut interpreter = Interpreter::new();
        interpreter.declare("v", int_slice(&[7, 8]));
        assert_eq!(collect_ints(&mut interpreter, &call), vec![7, 8]);
    }
}

#[test]
fn spread_span_covers_trailing_arguments() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let mut first = int_arg(1);
    first.span = Span::new(4, 5);
    let mut second = int_arg(2);
    second.span = Span::new(7, 8);
    let call = CallSite::new("f", vec![first, second]).with_span(Span::new(0, 9));
    let elaborated = resolve(call, &signature, &table).expect("call");
    assert_eq!(elaborated.spread.map(|s| s.span), Some(Span::new(4, 8)));
    assert_eq!(elaborated.span, Span::new(0, 9));
}

#[test]
fn batch_resolution_isolates_failures() {
    let table = ImplTable::prelude();
    let spread = variadic(&[], "int32");
    let fixed = ParameterSignature::fixed(Vec::new());
    let calls = vec![
        (CallSite::new("ok", vec![int_arg(1)]), &spread),
        (CallSite::new("bad", vec![named_arg("b", "bool")]), &spread),
        (CallSite::new("also_ok", Vec::new()), &fixed),
        (CallSite::new("too_many", vec![int_arg(1)]), &fixed),
    ];
    let errors = CallResolver::new(&table).resolve_all(calls).unwrap_err();
    let callees: Vec<&str> = errors
        .iter()
        .map(|err| match err {
            CallResolutionError::Arity { callee, .. }
            | CallResolutionError::UnresolvedTrailingArgument { callee, .. }
            | CallResolutionError::Plan { callee, .. } => callee.as_str(),
        })
        .collect();
    assert_eq!(callees, vec!["bad", "too_many"]);
}

#[test]
fn parallel_batches_match_serial_results() {
    let table = ImplTable::prelude();
    let signature = variadic(&[("x", "int32")], "int32");
    let calls: Vec<CallSite> = (0..32)
        .map(|n| {
            let args = (0..=n % 5).map(int_arg).collect();
            CallSite::new(format!("f{n}"), args)
        })
        .collect();
    let batch = |parallel| {
        let pairs = calls.iter().cloned().map(|call| (call, &signature)).collect();
        CallResolver::new(&table)
            .with_options(ResolveOptions {
                parallel,
                ..ResolveOptions::default()
            })
            .resolve_all(pairs)
            .expect("batch")
    };
    assert_eq!(batch(true), batch(false));
}

#[test]
fn options_read_from_environment() {
    std::env::set_var("PRIME_SPREAD_FUSE_SINGLE", "off");
    std::env::set_var("PRIME_SPREAD_PARALLEL", "1");
    let options = ResolveOptions::from_env();
    std::env::remove_var("PRIME_SPREAD_FUSE_SINGLE");
    std::env::remove_var("PRIME_SPREAD_PARALLEL");
    assert_eq!(
        options,
        ResolveOptions {
            fuse_single_segment: false,
            parallel: true,
        }
    );

    std::env::set_var("PRIME_SPREAD_PARALLEL", "maybe");
    let options = ResolveOptions::from_env();
    std::env::remove_var("PRIME_SPREAD_PARALLEL");
    assert!(!options.parallel);
}

#[test]
fn declared_capabilities_feed_resolution() {
    let mut table = ImplTable::prelude();
    table
        .extend_from_source("impl Copy for Point\nimpl IntoIterable<Item=&Point> for &Polygon\n")
        .expect("impls");
    let signature = variadic(&[], "Point");
    let call = CallSite::new("draw", vec![borrowed_arg("p", "&Polygon")]);
    let elaborated = resolve(call, &signature, &table).expect("call");
    assert!(matches!(
        elaborated.spread.map(|s| s.seq),
        Some(SeqExpr::Copied { .. })
    ));
}

#[test]
fn shared_collection_references_yield_their_items() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "&int32");
    let call = CallSite::new("f", vec![borrowed_arg("w", "&Vec[int32]")]);
    let elaborated = resolve(call, &signature, &table).expect("call");
    assert!(matches!(
        elaborated.spread.as_ref().map(|s| &s.seq),
        Some(SeqExpr::Owned { .. })
    ));

    let mut interpreter = Interpreter::new();
    interpreter.declare("w", int_slice(&[1, 2]));
    assert_eq!(collect_ints(&mut interpreter, &elaborated), vec![1, 2]);
    assert!(!interpreter.env().is_moved("w"));
}

#[test]
fn unique_arguments_are_moved_or_mutably_borrowed() {
    let table = ImplTable::prelude();
    let unique_ref = CallArgument::new(
        Expr::Reference {
            mutable: true,
            expr: Box::new(Expr::ident("w")),
            span: Span::default(),
        },
        ty("&mut Vec[int32]"),
        Ownership::Unique,
    );
    let elaborated = resolve(
        CallSite::new("f", vec![unique_ref]),
        &variadic(&[], "&mut int32"),
        &table,
    )
    .expect("call");
    let mut interpreter = Interpreter::new();
    interpreter.declare("w", int_slice(&[3, 4]));
    assert_eq!(collect_ints(&mut interpreter, &elaborated), vec![3, 4]);
    assert!(!interpreter.env().is_moved("w"));

    let unique_iter =
        CallArgument::new(Expr::ident("it"), ty("Iterator[int32]"), Ownership::Unique);
    let elaborated = resolve(
        CallSite::new("g", vec![unique_iter]),
        &variadic(&[], "int32"),
        &table,
    )
    .expect("call");
    assert!(matches!(
        elaborated.spread.as_ref().map(|s| &s.seq),
        Some(SeqExpr::Owned { source, .. }) if matches!(**source, Expr::Move { .. })
    ));
    let mut interpreter = Interpreter::new();
    let items = LazySeq::owned(int_slice(&[5, 6])).expect("seq");
    interpreter.declare("it", Value::Seq(Box::new(items)));
    assert_eq!(collect_ints(&mut interpreter, &elaborated), vec![5, 6]);
    assert!(interpreter.env().is_moved("it"));
}

#[test]
fn synthesized_argument_evaluates_to_a_sequence_value() {
    let table = ImplTable::prelude();
    let signature = variadic(&[], "int32");
    let call = CallSite::new("f", vec![int_arg(1), named_arg("v", "Vec[int32]")]);
    let elaborated = resolve(call, &signature, &table).expect("call");
    let spread = elaborated.spread.expect("spread");

    let mut interpreter = Interpreter::new();
    interpreter.declare("v", int_slice(&[2]));
    let value = interpreter.eval_expression(&spread.to_expr()).expect("eval");
    let items: Vec<i128> = value
        .into_seq()
        .expect("sequence value")
        .filter_map(|v| v.as_int())
        .collect();
    assert_eq!(items, vec![1, 2]);
}
