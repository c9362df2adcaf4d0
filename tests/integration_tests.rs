//! End-to-end tests: syntax trees compiled by the engine and run on the VM.

mod common;

use std::sync::atomic::Ordering;

use bumpalo::Bump;
use common::{GEO, Vector3, compile, counter_module, engine, functions, geo_module, load};
use tetra::ast::{AstBuilder, Binding, FnModifiers, Item};
use tetra::{Engine, ErrorKind, FutureResult, RealizedType, ReplValue, TetraError, Value};
use tetra_core::{BinaryOperator, BoundType, substitution};

// ============================================================================
// Generics
// ============================================================================

struct Slot<T>(std::marker::PhantomData<T>);

#[test]
fn bound_generic_fill_alias_and_infer() {
    let def = BoundType::for_native::<Slot<()>>(GEO, "Slot", &["T"]).unwrap();
    let declared = RealizedType::bound(std::sync::Arc::new(def));
    assert!(!declared.is_valid());

    let int_slot = declared.fill_generics(&substitution([("T", RealizedType::INT)]));
    assert!(int_slot.is_valid());
    assert_eq!(int_slot.to_string(), "geo::Slot<int>");
    assert_eq!(RealizedType::INT.fill_generics(&substitution([("T", RealizedType::STRING)])), RealizedType::INT);

    let through_alias = declared
        .fill_generics(&substitution([("T", RealizedType::generic("U"))]))
        .fill_generics(&substitution([("U", RealizedType::STRING)]));
    let direct = declared.fill_generics(&substitution([("T", RealizedType::STRING)]));
    assert_eq!(through_alias, direct);

    for concrete in [RealizedType::INT, RealizedType::array(RealizedType::FLOAT)] {
        let sigma = substitution([("T", concrete)]);
        let filled = declared.fill_generics(&sigma);
        assert_eq!(declared.infer_generic_argument(&filled), sigma);
    }

    let aliased = declared.fill_generics(&substitution([("T", RealizedType::generic("U"))]));
    assert_eq!(aliased.to_string(), "geo::Slot<U>");
    assert_eq!(
        aliased.infer_generic_argument(&int_slot),
        substitution([("U", RealizedType::INT)])
    );
}

#[test]
fn generic_methods_infer_from_arguments() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let describe = b.block(vec![], Some(b.method(b.var("n"), "to_string", vec![])));
    let run = b.block(
        vec![],
        Some(b.method(
            b.array(vec![b.int(1), b.int(22)]),
            "map",
            vec![b.var("describe")],
        )),
    );
    let module = b.module(
        "generics",
        functions(vec![
            b.function("describe", vec![b.param("n", b.ty("int"))], Some(b.ty("string")), describe),
            b.function("run", vec![], Some(b.array_ty(b.ty("string"))), run),
        ]),
    );

    let vm = load(&engine, &module);
    assert_eq!(
        vm.call("run", vec![]).unwrap(),
        Value::array(vec![Value::string("1"), Value::string("22")])
    );
}

// ============================================================================
// Bound types
// ============================================================================

#[test]
fn not_equal_is_the_negation_of_equal() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let params = || vec![b.param("a", b.ty("Vector3")), b.param("b", b.ty("Vector3"))];
    let same = b.block(vec![], Some(b.binary(BinaryOperator::Eq, b.var("a"), b.var("b"))));
    let differ = b.block(vec![], Some(b.binary(BinaryOperator::NotEq, b.var("a"), b.var("b"))));
    let module = b.module(
        "vectors",
        vec![
            b.use_glob(GEO),
            Item::Function(b.function("same", params(), Some(b.ty("bool")), same)),
            Item::Function(b.function("differ", params(), Some(b.ty("bool")), differ)),
        ],
    );

    let vm = load(&engine, &module);
    let points = [
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 2.0, 3.0),
        Vector3::new(1.0, 2.0, 3.5),
    ];
    for a in points {
        for c in points {
            let args = vec![a.value(), c.value()];
            let same = vm.call("same", args.clone()).unwrap().as_bool().unwrap();
            let differ = vm.call("differ", args).unwrap().as_bool().unwrap();
            assert_eq!(same, a == c);
            assert_eq!(differ, !same);
        }
    }
}

#[test]
fn bound_values_are_built_and_read_by_script() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(
        vec![b.let_(
            "v",
            None,
            b.call_in(GEO, "vec3", vec![b.float(1.5), b.int(2), b.float(3.0)]),
        )],
        Some(b.field(b.var("v"), "x")),
    );
    let module = b.module(
        "vectors",
        functions(vec![b.function("first", vec![], Some(b.ty("float")), body)]),
    );

    let vm = load(&engine, &module);
    assert_eq!(vm.call("first", vec![]).unwrap(), Value::Float(1.5));
}

#[test]
fn field_writes_reach_every_holder_of_a_host_object() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(
        vec![
            b.let_("a", None, b.call_in(GEO, "vec3", vec![b.float(1.0), b.float(2.0), b.float(3.0)])),
            b.let_("alias", None, b.var("a")),
            b.assign(b.field(b.var("alias"), "x"), b.float(9.0)),
        ],
        Some(b.field(b.var("a"), "x")),
    );
    let module = b.module(
        "vectors",
        functions(vec![b.function("shared", vec![], Some(b.ty("float")), body)]),
    );

    let vm = load(&engine, &module);
    assert_eq!(vm.call("shared", vec![]).unwrap(), Value::Float(9.0));

    let held = Vector3::new(1.0, 2.0, 3.0).value();
    let native = held.as_native().unwrap().clone();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(
        vec![b.assign(b.field(b.var("v"), "x"), b.float(-4.0))],
        None,
    );
    let module = b.module(
        "vectors",
        functions(vec![b.function(
            "reset",
            vec![b.param("v", b.ty_in(GEO, "Vector3", vec![]))],
            None,
            body,
        )]),
    );
    let vm = load(&engine, &module);
    vm.call("reset", vec![held]).unwrap();
    assert_eq!(native.with_ref(|v: &Vector3| v.x).unwrap(), -4.0);
}

#[test]
fn unknown_operator_on_bound_type_is_reported() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(vec![], Some(b.binary(BinaryOperator::Add, b.var("a"), b.var("a"))));
    let module = b.module(
        "vectors",
        vec![
            b.use_names(GEO, &["Vector3"]),
            Item::Function(b.function(
                "double",
                vec![b.param("a", b.ty("Vector3"))],
                Some(b.ty("Vector3")),
                body,
            )),
        ],
    );

    let result = compile(&engine, &module);
    assert_eq!(result.diagnostics.count_of(ErrorKind::UnresolvedOperator), 1);
}

// ============================================================================
// Scoping
// ============================================================================

#[test]
fn nested_blocks_shadow_outer_variables() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let inner = b.block_expr(
        vec![b.let_("x", None, b.int(20))],
        Some(b.var("x")),
    );
    let body = b.block(
        vec![b.let_("x", None, b.int(1)), b.let_("inner", None, inner)],
        Some(b.binary(BinaryOperator::Add, b.var("inner"), b.var("x"))),
    );
    let module = b.module(
        "scopes",
        functions(vec![b.function("shadow", vec![], Some(b.ty("int")), body)]),
    );

    let vm = load(&engine, &module);
    assert_eq!(vm.call("shadow", vec![]).unwrap(), Value::Int(21));
}

#[test]
fn redeclaring_in_the_same_block_is_rejected() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(
        vec![b.let_("x", None, b.int(1)), b.let_("x", None, b.int(2))],
        Some(b.var("x")),
    );
    let module = b.module(
        "scopes",
        functions(vec![b.function("twice", vec![], Some(b.ty("int")), body)]),
    );

    let result = compile(&engine, &module);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics.count_of(ErrorKind::DuplicateVariableName), 1);
}

// ============================================================================
// Ranges
// ============================================================================

#[test]
fn range_yields_its_elements_in_order() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let identity = b.block(vec![], Some(b.var("i")));
    let elements = b.block(
        vec![],
        Some(b.method(b.range(b.int(2), b.int(5)), "map", vec![b.var("identity")])),
    );
    let module = b.module(
        "ranges",
        functions(vec![
            b.function("identity", vec![b.param("i", b.ty("int"))], Some(b.ty("int")), identity),
            b.function("elements", vec![], Some(b.array_ty(b.ty("int"))), elements),
        ]),
    );

    let vm = load(&engine, &module);
    assert_eq!(
        vm.call("elements", vec![]).unwrap(),
        Value::array(vec![Value::Int(2), Value::Int(3), Value::Int(4)])
    );
}

#[test]
fn iterating_a_range_twice_repeats_the_sequence() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let digits = || {
        b.for_in(
            "i",
            b.var("r"),
            b.block(
                vec![b.assign(
                    b.var("acc"),
                    b.binary(
                        BinaryOperator::Add,
                        b.binary(BinaryOperator::Mul, b.var("acc"), b.int(10)),
                        b.var("i"),
                    ),
                )],
                None,
            ),
        )
    };
    let body = b.block(
        vec![
            b.let_("r", None, b.range(b.int(2), b.int(5))),
            b.let_("acc", None, b.int(0)),
            digits(),
            digits(),
        ],
        Some(b.var("acc")),
    );
    let module = b.module(
        "ranges",
        functions(vec![b.function("twice", vec![], Some(b.ty("int")), body)]),
    );

    let vm = load(&engine, &module);
    assert_eq!(vm.call("twice", vec![]).unwrap(), Value::Int(234_234));
}

/// `sum()`: `total` over `source`, with `body` run before each add.
fn summing_loop<'a>(
    b: &AstBuilder<'a>,
    source: tetra::ast::Expr<'a>,
    mut body: Vec<tetra::ast::Expr<'a>>,
) -> tetra::ast::FunctionDecl<'a> {
    body.push(b.assign(
        b.var("total"),
        b.binary(BinaryOperator::Add, b.var("total"), b.var("i")),
    ));
    let block = b.block(
        vec![
            b.let_("total", None, b.int(0)),
            b.for_in("i", source, b.block(body, None)),
        ],
        Some(b.var("total")),
    );
    b.function("sum", vec![], Some(b.ty("int")), block)
}

#[test]
fn empty_range_runs_no_iterations() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let count = b.assign(
        b.var("runs"),
        b.binary(BinaryOperator::Add, b.var("runs"), b.int(1)),
    );
    let body = b.block(
        vec![
            b.let_("runs", None, b.int(0)),
            b.for_in("i", b.range(b.int(5), b.int(2)), b.block(vec![count], None)),
        ],
        Some(b.var("runs")),
    );
    let module = b.module(
        "ranges",
        functions(vec![b.function("runs", vec![], Some(b.ty("int")), body)]),
    );

    let vm = load(&engine, &module);
    assert_eq!(vm.call("runs", vec![]).unwrap(), Value::Int(0));
}

#[test]
fn inclusive_range_visits_its_upper_bound() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let sum = summing_loop(&b, b.range_inclusive(b.int(2), b.int(4)), vec![]);
    let module = b.module("ranges", functions(vec![sum]));

    let vm = load(&engine, &module);
    assert_eq!(vm.call("sum", vec![]).unwrap(), Value::Int(2 + 3 + 4));
}

#[test]
fn continue_and_break_inside_a_range_loop() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let when = |n: i64, exit| {
        b.if_(
            b.binary(BinaryOperator::Eq, b.var("i"), b.int(n)),
            b.block(vec![exit], None),
            None,
        )
    };
    let sum = summing_loop(
        &b,
        b.range(b.int(0), b.int(10)),
        vec![when(3, b.continue_()), when(6, b.break_())],
    );
    let module = b.module("ranges", functions(vec![sum]));

    let vm = load(&engine, &module);
    assert_eq!(vm.call("sum", vec![]).unwrap(), Value::Int(1 + 2 + 4 + 5));
}

// ============================================================================
// Function compilation
// ============================================================================

#[test]
fn return_mismatch_only_drops_the_broken_function() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let module = b.module(
        "mixed",
        functions(vec![
            b.function("broken", vec![], Some(b.ty("int")), b.block(vec![], Some(b.string("text")))),
            b.function("fine", vec![], Some(b.ty("int")), b.block(vec![], Some(b.int(7)))),
        ]),
    );

    let result = compile(&engine, &module);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics.count_of(ErrorKind::IncompatibleTypes), 1);
    assert!(result.module.function("broken").is_none());
    assert!(result.module.function("fine").is_some());

    match engine.load(&module) {
        Err(TetraError::Compilation(diagnostics)) => assert_eq!(diagnostics.len(), 1),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("module with diagnostics must not load"),
    }
}

#[test]
fn async_body_runs_only_when_advanced() {
    let mut engine = Engine::new().unwrap();
    let (counter, calls) = counter_module("probe").unwrap();
    engine.add_module(counter).unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(
        vec![b.yield_(), b.call("bump", vec![])],
        Some(b.int(7)),
    );
    let module = b.module(
        "later",
        vec![
            b.use_names("probe", &["bump"]),
            Item::Function(b.async_function("later", vec![], Some(b.ty("int")), body)),
        ],
    );

    let vm = load(&engine, &module);
    let value = vm.call("later", vec![]).unwrap();
    let future = value.as_future().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(future.advance().unwrap(), FutureResult::Pending);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(future.advance().unwrap(), FutureResult::Ready(Value::Int(7)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(future.is_completed());
}

#[test]
fn test_functions_are_collected_and_run() {
    let engine = engine();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let passing = b.block(vec![], None);
    let failing = b.block(vec![], Some(b.binary(BinaryOperator::Div, b.int(1), b.int(0))));
    let waiting = b.block(
        vec![b.await_(b.call_in("core", "wait_ticks", vec![b.int(3)]))],
        None,
    );
    let module = b.module(
        "checks",
        functions(vec![
            tetra::ast::FunctionDecl {
                modifiers: FnModifiers::TEST,
                ..b.function("passes", vec![], None, passing)
            },
            tetra::ast::FunctionDecl {
                modifiers: FnModifiers::TEST,
                ..b.function("divides_by_zero", vec![], Some(b.ty("int")), failing)
            },
            tetra::ast::FunctionDecl {
                modifiers: FnModifiers::TEST,
                ..b.async_function("waits", vec![], None, waiting)
            },
            b.function("helper", vec![], None, b.block(vec![], None)),
        ]),
    );

    let vm = load(&engine, &module);
    let outcomes = vm.run_tests(16);
    let summary: Vec<(&str, bool)> = outcomes
        .iter()
        .map(|o| (o.name.as_str(), o.passed()))
        .collect();
    assert_eq!(
        summary,
        [("passes", true), ("divides_by_zero", false), ("waits", true)]
    );

    let outcomes = vm.run_tests(2);
    assert!(!outcomes[2].passed());
}

// ============================================================================
// Interactive evaluation
// ============================================================================

#[test]
fn repl_session_keeps_variables_between_evaluations() {
    let mut engine = Engine::new().unwrap();
    engine.add_module(geo_module().unwrap()).unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let mut repl = engine.repl();
    repl.import(GEO).unwrap();

    let decl = b.declaration(
        Binding::Name(b.str("origin")),
        true,
        None,
        b.call("vec3", vec![b.int(0), b.int(0), b.int(0)]),
    );
    let declared = repl.declare(&decl).unwrap();
    assert_eq!(declared.ty.local_name(), "Vector3");

    let check = b.binary(
        BinaryOperator::Eq,
        b.var("origin"),
        b.call("vec3", vec![b.float(0.0), b.float(0.0), b.float(0.0)]),
    );
    let evaluated = repl.eval(&check).unwrap();
    assert_eq!(evaluated.ty, RealizedType::BOOL);
    assert_eq!(evaluated.value, ReplValue::Ready(Value::Bool(true)));

    let err = repl
        .eval(&b.binary(BinaryOperator::Add, b.var("origin"), b.int(1)))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::UnresolvedOperator));
}
