use bumpalo::Bump;
use tetra_compiler::ast::{AstBuilder, Item, Module};
use tetra_compiler::{CompileOptions, compile_module};
use tetra_core::{BinaryOperator, FutureResult, RuntimeError, Value};
use tetra_registry::TypeRegistry;

use super::{Vm, VmOptions};

fn load(registry: &TypeRegistry, module: &Module<'_>, options: VmOptions) -> Vm {
    let compiled = compile_module(registry, module, CompileOptions::default())
        .into_result()
        .unwrap();
    Vm::load(compiled, options).unwrap()
}

#[test]
fn calls_with_arguments() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(vec![], Some(b.binary(BinaryOperator::Add, b.var("a"), b.var("b"))));
    let module = b.module(
        "main",
        vec![Item::Function(b.function(
            "add",
            vec![b.param("a", b.ty("int")), b.param("b", b.ty("int"))],
            Some(b.ty("int")),
            body,
        ))],
    );

    let vm = load(&registry, &module, VmOptions::default());
    assert_eq!(vm.call("add", vec![Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
    assert!(vm.call("add", vec![Value::Int(2)]).is_err());
    assert_eq!(
        vm.call("missing", vec![]),
        Err(RuntimeError::UnknownFunction("missing".to_string()))
    );
}

#[test]
fn constants_are_evaluated_at_load() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(vec![], Some(b.binary(BinaryOperator::Mul, b.var("LIMIT"), b.int(2))));
    let module = b.module(
        "main",
        vec![
            b.const_decl("LIMIT", None, b.int(10)),
            Item::Function(b.function("twice", vec![], Some(b.ty("int")), body)),
        ],
    );

    let vm = load(&registry, &module, VmOptions::default());
    assert_eq!(vm.global("LIMIT"), Some(Value::Int(10)));
    assert_eq!(vm.call("twice", vec![]).unwrap(), Value::Int(20));
}

#[test]
fn for_loop_over_a_range() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let add = b.assign(
        b.var("total"),
        b.binary(BinaryOperator::Add, b.var("total"), b.var("i")),
    );
    let body = b.block(
        vec![
            b.let_("total", None, b.int(0)),
            b.for_in("i", b.range(b.int(2), b.int(5)), b.block(vec![add], None)),
        ],
        Some(b.var("total")),
    );
    let module = b.module(
        "main",
        vec![Item::Function(b.function("sum", vec![], Some(b.ty("int")), body))],
    );

    let vm = load(&registry, &module, VmOptions::default());
    assert_eq!(vm.call("sum", vec![]).unwrap(), Value::Int(9));
}

#[test]
fn host_routines_call_back_into_script() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let double = b.block(vec![], Some(b.binary(BinaryOperator::Mul, b.var("x"), b.int(2))));
    let run = b.block(
        vec![],
        Some(b.method(
            b.array(vec![b.int(1), b.int(2), b.int(3)]),
            "map",
            vec![b.var("double")],
        )),
    );
    let module = b.module(
        "main",
        vec![
            Item::Function(b.function(
                "double",
                vec![b.param("x", b.ty("int"))],
                Some(b.ty("int")),
                double,
            )),
            Item::Function(b.function("run", vec![], Some(b.array_ty(b.ty("int"))), run)),
        ],
    );

    let vm = load(&registry, &module, VmOptions::default());
    assert_eq!(
        vm.call("run", vec![]).unwrap(),
        Value::array(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
    );
}

#[test]
fn call_depth_is_bounded() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(vec![], Some(b.call("forever", vec![b.var("n")])));
    let module = b.module(
        "main",
        vec![Item::Function(b.function(
            "forever",
            vec![b.param("n", b.ty("int"))],
            Some(b.ty("int")),
            body,
        ))],
    );

    let vm = load(&registry, &module, VmOptions::default().with_max_call_depth(8));
    assert_eq!(
        vm.call("forever", vec![Value::Int(1)]),
        Err(RuntimeError::CallDepthExceeded(8))
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(vec![], Some(b.binary(BinaryOperator::Div, b.var("n"), b.int(0))));
    let module = b.module(
        "main",
        vec![Item::Function(b.function(
            "broken",
            vec![b.param("n", b.ty("int"))],
            Some(b.ty("int")),
            body,
        ))],
    );

    let vm = load(&registry, &module, VmOptions::default());
    assert_eq!(
        vm.call("broken", vec![Value::Int(1)]),
        Err(RuntimeError::DivisionByZero)
    );
}

#[test]
fn async_call_returns_an_unstarted_future() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(vec![b.yield_()], Some(b.var("n")));
    let module = b.module(
        "main",
        vec![Item::Function(b.async_function(
            "later",
            vec![b.param("n", b.ty("int"))],
            Some(b.ty("int")),
            body,
        ))],
    );

    let vm = load(&registry, &module, VmOptions::default());
    let value = vm.call("later", vec![Value::Int(4)]).unwrap();
    let future = value.as_future().unwrap();
    assert!(!future.is_completed());
    assert_eq!(future.advance().unwrap(), FutureResult::Pending);
    assert_eq!(future.advance().unwrap(), FutureResult::Ready(Value::Int(4)));
    assert_eq!(future.advance().unwrap(), FutureResult::Ready(Value::Int(4)));
}

#[test]
fn await_keeps_locals_across_suspensions() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = b.block(
        vec![
            b.let_("before", None, b.int(40)),
            b.await_(b.call("wait_ticks", vec![b.int(2)])),
        ],
        Some(b.binary(BinaryOperator::Add, b.var("before"), b.int(2))),
    );
    let module = b.module(
        "main",
        vec![
            b.use_names("core", &["wait_ticks"]),
            Item::Function(b.async_function("pause", vec![], Some(b.ty("int")), body)),
        ],
    );

    let vm = load(&registry, &module, VmOptions::default());
    let value = vm.call("pause", vec![]).unwrap();
    let future = value.as_future().unwrap();
    assert_eq!(future.advance().unwrap(), FutureResult::Pending);
    assert_eq!(future.advance().unwrap(), FutureResult::Pending);
    assert_eq!(future.advance().unwrap(), FutureResult::Ready(Value::Int(42)));
}

fn countdown_module<'a>(b: &AstBuilder<'a>, is_async: bool) -> Module<'a> {
    let recurse = b.call("deep", vec![b.binary(BinaryOperator::Sub, b.var("n"), b.int(1))]);
    let recurse = if is_async { b.await_(recurse) } else { recurse };
    let body = b.block(
        vec![],
        Some(b.if_(
            b.binary(BinaryOperator::Eq, b.var("n"), b.int(0)),
            b.block(vec![], Some(b.int(0))),
            Some(b.block_expr(vec![], Some(recurse))),
        )),
    );
    let params = vec![b.param("n", b.ty("int"))];
    let function = if is_async {
        b.async_function("deep", params, Some(b.ty("int")), body)
    } else {
        b.function("deep", params, Some(b.ty("int")), body)
    };
    b.module("main", vec![Item::Function(function)])
}

#[test]
fn deep_recursion_stops_at_the_default_limit() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let module = countdown_module(&b, false);
    let limit = VmOptions::default().max_call_depth;

    let vm = load(&registry, &module, VmOptions::default());
    assert_eq!(vm.call("deep", vec![Value::Int(40)]).unwrap(), Value::Int(0));
    assert_eq!(
        vm.call("deep", vec![Value::Int(500)]),
        Err(RuntimeError::CallDepthExceeded(limit))
    );
    // Unwinding released every level.
    assert_eq!(vm.call("deep", vec![Value::Int(40)]).unwrap(), Value::Int(0));
}

#[test]
fn nested_awaits_count_against_the_call_depth() {
    let registry = TypeRegistry::with_core().unwrap();
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let module = countdown_module(&b, true);
    let limit = VmOptions::default().max_call_depth;

    let vm = load(&registry, &module, VmOptions::default());
    let shallow = vm.call("deep", vec![Value::Int(40)]).unwrap();
    assert_eq!(shallow.as_future().unwrap().drive(4).unwrap(), Some(Value::Int(0)));

    let deep = vm.call("deep", vec![Value::Int(500)]).unwrap();
    assert_eq!(
        deep.as_future().unwrap().drive(4),
        Err(RuntimeError::CallDepthExceeded(limit))
    );

    let again = vm.call("deep", vec![Value::Int(40)]).unwrap();
    assert_eq!(again.as_future().unwrap().drive(4).unwrap(), Some(Value::Int(0)));
}
