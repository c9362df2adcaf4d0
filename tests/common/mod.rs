//! Shared fixtures for the integration tests: a small host module and
//! helpers to compile and load syntax trees built with [`AstBuilder`].

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tetra::ast::{Item, Module};
use tetra::{CompilationResult, Engine, RegistryModule, Value, Vm};
use tetra_core::native_fn::{arg, expect_args};
use tetra_core::{
    BinaryOperator, BoundType, FieldAccessFactory, NativeContext, NativeError, NativeFn,
    NativeValue, OperatorEmitter, RealizedType, RegistrationError, TypeSupplier,
};

pub const GEO: &str = "geo";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn value(self) -> Value {
        Value::Native(NativeValue::new(self))
    }
}

fn vector(index: usize, args: &[Value]) -> Result<Vector3, NativeError> {
    arg(index, args[index].as_native())?.with_ref(|v: &Vector3| *v)
}

/// `geo::Vector3` with `==`, a writable `x` field and a `vec3` constructor.
pub fn geo_module() -> Result<RegistryModule, RegistrationError> {
    let mut def = BoundType::for_native::<Vector3>(GEO, "Vector3", &[])?
        .with_description("A point in space");
    def.tables_mut().add_binary(
        BinaryOperator::Eq,
        OperatorEmitter::binary(
            TypeSupplier::This,
            RealizedType::BOOL,
            NativeFn::new(GEO, "Vector3::eq", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 2)?;
                Ok(Value::Bool(vector(0, args)? == vector(1, args)?))
            }),
        ),
    )?;
    def.tables_mut().add_field(
        "x",
        FieldAccessFactory::read_only(
            "First coordinate",
            RealizedType::FLOAT,
            NativeFn::new(GEO, "Vector3::x", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 1)?;
                Ok(Value::Float(vector(0, args)?.x))
            }),
        )
        .with_setter(NativeFn::new(
            GEO,
            "Vector3::set_x",
            |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 2)?;
                let x = arg(1, args[1].as_float())?;
                arg(0, args[0].as_native())?.with_mut(|v: &mut Vector3| v.x = x)?;
                Ok(Value::Unit)
            },
        )),
    )?;

    let mut module = RegistryModule::new(GEO).with_description("Geometry");
    let vector3 = module.add_bound_type(def)?;
    module.add_function(
        "vec3",
        "Build a vector from its coordinates",
        &[
            ("x", RealizedType::FLOAT),
            ("y", RealizedType::FLOAT),
            ("z", RealizedType::FLOAT),
        ],
        vector3,
        |_: &mut NativeContext<'_>, args: &[Value]| {
            expect_args(args, 3)?;
            let x = arg(0, args[0].as_float())?;
            let y = arg(1, args[1].as_float())?;
            let z = arg(2, args[2].as_float())?;
            Ok(Vector3::new(x, y, z).value())
        },
    )?;
    Ok(module)
}

/// A module with one routine, `bump`, counting its calls.
pub fn counter_module(name: &str) -> Result<(RegistryModule, Arc<AtomicUsize>), RegistrationError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut module = RegistryModule::new(name);
    module.add_function(
        "bump",
        "Count one call",
        &[],
        RealizedType::UNIT,
        move |_: &mut NativeContext<'_>, args: &[Value]| {
            expect_args(args, 0)?;
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Unit)
        },
    )?;
    Ok((module, calls))
}

pub fn engine() -> Engine {
    let mut engine = Engine::new().unwrap();
    engine.add_module(geo_module().unwrap()).unwrap();
    engine
}

pub fn compile(engine: &Engine, module: &Module<'_>) -> CompilationResult {
    engine.compile(module)
}

pub fn load(engine: &Engine, module: &Module<'_>) -> Vm {
    engine
        .load(module)
        .unwrap_or_else(|e| panic!("module '{}' failed to load: {e}", module.name))
}

pub fn functions<'a>(items: Vec<tetra::ast::FunctionDecl<'a>>) -> Vec<Item<'a>> {
    items.into_iter().map(Item::Function).collect()
}
