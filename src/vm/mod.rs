//! Bytecode virtual machine.
//!
//! A [`Vm`] owns one loaded module. Loading materializes the constant pool
//! into runtime values and runs the `const` initializers in declaration
//! order; after that the module's functions can be called by name.
//!
//! Calls of `async` functions return [`Value::Future`]. The computation
//! behind it keeps its own frame and only runs when the host advances it
//! (see [`FutureRef::advance`](tetra_core::FutureRef::advance)).

mod exec;
mod future;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;
use tetra_compiler::bytecode::{BytecodeChunk, Constant};
use tetra_compiler::CompiledModule;
use tetra_core::{FunctionValue, NativeError, RuntimeError, TypeHash, Value};

pub(crate) use exec::Interpreter;

/// Runtime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Deepest allowed nesting of script calls and future advances.
    ///
    /// Each level runs on the host thread's stack; the default fits the
    /// 2 MiB stack of a spawned thread in an unoptimized build.
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self { max_call_depth: 48 }
    }
}

impl VmOptions {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

/// Executable code of one function, initializer or async body.
#[derive(Debug)]
pub(crate) struct Code {
    pub name: Rc<str>,
    pub chunk: BytecodeChunk,
    pub frame_size: usize,
    pub param_count: usize,
}

/// A module prepared for execution.
#[derive(Debug)]
pub(crate) struct LoadedModule {
    pub name: String,
    pub constants: Vec<Value>,
    pub functions: FxHashMap<TypeHash, Rc<Code>>,
    pub names: FxHashMap<String, TypeHash>,
    pub protos: Vec<Rc<Code>>,
    pub globals: RefCell<Vec<Value>>,
    pub global_names: FxHashMap<String, u32>,
    /// Functions marked `test`, in declaration order.
    pub tests: Vec<String>,
    /// Script frames currently on the host stack, across all interpreters
    /// and futures of this module.
    pub depth: Cell<usize>,
}

impl LoadedModule {
    pub fn constant(&self, index: u32) -> Result<&Value, RuntimeError> {
        self.constants
            .get(index as usize)
            .ok_or(RuntimeError::InvalidConstant(index))
    }

    pub fn function(&self, hash: TypeHash) -> Option<&Rc<Code>> {
        self.functions.get(&hash)
    }

    /// Count one more nested level; released when the guard drops.
    pub fn enter(&self, limit: usize) -> Result<DepthGuard<'_>, RuntimeError> {
        let depth = self.depth.get();
        if depth >= limit {
            return Err(RuntimeError::CallDepthExceeded(limit));
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }
}

pub(crate) struct DepthGuard<'m>(&'m Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Result of one `test` function.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub name: String,
    pub result: Result<Value, RuntimeError>,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct Vm {
    module: Rc<LoadedModule>,
    options: VmOptions,
}

impl Vm {
    /// Prepare `module` and evaluate its constants.
    pub fn load(module: CompiledModule, options: VmOptions) -> Result<Self, RuntimeError> {
        let constants = module
            .constants
            .constants()
            .iter()
            .map(materialize)
            .collect();

        let mut functions = FxHashMap::default();
        let mut names = FxHashMap::default();
        let mut tests = Vec::new();
        for function in module.functions {
            if function.is_test {
                tests.push(function.name.clone());
            }
            names.insert(function.name.clone(), function.hash);
            functions.insert(
                function.hash,
                Rc::new(Code {
                    name: Rc::from(function.name.as_str()),
                    chunk: function.chunk,
                    frame_size: function.frame_size as usize,
                    param_count: function.param_count,
                }),
            );
        }

        let protos = module
            .protos
            .into_iter()
            .map(|proto| {
                Rc::new(Code {
                    name: Rc::from(proto.name.as_str()),
                    chunk: proto.chunk,
                    frame_size: proto.frame_size as usize,
                    param_count: proto.param_count,
                })
            })
            .collect();

        let global_names = module
            .globals
            .iter()
            .map(|global| (global.name.clone(), global.slot))
            .collect();

        let vm = Vm {
            module: Rc::new(LoadedModule {
                name: module.name,
                constants,
                functions,
                names,
                protos,
                globals: RefCell::new(vec![Value::Unit; module.global_count as usize]),
                global_names,
                tests,
                depth: Cell::new(0),
            }),
            options,
        };

        for global in module.globals {
            let init = Rc::new(Code {
                name: Rc::from(global.name.as_str()),
                chunk: global.chunk,
                frame_size: global.frame_size as usize,
                param_count: 0,
            });
            let value = vm.interpreter().call_code(&init, Vec::new())?;
            let mut globals = vm.module.globals.borrow_mut();
            let slot = globals
                .get_mut(global.slot as usize)
                .ok_or(RuntimeError::InvalidGlobal(global.slot as u16))?;
            *slot = value;
        }

        debug!(
            "loaded module '{}': {} function(s), {} global(s)",
            vm.module.name,
            vm.module.functions.len(),
            vm.module.global_names.len()
        );
        Ok(vm)
    }

    pub fn module_name(&self) -> &str {
        &self.module.name
    }

    pub fn options(&self) -> VmOptions {
        self.options
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.module.names.contains_key(name)
    }

    /// Value of a module `const`.
    pub fn global(&self, name: &str) -> Option<Value> {
        let slot = *self.module.global_names.get(name)?;
        self.module.globals.borrow().get(slot as usize).cloned()
    }

    /// Call the function `name` and run it to completion.
    ///
    /// For an `async` function the result is the not yet started future.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let code = self
            .module
            .names
            .get(name)
            .and_then(|hash| self.module.function(*hash))
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        if args.len() != code.param_count {
            return Err(RuntimeError::Native(NativeError::ArgumentCount {
                expected: code.param_count,
                got: args.len(),
            }));
        }
        let code = Rc::clone(code);
        self.interpreter().call_code(&code, args)
    }

    /// Call a function value, as a host routine would.
    pub fn call_value(&self, function: &FunctionValue, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.interpreter().call_function(function, args)
    }

    /// Run every `test` function, driving async ones for at most
    /// `max_steps` advances.
    pub fn run_tests(&self, max_steps: usize) -> Vec<TestOutcome> {
        self.module
            .tests
            .iter()
            .map(|name| {
                let result = self.call(name, Vec::new()).and_then(|value| match value {
                    Value::Future(future) => future
                        .drive(max_steps)?
                        .ok_or_else(|| {
                            RuntimeError::Native(NativeError::custom(format!(
                                "still pending after {max_steps} steps"
                            )))
                        }),
                    value => Ok(value),
                });
                debug!("test '{name}': {}", if result.is_ok() { "ok" } else { "failed" });
                TestOutcome {
                    name: name.clone(),
                    result,
                }
            })
            .collect()
    }

    fn interpreter(&self) -> Interpreter {
        Interpreter::new(Rc::clone(&self.module), self.options)
    }
}

fn materialize(constant: &Constant) -> Value {
    match constant {
        Constant::Int(v) => Value::Int(*v),
        Constant::Float(v) => Value::Float(*v),
        Constant::String(s) => Value::String(Rc::from(&**s)),
        Constant::Function { hash, name } => Value::Function(FunctionValue::Script {
            hash: *hash,
            name: Rc::from(&**name),
        }),
        Constant::Native(native) => Value::Function(FunctionValue::Native(native.clone())),
    }
}

#[cfg(test)]
mod tests;
