//! The `core` host module available to every script.

use std::f64::consts;

use tetra_core::native_fn::{arg, expect_args};
use tetra_core::{
    ConstantValue, FutureRef, NativeContext, NativeError, RealizedType, RegistrationError, Value,
};

use crate::RegistryModule;

pub const CORE_MODULE: &str = "core";

pub fn core_module() -> Result<RegistryModule, RegistrationError> {
    let mut module =
        RegistryModule::new(CORE_MODULE).with_description("Core functions and constants");

    module.add_function(
        "wait_ticks",
        "Suspend the calling computation for `ticks` scheduling cycles",
        &[("ticks", RealizedType::INT)],
        RealizedType::future(RealizedType::UNIT),
        |_: &mut NativeContext<'_>, args: &[Value]| {
            expect_args(args, 1)?;
            let ticks = arg(0, args[0].as_int())?;
            let ticks = u32::try_from(ticks)
                .map_err(|_| NativeError::custom(format!("invalid tick count {ticks}")))?;
            Ok(Value::Future(FutureRef::delay(ticks, Value::Unit)))
        },
    )?;
    module.add_function(
        "print",
        "Write a message to the host log",
        &[("message", RealizedType::STRING)],
        RealizedType::UNIT,
        |_: &mut NativeContext<'_>, args: &[Value]| {
            expect_args(args, 1)?;
            log::info!(target: "tetra::script", "{}", arg(0, args[0].as_str())?);
            Ok(Value::Unit)
        },
    )?;

    module.add_constant(
        "MAX_INT",
        "Largest int value",
        RealizedType::INT,
        ConstantValue::Int(i64::MAX),
    )?;
    module.add_constant(
        "MIN_INT",
        "Smallest int value",
        RealizedType::INT,
        ConstantValue::Int(i64::MIN),
    )?;
    module.add_constant("PI", "Ratio of a circle's circumference to its diameter", RealizedType::FLOAT, ConstantValue::Float(consts::PI))?;
    module.add_constant("E", "Euler's number", RealizedType::FLOAT, ConstantValue::Float(consts::E))?;

    Ok(module)
}

#[cfg(test)]
mod tests {
    use tetra_core::FutureResult;

    use super::*;

    #[test]
    fn wait_ticks_returns_delay() {
        let module = core_module().unwrap();
        let wait = module.find_function("wait_ticks").unwrap();
        let value = wait
            .native
            .call(&mut NativeContext::detached(), &[Value::Int(1)])
            .unwrap();
        let future = value.as_future().unwrap();
        assert_eq!(future.advance().unwrap(), FutureResult::Pending);
        assert_eq!(future.advance().unwrap(), FutureResult::Ready(Value::Unit));
    }

    #[test]
    fn negative_ticks_rejected() {
        let module = core_module().unwrap();
        let wait = module.find_function("wait_ticks").unwrap();
        assert!(
            wait.native
                .call(&mut NativeContext::detached(), &[Value::Int(-1)])
                .is_err()
        );
    }
}
