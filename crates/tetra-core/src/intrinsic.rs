//! Primitive operations executed inline by the VM.
//!
//! Builtin operator and member tables target intrinsics instead of host
//! routines; the compiler emits `OpCode::Intrinsic` followed by the
//! intrinsic's byte.

use std::rc::Rc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{NativeError, RuntimeError};
use crate::value::{Range, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Intrinsic {
    // =========================================================================
    // Unary
    // =========================================================================
    NegInt = 0,
    NegFloat,
    NotBool,
    BitNotInt,

    // =========================================================================
    // Conversions and builtin members
    // =========================================================================
    IntToFloat,
    FloatToInt,
    IntToString,
    FloatToString,
    StringLength,
    ArrayLength,
    RangeLength,
    RangeFrom,
    RangeTo,

    // =========================================================================
    // Integer arithmetic
    // =========================================================================
    AddInt,
    SubInt,
    MulInt,
    DivInt,
    ModInt,
    PowInt,
    BitAndInt,
    BitOrInt,
    BitXorInt,
    ShlInt,
    ShrInt,

    // =========================================================================
    // Float arithmetic
    // =========================================================================
    AddFloat,
    SubFloat,
    MulFloat,
    DivFloat,
    ModFloat,
    PowFloat,

    // =========================================================================
    // Comparison
    // =========================================================================
    EqInt,
    LtInt,
    LeInt,
    GtInt,
    GeInt,
    EqFloat,
    LtFloat,
    LeFloat,
    GtFloat,
    GeFloat,
    EqBool,
    EqString,
    LtString,

    // =========================================================================
    // Strings
    // =========================================================================
    Concat,
}

impl Intrinsic {
    /// Number of stack operands consumed.
    pub fn arity(self) -> usize {
        use Intrinsic::*;
        match self {
            NegInt | NegFloat | NotBool | BitNotInt | IntToFloat | FloatToInt | IntToString
            | FloatToString | StringLength | ArrayLength | RangeLength | RangeFrom | RangeTo => 1,
            _ => 2,
        }
    }

    /// Evaluate the intrinsic over its operands (leftmost operand first).
    pub fn apply(self, args: &[Value]) -> Result<Value, RuntimeError> {
        use Intrinsic::*;
        if args.len() != self.arity() {
            return Err(RuntimeError::StackUnderflow);
        }
        let value = match self {
            NegInt => Value::Int(args[0].as_int()?.wrapping_neg()),
            NegFloat => Value::Float(-args[0].as_float()?),
            NotBool => Value::Bool(!args[0].as_bool()?),
            BitNotInt => Value::Int(!args[0].as_int()?),

            IntToFloat => Value::Float(args[0].as_int()? as f64),
            FloatToInt => Value::Int(args[0].as_float()? as i64),
            IntToString => Value::string(args[0].as_int()?.to_string()),
            FloatToString => Value::string(args[0].as_float()?.to_string()),
            StringLength => Value::Int(args[0].as_str()?.chars().count() as i64),
            ArrayLength => Value::Int(args[0].as_array()?.len() as i64),
            RangeLength => Value::Int(args[0].as_range()?.len()),
            RangeFrom => Value::Int(args[0].as_range()?.from),
            RangeTo => Value::Int(args[0].as_range()?.to),

            AddInt => int_op(args, i64::wrapping_add)?,
            SubInt => int_op(args, i64::wrapping_sub)?,
            MulInt => int_op(args, i64::wrapping_mul)?,
            DivInt => {
                let (a, b) = ints(args)?;
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Value::Int(a.wrapping_div(b))
            }
            ModInt => {
                let (a, b) = ints(args)?;
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Value::Int(a.wrapping_rem(b))
            }
            PowInt => {
                let (base, exp) = ints(args)?;
                let exp = u32::try_from(exp).map_err(|_| {
                    RuntimeError::Native(NativeError::custom(format!(
                        "negative integer exponent {exp}"
                    )))
                })?;
                Value::Int(base.wrapping_pow(exp))
            }
            BitAndInt => int_op(args, |a, b| a & b)?,
            BitOrInt => int_op(args, |a, b| a | b)?,
            BitXorInt => int_op(args, |a, b| a ^ b)?,
            ShlInt => int_op(args, |a, b| a.wrapping_shl(b as u32))?,
            ShrInt => int_op(args, |a, b| a.wrapping_shr(b as u32))?,

            AddFloat => float_op(args, |a, b| a + b)?,
            SubFloat => float_op(args, |a, b| a - b)?,
            MulFloat => float_op(args, |a, b| a * b)?,
            DivFloat => float_op(args, |a, b| a / b)?,
            ModFloat => float_op(args, |a, b| a % b)?,
            PowFloat => float_op(args, f64::powf)?,

            EqInt => int_cmp(args, |a, b| a == b)?,
            LtInt => int_cmp(args, |a, b| a < b)?,
            LeInt => int_cmp(args, |a, b| a <= b)?,
            GtInt => int_cmp(args, |a, b| a > b)?,
            GeInt => int_cmp(args, |a, b| a >= b)?,
            EqFloat => float_cmp(args, |a, b| a == b)?,
            LtFloat => float_cmp(args, |a, b| a < b)?,
            LeFloat => float_cmp(args, |a, b| a <= b)?,
            GtFloat => float_cmp(args, |a, b| a > b)?,
            GeFloat => float_cmp(args, |a, b| a >= b)?,
            EqBool => Value::Bool(args[0].as_bool()? == args[1].as_bool()?),
            EqString => Value::Bool(args[0].as_str()? == args[1].as_str()?),
            LtString => Value::Bool(args[0].as_str()? < args[1].as_str()?),

            Concat => {
                let mut joined = String::from(args[0].as_str()?);
                joined.push_str(args[1].as_str()?);
                Value::String(Rc::from(joined))
            }
        };
        Ok(value)
    }
}

fn ints(args: &[Value]) -> Result<(i64, i64), RuntimeError> {
    Ok((args[0].as_int()?, args[1].as_int()?))
}

fn int_op(args: &[Value], f: impl Fn(i64, i64) -> i64) -> Result<Value, RuntimeError> {
    let (a, b) = ints(args)?;
    Ok(Value::Int(f(a, b)))
}

fn int_cmp(args: &[Value], f: impl Fn(i64, i64) -> bool) -> Result<Value, RuntimeError> {
    let (a, b) = ints(args)?;
    Ok(Value::Bool(f(a, b)))
}

fn float_op(args: &[Value], f: impl Fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    Ok(Value::Float(f(args[0].as_float()?, args[1].as_float()?)))
}

fn float_cmp(args: &[Value], f: impl Fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(f(args[0].as_float()?, args[1].as_float()?)))
}

/// Build a range value from two integer bounds.
pub fn make_range(from: &Value, to: &Value, inclusive: bool) -> Result<Value, RuntimeError> {
    let (from, to) = (from.as_int()?, to.as_int()?);
    Ok(Value::Range(if inclusive {
        Range::inclusive(from, to)
    } else {
        Range::new(from, to)
    }))
}
