//! Operator and member tables of the builtin types.

use std::rc::Rc;

use tetra_core::native_fn::{arg, expect_args};
use tetra_core::{
    BinaryOperator, BuiltinCatalog, BuiltinType, CatalogEntry, FieldAccessFactory, Intrinsic,
    MethodInvokeFactory, NativeContext, NativeError, NativeFn, OperatorEmitter, RealizedType,
    RegistrationError, TypeTables, UnaryOperator, Value,
};

use BinaryOperator::*;

/// Build the catalog with every builtin table populated.
pub fn builtin_catalog() -> Result<BuiltinCatalog, RegistrationError> {
    let mut catalog = BuiltinCatalog::empty();
    register_int(catalog.entry_mut(CatalogEntry::Builtin(BuiltinType::Int)))?;
    register_float(catalog.entry_mut(CatalogEntry::Builtin(BuiltinType::Float)))?;
    register_bool(catalog.entry_mut(CatalogEntry::Builtin(BuiltinType::Bool)))?;
    register_string(catalog.entry_mut(CatalogEntry::Builtin(BuiltinType::String)))?;
    register_array(catalog.entry_mut(CatalogEntry::Array))?;
    register_range(catalog.entry_mut(CatalogEntry::Range))?;
    Ok(catalog)
}

/// Register `op` and its compound assignment with the same routine.
fn arithmetic(
    tables: &mut TypeTables,
    ty: &RealizedType,
    op: BinaryOperator,
    assign: BinaryOperator,
    intrinsic: Intrinsic,
) -> Result<(), RegistrationError> {
    tables.add_binary(op, OperatorEmitter::binary(ty.clone(), ty.clone(), intrinsic))?;
    tables.add_binary(assign, OperatorEmitter::binary(ty.clone(), ty.clone(), intrinsic))
}

fn comparisons(
    tables: &mut TypeTables,
    ty: &RealizedType,
    ops: [(BinaryOperator, Intrinsic); 5],
) -> Result<(), RegistrationError> {
    for (op, intrinsic) in ops {
        tables.add_binary(
            op,
            OperatorEmitter::binary(ty.clone(), RealizedType::BOOL, intrinsic),
        )?;
    }
    Ok(())
}

fn register_int(tables: &mut TypeTables) -> Result<(), RegistrationError> {
    let int = RealizedType::INT;
    tables.add_unary(UnaryOperator::Neg, OperatorEmitter::unary(int.clone(), Intrinsic::NegInt))?;
    tables.add_unary(
        UnaryOperator::BitNot,
        OperatorEmitter::unary(int.clone(), Intrinsic::BitNotInt),
    )?;
    arithmetic(tables, &int, Add, AddAssign, Intrinsic::AddInt)?;
    arithmetic(tables, &int, Sub, SubAssign, Intrinsic::SubInt)?;
    arithmetic(tables, &int, Mul, MulAssign, Intrinsic::MulInt)?;
    arithmetic(tables, &int, Div, DivAssign, Intrinsic::DivInt)?;
    arithmetic(tables, &int, Mod, ModAssign, Intrinsic::ModInt)?;
    arithmetic(tables, &int, Pow, PowAssign, Intrinsic::PowInt)?;
    for (op, intrinsic) in [
        (BitAnd, Intrinsic::BitAndInt),
        (BitOr, Intrinsic::BitOrInt),
        (BitXor, Intrinsic::BitXorInt),
        (Shl, Intrinsic::ShlInt),
        (Shr, Intrinsic::ShrInt),
    ] {
        tables.add_binary(op, OperatorEmitter::binary(int.clone(), int.clone(), intrinsic))?;
    }
    comparisons(
        tables,
        &int,
        [
            (Eq, Intrinsic::EqInt),
            (Lt, Intrinsic::LtInt),
            (Le, Intrinsic::LeInt),
            (Gt, Intrinsic::GtInt),
            (Ge, Intrinsic::GeInt),
        ],
    )?;
    tables.add_method(
        "to_string",
        MethodInvokeFactory::new(
            "Convert the value to a string",
            RealizedType::STRING,
            Intrinsic::IntToString,
        ),
    )?;
    tables.add_field(
        "to_float",
        FieldAccessFactory::read_only(
            "Value converted to float",
            RealizedType::FLOAT,
            Intrinsic::IntToFloat,
        ),
    )
}

fn register_float(tables: &mut TypeTables) -> Result<(), RegistrationError> {
    let float = RealizedType::FLOAT;
    tables.add_unary(
        UnaryOperator::Neg,
        OperatorEmitter::unary(float.clone(), Intrinsic::NegFloat),
    )?;
    arithmetic(tables, &float, Add, AddAssign, Intrinsic::AddFloat)?;
    arithmetic(tables, &float, Sub, SubAssign, Intrinsic::SubFloat)?;
    arithmetic(tables, &float, Mul, MulAssign, Intrinsic::MulFloat)?;
    arithmetic(tables, &float, Div, DivAssign, Intrinsic::DivFloat)?;
    arithmetic(tables, &float, Mod, ModAssign, Intrinsic::ModFloat)?;
    arithmetic(tables, &float, Pow, PowAssign, Intrinsic::PowFloat)?;
    comparisons(
        tables,
        &float,
        [
            (Eq, Intrinsic::EqFloat),
            (Lt, Intrinsic::LtFloat),
            (Le, Intrinsic::LeFloat),
            (Gt, Intrinsic::GtFloat),
            (Ge, Intrinsic::GeFloat),
        ],
    )?;
    tables.add_method(
        "to_string",
        MethodInvokeFactory::new(
            "Convert the value to a string",
            RealizedType::STRING,
            Intrinsic::FloatToString,
        ),
    )?;
    tables.add_method(
        "to_fixed",
        MethodInvokeFactory::new(
            "Format with a fixed number of decimals",
            RealizedType::STRING,
            NativeFn::new("float", "to_fixed", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 2)?;
                let value = arg(0, args[0].as_float())?;
                let decimals = arg(1, args[1].as_int())?.clamp(0, 32) as usize;
                Ok(Value::string(format!("{value:.decimals$}")))
            }),
        )
        .param("decimals", RealizedType::INT, "Number of digits after the decimal point"),
    )?;
    tables.add_field(
        "to_int",
        FieldAccessFactory::read_only(
            "Value truncated to int",
            RealizedType::INT,
            Intrinsic::FloatToInt,
        ),
    )
}

fn register_bool(tables: &mut TypeTables) -> Result<(), RegistrationError> {
    tables.add_unary(
        UnaryOperator::Not,
        OperatorEmitter::unary(RealizedType::BOOL, Intrinsic::NotBool),
    )?;
    tables.add_binary(
        Eq,
        OperatorEmitter::binary(RealizedType::BOOL, RealizedType::BOOL, Intrinsic::EqBool),
    )
}

fn register_string(tables: &mut TypeTables) -> Result<(), RegistrationError> {
    let string = RealizedType::STRING;
    arithmetic(tables, &string, Add, AddAssign, Intrinsic::Concat)?;
    tables.add_binary(
        Eq,
        OperatorEmitter::binary(string.clone(), RealizedType::BOOL, Intrinsic::EqString),
    )?;
    tables.add_binary(
        Lt,
        OperatorEmitter::binary(string.clone(), RealizedType::BOOL, Intrinsic::LtString),
    )?;
    tables.add_field(
        "length",
        FieldAccessFactory::read_only(
            "Number of characters",
            RealizedType::INT,
            Intrinsic::StringLength,
        ),
    )?;
    tables.add_method(
        "to_upper",
        MethodInvokeFactory::new(
            "Upper-case copy of the string",
            string.clone(),
            NativeFn::new("string", "to_upper", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 1)?;
                Ok(Value::string(arg(0, args[0].as_str())?.to_uppercase()))
            }),
        ),
    )?;
    tables.add_method(
        "contains",
        MethodInvokeFactory::new(
            "Check if `other` occurs in the string",
            RealizedType::BOOL,
            NativeFn::new("string", "contains", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 2)?;
                let haystack = arg(0, args[0].as_str())?;
                let needle = arg(1, args[1].as_str())?;
                Ok(Value::Bool(haystack.contains(needle)))
            }),
        )
        .param("other", string, "Substring to look for"),
    )
}

fn register_array(tables: &mut TypeTables) -> Result<(), RegistrationError> {
    let element = RealizedType::generic("T");
    tables.add_field(
        "length",
        FieldAccessFactory::read_only(
            "Number of elements",
            RealizedType::INT,
            Intrinsic::ArrayLength,
        ),
    )?;
    tables.add_method(
        "reverse",
        MethodInvokeFactory::new(
            "Elements in reverse order",
            RealizedType::array(element.clone()),
            NativeFn::new("array", "reverse", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 1)?;
                let mut elements = arg(0, args[0].as_array())?.to_vec();
                elements.reverse();
                Ok(Value::array(elements))
            }),
        ),
    )?;
    tables.add_method(
        "map",
        MethodInvokeFactory::new(
            "Apply `mapper` to every element",
            RealizedType::array(RealizedType::generic("U")),
            NativeFn::new("array", "map", |ctx: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 2)?;
                let elements = arg(0, args[0].as_array())?;
                let mapper = arg(1, args[1].as_function())?;
                let mapped = elements
                    .iter()
                    .map(|e| ctx.call(mapper, vec![e.clone()]))
                    .collect::<Result<Vec<_>, NativeError>>()?;
                Ok(Value::array(mapped))
            }),
        )
        .generic(&["U"])
        .param(
            "mapper",
            RealizedType::function(vec![element], RealizedType::generic("U")),
            "Function applied to each element",
        ),
    )
}

fn register_range(tables: &mut TypeTables) -> Result<(), RegistrationError> {
    for (name, description, intrinsic) in [
        ("length", "Number of elements in the range", Intrinsic::RangeLength),
        ("from", "First element of the range", Intrinsic::RangeFrom),
        ("to", "Exclusive upper bound of the range", Intrinsic::RangeTo),
    ] {
        tables.add_field(
            name,
            FieldAccessFactory::read_only(description, RealizedType::INT, intrinsic),
        )?;
    }
    tables.add_method(
        "map",
        MethodInvokeFactory::new(
            "Map each element of the range to a new value",
            RealizedType::array(RealizedType::generic("T")),
            NativeFn::new("Range", "map", |ctx: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 2)?;
                let range = arg(0, args[0].as_range())?;
                let mapper = arg(1, args[1].as_function())?;
                let mapped = range
                    .iter()
                    .map(|i| ctx.call(mapper, vec![Value::Int(i)]))
                    .collect::<Result<Vec<_>, NativeError>>()?;
                Ok(Value::array(mapped))
            }),
        )
        .generic(&["T"])
        .param(
            "mapper",
            RealizedType::function(vec![RealizedType::INT], RealizedType::generic("T")),
            "Function to be applied on each element of the range",
        ),
    )?;
    tables.add_method(
        "reduce",
        MethodInvokeFactory::new(
            "Reduce range by an operation",
            RealizedType::generic("U"),
            NativeFn::new("Range", "reduce", |ctx: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 3)?;
                let range = arg(0, args[0].as_range())?;
                let reducer = arg(2, args[2].as_function())?;
                range.iter().try_fold(args[1].clone(), |acc, i| {
                    ctx.call(reducer, vec![acc, Value::Int(i)])
                })
            }),
        )
        .generic(&["U"])
        .param("initial", RealizedType::generic("U"), "Initial value of the accumulator")
        .param(
            "reducer",
            RealizedType::function(
                vec![RealizedType::generic("U"), RealizedType::INT],
                RealizedType::generic("U"),
            ),
            "Combines accumulator with each element",
        ),
    )?;
    tables.add_method(
        "reverse",
        MethodInvokeFactory::new(
            "Elements of the range in descending order",
            RealizedType::array(RealizedType::INT),
            NativeFn::new("Range", "reverse", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 1)?;
                let range = arg(0, args[0].as_range())?;
                Ok(Value::array(range.iter().rev().map(Value::Int).collect()))
            }),
        ),
    )?;
    tables.add_method(
        "to_string",
        MethodInvokeFactory::new(
            "Get string representation of the range",
            RealizedType::STRING,
            NativeFn::new("Range", "to_string", |_: &mut NativeContext<'_>, args: &[Value]| {
                expect_args(args, 1)?;
                let range = arg(0, args[0].as_range())?;
                Ok(Value::String(Rc::from(range.to_string())))
            }),
        ),
    )
}
