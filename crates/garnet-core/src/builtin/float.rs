//! Float methods

use super::{define_all, expect_args};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::wrong_type;
use crate::value::{format_float, Value};
use crate::vm::Interpreter;
use crate::VmResult;
use std::cmp::Ordering;

const METHODS: &[(&str, NativeFn)] = &[
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("==", equal),
    ("<", less_than),
    (">", greater_than),
    ("<=", less_equal),
    (">=", greater_equal),
    ("<=>", compare),
    ("to_s", to_s),
    ("to_i", to_i),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::FLOAT, METHODS);
}

fn operands(call: &Call<'_>) -> VmResult<(f64, f64)> {
    expect_args(call, 1)?;
    let left = call
        .receiver
        .as_float()
        .ok_or_else(|| wrong_type("Float", call.receiver))?;
    let right = match call.arg(0) {
        Value::Float(f) => f,
        Value::Integer(i) => i as f64,
        other => return Err(wrong_type("Float", &other)),
    };
    Ok((left, right))
}

fn add(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (a, b) = operands(&call)?;
    Ok(Value::float(a + b))
}

fn sub(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (a, b) = operands(&call)?;
    Ok(Value::float(a - b))
}

fn mul(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (a, b) = operands(&call)?;
    Ok(Value::float(a * b))
}

fn div(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (a, b) = operands(&call)?;
    Ok(Value::float(a / b))
}

fn equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    Ok(Value::bool(*call.receiver == call.arg(0)))
}

fn ordering(call: &Call<'_>) -> VmResult<Option<Ordering>> {
    let (a, b) = operands(call)?;
    Ok(a.partial_cmp(&b))
}

fn less_than(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(ordering(&call)? == Some(Ordering::Less)))
}

fn greater_than(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(ordering(&call)? == Some(Ordering::Greater)))
}

fn less_equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(matches!(
        ordering(&call)?,
        Some(Ordering::Less | Ordering::Equal)
    )))
}

fn greater_equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(matches!(
        ordering(&call)?,
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

fn compare(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(match ordering(&call)? {
        Some(ordering) => Value::int(ordering as i64),
        None => Value::nil(),
    })
}

fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let f = call
        .receiver
        .as_float()
        .ok_or_else(|| wrong_type("Float", call.receiver))?;
    Ok(Value::string(format_float(f)))
}

fn to_i(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let f = call
        .receiver
        .as_float()
        .ok_or_else(|| wrong_type("Float", call.receiver))?;
    Ok(Value::int(f as i64))
}
