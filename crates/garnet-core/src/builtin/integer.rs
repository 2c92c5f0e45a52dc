//! Integer methods
//!
//! Arithmetic wraps on overflow. Mixing with a Float promotes to Float.

use super::{block_arg, define_all, expect_args};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::{runtime_error, wrong_type};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;
use std::cmp::Ordering;

const METHODS: &[(&str, NativeFn)] = &[
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("%", rem),
    ("**", pow),
    ("==", equal),
    ("!=", not_equal),
    ("<", less_than),
    (">", greater_than),
    ("<=", less_equal),
    (">=", greater_equal),
    ("<=>", compare),
    ("to_s", to_s),
    ("to_i", to_i),
    ("to_f", to_f),
    ("times", times),
    ("even?", even),
    ("odd?", odd),
    ("next", next),
    ("pred", pred),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::INTEGER, METHODS);
}

fn receiver(call: &Call<'_>) -> VmResult<i64> {
    call.receiver
        .as_int()
        .ok_or_else(|| wrong_type("Integer", call.receiver))
}

/// Right operand of a binary operator
enum Operand {
    Int(i64),
    Float(f64),
}

fn operand(call: &Call<'_>) -> VmResult<Operand> {
    expect_args(call, 1)?;
    match call.arg(0) {
        Value::Integer(i) => Ok(Operand::Int(i)),
        Value::Float(f) => Ok(Operand::Float(f)),
        other => Err(wrong_type("Integer", &other)),
    }
}

fn arithmetic(
    call: &Call<'_>,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> VmResult<Value> {
    let left = receiver(call)?;
    Ok(match operand(call)? {
        Operand::Int(right) => Value::int(int_op(left, right)),
        Operand::Float(right) => Value::float(float_op(left as f64, right)),
    })
}

fn add(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    arithmetic(&call, i64::wrapping_add, |a, b| a + b)
}

fn sub(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    arithmetic(&call, i64::wrapping_sub, |a, b| a - b)
}

fn mul(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    arithmetic(&call, i64::wrapping_mul, |a, b| a * b)
}

fn div(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    if let Some(0) = call.args.first().and_then(Value::as_int) {
        return Err(runtime_error("Divided by 0"));
    }
    arithmetic(&call, i64::wrapping_div, |a, b| a / b)
}

fn rem(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    if let Some(0) = call.args.first().and_then(Value::as_int) {
        return Err(runtime_error("Divided by 0"));
    }
    arithmetic(&call, i64::wrapping_rem, |a, b| a % b)
}

fn pow(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let base = receiver(&call)?;
    Ok(match operand(&call)? {
        Operand::Int(exp) if exp >= 0 => {
            Value::int(base.wrapping_pow(u32::try_from(exp).unwrap_or(u32::MAX)))
        }
        Operand::Int(exp) => Value::float((base as f64).powf(exp as f64)),
        Operand::Float(exp) => Value::float((base as f64).powf(exp)),
    })
}

fn ordering(call: &Call<'_>) -> VmResult<Option<Ordering>> {
    let left = receiver(call)?;
    Ok(match operand(call)? {
        Operand::Int(right) => Some(left.cmp(&right)),
        Operand::Float(right) => (left as f64).partial_cmp(&right),
    })
}

fn equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    Ok(Value::bool(*call.receiver == call.arg(0)))
}

fn not_equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    Ok(Value::bool(*call.receiver != call.arg(0)))
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
    Ok(Value::string(receiver(&call)?.to_string()))
}

fn to_i(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(receiver(&call)?))
}

fn to_f(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::float(receiver(&call)? as f64))
}

/// Yield 0 through n-1; returns the receiver
fn times(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let count = receiver(&call)?;
    let block = block_arg(&call)?;
    for i in 0..count {
        interp.call_block(block, vec![Value::int(i)])?;
    }
    Ok(call.receiver.clone())
}

fn even(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(receiver(&call)? % 2 == 0))
}

fn odd(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(receiver(&call)? % 2 != 0))
}

fn next(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(receiver(&call)?.wrapping_add(1)))
}

fn pred(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(receiver(&call)?.wrapping_sub(1)))
}
