//! true, false and nil

use super::{define_all, expect_args};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

const METHODS: &[(&str, NativeFn)] = &[
    ("==", equal),
    ("!=", not_equal),
    ("!", not),
    ("to_s", to_s),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::BOOLEAN, METHODS);
    define_all(classes, ids::NULL, METHODS);
}

fn equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    Ok(Value::bool(*call.receiver == call.arg(0)))
}

fn not_equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    Ok(Value::bool(*call.receiver != call.arg(0)))
}

fn not(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(!call.receiver.is_truthy()))
}

// nil renders as the empty string
fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(call.receiver.to_s()))
}
