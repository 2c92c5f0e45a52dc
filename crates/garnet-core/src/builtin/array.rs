//! Array methods
//!
//! Methods that yield iterate over a snapshot of the elements, so a block
//! may freely mutate the array it is iterating.

use super::{array_cell, block_arg, define_all, expect_args, expect_args_between, int_arg};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::{argument_error, wrong_type};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

const METHODS: &[(&str, NativeFn)] = &[
    ("[]", index),
    ("[]=", assign_index),
    ("push", push),
    ("pop", pop),
    ("shift", shift),
    ("first", first),
    ("last", last),
    ("length", length),
    ("count", length),
    ("size", length),
    ("each", each),
    ("map", map),
    ("join", join),
    ("include", include),
    ("to_s", to_s),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::ARRAY, METHODS);
}

fn elements(call: &Call<'_>) -> VmResult<Vec<Value>> {
    Ok(array_cell(call.receiver)?.lock().clone())
}

fn normalize(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (index >= 0).then_some(index as usize)
}

fn index(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let i = int_arg(&call, 0)?;
    let items = array_cell(call.receiver)?.lock();
    Ok(normalize(i, items.len())
        .and_then(|i| items.get(i).cloned())
        .unwrap_or_default())
}

/// Assigning past the end pads the gap with nil
fn assign_index(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 2)?;
    let i = int_arg(&call, 0)?;
    let value = call.arg(1);
    let mut items = array_cell(call.receiver)?.lock();
    let position = normalize(i, items.len())
        .ok_or_else(|| argument_error(format_args!("Index value out of range. got={}", i)))?;
    if position >= items.len() {
        items.resize(position + 1, Value::nil());
    }
    items[position] = value.clone();
    Ok(value)
}

fn push(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    array_cell(call.receiver)?
        .lock()
        .extend(call.args.iter().cloned());
    Ok(call.receiver.clone())
}

fn pop(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(array_cell(call.receiver)?.lock().pop().unwrap_or_default())
}

fn shift(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let mut items = array_cell(call.receiver)?.lock();
    if items.is_empty() {
        return Ok(Value::nil());
    }
    Ok(items.remove(0))
}

fn first(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(array_cell(call.receiver)?
        .lock()
        .first()
        .cloned()
        .unwrap_or_default())
}

fn last(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(array_cell(call.receiver)?
        .lock()
        .last()
        .cloned()
        .unwrap_or_default())
}

fn length(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(array_cell(call.receiver)?.lock().len() as i64))
}

fn each(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let block = block_arg(&call)?;
    for item in elements(&call)? {
        interp.call_block(block, vec![item])?;
    }
    Ok(call.receiver.clone())
}

fn map(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let block = block_arg(&call)?;
    let mut mapped = Vec::new();
    for item in elements(&call)? {
        mapped.push(interp.call_block(block, vec![item])?);
    }
    Ok(Value::array(mapped))
}

fn join(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args_between(&call, 0, 1)?;
    let separator = match call.args.first() {
        Some(sep) => sep.as_string().ok_or_else(|| wrong_type("String", sep))?,
        None => String::new(),
    };
    let parts: Vec<String> = elements(&call)?.iter().map(Value::to_s).collect();
    Ok(Value::string(parts.join(&separator)))
}

fn include(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let needle = call.arg(0);
    Ok(Value::bool(elements(&call)?.contains(&needle)))
}

fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(call.receiver.inspect()))
}
