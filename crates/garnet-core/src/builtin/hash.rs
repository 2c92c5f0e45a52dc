//! Hash methods (String keys, iterated in key order)

use super::{block_arg, define_all, expect_args, string_arg};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::wrong_type;
use crate::object::ObjectKind;
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;
use parking_lot::Mutex;
use std::collections::BTreeMap;

const METHODS: &[(&str, NativeFn)] = &[
    ("[]", get),
    ("[]=", set),
    ("length", length),
    ("keys", keys),
    ("values", values),
    ("has_key", has_key),
    ("each", each),
    ("to_s", to_s),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::HASH, METHODS);
}

fn entries<'a>(call: &Call<'a>) -> VmResult<&'a Mutex<BTreeMap<String, Value>>> {
    match call.receiver.kind() {
        Some(ObjectKind::Hash(entries)) => Ok(entries),
        _ => Err(wrong_type("Hash", call.receiver)),
    }
}

fn get(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let key = string_arg(&call, 0)?;
    Ok(entries(&call)?.lock().get(&key).cloned().unwrap_or_default())
}

fn set(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 2)?;
    let key = string_arg(&call, 0)?;
    let value = call.arg(1);
    entries(&call)?.lock().insert(key, value.clone());
    Ok(value)
}

fn length(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(entries(&call)?.lock().len() as i64))
}

fn keys(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let keys = entries(&call)?.lock().keys().map(Value::string).collect();
    Ok(Value::array(keys))
}

fn values(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let values = entries(&call)?.lock().values().cloned().collect();
    Ok(Value::array(values))
}

fn has_key(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let key = string_arg(&call, 0)?;
    Ok(Value::bool(entries(&call)?.lock().contains_key(&key)))
}

/// Yields key and value; iterates a snapshot
fn each(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let block = block_arg(&call)?;
    let snapshot = entries(&call)?.lock().clone();
    for (key, value) in snapshot {
        interp.call_block(block, vec![Value::string(key), value])?;
    }
    Ok(call.receiver.clone())
}

fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(call.receiver.inspect()))
}
