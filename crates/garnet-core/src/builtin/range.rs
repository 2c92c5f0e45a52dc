//! Range methods
//!
//! A reversed range is empty: `size` is 0 and `each` yields nothing.

use super::{block_arg, define_all, expect_args};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::wrong_type;
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

const METHODS: &[(&str, NativeFn)] = &[
    ("first", first),
    ("last", last),
    ("size", size),
    ("to_a", to_a),
    ("each", each),
    ("include", include),
    ("to_s", to_s),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::RANGE, METHODS);
}

fn bounds(call: &Call<'_>) -> VmResult<(i64, i64)> {
    call.receiver
        .as_range()
        .ok_or_else(|| wrong_type("Range", call.receiver))
}

fn first(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(bounds(&call)?.0))
}

fn last(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(bounds(&call)?.1))
}

fn size(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (from, to) = bounds(&call)?;
    let size = if to < from { 0 } else { to.abs_diff(from) + 1 };
    Ok(Value::int(size as i64))
}

fn to_a(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (from, to) = bounds(&call)?;
    Ok(Value::array((from..=to).map(Value::int).collect()))
}

fn each(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (from, to) = bounds(&call)?;
    let block = block_arg(&call)?;
    for i in from..=to {
        interp.call_block(block, vec![Value::int(i)])?;
    }
    Ok(call.receiver.clone())
}

fn include(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let (from, to) = bounds(&call)?;
    let contained = call.arg(0).as_int().is_some_and(|i| (from..=to).contains(&i));
    Ok(Value::bool(contained))
}

fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (from, to) = bounds(&call)?;
    Ok(Value::string(format!("({}..{})", from, to)))
}
