//! Built-in classes and their native methods
//!
//! Each family registers a table of `(name, NativeFn)` pairs on its class.
//! Natives validate arity and argument variants before touching any object,
//! so a failed call has no side effects.

mod array;
mod block;
mod boolean_null;
mod channel;
mod class;
mod error;
mod float;
mod hash;
mod integer;
mod object;
mod range;
mod string;

use crate::class::{Call, ClassId, ClassRegistry, NativeFn};
use crate::error::{runtime_error, wrong_arity, wrong_type};
use crate::object::ObjectKind;
use crate::value::Value;
use crate::VmResult;
use parking_lot::Mutex;

/// Register every built-in method family
pub fn install(classes: &mut ClassRegistry) {
    object::install(classes);
    class::install(classes);
    integer::install(classes);
    float::install(classes);
    string::install(classes);
    boolean_null::install(classes);
    array::install(classes);
    hash::install(classes);
    range::install(classes);
    channel::install(classes);
    error::install(classes);
    block::install(classes);
}

fn define_all(classes: &mut ClassRegistry, class: ClassId, methods: &[(&str, NativeFn)]) {
    for &(name, f) in methods {
        classes.define_native(class, name, f);
    }
}

// ===== Argument helpers =====

/// Exactly `n` arguments
fn expect_args(call: &Call<'_>, n: usize) -> VmResult<()> {
    if call.args.len() != n {
        return Err(wrong_arity(n, call.args.len()));
    }
    Ok(())
}

/// Between `min` and `max` arguments, inclusive
fn expect_args_between(call: &Call<'_>, min: usize, max: usize) -> VmResult<()> {
    let got = call.args.len();
    if got < min {
        return Err(wrong_arity(min, got));
    }
    if got > max {
        return Err(wrong_arity(max, got));
    }
    Ok(())
}

fn int_arg(call: &Call<'_>, index: usize) -> VmResult<i64> {
    let arg = call.arg(index);
    arg.as_int().ok_or_else(|| wrong_type("Integer", &arg))
}

fn string_arg(call: &Call<'_>, index: usize) -> VmResult<String> {
    let arg = call.arg(index);
    arg.as_string().ok_or_else(|| wrong_type("String", &arg))
}

fn block_arg<'a>(call: &Call<'a>) -> VmResult<&'a Value> {
    call.block
        .ok_or_else(|| runtime_error(format_args!("Can't yield without a block: {}", call.name)))
}

fn string_cell<'a>(value: &'a Value) -> VmResult<&'a Mutex<String>> {
    match value.kind() {
        Some(ObjectKind::String(s)) => Ok(s),
        _ => Err(wrong_type("String", value)),
    }
}

fn array_cell<'a>(value: &'a Value) -> VmResult<&'a Mutex<Vec<Value>>> {
    match value.kind() {
        Some(ObjectKind::Array(items)) => Ok(items),
        _ => Err(wrong_type("Array", value)),
    }
}
