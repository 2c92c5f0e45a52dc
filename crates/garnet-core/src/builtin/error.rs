//! Error methods

use super::define_all;
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::wrong_type;
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

const METHODS: &[(&str, NativeFn)] = &[("message", message), ("to_s", message)];

pub(super) fn install(classes: &mut ClassRegistry) {
    // TypeError and ArgumentError inherit these
    define_all(classes, ids::ERROR, METHODS);
}

fn message(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    call.receiver
        .error_message()
        .map(Value::string)
        .ok_or_else(|| wrong_type("Error", call.receiver))
}
