//! Block methods

use crate::class::{ids, Call, ClassRegistry};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

pub(super) fn install(classes: &mut ClassRegistry) {
    classes.define_native(ids::BLOCK, "call", invoke);
}

fn invoke(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    interp.call_block(call.receiver, call.args.to_vec())
}
