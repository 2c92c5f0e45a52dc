//! Channel methods

use super::expect_args;
use crate::channel::ChannelObject;
use crate::class::{ids, Call, ClassRegistry};
use crate::error::wrong_type;
use crate::object::ObjectKind;
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

pub(super) fn install(classes: &mut ClassRegistry) {
    classes.define_native_class_method(ids::CHANNEL, "new", new);
    classes.define_native(ids::CHANNEL, "deliver", deliver);
    classes.define_native(ids::CHANNEL, "receive", receive);
}

fn channel<'a>(call: &Call<'a>) -> VmResult<&'a ChannelObject> {
    match call.receiver.kind() {
        Some(ObjectKind::Channel(channel)) => Ok(channel),
        _ => Err(wrong_type("Channel", call.receiver)),
    }
}

fn new(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 0)?;
    Ok(Value::object(
        ids::CHANNEL,
        ObjectKind::Channel(ChannelObject::new()),
    ))
}

/// Blocks until a receiver takes the value; returns the value
fn deliver(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let value = call.arg(0);
    log::trace!("thread {} delivering", interp.thread_id().as_u64());
    channel(&call)?.deliver(value.clone());
    Ok(value)
}

fn receive(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 0)?;
    let value = channel(&call)?.receive();
    log::trace!("thread {} received", interp.thread_id().as_u64());
    Ok(value)
}
