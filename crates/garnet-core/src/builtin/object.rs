//! Methods every object responds to

use super::{block_arg, define_all, expect_args, string_arg};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::{runtime_error, wrong_type};
use crate::object::ObjectKind;
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;

const METHODS: &[(&str, NativeFn)] = &[
    ("class", class),
    ("to_s", to_s),
    ("inspect", inspect),
    ("==", equal),
    ("!=", not_equal),
    ("!", not),
    ("nil?", is_nil),
    ("object_id", object_id),
    ("instance_variable_get", instance_variable_get),
    ("instance_variable_set", instance_variable_set),
    ("is_a?", is_a),
    ("respond_to?", respond_to),
    ("puts", puts),
    ("thread", thread),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::OBJECT, METHODS);
}

fn class(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let classes = interp.classes();
    Ok(classes
        .get_class(call.receiver.class_id())
        .map(|class| class.object().clone())
        .unwrap_or_default())
}

fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(call.receiver.to_s()))
}

fn inspect(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(call.receiver.inspect()))
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

fn is_nil(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(call.receiver.is_nil()))
}

fn object_id(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(call.receiver.object_id()))
}

fn instance_variable_get(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let name = string_arg(&call, 0)?;
    Ok(match call.receiver.kind() {
        Some(ObjectKind::Instance(instance)) => {
            instance.ivars.lock().get(&name).cloned().unwrap_or_default()
        }
        _ => Value::nil(),
    })
}

fn instance_variable_set(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 2)?;
    let name = string_arg(&call, 0)?;
    let value = call.arg(1);
    match call.receiver.kind() {
        Some(ObjectKind::Instance(instance)) => {
            instance.ivars.lock().insert(name, value.clone());
            Ok(value)
        }
        _ => Err(runtime_error(format_args!(
            "Can't set instance variable {} on {}",
            name,
            call.receiver.type_name()
        ))),
    }
}

fn is_a(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let target = call.arg(0);
    let target_id = match target.kind() {
        Some(ObjectKind::Class(class)) => class.id,
        _ => return Err(wrong_type("Class", &target)),
    };
    let classes = interp.classes();
    Ok(Value::bool(
        classes.is_subclass(call.receiver.class_id(), target_id),
    ))
}

fn respond_to(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let name = string_arg(&call, 0)?;
    Ok(Value::bool(interp.responds_to(call.receiver, &name)))
}

fn puts(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    for arg in call.args {
        println!("{}", arg.to_s());
    }
    Ok(Value::nil())
}

/// Spawn the block on a new thread; returns the thread id
fn thread(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let block = block_arg(&call)?.clone();
    let handle = interp.spawn_thread(block)?;
    Ok(Value::int(handle.id().as_u64() as i64))
}
