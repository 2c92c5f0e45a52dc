//! Methods of class objects

use super::{define_all, expect_args};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::{runtime_error, wrong_arity, wrong_type, ErrorKind};
use crate::object::{ClassRef, InstanceObject, ObjectKind};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;
use std::collections::BTreeMap;

const METHODS: &[(&str, NativeFn)] = &[
    ("new", new),
    ("name", name),
    ("superclass", superclass),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::CLASS, METHODS);
}

fn class_ref<'a>(call: &Call<'a>) -> VmResult<&'a ClassRef> {
    match call.receiver.kind() {
        Some(ObjectKind::Class(class)) => Ok(class),
        _ => Err(wrong_type("Class", call.receiver)),
    }
}

/// Instantiate the receiver and run `initialize` when one is defined
fn new(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let class = class_ref(&call)?;

    // Built-ins whose payload is not an instance-variable table
    let builtin = match class.id {
        ids::STRING => Some(Value::string("")),
        ids::ARRAY => Some(Value::array(Vec::new())),
        ids::HASH => Some(Value::hash(BTreeMap::new())),
        ids::ERROR | ids::TYPE_ERROR | ids::ARGUMENT_ERROR => {
            let kind = match class.id {
                ids::TYPE_ERROR => ErrorKind::TypeError,
                ids::ARGUMENT_ERROR => ErrorKind::ArgumentError,
                _ => ErrorKind::Error,
            };
            let message = call.args.first().map(Value::to_s).unwrap_or_default();
            Some(Value::error(kind, message))
        }
        ids::INTEGER | ids::FLOAT | ids::BOOLEAN | ids::NULL | ids::RANGE | ids::BLOCK
        | ids::CLASS => {
            return Err(runtime_error(format_args!(
                "Can't create an instance of {}",
                class.name
            )))
        }
        _ => None,
    };
    if let Some(value) = builtin {
        return Ok(value);
    }

    let instance = Value::object(
        class.id,
        ObjectKind::Instance(InstanceObject::new(class.name.clone())),
    );
    if interp.responds_to(&instance, "initialize") {
        interp.send(
            &instance,
            "initialize",
            call.args.to_vec(),
            call.block.cloned(),
        )?;
    } else if !call.args.is_empty() {
        return Err(wrong_arity(0, call.args.len()));
    }
    log::trace!("allocated {}", class.name);
    Ok(instance)
}

fn name(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 0)?;
    Ok(Value::string(&*class_ref(&call)?.name))
}

fn superclass(interp: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 0)?;
    let id = class_ref(&call)?.id;
    let classes = interp.classes();
    Ok(classes
        .get_class(id)
        .and_then(|class| class.superclass)
        .and_then(|parent| classes.get_class(parent))
        .map(|parent| parent.object().clone())
        .unwrap_or_default())
}
