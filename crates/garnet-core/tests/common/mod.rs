//! Shared helpers for the runtime integration tests

#![allow(dead_code)]

use garnet_bytecode::ModuleBuilder;
use garnet_core::{Value, Vm, VmError};

/// A fresh VM; RUST_LOG controls test logging
pub fn vm() -> Vm {
    let _ = env_logger::builder().is_test(true).try_init();
    Vm::default()
}

/// Call `name` on `receiver`; a raised Error comes back as its value
pub fn send(vm: &Vm, receiver: &Value, name: &str, args: Vec<Value>) -> Value {
    match vm.interpreter().send(receiver, name, args, None) {
        Ok(value) => value,
        Err(VmError::Raised(error)) => error,
        Err(other) => panic!("host fault calling {name}: {other}"),
    }
}

/// Assemble, verify and run a module built by `build`
pub fn run(vm: &Vm, build: impl FnOnce(&mut ModuleBuilder)) -> Value {
    let mut builder = ModuleBuilder::new("test");
    build(&mut builder);
    let module = builder.finish().expect("module verifies");
    vm.run(&module).expect("no host fault")
}

/// Assert `value` is an Error carrying exactly `message`
#[track_caller]
pub fn assert_raised(value: &Value, message: &str) {
    assert!(value.is_error(), "expected an error, got {}", value.inspect());
    assert_eq!(value.error_message().as_deref(), Some(message));
}

pub fn s(text: &str) -> Value {
    Value::string(text)
}

pub fn i(n: i64) -> Value {
    Value::int(n)
}

/// The class object registered under `name`
pub fn class_object(vm: &Vm, name: &str) -> Value {
    let classes = vm.classes();
    let class = classes
        .get_class_by_name(name)
        .unwrap_or_else(|| panic!("no class {name}"));
    class.object().clone()
}
