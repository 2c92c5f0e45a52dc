//! Integration tests for module assembly, validation and verification

use garnet_bytecode::*;

fn greeter() -> Module {
    let mut builder = ModuleBuilder::new("greeter");
    let greet = builder
        .function("greet", 1, 1, |f| {
            f.put_string("Hello ").get_local(0, 0).send("+", 1).leave();
        })
        .unwrap();
    builder.class("Greeter", None).method("greet", greet as usize);
    builder
        .function("main", 0, 0, |f| {
            f.get_constant("Greeter")
                .send("new", 0)
                .put_string("World")
                .send("greet", 1)
                .leave();
        })
        .unwrap();
    builder.finish().unwrap()
}

#[test]
fn test_assembled_module_is_loadable() {
    let module = greeter();

    assert_eq!(module.metadata.name, "greeter");
    assert_eq!(module.function_index("greet"), Some(0));
    assert_eq!(module.function_index("main"), Some(1));
    assert_eq!(module.classes[0].name, "Greeter");
    assert_eq!(module.classes[0].methods[0].function_id, 0);
    assert!(module.constants.find_string("Hello ").is_some());
    assert!(module.validate().is_ok());
    assert!(verify_module(&module).is_ok());
}

#[test]
fn test_verify_rejects_dangling_method_binding() {
    let mut module = greeter();
    module.classes[0].method("farewell", 9);

    match verify_module(&module) {
        Err(VerifyError::Module(ModuleError::MissingFunction {
            class,
            method,
            function_id,
        })) => {
            assert_eq!(class, "Greeter");
            assert_eq!(method, "farewell");
            assert_eq!(function_id, 9);
        }
        other => panic!("expected a missing function error, got {other:?}"),
    }
}

#[test]
fn test_verify_rejects_jump_outside_code() {
    let mut writer = BytecodeWriter::new();
    writer.emit_opcode(Opcode::Jump);
    writer.emit_i32(1000);
    writer.emit_opcode(Opcode::PutNil);
    writer.emit_opcode(Opcode::Leave);

    let mut module = Module::new("bad_jump");
    module.functions.push(Function {
        name: "main".to_string(),
        param_count: 0,
        local_count: 0,
        code: writer.into_bytes(),
    });

    assert!(matches!(
        verify_module(&module),
        Err(VerifyError::InvalidJumpTarget { .. })
    ));
}

#[test]
fn test_verify_rejects_missing_constant() {
    let mut writer = BytecodeWriter::new();
    writer.emit_opcode(Opcode::PutString);
    writer.emit_u32(7);
    writer.emit_opcode(Opcode::Leave);

    let mut module = Module::new("bad_constant");
    module.functions.push(Function {
        name: "main".to_string(),
        param_count: 0,
        local_count: 0,
        code: writer.into_bytes(),
    });

    assert!(matches!(
        verify_module(&module),
        Err(VerifyError::InvalidConstantRef { index: 7, .. })
    ));
}

#[test]
fn test_verify_rejects_unbalanced_branches() {
    let mut builder = ModuleBuilder::new("unbalanced");
    builder
        .function("main", 0, 0, |f| {
            let done = f.new_label();
            f.put_bool(true).jump_if_false(done).put_int(1).bind(done).leave();
        })
        .unwrap();

    assert!(matches!(
        builder.finish(),
        Err(VerifyError::StackMismatch { .. })
    ));
}

#[test]
fn test_builder_rejects_unbound_label() {
    let mut builder = ModuleBuilder::new("unbound");
    let result = builder.function("main", 0, 0, |f| {
        let nowhere = f.new_label();
        f.jump(nowhere).put_nil().leave();
    });

    assert!(matches!(result, Err(AssembleError::UnboundLabel(0, _))));
}
