//! Class hierarchy, method resolution and instantiation

mod common;

use common::{assert_raised, class_object, i, run, s, send, vm};
use garnet_bytecode::ModuleBuilder;
use garnet_core::{Value, Vm};

/// Animal#speak, Dog < Animal overriding it, Cat < Animal inheriting it
fn animals(m: &mut ModuleBuilder) {
    let speak = m
        .function("speak", 0, 0, |f| {
            f.put_string("...").leave();
        })
        .unwrap();
    let woof = m
        .function("woof", 0, 0, |f| {
            f.put_string("Woof").leave();
        })
        .unwrap();
    // def self.create; new; end
    let create = m
        .function("create", 0, 0, |f| {
            f.put_self().send("new", 0).leave();
        })
        .unwrap();
    m.class("Animal", None)
        .method("speak", speak as usize)
        .class_method("create", create as usize);
    m.class("Dog", Some("Animal")).method("speak", woof as usize);
    m.class("Cat", Some("Animal"));
}

fn load_animals() -> Vm {
    let vm = vm();
    run(&vm, |m| {
        animals(m);
        m.function("main", 0, 0, |f| {
            f.put_nil().leave();
        })
        .unwrap();
    });
    vm
}

fn instance(vm: &Vm, class: &str) -> Value {
    send(vm, &class_object(vm, class), "new", vec![])
}

#[test]
fn test_most_derived_method_wins() {
    let vm = load_animals();

    assert_eq!(send(&vm, &instance(&vm, "Dog"), "speak", vec![]), s("Woof"));
    assert_eq!(send(&vm, &instance(&vm, "Cat"), "speak", vec![]), s("..."));
    assert_eq!(send(&vm, &instance(&vm, "Animal"), "speak", vec![]), s("..."));
}

#[test]
fn test_class_methods_are_inherited() {
    let vm = load_animals();
    let dog = send(&vm, &class_object(&vm, "Dog"), "create", vec![]);

    assert_eq!(dog.type_name(), "Dog");
    assert_eq!(send(&vm, &dog, "speak", vec![]), s("Woof"));
}

#[test]
fn test_is_a_follows_superclass_chain() {
    let vm = load_animals();
    let dog = instance(&vm, "Dog");

    for (class, expected) in [
        ("Dog", true),
        ("Animal", true),
        ("Object", true),
        ("Cat", false),
        ("String", false),
    ] {
        assert_eq!(
            send(&vm, &dog, "is_a?", vec![class_object(&vm, class)]),
            Value::bool(expected),
            "Dog is_a? {class}"
        );
    }
}

#[test]
fn test_class_and_superclass_objects() {
    let vm = load_animals();
    let dog = instance(&vm, "Dog");
    let dog_class = send(&vm, &dog, "class", vec![]);

    assert!(dog_class.same_object(&class_object(&vm, "Dog")));
    let parent = send(&vm, &dog_class, "superclass", vec![]);
    assert!(parent.same_object(&class_object(&vm, "Animal")));
    assert_eq!(send(&vm, &parent, "name", vec![]), s("Animal"));
    assert!(send(&vm, &class_object(&vm, "Object"), "superclass", vec![]).is_nil());
}

#[test]
fn test_respond_to() {
    let vm = load_animals();
    let cat = instance(&vm, "Cat");

    assert_eq!(send(&vm, &cat, "respond_to?", vec![s("speak")]), Value::bool(true));
    assert_eq!(send(&vm, &cat, "respond_to?", vec![s("to_s")]), Value::bool(true));
    assert_eq!(send(&vm, &cat, "respond_to?", vec![s("fly")]), Value::bool(false));
}

#[test]
fn test_initialize_receives_arguments() {
    let vm = vm();
    let result = run(&vm, |m| {
        // def initialize(name); @name = name; end
        let initialize = m
            .function("initialize", 1, 1, |f| {
                f.get_local(0, 0).set_ivar("@name").put_nil().leave();
            })
            .unwrap();
        let name = m
            .function("name", 0, 0, |f| {
                f.get_ivar("@name").leave();
            })
            .unwrap();
        m.class("Person", None)
            .method("initialize", initialize as usize)
            .method("name", name as usize);
        m.function("main", 0, 0, |f| {
            f.get_constant("Person")
                .put_string("Stan")
                .send("new", 1)
                .send("name", 0)
                .leave();
        })
        .unwrap();
    });

    assert_eq!(result, s("Stan"));
}

#[test]
fn test_new_without_initialize_rejects_arguments() {
    let vm = load_animals();
    let result = send(&vm, &class_object(&vm, "Cat"), "new", vec![i(1)]);

    assert_raised(&result, "ArgumentError: Expect to have 0 arguments. got=1");
}

#[test]
fn test_new_on_immediate_classes_raises() {
    let vm = vm();
    let result = send(&vm, &class_object(&vm, "Integer"), "new", vec![]);

    assert_raised(&result, "Error: Can't create an instance of Integer");
}

#[test]
fn test_builtin_constructors() {
    let vm = vm();

    assert_eq!(send(&vm, &class_object(&vm, "String"), "new", vec![]), s(""));
    assert_eq!(
        send(&vm, &class_object(&vm, "Array"), "new", vec![]),
        Value::array(vec![])
    );
    let error = send(&vm, &class_object(&vm, "ArgumentError"), "new", vec![s("bad")]);
    assert_eq!(error.error_message().as_deref(), Some("ArgumentError: bad"));
    assert_eq!(send(&vm, &error, "message", vec![]), s("ArgumentError: bad"));
}

#[test]
fn test_reopened_builtin_class_gains_method() {
    let vm = vm();
    let result = run(&vm, |m| {
        // class Integer; def double; self * 2; end; end
        let double = m
            .function("double", 0, 0, |f| {
                f.put_self().put_int(2).send("*", 1).leave();
            })
            .unwrap();
        m.class("Integer", None).method("double", double as usize);
        m.function("main", 0, 0, |f| {
            f.put_int(21).send("double", 0).leave();
        })
        .unwrap();
    });

    assert_eq!(result, i(42));
    assert_eq!(send(&vm, &i(5), "double", vec![]), i(10));
}

#[test]
fn test_undefined_method_names_receiver_class() {
    let vm = load_animals();

    assert_raised(
        &send(&vm, &instance(&vm, "Dog"), "fly", vec![]),
        "Error: Undefined method 'fly' for Dog",
    );
    assert_raised(
        &send(&vm, &Value::nil(), "fly", vec![]),
        "Error: Undefined method 'fly' for Null",
    );
}

#[test]
fn test_compiled_method_arity_is_exact() {
    let vm = vm();
    let result = run(&vm, |m| {
        let add = m
            .function("add", 2, 2, |f| {
                f.get_local(0, 0).get_local(0, 1).send("+", 1).leave();
            })
            .unwrap();
        m.class("Calc", None).method("add", add as usize);
        m.function("main", 0, 0, |f| {
            f.get_constant("Calc")
                .send("new", 0)
                .put_int(1)
                .send("add", 1)
                .leave();
        })
        .unwrap();
    });

    assert_raised(&result, "ArgumentError: Expect to have 2 arguments. got=1");
}
