//! String built-in methods: successful calls

mod common;

use common::{i, run, s, send, vm};
use garnet_core::Value;

fn check(cases: &[(&str, &str, Vec<Value>, Value)]) {
    let vm = vm();
    for (receiver, method, args, expected) in cases {
        let result = send(&vm, &s(receiver), method, args.clone());
        assert_eq!(
            &result, expected,
            "{:?}.{}({:?})",
            receiver, method, args
        );
    }
}

fn strings(parts: &[&str]) -> Value {
    Value::array(parts.iter().map(|p| s(p)).collect())
}

#[test]
fn test_conversions() {
    check(&[
        ("string", "to_s", vec![], s("string")),
        ("123", "to_i", vec![], i(123)),
        ("string", "to_i", vec![], i(0)),
        ("123string123", "to_i", vec![], i(123)),
        ("string123", "to_i", vec![], i(0)),
        ("Goby", "to_a", vec![], strings(&["G", "o", "b", "y"])),
    ]);
}

#[test]
fn test_comparison() {
    check(&[
        ("Dog", "==", vec![s("Dog")], Value::bool(true)),
        ("1234", ">", vec![s("123")], Value::bool(true)),
        ("123", ">", vec![s("1235")], Value::bool(false)),
        ("1234", "<", vec![s("123")], Value::bool(false)),
        ("1234", "<", vec![s("12jdkfj3")], Value::bool(true)),
        ("1234", "!=", vec![s("123")], Value::bool(true)),
        ("123", "!=", vec![s("123")], Value::bool(false)),
        ("1234", "<=>", vec![s("1234")], i(0)),
        ("1234", "<=>", vec![s("4")], i(-1)),
        ("abcdef", "<=>", vec![s("abcde")], i(1)),
    ]);
}

#[test]
fn test_operators_and_indexing() {
    check(&[
        ("Stan ", "+", vec![s("Lo")], s("Stan Lo")),
        ("Three ", "*", vec![i(3)], s("Three Three Three ")),
        ("Zero", "*", vec![i(0)], s("")),
        ("Minus", "*", vec![i(1)], s("Minus")),
        ("Hello", "[]", vec![i(1)], s("e")),
        ("Hello", "[]", vec![i(5)], Value::nil()),
        ("Hello", "[]", vec![i(-1)], s("o")),
        ("Hello", "[]", vec![i(-6)], Value::nil()),
        ("Hello\nWorld", "[]", vec![i(5)], s("\n")),
        ("Ruby", "[]=", vec![i(1), s("oo")], s("Rooby")),
        ("Go", "[]=", vec![i(2), s("by")], s("Goby")),
        ("Ruby", "[]=", vec![i(-3), s("oo")], s("Rooby")),
        ("Hello", "[]=", vec![i(-5), s("Tr")], s("Trello")),
        ("Hello\nWorld", "[]=", vec![i(5), s(" ")], s("Hello World")),
    ]);
}

#[test]
fn test_chained_plus() {
    let vm = vm();
    let dog = send(&vm, &s("Dog"), "+", vec![s("&")]);
    assert_eq!(send(&vm, &dog, "+", vec![s("Cat")]), s("Dog&Cat"));
}

#[test]
fn test_counting() {
    check(&[
        ("abcde", "count", vec![], i(5)),
        ("哈囉！世界！", "count", vec![], i(6)),
        ("Hello\nWorld", "count", vec![], i(11)),
        ("Rooby", "size", vec![], i(5)),
        ("New method", "length", vec![], i(10)),
        (" ", "length", vec![], i(1)),
    ]);
}

#[test]
fn test_case_changes() {
    check(&[
        ("cat", "capitalize", vec![], s("Cat")),
        ("HELLO", "capitalize", vec![], s("Hello")),
        ("123word", "capitalize", vec![], s("123word")),
        ("Two Words", "capitalize", vec![], s("Two words")),
        ("first Lower", "capitalize", vec![], s("First lower")),
        ("all lower", "capitalize", vec![], s("All lower")),
        ("heLlo\nWoRLd", "capitalize", vec![], s("Hello\nworld")),
        ("hEllO", "upcase", vec![], s("HELLO")),
        ("MORE wOrds", "upcase", vec![], s("MORE WORDS")),
        ("Hello\nWorld", "upcase", vec![], s("HELLO\nWORLD")),
        ("hEllO", "downcase", vec![], s("hello")),
        ("MORE wOrds", "downcase", vec![], s("more words")),
        ("HeLlO\tWorLD", "downcase", vec![], s("hello\tworld")),
    ]);
}

#[test]
fn test_editing() {
    check(&[
        ("Hello ", "concat", vec![s("World")], s("Hello World")),
        ("Hello hello HeLlo", "delete", vec![s("el")], s("Hlo hlo HeLlo")),
        ("Hello", "chop", vec![], s("Hell")),
        ("Hello\n", "chop", vec![], s("Hello")),
        ("  Goby Lang   ", "strip", vec![], s("Goby Lang")),
        ("\nGoby Lang\r\t", "strip", vec![], s("Goby Lang")),
        ("Hello", "replace", vec![s("World")], s("World")),
        ("您好", "replace", vec![s("再見")], s("再見")),
        ("Ruby\nLang", "replace", vec![s("Goby\nLang")], s("Goby\nLang")),
        ("Reverse Rooby-lang", "reverse", vec![], s("gnal-ybooR esreveR")),
        (" ", "reverse", vec![], s(" ")),
        ("-123", "reverse", vec![], s("321-")),
        ("Hello\nWorld", "reverse", vec![], s("dlroW\nolleH")),
        ("Ruby", "gsub", vec![s("Ru"), s("Go")], s("Goby")),
    ]);
}

#[test]
fn test_insert() {
    check(&[
        ("Hello", "insert", vec![i(0), s("X")], s("XHello")),
        ("Hello", "insert", vec![i(2), s("X")], s("HeXllo")),
        ("Hello", "insert", vec![i(5), s("X")], s("HelloX")),
        ("Hello", "insert", vec![i(-2), s("X")], s("HelXlo")),
        ("Hello", "insert", vec![i(-6), s("X")], s("XHello")),
    ]);
}

#[test]
fn test_justify() {
    check(&[
        ("Hello", "ljust", vec![i(2)], s("Hello")),
        ("Hello", "ljust", vec![i(7)], s("Hello  ")),
        ("Hello", "ljust", vec![i(10), s("xo")], s("Helloxoxox")),
        ("Hello", "rjust", vec![i(2)], s("Hello")),
        ("Hello", "rjust", vec![i(7)], s("  Hello")),
        ("Hello", "rjust", vec![i(10), s("xo")], s("xoxoxHello")),
    ]);
}

#[test]
fn test_predicates() {
    let t = Value::bool(true);
    let f = Value::bool(false);
    check(&[
        ("", "empty", vec![], t.clone()),
        ("Hello", "empty", vec![], f.clone()),
        ("Hello", "eql", vec![s("Hello")], t.clone()),
        ("Hello", "eql", vec![s("World")], f.clone()),
        ("Hello", "eql", vec![i(1)], f.clone()),
        ("Hello", "eql", vec![t.clone()], f.clone()),
        ("Hello", "eql", vec![Value::range(2, 4)], f.clone()),
        ("Hello", "start_with", vec![s("Hel")], t.clone()),
        ("哈囉！世界！", "start_with", vec![s("哈囉！")], t.clone()),
        ("Hello", "start_with", vec![s("hel")], f.clone()),
        ("哈囉！世界", "start_with", vec![s("世界！")], f.clone()),
        ("Hello", "end_with", vec![s("llo")], t.clone()),
        ("哈囉！世界！", "end_with", vec![s("世界！")], t.clone()),
        ("Hello", "end_with", vec![s("ell")], f.clone()),
        ("哈囉！世界！", "end_with", vec![s("哈囉！")], f.clone()),
        ("Hello\nWorld", "include", vec![s("\n")], t),
        ("Hello\nWorld", "include", vec![s("\r")], f),
    ]);
}

#[test]
fn test_split() {
    check(&[
        ("Hello World", "split", vec![s("o")], strings(&["Hell", " W", "rld"])),
        ("Hello", "split", vec![s("")], strings(&["H", "e", "l", "l", "o"])),
        (
            "Hello\nWorld\nGoby",
            "split",
            vec![s("\n")],
            strings(&["Hello", "World", "Goby"]),
        ),
    ]);
}

#[test]
fn test_slice() {
    let nil = Value::nil();
    let r = Value::range;
    check(&[
        ("Hello World", "slice", vec![r(1, 6)], s("ello W")),
        ("1234567890", "slice", vec![r(6, 1)], s("")),
        ("1234567890", "slice", vec![r(11, 1)], nil.clone()),
        ("1234567890", "slice", vec![r(11, -1)], nil.clone()),
        ("1234567890", "slice", vec![r(-10, 1)], s("12")),
        ("1234567890", "slice", vec![r(-5, 1)], s("")),
        ("1234567890", "slice", vec![r(-10, -1)], s("1234567890")),
        ("1234567890", "slice", vec![r(-10, -11)], s("")),
        ("1234567890", "slice", vec![r(1, -1)], s("234567890")),
        ("1234567890", "slice", vec![r(1, -1234)], s("")),
        ("1234567890", "slice", vec![r(-10, -5)], s("123456")),
        ("1234567890", "slice", vec![r(-5, -10)], s("")),
        ("1234567890", "slice", vec![r(-11, 5)], nil.clone()),
        ("1234567890", "slice", vec![r(-10, -12)], s("")),
        ("1234567890", "slice", vec![r(-11, -12)], nil.clone()),
        ("1234567890", "slice", vec![r(-11, -5)], nil.clone()),
        ("Hello World", "slice", vec![i(4)], s("o")),
        ("Hello\nWorld", "slice", vec![i(5)], s("\n")),
        ("Hello World", "slice", vec![i(-3)], s("r")),
        ("Hello World", "slice", vec![i(-11)], s("H")),
        ("Hello World", "slice", vec![i(-12)], nil.clone()),
        ("Hello World", "slice", vec![i(11)], nil),
    ]);
}

#[test]
fn test_concat_mutates_receiver() {
    let vm = vm();
    let greeting = s("Hello ");
    let result = send(&vm, &greeting, "concat", vec![s("World")]);

    assert!(result.same_object(&greeting));
    assert_eq!(greeting, s("Hello World"));
}

#[test]
fn test_insert_returns_new_string() {
    let vm = vm();
    let original = s("Hello");
    let result = send(&vm, &original, "insert", vec![i(0), s("X")]);

    assert!(!result.same_object(&original));
    assert_eq!(original, s("Hello"));
}

#[test]
fn test_method_chain_in_bytecode() {
    let vm = vm();
    let result = run(&vm, |m| {
        m.function("main", 0, 0, |f| {
            f.put_string("More test")
                .send("reverse", 0)
                .send("upcase", 0)
                .leave();
        })
        .unwrap();
    });

    assert_eq!(result, s("TSET EROM"));
}
