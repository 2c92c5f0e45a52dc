//! String methods
//!
//! Strings are sequences of Unicode code points: every index, length and
//! slice below counts `char`s, never bytes.

use super::{define_all, expect_args, expect_args_between, string_arg, string_cell};
use crate::class::{ids, Call, ClassRegistry, NativeFn};
use crate::error::{argument_error, type_error, wrong_type};
use crate::value::Value;
use crate::vm::Interpreter;
use crate::VmResult;
use std::cmp::Ordering;

/// Longest string, in code points, that `*`, `ljust` and `rjust` will build
pub const MAX_STRING_LENGTH: usize = 1 << 26;

const METHODS: &[(&str, NativeFn)] = &[
    ("[]", slice),
    ("slice", slice),
    ("[]=", assign_index),
    ("insert", insert),
    ("ljust", ljust),
    ("rjust", rjust),
    ("*", repeat),
    ("+", plus),
    ("concat", concat),
    ("<=>", compare),
    ("==", equal),
    ("!=", not_equal),
    ("<", less_than),
    (">", greater_than),
    ("eql", eql),
    ("capitalize", capitalize),
    ("upcase", upcase),
    ("downcase", downcase),
    ("reverse", reverse),
    ("strip", strip),
    ("chop", chop),
    ("count", length),
    ("size", length),
    ("length", length),
    ("delete", delete),
    ("split", split),
    ("gsub", gsub),
    ("include", include),
    ("start_with", start_with),
    ("end_with", end_with),
    ("empty", empty),
    ("replace", replace),
    ("to_s", to_s),
    ("to_i", to_i),
    ("to_a", to_a),
];

pub(super) fn install(classes: &mut ClassRegistry) {
    define_all(classes, ids::STRING, METHODS);
}

fn text(call: &Call<'_>) -> VmResult<String> {
    Ok(string_cell(call.receiver)?.lock().clone())
}

fn chars(call: &Call<'_>) -> VmResult<Vec<char>> {
    Ok(string_cell(call.receiver)?.lock().chars().collect())
}

// ===== Indexing =====

/// Code point at `index`, counting from the end when negative
fn char_at(chars: &[char], index: i64) -> Value {
    let len = chars.len() as i64;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        Value::string(chars[index as usize].to_string())
    } else {
        Value::nil()
    }
}

/// Inclusive range slice; nil for an invalid start, `""` for an empty selection
fn slice_range(chars: &[char], from: i64, to: i64) -> Value {
    let len = chars.len() as i64;
    let from = if from < 0 { from + len } else { from };
    let to = if to < 0 { to + len } else { to };

    if from < 0 || from > len {
        return Value::nil();
    }
    let to = to.min(len - 1);
    if to < from {
        return Value::string("");
    }
    Value::string(chars[from as usize..=to as usize].iter().collect::<String>())
}

fn slice(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let chars = chars(&call)?;
    let arg = call.arg(0);

    if let Some(index) = arg.as_int() {
        return Ok(char_at(&chars, index));
    }
    if let Some((from, to)) = arg.as_range() {
        return Ok(slice_range(&chars, from, to));
    }
    Err(argument_error(format_args!(
        "Expect slice range is Range or Integer type. got={}",
        arg.type_name()
    )))
}

fn assign_index(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 2)?;
    let index_arg = call.arg(0);
    let index = index_arg
        .as_int()
        .ok_or_else(|| wrong_type("Integer", &index_arg))?;
    let replacement = call.arg(1);
    let replacement = replacement.as_string().ok_or_else(|| {
        type_error(format_args!(
            "Expect to assign String type value. got={}",
            replacement.type_name()
        ))
    })?;

    let cell = string_cell(call.receiver)?;
    let mut current = cell.lock();
    let mut chars: Vec<char> = current.chars().collect();
    let len = chars.len() as i64;
    let position = if index < 0 { index + len } else { index };
    if position < 0 || position > len {
        return Err(argument_error(format_args!(
            "Index value out of range. got={}",
            index
        )));
    }

    let position = position as usize;
    if position == chars.len() {
        chars.extend(replacement.chars());
    } else {
        chars.splice(position..=position, replacement.chars());
    }
    *current = chars.into_iter().collect();
    Ok(call.receiver.clone())
}

fn insert(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 2)?;
    let index_arg = call.arg(0);
    let index = index_arg.as_int().ok_or_else(|| {
        type_error(format_args!(
            "Expect index to be Integer type. got={}",
            index_arg.type_name()
        ))
    })?;
    let inserted = call.arg(1);
    let inserted = inserted.as_string().ok_or_else(|| {
        type_error(format_args!(
            "Expect insert string to be String type. got={}",
            inserted.type_name()
        ))
    })?;

    let mut chars = chars(&call)?;
    let len = chars.len() as i64;
    if index < -len - 1 || index > len {
        return Err(argument_error(format_args!(
            "Index value out of range. got={}",
            index
        )));
    }
    let position = if index < 0 { (len + index).max(0) } else { index };
    let position = position as usize;
    chars.splice(position..position, inserted.chars());
    Ok(Value::string(chars.into_iter().collect::<String>()))
}

// ===== Justification =====

fn justify_args(call: &Call<'_>) -> VmResult<(usize, String)> {
    expect_args_between(call, 1, 2)?;
    let width = call.arg(0);
    let width = width.as_int().ok_or_else(|| {
        type_error(format_args!(
            "Expect justify width is Integer type. got={}",
            width.type_name()
        ))
    })?;
    let pad = if call.args.len() == 2 {
        let pad = call.arg(1);
        pad.as_string().ok_or_else(|| {
            type_error(format_args!(
                "Expect padding string is String type. got={}",
                pad.type_name()
            ))
        })?
    } else {
        " ".to_string()
    };
    Ok((width.max(0) as usize, pad))
}

fn check_length(requested: u128) -> VmResult<()> {
    if requested > MAX_STRING_LENGTH as u128 {
        return Err(argument_error(format_args!(
            "Expect result length to be at most {}. got={}",
            MAX_STRING_LENGTH, requested
        )));
    }
    Ok(())
}

/// Cyclic padding to bring `len` code points up to `width`
fn padding(len: usize, width: usize, pad: &str) -> VmResult<Option<String>> {
    if width <= len || pad.is_empty() {
        return Ok(None);
    }
    check_length(width as u128)?;
    Ok(Some(pad.chars().cycle().take(width - len).collect()))
}

fn ljust(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (width, pad) = justify_args(&call)?;
    let text = text(&call)?;
    match padding(text.chars().count(), width, &pad)? {
        Some(fill) => Ok(Value::string(text + &fill)),
        None => Ok(call.receiver.clone()),
    }
}

fn rjust(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let (width, pad) = justify_args(&call)?;
    let text = text(&call)?;
    match padding(text.chars().count(), width, &pad)? {
        Some(fill) => Ok(Value::string(fill + &text)),
        None => Ok(call.receiver.clone()),
    }
}

// ===== Arithmetic & comparison =====

fn repeat(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let count = call.arg(0);
    let count = count.as_int().ok_or_else(|| wrong_type("Integer", &count))?;
    if count < 0 {
        return Err(argument_error(format_args!(
            "Second argument must be greater than or equal to 0. got={}",
            count
        )));
    }
    let text = text(&call)?;
    check_length(text.chars().count() as u128 * count as u128)?;
    Ok(Value::string(text.repeat(count as usize)))
}

fn plus(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let right = string_arg(&call, 0)?;
    Ok(Value::string(text(&call)? + &right))
}

fn concat(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let suffix = string_arg(&call, 0)?;
    string_cell(call.receiver)?.lock().push_str(&suffix);
    Ok(call.receiver.clone())
}

/// Code-point ordering against a String argument
fn ordering(call: &Call<'_>) -> VmResult<Ordering> {
    expect_args(call, 1)?;
    let right = string_arg(call, 0)?;
    // UTF-8 byte order coincides with code-point order
    Ok(text(call)?.cmp(&right))
}

fn compare(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(match ordering(&call)? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

fn equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(ordering(&call)? == Ordering::Equal))
}

fn not_equal(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(ordering(&call)? != Ordering::Equal))
}

fn less_than(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(ordering(&call)? == Ordering::Less))
}

fn greater_than(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(ordering(&call)? == Ordering::Greater))
}

fn eql(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let own = text(&call)?;
    Ok(Value::bool(call.arg(0).as_string().is_some_and(|other| other == own)))
}

// ===== Transformations =====

fn capitalize(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let text = text(&call)?;
    let mut chars = text.chars();
    let result = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    };
    Ok(Value::string(result))
}

fn upcase(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(text(&call)?.to_uppercase()))
}

fn downcase(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(text(&call)?.to_lowercase()))
}

fn reverse(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(text(&call)?.chars().rev().collect::<String>()))
}

fn strip(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(text(&call)?.trim()))
}

fn chop(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let mut text = text(&call)?;
    text.pop();
    Ok(Value::string(text))
}

fn length(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(text(&call)?.chars().count() as i64))
}

fn delete(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let needle = string_arg(&call, 0)?;
    let text = text(&call)?;
    if needle.is_empty() {
        return Ok(Value::string(text));
    }
    Ok(Value::string(text.replace(&needle, "")))
}

fn split(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let separator = string_arg(&call, 0)?;
    let text = text(&call)?;
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::string).collect()
    };
    Ok(Value::array(parts))
}

fn gsub(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 2)?;
    let pattern = call.arg(0);
    let pattern = pattern.as_string().ok_or_else(|| {
        type_error(format_args!(
            "Expect pattern is String type. got={}",
            pattern.type_name()
        ))
    })?;
    let replacement = call.arg(1);
    let replacement = replacement.as_string().ok_or_else(|| {
        type_error(format_args!(
            "Expect replacement is String type. got={}",
            replacement.type_name()
        ))
    })?;
    Ok(Value::string(text(&call)?.replace(&pattern, &replacement)))
}

fn replace(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let replacement = string_arg(&call, 0)?;
    *string_cell(call.receiver)?.lock() = replacement;
    Ok(call.receiver.clone())
}

// ===== Predicates =====

fn include(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let needle = string_arg(&call, 0)?;
    Ok(Value::bool(text(&call)?.contains(&needle)))
}

fn start_with(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let prefix = string_arg(&call, 0)?;
    Ok(Value::bool(text(&call)?.starts_with(&prefix)))
}

fn end_with(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    expect_args(&call, 1)?;
    let suffix = string_arg(&call, 0)?;
    Ok(Value::bool(text(&call)?.ends_with(&suffix)))
}

fn empty(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::bool(text(&call)?.is_empty()))
}

// ===== Conversions =====

fn to_s(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::string(text(&call)?))
}

/// Leading optionally-signed digits; 0 when there are none
fn parse_leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let digits_start = usize::from(trimmed.starts_with(['+', '-']));
    let digits = trimmed[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(trimmed.len(), |end| digits_start + end);
    trimmed[..digits].parse().unwrap_or(0)
}

fn to_i(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    Ok(Value::int(parse_leading_int(&text(&call)?)))
}

fn to_a(_: &mut Interpreter, call: Call<'_>) -> VmResult<Value> {
    let chars = text(&call)?
        .chars()
        .map(|c| Value::string(c.to_string()))
        .collect();
    Ok(Value::array(chars))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits() -> Vec<char> {
        "1234567890".chars().collect()
    }

    #[test]
    fn test_slice_range_boundaries() {
        let chars = digits();
        assert_eq!(slice_range(&chars, -10, 1), Value::string("12"));
        assert_eq!(slice_range(&chars, 6, 1), Value::string(""));
        assert_eq!(slice_range(&chars, 1, -1234), Value::string(""));
        assert_eq!(slice_range(&chars, 10, 12), Value::string(""));
        assert!(slice_range(&chars, 11, 1).is_nil());
        assert!(slice_range(&chars, -11, 5).is_nil());
    }

    #[test]
    fn test_char_at_counts_code_points() {
        let chars: Vec<char> = "哈囉！世界！".chars().collect();
        assert_eq!(char_at(&chars, 1), Value::string("囉"));
        assert_eq!(char_at(&chars, -1), Value::string("！"));
        assert!(char_at(&chars, 6).is_nil());
    }

    #[test]
    fn test_padding_cycles() {
        assert_eq!(padding(5, 10, "xo").unwrap().as_deref(), Some("xoxox"));
        assert_eq!(padding(5, 2, "xo").unwrap(), None);
        assert!(padding(0, MAX_STRING_LENGTH + 1, "x").is_err());
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("123string123"), 123);
        assert_eq!(parse_leading_int("string123"), 0);
        assert_eq!(parse_leading_int("-42x"), -42);
        assert_eq!(parse_leading_int(""), 0);
    }
}
