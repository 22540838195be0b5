// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.5 String Objects](https://262.ecma-international.org/5.1/#sec-15.5)
//!
//! Positions are counted in characters. Case mapping and searching
//! delegate to the host string and regex machinery.

use crate::bridge::Arguments;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::ObjectPayload;
use crate::value::{JsResult, Value};

use super::regexp::{char_of_byte, compile_pattern, regex_payload};
use super::{bind_constructor, called_as_new, create_prototype, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let string = interpreter.heap.intrinsics.string;
    bind_constructor(interpreter, string, "String", constructor);
    let object = interpreter.heap.intrinsics.object;
    let prototype = create_prototype(interpreter, string, Some(object));

    method(interpreter, string, "fromCharCode", from_char_code);

    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "valueOf", to_string);
    method(interpreter, prototype, "charAt", char_at);
    method(interpreter, prototype, "charCodeAt", char_code_at);
    method(interpreter, prototype, "indexOf", index_of);
    method(interpreter, prototype, "lastIndexOf", last_index_of);
    method(interpreter, prototype, "slice", slice);
    method(interpreter, prototype, "substring", substring);
    method(interpreter, prototype, "substr", substr);
    method(interpreter, prototype, "concat", concat);
    method(interpreter, prototype, "split", split);
    method(interpreter, prototype, "replace", replace);
    method(interpreter, prototype, "search", search);
    method(interpreter, prototype, "match", match_method);
    method(interpreter, prototype, "toLowerCase", to_lower_case);
    method(interpreter, prototype, "toUpperCase", to_upper_case);
    method(interpreter, prototype, "trim", trim);
    method(interpreter, prototype, "localeCompare", locale_compare);
}

fn constructor(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = if args.is_empty() {
        String::new()
    } else {
        interpreter.heap.to_string(args.get(0))
    };
    let string = interpreter.heap.intrinsics.string;
    if let Some(receiver) = called_as_new(interpreter, this, string) {
        let payload = interpreter.heap.intern(&text);
        interpreter.heap[receiver].payload = Some(ObjectPayload::String(payload));
        return Ok(this);
    }
    Ok(interpreter.heap.string_value(&text))
}

fn this_string(interpreter: &mut Interpreter, this: Value) -> JsResult<String> {
    if this.is_nullish() {
        return Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "String.prototype method called on null or undefined",
        ));
    }
    Ok(interpreter.heap.to_string(this))
}

/// ### [15.5.3.2 String.fromCharCode](https://262.ecma-international.org/5.1/#sec-15.5.3.2)
fn from_char_code(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let text: String = args
        .iter()
        .map(|code| {
            let code = interpreter.heap.to_number(code);
            char::from_u32(code as u32).unwrap_or('\u{FFFD}')
        })
        .collect();
    Ok(interpreter.heap.string_value(&text))
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    match interpreter.heap.value_of(this) {
        value @ Value::String(_) => Ok(value),
        _ => Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "String.prototype method called on a non-string",
        )),
    }
}

fn position_argument(interpreter: &mut Interpreter, argument: Value) -> isize {
    let position = interpreter.heap.to_number(argument);
    if position.is_nan() {
        0
    } else {
        position as isize
    }
}

fn char_at(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let position = position_argument(interpreter, args.get(0));
    let result = usize::try_from(position)
        .ok()
        .and_then(|position| text.chars().nth(position))
        .map(|c| c.to_string())
        .unwrap_or_default();
    Ok(interpreter.heap.string_value(&result))
}

fn char_code_at(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let position = position_argument(interpreter, args.get(0));
    let result = usize::try_from(position)
        .ok()
        .and_then(|position| text.chars().nth(position))
        .map_or(f64::NAN, |c| c as u32 as f64);
    Ok(Value::Number(result))
}

/// ### [15.5.4.7 String.prototype.indexOf](https://262.ecma-international.org/5.1/#sec-15.5.4.7)
fn index_of(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let needle = interpreter.heap.to_string(args.get(0));
    let from = position_argument(interpreter, args.get(1)).max(0) as usize;
    let byte_from = super::regexp::byte_of_char(&text, from);
    let result = text[byte_from..]
        .find(&needle)
        .map_or(-1.0, |byte| char_of_byte(&text, byte_from + byte) as f64);
    Ok(Value::Number(result))
}

fn last_index_of(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let needle = interpreter.heap.to_string(args.get(0));
    let result = text
        .rfind(&needle)
        .map_or(-1.0, |byte| char_of_byte(&text, byte) as f64);
    Ok(Value::Number(result))
}

fn clamp_relative(position: isize, length: usize) -> usize {
    if position < 0 {
        length.saturating_sub(position.unsigned_abs())
    } else {
        (position as usize).min(length)
    }
}

/// ### [15.5.4.13 String.prototype.slice](https://262.ecma-international.org/5.1/#sec-15.5.4.13)
fn slice(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let length = text.chars().count();
    let begin = clamp_relative(position_argument(interpreter, args.get(0)), length);
    let end = match args.get(1) {
        Value::Undefined => length,
        other => clamp_relative(position_argument(interpreter, other), length),
    };
    let result: String = text
        .chars()
        .skip(begin)
        .take(end.saturating_sub(begin))
        .collect();
    Ok(interpreter.heap.string_value(&result))
}

/// ### [15.5.4.15 String.prototype.substring](https://262.ecma-international.org/5.1/#sec-15.5.4.15)
fn substring(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let length = text.chars().count();
    let a = (position_argument(interpreter, args.get(0)).max(0) as usize).min(length);
    let b = match args.get(1) {
        Value::Undefined => length,
        other => (position_argument(interpreter, other).max(0) as usize).min(length),
    };
    let (begin, end) = if a <= b { (a, b) } else { (b, a) };
    let result: String = text.chars().skip(begin).take(end - begin).collect();
    Ok(interpreter.heap.string_value(&result))
}

fn substr(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let length = text.chars().count();
    let begin = clamp_relative(position_argument(interpreter, args.get(0)), length);
    let count = match args.get(1) {
        Value::Undefined => length - begin,
        other => position_argument(interpreter, other).max(0) as usize,
    };
    let result: String = text.chars().skip(begin).take(count).collect();
    Ok(interpreter.heap.string_value(&result))
}

fn concat(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let mut text = this_string(interpreter, this)?;
    for argument in args.iter() {
        text.push_str(&interpreter.heap.to_string(argument));
    }
    Ok(interpreter.heap.string_value(&text))
}

/// Compiles the pattern argument of the regex-aware methods: a regexp
/// object keeps its flags, anything else is treated as a pattern source.
fn pattern_argument(
    interpreter: &mut Interpreter,
    argument: Value,
) -> JsResult<(regex::Regex, bool)> {
    if let Some(data) = regex_payload(interpreter, argument) {
        let Some(regex) = data.compiled else {
            let source = interpreter.heap[data.source].to_string();
            return Err(interpreter.throw_exception(
                ExceptionType::SyntaxError,
                &format!("Unsupported regular expression: /{source}/"),
            ));
        };
        return Ok((regex, data.flags.global));
    }
    let source = interpreter.heap.to_string(argument);
    match compile_pattern(&source, Default::default()) {
        Some(regex) => Ok((regex, false)),
        None => Err(interpreter.throw_exception(
            ExceptionType::SyntaxError,
            &format!("Unsupported regular expression: /{source}/"),
        )),
    }
}

/// ### [15.5.4.14 String.prototype.split](https://262.ecma-international.org/5.1/#sec-15.5.4.14)
fn split(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let limit = match args.get(1) {
        Value::Undefined => usize::MAX,
        other => interpreter.heap.to_number(other) as usize,
    };
    let mut parts: Vec<String> = Vec::new();
    match args.get(0) {
        Value::Undefined => parts.push(text.clone()),
        separator if regex_payload(interpreter, separator).is_some() => {
            let (regex, _) = pattern_argument(interpreter, separator)?;
            parts.extend(regex.split(&text).map(|part| part.to_string()));
        }
        separator => {
            let separator = interpreter.heap.to_string(separator);
            if separator.is_empty() {
                parts.extend(text.chars().map(|c| c.to_string()));
            } else {
                parts.extend(text.split(&separator).map(|part| part.to_string()));
            }
        }
    }
    parts.truncate(limit);
    let result = interpreter.heap.create_array();
    for part in parts {
        let part = interpreter.heap.string_value(&part);
        interpreter.heap.array_push(result, part);
    }
    Ok(Value::Object(result))
}

/// ### [15.5.4.11 String.prototype.replace](https://262.ecma-international.org/5.1/#sec-15.5.4.11)
///
/// Function replacers would have to call back into the machine
/// mid-native; only string replacements are supported.
fn replace(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let replacement = args.get(1);
    if super::function::callable(interpreter, replacement).is_some() {
        return Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Function replacement values are not supported",
        ));
    }
    let replacement = interpreter.heap.to_string(replacement);
    let pattern = args.get(0);
    let result = if regex_payload(interpreter, pattern).is_some() {
        let (regex, global) = pattern_argument(interpreter, pattern)?;
        // JS spells the whole match `$&`; the host engine spells it `$0`.
        let replacement = replacement.replace("$&", "${0}");
        if global {
            regex.replace_all(&text, replacement.as_str()).into_owned()
        } else {
            regex.replace(&text, replacement.as_str()).into_owned()
        }
    } else {
        let needle = interpreter.heap.to_string(pattern);
        text.replacen(&needle, &replacement, 1)
    };
    Ok(interpreter.heap.string_value(&result))
}

/// ### [15.5.4.12 String.prototype.search](https://262.ecma-international.org/5.1/#sec-15.5.4.12)
fn search(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let (regex, _) = pattern_argument(interpreter, args.get(0))?;
    let result = regex
        .find(&text)
        .map_or(-1.0, |found| char_of_byte(&text, found.start()) as f64);
    Ok(Value::Number(result))
}

/// ### [15.5.4.10 String.prototype.match](https://262.ecma-international.org/5.1/#sec-15.5.4.10)
fn match_method(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let (regex, global) = pattern_argument(interpreter, args.get(0))?;
    if global {
        let matches: Vec<String> = regex
            .find_iter(&text)
            .map(|found| found.as_str().to_string())
            .collect();
        if matches.is_empty() {
            return Ok(Value::Null);
        }
        let result = interpreter.heap.create_array();
        for found in matches {
            let found = interpreter.heap.string_value(&found);
            interpreter.heap.array_push(result, found);
        }
        return Ok(Value::Object(result));
    }
    let Some(captures) = regex.captures(&text) else {
        return Ok(Value::Null);
    };
    let full = captures.get(0).expect("capture 0 always present");
    let result = interpreter.heap.create_array();
    for position in 0..captures.len() {
        let group = match captures.get(position) {
            Some(group) => interpreter.heap.string_value(group.as_str()),
            None => Value::Undefined,
        };
        interpreter.heap.array_push(result, group);
    }
    let index = char_of_byte(&text, full.start());
    let key = interpreter.heap.intern("index");
    interpreter.heap[result].insert(key, Value::Number(index as f64));
    let input = interpreter.heap.string_value(&text);
    let key = interpreter.heap.intern("input");
    interpreter.heap[result].insert(key, input);
    Ok(Value::Object(result))
}

fn to_lower_case(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    Ok(interpreter.heap.string_value(&text.to_lowercase()))
}

fn to_upper_case(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    Ok(interpreter.heap.string_value(&text.to_uppercase()))
}

fn trim(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    Ok(interpreter.heap.string_value(text.trim()))
}

fn locale_compare(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let text = this_string(interpreter, this)?;
    let other = interpreter.heap.to_string(args.get(0));
    let result = match text.cmp(&other) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    };
    Ok(Value::Number(result))
}
