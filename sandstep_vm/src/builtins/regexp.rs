// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.10 RegExp Objects](https://262.ecma-international.org/5.1/#sec-15.10)
//!
//! Pattern semantics delegate to the host regex engine; a pattern the
//! host cannot compile stays uncompiled and throws on first use.

use regex::RegexBuilder;

use crate::ast::RegExpFlags;
use crate::bridge::Arguments;
use crate::heap::indexes::ObjectIndex;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::{ObjectPayload, RegExpData};
use crate::value::{JsResult, Value};

use super::{bind_constructor, create_prototype, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let regexp = interpreter.heap.intrinsics.regexp;
    bind_constructor(interpreter, regexp, "RegExp", constructor);
    let object = interpreter.heap.intrinsics.object;
    let prototype = create_prototype(interpreter, regexp, Some(object));
    method(interpreter, prototype, "test", test);
    method(interpreter, prototype, "exec", exec);
    method(interpreter, prototype, "toString", to_string);
}

pub(crate) fn compile_pattern(pattern: &str, flags: RegExpFlags) -> Option<regex::Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.ignore_case)
        .multi_line(flags.multiline)
        .build()
        .ok()
}

fn constructor(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    if let Some(data) = regex_payload(interpreter, args.get(0)) {
        if args.get(1).is_undefined() {
            let source = interpreter.heap[data.source].to_string();
            return Ok(interpreter.create_regexp(&source, data.flags));
        }
        return Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Cannot supply flags when constructing one RegExp from another",
        ));
    }
    let pattern = match args.get(0) {
        Value::Undefined => String::new(),
        other => interpreter.heap.to_string(other),
    };
    let mut flags = RegExpFlags::default();
    if !args.get(1).is_undefined() {
        let text = interpreter.heap.to_string(args.get(1));
        for flag in text.chars() {
            match flag {
                'g' => flags.global = true,
                'i' => flags.ignore_case = true,
                'm' => flags.multiline = true,
                _ => {
                    return Err(interpreter.throw_exception(
                        ExceptionType::SyntaxError,
                        &format!("Invalid regular expression flag '{flag}'"),
                    ));
                }
            }
        }
    }
    Ok(interpreter.create_regexp(&pattern, flags))
}

pub(crate) fn regex_payload(interpreter: &Interpreter, value: Value) -> Option<RegExpData> {
    let object = value.as_object()?;
    match &interpreter.heap[object].payload {
        Some(ObjectPayload::RegExp(data)) => Some(data.clone()),
        _ => None,
    }
}

fn this_regexp(
    interpreter: &mut Interpreter,
    this: Value,
) -> JsResult<(ObjectIndex, RegExpData)> {
    let payload = this.as_object().and_then(|object| {
        regex_payload(interpreter, this).map(|data| (object, data))
    });
    payload.ok_or_else(|| {
        interpreter.throw_exception(
            ExceptionType::TypeError,
            "RegExp.prototype method called on a non-regexp",
        )
    })
}

fn compiled(interpreter: &mut Interpreter, data: &RegExpData) -> JsResult<regex::Regex> {
    data.compiled.clone().ok_or_else(|| {
        let source = interpreter.heap[data.source].to_string();
        interpreter.throw_exception(
            ExceptionType::SyntaxError,
            &format!("Unsupported regular expression: /{source}/"),
        )
    })
}

pub(crate) fn byte_of_char(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

pub(crate) fn char_of_byte(text: &str, byte_index: usize) -> usize {
    text[..byte_index.min(text.len())].chars().count()
}

fn read_last_index(interpreter: &mut Interpreter, object: ObjectIndex) -> usize {
    let key = interpreter.heap.intern("lastIndex");
    let value = interpreter.heap[object]
        .properties
        .get(&key)
        .copied()
        .unwrap_or(Value::NUMBER_ZERO);
    let position = interpreter.heap.to_number(value);
    if position.is_sign_negative() || position.is_nan() {
        0
    } else {
        position as usize
    }
}

fn write_last_index(interpreter: &mut Interpreter, object: ObjectIndex, value: usize) {
    let key = interpreter.heap.intern("lastIndex");
    interpreter.heap[object].insert(key, Value::Number(value as f64));
}

/// ### [15.10.6.2 RegExp.prototype.exec](https://262.ecma-international.org/5.1/#sec-15.10.6.2)
fn exec(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let (object, data) = this_regexp(interpreter, this)?;
    let regex = compiled(interpreter, &data)?;
    let text = interpreter.heap.to_string(args.get(0));
    let start = if data.flags.global {
        read_last_index(interpreter, object)
    } else {
        0
    };
    if start > text.chars().count() {
        if data.flags.global {
            write_last_index(interpreter, object, 0);
        }
        return Ok(Value::Null);
    }
    let byte_start = byte_of_char(&text, start);
    let Some(captures) = regex.captures_at(&text, byte_start) else {
        if data.flags.global {
            write_last_index(interpreter, object, 0);
        }
        return Ok(Value::Null);
    };
    let full = captures.get(0).expect("capture 0 always present");
    if data.flags.global {
        write_last_index(interpreter, object, char_of_byte(&text, full.end()));
    }
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

/// ### [15.10.6.3 RegExp.prototype.test](https://262.ecma-international.org/5.1/#sec-15.10.6.3)
fn test(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let result = exec(interpreter, this, args)?;
    Ok(Value::from_bool(!result.is_null()))
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    this_regexp(interpreter, this)?;
    let text = interpreter.heap.to_string(this);
    Ok(interpreter.heap.string_value(&text))
}
