// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.4 Array Objects](https://262.ecma-international.org/5.1/#sec-15.4)
//!
//! The iteration methods (`map`, `forEach`, ...) and `sort` live in the
//! startup polyfills; everything here is a structural operation on the
//! element store.

use crate::bridge::Arguments;
use crate::heap::indexes::ObjectIndex;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::ObjectHeapData;
use crate::value::{to_uint32, JsResult, Value};

use super::{bind_constructor, link_prototype, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let array = interpreter.heap.intrinsics.array;
    bind_constructor(interpreter, array, "Array", constructor);

    // Array.prototype is itself an (empty) array.
    let object = interpreter.heap.intrinsics.object;
    let prototype = interpreter.heap.alloc(ObjectHeapData {
        parent: Some(object),
        length: Some(0),
        ..Default::default()
    });
    link_prototype(interpreter, array, prototype);

    method(interpreter, array, "isArray", is_array);

    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "join", join);
    method(interpreter, prototype, "pop", pop);
    method(interpreter, prototype, "push", push);
    method(interpreter, prototype, "shift", shift);
    method(interpreter, prototype, "unshift", unshift);
    method(interpreter, prototype, "reverse", reverse);
    method(interpreter, prototype, "splice", splice);
    method(interpreter, prototype, "slice", slice);
    method(interpreter, prototype, "concat", concat);
    method(interpreter, prototype, "indexOf", index_of);
    method(interpreter, prototype, "lastIndexOf", last_index_of);
}

/// `new Array(n)` presizes, `Array(a, b, c)` collects; the call form
/// behaves like the construct form.
fn constructor(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    if args.len() == 1 {
        if let Value::Number(requested) = args.get(0) {
            let length = to_uint32(requested);
            if f64::from(length) != requested {
                return Err(interpreter
                    .throw_exception(ExceptionType::RangeError, "Invalid array length"));
            }
            let array = interpreter.heap.create_array();
            interpreter.heap[array].length = Some(length);
            return Ok(Value::Object(array));
        }
    }
    let array = interpreter.heap.create_array();
    for argument in args.iter() {
        interpreter.heap.array_push(array, argument);
    }
    Ok(Value::Object(array))
}

/// ### [15.4.3.2 Array.isArray](https://262.ecma-international.org/5.1/#sec-15.4.3.2)
fn is_array(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let result = args
        .get(0)
        .as_object()
        .is_some_and(|object| interpreter.heap[object].is_array());
    Ok(Value::from_bool(result))
}

fn this_array(interpreter: &mut Interpreter, this: Value) -> JsResult<ObjectIndex> {
    this.as_object()
        .filter(|object| interpreter.heap[*object].is_array())
        .ok_or_else(|| {
            interpreter.throw_exception(
                ExceptionType::TypeError,
                "Array.prototype method called on a non-array",
            )
        })
}

fn length_of(interpreter: &Interpreter, array: ObjectIndex) -> u32 {
    interpreter.heap[array].length.unwrap_or(0)
}

/// Reads the whole element store; `None` marks a hole.
fn elements(interpreter: &Interpreter, array: ObjectIndex) -> Vec<Option<Value>> {
    let length = length_of(interpreter, array);
    (0..length)
        .map(|i| interpreter.heap.element(array, i))
        .collect()
}

/// Replaces the whole element store, dropping old integer keys.
fn set_elements(
    interpreter: &mut Interpreter,
    array: ObjectIndex,
    items: Vec<Option<Value>>,
) {
    interpreter.set_array_length(array, 0);
    for (position, item) in items.iter().enumerate() {
        if let Some(item) = item {
            let key = interpreter.heap.intern(&position.to_string());
            interpreter.heap[array].insert(key, *item);
        }
    }
    interpreter.heap[array].length = Some(items.len() as u32);
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(this);
    Ok(interpreter.heap.string_value(&text))
}

/// ### [15.4.4.5 Array.prototype.join](https://262.ecma-international.org/5.1/#sec-15.4.4.5)
fn join(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let separator = match args.get(0) {
        Value::Undefined => ",".to_string(),
        other => interpreter.heap.to_string(other),
    };
    let parts: Vec<String> = elements(interpreter, array)
        .into_iter()
        .map(|element| match element {
            None | Some(Value::Undefined) | Some(Value::Null) => String::new(),
            Some(element) => interpreter.heap.to_string(element),
        })
        .collect();
    Ok(interpreter.heap.string_value(&parts.join(&separator)))
}

fn pop(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let length = length_of(interpreter, array);
    if length == 0 {
        return Ok(Value::Undefined);
    }
    let last = interpreter
        .heap
        .element(array, length - 1)
        .unwrap_or(Value::Undefined);
    interpreter.set_array_length(array, length - 1);
    Ok(last)
}

fn push(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    for argument in args.iter() {
        interpreter.heap.array_push(array, argument);
    }
    Ok(Value::Number(f64::from(length_of(interpreter, array))))
}

fn shift(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let mut items = elements(interpreter, array);
    if items.is_empty() {
        return Ok(Value::Undefined);
    }
    let first = items.remove(0).unwrap_or(Value::Undefined);
    set_elements(interpreter, array, items);
    Ok(first)
}

fn unshift(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let mut items: Vec<Option<Value>> = args.iter().map(Some).collect();
    items.extend(elements(interpreter, array));
    set_elements(interpreter, array, items);
    Ok(Value::Number(f64::from(length_of(interpreter, array))))
}

fn reverse(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let mut items = elements(interpreter, array);
    items.reverse();
    set_elements(interpreter, array, items);
    Ok(this)
}

/// Clamps a possibly negative relative index against `length`.
fn relative_index(interpreter: &Interpreter, value: Value, length: u32, default: u32) -> u32 {
    match value {
        Value::Undefined => default,
        other => {
            let position = interpreter.heap.to_number(other);
            if position.is_nan() {
                0
            } else if position < 0.0 {
                let from_end = length as f64 + position;
                if from_end < 0.0 {
                    0
                } else {
                    from_end as u32
                }
            } else if position >= length as f64 {
                length
            } else {
                position as u32
            }
        }
    }
}

/// ### [15.4.4.12 Array.prototype.splice](https://262.ecma-international.org/5.1/#sec-15.4.4.12)
fn splice(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let length = length_of(interpreter, array);
    let start = relative_index(interpreter, args.get(0), length, 0);
    let delete_count = match args.get(1) {
        Value::Undefined if args.len() <= 1 => length - start,
        other => {
            let requested = interpreter.heap.to_number(other).max(0.0);
            (requested as u32).min(length - start)
        }
    };
    let mut items = elements(interpreter, array);
    let removed: Vec<Option<Value>> = items
        .splice(
            start as usize..(start + delete_count) as usize,
            args.iter().skip(2).map(Some),
        )
        .collect();
    set_elements(interpreter, array, items);
    let result = interpreter.heap.create_array();
    for item in removed {
        interpreter
            .heap
            .array_push(result, item.unwrap_or(Value::Undefined));
    }
    Ok(Value::Object(result))
}

/// ### [15.4.4.10 Array.prototype.slice](https://262.ecma-international.org/5.1/#sec-15.4.4.10)
fn slice(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let length = length_of(interpreter, array);
    let begin = relative_index(interpreter, args.get(0), length, 0);
    let end = relative_index(interpreter, args.get(1), length, length);
    let result = interpreter.heap.create_array();
    for position in begin..end.max(begin) {
        let element = interpreter
            .heap
            .element(array, position)
            .unwrap_or(Value::Undefined);
        interpreter.heap.array_push(result, element);
    }
    Ok(Value::Object(result))
}

/// ### [15.4.4.4 Array.prototype.concat](https://262.ecma-international.org/5.1/#sec-15.4.4.4)
fn concat(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let result = interpreter.heap.create_array();
    let mut append = |interpreter: &mut Interpreter, value: Value| {
        match value.as_object().filter(|o| interpreter.heap[*o].is_array()) {
            Some(source) => {
                for position in 0..length_of(interpreter, source) {
                    let element = interpreter
                        .heap
                        .element(source, position)
                        .unwrap_or(Value::Undefined);
                    interpreter.heap.array_push(result, element);
                }
            }
            None => interpreter.heap.array_push(result, value),
        }
    };
    append(interpreter, Value::Object(array));
    for argument in args.iter() {
        append(interpreter, argument);
    }
    Ok(Value::Object(result))
}

/// ### [15.4.4.14 Array.prototype.indexOf](https://262.ecma-international.org/5.1/#sec-15.4.4.14)
fn index_of(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let length = length_of(interpreter, array);
    let target = args.get(0);
    let from = relative_index(interpreter, args.get(1), length, 0);
    for position in from..length {
        if let Some(element) = interpreter.heap.element(array, position) {
            if interpreter.heap.strictly_equal(element, target) {
                return Ok(Value::Number(f64::from(position)));
            }
        }
    }
    Ok(Value::Number(-1.0))
}

fn last_index_of(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let array = this_array(interpreter, this)?;
    let length = length_of(interpreter, array);
    let target = args.get(0);
    let from = match args.get(1) {
        Value::Undefined if args.len() <= 1 => length,
        other => relative_index(interpreter, other, length, length).saturating_add(1),
    };
    for position in (0..from.min(length)).rev() {
        if let Some(element) = interpreter.heap.element(array, position) {
            if interpreter.heap.strictly_equal(element, target) {
                return Ok(Value::Number(f64::from(position)));
            }
        }
    }
    Ok(Value::Number(-1.0))
}
