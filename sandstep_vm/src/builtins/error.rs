// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.11 Error Objects](https://262.ecma-international.org/5.1/#sec-15.11)
//!
//! The six standard subclasses share one constructor template and differ
//! only by the `name` on their prototypes; their prototype chains route
//! through `Error.prototype`.

use crate::bridge::Arguments;
use crate::heap::indexes::ObjectIndex;
use crate::interpreter::Interpreter;
use crate::value::{JsResult, Value};

use super::{bind_constructor, called_as_new, create_prototype, method, property};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let error = interpreter.heap.intrinsics.error;
    bind_constructor(interpreter, error, "Error", error_constructor);
    let object = interpreter.heap.intrinsics.object;
    let prototype = create_prototype(interpreter, error, Some(object));
    let name = interpreter.heap.string_value("Error");
    property(interpreter, prototype, "name", name);
    property(interpreter, prototype, "message", Value::EMPTY_STRING);
    method(interpreter, prototype, "toString", to_string);

    let subclasses: [(ObjectIndex, &str, crate::bridge::NativeFn); 6] = [
        (
            interpreter.heap.intrinsics.eval_error,
            "EvalError",
            eval_error_constructor,
        ),
        (
            interpreter.heap.intrinsics.range_error,
            "RangeError",
            range_error_constructor,
        ),
        (
            interpreter.heap.intrinsics.reference_error,
            "ReferenceError",
            reference_error_constructor,
        ),
        (
            interpreter.heap.intrinsics.syntax_error,
            "SyntaxError",
            syntax_error_constructor,
        ),
        (
            interpreter.heap.intrinsics.type_error,
            "TypeError",
            type_error_constructor,
        ),
        (
            interpreter.heap.intrinsics.uri_error,
            "URIError",
            uri_error_constructor,
        ),
    ];
    for (constructor, name, behaviour) in subclasses {
        bind_constructor(interpreter, constructor, name, behaviour);
        // The subclass prototype's parent is ERROR, so instances inherit
        // through Error.prototype.
        let prototype = create_prototype(interpreter, constructor, Some(error));
        let name = interpreter.heap.string_value(name);
        property(interpreter, prototype, "name", name);
    }
}

/// One template for all seven constructors: fill the receiver when called
/// through `new`, otherwise build a fresh instance.
fn construct(
    interpreter: &mut Interpreter,
    constructor: ObjectIndex,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let target = match called_as_new(interpreter, this, constructor) {
        Some(receiver) => receiver,
        None => interpreter.heap.create_object(Some(constructor)),
    };
    if !args.get(0).is_undefined() {
        let message = interpreter.heap.to_string(args.get(0));
        let message = interpreter.heap.string_value(&message);
        let key = interpreter.heap.intern("message");
        interpreter.heap[target].insert(key, message);
        interpreter.heap[target].not_enumerable.insert(key);
    }
    Ok(Value::Object(target))
}

fn error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.error;
    construct(interpreter, constructor, this, args)
}

fn eval_error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.eval_error;
    construct(interpreter, constructor, this, args)
}

fn range_error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.range_error;
    construct(interpreter, constructor, this, args)
}

fn reference_error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.reference_error;
    construct(interpreter, constructor, this, args)
}

fn syntax_error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.syntax_error;
    construct(interpreter, constructor, this, args)
}

fn type_error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.type_error;
    construct(interpreter, constructor, this, args)
}

fn uri_error_constructor(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let constructor = interpreter.heap.intrinsics.uri_error;
    construct(interpreter, constructor, this, args)
}

/// ### [15.11.4.4 Error.prototype.toString](https://262.ecma-international.org/5.1/#sec-15.11.4.4)
fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let name = interpreter.get_property(this, "name");
    let name = if name.is_undefined() {
        "Error".to_string()
    } else {
        interpreter.heap.to_string(name)
    };
    let message = interpreter.get_property(this, "message");
    let message = if message.is_undefined() {
        String::new()
    } else {
        interpreter.heap.to_string(message)
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message,
        (false, true) => name,
        (false, false) => format!("{name}: {message}"),
    };
    Ok(interpreter.heap.string_value(&text))
}
