// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.6 Boolean Objects](https://262.ecma-international.org/5.1/#sec-15.6)

use crate::bridge::Arguments;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::ObjectPayload;
use crate::value::{JsResult, Value};

use super::{bind_constructor, called_as_new, create_prototype, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let boolean = interpreter.heap.intrinsics.boolean;
    bind_constructor(interpreter, boolean, "Boolean", constructor);
    let object = interpreter.heap.intrinsics.object;
    let prototype = create_prototype(interpreter, boolean, Some(object));
    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "valueOf", value_of);
}

fn constructor(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let value = interpreter.heap.to_boolean(args.get(0));
    let boolean = interpreter.heap.intrinsics.boolean;
    if let Some(receiver) = called_as_new(interpreter, this, boolean) {
        interpreter.heap[receiver].payload = Some(ObjectPayload::Boolean(value));
        return Ok(this);
    }
    Ok(Value::from_bool(value))
}

fn this_boolean(interpreter: &mut Interpreter, this: Value) -> JsResult<bool> {
    match interpreter.heap.value_of(this) {
        Value::Boolean(value) => Ok(value),
        _ => Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Boolean.prototype method called on a non-boolean",
        )),
    }
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let value = this_boolean(interpreter, this)?;
    Ok(interpreter.heap.string_value(if value { "true" } else { "false" }))
}

fn value_of(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let value = this_boolean(interpreter, this)?;
    Ok(Value::from_bool(value))
}
