// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.12 The JSON Object](https://262.ecma-international.org/5.1/#sec-15.12)
//!
//! Both directions ride the host-bridge value bijection.

use crate::bridge::Arguments;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::value::{JsResult, Value};

use super::{method, property};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let json = interpreter.heap.intrinsics.json;
    let global = interpreter.heap.global_scope;
    property(interpreter, global, "JSON", Value::Object(json));
    method(interpreter, json, "parse", parse);
    method(interpreter, json, "stringify", stringify);
}

/// ### [15.12.2 JSON.parse](https://262.ecma-international.org/5.1/#sec-15.12.2)
fn parse(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(args.get(0));
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => Ok(interpreter.native_to_pseudo(&value)),
        Err(error) => Err(interpreter.throw_exception(
            ExceptionType::SyntaxError,
            &format!("JSON.parse: {error}"),
        )),
    }
}

/// ### [15.12.3 JSON.stringify](https://262.ecma-international.org/5.1/#sec-15.12.3)
///
/// Replacer functions are not supported; a truthy space argument selects
/// the host serializer's pretty form.
fn stringify(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    if super::function::callable(interpreter, args.get(1)).is_some() {
        return Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Replacer functions are not supported",
        ));
    }
    let mut visited = Vec::new();
    let Some(value) = interpreter.json_value(args.get(0), &mut visited)? else {
        return Ok(Value::Undefined);
    };
    let space = interpreter.heap.to_boolean(args.get(2));
    let rendered = if space {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    match rendered {
        Ok(text) => Ok(interpreter.heap.string_value(&text)),
        Err(error) => Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            &format!("JSON.stringify: {error}"),
        )),
    }
}
