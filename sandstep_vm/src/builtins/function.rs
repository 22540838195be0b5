// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.3 Function Objects](https://262.ecma-international.org/5.1/#sec-15.3)

use crate::bridge::Arguments;
use crate::heap::indexes::ObjectIndex;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::{FunctionData, ObjectHeapData, SpecialForm};
use crate::source;
use crate::value::{JsResult, Value};

use super::{bind_constructor, method, property};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let function = interpreter.heap.intrinsics.function;
    bind_constructor(interpreter, function, "Function", constructor);

    // Function.prototype is itself callable and returns undefined.
    let object = interpreter.heap.intrinsics.object;
    let prototype = interpreter.heap.alloc(ObjectHeapData::function(
        Some(object),
        FunctionData {
            native: Some(prototype_itself),
            ..Default::default()
        },
    ));
    super::link_prototype(interpreter, function, prototype);

    let apply = special_form(interpreter, SpecialForm::Apply);
    property(interpreter, prototype, "apply", apply);
    let call = special_form(interpreter, SpecialForm::Call);
    property(interpreter, prototype, "call", call);
    method(interpreter, prototype, "bind", bind);
    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "valueOf", value_of);
}

/// Creates one of the frame-rewriting built-ins (`apply`, `call`,
/// `eval`); their behaviour lives in the call machinery.
pub(crate) fn special_form(interpreter: &mut Interpreter, form: SpecialForm) -> Value {
    let parent = interpreter.heap.intrinsics.function;
    Value::Object(interpreter.heap.alloc(ObjectHeapData::function(
        Some(parent),
        FunctionData {
            special: Some(form),
            ..Default::default()
        },
    )))
}

/// `Function('a, b', 'return a + b;')` builds a function by parsing an
/// internally generated snippet; the result closes over the global scope.
fn constructor(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let count = args.len();
    let (params, body) = if count == 0 {
        (String::new(), String::new())
    } else {
        let params: Vec<String> = (0..count - 1)
            .map(|i| interpreter.heap.to_string(args.get(i)))
            .collect();
        let body = interpreter.heap.to_string(args.get(count - 1));
        (params.join(", "), body)
    };
    let node = match source::parse_function_literal(&params, &body, &mut interpreter.ast) {
        Ok(node) => node,
        Err(failure) => {
            return Err(interpreter
                .throw_exception(ExceptionType::SyntaxError, &failure.to_string()));
        }
    };
    let scope = interpreter.heap.global_scope;
    Ok(interpreter.create_function(node, scope))
}

fn prototype_itself(
    _interpreter: &mut Interpreter,
    _this: Value,
    _args: &Arguments,
) -> JsResult<Value> {
    Ok(Value::Undefined)
}

/// ### [15.3.4.5 Function.prototype.bind](https://262.ecma-international.org/5.1/#sec-15.3.4.5)
fn bind(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let Some(target) = callable(interpreter, this) else {
        return Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Bind must be called on a function",
        ));
    };
    let bound_this = (!args.is_empty()).then(|| args.get(0));
    let bound_args: Vec<Value> = args.iter().skip(1).collect();
    let parent = interpreter.heap.intrinsics.function;
    Ok(Value::Object(interpreter.heap.alloc(
        ObjectHeapData::function(
            Some(parent),
            FunctionData {
                bound_target: Some(target),
                bound_this,
                bound_args,
                ..Default::default()
            },
        ),
    )))
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(this);
    Ok(interpreter.heap.string_value(&text))
}

fn value_of(_interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    Ok(this)
}

pub(crate) fn callable(interpreter: &Interpreter, value: Value) -> Option<ObjectIndex> {
    value
        .as_object()
        .filter(|object| interpreter.heap[*object].is_function())
}
