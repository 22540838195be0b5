// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.8 The Math Object](https://262.ecma-international.org/5.1/#sec-15.8)

use crate::bridge::Arguments;
use crate::interpreter::Interpreter;
use crate::value::{JsResult, Value};

use super::{frozen_property, method, property};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let math = interpreter.heap.intrinsics.math;
    let global = interpreter.heap.global_scope;
    property(interpreter, global, "Math", Value::Object(math));

    frozen_property(interpreter, math, "E", Value::Number(std::f64::consts::E));
    frozen_property(interpreter, math, "LN2", Value::Number(std::f64::consts::LN_2));
    frozen_property(interpreter, math, "LN10", Value::Number(std::f64::consts::LN_10));
    frozen_property(
        interpreter,
        math,
        "LOG2E",
        Value::Number(std::f64::consts::LOG2_E),
    );
    frozen_property(
        interpreter,
        math,
        "LOG10E",
        Value::Number(std::f64::consts::LOG10_E),
    );
    frozen_property(interpreter, math, "PI", Value::Number(std::f64::consts::PI));
    frozen_property(
        interpreter,
        math,
        "SQRT1_2",
        Value::Number(std::f64::consts::FRAC_1_SQRT_2),
    );
    frozen_property(
        interpreter,
        math,
        "SQRT2",
        Value::Number(std::f64::consts::SQRT_2),
    );

    method(interpreter, math, "abs", |i, _, a| unary(i, a, f64::abs));
    method(interpreter, math, "acos", |i, _, a| unary(i, a, f64::acos));
    method(interpreter, math, "asin", |i, _, a| unary(i, a, f64::asin));
    method(interpreter, math, "atan", |i, _, a| unary(i, a, f64::atan));
    method(interpreter, math, "ceil", |i, _, a| unary(i, a, f64::ceil));
    method(interpreter, math, "cos", |i, _, a| unary(i, a, f64::cos));
    method(interpreter, math, "exp", |i, _, a| unary(i, a, f64::exp));
    method(interpreter, math, "floor", |i, _, a| unary(i, a, f64::floor));
    method(interpreter, math, "log", |i, _, a| unary(i, a, f64::ln));
    method(interpreter, math, "sin", |i, _, a| unary(i, a, f64::sin));
    method(interpreter, math, "sqrt", |i, _, a| unary(i, a, f64::sqrt));
    method(interpreter, math, "tan", |i, _, a| unary(i, a, f64::tan));
    method(interpreter, math, "atan2", atan2);
    method(interpreter, math, "pow", pow);
    method(interpreter, math, "round", round);
    method(interpreter, math, "max", max);
    method(interpreter, math, "min", min);
    method(interpreter, math, "random", random);
}

fn unary(interpreter: &mut Interpreter, args: &Arguments, f: fn(f64) -> f64) -> JsResult<Value> {
    let value = interpreter.heap.to_number(args.get(0));
    Ok(Value::Number(f(value)))
}

fn atan2(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let y = interpreter.heap.to_number(args.get(0));
    let x = interpreter.heap.to_number(args.get(1));
    Ok(Value::Number(y.atan2(x)))
}

fn pow(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let base = interpreter.heap.to_number(args.get(0));
    let exponent = interpreter.heap.to_number(args.get(1));
    Ok(Value::Number(base.powf(exponent)))
}

/// ### [15.8.2.15 round](https://262.ecma-international.org/5.1/#sec-15.8.2.15)
///
/// Halfway cases round toward +Infinity, unlike `f64::round`.
fn round(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let value = interpreter.heap.to_number(args.get(0));
    Ok(Value::Number((value + 0.5).floor()))
}

fn max(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let mut result = f64::NEG_INFINITY;
    for argument in args.iter() {
        let value = interpreter.heap.to_number(argument);
        if value.is_nan() {
            return Ok(Value::NAN);
        }
        if value > result {
            result = value;
        }
    }
    Ok(Value::Number(result))
}

fn min(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let mut result = f64::INFINITY;
    for argument in args.iter() {
        let value = interpreter.heap.to_number(argument);
        if value.is_nan() {
            return Ok(Value::NAN);
        }
        if value < result {
            result = value;
        }
    }
    Ok(Value::Number(result))
}

fn random(interpreter: &mut Interpreter, _this: Value, _args: &Arguments) -> JsResult<Value> {
    Ok(Value::Number(interpreter.heap.next_random()))
}
