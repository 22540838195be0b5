// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.1 The Global Object](https://262.ecma-international.org/5.1/#sec-15.1)

use crate::bridge::Arguments;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::SpecialForm;
use crate::value::{JsResult, Value};

use super::function::special_form;
use super::{frozen_property, method, property};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let global = interpreter.heap.global_scope;

    frozen_property(interpreter, global, "NaN", Value::NAN);
    frozen_property(interpreter, global, "Infinity", Value::Number(f64::INFINITY));
    frozen_property(interpreter, global, "undefined", Value::Undefined);
    property(interpreter, global, "window", Value::Object(global));

    let eval = special_form(interpreter, SpecialForm::Eval);
    property(interpreter, global, "eval", eval);

    method(interpreter, global, "isNaN", is_nan);
    method(interpreter, global, "isFinite", is_finite);
    method(interpreter, global, "parseFloat", parse_float);
    method(interpreter, global, "parseInt", parse_int);
    method(interpreter, global, "encodeURIComponent", encode_uri_component);
    method(interpreter, global, "decodeURIComponent", decode_uri_component);
}

/// ### [15.1.2.4 isNaN](https://262.ecma-international.org/5.1/#sec-15.1.2.4)
fn is_nan(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let value = interpreter.heap.to_number(args.get(0));
    Ok(Value::from_bool(value.is_nan()))
}

/// ### [15.1.2.5 isFinite](https://262.ecma-international.org/5.1/#sec-15.1.2.5)
fn is_finite(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let value = interpreter.heap.to_number(args.get(0));
    Ok(Value::from_bool(value.is_finite()))
}

/// ### [15.1.2.3 parseFloat](https://262.ecma-international.org/5.1/#sec-15.1.2.3)
///
/// Longest numeric prefix, unlike the full-string ToNumber conversion.
fn parse_float(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(args.get(0));
    let text = text.trim_start();
    let (sign, unsigned) = strip_sign(text);
    if unsigned.starts_with("Infinity") {
        return Ok(Value::Number(sign * f64::INFINITY));
    }
    let mut end = 0;
    let bytes = text.as_bytes();
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exponent = false;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot && !seen_exponent => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exponent => {
                // Only consume the exponent if digits follow.
                let mut lookahead = end + 1;
                if matches!(bytes.get(lookahead), Some(b'+') | Some(b'-')) {
                    lookahead += 1;
                }
                if !matches!(bytes.get(lookahead), Some(b'0'..=b'9')) {
                    break;
                }
                seen_exponent = true;
                end = lookahead;
            }
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return Ok(Value::NAN);
    }
    Ok(Value::Number(
        text[..end].parse::<f64>().unwrap_or(f64::NAN),
    ))
}

fn strip_sign(text: &str) -> (f64, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, text)
    }
}

/// ### [15.1.2.2 parseInt](https://262.ecma-international.org/5.1/#sec-15.1.2.2)
fn parse_int(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(args.get(0));
    let text = text.trim_start();
    let (sign, mut digits) = strip_sign(text);
    let mut radix = match args.get(1) {
        Value::Undefined => 0,
        other => interpreter.heap.to_number(other) as i64,
    };
    if radix != 0 && !(2..=36).contains(&radix) {
        return Ok(Value::NAN);
    }
    if (radix == 0 || radix == 16)
        && (digits.starts_with("0x") || digits.starts_with("0X"))
    {
        digits = &digits[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    let mut value = f64::NAN;
    for c in digits.chars() {
        match c.to_digit(radix as u32) {
            Some(digit) => {
                if value.is_nan() {
                    value = 0.0;
                }
                value = value * radix as f64 + digit as f64;
            }
            None => break,
        }
    }
    if value.is_nan() {
        return Ok(Value::NAN);
    }
    Ok(Value::Number(sign * value))
}

const URI_UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.!~*'()";

/// ### [15.1.3.4 encodeURIComponent](https://262.ecma-international.org/5.1/#sec-15.1.3.4)
fn encode_uri_component(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let text = interpreter.heap.to_string(args.get(0));
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        if URI_UNRESERVED.contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    Ok(interpreter.heap.string_value(&encoded))
}

/// ### [15.1.3.2 decodeURIComponent](https://262.ecma-international.org/5.1/#sec-15.1.3.2)
fn decode_uri_component(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let text = interpreter.heap.to_string(args.get(0));
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut position = 0;
    while position < bytes.len() {
        if bytes[position] == b'%' {
            let hex = text.get(position + 1..position + 3);
            let byte = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok());
            match byte {
                Some(byte) => {
                    decoded.push(byte);
                    position += 3;
                }
                None => {
                    return Err(interpreter.throw_exception(
                        ExceptionType::UriError,
                        &format!("URI malformed at position {position}"),
                    ));
                }
            }
        } else {
            decoded.push(bytes[position]);
            position += 1;
        }
    }
    match String::from_utf8(decoded) {
        Ok(decoded) => Ok(interpreter.heap.string_value(&decoded)),
        Err(_) => Err(interpreter.throw_exception(ExceptionType::UriError, "URI malformed")),
    }
}
