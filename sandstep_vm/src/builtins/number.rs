// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.7 Number Objects](https://262.ecma-international.org/5.1/#sec-15.7)

use crate::bridge::Arguments;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::ObjectPayload;
use crate::value::{number_to_string, JsResult, Value};

use super::{bind_constructor, called_as_new, create_prototype, frozen_property, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let number = interpreter.heap.intrinsics.number;
    bind_constructor(interpreter, number, "Number", constructor);
    let object = interpreter.heap.intrinsics.object;
    let prototype = create_prototype(interpreter, number, Some(object));

    frozen_property(interpreter, number, "MAX_VALUE", Value::Number(f64::MAX));
    frozen_property(interpreter, number, "MIN_VALUE", Value::Number(5e-324));
    frozen_property(interpreter, number, "NaN", Value::NAN);
    frozen_property(
        interpreter,
        number,
        "NEGATIVE_INFINITY",
        Value::Number(f64::NEG_INFINITY),
    );
    frozen_property(
        interpreter,
        number,
        "POSITIVE_INFINITY",
        Value::Number(f64::INFINITY),
    );

    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "toLocaleString", to_locale_string);
    method(interpreter, prototype, "valueOf", value_of);
    method(interpreter, prototype, "toFixed", to_fixed);
    method(interpreter, prototype, "toExponential", to_exponential);
    method(interpreter, prototype, "toPrecision", to_precision);
}

/// `Number(x)` converts, `new Number(x)` wraps.
fn constructor(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let value = if args.is_empty() {
        0.0
    } else {
        interpreter.heap.to_number(args.get(0))
    };
    let number = interpreter.heap.intrinsics.number;
    if let Some(receiver) = called_as_new(interpreter, this, number) {
        interpreter.heap[receiver].payload = Some(ObjectPayload::Number(value));
        return Ok(this);
    }
    Ok(Value::Number(value))
}

fn this_number(interpreter: &mut Interpreter, this: Value) -> JsResult<f64> {
    match interpreter.heap.value_of(this) {
        Value::Number(value) => Ok(value),
        _ => Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Number.prototype method called on a non-number",
        )),
    }
}

/// ### [15.7.4.2 Number.prototype.toString](https://262.ecma-international.org/5.1/#sec-15.7.4.2)
fn to_string(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let value = this_number(interpreter, this)?;
    let radix = match args.get(0) {
        Value::Undefined => 10,
        other => interpreter.heap.to_number(other) as i64,
    };
    if !(2..=36).contains(&radix) {
        return Err(interpreter.throw_exception(
            ExceptionType::RangeError,
            "toString() radix must be between 2 and 36",
        ));
    }
    let text = if radix == 10 {
        number_to_string(value)
    } else {
        radix_string(value, radix as u32)
    };
    Ok(interpreter.heap.string_value(&text))
}

fn to_locale_string(
    interpreter: &mut Interpreter,
    this: Value,
    _args: &Arguments,
) -> JsResult<Value> {
    let value = this_number(interpreter, this)?;
    let text = number_to_string(value);
    Ok(interpreter.heap.string_value(&text))
}

fn value_of(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let value = this_number(interpreter, this)?;
    Ok(Value::Number(value))
}

fn digit_count(interpreter: &mut Interpreter, argument: Value, max: usize) -> JsResult<usize> {
    let digits = interpreter.heap.to_number(argument);
    if digits.is_nan() || digits < 0.0 || digits > max as f64 {
        return Err(interpreter.throw_exception(
            ExceptionType::RangeError,
            "digit count argument out of range",
        ));
    }
    Ok(digits as usize)
}

/// ### [15.7.4.5 Number.prototype.toFixed](https://262.ecma-international.org/5.1/#sec-15.7.4.5)
fn to_fixed(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let value = this_number(interpreter, this)?;
    let digits = match args.get(0) {
        Value::Undefined => 0,
        other => digit_count(interpreter, other, 20)?,
    };
    let text = if value.is_finite() {
        format!("{value:.digits$}")
    } else {
        number_to_string(value)
    };
    Ok(interpreter.heap.string_value(&text))
}

/// ### [15.7.4.6 Number.prototype.toExponential](https://262.ecma-international.org/5.1/#sec-15.7.4.6)
fn to_exponential(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let value = this_number(interpreter, this)?;
    if !value.is_finite() {
        let text = number_to_string(value);
        return Ok(interpreter.heap.string_value(&text));
    }
    let text = match args.get(0) {
        Value::Undefined => format!("{value:e}"),
        other => {
            let digits = digit_count(interpreter, other, 20)?;
            format!("{value:.digits$e}")
        }
    };
    Ok(interpreter.heap.string_value(&js_exponent(&text)))
}

/// ### [15.7.4.7 Number.prototype.toPrecision](https://262.ecma-international.org/5.1/#sec-15.7.4.7)
fn to_precision(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let value = this_number(interpreter, this)?;
    if args.get(0).is_undefined() {
        let text = number_to_string(value);
        return Ok(interpreter.heap.string_value(&text));
    }
    let precision = digit_count(interpreter, args.get(0), 21)?;
    if precision == 0 {
        return Err(interpreter.throw_exception(
            ExceptionType::RangeError,
            "toPrecision() argument must be between 1 and 21",
        ));
    }
    if !value.is_finite() || value == 0.0 {
        let text = if value == 0.0 {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            number_to_string(value)
        };
        return Ok(interpreter.heap.string_value(&text));
    }
    let exponent = value.abs().log10().floor() as i64;
    let text = if exponent < -6 || exponent >= precision as i64 {
        js_exponent(&format!("{:.*e}", precision - 1, value))
    } else {
        let decimals = (precision as i64 - 1 - exponent).max(0) as usize;
        format!("{value:.decimals$}")
    };
    Ok(interpreter.heap.string_value(&text))
}

/// Rust prints `1.5e2`; JS expects `1.5e+2`.
fn js_exponent(text: &str) -> String {
    match text.find('e') {
        Some(position) if !text[position + 1..].starts_with('-') => {
            format!("{}e+{}", &text[..position], &text[position + 1..])
        }
        _ => text.to_string(),
    }
}

/// Integer-and-fraction rendering in an arbitrary radix, enough digits to
/// read back the value.
fn radix_string(value: f64, radix: u32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let negative = value < 0.0;
    let mut integer = value.abs().trunc();
    let mut fraction = value.abs().fract();
    let digit = |d: u32| std::char::from_digit(d, radix).expect("digit within radix");
    let mut digits = Vec::new();
    if integer == 0.0 {
        digits.push('0');
    }
    while integer >= 1.0 {
        digits.push(digit((integer % radix as f64) as u32));
        integer = (integer / radix as f64).trunc();
    }
    if negative {
        digits.push('-');
    }
    digits.reverse();
    let mut text: String = digits.into_iter().collect();
    if fraction > 0.0 {
        text.push('.');
        for _ in 0..20 {
            fraction *= radix as f64;
            let d = fraction.trunc() as u32;
            text.push(digit(d));
            fraction -= d as f64;
            if fraction <= 0.0 {
                break;
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::radix_string;

    #[test]
    fn radix_rendering() {
        assert_eq!(radix_string(255.0, 16), "ff");
        assert_eq!(radix_string(-8.0, 2), "-1000");
        assert_eq!(radix_string(0.5, 2), "0.1");
    }
}
