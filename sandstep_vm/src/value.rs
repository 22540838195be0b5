// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Debug;

use crate::heap::indexes::{ObjectIndex, StringIndex};

/// A handle to any interpreter-visible value. Primitives carry their payload
/// inline (strings as an interned index); objects are indexes into the heap
/// arena. Handles are `Copy`, so singleton identity is variant-plus-payload
/// identity.
#[derive(Clone, Copy)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(StringIndex),
    Object(ObjectIndex),
}

const _VALUE_IS_SMALL: () = assert!(std::mem::size_of::<Value>() <= 16);

impl Value {
    pub const UNDEFINED: Value = Value::Undefined;
    pub const NULL: Value = Value::Null;
    pub const TRUE: Value = Value::Boolean(true);
    pub const FALSE: Value = Value::Boolean(false);
    pub const NAN: Value = Value::Number(f64::NAN);
    pub const NUMBER_ZERO: Value = Value::Number(0.0);
    pub const NUMBER_ONE: Value = Value::Number(1.0);
    /// The empty string is interned at heap construction, before anything
    /// else, so its index is fixed.
    pub const EMPTY_STRING: Value = Value::String(StringIndex::from_index(0));

    pub fn from_bool(value: bool) -> Value {
        if value {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }

    pub fn from_f64(value: f64) -> Value {
        Value::Number(value)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Object(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn as_object(&self) -> Option<ObjectIndex> {
        match self {
            Value::Object(index) => Some(*index),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            Value::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Value::String(index) => f.debug_tuple("String").field(index).finish(),
            Value::Object(index) => f.debug_tuple("Object").field(index).finish(),
        }
    }
}

/// Result of an operation that may raise an interpreter-level exception.
/// The error wraps the thrown value; unwinding to a `try` handler or out to
/// the host happens in the evaluator.
pub type JsResult<T> = Result<T, JsError>;

#[derive(Debug, Clone, Copy)]
pub struct JsError(Value);

impl JsError {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Value {
        self.0
    }
}

/// ### [9.8.1 ToString Applied to the Number Type](https://262.ecma-international.org/5.1/#sec-9.8.1)
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    if (1e-6..1e21).contains(&abs) {
        // Fixed notation. Integral values within the exact-integer range
        // print without a fraction.
        if value.fract() == 0.0 && abs < 9_007_199_254_740_992.0 {
            return format!("{}", value as i64);
        }
        return format!("{value}");
    }
    // Exponent notation, with the sign JS includes on the exponent.
    let formatted = format!("{value:e}");
    if let Some(position) = formatted.find('e') {
        let exponent = &formatted[position + 1..];
        if !exponent.starts_with('-') {
            return format!("{}e+{}", &formatted[..position], exponent);
        }
    }
    formatted
}

/// ### [9.3.1 ToNumber Applied to the String Type](https://262.ecma-international.org/5.1/#sec-9.3.1)
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return match u64::from_str_radix(hex, 16) {
            Ok(value) => value as f64,
            Err(_) => f64::NAN,
        };
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust's float parser accepts words like "inf" and "nan" that the JS
    // grammar does not.
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// ### [9.6 ToUint32](https://262.ecma-international.org/5.1/#sec-9.6) /
/// [9.5 ToInt32](https://262.ecma-international.org/5.1/#sec-9.5)
pub fn to_uint32(value: f64) -> u32 {
    if !value.is_finite() || value == 0.0 {
        return 0;
    }
    let modulo = value.trunc() % 4_294_967_296.0;
    if modulo < 0.0 {
        (modulo + 4_294_967_296.0) as u32
    } else {
        modulo as u32
    }
}

pub fn to_int32(value: f64) -> i32 {
    to_uint32(value) as i32
}

/// A property name that denotes a valid array index (ES5 15.4).
pub fn array_index(name: &str) -> Option<u32> {
    if name.is_empty() || name.len() > 10 {
        return None;
    }
    if name != "0" && name.starts_with('0') {
        return None;
    }
    name.parse::<u32>().ok().filter(|n| *n != u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_matches_js() {
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(0.0), "0");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-42.0), "-42");
        assert_eq!(number_to_string(0.1), "0.1");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
    }

    #[test]
    fn string_parsing_matches_js() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  12  "), 12.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12abc").is_nan());
        assert!(string_to_number("inf").is_nan());
    }

    #[test]
    fn array_indexes() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
    }
}
