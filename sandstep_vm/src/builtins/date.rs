// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.9 Date Objects](https://262.ecma-international.org/5.1/#sec-15.9)
//!
//! The payload is milliseconds since the epoch; component access and
//! formatting delegate to the host date library (all in UTC).

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::bridge::{iso_date, Arguments};
use crate::heap::format_date;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::ObjectPayload;
use crate::value::{JsResult, Value};

use super::{bind_constructor, called_as_new, create_prototype, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let date = interpreter.heap.intrinsics.date;
    bind_constructor(interpreter, date, "Date", constructor);
    let object = interpreter.heap.intrinsics.object;
    let prototype = create_prototype(interpreter, date, Some(object));

    method(interpreter, date, "now", now);
    method(interpreter, date, "parse", parse);
    method(interpreter, date, "UTC", utc);

    method(interpreter, prototype, "getTime", get_time);
    method(interpreter, prototype, "valueOf", get_time);
    method(interpreter, prototype, "setTime", set_time);
    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "toUTCString", to_string);
    method(interpreter, prototype, "toLocaleString", to_string);
    method(interpreter, prototype, "toISOString", to_iso_string);
    method(interpreter, prototype, "toJSON", to_json);
    method(interpreter, prototype, "getTimezoneOffset", get_timezone_offset);
    for name in ["getFullYear", "getUTCFullYear"] {
        method(interpreter, prototype, name, get_full_year);
    }
    for name in ["getMonth", "getUTCMonth"] {
        method(interpreter, prototype, name, get_month);
    }
    for name in ["getDate", "getUTCDate"] {
        method(interpreter, prototype, name, get_date);
    }
    for name in ["getDay", "getUTCDay"] {
        method(interpreter, prototype, name, get_day);
    }
    for name in ["getHours", "getUTCHours"] {
        method(interpreter, prototype, name, get_hours);
    }
    for name in ["getMinutes", "getUTCMinutes"] {
        method(interpreter, prototype, name, get_minutes);
    }
    for name in ["getSeconds", "getUTCSeconds"] {
        method(interpreter, prototype, name, get_seconds);
    }
    for name in ["getMilliseconds", "getUTCMilliseconds"] {
        method(interpreter, prototype, name, get_milliseconds);
    }
}

fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

fn parse_text(text: &str) -> f64 {
    DateTime::parse_from_rfc3339(text)
        .map(|moment| moment.timestamp_millis() as f64)
        .or_else(|_| {
            DateTime::parse_from_rfc2822(text).map(|moment| moment.timestamp_millis() as f64)
        })
        .unwrap_or(f64::NAN)
}

fn components_ms(interpreter: &mut Interpreter, args: &Arguments) -> f64 {
    let number = |interpreter: &mut Interpreter, index: usize, default: f64| {
        if index < args.len() {
            interpreter.heap.to_number(args.get(index))
        } else {
            default
        }
    };
    let mut year = number(interpreter, 0, f64::NAN);
    let month = number(interpreter, 1, 0.0);
    let day = number(interpreter, 2, 1.0);
    let hours = number(interpreter, 3, 0.0);
    let minutes = number(interpreter, 4, 0.0);
    let seconds = number(interpreter, 5, 0.0);
    let ms = number(interpreter, 6, 0.0);
    if year.is_nan() || month.is_nan() || day.is_nan() {
        return f64::NAN;
    }
    if (0.0..=99.0).contains(&year) {
        year += 1900.0;
    }
    match Utc.with_ymd_and_hms(
        year as i32,
        month as u32 + 1,
        day as u32,
        hours as u32,
        minutes as u32,
        seconds as u32,
    ) {
        chrono::LocalResult::Single(moment) => moment.timestamp_millis() as f64 + ms,
        _ => f64::NAN,
    }
}

fn constructor(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let date = interpreter.heap.intrinsics.date;
    let Some(receiver) = called_as_new(interpreter, this, date) else {
        // Called as a function: the current time as a string.
        let text = format_date(now_ms());
        return Ok(interpreter.heap.string_value(&text));
    };
    let ms = match args.len() {
        0 => now_ms(),
        1 => match args.get(0) {
            Value::String(text) => {
                let text = interpreter.heap[text].to_string();
                parse_text(&text)
            }
            other => interpreter.heap.to_number(other),
        },
        _ => components_ms(interpreter, args),
    };
    interpreter.heap[receiver].payload = Some(ObjectPayload::Date(ms));
    Ok(this)
}

/// ### [15.9.4.4 Date.now](https://262.ecma-international.org/5.1/#sec-15.9.4.4)
fn now(_interpreter: &mut Interpreter, _this: Value, _args: &Arguments) -> JsResult<Value> {
    Ok(Value::Number(now_ms()))
}

fn parse(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(args.get(0));
    Ok(Value::Number(parse_text(&text)))
}

fn utc(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    Ok(Value::Number(components_ms(interpreter, args)))
}

fn this_ms(interpreter: &mut Interpreter, this: Value) -> JsResult<f64> {
    let payload = this.as_object().and_then(|object| {
        match interpreter.heap[object].payload {
            Some(ObjectPayload::Date(ms)) => Some(ms),
            _ => None,
        }
    });
    payload.ok_or_else(|| {
        interpreter.throw_exception(
            ExceptionType::TypeError,
            "Date.prototype method called on a non-date",
        )
    })
}

fn this_moment(interpreter: &mut Interpreter, this: Value) -> JsResult<Option<DateTime<Utc>>> {
    let ms = this_ms(interpreter, this)?;
    if ms.is_nan() {
        return Ok(None);
    }
    Ok(DateTime::from_timestamp_millis(ms as i64))
}

fn get_time(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let ms = this_ms(interpreter, this)?;
    Ok(Value::Number(ms))
}

fn set_time(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    this_ms(interpreter, this)?;
    let ms = interpreter.heap.to_number(args.get(0));
    let object = this.as_object().expect("receiver checked by this_ms");
    interpreter.heap[object].payload = Some(ObjectPayload::Date(ms));
    Ok(Value::Number(ms))
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let ms = this_ms(interpreter, this)?;
    let text = format_date(ms);
    Ok(interpreter.heap.string_value(&text))
}

/// ### [15.9.5.43 Date.prototype.toISOString](https://262.ecma-international.org/5.1/#sec-15.9.5.43)
fn to_iso_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let ms = this_ms(interpreter, this)?;
    if ms.is_nan() {
        return Err(
            interpreter.throw_exception(ExceptionType::RangeError, "Invalid time value")
        );
    }
    let text = iso_date(ms);
    Ok(interpreter.heap.string_value(&text))
}

fn to_json(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let ms = this_ms(interpreter, this)?;
    if ms.is_nan() {
        return Ok(Value::Null);
    }
    to_iso_string(interpreter, this, args)
}

fn get_timezone_offset(
    interpreter: &mut Interpreter,
    this: Value,
    _args: &Arguments,
) -> JsResult<Value> {
    this_ms(interpreter, this)?;
    Ok(Value::NUMBER_ZERO)
}

fn component(
    interpreter: &mut Interpreter,
    this: Value,
    read: fn(DateTime<Utc>) -> f64,
) -> JsResult<Value> {
    match this_moment(interpreter, this)? {
        Some(moment) => Ok(Value::Number(read(moment))),
        None => Ok(Value::NAN),
    }
}

fn get_full_year(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| moment.year() as f64)
}

fn get_month(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| moment.month0() as f64)
}

fn get_date(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| moment.day() as f64)
}

fn get_day(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| {
        moment.weekday().num_days_from_sunday() as f64
    })
}

fn get_hours(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| moment.hour() as f64)
}

fn get_minutes(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| moment.minute() as f64)
}

fn get_seconds(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    component(interpreter, this, |moment| moment.second() as f64)
}

fn get_milliseconds(
    interpreter: &mut Interpreter,
    this: Value,
    _args: &Arguments,
) -> JsResult<Value> {
    component(interpreter, this, |moment| {
        moment.timestamp_subsec_millis() as f64
    })
}
