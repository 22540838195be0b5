// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host bridge: the calling conventions of host-provided natives and the
//! deep conversion between host JSON-style values and interpreter values.

use std::cell::Cell;
use std::rc::Rc;

use crate::heap::indexes::ObjectIndex;
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::ObjectPayload;
use crate::value::{JsResult, Value};

/// Argument list of a native call. Out-of-range reads yield `undefined`,
/// matching how the evaluator pads missing arguments.
#[derive(Debug)]
pub struct Arguments<'a>(pub(crate) &'a [Value]);

impl Arguments<'_> {
    #[inline]
    pub fn get(&self, index: usize) -> Value {
        *self.0.get(index).unwrap_or(&Value::Undefined)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.0.iter().copied()
    }
}

/// A synchronous host function. Called with the receiver and arguments;
/// the returned value flows into the calling frame.
pub type NativeFn = fn(&mut Interpreter, Value, &Arguments) -> JsResult<Value>;

/// An asynchronous host function. The interpreter parks itself after the
/// call returns; the host completes the call later through the handle.
pub type AsyncFn = fn(&mut Interpreter, Value, &Arguments, AsyncCompletion);

pub(crate) type AsyncOutcome = Result<Value, Value>;

/// Single-slot completion mailbox shared between the interpreter and one
/// in-flight async native. Writing the outcome clears the paused flag; the
/// awaiting call frame picks the value up at its next step.
#[derive(Debug, Clone)]
pub struct AsyncCompletion {
    pub(crate) mailbox: Rc<Cell<Option<AsyncOutcome>>>,
    pub(crate) paused: Rc<Cell<bool>>,
}

impl AsyncCompletion {
    /// Fulfills the pending native call with `value`.
    pub fn resolve(self, value: Value) {
        self.mailbox.set(Some(Ok(value)));
        self.paused.set(false);
    }

    /// Rejects the pending native call; `error` is thrown at the await
    /// point as an interpreter-level exception.
    pub fn reject(self, error: Value) {
        self.mailbox.set(Some(Err(error)));
        self.paused.set(false);
    }
}

impl Interpreter {
    /// Promotes a host JSON value to an interpreter value: numbers,
    /// strings, booleans and null map to primitives, arrays and objects
    /// are built fresh on the heap.
    pub fn native_to_pseudo(&mut self, native: &serde_json::Value) -> Value {
        match native {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::from_bool(*value),
            serde_json::Value::Number(value) => {
                Value::Number(value.as_f64().unwrap_or(f64::NAN))
            }
            serde_json::Value::String(value) => self.heap.string_value(value),
            serde_json::Value::Array(elements) => {
                let array = self.heap.create_array();
                for element in elements {
                    let value = self.native_to_pseudo(element);
                    self.heap.array_push(array, value);
                }
                Value::Object(array)
            }
            serde_json::Value::Object(entries) => {
                let constructor = self.heap.intrinsics.object;
                let object = self.heap.create_object(Some(constructor));
                for (name, entry) in entries {
                    let value = self.native_to_pseudo(entry);
                    let key = self.heap.intern(name);
                    self.heap[object].insert(key, value);
                }
                Value::Object(object)
            }
        }
    }

    /// Lowers an interpreter value to a host JSON value. `undefined` and
    /// functions become `null` at the top level; inside objects they are
    /// handled by the JSON built-in, which shares [`Self::json_value`].
    pub fn pseudo_to_native(&mut self, value: Value) -> JsResult<serde_json::Value> {
        let mut visited = Vec::new();
        Ok(self
            .json_value(value, &mut visited)?
            .unwrap_or(serde_json::Value::Null))
    }

    /// The JSON view of a value: `None` for the unrepresentable kinds
    /// (`undefined`, functions), which `JSON.stringify` skips in objects
    /// and nulls out in arrays. Cyclic graphs throw `TypeError`.
    pub(crate) fn json_value(
        &mut self,
        value: Value,
        visited: &mut Vec<ObjectIndex>,
    ) -> JsResult<Option<serde_json::Value>> {
        Ok(Some(match value {
            Value::Undefined => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Boolean(value) => serde_json::Value::Bool(value),
            Value::Number(value) => number_to_json(value),
            Value::String(index) => serde_json::Value::String(self.heap[index].to_string()),
            Value::Object(object) => {
                if self.heap[object].is_function() {
                    return Ok(None);
                }
                if visited.contains(&object) {
                    return Err(self.throw_exception(
                        ExceptionType::TypeError,
                        "Converting circular structure to JSON",
                    ));
                }
                match &self.heap[object].payload {
                    Some(ObjectPayload::Number(n)) => return Ok(Some(number_to_json(*n))),
                    Some(ObjectPayload::Boolean(b)) => {
                        return Ok(Some(serde_json::Value::Bool(*b)));
                    }
                    Some(ObjectPayload::String(s)) => {
                        return Ok(Some(serde_json::Value::String(
                            self.heap[*s].to_string(),
                        )));
                    }
                    Some(ObjectPayload::Date(ms)) => {
                        return Ok(Some(serde_json::Value::String(iso_date(*ms))));
                    }
                    Some(ObjectPayload::RegExp(_)) | None => {}
                }
                visited.push(object);
                let result = if let Some(length) = self.heap[object].length {
                    let mut elements = Vec::with_capacity(length as usize);
                    for i in 0..length {
                        let element = self.heap.element(object, i).unwrap_or(Value::Undefined);
                        elements.push(
                            self.json_value(element, visited)?
                                .unwrap_or(serde_json::Value::Null),
                        );
                    }
                    serde_json::Value::Array(elements)
                } else {
                    let mut entries = serde_json::Map::new();
                    for key in self.own_enumerable_keys(object) {
                        let Some(entry) = self.heap[object].properties.get(&key).copied()
                        else {
                            continue;
                        };
                        if let Some(entry) = self.json_value(entry, visited)? {
                            entries.insert(self.heap[key].to_string(), entry);
                        }
                    }
                    serde_json::Value::Object(entries)
                };
                visited.pop();
                result
            }
        }))
    }
}

fn number_to_json(value: f64) -> serde_json::Value {
    match serde_json::Number::from_f64(value) {
        Some(number) => serde_json::Value::Number(number),
        // NaN and the infinities serialize as null, like JSON.stringify.
        None => serde_json::Value::Null,
    }
}

/// ISO-8601 rendering used by `Date.prototype.toISOString` and `toJSON`.
pub(crate) fn iso_date(ms: f64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms as i64) {
        Some(moment) => moment.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => "Invalid Date".to_string(),
    }
}
