// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod indexes;

use std::ops::{Index, IndexMut};

use ahash::AHashMap;

use crate::object::{FunctionData, ObjectHeapData, ObjectPayload, ScopeData};
use crate::value::{self, Value};

use self::indexes::{ObjectIndex, StringIndex};

/// Handles to the built-in constructors and namespace objects. The shell
/// objects are allocated at heap construction in the install order the
/// built-ins require; `builtins::install` populates them afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Intrinsics {
    pub function: ObjectIndex,
    pub object: ObjectIndex,
    pub array: ObjectIndex,
    pub number: ObjectIndex,
    pub string: ObjectIndex,
    pub boolean: ObjectIndex,
    pub date: ObjectIndex,
    pub math: ObjectIndex,
    pub regexp: ObjectIndex,
    pub json: ObjectIndex,
    pub error: ObjectIndex,
    pub eval_error: ObjectIndex,
    pub range_error: ObjectIndex,
    pub reference_error: ObjectIndex,
    pub syntax_error: ObjectIndex,
    pub type_error: ObjectIndex,
    pub uri_error: ObjectIndex,
}

impl Intrinsics {
    pub fn error_constructors(&self) -> [ObjectIndex; 7] {
        [
            self.error,
            self.eval_error,
            self.range_error,
            self.reference_error,
            self.syntax_error,
            self.type_error,
            self.uri_error,
        ]
    }
}

#[derive(Debug)]
pub struct Heap {
    pub objects: Vec<Option<ObjectHeapData>>,
    strings: Vec<String>,
    string_lookup: AHashMap<String, StringIndex>,
    pub intrinsics: Intrinsics,
    pub global_scope: ObjectIndex,
    rng_state: u64,
}

impl Heap {
    pub fn new() -> Heap {
        let mut objects: Vec<Option<ObjectHeapData>> = Vec::with_capacity(256);
        let mut alloc = |data: ObjectHeapData| -> ObjectIndex {
            objects.push(Some(data));
            ObjectIndex::last_slot(&objects)
        };

        // Install order of the built-ins: Function first so every other
        // constructor can claim it as its parent, then Object so the global
        // scope can claim that.
        let function = alloc(ObjectHeapData::function(None, FunctionData::default()));
        let object = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let array = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let number = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let string = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let boolean = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let date = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let math = alloc(ObjectHeapData::ordinary(Some(object)));
        let regexp = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let json = alloc(ObjectHeapData::ordinary(Some(object)));
        let error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let eval_error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let range_error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let reference_error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let syntax_error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let type_error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));
        let uri_error = alloc(ObjectHeapData::function(
            Some(function),
            FunctionData::default(),
        ));

        // The global scope is itself an object; its parent constructor is
        // OBJECT, patched here because OBJECT now exists.
        let global_scope = alloc(ObjectHeapData::scope(
            Some(object),
            ScopeData {
                parent_scope: None,
                strict: false,
                with_target: None,
            },
        ));

        // The Function constructor is its own parent.
        objects[function.into_index()]
            .as_mut()
            .unwrap()
            .parent = Some(function);

        let mut heap = Heap {
            objects,
            strings: Vec::with_capacity(256),
            string_lookup: AHashMap::with_capacity(256),
            intrinsics: Intrinsics {
                function,
                object,
                array,
                number,
                string,
                boolean,
                date,
                math,
                regexp,
                json,
                error,
                eval_error,
                range_error,
                reference_error,
                syntax_error,
                type_error,
                uri_error,
            },
            global_scope,
            rng_state: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0x9E37_79B9_7F4A_7C15, |d| d.as_nanos() as u64)
                | 1,
        };
        // Intern the empty string first; Value::EMPTY_STRING relies on its
        // index being zero.
        let empty = heap.intern("");
        debug_assert_eq!(empty.into_index(), 0);
        heap
    }

    /// xorshift64* draw in `[0, 1)` for `Math.random`.
    pub(crate) fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    pub fn alloc(&mut self, data: ObjectHeapData) -> ObjectIndex {
        self.objects.push(Some(data));
        ObjectIndex::last_slot(&self.objects)
    }

    /// Interns `text`, returning the index shared by every equal string.
    pub fn intern(&mut self, text: &str) -> StringIndex {
        if let Some(index) = self.string_lookup.get(text) {
            return *index;
        }
        self.strings.push(text.to_string());
        let index = StringIndex::last(&self.strings);
        self.string_lookup.insert(text.to_string(), index);
        index
    }

    /// Looks up an already-interned string without allocating. Used by
    /// read-only paths: a string that was never interned was never stored
    /// as a key or value either.
    pub fn lookup_interned(&self, text: &str) -> Option<StringIndex> {
        self.string_lookup.get(text).copied()
    }

    pub fn string_value(&mut self, text: &str) -> Value {
        Value::String(self.intern(text))
    }

    // Creation helpers.

    pub fn create_object(&mut self, constructor: Option<ObjectIndex>) -> ObjectIndex {
        self.alloc(ObjectHeapData::ordinary(constructor))
    }

    pub fn create_array(&mut self) -> ObjectIndex {
        let array = self.intrinsics.array;
        self.alloc(ObjectHeapData::array(array))
    }

    /// Appends `value` at the end of an array, bumping `length`.
    pub fn array_push(&mut self, array: ObjectIndex, value: Value) {
        let length = self[array].length.expect("array_push on non-array");
        let key = self.intern(&length.to_string());
        let data = &mut self[array];
        data.insert(key, value);
        data.length = Some(length + 1);
    }

    /// Raw indexed read used by joins and natives; accessors are not
    /// dispatched on this path. A key that was never interned was never
    /// stored either.
    pub fn element(&self, object: ObjectIndex, index: u32) -> Option<Value> {
        let key = self.lookup_interned(&index.to_string())?;
        self[object].properties.get(&key).copied()
    }

    // Type tagging and conversions that never run user code.

    /// ### [11.4.3 The typeof Operator](https://262.ecma-international.org/5.1/#sec-11.4.3)
    pub fn type_of(&self, value: Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(index) => {
                if self[index].is_function() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// ### [9.2 ToBoolean](https://262.ecma-international.org/5.1/#sec-9.2)
    pub fn to_boolean(&self, value: Value) -> bool {
        match value {
            Value::Undefined | Value::Null => false,
            Value::Boolean(value) => value,
            Value::Number(value) => value != 0.0 && !value.is_nan(),
            Value::String(index) => !self[index].is_empty(),
            Value::Object(_) => true,
        }
    }

    /// ### [9.3 ToNumber](https://262.ecma-international.org/5.1/#sec-9.3)
    pub fn to_number(&self, value: Value) -> f64 {
        match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(value) => {
                if value {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(value) => value,
            Value::String(index) => value::string_to_number(&self[index]),
            Value::Object(index) => match &self[index].payload {
                Some(ObjectPayload::Number(value)) => *value,
                Some(ObjectPayload::Boolean(value)) => {
                    if *value {
                        1.0
                    } else {
                        0.0
                    }
                }
                Some(ObjectPayload::String(text)) => value::string_to_number(&self[*text]),
                Some(ObjectPayload::Date(ms)) => *ms,
                _ => value::string_to_number(&self.to_string(value)),
            },
        }
    }

    /// ### [9.8 ToString](https://262.ecma-international.org/5.1/#sec-9.8)
    ///
    /// Conversions never call back into user code: payload-less objects
    /// print their type tag, arrays join their elements.
    pub fn to_string(&self, value: Value) -> String {
        self.to_string_bounded(value, 0)
    }

    fn to_string_bounded(&self, value: Value, depth: u32) -> String {
        match value {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(value) => value.to_string(),
            Value::Number(value) => value::number_to_string(value),
            Value::String(index) => self[index].to_string(),
            Value::Object(index) => self.object_to_string(index, depth),
        }
    }

    fn object_to_string(&self, object: ObjectIndex, depth: u32) -> String {
        let data = &self[object];
        match &data.payload {
            Some(ObjectPayload::Number(value)) => return value::number_to_string(*value),
            Some(ObjectPayload::Boolean(value)) => return value.to_string(),
            Some(ObjectPayload::String(text)) => return self[*text].to_string(),
            Some(ObjectPayload::Date(ms)) => return format_date(*ms),
            Some(ObjectPayload::RegExp(regex)) => {
                let flags = regex.flags;
                return format!(
                    "/{}/{}{}{}",
                    &self[regex.source],
                    if flags.global { "g" } else { "" },
                    if flags.ignore_case { "i" } else { "" },
                    if flags.multiline { "m" } else { "" }
                );
            }
            None => {}
        }
        if let Some(length) = data.length {
            // Cyclic arrays bottom out as the empty string rather than
            // overflowing the stack.
            if depth > 16 {
                return String::new();
            }
            let mut parts = Vec::with_capacity(length as usize);
            for i in 0..length {
                let element = self.element(object, i).unwrap_or(Value::Undefined);
                parts.push(if element.is_nullish() {
                    String::new()
                } else {
                    self.to_string_bounded(element, depth + 1)
                });
            }
            return parts.join(",");
        }
        if data.is_function() {
            "[function]".to_string()
        } else {
            "[object]".to_string()
        }
    }

    pub fn to_string_value(&mut self, value: Value) -> StringIndex {
        if let Value::String(index) = value {
            return index;
        }
        let text = self.to_string(value);
        self.intern(&text)
    }

    /// ### [8.12.8 \[\[DefaultValue\]\]](https://262.ecma-international.org/5.1/#sec-8.12.8)
    ///
    /// Wrapper payloads unwrap; anything else falls back to its string
    /// form.
    pub fn to_primitive(&mut self, value: Value) -> Value {
        match self.value_of(value) {
            Value::Object(index) => {
                let text = self.object_to_string(index, 0);
                self.string_value(&text)
            }
            primitive => primitive,
        }
    }

    pub fn value_of(&self, value: Value) -> Value {
        let Value::Object(index) = value else {
            return value;
        };
        match &self[index].payload {
            Some(ObjectPayload::Number(n)) => Value::Number(*n),
            Some(ObjectPayload::Boolean(b)) => Value::from_bool(*b),
            Some(ObjectPayload::String(s)) => Value::String(*s),
            Some(ObjectPayload::Date(ms)) => Value::Number(*ms),
            _ => value,
        }
    }

    /// ### [11.9.6 The Strict Equality Comparison Algorithm](https://262.ecma-international.org/5.1/#sec-11.9.6)
    pub fn strictly_equal(&self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            // Interning makes string equality an index comparison.
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }

    /// ### [11.9.3 The Abstract Equality Comparison Algorithm](https://262.ecma-international.org/5.1/#sec-11.9.3)
    pub fn loosely_equal(&mut self, a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Number(_), Value::String(_)) => {
                self.to_number(a) == self.to_number(b)
            }
            (Value::String(_), Value::Number(_)) => {
                self.to_number(a) == self.to_number(b)
            }
            (Value::Boolean(_), _) => {
                let a = Value::Number(self.to_number(a));
                self.loosely_equal(a, b)
            }
            (_, Value::Boolean(_)) => {
                let b = Value::Number(self.to_number(b));
                self.loosely_equal(a, b)
            }
            (Value::Object(_), Value::Number(_) | Value::String(_)) => {
                let a = self.to_primitive(a);
                self.loosely_equal(a, b)
            }
            (Value::Number(_) | Value::String(_), Value::Object(_)) => {
                let b = self.to_primitive(b);
                self.loosely_equal(a, b)
            }
            _ => self.strictly_equal(a, b),
        }
    }

    /// ### [11.8.5 The Abstract Relational Comparison Algorithm](https://262.ecma-international.org/5.1/#sec-11.8.5)
    ///
    /// `None` when either side converts to `NaN`.
    pub fn compare(&mut self, a: Value, b: Value) -> Option<std::cmp::Ordering> {
        let a = self.to_primitive(a);
        let b = self.to_primitive(b);
        if let (Value::String(a), Value::String(b)) = (a, b) {
            return Some(self[a].cmp(&self[b]));
        }
        let a = self.to_number(a);
        let b = self.to_number(b);
        a.partial_cmp(&b)
    }

    // Structural helpers.

    /// Resolves the prototype object heading `value`'s chain. `parent`
    /// points at the constructor, not the prototype, so the prototype is
    /// one further indirection through its `prototype` property.
    pub fn prototype_of(&self, value: Value) -> Option<ObjectIndex> {
        let constructor = match value {
            Value::Number(_) => self.intrinsics.number,
            Value::String(_) => self.intrinsics.string,
            Value::Boolean(_) => self.intrinsics.boolean,
            Value::Object(index) => self[index].parent?,
            Value::Undefined | Value::Null => return None,
        };
        self.prototype_property(constructor)
    }

    /// Reads a constructor's `prototype` property.
    pub fn prototype_property(&self, constructor: ObjectIndex) -> Option<ObjectIndex> {
        let key = self.lookup_interned("prototype")?;
        match self[constructor].properties.get(&key) {
            Some(Value::Object(prototype)) => Some(*prototype),
            _ => None,
        }
    }

    /// String character magic: `"abc".length` and `"abc"[1]`.
    pub fn string_payload(&self, value: Value) -> Option<StringIndex> {
        match value {
            Value::String(index) => Some(index),
            Value::Object(object) => match self[object].payload {
                Some(ObjectPayload::String(index)) => Some(index),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<ObjectIndex> for Heap {
    type Output = ObjectHeapData;

    fn index(&self, index: ObjectIndex) -> &Self::Output {
        self.objects
            .get(index.into_index())
            .expect("ObjectIndex out of bounds")
            .as_ref()
            .expect("ObjectIndex slot empty")
    }
}

impl IndexMut<ObjectIndex> for Heap {
    fn index_mut(&mut self, index: ObjectIndex) -> &mut Self::Output {
        self.objects
            .get_mut(index.into_index())
            .expect("ObjectIndex out of bounds")
            .as_mut()
            .expect("ObjectIndex slot empty")
    }
}

impl Index<StringIndex> for Heap {
    type Output = str;

    fn index(&self, index: StringIndex) -> &Self::Output {
        self.strings
            .get(index.into_index())
            .expect("StringIndex out of bounds")
    }
}

/// Date-to-text delegation; the epoch-milliseconds payload renders through
/// the host date library.
pub fn format_date(ms: f64) -> String {
    if ms.is_nan() {
        return "Invalid Date".to_string();
    }
    match chrono::DateTime::from_timestamp_millis(ms as i64) {
        Some(moment) => moment.format("%a %b %d %Y %H:%M:%S GMT+0000").to_string(),
        None => "Invalid Date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut heap = Heap::new();
        let a = heap.intern("fortune");
        let b = heap.intern("fortune");
        assert_eq!(a, b);
        assert_eq!(&heap[a], "fortune");
        assert_eq!(heap.intern(""), StringIndex::from_index(0));
    }

    #[test]
    fn singleton_conversions() {
        let mut heap = Heap::new();
        assert!(!heap.to_boolean(Value::EMPTY_STRING));
        assert!(!heap.to_boolean(Value::NAN));
        assert!(heap.to_boolean(Value::NUMBER_ONE));
        assert_eq!(heap.to_string(Value::Undefined), "undefined");
        assert_eq!(heap.to_number(Value::Null), 0.0);
        let text = heap.string_value("3.5");
        assert_eq!(heap.to_number(text), 3.5);
    }

    #[test]
    fn loose_equality_poisons_nan() {
        let mut heap = Heap::new();
        assert!(!heap.loosely_equal(Value::NAN, Value::NAN));
        assert!(heap.loosely_equal(Value::Null, Value::Undefined));
        let one_text = heap.string_value("1");
        assert!(heap.loosely_equal(Value::NUMBER_ONE, one_text));
    }
}
