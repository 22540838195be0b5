// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heap representation of objects: the per-object property store with its
//! per-key flag sets and accessor slots, plus the extra data carried by
//! functions, wrapper objects, and scopes.

use ahash::{AHashMap, AHashSet};

use crate::ast::RegExpFlags;
use crate::bridge::{AsyncFn, NativeFn};
use crate::heap::indexes::{NodeId, ObjectIndex, StringIndex};
use crate::value::Value;

/// Raw payload of wrapper objects (`new Number(3)`), dates (milliseconds
/// since the epoch), and regexes.
#[derive(Debug, Clone)]
pub enum ObjectPayload {
    Number(f64),
    String(StringIndex),
    Boolean(bool),
    Date(f64),
    RegExp(RegExpData),
}

#[derive(Debug, Clone)]
pub struct RegExpData {
    pub source: StringIndex,
    pub flags: RegExpFlags,
    /// `None` when the pattern does not translate to the host engine; any
    /// match attempt then throws a `SyntaxError`.
    pub compiled: Option<regex::Regex>,
}

/// Built-ins the call machinery rewrites in place instead of invoking:
/// `eval` spawns a nested machine, `apply`/`call` redirect the frame to
/// their receiver with a reshaped argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Eval,
    Apply,
    Call,
}

/// Execution body and call-related slots of a function object. The fields
/// are parallel options: exactly one of `node`, `native`, `asynchronous`,
/// `special` is set for a callable body, `bound_target` for bound
/// functions.
#[derive(Default)]
pub struct FunctionData {
    pub node: Option<NodeId>,
    pub parent_scope: Option<ObjectIndex>,
    pub native: Option<NativeFn>,
    pub asynchronous: Option<AsyncFn>,
    pub bound_target: Option<ObjectIndex>,
    pub bound_this: Option<Value>,
    pub bound_args: Vec<Value>,
    pub special: Option<SpecialForm>,
    pub strict: bool,
}

impl std::fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionData")
            .field("node", &self.node)
            .field("parent_scope", &self.parent_scope)
            .field("native", &self.native.is_some())
            .field("asynchronous", &self.asynchronous.is_some())
            .field("bound_target", &self.bound_target)
            .field("special", &self.special)
            .field("strict", &self.strict)
            .finish()
    }
}

/// Scope-chain link carried by objects used as scopes. The global scope,
/// function-call scopes, and the special `with`/`catch` scopes all share
/// this shape: an ordinary object with a parent link and a strict flag.
/// A `with` scope additionally names the target object whose properties
/// it exposes as bindings.
#[derive(Debug, Clone, Copy)]
pub struct ScopeData {
    pub parent_scope: Option<ObjectIndex>,
    pub strict: bool,
    pub with_target: Option<ObjectIndex>,
}

#[derive(Debug, Default)]
pub struct ObjectHeapData {
    /// The constructor whose `prototype` property heads this object's
    /// prototype chain. `None` terminates the chain (`Object.prototype`).
    pub parent: Option<ObjectIndex>,
    pub payload: Option<ObjectPayload>,
    pub properties: AHashMap<StringIndex, Value>,
    /// Own keys in insertion order; integer keys are additionally sorted
    /// numerically at enumeration time.
    pub key_order: Vec<StringIndex>,
    pub not_configurable: AHashSet<StringIndex>,
    pub not_enumerable: AHashSet<StringIndex>,
    pub not_writable: AHashSet<StringIndex>,
    pub getter: AHashMap<StringIndex, ObjectIndex>,
    pub setter: AHashMap<StringIndex, ObjectIndex>,
    pub prevent_extensions: bool,
    /// `Some` for arrays.
    pub length: Option<u32>,
    pub function: Option<Box<FunctionData>>,
    pub scope: Option<ScopeData>,
}

impl ObjectHeapData {
    pub fn ordinary(parent: Option<ObjectIndex>) -> Self {
        Self {
            parent,
            ..Default::default()
        }
    }

    pub fn array(parent: ObjectIndex) -> Self {
        Self {
            parent: Some(parent),
            length: Some(0),
            ..Default::default()
        }
    }

    pub fn function(parent: Option<ObjectIndex>, data: FunctionData) -> Self {
        Self {
            parent,
            function: Some(Box::new(data)),
            ..Default::default()
        }
    }

    pub fn scope(parent: Option<ObjectIndex>, data: ScopeData) -> Self {
        Self {
            parent,
            scope: Some(data),
            ..Default::default()
        }
    }

    pub fn is_function(&self) -> bool {
        self.function.is_some()
    }

    pub fn is_array(&self) -> bool {
        self.length.is_some()
    }

    /// Whether `key` exists as an own property (data or accessor).
    pub fn has_own(&self, key: StringIndex) -> bool {
        self.properties.contains_key(&key)
            || self.getter.contains_key(&key)
            || self.setter.contains_key(&key)
    }

    /// Inserts or overwrites a plain data property, keeping insertion
    /// order. Flag sets are not touched.
    pub fn insert(&mut self, key: StringIndex, value: Value) {
        if !self.has_own(key) {
            self.key_order.push(key);
        }
        self.properties.insert(key, value);
    }

    /// Removes every trace of an own property.
    pub fn remove(&mut self, key: StringIndex) {
        self.properties.remove(&key);
        self.getter.remove(&key);
        self.setter.remove(&key);
        self.not_configurable.remove(&key);
        self.not_enumerable.remove(&key);
        self.not_writable.remove(&key);
        self.key_order.retain(|k| *k != key);
    }
}

/// Result of a prototype-chain property lookup. A getter is reported back
/// to the evaluator, which dispatches it through a synthesized call frame;
/// non-evaluator callers see the parked `undefined` data slot instead.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    Data(Value),
    Getter(ObjectIndex),
    Missing,
}

/// Descriptor argument of a define-property operation. `None` fields keep
/// the define-time defaults (all three flags set).
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
    pub getter: Option<Value>,
    pub setter: Option<Value>,
}

impl PropertyDescriptor {
    /// The descriptor used for built-in methods and other non-enumerable
    /// but otherwise ordinary properties.
    pub fn non_enumerable() -> Self {
        Self {
            writable: Some(true),
            enumerable: Some(false),
            configurable: Some(true),
            ..Default::default()
        }
    }

    /// Fully locked-down: the descriptor of `Infinity`, `NaN`, `undefined`.
    pub fn frozen() -> Self {
        Self {
            writable: Some(false),
            enumerable: Some(false),
            configurable: Some(false),
            ..Default::default()
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.getter.is_some() || self.setter.is_some()
    }
}

use crate::interpreter::{ExceptionType, Interpreter};
use crate::value::{array_index, to_uint32, JsResult};

/// Prototype chains are short in practice; a walk longer than this means
/// a cycle built through constructor surgery.
const MAX_PROTOTYPE_DEPTH: u32 = 512;

impl Interpreter {
    /// ### [8.12.3 \[\[Get\]\] (P)](https://262.ecma-international.org/5.1/#sec-8.12.3)
    ///
    /// Own lookup, then the prototype chain reached through the
    /// constructor's `prototype` property. String and array length/index
    /// magic resolves before the chain.
    pub(crate) fn get_lookup(&mut self, base: Value, key: StringIndex) -> Lookup {
        if let Some(text) = self.heap.string_payload(base) {
            if &self.heap[key] == "length" {
                let length = self.heap[text].chars().count();
                return Lookup::Data(Value::Number(length as f64));
            }
            if let Some(index) = array_index(&self.heap[key]) {
                let character = self.heap[text].chars().nth(index as usize);
                if let Some(character) = character {
                    let value = self.heap.string_value(&character.to_string());
                    return Lookup::Data(value);
                }
                return Lookup::Missing;
            }
        }
        if let Value::Object(object) = base {
            if let Some(length) = self.heap[object].length {
                if &self.heap[key] == "length" {
                    return Lookup::Data(Value::Number(length as f64));
                }
            }
        }
        self.lookup_property(base, key)
    }

    /// The chain walk without the mutating magic; usable from `&self`
    /// paths (scope lookups through `with` targets).
    pub(crate) fn lookup_property(&self, base: Value, key: StringIndex) -> Lookup {
        let mut current = match base {
            Value::Object(object) => Some(object),
            Value::Undefined | Value::Null => return Lookup::Missing,
            _ => self.heap.prototype_of(base),
        };
        for _ in 0..MAX_PROTOTYPE_DEPTH {
            let Some(object) = current else {
                return Lookup::Missing;
            };
            let data = &self.heap[object];
            if let Some(getter) = data.getter.get(&key) {
                return Lookup::Getter(*getter);
            }
            if let Some(value) = data.properties.get(&key) {
                return Lookup::Data(*value);
            }
            current = self.heap.prototype_of(Value::Object(object));
        }
        Lookup::Missing
    }

    /// ### [8.12.6 \[\[HasProperty\]\] (P)](https://262.ecma-international.org/5.1/#sec-8.12.6)
    pub(crate) fn has_property(&self, base: Value, key: StringIndex) -> bool {
        if let Some(text) = self.heap.string_payload(base) {
            if &self.heap[key] == "length" {
                return true;
            }
            if let Some(index) = array_index(&self.heap[key]) {
                if (index as usize) < self.heap[text].chars().count() {
                    return true;
                }
            }
        }
        if let Value::Object(object) = base {
            if self.heap[object].length.is_some() && &self.heap[key] == "length" {
                return true;
            }
        }
        !matches!(self.lookup_property(base, key), Lookup::Missing)
    }

    /// ### [8.12.5 \[\[Put\]\] (P, V)](https://262.ecma-international.org/5.1/#sec-8.12.5)
    ///
    /// Ordinary assignment. Returns a setter (and its receiver) found on
    /// the chain for the evaluator to dispatch. Assignments to string
    /// indices and primitives are silently ignored.
    pub(crate) fn assign_property(
        &mut self,
        base: Value,
        key: StringIndex,
        value: Value,
    ) -> JsResult<Option<(ObjectIndex, Value)>> {
        let Value::Object(object) = base else {
            return Ok(None);
        };
        if let Some(ObjectPayload::String(_)) = self.heap[object].payload {
            if &self.heap[key] == "length" || array_index(&self.heap[key]).is_some() {
                return Ok(None);
            }
        }
        if self.heap[object].length.is_some() && &self.heap[key] == "length" {
            let requested = self.heap.to_number(value);
            let new_length = to_uint32(requested);
            if f64::from(new_length) != requested {
                return Err(
                    self.throw_exception(ExceptionType::RangeError, "Invalid array length")
                );
            }
            self.set_array_length(object, new_length);
            return Ok(None);
        }
        // Accessor search walks the chain; data properties on prototypes
        // never block an own write.
        let mut current = Some(object);
        for _ in 0..MAX_PROTOTYPE_DEPTH {
            let Some(link) = current else {
                break;
            };
            let data = &self.heap[link];
            if let Some(setter) = data.setter.get(&key) {
                return Ok(Some((*setter, base)));
            }
            if data.getter.contains_key(&key) {
                let name = self.heap[key].to_string();
                return Err(self.throw_exception(
                    ExceptionType::TypeError,
                    &format!("Cannot set property '{name}' which has only a getter"),
                ));
            }
            if data.has_own(key) {
                break;
            }
            current = self.heap.prototype_of(Value::Object(link));
        }
        let data = &self.heap[object];
        if data.not_writable.contains(&key) {
            return Ok(None);
        }
        if data.prevent_extensions && !data.has_own(key) {
            return Ok(None);
        }
        self.heap[object].insert(key, value);
        if let Some(length) = self.heap[object].length {
            if let Some(index) = array_index(&self.heap[key]) {
                if index >= length {
                    self.heap[object].length = Some(index + 1);
                }
            }
        }
        Ok(None)
    }

    /// Lowering `length` deletes every integer-named own property at or
    /// beyond the new bound.
    pub(crate) fn set_array_length(&mut self, object: ObjectIndex, new_length: u32) {
        let doomed: Vec<StringIndex> = self.heap[object]
            .key_order
            .iter()
            .copied()
            .filter(|key| {
                array_index(&self.heap[*key]).is_some_and(|index| index >= new_length)
            })
            .collect();
        for key in doomed {
            self.heap[object].remove(key);
        }
        self.heap[object].length = Some(new_length);
    }

    /// ### [8.12.9 \[\[DefineOwnProperty\]\] (P, Desc, Throw)](https://262.ecma-international.org/5.1/#sec-8.12.9)
    ///
    /// Define-time defaults set all three restriction flags; accessor
    /// descriptors park the data slot at `undefined` and clear
    /// `notWritable`.
    pub(crate) fn define_property(
        &mut self,
        object: ObjectIndex,
        key: StringIndex,
        descriptor: PropertyDescriptor,
    ) -> JsResult<()> {
        let data = &self.heap[object];
        let existed = data.has_own(key);
        if existed && data.not_configurable.contains(&key) {
            let name = self.heap[key].to_string();
            return Err(self.throw_exception(
                ExceptionType::TypeError,
                &format!("Cannot redefine property: {name}"),
            ));
        }
        if !existed && data.prevent_extensions {
            let name = self.heap[key].to_string();
            return Err(self.throw_exception(
                ExceptionType::TypeError,
                &format!("Cannot define property {name}, object is not extensible"),
            ));
        }
        if descriptor.is_accessor() {
            let getter = descriptor.getter.and_then(|g| g.as_object());
            let setter = descriptor.setter.and_then(|s| s.as_object());
            let data = &mut self.heap[object];
            if !data.has_own(key) {
                data.key_order.push(key);
            }
            data.properties.insert(key, Value::Undefined);
            if let Some(getter) = getter {
                data.getter.insert(key, getter);
            } else {
                data.getter.remove(&key);
            }
            if let Some(setter) = setter {
                data.setter.insert(key, setter);
            } else {
                data.setter.remove(&key);
            }
            data.not_writable.remove(&key);
        } else {
            let previous = self.heap[object].properties.get(&key).copied();
            let value = descriptor
                .value
                .or(previous)
                .unwrap_or(Value::Undefined);
            let data = &mut self.heap[object];
            data.getter.remove(&key);
            data.setter.remove(&key);
            data.insert(key, value);
            set_flag(
                &mut self.heap[object].not_writable,
                key,
                !descriptor.writable.unwrap_or(false),
            );
        }
        set_flag(
            &mut self.heap[object].not_enumerable,
            key,
            !descriptor.enumerable.unwrap_or(false),
        );
        set_flag(
            &mut self.heap[object].not_configurable,
            key,
            !descriptor.configurable.unwrap_or(false),
        );
        if let Some(length) = self.heap[object].length {
            if let Some(index) = array_index(&self.heap[key]) {
                if index >= length {
                    self.heap[object].length = Some(index + 1);
                }
            }
        }
        Ok(())
    }

    /// ### [8.12.7 \[\[Delete\]\] (P, Throw)](https://262.ecma-international.org/5.1/#sec-8.12.7)
    pub(crate) fn delete_property(
        &mut self,
        base: Value,
        key: StringIndex,
        strict: bool,
    ) -> JsResult<bool> {
        let Value::Object(object) = base else {
            return Ok(true);
        };
        if !self.heap[object].has_own(key) {
            return Ok(true);
        }
        if self.heap[object].not_configurable.contains(&key) {
            if strict {
                let name = self.heap[key].to_string();
                return Err(self.throw_exception(
                    ExceptionType::TypeError,
                    &format!("Cannot delete property '{name}'"),
                ));
            }
            return Ok(false);
        }
        self.heap[object].remove(key);
        Ok(true)
    }

    /// Own enumerable keys: integer keys in ascending order first, then
    /// the rest in insertion order.
    pub(crate) fn own_enumerable_keys(&self, object: ObjectIndex) -> Vec<StringIndex> {
        self.own_keys(object, true)
    }

    pub(crate) fn own_keys(&self, object: ObjectIndex, enumerable_only: bool) -> Vec<StringIndex> {
        let data = &self.heap[object];
        let mut integers: Vec<(u32, StringIndex)> = Vec::new();
        let mut rest: Vec<StringIndex> = Vec::new();
        for key in &data.key_order {
            if enumerable_only && data.not_enumerable.contains(key) {
                continue;
            }
            match array_index(&self.heap[*key]) {
                Some(index) => integers.push((index, *key)),
                None => rest.push(*key),
            }
        }
        integers.sort_by_key(|(index, _)| *index);
        integers
            .into_iter()
            .map(|(_, key)| key)
            .chain(rest)
            .collect()
    }

    // Host-facing surface.

    /// Reads a property as data; accessors yield their parked `undefined`
    /// slot on this path.
    pub fn get_property(&mut self, object: Value, name: &str) -> Value {
        let key = self.heap.intern(name);
        match self.get_lookup(object, key) {
            Lookup::Data(value) => value,
            Lookup::Getter(_) | Lookup::Missing => Value::Undefined,
        }
    }

    /// With no descriptor this is an ordinary assignment (prototype
    /// setters are not dispatched on the host path); with one it is a
    /// define-property operation.
    pub fn set_property(
        &mut self,
        object: Value,
        name: &str,
        value: Value,
        descriptor: Option<PropertyDescriptor>,
    ) -> JsResult<()> {
        let key = self.heap.intern(name);
        match descriptor {
            Some(mut descriptor) => {
                let Value::Object(object) = object else {
                    return Err(self.throw_exception(
                        ExceptionType::TypeError,
                        "Cannot define property on a primitive",
                    ));
                };
                if !descriptor.is_accessor() {
                    descriptor.value = descriptor.value.or(Some(value));
                }
                self.define_property(object, key, descriptor)
            }
            None => {
                self.assign_property(object, key, value)?;
                Ok(())
            }
        }
    }
}

fn set_flag(set: &mut AHashSet<StringIndex>, key: StringIndex, on: bool) {
    if on {
        set.insert(key);
    } else {
        set.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Interpreter {
        Interpreter::new("").expect("empty program boots")
    }

    #[test]
    fn define_defaults_lock_the_property() {
        let mut interpreter = sandbox();
        let constructor = interpreter.heap.intrinsics.object;
        let object = interpreter.heap.create_object(Some(constructor));
        let key = interpreter.heap.intern("locked");
        interpreter
            .define_property(
                object,
                key,
                PropertyDescriptor {
                    value: Some(Value::NUMBER_ONE),
                    ..Default::default()
                },
            )
            .expect("first definition succeeds");
        let data = &interpreter.heap[object];
        assert!(data.not_writable.contains(&key));
        assert!(data.not_enumerable.contains(&key));
        assert!(data.not_configurable.contains(&key));
        // A second definition of a non-configurable property throws.
        assert!(interpreter
            .define_property(object, key, PropertyDescriptor::default())
            .is_err());
    }

    #[test]
    fn plain_assignment_leaves_flags_clear() {
        let mut interpreter = sandbox();
        let constructor = interpreter.heap.intrinsics.object;
        let object = interpreter.heap.create_object(Some(constructor));
        let key = interpreter.heap.intern("open");
        interpreter
            .assign_property(Value::Object(object), key, Value::TRUE)
            .expect("plain assignment");
        let data = &interpreter.heap[object];
        assert!(!data.not_writable.contains(&key));
        assert!(!data.not_enumerable.contains(&key));
        assert!(!data.not_configurable.contains(&key));
    }

    #[test]
    fn accessor_definitions_park_the_data_slot() {
        let mut interpreter = sandbox();
        let constructor = interpreter.heap.intrinsics.object;
        let object = interpreter.heap.create_object(Some(constructor));
        let getter = interpreter.create_native_function(|_, _, _| Ok(Value::NUMBER_ONE));
        let key = interpreter.heap.intern("x");
        interpreter
            .define_property(
                object,
                key,
                PropertyDescriptor {
                    getter: Some(getter),
                    configurable: Some(true),
                    ..Default::default()
                },
            )
            .expect("accessor definition");
        let data = &interpreter.heap[object];
        assert!(matches!(
            data.properties.get(&key),
            Some(Value::Undefined)
        ));
        assert!(data.getter.contains_key(&key));
        assert!(!data.not_writable.contains(&key));
    }

    #[test]
    fn array_length_magic() {
        let mut interpreter = sandbox();
        let array = interpreter.heap.create_array();
        let key = interpreter.heap.intern("5");
        interpreter
            .assign_property(Value::Object(array), key, Value::TRUE)
            .expect("index write");
        assert_eq!(interpreter.heap[array].length, Some(6));
        interpreter.set_array_length(array, 2);
        assert_eq!(interpreter.heap[array].length, Some(2));
        assert!(!interpreter.heap[array].has_own(key));
    }

    #[test]
    fn enumeration_orders_integer_keys_first() {
        let mut interpreter = sandbox();
        let constructor = interpreter.heap.intrinsics.object;
        let object = interpreter.heap.create_object(Some(constructor));
        for name in ["z", "10", "a", "2"] {
            let key = interpreter.heap.intern(name);
            interpreter
                .assign_property(Value::Object(object), key, Value::TRUE)
                .expect("assignment");
        }
        let keys: Vec<String> = interpreter
            .own_enumerable_keys(object)
            .into_iter()
            .map(|key| interpreter.heap[key].to_string())
            .collect();
        assert_eq!(keys, ["2", "10", "z", "a"]);
    }
}
