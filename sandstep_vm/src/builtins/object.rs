// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [15.2 Object Objects](https://262.ecma-international.org/5.1/#sec-15.2)

use crate::bridge::Arguments;
use crate::heap::indexes::{ObjectIndex, StringIndex};
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::PropertyDescriptor;
use crate::value::{array_index, JsResult, Value};

use super::{bind_constructor, called_as_new, create_prototype, method};

pub(crate) fn install(interpreter: &mut Interpreter) {
    let object = interpreter.heap.intrinsics.object;
    bind_constructor(interpreter, object, "Object", constructor);

    // Object.prototype terminates every chain: its parent is None.
    let prototype = create_prototype(interpreter, object, None);

    method(interpreter, object, "getPrototypeOf", get_prototype_of);
    method(interpreter, object, "create", create);
    method(interpreter, object, "defineProperty", define_property);
    method(
        interpreter,
        object,
        "getOwnPropertyDescriptor",
        get_own_property_descriptor,
    );
    method(
        interpreter,
        object,
        "getOwnPropertyNames",
        get_own_property_names,
    );
    method(interpreter, object, "keys", keys);
    method(interpreter, object, "preventExtensions", prevent_extensions);
    method(interpreter, object, "isExtensible", is_extensible);

    method(interpreter, prototype, "toString", to_string);
    method(interpreter, prototype, "toLocaleString", to_string);
    method(interpreter, prototype, "valueOf", value_of);
    method(interpreter, prototype, "hasOwnProperty", has_own_property);
    method(interpreter, prototype, "isPrototypeOf", is_prototype_of);
    method(
        interpreter,
        prototype,
        "propertyIsEnumerable",
        property_is_enumerable,
    );
}

fn constructor(interpreter: &mut Interpreter, this: Value, args: &Arguments) -> JsResult<Value> {
    let _ = called_as_new(interpreter, this, interpreter.heap.intrinsics.object);
    let value = args.get(0);
    match value {
        Value::Object(_) => Ok(value),
        Value::Undefined | Value::Null => {
            let constructor = interpreter.heap.intrinsics.object;
            Ok(Value::Object(
                interpreter.heap.create_object(Some(constructor)),
            ))
        }
        _ => Ok(Value::Object(interpreter.to_object(value)?)),
    }
}

fn expect_object(interpreter: &mut Interpreter, value: Value) -> JsResult<ObjectIndex> {
    value.as_object().ok_or_else(|| {
        interpreter.throw_exception(ExceptionType::TypeError, "Object.* called on non-object")
    })
}

/// ### [15.2.3.2 Object.getPrototypeOf](https://262.ecma-international.org/5.1/#sec-15.2.3.2)
fn get_prototype_of(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    expect_object(interpreter, args.get(0))?;
    match interpreter.heap.prototype_of(args.get(0)) {
        Some(prototype) => Ok(Value::Object(prototype)),
        None => Ok(Value::Null),
    }
}

/// ### [15.2.3.5 Object.create](https://262.ecma-international.org/5.1/#sec-15.2.3.5)
///
/// The object model points at constructors, not prototypes, so `create`
/// synthesizes an anonymous constructor whose `prototype` is the given
/// object.
fn create(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let prototype = args.get(0);
    let object = match prototype {
        Value::Null => interpreter.heap.create_object(None),
        Value::Object(prototype) => {
            let synthetic = interpreter.create_native_function(anonymous);
            let constructor = synthetic.as_object().expect("native function is an object");
            super::link_prototype(interpreter, constructor, prototype);
            interpreter.heap.create_object(Some(constructor))
        }
        _ => {
            return Err(interpreter.throw_exception(
                ExceptionType::TypeError,
                "Object prototype may only be an Object or null",
            ));
        }
    };
    if let Value::Object(properties) = args.get(1) {
        for key in interpreter.own_enumerable_keys(properties) {
            let descriptor = interpreter.heap[properties]
                .properties
                .get(&key)
                .copied()
                .unwrap_or(Value::Undefined);
            let descriptor = descriptor_from_object(interpreter, descriptor)?;
            interpreter.define_property(object, key, descriptor)?;
        }
    }
    Ok(Value::Object(object))
}

fn anonymous(_interpreter: &mut Interpreter, _this: Value, _args: &Arguments) -> JsResult<Value> {
    Ok(Value::Undefined)
}

/// Reads a property-descriptor object into the internal descriptor form.
/// Fields are raw data reads; accessors on descriptor objects are not
/// dispatched.
pub(crate) fn descriptor_from_object(
    interpreter: &mut Interpreter,
    descriptor: Value,
) -> JsResult<PropertyDescriptor> {
    let Some(object) = descriptor.as_object() else {
        return Err(interpreter.throw_exception(
            ExceptionType::TypeError,
            "Property description must be an object",
        ));
    };
    let mut read = |name: &str| -> Option<Value> {
        let key = interpreter.heap.intern(name);
        if interpreter.heap[object].has_own(key) {
            Some(
                interpreter.heap[object]
                    .properties
                    .get(&key)
                    .copied()
                    .unwrap_or(Value::Undefined),
            )
        } else {
            None
        }
    };
    let value = read("value");
    let writable = read("writable");
    let enumerable = read("enumerable");
    let configurable = read("configurable");
    let getter = read("get");
    let setter = read("set");
    Ok(PropertyDescriptor {
        value,
        writable: writable.map(|v| interpreter.heap.to_boolean(v)),
        enumerable: enumerable.map(|v| interpreter.heap.to_boolean(v)),
        configurable: configurable.map(|v| interpreter.heap.to_boolean(v)),
        getter: getter.filter(|v| !v.is_undefined()),
        setter: setter.filter(|v| !v.is_undefined()),
    })
}

/// ### [15.2.3.6 Object.defineProperty](https://262.ecma-international.org/5.1/#sec-15.2.3.6)
fn define_property(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let object = expect_object(interpreter, args.get(0))?;
    let key = interpreter.heap.to_string_value(args.get(1));
    let descriptor = descriptor_from_object(interpreter, args.get(2))?;
    interpreter.define_property(object, key, descriptor)?;
    Ok(args.get(0))
}

/// ### [15.2.3.3 Object.getOwnPropertyDescriptor](https://262.ecma-international.org/5.1/#sec-15.2.3.3)
fn get_own_property_descriptor(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let object = expect_object(interpreter, args.get(0))?;
    let key = interpreter.heap.to_string_value(args.get(1));
    if !interpreter.heap[object].has_own(key) {
        return Ok(Value::Undefined);
    }
    let constructor = interpreter.heap.intrinsics.object;
    let result = interpreter.heap.create_object(Some(constructor));
    let data = &interpreter.heap[object];
    let getter = data.getter.get(&key).copied();
    let setter = data.setter.get(&key).copied();
    let value = data.properties.get(&key).copied().unwrap_or(Value::Undefined);
    let enumerable = !data.not_enumerable.contains(&key);
    let configurable = !data.not_configurable.contains(&key);
    let writable = !data.not_writable.contains(&key);
    if getter.is_some() || setter.is_some() {
        let get = getter.map_or(Value::Undefined, Value::Object);
        let set = setter.map_or(Value::Undefined, Value::Object);
        let key = interpreter.heap.intern("get");
        interpreter.heap[result].insert(key, get);
        let key = interpreter.heap.intern("set");
        interpreter.heap[result].insert(key, set);
    } else {
        let key = interpreter.heap.intern("value");
        interpreter.heap[result].insert(key, value);
        let key = interpreter.heap.intern("writable");
        interpreter.heap[result].insert(key, Value::from_bool(writable));
    }
    let key = interpreter.heap.intern("enumerable");
    interpreter.heap[result].insert(key, Value::from_bool(enumerable));
    let key = interpreter.heap.intern("configurable");
    interpreter.heap[result].insert(key, Value::from_bool(configurable));
    Ok(Value::Object(result))
}

fn collect_keys(
    interpreter: &mut Interpreter,
    object: ObjectIndex,
    enumerable_only: bool,
) -> Value {
    let keys: Vec<StringIndex> = interpreter.own_keys(object, enumerable_only);
    let array = interpreter.heap.create_array();
    for key in keys {
        interpreter.heap.array_push(array, Value::String(key));
    }
    Value::Object(array)
}

/// ### [15.2.3.4 Object.getOwnPropertyNames](https://262.ecma-international.org/5.1/#sec-15.2.3.4)
fn get_own_property_names(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let object = expect_object(interpreter, args.get(0))?;
    Ok(collect_keys(interpreter, object, false))
}

/// ### [15.2.3.14 Object.keys](https://262.ecma-international.org/5.1/#sec-15.2.3.14)
fn keys(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
    let object = expect_object(interpreter, args.get(0))?;
    Ok(collect_keys(interpreter, object, true))
}

fn prevent_extensions(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let object = expect_object(interpreter, args.get(0))?;
    interpreter.heap[object].prevent_extensions = true;
    Ok(args.get(0))
}

fn is_extensible(
    interpreter: &mut Interpreter,
    _this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let object = expect_object(interpreter, args.get(0))?;
    Ok(Value::from_bool(
        !interpreter.heap[object].prevent_extensions,
    ))
}

fn to_string(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    let text = interpreter.heap.to_string(this);
    Ok(interpreter.heap.string_value(&text))
}

fn value_of(interpreter: &mut Interpreter, this: Value, _args: &Arguments) -> JsResult<Value> {
    Ok(interpreter.heap.value_of(this))
}

/// ### [15.2.4.5 Object.prototype.hasOwnProperty](https://262.ecma-international.org/5.1/#sec-15.2.4.5)
fn has_own_property(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let key = interpreter.heap.to_string_value(args.get(0));
    let result = match this {
        Value::Object(object) => {
            let data = &interpreter.heap[object];
            data.has_own(key)
                || (data.length.is_some() && &interpreter.heap[key] == "length")
        }
        Value::String(text) => {
            let name = &interpreter.heap[key];
            name == "length"
                || array_index(name)
                    .is_some_and(|i| (i as usize) < interpreter.heap[text].chars().count())
        }
        _ => false,
    };
    Ok(Value::from_bool(result))
}

/// ### [15.2.4.6 Object.prototype.isPrototypeOf](https://262.ecma-international.org/5.1/#sec-15.2.4.6)
fn is_prototype_of(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let Some(target) = this.as_object() else {
        return Ok(Value::FALSE);
    };
    let mut current = interpreter.heap.prototype_of(args.get(0));
    for _ in 0..512 {
        match current {
            Some(prototype) if prototype == target => return Ok(Value::TRUE),
            Some(prototype) => {
                current = interpreter.heap.prototype_of(Value::Object(prototype));
            }
            None => break,
        }
    }
    Ok(Value::FALSE)
}

/// ### [15.2.4.7 Object.prototype.propertyIsEnumerable](https://262.ecma-international.org/5.1/#sec-15.2.4.7)
fn property_is_enumerable(
    interpreter: &mut Interpreter,
    this: Value,
    args: &Arguments,
) -> JsResult<Value> {
    let key = interpreter.heap.to_string_value(args.get(0));
    let result = this.as_object().is_some_and(|object| {
        let data = &interpreter.heap[object];
        data.has_own(key) && !data.not_enumerable.contains(&key)
    });
    Ok(Value::from_bool(result))
}
