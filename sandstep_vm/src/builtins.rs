// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction and population of the standard built-ins. The heap
//! allocates the constructor shells up front; `install` fills them in the
//! fixed order Function, Object, Array, Number, String, Boolean, Date,
//! Math, RegExp, JSON, Error, then the global functions. A handful of
//! `Array.prototype` methods and `Object.defineProperties` are expressed
//! as source polyfills run at startup with their positions stripped.

pub(crate) mod array;
pub(crate) mod boolean;
pub(crate) mod date;
pub(crate) mod error;
pub(crate) mod function;
pub(crate) mod global;
pub(crate) mod json;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod object;
pub(crate) mod regexp;
pub(crate) mod string;

use crate::bridge::NativeFn;
use crate::heap::indexes::ObjectIndex;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub(crate) fn install(interpreter: &mut Interpreter) {
    function::install(interpreter);
    object::install(interpreter);
    array::install(interpreter);
    number::install(interpreter);
    string::install(interpreter);
    boolean::install(interpreter);
    date::install(interpreter);
    math::install(interpreter);
    regexp::install(interpreter);
    json::install(interpreter);
    error::install(interpreter);
    global::install(interpreter);
}

/// Installs a native method as a non-enumerable property.
pub(crate) fn method(
    interpreter: &mut Interpreter,
    target: ObjectIndex,
    name: &str,
    function: NativeFn,
) {
    let function = interpreter.create_native_function(function);
    let key = interpreter.heap.intern(name);
    let data = &mut interpreter.heap[target];
    data.insert(key, function);
    data.not_enumerable.insert(key);
}

/// Installs a non-enumerable data property.
pub(crate) fn property(
    interpreter: &mut Interpreter,
    target: ObjectIndex,
    name: &str,
    value: Value,
) {
    let key = interpreter.heap.intern(name);
    let data = &mut interpreter.heap[target];
    data.insert(key, value);
    data.not_enumerable.insert(key);
}

/// Installs a fully locked-down property (`Infinity`, `Math.PI`, ...).
pub(crate) fn frozen_property(
    interpreter: &mut Interpreter,
    target: ObjectIndex,
    name: &str,
    value: Value,
) {
    let key = interpreter.heap.intern(name);
    let data = &mut interpreter.heap[target];
    data.insert(key, value);
    data.not_enumerable.insert(key);
    data.not_writable.insert(key);
    data.not_configurable.insert(key);
}

/// Gives `constructor` its `prototype` object and wires the back link.
/// The prototype's own parent decides what the instances inherit beyond
/// it; `None` ends the chain (`Object.prototype`).
pub(crate) fn create_prototype(
    interpreter: &mut Interpreter,
    constructor: ObjectIndex,
    prototype_parent: Option<ObjectIndex>,
) -> ObjectIndex {
    let prototype = interpreter.heap.create_object(prototype_parent);
    link_prototype(interpreter, constructor, prototype);
    prototype
}

/// Wires an existing object in as a constructor's `prototype`.
pub(crate) fn link_prototype(
    interpreter: &mut Interpreter,
    constructor: ObjectIndex,
    prototype: ObjectIndex,
) {
    let key = interpreter.heap.intern("prototype");
    let data = &mut interpreter.heap[constructor];
    data.insert(key, Value::Object(prototype));
    data.not_enumerable.insert(key);
    data.not_writable.insert(key);
    let key = interpreter.heap.intern("constructor");
    let data = &mut interpreter.heap[prototype];
    data.insert(key, Value::Object(constructor));
    data.not_enumerable.insert(key);
}

/// Fills a preallocated constructor shell with its native behaviour and
/// binds it into the global scope.
pub(crate) fn bind_constructor(
    interpreter: &mut Interpreter,
    constructor: ObjectIndex,
    name: &str,
    behaviour: NativeFn,
) {
    {
        let data = interpreter.heap[constructor]
            .function
            .as_mut()
            .expect("constructor shells are functions");
        data.native = Some(behaviour);
    }
    let global = interpreter.heap.global_scope;
    let key = interpreter.heap.intern(name);
    let data = &mut interpreter.heap[global];
    data.insert(key, Value::Object(constructor));
    data.not_enumerable.insert(key);
}

/// Whether a constructor was invoked through `new`: the implicit receiver
/// is a fresh object whose `parent` is the constructor itself.
pub(crate) fn called_as_new(
    interpreter: &Interpreter,
    this: Value,
    constructor: ObjectIndex,
) -> Option<ObjectIndex> {
    this.as_object()
        .filter(|receiver| interpreter.heap[*receiver].parent == Some(constructor))
}

/// Source polyfills executed once at startup. They are written against
/// the same ES5 subset the evaluator accepts, and they install themselves
/// through `Object.defineProperty` so the methods stay non-enumerable.
pub(crate) const POLYFILLS: &str = r#"
Object.defineProperty(Array.prototype, 'every', {configurable: true, writable: true, value:
  function(callback, thisArg) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var len = this.length >>> 0;
    for (var i = 0; i < len; i++) {
      if (i in this && !callback.call(thisArg, this[i], i, this)) return false;
    }
    return true;
  }
});
Object.defineProperty(Array.prototype, 'some', {configurable: true, writable: true, value:
  function(callback, thisArg) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var len = this.length >>> 0;
    for (var i = 0; i < len; i++) {
      if (i in this && callback.call(thisArg, this[i], i, this)) return true;
    }
    return false;
  }
});
Object.defineProperty(Array.prototype, 'forEach', {configurable: true, writable: true, value:
  function(callback, thisArg) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var len = this.length >>> 0;
    for (var i = 0; i < len; i++) {
      if (i in this) callback.call(thisArg, this[i], i, this);
    }
  }
});
Object.defineProperty(Array.prototype, 'map', {configurable: true, writable: true, value:
  function(callback, thisArg) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var len = this.length >>> 0;
    var result = new Array(len);
    for (var i = 0; i < len; i++) {
      if (i in this) result[i] = callback.call(thisArg, this[i], i, this);
    }
    return result;
  }
});
Object.defineProperty(Array.prototype, 'filter', {configurable: true, writable: true, value:
  function(callback, thisArg) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var len = this.length >>> 0;
    var result = [];
    for (var i = 0; i < len; i++) {
      if (i in this) {
        var element = this[i];
        if (callback.call(thisArg, element, i, this)) result.push(element);
      }
    }
    return result;
  }
});
Object.defineProperty(Array.prototype, 'reduce', {configurable: true, writable: true, value:
  function(callback, initialValue) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var len = this.length >>> 0;
    var i = 0;
    var accumulator;
    if (arguments.length > 1) {
      accumulator = initialValue;
    } else {
      while (i < len && !(i in this)) i++;
      if (i >= len) throw new TypeError('Reduce of empty array with no initial value');
      accumulator = this[i++];
    }
    for (; i < len; i++) {
      if (i in this) accumulator = callback(accumulator, this[i], i, this);
    }
    return accumulator;
  }
});
Object.defineProperty(Array.prototype, 'reduceRight', {configurable: true, writable: true, value:
  function(callback, initialValue) {
    if (this == null || typeof callback !== 'function') throw new TypeError();
    var i = (this.length >>> 0) - 1;
    var accumulator;
    if (arguments.length > 1) {
      accumulator = initialValue;
    } else {
      while (i >= 0 && !(i in this)) i--;
      if (i < 0) throw new TypeError('Reduce of empty array with no initial value');
      accumulator = this[i--];
    }
    for (; i >= 0; i--) {
      if (i in this) accumulator = callback(accumulator, this[i], i, this);
    }
    return accumulator;
  }
});
Object.defineProperty(Array.prototype, 'sort', {configurable: true, writable: true, value:
  function(comparator) {
    if (this == null) throw new TypeError();
    var len = this.length >>> 0;
    for (var i = 1; i < len; i++) {
      var item = this[i];
      var j = i - 1;
      while (j >= 0) {
        var other = this[j];
        var before;
        if (item === undefined) {
          before = false;
        } else if (other === undefined) {
          before = true;
        } else if (comparator) {
          before = comparator(other, item) > 0;
        } else {
          before = String(other) > String(item);
        }
        if (!before) break;
        this[j + 1] = other;
        j--;
      }
      this[j + 1] = item;
    }
    return this;
  }
});
Object.defineProperty(Array.prototype, 'toLocaleString', {configurable: true, writable: true, value:
  function() {
    var result = [];
    for (var i = 0; i < this.length; i++) {
      var element = this[i];
      result[i] = (element === null || element === undefined) ? '' : element.toLocaleString();
    }
    return result.join(',');
  }
});
Object.defineProperty(Object, 'defineProperties', {configurable: true, writable: true, value:
  function(obj, props) {
    var keys = Object.keys(props);
    for (var i = 0; i < keys.length; i++) {
      Object.defineProperty(obj, keys[i], props[keys[i]]);
    }
    return obj;
  }
});
"#;
