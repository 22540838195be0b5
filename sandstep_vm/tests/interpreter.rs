// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end programs driven through the public `run`/`value` surface.

use sandstep_vm::{FatalError, Interpreter, Value};

fn eval(code: &str) -> (Interpreter, Value) {
    let mut interpreter = Interpreter::new(code).expect("program parses");
    let paused = interpreter.run().expect("program runs to completion");
    assert!(!paused);
    let value = interpreter.value();
    (interpreter, value)
}

fn eval_number(code: &str) -> f64 {
    let (_, value) = eval(code);
    match value {
        Value::Number(n) => n,
        other => panic!("expected a number result, got {other:?}"),
    }
}

fn eval_string(code: &str) -> String {
    let (interpreter, value) = eval(code);
    assert!(value.is_string(), "expected a string result, got {value:?}");
    interpreter.heap.to_string(value)
}

fn eval_bool(code: &str) -> bool {
    let (_, value) = eval(code);
    match value {
        Value::Boolean(b) => b,
        other => panic!("expected a boolean result, got {other:?}"),
    }
}

#[test]
fn null_program_yields_the_null_singleton() {
    let (_, value) = eval("null;");
    assert!(value.is_null());
}

#[test]
fn nan_and_number_classification() {
    let (_, value) = eval("NaN;");
    assert!(matches!(value, Value::Number(n) if n.is_nan()));
    assert!(eval_bool("isNaN(NaN);"));
    assert!(!eval_bool("isNaN(null);"));
    assert!(!eval_bool("isFinite(Infinity);"));
    assert!(eval_bool("isFinite(1);"));
}

#[test]
fn arithmetic_and_string_promotion() {
    assert_eq!(eval_number("6 * 7;"), 42.0);
    assert_eq!(eval_number("2 + 3 * 4;"), 14.0);
    assert_eq!(eval_string("1 + '2';"), "12");
    assert!(eval_number("0 / 0;").is_nan());
    assert_eq!(eval_number("7 % 4;"), 3.0);
    assert_eq!(eval_number("1 << 5;"), 32.0);
    assert_eq!(eval_number("-9 >>> 28;"), 15.0);
}

#[test]
fn json_parse_and_round_trip() {
    let (mut interpreter, value) = eval("JSON.parse('{\"a\":10}');");
    assert!(value.is_object());
    let a = interpreter.get_property(value, "a");
    assert!(matches!(a, Value::Number(n) if n == 10.0));
    assert_eq!(eval_string("JSON.stringify({a:10});"), "{\"a\":10}");
}

#[test]
fn json_stringify_rejects_function_replacers() {
    assert!(eval_bool(
        "var caught = false;
         try {
           JSON.stringify({a: 1}, function(key, value) { return value; });
         } catch (e) {
           caught = e instanceof TypeError;
         }
         caught;",
    ));
}

#[test]
fn array_map_through_the_polyfill() {
    let (interpreter, value) = eval(
        "new Array('1', '2', '3').map(function(x) { return 'm' + x; });",
    );
    let array = value.as_object().expect("map returns an array");
    assert_eq!(interpreter.heap[array].length, Some(3));
    for (position, expected) in ["m1", "m2", "m3"].iter().enumerate() {
        let element = interpreter
            .heap
            .element(array, position as u32)
            .expect("dense result");
        assert_eq!(interpreter.heap.to_string(element), *expected);
    }
}

#[test]
fn fibonacci() {
    let (interpreter, value) = eval(
        "var result = [];
         var a = 1, b = 1;
         for (var i = 0; i < 16; i++) {
           result.push(a);
           var next = a + b;
           a = b;
           b = next;
         }
         result;",
    );
    let array = value.as_object().expect("array result");
    let expected = [
        1.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0, 55.0, 89.0, 144.0, 233.0, 377.0,
        610.0, 987.0,
    ];
    assert_eq!(interpreter.heap[array].length, Some(expected.len() as u32));
    for (position, expected) in expected.iter().enumerate() {
        let element = interpreter
            .heap
            .element(array, position as u32)
            .expect("dense result");
        assert!(matches!(element, Value::Number(n) if n == *expected));
    }
}

#[test]
fn uncaught_throw_reaches_the_host() {
    let mut interpreter = Interpreter::new("throw new Error('x');").expect("parses");
    match interpreter.run() {
        Err(FatalError::Uncaught { name, message }) => {
            assert_eq!(name, "Error");
            assert_eq!(message, "x");
        }
        other => panic!("expected an uncaught error, got {other:?}"),
    }
}

#[test]
fn caught_throw_lands_in_the_handler() {
    let (mut interpreter, _) = eval(
        "var error;
         try { throw new Error('x'); } catch (err) { error = err; }",
    );
    let global = interpreter.global_scope();
    let error = interpreter.get_property(Value::Object(global), "error");
    let error_object = error.as_object().expect("caught value is an object");
    assert_eq!(
        interpreter.heap[error_object].parent,
        Some(interpreter.intrinsics().error)
    );
    let message = interpreter.get_property(error, "message");
    assert_eq!(interpreter.heap.to_string(message), "x");
}

#[test]
fn reference_errors() {
    let mut interpreter = Interpreter::new("missing;").expect("parses");
    match interpreter.run() {
        Err(FatalError::Uncaught { name, .. }) => assert_eq!(name, "ReferenceError"),
        other => panic!("expected a ReferenceError, got {other:?}"),
    }

    // A sloppy-mode write to an unbound name lands on the global scope.
    assert_eq!(eval_number("fresh = 5; fresh;"), 5.0);

    let mut interpreter =
        Interpreter::new("'use strict'; unbound = 5;").expect("parses");
    match interpreter.run() {
        Err(FatalError::Uncaught { name, .. }) => assert_eq!(name, "ReferenceError"),
        other => panic!("expected a strict-mode ReferenceError, got {other:?}"),
    }
}

#[test]
fn define_property_respects_configurability() {
    assert!(eval_bool(
        "var o = {};
         Object.defineProperty(o, 'x', {value: 1});
         var caught = false;
         try {
           Object.defineProperty(o, 'x', {value: 2});
         } catch (e) {
           caught = e instanceof TypeError;
         }
         caught;",
    ));
}

#[test]
fn lowering_array_length_deletes_elements() {
    let (interpreter, value) = eval("var a = [1, 2, 3, 4]; a.length = 2; a;");
    let array = value.as_object().expect("array result");
    assert_eq!(interpreter.heap[array].length, Some(2));
    assert!(interpreter.heap.element(array, 1).is_some());
    assert!(interpreter.heap.element(array, 2).is_none());
    assert!(interpreter.heap.element(array, 3).is_none());
}

#[test]
fn instanceof_walks_the_prototype_chain() {
    assert!(eval_bool(
        "function Base() {}
         var instance = new Base();
         instance instanceof Base;",
    ));
    assert!(eval_bool("new Error('e') instanceof Error;"));
    assert!(!eval_bool("({}) instanceof Error;"));
}

#[test]
fn accessors_dispatch_through_synthesized_calls() {
    assert_eq!(
        eval_number(
            "var backing = 0;
             var o = {
               get x() { return backing + 1; },
               set x(v) { backing = v * 2; }
             };
             o.x = 4;
             o.x;",
        ),
        9.0
    );
}

#[test]
fn compound_assignment_loads_then_stores() {
    assert_eq!(eval_number("var o = {n: 5}; o.n += 3; o.n;"), 8.0);
    assert_eq!(eval_number("var n = 1; n <<= 4; n;"), 16.0);
}

#[test]
fn update_expressions() {
    assert_eq!(eval_number("var i = 5; i++;"), 5.0);
    assert_eq!(eval_number("var i = 5; i++; i;"), 6.0);
    assert_eq!(eval_number("var i = 5; --i;"), 4.0);
}

#[test]
fn switch_fallthrough_runs_every_following_case() {
    assert_eq!(
        eval_string(
            "var log = '';
             switch (2) {
               case 1: log += 'a';
               case 2: log += 'b';
               case 3: log += 'c'; break;
               case 4: log += 'd';
               default: log += 'e';
             }
             log;",
        ),
        "bc"
    );
    assert_eq!(
        eval_string(
            "var log = '';
             switch (9) {
               case 1: log += 'a'; break;
               default: log += 'd';
               case 2: log += 'b';
             }
             log;",
        ),
        "db"
    );
}

#[test]
fn finally_runs_on_the_way_out() {
    assert_eq!(
        eval_string(
            "var log = '';
             function f() {
               try { return 'r'; } finally { log += 'f'; }
             }
             var r = f();
             log + r;",
        ),
        "fr"
    );
    assert_eq!(
        eval_string(
            "var log = '';
             try {
               try { throw new Error('boom'); } finally { log += 'f'; }
             } catch (e) {
               log += 'c';
             }
             log;",
        ),
        "fc"
    );
}

#[test]
fn labeled_continue_targets_the_outer_loop() {
    assert_eq!(
        eval_string(
            "var s = '';
             outer: for (var i = 0; i < 3; i++) {
               for (var j = 0; j < 3; j++) {
                 if (j == 1) continue outer;
                 s += '' + i + j;
               }
             }
             s;",
        ),
        "001020"
    );
}

#[test]
fn for_in_enumerates_own_keys() {
    assert_eq!(
        eval_string(
            "var o = {b: 1, a: 2};
             var keys = '';
             for (var k in o) { keys += k; }
             keys;",
        ),
        "ba"
    );
}

#[test]
fn with_exposes_target_properties_as_bindings() {
    assert_eq!(eval_number("var o = {a: 5}; with (o) { a = a + 1; } o.a;"), 6.0);
}

#[test]
fn eval_shares_the_callers_scope() {
    assert_eq!(eval_number("eval('1 + 2');"), 3.0);
    assert_eq!(eval_number("eval('var x = 7;'); x;"), 7.0);
    assert_eq!(eval_number("eval(16);"), 16.0);
}

#[test]
fn function_constructor_parses_a_snippet() {
    assert_eq!(
        eval_number("var f = new Function('a', 'b', 'return a + b;'); f(2, 3);"),
        5.0
    );
}

#[test]
fn call_apply_bind() {
    let add = "function add(a, b) { return this.c + a + b; }";
    assert_eq!(eval_number(&format!("{add} add.call({{c: 1}}, 2, 3);")), 6.0);
    assert_eq!(
        eval_number(&format!("{add} add.apply({{c: 1}}, [2, 3]);")),
        6.0
    );
    assert_eq!(
        eval_number(&format!("{add} var b = add.bind({{c: 10}}, 1); b(2);")),
        13.0
    );
}

#[test]
fn string_character_magic() {
    assert_eq!(eval_string("'abc'[1];"), "b");
    assert_eq!(eval_number("'abc'.length;"), 3.0);
    // Writes to string indices are silently ignored.
    assert_eq!(eval_string("var s = 'abc'; s[1] = 'x'; s;"), "abc");
}

#[test]
fn typeof_missing_names_do_not_throw() {
    assert_eq!(eval_string("typeof missing;"), "undefined");
    assert_eq!(eval_string("typeof 5;"), "number");
    assert_eq!(eval_string("typeof 'x';"), "string");
    assert_eq!(eval_string("typeof {};"), "object");
    assert_eq!(eval_string("typeof typeof missing;"), "string");
    assert_eq!(eval_string("typeof function() {};"), "function");
}

#[test]
fn closures_capture_their_scope() {
    assert_eq!(
        eval_number(
            "function counter() {
               var n = 0;
               return function() { n++; return n; };
             }
             var next = counter();
             next();
             next();
             next();",
        ),
        3.0
    );
}

#[test]
fn constructors_build_instances() {
    assert_eq!(
        eval_number(
            "function Point(x, y) { this.x = x; this.y = y; }
             Point.prototype.norm = function() { return this.x * this.x + this.y * this.y; };
             new Point(3, 4).norm();",
        ),
        25.0
    );
}

#[test]
fn regexps_delegate_to_the_host_engine() {
    assert!(eval_bool("/ab+c/.test('abbbc');"));
    assert_eq!(eval_string("'a1b2c3'.replace(/[0-9]/g, '#');"), "a#b#c#");
    assert_eq!(eval_number("'hello world'.search(/world/);"), 6.0);
    assert_eq!(eval_string("'a,b;c'.split(/[,;]/).join('-');"), "a-b-c");
}

#[test]
fn do_while_runs_the_body_first() {
    assert_eq!(
        eval_number("var n = 0; do { n++; } while (false); n;"),
        1.0
    );
}

#[test]
fn sparse_arrays_report_their_length() {
    let (interpreter, value) = eval("[1, , 3];");
    let array = value.as_object().expect("array result");
    assert_eq!(interpreter.heap[array].length, Some(3));
    assert!(interpreter.heap.element(array, 1).is_none());
}
