// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host embedding: injected natives, async suspension, live appends, and
//! the JSON-style value bijection.

use std::cell::RefCell;

use sandstep_vm::{
    Arguments, AsyncCompletion, FatalError, Interpreter, JsResult, Value,
};

#[test]
fn injected_native_returns_a_primitive() {
    fn bound_function(
        interpreter: &mut Interpreter,
        _this: Value,
        _args: &Arguments,
    ) -> JsResult<Value> {
        Ok(interpreter.create_primitive(10.0))
    }
    let mut interpreter = Interpreter::new_with_init("boundFunction();", |interpreter, global| {
        let function = interpreter.create_native_function(bound_function);
        interpreter
            .set_property(Value::Object(global), "boundFunction", function, None)
            .expect("fresh binding");
    })
    .expect("parses");
    assert!(!interpreter.run().expect("runs"));
    assert!(matches!(interpreter.value(), Value::Number(n) if n == 10.0));
}

#[test]
fn injected_native_arguments_convert_both_ways() {
    fn sum(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
        let total: f64 = args
            .iter()
            .map(|argument| interpreter.heap.to_number(argument))
            .sum();
        Ok(Value::Number(total))
    }
    let mut interpreter =
        Interpreter::new_with_init("sum(1, '2', true);", |interpreter, global| {
            let function = interpreter.create_native_function(sum);
            interpreter
                .set_property(Value::Object(global), "sum", function, None)
                .expect("fresh binding");
        })
        .expect("parses");
    interpreter.run().expect("runs");
    assert!(matches!(interpreter.value(), Value::Number(n) if n == 4.0));
}

thread_local! {
    static PENDING: RefCell<Option<AsyncCompletion>> = const { RefCell::new(None) };
}

fn park(_interpreter: &mut Interpreter, _this: Value, _args: &Arguments, done: AsyncCompletion) {
    PENDING.with(|pending| *pending.borrow_mut() = Some(done));
}

#[test]
fn async_native_pauses_and_resumes() {
    let mut interpreter = Interpreter::new_with_init("getX();", |interpreter, global| {
        let function = interpreter.create_async_function(park);
        interpreter
            .set_property(Value::Object(global), "getX", function, None)
            .expect("fresh binding");
    })
    .expect("parses");

    // The async native is in flight: run reports the paused state.
    assert!(interpreter.run().expect("runs"));
    assert!(interpreter.paused());

    // appendCode is illegal while the call frame is suspended.
    assert!(matches!(
        interpreter.append_code("1;"),
        Err(FatalError::AppendOutsideProgram)
    ));

    // The host resolves the completion one tick later.
    let value = interpreter.create_primitive(10.0);
    let completion = PENDING
        .with(|pending| pending.borrow_mut().take())
        .expect("async native captured its completion");
    completion.resolve(value);
    assert!(!interpreter.paused());

    assert!(!interpreter.run().expect("resumes"));
    assert!(matches!(interpreter.value(), Value::Number(n) if n == 10.0));
}

#[test]
fn async_rejection_throws_into_the_program() {
    let mut interpreter = Interpreter::new_with_init(
        "var message;
         try_it();",
        |interpreter, global| {
            let function = interpreter.create_async_function(park);
            interpreter
                .set_property(Value::Object(global), "try_it", function, None)
                .expect("fresh binding");
        },
    )
    .expect("parses");
    assert!(interpreter.run().expect("runs"));
    let error = interpreter.create_error(sandstep_vm::ExceptionType::Error, "later");
    let completion = PENDING
        .with(|pending| pending.borrow_mut().take())
        .expect("async native captured its completion");
    completion.reject(error);
    match interpreter.run() {
        Err(FatalError::Uncaught { name, message }) => {
            assert_eq!(name, "Error");
            assert_eq!(message, "later");
        }
        other => panic!("expected the rejection to surface, got {other:?}"),
    }
}

#[test]
fn append_code_extends_an_idle_program() {
    let mut interpreter = Interpreter::new("var a = 2;").expect("parses");
    assert!(!interpreter.run().expect("runs"));
    interpreter.append_code("a * 3;").expect("idle append");
    assert!(!interpreter.run().expect("runs the appended code"));
    assert!(matches!(interpreter.value(), Value::Number(n) if n == 6.0));

    // Appended statements are hoisted like any other top-level code.
    interpreter
        .append_code("function f() { return a; } f();")
        .expect("idle append");
    interpreter.run().expect("runs");
    assert!(matches!(interpreter.value(), Value::Number(n) if n == 2.0));
}

#[test]
fn step_is_monotone_after_completion() {
    let mut interpreter = Interpreter::new("1 + 1;").expect("parses");
    assert!(!interpreter.run().expect("runs"));
    assert!(!interpreter.step().expect("step after completion"));
    assert!(!interpreter.step().expect("step stays done"));
}

#[test]
fn stepping_reaches_the_same_result_as_running() {
    let mut interpreter = Interpreter::new("var n = 0; while (n < 10) { n++; } n;")
        .expect("parses");
    let mut steps = 0;
    while interpreter.step().expect("steps") {
        steps += 1;
        assert!(steps < 10_000, "program failed to terminate");
    }
    assert!(matches!(interpreter.value(), Value::Number(n) if n == 10.0));
}

#[test]
fn pseudo_native_round_trip_is_identity() {
    let native = serde_json::json!({
        "number": 1.5,
        "text": "abc",
        "flag": true,
        "nothing": null,
        "list": [1, 2, [3, 4]],
        "nested": {"a": 1}
    });
    let mut interpreter = Interpreter::new("").expect("parses");
    let pseudo = interpreter.native_to_pseudo(&native);
    let back = interpreter
        .pseudo_to_native(pseudo)
        .expect("no cycles in a JSON value");
    assert_eq!(native, back);
}

#[test]
fn pseudo_to_native_rejects_cycles() {
    let mut interpreter = Interpreter::new("var o = {}; o.me = o; o;").expect("parses");
    interpreter.run().expect("runs");
    let cyclic = interpreter.value();
    assert!(interpreter.pseudo_to_native(cyclic).is_err());
}

#[test]
fn host_init_runs_before_the_first_step() {
    let mut interpreter = Interpreter::new_with_init("seeded;", |interpreter, global| {
        let value = interpreter.create_primitive("from the host");
        interpreter
            .set_property(Value::Object(global), "seeded", value, None)
            .expect("fresh binding");
    })
    .expect("parses");
    interpreter.run().expect("runs");
    let value = interpreter.value();
    assert_eq!(interpreter.heap.to_string(value), "from the host");
}
