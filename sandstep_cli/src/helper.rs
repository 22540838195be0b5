// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use sandstep_vm::{Arguments, Interpreter, JsResult, ObjectIndex, Value};

/// Injects the CLI's host functions into the sandbox's global scope.
pub fn initialize_global_object(interpreter: &mut Interpreter, global: ObjectIndex) {
    fn print(interpreter: &mut Interpreter, _this: Value, args: &Arguments) -> JsResult<Value> {
        let line: Vec<String> = args
            .iter()
            .map(|argument| interpreter.heap.to_string(argument))
            .collect();
        println!("{}", line.join(" "));
        Ok(Value::Undefined)
    }
    let function = interpreter.create_native_function(print);
    interpreter
        .set_property(Value::Object(global), "print", function, None)
        .expect("fresh global scope accepts new bindings");
    interpreter
        .set_property(Value::Object(global), "alert", function, None)
        .expect("fresh global scope accepts new bindings");
}

/// Renders a result value the way a console would.
pub fn render_value(interpreter: &Interpreter, value: Value) -> String {
    match value {
        Value::String(_) => format!("\"{}\"", interpreter.heap.to_string(value)),
        _ => interpreter.heap.to_string(value),
    }
}
