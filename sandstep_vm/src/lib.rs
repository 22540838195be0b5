// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sandstep: an in-process, sandboxed interpreter for a subset of
//! ECMAScript 5. A program runs one small step at a time on a reified
//! frame stack, so a host can drive execution to completion, interleave
//! it with its own work (including asynchronous native calls), append
//! source to a live interpreter, and inject functions and values into
//! the sandbox's global scope.
//!
//! ```
//! use sandstep_vm::{Interpreter, Value};
//!
//! let mut interpreter = Interpreter::new("6 * 7;").unwrap();
//! interpreter.run().unwrap();
//! assert!(matches!(interpreter.value(), Value::Number(n) if n == 42.0));
//! ```

pub mod ast;
mod bridge;
mod builtins;
pub mod heap;
mod interpreter;
mod object;
mod scope;
pub mod source;
mod value;

pub use bridge::{Arguments, AsyncCompletion, AsyncFn, NativeFn};
pub use heap::indexes::{NodeId, ObjectIndex, StringIndex};
pub use heap::{Heap, Intrinsics};
pub use interpreter::{ExceptionType, FatalError, Interpreter, Primitive};
pub use object::{Lookup, ObjectHeapData, ObjectPayload, PropertyDescriptor};
pub use source::ParseFailure;
pub use value::{JsError, JsResult, Value};
