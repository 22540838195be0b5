// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The step-wise evaluator: a pushdown machine over a stack of frames,
//! each pairing an AST node with a tagged progress variant. One call to
//! [`Interpreter::step`] advances the machine by one transition; nested
//! `eval` embeds a child machine in a frame and forwards one inner step
//! per outer step.

use std::cell::Cell;
use std::mem;
use std::rc::Rc;

use crate::ast::{
    AssignOp, AstArena, BinaryOp, Literal, LogicalOp, NodeId, NodeKind, PropertyKind, UnaryOp,
    UpdateOp,
};
use crate::bridge::{Arguments, AsyncCompletion, AsyncFn, AsyncOutcome, NativeFn};
use crate::builtins;
use crate::heap::indexes::{ObjectIndex, StringIndex};
use crate::heap::Heap;
use crate::object::{FunctionData, Lookup, ObjectHeapData, ObjectPayload, SpecialForm};
use crate::scope::NameLookup;
use crate::source::{self, ParseFailure};
use crate::value::{to_int32, to_uint32, JsError, JsResult, Value};

/// The standard error constructors an interpreter-level throw can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Error,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
}

impl ExceptionType {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionType::Error => "Error",
            ExceptionType::EvalError => "EvalError",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
            ExceptionType::UriError => "URIError",
        }
    }
}

/// Host-level failures: parse diagnostics, an uncaught interpreter throw,
/// the jump statements the parser should have rejected, and driver
/// protocol violations. None of these are catchable inside the sandbox.
#[derive(Debug)]
pub enum FatalError {
    Parse(ParseFailure),
    Uncaught { name: String, message: String },
    Syntax(String),
    AppendOutsideProgram,
}

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalError::Parse(failure) => write!(f, "parse error: {failure}"),
            FatalError::Uncaught { name, message } => {
                if message.is_empty() {
                    write!(f, "uncaught {name}")
                } else {
                    write!(f, "uncaught {name}: {message}")
                }
            }
            FatalError::Syntax(message) => write!(f, "{message}"),
            FatalError::AppendOutsideProgram => {
                write!(f, "appendCode is only legal while a Program frame is on top")
            }
        }
    }
}

impl std::error::Error for FatalError {}

/// A host value promotable to an interpreter primitive.
#[derive(Debug, Clone)]
pub enum Primitive {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl From<f64> for Primitive {
    fn from(value: f64) -> Self {
        Primitive::Number(value)
    }
}

impl From<i32> for Primitive {
    fn from(value: i32) -> Self {
        Primitive::Number(value as f64)
    }
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Boolean(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::String(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::String(value)
    }
}

/// An assignment/delete/typeof target: a bare name resolved against the
/// scope chain, or an object-and-key pair.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reference {
    Name(StringIndex),
    Member(Value, StringIndex),
}

/// Control-flow transfer searching down the frame stack.
#[derive(Debug, Clone)]
enum Pending {
    Throw(Value),
    Break(Option<Box<str>>),
    Continue(Option<Box<str>>),
    Return(Value),
}

#[derive(Debug)]
enum MachineError {
    /// Uncaught interpreter throw; crosses `eval` boundaries outward.
    Thrown(Value),
    Fatal(FatalError),
}

impl From<JsError> for MachineError {
    fn from(error: JsError) -> Self {
        MachineError::Thrown(error.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinStage {
    Start,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberStage {
    Start,
    Object,
    Key,
    Getter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WithStage {
    Object,
    Body,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TryStage {
    Start,
    Block,
    Handler,
    Finalizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForMode {
    Init,
    Test,
    Body,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryStage {
    Start,
    Operand,
    Dispatched,
}

#[derive(Debug)]
enum SwitchStage {
    Discriminant,
    Find { case_index: usize },
    Test { case_index: usize },
    Run { case_index: usize, stmt_index: usize },
}

#[derive(Debug)]
struct AssignmentStep {
    stage: AssignStage,
    target: Option<Reference>,
    old: Value,
    result: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignStage {
    Start,
    Left,
    LoadOld,
    Right,
    Setter,
}

#[derive(Debug)]
struct UpdateStep {
    stage: UpdateStage,
    target: Option<Reference>,
    old: f64,
    result: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateStage {
    Start,
    Target,
    Load,
    Setter,
}

#[derive(Debug)]
struct MemberStep {
    stage: MemberStage,
    object: Value,
}

#[derive(Debug)]
struct CallStep {
    construct: bool,
    stage: CallStage,
    callee_ref: Option<Reference>,
    func: Value,
    this: Value,
    args: Vec<Value>,
    arg_index: usize,
    receiver: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallStage {
    Start,
    Callee,
    CalleeGetter,
    Args,
    Dispatch,
    Exec,
    Await,
}

/// A machine-synthesized call frame: getter/setter dispatch mid-expression
/// keeps its own variant instead of reusing the `CallExpression` stepper.
#[derive(Debug)]
struct PendingCallStep {
    stage: PendingStage,
    func: Value,
    this: Value,
    args: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingStage {
    Dispatch,
    Exec,
    Await,
}

#[derive(Debug)]
struct ForInStep {
    stage: ForInStage,
    current: Option<ObjectIndex>,
    keys: Vec<StringIndex>,
    key_index: usize,
    key: Option<StringIndex>,
    decl_name: Option<StringIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForInStage {
    Left,
    Object,
    NextKey,
    Target,
    AfterPut,
    Body,
}

/// Per-node-kind progress. All stepper state lives on the frame, so every
/// stepper is re-entrant.
#[derive(Debug)]
enum Step {
    /// Marker left in a frame while its step is taken out for mutation.
    Busy,
    Program { index: usize },
    Block { index: usize },
    ExpressionStatement { done: bool },
    VariableDeclaration { index: usize, pending: Option<Box<str>> },
    If { done_test: bool, in_branch: bool },
    Conditional { done_test: bool, in_branch: bool },
    For { mode: ForMode },
    /// Shared by `while` and `do-while`; the latter starts in the checking
    /// state with `value` pre-seeded true so the first body run is
    /// unconditional.
    While { checking: bool },
    ForIn(Box<ForInStep>),
    Switch { stage: SwitchStage, discriminant: Value },
    Try { stage: TryStage, pending: Option<Pending> },
    Throw { done: bool },
    Return { done: bool },
    Break,
    Continue,
    With { stage: WithStage },
    Labeled { entered: bool },
    Noop,
    Literal,
    Identifier { dispatched: bool },
    This,
    ArrayLiteral {
        index: usize,
        pending: Option<usize>,
        array: Option<ObjectIndex>,
    },
    ObjectLiteral { index: usize, object: Option<ObjectIndex> },
    FunctionExpr,
    Sequence { index: usize },
    Unary { stage: UnaryStage },
    Binary { stage: BinStage, left: Value },
    Logical { stage: BinStage },
    Assignment(Box<AssignmentStep>),
    Update(Box<UpdateStep>),
    Member(Box<MemberStep>),
    Call(Box<CallStep>),
    PendingCall(Box<PendingCallStep>),
    Eval(Box<Machine>),
}

#[derive(Debug)]
pub(crate) struct Frame {
    node: NodeId,
    step: Step,
    scope: Option<ObjectIndex>,
    this_value: Option<Value>,
    value: Value,
    reference: Option<Reference>,
    components: bool,
    label: Option<Box<str>>,
}

impl Frame {
    fn new(node: NodeId, step: Step) -> Self {
        Self {
            node,
            step,
            scope: None,
            this_value: None,
            value: Value::Undefined,
            reference: None,
            components: false,
            label: None,
        }
    }
}

/// One logical fiber: a frame stack plus the last value produced by an
/// expression statement. The root machine's `value` is the interpreter's
/// observable result; `eval` machines carry their own.
#[derive(Debug, Default)]
pub(crate) struct Machine {
    stack: Vec<Frame>,
    value: Value,
    done: bool,
}

type InitFn<'a> = &'a mut dyn FnMut(&mut Interpreter, ObjectIndex);

pub struct Interpreter {
    pub heap: Heap,
    pub(crate) ast: AstArena,
    machine: Machine,
    program: NodeId,
    paused: Rc<Cell<bool>>,
    mailbox: Rc<Cell<Option<AsyncOutcome>>>,
}

impl Interpreter {
    /// Parses `code` as an ECMAScript 5 program and builds a ready
    /// interpreter: built-ins installed, polyfills executed, the program
    /// hoisted but not yet stepped.
    pub fn new(code: &str) -> Result<Self, FatalError> {
        let mut ast = AstArena::new();
        let program =
            source::parse_program(code, &mut ast, true).map_err(FatalError::Parse)?;
        Self::boot(ast, program, None)
    }

    /// Like [`Self::new`], with a host hook that runs after the built-ins
    /// are installed and may inject names into the global scope.
    pub fn new_with_init(
        code: &str,
        mut init: impl FnMut(&mut Interpreter, ObjectIndex),
    ) -> Result<Self, FatalError> {
        let mut ast = AstArena::new();
        let program =
            source::parse_program(code, &mut ast, true).map_err(FatalError::Parse)?;
        Self::boot(ast, program, Some(&mut init))
    }

    /// Builds an interpreter over a pre-parsed program in `ast`.
    pub fn from_program(ast: AstArena, program: NodeId) -> Result<Self, FatalError> {
        Self::boot(ast, program, None)
    }

    pub fn from_program_with_init(
        ast: AstArena,
        program: NodeId,
        mut init: impl FnMut(&mut Interpreter, ObjectIndex),
    ) -> Result<Self, FatalError> {
        Self::boot(ast, program, Some(&mut init))
    }

    fn boot(
        ast: AstArena,
        program: NodeId,
        init: Option<InitFn<'_>>,
    ) -> Result<Self, FatalError> {
        let mut interpreter = Interpreter {
            heap: Heap::new(),
            ast,
            machine: Machine::default(),
            program,
            paused: Rc::new(Cell::new(false)),
            mailbox: Rc::new(Cell::new(None)),
        };
        builtins::install(&mut interpreter);
        interpreter.run_polyfills()?;
        if let Some(init) = init {
            let global = interpreter.heap.global_scope;
            init(&mut interpreter, global);
        }
        let global = interpreter.heap.global_scope;
        if let NodeKind::Program { strict: true, .. } = &interpreter.ast[program].kind {
            if let Some(scope) = &mut interpreter.heap[global].scope {
                scope.strict = true;
            }
        }
        interpreter.machine = interpreter.program_machine(program, global, None);
        Ok(interpreter)
    }

    /// Parses and runs the startup polyfills to completion on a throwaway
    /// machine. Their AST carries no spans.
    fn run_polyfills(&mut self) -> Result<(), FatalError> {
        let program = source::parse_program(builtins::POLYFILLS, &mut self.ast, false)
            .map_err(FatalError::Parse)?;
        let global = self.heap.global_scope;
        let mut machine = self.program_machine(program, global, None);
        loop {
            match self.step_machine(&mut machine) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(MachineError::Fatal(fatal)) => return Err(fatal),
                Err(MachineError::Thrown(value)) => return Err(self.uncaught(value)),
            }
        }
    }

    fn program_machine(
        &mut self,
        program: NodeId,
        scope: ObjectIndex,
        this: Option<Value>,
    ) -> Machine {
        self.hoist(scope, program);
        let mut frame = Frame::new(program, Step::Program { index: 0 });
        frame.scope = Some(scope);
        frame.this_value = Some(this.unwrap_or(Value::Object(scope)));
        Machine {
            stack: vec![frame],
            value: Value::Undefined,
            done: false,
        }
    }

    /// The last value produced by a top-level expression statement.
    pub fn value(&self) -> Value {
        self.machine.value
    }

    pub fn intrinsics(&self) -> &crate::heap::Intrinsics {
        &self.heap.intrinsics
    }

    pub fn global_scope(&self) -> ObjectIndex {
        self.heap.global_scope
    }

    /// Whether an async native is in flight.
    pub fn paused(&self) -> bool {
        self.paused.get()
    }

    /// Advances execution by one step. Returns `false` iff the program has
    /// run to completion. Synthetic frames (positionless polyfill nodes)
    /// are stepped through transparently so a host never observes them.
    pub fn step(&mut self) -> Result<bool, FatalError> {
        if self.machine.done {
            return Ok(false);
        }
        let mut machine = mem::take(&mut self.machine);
        let mut outcome = Ok(false);
        loop {
            match self.step_machine(&mut machine) {
                Err(error) => {
                    outcome = Err(error);
                    break;
                }
                Ok(true) => {
                    outcome = Ok(true);
                    break;
                }
                Ok(false) => {}
            }
            let synthetic = machine
                .stack
                .last()
                .is_some_and(|frame| self.ast[frame.node].span.is_none());
            if !synthetic || self.paused.get() {
                break;
            }
        }
        self.machine = machine;
        match outcome {
            Ok(done) => Ok(!done),
            Err(MachineError::Fatal(fatal)) => Err(fatal),
            Err(MachineError::Thrown(value)) => Err(self.uncaught(value)),
        }
    }

    /// Drives the program until completion or suspension. Returns the
    /// paused flag: `true` means an async native is in flight and the
    /// host should call `run` again after it completes.
    pub fn run(&mut self) -> Result<bool, FatalError> {
        loop {
            if self.paused.get() {
                return Ok(true);
            }
            if !self.step()? {
                return Ok(false);
            }
        }
    }

    /// Appends statements to the live program. Legal only while the top
    /// of the stack is the `Program` frame, i.e. the interpreter is idle
    /// between top-level statements.
    pub fn append_code(&mut self, code: &str) -> Result<(), FatalError> {
        let top_is_program = self
            .machine
            .stack
            .last()
            .is_some_and(|frame| matches!(frame.step, Step::Program { .. }));
        if !top_is_program {
            return Err(FatalError::AppendOutsideProgram);
        }
        let statements =
            source::parse_statements(code, &mut self.ast).map_err(FatalError::Parse)?;
        let scope = self
            .machine
            .stack
            .last()
            .and_then(|frame| frame.scope)
            .unwrap_or(self.heap.global_scope);
        for statement in &statements {
            self.hoist_statement(scope, *statement);
        }
        self.ast.extend_program(self.program, statements);
        self.machine.done = false;
        Ok(())
    }

    // Host-facing constructors.

    pub fn create_primitive(&mut self, value: impl Into<Primitive>) -> Value {
        match value.into() {
            Primitive::Undefined => Value::Undefined,
            Primitive::Null => Value::Null,
            Primitive::Boolean(value) => Value::from_bool(value),
            Primitive::Number(value) => Value::Number(value),
            Primitive::String(value) => self.heap.string_value(&value),
        }
    }

    /// Creates an empty object whose `parent` is `constructor`.
    pub fn create_object(&mut self, constructor: Value) -> Value {
        let parent = constructor.as_object();
        Value::Object(self.heap.create_object(parent))
    }

    pub fn create_array(&mut self, elements: &[Value]) -> Value {
        let array = self.heap.create_array();
        for element in elements {
            self.heap.array_push(array, *element);
        }
        Value::Object(array)
    }

    pub fn create_native_function(&mut self, function: NativeFn) -> Value {
        let parent = self.heap.intrinsics.function;
        Value::Object(self.heap.alloc(ObjectHeapData::function(
            Some(parent),
            FunctionData {
                native: Some(function),
                ..Default::default()
            },
        )))
    }

    pub fn create_async_function(&mut self, function: AsyncFn) -> Value {
        let parent = self.heap.intrinsics.function;
        Value::Object(self.heap.alloc(ObjectHeapData::function(
            Some(parent),
            FunctionData {
                asynchronous: Some(function),
                ..Default::default()
            },
        )))
    }

    /// Creates a user function closing over `scope`, with the usual
    /// `length` and `prototype` properties.
    pub(crate) fn create_function(&mut self, node: NodeId, scope: ObjectIndex) -> Value {
        let function_node = match &self.ast[node].kind {
            NodeKind::FunctionDeclaration(f) | NodeKind::FunctionExpression(f) => f,
            _ => unreachable!("create_function on a non-function node"),
        };
        let params = function_node.params.len();
        let strict = function_node.strict || self.scope_strict(scope);
        let parent = self.heap.intrinsics.function;
        let function = self.heap.alloc(ObjectHeapData::function(
            Some(parent),
            FunctionData {
                node: Some(node),
                parent_scope: Some(scope),
                strict,
                ..Default::default()
            },
        ));
        let object = self.heap.intrinsics.object;
        let prototype = self.heap.create_object(Some(object));
        let key = self.heap.intern("constructor");
        self.heap[prototype].insert(key, Value::Object(function));
        self.heap[prototype].not_enumerable.insert(key);
        let key = self.heap.intern("prototype");
        self.heap[function].insert(key, Value::Object(prototype));
        self.heap[function].not_enumerable.insert(key);
        let key = self.heap.intern("length");
        self.heap[function].insert(key, Value::Number(params as f64));
        let data = &mut self.heap[function];
        data.not_enumerable.insert(key);
        data.not_writable.insert(key);
        Value::Object(function)
    }

    pub(crate) fn create_regexp(
        &mut self,
        pattern: &str,
        flags: crate::ast::RegExpFlags,
    ) -> Value {
        let constructor = self.heap.intrinsics.regexp;
        let object = self.heap.create_object(Some(constructor));
        let source = self.heap.intern(pattern);
        let compiled = builtins::regexp::compile_pattern(pattern, flags);
        self.heap[object].payload = Some(ObjectPayload::RegExp(crate::object::RegExpData {
            source,
            flags,
            compiled,
        }));
        for (name, value, writable) in [
            ("lastIndex", Value::NUMBER_ZERO, true),
            ("global", Value::from_bool(flags.global), false),
            ("ignoreCase", Value::from_bool(flags.ignore_case), false),
            ("multiline", Value::from_bool(flags.multiline), false),
            ("source", Value::String(source), false),
        ] {
            let key = self.heap.intern(name);
            let data = &mut self.heap[object];
            data.insert(key, value);
            data.not_enumerable.insert(key);
            if !writable {
                data.not_writable.insert(key);
            }
        }
        Value::Object(object)
    }

    /// ### [15.11 Error Objects](https://262.ecma-international.org/5.1/#sec-15.11)
    pub fn create_error(&mut self, kind: ExceptionType, message: &str) -> Value {
        let constructor = match kind {
            ExceptionType::Error => self.heap.intrinsics.error,
            ExceptionType::EvalError => self.heap.intrinsics.eval_error,
            ExceptionType::RangeError => self.heap.intrinsics.range_error,
            ExceptionType::ReferenceError => self.heap.intrinsics.reference_error,
            ExceptionType::SyntaxError => self.heap.intrinsics.syntax_error,
            ExceptionType::TypeError => self.heap.intrinsics.type_error,
            ExceptionType::UriError => self.heap.intrinsics.uri_error,
        };
        let object = self.heap.create_object(Some(constructor));
        let message = self.heap.string_value(message);
        let key = self.heap.intern("message");
        self.heap[object].insert(key, message);
        self.heap[object].not_enumerable.insert(key);
        Value::Object(object)
    }

    /// Builds an error object and wraps it for propagation. The unwinding
    /// to a `try` handler, or out to the host, happens in the machine.
    pub fn throw_exception(&mut self, kind: ExceptionType, message: &str) -> JsError {
        JsError::new(self.create_error(kind, message))
    }

    /// Re-raises an uncaught interpreter throw as the host-level error
    /// carrying the pseudo-error's name and message.
    fn uncaught(&mut self, value: Value) -> FatalError {
        let name_key = self.heap.intern("name");
        let message_key = self.heap.intern("message");
        if value.is_object() {
            let name = match self.get_lookup(value, name_key) {
                Lookup::Data(name) if !name.is_undefined() => Some(self.heap.to_string(name)),
                _ => None,
            };
            if let Some(name) = name {
                let message = match self.get_lookup(value, message_key) {
                    Lookup::Data(message) if !message.is_undefined() => {
                        self.heap.to_string(message)
                    }
                    _ => String::new(),
                };
                return FatalError::Uncaught { name, message };
            }
        }
        FatalError::Uncaught {
            name: "Error".to_string(),
            message: self.heap.to_string(value),
        }
    }

    /// ### [9.9 ToObject](https://262.ecma-international.org/5.1/#sec-9.9)
    pub(crate) fn to_object(&mut self, value: Value) -> JsResult<ObjectIndex> {
        match value {
            Value::Object(object) => Ok(object),
            Value::Number(n) => {
                let constructor = self.heap.intrinsics.number;
                let object = self.heap.create_object(Some(constructor));
                self.heap[object].payload = Some(ObjectPayload::Number(n));
                Ok(object)
            }
            Value::Boolean(b) => {
                let constructor = self.heap.intrinsics.boolean;
                let object = self.heap.create_object(Some(constructor));
                self.heap[object].payload = Some(ObjectPayload::Boolean(b));
                Ok(object)
            }
            Value::String(s) => {
                let constructor = self.heap.intrinsics.string;
                let object = self.heap.create_object(Some(constructor));
                self.heap[object].payload = Some(ObjectPayload::String(s));
                Ok(object)
            }
            Value::Undefined | Value::Null => Err(self.throw_exception(
                ExceptionType::TypeError,
                "Cannot convert undefined or null to object",
            )),
        }
    }

    /// ### [15.3.5.3 \[\[HasInstance\]\] (V)](https://262.ecma-international.org/5.1/#sec-15.3.5.3)
    pub(crate) fn instance_of(&mut self, value: Value, constructor: Value) -> JsResult<bool> {
        let callable = constructor
            .as_object()
            .filter(|c| self.heap[*c].is_function());
        let Some(constructor) = callable else {
            return Err(self.throw_exception(
                ExceptionType::TypeError,
                "Right-hand side of 'instanceof' is not callable",
            ));
        };
        let Some(target) = self.heap.prototype_property(constructor) else {
            return Err(self.throw_exception(
                ExceptionType::TypeError,
                "Function has non-object prototype in instanceof check",
            ));
        };
        if !value.is_object() {
            return Ok(false);
        }
        let mut current = self.heap.prototype_of(value);
        for _ in 0..512 {
            match current {
                Some(prototype) if prototype == target => return Ok(true),
                Some(prototype) => current = self.heap.prototype_of(Value::Object(prototype)),
                None => return Ok(false),
            }
        }
        Ok(false)
    }

    // The machine.

    fn step_machine(&mut self, machine: &mut Machine) -> Result<bool, MachineError> {
        if machine.done {
            return Ok(true);
        }
        let top = machine.stack.len() - 1;
        let node = machine.stack[top].node;
        let step = mem::replace(&mut machine.stack[top].step, Step::Busy);
        match self.dispatch(machine, top, node, step) {
            Ok(()) => Ok(machine.done),
            Err(MachineError::Thrown(value)) => {
                self.unwind(machine, Pending::Throw(value))?;
                Ok(machine.done)
            }
            Err(fatal) => Err(fatal),
        }
    }

    fn dispatch(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        step: Step,
    ) -> Result<(), MachineError> {
        match step {
            Step::Busy => unreachable!("re-entered a busy frame"),
            Step::Program { index } => self.step_program(m, fi, node, index),
            Step::Block { index } => self.step_block(m, fi, node, index),
            Step::ExpressionStatement { done } => {
                self.step_expression_statement(m, fi, node, done)
            }
            Step::VariableDeclaration { index, pending } => {
                self.step_variable_declaration(m, fi, node, index, pending)
            }
            Step::If {
                done_test,
                in_branch,
            } => self.step_if(m, fi, node, done_test, in_branch),
            Step::Conditional {
                done_test,
                in_branch,
            } => self.step_conditional(m, fi, node, done_test, in_branch),
            Step::For { mode } => self.step_for(m, fi, node, mode),
            Step::While { checking } => self.step_while(m, fi, node, checking),
            Step::ForIn(state) => self.step_for_in(m, fi, node, state),
            Step::Switch {
                stage,
                discriminant,
            } => self.step_switch(m, fi, node, stage, discriminant),
            Step::Try { stage, pending } => self.step_try(m, fi, node, stage, pending),
            Step::Throw { done } => self.step_throw(m, fi, node, done),
            Step::Return { done } => self.step_return(m, fi, node, done),
            Step::Break => {
                let label = self.jump_label(node);
                self.unwind(m, Pending::Break(label))
            }
            Step::Continue => {
                let label = self.jump_label(node);
                self.unwind(m, Pending::Continue(label))
            }
            Step::With { stage } => self.step_with(m, fi, node, stage),
            Step::Labeled { entered } => self.step_labeled(m, fi, node, entered),
            Step::Noop => {
                pop_frame(m, Value::Undefined);
                Ok(())
            }
            Step::Literal => self.step_literal(m, node),
            Step::Identifier { dispatched } => self.step_identifier(m, fi, node, dispatched),
            Step::This => {
                let this = current_this(m);
                pop_frame(m, this);
                Ok(())
            }
            Step::ArrayLiteral {
                index,
                pending,
                array,
            } => self.step_array_literal(m, fi, node, index, pending, array),
            Step::ObjectLiteral { index, object } => {
                self.step_object_literal(m, fi, node, index, object)
            }
            Step::FunctionExpr => {
                let scope = current_scope(m);
                let function = self.create_function(node, scope);
                pop_frame(m, function);
                Ok(())
            }
            Step::Sequence { index } => self.step_sequence(m, fi, node, index),
            Step::Unary { stage } => self.step_unary(m, fi, node, stage),
            Step::Binary { stage, left } => self.step_binary(m, fi, node, stage, left),
            Step::Logical { stage } => self.step_logical(m, fi, node, stage),
            Step::Assignment(state) => self.step_assignment(m, fi, node, state),
            Step::Update(state) => self.step_update(m, fi, node, state),
            Step::Member(state) => self.step_member(m, fi, node, state),
            Step::Call(state) => self.step_call(m, fi, node, state),
            Step::PendingCall(state) => self.step_pending_call(m, fi, node, state),
            Step::Eval(machine) => self.step_eval(m, fi, machine),
        }
    }

    fn jump_label(&self, node: NodeId) -> Option<Box<str>> {
        match &self.ast[node].kind {
            NodeKind::BreakStatement { label } | NodeKind::ContinueStatement { label } => {
                label.clone()
            }
            _ => None,
        }
    }

    fn initial_step(&self, node: NodeId) -> Step {
        match &self.ast[node].kind {
            NodeKind::Program { .. } => Step::Program { index: 0 },
            NodeKind::BlockStatement { .. } => Step::Block { index: 0 },
            NodeKind::ExpressionStatement { .. } => Step::ExpressionStatement { done: false },
            NodeKind::VariableDeclaration { .. } => Step::VariableDeclaration {
                index: 0,
                pending: None,
            },
            NodeKind::VariableDeclarator { .. } => {
                unreachable!("declarators are driven by their declaration")
            }
            NodeKind::FunctionDeclaration(_)
            | NodeKind::EmptyStatement
            | NodeKind::DebuggerStatement => Step::Noop,
            NodeKind::IfStatement { .. } => Step::If {
                done_test: false,
                in_branch: false,
            },
            NodeKind::ConditionalExpression { .. } => Step::Conditional {
                done_test: false,
                in_branch: false,
            },
            NodeKind::ForStatement { .. } => Step::For {
                mode: ForMode::Init,
            },
            NodeKind::WhileStatement { .. } => Step::While { checking: false },
            NodeKind::DoWhileStatement { .. } => Step::While { checking: true },
            NodeKind::ForInStatement { .. } => Step::ForIn(Box::new(ForInStep {
                stage: ForInStage::Left,
                current: None,
                keys: Vec::new(),
                key_index: 0,
                key: None,
                decl_name: None,
            })),
            NodeKind::SwitchStatement { .. } => Step::Switch {
                stage: SwitchStage::Discriminant,
                discriminant: Value::Undefined,
            },
            NodeKind::TryStatement { .. } => Step::Try {
                stage: TryStage::Start,
                pending: None,
            },
            NodeKind::ThrowStatement { .. } => Step::Throw { done: false },
            NodeKind::ReturnStatement { .. } => Step::Return { done: false },
            NodeKind::BreakStatement { .. } => Step::Break,
            NodeKind::ContinueStatement { .. } => Step::Continue,
            NodeKind::WithStatement { .. } => Step::With {
                stage: WithStage::Object,
            },
            NodeKind::LabeledStatement { .. } => Step::Labeled { entered: false },
            NodeKind::Literal(_) => Step::Literal,
            NodeKind::Identifier { .. } => Step::Identifier { dispatched: false },
            NodeKind::ThisExpression => Step::This,
            NodeKind::ArrayExpression { .. } => Step::ArrayLiteral {
                index: 0,
                pending: None,
                array: None,
            },
            NodeKind::ObjectExpression { .. } => Step::ObjectLiteral {
                index: 0,
                object: None,
            },
            NodeKind::FunctionExpression(_) => Step::FunctionExpr,
            NodeKind::SequenceExpression { .. } => Step::Sequence { index: 0 },
            NodeKind::UnaryExpression { .. } => Step::Unary {
                stage: UnaryStage::Start,
            },
            NodeKind::BinaryExpression { .. } => Step::Binary {
                stage: BinStage::Start,
                left: Value::Undefined,
            },
            NodeKind::LogicalExpression { .. } => Step::Logical {
                stage: BinStage::Start,
            },
            NodeKind::AssignmentExpression { .. } => {
                Step::Assignment(Box::new(AssignmentStep {
                    stage: AssignStage::Start,
                    target: None,
                    old: Value::Undefined,
                    result: Value::Undefined,
                }))
            }
            NodeKind::UpdateExpression { .. } => Step::Update(Box::new(UpdateStep {
                stage: UpdateStage::Start,
                target: None,
                old: 0.0,
                result: 0.0,
            })),
            NodeKind::MemberExpression { .. } => Step::Member(Box::new(MemberStep {
                stage: MemberStage::Start,
                object: Value::Undefined,
            })),
            NodeKind::CallExpression { .. } => Step::Call(Box::new(CallStep {
                construct: false,
                stage: CallStage::Start,
                callee_ref: None,
                func: Value::Undefined,
                this: Value::Undefined,
                args: Vec::new(),
                arg_index: 0,
                receiver: None,
            })),
            NodeKind::NewExpression { .. } => Step::Call(Box::new(CallStep {
                construct: true,
                stage: CallStage::Start,
                callee_ref: None,
                func: Value::Undefined,
                this: Value::Undefined,
                args: Vec::new(),
                arg_index: 0,
                receiver: None,
            })),
        }
    }

    fn push_node(&mut self, m: &mut Machine, node: NodeId, components: bool) {
        let step = self.initial_step(node);
        let mut frame = Frame::new(node, step);
        frame.components = components;
        if let Step::While { checking: true } = frame.step {
            frame.value = Value::TRUE;
        }
        m.stack.push(frame);
    }

    fn push_accessor_call(
        &mut self,
        m: &mut Machine,
        node: NodeId,
        func: Value,
        this: Value,
        args: Vec<Value>,
    ) {
        m.stack.push(Frame::new(
            node,
            Step::PendingCall(Box::new(PendingCallStep {
                stage: PendingStage::Dispatch,
                func,
                this,
                args,
            })),
        ));
    }

    // References.

    /// Loads a reference's value, or reports the getter to dispatch.
    fn reference_lookup(
        &mut self,
        m: &Machine,
        reference: Reference,
    ) -> JsResult<ReferenceValue> {
        match reference {
            Reference::Name(key) => {
                let scope = current_scope(m);
                match self.lookup_name(scope, key) {
                    NameLookup::Data(value) => Ok(ReferenceValue::Plain(value)),
                    NameLookup::Getter { getter, this } => {
                        Ok(ReferenceValue::Accessor { getter, this })
                    }
                    NameLookup::Missing => {
                        let name = self.heap[key].to_string();
                        Err(self.throw_exception(
                            ExceptionType::ReferenceError,
                            &format!("{name} is not defined"),
                        ))
                    }
                }
            }
            Reference::Member(base, key) => {
                if base.is_nullish() {
                    let name = self.heap[key].to_string();
                    let kind = if base.is_null() { "null" } else { "undefined" };
                    return Err(self.throw_exception(
                        ExceptionType::TypeError,
                        &format!("Cannot read property '{name}' of {kind}"),
                    ));
                }
                match self.get_lookup(base, key) {
                    Lookup::Data(value) => Ok(ReferenceValue::Plain(value)),
                    Lookup::Getter(getter) => Ok(ReferenceValue::Accessor {
                        getter,
                        this: base,
                    }),
                    Lookup::Missing => Ok(ReferenceValue::Plain(Value::Undefined)),
                }
            }
        }
    }

    /// Stores through a reference; a returned setter is for the caller to
    /// dispatch as a synthesized call.
    fn reference_store(
        &mut self,
        m: &Machine,
        reference: Reference,
        value: Value,
    ) -> JsResult<Option<(ObjectIndex, Value)>> {
        match reference {
            Reference::Name(key) => {
                let scope = current_scope(m);
                self.set_name(scope, key, value)
            }
            Reference::Member(base, key) => {
                if base.is_nullish() {
                    let name = self.heap[key].to_string();
                    let kind = if base.is_null() { "null" } else { "undefined" };
                    return Err(self.throw_exception(
                        ExceptionType::TypeError,
                        &format!("Cannot set property '{name}' of {kind}"),
                    ));
                }
                self.assign_property(base, key, value)
            }
        }
    }

    // Statement steppers.

    fn step_program(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        index: usize,
    ) -> Result<(), MachineError> {
        let NodeKind::Program { body, .. } = &self.ast[node].kind else {
            unreachable!();
        };
        match body.get(index) {
            Some(&statement) => {
                m.stack[fi].step = Step::Program { index: index + 1 };
                self.push_node(m, statement, false);
            }
            None => {
                // The program frame stays on the stack so appendCode can
                // extend it.
                m.stack[fi].step = Step::Program { index };
                m.done = true;
            }
        }
        Ok(())
    }

    fn step_block(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        index: usize,
    ) -> Result<(), MachineError> {
        let NodeKind::BlockStatement { body } = &self.ast[node].kind else {
            unreachable!();
        };
        match body.get(index) {
            Some(&statement) => {
                m.stack[fi].step = Step::Block { index: index + 1 };
                self.push_node(m, statement, false);
            }
            None => pop_frame(m, Value::Undefined),
        }
        Ok(())
    }

    fn step_expression_statement(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        done: bool,
    ) -> Result<(), MachineError> {
        if done {
            let value = m.stack[fi].value;
            m.value = value;
            pop_frame(m, value);
            return Ok(());
        }
        let NodeKind::ExpressionStatement { expression } = &self.ast[node].kind else {
            unreachable!();
        };
        let expression = *expression;
        m.stack[fi].step = Step::ExpressionStatement { done: true };
        self.push_node(m, expression, false);
        Ok(())
    }

    fn step_variable_declaration(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut index: usize,
        pending: Option<Box<str>>,
    ) -> Result<(), MachineError> {
        if let Some(name) = pending {
            let key = self.heap.intern(&name);
            let value = m.stack[fi].value;
            let scope = current_scope(m);
            // Hoisting bound the name already; this walks to that binding.
            self.set_name(scope, key, value)?;
        }
        loop {
            let NodeKind::VariableDeclaration { declarations } = &self.ast[node].kind else {
                unreachable!();
            };
            let Some(&declarator) = declarations.get(index) else {
                pop_frame(m, Value::Undefined);
                return Ok(());
            };
            let NodeKind::VariableDeclarator { name, init } = &self.ast[declarator].kind
            else {
                unreachable!();
            };
            index += 1;
            if let Some(init) = *init {
                let name = name.clone();
                m.stack[fi].step = Step::VariableDeclaration {
                    index,
                    pending: Some(name),
                };
                self.push_node(m, init, false);
                return Ok(());
            }
        }
    }

    fn step_if(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        done_test: bool,
        in_branch: bool,
    ) -> Result<(), MachineError> {
        let NodeKind::IfStatement {
            test,
            consequent,
            alternate,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (test, consequent, alternate) = (*test, *consequent, *alternate);
        if in_branch {
            pop_frame(m, Value::Undefined);
            return Ok(());
        }
        if !done_test {
            m.stack[fi].step = Step::If {
                done_test: true,
                in_branch: false,
            };
            self.push_node(m, test, false);
            return Ok(());
        }
        let branch = if self.heap.to_boolean(m.stack[fi].value) {
            Some(consequent)
        } else {
            alternate
        };
        match branch {
            Some(branch) => {
                m.stack[fi].step = Step::If {
                    done_test: true,
                    in_branch: true,
                };
                self.push_node(m, branch, false);
            }
            None => pop_frame(m, Value::Undefined),
        }
        Ok(())
    }

    fn step_conditional(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        done_test: bool,
        in_branch: bool,
    ) -> Result<(), MachineError> {
        let NodeKind::ConditionalExpression {
            test,
            consequent,
            alternate,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (test, consequent, alternate) = (*test, *consequent, *alternate);
        if in_branch {
            let value = m.stack[fi].value;
            pop_frame(m, value);
            return Ok(());
        }
        if !done_test {
            m.stack[fi].step = Step::Conditional {
                done_test: true,
                in_branch: false,
            };
            self.push_node(m, test, false);
            return Ok(());
        }
        let branch = if self.heap.to_boolean(m.stack[fi].value) {
            consequent
        } else {
            alternate
        };
        m.stack[fi].step = Step::Conditional {
            done_test: true,
            in_branch: true,
        };
        self.push_node(m, branch, false);
        Ok(())
    }

    fn step_for(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mode: ForMode,
    ) -> Result<(), MachineError> {
        let NodeKind::ForStatement {
            init,
            test,
            update,
            body,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (init, test, update, body) = (*init, *test, *update, *body);
        match mode {
            ForMode::Init => {
                m.stack[fi].step = Step::For {
                    mode: ForMode::Test,
                };
                if let Some(init) = init {
                    self.push_node(m, init, false);
                }
            }
            ForMode::Test => {
                m.stack[fi].step = Step::For {
                    mode: ForMode::Body,
                };
                match test {
                    Some(test) => self.push_node(m, test, false),
                    None => m.stack[fi].value = Value::TRUE,
                }
            }
            ForMode::Body => {
                if self.heap.to_boolean(m.stack[fi].value) {
                    m.stack[fi].step = Step::For {
                        mode: ForMode::Update,
                    };
                    self.push_node(m, body, false);
                } else {
                    pop_frame(m, Value::Undefined);
                }
            }
            ForMode::Update => {
                m.stack[fi].step = Step::For {
                    mode: ForMode::Test,
                };
                if let Some(update) = update {
                    self.push_node(m, update, false);
                }
            }
        }
        Ok(())
    }

    fn step_while(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        checking: bool,
    ) -> Result<(), MachineError> {
        let (test, body) = match &self.ast[node].kind {
            NodeKind::WhileStatement { test, body }
            | NodeKind::DoWhileStatement { test, body } => (*test, *body),
            _ => unreachable!(),
        };
        if checking {
            if self.heap.to_boolean(m.stack[fi].value) {
                m.stack[fi].step = Step::While { checking: false };
                self.push_node(m, body, false);
            } else {
                pop_frame(m, Value::Undefined);
            }
        } else {
            m.stack[fi].step = Step::While { checking: true };
            self.push_node(m, test, false);
        }
        Ok(())
    }

    fn step_for_in(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<ForInStep>,
    ) -> Result<(), MachineError> {
        let NodeKind::ForInStatement { left, right, body } = &self.ast[node].kind else {
            unreachable!();
        };
        let (left, right, body) = (*left, *right, *body);
        loop {
            match state.stage {
                ForInStage::Left => {
                    state.stage = ForInStage::Object;
                    if let NodeKind::VariableDeclaration { declarations } =
                        &self.ast[left].kind
                    {
                        let NodeKind::VariableDeclarator { name, init } =
                            &self.ast[declarations[0]].kind
                        else {
                            unreachable!();
                        };
                        let name = name.clone();
                        let has_init = init.is_some();
                        state.decl_name = Some(self.heap.intern(&name));
                        // `for (var x = init in o)` runs the initializer
                        // once before iteration.
                        if has_init {
                            m.stack[fi].step = Step::ForIn(state);
                            self.push_node(m, left, false);
                            return Ok(());
                        }
                    }
                }
                ForInStage::Object => {
                    state.stage = ForInStage::NextKey;
                    state.current = None;
                    m.stack[fi].step = Step::ForIn(state);
                    self.push_node(m, right, false);
                    return Ok(());
                }
                ForInStage::NextKey => {
                    if state.current.is_none() {
                        // First entry after the object expression settled.
                        let Some(object) = m.stack[fi].value.as_object() else {
                            pop_frame(m, Value::Undefined);
                            return Ok(());
                        };
                        state.current = Some(object);
                        state.keys = self.own_enumerable_keys(object);
                        state.key_index = 0;
                    }
                    let current = state.current.expect("for-in cursor");
                    if state.key_index >= state.keys.len() {
                        // Own keys exhausted: walk to the prototype and
                        // keep enumerating.
                        match self.heap.prototype_of(Value::Object(current)) {
                            Some(prototype) => {
                                state.current = Some(prototype);
                                state.keys = self.own_enumerable_keys(prototype);
                                state.key_index = 0;
                                continue;
                            }
                            None => {
                                pop_frame(m, Value::Undefined);
                                return Ok(());
                            }
                        }
                    }
                    let key = state.keys[state.key_index];
                    state.key_index += 1;
                    // A key deleted mid-loop is skipped.
                    let data = &self.heap[current];
                    if !data.has_own(key) || data.not_enumerable.contains(&key) {
                        continue;
                    }
                    state.key = Some(key);
                    if let Some(name) = state.decl_name {
                        let value = Value::String(key);
                        let setter = self.set_name(current_scope(m), name, value)?;
                        if let Some((setter, this)) = setter {
                            state.stage = ForInStage::AfterPut;
                            m.stack[fi].step = Step::ForIn(state);
                            self.push_accessor_call(
                                m,
                                node,
                                Value::Object(setter),
                                this,
                                vec![value],
                            );
                        } else {
                            state.stage = ForInStage::Body;
                            m.stack[fi].step = Step::ForIn(state);
                            self.push_node(m, body, false);
                        }
                        return Ok(());
                    }
                    state.stage = ForInStage::Target;
                    m.stack[fi].step = Step::ForIn(state);
                    self.push_node(m, left, true);
                    return Ok(());
                }
                ForInStage::Target => {
                    let key = state.key.expect("for-in key");
                    let value = Value::String(key);
                    let reference = m.stack[fi]
                        .reference
                        .take()
                        .expect("for-in target must yield a reference");
                    let setter = self.reference_store(m, reference, value)?;
                    if let Some((setter, this)) = setter {
                        state.stage = ForInStage::AfterPut;
                        m.stack[fi].step = Step::ForIn(state);
                        self.push_accessor_call(
                            m,
                            node,
                            Value::Object(setter),
                            this,
                            vec![value],
                        );
                    } else {
                        state.stage = ForInStage::Body;
                        m.stack[fi].step = Step::ForIn(state);
                        self.push_node(m, body, false);
                    }
                    return Ok(());
                }
                ForInStage::AfterPut => {
                    state.stage = ForInStage::Body;
                    m.stack[fi].step = Step::ForIn(state);
                    self.push_node(m, body, false);
                    return Ok(());
                }
                ForInStage::Body => {
                    state.stage = ForInStage::NextKey;
                }
            }
        }
    }

    fn step_switch(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        stage: SwitchStage,
        discriminant_value: Value,
    ) -> Result<(), MachineError> {
        let (discriminant, case_count) = {
            let NodeKind::SwitchStatement {
                discriminant,
                cases,
            } = &self.ast[node].kind
            else {
                unreachable!();
            };
            (*discriminant, cases.len())
        };
        match stage {
            SwitchStage::Discriminant => {
                m.stack[fi].step = Step::Switch {
                    stage: SwitchStage::Find { case_index: 0 },
                    discriminant: Value::Undefined,
                };
                self.push_node(m, discriminant, false);
                Ok(())
            }
            SwitchStage::Find { mut case_index } => {
                let switch_value = if case_index == 0 {
                    m.stack[fi].value
                } else {
                    discriminant_value
                };
                loop {
                    if case_index >= case_count {
                        // No match: run from the default clause if any.
                        let NodeKind::SwitchStatement { cases, .. } = &self.ast[node].kind
                        else {
                            unreachable!();
                        };
                        match cases.iter().position(|case| case.test.is_none()) {
                            Some(default_index) => {
                                m.stack[fi].step = Step::Switch {
                                    stage: SwitchStage::Run {
                                        case_index: default_index,
                                        stmt_index: 0,
                                    },
                                    discriminant: switch_value,
                                };
                            }
                            None => pop_frame(m, Value::Undefined),
                        }
                        return Ok(());
                    }
                    let NodeKind::SwitchStatement { cases, .. } = &self.ast[node].kind else {
                        unreachable!();
                    };
                    match cases[case_index].test {
                        Some(test) => {
                            m.stack[fi].step = Step::Switch {
                                stage: SwitchStage::Test { case_index },
                                discriminant: switch_value,
                            };
                            self.push_node(m, test, false);
                            return Ok(());
                        }
                        None => case_index += 1,
                    }
                }
            }
            SwitchStage::Test { case_index } => {
                let matched = self
                    .heap
                    .strictly_equal(discriminant_value, m.stack[fi].value);
                let stage = if matched {
                    SwitchStage::Run {
                        case_index,
                        stmt_index: 0,
                    }
                } else {
                    SwitchStage::Find {
                        case_index: case_index + 1,
                    }
                };
                m.stack[fi].step = Step::Switch {
                    stage,
                    discriminant: discriminant_value,
                };
                Ok(())
            }
            SwitchStage::Run {
                mut case_index,
                mut stmt_index,
            } => {
                // Fallthrough: once matched, every consequent of every
                // subsequent case runs until a break unwinds the switch.
                loop {
                    if case_index >= case_count {
                        pop_frame(m, Value::Undefined);
                        return Ok(());
                    }
                    let NodeKind::SwitchStatement { cases, .. } = &self.ast[node].kind else {
                        unreachable!();
                    };
                    match cases[case_index].consequent.get(stmt_index) {
                        Some(&statement) => {
                            m.stack[fi].step = Step::Switch {
                                stage: SwitchStage::Run {
                                    case_index,
                                    stmt_index: stmt_index + 1,
                                },
                                discriminant: discriminant_value,
                            };
                            self.push_node(m, statement, false);
                            return Ok(());
                        }
                        None => {
                            case_index += 1;
                            stmt_index = 0;
                        }
                    }
                }
            }
        }
    }

    fn step_try(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        stage: TryStage,
        pending: Option<Pending>,
    ) -> Result<(), MachineError> {
        let NodeKind::TryStatement {
            block, finalizer, ..
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let block = *block;
        let finalizer = *finalizer;
        match stage {
            TryStage::Start => {
                m.stack[fi].step = Step::Try {
                    stage: TryStage::Block,
                    pending,
                };
                self.push_node(m, block, false);
                Ok(())
            }
            // The block or the handler completed normally.
            TryStage::Block | TryStage::Handler => match finalizer {
                Some(finalizer) => {
                    m.stack[fi].step = Step::Try {
                        stage: TryStage::Finalizer,
                        pending,
                    };
                    self.push_node(m, finalizer, false);
                    Ok(())
                }
                None => {
                    pop_frame(m, Value::Undefined);
                    Ok(())
                }
            },
            // The finalizer completed; resume whatever transfer it
            // interrupted.
            TryStage::Finalizer => match pending {
                Some(pending) => {
                    m.stack.truncate(fi);
                    settle_pop(m);
                    self.unwind(m, pending)
                }
                None => {
                    pop_frame(m, Value::Undefined);
                    Ok(())
                }
            },
        }
    }

    fn step_throw(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        done: bool,
    ) -> Result<(), MachineError> {
        if done {
            let value = m.stack[fi].value;
            return Err(MachineError::Thrown(value));
        }
        let NodeKind::ThrowStatement { argument } = &self.ast[node].kind else {
            unreachable!();
        };
        let argument = *argument;
        m.stack[fi].step = Step::Throw { done: true };
        self.push_node(m, argument, false);
        Ok(())
    }

    fn step_return(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        done: bool,
    ) -> Result<(), MachineError> {
        let NodeKind::ReturnStatement { argument } = &self.ast[node].kind else {
            unreachable!();
        };
        let argument = *argument;
        match (done, argument) {
            (false, Some(argument)) => {
                m.stack[fi].step = Step::Return { done: true };
                self.push_node(m, argument, false);
                Ok(())
            }
            (true, _) => {
                let value = m.stack[fi].value;
                self.unwind(m, Pending::Return(value))
            }
            (false, None) => self.unwind(m, Pending::Return(Value::Undefined)),
        }
    }

    fn step_with(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        stage: WithStage,
    ) -> Result<(), MachineError> {
        let NodeKind::WithStatement { object, body } = &self.ast[node].kind else {
            unreachable!();
        };
        let (object, body) = (*object, *body);
        match stage {
            WithStage::Object => {
                m.stack[fi].step = Step::With {
                    stage: WithStage::Body,
                };
                self.push_node(m, object, false);
            }
            WithStage::Body => {
                let target = m.stack[fi].value;
                let target = self.to_object(target)?;
                let scope = self.create_with_scope(current_scope(m), target);
                m.stack[fi].step = Step::With {
                    stage: WithStage::Done,
                };
                m.stack[fi].scope = Some(scope);
                self.push_node(m, body, false);
            }
            WithStage::Done => pop_frame(m, Value::Undefined),
        }
        Ok(())
    }

    fn step_labeled(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        entered: bool,
    ) -> Result<(), MachineError> {
        if entered {
            pop_frame(m, Value::Undefined);
            return Ok(());
        }
        let NodeKind::LabeledStatement { label, body } = &self.ast[node].kind else {
            unreachable!();
        };
        let label = label.clone();
        let body = *body;
        m.stack[fi].step = Step::Labeled { entered: true };
        self.push_node(m, body, false);
        m.stack.last_mut().expect("frame just pushed").label = Some(label);
        Ok(())
    }

    // Expression steppers.

    fn step_literal(&mut self, m: &mut Machine, node: NodeId) -> Result<(), MachineError> {
        let NodeKind::Literal(literal) = &self.ast[node].kind else {
            unreachable!();
        };
        let value = match literal {
            Literal::Null => Value::Null,
            Literal::Boolean(value) => Value::from_bool(*value),
            Literal::Number(value) => Value::Number(*value),
            Literal::String(text) => {
                let text = text.clone();
                self.heap.string_value(&text)
            }
            Literal::RegExp { pattern, flags } => {
                let (pattern, flags) = (pattern.clone(), *flags);
                self.create_regexp(&pattern, flags)
            }
        };
        pop_frame(m, value);
        Ok(())
    }

    fn step_identifier(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        dispatched: bool,
    ) -> Result<(), MachineError> {
        if dispatched {
            let value = m.stack[fi].value;
            pop_frame(m, value);
            return Ok(());
        }
        let NodeKind::Identifier { name } = &self.ast[node].kind else {
            unreachable!();
        };
        let name = name.clone();
        let key = self.heap.intern(&name);
        if m.stack[fi].components {
            pop_frame_reference(m, Reference::Name(key));
            return Ok(());
        }
        match self.reference_lookup(m, Reference::Name(key))? {
            ReferenceValue::Plain(value) => pop_frame(m, value),
            ReferenceValue::Accessor { getter, this } => {
                m.stack[fi].step = Step::Identifier { dispatched: true };
                self.push_accessor_call(m, node, Value::Object(getter), this, Vec::new());
            }
        }
        Ok(())
    }

    fn step_array_literal(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut index: usize,
        pending: Option<usize>,
        array: Option<ObjectIndex>,
    ) -> Result<(), MachineError> {
        let array = match array {
            Some(array) => array,
            None => self.heap.create_array(),
        };
        if let Some(position) = pending {
            let value = m.stack[fi].value;
            let key = self.heap.intern(&position.to_string());
            self.heap[array].insert(key, value);
        }
        loop {
            let (total, slot) = {
                let NodeKind::ArrayExpression { elements } = &self.ast[node].kind else {
                    unreachable!();
                };
                (elements.len(), elements.get(index).copied())
            };
            match slot {
                None => {
                    // Elisions still count toward length.
                    self.heap[array].length = Some(total as u32);
                    pop_frame(m, Value::Object(array));
                    return Ok(());
                }
                Some(None) => index += 1,
                Some(Some(element)) => {
                    m.stack[fi].step = Step::ArrayLiteral {
                        index: index + 1,
                        pending: Some(index),
                        array: Some(array),
                    };
                    self.push_node(m, element, false);
                    return Ok(());
                }
            }
        }
    }

    fn step_object_literal(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        index: usize,
        object: Option<ObjectIndex>,
    ) -> Result<(), MachineError> {
        let object = match object {
            Some(object) => object,
            None => {
                let constructor = self.heap.intrinsics.object;
                self.heap.create_object(Some(constructor))
            }
        };
        if index > 0 {
            // Install the property whose value just settled. Accessor
            // kinds merge per key so a getter/setter pair both survive.
            let (kind, key) = {
                let NodeKind::ObjectExpression { properties } = &self.ast[node].kind else {
                    unreachable!();
                };
                let property = &properties[index - 1];
                (property.kind, property.key.clone())
            };
            let key = self.heap.intern(&key);
            let value = m.stack[fi].value;
            let data = &mut self.heap[object];
            match kind {
                PropertyKind::Init => {
                    data.getter.remove(&key);
                    data.setter.remove(&key);
                    data.insert(key, value);
                }
                PropertyKind::Get => {
                    if let Some(getter) = value.as_object() {
                        data.insert(key, Value::Undefined);
                        data.getter.insert(key, getter);
                    }
                }
                PropertyKind::Set => {
                    if let Some(setter) = value.as_object() {
                        data.insert(key, Value::Undefined);
                        data.setter.insert(key, setter);
                    }
                }
            }
        }
        let next = {
            let NodeKind::ObjectExpression { properties } = &self.ast[node].kind else {
                unreachable!();
            };
            properties.get(index).map(|property| property.value)
        };
        match next {
            Some(value) => {
                m.stack[fi].step = Step::ObjectLiteral {
                    index: index + 1,
                    object: Some(object),
                };
                self.push_node(m, value, false);
            }
            None => pop_frame(m, Value::Object(object)),
        }
        Ok(())
    }

    fn step_sequence(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        index: usize,
    ) -> Result<(), MachineError> {
        let NodeKind::SequenceExpression { expressions } = &self.ast[node].kind else {
            unreachable!();
        };
        match expressions.get(index) {
            Some(&expression) => {
                m.stack[fi].step = Step::Sequence { index: index + 1 };
                self.push_node(m, expression, false);
            }
            None => {
                let value = m.stack[fi].value;
                pop_frame(m, value);
            }
        }
        Ok(())
    }

    fn step_unary(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        stage: UnaryStage,
    ) -> Result<(), MachineError> {
        let NodeKind::UnaryExpression { operator, argument } = &self.ast[node].kind else {
            unreachable!();
        };
        let (operator, argument) = (*operator, *argument);
        match stage {
            UnaryStage::Start => {
                let wants_reference = matches!(operator, UnaryOp::Typeof | UnaryOp::Delete);
                m.stack[fi].step = Step::Unary {
                    stage: UnaryStage::Operand,
                };
                self.push_node(m, argument, wants_reference);
                Ok(())
            }
            UnaryStage::Operand => {
                let reference = m.stack[fi].reference.take();
                let value = m.stack[fi].value;
                match operator {
                    UnaryOp::Typeof => self.unary_typeof(m, fi, node, reference, value),
                    UnaryOp::Delete => {
                        let strict = self.scope_strict(current_scope(m));
                        let result = match reference {
                            Some(Reference::Member(base, key)) => {
                                self.delete_property(base, key, strict)?
                            }
                            Some(Reference::Name(key)) => self.delete_binding(m, key)?,
                            None => true,
                        };
                        pop_frame(m, Value::from_bool(result));
                        Ok(())
                    }
                    UnaryOp::Minus => {
                        let result = -self.heap.to_number(value);
                        pop_frame(m, Value::Number(result));
                        Ok(())
                    }
                    UnaryOp::Plus => {
                        let result = self.heap.to_number(value);
                        pop_frame(m, Value::Number(result));
                        Ok(())
                    }
                    UnaryOp::Not => {
                        let result = !self.heap.to_boolean(value);
                        pop_frame(m, Value::from_bool(result));
                        Ok(())
                    }
                    UnaryOp::BitNot => {
                        let result = !to_int32(self.heap.to_number(value));
                        pop_frame(m, Value::Number(result as f64));
                        Ok(())
                    }
                    UnaryOp::Void => {
                        pop_frame(m, Value::Undefined);
                        Ok(())
                    }
                }
            }
            UnaryStage::Dispatched => {
                // Getter result of a typeof operand.
                let value = m.stack[fi].value;
                let result = self.heap.type_of(value);
                let result = self.heap.string_value(result);
                pop_frame(m, result);
                Ok(())
            }
        }
    }

    /// `typeof` resolves a bare unbound name to `"undefined"` instead of
    /// throwing.
    fn unary_typeof(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        reference: Option<Reference>,
        value: Value,
    ) -> Result<(), MachineError> {
        let looked_up = match reference {
            Some(Reference::Name(key)) => {
                let scope = current_scope(m);
                match self.lookup_name(scope, key) {
                    NameLookup::Data(value) => ReferenceValue::Plain(value),
                    NameLookup::Getter { getter, this } => {
                        ReferenceValue::Accessor { getter, this }
                    }
                    NameLookup::Missing => {
                        let result = self.heap.string_value("undefined");
                        pop_frame(m, result);
                        return Ok(());
                    }
                }
            }
            Some(reference @ Reference::Member(..)) => self.reference_lookup(m, reference)?,
            None => ReferenceValue::Plain(value),
        };
        match looked_up {
            ReferenceValue::Plain(value) => {
                let result = self.heap.type_of(value);
                let result = self.heap.string_value(result);
                pop_frame(m, result);
            }
            ReferenceValue::Accessor { getter, this } => {
                m.stack[fi].step = Step::Unary {
                    stage: UnaryStage::Dispatched,
                };
                self.push_accessor_call(m, node, Value::Object(getter), this, Vec::new());
            }
        }
        Ok(())
    }

    fn delete_binding(&mut self, m: &Machine, key: StringIndex) -> JsResult<bool> {
        let mut current = Some(current_scope(m));
        while let Some(scope) = current {
            let data = &self.heap[scope];
            if data.has_own(key) {
                if data.not_configurable.contains(&key) {
                    return Ok(false);
                }
                self.heap[scope].remove(key);
                return Ok(true);
            }
            current = data.scope.and_then(|s| s.parent_scope);
        }
        Ok(true)
    }

    fn step_binary(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        stage: BinStage,
        left: Value,
    ) -> Result<(), MachineError> {
        let NodeKind::BinaryExpression {
            operator,
            left: left_node,
            right,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (operator, left_node, right) = (*operator, *left_node, *right);
        match stage {
            BinStage::Start => {
                m.stack[fi].step = Step::Binary {
                    stage: BinStage::Left,
                    left,
                };
                self.push_node(m, left_node, false);
            }
            BinStage::Left => {
                m.stack[fi].step = Step::Binary {
                    stage: BinStage::Right,
                    left: m.stack[fi].value,
                };
                self.push_node(m, right, false);
            }
            BinStage::Right => {
                let right_value = m.stack[fi].value;
                let result = self.binary_operation(operator, left, right_value)?;
                pop_frame(m, result);
            }
        }
        Ok(())
    }

    fn step_logical(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        stage: BinStage,
    ) -> Result<(), MachineError> {
        let NodeKind::LogicalExpression {
            operator,
            left,
            right,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (operator, left, right) = (*operator, *left, *right);
        match stage {
            BinStage::Start => {
                m.stack[fi].step = Step::Logical {
                    stage: BinStage::Left,
                };
                self.push_node(m, left, false);
            }
            BinStage::Left => {
                let value = m.stack[fi].value;
                let truthy = self.heap.to_boolean(value);
                let short_circuit = match operator {
                    LogicalOp::And => !truthy,
                    LogicalOp::Or => truthy,
                };
                if short_circuit {
                    pop_frame(m, value);
                } else {
                    m.stack[fi].step = Step::Logical {
                        stage: BinStage::Right,
                    };
                    self.push_node(m, right, false);
                }
            }
            BinStage::Right => {
                let value = m.stack[fi].value;
                pop_frame(m, value);
            }
        }
        Ok(())
    }

    /// ### [11.5–11.9 Binary Operators](https://262.ecma-international.org/5.1/#sec-11.5)
    fn binary_operation(&mut self, op: BinaryOp, a: Value, b: Value) -> JsResult<Value> {
        Ok(match op {
            BinaryOp::Add => {
                let a = self.heap.to_primitive(a);
                let b = self.heap.to_primitive(b);
                if a.is_string() || b.is_string() {
                    let text =
                        format!("{}{}", self.heap.to_string(a), self.heap.to_string(b));
                    self.heap.string_value(&text)
                } else {
                    Value::Number(self.heap.to_number(a) + self.heap.to_number(b))
                }
            }
            BinaryOp::Subtract => {
                Value::Number(self.heap.to_number(a) - self.heap.to_number(b))
            }
            BinaryOp::Multiply => {
                Value::Number(self.heap.to_number(a) * self.heap.to_number(b))
            }
            BinaryOp::Divide => Value::Number(self.heap.to_number(a) / self.heap.to_number(b)),
            BinaryOp::Remainder => {
                Value::Number(self.heap.to_number(a) % self.heap.to_number(b))
            }
            BinaryOp::ShiftLeft => {
                let shift = to_uint32(self.heap.to_number(b)) & 31;
                Value::Number((to_int32(self.heap.to_number(a)) << shift) as f64)
            }
            BinaryOp::ShiftRight => {
                let shift = to_uint32(self.heap.to_number(b)) & 31;
                Value::Number((to_int32(self.heap.to_number(a)) >> shift) as f64)
            }
            BinaryOp::ShiftRightUnsigned => {
                let shift = to_uint32(self.heap.to_number(b)) & 31;
                Value::Number((to_uint32(self.heap.to_number(a)) >> shift) as f64)
            }
            BinaryOp::BitOr => Value::Number(
                (to_int32(self.heap.to_number(a)) | to_int32(self.heap.to_number(b))) as f64,
            ),
            BinaryOp::BitXor => Value::Number(
                (to_int32(self.heap.to_number(a)) ^ to_int32(self.heap.to_number(b))) as f64,
            ),
            BinaryOp::BitAnd => Value::Number(
                (to_int32(self.heap.to_number(a)) & to_int32(self.heap.to_number(b))) as f64,
            ),
            BinaryOp::Equals => Value::from_bool(self.heap.loosely_equal(a, b)),
            BinaryOp::NotEquals => Value::from_bool(!self.heap.loosely_equal(a, b)),
            BinaryOp::StrictEquals => Value::from_bool(self.heap.strictly_equal(a, b)),
            BinaryOp::StrictNotEquals => Value::from_bool(!self.heap.strictly_equal(a, b)),
            BinaryOp::LessThan => {
                Value::from_bool(self.heap.compare(a, b) == Some(std::cmp::Ordering::Less))
            }
            BinaryOp::LessEqual => Value::from_bool(matches!(
                self.heap.compare(a, b),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            )),
            BinaryOp::GreaterThan => Value::from_bool(
                self.heap.compare(a, b) == Some(std::cmp::Ordering::Greater),
            ),
            BinaryOp::GreaterEqual => Value::from_bool(matches!(
                self.heap.compare(a, b),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            )),
            BinaryOp::In => {
                if !b.is_object() {
                    return Err(self.throw_exception(
                        ExceptionType::TypeError,
                        "Cannot use 'in' operator to search in a non-object",
                    ));
                }
                let key = self.heap.to_string_value(a);
                Value::from_bool(self.has_property(b, key))
            }
            BinaryOp::Instanceof => Value::from_bool(self.instance_of(a, b)?),
        })
    }

    fn step_assignment(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<AssignmentStep>,
    ) -> Result<(), MachineError> {
        let NodeKind::AssignmentExpression {
            operator,
            left,
            right,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (operator, left, right) = (*operator, *left, *right);
        let AssignOp(compound) = operator;
        match state.stage {
            AssignStage::Start => {
                state.stage = AssignStage::Left;
                m.stack[fi].step = Step::Assignment(state);
                self.push_node(m, left, true);
                Ok(())
            }
            AssignStage::Left => {
                let reference = m.stack[fi]
                    .reference
                    .take()
                    .expect("assignment target must yield a reference");
                state.target = Some(reference);
                if compound.is_some() {
                    match self.reference_lookup(m, reference)? {
                        ReferenceValue::Plain(old) => {
                            state.old = old;
                            state.stage = AssignStage::Right;
                            m.stack[fi].step = Step::Assignment(state);
                            self.push_node(m, right, false);
                        }
                        ReferenceValue::Accessor { getter, this } => {
                            state.stage = AssignStage::LoadOld;
                            m.stack[fi].step = Step::Assignment(state);
                            self.push_accessor_call(
                                m,
                                node,
                                Value::Object(getter),
                                this,
                                Vec::new(),
                            );
                        }
                    }
                } else {
                    state.stage = AssignStage::Right;
                    m.stack[fi].step = Step::Assignment(state);
                    self.push_node(m, right, false);
                }
                Ok(())
            }
            AssignStage::LoadOld => {
                state.old = m.stack[fi].value;
                state.stage = AssignStage::Right;
                m.stack[fi].step = Step::Assignment(state);
                self.push_node(m, right, false);
                Ok(())
            }
            AssignStage::Right => {
                let rhs = m.stack[fi].value;
                let result = match compound {
                    Some(op) => self.binary_operation(op, state.old, rhs)?,
                    None => rhs,
                };
                let target = state.target.expect("target settled in Left stage");
                match self.reference_store(m, target, result)? {
                    Some((setter, this)) => {
                        state.result = result;
                        state.stage = AssignStage::Setter;
                        m.stack[fi].step = Step::Assignment(state);
                        self.push_accessor_call(
                            m,
                            node,
                            Value::Object(setter),
                            this,
                            vec![result],
                        );
                    }
                    None => pop_frame(m, result),
                }
                Ok(())
            }
            AssignStage::Setter => {
                // The setter's return value is discarded in favor of the
                // stored right-hand side.
                let result = state.result;
                pop_frame(m, result);
                Ok(())
            }
        }
    }

    fn step_update(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<UpdateStep>,
    ) -> Result<(), MachineError> {
        let NodeKind::UpdateExpression {
            operator,
            prefix,
            argument,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (operator, prefix, argument) = (*operator, *prefix, *argument);
        match state.stage {
            UpdateStage::Start => {
                state.stage = UpdateStage::Target;
                m.stack[fi].step = Step::Update(state);
                self.push_node(m, argument, true);
                Ok(())
            }
            UpdateStage::Target => {
                let reference = m.stack[fi]
                    .reference
                    .take()
                    .expect("update target must yield a reference");
                state.target = Some(reference);
                match self.reference_lookup(m, reference)? {
                    ReferenceValue::Plain(old) => {
                        self.finish_update(m, fi, node, state, operator, prefix, old)
                    }
                    ReferenceValue::Accessor { getter, this } => {
                        state.stage = UpdateStage::Load;
                        m.stack[fi].step = Step::Update(state);
                        self.push_accessor_call(
                            m,
                            node,
                            Value::Object(getter),
                            this,
                            Vec::new(),
                        );
                        Ok(())
                    }
                }
            }
            UpdateStage::Load => {
                let old = m.stack[fi].value;
                self.finish_update(m, fi, node, state, operator, prefix, old)
            }
            UpdateStage::Setter => {
                let result = if prefix { state.result } else { state.old };
                pop_frame(m, Value::Number(result));
                Ok(())
            }
        }
    }

    fn finish_update(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<UpdateStep>,
        operator: UpdateOp,
        prefix: bool,
        old: Value,
    ) -> Result<(), MachineError> {
        let old = self.heap.to_number(old);
        let new = match operator {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        state.old = old;
        state.result = new;
        let target = state.target.expect("target settled before update");
        match self.reference_store(m, target, Value::Number(new))? {
            Some((setter, this)) => {
                state.stage = UpdateStage::Setter;
                m.stack[fi].step = Step::Update(state);
                self.push_accessor_call(
                    m,
                    node,
                    Value::Object(setter),
                    this,
                    vec![Value::Number(new)],
                );
            }
            None => {
                let result = if prefix { new } else { old };
                pop_frame(m, Value::Number(result));
            }
        }
        Ok(())
    }

    fn step_member(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<MemberStep>,
    ) -> Result<(), MachineError> {
        let NodeKind::MemberExpression {
            object,
            property,
            computed,
        } = &self.ast[node].kind
        else {
            unreachable!();
        };
        let (object, property, computed) = (*object, *property, *computed);
        match state.stage {
            MemberStage::Start => {
                state.stage = MemberStage::Object;
                m.stack[fi].step = Step::Member(state);
                self.push_node(m, object, false);
                Ok(())
            }
            MemberStage::Object => {
                state.object = m.stack[fi].value;
                if computed {
                    state.stage = MemberStage::Key;
                    m.stack[fi].step = Step::Member(state);
                    self.push_node(m, property, false);
                    return Ok(());
                }
                let NodeKind::Identifier { name } = &self.ast[property].kind else {
                    unreachable!("static member property is an identifier");
                };
                let name = name.clone();
                let key = self.heap.intern(&name);
                self.resolve_member(m, fi, node, state, key)
            }
            MemberStage::Key => {
                let key_value = m.stack[fi].value;
                let key = self.heap.to_string_value(key_value);
                self.resolve_member(m, fi, node, state, key)
            }
            MemberStage::Getter => {
                let value = m.stack[fi].value;
                pop_frame(m, value);
                Ok(())
            }
        }
    }

    fn resolve_member(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<MemberStep>,
        key: StringIndex,
    ) -> Result<(), MachineError> {
        let base = state.object;
        if m.stack[fi].components {
            pop_frame_reference(m, Reference::Member(base, key));
            return Ok(());
        }
        match self.reference_lookup(m, Reference::Member(base, key))? {
            ReferenceValue::Plain(value) => {
                pop_frame(m, value);
                Ok(())
            }
            ReferenceValue::Accessor { getter, this } => {
                state.stage = MemberStage::Getter;
                m.stack[fi].step = Step::Member(state);
                self.push_accessor_call(m, node, Value::Object(getter), this, Vec::new());
                Ok(())
            }
        }
    }

    // Calls.

    fn step_call(
        &mut self,
        m: &mut Machine,
        fi: usize,
        node: NodeId,
        mut state: Box<CallStep>,
    ) -> Result<(), MachineError> {
        match state.stage {
            CallStage::Start => {
                let callee = match &self.ast[node].kind {
                    NodeKind::CallExpression { callee, .. }
                    | NodeKind::NewExpression { callee, .. } => *callee,
                    _ => unreachable!(),
                };
                state.stage = CallStage::Callee;
                m.stack[fi].step = Step::Call(state);
                // The callee is evaluated as a reference to capture the
                // receiver of method calls.
                self.push_node(m, callee, true);
                Ok(())
            }
            CallStage::Callee => {
                match m.stack[fi].reference.take() {
                    Some(reference) => {
                        state.callee_ref = Some(reference);
                        if let Reference::Member(base, _) = reference {
                            state.this = base;
                        }
                        match self.reference_lookup(m, reference)? {
                            ReferenceValue::Plain(func) => {
                                state.func = func;
                                state.stage = CallStage::Args;
                                m.stack[fi].step = Step::Call(state);
                            }
                            ReferenceValue::Accessor { getter, this } => {
                                state.stage = CallStage::CalleeGetter;
                                m.stack[fi].step = Step::Call(state);
                                self.push_accessor_call(
                                    m,
                                    node,
                                    Value::Object(getter),
                                    this,
                                    Vec::new(),
                                );
                            }
                        }
                    }
                    None => {
                        state.func = m.stack[fi].value;
                        state.stage = CallStage::Args;
                        m.stack[fi].step = Step::Call(state);
                    }
                }
                Ok(())
            }
            CallStage::CalleeGetter => {
                state.func = m.stack[fi].value;
                state.stage = CallStage::Args;
                m.stack[fi].step = Step::Call(state);
                Ok(())
            }
            CallStage::Args => {
                if state.arg_index > 0 {
                    state.args.push(m.stack[fi].value);
                }
                let argument = {
                    let arguments = match &self.ast[node].kind {
                        NodeKind::CallExpression { arguments, .. }
                        | NodeKind::NewExpression { arguments, .. } => arguments,
                        _ => unreachable!(),
                    };
                    arguments.get(state.arg_index).copied()
                };
                match argument {
                    Some(argument) => {
                        state.arg_index += 1;
                        m.stack[fi].step = Step::Call(state);
                        self.push_node(m, argument, false);
                    }
                    None => {
                        state.stage = CallStage::Dispatch;
                        m.stack[fi].step = Step::Call(state);
                    }
                }
                Ok(())
            }
            CallStage::Dispatch => {
                if state.construct {
                    let callee = state
                        .func
                        .as_object()
                        .filter(|callee| self.heap[*callee].is_function());
                    let Some(callee) = callee else {
                        let name = self.callee_name(&state);
                        return Err(self
                            .throw_exception(
                                ExceptionType::TypeError,
                                &format!("{name} is not a constructor"),
                            )
                            .into());
                    };
                    // The receiver's parent is the callee itself.
                    let receiver = Value::Object(self.heap.create_object(Some(callee)));
                    state.receiver = Some(receiver);
                    state.this = receiver;
                }
                let func = state.func;
                let this = state.this;
                let args = mem::take(&mut state.args);
                match self.invoke_function(m, func, this, args)? {
                    Invoke::Done(value) => {
                        let value = construct_result(&state, value);
                        pop_frame(m, value);
                    }
                    Invoke::Pushed => {
                        state.stage = CallStage::Exec;
                        m.stack[fi].step = Step::Call(state);
                    }
                    Invoke::Eval(machine) => {
                        m.stack[fi].step = Step::Eval(machine);
                    }
                    Invoke::Parked => {
                        state.stage = CallStage::Await;
                        m.stack[fi].step = Step::Call(state);
                    }
                }
                Ok(())
            }
            CallStage::Exec => {
                let value = m.stack[fi].value;
                let value = construct_result(&state, value);
                pop_frame(m, value);
                Ok(())
            }
            CallStage::Await => match self.mailbox.take() {
                Some(Ok(value)) => {
                    let value = construct_result(&state, value);
                    pop_frame(m, value);
                    Ok(())
                }
                Some(Err(error)) => Err(MachineError::Thrown(error)),
                None => {
                    // The host called back in before resolution; park
                    // again.
                    self.paused.set(true);
                    m.stack[fi].step = Step::Call(state);
                    Ok(())
                }
            },
        }
    }

    fn callee_name(&self, state: &CallStep) -> String {
        match state.callee_ref {
            Some(Reference::Name(key)) | Some(Reference::Member(_, key)) => {
                self.heap[key].to_string()
            }
            None => "expression".to_string(),
        }
    }

    fn step_pending_call(
        &mut self,
        m: &mut Machine,
        fi: usize,
        _node: NodeId,
        mut state: Box<PendingCallStep>,
    ) -> Result<(), MachineError> {
        match state.stage {
            PendingStage::Dispatch => {
                let func = state.func;
                let this = state.this;
                let args = mem::take(&mut state.args);
                match self.invoke_function(m, func, this, args)? {
                    Invoke::Done(value) => pop_frame(m, value),
                    Invoke::Pushed => {
                        state.stage = PendingStage::Exec;
                        m.stack[fi].step = Step::PendingCall(state);
                    }
                    Invoke::Eval(machine) => {
                        m.stack[fi].step = Step::Eval(machine);
                    }
                    Invoke::Parked => {
                        state.stage = PendingStage::Await;
                        m.stack[fi].step = Step::PendingCall(state);
                    }
                }
                Ok(())
            }
            PendingStage::Exec => {
                let value = m.stack[fi].value;
                pop_frame(m, value);
                Ok(())
            }
            PendingStage::Await => match self.mailbox.take() {
                Some(Ok(value)) => {
                    pop_frame(m, value);
                    Ok(())
                }
                Some(Err(error)) => Err(MachineError::Thrown(error)),
                None => {
                    self.paused.set(true);
                    m.stack[fi].step = Step::PendingCall(state);
                    Ok(())
                }
            },
        }
    }

    /// Dispatches a resolved function with resolved arguments: unwraps
    /// bound functions and the `apply`/`call` rewrites, then executes by
    /// body kind (AST scope push, native, async park, `eval` machine).
    fn invoke_function(
        &mut self,
        m: &mut Machine,
        mut func: Value,
        mut this: Value,
        mut args: Vec<Value>,
    ) -> Result<Invoke, MachineError> {
        let function = loop {
            let callable = func
                .as_object()
                .filter(|object| self.heap[*object].is_function());
            let Some(object) = callable else {
                let name = self.heap.to_string(func);
                return Err(self
                    .throw_exception(
                        ExceptionType::TypeError,
                        &format!("{name} is not a function"),
                    )
                    .into());
            };
            let (bound_target, bound_this, special) = {
                let data = self.heap[object]
                    .function
                    .as_ref()
                    .expect("checked is_function");
                (data.bound_target, data.bound_this, data.special)
            };
            if let Some(target) = bound_target {
                let mut combined = self.heap[object]
                    .function
                    .as_ref()
                    .expect("checked is_function")
                    .bound_args
                    .clone();
                if let Some(bound_this) = bound_this {
                    this = bound_this;
                }
                combined.extend(args);
                args = combined;
                func = Value::Object(target);
                continue;
            }
            match special {
                Some(SpecialForm::Apply) => {
                    let target = this;
                    this = args.first().copied().unwrap_or(Value::Undefined);
                    let list = args.get(1).copied().unwrap_or(Value::Undefined);
                    args = match list {
                        Value::Undefined | Value::Null => Vec::new(),
                        Value::Object(list) if self.heap[list].length.is_some() => {
                            let length = self.heap[list].length.expect("array length");
                            (0..length)
                                .map(|i| {
                                    self.heap.element(list, i).unwrap_or(Value::Undefined)
                                })
                                .collect()
                        }
                        _ => {
                            return Err(self
                                .throw_exception(
                                    ExceptionType::TypeError,
                                    "CreateListFromArrayLike called on non-object",
                                )
                                .into());
                        }
                    };
                    func = target;
                    continue;
                }
                Some(SpecialForm::Call) => {
                    let target = this;
                    this = args.first().copied().unwrap_or(Value::Undefined);
                    args = args.split_off(1.min(args.len()));
                    func = target;
                    continue;
                }
                Some(SpecialForm::Eval) => {
                    let source = args.first().copied().unwrap_or(Value::Undefined);
                    let Value::String(source) = source else {
                        // A non-string argument is returned unchanged.
                        return Ok(Invoke::Done(source));
                    };
                    let text = self.heap[source].to_string();
                    let program = match source::parse_program(&text, &mut self.ast, true) {
                        Ok(program) => program,
                        Err(failure) => {
                            return Err(self
                                .throw_exception(
                                    ExceptionType::SyntaxError,
                                    &failure.to_string(),
                                )
                                .into());
                        }
                    };
                    // The nested machine shares the heap and AST arena;
                    // the current scope becomes its global.
                    let scope = current_scope(m);
                    let this = current_this(m);
                    let machine = self.program_machine(program, scope, Some(this));
                    return Ok(Invoke::Eval(Box::new(machine)));
                }
                None => {}
            }
            break object;
        };
        let (native, asynchronous, node, parent_scope, strict) = {
            let data = self.heap[function]
                .function
                .as_ref()
                .expect("checked is_function");
            (
                data.native,
                data.asynchronous,
                data.node,
                data.parent_scope,
                data.strict,
            )
        };
        if let Some(native) = native {
            let arguments = Arguments(&args);
            let value = native(self, this, &arguments)?;
            return Ok(Invoke::Done(value));
        }
        if let Some(asynchronous) = asynchronous {
            let completion = AsyncCompletion {
                mailbox: Rc::clone(&self.mailbox),
                paused: Rc::clone(&self.paused),
            };
            self.paused.set(true);
            let arguments = Arguments(&args);
            asynchronous(self, this, &arguments, completion);
            return Ok(Invoke::Parked);
        }
        let node = node.expect("function without a body");
        let parent_scope = parent_scope.expect("AST function without a captured scope");
        let (params, body) = {
            let function_node = match &self.ast[node].kind {
                NodeKind::FunctionDeclaration(f) | NodeKind::FunctionExpression(f) => f,
                _ => unreachable!("function node of a callable"),
            };
            (function_node.params.clone(), function_node.body)
        };
        // Sloppy-mode calls with no receiver get the global object.
        if this.is_nullish() && !strict {
            this = Value::Object(self.heap.global_scope);
        }
        let scope = self.create_call_scope(parent_scope, strict, &params, &args, body);
        let mut frame = Frame::new(body, Step::Block { index: 0 });
        frame.scope = Some(scope);
        frame.this_value = Some(this);
        m.stack.push(frame);
        Ok(Invoke::Pushed)
    }

    fn step_eval(
        &mut self,
        m: &mut Machine,
        fi: usize,
        mut machine: Box<Machine>,
    ) -> Result<(), MachineError> {
        // One inner step per outer step.
        match self.step_machine(&mut machine) {
            Ok(true) => {
                let value = machine.value;
                pop_frame(m, value);
                Ok(())
            }
            Ok(false) => {
                m.stack[fi].step = Step::Eval(machine);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    // Exceptional unwinding.

    /// Pops frames searching for the target of a throw, break, continue,
    /// or return. A `try` with a finalizer on the way parks the pending
    /// transfer, runs the finalizer, and resumes it afterwards; a throw
    /// crossing a `try` block with a handler enters the catch clause.
    fn unwind(&mut self, m: &mut Machine, pending: Pending) -> Result<(), MachineError> {
        loop {
            let Some(fi) = m.stack.len().checked_sub(1) else {
                return self.unwind_bottom(pending);
            };
            let (act, frame_label) = {
                let frame = &m.stack[fi];
                let act = match &frame.step {
                    Step::Program { .. } => UnwindAct::Bottom,
                    Step::Try { stage, .. } if *stage != TryStage::Finalizer => {
                        UnwindAct::Try {
                            in_block: *stage == TryStage::Block,
                        }
                    }
                    Step::Call(state) => UnwindAct::CallBoundary {
                        executing: state.stage == CallStage::Exec,
                    },
                    Step::PendingCall(state) => UnwindAct::CallBoundary {
                        executing: state.stage == PendingStage::Exec,
                    },
                    Step::For { .. } | Step::While { .. } | Step::ForIn(_) => {
                        UnwindAct::Loop
                    }
                    Step::Switch { .. } => UnwindAct::Switch,
                    _ => UnwindAct::Other,
                };
                (act, frame.label.clone())
            };
            let label_matches = |wanted: &Option<Box<str>>| match wanted {
                Some(wanted) => frame_label.as_deref() == Some(&**wanted),
                None => false,
            };
            match act {
                UnwindAct::Bottom => return self.unwind_bottom(pending),
                UnwindAct::Try { in_block } => {
                    let node = m.stack[fi].node;
                    let (handler, finalizer) = {
                        let NodeKind::TryStatement {
                            handler, finalizer, ..
                        } = &self.ast[node].kind
                        else {
                            unreachable!();
                        };
                        (handler.clone(), *finalizer)
                    };
                    if in_block && handler.is_some() {
                        if let Pending::Throw(error) = &pending {
                            let error = *error;
                            let handler = handler.expect("checked above");
                            let scope = current_scope(m);
                            let catch_scope =
                                self.create_catch_scope(scope, &handler.param, error);
                            let frame = &mut m.stack[fi];
                            frame.step = Step::Try {
                                stage: TryStage::Handler,
                                pending: None,
                            };
                            frame.value = Value::Undefined;
                            let mut body = Frame::new(handler.body, Step::Block { index: 0 });
                            body.scope = Some(catch_scope);
                            m.stack.push(body);
                            return Ok(());
                        }
                    }
                    if let Some(finalizer) = finalizer {
                        m.stack[fi].step = Step::Try {
                            stage: TryStage::Finalizer,
                            pending: Some(pending),
                        };
                        let body = Frame::new(finalizer, Step::Block { index: 0 });
                        m.stack.push(body);
                        return Ok(());
                    }
                    m.stack.pop();
                }
                UnwindAct::CallBoundary { executing } => match &pending {
                    Pending::Return(value) if executing => {
                        m.stack[fi].value = *value;
                        m.stack[fi].reference = None;
                        return Ok(());
                    }
                    Pending::Break(_) | Pending::Continue(_) if executing => {
                        return Err(MachineError::Fatal(illegal_jump(&pending)));
                    }
                    _ => {
                        m.stack.pop();
                    }
                },
                UnwindAct::Loop => match &pending {
                    Pending::Break(label) if label.is_none() || label_matches(label) => {
                        m.stack.truncate(fi);
                        settle_pop(m);
                        return Ok(());
                    }
                    Pending::Continue(label) if label.is_none() || label_matches(label) => {
                        match &mut m.stack[fi].step {
                            Step::For { mode } => *mode = ForMode::Update,
                            Step::While { checking } => *checking = false,
                            Step::ForIn(state) => state.stage = ForInStage::NextKey,
                            _ => unreachable!(),
                        }
                        m.stack[fi].value = Value::Undefined;
                        return Ok(());
                    }
                    _ => {
                        m.stack.pop();
                    }
                },
                UnwindAct::Switch => match &pending {
                    Pending::Break(label) if label.is_none() || label_matches(label) => {
                        m.stack.truncate(fi);
                        settle_pop(m);
                        return Ok(());
                    }
                    _ => {
                        m.stack.pop();
                    }
                },
                UnwindAct::Other => {
                    if let Pending::Break(label) = &pending {
                        if label_matches(label) {
                            m.stack.truncate(fi);
                            settle_pop(m);
                            return Ok(());
                        }
                    }
                    m.stack.pop();
                }
            }
        }
    }

    fn unwind_bottom(&mut self, pending: Pending) -> Result<(), MachineError> {
        match pending {
            Pending::Throw(value) => Err(MachineError::Thrown(value)),
            other => Err(MachineError::Fatal(illegal_jump(&other))),
        }
    }
}

enum UnwindAct {
    Bottom,
    Try { in_block: bool },
    CallBoundary { executing: bool },
    Loop,
    Switch,
    Other,
}

fn illegal_jump(pending: &Pending) -> FatalError {
    match pending {
        Pending::Continue(_) => FatalError::Syntax("Illegal continue statement".to_string()),
        Pending::Return(_) => FatalError::Syntax("Illegal return statement".to_string()),
        _ => FatalError::Syntax("Illegal break statement".to_string()),
    }
}

enum Invoke {
    Done(Value),
    Pushed,
    Eval(Box<Machine>),
    Parked,
}

enum ReferenceValue {
    Plain(Value),
    Accessor { getter: ObjectIndex, this: Value },
}

/// For `new`, a non-object return value is replaced by the receiver.
fn construct_result(state: &CallStep, value: Value) -> Value {
    if state.construct && !value.is_object() {
        state.receiver.unwrap_or(value)
    } else {
        value
    }
}

fn pop_frame(m: &mut Machine, value: Value) {
    m.stack.pop();
    if let Some(top) = m.stack.last_mut() {
        top.value = value;
        top.reference = None;
    }
}

fn pop_frame_reference(m: &mut Machine, reference: Reference) {
    m.stack.pop();
    if let Some(top) = m.stack.last_mut() {
        top.reference = Some(reference);
        top.value = Value::Undefined;
    }
}

/// After a break pops its target, the frame beneath sees an undefined
/// completion.
fn settle_pop(m: &mut Machine) {
    if let Some(top) = m.stack.last_mut() {
        top.value = Value::Undefined;
        top.reference = None;
    }
}

fn current_scope(m: &Machine) -> ObjectIndex {
    m.stack
        .iter()
        .rev()
        .find_map(|frame| frame.scope)
        .expect("a program frame always carries a scope")
}

fn current_this(m: &Machine) -> Value {
    m.stack
        .iter()
        .rev()
        .find_map(|frame| frame.this_value)
        .unwrap_or(Value::Undefined)
}
