// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scope chains. A scope is an ordinary heap object carrying a
//! [`ScopeData`] link; function calls build a fresh scope, hoist `var`
//! and function declarations into it, and `with`/`catch` push special
//! scopes that do not re-hoist.

use crate::ast::{NodeId, NodeKind};
use crate::heap::indexes::{ObjectIndex, StringIndex};
use crate::interpreter::{ExceptionType, Interpreter};
use crate::object::{ObjectHeapData, ScopeData};
use crate::value::{JsResult, Value};

/// Outcome of a scope-chain name lookup. As with property reads, a getter
/// is reported back for the evaluator to dispatch (a `with` target or the
/// global scope may carry accessor bindings).
#[derive(Debug, Clone, Copy)]
pub enum NameLookup {
    Data(Value),
    Getter { getter: ObjectIndex, this: Value },
    Missing,
}

impl Interpreter {
    pub(crate) fn scope_strict(&self, scope: ObjectIndex) -> bool {
        self.heap[scope].scope.map_or(false, |data| data.strict)
    }

    /// Creates the scope for a function call: parameters bound, the
    /// synthetic `arguments` array installed, body hoisted.
    pub(crate) fn create_call_scope(
        &mut self,
        parent_scope: ObjectIndex,
        strict: bool,
        params: &[Box<str>],
        args: &[Value],
        body: NodeId,
    ) -> ObjectIndex {
        let object = self.heap.intrinsics.object;
        let scope = self.heap.alloc(ObjectHeapData::scope(
            Some(object),
            ScopeData {
                parent_scope: Some(parent_scope),
                strict,
                with_target: None,
            },
        ));
        for (position, param) in params.iter().enumerate() {
            let value = args.get(position).copied().unwrap_or(Value::Undefined);
            let key = self.heap.intern(param);
            self.heap[scope].insert(key, value);
        }
        let arguments = self.heap.create_array();
        for argument in args {
            self.heap.array_push(arguments, *argument);
        }
        let key = self.heap.intern("arguments");
        self.heap[scope].insert(key, Value::Object(arguments));
        self.hoist(scope, body);
        scope
    }

    /// The `catch` special scope: one binding, no hoisting.
    pub(crate) fn create_catch_scope(
        &mut self,
        parent_scope: ObjectIndex,
        param: &str,
        error: Value,
    ) -> ObjectIndex {
        let object = self.heap.intrinsics.object;
        let strict = self.scope_strict(parent_scope);
        let scope = self.heap.alloc(ObjectHeapData::scope(
            Some(object),
            ScopeData {
                parent_scope: Some(parent_scope),
                strict,
                with_target: None,
            },
        ));
        let key = self.heap.intern(param);
        self.heap[scope].insert(key, error);
        scope
    }

    /// The `with` special scope: exposes `target`'s properties as
    /// bindings without copying or re-hoisting.
    pub(crate) fn create_with_scope(
        &mut self,
        parent_scope: ObjectIndex,
        target: ObjectIndex,
    ) -> ObjectIndex {
        let object = self.heap.intrinsics.object;
        let strict = self.scope_strict(parent_scope);
        self.heap.alloc(ObjectHeapData::scope(
            Some(object),
            ScopeData {
                parent_scope: Some(parent_scope),
                strict,
                with_target: Some(target),
            },
        ))
    }

    /// Walks the scope chain for `key`. Ordinary scopes expose their own
    /// properties only; a `with` scope defers to its target object,
    /// prototype chain included.
    pub(crate) fn lookup_name(&self, scope: ObjectIndex, key: StringIndex) -> NameLookup {
        let mut current = Some(scope);
        while let Some(link) = current {
            let data = &self.heap[link];
            let scope_data = data.scope.expect("scope chain entry without scope data");
            if let Some(target) = scope_data.with_target {
                match self.lookup_property(Value::Object(target), key) {
                    crate::object::Lookup::Data(value) => return NameLookup::Data(value),
                    crate::object::Lookup::Getter(getter) => {
                        return NameLookup::Getter {
                            getter,
                            this: Value::Object(target),
                        };
                    }
                    crate::object::Lookup::Missing => {}
                }
            } else if let Some(getter) = data.getter.get(&key) {
                return NameLookup::Getter {
                    getter: *getter,
                    this: Value::Object(link),
                };
            } else if let Some(value) = data.properties.get(&key) {
                return NameLookup::Data(*value);
            }
            current = scope_data.parent_scope;
        }
        NameLookup::Missing
    }

    /// Writes `key` in the scope chain. Returns a setter to dispatch when
    /// the binding is an accessor. An unbound name is a `ReferenceError`
    /// in strict mode and a fresh global binding otherwise.
    pub(crate) fn set_name(
        &mut self,
        scope: ObjectIndex,
        key: StringIndex,
        value: Value,
    ) -> JsResult<Option<(ObjectIndex, Value)>> {
        let strict = self.scope_strict(scope);
        let mut current = Some(scope);
        while let Some(link) = current {
            let scope_data = self.heap[link]
                .scope
                .expect("scope chain entry without scope data");
            if let Some(target) = scope_data.with_target {
                if self.has_property(Value::Object(target), key) {
                    return self.assign_property(Value::Object(target), key, value);
                }
            } else {
                let data = &self.heap[link];
                if data.has_own(key) {
                    if let Some(setter) = data.setter.get(&key) {
                        return Ok(Some((*setter, Value::Object(link))));
                    }
                    if data.getter.contains_key(&key) {
                        let name = self.heap[key].to_string();
                        return Err(self.throw_exception(
                            ExceptionType::TypeError,
                            &format!("Cannot set property '{name}' which has only a getter"),
                        ));
                    }
                    if !data.not_writable.contains(&key) {
                        self.heap[link].insert(key, value);
                    }
                    return Ok(None);
                }
            }
            current = scope_data.parent_scope;
        }
        if strict {
            let name = self.heap[key].to_string();
            return Err(self.throw_exception(
                ExceptionType::ReferenceError,
                &format!("{name} is not defined"),
            ));
        }
        let global = self.heap.global_scope;
        self.heap[global].insert(key, value);
        Ok(None)
    }

    /// Binds `name` to `undefined` in `scope` unless already bound.
    pub(crate) fn declare_var(&mut self, scope: ObjectIndex, name: &str) {
        let key = self.heap.intern(name);
        if !self.heap[scope].has_own(key) {
            self.heap[scope].insert(key, Value::Undefined);
        }
    }

    /// Hoists `var` and function declarations of `body` (a `Program` or
    /// `BlockStatement`) into `scope`, without descending into nested
    /// functions.
    pub(crate) fn hoist(&mut self, scope: ObjectIndex, body: NodeId) {
        let statements = match &self.ast[body].kind {
            NodeKind::Program { body, .. } => body.clone(),
            NodeKind::BlockStatement { body } => body.clone(),
            _ => unreachable!("hoist target must be a program or block"),
        };
        for statement in statements {
            self.hoist_statement(scope, statement);
        }
    }

    pub(crate) fn hoist_statement(&mut self, scope: ObjectIndex, node: NodeId) {
        enum Walk {
            Declarators(Vec<NodeId>),
            Function(Box<str>),
            Children(Vec<NodeId>),
            Leaf,
        }
        let walk = match &self.ast[node].kind {
            NodeKind::VariableDeclaration { declarations } => {
                Walk::Declarators(declarations.clone())
            }
            NodeKind::FunctionDeclaration(function) => Walk::Function(
                function
                    .name
                    .clone()
                    .expect("function declaration without a name"),
            ),
            NodeKind::BlockStatement { body } => Walk::Children(body.clone()),
            NodeKind::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                let mut children = vec![*consequent];
                children.extend(*alternate);
                Walk::Children(children)
            }
            NodeKind::ForStatement { init, body, .. } => {
                let mut children = Vec::new();
                children.extend(*init);
                children.push(*body);
                Walk::Children(children)
            }
            NodeKind::ForInStatement { left, body, .. } => {
                Walk::Children(vec![*left, *body])
            }
            NodeKind::WhileStatement { body, .. }
            | NodeKind::DoWhileStatement { body, .. }
            | NodeKind::LabeledStatement { body, .. }
            | NodeKind::WithStatement { body, .. } => Walk::Children(vec![*body]),
            NodeKind::SwitchStatement { cases, .. } => Walk::Children(
                cases
                    .iter()
                    .flat_map(|case| case.consequent.iter().copied())
                    .collect(),
            ),
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let mut children = vec![*block];
                if let Some(handler) = handler {
                    children.push(handler.body);
                }
                children.extend(*finalizer);
                Walk::Children(children)
            }
            _ => Walk::Leaf,
        };
        match walk {
            Walk::Declarators(declarations) => {
                for declarator in declarations {
                    let NodeKind::VariableDeclarator { name, .. } = &self.ast[declarator].kind
                    else {
                        unreachable!("declaration list holds declarators");
                    };
                    let name = name.clone();
                    self.declare_var(scope, &name);
                }
            }
            Walk::Function(name) => {
                let function = self.create_function(node, scope);
                let key = self.heap.intern(&name);
                self.heap[scope].insert(key, function);
            }
            Walk::Children(children) => {
                for child in children {
                    self.hoist_statement(scope, child);
                }
            }
            Walk::Leaf => {}
        }
    }
}
