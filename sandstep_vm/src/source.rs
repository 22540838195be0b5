// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Source-to-AST boundary. The host parser (oxc) produces an arena-backed
//! tree borrowed from its allocator; this module lowers the ECMAScript 5
//! subset of that tree into the interpreter's owned [`AstArena`] and
//! rejects everything newer. The parse result is dropped before the
//! function returns, so no parser lifetime escapes.

use oxc_allocator::Allocator;
use oxc_ast::ast;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use oxc_syntax::operator::{
    AssignmentOperator, BinaryOperator, LogicalOperator, UnaryOperator, UpdateOperator,
};

use crate::ast::{
    AssignOp, AstArena, BinaryOp, CatchHandler, FunctionNode, Literal, LogicalOp, NodeId,
    NodeKind, ObjectProperty, PropertyKind, RegExpFlags, Span, SwitchClause, UnaryOp, UpdateOp,
};
use crate::value::number_to_string;

/// Failure to turn source text into an ES5 tree: either the parser
/// reported diagnostics or the program uses syntax outside the supported
/// dialect.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub messages: Vec<String>,
}

impl ParseFailure {
    fn unsupported(what: &str, span: oxc_span::Span) -> Self {
        Self {
            messages: vec![format!(
                "{what} is not supported (ES5 subset), at byte {}",
                span.start
            )],
        }
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.messages.join("\n"))
    }
}

/// Parses `source` as an ECMAScript 5 program and lowers it into `arena`,
/// returning the `Program` node. `keep_spans` is false for internally
/// generated code (polyfills, `Function(...)` bodies), which must carry no
/// positions so the driver can step through it transparently.
pub fn parse_program(
    source: &str,
    arena: &mut AstArena,
    keep_spans: bool,
) -> Result<NodeId, ParseFailure> {
    let allocator = Allocator::default();
    let parser = Parser::new(&allocator, source, SourceType::default());
    let result = parser.parse();
    if !result.errors.is_empty() {
        return Err(ParseFailure {
            messages: result.errors.iter().map(|e| e.to_string()).collect(),
        });
    }
    let program = &result.program;
    let mut lower = Lower { arena, keep_spans };
    let strict = has_use_strict(&program.directives);
    let body = lower.statements(&program.body)?;
    let span = lower.span(program.span());
    Ok(lower.arena.alloc(span, NodeKind::Program { body, strict }))
}

/// Parses source as a list of statements to append to a live program.
pub fn parse_statements(
    source: &str,
    arena: &mut AstArena,
) -> Result<Vec<NodeId>, ParseFailure> {
    let allocator = Allocator::default();
    let parser = Parser::new(&allocator, source, SourceType::default());
    let result = parser.parse();
    if !result.errors.is_empty() {
        return Err(ParseFailure {
            messages: result.errors.iter().map(|e| e.to_string()).collect(),
        });
    }
    let mut lower = Lower {
        arena,
        keep_spans: true,
    };
    lower.statements(&result.program.body)
}

/// Builds the `FunctionExpression` node for `Function(params, body)`. The
/// snippet is synthetic, so spans are stripped.
pub fn parse_function_literal(
    params: &str,
    body: &str,
    arena: &mut AstArena,
) -> Result<NodeId, ParseFailure> {
    let source = format!("(function({params}) {{\n{body}\n}});");
    let program = parse_program(&source, arena, false)?;
    let NodeKind::Program { body, .. } = &arena[program].kind else {
        unreachable!();
    };
    let Some(&statement) = body.first() else {
        return Err(ParseFailure {
            messages: vec!["empty function literal".to_string()],
        });
    };
    let NodeKind::ExpressionStatement { expression } = &arena[statement].kind else {
        return Err(ParseFailure {
            messages: vec!["malformed function literal".to_string()],
        });
    };
    Ok(*expression)
}

fn has_use_strict(directives: &[ast::Directive]) -> bool {
    directives.iter().any(|d| d.directive == "use strict")
}

struct Lower<'arena> {
    arena: &'arena mut AstArena,
    keep_spans: bool,
}

type LowerResult<T> = Result<T, ParseFailure>;

impl Lower<'_> {
    fn span(&self, span: oxc_span::Span) -> Option<Span> {
        self.keep_spans.then_some(Span {
            start: span.start,
            end: span.end,
        })
    }

    fn alloc(&mut self, span: oxc_span::Span, kind: NodeKind) -> NodeId {
        let span = self.span(span);
        self.arena.alloc(span, kind)
    }

    fn statements(&mut self, body: &[ast::Statement]) -> LowerResult<Vec<NodeId>> {
        body.iter().map(|statement| self.statement(statement)).collect()
    }

    fn statement(&mut self, statement: &ast::Statement) -> LowerResult<NodeId> {
        let span = statement.span();
        let kind = match statement {
            ast::Statement::ExpressionStatement(stmt) => NodeKind::ExpressionStatement {
                expression: self.expression(&stmt.expression)?,
            },
            ast::Statement::BlockStatement(stmt) => NodeKind::BlockStatement {
                body: self.statements(&stmt.body)?,
            },
            ast::Statement::EmptyStatement(_) => NodeKind::EmptyStatement,
            ast::Statement::DebuggerStatement(_) => NodeKind::DebuggerStatement,
            ast::Statement::VariableDeclaration(decl) => self.variable_declaration(decl)?,
            ast::Statement::FunctionDeclaration(function) => {
                NodeKind::FunctionDeclaration(self.function(function)?)
            }
            ast::Statement::IfStatement(stmt) => NodeKind::IfStatement {
                test: self.expression(&stmt.test)?,
                consequent: self.statement(&stmt.consequent)?,
                alternate: stmt
                    .alternate
                    .as_ref()
                    .map(|s| self.statement(s))
                    .transpose()?,
            },
            ast::Statement::ForStatement(stmt) => {
                let init = match &stmt.init {
                    None => None,
                    Some(ast::ForStatementInit::VariableDeclaration(decl)) => {
                        let kind = self.variable_declaration(decl)?;
                        Some(self.alloc(decl.span, kind))
                    }
                    Some(init) => match init.as_expression() {
                        Some(expression) => Some(self.expression(expression)?),
                        None => {
                            return Err(ParseFailure::unsupported("for-statement initializer", span))
                        }
                    },
                };
                NodeKind::ForStatement {
                    init,
                    test: stmt
                        .test
                        .as_ref()
                        .map(|e| self.expression(e))
                        .transpose()?,
                    update: stmt
                        .update
                        .as_ref()
                        .map(|e| self.expression(e))
                        .transpose()?,
                    body: self.statement(&stmt.body)?,
                }
            }
            ast::Statement::ForInStatement(stmt) => NodeKind::ForInStatement {
                left: self.for_in_left(&stmt.left)?,
                right: self.expression(&stmt.right)?,
                body: self.statement(&stmt.body)?,
            },
            ast::Statement::WhileStatement(stmt) => NodeKind::WhileStatement {
                test: self.expression(&stmt.test)?,
                body: self.statement(&stmt.body)?,
            },
            ast::Statement::DoWhileStatement(stmt) => NodeKind::DoWhileStatement {
                test: self.expression(&stmt.test)?,
                body: self.statement(&stmt.body)?,
            },
            ast::Statement::SwitchStatement(stmt) => {
                let discriminant = self.expression(&stmt.discriminant)?;
                let mut cases = Vec::with_capacity(stmt.cases.len());
                for case in &stmt.cases {
                    cases.push(SwitchClause {
                        test: case
                            .test
                            .as_ref()
                            .map(|e| self.expression(e))
                            .transpose()?,
                        consequent: self.statements(&case.consequent)?,
                    });
                }
                NodeKind::SwitchStatement {
                    discriminant,
                    cases,
                }
            }
            ast::Statement::TryStatement(stmt) => {
                let block_body = self.statements(&stmt.block.body)?;
                let block = self.alloc(
                    stmt.block.span,
                    NodeKind::BlockStatement { body: block_body },
                );
                let handler = match &stmt.handler {
                    None => None,
                    Some(clause) => {
                        let Some(param) = &clause.param else {
                            return Err(ParseFailure::unsupported(
                                "catch without a binding",
                                span,
                            ));
                        };
                        let ast::BindingPatternKind::BindingIdentifier(identifier) =
                            &param.pattern.kind
                        else {
                            return Err(ParseFailure::unsupported(
                                "destructuring catch binding",
                                span,
                            ));
                        };
                        let handler_body = self.statements(&clause.body.body)?;
                        let body = self.alloc(
                            clause.body.span,
                            NodeKind::BlockStatement { body: handler_body },
                        );
                        Some(CatchHandler {
                            param: identifier.name.as_str().into(),
                            body,
                        })
                    }
                };
                let finalizer = match &stmt.finalizer {
                    None => None,
                    Some(finalizer) => {
                        let body = self.statements(&finalizer.body)?;
                        Some(self.alloc(finalizer.span, NodeKind::BlockStatement { body }))
                    }
                };
                NodeKind::TryStatement {
                    block,
                    handler,
                    finalizer,
                }
            }
            ast::Statement::ThrowStatement(stmt) => NodeKind::ThrowStatement {
                argument: self.expression(&stmt.argument)?,
            },
            ast::Statement::ReturnStatement(stmt) => NodeKind::ReturnStatement {
                argument: stmt
                    .argument
                    .as_ref()
                    .map(|e| self.expression(e))
                    .transpose()?,
            },
            ast::Statement::BreakStatement(stmt) => NodeKind::BreakStatement {
                label: stmt.label.as_ref().map(|l| l.name.as_str().into()),
            },
            ast::Statement::ContinueStatement(stmt) => NodeKind::ContinueStatement {
                label: stmt.label.as_ref().map(|l| l.name.as_str().into()),
            },
            ast::Statement::LabeledStatement(stmt) => NodeKind::LabeledStatement {
                label: stmt.label.name.as_str().into(),
                body: self.statement(&stmt.body)?,
            },
            ast::Statement::WithStatement(stmt) => NodeKind::WithStatement {
                object: self.expression(&stmt.object)?,
                body: self.statement(&stmt.body)?,
            },
            _ => return Err(ParseFailure::unsupported("statement kind", span)),
        };
        Ok(self.alloc(span, kind))
    }

    fn variable_declaration(
        &mut self,
        decl: &ast::VariableDeclaration,
    ) -> LowerResult<NodeKind> {
        if decl.kind != ast::VariableDeclarationKind::Var {
            return Err(ParseFailure::unsupported(
                "block-scoped declaration",
                decl.span,
            ));
        }
        let mut declarations = Vec::with_capacity(decl.declarations.len());
        for declarator in &decl.declarations {
            let ast::BindingPatternKind::BindingIdentifier(identifier) = &declarator.id.kind
            else {
                return Err(ParseFailure::unsupported(
                    "destructuring declaration",
                    declarator.span,
                ));
            };
            let init = declarator
                .init
                .as_ref()
                .map(|e| self.expression(e))
                .transpose()?;
            declarations.push(self.alloc(
                declarator.span,
                NodeKind::VariableDeclarator {
                    name: identifier.name.as_str().into(),
                    init,
                },
            ));
        }
        Ok(NodeKind::VariableDeclaration { declarations })
    }

    fn for_in_left(&mut self, left: &ast::ForStatementLeft) -> LowerResult<NodeId> {
        match left {
            ast::ForStatementLeft::VariableDeclaration(decl) => {
                let kind = self.variable_declaration(decl)?;
                Ok(self.alloc(decl.span, kind))
            }
            ast::ForStatementLeft::AssignmentTargetIdentifier(identifier) => {
                Ok(self.alloc(
                    identifier.span,
                    NodeKind::Identifier {
                        name: identifier.name.as_str().into(),
                    },
                ))
            }
            ast::ForStatementLeft::ComputedMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                let property = self.expression(&member.expression)?;
                Ok(self.alloc(
                    member.span,
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed: true,
                    },
                ))
            }
            ast::ForStatementLeft::StaticMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                let property = self.alloc(
                    member.property.span,
                    NodeKind::Identifier {
                        name: member.property.name.as_str().into(),
                    },
                );
                Ok(self.alloc(
                    member.span,
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed: false,
                    },
                ))
            }
            _ => Err(ParseFailure::unsupported(
                "for-in binding target",
                left.span(),
            )),
        }
    }

    fn function(&mut self, function: &ast::Function) -> LowerResult<FunctionNode> {
        if function.r#async || function.generator {
            return Err(ParseFailure::unsupported(
                "async or generator function",
                function.span,
            ));
        }
        if function.params.rest.is_some() {
            return Err(ParseFailure::unsupported("rest parameter", function.span));
        }
        let mut params = Vec::with_capacity(function.params.items.len());
        for parameter in &function.params.items {
            let ast::BindingPatternKind::BindingIdentifier(identifier) = &parameter.pattern.kind
            else {
                return Err(ParseFailure::unsupported(
                    "parameter pattern",
                    parameter.span,
                ));
            };
            params.push(identifier.name.as_str().into());
        }
        let Some(body) = &function.body else {
            return Err(ParseFailure::unsupported("bodyless function", function.span));
        };
        let strict = has_use_strict(&body.directives);
        let statements = self.statements(&body.statements)?;
        let body = self.alloc(body.span, NodeKind::BlockStatement { body: statements });
        Ok(FunctionNode {
            name: function.id.as_ref().map(|id| id.name.as_str().into()),
            params,
            body,
            strict,
        })
    }

    fn expression(&mut self, expression: &ast::Expression) -> LowerResult<NodeId> {
        let span = expression.span();
        let kind = match expression {
            ast::Expression::ParenthesizedExpression(inner) => {
                return self.expression(&inner.expression);
            }
            ast::Expression::NullLiteral(_) => NodeKind::Literal(Literal::Null),
            ast::Expression::BooleanLiteral(literal) => {
                NodeKind::Literal(Literal::Boolean(literal.value))
            }
            ast::Expression::NumericLiteral(literal) => {
                NodeKind::Literal(Literal::Number(literal.value))
            }
            ast::Expression::StringLiteral(literal) => {
                NodeKind::Literal(Literal::String(literal.value.as_str().into()))
            }
            ast::Expression::RegExpLiteral(literal) => {
                let flags = literal.regex.flags;
                let unsupported = ast::RegExpFlags::S
                    | ast::RegExpFlags::U
                    | ast::RegExpFlags::Y
                    | ast::RegExpFlags::D
                    | ast::RegExpFlags::V;
                if flags.intersects(unsupported) {
                    return Err(ParseFailure::unsupported("regular expression flag", span));
                }
                NodeKind::Literal(Literal::RegExp {
                    pattern: literal.regex.pattern.text.as_str().into(),
                    flags: RegExpFlags {
                        global: flags.contains(ast::RegExpFlags::G),
                        ignore_case: flags.contains(ast::RegExpFlags::I),
                        multiline: flags.contains(ast::RegExpFlags::M),
                    },
                })
            }
            ast::Expression::Identifier(identifier) => NodeKind::Identifier {
                name: identifier.name.as_str().into(),
            },
            ast::Expression::ThisExpression(_) => NodeKind::ThisExpression,
            ast::Expression::ArrayExpression(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    match element {
                        ast::ArrayExpressionElement::Elision(_) => elements.push(None),
                        ast::ArrayExpressionElement::SpreadElement(_) => {
                            return Err(ParseFailure::unsupported("spread element", span));
                        }
                        _ => {
                            let expression = element
                                .as_expression()
                                .ok_or_else(|| ParseFailure::unsupported("array element", span))?;
                            elements.push(Some(self.expression(expression)?));
                        }
                    }
                }
                NodeKind::ArrayExpression { elements }
            }
            ast::Expression::ObjectExpression(object) => {
                let mut properties = Vec::with_capacity(object.properties.len());
                for property in &object.properties {
                    let ast::ObjectPropertyKind::ObjectProperty(property) = property else {
                        return Err(ParseFailure::unsupported("spread property", span));
                    };
                    if property.computed {
                        return Err(ParseFailure::unsupported("computed property key", span));
                    }
                    let key: Box<str> = match &property.key {
                        ast::PropertyKey::StaticIdentifier(identifier) => {
                            identifier.name.as_str().into()
                        }
                        ast::PropertyKey::StringLiteral(literal) => literal.value.as_str().into(),
                        ast::PropertyKey::NumericLiteral(literal) => {
                            number_to_string(literal.value).into()
                        }
                        _ => return Err(ParseFailure::unsupported("property key", span)),
                    };
                    let kind = match property.kind {
                        ast::PropertyKind::Init => PropertyKind::Init,
                        ast::PropertyKind::Get => PropertyKind::Get,
                        ast::PropertyKind::Set => PropertyKind::Set,
                    };
                    properties.push(ObjectProperty {
                        kind,
                        key,
                        value: self.expression(&property.value)?,
                    });
                }
                NodeKind::ObjectExpression { properties }
            }
            ast::Expression::FunctionExpression(function) => {
                NodeKind::FunctionExpression(self.function(function)?)
            }
            ast::Expression::SequenceExpression(sequence) => NodeKind::SequenceExpression {
                expressions: sequence
                    .expressions
                    .iter()
                    .map(|e| self.expression(e))
                    .collect::<LowerResult<_>>()?,
            },
            ast::Expression::UnaryExpression(unary) => NodeKind::UnaryExpression {
                operator: unary_operator(unary.operator),
                argument: self.expression(&unary.argument)?,
            },
            ast::Expression::BinaryExpression(binary) => NodeKind::BinaryExpression {
                operator: binary_operator(binary.operator, span)?,
                left: self.expression(&binary.left)?,
                right: self.expression(&binary.right)?,
            },
            ast::Expression::LogicalExpression(logical) => NodeKind::LogicalExpression {
                operator: match logical.operator {
                    LogicalOperator::Or => LogicalOp::Or,
                    LogicalOperator::And => LogicalOp::And,
                    LogicalOperator::Coalesce => {
                        return Err(ParseFailure::unsupported("nullish coalescing", span));
                    }
                },
                left: self.expression(&logical.left)?,
                right: self.expression(&logical.right)?,
            },
            ast::Expression::AssignmentExpression(assignment) => {
                let left = self.assignment_target(&assignment.left)?;
                NodeKind::AssignmentExpression {
                    operator: assignment_operator(assignment.operator, span)?,
                    left,
                    right: self.expression(&assignment.right)?,
                }
            }
            ast::Expression::UpdateExpression(update) => NodeKind::UpdateExpression {
                operator: match update.operator {
                    UpdateOperator::Increment => UpdateOp::Increment,
                    UpdateOperator::Decrement => UpdateOp::Decrement,
                },
                prefix: update.prefix,
                argument: self.simple_target(&update.argument)?,
            },
            ast::Expression::ConditionalExpression(conditional) => {
                NodeKind::ConditionalExpression {
                    test: self.expression(&conditional.test)?,
                    consequent: self.expression(&conditional.consequent)?,
                    alternate: self.expression(&conditional.alternate)?,
                }
            }
            ast::Expression::CallExpression(call) => {
                if call.optional {
                    return Err(ParseFailure::unsupported("optional call", span));
                }
                NodeKind::CallExpression {
                    callee: self.expression(&call.callee)?,
                    arguments: self.arguments(&call.arguments, span)?,
                }
            }
            ast::Expression::NewExpression(new) => NodeKind::NewExpression {
                callee: self.expression(&new.callee)?,
                arguments: self.arguments(&new.arguments, span)?,
            },
            ast::Expression::ComputedMemberExpression(member) => {
                if member.optional {
                    return Err(ParseFailure::unsupported("optional member access", span));
                }
                NodeKind::MemberExpression {
                    object: self.expression(&member.object)?,
                    property: self.expression(&member.expression)?,
                    computed: true,
                }
            }
            ast::Expression::StaticMemberExpression(member) => {
                if member.optional {
                    return Err(ParseFailure::unsupported("optional member access", span));
                }
                let property = self.alloc(
                    member.property.span,
                    NodeKind::Identifier {
                        name: member.property.name.as_str().into(),
                    },
                );
                NodeKind::MemberExpression {
                    object: self.expression(&member.object)?,
                    property,
                    computed: false,
                }
            }
            _ => return Err(ParseFailure::unsupported("expression kind", span)),
        };
        Ok(self.alloc(span, kind))
    }

    fn arguments(
        &mut self,
        arguments: &[ast::Argument],
        span: oxc_span::Span,
    ) -> LowerResult<Vec<NodeId>> {
        arguments
            .iter()
            .map(|argument| {
                if matches!(argument, ast::Argument::SpreadElement(_)) {
                    return Err(ParseFailure::unsupported("spread argument", span));
                }
                let expression = argument
                    .as_expression()
                    .ok_or_else(|| ParseFailure::unsupported("call argument", span))?;
                self.expression(expression)
            })
            .collect()
    }

    fn assignment_target(&mut self, target: &ast::AssignmentTarget) -> LowerResult<NodeId> {
        match target {
            ast::AssignmentTarget::AssignmentTargetIdentifier(identifier) => Ok(self.alloc(
                identifier.span,
                NodeKind::Identifier {
                    name: identifier.name.as_str().into(),
                },
            )),
            ast::AssignmentTarget::ComputedMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                let property = self.expression(&member.expression)?;
                Ok(self.alloc(
                    member.span,
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed: true,
                    },
                ))
            }
            ast::AssignmentTarget::StaticMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                let property = self.alloc(
                    member.property.span,
                    NodeKind::Identifier {
                        name: member.property.name.as_str().into(),
                    },
                );
                Ok(self.alloc(
                    member.span,
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed: false,
                    },
                ))
            }
            _ => Err(ParseFailure::unsupported(
                "assignment target",
                target.span(),
            )),
        }
    }

    fn simple_target(&mut self, target: &ast::SimpleAssignmentTarget) -> LowerResult<NodeId> {
        match target {
            ast::SimpleAssignmentTarget::AssignmentTargetIdentifier(identifier) => Ok(self
                .alloc(
                    identifier.span,
                    NodeKind::Identifier {
                        name: identifier.name.as_str().into(),
                    },
                )),
            ast::SimpleAssignmentTarget::ComputedMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                let property = self.expression(&member.expression)?;
                Ok(self.alloc(
                    member.span,
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed: true,
                    },
                ))
            }
            ast::SimpleAssignmentTarget::StaticMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                let property = self.alloc(
                    member.property.span,
                    NodeKind::Identifier {
                        name: member.property.name.as_str().into(),
                    },
                );
                Ok(self.alloc(
                    member.span,
                    NodeKind::MemberExpression {
                        object,
                        property,
                        computed: false,
                    },
                ))
            }
            _ => Err(ParseFailure::unsupported("update target", target.span())),
        }
    }
}

fn unary_operator(operator: UnaryOperator) -> UnaryOp {
    match operator {
        UnaryOperator::UnaryNegation => UnaryOp::Minus,
        UnaryOperator::UnaryPlus => UnaryOp::Plus,
        UnaryOperator::LogicalNot => UnaryOp::Not,
        UnaryOperator::BitwiseNot => UnaryOp::BitNot,
        UnaryOperator::Typeof => UnaryOp::Typeof,
        UnaryOperator::Void => UnaryOp::Void,
        UnaryOperator::Delete => UnaryOp::Delete,
    }
}

fn binary_operator(operator: BinaryOperator, span: oxc_span::Span) -> LowerResult<BinaryOp> {
    Ok(match operator {
        BinaryOperator::Equality => BinaryOp::Equals,
        BinaryOperator::Inequality => BinaryOp::NotEquals,
        BinaryOperator::StrictEquality => BinaryOp::StrictEquals,
        BinaryOperator::StrictInequality => BinaryOp::StrictNotEquals,
        BinaryOperator::LessThan => BinaryOp::LessThan,
        BinaryOperator::LessEqualThan => BinaryOp::LessEqual,
        BinaryOperator::GreaterThan => BinaryOp::GreaterThan,
        BinaryOperator::GreaterEqualThan => BinaryOp::GreaterEqual,
        BinaryOperator::ShiftLeft => BinaryOp::ShiftLeft,
        BinaryOperator::ShiftRight => BinaryOp::ShiftRight,
        BinaryOperator::ShiftRightZeroFill => BinaryOp::ShiftRightUnsigned,
        BinaryOperator::Addition => BinaryOp::Add,
        BinaryOperator::Subtraction => BinaryOp::Subtract,
        BinaryOperator::Multiplication => BinaryOp::Multiply,
        BinaryOperator::Division => BinaryOp::Divide,
        BinaryOperator::Remainder => BinaryOp::Remainder,
        BinaryOperator::BitwiseOR => BinaryOp::BitOr,
        BinaryOperator::BitwiseXOR => BinaryOp::BitXor,
        BinaryOperator::BitwiseAnd => BinaryOp::BitAnd,
        BinaryOperator::In => BinaryOp::In,
        BinaryOperator::Instanceof => BinaryOp::Instanceof,
        BinaryOperator::Exponential => {
            return Err(ParseFailure::unsupported("exponentiation", span));
        }
    })
}

fn assignment_operator(
    operator: AssignmentOperator,
    span: oxc_span::Span,
) -> LowerResult<AssignOp> {
    Ok(AssignOp(match operator {
        AssignmentOperator::Assign => None,
        AssignmentOperator::Addition => Some(BinaryOp::Add),
        AssignmentOperator::Subtraction => Some(BinaryOp::Subtract),
        AssignmentOperator::Multiplication => Some(BinaryOp::Multiply),
        AssignmentOperator::Division => Some(BinaryOp::Divide),
        AssignmentOperator::Remainder => Some(BinaryOp::Remainder),
        AssignmentOperator::ShiftLeft => Some(BinaryOp::ShiftLeft),
        AssignmentOperator::ShiftRight => Some(BinaryOp::ShiftRight),
        AssignmentOperator::ShiftRightZeroFill => Some(BinaryOp::ShiftRightUnsigned),
        AssignmentOperator::BitwiseOR => Some(BinaryOp::BitOr),
        AssignmentOperator::BitwiseXOR => Some(BinaryOp::BitXor),
        AssignmentOperator::BitwiseAnd => Some(BinaryOp::BitAnd),
        _ => return Err(ParseFailure::unsupported("assignment operator", span)),
    }))
}
