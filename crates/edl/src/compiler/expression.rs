//! Compilation of AST nodes into executable expressions.
//!
//! Compilation is bottom-up: children are compiled before their parents.
//! Shape is fixed eagerly (literal kinds, operator tables, branch layout);
//! nothing is evaluated until resolution time. Subtrees are held behind
//! `Rc` so entities, attributes, and index lists can share them.

use std::rc::Rc;

use crate::ast;
use crate::compiler::error::CompileError;
use crate::compiler::operators::{BinaryOp, LogicalOp, UnaryOp};
use crate::types::Value;

/// A compiled expression, invoked one step at a time by the resolver.
#[derive(Debug)]
pub(crate) enum Expr {
    Identifier(String),
    This,
    Variable(String),
    Global(String),
    Literal(Value),
    Array {
        items: Vec<Rc<Expr>>,
        /// Position of the fallback element: the last one flagged default,
        /// else 0.
        default: usize,
    },
    Hash {
        items: Vec<(String, Rc<Expr>)>,
        /// Position of the fallback element: the first one flagged default,
        /// else the first declared. `None` only for an empty hash.
        default: Option<usize>,
    },
    ComplexString {
        parts: Vec<Rc<Expr>>,
        /// Identity key for the reentrancy visiting-set.
        guard: u64,
    },
    Unary {
        op: UnaryOp,
        argument: Rc<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Conditional {
        test: Rc<Expr>,
        consequent: Rc<Expr>,
        alternate: Rc<Expr>,
    },
    Call {
        callee: Rc<Expr>,
        arguments: Vec<Rc<Expr>>,
    },
    Property {
        base: Rc<Expr>,
        key: Key,
    },
    AttributeAccess {
        base: Rc<Expr>,
        key: Key,
    },
}

/// A property or attribute selector: a literal name or a computed
/// expression resolved at lookup time.
#[derive(Debug)]
pub(crate) enum Key {
    Name(String),
    Computed(Rc<Expr>),
}

/// Hands out environment-unique guard ids for interpolated strings.
#[derive(Debug, Default)]
pub(crate) struct GuardAllocator {
    next: u64,
}

impl GuardAllocator {
    pub(crate) fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

pub(crate) fn compile(
    node: &ast::Expression,
    guards: &mut GuardAllocator,
) -> Result<Rc<Expr>, CompileError> {
    let compiled = match node {
        ast::Expression::Identifier { name } => Expr::Identifier(name.clone()),
        ast::Expression::This => Expr::This,
        ast::Expression::Variable { name } => Expr::Variable(name.clone()),
        ast::Expression::Global { name } => Expr::Global(name.clone()),
        ast::Expression::Number { value } => Expr::Literal(Value::Number(*value)),
        ast::Expression::String { value } => Expr::Literal(Value::String(value.clone())),
        ast::Expression::Array { items } => {
            let mut default = 0;
            let mut compiled_items = Vec::with_capacity(items.len());
            for (position, item) in items.iter().enumerate() {
                compiled_items.push(compile(&item.value, guards)?);
                if item.default {
                    default = position;
                }
            }
            Expr::Array {
                items: compiled_items,
                default,
            }
        }
        ast::Expression::Hash { items } => {
            let mut default = None;
            let mut compiled_items = Vec::with_capacity(items.len());
            for (position, item) in items.iter().enumerate() {
                compiled_items.push((item.key.clone(), compile(&item.value, guards)?));
                if item.default && default.is_none() {
                    default = Some(position);
                }
            }
            if default.is_none() && !items.is_empty() {
                default = Some(0);
            }
            Expr::Hash {
                items: compiled_items,
                default,
            }
        }
        ast::Expression::ComplexString { parts } => {
            let compiled_parts = parts
                .iter()
                .map(|part| compile(part, guards))
                .collect::<Result<_, _>>()?;
            Expr::ComplexString {
                parts: compiled_parts,
                guard: guards.allocate(),
            }
        }
        ast::Expression::Unary { operator, argument } => Expr::Unary {
            op: UnaryOp::from_token(operator)?,
            argument: compile(argument, guards)?,
        },
        ast::Expression::Binary {
            operator,
            left,
            right,
        } => Expr::Binary {
            op: BinaryOp::from_token(operator)?,
            left: compile(left, guards)?,
            right: compile(right, guards)?,
        },
        ast::Expression::Logical {
            operator: Some(token),
            left,
            right: Some(right),
        } => Expr::Logical {
            op: LogicalOp::from_token(token)?,
            left: compile(left, guards)?,
            right: compile(right, guards)?,
        },
        // An operator-less logical node, or one missing its right operand,
        // is a passthrough of its left operand.
        ast::Expression::Logical { left, .. } => return compile(left, guards),
        ast::Expression::Conditional {
            test,
            consequent,
            alternate,
        } => Expr::Conditional {
            test: compile(test, guards)?,
            consequent: compile(consequent, guards)?,
            alternate: compile(alternate, guards)?,
        },
        ast::Expression::Call { callee, arguments } => Expr::Call {
            callee: compile(callee, guards)?,
            arguments: arguments
                .iter()
                .map(|argument| compile(argument, guards))
                .collect::<Result<_, _>>()?,
        },
        ast::Expression::Property {
            expression,
            property,
        } => Expr::Property {
            base: compile(expression, guards)?,
            key: compile_key(property, guards)?,
        },
        ast::Expression::Attribute {
            expression,
            attribute,
        } => Expr::AttributeAccess {
            base: compile(expression, guards)?,
            key: compile_key(attribute, guards)?,
        },
        ast::Expression::Parenthesis { expression } => return compile(expression, guards),
    };
    Ok(Rc::new(compiled))
}

fn compile_key(access: &ast::PropertyAccess, guards: &mut GuardAllocator) -> Result<Key, CompileError> {
    match access {
        ast::PropertyAccess::Name(name) => Ok(Key::Name(name.clone())),
        ast::PropertyAccess::Computed(expression) => {
            Ok(Key::Computed(compile(expression, guards)?))
        }
    }
}
