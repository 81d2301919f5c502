//! Generic resolution: drives compiled expressions to terminal values.
//!
//! Resolution threads two pieces of state. [`Locals`] is the per-call scope
//! of bound names plus the current-entity slot; it is cloned at every
//! fan-out point so sibling evaluations never observe each other's
//! bindings. [`Scope`] is shared by the whole call graph of one top-level
//! resolution and carries the environment, the caller's data, the
//! interpolated-string visiting set, and the recursion depth.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::compiler::entity::{AttrRef, Entity, Entry, Macro};
use crate::compiler::env::Env;
use crate::compiler::error::{ResolveError, compute_suggestions};
use crate::compiler::expression::{Expr, Key};
use crate::compiler::operators::LogicalOp;
use crate::types::Value;

/// Per-resolution shared state.
pub(crate) struct Scope<'env, 'data> {
    pub(crate) env: &'env Env,
    pub(crate) data: &'data HashMap<String, Value>,
    /// Guard ids of interpolated strings currently being resolved.
    visiting: HashSet<u64>,
    depth: usize,
}

impl<'env, 'data> Scope<'env, 'data> {
    pub(crate) fn new(env: &'env Env, data: &'data HashMap<String, Value>) -> Self {
        Self {
            env,
            data,
            visiting: HashSet::new(),
            depth: 0,
        }
    }

    /// Enter a nested entity, attribute, or macro resolution.
    pub(crate) fn enter(&mut self) -> Result<(), ResolveError> {
        if self.depth >= self.env.max_depth() {
            return Err(ResolveError::MaxDepthExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    /// Mark an interpolated string as in flight. Returns false if it
    /// already is, which means the call chain looped back into it.
    fn begin_string(&mut self, guard: u64) -> bool {
        self.visiting.insert(guard)
    }

    fn end_string(&mut self, guard: u64) {
        self.visiting.remove(&guard);
    }
}

/// The ephemeral scope of bound names plus the current-entity slot.
///
/// Extended copy-on-write when a macro binds parameters; never mutated in
/// place across a fan-out.
#[derive(Debug, Clone, Default)]
pub(crate) struct Locals<'env> {
    pub(crate) current: Option<&'env Entity>,
    vars: HashMap<String, Partial<'env>>,
}

impl<'env> Locals<'env> {
    /// Fresh locals with `entity` as the current context.
    pub(crate) fn for_entity(entity: &'env Entity) -> Self {
        Self {
            current: Some(entity),
            vars: HashMap::new(),
        }
    }

    pub(crate) fn bind(&mut self, name: String, value: Partial<'env>) {
        self.vars.insert(name, value);
    }

    fn lookup(&self, name: &str) -> Option<&Partial<'env>> {
        self.vars.get(name)
    }

    fn names(&self) -> Vec<String> {
        self.vars.keys().cloned().collect()
    }
}

/// A resolution step's value: a terminal, or something requiring further
/// resolution.
#[derive(Debug, Clone)]
pub(crate) enum Partial<'env> {
    Terminal(Value),
    Expr(Rc<Expr>),
    Entity(&'env Entity),
    Attribute(AttrRef<'env>),
    Macro(&'env Macro),
}

impl Partial<'_> {
    /// Value-class name used in error messages.
    fn kind(&self) -> &'static str {
        match self {
            Partial::Terminal(Value::String(_)) => "string",
            Partial::Terminal(Value::Number(_)) => "number",
            Partial::Terminal(Value::Bool(_)) => "boolean",
            Partial::Expr(_) => "expression",
            Partial::Entity(_) => "entity",
            Partial::Attribute(_) => "attribute",
            Partial::Macro(_) => "macro",
        }
    }
}

/// The result of one evaluation step: possibly-rebound locals plus the
/// produced value.
pub(crate) struct Step<'env> {
    pub(crate) locals: Locals<'env>,
    pub(crate) value: Partial<'env>,
}

/// Drive a step to a terminal value, consuming `index` keys to select
/// branches in multi-branch values.
///
/// A terminal ends the walk immediately, ignoring unconsumed keys. An
/// entity or attribute delegates to its own full resolution with the
/// remaining index. Anything else is invoked with the next key (or none)
/// and the walk continues with the produced locals and value.
pub(crate) fn resolve<'env>(
    step: Step<'env>,
    scope: &mut Scope<'env, '_>,
    mut index: &[Rc<Expr>],
) -> Result<Value, ResolveError> {
    let Step {
        mut locals,
        value: mut current,
    } = step;
    loop {
        match current {
            Partial::Terminal(value) => return Ok(value),
            Partial::Entity(entity) => return entity.resolve_with(scope, Some(index)),
            Partial::Attribute(attr) => return attr.resolve_with(scope, Some(index)),
            Partial::Macro(m) => {
                return Err(ResolveError::NonTerminalResult {
                    name: m.name.clone(),
                });
            }
            Partial::Expr(expr) => {
                let key = match index.split_first() {
                    Some((first, rest)) => {
                        index = rest;
                        Some(Partial::Expr(Rc::clone(first)))
                    }
                    None => None,
                };
                let step = eval(&expr, locals, scope, key)?;
                locals = step.locals;
                current = step.value;
            }
        }
    }
}

/// Evaluate one compiled expression for a single step.
///
/// `key` is the branch selector handed to multi-branch values by the
/// resolver's index walk or by a property expression; every other node
/// kind ignores it.
pub(crate) fn eval<'env>(
    expr: &Rc<Expr>,
    mut locals: Locals<'env>,
    scope: &mut Scope<'env, '_>,
    key: Option<Partial<'env>>,
) -> Result<Step<'env>, ResolveError> {
    match expr.as_ref() {
        Expr::Identifier(name) => {
            let Some(entry) = scope.env.entry(name) else {
                return Err(unresolved(name, &scope.env.entry_names()));
            };
            let value = match entry {
                Entry::Entity(entity) => {
                    locals.current = Some(entity);
                    Partial::Entity(entity)
                }
                Entry::Macro(m) => Partial::Macro(m),
            };
            Ok(Step { locals, value })
        }
        Expr::This => {
            let Some(entity) = locals.current else {
                return Err(unresolved("~", &[]));
            };
            Ok(Step {
                locals,
                value: Partial::Entity(entity),
            })
        }
        Expr::Variable(name) => {
            // A present binding wins even when bound to a falsy value;
            // only a strictly absent name falls through to data.
            if let Some(bound) = locals.lookup(name).cloned() {
                return Ok(Step {
                    locals,
                    value: bound,
                });
            }
            let Some(value) = scope.data.get(name) else {
                return Err(unresolved(name, &variable_candidates(&locals, scope)));
            };
            let value = Partial::Terminal(value.clone());
            Ok(Step { locals, value })
        }
        Expr::Global(name) => {
            let Some(value) = scope.env.global(name) else {
                return Err(unresolved(name, &scope.env.global_names()));
            };
            let value = Partial::Terminal(value.clone());
            Ok(Step { locals, value })
        }
        Expr::Literal(value) => Ok(Step {
            locals,
            value: Partial::Terminal(value.clone()),
        }),
        Expr::Array { items, default } => {
            let key = resolve_key(key, &locals, scope)?;
            let position = key
                .filter(Value::is_truthy)
                .and_then(|k| array_position(&k, items.len()))
                .unwrap_or(*default);
            let Some(item) = items.get(position) else {
                return Err(unresolved("default branch", &[]));
            };
            Ok(Step {
                locals,
                value: Partial::Expr(Rc::clone(item)),
            })
        }
        Expr::Hash { items, default } => {
            let key = resolve_key(key, &locals, scope)?;
            let name = key.filter(Value::is_truthy).map(|k| k.to_string());
            let position = name
                .as_deref()
                .and_then(|n| items.iter().position(|(declared, _)| declared.as_str() == n))
                .or(*default);
            let Some(position) = position else {
                return Err(unresolved(name.as_deref().unwrap_or("default branch"), &[]));
            };
            let (_, item) = &items[position];
            Ok(Step {
                locals,
                value: Partial::Expr(Rc::clone(item)),
            })
        }
        Expr::ComplexString { parts, guard } => {
            if !scope.begin_string(*guard) {
                return Err(ResolveError::CyclicReference);
            }
            let mut joined = String::new();
            for part in parts {
                match resolve_expr(part, &locals, scope) {
                    Ok(value) => joined.push_str(&value.to_string()),
                    Err(error) => {
                        // The guard must be released on the failure path too.
                        scope.end_string(*guard);
                        return Err(error);
                    }
                }
            }
            scope.end_string(*guard);
            Ok(Step {
                locals,
                value: Partial::Terminal(Value::String(joined)),
            })
        }
        Expr::Unary { op, argument } => {
            let argument = resolve_expr(argument, &locals, scope)?;
            Ok(Step {
                locals,
                value: Partial::Terminal(op.apply(&argument)),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = resolve_expr(left, &locals, scope)?;
            let right = resolve_expr(right, &locals, scope)?;
            Ok(Step {
                locals,
                value: Partial::Terminal(op.apply(&left, &right)),
            })
        }
        Expr::Logical { op, left, right } => {
            let left = resolve_expr(left, &locals, scope)?;
            let decided = match op {
                LogicalOp::And => !left.is_truthy(),
                LogicalOp::Or => left.is_truthy(),
            };
            let value = if decided {
                left
            } else {
                resolve_expr(right, &locals, scope)?
            };
            Ok(Step {
                locals,
                value: Partial::Terminal(value),
            })
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = resolve_expr(test, &locals, scope)?;
            let branch = if test.is_truthy() { consequent } else { alternate };
            // Evaluate a single step so the caller's index walk can
            // continue into the chosen branch.
            eval(branch, locals, scope, None)
        }
        Expr::Call { callee, arguments } => {
            // Arguments are evaluated first, against the caller's context;
            // they never see the callee's parameter bindings.
            let mut evaluated = Vec::with_capacity(arguments.len());
            for argument in arguments {
                let step = eval(argument, locals.clone(), scope, None)?;
                evaluated.push(step.value);
            }
            let step = eval(callee, locals, scope, None)?;
            match step.value {
                Partial::Macro(m) => m.invoke(step.locals, scope, evaluated),
                other => Err(ResolveError::TypeNotCallable { kind: other.kind() }),
            }
        }
        Expr::Property { base, key: selector } => {
            let selector = resolve_selector(selector, &locals, scope)?;
            let step = eval(base, locals, scope, None)?;
            match step.value {
                Partial::Entity(entity) => entity.yield_step(scope, selector),
                Partial::Attribute(attr) => attr.yield_step(scope, selector),
                Partial::Expr(expr) => eval(
                    &expr,
                    step.locals,
                    scope,
                    Some(Partial::Terminal(selector)),
                ),
                Partial::Terminal(_) | Partial::Macro(_) => {
                    Err(unresolved(&selector.to_string(), &[]))
                }
            }
        }
        Expr::AttributeAccess { base, key: selector } => {
            let name = resolve_selector(selector, &locals, scope)?.to_string();
            let step = eval(base, locals, scope, None)?;
            match step.value {
                Partial::Entity(entity) => match entity.attributes.get(&name) {
                    Some(attribute) => Ok(Step {
                        locals: step.locals,
                        value: Partial::Attribute(AttrRef { entity, attribute }),
                    }),
                    None => Err(unresolved(&name, &entity.attribute_names())),
                },
                _ => Err(unresolved(&name, &[])),
            }
        }
    }
}

/// Fully resolve `expr` to a terminal, without consuming the caller's
/// index. Rebinds produced by the inner walk are discarded.
fn resolve_expr<'env>(
    expr: &Rc<Expr>,
    locals: &Locals<'env>,
    scope: &mut Scope<'env, '_>,
) -> Result<Value, ResolveError> {
    resolve(
        Step {
            locals: locals.clone(),
            value: Partial::Expr(Rc::clone(expr)),
        },
        scope,
        &[],
    )
}

/// Fully resolve a branch-selector key to a terminal, if one was supplied.
fn resolve_key<'env>(
    key: Option<Partial<'env>>,
    locals: &Locals<'env>,
    scope: &mut Scope<'env, '_>,
) -> Result<Option<Value>, ResolveError> {
    match key {
        Some(key) => resolve(
            Step {
                locals: locals.clone(),
                value: key,
            },
            scope,
            &[],
        )
        .map(Some),
        None => Ok(None),
    }
}

fn resolve_selector<'env>(
    key: &Key,
    locals: &Locals<'env>,
    scope: &mut Scope<'env, '_>,
) -> Result<Value, ResolveError> {
    match key {
        Key::Name(name) => Ok(Value::String(name.clone())),
        Key::Computed(expr) => resolve_expr(expr, locals, scope),
    }
}

/// Interpret a terminal key as an array position. Numeric strings count.
fn array_position(key: &Value, len: usize) -> Option<usize> {
    let position = match key {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => *n as usize,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    (position < len).then_some(position)
}

fn variable_candidates(locals: &Locals<'_>, scope: &Scope<'_, '_>) -> Vec<String> {
    let mut names: Vec<String> = scope.data.keys().cloned().collect();
    names.extend(locals.names());
    names.sort();
    names.dedup();
    names
}

fn unresolved(name: &str, available: &[String]) -> ResolveError {
    ResolveError::UnresolvedReference {
        name: name.to_string(),
        suggestions: compute_suggestions(name, available),
    }
}
