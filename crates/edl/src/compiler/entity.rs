//! Runtime objects built once at compile time: entities, attributes, and
//! macros.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast;
use crate::compiler::env::Env;
use crate::compiler::error::{CompileError, ResolveError, compute_suggestions};
use crate::compiler::expression::{self, Expr, GuardAllocator};
use crate::compiler::resolver::{self, Locals, Partial, Scope, Step};
use crate::types::Value;

/// A named top-level entry in the environment.
#[derive(Debug)]
pub enum Entry {
    Entity(Entity),
    Macro(Macro),
}

/// A named, top-level localizable unit with a primary value and zero or
/// more attributes.
///
/// The value expression is compiled eagerly but evaluated only at
/// resolution time. The index expressions select branches automatically
/// when no explicit key is given.
#[derive(Debug)]
pub struct Entity {
    pub name: String,
    /// Local entities are not meant for direct host lookup; the engine
    /// stores the flag, enforcement is the host's concern.
    pub local: bool,
    pub attributes: HashMap<String, Attribute>,
    pub(crate) value: Option<Rc<Expr>>,
    pub(crate) index: Vec<Rc<Expr>>,
}

impl Entity {
    pub(crate) fn compile(
        def: &ast::EntityDef,
        guards: &mut GuardAllocator,
    ) -> Result<Self, CompileError> {
        let value = def
            .value
            .as_ref()
            .map(|value| expression::compile(value, guards))
            .transpose()?;
        let index = def
            .index
            .iter()
            .map(|ind| expression::compile(ind, guards))
            .collect::<Result<_, _>>()?;
        let mut attributes = HashMap::new();
        for attr in &def.attributes {
            attributes.insert(attr.key.clone(), Attribute::compile(attr, guards)?);
        }
        Ok(Self {
            name: def.name.clone(),
            local: def.local,
            attributes,
            value,
            index,
        })
    }

    /// Fully resolve this entity's value against `data`, applying its own
    /// index expressions to select branches down to a terminal.
    pub fn resolve<'a>(
        &'a self,
        env: &'a Env,
        data: &HashMap<String, Value>,
    ) -> Result<Value, ResolveError> {
        let mut scope = Scope::new(env, data);
        self.resolve_with(&mut scope, None)
    }

    /// Fully resolve and return the terminal's textual form.
    pub fn to_text<'a>(
        &'a self,
        env: &'a Env,
        data: &HashMap<String, Value>,
    ) -> Result<String, ResolveError> {
        self.resolve(env, data).map(|value| value.to_string())
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Fully resolve the named attribute against `data`. A standalone
    /// attribute borrows this entity's index for branch selection.
    pub fn resolve_attribute<'a>(
        &'a self,
        name: &str,
        env: &'a Env,
        data: &HashMap<String, Value>,
    ) -> Result<Value, ResolveError> {
        let Some(attribute) = self.attributes.get(name) else {
            return Err(ResolveError::UnresolvedReference {
                name: name.to_string(),
                suggestions: compute_suggestions(name, &self.attribute_names()),
            });
        };
        let mut scope = Scope::new(env, data);
        AttrRef {
            entity: self,
            attribute,
        }
        .resolve_with(&mut scope, None)
    }

    /// Sorted attribute names, used for did-you-mean suggestions.
    pub(crate) fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Full resolution inside an in-flight call graph. `None` means "use
    /// this entity's own index"; an explicit index, even an empty one,
    /// replaces it.
    pub(crate) fn resolve_with<'env>(
        &'env self,
        scope: &mut Scope<'env, '_>,
        index: Option<&[Rc<Expr>]>,
    ) -> Result<Value, ResolveError> {
        scope.enter()?;
        let result = self.resolve_inner(scope, index);
        scope.leave();
        result
    }

    fn resolve_inner<'env>(
        &'env self,
        scope: &mut Scope<'env, '_>,
        index: Option<&[Rc<Expr>]>,
    ) -> Result<Value, ResolveError> {
        let value = self.value_expr()?;
        let step = Step {
            locals: Locals::for_entity(self),
            value: Partial::Expr(Rc::clone(value)),
        };
        resolver::resolve(step, scope, index.unwrap_or(&self.index))
    }

    /// Single-step resolution: one invocation of the value expression with
    /// an explicit branch key, used by property expressions to navigate a
    /// single level.
    pub(crate) fn yield_step<'env>(
        &'env self,
        scope: &mut Scope<'env, '_>,
        key: Value,
    ) -> Result<Step<'env>, ResolveError> {
        let value = self.value_expr()?;
        resolver::eval(
            value,
            Locals::for_entity(self),
            scope,
            Some(Partial::Terminal(key)),
        )
    }

    fn value_expr(&self) -> Result<&Rc<Expr>, ResolveError> {
        self.value
            .as_ref()
            .ok_or_else(|| ResolveError::UnresolvedReference {
                name: self.name.clone(),
                suggestions: Vec::new(),
            })
    }
}

/// A named sub-value belonging to an entity.
#[derive(Debug)]
pub struct Attribute {
    pub name: String,
    pub local: bool,
    pub(crate) value: Rc<Expr>,
}

impl Attribute {
    pub(crate) fn compile(
        def: &ast::AttributeDef,
        guards: &mut GuardAllocator,
    ) -> Result<Self, CompileError> {
        Ok(Self {
            name: def.key.clone(),
            local: def.local,
            value: expression::compile(&def.value, guards)?,
        })
    }
}

/// An attribute paired with its owning entity. The entity supplies the
/// current-entity context and the default index for standalone resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttrRef<'env> {
    pub(crate) entity: &'env Entity,
    pub(crate) attribute: &'env Attribute,
}

impl<'env> AttrRef<'env> {
    pub(crate) fn resolve_with(
        self,
        scope: &mut Scope<'env, '_>,
        index: Option<&[Rc<Expr>]>,
    ) -> Result<Value, ResolveError> {
        scope.enter()?;
        let step = Step {
            locals: Locals::for_entity(self.entity),
            value: Partial::Expr(Rc::clone(&self.attribute.value)),
        };
        let result = resolver::resolve(step, scope, index.unwrap_or(&self.entity.index));
        scope.leave();
        result
    }

    pub(crate) fn yield_step(
        self,
        scope: &mut Scope<'env, '_>,
        key: Value,
    ) -> Result<Step<'env>, ResolveError> {
        resolver::eval(
            &self.attribute.value,
            Locals::for_entity(self.entity),
            scope,
            Some(Partial::Terminal(key)),
        )
    }
}

/// A named, parametrized expression invoked like a function. Stateless
/// between calls; holds no mutable data.
#[derive(Debug)]
pub struct Macro {
    pub name: String,
    pub(crate) parameters: Vec<String>,
    pub(crate) body: Rc<Expr>,
}

impl Macro {
    pub(crate) fn compile(
        def: &ast::MacroDef,
        guards: &mut GuardAllocator,
    ) -> Result<Self, CompileError> {
        Ok(Self {
            name: def.name.clone(),
            parameters: def.parameters.clone(),
            body: expression::compile(&def.body, guards)?,
        })
    }

    /// Declared parameter names, in order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Invoke with already-evaluated arguments, binding parameters
    /// positionally over a copy of the caller's locals. Missing arguments
    /// leave their parameters unbound; surplus arguments are dropped.
    pub(crate) fn invoke<'env>(
        &'env self,
        caller: Locals<'env>,
        scope: &mut Scope<'env, '_>,
        arguments: Vec<Partial<'env>>,
    ) -> Result<Step<'env>, ResolveError> {
        scope.enter()?;
        let mut locals = caller;
        for (parameter, argument) in self.parameters.iter().zip(arguments) {
            locals.bind(parameter.clone(), argument);
        }
        let step = resolver::eval(&self.body, locals, scope, None);
        scope.leave();
        step
    }
}
