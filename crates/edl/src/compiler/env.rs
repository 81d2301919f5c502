//! The shared environment: compiled entries plus host-supplied globals.

use std::collections::HashMap;

use bon::Builder;

use crate::ast;
use crate::compiler::entity::{Entity, Entry, Macro};
use crate::compiler::error::{CompileError, ResolveError, compute_suggestions};
use crate::compiler::expression::GuardAllocator;
use crate::types::Value;

/// The shared, compile-time-populated registry of named entities and
/// macros, plus host-supplied global constants.
///
/// An environment is long-lived: compile once, resolve many times. Entries
/// and globals are read-only during resolution, so any number of
/// resolutions may be interleaved against the same environment.
///
/// # Example
///
/// ```
/// use edl::ast::{EntityDef, Expression, TopLevel};
/// use edl::{Env, data};
///
/// let greeting = EntityDef::builder()
///     .name("greeting")
///     .value(Expression::string("Hello, world!"))
///     .build();
///
/// let mut env = Env::new();
/// env.compile(&[TopLevel::Entity(greeting)]).unwrap();
///
/// let value = env.resolve_entity("greeting", &data! {}).unwrap();
/// assert_eq!(value.to_string(), "Hello, world!");
/// ```
#[derive(Debug, Builder)]
pub struct Env {
    /// Host-supplied global constants, read-only during resolution.
    #[builder(default)]
    globals: HashMap<String, Value>,

    /// Resolution depth limit. Recursive macros and mutually referencing
    /// entities fail with `MaxDepthExceeded` instead of overflowing the
    /// stack; hosts that want deeper recursion raise this.
    #[builder(default = 64)]
    max_depth: usize,

    #[builder(skip)]
    entries: HashMap<String, Entry>,

    #[builder(skip)]
    guards: GuardAllocator,
}

impl Default for Env {
    fn default() -> Self {
        Env::builder().build()
    }
}

impl Env {
    /// Create an environment with no globals and the default depth limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a top-level node list into this environment.
    ///
    /// Each entity or macro node is eagerly constructed and stored under
    /// its declared name; a later declaration of the same name overwrites
    /// the earlier one without a diagnostic. Comments are skipped. Returns
    /// the number of definitions compiled.
    pub fn compile(&mut self, nodes: &[ast::TopLevel]) -> Result<usize, CompileError> {
        let mut count = 0;
        for node in nodes {
            match node {
                ast::TopLevel::Entity(def) => {
                    let entity = Entity::compile(def, &mut self.guards)?;
                    self.entries.insert(entity.name.clone(), Entry::Entity(entity));
                    count += 1;
                }
                ast::TopLevel::Macro(def) => {
                    let compiled = Macro::compile(def, &mut self.guards)?;
                    self.entries.insert(compiled.name.clone(), Entry::Macro(compiled));
                    count += 1;
                }
                ast::TopLevel::Comment(_) => {}
            }
        }
        Ok(count)
    }

    /// Get an entry by name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Get a compiled entity by name. Returns `None` for macros.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        match self.entries.get(name) {
            Some(Entry::Entity(entity)) => Some(entity),
            _ => None,
        }
    }

    /// Get a host-supplied global constant.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Set a host-supplied global constant.
    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Fully resolve the named entity against `data`.
    pub fn resolve_entity(
        &self,
        name: &str,
        data: &HashMap<String, Value>,
    ) -> Result<Value, ResolveError> {
        match self.entries.get(name) {
            Some(Entry::Entity(entity)) => entity.resolve(self, data),
            Some(Entry::Macro(_)) => Err(ResolveError::NonTerminalResult {
                name: name.to_string(),
            }),
            None => Err(ResolveError::UnresolvedReference {
                name: name.to_string(),
                suggestions: compute_suggestions(name, &self.entry_names()),
            }),
        }
    }

    /// Fully resolve an attribute of the named entity against `data`.
    pub fn resolve_attribute(
        &self,
        entity: &str,
        attribute: &str,
        data: &HashMap<String, Value>,
    ) -> Result<Value, ResolveError> {
        match self.entries.get(entity) {
            Some(Entry::Entity(entity)) => entity.resolve_attribute(attribute, self, data),
            Some(Entry::Macro(_)) => Err(ResolveError::NonTerminalResult {
                name: entity.to_string(),
            }),
            None => Err(ResolveError::UnresolvedReference {
                name: entity.to_string(),
                suggestions: compute_suggestions(entity, &self.entry_names()),
            }),
        }
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Sorted entry names, used for did-you-mean suggestions.
    pub(crate) fn entry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted global names, used for did-you-mean suggestions.
    pub(crate) fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.globals.keys().cloned().collect();
        names.sort();
        names
    }
}
