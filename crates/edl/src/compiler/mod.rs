//! The compile-and-resolve engine.
//!
//! Compilation turns the input AST into a tree of executable expressions
//! owned by entity, attribute, and macro objects registered in an [`Env`].
//! Resolution drives those expressions against caller-supplied data to a
//! terminal value, selecting variant branches through index expressions or
//! explicit keys.

mod entity;
mod env;
mod error;
mod expression;
mod operators;
mod resolver;

pub use entity::{Attribute, Entity, Entry, Macro};
pub use env::Env;
pub use error::{CompileError, ResolveError, compute_suggestions};
