//! Public AST types for entity definition sources.
//!
//! The engine does not parse source text; an external parser hands it this
//! node tree, already structurally validated. The types are public so hosts
//! and tooling can construct or deserialize trees directly.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// A top-level node in a definition source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopLevel {
    /// A named localizable entity.
    Entity(EntityDef),
    /// A named, parametrized macro.
    Macro(MacroDef),
    /// A source comment, ignored by compilation.
    Comment(String),
}

/// Definition of an entity: a primary value, index expressions for
/// automatic branch selection, and named attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
pub struct EntityDef {
    pub name: String,
    pub value: Option<Expression>,
    #[builder(default)]
    pub index: Vec<Expression>,
    #[builder(default)]
    pub attributes: Vec<AttributeDef>,
    /// Entities flagged local are not meant for direct host lookup.
    #[builder(default)]
    pub local: bool,
}

/// Definition of an attribute: a named sub-value of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
pub struct AttributeDef {
    pub key: String,
    pub value: Expression,
    #[builder(default)]
    pub local: bool,
}

/// Definition of a macro: parameter names and a body expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
pub struct MacroDef {
    pub name: String,
    #[builder(default)]
    pub parameters: Vec<String>,
    pub body: Expression,
}

/// An expression node.
///
/// Operator tokens are carried as source strings; the compiler maps them to
/// its operator tables and rejects unknown tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Reference to a top-level entity or macro by name.
    Identifier { name: String },
    /// Reference to the entity currently being resolved.
    This,
    /// Reference to a local binding, falling back to caller data.
    Variable { name: String },
    /// Reference to a host-supplied global constant.
    Global { name: String },
    /// A number literal.
    Number { value: f64 },
    /// A string literal.
    String { value: String },
    /// An ordered multi-branch value selected by position.
    Array { items: Vec<ArrayItem> },
    /// An ordered multi-branch value selected by key name.
    Hash { items: Vec<HashItem> },
    /// An interpolated string: parts are resolved and concatenated.
    ComplexString { parts: Vec<Expression> },
    Unary {
        operator: String,
        argument: Box<Expression>,
    },
    Binary {
        operator: String,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// A logical expression. With no operator the node is a passthrough of
    /// its left operand.
    Logical {
        operator: Option<String>,
        left: Box<Expression>,
        right: Option<Box<Expression>>,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    /// A macro invocation.
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// Branch selection on the base expression: `base[key]` or `base.key`.
    Property {
        expression: Box<Expression>,
        property: PropertyAccess,
    },
    /// Attribute lookup on an entity: `base::key`.
    Attribute {
        expression: Box<Expression>,
        attribute: PropertyAccess,
    },
    /// Grouping; transparent to compilation.
    Parenthesis { expression: Box<Expression> },
}

/// A property or attribute selector: a literal name, or a computed
/// expression resolved at lookup time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyAccess {
    Name(String),
    Computed(Box<Expression>),
}

/// One element of an array literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItem {
    pub value: Expression,
    /// Marks this element as the fallback branch.
    pub default: bool,
}

impl ArrayItem {
    pub fn new(value: Expression) -> Self {
        Self {
            value,
            default: false,
        }
    }

    pub fn default_branch(value: Expression) -> Self {
        Self {
            value,
            default: true,
        }
    }
}

/// One element of a hash literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashItem {
    pub key: String,
    pub value: Expression,
    /// Marks this element as the fallback branch.
    pub default: bool,
}

impl HashItem {
    pub fn new(key: impl Into<String>, value: Expression) -> Self {
        Self {
            key: key.into(),
            value,
            default: false,
        }
    }

    pub fn default_branch(key: impl Into<String>, value: Expression) -> Self {
        Self {
            key: key.into(),
            value,
            default: true,
        }
    }
}

/// Shorthand constructors, mainly for hosts assembling trees by hand.
impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier { name: name.into() }
    }

    pub fn this() -> Self {
        Expression::This
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable { name: name.into() }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Expression::Global { name: name.into() }
    }

    pub fn number(value: f64) -> Self {
        Expression::Number { value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::String {
            value: value.into(),
        }
    }

    pub fn array(items: Vec<ArrayItem>) -> Self {
        Expression::Array { items }
    }

    pub fn hash(items: Vec<HashItem>) -> Self {
        Expression::Hash { items }
    }

    pub fn complex(parts: Vec<Expression>) -> Self {
        Expression::ComplexString { parts }
    }

    pub fn unary(operator: impl Into<String>, argument: Expression) -> Self {
        Expression::Unary {
            operator: operator.into(),
            argument: Box::new(argument),
        }
    }

    pub fn binary(operator: impl Into<String>, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator: operator.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logical(operator: impl Into<String>, left: Expression, right: Expression) -> Self {
        Expression::Logical {
            operator: Some(operator.into()),
            left: Box::new(left),
            right: Some(Box::new(right)),
        }
    }

    pub fn conditional(test: Expression, consequent: Expression, alternate: Expression) -> Self {
        Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    pub fn property(expression: Expression, name: impl Into<String>) -> Self {
        Expression::Property {
            expression: Box::new(expression),
            property: PropertyAccess::Name(name.into()),
        }
    }

    pub fn property_computed(expression: Expression, key: Expression) -> Self {
        Expression::Property {
            expression: Box::new(expression),
            property: PropertyAccess::Computed(Box::new(key)),
        }
    }

    pub fn attribute(expression: Expression, name: impl Into<String>) -> Self {
        Expression::Attribute {
            expression: Box::new(expression),
            attribute: PropertyAccess::Name(name.into()),
        }
    }

    pub fn attribute_computed(expression: Expression, key: Expression) -> Self {
        Expression::Attribute {
            expression: Box::new(expression),
            attribute: PropertyAccess::Computed(Box::new(key)),
        }
    }

    pub fn parenthesis(expression: Expression) -> Self {
        Expression::Parenthesis {
            expression: Box::new(expression),
        }
    }
}
