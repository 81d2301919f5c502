//! Tests for the engine foundation: values, compilation, and the registry.

use edl::ast::{EntityDef, Expression, MacroDef, TopLevel};
use edl::{Entry, Env, Value, data};

fn compiled(nodes: Vec<TopLevel>) -> Env {
    let mut env = Env::new();
    env.compile(&nodes).unwrap();
    env
}

fn entity(name: &str, value: Expression) -> TopLevel {
    TopLevel::Entity(EntityDef::builder().name(name).value(value).build())
}

// === Literal Resolution ===

#[test]
fn number_literal_resolves_unchanged() {
    let env = compiled(vec![entity("n", Expression::number(5.0))]);
    let value = env
        .resolve_entity("n", &data! { "junk" => "ignored" })
        .unwrap();
    assert_eq!(value, Value::Number(5.0));
}

#[test]
fn string_literal_resolves_unchanged() {
    let env = compiled(vec![entity("s", Expression::string("Hello"))]);
    let value = env.resolve_entity("s", &data! {}).unwrap();
    assert_eq!(value, Value::String("Hello".to_string()));
}

#[test]
fn literal_ignores_index_expressions() {
    // The walk ends as soon as it hits a terminal, so index keys past that
    // point are never evaluated, even unresolvable ones.
    let def = EntityDef::builder()
        .name("n")
        .value(Expression::number(7.0))
        .index(vec![Expression::variable("missing")])
        .build();
    let env = compiled(vec![TopLevel::Entity(def)]);
    let value = env.resolve_entity("n", &data! {}).unwrap();
    assert_eq!(value, Value::Number(7.0));
}

#[test]
fn parenthesis_is_transparent() {
    let env = compiled(vec![entity(
        "n",
        Expression::parenthesis(Expression::number(5.0)),
    )]);
    assert_eq!(
        env.resolve_entity("n", &data! {}).unwrap(),
        Value::Number(5.0)
    );
}

#[test]
fn operatorless_logical_is_a_passthrough() {
    let passthrough = Expression::Logical {
        operator: None,
        left: Box::new(Expression::string("inner")),
        right: None,
    };
    let env = compiled(vec![entity("p", passthrough)]);
    assert_eq!(
        env.resolve_entity("p", &data! {}).unwrap().to_string(),
        "inner"
    );
}

// === Value Type ===

#[test]
fn value_conversions() {
    assert_eq!(Value::from(3), Value::Number(3.0));
    assert_eq!(Value::from(1.5), Value::Number(1.5));
    assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
    assert_eq!(Value::from(true), Value::Bool(true));
}

#[test]
fn value_display() {
    assert_eq!(Value::Number(5.0).to_string(), "5");
    assert_eq!(Value::Number(1.5).to_string(), "1.5");
    assert_eq!(Value::String("x".to_string()).to_string(), "x");
    assert_eq!(Value::Bool(true).to_string(), "true");
}

#[test]
fn value_truthiness() {
    assert!(Value::Number(1.0).is_truthy());
    assert!(!Value::Number(0.0).is_truthy());
    assert!(!Value::Number(f64::NAN).is_truthy());
    assert!(Value::String("x".to_string()).is_truthy());
    assert!(!Value::String(String::new()).is_truthy());
    assert!(Value::Bool(true).is_truthy());
    assert!(!Value::Bool(false).is_truthy());
}

#[test]
fn data_macro_builds_value_map() {
    let d = data! { "n" => 3, "name" => "Ada", "on" => true };
    assert_eq!(d.len(), 3);
    assert_eq!(d["n"], Value::Number(3.0));
    assert_eq!(d["name"], Value::String("Ada".to_string()));
    assert_eq!(d["on"], Value::Bool(true));
    assert!(data! {}.is_empty());
}

// === Compilation & Registry ===

#[test]
fn compile_returns_definition_count_and_skips_comments() {
    let mut env = Env::new();
    let count = env
        .compile(&[
            TopLevel::Comment("header".to_string()),
            entity("a", Expression::number(1.0)),
            TopLevel::Macro(
                MacroDef::builder()
                    .name("m")
                    .body(Expression::number(2.0))
                    .build(),
            ),
        ])
        .unwrap();
    assert_eq!(count, 2);
    assert!(matches!(env.entry("a"), Some(Entry::Entity(_))));
    assert!(matches!(env.entry("m"), Some(Entry::Macro(_))));
    assert!(env.entry("missing").is_none());
}

#[test]
fn last_declaration_wins_within_one_pass() {
    let env = compiled(vec![
        entity("greeting", Expression::string("first")),
        entity("greeting", Expression::string("second")),
    ]);
    assert_eq!(
        env.resolve_entity("greeting", &data! {}).unwrap().to_string(),
        "second"
    );
}

#[test]
fn last_declaration_wins_across_compile_calls() {
    let mut env = Env::new();
    env.compile(&[entity("greeting", Expression::string("first"))])
        .unwrap();
    env.compile(&[entity("greeting", Expression::string("second"))])
        .unwrap();
    assert_eq!(
        env.resolve_entity("greeting", &data! {}).unwrap().to_string(),
        "second"
    );
}

#[test]
fn macro_definition_replaces_entity_of_same_name() {
    let env = compiled(vec![
        entity("thing", Expression::string("entity")),
        TopLevel::Macro(
            MacroDef::builder()
                .name("thing")
                .body(Expression::number(1.0))
                .build(),
        ),
    ]);
    assert!(matches!(env.entry("thing"), Some(Entry::Macro(_))));
}

#[test]
fn local_flag_is_stored() {
    let def = EntityDef::builder()
        .name("hidden")
        .value(Expression::string("x"))
        .local(true)
        .build();
    let env = compiled(vec![TopLevel::Entity(def)]);
    assert!(env.entity("hidden").unwrap().local);
}

#[test]
fn env_builder_sets_globals() {
    let mut env = Env::builder().globals(data! { "os" => "linux" }).build();
    env.compile(&[entity("which", Expression::global("os"))])
        .unwrap();
    assert_eq!(
        env.resolve_entity("which", &data! {}).unwrap().to_string(),
        "linux"
    );
}

#[test]
fn set_global_after_build() {
    let mut env = Env::new();
    env.set_global("hour", 14);
    env.compile(&[entity("h", Expression::global("hour"))])
        .unwrap();
    assert_eq!(
        env.resolve_entity("h", &data! {}).unwrap(),
        Value::Number(14.0)
    );
}

#[test]
fn entity_to_text() {
    let env = compiled(vec![entity("n", Expression::number(5.0))]);
    let e = env.entity("n").unwrap();
    assert_eq!(e.to_text(&env, &data! {}).unwrap(), "5");
}
