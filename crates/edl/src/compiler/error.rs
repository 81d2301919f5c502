//! Error types for compilation and resolution.

use thiserror::Error;

/// An error raised while compiling an AST into executable form.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An operator token the operator tables do not recognize. This means
    /// the parser handed the compiler a malformed tree.
    #[error("unknown operator token '{token}'")]
    UnknownOperator { token: String },
}

/// An error that occurred during one top-level resolution.
///
/// Errors abort only the resolution that raised them; the environment and
/// all compiled expressions are left untouched.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// An identifier, variable, global, attribute, or branch key that is
    /// absent and has no applicable default.
    #[error("unresolved reference '{name}'{}", render_suggestions(.suggestions))]
    UnresolvedReference {
        name: String,
        suggestions: Vec<String>,
    },

    /// An interpolated string re-entered while already being resolved on
    /// the same call chain.
    #[error("cyclic reference detected")]
    CyclicReference,

    /// A call expression whose callee is not a macro.
    #[error("value of kind {kind} is not callable")]
    TypeNotCallable { kind: &'static str },

    /// Full resolution completed with a value that still requires
    /// resolution.
    #[error("resolving '{name}' produced a non-terminal value")]
    NonTerminalResult { name: String },

    /// The resolution depth limit was exceeded, most likely by recursive
    /// macro calls or mutually referencing entities.
    #[error("maximum resolution depth exceeded")]
    MaxDepthExceeded,
}

fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}?", suggestions.join(", "))
    }
}

/// Compute did-you-mean suggestions for a missing name.
///
/// Returns up to three candidates within a small edit distance of `key`,
/// closest first. Short keys only tolerate a distance of one.
pub fn compute_suggestions(key: &str, available: &[String]) -> Vec<String> {
    let max_distance = if key.len() > 3 { 2 } else { 1 };

    let mut scored: Vec<(usize, &String)> = available
        .iter()
        .filter_map(|candidate| {
            let distance = strsim::levenshtein(key, candidate);
            (distance >= 1 && distance <= max_distance).then_some((distance, candidate))
        })
        .collect();

    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(3)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}
