pub mod ast;
pub mod compiler;
pub mod types;

pub use compiler::{
    Attribute, CompileError, Entity, Entry, Env, Macro, ResolveError, compute_suggestions,
};
pub use types::Value;

/// Creates a `HashMap<String, Value>` from key-value pairs.
///
/// Values are automatically converted via `Into<Value>`, so you can pass
/// numbers, strings, or booleans directly.
///
/// # Example
///
/// ```
/// use edl::{data, Value};
///
/// let d = data! { "count" => 3, "name" => "Alice" };
/// assert_eq!(d.len(), 2);
/// assert_eq!(d["count"].as_number(), Some(3.0));
/// assert_eq!(d["name"].as_str(), Some("Alice"));
/// ```
#[macro_export]
macro_rules! data {
    {} => {
        ::std::collections::HashMap::<String, $crate::Value>::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::HashMap::<String, $crate::Value>::new();
            $(
                map.insert($key.to_string(), ::std::convert::Into::<$crate::Value>::into($value));
            )+
            map
        }
    };
}
