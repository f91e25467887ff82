//! Core option variables
//!
//! Libretro-style cores expose named options ("variables") that the host can
//! read and override. They ride along in the session configuration and can be
//! updated at runtime.

use serde::{Deserialize, Serialize};

/// A single core option: key, current value and a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

impl Variable {
    /// Create a variable with an empty description.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: String::new(),
        }
    }

    /// Create a variable with a description.
    pub fn with_description(
        key: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: description.into(),
        }
    }
}

/// Find a variable by key in a slice of variables.
pub fn find<'a>(variables: &'a [Variable], key: &str) -> Option<&'a Variable> {
    variables.iter().find(|v| v.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_construction() {
        let v = Variable::new("gambatte_gb_colorization", "auto");
        assert_eq!(v.key, "gambatte_gb_colorization");
        assert_eq!(v.value, "auto");
        assert!(v.description.is_empty());
    }

    #[test]
    fn test_find_by_key() {
        let vars = vec![
            Variable::new("a", "1"),
            Variable::with_description("b", "2", "second"),
        ];
        assert_eq!(find(&vars, "b").map(|v| v.value.as_str()), Some("2"));
        assert!(find(&vars, "missing").is_none());
    }
}
