//! Placeholder resolution for step values
//!
//! A value that starts with `{{` and ends with `}}` is looked up in a
//! [`VariableSource`] under its inner text, with surrounding braces and
//! spaces trimmed. Every other value is used verbatim.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\{\{(.*)\}\}$").expect("placeholder pattern is valid")
});

/// Where placeholder values come from
pub trait VariableSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads placeholder values from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVariables;

impl VariableSource for EnvVariables {
    fn get(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.contains(['=', '\0']) {
            return None;
        }
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, for isolated runs and tests
#[derive(Debug, Clone, Default)]
pub struct MapVariables {
    values: HashMap<String, String>,
}

impl MapVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl VariableSource for MapVariables {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Name of the variable referenced by `value`, if it is a placeholder.
pub fn placeholder_name(value: &str) -> Option<&str> {
    PLACEHOLDER
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '{' || c == '}' || c == ' '))
}

/// Resolve `value` against `source`. Unset variables resolve to `""`.
pub fn resolve_placeholder(value: &str, source: &dyn VariableSource) -> String {
    match placeholder_name(value) {
        Some(name) => source.get(name).unwrap_or_default(),
        None => value.to_string(),
    }
}
