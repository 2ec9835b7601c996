#![forbid(unsafe_code)]

//! Validate-message templates.
//!
//! Templates are plain strings with `${var}` placeholders. Keys are flat and
//! dotted (`"string.min"`), so a form can override a single message without
//! restating the whole table. `${name}` is always bound to the field path
//! joined with `.`; any other variable comes from the caller.

use std::collections::BTreeMap;

const DEFAULTS: &[(&str, &str)] = &[
    ("default", "Validation error on field ${name}"),
    ("required", "'${name}' is required"),
    ("enum", "'${name}' must be one of [${enum}]"),
    ("whitespace", "'${name}' cannot be empty"),
    ("types.string", "'${name}' is not a valid string"),
    ("types.number", "'${name}' is not a valid number"),
    ("types.boolean", "'${name}' is not a valid boolean"),
    ("types.array", "'${name}' is not a valid array"),
    ("types.object", "'${name}' is not a valid object"),
    ("string.len", "'${name}' must be exactly ${len} characters"),
    ("string.min", "'${name}' must be at least ${min} characters"),
    ("string.max", "'${name}' cannot be longer than ${max} characters"),
    ("string.range", "'${name}' must be between ${min} and ${max} characters"),
    ("number.len", "'${name}' must equal ${len}"),
    ("number.min", "'${name}' cannot be less than ${min}"),
    ("number.max", "'${name}' cannot be greater than ${max}"),
    ("number.range", "'${name}' must be between ${min} and ${max}"),
    ("array.len", "'${name}' must be exactly ${len} in length"),
    ("array.min", "'${name}' cannot be less than ${min} in length"),
    ("array.max", "'${name}' cannot be greater than ${max} in length"),
    ("array.range", "'${name}' must be between ${min} and ${max} in length"),
    ("pattern.mismatch", "'${name}' does not match pattern ${pattern}"),
];

/// A table of message templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateMessages {
    templates: BTreeMap<String, String>,
}

impl Default for ValidateMessages {
    /// The built-in English table.
    fn default() -> Self {
        DEFAULTS.iter().copied().collect()
    }
}

impl ValidateMessages {
    /// A table with no templates at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Add or replace one template.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }

    /// This table with every entry of `overrides` laid on top.
    #[must_use]
    pub fn merged(&self, overrides: &ValidateMessages) -> Self {
        let mut templates = self.templates.clone();
        templates.extend(
            overrides
                .templates
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self { templates }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    /// Render the template at `key`, or `None` if the table has no such key.
    #[must_use]
    pub fn format<'a>(
        &self,
        key: &str,
        vars: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Option<String> {
        self.get(key).map(|template| interpolate(template, vars))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValidateMessages {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            templates: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Substitute `${var}` placeholders. Unknown placeholders are left as-is.
#[must_use]
pub fn interpolate<'a>(template: &str, vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let vars: Vec<(&str, &str)> = vars.into_iter().collect();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match vars.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_default_and_required() {
        let messages = ValidateMessages::default();
        assert!(messages.get("default").is_some());
        assert_eq!(
            messages.format("required", [("name", "user.email")]).as_deref(),
            Some("'user.email' is required")
        );
    }

    #[test]
    fn merged_overrides_single_keys() {
        let base = ValidateMessages::default();
        let custom = ValidateMessages::empty().with("required", "${name}!");
        let merged = base.merged(&custom);
        assert_eq!(merged.get("required"), Some("${name}!"));
        assert_eq!(merged.get("default"), base.get("default"));
        assert_eq!(merged.len(), base.len());
    }

    #[test]
    fn interpolate_substitutes_known_vars_only() {
        let out = interpolate("${name} needs ${min}, not ${other}", [("name", "age"), ("min", "18")]);
        assert_eq!(out, "age needs 18, not ${other}");
    }

    #[test]
    fn interpolate_tolerates_unterminated_placeholder() {
        assert_eq!(interpolate("abc ${name", [("name", "x")]), "abc ${name");
        assert_eq!(interpolate("", []), "");
    }

    #[test]
    fn missing_key_formats_to_none() {
        assert_eq!(ValidateMessages::empty().format("default", []), None);
    }
}
