use std::collections::HashMap;

/// Key of the literal printed for absent values, defaults to `""`.
pub const NULL_VALUE: &str = "null.value";

/// Key of the literal printed for `true`, defaults to `"true"`.
pub const TRUE_VALUE: &str = "true.value";

/// Key of the literal printed for `false`, defaults to `"false"`.
pub const FALSE_VALUE: &str = "false.value";

/// Key of the output character encoding, unset by default.
pub const OUTPUT_ENCODING: &str = "output.encoding";

/// The configuration of the engine that owns a template.
pub trait Engine: Send + Sync {
    /// Look up a configuration property
    fn property(&self, key: &str) -> Option<&str>;

    /// Look up a configuration property, falling back to a default
    fn property_or(&self, key: &str, default: &str) -> String {
        self.property(key).unwrap_or(default).to_owned()
    }
}

/// An [`Engine`] configured from a string map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(HashMap<String, String>);

impl Properties {
    /// No properties set, i.e. all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style [`set()`](Self::set)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.0.insert(key.into(), value.into());
    }
}

impl Engine for Properties {
    fn property(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
