/// A named template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: String,
    encoding: String,
    last_modified: u64,
    source: String,
}

impl Resource {
    /// A UTF-8 encoded resource without modification time
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoding: "UTF-8".to_owned(),
            last_modified: 0,
            source: source.into(),
        }
    }

    #[allow(missing_docs)]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Milliseconds since the epoch
    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(missing_docs)]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    #[allow(missing_docs)]
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    #[allow(missing_docs)]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The resource of a macro extracted from this one. It keeps encoding and modification time.
    pub(crate) fn extract(&self, macro_name: &str, source: String) -> Self {
        Self {
            name: macro_path(&self.name, macro_name),
            encoding: self.encoding.clone(),
            last_modified: self.last_modified,
            source,
        }
    }
}

/// The resource name of macro `macro_name` declared in the template `name`.
pub fn macro_path(name: &str, macro_name: &str) -> String {
    format!("{name}#{macro_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract() {
        let page = Resource::new("/page.html", "<p></p>")
            .with_encoding("ISO-8859-1")
            .with_last_modified(42);
        let greet = page.extract("greet", "Hello".to_owned());
        assert_eq!(greet.name(), "/page.html#greet");
        assert_eq!(greet.encoding(), "ISO-8859-1");
        assert_eq!(greet.last_modified(), 42);
        assert_eq!(greet.source(), "Hello");
    }
}
