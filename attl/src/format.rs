use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Value, ValueKind};

/// Converts a typed value into its string representation.
///
/// Closures `Fn(&Value) -> String` implement this trait.
pub trait Formatter: Send + Sync {
    /// Format the value
    fn format(&self, value: &Value) -> String;

    /// Per-type lookup, if this formatter is composed of one formatter per [`ValueKind`].
    #[inline]
    fn as_multi(&self) -> Option<&MultiFormatter> {
        None
    }
}

impl<F: Fn(&Value) -> String + Send + Sync> Formatter for F {
    #[inline]
    fn format(&self, value: &Value) -> String {
        self(value)
    }
}

/// A string transformation applied to the template output, e.g. an escaper.
///
/// Closures `Fn(&str) -> String` implement this trait.
pub trait Filter: Send + Sync {
    /// Transform the value
    fn filter(&self, value: &str) -> String;
}

impl<F: Fn(&str) -> String + Send + Sync> Filter for F {
    #[inline]
    fn filter(&self, value: &str) -> String {
        self(value)
    }
}

/// A formatter table with one entry per [`ValueKind`].
///
/// Used as a plain [`Formatter`] it dispatches on the kind of the value. A numeric value without
/// an entry of its own uses the [`ValueKind::Number`] entry.
#[derive(Default, Clone)]
pub struct MultiFormatter {
    formatters: BTreeMap<ValueKind, Arc<dyn Formatter>>,
}

impl MultiFormatter {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style [`insert()`](Self::insert)
    pub fn with(mut self, kind: ValueKind, formatter: impl Formatter + 'static) -> Self {
        self.insert(kind, formatter);
        self
    }

    /// Register the formatter for a kind, replacing an earlier registration
    pub fn insert(&mut self, kind: ValueKind, formatter: impl Formatter + 'static) {
        let _ = self.formatters.insert(kind, Arc::new(formatter));
    }

    /// The formatter registered for exactly this kind
    pub fn get(&self, kind: ValueKind) -> Option<Arc<dyn Formatter>> {
        self.formatters.get(&kind).cloned()
    }
}

impl Formatter for MultiFormatter {
    fn format(&self, value: &Value) -> String {
        let kind = value.kind();
        let formatter = match self.formatters.get(&kind) {
            Some(formatter) => Some(formatter),
            None if kind.is_number() => self.formatters.get(&ValueKind::Number),
            None => None,
        };
        match formatter {
            Some(formatter) => formatter.format(value),
            None => to_string(value),
        }
    }

    #[inline]
    fn as_multi(&self) -> Option<&MultiFormatter> {
        Some(self)
    }
}

impl fmt::Debug for MultiFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.formatters.keys()).finish()
    }
}

/// Per-type formatters, resolved once when a template is constructed.
#[derive(Default, Clone)]
pub(crate) struct FormatterCache {
    pub(crate) boolean: Option<Arc<dyn Formatter>>,
    pub(crate) byte: Option<Arc<dyn Formatter>>,
    pub(crate) char: Option<Arc<dyn Formatter>>,
    pub(crate) short: Option<Arc<dyn Formatter>>,
    pub(crate) int: Option<Arc<dyn Formatter>>,
    pub(crate) long: Option<Arc<dyn Formatter>>,
    pub(crate) float: Option<Arc<dyn Formatter>>,
    pub(crate) double: Option<Arc<dyn Formatter>>,
    pub(crate) number: Option<Arc<dyn Formatter>>,
    pub(crate) date: Option<Arc<dyn Formatter>>,
}

impl FormatterCache {
    pub(crate) fn resolve(formatter: Option<&Arc<dyn Formatter>>) -> Self {
        let multi = match formatter.and_then(|f| f.as_multi()) {
            Some(multi) => multi,
            None => return Self::default(),
        };
        let number = multi.get(ValueKind::Number);
        let numeric = |kind| multi.get(kind).or_else(|| number.clone());
        Self {
            boolean: multi.get(ValueKind::Bool),
            byte: numeric(ValueKind::Byte),
            char: multi.get(ValueKind::Char),
            short: numeric(ValueKind::Short),
            int: numeric(ValueKind::Int),
            long: numeric(ValueKind::Long),
            float: numeric(ValueKind::Float),
            double: numeric(ValueKind::Double),
            date: multi.get(ValueKind::Date),
            number,
        }
    }
}

/// Locale agnostic conversion, used when no formatter is configured for a value.
pub(crate) fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(v) => v.to_string(),
        Value::Byte(v) => integer_to_string(*v),
        Value::Char(v) => v.to_string(),
        Value::Short(v) => integer_to_string(*v),
        Value::Int(v) => integer_to_string(*v),
        Value::Long(v) => integer_to_string(*v),
        Value::Float(v) => float_to_string(*v),
        Value::Double(v) => float_to_string(*v),
        Value::Number(v) => v.to_string(),
        Value::Date(v) => v.to_string(),
        Value::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        Value::Str(v) => v.clone(),
        Value::Template(v) => match v.to_text() {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(template = ?v.name(), %err, "could not stringify template");
                String::new()
            },
        },
        Value::Other(v) => v.to_string(),
    }
}

#[cfg(feature = "itoa")]
#[inline]
pub(crate) fn integer_to_string<T: itoa_::Integer>(value: T) -> String {
    itoa_::Buffer::new().format(value).to_owned()
}

#[cfg(not(feature = "itoa"))]
#[inline]
pub(crate) fn integer_to_string<T: fmt::Display>(value: T) -> String {
    value.to_string()
}

#[cfg(feature = "ryu")]
#[inline]
pub(crate) fn float_to_string<T: ryu_::Float>(value: T) -> String {
    ryu_::Buffer::new().format(value).to_owned()
}

#[cfg(not(feature = "ryu"))]
#[inline]
pub(crate) fn float_to_string<T: fmt::Display>(value: T) -> String {
    value.to_string()
}
