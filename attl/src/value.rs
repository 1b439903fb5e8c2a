use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::template::Template;

/// A value that can be handed to a template as parameter, and that a template can format.
///
/// The variants form a closed set so the formatting dispatch in
/// [`TemplateBase::format()`](crate::TemplateBase::format) is resolved once per value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value, printed as the configured `null.value` literal.
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 8 bit signed integer
    Byte(i8),
    /// A single character
    Char(char),
    /// 16 bit signed integer
    Short(i16),
    /// 32 bit signed integer
    Int(i32),
    /// 64 bit signed integer
    Long(i64),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// Any other number, formatted by the generic number formatter
    Number(Number),
    /// Date and time
    Date(NaiveDateTime),
    /// A raw byte sequence, decoded with the output encoding
    Bytes(Vec<u8>),
    /// A string, printed as is
    Str(String),
    /// A template or macro, printed by evaluating it
    Template(Arc<dyn Template>),
    /// Everything else
    Other(Arc<dyn Object>),
}

/// An arbitrary displayable object that can be stored in a [`Value`].
pub trait Object: fmt::Display + fmt::Debug + Send + Sync {}

impl<T: fmt::Display + fmt::Debug + Send + Sync> Object for T {}

/// Numbers that don't have a dedicated width in [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Number {
    /// Signed, up to 128 bits
    Signed(i128),
    /// Unsigned, up to 128 bits
    Unsigned(u128),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Signed(v) => f.write_str(&crate::format::integer_to_string(v)),
            Number::Unsigned(v) => f.write_str(&crate::format::integer_to_string(v)),
        }
    }
}

/// The kind of a [`Value`], used to look up per-type formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    #[allow(missing_docs)]
    Null,
    #[allow(missing_docs)]
    Bool,
    #[allow(missing_docs)]
    Byte,
    #[allow(missing_docs)]
    Char,
    #[allow(missing_docs)]
    Short,
    #[allow(missing_docs)]
    Int,
    #[allow(missing_docs)]
    Long,
    #[allow(missing_docs)]
    Float,
    #[allow(missing_docs)]
    Double,
    #[allow(missing_docs)]
    Number,
    #[allow(missing_docs)]
    Date,
    #[allow(missing_docs)]
    Bytes,
    #[allow(missing_docs)]
    Str,
    #[allow(missing_docs)]
    Template,
    #[allow(missing_docs)]
    Other,
}

impl ValueKind {
    /// True for every kind that falls back to the generic number formatter.
    pub fn is_number(self) -> bool {
        matches!(
            self,
            ValueKind::Byte
                | ValueKind::Short
                | ValueKind::Int
                | ValueKind::Long
                | ValueKind::Float
                | ValueKind::Double
                | ValueKind::Number
        )
    }
}

impl Value {
    /// The kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Byte(_) => ValueKind::Byte,
            Value::Char(_) => ValueKind::Char,
            Value::Short(_) => ValueKind::Short,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Number(_) => ValueKind::Number,
            Value::Date(_) => ValueKind::Date,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Str(_) => ValueKind::Str,
            Value::Template(_) => ValueKind::Template,
            Value::Other(_) => ValueKind::Other,
        }
    }

    /// True for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Wrap an arbitrary displayable object
    pub fn object(value: impl Object + 'static) -> Self {
        Value::Other(Arc::new(value))
    }

    /// The contained string, if this is a [`Value::Str`]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The contained template, if this is a [`Value::Template`]
    pub fn as_template(&self) -> Option<&Arc<dyn Template>> {
        match self {
            Value::Template(t) => Some(t),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => **a == **b,
            (Value::Other(a), Value::Other(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident,)*) => {$(
        impl From<$ty> for Value {
            #[inline]
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    )*};
}

value_from! {
    bool => Bool,
    i8 => Byte,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    NaiveDateTime => Date,
    Vec<u8> => Bytes,
    String => Str,
    Arc<dyn Template> => Template,
    Arc<dyn Object> => Other,
}

macro_rules! number_from {
    ($($ty:ty => $variant:ident,)*) => {$(
        impl From<$ty> for Value {
            #[inline]
            fn from(value: $ty) -> Self {
                Value::Number(Number::$variant(value.into()))
            }
        }
    )*};
}

number_from! {
    u8 => Unsigned,
    u16 => Unsigned,
    u32 => Unsigned,
    u64 => Unsigned,
    u128 => Unsigned,
    i128 => Signed,
}

impl From<usize> for Value {
    #[inline]
    fn from(value: usize) -> Self {
        Value::Number(Number::Unsigned(value as u128))
    }
}

impl From<isize> for Value {
    #[inline]
    fn from(value: isize) -> Self {
        Value::Number(Number::Signed(value as i128))
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    #[inline]
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}
