use nom::Slice;

use crate::markup::Span;

/// What went wrong while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// A macro declaration without a name
    #[error("missing macro name in {directive}={value:?}")]
    MissingMacroName {
        /// The directive as written
        directive: String,
        /// The raw value as written
        value: String,
    },
    /// A macro parameter list that was opened with `(` but does not end with `)`
    #[error("invalid macro parameters in {directive}={value:?}")]
    InvalidMacroParameters {
        /// The directive as written
        directive: String,
        /// The raw value as written
        value: String,
    },
    /// A macro name that is not an identifier
    #[error("invalid macro name {name:?} in {directive}={value:?}")]
    InvalidMacroName {
        /// The directive as written
        directive: String,
        /// The offending name
        name: String,
        /// The raw value as written
        value: String,
    },
    /// The macro name is already a variable of another type
    #[error("duplicate macro variable {name}, conflicting types: {found}, {expected}")]
    DuplicateMacro {
        /// The macro name
        name: String,
        /// The type the variable had before
        found: String,
        /// The type of macros
        expected: String,
    },
    /// A macro comment without matching `end="macro"` comment among its siblings
    #[error("macro {value:?} is never closed")]
    UnclosedMacro {
        /// The raw value of the opening comment
        value: String,
    },
    /// The translator rejected a directive
    #[error("{directive}={value:?}: {message}")]
    Translate {
        /// The directive as written
        directive: String,
        /// The trimmed value
        value: String,
        /// The message of the translator
        message: String,
    },
    /// The compiler rejected an extracted macro
    #[error("could not compile macro {name:?}: {message}")]
    Compile {
        /// The macro name
        name: String,
        /// The message of the compiler
        message: String,
    },
}

/// A positioned parse failure.
///
/// The `offset` is the absolute byte offset into the source of the resource named
/// `source_name`; `row` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}; in template source {source_name:?} at row {row}, column {column} near:\n{near}")]
pub struct ParseError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Name of the resource
    pub source_name: String,
    /// Absolute byte offset
    pub offset: usize,
    /// Line of the offset
    pub row: u32,
    /// Column of the offset, counted in characters
    pub column: usize,
    /// The source text following the offset, abbreviated
    pub near: String,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, source_name: &str, source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let input = Span::new(source).slice(offset..);
        let source_after = *input.fragment();
        let near = match source_after.char_indices().enumerate().take(73).last() {
            Some((72, (i, _))) => format!("{:?}...", &source_after[..i]),
            _ => format!("{:?}", source_after),
        };
        Self {
            kind,
            source_name: source_name.to_owned(),
            offset,
            row: input.location_line(),
            column: input.get_utf8_column(),
            near,
        }
    }
}

/// A failure reported by a [`Translator`](crate::Translator) or [`Compiler`](crate::Compiler).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CodegenError {
    /// What went wrong
    pub message: String,
    /// Absolute offset of the problem, if more precise than the directive's value offset
    pub offset: Option<usize>,
}

impl CodegenError {
    /// An error located at the value of the directive
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    /// An error located at an absolute offset
    pub fn at(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }
}
