//! The directive vocabulary and the recognition of directives in attributes and comments.

use std::fmt;

use attl::Engine;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, multispace0, one_of};
use nom::sequence::tuple;
use nom::{IResult, Slice};

use crate::compile_error::ErrorKind;
use crate::markup::Span;

/// The kinds of directives the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DirectiveKind {
    #[allow(missing_docs)]
    If,
    #[allow(missing_docs)]
    ElseIf,
    #[allow(missing_docs)]
    Else,
    #[allow(missing_docs)]
    Foreach,
    #[allow(missing_docs)]
    BreakIf,
    #[allow(missing_docs)]
    Set,
    /// Declares parameters, also synthesized for macro parameter lists
    Var,
    /// Closes the statement named in its value
    End,
    /// Declares a macro
    Macro,
}

impl DirectiveKind {
    /// Every kind, in declaration order
    pub const ALL: [DirectiveKind; 9] = [
        DirectiveKind::If,
        DirectiveKind::ElseIf,
        DirectiveKind::Else,
        DirectiveKind::Foreach,
        DirectiveKind::BreakIf,
        DirectiveKind::Set,
        DirectiveKind::Var,
        DirectiveKind::End,
        DirectiveKind::Macro,
    ];

    /// True for directives that translate into a statement
    pub fn is_statement(self) -> bool {
        !matches!(self, DirectiveKind::End | DirectiveKind::Macro)
    }

    /// The name used if nothing else is configured
    pub fn default_name(self) -> &'static str {
        match self {
            DirectiveKind::If => "if",
            DirectiveKind::ElseIf => "elseif",
            DirectiveKind::Else => "else",
            DirectiveKind::Foreach => "foreach",
            DirectiveKind::BreakIf => "breakif",
            DirectiveKind::Set => "set",
            DirectiveKind::Var => "var",
            DirectiveKind::End => "end",
            DirectiveKind::Macro => "macro",
        }
    }

    /// The configuration key overriding the name, e.g. `if.directive`
    pub fn property(self) -> String {
        format!("{}.directive", self.default_name())
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

/// The configured directive names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveNames {
    names: [String; 9],
}

impl Default for DirectiveNames {
    fn default() -> Self {
        Self {
            names: DirectiveKind::ALL.map(|kind| kind.default_name().to_owned()),
        }
    }
}

impl DirectiveNames {
    /// Read the names from an engine's configuration, falling back to the defaults.
    pub fn from_engine(engine: &dyn Engine) -> Self {
        Self {
            names: DirectiveKind::ALL.map(|kind| {
                let name = engine.property_or(&kind.property(), kind.default_name());
                match name.trim() {
                    "" => kind.default_name().to_owned(),
                    name => name.to_owned(),
                }
            }),
        }
    }

    /// Override a single name
    pub fn with(mut self, kind: DirectiveKind, name: impl Into<String>) -> Self {
        self.names[kind as usize] = name.into();
        self
    }

    /// The name of a kind
    pub fn name(&self, kind: DirectiveKind) -> &str {
        &self.names[kind as usize]
    }

    /// The kind a name denotes, if any
    pub fn kind_of(&self, name: &str) -> Option<DirectiveKind> {
        DirectiveKind::ALL
            .into_iter()
            .find(|&kind| self.names[kind as usize] == name)
    }
}

/// A directive as it is handed to the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    #[allow(missing_docs)]
    pub kind: DirectiveKind,
    /// Name as written
    pub name: String,
    /// Trimmed value, with character references decoded for attributes
    pub value: String,
    /// Absolute offset of the directive's name
    pub offset: usize,
    /// Absolute offset of the first character of the value
    pub value_offset: usize,
}

/// A comment of the shape `<!-- name = "value" -->`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommentDirective<'a> {
    pub(crate) name: &'a str,
    /// Untrimmed
    pub(crate) value: &'a str,
    pub(crate) offset: usize,
    pub(crate) value_offset: usize,
}

/// Match a whole comment, `comment` is the source slice spanning it.
///
/// Names are lowercase letters and `:`, the value is quoted with `"` or `'`. The closing quote is
/// the last one before the `-->`, so the value may contain quotes.
pub(crate) fn match_comment(comment: Span<'_>) -> Option<CommentDirective<'_>> {
    let (value_span, name) = comment_head(comment).ok()?;
    let inner = value_span.fragment().strip_suffix("-->")?.trim_end();
    let value = inner.strip_suffix(['"', '\''])?;
    Some(CommentDirective {
        name: *name.fragment(),
        value: *value_span.slice(..value.len()).fragment(),
        offset: name.location_offset(),
        value_offset: value_span.location_offset(),
    })
}

fn comment_head(i: Span<'_>) -> IResult<Span<'_>, Span<'_>> {
    let (i, (_, _, name, _, _, _, _)) = tuple((
        tag("<!--"),
        multispace0,
        take_while1(|c: char| c.is_ascii_lowercase() || c == ':'),
        multispace0,
        char('='),
        multispace0,
        one_of("\"'"),
    ))(i)?;
    Ok((i, name))
}

/// The name and parameter list of a macro declaration like `greet(name, title)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MacroDeclaration {
    pub(crate) name: String,
    /// Trimmed, never empty
    pub(crate) parameters: Option<String>,
}

impl MacroDeclaration {
    pub(crate) fn parse(directive: &str, value: &str) -> Result<Self, ErrorKind> {
        let declaration = value.trim();
        let (name, parameters) = match declaration.find('(') {
            Some(open) if open > 0 => {
                let Some(parameters) = declaration[open + 1..].strip_suffix(')') else {
                    return Err(ErrorKind::InvalidMacroParameters {
                        directive: directive.to_owned(),
                        value: value.to_owned(),
                    });
                };
                (declaration[..open].trim(), Some(parameters.trim()))
            },
            _ => (declaration, None),
        };
        if name.is_empty() {
            return Err(ErrorKind::MissingMacroName {
                directive: directive.to_owned(),
                value: value.to_owned(),
            });
        }
        if !is_named(name) {
            return Err(ErrorKind::InvalidMacroName {
                directive: directive.to_owned(),
                name: name.to_owned(),
                value: value.to_owned(),
            });
        }
        Ok(Self {
            name: name.to_owned(),
            parameters: parameters.filter(|p| !p.is_empty()).map(str::to_owned),
        })
    }
}

/// True if `name` is an identifier: a letter, `_` or `$`, followed by letters, digits, `_` or `$`.
pub fn is_named(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {},
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
