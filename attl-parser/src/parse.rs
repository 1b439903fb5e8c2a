use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use attl::{Engine, TemplateClass};
use blake2::digest::FixedOutput;
use blake2::{Blake2s256, Digest};
use nom::Slice;

use crate::compile_error::{ErrorKind, ParseError};
use crate::directive::{match_comment, Directive, DirectiveKind, DirectiveNames, MacroDeclaration};
use crate::edit::EditList;
use crate::markers::{marker, split, Chunk};
use crate::markup::{self, Attribute, Comment, Element, Node, Span};
use crate::resource::Resource;
use crate::translate::{Compiler, SymbolTable, Translator, TEMPLATE_TYPE};

/// A macro extracted from a template.
#[derive(Debug, Clone)]
pub struct Macro {
    /// The name, also the variable the macro is bound to
    pub name: String,
    /// The trimmed parameter list, if any
    pub parameters: Option<String>,
    /// Offset of the declaring attribute or comment
    pub offset: usize,
    /// The span of the enclosing source the body was taken from
    pub body: Range<usize>,
    /// The macro's own parse result
    pub template: ParsedTemplate,
    /// The compiled macro
    pub class: Arc<TemplateClass>,
}

/// The result of parsing a template: the rewritten document with its side tables.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    resource: Resource,
    stream: bool,
    code: String,
    symbols: SymbolTable,
    macros: BTreeMap<String, Macro>,
    directives: usize,
}

impl ParsedTemplate {
    /// The resource this template was parsed from
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> &str {
        self.resource.name()
    }

    /// The source text
    pub fn source(&self) -> &str {
        self.resource.source()
    }

    /// True if the template renders bytes
    pub fn is_stream(&self) -> bool {
        self.stream
    }

    /// The rewritten document: the source with every directive replaced by a code marker
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The rewritten document split into text and code
    pub fn chunks(&self) -> Vec<Chunk<'_>> {
        split(&self.code)
    }

    #[allow(missing_docs)]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Extracted macros by name
    pub fn macros(&self) -> &BTreeMap<String, Macro> {
        &self.macros
    }

    /// Number of directives that were rewritten, macros included
    pub fn directives(&self) -> usize {
        self.directives
    }

    /// Hex encoded BLAKE2s digest of the name and the rewritten document
    pub fn digest(&self) -> String {
        let mut hasher = Blake2s256::new();
        hasher.update(self.resource.name().as_bytes());
        hasher.update([0]);
        hasher.update(self.code.as_bytes());
        hex::encode(hasher.finalize_fixed())
    }

    /// A class name derived from the digest, stable for the same input
    pub fn class_name(&self) -> String {
        let digest = self.digest();
        format!("Template_{}", &digest[..16])
    }
}

/// Rewrites directives in attributes and comments into code markers.
///
/// The parser itself is stateless, the same instance can parse any number of templates
/// concurrently.
#[derive(Debug, Clone, Default)]
pub struct AttributeParser {
    names: DirectiveNames,
}

impl AttributeParser {
    /// A parser for the default directive names
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(missing_docs)]
    pub fn with_names(names: DirectiveNames) -> Self {
        Self { names }
    }

    /// A parser for the directive names configured in `engine`
    pub fn from_engine(engine: &dyn Engine) -> Self {
        Self::with_names(DirectiveNames::from_engine(engine))
    }

    #[allow(missing_docs)]
    pub fn names(&self) -> &DirectiveNames {
        &self.names
    }

    /// Parse a template.
    ///
    /// Macros are extracted, parsed and compiled recursively, so `compiler` is called once per
    /// macro. The template itself is not compiled, see [`compile()`](Self::compile).
    pub fn parse(
        &self,
        resource: &Resource,
        stream: bool,
        translator: &dyn Translator,
        compiler: &dyn Compiler,
    ) -> Result<ParsedTemplate, ParseError> {
        let document = markup::parse(resource.source());
        let mut walk = Walk {
            parser: self,
            resource,
            stream,
            translator,
            compiler,
            edits: EditList::new(),
            symbols: SymbolTable::default(),
            macros: BTreeMap::new(),
            directives: 0,
        };
        walk.nodes(&document.children)?;

        let code = walk.edits.apply(resource.source());
        tracing::debug!(
            template = resource.name(),
            directives = walk.directives,
            macros = walk.macros.len(),
            "parsed template",
        );
        Ok(ParsedTemplate {
            resource: resource.clone(),
            stream,
            code,
            symbols: walk.symbols,
            macros: walk.macros,
            directives: walk.directives,
        })
    }

    /// Parse and compile a template.
    pub fn compile(
        &self,
        resource: &Resource,
        stream: bool,
        translator: &dyn Translator,
        compiler: &dyn Compiler,
    ) -> Result<(ParsedTemplate, Arc<TemplateClass>), ParseError> {
        let template = self.parse(resource, stream, translator, compiler)?;
        match compiler.compile(&template) {
            Ok(class) => Ok((template, class)),
            Err(err) => Err(ParseError::new(
                ErrorKind::Compile {
                    name: resource.name().to_owned(),
                    message: err.message,
                },
                resource.name(),
                resource.source(),
                err.offset.unwrap_or(0),
            )),
        }
    }
}

/// A `macro` comment waiting for its `end="macro"`.
struct PendingMacro {
    comment: Comment,
    directive: String,
    value: String,
}

struct Walk<'a> {
    parser: &'a AttributeParser,
    resource: &'a Resource,
    stream: bool,
    translator: &'a dyn Translator,
    compiler: &'a dyn Compiler,
    edits: EditList,
    symbols: SymbolTable,
    macros: BTreeMap<String, Macro>,
    directives: usize,
}

impl Walk<'_> {
    /// Process a run of siblings. A macro comment must be closed among the same siblings.
    fn nodes(&mut self, nodes: &[Node]) -> Result<(), ParseError> {
        let mut pending: Option<PendingMacro> = None;
        for node in nodes {
            match node {
                Node::Comment(comment) => self.comment(*comment, &mut pending)?,
                Node::Element(_) if pending.is_some() => {},
                Node::Element(element) => self.element(element)?,
            }
        }
        match pending {
            Some(open) => Err(self.error(
                ErrorKind::UnclosedMacro { value: open.value },
                open.comment.begin,
            )),
            None => Ok(()),
        }
    }

    fn comment(
        &mut self,
        comment: Comment,
        pending: &mut Option<PendingMacro>,
    ) -> Result<(), ParseError> {
        let resource = self.resource;
        let source = resource.source();
        let Some(found) = match_comment(Span::new(source).slice(comment.begin..comment.end)) else {
            return Ok(());
        };
        let kind = self.parser.names.kind_of(found.name);
        let is_macro_end = kind == Some(DirectiveKind::End) && found.value.trim() == "macro";

        match kind {
            Some(DirectiveKind::Macro) => {
                let open = PendingMacro {
                    comment,
                    directive: found.name.to_owned(),
                    value: found.value.to_owned(),
                };
                if let Some(previous) = pending.replace(open) {
                    tracing::warn!(
                        template = self.resource.name(),
                        superseded = %previous.value,
                        value = found.value,
                        "macro comment was never closed, a later one replaces it",
                    );
                }
                self.edits.remove(comment.begin..comment.end);
            },
            Some(DirectiveKind::End) if is_macro_end && pending.is_some() => {
                if let Some(open) = pending.take() {
                    self.comment_macro(open, comment)?;
                }
            },
            _ if pending.is_some() => {},
            Some(DirectiveKind::End) => {
                let code = self.translator.end_code(found.value.trim());
                self.directives += 1;
                self.edits
                    .insert(comment.end, marker(comment.end - comment.begin, &code));
                self.edits.remove(comment.begin..comment.end);
            },
            Some(kind) => {
                let value = found.value.trim_start();
                let directive = Directive {
                    kind,
                    name: found.name.to_owned(),
                    value: value.trim_end().to_owned(),
                    offset: found.offset,
                    value_offset: found.value_offset + (found.value.len() - value.len()),
                };
                let code = self.statement_code(&directive)?;
                self.edits
                    .insert(comment.begin, marker(comment.end - comment.begin, &code));
                self.edits.remove(comment.begin..comment.end);
            },
            None => {},
        }
        Ok(())
    }

    fn element(&mut self, element: &Element) -> Result<(), ParseError> {
        let mut statements = Vec::new();
        for attribute in &element.attributes {
            match self.parser.names.kind_of(&attribute.name) {
                Some(DirectiveKind::Macro) => return self.attribute_macro(element, attribute),
                Some(kind) if kind.is_statement() => statements.push((kind, attribute)),
                _ => {},
            }
        }

        let mut ends = Vec::new();
        for (kind, attribute) in statements {
            let raw = attribute.value.as_deref().unwrap_or("");
            let directive = Directive {
                kind,
                name: attribute.name.clone(),
                value: raw.trim().to_owned(),
                offset: attribute.begin,
                value_offset: attribute.value_begin.unwrap_or(attribute.end),
            };
            let code = self.statement_code(&directive)?;
            let removed = attribute.begin.saturating_sub(1)..attribute.end;
            self.edits
                .insert(element.begin, marker(removed.end - removed.start, &code));
            self.edits.remove(removed);

            let end = self.translator.end_code(&attribute.name);
            if !end.is_empty() {
                ends.push(end);
            }
        }

        // children may end at the same offset, their ends must come first
        self.nodes(&element.children)?;
        while let Some(end) = ends.pop() {
            self.edits.insert(element.end, marker(0, &end));
        }
        Ok(())
    }

    /// The element carrying the `macro` attribute is the macro body.
    fn attribute_macro(&mut self, element: &Element, attribute: &Attribute) -> Result<(), ParseError> {
        let resource = self.resource;
        let source = resource.source();
        let raw = attribute.value.as_deref().unwrap_or("");
        let declaration = MacroDeclaration::parse(&attribute.name, raw)
            .map_err(|kind| self.error(kind, attribute.begin))?;

        let head = element.begin..attribute.begin.saturating_sub(1).max(element.begin);
        let mut body = String::with_capacity(element.end - element.begin);
        body.push_str(&source[head.clone()]);
        if let Some(parameters) = &declaration.parameters {
            body.push(' ');
            body.push_str(self.parser.names.name(DirectiveKind::Var));
            body.push_str("=\"");
            body.push_str(&escape_attribute(parameters));
            body.push('"');
        }
        let map = BodyMap {
            pieces: vec![
                (0, head.start, head.len()),
                (body.len(), attribute.end, element.end - attribute.end),
            ],
            declaration: attribute.begin,
        };
        body.push_str(&source[attribute.end..element.end]);

        let span = element.begin..element.end;
        let binding = self.register(declaration, body, attribute.begin, span, &map)?;
        self.edits
            .insert(element.begin, marker(element.end - element.begin, &binding));
        self.edits.remove(element.begin..element.end);
        Ok(())
    }

    /// Everything between the opening comment and `end` is the macro body.
    fn comment_macro(&mut self, open: PendingMacro, end: Comment) -> Result<(), ParseError> {
        let resource = self.resource;
        let source = resource.source();
        let declaration = MacroDeclaration::parse(&open.directive, &open.value)
            .map_err(|kind| self.error(kind, open.comment.begin))?;

        let span = open.comment.end..end.begin;
        let mut body = String::with_capacity(span.end - span.start);
        if let Some(parameters) = &declaration.parameters {
            body.push_str("<!--");
            body.push_str(self.parser.names.name(DirectiveKind::Var));
            body.push('=');
            body.push_str(&quoted(parameters));
            body.push_str("-->");
        }
        let map = BodyMap {
            pieces: vec![(body.len(), span.start, span.len())],
            declaration: open.comment.begin,
        };
        body.push_str(&source[span.clone()]);

        let binding = self.register(declaration, body, open.comment.begin, span.clone(), &map)?;
        self.edits.remove(span);
        self.edits
            .insert(open.comment.begin, marker(end.end - open.comment.begin, &binding));
        self.edits.remove(end.begin..end.end);
        Ok(())
    }

    /// Parse and compile a macro body, and bind the macro to a variable of the same name.
    ///
    /// Returns the binding code.
    fn register(
        &mut self,
        declaration: MacroDeclaration,
        body: String,
        offset: usize,
        span: Range<usize>,
        map: &BodyMap,
    ) -> Result<String, ParseError> {
        let MacroDeclaration { name, parameters } = declaration;
        if let Err(found) = self.symbols.declare(&name, TEMPLATE_TYPE) {
            return Err(self.error(
                ErrorKind::DuplicateMacro {
                    name,
                    found,
                    expected: TEMPLATE_TYPE.to_owned(),
                },
                offset,
            ));
        }

        let resource = self.resource.extract(&name, body);
        let template = self
            .parser
            .parse(&resource, self.stream, self.translator, self.compiler)
            .map_err(|err| self.error(err.kind, map.source_offset(err.offset)))?;
        let class = match self.compiler.compile(&template) {
            Ok(class) => class,
            Err(err) => {
                return Err(self.error(
                    ErrorKind::Compile {
                        name,
                        message: err.message,
                    },
                    offset,
                ));
            },
        };

        tracing::debug!(
            template = self.resource.name(),
            name = %name,
            parameters = ?parameters,
            class = class.class_name(),
            "extracted macro",
        );
        self.directives += 1;
        let binding = self.translator.macro_binding_code(&name);
        let _ = self.macros.insert(
            name.clone(),
            Macro {
                name,
                parameters,
                offset,
                body: span,
                template,
                class,
            },
        );
        Ok(binding)
    }

    fn statement_code(&mut self, directive: &Directive) -> Result<String, ParseError> {
        self.directives += 1;
        let result = self.translator.statement_code(directive, &mut self.symbols);
        result.map_err(|err| {
            self.error(
                ErrorKind::Translate {
                    directive: directive.name.clone(),
                    value: directive.value.clone(),
                    message: err.message,
                },
                err.offset.unwrap_or(directive.value_offset),
            )
        })
    }

    fn error(&self, kind: ErrorKind, offset: usize) -> ParseError {
        ParseError::new(kind, self.resource.name(), self.resource.source(), offset)
    }
}

/// Where the text of an extracted macro body came from.
///
/// Errors found while parsing the body are reported against the enclosing source.
struct BodyMap {
    /// `(offset in the body, offset in the source, length)`
    pieces: Vec<(usize, usize, usize)>,
    /// Reported for synthesized text
    declaration: usize,
}

impl BodyMap {
    fn source_offset(&self, offset: usize) -> usize {
        let found = self.pieces.iter().find(|&&(body, _, len)| {
            offset >= body && offset - body < len
        });
        match found {
            Some(&(body, source, _)) => source + (offset - body),
            None => match self.pieces.last() {
                Some(&(body, source, len)) if offset >= body + len => source + len,
                _ => self.declaration,
            },
        }
    }
}

/// Escape an attribute value for double quotes, the markup parser decodes it again.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    match value.contains(['&', '"']) {
        true => Cow::Owned(value.replace('&', "&amp;").replace('"', "&quot;")),
        false => Cow::Borrowed(value),
    }
}

/// Quote a synthesized comment directive value, preferring double quotes.
fn quoted(value: &str) -> String {
    match value.contains('"') && !value.contains('\'') {
        true => format!("'{value}'"),
        false => format!("\"{value}\""),
    }
}
