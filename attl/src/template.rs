use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Weak};

use chrono::NaiveDateTime;

use crate::charset::OutputCharset;
use crate::context::{Context, Parameters};
use crate::engine::{Engine, FALSE_VALUE, NULL_VALUE, OUTPUT_ENCODING, TRUE_VALUE};
use crate::error::{RenderError, RuntimeError};
use crate::format::{float_to_string, integer_to_string, to_string, Filter, Formatter, FormatterCache};
use crate::output::{Output, OutputHandle};
use crate::value::Value;

/// Immutable name → macro table of a template.
pub type MacroTable = Arc<BTreeMap<String, Arc<dyn Template>>>;

/// Functions injected into the generated template code, keyed by name.
pub type Functions = Arc<HashMap<String, Arc<dyn Any + Send + Sync>>>;

/// The designated constructor shape of every compiled template class.
pub type Constructor =
    Arc<dyn Fn(&TemplateArgs) -> Result<Arc<dyn Template>, RuntimeError> + Send + Sync>;

/// The body of a compiled template, writing into the output of the frame it is given.
pub type RenderFn =
    Arc<dyn Fn(&CompiledTemplate, &Rc<Context>) -> Result<(), RenderError> + Send + Sync>;

/// A compiled template or macro.
///
/// Two templates are equal if their names are equal and they are instances of the same class.
pub trait Template: fmt::Debug + Send + Sync {
    /// The logical name, used for identity
    fn name(&self) -> Option<&str>;

    /// The encoding of the source
    fn encoding(&self) -> &str;

    /// The source text the template was compiled from
    fn source(&self) -> &str;

    /// Modification time of the source in milliseconds since the epoch
    fn last_modified(&self) -> u64;

    /// True if the template renders bytes instead of text
    fn is_stream(&self) -> bool;

    /// The shared runtime state
    fn base(&self) -> &TemplateBase;

    /// Evaluate in a new ambient frame on top of the calling thread's current frame.
    fn evaluate(&self, parameters: Option<Rc<Parameters>>) -> Result<Output, RenderError>;

    /// Evaluate in a new frame linked to `parent`. The ambient slot is not touched.
    fn evaluate_in(
        &self,
        parent: Option<&Rc<Context>>,
        parameters: Option<Rc<Parameters>>,
    ) -> Result<Output, RenderError>;

    /// Name of the runtime class, part of the identity
    fn class_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The macros declared by this template
    fn macros(&self) -> &MacroTable {
        self.base().macros()
    }

    /// The source encoded with the source encoding, UTF-8 if the encoding is unknown
    fn source_bytes(&self) -> Vec<u8> {
        OutputCharset::for_name(self.encoding())
            .unwrap_or(OutputCharset::Utf8)
            .encode(self.source())
            .into_owned()
    }

    /// Evaluate with the parameters of the ambient frame and convert the result into a string.
    fn to_text(&self) -> Result<String, RenderError> {
        let parameters = Context::current().parameters().snapshot();
        match self.evaluate(Some(parameters))? {
            Output::Text(text) => Ok(text),
            Output::Bytes(bytes) => Ok(self.base().format_bytes(Some(&bytes))),
        }
    }

    /// Render into an [fmt::Write] object
    fn render_fmt(
        &self,
        parameters: Option<Rc<Parameters>>,
        output: &mut dyn fmt::Write,
    ) -> Result<(), RenderError> {
        match self.evaluate(parameters)? {
            Output::Text(text) => output.write_str(&text)?,
            Output::Bytes(bytes) => output.write_str(&self.base().format_bytes(Some(&bytes)))?,
        }
        Ok(())
    }

    /// Render into an [io::Write] object
    fn render_io(
        &self,
        parameters: Option<Rc<Parameters>>,
        output: &mut dyn io::Write,
    ) -> Result<(), RenderError> {
        match self.evaluate(parameters)? {
            Output::Text(text) => output.write_all(&self.base().serialize(Some(&text)).unwrap_or_default())?,
            Output::Bytes(bytes) => output.write_all(&bytes)?,
        }
        Ok(())
    }

    /// Render into a new string
    fn render_string(&self, parameters: Option<Rc<Parameters>>) -> Result<String, RenderError> {
        let mut result = String::new();
        self.render_fmt(parameters, &mut result)?;
        Ok(result)
    }

    /// Render into a new vector
    fn render_bytes(&self, parameters: Option<Rc<Parameters>>) -> Result<Vec<u8>, RenderError> {
        let mut result = Vec::new();
        self.render_io(parameters, &mut result)?;
        Ok(result)
    }
}

impl PartialEq for dyn Template {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.class_name() == other.class_name()
    }
}

impl Eq for dyn Template {}

impl Hash for dyn Template {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

/// Everything a template instance is constructed with.
#[derive(Clone)]
pub struct TemplateArgs {
    /// The owning engine and its configuration
    pub engine: Arc<dyn Engine>,
    /// Output filter
    pub filter: Option<Arc<dyn Filter>>,
    /// Generic or per-type value formatter
    pub formatter: Option<Arc<dyn Formatter>>,
    /// Injected functions
    pub functions: Functions,
    /// Macros visible from an enclosing template
    pub import_macros: MacroTable,
}

impl TemplateArgs {
    /// No filter, no formatter, no functions, no imported macros
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            filter: None,
            formatter: None,
            functions: Functions::default(),
            import_macros: MacroTable::default(),
        }
    }

    /// Set the output filter
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Set the formatter
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Set the injected functions
    pub fn with_functions(mut self, functions: Functions) -> Self {
        self.functions = functions;
        self
    }

    /// Set the imported macros
    pub fn with_import_macros(mut self, import_macros: MacroTable) -> Self {
        self.import_macros = import_macros;
        self
    }
}

impl fmt::Debug for TemplateArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateArgs")
            .field("filter", &self.filter.is_some())
            .field("formatter", &self.formatter.is_some())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("import_macros", &self.import_macros.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The runtime state shared by every compiled template: formatting dispatch, filter, literals,
/// output encoding and macro tables.
///
/// All of it is immutable after construction, so a template can be rendered concurrently.
pub struct TemplateBase {
    engine: Arc<dyn Engine>,
    filter: Option<Arc<dyn Filter>>,
    formatter: Option<Arc<dyn Formatter>>,
    formatters: FormatterCache,
    functions: Functions,
    null_value: String,
    true_value: String,
    false_value: String,
    output_encoding: Option<String>,
    output_charset: Option<OutputCharset>,
    import_macros: MacroTable,
    macros: MacroTable,
}

impl TemplateBase {
    /// Resolve formatters and literals, and instantiate every declared macro.
    ///
    /// Fails if a macro cannot be constructed, or if the output encoding is not supported.
    pub fn new(args: &TemplateArgs, macro_types: &[(String, Constructor)]) -> Result<Self, RuntimeError> {
        let engine = Arc::clone(&args.engine);
        let output_encoding = engine
            .property(OUTPUT_ENCODING)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let output_charset = match &output_encoding {
            Some(name) => match OutputCharset::for_name(name) {
                Some(charset) => Some(charset),
                None => return Err(RuntimeError::UnsupportedEncoding(name.clone())),
            },
            None => None,
        };
        Ok(Self {
            formatters: FormatterCache::resolve(args.formatter.as_ref()),
            null_value: engine.property_or(NULL_VALUE, ""),
            true_value: engine.property_or(TRUE_VALUE, "true"),
            false_value: engine.property_or(FALSE_VALUE, "false"),
            filter: args.filter.clone(),
            formatter: args.formatter.clone(),
            functions: Arc::clone(&args.functions),
            import_macros: Arc::clone(&args.import_macros),
            macros: init_macros(args, macro_types)?,
            output_encoding,
            output_charset,
            engine,
        })
    }

    /// The owning engine
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Injected functions
    pub fn functions(&self) -> &Functions {
        &self.functions
    }

    /// Macros declared by this template
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Macros visible from an enclosing template
    pub fn import_macros(&self) -> &MacroTable {
        &self.import_macros
    }

    /// The configured output encoding name
    pub fn output_encoding(&self) -> Option<&str> {
        self.output_encoding.as_deref()
    }

    /// The resolved output encoding
    pub fn output_charset(&self) -> Option<OutputCharset> {
        self.output_charset
    }

    /// Apply the output filter, or return the value unchanged if there is none.
    pub fn filter<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match &self.filter {
            Some(filter) => Cow::Owned(filter.filter(value)),
            None => Cow::Borrowed(value),
        }
    }

    /// Convert any value into a string.
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::Null => self.null_value.clone(),
            Value::Bool(v) => self.format_bool(*v),
            Value::Byte(v) => self.format_byte(*v),
            Value::Char(v) => self.format_char(*v),
            Value::Short(v) => self.format_short(*v),
            Value::Int(v) => self.format_int(*v),
            Value::Long(v) => self.format_long(*v),
            Value::Float(v) => self.format_float(*v),
            Value::Double(v) => self.format_double(*v),
            Value::Number(_) => formatted(&self.formatters.number, value, || to_string(value)),
            Value::Date(v) => self.format_date(v),
            Value::Bytes(v) => self.format_bytes(Some(v)),
            Value::Str(v) => v.clone(),
            Value::Template(_) | Value::Other(_) => {
                formatted(&self.formatter, value, || to_string(value))
            },
        }
    }

    /// Convert an optional value, `None` becomes the null literal.
    pub fn format_opt<T: Into<Value>>(&self, value: Option<T>) -> String {
        match value {
            Some(value) => self.format(&value.into()),
            None => self.null_value.clone(),
        }
    }

    /// The literal printed for absent values
    pub fn null_value(&self) -> &str {
        &self.null_value
    }

    #[allow(missing_docs)]
    pub fn format_bool(&self, value: bool) -> String {
        match &self.formatters.boolean {
            Some(formatter) => formatter.format(&Value::Bool(value)),
            None if value => self.true_value.clone(),
            None => self.false_value.clone(),
        }
    }

    #[allow(missing_docs)]
    pub fn format_byte(&self, value: i8) -> String {
        formatted(&self.formatters.byte, &Value::Byte(value), || integer_to_string(value))
    }

    #[allow(missing_docs)]
    pub fn format_char(&self, value: char) -> String {
        formatted(&self.formatters.char, &Value::Char(value), || value.to_string())
    }

    #[allow(missing_docs)]
    pub fn format_short(&self, value: i16) -> String {
        formatted(&self.formatters.short, &Value::Short(value), || integer_to_string(value))
    }

    #[allow(missing_docs)]
    pub fn format_int(&self, value: i32) -> String {
        formatted(&self.formatters.int, &Value::Int(value), || integer_to_string(value))
    }

    #[allow(missing_docs)]
    pub fn format_long(&self, value: i64) -> String {
        formatted(&self.formatters.long, &Value::Long(value), || integer_to_string(value))
    }

    #[allow(missing_docs)]
    pub fn format_float(&self, value: f32) -> String {
        formatted(&self.formatters.float, &Value::Float(value), || float_to_string(value))
    }

    #[allow(missing_docs)]
    pub fn format_double(&self, value: f64) -> String {
        formatted(&self.formatters.double, &Value::Double(value), || float_to_string(value))
    }

    #[allow(missing_docs)]
    pub fn format_date(&self, value: &NaiveDateTime) -> String {
        formatted(&self.formatters.date, &Value::Date(*value), || value.to_string())
    }

    /// Decode bytes with the output encoding, or as UTF-8 if there is none.
    pub fn format_bytes(&self, value: Option<&[u8]>) -> String {
        match value {
            None => self.null_value.clone(),
            Some([]) => String::new(),
            Some(value) => self
                .output_charset
                .unwrap_or(OutputCharset::Utf8)
                .decode(value)
                .into_owned(),
        }
    }

    #[allow(missing_docs)]
    pub fn format_str(&self, value: Option<&str>) -> String {
        match value {
            Some(value) => value.to_owned(),
            None => self.null_value.clone(),
        }
    }

    /// Encode text with the output encoding, or as UTF-8 if there is none.
    pub fn serialize(&self, value: Option<&str>) -> Option<Vec<u8>> {
        match value {
            None => None,
            Some("") => Some(Vec::new()),
            Some(value) => Some(
                self.output_charset
                    .unwrap_or(OutputCharset::Utf8)
                    .encode(value)
                    .into_owned(),
            ),
        }
    }
}

#[inline]
fn formatted(
    formatter: &Option<Arc<dyn Formatter>>,
    value: &Value,
    default: impl FnOnce() -> String,
) -> String {
    match formatter {
        Some(formatter) => formatter.format(value),
        None => default(),
    }
}

fn init_macros(
    args: &TemplateArgs,
    macro_types: &[(String, Constructor)],
) -> Result<MacroTable, RuntimeError> {
    let mut macros = BTreeMap::new();
    for (name, constructor) in macro_types {
        let template = constructor(args).map_err(|err| RuntimeError::MacroConstruction {
            name: name.clone(),
            source: Box::new(err),
        })?;
        let _ = macros.insert(name.clone(), template);
    }
    Ok(Arc::new(macros))
}

impl fmt::Debug for TemplateBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateBase")
            .field("null_value", &self.null_value)
            .field("true_value", &self.true_value)
            .field("false_value", &self.false_value)
            .field("output_encoding", &self.output_encoding)
            .field("filter", &self.filter.is_some())
            .field("formatter", &self.formatter.is_some())
            .field("import_macros", &self.import_macros.keys().collect::<Vec<_>>())
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A compiled template class: the unit the compiler stage produces.
///
/// Its [`constructor()`](Self::constructor) is what enclosing templates register in their macro
/// declarations.
pub struct TemplateClass {
    class_name: String,
    name: Option<String>,
    encoding: String,
    source: String,
    last_modified: u64,
    stream: bool,
    body: RenderFn,
    macro_types: Vec<(String, Constructor)>,
}

impl TemplateClass {
    /// A class with a UTF-8 encoded empty source, no name and no macros
    pub fn new(
        class_name: impl Into<String>,
        body: impl Fn(&CompiledTemplate, &Rc<Context>) -> Result<(), RenderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            name: None,
            encoding: "UTF-8".to_owned(),
            source: String::new(),
            last_modified: 0,
            stream: false,
            body: Arc::new(body),
            macro_types: Vec::new(),
        }
    }

    #[allow(missing_docs)]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_source(mut self, encoding: impl Into<String>, source: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self.source = source.into();
        self
    }

    #[allow(missing_docs)]
    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Render bytes instead of text
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Declare a macro with a custom constructor
    pub fn with_macro(mut self, name: impl Into<String>, constructor: Constructor) -> Self {
        self.macro_types.push((name.into(), constructor));
        self
    }

    /// Declare a macro compiled into its own class
    pub fn with_macro_class(self, name: impl Into<String>, class: &Arc<TemplateClass>) -> Self {
        self.with_macro(name, class.constructor())
    }

    #[allow(missing_docs)]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    #[allow(missing_docs)]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Names of the declared macros, in declaration order
    pub fn macro_names(&self) -> impl Iterator<Item = &str> {
        self.macro_types.iter().map(|(name, _)| name.as_str())
    }

    /// The factory creating instances of this class
    pub fn constructor(self: &Arc<Self>) -> Constructor {
        let class = Arc::clone(self);
        Arc::new(move |args| {
            let template: Arc<dyn Template> = class.instantiate(args)?;
            Ok(template)
        })
    }

    /// Create an instance
    pub fn instantiate(self: &Arc<Self>, args: &TemplateArgs) -> Result<Arc<CompiledTemplate>, RuntimeError> {
        let base = TemplateBase::new(args, &self.macro_types)?;
        Ok(Arc::new_cyclic(|this| CompiledTemplate {
            this: Weak::clone(this),
            class: Arc::clone(self),
            base,
        }))
    }
}

impl fmt::Debug for TemplateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateClass")
            .field("class_name", &self.class_name)
            .field("name", &self.name)
            .field("encoding", &self.encoding)
            .field("stream", &self.stream)
            .field("macros", &self.macro_names().collect::<Vec<_>>())
            .finish()
    }
}

/// An instance of a [`TemplateClass`].
pub struct CompiledTemplate {
    this: Weak<CompiledTemplate>,
    class: Arc<TemplateClass>,
    base: TemplateBase,
}

impl CompiledTemplate {
    #[allow(missing_docs)]
    pub fn class(&self) -> &Arc<TemplateClass> {
        &self.class
    }

    /// A macro of this template, or one imported from an enclosing template
    pub fn lookup_macro(&self, name: &str) -> Option<&Arc<dyn Template>> {
        self.base
            .macros()
            .get(name)
            .or_else(|| self.base.import_macros().get(name))
    }

    /// Write text verbatim into the frame's output
    pub fn write(&self, context: &Context, text: &str) -> Result<(), RenderError> {
        let output = output_of(context)?;
        output.borrow_mut().write_str(text, self.base.output_charset());
        Ok(())
    }

    /// Write raw bytes into the frame's output
    pub fn write_bytes(&self, context: &Context, bytes: &[u8]) -> Result<(), RenderError> {
        let output = output_of(context)?;
        output.borrow_mut().write_bytes(bytes, self.base.output_charset());
        Ok(())
    }

    /// Format a value, pass it through the filter, and write it into the frame's output
    pub fn write_value(&self, context: &Context, value: &Value) -> Result<(), RenderError> {
        let text = self.base.format(value);
        let text = self.base.filter(&text);
        self.write(context, &text)
    }

    /// Evaluate another template in a frame nested into `context`, with the frame's parameters,
    /// and write its output into the frame's output.
    pub fn include(&self, context: &Rc<Context>, template: &dyn Template) -> Result<(), RenderError> {
        let parameters = context.parameters().snapshot();
        match template.evaluate_in(Some(context), Some(parameters))? {
            Output::Text(text) => self.write(context, &text),
            Output::Bytes(bytes) => self.write_bytes(context, &bytes),
        }
    }

    fn run(&self, context: &Rc<Context>, output: OutputHandle) -> Result<Output, RenderError> {
        (self.class.body)(self, context)?;
        let result = output.borrow_mut().take();
        Ok(result)
    }

    fn handle(&self) -> Option<Arc<dyn Template>> {
        self.this.upgrade().map(|this| this as Arc<dyn Template>)
    }
}

fn output_of(context: &Context) -> Result<&OutputHandle, RenderError> {
    context.output().ok_or(RenderError::NoOutput)
}

impl Template for CompiledTemplate {
    fn name(&self) -> Option<&str> {
        self.class.name.as_deref()
    }

    fn encoding(&self) -> &str {
        &self.class.encoding
    }

    fn source(&self) -> &str {
        &self.class.source
    }

    fn last_modified(&self) -> u64 {
        self.class.last_modified
    }

    fn is_stream(&self) -> bool {
        self.class.stream
    }

    fn base(&self) -> &TemplateBase {
        &self.base
    }

    fn class_name(&self) -> &str {
        &self.class.class_name
    }

    fn evaluate(&self, parameters: Option<Rc<Parameters>>) -> Result<Output, RenderError> {
        let output = Output::handle(self.class.stream);
        let guard = Context::enter(self.handle(), parameters, Some(Rc::clone(&output)));
        self.run(guard.context(), output)
    }

    fn evaluate_in(
        &self,
        parent: Option<&Rc<Context>>,
        parameters: Option<Rc<Parameters>>,
    ) -> Result<Output, RenderError> {
        let output = Output::handle(self.class.stream);
        let parent = match parent {
            Some(parent) => Rc::clone(parent),
            None => Context::root(),
        };
        let context = parent.child(self.handle(), parameters, Some(Rc::clone(&output)));
        self.run(&context, output)
    }
}

impl fmt::Display for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(text) => f.write_str(&text),
            Err(err) => {
                tracing::warn!(template = ?self.name(), %err, "could not stringify template");
                Err(fmt::Error)
            },
        }
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("class", &self.class)
            .field("base", &self.base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Properties;
    use crate::format::MultiFormatter;
    use crate::value::ValueKind;

    fn base(engine: Properties, formatter: Option<MultiFormatter>) -> TemplateBase {
        let mut args = TemplateArgs::new(Arc::new(engine));
        if let Some(formatter) = formatter {
            args = args.with_formatter(formatter);
        }
        TemplateBase::new(&args, &[]).unwrap()
    }

    #[test]
    fn test_literals() {
        let default = base(Properties::new(), None);
        assert_eq!(default.format(&Value::Null), "");
        assert_eq!(default.format_opt(None::<i32>), "");
        assert_eq!(default.format(&Value::Bool(true)), "true");
        assert_eq!(default.format(&Value::Bool(false)), "false");

        let configured = base(
            Properties::new()
                .with(NULL_VALUE, "nil")
                .with(TRUE_VALUE, "on")
                .with(FALSE_VALUE, "off"),
            None,
        );
        assert_eq!(configured.format_str(None), "nil");
        assert_eq!(configured.format_bytes(None), "nil");
        assert_eq!(configured.format_bool(true), "on");
        assert_eq!(configured.format_bool(false), "off");
    }

    #[test]
    fn test_per_type_formatters() {
        let formatter = MultiFormatter::new()
            .with(ValueKind::Number, |v: &Value| format!("n{}", to_string(v)))
            .with(ValueKind::Int, |v: &Value| format!("i{}", to_string(v)))
            .with(ValueKind::Bool, |v: &Value| format!("b{}", to_string(v)));
        let base = base(Properties::new(), Some(formatter));
        assert_eq!(base.format(&Value::Int(1)), "i1");
        assert_eq!(base.format(&Value::Short(2)), "n2");
        assert_eq!(base.format(&Value::Double(0.5)), "n0.5");
        assert_eq!(base.format(&Value::Bool(true)), "btrue");
        assert_eq!(base.format(&Value::Char('c')), "c");
        assert_eq!(base.format(&Value::from("s")), "s");
    }

    #[test]
    fn test_plain_formatter_has_no_per_type_lookup() {
        let args = TemplateArgs::new(Arc::new(Properties::new()))
            .with_formatter(|v: &Value| format!("<{}>", to_string(v)));
        let base = TemplateBase::new(&args, &[]).unwrap();
        assert_eq!(base.format(&Value::Int(1)), "1");
        assert_eq!(base.format(&Value::Bool(false)), "false");
    }

    #[test]
    fn test_bytes_and_serialize() {
        let latin1 = base(Properties::new().with(OUTPUT_ENCODING, "latin1"), None);
        assert_eq!(latin1.output_encoding(), Some("latin1"));
        assert_eq!(latin1.format_bytes(Some(b"\xe4")), "ä");
        assert_eq!(latin1.format_bytes(Some(b"")), "");
        assert_eq!(latin1.serialize(Some("ä")), Some(vec![0xe4]));
        assert_eq!(latin1.serialize(Some("")), Some(vec![]));
        assert_eq!(latin1.serialize(None), None);

        let utf8 = base(Properties::new(), None);
        assert_eq!(utf8.output_charset(), None);
        assert_eq!(utf8.serialize(Some("ä")), Some("ä".as_bytes().to_vec()));
    }

    #[test]
    fn test_filter() {
        let args = TemplateArgs::new(Arc::new(Properties::new()))
            .with_filter(|s: &str| s.to_uppercase());
        let base = TemplateBase::new(&args, &[]).unwrap();
        assert_eq!(base.filter("abc"), "ABC");
        assert_eq!(self::base(Properties::new(), None).filter("abc"), "abc");
    }
}
