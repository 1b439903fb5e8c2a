//! A tiny target language for the directive parser, so templates can be parsed, compiled and
//! rendered end to end in tests.
//!
//! Statements translate into `kind:arguments` code. The [`Demo`] compiler turns the rewritten
//! document into a tree of operations that the runtime executes. Text may interpolate values
//! with `${expression}`; a macro value is rendered by including it.

use std::rc::Rc;
use std::sync::Arc;
use std::{fs, io};

use attl::{CompiledTemplate, Context, Parameters, RenderError, TemplateClass, Value};
use attl_parser::markers::Chunk;
use attl_parser::{
    is_named, AttributeParser, CodegenError, Compiler, Directive, DirectiveKind, ParseError,
    ParsedTemplate, Resource, SymbolTable, Translator,
};

/// Type recorded for variables introduced by `foreach`, `set` and `var`
pub const OBJECT_TYPE: &str = "Object";

/// Translator and compiler of the test language.
#[derive(Debug, Clone, Copy, Default)]
pub struct Demo;

impl Translator for Demo {
    fn statement_code(
        &self,
        directive: &Directive,
        symbols: &mut SymbolTable,
    ) -> Result<String, CodegenError> {
        let value = directive.value.as_str();
        match directive.kind {
            DirectiveKind::If => Ok(format!("if:{}", Expr::parse(value)?.source)),
            DirectiveKind::ElseIf => Ok(format!("elseif:{}", Expr::parse(value)?.source)),
            DirectiveKind::Else => Ok("else:".to_owned()),
            DirectiveKind::BreakIf => Ok(format!("breakif:{}", Expr::parse(value)?.source)),
            DirectiveKind::Foreach => {
                let (var, list) = split_assignment(value, ':')?;
                declare(symbols, var, false)?;
                Ok(format!("foreach:{var}:{list}"))
            },
            DirectiveKind::Set => {
                let (var, expr) = split_assignment(value, '=')?;
                declare(symbols, var, false)?;
                Ok(format!("set:{var}:{expr}"))
            },
            DirectiveKind::Var => {
                let mut names = Vec::new();
                for name in value.split(',').map(str::trim) {
                    declare(symbols, name, true)?;
                    names.push(name);
                }
                Ok(format!("var:{}", names.join(",")))
            },
            DirectiveKind::End | DirectiveKind::Macro => {
                Err(CodegenError::new(format!("{} is not a statement", directive.name)))
            },
        }
    }

    fn end_code(&self, name: &str) -> String {
        // configured names may carry a namespace, e.g. `t:if`
        match name.rsplit(':').next() {
            Some("if" | "elseif" | "else" | "foreach") => "end:".to_owned(),
            _ => String::new(),
        }
    }

    fn macro_binding_code(&self, name: &str) -> String {
        format!("bind:{name}")
    }
}

fn split_assignment(value: &str, separator: char) -> Result<(&str, &str), CodegenError> {
    let (var, expr) = value
        .split_once(separator)
        .ok_or_else(|| CodegenError::new(format!("expected `name {separator} expression`")))?;
    let expr = expr.trim();
    let _ = Expr::parse(expr)?;
    Ok((var.trim(), expr))
}

fn declare(symbols: &mut SymbolTable, name: &str, parameter: bool) -> Result<(), CodegenError> {
    if !is_named(name) {
        return Err(CodegenError::new(format!("{name:?} is not a valid variable name")));
    }
    let result = match parameter {
        true => symbols.declare_parameter(name, OBJECT_TYPE),
        false => symbols.declare(name, OBJECT_TYPE),
    };
    result.map_err(|found| CodegenError::new(format!("{name} was declared as {found} before")))
}

impl Compiler for Demo {
    fn compile(&self, template: &ParsedTemplate) -> Result<Arc<TemplateClass>, CodegenError> {
        let program = Program::parse(template)?;
        let resource = template.resource();
        let mut class = TemplateClass::new(template.class_name(), move |template, context| {
            program.render(template, context)
        })
        .with_name(resource.name())
        .with_source(resource.encoding(), resource.source())
        .with_last_modified(resource.last_modified())
        .with_stream(template.is_stream());
        for (name, declared) in template.macros() {
            class = class.with_macro_class(name.as_str(), &declared.class);
        }
        Ok(Arc::new(class))
    }
}

/// Parse a template with the default directive names.
pub fn parse(name: &str, source: &str) -> Result<ParsedTemplate, ParseError> {
    AttributeParser::new().parse(&Resource::new(name, source), false, &Demo, &Demo)
}

/// Parse and compile a template with the default directive names.
pub fn compile(name: &str, source: &str) -> Result<Arc<TemplateClass>, ParseError> {
    let (_, class) =
        AttributeParser::new().compile(&Resource::new(name, source), false, &Demo, &Demo)?;
    Ok(class)
}

/// Read a template from the `templates` directory of this crate.
pub fn template_source(name: &str) -> io::Result<String> {
    fs::read_to_string(format!("{}/templates/{}", env!("CARGO_MANIFEST_DIR"), name))
}

/// Build a parameter map.
pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Rc<Parameters> {
    Rc::new(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect(),
    )
}

#[derive(Debug)]
enum Op {
    Text(String),
    Value(Expr),
    If(Vec<(Option<Expr>, Vec<Op>)>),
    Foreach { var: String, list: Expr, body: Vec<Op> },
    BreakIf(Expr),
    Set { var: String, expr: Expr },
    Bind(String),
}

enum Flow {
    Next,
    Break,
}

/// The compiled form of a template.
#[derive(Debug)]
struct Program {
    ops: Vec<Op>,
}

struct Builder<'a> {
    chunks: Vec<Chunk<'a>>,
    pos: usize,
    /// Offset into the source of the chunk at `pos`
    offset: usize,
}

impl Program {
    fn parse(template: &ParsedTemplate) -> Result<Self, CodegenError> {
        let mut builder = Builder {
            chunks: template.chunks(),
            pos: 0,
            offset: 0,
        };
        let ops = builder.block(false)?;
        Ok(Self { ops })
    }

    fn render(&self, template: &CompiledTemplate, context: &Rc<Context>) -> Result<(), RenderError> {
        let _ = run(&self.ops, template, context)?;
        Ok(())
    }
}

impl Builder<'_> {
    fn block(&mut self, nested: bool) -> Result<Vec<Op>, CodegenError> {
        let mut ops = Vec::new();
        while let Some(&chunk) = self.chunks.get(self.pos) {
            let offset = self.offset;
            self.pos += 1;
            let (len, code) = match chunk {
                Chunk::Text(text) => {
                    self.offset += text.len();
                    interpolate(text, &mut ops, offset)?;
                    continue;
                },
                Chunk::Code { len, code } => (len, code),
            };
            self.offset += len;

            let (kind, args) = code.split_once(':').unwrap_or((code, ""));
            match kind {
                "if" => {
                    let cond = Expr::parse(args)?;
                    let body = self.block(true)?;
                    ops.push(Op::If(vec![(Some(cond), body)]));
                },
                "elseif" | "else" => {
                    let cond = match kind {
                        "elseif" => Some(Expr::parse(args)?),
                        _ => None,
                    };
                    let body = self.block(true)?;
                    while matches!(ops.last(), Some(Op::Text(t)) if t.trim().is_empty()) {
                        let _ = ops.pop();
                    }
                    match ops.last_mut() {
                        Some(Op::If(branches)) if branches.last().map_or(false, |b| b.0.is_some()) => {
                            branches.push((cond, body));
                        },
                        _ => return Err(CodegenError::at(format!("{kind} without if"), offset)),
                    }
                },
                "foreach" => {
                    let (var, list) = args
                        .split_once(':')
                        .ok_or_else(|| CodegenError::at("malformed foreach", offset))?;
                    let list = Expr::parse(list)?;
                    let body = self.block(true)?;
                    ops.push(Op::Foreach {
                        var: var.to_owned(),
                        list,
                        body,
                    });
                },
                "breakif" => ops.push(Op::BreakIf(Expr::parse(args)?)),
                "set" => {
                    let (var, expr) = args
                        .split_once(':')
                        .ok_or_else(|| CodegenError::at("malformed set", offset))?;
                    ops.push(Op::Set {
                        var: var.to_owned(),
                        expr: Expr::parse(expr)?,
                    });
                },
                "var" => {},
                "bind" => ops.push(Op::Bind(args.to_owned())),
                "end" if nested => return Ok(ops),
                "end" => return Err(CodegenError::at("end without statement", offset)),
                _ => return Err(CodegenError::at(format!("unknown code {code:?}"), offset)),
            }
        }
        match nested {
            true => Err(CodegenError::at("statement is never closed", self.offset)),
            false => Ok(ops),
        }
    }
}

fn interpolate(text: &str, ops: &mut Vec<Op>, offset: usize) -> Result<(), CodegenError> {
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        if start > 0 {
            ops.push(Op::Text(rest[..start].to_owned()));
        }
        let expr = Expr::parse(&rest[start + 2..start + len])
            .map_err(|err| CodegenError::at(err.message, offset + text.len() - rest.len() + start))?;
        ops.push(Op::Value(expr));
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        ops.push(Op::Text(rest.to_owned()));
    }
    Ok(())
}

fn run(ops: &[Op], template: &CompiledTemplate, context: &Rc<Context>) -> Result<Flow, RenderError> {
    for op in ops {
        match op {
            Op::Text(text) => template.write(context, text)?,
            Op::Value(expr) => match expr.eval(context) {
                Value::Template(included) => template.include(context, &*included)?,
                value => template.write_value(context, &value)?,
            },
            Op::If(branches) => {
                let taken = branches
                    .iter()
                    .find(|(cond, _)| cond.as_ref().map_or(true, |c| truthy(&c.eval(context))));
                if let Some((_, body)) = taken {
                    if let Flow::Break = run(body, template, context)? {
                        return Ok(Flow::Break);
                    }
                }
            },
            Op::Foreach { var, list, body } => {
                for item in items(list.eval(context)) {
                    let _ = context.parameters().insert(var.as_str(), item);
                    if let Flow::Break = run(body, template, context)? {
                        break;
                    }
                }
            },
            Op::BreakIf(cond) => {
                if truthy(&cond.eval(context)) {
                    return Ok(Flow::Break);
                }
            },
            Op::Set { var, expr } => {
                let _ = context.parameters().insert(var.as_str(), expr.eval(context));
            },
            Op::Bind(name) => {
                let Some(declared) = template.lookup_macro(name) else {
                    return Err(RenderError::Template {
                        template: template.class().name().map(str::to_owned),
                        message: format!("unknown macro {name}"),
                    });
                };
                let _ = context
                    .parameters()
                    .insert(name.as_str(), Value::Template(Arc::clone(declared)));
            },
        }
    }
    Ok(Flow::Next)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Str(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        value => number(value).map_or(true, |n| n != 0.0),
    }
}

fn number(value: &Value) -> Option<f64> {
    match *value {
        Value::Byte(v) => Some(v.into()),
        Value::Short(v) => Some(v.into()),
        Value::Int(v) => Some(v.into()),
        Value::Long(v) => Some(v as f64),
        Value::Float(v) => Some(v.into()),
        Value::Double(v) => Some(v),
        Value::Number(attl::Number::Signed(v)) => Some(v as f64),
        Value::Number(attl::Number::Unsigned(v)) => Some(v as f64),
        _ => None,
    }
}

/// Strings iterate over their comma separated parts, numbers count from 1.
fn items(list: Value) -> Vec<Value> {
    match list {
        Value::Null => Vec::new(),
        Value::Str(s) => s.split(',').map(|s| Value::from(s.trim())).collect(),
        value => match number(&value) {
            Some(n) => (1..=n as i64).map(Value::Long).collect(),
            None => vec![value],
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug)]
enum Term {
    Literal(Value),
    Var(String),
    Not(Box<Term>),
}

/// `operand [op operand]`, where an operand is a literal, a variable, or a negated operand.
#[derive(Debug)]
struct Expr {
    source: String,
    left: Term,
    right: Option<(Cmp, Term)>,
}

impl Expr {
    fn parse(source: &str) -> Result<Self, CodegenError> {
        let source = source.trim();
        const OPS: [(&str, Cmp); 6] = [
            ("==", Cmp::Eq),
            ("!=", Cmp::Ne),
            ("<=", Cmp::Le),
            (">=", Cmp::Ge),
            ("<", Cmp::Lt),
            (">", Cmp::Gt),
        ];
        let split = OPS
            .iter()
            .filter_map(|&(op, cmp)| source.find(op).map(|pos| (pos, op, cmp)))
            .min_by_key(|&(pos, op, _)| (pos, usize::MAX - op.len()));
        let (left, right) = match split {
            Some((pos, op, cmp)) => (
                Term::parse(&source[..pos])?,
                Some((cmp, Term::parse(&source[pos + op.len()..])?)),
            ),
            None => (Term::parse(source)?, None),
        };
        Ok(Self {
            source: source.to_owned(),
            left,
            right,
        })
    }

    fn eval(&self, context: &Context) -> Value {
        let left = self.left.eval(context);
        let Some((cmp, right)) = &self.right else {
            return left;
        };
        let right = right.eval(context);
        let ordering = match (number(&left), number(&right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (left.as_str(), right.as_str()) {
                (Some(a), Some(b)) => Some(a.cmp(b)),
                _ if left == right => Some(std::cmp::Ordering::Equal),
                _ => None,
            },
        };
        Value::Bool(match (cmp, ordering) {
            (Cmp::Ne, ordering) => ordering != Some(std::cmp::Ordering::Equal),
            (_, None) => false,
            (Cmp::Eq, Some(o)) => o.is_eq(),
            (Cmp::Lt, Some(o)) => o.is_lt(),
            (Cmp::Le, Some(o)) => o.is_le(),
            (Cmp::Gt, Some(o)) => o.is_gt(),
            (Cmp::Ge, Some(o)) => o.is_ge(),
        })
    }
}

impl Term {
    fn parse(source: &str) -> Result<Self, CodegenError> {
        let source = source.trim();
        if let Some(negated) = source.strip_prefix('!') {
            return Ok(Term::Not(Box::new(Term::parse(negated)?)));
        }
        if let Some(s) = source.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            return Ok(Term::Literal(Value::from(s)));
        }
        match source {
            "null" => return Ok(Term::Literal(Value::Null)),
            "true" => return Ok(Term::Literal(Value::Bool(true))),
            "false" => return Ok(Term::Literal(Value::Bool(false))),
            _ => {},
        }
        if let Ok(n) = source.parse::<i64>() {
            return Ok(Term::Literal(Value::Long(n)));
        }
        if is_named(source) {
            return Ok(Term::Var(source.to_owned()));
        }
        Err(CodegenError::new(format!("cannot parse expression {source:?}")))
    }

    fn eval(&self, context: &Context) -> Value {
        match self {
            Term::Literal(value) => value.clone(),
            Term::Var(name) => context.parameters().get(name).unwrap_or_default(),
            Term::Not(term) => Value::Bool(!truthy(&term.eval(context))),
        }
    }
}
