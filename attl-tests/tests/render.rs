use std::error::Error;
use std::rc::Rc;
use std::sync::Arc;

use attl::{
    CompiledTemplate, MultiFormatter, Properties, RuntimeError, Template, TemplateArgs, Value,
    ValueKind,
};
use attl_parser::{AttributeParser, Resource};
use attl_tests::{compile, params, template_source, Demo};
use chrono::NaiveDate;

type Result<T = (), E = Box<dyn Error>> = std::result::Result<T, E>;

fn instantiate(source: &str, args: &TemplateArgs) -> Result<Arc<CompiledTemplate>> {
    Ok(compile("test.html", source)?.instantiate(args)?)
}

fn args() -> TemplateArgs {
    TemplateArgs::new(Arc::new(Properties::new()))
}

#[test]
fn test_greet() -> Result {
    let source = "<!--macro=\"greet(name)\"-->Hello, ${name}!<!--end=\"macro\"--><p>${greet}</p>";
    let template = instantiate(source, &args())?;
    let text = template.render_string(Some(params([("name", Value::from("World"))])))?;
    assert_eq!(text, "<p>Hello, World!</p>");
    assert_eq!(template.macros().keys().collect::<Vec<_>>(), ["greet"]);
    Ok(())
}

#[test]
fn test_if_else() -> Result {
    let template = instantiate("<b if=\"x &gt; 1\">big</b>\n<b else>small</b>", &args())?;
    assert_eq!(template.render_string(Some(params([("x", Value::Int(2))])))?, "<b>big</b>");
    assert_eq!(template.render_string(Some(params([("x", Value::Int(0))])))?, "<b>small</b>");
    assert_eq!(template.render_string(None)?, "<b>small</b>");
    Ok(())
}

#[test]
fn test_elseif_comments() -> Result {
    let source = "<!--if=\"n == 1\"-->one<!--end=\"if\"-->\
                  <!--elseif=\"n == 2\"-->two<!--end=\"elseif\"-->\
                  <!--else=\"\"-->many<!--end=\"else\"-->";
    let template = instantiate(source, &args())?;
    for (n, expected) in [(1, "one"), (2, "two"), (3, "many")] {
        assert_eq!(template.render_string(Some(params([("n", Value::Long(n))])))?, expected);
    }
    Ok(())
}

#[test]
fn test_foreach_breakif() -> Result {
    let source = "<ul><li foreach=\"i : 5\" breakif=\"i &gt; 3\">${i}</li></ul>";
    let template = instantiate(source, &args())?;
    assert_eq!(template.render_string(None)?, "<ul><li>1</li><li>2</li><li>3</li></ul>");
    Ok(())
}

#[test]
fn test_literals() -> Result {
    let engine = Properties::new()
        .with("null.value", "-")
        .with("true.value", "yes")
        .with("false.value", "no");
    let template = instantiate(
        "<!--set=\"t = true\"--><!--set=\"f = false\"-->${t} ${f} ${missing}",
        &TemplateArgs::new(Arc::new(engine)),
    )?;
    assert_eq!(template.render_string(None)?, "yes no -");

    let template = instantiate("${t} [${missing}]", &args())?;
    assert_eq!(template.render_string(Some(params([("t", Value::Bool(true))])))?, "true []");
    Ok(())
}

#[test]
fn test_page() -> Result {
    let source = template_source("page.html")?;
    let template = instantiate(&source, &args())?;

    let text = template.render_string(Some(params([
        ("title", Value::from("Shop")),
        ("items", Value::from("a, b")),
        ("admin", Value::Bool(true)),
    ])))?;
    assert!(text.starts_with("<!DOCTYPE html>"));
    assert!(text.contains("<title>Shop</title>"));
    assert!(text.contains("<li>a</li><li>b</li>"));
    assert!(!text.contains("nothing"));
    assert!(text.contains("<a href=\"/admin\">admin</a>"));
    assert!(text.contains("<ol><li><b>total</b>: 2</li></ol>"));
    assert!(!text.contains("macro"));

    let text = template.render_string(Some(params([("title", Value::from("Empty"))])))?;
    assert!(text.contains("<p>nothing</p>"));
    assert!(!text.contains("<ul>"));
    assert!(!text.contains("admin"));
    Ok(())
}

#[test]
fn test_filter_and_formatter() -> Result {
    let args = args()
        .with_filter(|s: &str| s.replace('<', "&lt;"))
        .with_formatter(
            MultiFormatter::new().with(ValueKind::Number, |v: &Value| format!("#{v:?}")),
        );
    let template = instantiate("<p foreach=\"i : 2\">${i}${s}</p>", &args)?;
    let text = template.render_string(Some(params([("s", Value::from("<"))])))?;
    assert_eq!(text, "<p>#Long(1)&lt;</p><p>#Long(2)&lt;</p>");
    Ok(())
}

#[test]
fn test_date() -> Result {
    let date = NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .ok_or("invalid date")?;
    let template = instantiate("${d}", &args())?;
    assert_eq!(template.render_string(Some(params([("d", Value::Date(date))])))?, "2024-01-02 03:04:05");
    Ok(())
}

#[test]
fn test_stream_output_encoding() -> Result {
    let (_, class) = AttributeParser::new().compile(
        &Resource::new("latin1.html", "<p>${s}</p>").with_encoding("ISO-8859-1"),
        true,
        &Demo,
        &Demo,
    )?;
    let engine = Properties::new().with("output.encoding", "ISO-8859-1");
    let template = class.instantiate(&TemplateArgs::new(Arc::new(engine)))?;
    assert!(template.is_stream());
    assert_eq!(template.encoding(), "ISO-8859-1");
    assert_eq!(template.source_bytes(), b"<p>${s}</p>");

    let bytes = template.render_bytes(Some(params([("s", Value::from("ä"))])))?;
    assert_eq!(bytes, b"<p>\xe4</p>");
    let text = template.render_string(Some(params([("s", Value::from("ä"))])))?;
    assert_eq!(text, "<p>ä</p>");
    Ok(())
}

#[test]
fn test_unsupported_encoding() -> Result {
    let class = compile("x.html", "x")?;
    let engine = Properties::new().with("output.encoding", "EBCDIC");
    match class.instantiate(&TemplateArgs::new(Arc::new(engine))) {
        Err(RuntimeError::UnsupportedEncoding(name)) => assert_eq!(name, "EBCDIC"),
        result => panic!("unexpected result {result:?}"),
    }
    Ok(())
}

#[test]
fn test_set_does_not_leak() -> Result {
    let template = instantiate("<!--set=\"x = 2\"-->${x}", &args())?;
    let parameters = params([("x", Value::Int(1))]);
    assert_eq!(template.render_string(Some(Rc::clone(&parameters)))?, "2");
    assert_eq!(parameters.get("x"), Some(&Value::Int(1)));
    Ok(())
}
