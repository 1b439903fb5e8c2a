use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;

use attl::{
    Constructor, Context, Output, Properties, RenderError, RuntimeError, Template, TemplateArgs,
    TemplateClass, Value,
};
use attl_tests::{compile, params};

fn args() -> TemplateArgs {
    TemplateArgs::new(Arc::new(Properties::new()))
}

#[test]
fn test_evaluate_uses_ambient_frame() -> Result<(), Box<dyn std::error::Error>> {
    let class = TemplateClass::new("Probe", |template, context| {
        let ambient = Context::current();
        assert!(Rc::ptr_eq(&ambient, context));
        assert_eq!(context.template().and_then(|t| t.name()), Some("probe.html"));
        assert_eq!(context.parameters().get("x"), Some(Value::Int(1)));
        template.write(context, "ok")
    })
    .with_name("probe.html");
    let template = Arc::new(class).instantiate(&args())?;

    Context::remove();
    let root = Context::current();
    let output = template.evaluate(Some(params([("x", Value::Int(1))])))?;
    assert_eq!(output, Output::Text("ok".to_owned()));
    assert!(Rc::ptr_eq(&Context::current(), &root));
    Context::remove();
    Ok(())
}

#[test]
fn test_evaluate_in_leaves_ambient_alone() -> Result<(), Box<dyn std::error::Error>> {
    let class = TemplateClass::new("Probe", |template, context| {
        assert!(Context::ambient().is_none());
        assert!(context.parent().is_some());
        template.write(context, "in")
    });
    let template = Arc::new(class).instantiate(&args())?;

    Context::remove();
    let parent = Context::root();
    let output = template.evaluate_in(Some(&parent), None)?;
    assert_eq!(output, Output::Text("in".to_owned()));
    assert!(Context::ambient().is_none());
    Ok(())
}

#[test]
fn test_failed_render_pops() -> Result<(), Box<dyn std::error::Error>> {
    let class = TemplateClass::new("Failing", |template, context| {
        template.write(context, "partial")?;
        Err(RenderError::Template {
            template: None,
            message: "boom".to_owned(),
        })
    });
    let template = Arc::new(class).instantiate(&args())?;

    Context::remove();
    let root = Context::current();
    assert!(template.evaluate(None).is_err());
    assert!(Rc::ptr_eq(&Context::current(), &root));
    Context::remove();
    Ok(())
}

#[test]
fn test_include_nests_frames() -> Result<(), Box<dyn std::error::Error>> {
    let inner = Arc::new(
        TemplateClass::new("Inner", |template, context| {
            let parent = context.parent().ok_or(RenderError::NoOutput)?;
            let outer = parent.template().and_then(|t| t.name()).unwrap_or("?");
            let greeting = context.parameters().get("greeting").unwrap_or_default();
            template.write(context, &format!("{outer}:"))?;
            template.write_value(context, &greeting)
        })
        .with_name("inner"),
    );
    let outer = TemplateClass::new("Outer", |template, context| {
        let _ = context.parameters().insert("greeting", "hi");
        let inner = template
            .lookup_macro("inner")
            .ok_or(RenderError::NoOutput)?;
        template.write(context, "[")?;
        template.include(context, &**inner)?;
        template.write(context, "]")
    })
    .with_name("outer")
    .with_macro_class("inner", &inner);
    let template = Arc::new(outer).instantiate(&args())?;

    assert_eq!(template.render_string(None)?, "[outer:hi]");
    let declared = &template.macros()["inner"];
    assert_eq!(declared.name(), Some("inner"));
    assert_eq!(declared.class_name(), "Inner");
    Ok(())
}

#[test]
fn test_macro_construction_failure() {
    let failing: Constructor = Arc::new(
        |_: &TemplateArgs| -> Result<Arc<dyn Template>, RuntimeError> {
            Err(RuntimeError::Construction("boom".to_owned()))
        },
    );
    let class = Arc::new(TemplateClass::new("Outer", |_, _| Ok(())).with_macro("broken", failing));
    match class.instantiate(&args()) {
        Err(RuntimeError::MacroConstruction { name, source }) => {
            assert_eq!(name, "broken");
            assert!(matches!(*source, RuntimeError::Construction(_)));
        },
        result => panic!("unexpected result {result:?}"),
    }
}

#[test]
fn test_template_identity() -> Result<(), Box<dyn std::error::Error>> {
    let class = compile("same.html", "x")?;
    let a: Arc<dyn Template> = class.instantiate(&args())?;
    let b: Arc<dyn Template> = class.instantiate(&args())?;
    assert!(*a == *b);

    let other: Arc<dyn Template> = compile("other.html", "x")?.instantiate(&args())?;
    assert!(*a != *other);
    assert_eq!(Value::Template(Arc::clone(&a)), Value::Template(b));
    Ok(())
}

#[test]
fn test_to_text_uses_ambient_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let template = compile("t.html", "<i>${x}</i>")?.instantiate(&args())?;

    Context::remove();
    let guard = Context::enter(None, Some(params([("x", Value::Int(7))])), None);
    assert_eq!(template.to_text()?, "<i>7</i>");
    assert_eq!(template.to_string(), "<i>7</i>");
    drop(guard);
    assert!(Context::ambient().is_none());
    Ok(())
}

#[test]
fn test_concurrent_rendering() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let template = compile("loop.html", "<b foreach=\"i : n\">${i}</b>")?.instantiate(&args())?;
    thread::scope(|scope| {
        let handles = (1..=4)
            .map(|n| {
                let template = &template;
                scope.spawn(move || {
                    template
                        .render_string(Some(params([("n", Value::Long(n))])))
                        .map_err(|err| err.to_string())
                })
            })
            .collect::<Vec<_>>();
        for (n, handle) in (1..=4).zip(handles) {
            let expected = (1..=n).map(|i| format!("<b>{i}</b>")).collect::<String>();
            assert_eq!(handle.join().ok(), Some(Ok(expected)));
        }
    });
    Ok(())
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_unbalanced_pop_warns() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        Context::remove();
        Context::pop();
    });
    assert!(Context::ambient().is_none());

    let logged = String::from_utf8_lossy(&captured.0.lock().unwrap()).into_owned();
    assert!(logged.contains("WARN"), "{logged}");
    assert!(logged.contains("pop without an ambient context"), "{logged}");
}
