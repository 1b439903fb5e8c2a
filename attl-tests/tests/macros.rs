use attl_parser::markers::marker;
use attl_parser::{macro_path, ErrorKind, ParseError, TEMPLATE_TYPE};
use attl_tests::{parse, OBJECT_TYPE};

#[test]
fn test_comment_macro() -> Result<(), ParseError> {
    let source = "<!--macro=\"greet(name)\"-->Hello, ${name}!<!--end=\"macro\"-->";
    let template = parse("greet.html", source)?;
    assert_eq!(template.code(), marker(source.len(), "bind:greet"));
    assert_eq!(template.symbols().types["greet"], TEMPLATE_TYPE);
    assert!(template.symbols().variables.contains("greet"));

    let greet = &template.macros()["greet"];
    assert_eq!(greet.name, "greet");
    assert_eq!(greet.parameters.as_deref(), Some("name"));
    assert_eq!(greet.offset, 0);
    assert_eq!(&source[greet.body.clone()], "Hello, ${name}!");

    let body = &greet.template;
    assert_eq!(body.name(), macro_path("greet.html", "greet"));
    assert_eq!(body.source(), "<!--var=\"name\"-->Hello, ${name}!");
    assert!(body
        .code()
        .starts_with(&marker("<!--var=\"name\"-->".len(), "var:name")));
    assert_eq!(body.symbols().parameters, ["name"]);
    assert_eq!(body.symbols().parameter_types, [OBJECT_TYPE]);
    assert_eq!(greet.class.name(), Some(body.name()));
    Ok(())
}

#[test]
fn test_attribute_macro() -> Result<(), ParseError> {
    let source = "<div>\n<table class=\"t\" macro=\"rows(cells)\"><tr foreach=\"c : cells\"><td>${c}</td></tr></table>\n</div>";
    let template = parse("table.html", source)?;
    let begin = source.find("<table").unwrap();
    let end = source.find("\n</div>").unwrap();
    assert_eq!(
        template.code(),
        format!("<div>\n{}\n</div>", marker(end - begin, "bind:rows")),
    );

    let rows = &template.macros()["rows"];
    assert_eq!(rows.body, begin..end);
    assert_eq!(rows.offset, source.find("macro=").unwrap());
    assert_eq!(
        rows.template.source(),
        "<table class=\"t\" var=\"cells\"><tr foreach=\"c : cells\"><td>${c}</td></tr></table>",
    );
    assert_eq!(rows.template.symbols().parameters, ["cells"]);
    assert!(rows.template.symbols().variables.contains("c"));
    assert_eq!(rows.template.directives(), 2);
    Ok(())
}

#[test]
fn test_macro_without_parameters() -> Result<(), ParseError> {
    for source in [
        "<!--macro=\"footer\"-->(c)<!--end=\"macro\"-->",
        "<!--macro=\" footer() \"-->(c)<!--end=\"macro\"-->",
    ] {
        let template = parse("footer.html", source)?;
        let footer = &template.macros()["footer"];
        assert_eq!(footer.parameters, None);
        assert_eq!(footer.template.source(), "(c)");
        assert_eq!(footer.template.code(), "(c)");
    }
    Ok(())
}

#[test]
fn test_directives_inside_macro_body() -> Result<(), ParseError> {
    let source = "<!--macro=\"m(x)\"--><p if=\"x\">yes</p><!--if=\"x\"-->!<!--end=\"if\"--><!--end=\"macro\"-->";
    let template = parse("m.html", source)?;
    assert_eq!(template.directives(), 1);
    let m = &template.macros()["m"].template;
    // var, both ifs, and the comment end
    assert_eq!(m.directives(), 4);
    assert!(m.code().contains(&marker(" if=\"x\"".len(), "if:x")));
    Ok(())
}

#[test]
fn test_nested_macros() -> Result<(), ParseError> {
    let source = "<!--macro=\"outer\"--><b macro=\"inner\">i</b>o<!--end=\"macro\"-->";
    let template = parse("nested.html", source)?;
    assert_eq!(template.macros().keys().collect::<Vec<_>>(), ["outer"]);

    let outer = &template.macros()["outer"];
    assert!(outer.template.macros().contains_key("inner"));
    assert_eq!(outer.class.macro_names().collect::<Vec<_>>(), ["inner"]);
    assert_eq!(
        outer.template.macros()["inner"].template.name(),
        "nested.html#outer#inner",
    );
    Ok(())
}

#[test]
fn test_redeclared_macro() -> Result<(), ParseError> {
    let source = "<!--macro=\"a\"-->1<!--end=\"macro\"--><p macro=\"a\">2</p>";
    let template = parse("twice.html", source)?;
    assert_eq!(template.macros().len(), 1);
    assert_eq!(template.macros()["a"].template.source(), "<p>2</p>");
    assert_eq!(template.symbols().types["a"], TEMPLATE_TYPE);
    Ok(())
}

#[test]
fn test_conflicting_variable() {
    let source = "<!--set=\"greet = 1\"--><!--macro=\"greet\"-->x<!--end=\"macro\"-->";
    let err = parse("conflict.html", source).unwrap_err();
    assert_eq!(err.offset, source.find("<!--macro").unwrap());
    assert_eq!(
        err.kind,
        ErrorKind::DuplicateMacro {
            name: "greet".to_owned(),
            found: OBJECT_TYPE.to_owned(),
            expected: TEMPLATE_TYPE.to_owned(),
        },
    );
}

#[test]
fn test_superseded_macro() -> Result<(), ParseError> {
    let source = "<!--macro=\"a\"-->x<!--macro=\"b\"-->y<!--end=\"macro\"-->";
    let template = parse("superseded.html", source)?;
    assert_eq!(template.macros().keys().collect::<Vec<_>>(), ["b"]);
    assert_eq!(template.macros()["b"].template.source(), "y");
    let b = source.find("<!--macro=\"b").unwrap();
    assert_eq!(template.code(), format!("x{}", marker(source.len() - b, "bind:b")));
    Ok(())
}

#[test]
fn test_unclosed_macro() {
    let err = parse("open.html", "<p>a</p><!--macro=\"m\"-->x").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnclosedMacro { value: "m".to_owned() });
    assert_eq!(err.offset, 8);

    // the end must be a sibling
    let source = "<div><!--macro=\"m\"-->x</div><!--end=\"macro\"-->";
    let err = parse("open.html", source).unwrap_err();
    assert_eq!(err.offset, 5);
}

#[test]
fn test_invalid_declarations() {
    let cases = [
        ("<!--macro=\"\"-->x<!--end=\"macro\"-->", "missing"),
        ("<p macro=\" \">x</p>", "missing"),
        ("<p macro=\"a(b\">x</p>", "parameters"),
        ("<p macro=\"(b)\">x</p>", "name"),
        ("<p macro=\"9lives\">x</p>", "name"),
    ];
    for (source, expected) in cases {
        let err = parse("invalid.html", source).unwrap_err();
        let matched = match (&err.kind, expected) {
            (ErrorKind::MissingMacroName { .. }, "missing") => true,
            (ErrorKind::InvalidMacroParameters { .. }, "parameters") => true,
            (ErrorKind::InvalidMacroName { .. }, "name") => true,
            _ => false,
        };
        assert!(matched, "{source}: {err}");
    }

    let err = parse("invalid.html", "<p macro=\"a(b\">x</p>").unwrap_err();
    assert_eq!(err.offset, 3);
    assert!(err.to_string().contains("macro=\"a(b\""));
}

#[test]
fn test_macro_compile_error() {
    let source = "<p>\n<!--macro=\"m\"-->${a b}<!--end=\"macro\"-->";
    let err = parse("broken.html", source).unwrap_err();
    assert_eq!(err.offset, 4);
    assert_eq!((err.row, err.column), (2, 1));
    assert!(matches!(err.kind, ErrorKind::Compile { ref name, .. } if name == "m"));
}

#[test]
fn test_error_in_macro_body_points_into_source() {
    let source = "<p>\n</p><!--macro=\"m(x)\"--><b if=\"x y\">y</b><!--end=\"macro\"-->";
    let err = parse("page.html", source).unwrap_err();
    assert_eq!(err.source_name, "page.html");
    assert_eq!(err.offset, source.find("x y").unwrap());
    assert_eq!((err.row, err.column), (2, 31));
    assert!(matches!(err.kind, ErrorKind::Translate { ref value, .. } if value == "x y"));

    let source = "<ul>\n  <li macro=\"row(cell)\" set=\"n = a b\">${n}</li>\n</ul>";
    let err = parse("list.html", source).unwrap_err();
    assert_eq!(err.source_name, "list.html");
    assert_eq!(err.offset, source.find("n = a b").unwrap());
    assert_eq!(err.row, 2);
}
