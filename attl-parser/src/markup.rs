//! A tolerant markup tokenizer building the element/comment tree the directive walk needs.
//!
//! Text is not kept in the tree. Every node knows its absolute byte span in the source, so
//! the walk can address the source text directly.

use std::borrow::Cow;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_until, take_while, take_while1};
use nom::character::complete::{anychar, char, multispace0, multispace1, satisfy};
use nom::combinator::{opt, recognize, rest};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::{IResult, InputTake};
use nom_locate::LocatedSpan;

pub(crate) type Span<'a> = LocatedSpan<&'a str>;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// An attribute of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Name as written
    pub name: String,
    /// Value with character references decoded, `None` for a bare attribute
    pub value: Option<String>,
    /// Offset of the first character of the name
    pub begin: usize,
    /// Offset after the value, including its closing quote
    pub end: usize,
    /// Offset of the first character of the value, inside the quotes
    pub value_begin: Option<usize>,
}

/// An element, spanning from its start tag to the end of its end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name as written
    pub name: String,
    /// Offset of the `<` of the start tag
    pub begin: usize,
    /// Offset after the end tag, or after the start tag for empty elements
    pub end: usize,
    /// Offset after the start tag
    pub start_tag_end: usize,
    #[allow(missing_docs)]
    pub attributes: Vec<Attribute>,
    /// Elements and comments inside this element
    pub children: Vec<Node>,
}

impl Element {
    /// Look up an attribute by name, ASCII case-insensitively
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// A `<!-- ... -->` comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    /// Offset of the `<`
    pub begin: usize,
    /// Offset after the `>`
    pub end: usize,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Comment(Comment),
}

impl Node {
    /// Offset of the first character
    pub fn begin(&self) -> usize {
        match self {
            Node::Element(e) => e.begin,
            Node::Comment(c) => c.begin,
        }
    }

    /// Offset after the last character
    pub fn end(&self) -> usize {
        match self {
            Node::Element(e) => e.end,
            Node::Comment(c) => c.end,
        }
    }
}

/// Top level nodes of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    #[allow(missing_docs)]
    pub children: Vec<Node>,
}

enum Token {
    Comment(Comment),
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
        begin: usize,
        end: usize,
    },
    EndTag {
        name: String,
        begin: usize,
        end: usize,
    },
    Other,
}

/// Build the element tree of a document. Never fails: anything that does not form a tag is text.
///
/// An end tag closes the innermost open element of the same name, elements opened after it are
/// closed implicitly where the end tag begins. Unmatched end tags are ignored, elements left open
/// end at the end of the source.
pub fn parse(source: &str) -> Document {
    let mut stack: Vec<Element> = Vec::new();
    let mut document = Document::default();
    let mut input = Span::new(source);

    while !input.fragment().is_empty() {
        let (rest, token) = match token(input) {
            Ok(result) => result,
            // `text()` accepts every non-empty input
            Err(_) => break,
        };
        input = rest;

        match token {
            Token::Comment(comment) => push_node(&mut stack, &mut document, Node::Comment(comment)),
            Token::StartTag {
                name,
                attributes,
                self_closing,
                begin,
                end,
            } => {
                let mut element = Element {
                    name,
                    begin,
                    end,
                    start_tag_end: end,
                    attributes,
                    children: Vec::new(),
                };
                let lower = element.name.to_ascii_lowercase();
                if self_closing || VOID_ELEMENTS.contains(&lower.as_str()) {
                    push_node(&mut stack, &mut document, Node::Element(element));
                } else if RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
                    let len = raw_text_len(input.fragment(), &lower);
                    let (rest, _) = input.take_split(len);
                    input = rest;
                    element.end = input.location_offset();
                    push_node(&mut stack, &mut document, Node::Element(element));
                } else {
                    stack.push(element);
                }
            },
            Token::EndTag { name, begin, end } => {
                let Some(pos) = stack
                    .iter()
                    .rposition(|e| e.name.eq_ignore_ascii_case(&name))
                else {
                    continue;
                };
                while stack.len() > pos + 1 {
                    close_top(&mut stack, &mut document, begin);
                }
                close_top(&mut stack, &mut document, end);
            },
            Token::Other => {},
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut document, source.len());
    }
    document
}

fn push_node(stack: &mut [Element], document: &mut Document, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => document.children.push(node),
    }
}

fn close_top(stack: &mut Vec<Element>, document: &mut Document, end: usize) {
    if let Some(mut element) = stack.pop() {
        element.end = end;
        push_node(stack, document, Node::Element(element));
    }
}

/// Length of the content of a raw text element, including its end tag.
fn raw_text_len(input: &str, lower_name: &str) -> usize {
    let lower = input.to_ascii_lowercase();
    let needle = format!("</{lower_name}");
    match lower.find(&needle) {
        Some(pos) => match lower[pos..].find('>') {
            Some(gt) => pos + gt + 1,
            None => input.len(),
        },
        None => input.len(),
    }
}

fn token(i: Span<'_>) -> IResult<Span<'_>, Token> {
    alt((comment, cdata, declaration, end_tag, start_tag, text))(i)
}

fn comment(i: Span<'_>) -> IResult<Span<'_>, Token> {
    let begin = i.location_offset();
    let (i, _) = tag("<!--")(i)?;
    let (i, _) = alt((terminated(take_until("-->"), tag("-->")), rest))(i)?;
    Ok((
        i,
        Token::Comment(Comment {
            begin,
            end: i.location_offset(),
        }),
    ))
}

fn cdata(i: Span<'_>) -> IResult<Span<'_>, Token> {
    let (i, _) = tag("<![CDATA[")(i)?;
    let (i, _) = alt((terminated(take_until("]]>"), tag("]]>")), rest))(i)?;
    Ok((i, Token::Other))
}

/// `<!DOCTYPE ...>` and `<?...?>`
fn declaration(i: Span<'_>) -> IResult<Span<'_>, Token> {
    let (i, _) = alt((tag("<!"), tag("<?")))(i)?;
    let (i, _) = alt((terminated(take_until(">"), tag(">")), rest))(i)?;
    Ok((i, Token::Other))
}

fn tag_name(i: Span<'_>) -> IResult<Span<'_>, Span<'_>> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')),
    ))(i)
}

fn end_tag(i: Span<'_>) -> IResult<Span<'_>, Token> {
    let begin = i.location_offset();
    let (i, name) = delimited(tag("</"), tag_name, pair(multispace0, char('>')))(i)?;
    Ok((
        i,
        Token::EndTag {
            name: name.fragment().to_string(),
            begin,
            end: i.location_offset(),
        },
    ))
}

fn start_tag(i: Span<'_>) -> IResult<Span<'_>, Token> {
    let begin = i.location_offset();
    let (i, name) = preceded(char('<'), tag_name)(i)?;
    let (i, attributes) = many0(preceded(multispace1, attribute))(i)?;
    let (i, _) = multispace0(i)?;
    let (i, slash) = opt(char('/'))(i)?;
    let (i, _) = char('>')(i)?;
    Ok((
        i,
        Token::StartTag {
            name: name.fragment().to_string(),
            attributes,
            self_closing: slash.is_some(),
            begin,
            end: i.location_offset(),
        },
    ))
}

fn attribute(i: Span<'_>) -> IResult<Span<'_>, Attribute> {
    let begin = i.location_offset();
    let (i, name) = take_while1(|c: char| {
        !c.is_whitespace() && !matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
    })(i)?;
    let (i, value) = opt(preceded(
        tuple((multispace0, char('='), multispace0)),
        attribute_value,
    ))(i)?;
    Ok((
        i,
        Attribute {
            name: name.fragment().to_string(),
            value: value.map(|v| decode_entities(v.fragment()).into_owned()),
            begin,
            end: i.location_offset(),
            value_begin: value.map(|v| v.location_offset()),
        },
    ))
}

fn attribute_value(i: Span<'_>) -> IResult<Span<'_>, Span<'_>> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        take_while1(|c: char| !c.is_whitespace() && !matches!(c, '"' | '\'' | '<' | '>')),
    ))(i)
}

/// Anything else up to the next `<`; a `<` that starts no tag is text, too.
fn text(i: Span<'_>) -> IResult<Span<'_>, Token> {
    let (i, _) = anychar(i)?;
    let (i, _) = take_till(|c| c == '<')(i)?;
    Ok((i, Token::Other))
}

/// Decode the predefined entities and numeric character references.
///
/// Unknown or malformed references are kept as written.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        result.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match rest.find(';').and_then(|end| Some((decode_reference(&rest[1..end])?, end))) {
            Some((c, end)) => {
                result.push(c);
                rest = &rest[end + 1..];
            },
            None => {
                result.push('&');
                rest = &rest[1..];
            },
        }
    }
    result.push_str(rest);
    Cow::Owned(result)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(e) => e,
            Node::Comment(c) => panic!("expected element, got {c:?}"),
        }
    }

    #[test]
    fn test_nesting() {
        let source = "<html><body><p a=\"1\">x<b>y</b></p><br><img src='a.png'/></body></html>";
        let doc = parse(source);
        assert_eq!(doc.children.len(), 1);
        let html = element(&doc.children[0]);
        assert_eq!((html.begin, html.end), (0, source.len()));
        let body = element(&html.children[0]);
        assert_eq!(body.children.len(), 3);

        let p = element(&body.children[0]);
        assert_eq!(&source[p.begin..p.end], "<p a=\"1\">x<b>y</b></p>");
        assert_eq!(&source[p.begin..p.start_tag_end], "<p a=\"1\">");
        let a = p.attribute("A").unwrap();
        assert_eq!(&source[a.begin..a.end], "a=\"1\"");
        assert_eq!(a.value.as_deref(), Some("1"));
        assert_eq!(a.value_begin, Some(a.begin + 3));

        let br = element(&body.children[1]);
        assert_eq!(&source[br.begin..br.end], "<br>");
        let img = element(&body.children[2]);
        assert_eq!(&source[img.begin..img.end], "<img src='a.png'/>");
    }

    #[test]
    fn test_comments_and_declarations() {
        let source = "<!DOCTYPE html><?xml x?><![CDATA[<p>]]><!-- a --><div><!--b--></div>";
        let doc = parse(source);
        assert_eq!(doc.children.len(), 2);
        assert_eq!(
            doc.children[0],
            Node::Comment(Comment {
                begin: source.find("<!-- a").unwrap(),
                end: source.find("<div>").unwrap(),
            })
        );
        let div = element(&doc.children[1]);
        assert_eq!(div.children.len(), 1);
        assert!(matches!(div.children[0], Node::Comment(_)));
    }

    #[test]
    fn test_implicit_close() {
        let source = "<div><p>a<span>b</div><i>c";
        let doc = parse(source);
        assert_eq!(doc.children.len(), 2);
        let div = element(&doc.children[0]);
        assert_eq!(div.end, source.find("<i>").unwrap());
        let p = element(&div.children[0]);
        assert_eq!(p.end, source.find("</div>").unwrap());
        assert_eq!(p.children.len(), 1);
        let i = element(&doc.children[1]);
        assert_eq!(i.end, source.len());
    }

    #[test]
    fn test_stray_text() {
        let source = "a < b </x> <p if=x>1 > 0</p> <3";
        let doc = parse(source);
        assert_eq!(doc.children.len(), 1);
        let p = element(&doc.children[0]);
        assert_eq!(&source[p.begin..p.end], "<p if=x>1 > 0</p>");
        assert_eq!(p.attributes[0].value.as_deref(), Some("x"));
    }

    #[test]
    fn test_raw_text() {
        let source = "<script>if (a <b) { x = '<!-- no -->'; }</SCRIPT><p></p>";
        let doc = parse(source);
        assert_eq!(doc.children.len(), 2);
        let script = element(&doc.children[0]);
        assert!(script.children.is_empty());
        assert_eq!(script.end, source.find("<p>").unwrap());
    }

    #[test]
    fn test_bare_attribute() {
        let source = "<p else   id=\"x\">";
        let doc = parse(source);
        let p = element(&doc.children[0]);
        assert_eq!(p.attributes.len(), 2);
        assert_eq!(p.attributes[0].name, "else");
        assert_eq!(p.attributes[0].value, None);
        assert_eq!(p.attributes[0].value_begin, None);
        assert_eq!(p.attributes[1].begin, source.find("id").unwrap());
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("x &gt; 1"), "x > 1");
        assert_eq!(decode_entities("&lt;&amp;&quot;&apos;&#65;&#x42;"), "<&\"'AB");
        assert_eq!(decode_entities("a & b &unknown; &#xZZ;"), "a & b &unknown; &#xZZ;");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }
}
