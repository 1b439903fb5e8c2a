//! Code markers embed translated code in the rewritten document.
//!
//! A marker has the shape `\u{2}LEN:CODE\u{3}`, where `LEN` is the length of the original source
//! text the marker stands for. Downstream stages use the length to map positions back into the
//! source.

use nom::bytes::complete::take_till;
use nom::character::complete::{char, digit1};
use nom::combinator::map_res;
use nom::sequence::{delimited, pair, terminated};
use nom::IResult;

/// Opens a code marker
pub const BEGIN: char = '\u{2}';
/// Closes a code marker
pub const END: char = '\u{3}';

/// Render a code marker.
pub fn marker(len: usize, code: &str) -> String {
    format!("{BEGIN}{len}:{code}{END}")
}

/// A piece of a rewritten document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// Template text, to be written verbatim
    Text(&'a str),
    /// Translated code
    Code {
        /// Length of the source text the code replaced
        len: usize,
        #[allow(missing_docs)]
        code: &'a str,
    },
}

/// Split a rewritten document into text and code.
///
/// Malformed markers are kept as text.
pub fn split(document: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;
    while pos < document.len() {
        let input = &document[pos..];
        if let Ok((rest, (len, code))) = code_marker(input) {
            if text_start < pos {
                chunks.push(Chunk::Text(&document[text_start..pos]));
            }
            chunks.push(Chunk::Code { len, code });
            pos = document.len() - rest.len();
            text_start = pos;
            continue;
        }

        let skip = input.chars().next().map_or(1, char::len_utf8);
        pos += match input[skip..].find(BEGIN) {
            Some(next) => skip + next,
            None => input.len(),
        };
    }
    if text_start < document.len() {
        chunks.push(Chunk::Text(&document[text_start..]));
    }
    chunks
}

fn code_marker(i: &str) -> IResult<&str, (usize, &str)> {
    delimited(
        char(BEGIN),
        pair(
            terminated(map_res(digit1, str::parse), char(':')),
            take_till(|c| c == END || c == BEGIN),
        ),
        char(END),
    )(i)
}
