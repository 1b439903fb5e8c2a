use std::cell::RefCell;
use std::rc::Rc;

use crate::charset::OutputCharset;

/// The buffer a rendering template writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Character output
    Text(String),
    /// Byte output, text is encoded with the output encoding
    Bytes(Vec<u8>),
}

/// Shared handle to the active output, stored in the context frame.
pub type OutputHandle = Rc<RefCell<Output>>;

impl Output {
    /// An empty buffer, byte oriented if `stream` is set
    pub fn new(stream: bool) -> Self {
        match stream {
            true => Output::Bytes(Vec::new()),
            false => Output::Text(String::new()),
        }
    }

    /// A fresh shared handle
    pub fn handle(stream: bool) -> OutputHandle {
        Rc::new(RefCell::new(Self::new(stream)))
    }

    /// Append text
    pub fn write_str(&mut self, s: &str, charset: Option<OutputCharset>) {
        match self {
            Output::Text(buf) => buf.push_str(s),
            Output::Bytes(buf) => {
                buf.extend_from_slice(&charset.unwrap_or(OutputCharset::Utf8).encode(s))
            },
        }
    }

    /// Append raw bytes, decoding them for character output
    pub fn write_bytes(&mut self, b: &[u8], charset: Option<OutputCharset>) {
        match self {
            Output::Text(buf) => buf.push_str(&charset.unwrap_or(OutputCharset::Utf8).decode(b)),
            Output::Bytes(buf) => buf.extend_from_slice(b),
        }
    }

    /// Move the content out, leaving an empty buffer of the same kind
    pub fn take(&mut self) -> Self {
        match self {
            Output::Text(buf) => Output::Text(std::mem::take(buf)),
            Output::Bytes(buf) => Output::Bytes(std::mem::take(buf)),
        }
    }

    /// True if nothing was written
    pub fn is_empty(&self) -> bool {
        match self {
            Output::Text(buf) => buf.is_empty(),
            Output::Bytes(buf) => buf.is_empty(),
        }
    }
}
