use std::borrow::Cow;

/// Character encodings a template can write its output in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputCharset {
    /// UTF-8, the platform default
    Utf8,
    /// ISO-8859-1
    Latin1,
    /// 7 bit US-ASCII
    Ascii,
}

impl OutputCharset {
    /// Look up an encoding by one of its common names, ignoring case.
    pub fn for_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Some(match name.as_str() {
            "utf-8" | "utf8" => OutputCharset::Utf8,
            "iso-8859-1" | "iso8859-1" | "iso_8859_1" | "latin1" | "latin-1" | "l1" => {
                OutputCharset::Latin1
            },
            "us-ascii" | "ascii" | "ascii7" => OutputCharset::Ascii,
            _ => return None,
        })
    }

    /// The canonical name
    pub fn name(self) -> &'static str {
        match self {
            OutputCharset::Utf8 => "UTF-8",
            OutputCharset::Latin1 => "ISO-8859-1",
            OutputCharset::Ascii => "US-ASCII",
        }
    }

    /// Encode text, unmappable characters become `?`.
    pub fn encode<'a>(self, value: &'a str) -> Cow<'a, [u8]> {
        let limit = match self {
            OutputCharset::Utf8 => return Cow::Borrowed(value.as_bytes()),
            OutputCharset::Latin1 => 0xff,
            OutputCharset::Ascii => 0x7f,
        };
        if value.is_ascii() {
            return Cow::Borrowed(value.as_bytes());
        }
        Cow::Owned(
            value
                .chars()
                .map(|c| match u32::from(c) {
                    c if c <= limit => c as u8,
                    _ => b'?',
                })
                .collect(),
        )
    }

    /// Decode bytes, malformed input becomes U+FFFD.
    pub fn decode<'a>(self, value: &'a [u8]) -> Cow<'a, str> {
        match self {
            OutputCharset::Utf8 => String::from_utf8_lossy(value),
            OutputCharset::Latin1 => value.iter().map(|&b| char::from(b)).collect(),
            OutputCharset::Ascii => match std::str::from_utf8(value) {
                Ok(s) if s.is_ascii() => Cow::Borrowed(s),
                _ => value
                    .iter()
                    .map(|&b| match b.is_ascii() {
                        true => char::from(b),
                        false => char::REPLACEMENT_CHARACTER,
                    })
                    .collect(),
            },
        }
    }
}
