//! Content-Length framing: header line parsing and outbound header blocks.
use thiserror::Error;

/// Content type announced by LSP peers. Anything else is tolerated with a warning.
pub const DEFAULT_CONTENT_TYPE: &str = "application/vscode-jsonrpc; charset=utf-8";

const SEPARATOR: &str = ": ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header line without \": \" separator: {line:?}")]
    NoSeparator { line: String },

    #[error("invalid Content-Length value: {value:?}")]
    InvalidContentLength { value: String },

    #[error("Content-Length {length} exceeds limit of {limit} bytes")]
    ContentLengthTooLarge { length: usize, limit: usize },
}

/// Header of the message currently being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub content_length: Option<usize>,
    pub content_type: String,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            content_length: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

/// Header fields this layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    ContentLength,
    ContentType,
    Unknown,
}

impl HeaderField {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("Content-Length") {
            HeaderField::ContentLength
        } else if name.eq_ignore_ascii_case("Content-Type") {
            HeaderField::ContentType
        } else {
            HeaderField::Unknown
        }
    }
}

/// Split a header line on the first `": "`.
///
/// Trailing `\r\n` is stripped from the value.
pub fn parse_header_line(line: &str) -> Result<(&str, &str), HeaderError> {
    match line.split_once(SEPARATOR) {
        Some((name, value)) => Ok((name, value.trim_end_matches(['\r', '\n']))),
        None => Err(HeaderError::NoSeparator {
            line: line.trim_end_matches(['\r', '\n']).to_string(),
        }),
    }
}

/// True when the line holds nothing but whitespace (the header terminator).
pub fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Parse a Content-Length value, rejecting negatives, garbage and values over `limit`.
pub fn parse_content_length(value: &str, limit: usize) -> Result<usize, HeaderError> {
    let length = value
        .trim()
        .parse::<usize>()
        .map_err(|_| HeaderError::InvalidContentLength {
            value: value.to_string(),
        })?;
    if length > limit {
        return Err(HeaderError::ContentLengthTooLarge { length, limit });
    }
    Ok(length)
}

/// The only header block ever written on send.
pub fn build_header_block(body_length: usize) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n", body_length).into_bytes()
}
