//! Validation of complete request and header lines.
//!
//! The functions here only ever see whole lines with the terminator already
//! stripped, so they are independent of how the input was chunked.

use super::ParseError;
use crate::request::{BodyLength, Headers, Version};

/// Request line fields held until the head is complete.
#[derive(Debug)]
pub(super) struct StartLine {
    pub method: String,
    pub target: String,
    pub version: Version,
}

/// `tchar` from RFC 9110 section 5.6.2.
fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}

fn is_token(bytes: &[u8]) -> bool { !bytes.is_empty() && bytes.iter().copied().all(is_tchar) }

// Visible ASCII plus obs-text; UTF-8 validity is checked separately.
fn is_target_byte(b: u8) -> bool { b > b' ' && b != 0x7f }

fn is_field_value_byte(b: u8) -> bool { b == b'\t' || (b >= b' ' && b != 0x7f) }

fn trim_ows(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

/// Parse `method SP request-target SP HTTP-version`.
///
/// Runs of spaces between the three tokens are tolerated.
pub(super) fn parse_request_line(line: &[u8]) -> Result<StartLine, ParseError> {
    let mut parts = line.split(|&b| b == b' ').filter(|part| !part.is_empty());
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::start_line("expected method, target and version"));
    };

    if !is_token(method) {
        return Err(ParseError::start_line("method is not a token"));
    }
    if !target.iter().copied().all(is_target_byte) {
        return Err(ParseError::start_line("invalid byte in request target"));
    }
    let version = Version::from_token(version)
        .ok_or(ParseError::start_line("unsupported protocol version"))?;
    let target = std::str::from_utf8(target)
        .map_err(|_| ParseError::start_line("request target is not valid UTF-8"))?;

    Ok(StartLine {
        method: String::from_utf8_lossy(method).into_owned(),
        target: target.to_owned(),
        version,
    })
}

/// Parse `field-name ":" OWS field-value OWS`.
pub(super) fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    if matches!(line.first(), Some(b' ' | b'\t')) {
        return Err(ParseError::header("obsolete line folding"));
    }
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(ParseError::header("missing ':' separator"))?;
    let (name, value) = line.split_at(colon);
    if name.is_empty() {
        return Err(ParseError::header("empty header name"));
    }
    if !is_token(name) {
        return Err(ParseError::header("header name is not a token"));
    }

    let value = trim_ows(&value[1..]);
    if !value.iter().copied().all(is_field_value_byte) {
        return Err(ParseError::header("invalid byte in header value"));
    }
    let value = std::str::from_utf8(value)
        .map_err(|_| ParseError::header("header value is not valid UTF-8"))?;

    Ok((String::from_utf8_lossy(name).into_owned(), value.to_owned()))
}

fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::header("invalid Content-Length"));
    }
    value
        .parse()
        .map_err(|_| ParseError::header("Content-Length out of range"))
}

/// Derive body framing from a complete header section.
///
/// Repeated `Content-Length` headers are accepted only when they agree.
pub(super) fn body_length(headers: &Headers) -> Result<BodyLength, ParseError> {
    if headers.contains("transfer-encoding") {
        return Err(ParseError::header("Transfer-Encoding is not supported"));
    }
    let mut declared = None;
    for value in headers.get_all("content-length") {
        let len = parse_content_length(value)?;
        match declared {
            Some(previous) if previous != len => {
                return Err(ParseError::header("conflicting Content-Length values"));
            }
            _ => declared = Some(len),
        }
    }
    Ok(declared.map_or(BodyLength::None, BodyLength::Fixed))
}
