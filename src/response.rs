//! Responses written back at the dispatch edge.
//!
//! A [`Response`] carries a status, extra headers and a body. Framing headers
//! (`Content-Length` and `Connection`) are always generated by
//! [`Response::encode`] and never taken from the caller.

use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::request::{Headers, Version};

/// Canonical reason phrase for `status`, or `""` when none is known.
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Content Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Response to a received request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Bytes,
    close: bool,
}

impl Default for Response {
    fn default() -> Self { Self::new(200) }
}

impl Response {
    /// Create an empty response with the given status code.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
            close: false,
        }
    }

    /// Append a header. `Content-Length` and `Connection` are ignored.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Ask for the connection to be closed after this response.
    #[must_use]
    pub fn close(mut self) -> Self {
        self.close = true;
        self
    }

    #[must_use]
    pub fn status(&self) -> u16 { self.status }

    #[must_use]
    pub fn headers(&self) -> &Headers { &self.headers }

    #[must_use]
    pub fn body(&self) -> &Bytes { &self.body }

    /// Whether the response asked for the connection to be closed.
    #[must_use]
    pub fn wants_close(&self) -> bool { self.close }

    /// Serialise the response for a `version` peer into `dst`.
    ///
    /// `keep_alive` states whether the connection stays open afterwards and
    /// selects the `Connection` header written, if any.
    pub fn encode(&self, version: Version, keep_alive: bool, dst: &mut BytesMut) {
        let mut head = String::with_capacity(128);
        // Writing to a String cannot fail.
        let _ = write!(
            head,
            "{version} {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        );
        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("connection")
            {
                continue;
            }
            let _ = write!(head, "{name}: {value}\r\n");
        }
        let _ = write!(head, "Content-Length: {}\r\n", self.body.len());
        match (keep_alive, version) {
            (false, _) => head.push_str("Connection: close\r\n"),
            (true, Version::Http10) => head.push_str("Connection: keep-alive\r\n"),
            (true, Version::Http11) => {}
        }
        head.push_str("\r\n");

        dst.reserve(head.len() + self.body.len());
        dst.put_slice(head.as_bytes());
        dst.put_slice(&self.body);
    }
}
