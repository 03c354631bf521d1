//! Request messages produced by the receive pipeline.
//!
//! A [`Request`] is only ever observed complete: the parser builds it
//! privately and hands it over once the body (if any) has been read.

use std::fmt;

use bytes::Bytes;

/// Protocol version carried on the request line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Version {
    /// `HTTP/1.0`
    Http10,
    /// `HTTP/1.1`
    Http11,
}

impl Version {
    /// Recognise the version token of a request line.
    #[must_use]
    pub fn from_token(token: &[u8]) -> Option<Self> {
        match token {
            b"HTTP/1.0" => Some(Self::Http10),
            b"HTTP/1.1" => Some(Self::Http11),
            _ => None,
        }
    }

    /// Wire representation of the version.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Ordered header list with ASCII case-insensitive name lookup.
///
/// Names keep the spelling received on the wire and duplicates are retained
/// in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Create an empty header list.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append a header, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Value of the first header named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> { self.get_all(name).next() }

    /// Values of every header named `name`, in arrival order.
    pub fn get_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a header named `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Iterate over `(name, value)` pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of header entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether the list holds no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Whether any comma-separated element of the `name` headers equals
    /// `token`, ignoring ASCII case.
    #[must_use]
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name)
            .flat_map(|value| value.split(','))
            .any(|item| item.trim().eq_ignore_ascii_case(token))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

/// How the end of the request body is determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BodyLength {
    /// The message ends with its head.
    #[default]
    None,
    /// Exactly this many body bytes follow the head.
    Fixed(usize),
}

impl BodyLength {
    /// Number of body bytes the message carries.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Fixed(n) => n,
        }
    }
}

/// A fully received request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) version: Version,
    pub(crate) headers: Headers,
    pub(crate) body_length: BodyLength,
    pub(crate) body: Bytes,
}

impl Request {
    /// Method token, exactly as received.
    #[must_use]
    pub fn method(&self) -> &str { &self.method }

    /// Request target, exactly as received.
    #[must_use]
    pub fn target(&self) -> &str { &self.target }

    #[must_use]
    pub fn version(&self) -> Version { self.version }

    #[must_use]
    pub fn headers(&self) -> &Headers { &self.headers }

    /// Body framing derived from the header section.
    #[must_use]
    pub fn body_length(&self) -> BodyLength { self.body_length }

    #[must_use]
    pub fn body(&self) -> &Bytes { &self.body }

    /// Consume the request and return its body.
    #[must_use]
    pub fn into_body(self) -> Bytes { self.body }

    /// Whether the client allows the connection to carry another request.
    ///
    /// HTTP/1.1 connections persist unless `Connection: close` is sent;
    /// HTTP/1.0 connections persist only with `Connection: keep-alive`.
    #[must_use]
    pub fn wants_keep_alive(&self) -> bool {
        match self.version {
            Version::Http11 => !self.headers.has_token("connection", "close"),
            Version::Http10 => self.headers.has_token("connection", "keep-alive"),
        }
    }
}
