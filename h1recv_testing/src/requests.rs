//! Canned request bytes.

/// A `GET` for `target` with a `Host` header.
#[must_use]
pub fn get(target: &str) -> Vec<u8> {
    format!("GET {target} HTTP/1.1\r\nHost: test\r\n\r\n").into_bytes()
}

/// A `POST` for `target` carrying `body` with its `Content-Length`.
#[must_use]
pub fn post(target: &str, body: &[u8]) -> Vec<u8> {
    let mut bytes = format!(
        "POST {target} HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_declares_its_body() {
        let bytes = post("/p", b"abc");
        assert!(bytes.ends_with(b"Content-Length: 3\r\n\r\nabc"));
    }
}
