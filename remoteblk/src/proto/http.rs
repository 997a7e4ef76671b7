/// Minimal HTTP/1.1 framing for the block protocol.
///
/// Both ends speak a deliberately small subset: one request per
/// connection, `Content-Length` bodies, no chunked transfer, no
/// keep-alive. Parsers report `Incomplete` until the header section (and
/// any declared body) is fully buffered, so callers can feed a socket in
/// incrementally.
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

/// Request method. Only the verbs the protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// HTTP framing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// More data is needed.
    Incomplete,
    /// The bytes cannot be a message this implementation understands.
    Malformed,
}

/// A parsed request: request line, headers, body.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Parse a request from raw bytes. `Incomplete` until the header
    /// section and the `Content-Length` body are fully present.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let header_end = find_header_end(data).ok_or(ParseError::Incomplete)?;
        let head = core::str::from_utf8(&data[..header_end]).map_err(|_| ParseError::Malformed)?;

        let mut lines = head.split("\r\n");

        // Request line: "GET /data/?ssi=0&sc=1 HTTP/1.1"
        let request_line = lines.next().ok_or(ParseError::Malformed)?;
        let mut parts = request_line.split(' ');
        let method = match parts.next() {
            Some("GET") => Method::Get,
            Some("POST") => Method::Post,
            _ => return Err(ParseError::Malformed),
        };
        let target = parts.next().ok_or(ParseError::Malformed)?;
        match parts.next() {
            Some(version) if version.starts_with("HTTP/1.") => {}
            _ => return Err(ParseError::Malformed),
        }

        let (path, query) = split_target(target);
        let headers = parse_headers(lines);

        let body_len = match content_length(&headers)? {
            Some(n) => n,
            None => 0,
        };
        let body_start = header_end + 4;
        if data.len() < body_start + body_len {
            return Err(ParseError::Incomplete);
        }

        Ok(Self {
            method,
            path,
            query,
            headers,
            body: data[body_start..body_start + body_len].to_vec(),
        })
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup(&self.headers, name)
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A response under construction on the server side.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// 200 with the given content type and body.
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body,
        }
    }

    /// A plain-text response with an arbitrary status.
    pub fn plain(status: u16, message: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: message.as_bytes().to_vec(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::plain(400, message)
    }

    pub fn not_found() -> Self {
        Self::plain(404, "not found")
    }

    /// Attach an extra header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Serialize the full response. `Content-Length` and
    /// `Connection: close` are always emitted.
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status));
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// The parsed header section of a response, on the client side.
///
/// Only the header section is interpreted; the body is whatever follows
/// `body_start` in the caller's buffer, gated on `content_length()`.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: u16,
    headers: Vec<(String, String)>,
    /// Byte offset where the body starts in the parsed buffer.
    pub body_start: usize,
}

impl ResponseHead {
    /// Parse a response header section. `Incomplete` until the blank
    /// line arrives.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let header_end = find_header_end(data).ok_or(ParseError::Incomplete)?;
        let head = core::str::from_utf8(&data[..header_end]).map_err(|_| ParseError::Malformed)?;

        let mut lines = head.split("\r\n");

        // Status line: "HTTP/1.1 200 OK"
        let status_line = lines.next().ok_or(ParseError::Malformed)?;
        let mut parts = status_line.splitn(3, ' ');
        match parts.next() {
            Some(version) if version.starts_with("HTTP/1.") => {}
            _ => return Err(ParseError::Malformed),
        }
        let status = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(ParseError::Malformed)?;

        Ok(Self {
            status,
            headers: parse_headers(lines),
            body_start: header_end + 4,
        })
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup(&self.headers, name)
    }

    /// The declared body length, if any.
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }
}

/// Strip one trailing slash so `/data/` and `/data` route alike.
pub fn trim_route(path: &str) -> &str {
    if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

// ---- Helpers ----

/// Position of the "\r\n\r\n" separating headers from body.
fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse header lines into (name, value) pairs. Names are lowercased.
fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    headers
}

fn lookup<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let lower = name.to_ascii_lowercase();
    headers
        .iter()
        .find(|(k, _)| *k == lower)
        .map(|(_, v)| v.as_str())
}

/// Split a request target into its path and query pairs.
fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    let (path, raw_query) = match target.split_once('?') {
        Some((path, raw)) => (path, raw),
        None => (target, ""),
    };
    let mut query = Vec::new();
    for pair in raw_query.split('&') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((k, v)) => query.push((k.to_string(), v.to_string())),
            None => query.push((pair.to_string(), String::new())),
        }
    }
    (path.to_string(), query)
}

/// A declared `Content-Length` that does not parse is malformed, not
/// missing.
fn content_length(headers: &[(String, String)]) -> Result<Option<usize>, ParseError> {
    match lookup(headers, "content-length") {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ParseError::Malformed),
        None => Ok(None),
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "",
    }
}
