//! Blocking one-shot HTTP client for exercising the mock server
//!
//! Each call opens a connection, writes one request, reads until the server
//! closes and parses what came back. The parse is strict about framing: a
//! body whose length disagrees with `Content-Length` is an error.

use crate::{MockError, Result};
use bytes::Bytes;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// An HTTP/1.1 request to send
///
/// # Examples
///
/// ```
/// use mocksrv::client::Request;
///
/// let request = Request::post("/2016-03-11/allTypes")
///     .content_type("application/json")
///     .body(br#"{"StringMember":"foo"}"#);
/// assert_eq!(request.method, "POST");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            path,
            content_type: None,
            body: &[],
        }
    }

    pub fn get(path: &'a str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &'a str) -> Self {
        Self::new("POST", path)
    }

    pub fn content_type(mut self, content_type: &'a str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn body(mut self, body: &'a [u8]) -> Self {
        self.body = body;
        self
    }

    /// Serializes the request for a server at `host`
    pub fn to_bytes(&self, host: SocketAddr) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.1\r\nHost: {host}\r\n", self.method, self.path);
        if let Some(content_type) = self.content_type {
            head.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body);
        bytes
    }
}

/// A response as it arrived on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Minor version of HTTP/1.x
    pub version: u8,
    pub status: u16,
    pub reason: String,
    /// Headers in wire order, names as sent
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RawResponse {
    /// Parses a complete response (everything up to the server's close)
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut response = httparse::Response::new(&mut headers);

        let head_len = match response.parse(raw) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => {
                return Err(MockError::Protocol("incomplete response head".to_string()));
            }
            Err(e) => return Err(MockError::Protocol(format!("malformed response head: {e}"))),
        };

        let mut parsed_headers = Vec::with_capacity(response.headers.len());
        for header in response.headers.iter() {
            let value = std::str::from_utf8(header.value).map_err(|_| {
                MockError::Protocol(format!("non UTF-8 value for header {}", header.name))
            })?;
            parsed_headers.push((header.name.to_string(), value.to_string()));
        }

        let parsed = Self {
            version: response.version.unwrap_or_default(),
            status: response.code.unwrap_or_default(),
            reason: response.reason.unwrap_or_default().to_string(),
            headers: parsed_headers,
            body: Bytes::copy_from_slice(&raw[head_len..]),
        };

        if let Some(declared) = parsed.header("content-length") {
            let declared: usize = declared
                .trim()
                .parse()
                .map_err(|_| MockError::Protocol(format!("invalid Content-Length {declared:?}")))?;
            if declared != parsed.body.len() {
                return Err(MockError::Protocol(format!(
                    "Content-Length {declared} but {} body bytes",
                    parsed.body.len()
                )));
            }
        }

        Ok(parsed)
    }

    /// First header with this name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.trim().parse().ok())
    }

    pub fn body_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|_| MockError::Protocol("response body is not UTF-8".to_string()))
    }
}

/// Sends one request and reads the full response
pub fn send_request(addr: SocketAddr, request: &Request<'_>, timeout: Duration) -> Result<RawResponse> {
    let raw = exchange(addr, &request.to_bytes(addr), timeout)?;
    RawResponse::parse(&raw)
}

/// Writes raw bytes and returns everything the server sends before closing
pub fn exchange(addr: SocketAddr, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
    let mut stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    stream.write_all(request)?;
    stream.flush()?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;
    Ok(raw)
}
