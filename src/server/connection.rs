use super::config::ServerConfig;
use crate::response::{ResponseTemplate, Variant};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use tracing::debug;

/// The part of an inbound request the server looks at
///
/// Only `content_type` influences the response; `content_length` tells the
/// handler how much body to drain before replying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Option<String>,
    pub path: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<usize>,
}

impl RequestHead {
    /// Parses a request head from the start of `buf`
    ///
    /// Returns `Ok(None)` while the head is still incomplete, otherwise the
    /// parsed head and the number of bytes it occupied.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, httparse::Error> {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut headers);

        let head_len = match req.parse(buf)? {
            httparse::Status::Complete(len) => len,
            httparse::Status::Partial => return Ok(None),
        };

        let mut head = RequestHead {
            method: req.method.map(str::to_string),
            path: req.path.map(str::to_string),
            ..Default::default()
        };
        for header in req.headers.iter() {
            let value = std::str::from_utf8(header.value).ok().map(str::trim);
            if header.name.eq_ignore_ascii_case("content-type") {
                head.content_type = value.map(str::to_string);
            } else if header.name.eq_ignore_ascii_case("content-length") {
                head.content_length = value.and_then(|v| v.parse().ok());
            }
        }

        Ok(Some((head, head_len)))
    }
}

/// Outcome of one served connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub variant: Variant,
    pub bytes_written: usize,
}

/// Serves exactly one response on `stream` and closes it
///
/// The stream is consumed, so it is closed on every return path. Errors are
/// only those of configuring or writing the socket; a missing, slow or
/// malformed request just selects the default variant.
pub fn handle_connection(
    mut stream: TcpStream,
    template: &ResponseTemplate,
    config: &ServerConfig,
) -> io::Result<Exchange> {
    stream.set_read_timeout(Some(config.read_timeout))?;
    stream.set_write_timeout(Some(config.write_timeout))?;

    let request = read_request(&mut stream, config);
    let variant = template.select(request.content_type.as_deref());
    debug!(
        method = request.method.as_deref().unwrap_or("-"),
        path = request.path.as_deref().unwrap_or("-"),
        content_type = request.content_type.as_deref().unwrap_or("-"),
        %variant,
        "Selected response variant"
    );

    let response = template.render_variant(variant);
    stream.write_all(&response)?;
    stream.flush()?;

    Ok(Exchange {
        variant,
        bytes_written: response.len(),
    })
}

/// Reads the request head and drains its declared body
///
/// Closing a socket with unread input makes the kernel reset the connection,
/// which can discard the response before the client reads it.
fn read_request(stream: &mut TcpStream, config: &ServerConfig) -> RequestHead {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let (head, head_len) = loop {
        match stream.read(&mut chunk) {
            Ok(0) => return RequestHead::default(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "Request head not received");
                return RequestHead::default();
            }
        }

        match RequestHead::parse(&buf) {
            Ok(Some(parsed)) => break parsed,
            Ok(None) if buf.len() < config.max_request_head => continue,
            Ok(None) => {
                debug!(limit = config.max_request_head, "Request head too large");
                return RequestHead::default();
            }
            Err(e) => {
                debug!(error = %e, "Unparseable request head");
                return RequestHead::default();
            }
        }
    };

    let declared = head.content_length.unwrap_or(0).min(config.max_request_body);
    let mut remaining = declared.saturating_sub(buf.len() - head_len);
    while remaining > 0 {
        match stream.read(&mut chunk[..remaining.min(1024)]) {
            Ok(0) => break,
            Ok(n) => remaining -= n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, remaining, "Request body not fully received");
                break;
            }
        }
    }

    head
}
