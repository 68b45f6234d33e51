use crate::{MockError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderName, HeaderValue, StatusCode, Version};
use std::fmt;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONNECTION: &str = "Connection";

/// Headers the template computes itself and refuses to take from callers
const RESERVED_HEADERS: &[&str] = &[CONTENT_TYPE, CONTENT_LENGTH, CONNECTION, "Transfer-Encoding"];

/// Which body a rendered response carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Alternate,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Default => f.write_str("default"),
            Variant::Alternate => f.write_str("alternate"),
        }
    }
}

/// A response body together with the content-type announced for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyVariant {
    content_type: Option<String>,
    body: Bytes,
}

impl BodyVariant {
    /// A body sent without a `Content-Type` header
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

#[derive(Debug, Clone)]
struct Alternate {
    selector: String,
    variant: BodyVariant,
}

/// Immutable description of the canned reply
///
/// Built once through [`ResponseTemplate::builder`]. The status line and the
/// caller's headers are serialized at build time; `render` only appends the
/// per-variant framing headers and the body.
///
/// # Examples
///
/// ```
/// use mocksrv::response::{ResponseTemplate, Variant};
///
/// let template = ResponseTemplate::builder(200)
///     .json(r#"{"ok":true}"#)
///     .alternate("application/xml", "<ok>true</ok>")
///     .build()
///     .unwrap();
///
/// assert_eq!(template.select(Some("application/xml")), Variant::Alternate);
/// let wire = template.render(None);
/// assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
/// assert!(wire.ends_with(br#"{"ok":true}"#));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    status: StatusCode,
    reason: String,
    version: Version,
    headers: Vec<(String, String)>,
    head: Bytes,
    default: BodyVariant,
    alternate: Option<Alternate>,
}

impl ResponseTemplate {
    /// Starts a template for the given status code
    pub fn builder(status: u16) -> ResponseTemplateBuilder {
        ResponseTemplateBuilder {
            status,
            reason: None,
            version: Version::HTTP_11,
            headers: Vec::new(),
            default: BodyVariant::new(Bytes::new()),
            alternate: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Caller-supplied headers, in wire order
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The content-type that selects the alternate body, if one is configured
    pub fn selector(&self) -> Option<&str> {
        self.alternate.as_ref().map(|a| a.selector.as_str())
    }

    /// Picks the body variant for a request's declared content-type
    ///
    /// Only the media-type essence is compared, ASCII case-insensitively, so
    /// `application/xml; charset=utf-8` still selects an `application/xml`
    /// alternate. Anything else, including no content-type, gets the default.
    pub fn select(&self, content_type: Option<&str>) -> Variant {
        match (&self.alternate, content_type) {
            (Some(alternate), Some(ct))
                if media_type_essence(ct).eq_ignore_ascii_case(&alternate.selector) =>
            {
                Variant::Alternate
            }
            _ => Variant::Default,
        }
    }

    pub fn variant(&self, variant: Variant) -> &BodyVariant {
        match (variant, &self.alternate) {
            (Variant::Alternate, Some(alternate)) => &alternate.variant,
            _ => &self.default,
        }
    }

    /// `Content-Length` the given variant is sent with
    pub fn content_length(&self, variant: Variant) -> usize {
        self.variant(variant).body.len()
    }

    /// Renders the exact bytes written for a request with this content-type
    pub fn render(&self, content_type: Option<&str>) -> Bytes {
        self.render_variant(self.select(content_type))
    }

    pub fn render_variant(&self, variant: Variant) -> Bytes {
        let chosen = self.variant(variant);
        let length = chosen.body.len().to_string();

        let mut buf = BytesMut::with_capacity(self.head.len() + 96 + chosen.body.len());
        buf.put_slice(&self.head);
        if let Some(content_type) = &chosen.content_type {
            put_header(&mut buf, CONTENT_TYPE, content_type);
        }
        put_header(&mut buf, CONTENT_LENGTH, &length);
        put_header(&mut buf, CONNECTION, "close");
        buf.put_slice(b"\r\n");
        buf.put_slice(&chosen.body);
        buf.freeze()
    }
}

/// Builder for [`ResponseTemplate`]
///
/// Validation happens in [`build`](Self::build) so the chain stays infallible.
#[derive(Debug, Clone)]
pub struct ResponseTemplateBuilder {
    status: u16,
    reason: Option<String>,
    version: Version,
    headers: Vec<(String, String)>,
    default: BodyVariant,
    alternate: Option<(String, Bytes)>,
}

impl ResponseTemplateBuilder {
    /// Overrides the status message (defaults to the canonical reason phrase)
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Protocol label written in the status line; HTTP/1.0 or HTTP/1.1
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header; duplicates are kept and written in insertion order
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Default body, sent without a `Content-Type`
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.default = BodyVariant::new(body);
        self
    }

    /// Default body with its content-type
    pub fn body_with_type(mut self, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.default = BodyVariant::with_content_type(content_type, body);
        self
    }

    /// Default body as `application/json`
    pub fn json(self, body: impl Into<Bytes>) -> Self {
        self.body_with_type("application/json", body)
    }

    /// Alternate body served when the request declares `selector` as its
    /// content-type; it is sent back with that same content-type
    pub fn alternate(mut self, selector: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.alternate = Some((selector.into(), body.into()));
        self
    }

    pub fn build(self) -> Result<ResponseTemplate> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| MockError::Template(format!("invalid status code {}", self.status)))?;

        let reason = match self.reason {
            Some(reason) => reason,
            None => status.canonical_reason().unwrap_or_default().to_string(),
        };
        if reason.contains(['\r', '\n']) {
            return Err(MockError::Template("status message contains a line break".to_string()));
        }

        let label = protocol_label(self.version)?;

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| MockError::Template(format!("invalid header name {name:?}")))?;
            HeaderValue::from_str(value)
                .map_err(|_| MockError::Template(format!("invalid value for header {name}")))?;
            if RESERVED_HEADERS.iter().any(|r| r.eq_ignore_ascii_case(name)) {
                return Err(MockError::Template(format!(
                    "header {name} is computed by the template"
                )));
            }
        }

        if let Some(content_type) = self.default.content_type() {
            HeaderValue::from_str(content_type)
                .map_err(|_| MockError::Template(format!("invalid content-type {content_type:?}")))?;
        }

        let alternate = match self.alternate {
            Some((selector, body)) => {
                let essence = media_type_essence(&selector);
                if essence.is_empty() {
                    return Err(MockError::Template("empty alternate selector".to_string()));
                }
                HeaderValue::from_str(&selector)
                    .map_err(|_| MockError::Template(format!("invalid selector {selector:?}")))?;
                Some(Alternate {
                    selector: essence.to_string(),
                    variant: BodyVariant::with_content_type(selector, body),
                })
            }
            None => None,
        };

        let mut head = BytesMut::new();
        head.put_slice(format!("{label} {} {reason}\r\n", status.as_u16()).as_bytes());
        for (name, value) in &self.headers {
            put_header(&mut head, name, value);
        }

        Ok(ResponseTemplate {
            status,
            reason,
            version: self.version,
            headers: self.headers,
            head: head.freeze(),
            default: self.default,
            alternate,
        })
    }
}

/// The media type without parameters: `text/xml; charset=utf-8` -> `text/xml`
pub fn media_type_essence(value: &str) -> &str {
    value.split(';').next().unwrap_or_default().trim()
}

fn protocol_label(version: Version) -> Result<&'static str> {
    match version {
        Version::HTTP_10 => Ok("HTTP/1.0"),
        Version::HTTP_11 => Ok("HTTP/1.1"),
        other => Err(MockError::Template(format!("unsupported protocol {other:?}"))),
    }
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_u8(b':');
    buf.put_slice(value.as_bytes());
    buf.put_slice(b"\r\n");
}
