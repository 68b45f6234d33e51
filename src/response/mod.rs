//! Canned HTTP response templates
//!
//! A `ResponseTemplate` is the one reply the mock server ever sends. It owns
//! the wire framing: header order, `Content-Length` and `Connection: close`
//! are all produced by `render`, never supplied by the caller.

pub mod template;


pub use template::{BodyVariant, ResponseTemplate, ResponseTemplateBuilder, Variant, media_type_essence};
