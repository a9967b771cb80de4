//! Decoded payloads and the response-parse strategy seam.

use crate::error::RequestError;
use serde_json::Value;

/// A response body decoded per the descriptor's response kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Result<Value, RequestError> {
        match self {
            Payload::Json(value) => Ok(value),
            other => Err(RequestError::Parse(format!(
                "expected a json payload, got {}",
                other.kind_name()
            ))),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Payload::Json(_) => "json",
            Payload::Text(_) => "text",
            Payload::Bytes(_) => "bytes",
        }
    }
}

/// Strategy turning decoded payloads into caller values.
///
/// The executor calls [`ResponseParser::parse_keyed`] when the descriptor
/// carries a result key and [`ResponseParser::parse`] otherwise.
/// Implementations that do not care about the key get the keyed variant for
/// free. Parse failures are terminal; they are never retried.
pub trait ResponseParser: Send + Sync {
    type Output: Send + 'static;

    fn parse(&self, payload: Payload) -> Result<Self::Output, RequestError>;

    fn parse_keyed(&self, _key: &str, payload: Payload) -> Result<Self::Output, RequestError> {
        self.parse(payload)
    }
}

/// Identity strategy: hands the decoded payload straight back.
pub struct PayloadParser;

impl ResponseParser for PayloadParser {
    type Output = Payload;

    fn parse(&self, payload: Payload) -> Result<Payload, RequestError> {
        Ok(payload)
    }
}
