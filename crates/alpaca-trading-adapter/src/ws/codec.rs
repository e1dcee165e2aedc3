/*
[INPUT]:  Credentials, stream classes and raw inbound frame bytes
[OUTPUT]: Outbound protocol text and decoded Frame values
[POS]:    WebSocket layer - message parsing and serialization
[UPDATE]: When adding new stream classes or changing the frame format
*/

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ws::{StreamError, StreamResult};

/// Discriminator of the authorization reply
pub const AUTHORIZATION_STREAM: &str = "authorization";
/// Status carried by a successful authorization reply
pub const AUTHORIZED_STATUS: &str = "authorized";

/// Stream class the client can listen to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamClass {
    TradeUpdates,
}

impl StreamClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamClass::TradeUpdates => "trade_updates",
        }
    }

    /// Matches a frame discriminator against the known classes
    pub fn from_discriminator(stream: &str) -> Option<Self> {
        match stream {
            "trade_updates" => Some(StreamClass::TradeUpdates),
            _ => None,
        }
    }
}

impl fmt::Display for StreamClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub stream: Option<String>,
    pub data: Value,
}

impl Frame {
    pub fn is_stream(&self, class: StreamClass) -> bool {
        self.stream.as_deref() == Some(class.as_str())
    }
}

/// `{"action":"authenticate","data":{"key_id":..,"secret_key":..}}`
pub fn encode_auth(key_id: &str, secret_key: &str) -> String {
    json!({
        "action": "authenticate",
        "data": {
            "key_id": key_id,
            "secret_key": secret_key,
        }
    })
    .to_string()
}

/// `{"action":"listen","data":{"streams":[..]}}`
pub fn encode_subscribe(streams: &BTreeSet<StreamClass>) -> String {
    let streams: Vec<&str> = streams.iter().map(StreamClass::as_str).collect();
    json!({
        "action": "listen",
        "data": {
            "streams": streams,
        }
    })
    .to_string()
}

/// Decode raw bytes into a frame
///
/// Only unparseable bytes fail. A document without a string `stream`
/// member decodes with no discriminator and is left for the router to drop.
pub fn decode(raw: &[u8]) -> StreamResult<Frame> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|err| StreamError::MalformedFrame(err.to_string()))?;
    let Value::Object(mut object) = value else {
        return Ok(Frame {
            stream: None,
            data: value,
        });
    };

    let stream = match object.remove("stream") {
        Some(Value::String(stream)) => Some(stream),
        _ => None,
    };
    let data = object.remove("data").unwrap_or(Value::Null);

    Ok(Frame { stream, data })
}

/// `data.status` of an authorization reply
pub fn auth_status(frame: &Frame) -> Option<&str> {
    frame.data.get("status").and_then(Value::as_str)
}

/// Fails unless the reply status is "authorized"
pub fn check_authorized(frame: &Frame) -> StreamResult<()> {
    match auth_status(frame) {
        Some(AUTHORIZED_STATUS) => Ok(()),
        Some(status) => Err(StreamError::Authentication {
            status: status.to_string(),
        }),
        None => Err(StreamError::Authentication {
            status: "missing".to_string(),
        }),
    }
}
