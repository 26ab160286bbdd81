//! # Envelope Codec
//!
//! Serialization for the wire message format exchanged over the push
//! channel: `{"type": string, "event_type"?: string, "event"?: string,
//! "data"?: object}`. Encoding and decoding are pure functions with no
//! connection state.
//!
//! Inbound envelopes are classified into the closed [`Frame`] enum so
//! dispatch is exhaustive. Anything outside the recognized set lands in
//! [`Frame::Unknown`] and is dropped by the caller, never treated as fatal
//! to the channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// One discrete wire-format message unit.
///
/// `kind` maps to the `type` field on the wire and must be non-empty.
/// Absent optional fields are omitted from the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The `type` discriminant.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event category, used by subscription control frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Specific event name inside a category (e.g. `post_created`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Arbitrary JSON payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// A liveness probe frame.
    pub fn ping() -> Self {
        Self::bare("ping")
    }

    /// The acknowledgement for a liveness probe.
    pub fn pong() -> Self {
        Self::bare("pong")
    }

    /// Declares interest in an event category.
    pub fn subscribe(category: &str) -> Self {
        Self {
            kind: "subscribe".to_string(),
            event_type: Some(category.to_string()),
            event: None,
            data: None,
        }
    }

    /// Withdraws interest in an event category.
    pub fn unsubscribe(category: &str) -> Self {
        Self {
            kind: "unsubscribe".to_string(),
            event_type: Some(category.to_string()),
            event: None,
            data: None,
        }
    }

    /// An application-defined frame with a payload.
    pub fn custom(kind: &str, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            event_type: None,
            event: None,
            data: Some(data),
        }
    }

    fn bare(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            event_type: None,
            event: None,
            data: None,
        }
    }

    /// Serializes the envelope to its wire form.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        if self.kind.is_empty() {
            return Err(ProtocolError::MissingType);
        }
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Parses one wire frame into an envelope.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        if envelope.kind.is_empty() {
            return Err(ProtocolError::MissingType);
        }
        Ok(envelope)
    }
}

/// A decoded inbound frame, classified by its `type` discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Server-originated liveness probe; answered with a pong.
    Ping,
    /// Acknowledgement of a liveness probe we sent.
    Pong,
    /// The server accepted a subscription.
    SubscriptionConfirmed {
        /// Category the confirmation refers to, when the server names one.
        category: Option<String>,
    },
    /// A live update for a subscribed category.
    Update {
        /// The event category consumers registered for.
        category: String,
        /// Specific event name, `update` when the server omits one.
        event: String,
        /// Event payload.
        data: Value,
    },
    /// Server-reported error (e.g. a declined subscription).
    ServerError {
        /// Category the error refers to, when the server names one.
        category: Option<String>,
        /// Human-readable description.
        message: String,
    },
    /// Anything outside the recognized set. Logged and dropped upstream.
    Unknown {
        /// The unrecognized `type` discriminant.
        kind: String,
    },
}

impl Frame {
    /// Classifies a decoded envelope.
    ///
    /// Update frames arrive in two shapes: a generic `event` type carrying
    /// the category in `event_type`, or a category-named type such as
    /// `social_update` / `ecommerce_update`.
    pub fn classify(envelope: Envelope) -> Frame {
        let Envelope {
            kind,
            event_type,
            event,
            data,
        } = envelope;
        match kind.as_str() {
            "ping" => return Frame::Ping,
            "pong" => return Frame::Pong,
            "subscription_confirmed" => {
                return Frame::SubscriptionConfirmed {
                    category: event_type,
                }
            }
            "error" => {
                return Frame::ServerError {
                    category: event_type,
                    message: error_message(data),
                }
            }
            _ => {}
        }

        let category = if kind == "event" {
            event_type
        } else {
            kind.strip_suffix("_update")
                .filter(|category| !category.is_empty())
                .map(str::to_string)
        };
        match category {
            Some(category) => Frame::Update {
                category,
                event: event.unwrap_or_else(|| "update".to_string()),
                data: data.unwrap_or(Value::Null),
            },
            None => Frame::Unknown { kind },
        }
    }
}

fn error_message(data: Option<Value>) -> String {
    match data {
        Some(Value::String(message)) => message,
        Some(value) => value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        None => "unspecified error".to_string(),
    }
}
