use crate::types::{Color, ParticipantId, ParticipantSummary, Stroke};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `from` label of the echo a chat sender gets for its own message.
pub const SELF_CHAT_LABEL: &str = "You";

/// Payload of `loadSession`, also the shape of a session export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub strokes: Vec<Stroke>,
}

/// Client -> server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Draw {
        stroke: Stroke,
    },
    Cursor {
        x: f64,
        y: f64,
    },
    Undo,
    Redo,
    Clear,
    SetName {
        #[serde(default)]
        name: String,
    },
    Chat {
        text: String,
    },
    LoadSession {
        data: SessionData,
    },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed json: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("message has no type tag")]
    MissingType,
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid stroke {stroke_id:?} in {kind}")]
    InvalidStroke { kind: &'static str, stroke_id: String },
}

impl ClientMessage {
    pub const KINDS: [&'static str; 8] = [
        "draw",
        "cursor",
        "undo",
        "redo",
        "clear",
        "setName",
        "chat",
        "loadSession",
    ];

    /// Parses one text frame. Unknown tags are told apart from broken
    /// payloads of known tags so they can be logged differently.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(DecodeError::MissingType)?
            .to_owned();
        if !Self::KINDS.contains(&kind.as_str()) {
            return Err(DecodeError::UnknownType(kind));
        }
        let message: ClientMessage = serde_json::from_value(value)
            .map_err(|source| DecodeError::InvalidPayload { kind, source })?;
        message.validate()?;
        Ok(message)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Draw { .. } => "draw",
            Self::Cursor { .. } => "cursor",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::Clear => "clear",
            Self::SetName { .. } => "setName",
            Self::Chat { .. } => "chat",
            Self::LoadSession { .. } => "loadSession",
        }
    }

    fn validate(&self) -> Result<(), DecodeError> {
        let strokes: &[Stroke] = match self {
            Self::Draw { stroke } => std::slice::from_ref(stroke),
            Self::LoadSession { data } => &data.strokes,
            _ => &[],
        };
        match strokes.iter().find(|s| !s.is_valid()) {
            Some(invalid) => Err(DecodeError::InvalidStroke {
                kind: self.kind(),
                stroke_id: invalid.stroke_id.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Server -> client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Init {
        #[serde(rename = "clientId")]
        client_id: ParticipantId,
        color: Color,
        name: String,
        room: String,
    },
    FullUpdate {
        strokes: Vec<Stroke>,
    },
    Draw {
        stroke: Stroke,
    },
    Cursor {
        #[serde(rename = "userId")]
        user_id: ParticipantId,
        x: f64,
        y: f64,
        color: Color,
        name: String,
    },
    Users {
        users: Vec<ParticipantSummary>,
    },
    Chat {
        from: String,
        text: String,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::FullUpdate { .. } => "fullUpdate",
            Self::Draw { .. } => "draw",
            Self::Cursor { .. } => "cursor",
            Self::Users { .. } => "users",
            Self::Chat { .. } => "chat",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
