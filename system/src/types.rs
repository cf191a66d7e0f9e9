use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-side handle of one websocket. Never leaves the server.
pub type ConnectionId = uuid::Uuid;

/// CSS color string as sent by clients, e.g. `#e6194b`.
pub type Color = String;

/// Public, unguessable identity of a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Brush,
    Eraser,
}

/// One committed freehand drawing action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: Color,
    pub size: f64,
    pub tool: Tool,
    pub stroke_id: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<ParticipantId>,
    /// Client specific fields, kept so they survive the round trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Stroke {
    pub fn new(points: Vec<Point>, color: &str, size: f64, tool: Tool, stroke_id: &str) -> Self {
        Self {
            points,
            color: color.to_owned(),
            size,
            tool,
            stroke_id: stroke_id.to_owned(),
            author_id: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn authored_by(mut self, author_id: ParticipantId) -> Self {
        self.author_id = Some(author_id);
        self
    }

    /// A stroke needs at least one point and a positive, finite size.
    pub fn is_valid(&self) -> bool {
        !self.points.is_empty() && self.size.is_finite() && self.size > 0.0
    }
}

/// Roster entry broadcast in `users` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub name: String,
    pub color: Color,
}
