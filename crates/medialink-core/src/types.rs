// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types and wire constants for media sessions.
//
// The numeric codes below are emitted verbatim by the native side of the
// bridge. They must never be renumbered.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MediaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of a status message pushed to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    State,
    Duration,
    Position,
    Error,
}

impl MessageType {
    /// Wire code as emitted by the native side.
    pub fn code(self) -> u32 {
        match self {
            Self::State => 1,
            Self::Duration => 2,
            Self::Position => 3,
            Self::Error => 9,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::State),
            2 => Some(Self::Duration),
            3 => Some(Self::Position),
            9 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Playback/recording state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaState {
    None,
    Starting,
    Running,
    Paused,
    Stopped,
}

impl MediaState {
    pub fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Starting => 1,
            Self::Running => 2,
            Self::Paused => 3,
            Self::Stopped => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Starting),
            2 => Some(Self::Running),
            3 => Some(Self::Paused),
            4 => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Display name used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }
}

impl std::fmt::Display for MediaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error codes carried in ERROR status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum MediaErrorCode {
    NoneActive,
    Aborted,
    Network,
    Decode,
    /// The source format is not supported by the primitive.
    NoneSupported,
}

impl MediaErrorCode {
    pub fn code(self) -> u32 {
        match self {
            Self::NoneActive => 0,
            Self::Aborted => 1,
            Self::Network => 2,
            Self::Decode => 3,
            Self::NoneSupported => 4,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::NoneActive),
            1 => Some(Self::Aborted),
            2 => Some(Self::Network),
            3 => Some(Self::Decode),
            4 => Some(Self::NoneSupported),
            _ => None,
        }
    }
}

impl From<MediaErrorCode> for u32 {
    fn from(code: MediaErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u32> for MediaErrorCode {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown media error code {code}"))
    }
}

/// Payload of an ERROR status: a structured code or a free-form string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaErrorValue {
    Code {
        code: MediaErrorCode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Text(String),
}

impl MediaErrorValue {
    pub fn code(code: MediaErrorCode) -> Self {
        Self::Code {
            code,
            message: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Interpret a raw wire value. Anything that is neither a code object nor
    /// a string is kept as its JSON text.
    pub fn from_value(value: &Value) -> Self {
        match serde_json::from_value::<MediaErrorValue>(value.clone()) {
            Ok(parsed) => parsed,
            Err(_) => Self::Text(value.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Code { code, message } => {
                let mut obj = serde_json::Map::new();
                obj.insert("code".into(), Value::from(code.code()));
                if let Some(message) = message {
                    obj.insert("message".into(), Value::from(message.as_str()));
                }
                Value::Object(obj)
            }
            Self::Text(text) => Value::from(text.as_str()),
        }
    }
}

/// A typed status ready to be put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    State(MediaState),
    Duration(f64),
    Position(f64),
    Error(MediaErrorValue),
}

impl Status {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::State(_) => MessageType::State,
            Self::Duration(_) => MessageType::Duration,
            Self::Position(_) => MessageType::Position,
            Self::Error(_) => MessageType::Error,
        }
    }

    /// Split into the `(msgType, value)` pair the dispatcher consumes.
    pub fn into_wire(self) -> (u32, Value) {
        let msg_type = self.message_type().code();
        let value = match self {
            Self::State(state) => Value::from(state.code()),
            Self::Duration(d) => Value::from(d),
            Self::Position(p) => Value::from(p),
            Self::Error(err) => err.to_value(),
        };
        (msg_type, value)
    }
}

/// Status push as it arrives from the native side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub id: String,
    #[serde(rename = "msgType")]
    pub msg_type: u32,
    #[serde(default)]
    pub value: Value,
}

/// Envelope of every message delivered on the inbound channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub action: String,
    #[serde(default)]
    pub status: Option<StatusMessage>,
}

/// Options forwarded with a play command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_loops: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_audio_when_screen_is_locked: Option<bool>,
}

impl PlayOptions {
    pub fn is_empty(&self) -> bool {
        self.number_of_loops.is_none() && self.play_audio_when_screen_is_locked.is_none()
    }
}

/// Coerce a wire value to a number the way the native side's loosely-typed
/// payloads require: JSON numbers, numeric strings and booleans are accepted.
///
/// Null, blank strings and anything that is not finite yield `None`, so a
/// missing value never lands in a cache as zero.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
