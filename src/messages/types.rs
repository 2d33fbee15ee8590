use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Wire tag carried by persona-switching tool calls
pub const NAVIGATION_TOOL_KIND: &str = "gabber_tool";

/// Message identity, engine-assigned for remote messages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for an optimistic local echo
    pub fn local() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallKind {
    /// A persona-switching command
    Navigation,
    /// Any other tool type, kept with its wire tag
    Other(String),
}

impl ToolCallKind {
    pub fn from_tag(tag: &str) -> Self {
        if tag == NAVIGATION_TOOL_KIND {
            ToolCallKind::Navigation
        } else {
            ToolCallKind::Other(tag.to_string())
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            ToolCallKind::Navigation => NAVIGATION_TOOL_KIND,
            ToolCallKind::Other(tag) => tag,
        }
    }
}

/// Structured instruction attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireToolCall", into = "WireToolCall")]
pub struct ToolCall {
    pub kind: ToolCallKind,
    pub function_name: String,
}

impl ToolCall {
    pub fn navigation(function_name: impl Into<String>) -> Self {
        Self {
            kind: ToolCallKind::Navigation,
            function_name: function_name.into(),
        }
    }

    pub fn other(tag: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            kind: ToolCallKind::Other(tag.into()),
            function_name: function_name.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunction,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    name: String,
}

impl From<WireToolCall> for ToolCall {
    fn from(wire: WireToolCall) -> Self {
        Self {
            kind: ToolCallKind::from_tag(&wire.kind),
            function_name: wire.function.name,
        }
    }
}

impl From<ToolCall> for WireToolCall {
    fn from(call: ToolCall) -> Self {
        Self {
            kind: call.kind.tag().to_string(),
            function: WireFunction {
                name: call.function_name,
            },
        }
    }
}

/// A conversation message, remote or local echo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "agent")]
    pub is_agent: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, text: impl Into<String>, is_agent: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_agent,
            tool_calls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Message authored by the remote persona
    pub fn agent(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageId::new(id), text, true)
    }

    /// Message authored by the user, as acknowledged by the engine
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageId::new(id), text, false)
    }

    /// Optimistic local echo of user input
    pub fn local_echo(text: impl Into<String>) -> Self {
        Self::new(MessageId::local(), text, false)
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Decode a remote message from its JSON wire form
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ToolCall>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}
