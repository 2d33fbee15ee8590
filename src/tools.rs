//! Tool call interpretation
//!
//! Turns navigation tool calls on agent messages into navigation requests.
//! User-authored messages are never scanned, so a user typing
//! "next_persona" cannot trigger a switch.

use crate::messages::{Message, ToolCall, ToolCallKind};
use crate::navigation::{Direction, NavigationRequest};
use tracing::{debug, warn};

/// Function name that advances to the next persona
pub const NEXT_PERSONA: &str = "next_persona";

/// Function name that goes back to the previous persona
pub const PREVIOUS_PERSONA: &str = "previous_persona";

/// Outcome of interpreting a single tool call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interpretation {
    /// A recognized navigation command
    Command(NavigationRequest),
    /// Navigation tool call with a function name outside the vocabulary
    Unrecognized(String),
    /// Tool call of another kind, not ours to handle
    Foreign(String),
}

/// Interpret one tool call
pub fn interpret_call(call: &ToolCall) -> Interpretation {
    match &call.kind {
        ToolCallKind::Navigation => match call.function_name.as_str() {
            NEXT_PERSONA => Interpretation::Command(NavigationRequest::Advance(Direction::Next)),
            PREVIOUS_PERSONA => {
                Interpretation::Command(NavigationRequest::Advance(Direction::Previous))
            }
            other => Interpretation::Unrecognized(other.to_string()),
        },
        ToolCallKind::Other(tag) => Interpretation::Foreign(tag.clone()),
    }
}

/// Navigation requests carried by `message`, in tool call order
///
/// Each call yields its own request; nothing is batched or coalesced.
pub fn navigation_requests(message: &Message) -> Vec<NavigationRequest> {
    if !message.is_agent || message.tool_calls.is_empty() {
        return Vec::new();
    }

    let mut requests = Vec::with_capacity(message.tool_calls.len());
    for call in &message.tool_calls {
        match interpret_call(call) {
            Interpretation::Command(request) => {
                debug!("Message {} requests {:?}", message.id, request);
                requests.push(request);
            }
            Interpretation::Unrecognized(name) => {
                warn!("Unknown tool call {:?} on message {}", name, message.id);
            }
            Interpretation::Foreign(tag) => {
                debug!(
                    "Ignoring {} tool call {:?} on message {}",
                    tag, call.function_name, message.id
                );
            }
        }
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary() {
        assert_eq!(
            interpret_call(&ToolCall::navigation(NEXT_PERSONA)),
            Interpretation::Command(NavigationRequest::Advance(Direction::Next))
        );
        assert_eq!(
            interpret_call(&ToolCall::navigation(PREVIOUS_PERSONA)),
            Interpretation::Command(NavigationRequest::Advance(Direction::Previous))
        );
        assert_eq!(
            interpret_call(&ToolCall::navigation("shuffle_personas")),
            Interpretation::Unrecognized("shuffle_personas".to_string())
        );
    }

    #[test]
    fn test_foreign_kind_is_ignored_even_with_known_name() {
        let call = ToolCall::other("web_tool", NEXT_PERSONA);
        assert_eq!(interpret_call(&call), Interpretation::Foreign("web_tool".to_string()));
    }

    #[test]
    fn test_user_messages_are_never_scanned() {
        let message = Message::user("u-1", "next_persona please")
            .with_tool_calls(vec![ToolCall::navigation(NEXT_PERSONA)]);
        assert!(navigation_requests(&message).is_empty());
    }

    #[test]
    fn test_multiple_calls_in_order() {
        let message = Message::agent("a-1", "switching").with_tool_calls(vec![
            ToolCall::navigation(PREVIOUS_PERSONA),
            ToolCall::navigation("dance"),
            ToolCall::other("web_tool", "search"),
            ToolCall::navigation(NEXT_PERSONA),
            ToolCall::navigation(NEXT_PERSONA),
        ]);

        assert_eq!(
            navigation_requests(&message),
            vec![
                NavigationRequest::Advance(Direction::Previous),
                NavigationRequest::Advance(Direction::Next),
                NavigationRequest::Advance(Direction::Next),
            ]
        );
    }

    #[test]
    fn test_agent_message_without_calls() {
        assert!(navigation_requests(&Message::agent("a-2", "hello")).is_empty());
    }
}
