//! Message stream reconciliation
//!
//! The remote sequence is authoritative: once it holds anything it is
//! rendered as-is and the local echo is dropped. Until then the echo stands
//! in for it. There is no identity matching between the two sources.

use super::storage::EchoStorage;
use super::types::{Message, MessageId};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MessageReconciler {
    echo: EchoStorage,
}

impl MessageReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer user input ahead of any engine acknowledgment
    pub fn push_echo(&self, text: impl Into<String>) -> MessageId {
        let message = Message::local_echo(text);
        let id = message.id.clone();
        self.echo.add(message);
        id
    }

    /// Withdraw an echo whose send failed
    pub fn retract_echo(&self, id: &MessageId) -> bool {
        self.echo.remove(id).is_some()
    }

    /// Drop all echo, e.g. when a new session replaces the old one
    pub fn reset(&self) {
        self.echo.clear();
    }

    pub fn echo_len(&self) -> usize {
        self.echo.len()
    }

    /// Messages to render, in order
    pub fn render(&self, remote: &[Message]) -> Vec<Message> {
        if remote.is_empty() {
            return self.echo.get_all();
        }

        if !self.echo.is_empty() {
            debug!(
                "Remote stream populated ({} messages), discarding {} local echo entries",
                remote.len(),
                self.echo.len()
            );
            self.echo.clear();
        }
        remote.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_rendered_while_remote_empty() {
        let reconciler = MessageReconciler::new();
        reconciler.push_echo("first");
        reconciler.push_echo("second");

        let rendered = reconciler.render(&[]);
        let texts: Vec<&str> = rendered.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_remote_supersedes_echo() {
        let reconciler = MessageReconciler::new();
        reconciler.push_echo("hello");

        let remote = vec![Message::user("r-1", "hello"), Message::agent("r-2", "hi there")];
        let rendered = reconciler.render(&remote);

        assert_eq!(rendered, remote);
        assert_eq!(reconciler.echo_len(), 0, "echo is discarded once remote is populated");
        assert!(reconciler.render(&[]).is_empty());
    }

    #[test]
    fn test_remote_order_is_preserved() {
        let reconciler = MessageReconciler::new();
        let remote = vec![
            Message::agent("3", "c"),
            Message::user("1", "a"),
            Message::agent("2", "b"),
        ];
        let ids: Vec<String> = reconciler
            .render(&remote)
            .iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_retract_echo() {
        let reconciler = MessageReconciler::new();
        let keep = reconciler.push_echo("keep");
        let drop = reconciler.push_echo("drop");

        assert!(reconciler.retract_echo(&drop));
        assert!(!reconciler.retract_echo(&drop));

        let rendered = reconciler.render(&[]);
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].id, keep);
    }
}
