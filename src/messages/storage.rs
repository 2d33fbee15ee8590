use super::types::{Message, MessageId};
use parking_lot::RwLock;
use std::sync::Arc;

/// Local echo buffer: user input not yet acknowledged by the engine
#[derive(Debug, Clone)]
pub struct EchoStorage {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl EchoStorage {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add(&self, message: Message) {
        self.messages.write().push(message);
    }

    pub fn remove(&self, id: &MessageId) -> Option<Message> {
        let mut messages = self.messages.write();
        let position = messages.iter().position(|m| &m.id == id)?;
        Some(messages.remove(position))
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for EchoStorage {
    fn default() -> Self {
        Self::new()
    }
}
