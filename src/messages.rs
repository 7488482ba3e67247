use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageKind {
    Print,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub msg: String,
}

/// Human-facing output channel. The engine pushes here (for example when
/// the search budget runs out) and the embedding application drains with
/// `next`; the core itself never writes to stdout.
#[derive(Clone, Debug, Default)]
pub struct MessageQueue {
    messages: Arc<Mutex<VecDeque<Message>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Option<Message> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.pop_front()
        } else {
            None
        }
    }

    pub fn push(&self, kind: MessageKind, msg: String) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push_back(Message { kind, msg });
        }
    }

    pub fn print(&self, msg: impl Into<String>) {
        self.push(MessageKind::Print, msg.into());
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.push(MessageKind::Warning, msg.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_drain() {
        let queue = MessageQueue::new();
        queue.print("one");
        queue.warning("two");

        let first = queue.next().unwrap();
        assert_eq!(first.kind, MessageKind::Print);
        assert_eq!(first.msg, "one");

        let second = queue.next().unwrap();
        assert_eq!(second.kind, MessageKind::Warning);
        assert!(queue.next().is_none());
    }
}
