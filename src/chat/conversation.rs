use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::chat::events::SessionEvent;
use crate::models::Message;

/// Append-only transcript. There is no way to edit, remove or reorder an
/// entry once it is in.
pub struct Conversation {
    messages: RwLock<Vec<Message>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Conversation {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Only the session appends; everyone else reads snapshots.
    pub(crate) fn append(&self, message: Message) {
        self.messages.write().push(message.clone());
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::MessageAppended { message });
    }

    /// Copy of every message appended so far, in order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}
