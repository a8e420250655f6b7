//! Message Store
//!
//! Ordered, role-resolved transcript for one open chat session. Keyed by
//! message id so a message already in the initial snapshot is not shown
//! twice when the realtime channel pushes it again.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::models::chat::{Chat, DisplayMessage, RawChatMessage};

pub type SharedMessageStore = Arc<RwLock<MessageStore>>;

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    buyer_id: Option<String>,
    seller_id: Option<String>,
    messages: Vec<DisplayMessage>,
    seen: HashSet<String>,
}

impl MessageStore {
    /// Seed from the chat snapshot. An absent chat gives an empty store.
    pub fn initialize(chat: Option<&Chat>, buyer_id: Option<&str>, seller_id: Option<&str>) -> Self {
        let mut store = Self {
            buyer_id: buyer_id.map(str::to_string),
            seller_id: seller_id.map(str::to_string),
            ..Self::default()
        };

        if let Some(chat) = chat {
            for raw in &chat.messages {
                store.append(raw);
            }
            debug!("Seeded chat {} with {} messages", chat.id, store.len());
        }

        store
    }

    pub fn into_shared(self) -> SharedMessageStore {
        Arc::new(RwLock::new(self))
    }

    /// Append at the end in arrival order. Returns `false` when a message
    /// with the same id is already present.
    pub fn append(&mut self, raw: &RawChatMessage) -> bool {
        if !raw.id.is_empty() && !self.seen.insert(raw.id.clone()) {
            trace!("Ignoring duplicate message {}", raw.id);
            return false;
        }

        let message =
            DisplayMessage::from_raw(raw, self.buyer_id.as_deref(), self.seller_id.as_deref());
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}
