//! Conversation state shared between the stream task and observers.

use std::sync::Arc;

use chatwire_core::Conversation;
use parking_lot::RwLock;
use tokio::sync::watch;

/// Cloneable handle to one conversation.
///
/// Every mutation goes through [`update`](Self::update), which holds the write
/// lock for the whole closure and bumps a revision counter afterwards.
/// Observers hold a [`watch::Receiver`] to learn that something changed, then
/// take a [`snapshot`](Self::snapshot) or [`read`](Self::read).
#[derive(Debug, Clone)]
pub struct SharedConversation {
    state: Arc<RwLock<Conversation>>,
    revision: Arc<watch::Sender<u64>>,
}

impl SharedConversation {
    /// Wrap a conversation.
    #[must_use]
    pub fn new(conversation: Conversation) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(conversation)),
            revision: Arc::new(revision),
        }
    }

    /// Mutate the conversation and notify observers.
    pub fn update<R>(&self, f: impl FnOnce(&mut Conversation) -> R) -> R {
        let result = {
            let mut guard = self.state.write();
            f(&mut guard)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    /// Read the conversation without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Conversation) -> R) -> R {
        f(&self.state.read())
    }

    /// Clone the current state.
    #[must_use]
    pub fn snapshot(&self) -> Conversation {
        self.state.read().clone()
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Number of updates applied so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}
