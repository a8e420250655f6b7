//! Message Submission
//!
//! Sends operator chat messages. The sent message is not echoed into the
//! message store; it shows up when the realtime channel pushes it back.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ConsoleError, Result};
use crate::services::backend_api::BackendApi;
use crate::services::notifications::Notifier;

#[derive(Debug, Default)]
struct ComposerState {
    draft: String,
    sending: bool,
}

/// Draft input plus the single in-flight send. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MessageComposer {
    state: Arc<Mutex<ComposerState>>,
}

/// Clears the sending flag however the send ends
struct SendingGuard<'a> {
    state: &'a Mutex<ComposerState>,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().sending = false;
    }
}

impl MessageComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().draft = text.into();
    }

    pub fn draft(&self) -> String {
        self.state.lock().draft.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.state.lock().sending
    }

    /// Submit control is enabled only with a non-blank draft and nothing in flight
    pub fn can_submit(&self) -> bool {
        let state = self.state.lock();
        !state.sending && !state.draft.trim().is_empty()
    }

    /// Send the current draft to `chat_id`.
    ///
    /// Blank drafts never reach the backend. On success the draft is cleared;
    /// on failure it is kept for a retry and the backend's message is shown.
    pub async fn submit(
        &self,
        api: &dyn BackendApi,
        notifier: &dyn Notifier,
        chat_id: Option<&str>,
    ) -> Result<()> {
        let (chat_id, content) = {
            let mut state = self.state.lock();
            if state.draft.trim().is_empty() {
                return Err(ConsoleError::EmptyMessage);
            }
            if state.sending {
                return Err(ConsoleError::SendInFlight);
            }
            let Some(chat_id) = chat_id else {
                drop(state);
                notifier.error("Failed to send message");
                return Err(ConsoleError::MissingChat);
            };
            state.sending = true;
            (chat_id, state.draft.clone())
        };
        let _guard = SendingGuard { state: &self.state };

        match api.send_chat(chat_id, &content).await {
            Ok(()) => {
                debug!("Message sent to chat {}", chat_id);
                let mut state = self.state.lock();
                // Only clear if the operator hasn't started typing something else
                if state.draft == content {
                    state.draft.clear();
                }
                drop(state);
                notifier.success("Message sent");
                Ok(())
            }
            Err(e) => {
                warn!("Sending to chat {} failed: {}", chat_id, e);
                let message = match &e {
                    ConsoleError::Rejected(m) if !m.is_empty() => m.clone(),
                    ConsoleError::Rejected(_) => "Failed to send message".to_string(),
                    other => other.user_message(),
                };
                notifier.error(&message);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::backend_api::fake::FakeBackend;
    use crate::services::notifications::{Level, RecordingNotifier};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_blank_draft_issues_no_request() {
        let api = FakeBackend::new(None);
        let notifier = RecordingNotifier::new();
        let composer = MessageComposer::new();

        composer.set_draft("   ");
        assert!(!composer.can_submit());

        let err = composer.submit(&api, &notifier, Some("c1")).await.unwrap_err();
        assert!(matches!(err, ConsoleError::EmptyMessage));
        assert!(api.sent.lock().is_empty());
        assert!(notifier.entries().is_empty());
    }

    #[tokio::test]
    async fn test_success_clears_draft() {
        let api = FakeBackend::new(None);
        let notifier = RecordingNotifier::new();
        let composer = MessageComposer::new();

        composer.set_draft("Please upload the receipt");
        composer.submit(&api, &notifier, Some("c1")).await.unwrap();

        assert_eq!(
            api.sent.lock().clone(),
            vec![("c1".to_string(), "Please upload the receipt".to_string())]
        );
        assert_eq!(composer.draft(), "");
        assert!(!composer.is_sending());
        assert_eq!(notifier.last().unwrap().level, Level::Success);
    }

    #[tokio::test]
    async fn test_failure_keeps_draft_and_surfaces_message() {
        let api = FakeBackend::new(None);
        *api.send_result.lock() = Err("Chat not found".to_string());
        let notifier = RecordingNotifier::new();
        let composer = MessageComposer::new();

        composer.set_draft("hello");
        let err = composer.submit(&api, &notifier, Some("missing")).await.unwrap_err();

        assert!(matches!(err, ConsoleError::Rejected(_)));
        assert_eq!(composer.draft(), "hello");
        assert!(!composer.is_sending());
        let last = notifier.last().unwrap();
        assert_eq!(last.level, Level::Error);
        assert_eq!(last.message, "Chat not found");
    }

    #[tokio::test]
    async fn test_second_send_while_in_flight_is_refused() {
        let gate = Arc::new(Notify::new());
        let mut api = FakeBackend::new(None);
        api.send_gate = Some(gate.clone());
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::new());
        let composer = MessageComposer::new();
        composer.set_draft("first");

        let first = {
            let (api, notifier, composer) = (api.clone(), notifier.clone(), composer.clone());
            tokio::spawn(async move { composer.submit(api.as_ref(), notifier.as_ref(), Some("c1")).await })
        };

        while !composer.is_sending() {
            tokio::task::yield_now().await;
        }
        assert!(!composer.can_submit());
        let err = composer.submit(api.as_ref(), notifier.as_ref(), Some("c1")).await.unwrap_err();
        assert!(matches!(err, ConsoleError::SendInFlight));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(api.sent.lock().len(), 1);
        assert!(!composer.is_sending());
    }
}
