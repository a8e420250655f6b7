//! Dispute Session
//!
//! One open dispute view: loads the dispute once, seeds the message store,
//! streams live chat into it, and exposes send/resolve. `close` detaches
//! the realtime channel.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::chat::DisplayMessage;
use crate::models::dispute::{Dispute, DisputeStatus, Party};
use crate::services::backend_api::BackendApi;
use crate::services::message_store::{MessageStore, SharedMessageStore};
use crate::services::notifications::Notifier;
use crate::services::realtime::{ChannelHandle, RealtimeChannel};
use crate::services::resolution::ResolutionController;
use crate::services::submission::MessageComposer;

pub struct DisputeSession {
    api: Arc<dyn BackendApi>,
    notifier: Arc<dyn Notifier>,
    dispute: Dispute,
    store: SharedMessageStore,
    composer: MessageComposer,
    resolution: ResolutionController,
    channel: Option<ChannelHandle>,
}

impl DisputeSession {
    /// Load `dispute_id` and attach live chat. Without a realtime channel
    /// (or if attaching fails) the session works from the loaded snapshot.
    pub async fn open(
        api: Arc<dyn BackendApi>,
        realtime: Option<&RealtimeChannel>,
        notifier: Arc<dyn Notifier>,
        dispute_id: &str,
    ) -> Result<Self> {
        let dispute = match api.fetch_dispute(dispute_id).await {
            Ok(dispute) => dispute,
            Err(e) => {
                notifier.error(&e.user_message());
                return Err(e);
            }
        };

        if dispute.trade.is_none() {
            warn!("Dispute {} loaded without a trade", dispute.id);
        }

        let store =
            MessageStore::initialize(dispute.chat(), dispute.buyer_id(), dispute.seller_id())
                .into_shared();

        let channel = match realtime {
            Some(realtime) => match realtime.attach(dispute.chat_id()).await {
                Ok(handle) => {
                    let store = store.clone();
                    handle.on_message(move |raw| {
                        if store.write().append(raw) {
                            debug!("Live message {} appended", raw.id);
                        }
                    });
                    Some(handle)
                }
                Err(e) => {
                    warn!("Live chat unavailable for dispute {}: {}", dispute.id, e);
                    notifier.error(&e.user_message());
                    None
                }
            },
            None => None,
        };

        info!(
            "Opened dispute {} ({}), {} messages, live={}",
            dispute.id,
            dispute.status,
            store.read().len(),
            channel.is_some()
        );

        Ok(Self {
            api,
            notifier,
            resolution: ResolutionController::new(dispute.id.clone(), dispute.status),
            dispute,
            store,
            composer: MessageComposer::new(),
            channel,
        })
    }

    pub fn dispute(&self) -> &Dispute {
        &self.dispute
    }

    pub fn status(&self) -> DisputeStatus {
        self.resolution.status()
    }

    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.store.read().messages().to_vec()
    }

    pub fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    pub fn resolution(&self) -> &ResolutionController {
        &self.resolution
    }

    pub fn is_live(&self) -> bool {
        self.channel.as_ref().is_some_and(ChannelHandle::is_connected)
    }

    /// Send the composer's current draft
    pub async fn send_draft(&self) -> Result<()> {
        self.composer
            .submit(self.api.as_ref(), self.notifier.as_ref(), self.dispute.chat_id())
            .await
    }

    /// Award the escrow and reload the dispute on success
    pub async fn resolve(&mut self, party: Party) -> Result<DisputeStatus> {
        let status = self
            .resolution
            .resolve(self.api.as_ref(), self.notifier.as_ref(), party)
            .await?;
        self.dispute.status = status;

        if let Err(e) = self.refresh().await {
            warn!("Dispute {} refresh after resolution failed: {}", self.dispute.id, e);
        }

        Ok(status)
    }

    /// Reload dispute, trade and chat. Snapshot messages not seen yet are
    /// appended; nothing already shown is removed or reordered. Id-less
    /// snapshot messages were already placed by `open` and are skipped.
    pub async fn refresh(&mut self) -> Result<()> {
        let dispute = match self.api.fetch_dispute(&self.dispute.id).await {
            Ok(dispute) => dispute,
            Err(e) => {
                self.notifier.error(&e.user_message());
                return Err(e);
            }
        };

        if let Some(chat) = dispute.chat() {
            let mut store = self.store.write();
            let added = chat
                .messages
                .iter()
                .filter(|raw| !raw.id.is_empty() && store.append(raw))
                .count();
            if added > 0 {
                debug!("Refresh added {} messages to dispute {}", added, dispute.id);
            }
        }

        self.resolution.sync_status(dispute.status);
        self.dispute = dispute;
        self.dispute.status = self.resolution.status();
        Ok(())
    }

    /// Tear down live updates. Consumes the session.
    pub async fn close(mut self) {
        if let Some(handle) = self.channel.take() {
            handle.detach().await;
        }
        info!("Closed dispute {}", self.dispute.id);
    }
}
