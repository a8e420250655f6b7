use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::models::api::{
    DisputeResponse, ErrorBody, ResolveDisputeRequest, ResolveDisputeResponse, SendChatRequest,
    SendChatResponse,
};
use crate::models::dispute::{Dispute, DisputeStatus, Party};

/// Request/response calls the dispute workflow depends on
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn fetch_dispute(&self, dispute_id: &str) -> Result<Dispute>;

    /// Award the escrow to `winner`. Returns the status reported by the
    /// backend, or `None` when it acknowledged without one.
    async fn resolve_dispute(&self, dispute_id: &str, winner: Party) -> Result<Option<DisputeStatus>>;

    async fn send_chat(&self, chat_id: &str, content: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpBackendApi {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl HttpBackendApi {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("accept", "application/json")
            .bearer_auth(&self.auth_token)
    }

    /// Send, then map non-2xx and `error: true` bodies to the backend's message.
    /// `Ok(None)` is a 2xx whose body is empty or not JSON.
    async fn execute_value(&self, builder: RequestBuilder) -> Result<Option<serde_json::Value>> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) if status.is_success() => {
                tracing::debug!("Backend returned {} with a non-JSON body: {}", status, e);
                return Ok(None);
            }
            Err(_) => return Err(ConsoleError::Rejected(format!("Backend error {}", status))),
        };

        let error_body: ErrorBody = serde_json::from_value(value.clone()).unwrap_or(ErrorBody {
            error: false,
            message: None,
        });

        if !status.is_success() || error_body.error {
            let message = error_body
                .message
                .unwrap_or_else(|| "Something went wrong".to_string());
            tracing::warn!("Backend rejected request ({}): {}", status, message);
            return Err(ConsoleError::from_backend_message(message));
        }

        Ok(Some(value))
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let value = self
            .execute_value(builder)
            .await?
            .ok_or_else(|| ConsoleError::Decode("empty or non-JSON response body".to_string()))?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl BackendApi for HttpBackendApi {
    async fn fetch_dispute(&self, dispute_id: &str) -> Result<Dispute> {
        tracing::info!("Fetching dispute {}", dispute_id);

        let url = format!("{}/api/admin/get-dispute/{}", self.base_url, dispute_id);
        let response: DisputeResponse = self.execute(self.client.get(&url)).await?;

        tracing::debug!(
            "Fetched dispute {} ({}), {} chat messages",
            response.dispute.id,
            response.dispute.status,
            response.dispute.chat().map(|c| c.messages.len()).unwrap_or(0)
        );

        Ok(response.dispute)
    }

    async fn resolve_dispute(&self, dispute_id: &str, winner: Party) -> Result<Option<DisputeStatus>> {
        tracing::info!("Resolving dispute {} in favour of {}", dispute_id, winner.winner());

        let url = format!("{}/api/admin/resolve-dispute/{}", self.base_url, dispute_id);
        let body = self
            .execute_value(self.client.post(&url).json(&ResolveDisputeRequest { winner }))
            .await?;

        // A 2xx means the escrow moved, even when the body can't be read
        let Some(body) = body else {
            tracing::warn!("Dispute {} resolve acknowledged without a JSON body", dispute_id);
            return Ok(None);
        };
        match serde_json::from_value::<ResolveDisputeResponse>(body) {
            Ok(response) => Ok(response.new_status()),
            Err(e) => {
                tracing::warn!("Dispute {} resolve acknowledged with unreadable body: {}", dispute_id, e);
                Ok(None)
            }
        }
    }

    async fn send_chat(&self, chat_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/api/admin/send-chat", self.base_url);
        let response: SendChatResponse = self
            .execute(self.client.post(&url).json(&SendChatRequest { chat_id, content }))
            .await?;

        tracing::debug!("Sent chat message to {} (success={})", chat_id, response.success);
        Ok(())
    }
}

/// Scripted in-memory backend for unit tests
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    pub(crate) struct FakeBackend {
        pub dispute: Mutex<Option<Dispute>>,
        /// `Err` text becomes a backend rejection
        pub resolve_result: Mutex<std::result::Result<Option<DisputeStatus>, String>>,
        pub send_result: Mutex<std::result::Result<(), String>>,
        pub sent: Mutex<Vec<(String, String)>>,
        pub resolved: Mutex<Vec<(String, Party)>>,
        pub fetches: AtomicUsize,
        /// When set, `send_chat` waits for a notification before answering
        pub send_gate: Option<std::sync::Arc<Notify>>,
        /// Same for `resolve_dispute`
        pub resolve_gate: Option<std::sync::Arc<Notify>>,
    }

    impl FakeBackend {
        pub fn new(dispute: Option<Dispute>) -> Self {
            Self {
                dispute: Mutex::new(dispute),
                resolve_result: Mutex::new(Ok(None)),
                send_result: Mutex::new(Ok(())),
                sent: Mutex::new(Vec::new()),
                resolved: Mutex::new(Vec::new()),
                fetches: AtomicUsize::new(0),
                send_gate: None,
                resolve_gate: None,
            }
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackendApi for FakeBackend {
        async fn fetch_dispute(&self, dispute_id: &str) -> Result<Dispute> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.dispute
                .lock()
                .clone()
                .filter(|d| d.id == dispute_id)
                .ok_or_else(|| ConsoleError::Rejected("Dispute not found".to_string()))
        }

        async fn resolve_dispute(&self, dispute_id: &str, winner: Party) -> Result<Option<DisputeStatus>> {
            self.resolved.lock().push((dispute_id.to_string(), winner));
            if let Some(gate) = &self.resolve_gate {
                gate.notified().await;
            }
            let result = self.resolve_result.lock().clone();
            let status = result.map_err(ConsoleError::Rejected)?;
            if let Some(dispute) = self.dispute.lock().as_mut() {
                dispute.status = status.unwrap_or(winner.awarded_status());
            }
            Ok(status)
        }

        async fn send_chat(&self, chat_id: &str, content: &str) -> Result<()> {
            if let Some(gate) = &self.send_gate {
                gate.notified().await;
            }
            self.sent.lock().push((chat_id.to_string(), content.to_string()));
            self.send_result.lock().clone().map_err(ConsoleError::Rejected)
        }
    }
}
