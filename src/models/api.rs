//! Request and response bodies for the admin REST API.
//!
//! Successful responses carry `success: true`; failures carry
//! `error: true` and a human-readable `message`.

use serde::{Deserialize, Serialize};

use super::dispute::{Dispute, DisputeStatus, Party};

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisputeResponse {
    #[serde(default)]
    pub success: bool,
    pub dispute: Dispute,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveDisputeRequest {
    pub winner: Party,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedDispute {
    #[serde(default)]
    pub id: Option<String>,
    pub status: DisputeStatus,
}

/// The backend returns either the updated dispute or a bare status
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveDisputeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub dispute: Option<ResolvedDispute>,
    #[serde(default)]
    pub status: Option<DisputeStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ResolveDisputeResponse {
    pub fn new_status(&self) -> Option<DisputeStatus> {
        self.dispute.as_ref().map(|d| d.status).or(self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatRequest<'a> {
    pub chat_id: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}
