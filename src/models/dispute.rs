use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::chat::Chat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    ResolvedBuyer,
    ResolvedSeller,
    Cancelled,
}

impl DisputeStatus {
    /// Once terminal, no further resolution is permitted
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DisputeStatus::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "OPEN",
            DisputeStatus::ResolvedBuyer => "RESOLVED_BUYER",
            DisputeStatus::ResolvedSeller => "RESOLVED_SELLER",
            DisputeStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "Open",
            DisputeStatus::ResolvedBuyer => "Awarded Buyer",
            DisputeStatus::ResolvedSeller => "Awarded Seller",
            DisputeStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party receiving the escrowed funds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Party {
    Buyer,
    Seller,
}

impl Party {
    /// Wire value for the `winner` field
    pub fn winner(&self) -> &'static str {
        match self {
            Party::Buyer => "BUYER",
            Party::Seller => "SELLER",
        }
    }

    /// Terminal status reached when this party is awarded
    pub fn awarded_status(&self) -> DisputeStatus {
        match self {
            Party::Buyer => DisputeStatus::ResolvedBuyer,
            Party::Seller => DisputeStatus::ResolvedSeller,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Party::Buyer => "Buyer",
            Party::Seller => "Seller",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(default)]
    pub id: Option<String>,
    /// Fiat currency code, e.g. "NGN"
    #[serde(default)]
    pub currency: Option<String>,
    /// Crypto asset, e.g. "USDT"
    #[serde(default)]
    pub crypto: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    #[serde(default)]
    pub buyer: Option<UserRef>,
    #[serde(default)]
    pub seller: Option<UserRef>,
    #[serde(default)]
    pub buyer_id: Option<String>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub amount_fiat: Option<Decimal>,
    #[serde(default)]
    pub amount_crypto: Option<Decimal>,
    #[serde(default)]
    pub offer: Option<Offer>,
    #[serde(default)]
    pub chat: Option<Chat>,
}

impl Trade {
    pub fn buyer_id(&self) -> Option<&str> {
        self.buyer
            .as_ref()
            .map(|u| u.id.as_str())
            .or(self.buyer_id.as_deref())
    }

    pub fn seller_id(&self) -> Option<&str> {
        self.seller
            .as_ref()
            .map(|u| u.id.as_str())
            .or(self.seller_id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: String,
    pub status: DisputeStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Link to the uploaded proof
    #[serde(default)]
    pub evidence: Option<String>,
    /// User who opened the dispute
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trade: Option<Trade>,
}

impl Dispute {
    pub fn chat(&self) -> Option<&Chat> {
        self.trade.as_ref().and_then(|t| t.chat.as_ref())
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat().map(|c| c.id.as_str())
    }

    pub fn buyer_id(&self) -> Option<&str> {
        self.trade.as_ref().and_then(Trade::buyer_id)
    }

    pub fn seller_id(&self) -> Option<&str> {
        self.trade.as_ref().and_then(Trade::seller_id)
    }
}
