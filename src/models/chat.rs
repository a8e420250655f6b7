use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    System,
    #[default]
    User,
}

/// Chat message as stored by the backend and pushed over the realtime channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    /// `None` for system-originated messages
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawChatMessage {
    /// Neither text nor attachment; renders as nothing.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty) && self.attachment.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<RawChatMessage>,
}

/// Who a message is attributed to in the dispute transcript.
///
/// `Operator` covers true system messages and anything the admin console sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Operator,
}

impl Role {
    /// SYSTEM always maps to operator; otherwise match the sender against the
    /// trade parties, falling back to operator.
    pub fn resolve(raw: &RawChatMessage, buyer_id: Option<&str>, seller_id: Option<&str>) -> Self {
        if raw.kind == MessageKind::System {
            return Role::Operator;
        }

        let Some(sender) = raw.sender_id.as_deref() else {
            return Role::Operator;
        };

        if buyer_id == Some(sender) {
            Role::Buyer
        } else if seller_id == Some(sender) {
            Role::Seller
        } else {
            Role::Operator
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Buyer => "Buyer",
            Role::Seller => "Seller",
            Role::Operator => "Admin",
        }
    }
}

/// Role-resolved, render-ready message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayMessage {
    pub id: String,
    pub role: Role,
    pub text: Option<String>,
    pub image_url: Option<String>,
    /// Local time of day, `HH:MM:SS`; empty when the backend sent no timestamp
    pub time: String,
}

impl DisplayMessage {
    pub fn from_raw(raw: &RawChatMessage, buyer_id: Option<&str>, seller_id: Option<&str>) -> Self {
        Self {
            id: raw.id.clone(),
            role: Role::resolve(raw, buyer_id, seller_id),
            text: raw.content.clone().filter(|c| !c.is_empty()),
            image_url: raw.attachment.clone(),
            time: raw
                .created_at
                .map(|ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.image_url.is_none()
    }
}

/// Accept RFC 3339 strings; anything missing or unparseable becomes `None`
/// instead of failing the whole message.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| tracing::warn!("Ignoring invalid message timestamp {:?}: {}", s, e))
            .ok()
    }))
}
