//! Text rendering for the terminal console.

use crate::models::chat::{DisplayMessage, Role};
use crate::models::dispute::Dispute;

pub const NO_DESCRIPTION: &str = "No description";
pub const NO_EVIDENCE: &str = "No evidence provided";

/// Shorten an id to `start` leading and `end` trailing chars.
pub fn format_id(id: &str, start: usize, end: usize) -> String {
    if id.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= start + end {
        return id.to_string();
    }

    let head: String = chars[..start].iter().collect();
    let tail: String = chars[chars.len() - end..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn format_uuid(uuid: &str) -> String {
    format_id(uuid, 8, 6)
}

fn username(user: Option<&crate::models::dispute::UserRef>) -> String {
    user.and_then(|u| u.username.clone())
        .map(|name| format!("@{}", name))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Dispute detail card. `resolvable` controls whether the resolve action is listed.
pub fn render_dispute(dispute: &Dispute, resolvable: bool) -> Vec<String> {
    let mut lines = vec![
        format!("Dispute #{} [{}]", format_id(&dispute.id, 6, 4), dispute.status.label()),
        format!("Opened by: {}", username(dispute.user.as_ref())),
    ];

    if let Some(created_at) = dispute.created_at {
        lines.push(format!("Created: {}", created_at.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    match &dispute.trade {
        Some(trade) => {
            lines.push(format!("Trade: {}", format_id(&trade.id, 6, 4)));
            lines.push(format!("Buyer: {}", username(trade.buyer.as_ref())));
            lines.push(format!("Seller: {}", username(trade.seller.as_ref())));

            let offer = trade.offer.as_ref();
            let currency = offer.and_then(|o| o.currency.as_deref()).unwrap_or("");
            let crypto = offer.and_then(|o| o.crypto.as_deref()).unwrap_or("");
            let fiat = trade.amount_fiat.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
            let amount = trade.amount_crypto.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
            lines.push(format!("Amount: {} {} ({} {})", currency, fiat, amount, crypto).trim().to_string());
        }
        None => lines.push("Trade: unavailable".to_string()),
    }

    lines.push(format!("Reason: {}", dispute.reason));
    lines.push(format!(
        "Description: {}",
        dispute.description.as_deref().filter(|d| !d.is_empty()).unwrap_or(NO_DESCRIPTION)
    ));
    lines.push(format!(
        "Evidence: {}",
        dispute.evidence.as_deref().filter(|e| !e.is_empty()).unwrap_or(NO_EVIDENCE)
    ));

    if resolvable {
        lines.push("Actions: /resolve buyer | /resolve seller".to_string());
    }

    lines
}

/// Chat transcript. The role label is printed only when the sender changes;
/// empty messages print nothing.
pub fn render_transcript(messages: &[DisplayMessage]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut previous: Option<Role> = None;

    for message in messages.iter().filter(|m| !m.is_empty()) {
        if previous != Some(message.role) {
            lines.push(format!("{}:", message.role.label()));
            previous = Some(message.role);
        }

        let time = if message.time.is_empty() {
            String::new()
        } else {
            format!("[{}] ", message.time)
        };

        if let Some(text) = &message.text {
            lines.push(format!("  {}{}", time, text));
        }
        if let Some(url) = &message.image_url {
            lines.push(format!("  {}[image] {}", time, url));
        }
    }

    lines
}
