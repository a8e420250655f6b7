//! Socket.IO v4 text framing over an Engine.IO v4 websocket.
//!
//! Only the packets the chat channel needs: engine open/close/ping/pong and
//! socket connect/disconnect/event on the default namespace.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConsoleError, Result};

/// Engine.IO handshake payload sent by the server right after upgrade
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Noop,
    /// Namespace connect acknowledged
    Connect,
    ConnectError(String),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    /// Anything else (acks, binary packets, other namespaces)
    Ignored(String),
}

pub fn encode_connect() -> String {
    "40".to_string()
}

pub fn encode_pong(payload: &str) -> String {
    format!("3{}", payload)
}

pub fn encode_event(name: &str, args: &[Value]) -> Result<String> {
    let mut packet = Vec::with_capacity(args.len() + 1);
    packet.push(Value::String(name.to_string()));
    packet.extend_from_slice(args);
    Ok(format!("42{}", serde_json::to_string(&packet)?))
}

pub fn decode(text: &str) -> Result<Frame> {
    let mut chars = text.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| ConsoleError::Realtime("empty frame".to_string()))?;
    let rest = chars.as_str();

    match engine_type {
        '0' => {
            let info: OpenInfo = serde_json::from_str(rest)?;
            Ok(Frame::Open(info))
        }
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping(rest.to_string())),
        '3' => Ok(Frame::Pong(rest.to_string())),
        '4' => decode_socket_packet(rest),
        '6' => Ok(Frame::Noop),
        _ => Ok(Frame::Ignored(text.to_string())),
    }
}

fn decode_socket_packet(packet: &str) -> Result<Frame> {
    let mut chars = packet.chars();
    let packet_type = chars
        .next()
        .ok_or_else(|| ConsoleError::Realtime("empty socket packet".to_string()))?;
    let mut body = chars.as_str();

    // Non-default namespace: "/admin,..." is not ours
    if body.starts_with('/') {
        return Ok(Frame::Ignored(packet.to_string()));
    }

    // Optional ack id before the payload
    let payload_start = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
    body = &body[payload_start..];

    match packet_type {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => {
            let mut values: Vec<Value> = serde_json::from_str(body)?;
            if values.is_empty() {
                return Err(ConsoleError::Realtime("event without name".to_string()));
            }
            let name = match values.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(ConsoleError::Realtime(format!("invalid event name: {}", other)));
                }
            };
            Ok(Frame::Event { name, args: values })
        }
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| body.to_string());
            Ok(Frame::ConnectError(message))
        }
        _ => Ok(Frame::Ignored(packet.to_string())),
    }
}
