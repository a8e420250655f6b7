//! Realtime chat channel
//!
//! One Socket.IO websocket per open dispute chat. `attach` connects and joins
//! the chat room, `on_message` registers callbacks for `new_message` pushes,
//! and `detach` closes the connection. No callback runs after `detach`
//! returns.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::models::chat::RawChatMessage;
use crate::services::socket_io::{self, Frame};

pub const JOIN_EVENT: &str = "join_chat";
pub const NEW_MESSAGE_EVENT: &str = "new_message";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

type MessageCallback = Box<dyn Fn(&RawChatMessage) + Send + Sync>;

#[derive(Clone)]
pub struct RealtimeConfig {
    /// Server base, `http(s)://` or `ws(s)://`
    pub url: String,
    /// Connect + Socket.IO handshake budget
    pub connect_timeout: Duration,
}

impl RealtimeConfig {
    pub fn from_console(config: &ConsoleConfig) -> Self {
        Self {
            url: config.realtime_url.clone(),
            connect_timeout: config.request_timeout,
        }
    }

    /// Websocket endpoint for the Engine.IO v4 transport
    pub fn endpoint(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };

        if base.contains("/socket.io") {
            base
        } else {
            format!("{}/socket.io/?EIO=4&transport=websocket", base)
        }
    }
}

#[derive(Clone)]
pub struct RealtimeChannel {
    config: RealtimeConfig,
}

/// Callbacks plus pushes that arrived before the first callback was registered
#[derive(Default)]
struct Listeners {
    callbacks: Vec<MessageCallback>,
    pending: Vec<RawChatMessage>,
    detached: bool,
}

impl Listeners {
    fn dispatch(&mut self, message: RawChatMessage) {
        if self.detached {
            return;
        }
        if self.callbacks.is_empty() {
            self.pending.push(message);
            return;
        }
        for callback in &self.callbacks {
            callback(&message);
        }
    }
}

impl RealtimeChannel {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    /// Connect, complete the namespace handshake and join `chat_id`'s room.
    /// With no chat id the connection is opened but no room is joined.
    pub async fn attach(&self, chat_id: Option<&str>) -> Result<ChannelHandle> {
        let endpoint = self.config.endpoint();
        info!("Realtime: Connecting to {}", endpoint);

        let (mut write, read) =
            tokio::time::timeout(self.config.connect_timeout, handshake(&endpoint))
                .await
                .map_err(|_| ConsoleError::Realtime("connect timed out".to_string()))??;

        match chat_id {
            Some(chat_id) => {
                let join = socket_io::encode_event(JOIN_EVENT, &[Value::String(chat_id.to_string())])?;
                write.send(Message::Text(join)).await?;
                info!("Realtime: Joined chat {}", chat_id);
            }
            None => warn!("Realtime: No chat id yet, connection opened without joining a room"),
        }

        let listeners = Arc::new(Mutex::new(Listeners::default()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let label = chat_id.unwrap_or("-").to_string();
        let task = tokio::spawn(run_reader(label, write, read, listeners.clone(), shutdown_rx));

        Ok(ChannelHandle {
            chat_id: chat_id.map(str::to_string),
            listeners,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }
}

impl Default for RealtimeChannel {
    fn default() -> Self {
        Self::new(RealtimeConfig {
            url: crate::config::DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
        })
    }
}

/// Owned connection for one chat session. Dropping it without `detach`
/// still tears the connection down.
pub struct ChannelHandle {
    chat_id: Option<String>,
    listeners: Arc<Mutex<Listeners>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    /// Invoke `callback` for every `new_message` push, including any that
    /// arrived before registration. Callbacks run on the reader task and must
    /// not block or register further callbacks.
    pub fn on_message<F>(&self, callback: F)
    where
        F: Fn(&RawChatMessage) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        if listeners.detached {
            return;
        }
        for message in std::mem::take(&mut listeners.pending) {
            callback(&message);
        }
        listeners.callbacks.push(Box::new(callback));
    }

    pub fn is_connected(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Close the connection. Consumes the handle so it runs once.
    pub async fn detach(mut self) {
        self.mark_detached();

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                warn!("Realtime: Reader did not stop in time, aborting it");
                abort.abort();
            }
        }

        info!("Realtime: Detached from chat {}", self.chat_id.as_deref().unwrap_or("-"));
    }

    fn mark_detached(&self) {
        let mut listeners = self.listeners.lock();
        listeners.detached = true;
        listeners.callbacks.clear();
        listeners.pending.clear();
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.mark_detached();
            task.abort();
            debug!("Realtime: Handle dropped without detach, connection aborted");
        }
    }
}

/// Engine open → namespace connect → connect ack
async fn handshake(endpoint: &str) -> Result<(WsWrite, WsRead)> {
    let (ws_stream, _) = connect_async(endpoint).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut sent_connect = false;
    loop {
        let Some(frame) = next_frame(&mut read).await? else {
            return Err(ConsoleError::Realtime("connection closed during handshake".to_string()));
        };

        match frame {
            Frame::Open(info) if !sent_connect => {
                debug!("Realtime: Engine session {} (ping every {}ms)", info.sid, info.ping_interval);
                write.send(Message::Text(socket_io::encode_connect())).await?;
                sent_connect = true;
            }
            Frame::Ping(payload) => {
                write.send(Message::Text(socket_io::encode_pong(&payload))).await?;
            }
            Frame::Connect if sent_connect => {
                info!("Realtime: Connected");
                return Ok((write, read));
            }
            Frame::ConnectError(message) => {
                error!("Realtime: Server refused connection: {}", message);
                return Err(ConsoleError::Realtime(message));
            }
            Frame::Close | Frame::Disconnect => {
                return Err(ConsoleError::Realtime("server closed during handshake".to_string()));
            }
            other => trace!("Realtime: Skipping {:?} during handshake", other),
        }
    }
}

/// Next decodable text frame; `None` when the stream ends or closes.
async fn next_frame(read: &mut WsRead) -> Result<Option<Frame>> {
    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => match socket_io::decode(&text) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => warn!("Realtime: Undecodable frame {:?}: {}", text, e),
            },
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}

async fn run_reader(
    chat_label: String,
    mut write: WsWrite,
    mut read: WsRead,
    listeners: Arc<Mutex<Listeners>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                let _ = write.send(Message::Close(None)).await;
                debug!("Realtime: Chat {} reader shutting down", chat_label);
                break;
            }

            frame = next_frame(&mut read) => {
                match frame {
                    Ok(Some(Frame::Ping(payload))) => {
                        if let Err(e) = write.send(Message::Text(socket_io::encode_pong(&payload))).await {
                            error!("Realtime: Chat {} failed to answer ping: {}", chat_label, e);
                            break;
                        }
                        trace!("Realtime: Chat {} answered ping", chat_label);
                    }
                    Ok(Some(Frame::Event { name, args })) if name == NEW_MESSAGE_EVENT => {
                        let Some(payload) = args.into_iter().next() else {
                            warn!("Realtime: Chat {} got {} without payload", chat_label, NEW_MESSAGE_EVENT);
                            continue;
                        };
                        match serde_json::from_value::<RawChatMessage>(payload) {
                            Ok(message) => {
                                debug!("Realtime: Chat {} received message {}", chat_label, message.id);
                                listeners.lock().dispatch(message);
                            }
                            Err(e) => warn!("Realtime: Chat {} skipping malformed message: {}", chat_label, e),
                        }
                    }
                    Ok(Some(Frame::Close)) | Ok(Some(Frame::Disconnect)) | Ok(None) => {
                        info!("Realtime: Chat {} connection closed by server", chat_label);
                        break;
                    }
                    Ok(Some(other)) => trace!("Realtime: Chat {} ignoring {:?}", chat_label, other),
                    Err(e) => {
                        error!("Realtime: Chat {} websocket error: {}", chat_label, e);
                        break;
                    }
                }
            }
        }
    }
}
