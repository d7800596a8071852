//! WebSocket bridge broadcasting replies to browser avatars

use crate::config::BridgeConfig;
use crate::error::AvatarError;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use empathy_core::EmotionTag;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Payload pushed to every listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarMessage {
    pub emotion: EmotionTag,
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Configured emoji for `emotion`, sent to the emoji page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// A chat line typed into one of the browser front-ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub listener: Uuid,
    pub text: String,
}

/// Shared handle to the listener set. Cheap to clone.
#[derive(Clone)]
pub struct AvatarBridge {
    shared: Arc<Shared>,
}

struct Shared {
    config: BridgeConfig,
    listeners: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
    inbound: mpsc::Sender<InboundMessage>,
}

/// A running listener endpoint
pub struct BridgeServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    bridge: AvatarBridge,
}

impl AvatarBridge {
    /// Create a bridge and the receiver for inbound chat lines
    pub fn new(config: BridgeConfig) -> Result<(Self, mpsc::Receiver<InboundMessage>), AvatarError> {
        config.validate().map_err(AvatarError::Config)?;
        let (inbound, inbound_rx) = mpsc::channel(config.listener_queue);
        let bridge = Self {
            shared: Arc::new(Shared {
                config,
                listeners: RwLock::new(HashMap::new()),
                inbound,
            }),
        };
        Ok((bridge, inbound_rx))
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Send `message` to every listener, returning how many accepted it.
    ///
    /// A listener whose queue is full or closed is removed; the others are
    /// unaffected.
    pub fn broadcast(&self, message: &AvatarMessage) -> Result<usize, AvatarError> {
        let json = serde_json::to_string(message)?;

        let snapshot: Vec<(Uuid, mpsc::Sender<String>)> = self
            .shared
            .listeners
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut failed = Vec::new();
        for (id, tx) in &snapshot {
            if let Err(e) = tx.try_send(json.clone()) {
                warn!("Listener {}: dropping ({})", id, e);
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            let mut listeners = self.shared.listeners.write();
            for id in &failed {
                listeners.remove(id);
            }
        }

        let delivered = snapshot.len() - failed.len();
        debug!("Broadcast {} to {} listener(s)", message.emotion, delivered);
        Ok(delivered)
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/", get(websocket_handler))
            .route("/ws", get(websocket_handler))
            .with_state(self.clone())
    }

    /// Bind the listener endpoint and serve it in the background
    pub async fn serve(&self) -> Result<BridgeServer, AvatarError> {
        let addr = format!("{}:{}", self.shared.config.host, self.shared.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AvatarError::Network(format!("Failed to bind to {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        info!("Avatar bridge listening on ws://{}", local_addr);

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!("Avatar bridge server error: {}", e);
            }
        });

        Ok(BridgeServer {
            addr: local_addr,
            shutdown: Some(shutdown),
            handle,
            bridge: self.clone(),
        })
    }

    pub(crate) fn add_listener(&self, tx: mpsc::Sender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.shared.listeners.write().insert(id, tx);
        id
    }

    fn remove_listener(&self, id: &Uuid) {
        self.shared.listeners.write().remove(id);
    }
}

impl BridgeServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting listeners and drop the connected ones
    pub async fn stop(mut self, limit: Duration) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.bridge.shared.listeners.write().clear();
        if tokio::time::timeout(limit, &mut self.handle).await.is_err() {
            warn!("Avatar bridge did not stop within {:?}, aborting", limit);
            self.handle.abort();
        }
        info!("Avatar bridge stopped");
    }
}

/// `{"text": ..}` or `{"message": ..}`, non-empty after trimming
fn parse_inbound(frame: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(frame).ok()?;
    let text = value
        .get("text")
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())?
        .trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

async fn websocket_handler(ws: WebSocketUpgrade, State(bridge): State<AvatarBridge>) -> Response {
    let limit = bridge.shared.config.max_message_size;
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, bridge))
}

async fn handle_socket(socket: WebSocket, bridge: AvatarBridge) {
    let (tx, mut rx) = mpsc::channel::<String>(bridge.shared.config.listener_queue);
    let listener = bridge.add_listener(tx);
    info!("Listener {} connected", listener);

    let (mut sender, mut receiver) = socket.split();
    let ping_interval = bridge.shared.config.ping_interval();

    let mut send_task = tokio::spawn(async move {
        loop {
            match tokio::time::timeout(ping_interval, rx.recv()).await {
                Ok(Some(json)) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        debug!("Listener {}: send failed", listener);
                        break;
                    }
                }
                Ok(None) => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                Err(_) => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let inbound = bridge.shared.inbound.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => match parse_inbound(&text) {
                    Some(text) => {
                        if inbound.send(InboundMessage { listener, text }).await.is_err() {
                            debug!("Inbound channel closed");
                            break;
                        }
                    }
                    None => debug!("Listener {}: ignoring frame without text", listener),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Listener {}: receive error: {}", listener, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    bridge.remove_listener(&listener);
    info!("Listener {} disconnected", listener);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_parsing() {
        assert_eq!(parse_inbound(r#"{"text":"  hi "}"#).as_deref(), Some("hi"));
        assert_eq!(parse_inbound(r#"{"message":"yo"}"#).as_deref(), Some("yo"));
        assert_eq!(parse_inbound(r#"{"text":"   "}"#), None);
        assert_eq!(parse_inbound("not json"), None);
        assert_eq!(parse_inbound(r#"{"other":"x"}"#), None);
    }

    #[test]
    fn test_message_omits_missing_user() {
        let message = AvatarMessage {
            emotion: EmotionTag::Sad,
            reply: "oh no".to_string(),
            user: None,
            emoji: None,
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"emotion":"sad","reply":"oh no"}"#
        );
    }

    #[tokio::test]
    async fn test_full_listener_is_removed_alone() {
        let config = BridgeConfig {
            listener_queue: 1,
            ..BridgeConfig::default()
        };
        let (bridge, _inbound) = AvatarBridge::new(config).unwrap();
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        bridge.add_listener(slow_tx);
        bridge.add_listener(fast_tx);

        let message = AvatarMessage {
            emotion: EmotionTag::Happy,
            reply: "yay".to_string(),
            user: None,
            emoji: None,
        };
        assert_eq!(bridge.broadcast(&message).unwrap(), 2);
        assert_eq!(bridge.broadcast(&message).unwrap(), 1);
        assert_eq!(bridge.listener_count(), 1);
        assert!(fast_rx.recv().await.is_some());
        assert!(fast_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_closed_listener_is_removed() {
        let (bridge, _inbound) = AvatarBridge::new(BridgeConfig::default()).unwrap();
        let (tx, rx) = mpsc::channel(4);
        bridge.add_listener(tx);
        drop(rx);
        let message = AvatarMessage {
            emotion: EmotionTag::Neutral,
            reply: "ok".to_string(),
            user: Some("hey".to_string()),
            emoji: None,
        };
        assert_eq!(bridge.broadcast(&message).unwrap(), 0);
        assert_eq!(bridge.listener_count(), 0);
    }
}
