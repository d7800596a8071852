//! Persistent, authenticated VTube Studio link
//!
//! The broker owns one WebSocket to the avatar host. A background supervisor
//! re-establishes it with exponential backoff whenever it drops; callers that
//! arrive during an outage fail immediately with [`AvatarError::Disconnected`]
//! instead of waiting for the link to come back.

use crate::config::VtsConfig;
use crate::error::AvatarError;
use crate::vts::{self, Response};
use empathy_core::TokenStore;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Link state, published on a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingAuth,
    Authenticated,
}

/// What a trigger call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Triggered,
    /// The expression was already showing
    AlreadyActive,
}

pub struct SessionBroker {
    inner: Arc<Inner>,
    supervisor: SyncMutex<Option<JoinHandle<()>>>,
}

struct Inner {
    config: VtsConfig,
    store: Arc<dyn TokenStore>,
    link: Mutex<Option<Link>>,
    state_tx: watch::Sender<ConnectionState>,
    token_tx: broadcast::Sender<String>,
    dropped: Notify,
    closed: AtomicBool,
}

struct Link {
    ws: WsStream,
    /// Hotkey name to hotkeyID
    hotkeys: HashMap<String, String>,
    /// Name of the expression currently toggled on
    active: Option<String>,
}

impl SessionBroker {
    /// Create a broker. A configured `auth_token` seeds an empty store.
    pub fn new(config: VtsConfig, store: Arc<dyn TokenStore>) -> Result<Self, AvatarError> {
        config.validate().map_err(AvatarError::Config)?;

        if let Some(token) = config.auth_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            if store.get(&config.token_key)?.is_none() {
                store.put(&config.token_key, token)?;
                debug!("Seeded token store from configuration");
            }
        }

        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (token_tx, _) = broadcast::channel(4);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                link: Mutex::new(None),
                state_tx,
                token_tx,
                dropped: Notify::new(),
                closed: AtomicBool::new(false),
            }),
            supervisor: SyncMutex::new(None),
        })
    }

    /// Connect and authenticate once, without retrying
    pub async fn connect(&self) -> Result<(), AvatarError> {
        self.inner.connect_once().await
    }

    /// Start the background supervisor that keeps the link up
    pub fn start(&self) {
        let mut supervisor = self.supervisor.lock();
        if supervisor.is_some() || self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        *supervisor = Some(tokio::spawn(supervise(inner)));
        debug!("VTube Studio supervisor started");
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Tokens issued by the host after operator approval
    pub fn subscribe_tokens(&self) -> broadcast::Receiver<String> {
        self.inner.token_tx.subscribe()
    }

    /// Wait until the link is authenticated
    pub async fn wait_until_authenticated(&self, limit: Duration) -> Result<(), AvatarError> {
        let mut rx = self.subscribe_state();
        timeout(limit, rx.wait_for(|state| *state == ConnectionState::Authenticated))
            .await
            .map_err(|_| AvatarError::Timeout(limit))?
            .map_err(|_| AvatarError::Broker("broker dropped".to_string()))?;
        Ok(())
    }

    /// Names of the expression hotkeys known for the current model
    pub async fn hotkeys(&self) -> Vec<String> {
        let guard = self.inner.link.lock().await;
        let mut names: Vec<String> = guard
            .as_ref()
            .map(|link| link.hotkeys.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Show the expression bound to `hotkey`.
    ///
    /// `label` names the request (`trigger_<label>`). The expression shown
    /// before is toggled off first; asking for the one already showing is a
    /// no-op.
    pub async fn trigger(&self, hotkey: &str, label: &str) -> Result<TriggerOutcome, AvatarError> {
        if self.state() != ConnectionState::Authenticated {
            return Err(AvatarError::Disconnected);
        }

        let mut guard = self.inner.link.lock().await;
        let link = guard.as_mut().ok_or(AvatarError::Disconnected)?;
        let result = link.trigger(hotkey, label, self.inner.config.request_timeout()).await;

        if let Err(e) = &result {
            if breaks_link(e) {
                *guard = None;
                drop(guard);
                self.inner.link_lost(e);
            }
        }
        result
    }

    /// Close the link and stop reconnecting. Terminal.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.supervisor.lock().take() {
            handle.abort();
        }

        let limit = self.inner.config.shutdown_timeout();
        match timeout(limit, self.inner.link.lock()).await {
            Ok(mut guard) => {
                if let Some(mut link) = guard.take() {
                    match timeout(limit, link.ws.close(None)).await {
                        Ok(Ok(())) => debug!("VTube Studio link closed"),
                        Ok(Err(e)) => debug!("VTube Studio close error: {}", e),
                        Err(_) => warn!("VTube Studio close timed out after {:?}", limit),
                    }
                }
            }
            Err(_) => warn!("VTube Studio link busy at shutdown, abandoning it"),
        }

        self.inner.state_tx.send_replace(ConnectionState::Disconnected);
        info!("VTube Studio broker shut down");
    }
}

impl Drop for SessionBroker {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.get_mut().take() {
            handle.abort();
        }
    }
}

async fn supervise(inner: Arc<Inner>) {
    let backoff = inner.config.backoff.clone();
    let mut delay = backoff.initial();

    loop {
        if inner.closed.load(Ordering::SeqCst) {
            return;
        }

        if inner.link.lock().await.is_some() {
            inner.dropped.notified().await;
            continue;
        }

        match inner.connect_once().await {
            Ok(()) => delay = backoff.initial(),
            Err(e) => {
                warn!("VTube Studio connection failed: {}, retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                delay = backoff.next_delay(delay);
            }
        }
    }
}

fn breaks_link(err: &AvatarError) -> bool {
    err.is_transport() || matches!(err, AvatarError::Timeout(_))
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("VTube Studio link {:?} -> {:?}", previous, state);
        }
    }

    fn link_lost(&self, err: &AvatarError) {
        warn!("VTube Studio link lost: {}", err);
        self.set_state(ConnectionState::Disconnected);
        self.dropped.notify_one();
    }

    async fn connect_once(&self) -> Result<(), AvatarError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AvatarError::Broker("broker is shut down".to_string()));
        }

        let link = match self.establish().await {
            Ok(link) => link,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let mut guard = self.link.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(AvatarError::Broker("broker is shut down".to_string()));
        }
        *guard = Some(link);
        self.set_state(ConnectionState::Authenticated);
        info!("Authenticated with VTube Studio at {}", self.config.endpoint);
        Ok(())
    }

    async fn establish(&self) -> Result<Link, AvatarError> {
        let limit = self.config.request_timeout();
        self.set_state(ConnectionState::Connecting);
        debug!("Connecting to VTube Studio at {}", self.config.endpoint);

        let (ws, _) = timeout(limit, connect_async(self.config.endpoint.as_str()))
            .await
            .map_err(|_| AvatarError::Network(format!("connection to {} timed out", self.config.endpoint)))?
            .map_err(|e| AvatarError::Network(format!("failed to connect to {}: {}", self.config.endpoint, e)))?;

        let mut link = Link {
            ws,
            hotkeys: HashMap::new(),
            active: None,
        };

        self.set_state(ConnectionState::AwaitingAuth);
        self.authenticate(&mut link).await?;
        link.refresh_hotkeys(limit).await?;
        info!("Loaded {} expression hotkeys", link.hotkeys.len());
        Ok(link)
    }

    async fn authenticate(&self, link: &mut Link) -> Result<(), AvatarError> {
        if let Some(token) = self.store.get(&self.config.token_key)? {
            match self.send_token(link, &token).await {
                Ok(true) => return Ok(()),
                Ok(false) | Err(AvatarError::Protocol(_)) => {
                    warn!("Stored VTube Studio token was rejected, requesting a new one");
                }
                Err(e) => return Err(e),
            }
        }

        let token = self.request_token(link).await?;
        if self.send_token(link, &token).await? {
            Ok(())
        } else {
            Err(AvatarError::Authentication(
                "VTube Studio rejected a freshly issued token".to_string(),
            ))
        }
    }

    async fn send_token(&self, link: &mut Link, token: &str) -> Result<bool, AvatarError> {
        let frame = vts::auth_request(&self.config.plugin_name, &self.config.plugin_developer, token);
        let response = link
            .request(&frame, vts::AUTH_REQUEST_ID, self.config.request_timeout())
            .await?
            .into_result()?;
        Ok(response.data["authenticated"].as_bool().unwrap_or(false))
    }

    /// Ask the host for a token; the operator approves the plugin in its UI
    async fn request_token(&self, link: &mut Link) -> Result<String, AvatarError> {
        info!("Requesting a VTube Studio token, approve the plugin in VTube Studio");
        let frame = vts::token_request(&self.config.plugin_name, &self.config.plugin_developer);
        let response = link
            .request(&frame, vts::TOKEN_REQUEST_ID, self.config.token_timeout())
            .await?
            .into_result()
            .map_err(|e| AvatarError::Authentication(e.to_string()))?;

        let token = response.data["authenticationToken"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AvatarError::Authentication("no token in response".to_string()))?
            .to_string();

        self.store.put(&self.config.token_key, &token)?;
        let _ = self.token_tx.send(token.clone());
        info!("New VTube Studio token issued and stored: {}", token);
        Ok(token)
    }
}

impl Link {
    /// Send `frame` and wait for the response carrying `request_id`
    async fn request(&mut self, frame: &Value, request_id: &str, limit: Duration) -> Result<Response, AvatarError> {
        let text = serde_json::to_string(frame)?;
        timeout(limit, self.exchange(text, request_id))
            .await
            .map_err(|_| AvatarError::Timeout(limit))?
    }

    async fn exchange(&mut self, text: String, request_id: &str) -> Result<Response, AvatarError> {
        self.ws.send(Message::Text(text)).await?;
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(reply))) => match Response::parse(&reply) {
                    Ok(response) if response.request_id.as_deref() == Some(request_id) => {
                        return Ok(response);
                    }
                    Ok(other) => debug!("Ignoring unrelated {} frame", other.message_type),
                    Err(e) => debug!("Ignoring unreadable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Err(AvatarError::Network("connection closed by VTube Studio".to_string()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Replace the hotkey cache. An error reply keeps the old cache.
    async fn refresh_hotkeys(&mut self, limit: Duration) -> Result<(), AvatarError> {
        let response = self
            .request(&vts::hotkey_list_request(), vts::HOTKEY_LIST_ID, limit)
            .await?;
        if response.is_error() {
            warn!("Hotkey list unavailable: {}", response.error_message());
            return Ok(());
        }
        self.hotkeys = vts::parse_hotkeys(&response.data)
            .into_iter()
            .map(|hotkey| (hotkey.name, hotkey.id))
            .collect();
        Ok(())
    }

    async fn trigger(&mut self, hotkey: &str, label: &str, limit: Duration) -> Result<TriggerOutcome, AvatarError> {
        if self.active.as_deref() == Some(hotkey) {
            debug!("Expression '{}' already active", hotkey);
            return Ok(TriggerOutcome::AlreadyActive);
        }

        let id = match self.hotkeys.get(hotkey) {
            Some(id) => id.clone(),
            None => {
                self.refresh_hotkeys(limit).await?;
                self.hotkeys
                    .get(hotkey)
                    .cloned()
                    .ok_or_else(|| AvatarError::HotkeyNotFound(hotkey.to_string()))?
            }
        };

        // The previous expression stays recorded until VTube Studio confirms it is off
        if let Some(previous) = self.active.clone() {
            if let Some(previous_id) = self.hotkeys.get(&previous).cloned() {
                let request_id = vts::trigger_request_id(&previous);
                self.request(&vts::trigger_request(&request_id, &previous_id), &request_id, limit)
                    .await?
                    .into_result()?;
                debug!("Toggled off '{}'", previous);
            }
            self.active = None;
        }

        let request_id = vts::trigger_request_id(label);
        self.request(&vts::trigger_request(&request_id, &id), &request_id, limit)
            .await?
            .into_result()?;
        self.active = Some(hotkey.to_string());
        debug!("Toggled on '{}'", hotkey);
        Ok(TriggerOutcome::Triggered)
    }
}
