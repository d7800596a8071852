//! Wiring: backend, classifier, dispatcher and channels

use crate::config::AppConfig;
use anyhow::{Context, Result};
use empathy_core::{
    Classifier, Conversation, Dispatcher, EmojiAdapter, FileTokenStore, TokenStore,
};
use empathy_llm::{ChatSession, GeminiProvider, GenerationBackend};
use empathy_me::{AvatarAdapter, AvatarBridge, InboundMessage, SessionBroker};
use empathy_spk::SpeechAdapter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// User-tone threshold for console front-ends when none is configured
pub const CONSOLE_USER_TONE: f64 = 0.35;

/// User-tone threshold for browser front-ends when none is configured
pub const WEB_USER_TONE: f64 = 0.2;

/// Start a Gemini-backed chat session. Fails when no model is usable.
pub async fn start_session(config: &AppConfig) -> Result<ChatSession> {
    let provider = GeminiProvider::from_config(&config.llm).context("Gemini provider unavailable")?;
    let backend: Arc<dyn GenerationBackend> = Arc::new(provider);
    let session = ChatSession::start(backend, config.llm.clone())
        .await
        .context("no usable Gemini model")?;
    info!("Chatting with {}", session.model());
    Ok(session)
}

pub fn classifier(config: &AppConfig) -> Result<Arc<Classifier>> {
    Ok(Arc::new(Classifier::new(config.classifier.clone())?))
}

/// Build a dispatcher, using `default_user_tone` when the config leaves it unset
pub fn dispatcher(
    conversation: Box<dyn Conversation>,
    config: &AppConfig,
    default_user_tone: f64,
) -> Result<Dispatcher> {
    let mut dispatcher_config = config.dispatcher.clone();
    if dispatcher_config.user_tone_threshold.is_none() {
        dispatcher_config.user_tone_threshold = Some(default_user_tone);
    }
    Ok(Dispatcher::new(conversation, classifier(config)?, dispatcher_config)?)
}

/// Register the emoji channel, returning the stream of decorated replies
pub fn attach_emoji(dispatcher: &Dispatcher, config: &AppConfig) -> mpsc::UnboundedReceiver<String> {
    let (adapter, rx) = EmojiAdapter::channel(&config.emoji);
    dispatcher.register("emoji", Arc::new(adapter));
    rx
}

/// Register speech. Without a synthesizer the channel stays registered and reports failures.
pub fn attach_speech(dispatcher: &Dispatcher, config: &AppConfig, background: bool) -> Result<()> {
    let mut speech = config.speech.clone();
    speech.enabled = true;
    speech.background = background;
    let adapter = SpeechAdapter::new(speech)?;
    if !adapter.is_available() {
        warn!("Speech unavailable, replies will not be spoken");
    }
    dispatcher.register("speech", Arc::new(adapter));
    Ok(())
}

/// Connect to VTube Studio in the background and register the hotkey channel
pub async fn attach_vtube_studio(dispatcher: &Dispatcher, config: &AppConfig) -> Result<Arc<SessionBroker>> {
    let path = config.token_store_path();
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&path));
    info!("VTube Studio tokens stored in {}", path.display());

    let broker = Arc::new(SessionBroker::new(config.avatar.vts.clone(), store)?);

    let mut tokens = broker.subscribe_tokens();
    tokio::spawn(async move {
        while let Ok(token) = tokens.recv().await {
            println!("VTube Studio issued a new token (saved): {}", token);
        }
    });

    broker.start();
    if let Err(e) = broker.wait_until_authenticated(config.avatar.vts.token_timeout()).await {
        warn!("VTube Studio not connected yet ({}), expressions resume once it is", e);
    }

    let adapter = AvatarAdapter::hotkeys(Arc::clone(&broker), config.avatar.vts.hotkeys.clone());
    dispatcher.register("avatar", Arc::new(adapter));
    Ok(broker)
}

/// Register the browser channels on a new bridge.
///
/// The emoji page gets the configured emoji with every payload. The avatar
/// page also speaks each reply.
pub fn attach_web(
    dispatcher: &Dispatcher,
    config: &AppConfig,
    emoji_page: bool,
) -> Result<(AvatarBridge, mpsc::Receiver<InboundMessage>)> {
    let (bridge, inbound) = AvatarBridge::new(config.avatar.bridge.clone())?;
    let mut adapter = AvatarAdapter::broadcast(bridge.clone());
    if emoji_page {
        adapter = adapter.with_emoji(config.emoji.mapping.clone());
    } else {
        attach_speech(dispatcher, config, false)?;
    }
    dispatcher.register("avatar", Arc::new(adapter));
    Ok((bridge, inbound))
}

/// Close every channel, each within the channel timeout
pub async fn close_channels(dispatcher: &Dispatcher) {
    for id in dispatcher.channel_ids() {
        dispatcher.unregister(&id).await;
    }
}
