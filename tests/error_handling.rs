//! Failures stay inside the component that failed

use async_trait::async_trait;
use empathy_core::{
    ChannelOutcome, Classifier, ClassifierConfig, Conversation, Dispatcher, DispatcherConfig,
    EmojiAdapter, EmojiConfig, Error, MemoryTokenStore, Result, TurnResult,
};
use empathy_llm::{ChatSession, GenerationBackend, LLMConfig, LLMError};
use empathy_me::{AvatarAdapter, SessionBroker, VtsConfig};
use empathy_spk::{SpeechAdapter, SpeechConfig, TtsEngine};
use std::sync::Arc;
use std::time::Duration;

struct Canned(Option<&'static str>);

#[async_trait]
impl Conversation for Canned {
    async fn reply(&mut self, _user_text: &str) -> Result<String> {
        self.0
            .take()
            .map(str::to_string)
            .ok_or_else(|| Error::Generation("backend down".to_string()))
    }
}

fn dispatcher(conversation: Canned) -> Dispatcher {
    let classifier = Arc::new(Classifier::new(ClassifierConfig::default()).unwrap());
    let config = DispatcherConfig {
        reply_timeout_secs: 2,
        channel_timeout_secs: 2,
        user_tone_threshold: None,
    };
    Dispatcher::new(Box::new(conversation), classifier, config).unwrap()
}

#[tokio::test]
async fn test_unavailable_channels_do_not_affect_emoji() {
    let dispatcher = dispatcher(Canned(Some("Glad to help.")));

    let (emoji, mut emoji_rx) = EmojiAdapter::channel(&EmojiConfig::default());
    dispatcher.register("emoji", Arc::new(emoji));

    // Azure without a key: the speech channel registers degraded
    let speech = SpeechAdapter::new(SpeechConfig {
        enabled: true,
        engine: TtsEngine::Azure,
        ..SpeechConfig::default()
    })
    .unwrap();
    assert!(!speech.is_available());
    dispatcher.register("speech", Arc::new(speech));

    // Nothing listens on port 9
    let vts = VtsConfig {
        endpoint: "ws://127.0.0.1:9".to_string(),
        ..VtsConfig::default()
    };
    let hotkeys = vts.hotkeys.clone();
    let broker = Arc::new(SessionBroker::new(vts, Arc::new(MemoryTokenStore::new())).unwrap());
    broker.start();
    dispatcher.register("avatar", Arc::new(AvatarAdapter::hotkeys(broker.clone(), hotkeys)));

    let result = dispatcher.turn("can you help me").await;
    let channels = result.channels().expect("turn should complete");
    assert!(channels["emoji"].is_delivered());
    assert!(matches!(channels["speech"], ChannelOutcome::Failed { .. }));
    assert!(matches!(channels["avatar"], ChannelOutcome::Failed { .. }));
    assert!(emoji_rx.try_recv().unwrap().starts_with("Glad to help."));

    broker.shutdown().await;
}

#[tokio::test]
async fn test_generation_failure_skips_every_channel() {
    let dispatcher = dispatcher(Canned(None));
    let (emoji, mut emoji_rx) = EmojiAdapter::channel(&EmojiConfig::default());
    dispatcher.register("emoji", Arc::new(emoji));

    let result = dispatcher.turn("hello?").await;
    assert!(matches!(result, TurnResult::Failed { ref error } if error.contains("backend down")));
    assert!(emoji_rx.try_recv().is_err());
}

/// Backend that knows no models at all
struct NoModels;

#[async_trait]
impl GenerationBackend for NoModels {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn check_model(&self, model: &str) -> empathy_llm::Result<()> {
        Err(LLMError::ModelNotAvailable(model.to_string()))
    }

    async fn chat(&self, _request: empathy_llm::ChatRequest) -> empathy_llm::Result<empathy_llm::ChatResponse> {
        Err(LLMError::Provider("unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_no_usable_model_is_fatal_at_startup() {
    let err = ChatSession::start(Arc::new(NoModels), LLMConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    let core: Error = err.into();
    assert!(matches!(core, Error::Startup(_)));
}

#[tokio::test]
async fn test_avatar_outage_fails_fast() {
    let dispatcher = dispatcher(Canned(Some("ok")));
    let vts = VtsConfig {
        endpoint: "ws://127.0.0.1:9".to_string(),
        ..VtsConfig::default()
    };
    let hotkeys = vts.hotkeys.clone();
    let broker = Arc::new(SessionBroker::new(vts, Arc::new(MemoryTokenStore::new())).unwrap());
    dispatcher.register("avatar", Arc::new(AvatarAdapter::hotkeys(broker, hotkeys)));

    let started = std::time::Instant::now();
    let result = dispatcher.turn("hi").await;
    assert!(result.is_completed());
    assert!(started.elapsed() < Duration::from_secs(1));
}
