//! Azure engine against an in-process HTTP peer

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use empathy_spk::engines::azure::AzureTtsEngine;
use empathy_spk::{AzureConfig, PlayerConfig, RetryConfig, SpeechConfig, SpeechError, SpeechOutput, SpeechSynthesizer, TtsEngineTrait, VoiceConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct Peer {
    calls: Arc<AtomicUsize>,
    fail_first: usize,
    status: StatusCode,
    last_body: Arc<parking_lot::Mutex<String>>,
}

async fn synthesize(State(peer): State<Peer>, headers: HeaderMap, body: String) -> (StatusCode, Bytes) {
    let n = peer.calls.fetch_add(1, Ordering::SeqCst);
    *peer.last_body.lock() = body;
    if headers.get("Ocp-Apim-Subscription-Key").and_then(|v| v.to_str().ok()) != Some("azure-key") {
        return (StatusCode::UNAUTHORIZED, Bytes::new());
    }
    if headers.get("X-Microsoft-OutputFormat").and_then(|v| v.to_str().ok())
        != Some("audio-24khz-160kbitrate-mono-mp3")
    {
        return (StatusCode::BAD_REQUEST, Bytes::new());
    }
    if n < peer.fail_first {
        return (peer.status, Bytes::new());
    }
    (StatusCode::OK, Bytes::from_static(b"ID3fake-mp3"))
}

async fn spawn_peer(peer: Peer) -> String {
    let app = Router::new()
        .route("/cognitiveservices/v1", post(synthesize))
        .with_state(peer);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/cognitiveservices/v1", addr)
}

fn peer(fail_first: usize, status: StatusCode) -> Peer {
    Peer {
        calls: Arc::new(AtomicUsize::new(0)),
        fail_first,
        status,
        last_body: Arc::new(parking_lot::Mutex::new(String::new())),
    }
}

fn azure_config(endpoint: String, key: &str) -> AzureConfig {
    AzureConfig {
        key: Some(key.to_string()),
        endpoint: Some(endpoint),
        retry_config: RetryConfig {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 50,
        },
        ..AzureConfig::default()
    }
}

#[tokio::test]
async fn test_returns_audio_and_sends_ssml() {
    let peer = peer(0, StatusCode::OK);
    let body = peer.last_body.clone();
    let endpoint = spawn_peer(peer).await;
    let engine = AzureTtsEngine::new(&azure_config(endpoint, "azure-key")).unwrap();

    let output = engine.synthesize("you & me", &VoiceConfig::default()).await.unwrap();
    assert_eq!(output, SpeechOutput::Audio(Bytes::from_static(b"ID3fake-mp3")));
    let ssml = body.lock().clone();
    assert!(ssml.contains("en-US-AshleyNeural"));
    assert!(ssml.contains("you &amp; me"));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let peer = peer(2, StatusCode::SERVICE_UNAVAILABLE);
    let calls = peer.calls.clone();
    let endpoint = spawn_peer(peer).await;
    let engine = AzureTtsEngine::new(&azure_config(endpoint, "azure-key")).unwrap();

    assert!(engine.synthesize("hello", &VoiceConfig::default()).await.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_invalid_key_is_not_retried() {
    let peer = peer(0, StatusCode::OK);
    let calls = peer.calls.clone();
    let endpoint = spawn_peer(peer).await;
    let engine = AzureTtsEngine::new(&azure_config(endpoint, "wrong-key")).unwrap();

    let err = engine.synthesize("hello", &VoiceConfig::default()).await.unwrap_err();
    assert!(matches!(err, SpeechError::Api(ref msg) if msg.contains("401")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_synthesizer_plays_returned_audio() {
    let endpoint = spawn_peer(peer(0, StatusCode::OK)).await;
    let config = SpeechConfig {
        enabled: true,
        engine: empathy_spk::TtsEngine::Azure,
        azure: azure_config(endpoint.clone(), "azure-key"),
        player: PlayerConfig {
            command: "true".to_string(),
            args: vec![],
        },
        ..SpeechConfig::default()
    };
    let synth = SpeechSynthesizer::new(config.clone()).unwrap();
    assert_eq!(synth.engine_name(), "azure");
    synth.speak("hello there").await.unwrap();

    let failing = SpeechSynthesizer::new(SpeechConfig {
        player: PlayerConfig {
            command: "false".to_string(),
            args: vec![],
        },
        ..config
    })
    .unwrap();
    assert!(matches!(failing.speak("hello").await, Err(SpeechError::Playback(_))));
}
