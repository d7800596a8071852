//! Speech output channel

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::synthesizer::SpeechSynthesizer;
use async_trait::async_trait;
use empathy_core::{ChannelAdapter, ChannelError, EmotionTag};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Channel speaking each reply aloud.
///
/// Without a usable synthesizer the adapter still registers, but every
/// delivery reports `ChannelError::Unavailable`.
pub struct SpeechAdapter {
    synthesizer: Option<Arc<SpeechSynthesizer>>,
    background: bool,
    shutdown_timeout: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SpeechAdapter {
    /// Create a new speech adapter
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        let background = config.background;
        let shutdown_timeout = config.shutdown_timeout();

        let synthesizer = if config.enabled {
            match SpeechSynthesizer::new(config) {
                Ok(synth) => {
                    info!("Speech synthesizer initialized");
                    Some(Arc::new(synth))
                }
                Err(e) => {
                    warn!("Speech running degraded: {}", e);
                    None
                }
            }
        } else {
            info!("Speech synthesis disabled in config");
            None
        };

        Ok(Self {
            synthesizer,
            background,
            shutdown_timeout,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Wrap an already-built synthesizer
    pub fn with_synthesizer(synthesizer: Arc<SpeechSynthesizer>, background: bool, shutdown_timeout: Duration) -> Self {
        Self {
            synthesizer: Some(synthesizer),
            background,
            shutdown_timeout,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Number of background utterances still running
    pub fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    /// Abandon background speech, waiting at most the shutdown timeout
    pub async fn stop(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        if handles.is_empty() {
            return;
        }
        debug!("Stopping {} background utterances", handles.len());
        for handle in &handles {
            handle.abort();
        }
        let drain = join_all_handles(handles);
        if tokio::time::timeout(self.shutdown_timeout, drain).await.is_err() {
            warn!("Background speech did not stop within {:?}", self.shutdown_timeout);
        }
        info!("Speech adapter stopped");
    }
}

async fn join_all_handles(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

#[async_trait]
impl ChannelAdapter for SpeechAdapter {
    fn name(&self) -> &str {
        "speech"
    }

    async fn handle(&self, _tag: EmotionTag, text: &str) -> Result<(), ChannelError> {
        let synth = self
            .synthesizer
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ChannelError::Unavailable("speech synthesizer not available".to_string()))?;

        if !self.background {
            return synth.speak(text).await.map_err(ChannelError::from);
        }

        let text = text.to_string();
        let handle = tokio::spawn(async move {
            if let Err(e) = synth.speak(&text).await {
                error!("Background speech failed: {}", e);
            }
        });
        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
        Ok(())
    }

    async fn close(&self) {
        self.stop().await;
    }
}
