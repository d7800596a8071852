//! Speech synthesizer: engine selection, serialization and playback

use crate::config::{SpeechConfig, TtsEngine as EngineKind};
use crate::engines::azure::AzureTtsEngine;
use crate::engines::native::NativeTtsEngine;
use crate::engines::{SpeechOutput, TtsEngine};
use crate::error::SpeechError;
use crate::player::AudioPlayer;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info};

/// Speaks one utterance at a time through the configured engine
pub struct SpeechSynthesizer {
    config: Arc<SpeechConfig>,
    engine: Arc<dyn TtsEngine>,
    player: AudioPlayer,
    // One permit: utterances never overlap
    speaking: Semaphore,
}

impl SpeechSynthesizer {
    /// Create a new speech synthesizer
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;

        if !config.enabled {
            return Err(SpeechError::Config("Speech synthesis is disabled".to_string()));
        }

        let engine: Arc<dyn TtsEngine> = match config.engine {
            EngineKind::Native => {
                let engine = NativeTtsEngine::new_with_config(config.rate, config.volume, config.pitch);
                if !engine.is_available() {
                    return Err(SpeechError::Engine("Native TTS engine not available".to_string()));
                }
                Arc::new(engine)
            }
            EngineKind::Azure => {
                let engine = AzureTtsEngine::new(&config.azure)?;
                if !engine.is_available() {
                    return Err(SpeechError::Config(
                        "Azure TTS not available (AZURE_SPEECH_KEY missing)".to_string(),
                    ));
                }
                Arc::new(engine)
            }
        };

        Ok(Self::with_engine(config, engine))
    }

    /// Build around an existing engine
    pub fn with_engine(config: SpeechConfig, engine: Arc<dyn TtsEngine>) -> Self {
        info!("Speech synthesizer using {} engine", engine.name());
        let player = AudioPlayer::new(&config.player);
        Self {
            config: Arc::new(config),
            engine,
            player,
            speaking: Semaphore::new(1),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Speak `text`, waiting for any utterance already in progress.
    ///
    /// Synthesis and playback together are bounded by the configured timeout.
    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let _permit = self
            .speaking
            .acquire()
            .await
            .map_err(|e| SpeechError::Synthesizer(format!("Failed to acquire speech slot: {}", e)))?;

        let limit = self.config.timeout();
        timeout(limit, self.speak_now(text))
            .await
            .map_err(|_| SpeechError::Timeout(limit))?
    }

    async fn speak_now(&self, text: &str) -> Result<(), SpeechError> {
        match self.engine.synthesize(text, &self.config.voice).await? {
            SpeechOutput::Spoken => Ok(()),
            SpeechOutput::Audio(audio) => {
                debug!("Handing {} bytes to {}", audio.len(), self.player.command());
                self.player.play(&audio).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Slow {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl TtsEngine for Slow {
        async fn synthesize(&self, _text: &str, _voice: &VoiceConfig) -> Result<SpeechOutput, SpeechError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(SpeechOutput::Spoken)
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_disabled_config_rejected() {
        let result = SpeechSynthesizer::new(SpeechConfig::default());
        assert!(matches!(result, Err(SpeechError::Config(_))));
    }

    #[test]
    fn test_azure_without_key_rejected() {
        let config = SpeechConfig {
            enabled: true,
            engine: EngineKind::Azure,
            ..SpeechConfig::default()
        };
        assert!(matches!(SpeechSynthesizer::new(config), Err(SpeechError::Config(_))));
    }

    #[tokio::test]
    async fn test_utterances_never_overlap() {
        let engine = Arc::new(Slow {
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        });
        let synth = Arc::new(SpeechSynthesizer::with_engine(SpeechConfig::default(), engine.clone()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let synth = synth.clone();
            handles.push(tokio::spawn(async move { synth.speak(&format!("line {}", i)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
    }
}
