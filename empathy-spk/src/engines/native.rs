//! Native platform TTS engine

use crate::config::VoiceConfig;
use crate::engines::{sanitize_text, SpeechOutput, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Command-line synthesizer flavour, which decides the argument syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeProgram {
    /// espeak-ng or espeak
    Espeak(String),
    /// macOS `say`
    Say(String),
}

impl NativeProgram {
    pub fn command(&self) -> &str {
        match self {
            NativeProgram::Espeak(cmd) | NativeProgram::Say(cmd) => cmd,
        }
    }
}

/// Native TTS engine. Speaks directly through the platform synthesizer; the
/// call completes when speech has finished.
pub struct NativeTtsEngine {
    program: Option<NativeProgram>,
    rate: u32,
    volume: f32,
    pitch: f32,
}

impl NativeTtsEngine {
    pub fn new() -> Self {
        Self::new_with_config(175, 0.8, 0.0)
    }

    pub fn new_with_config(rate: u32, volume: f32, pitch: f32) -> Self {
        let program = detect_program();
        match &program {
            Some(p) => info!("Native TTS engine using {}", p.command()),
            None => warn!("No native TTS program found"),
        }
        Self {
            program,
            rate,
            volume,
            pitch,
        }
    }

    /// Use a specific program instead of probing the system
    pub fn with_program(program: NativeProgram, rate: u32, volume: f32, pitch: f32) -> Self {
        Self {
            program: Some(program),
            rate,
            volume,
            pitch,
        }
    }

    pub fn program(&self) -> Option<&NativeProgram> {
        self.program.as_ref()
    }

    /// Arguments passed to the program for `text`
    pub fn build_args(&self, text: &str, voice: &VoiceConfig) -> Vec<String> {
        let mut args = Vec::new();
        match &self.program {
            Some(NativeProgram::Espeak(_)) => {
                args.push("-s".to_string());
                args.push(self.rate.to_string());

                // Volume 0-200, 100 is normal
                let amplitude = ((self.volume * 200.0).round() as u32).min(200);
                args.push("-a".to_string());
                args.push(amplitude.to_string());

                // Pitch 0-99, 50 is normal
                let pitch = ((50.0 + self.pitch * 49.0).round().max(0.0) as u32).min(99);
                args.push("-p".to_string());
                args.push(pitch.to_string());

                let voice_name = voice.name.clone().unwrap_or_else(|| voice.language.to_lowercase());
                args.push("-v".to_string());
                args.push(voice_name);
            }
            Some(NativeProgram::Say(_)) => {
                args.push("-r".to_string());
                args.push(self.rate.to_string());
                if let Some(name) = &voice.name {
                    args.push("-v".to_string());
                    args.push(name.clone());
                }
            }
            None => {}
        }

        // Keep text from being read as an option
        if text.starts_with('-') {
            args.push(format!(" {}", text));
        } else {
            args.push(text.to_string());
        }
        args
    }
}

impl Default for NativeTtsEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_program() -> Option<NativeProgram> {
    let probe = |cmd: &str, arg: &str| {
        std::process::Command::new(cmd)
            .arg(arg)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    };

    if cfg!(target_os = "macos") {
        return Some(NativeProgram::Say("say".to_string()));
    }

    if cfg!(target_os = "linux") {
        for cmd in ["espeak-ng", "espeak"] {
            if probe(cmd, "--version") {
                return Some(NativeProgram::Espeak(cmd.to_string()));
            }
        }
    }

    None
}

#[async_trait]
impl TtsEngine for NativeTtsEngine {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<SpeechOutput, SpeechError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| SpeechError::Engine("Native TTS engine not available".to_string()))?;

        let sanitized = sanitize_text(text)?;
        let args = self.build_args(&sanitized, voice);
        debug!("Speaking {} chars with {}", sanitized.len(), program.command());

        // Dropping the future (timeout, shutdown) kills the child
        let output = Command::new(program.command())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to run {}: {}", program.command(), e)))?;

        if !output.status.success() {
            return Err(SpeechError::Engine(format!(
                "{} failed: {}",
                program.command(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(SpeechOutput::Spoken)
    }

    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn name(&self) -> &str {
        "native"
    }
}
