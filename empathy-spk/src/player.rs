//! Playback of encoded audio through an external player

use crate::config::PlayerConfig;
use crate::error::SpeechError;
use bytes::Bytes;
use std::io::Write;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub struct AudioPlayer {
    command: String,
    args: Vec<String>,
}

impl AudioPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Play `audio`, returning when the player exits
    pub async fn play(&self, audio: &Bytes) -> Result<(), SpeechError> {
        let mut file = tempfile::Builder::new()
            .prefix("empathy-speech-")
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(audio)?;
        file.flush()?;

        debug!("Playing {} bytes with {}", audio.len(), self.command);
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpeechError::Playback(format!("Failed to run {}: {}", self.command, e)))?;

        // The temp file is removed when `file` drops
        if !output.status.success() {
            return Err(SpeechError::Playback(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
