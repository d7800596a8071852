//! Configuration for classification, decoration and dispatch

use crate::emotion::EmotionTag;
use crate::sentiment::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Score cut points
    pub thresholds: Thresholds,

    /// Keyword overrides in priority order (first match wins)
    pub keyword_overrides: Vec<KeywordOverride>,
}

/// Score cut points, strictly increasing from `angry` to `excited`.
///
/// score <= angry -> angry, score <= sad -> sad, score < concerned -> concerned,
/// score >= excited -> excited, score >= happy -> happy, otherwise neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub angry: f64,
    pub sad: f64,
    pub concerned: f64,
    pub happy: f64,
    pub excited: f64,
}

/// A keyword or phrase that short-circuits scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordOverride {
    pub keyword: String,
    pub tag: EmotionTag,
}

impl KeywordOverride {
    pub fn new(keyword: impl Into<String>, tag: EmotionTag) -> Self {
        Self {
            keyword: keyword.into(),
            tag,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            angry: -0.65,
            sad: -0.25,
            concerned: -0.15,
            happy: 0.25,
            excited: 0.65,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let table: &[(&str, EmotionTag)] = &[
            ("furious", EmotionTag::Angry),
            ("livid", EmotionTag::Angry),
            ("enraged", EmotionTag::Angry),
            ("pissed off", EmotionTag::Angry),
            ("scared", EmotionTag::Concerned),
            ("afraid", EmotionTag::Concerned),
            ("frightened", EmotionTag::Concerned),
            ("worried", EmotionTag::Concerned),
            ("anxious", EmotionTag::Concerned),
            ("nervous", EmotionTag::Concerned),
            ("heartbroken", EmotionTag::Sad),
            ("devastated", EmotionTag::Sad),
            ("grieving", EmotionTag::Sad),
            ("lonely", EmotionTag::Sad),
            ("depressed", EmotionTag::Sad),
            ("can't wait", EmotionTag::Excited),
            ("thrilled", EmotionTag::Excited),
            ("ecstatic", EmotionTag::Excited),
        ];
        Self {
            thresholds: Thresholds::default(),
            keyword_overrides: table
                .iter()
                .map(|(keyword, tag)| KeywordOverride::new(*keyword, *tag))
                .collect(),
        }
    }
}

impl Thresholds {
    /// Validate cut points
    pub fn validate(&self) -> Result<(), String> {
        let points = [
            ("angry", self.angry),
            ("sad", self.sad),
            ("concerned", self.concerned),
            ("happy", self.happy),
            ("excited", self.excited),
        ];

        for (name, value) in points {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(format!("Threshold '{}' must be within [-1.0, 1.0]", name));
            }
        }

        for pair in points.windows(2) {
            let (lower_name, lower) = pair[0];
            let (upper_name, upper) = pair[1];
            if lower >= upper {
                return Err(format!(
                    "Threshold '{}' ({}) must be below '{}' ({})",
                    lower_name, lower, upper_name, upper
                ));
            }
        }

        Ok(())
    }
}

impl ClassifierConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.thresholds.validate()?;

        for entry in &self.keyword_overrides {
            if entry.keyword.trim().is_empty() {
                return Err("Keyword override cannot be empty".to_string());
            }
            if tokenize(&entry.keyword).is_empty() {
                return Err(format!("Keyword override '{}' contains no words", entry.keyword));
            }
            if entry.keyword.len() > 128 {
                return Err(format!("Keyword override too long (max 128 chars): {}", entry.keyword));
            }
        }

        Ok(())
    }
}

/// Emoji per tag, used for console replies and sent to the emoji web page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiConfig {
    pub mapping: HashMap<EmotionTag, String>,
}

impl Default for EmojiConfig {
    fn default() -> Self {
        let mapping = [
            (EmotionTag::Excited, "\u{1F929}"),
            (EmotionTag::Happy, "\u{1F60A}"),
            (EmotionTag::Neutral, "\u{1F610}"),
            (EmotionTag::Concerned, "\u{1F61F}"),
            (EmotionTag::Sad, "\u{1F614}"),
            (EmotionTag::Angry, "\u{1F620}"),
        ]
        .into_iter()
        .map(|(tag, emoji)| (tag, emoji.to_string()))
        .collect();
        Self { mapping }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Upper bound on one generation call
    pub reply_timeout_secs: u64,

    /// Upper bound on one channel delivery
    pub channel_timeout_secs: u64,

    /// Dispatch the user's emotion instead of the reply's when
    /// |user score| reaches this value. `None` always uses the reply.
    pub user_tone_threshold: Option<f64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            reply_timeout_secs: 60,
            channel_timeout_secs: 30,
            user_tone_threshold: None,
        }
    }
}

impl DispatcherConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.reply_timeout_secs == 0 || self.reply_timeout_secs > 600 {
            return Err("Reply timeout must be between 1 and 600 seconds".to_string());
        }
        if self.channel_timeout_secs == 0 || self.channel_timeout_secs > 600 {
            return Err("Channel timeout must be between 1 and 600 seconds".to_string());
        }
        if let Some(threshold) = self.user_tone_threshold {
            if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
                return Err("User tone threshold must be between 0.0 and 1.0".to_string());
            }
        }
        Ok(())
    }
}
