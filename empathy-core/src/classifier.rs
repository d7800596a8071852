//! Sentiment-to-emotion classification with keyword overrides

use crate::config::{ClassifierConfig, KeywordOverride, Thresholds};
use crate::emotion::EmotionTag;
use crate::error::{Error, Result};
use crate::sentiment::{compound_score, tokenize};
use serde::Serialize;

/// Result of classifying one piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub tag: EmotionTag,
    pub score: f64,
    /// Keyword override that decided the tag, if any
    pub keyword: Option<String>,
}

struct CompiledOverride {
    words: Vec<String>,
    keyword: String,
    tag: EmotionTag,
}

/// Pure, deterministic text classifier
pub struct Classifier {
    thresholds: Thresholds,
    overrides: Vec<CompiledOverride>,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;
        let overrides = config
            .keyword_overrides
            .iter()
            .map(compile_override)
            .collect();
        Ok(Self {
            thresholds: config.thresholds,
            overrides,
        })
    }

    /// Classify text into exactly one tag
    pub fn classify(&self, text: &str) -> EmotionTag {
        self.analyze(text).tag
    }

    /// Classify text, keeping the score and any matched keyword
    pub fn analyze(&self, text: &str) -> Classification {
        let score = compound_score(text);
        if let Some(hit) = self.match_override(text) {
            return Classification {
                tag: hit.tag,
                score,
                keyword: Some(hit.keyword.clone()),
            };
        }
        Classification {
            tag: self.tag_for_score(score),
            score,
            keyword: None,
        }
    }

    /// Map a compound score onto the tag bands
    pub fn tag_for_score(&self, score: f64) -> EmotionTag {
        let t = &self.thresholds;
        if score.is_nan() {
            return EmotionTag::Neutral;
        }
        if score <= t.angry {
            EmotionTag::Angry
        } else if score <= t.sad {
            EmotionTag::Sad
        } else if score < t.concerned {
            EmotionTag::Concerned
        } else if score >= t.excited {
            EmotionTag::Excited
        } else if score >= t.happy {
            EmotionTag::Happy
        } else {
            EmotionTag::Neutral
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn match_override(&self, text: &str) -> Option<&CompiledOverride> {
        if self.overrides.is_empty() {
            return None;
        }
        let words: Vec<String> = tokenize(text).into_iter().map(|t| t.lower).collect();
        self.overrides
            .iter()
            .find(|entry| contains_phrase(&words, &entry.words))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let config = ClassifierConfig::default();
        Self {
            thresholds: config.thresholds,
            overrides: config.keyword_overrides.iter().map(compile_override).collect(),
        }
    }
}

fn compile_override(entry: &KeywordOverride) -> CompiledOverride {
    CompiledOverride {
        words: tokenize(&entry.keyword).into_iter().map(|t| t.lower).collect(),
        keyword: entry.keyword.clone(),
        tag: entry.tag,
    }
}

fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > words.len() {
        return false;
    }
    words.windows(phrase.len()).any(|window| window == phrase)
}
