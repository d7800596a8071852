//! The closed emotion taxonomy carried by every dispatched reply

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Excited,
    Happy,
    Neutral,
    Concerned,
    Sad,
    Angry,
}

impl EmotionTag {
    pub const ALL: [EmotionTag; 6] = [
        EmotionTag::Excited,
        EmotionTag::Happy,
        EmotionTag::Neutral,
        EmotionTag::Concerned,
        EmotionTag::Sad,
        EmotionTag::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionTag::Excited => "excited",
            EmotionTag::Happy => "happy",
            EmotionTag::Neutral => "neutral",
            EmotionTag::Concerned => "concerned",
            EmotionTag::Sad => "sad",
            EmotionTag::Angry => "angry",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "excited" => Some(EmotionTag::Excited),
            "happy" => Some(EmotionTag::Happy),
            "neutral" => Some(EmotionTag::Neutral),
            "concerned" => Some(EmotionTag::Concerned),
            "sad" => Some(EmotionTag::Sad),
            "angry" => Some(EmotionTag::Angry),
            _ => None,
        }
    }

    /// Position on the negative-to-positive axis used by score thresholding.
    /// angry < sad < concerned < neutral < happy < excited
    pub fn valence_rank(&self) -> u8 {
        match self {
            EmotionTag::Angry => 0,
            EmotionTag::Sad => 1,
            EmotionTag::Concerned => 2,
            EmotionTag::Neutral => 3,
            EmotionTag::Happy => 4,
            EmotionTag::Excited => 5,
        }
    }
}

impl fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
