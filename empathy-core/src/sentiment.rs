//! Lexicon-based compound sentiment scoring
//!
//! Scores follow the VADER scheme: each lexicon word carries a valence in roughly
//! [-4, 4], adjusted by nearby boosters, negations, ALL-CAPS emphasis, a "but"
//! contrast and trailing punctuation. The summed valence is normalised into [-1, 1].

use std::collections::HashMap;
use std::sync::OnceLock;

const BOOSTER_INCREMENT: f64 = 0.293;
const BOOSTER_DECREMENT: f64 = -0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const QUESTION_INCREMENT: f64 = 0.18;
const MAX_QUESTION_AMPLIFIER: f64 = 0.96;
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Look-back distance factors for boosters (1, 2 and 3 tokens back).
const DISTANCE_DAMPING: [f64; 3] = [1.0, 0.95, 0.9];

static LEXICON: &[(&str, f64)] = &[
    // positive
    ("good", 1.9), ("great", 3.1), ("happy", 2.7), ("happiness", 2.6), ("glad", 2.0),
    ("joy", 2.8), ("joyful", 2.9), ("love", 3.2), ("loved", 2.9), ("lovely", 2.8),
    ("loving", 2.9), ("wonderful", 2.7), ("amazing", 2.8), ("awesome", 3.1),
    ("excellent", 2.7), ("fantastic", 2.6), ("nice", 1.8), ("fun", 2.3), ("excited", 1.4),
    ("exciting", 2.2), ("thrilled", 1.9), ("delighted", 2.9), ("ecstatic", 2.3),
    ("thank", 1.5), ("thanks", 1.9), ("grateful", 2.0), ("proud", 2.1), ("hope", 1.9),
    ("hopeful", 2.3), ("calm", 1.3), ("relaxed", 2.2), ("relief", 1.5), ("better", 1.9),
    ("best", 3.2), ("beautiful", 2.9), ("brilliant", 2.8), ("cheerful", 2.5),
    ("comfort", 1.5), ("comfortable", 2.3), ("confident", 2.2), ("congratulations", 2.9),
    ("cool", 1.3), ("enjoy", 2.2), ("enjoyed", 2.3), ("fine", 0.8), ("friendly", 2.2),
    ("funny", 1.9), ("laugh", 2.6), ("laughing", 2.2), ("lucky", 1.8), ("peaceful", 2.2),
    ("perfect", 2.7), ("pleased", 1.9), ("positive", 2.6), ("safe", 1.9), ("smile", 1.5),
    ("smiling", 2.3), ("support", 1.7), ("sweet", 2.0), ("success", 2.7),
    ("successful", 2.8), ("win", 2.8), ("won", 2.7), ("yay", 2.4), ("yes", 1.7),
    ("wow", 2.8), ("care", 2.2), ("caring", 2.2), ("warm", 0.9), ("welcome", 2.0),
    ("okay", 0.9), ("ok", 1.2), ("celebrate", 2.7), ("blessed", 2.9), ("glorious", 3.2),
    ("excellence", 3.1), ("incredible", 2.0), ("pleasant", 2.3), ("kindness", 2.4),
    ("appreciate", 1.7), ("appreciated", 2.3), ("helpful", 1.8), ("healthy", 1.7),
    // negative
    ("bad", -2.5), ("sad", -2.1), ("sadness", -1.9), ("unhappy", -1.8), ("upset", -1.6),
    ("angry", -2.3), ("anger", -2.7), ("mad", -2.2), ("furious", -2.7), ("hate", -2.7),
    ("hated", -3.2), ("awful", -2.0), ("terrible", -2.5), ("horrible", -2.5),
    ("worst", -3.1), ("worse", -2.1), ("cry", -2.1), ("crying", -2.1), ("cried", -1.6),
    ("hurt", -2.4), ("hurts", -2.2), ("pain", -2.3), ("painful", -1.9), ("scared", -1.9),
    ("afraid", -2.0), ("fear", -2.2), ("worried", -1.2), ("worry", -1.9),
    ("anxious", -1.0), ("anxiety", -0.7), ("nervous", -1.1), ("stressed", -1.4),
    ("stress", -1.8), ("lonely", -1.5), ("alone", -1.0), ("depressed", -2.3),
    ("depression", -2.7), ("miserable", -2.2), ("tired", -1.9), ("exhausted", -1.5),
    ("frustrated", -2.0), ("frustrating", -1.9), ("annoyed", -1.6), ("annoying", -1.8),
    ("disappointed", -1.9), ("disappointing", -2.2), ("sorry", -0.3), ("lost", -1.3),
    ("lose", -1.7), ("failed", -2.3), ("fail", -2.5), ("failure", -2.3),
    ("problem", -1.7), ("problems", -1.7), ("wrong", -2.1), ("difficult", -1.5),
    ("broken", -1.3), ("grief", -2.2), ("heartbroken", -3.3), ("devastated", -3.1),
    ("hopeless", -2.0), ("helpless", -2.0), ("ugly", -2.3), ("stupid", -2.4),
    ("idiot", -2.3), ("damn", -1.7), ("sucks", -1.5), ("kill", -3.7), ("killed", -3.5),
    ("die", -2.9), ("died", -2.6), ("dead", -3.3), ("death", -2.9), ("sick", -2.3),
    ("danger", -2.4), ("dangerous", -2.1), ("terrified", -3.0), ("panic", -2.3),
    ("shame", -2.1), ("guilty", -1.8), ("jealous", -2.0), ("rage", -2.6), ("livid", -2.9),
    ("disgusting", -2.4), ("disgust", -2.9), ("nightmare", -1.9), ("cruel", -2.8),
    ("betrayed", -2.8), ("abandoned", -2.1), ("rejected", -1.7), ("worthless", -1.9),
    ("useless", -1.8), ("boring", -1.3), ("bored", -1.1), ("confused", -1.3),
    ("concerned", -0.6), ("trouble", -1.7), ("crisis", -3.1), ("disaster", -3.1),
    ("unfortunately", -1.6), ("horrified", -2.5), ("furiously", -2.1), ("hopelessly", -2.0),
];

static BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCREMENT), ("amazingly", BOOSTER_INCREMENT),
    ("awfully", BOOSTER_INCREMENT), ("completely", BOOSTER_INCREMENT),
    ("deeply", BOOSTER_INCREMENT), ("enormously", BOOSTER_INCREMENT),
    ("entirely", BOOSTER_INCREMENT), ("especially", BOOSTER_INCREMENT),
    ("exceptionally", BOOSTER_INCREMENT), ("extremely", BOOSTER_INCREMENT),
    ("greatly", BOOSTER_INCREMENT), ("highly", BOOSTER_INCREMENT),
    ("hugely", BOOSTER_INCREMENT), ("incredibly", BOOSTER_INCREMENT),
    ("intensely", BOOSTER_INCREMENT), ("more", BOOSTER_INCREMENT),
    ("most", BOOSTER_INCREMENT), ("particularly", BOOSTER_INCREMENT),
    ("quite", BOOSTER_INCREMENT), ("really", BOOSTER_INCREMENT),
    ("remarkably", BOOSTER_INCREMENT), ("so", BOOSTER_INCREMENT),
    ("substantially", BOOSTER_INCREMENT), ("thoroughly", BOOSTER_INCREMENT),
    ("totally", BOOSTER_INCREMENT), ("tremendously", BOOSTER_INCREMENT),
    ("truly", BOOSTER_INCREMENT), ("unbelievably", BOOSTER_INCREMENT),
    ("utterly", BOOSTER_INCREMENT), ("very", BOOSTER_INCREMENT),
    ("almost", BOOSTER_DECREMENT), ("barely", BOOSTER_DECREMENT),
    ("hardly", BOOSTER_DECREMENT), ("kinda", BOOSTER_DECREMENT),
    ("less", BOOSTER_DECREMENT), ("little", BOOSTER_DECREMENT),
    ("marginally", BOOSTER_DECREMENT), ("occasionally", BOOSTER_DECREMENT),
    ("partly", BOOSTER_DECREMENT), ("scarcely", BOOSTER_DECREMENT),
    ("slightly", BOOSTER_DECREMENT), ("somewhat", BOOSTER_DECREMENT),
    ("sorta", BOOSTER_DECREMENT),
];

static NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere",
    "cannot", "without", "aint", "arent", "cant", "couldnt", "didnt", "doesnt", "dont",
    "hasnt", "havent", "isnt", "wasnt", "werent", "wont", "wouldnt", "shouldnt",
];

fn lexicon() -> &'static HashMap<&'static str, f64> {
    static MAP: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    MAP.get_or_init(|| LEXICON.iter().copied().collect())
}

fn boosters() -> &'static HashMap<&'static str, f64> {
    static MAP: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    MAP.get_or_init(|| BOOSTERS.iter().copied().collect())
}

/// A word of input text with its case information preserved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub lower: String,
    pub is_caps: bool,
}

/// Split text into lowercase word tokens, keeping inner apostrophes.
pub(crate) fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .filter_map(|raw| {
            let word: String = raw
                .replace('\u{2019}', "'")
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .trim_matches('\'')
                .to_string();
            if word.is_empty() {
                return None;
            }
            let has_alpha = word.chars().any(|c| c.is_alphabetic());
            let is_caps = has_alpha
                && word.chars().filter(|c| c.is_alphabetic()).count() > 1
                && word.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase());
            Some(Token {
                lower: word.to_lowercase(),
                is_caps,
            })
        })
        .collect()
}

fn is_negation(word: &str) -> bool {
    let stripped: String = word.chars().filter(|c| *c != '\'').collect();
    NEGATIONS.contains(&stripped.as_str()) || word.ends_with("n't")
}

/// Compound sentiment of `text` in [-1, 1].
pub fn compound_score(text: &str) -> f64 {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 0.0;
    }

    let caps_count = tokens.iter().filter(|t| t.is_caps).count();
    let caps_differential = caps_count > 0 && caps_count < tokens.len();
    let but_index = tokens.iter().position(|t| t.lower == "but");

    let lexicon = lexicon();
    let boosters = boosters();

    let mut sum = 0.0;
    for (i, token) in tokens.iter().enumerate() {
        if boosters.contains_key(token.lower.as_str()) {
            continue;
        }
        let Some(&base) = lexicon.get(token.lower.as_str()) else {
            continue;
        };

        let mut valence = base;
        if token.is_caps && caps_differential {
            valence += CAPS_INCREMENT * valence.signum();
        }

        let mut negated = false;
        for (distance, damping) in DISTANCE_DAMPING.iter().enumerate() {
            let Some(prev_index) = i.checked_sub(distance + 1) else {
                break;
            };
            let prev = &tokens[prev_index];
            if let Some(&boost) = boosters.get(prev.lower.as_str()) {
                let mut scalar = if valence < 0.0 { -boost } else { boost };
                if prev.is_caps && caps_differential {
                    scalar += CAPS_INCREMENT * valence.signum();
                }
                valence += scalar * damping;
            }
            if is_negation(&prev.lower) {
                negated = true;
            }
        }
        if negated {
            valence *= NEGATION_SCALAR;
        }

        if let Some(but) = but_index {
            if i < but {
                valence *= 0.5;
            } else if i > but {
                valence *= 1.5;
            }
        }

        sum += valence;
    }

    if sum != 0.0 {
        let amplifier = punctuation_amplifier(text);
        sum += amplifier * sum.signum();
    }

    normalize(sum)
}

fn punctuation_amplifier(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    let questions = text.matches('?').count();
    let question_amplifier = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * QUESTION_INCREMENT,
        _ => MAX_QUESTION_AMPLIFIER,
    };
    exclamations as f64 * EXCLAMATION_INCREMENT + question_amplifier
}

fn normalize(score: f64) -> f64 {
    let normalized = score / (score * score + NORMALIZATION_ALPHA).sqrt();
    normalized.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_unscored_text_is_zero() {
        assert_eq!(compound_score(""), 0.0);
        assert_eq!(compound_score("   "), 0.0);
        assert_eq!(compound_score("The meeting is at noon."), 0.0);
    }

    #[test]
    fn test_booster_and_exclamation_raise_score() {
        let plain = compound_score("I am happy");
        let boosted = compound_score("I am so happy");
        let shouted = compound_score("I am so happy!");
        assert!(plain > 0.0);
        assert!(boosted > plain);
        assert!(shouted > boosted);
    }

    #[test]
    fn test_negation_flips_polarity() {
        assert!(compound_score("I am happy") > 0.0);
        assert!(compound_score("I am not happy") < 0.0);
        assert!(compound_score("I don't feel good") < 0.0);
    }

    #[test]
    fn test_caps_emphasis_in_mixed_case_text() {
        let calm = compound_score("this is great");
        let loud = compound_score("this is GREAT");
        assert!(loud > calm);
    }

    #[test]
    fn test_but_shifts_weight_to_second_clause() {
        let score = compound_score("The food was good but the service was terrible");
        assert!(score < 0.0);
    }

    #[test]
    fn test_score_is_bounded() {
        let text = "love love love love love love love love amazing awesome best!!!!";
        let score = compound_score(text);
        assert!(score <= 1.0 && score > 0.9);
        let text = "hate hate hate worst terrible awful disaster";
        let score = compound_score(text);
        assert!(score >= -1.0 && score < -0.9);
    }

    #[test]
    fn test_tokenize_keeps_apostrophes_and_caps() {
        let tokens = tokenize("I'm SO happy, aren\u{2019}t you?");
        let words: Vec<&str> = tokens.iter().map(|t| t.lower.as_str()).collect();
        assert_eq!(words, vec!["i'm", "so", "happy", "aren't", "you"]);
        assert!(tokens[1].is_caps);
        assert!(!tokens[0].is_caps);
    }
}
