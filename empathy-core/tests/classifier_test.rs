//! Property tests for the classifier

use empathy_core::{Classifier, ClassifierConfig, EmotionTag, KeywordOverride};
use proptest::prelude::*;

proptest! {
    #[test]
    fn classify_always_returns_known_tag(text in ".{0,200}") {
        let classifier = Classifier::default();
        let tag = classifier.classify(&text);
        prop_assert!(EmotionTag::ALL.contains(&tag));
    }

    #[test]
    fn classify_is_deterministic(text in ".{0,200}") {
        let classifier = Classifier::default();
        let first = classifier.analyze(&text);
        let second = classifier.analyze(&text);
        prop_assert_eq!(first.tag, second.tag);
        prop_assert_eq!(first.keyword, second.keyword);
        prop_assert!(first.score == second.score || (first.score.is_nan() && second.score.is_nan()));
    }

    #[test]
    fn score_stays_bounded(text in "[a-zA-Z!?' ]{0,120}") {
        let score = empathy_core::compound_score(&text);
        prop_assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn override_keyword_beats_sentiment(
        before in prop::collection::vec("(love|hate|great|awful|[xqz]{1,5})", 0..6),
        after in prop::collection::vec("(love|hate|great|awful|[xqz]{1,5})", 0..6),
        index in 0usize..4,
    ) {
        let table = [
            ("squall", EmotionTag::Sad),
            ("zephyr", EmotionTag::Excited),
            ("gloam", EmotionTag::Angry),
            ("drizzle", EmotionTag::Neutral),
        ];
        let config = ClassifierConfig {
            keyword_overrides: table.iter().map(|(k, t)| KeywordOverride::new(*k, *t)).collect(),
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config).unwrap();

        let (keyword, expected) = table[index];
        let text = format!("{} {} {}", before.join(" "), keyword.to_uppercase(), after.join(" "));
        let result = classifier.analyze(&text);
        prop_assert_eq!(result.tag, expected);
        prop_assert_eq!(result.keyword.as_deref(), Some(keyword));
    }

    #[test]
    fn higher_score_never_gives_more_negative_tag(a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
        let classifier = Classifier::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_tag = classifier.tag_for_score(low);
        let high_tag = classifier.tag_for_score(high);
        prop_assert!(low_tag.valence_rank() <= high_tag.valence_rank());
    }
}

#[test]
fn test_happy_example_is_positive() {
    let classifier = Classifier::default();
    let tag = classifier.classify("I'm so happy about this!");
    assert!(matches!(tag, EmotionTag::Happy | EmotionTag::Excited));
}

#[test]
fn test_scared_example_is_negative() {
    let classifier = Classifier::default();
    let tag = classifier.classify("I feel terrible and scared");
    assert!(matches!(tag, EmotionTag::Sad | EmotionTag::Concerned));
}

#[test]
fn test_empty_text_is_neutral() {
    let classifier = Classifier::default();
    assert_eq!(classifier.classify(""), EmotionTag::Neutral);
    assert_eq!(classifier.classify("   \n"), EmotionTag::Neutral);
}
