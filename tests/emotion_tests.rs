use mimicry::db::EmotionSample;
use mimicry::emotion::{classify, dominant, emotional_patterns, style, timeline, Emotion, EmotionScores};

#[test]
fn negation_moves_happy_to_sad() {
    let plain = classify("I am happy");
    let negated = classify("I am not happy");
    assert_eq!(plain.primary, Emotion::Happy);
    assert!(negated.scores.happy < plain.scores.happy);
    assert!(negated.scores.sad > plain.scores.sad);
    assert!((negated.scores.sad - 0.2).abs() < 1e-9);
}

#[test]
fn empty_text_is_fully_neutral() {
    let r = classify("");
    assert_eq!(r.primary, Emotion::Neutral);
    assert_eq!(r.confidence, 1.0);
    assert_eq!(r.scores.neutral, 1.0);
    assert_eq!(r.scores.happy, 0.0);
    assert_eq!(r.intensity, 0.5);
}

#[test]
fn weak_signal_falls_back_to_neutral() {
    let r = classify("The meeting is at noon.");
    assert_eq!(r.primary, Emotion::Neutral);
    assert_eq!(r.confidence, 0.3);
}

#[test]
fn modifiers_and_exclamations_raise_scores() {
    let plain = classify("I am happy");
    let strong = classify("I am really happy!!");
    assert!(strong.scores.happy > plain.scores.happy);
    assert!((strong.scores.happy - (0.45 + 0.3)).abs() < 1e-9);
}

#[test]
fn emoji_count_toward_their_bucket() {
    let r = classify("see you tomorrow 😢");
    assert_eq!(r.primary, Emotion::Sad);
    assert!((r.scores.sad - 0.5).abs() < 1e-9);
}

#[test]
fn scores_stay_in_range() {
    let r = classify("happy happy happy joy joy great awesome amazing!!! 😊😊");
    assert_eq!(r.scores.happy, 1.0);
    assert!(r.intensity <= 1.0);
}

#[test]
fn style_tiers() {
    assert_eq!(style("That is nice.", Emotion::Happy, 0.1), "That is nice.");
    assert_eq!(style("That is nice.", Emotion::Neutral, 0.9), "That is nice.");
    assert_eq!(style("That is nice.", Emotion::Happy, 0.5), "That is nice! 🙂");
    assert_eq!(style("Sure. Sounds good.", Emotion::Happy, 0.9), "Sure! Sounds good!! 😊");
    assert_eq!(style("Oh no?", Emotion::Sad, 0.5), "Oh no... 😕");
}

fn sample(id: i64, primary: Emotion, intensity: f64, at: i64) -> EmotionSample {
    let mut scores = EmotionScores::default();
    scores.set(primary, 0.8);
    EmotionSample {
        id,
        conversation_id: "c1".into(),
        message_id: format!("m{id}"),
        primary,
        confidence: 0.8,
        intensity,
        scores,
        text_sample: String::new(),
        created_at: at,
    }
}

#[test]
fn reports_over_samples() {
    let samples = vec![
        sample(1, Emotion::Happy, 0.5, 100),
        sample(2, Emotion::Happy, 0.5, 200),
        sample(3, Emotion::Sad, 0.25, 300),
    ];

    let t = timeline(&samples);
    assert_eq!(t.timestamps, vec![100, 200, 300]);
    assert_eq!(t.emotions[&Emotion::Happy], vec![0.4, 0.4, 0.0]);
    assert_eq!(t.emotions[&Emotion::Sad], vec![0.0, 0.0, 0.2]);
    assert_eq!(t.emotions.len(), 6);

    let d = dominant(&samples).unwrap();
    assert_eq!(d.emotion, Emotion::Happy);
    assert_eq!((d.count, d.total_count), (2, 3));
    assert!((d.percentage - 200.0 / 3.0).abs() < 1e-9);
    assert!((d.avg_intensity - 0.5).abs() < 1e-9);

    let p = emotional_patterns(&samples);
    assert_eq!(p.dominant_emotion, Emotion::Happy);
    assert!((p.stability - 0.5).abs() < 1e-9);
    assert!((p.range - 2.0 / 6.0).abs() < 1e-9);
    assert_eq!(p.transitions.get("happy_to_sad"), Some(&1));
}

#[test]
fn empty_reports() {
    assert!(dominant(&[]).is_none());
    let p = emotional_patterns(&[]);
    assert_eq!(p.dominant_emotion, Emotion::Neutral);
    assert_eq!(p.stability, 1.0);
    assert!(timeline(&[]).timestamps.is_empty());
}
