use super::*;

fn test_db() -> PatternDB {
    PatternDB::open(":memory:").expect("in-memory db")
}

fn scope() -> Scope {
    Scope::new("c1", "imitation")
}

#[test]
fn vocab_upsert_increments_and_backfills_pos() {
    let db = test_db();
    let s = scope();
    db.upsert_vocab(&s, "cat", None).unwrap();
    db.upsert_vocab(&s, "cat", Some(PosTag::Noun)).unwrap();
    db.upsert_vocab(&s, "cat", Some(PosTag::Verb)).unwrap();

    let e = db.vocab_entry(&s, "cat").unwrap().unwrap();
    assert_eq!(e.frequency, 3);
    assert_eq!(e.pos, Some(PosTag::Noun), "first tag sticks");
    assert!(e.last_seen >= e.first_seen);
    assert_eq!(db.count_vocab(&s, None).unwrap(), 1);
}

#[test]
fn unknown_tag_is_stored_as_missing() {
    let db = test_db();
    let s = scope();
    db.upsert_vocab(&s, "zxq", Some(PosTag::X)).unwrap();
    assert_eq!(db.vocab_entry(&s, "zxq").unwrap().unwrap().pos, None);
    db.upsert_vocab(&s, "zxq", Some(PosTag::Noun)).unwrap();
    assert_eq!(db.vocab_entry(&s, "zxq").unwrap().unwrap().pos, Some(PosTag::Noun));
}

#[test]
fn scopes_are_isolated() {
    let db = test_db();
    db.upsert_vocab(&scope(), "cat", Some(PosTag::Noun)).unwrap();
    let other_conv = Scope::new("c2", "imitation");
    let other_mode = Scope::new("c1", "mentor");
    assert!(db.vocab_entry(&other_conv, "cat").unwrap().is_none());
    assert!(db.vocab_entry(&other_mode, "cat").unwrap().is_none());
    assert_eq!(db.counts(&other_conv).unwrap(), Counts::default());
}

#[test]
fn top_vocab_by_frequency_and_tag() {
    let db = test_db();
    let s = scope();
    for _ in 0..3 {
        db.upsert_vocab(&s, "dog", Some(PosTag::Noun)).unwrap();
    }
    db.upsert_vocab(&s, "cat", Some(PosTag::Noun)).unwrap();
    db.upsert_vocab(&s, "run", Some(PosTag::Verb)).unwrap();
    db.upsert_vocab(&s, "run", Some(PosTag::Verb)).unwrap();

    let all: Vec<_> = db.top_vocab(&s, None, 10).unwrap().into_iter().map(|e| e.word).collect();
    assert_eq!(all, vec!["dog", "run", "cat"]);
    let nouns: Vec<_> = db.top_vocab(&s, Some(PosTag::Noun), 10).unwrap().into_iter().map(|e| e.word).collect();
    assert_eq!(nouns, vec!["dog", "cat"]);
    assert_eq!(db.count_vocab(&s, Some(PosTag::Verb)).unwrap(), 1);
    assert_eq!(db.vocab_occurrences(&s).unwrap(), 6);
    assert_eq!(db.top_vocab(&s, None, 1).unwrap().len(), 1);
}

#[test]
fn pattern_example_keeps_first() {
    let db = test_db();
    let s = scope();
    db.upsert_pattern(&s, PatternKind::Bigram, "ok ok", Some("ok ok!")).unwrap();
    db.upsert_pattern(&s, PatternKind::Bigram, "ok ok", Some("ok ok ok")).unwrap();
    let p = db.pattern(&s, "ok ok").unwrap().unwrap();
    assert_eq!(p.frequency, 2);
    assert_eq!(p.example.as_deref(), Some("ok ok!"));
    assert_eq!(p.kind, PatternKind::Bigram);
}

#[test]
fn containment_is_literal_and_ngram_only() {
    let db = test_db();
    let s = scope();
    db.upsert_pattern(&s, PatternKind::Bigram, "100% sure", None).unwrap();
    db.upsert_pattern(&s, PatternKind::Bigram, "100x sure", None).unwrap();
    db.upsert_pattern(&s, PatternKind::PosSequence, "PRON VERB NOUN", Some("I like cats")).unwrap();

    let hits = db.patterns_containing(&s, "100%", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].pattern, "100% sure");
    assert!(db.patterns_containing(&s, "verb", 5).unwrap().is_empty());
}

#[test]
fn pos_sequence_tags_parse_back() {
    let db = test_db();
    let s = scope();
    db.upsert_pattern(&s, PatternKind::PosSequence, "PRON VERB DET NOUN", None).unwrap();
    let top = db.top_patterns(&s, Some(PatternKind::PosSequence), 5).unwrap();
    assert_eq!(top[0].tags(), vec![PosTag::Pron, PosTag::Verb, PosTag::Det, PosTag::Noun]);
    assert_eq!(db.count_patterns(&s, Some(PatternKind::Bigram)).unwrap(), 0);
}

#[test]
fn template_structure_round_trips() {
    let db = test_db();
    let s = scope();
    let tags = [PosTag::Pron, PosTag::Verb, PosTag::Det, PosTag::Noun];
    db.upsert_template(&s, "I {VERB} the {NOUN}", &tags, Some("I like the cat")).unwrap();
    db.upsert_template(&s, "I {VERB} the {NOUN}", &tags, Some("I see the dog")).unwrap();
    let t = db.template(&s, "I {VERB} the {NOUN}").unwrap().unwrap();
    assert_eq!(t.frequency, 2);
    assert_eq!(t.pos_structure, tags.to_vec());
    assert_eq!(t.example.as_deref(), Some("I like the cat"));
    assert_eq!(db.count_templates(&s).unwrap(), 1);
}

#[test]
fn failed_closure_rolls_back() {
    let db = test_db();
    let s = scope();
    let err = db
        .write_tx(|w| {
            w.upsert_vocab(&s, "ghost", None)?;
            Err::<(), _>(MimicError::Validation("nope".into()))
        })
        .unwrap_err();
    assert!(matches!(err, MimicError::Validation(_)));
    assert!(db.vocab_entry(&s, "ghost").unwrap().is_none());
}

#[test]
fn conflicts_are_retried_then_given_up() {
    let db = test_db();
    let s = scope();
    let mut calls = 0;
    db.write_tx(|w| {
        calls += 1;
        if calls == 1 {
            return Err(MimicError::PersistenceConflict("busy".into()));
        }
        w.upsert_vocab(&s, "again", None)
    })
    .unwrap();
    assert_eq!(calls, 2);
    assert_eq!(db.vocab_entry(&s, "again").unwrap().unwrap().frequency, 1);

    let mut attempts = 0;
    let err = db
        .write_tx(|_| {
            attempts += 1;
            Err::<(), _>(MimicError::PersistenceConflict("busy".into()))
        })
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(attempts, WRITE_CONFLICT_ATTEMPTS);
}

#[test]
fn answered_exchanges_pair_partner_with_next_reply() {
    let db = test_db();
    let s = scope();
    db.append_exchange(&s, Sender::Partner, "hi").unwrap();
    db.append_exchange(&s, Sender::Engine, "hello").unwrap();
    db.append_exchange(&s, Sender::Partner, "unanswered").unwrap();

    let pairs = db.answered_exchanges(&s, 10).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].partner.content, "hi");
    assert_eq!(pairs[0].reply.content, "hello");
    assert_eq!(db.count_exchanges(&s).unwrap(), 3);
    assert_eq!(db.recent_exchanges(&s, 1).unwrap()[0].content, "unanswered");
}

#[test]
fn stage_mark_only_rises() {
    let db = test_db();
    let s = scope();
    assert_eq!(db.stage_mark(&s).unwrap(), None);
    assert!(db.raise_stage(&s, Stage::Child).unwrap());
    assert!(!db.raise_stage(&s, Stage::Toddler).unwrap());
    assert_eq!(db.stage_mark(&s).unwrap(), Some(Stage::Child));
    assert!(db.raise_stage(&s, Stage::Adult).unwrap());
    assert_eq!(db.stage_mark(&s).unwrap(), Some(Stage::Adult));
}

#[test]
fn emotion_samples_round_trip() {
    let db = test_db();
    let mut scores = EmotionScores::default();
    scores.set(Emotion::Happy, 0.6);
    scores.set(Emotion::Neutral, 0.3);
    let input = EmotionInput {
        message_id: "m1".into(),
        primary: Emotion::Happy,
        confidence: 0.6,
        intensity: 0.15,
        scores,
        text_sample: "great".into(),
    };
    db.write_tx(|w| w.append_emotion("c1", &input)).unwrap();
    let got = db.emotion_samples_since("c1", 0).unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].primary, Emotion::Happy);
    assert!((got[0].scores.get(Emotion::Happy) - 0.6).abs() < 1e-9);
    assert_eq!(db.recent_emotion_samples("c1", 5).unwrap().len(), 1);
    assert!(db.emotion_samples_since("c2", 0).unwrap().is_empty());
}
