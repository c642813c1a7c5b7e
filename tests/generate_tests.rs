use mimicry::db::{FactInput, PatternDB, PatternKind, Scope};
use mimicry::generate::{ResponseGenerator, Strategy};
use mimicry::nlp::{Analysis, Analyzer, PosTag::*, RuleAnalyzer, Sentence};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn setup() -> (PatternDB, Scope) {
    (PatternDB::open(":memory:").unwrap(), Scope::new("gen", "imitation"))
}

fn input(pairs: &[(&str, mimicry::nlp::PosTag)]) -> Analysis {
    Analysis::from_sentences(vec![Sentence::tagged(pairs)])
}

#[test]
fn single_template_fills_deterministically() {
    let (db, s) = setup();
    db.upsert_template(&s, "I {VERB} the {NOUN}", &[Pron, Verb, Det, Noun], Some("I see the dog")).unwrap();
    db.upsert_vocab(&s, "like", Some(Verb)).unwrap();
    db.upsert_vocab(&s, "cat", Some(Noun)).unwrap();

    let hi = input(&[("hi", Intj)]);
    for seed in [1, 7, 99] {
        let mut rng = StdRng::seed_from_u64(seed);
        let c = ResponseGenerator.run(Strategy::Template, &db, &hi, &s, &mut rng).unwrap();
        assert_eq!(c.text, "I like the cat");
        assert!(c.confidence >= 0.1);
        assert_eq!(c.strategy, Strategy::Template);
    }
}

#[test]
fn weak_candidates_are_no_usable_pattern() {
    let (db, s) = setup();
    db.upsert_template(&s, "I {VERB} the {NOUN}", &[Pron, Verb, Det, Noun], None).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    assert!(ResponseGenerator.generate(&db, &input(&[("hi", Intj)]), &s, &mut rng).is_none());
}

#[test]
fn pos_sequence_reuses_the_closest_example() {
    let (db, s) = setup();
    for _ in 0..5 {
        db.upsert_pattern(&s, PatternKind::PosSequence, "PRON VERB DET NOUN", Some("I love the rain")).unwrap();
    }
    db.upsert_pattern(&s, PatternKind::PosSequence, "INTJ PUNCT INTJ", Some("Oh, hi")).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let q = input(&[("You", Pron), ("want", Verb), ("a", Det), ("dog", Noun)]);
    let c = ResponseGenerator.generate(&db, &q, &s, &mut rng).unwrap();
    assert_eq!(c.strategy, Strategy::PosSequence);
    assert_eq!(c.text, "I love the rain");
    assert_eq!(c.confidence, 1.0);
}

#[test]
fn parroting_the_input_is_rejected() {
    let (db, s) = setup();
    for _ in 0..5 {
        db.upsert_pattern(&s, PatternKind::PosSequence, "PRON VERB DET NOUN", Some("You want a dog")).unwrap();
    }
    let mut rng = StdRng::seed_from_u64(3);
    let q = input(&[("You", Pron), ("want", Verb), ("a", Det), ("dog", Noun)]);
    assert!(ResponseGenerator.generate(&db, &q, &s, &mut rng).is_none());
}

#[test]
fn ngram_lookup_uses_the_stored_example() {
    let (db, s) = setup();
    for _ in 0..5 {
        db.upsert_pattern(&s, PatternKind::Bigram, "rainy days", Some("I love rainy days")).unwrap();
    }
    let mut rng = StdRng::seed_from_u64(11);
    let q = input(&[("rainy", Adj), ("weather", Noun)]);
    let c = ResponseGenerator.generate(&db, &q, &s, &mut rng).unwrap();
    assert_eq!(c.strategy, Strategy::NGram);
    assert_eq!(c.text, "I love rainy days");
    assert!((c.confidence - 0.6).abs() < 1e-9);
}

#[test]
fn memory_questions_answer_from_facts() {
    let (db, s) = setup();
    let analyzer = RuleAnalyzer::new();
    let mut rng = StdRng::seed_from_u64(5);

    let ask = analyzer.analyze("What do you know about me?");
    let c = ResponseGenerator.generate(&db, &ask, &s, &mut rng).unwrap();
    assert_eq!(c.strategy, Strategy::MemoryAnswer);
    assert_eq!(c.confidence, 0.7);

    db.upsert_fact(
        "gen",
        &FactInput {
            subject: "name".into(),
            fact: "Alice".into(),
            confidence: 0.8,
            priority: 5,
            context_tags: vec!["name".into()],
            source_text: "my name is Alice".into(),
        },
    )
    .unwrap();
    let c = ResponseGenerator.generate(&db, &ask, &s, &mut rng).unwrap();
    assert_eq!(c.text, "I remember that your name is Alice.");
    assert_eq!(c.confidence, 0.9);

    let c = ResponseGenerator.generate(&db, &analyzer.analyze("Do you remember my name?"), &s, &mut rng).unwrap();
    assert_eq!(c.text, "Your name is Alice.");
}

#[test]
fn strategy_error_yields_no_candidate() {
    let (db, s) = setup();
    db.execute_raw("DROP TABLE templates").unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    assert!(ResponseGenerator.run(Strategy::Template, &db, &input(&[("hi", Intj)]), &s, &mut rng).is_none());
}
