use mimicry::db::{PatternDB, PatternKind, Scope};
use mimicry::learn::{LearnPlan, PatternLearner};
use mimicry::maturity::{stage_for, weighted_total, Stage};
use mimicry::nlp::{PosTag::*, RuleAnalyzer, Sentence};

fn db() -> PatternDB {
    PatternDB::open(":memory:").unwrap()
}

fn scope() -> Scope {
    Scope::new("learn", "imitation")
}

fn cat_sentence() -> Sentence {
    Sentence::tagged(&[("I", Pron), ("like", Verb), ("the", Det), ("cat", Noun), (".", Punct)])
}

#[test]
fn ok_ok_is_kept_and_ok_a_is_not() {
    let db = db();
    let s = scope();
    PatternLearner.learn(&db, &Sentence::tagged(&[("ok", Intj), ("ok", Intj)]), &s).unwrap();
    PatternLearner.learn(&db, &Sentence::tagged(&[("ok", Intj), ("a", Det)]), &s).unwrap();
    assert!(db.pattern(&s, "ok ok").unwrap().is_some());
    assert!(db.pattern(&s, "ok a").unwrap().is_none());
    assert_eq!(db.count_patterns(&s, Some(PatternKind::Bigram)).unwrap(), 1);
}

#[test]
fn relearning_doubles_frequencies_without_new_keys() {
    let db = db();
    let s = scope();
    let sentence = cat_sentence();
    PatternLearner.learn(&db, &sentence, &s).unwrap();
    let first = db.counts(&s).unwrap();
    PatternLearner.learn(&db, &sentence, &s).unwrap();
    assert_eq!(db.counts(&s).unwrap(), first);

    for p in db.top_patterns(&s, None, 50).unwrap() {
        assert_eq!(p.frequency, 2, "{}", p.pattern);
    }
    for v in db.top_vocab(&s, None, 50).unwrap() {
        assert_eq!(v.frequency, 2, "{}", v.word);
    }
    let t = db.template(&s, "I {VERB} the {NOUN}.").unwrap().unwrap();
    assert_eq!(t.frequency, 2);
    assert_eq!(t.example.as_deref(), Some("I like the cat."));
}

#[test]
fn plan_lists_every_upsert() {
    let plan = LearnPlan::from_sentence(&cat_sentence());
    let grams: Vec<&str> = plan.ngrams.iter().map(|(_, g)| g.as_str()).collect();
    assert_eq!(grams, vec!["i like", "like the", "the cat", "i like the", "like the cat"]);
    assert_eq!(plan.pos_sequence.as_deref(), Some("PRON VERB DET NOUN PUNCT"));
    let words: Vec<&str> = plan.vocabulary.iter().map(|(w, _)| w.as_str()).collect();
    assert_eq!(words, vec!["like", "cat"]);
}

#[test]
fn failed_learning_commits_nothing() {
    let db = db();
    let s = scope();
    db.execute_raw("DROP TABLE templates").unwrap();
    assert!(PatternLearner.learn(&db, &cat_sentence(), &s).is_err());
    assert!(db.top_vocab(&s, None, 10).unwrap().is_empty());
    assert!(db.top_patterns(&s, None, 10).unwrap().is_empty());
}

#[test]
fn stage_never_drops_while_learning() {
    let db = db();
    let s = scope();
    let analyzer = RuleAnalyzer::new();
    let lines = [
        "I went hiking with my sister yesterday.",
        "The weather was cold but sunny.",
        "We saw three deer near the lake!",
        "My boots got completely soaked.",
        "Next week we want to climb the big hill.",
        "Do you like hiking too?",
    ];
    let mut last = Stage::Infant;
    for line in lines.iter().cycle().take(18) {
        PatternLearner.learn_text(&db, &analyzer, line, &s).unwrap();
        let stage = stage_for(weighted_total(&db.counts(&s).unwrap()));
        assert!(stage >= last);
        last = stage;
    }
    assert!(last >= Stage::Toddler);
}
