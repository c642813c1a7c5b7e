use mimicry::db::PatternDB;
use mimicry::facts::FactExtractor;
use mimicry::nlp::{Analyzer, RuleAnalyzer};

fn extract(db: &PatternDB, text: &str) {
    FactExtractor.extract(db, &RuleAnalyzer.analyze(text), "c1").unwrap();
}

#[test]
fn renaming_updates_one_fact() {
    let db = PatternDB::open(":memory:").unwrap();
    extract(&db, "My name is Alice");
    extract(&db, "My name is Alicia");
    let name = db.fact("c1", "name").unwrap().unwrap();
    assert_eq!(name.fact, "Alicia");
    assert_eq!(name.mentioned_count, 2);
    assert_eq!(db.facts("c1", None, 10).unwrap().iter().filter(|f| f.subject == "name").count(), 1);
}

#[test]
fn disclosure_is_stored_with_lower_confidence() {
    let db = PatternDB::open(":memory:").unwrap();
    extract(&db, "My family is huge and loud");
    let fam = db.fact("c1", "family").unwrap().unwrap();
    assert_eq!(fam.fact, "My family is huge and loud");
    assert!(fam.confidence < 0.8);
}

#[test]
fn short_text_stores_nothing() {
    let db = PatternDB::open(":memory:").unwrap();
    let stored = FactExtractor.extract(&db, &RuleAnalyzer.analyze("I'm Bob"), "c1").unwrap();
    assert!(stored.is_empty());
    assert_eq!(db.count_facts("c1").unwrap(), 0);
}

#[test]
fn facts_are_per_conversation() {
    let db = PatternDB::open(":memory:").unwrap();
    extract(&db, "My favorite food is ramen");
    assert_eq!(db.fact("c1", "preference_food").unwrap().unwrap().fact, "ramen");
    assert!(db.fact("c2", "preference_food").unwrap().is_none());
}
