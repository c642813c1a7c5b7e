//! Durable facts about the partner: extraction from utterances, relevance
//! scoring, and the sentences used to splice them into replies.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::db::{FactInput, MemoryFact, PatternDB};
use crate::error::MimicError;
use crate::nlp::{Analysis, EntityLabel, PosTag, Sentence};
use crate::thresholds::{
    DEFAULT_FACT_PRIORITY, DIRECT_FACT_CONFIDENCE, DISCLOSURE_CONFIDENCE, MIN_FACT_TEXT_CHARS,
    NAME_DISCLOSURE_CONFIDENCE, PLACE_DISCLOSURE_CONFIDENCE,
};

struct DirectPattern {
    re: Regex,
    subject: &'static str,
}

/// Pattern order matters: earlier subjects are emitted first.
static DIRECT: LazyLock<Vec<DirectPattern>> = LazyLock::new(|| {
    vec![
        DirectPattern {
            re: Regex::new(r"(?i)\b(?:my name is|call me|i'm called|i am called)\s+([\p{L}][\p{L}'-]*)").unwrap(),
            subject: "name",
        },
        DirectPattern {
            re: Regex::new(r"(?i)\b(?:i am|i'm)\s+(\d{1,3})\b(?:\s+years?\s+old)?").unwrap(),
            subject: "age",
        },
        DirectPattern {
            re: Regex::new(r"(?i)\b(?:i live in|i'm from|i am from|i live at)\s+([\p{L}][\p{L}\s'-]*)").unwrap(),
            subject: "location",
        },
        DirectPattern {
            re: Regex::new(r"(?i)\b(?:i work as|my job is|i'm an?|i am an?)\s+([\p{L}][\p{L}\s'-]*)").unwrap(),
            subject: "occupation",
        },
        DirectPattern {
            re: Regex::new(r"(?i)\b(?:i enjoy|i like|my hobby is|my hobbies are)\s+([\p{L}][\p{L}\s'-]*)").unwrap(),
            subject: "hobby",
        },
    ]
});

/// "my favorite <category> is <value>" becomes `preference_<category>`.
static PREFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmy favou?rite\s+([\p{L}]+(?:\s[\p{L}]+)?)\s+(?:is|are)\s+([\p{L}][\p{L}\s'-]*)").unwrap()
});

/// Subject → keywords that hint at a self-disclosure about it.
const DISCLOSURES: [(&str, &[&str]); 9] = [
    ("name", &["name", "call me", "called"]),
    ("age", &["age", "years old", "birthday", "born"]),
    ("location", &["live in", "living in", "located in", "from", "city", "state", "country"]),
    ("occupation", &["work as", "job", "profession", "occupation", "career", "employed", "working as"]),
    ("hobby", &["hobby", "hobbies", "like to", "enjoy", "leisure", "free time", "passion"]),
    ("family", &["family", "married", "children", "parents", "siblings", "spouse", "daughter", "son"]),
    ("pet", &["pet", "dog", "cat", "animal", "companion"]),
    ("education", &["school", "college", "university", "study", "studied", "degree", "education"]),
    ("preference", &["favorite", "prefer", "like", "love", "hate", "dislike", "enjoy"]),
];

const FIRST_PERSON: [&str; 9] = ["i", "me", "my", "mine", "myself", "i'm", "i've", "i'll", "i'd"];

/// Words that end the clause a captured value belongs to.
const CLAUSE_BREAKS: [&str; 6] = ["and", "but", "because", "so", "or", "which"];

/// Drop anything after a conjunction and trailing separators.
fn trim_value(raw: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for w in raw.split_whitespace() {
        if CLAUSE_BREAKS.contains(&w.to_lowercase().as_str()) {
            break;
        }
        kept.push(w);
    }
    kept.join(" ").trim_end_matches([',', ';', ':', '-', '\'']).trim().to_string()
}

fn lower_words(sentence: &Sentence) -> Vec<String> {
    sentence.words().map(|t| t.lower.replace('’', "'")).collect()
}

fn has_phrase(words: &[String], phrase: &str) -> bool {
    let parts: Vec<&str> = phrase.split(' ').collect();
    words.windows(parts.len()).any(|w| w.iter().zip(&parts).all(|(a, b)| a == b))
}

fn is_first_person(words: &[String]) -> bool {
    words.iter().any(|w| FIRST_PERSON.contains(&w.as_str()))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FactExtractor;

impl FactExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Candidate facts in `analysis`, at most one per subject.
    pub fn candidates(&self, analysis: &Analysis) -> Vec<FactInput> {
        let text = analysis.text.trim();
        if text.chars().count() < MIN_FACT_TEXT_CHARS {
            return Vec::new();
        }
        let mut found = self.direct(text);
        found.extend(self.disclosures(analysis));
        merge_by_subject(found)
    }

    fn direct(&self, text: &str) -> Vec<FactInput> {
        let text = text.replace('’', "'");
        let mut out = Vec::new();
        for p in DIRECT.iter() {
            for caps in p.re.captures_iter(&text) {
                let value = trim_value(&caps[1]);
                if value.is_empty() {
                    continue;
                }
                out.push(direct_fact(p.subject.to_string(), value, &caps[0]));
            }
        }
        for caps in PREFERENCE.captures_iter(&text) {
            let value = trim_value(&caps[2]);
            if value.is_empty() {
                continue;
            }
            let category = caps[1].to_lowercase().replace(' ', "_");
            out.push(direct_fact(format!("preference_{category}"), value, &caps[0]));
        }
        out
    }

    fn disclosures(&self, analysis: &Analysis) -> Vec<FactInput> {
        // questions ask about the partner, they don't disclose anything
        let sentences: Vec<(&Sentence, Vec<String>)> = analysis
            .sentences
            .iter()
            .filter(|s| !s.text.trim_end().ends_with('?'))
            .map(|s| (s, lower_words(s)))
            .collect();
        if !sentences.iter().any(|(_, w)| is_first_person(w)) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for (subject, keywords) in DISCLOSURES {
            let hit = sentences
                .iter()
                .find(|(_, w)| is_first_person(w) && keywords.iter().any(|k| has_phrase(w, k)));
            let Some((sentence, _)) = hit else { continue };
            if let Some(fact) = disclosure_fact(subject, sentence) {
                out.push(fact);
            }
        }
        out
    }

    /// Extract and store in one transaction. Returns the stored rows.
    pub fn extract(
        &self,
        db: &PatternDB,
        analysis: &Analysis,
        conversation_id: &str,
    ) -> Result<Vec<MemoryFact>, MimicError> {
        let found = self.candidates(analysis);
        if found.is_empty() {
            return Ok(Vec::new());
        }
        let stored: Vec<MemoryFact> = db.write_tx(|w| found.iter().map(|f| w.upsert_fact(conversation_id, f)).collect())?;
        tracing::debug!(conversation = conversation_id, facts = stored.len(), "facts stored");
        Ok(stored)
    }
}

fn direct_fact(subject: String, fact: String, source: &str) -> FactInput {
    FactInput {
        context_tags: vec!["general".into(), subject.clone()],
        subject,
        fact,
        confidence: DIRECT_FACT_CONFIDENCE,
        priority: DEFAULT_FACT_PRIORITY,
        source_text: source.trim().to_string(),
    }
}

fn disclosure_fact(subject: &str, sentence: &Sentence) -> Option<FactInput> {
    let (fact, confidence, tags) = match subject {
        "name" => {
            let names: Vec<&str> =
                sentence.tokens.iter().filter(|t| t.pos == PosTag::Propn).map(|t| t.text.as_str()).collect();
            if names.is_empty() {
                return None;
            }
            (names.join(" "), NAME_DISCLOSURE_CONFIDENCE, vec!["general", "personal", "name"])
        }
        "location" => match sentence.entities.iter().find(|e| e.label == EntityLabel::Place) {
            Some(place) => (place.text.clone(), PLACE_DISCLOSURE_CONFIDENCE, vec!["general", "location"]),
            None => (sentence.text.clone(), DISCLOSURE_CONFIDENCE, vec!["general", "location"]),
        },
        other => (sentence.text.clone(), DISCLOSURE_CONFIDENCE, vec!["general", other]),
    };
    Some(FactInput {
        subject: subject.to_string(),
        fact,
        confidence,
        priority: DEFAULT_FACT_PRIORITY,
        context_tags: tags.into_iter().map(String::from).collect(),
        source_text: sentence.text.clone(),
    })
}

/// One candidate per subject: the most confident reading (first on ties),
/// carrying the union of everyone's tags.
fn merge_by_subject(found: Vec<FactInput>) -> Vec<FactInput> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, FactInput> = HashMap::new();
    for f in found {
        match best.get_mut(&f.subject) {
            None => {
                order.push(f.subject.clone());
                best.insert(f.subject.clone(), f);
            }
            Some(cur) => {
                let mut tags = cur.context_tags.clone();
                for t in &f.context_tags {
                    if !tags.contains(t) {
                        tags.push(t.clone());
                    }
                }
                if f.confidence > cur.confidence {
                    *cur = f;
                }
                cur.context_tags = tags;
            }
        }
    }
    order.into_iter().filter_map(|s| best.remove(&s)).collect()
}

fn relevance(fact: &MemoryFact, text_lower: &str, text_words: &HashSet<&str>) -> f64 {
    let mut score = 0.0;
    if text_lower.contains(&fact.subject) {
        score += 3.0;
    }
    let fact_lower = fact.fact.to_lowercase();
    let fact_words: HashSet<&str> = fact_lower.split_whitespace().collect();
    score += fact_words.intersection(text_words).count() as f64;
    score += f64::from(fact.priority) * 0.5;
    score += fact.mentioned_count as f64 * 0.2;
    if score == 0.0 {
        score = 0.1 + f64::from(fact.priority) / 10.0;
    }
    score
}

/// Facts ranked by relevance to `text`, best first.
pub fn relevant_facts(facts: &[MemoryFact], text: &str, limit: usize) -> Vec<MemoryFact> {
    let text_lower = text.to_lowercase();
    let text_words: HashSet<&str> = text_lower.split_whitespace().collect();
    let mut scored: Vec<(f64, &MemoryFact)> =
        facts.iter().map(|f| (relevance(f, &text_lower, &text_words), f)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, f)| f.clone()).collect()
}

/// The sentence that mentions `fact` in a reply.
pub fn fact_phrase(fact: &MemoryFact) -> String {
    match fact.subject.as_str() {
        "name" => format!("I remember your name is {}.", fact.fact),
        "location" => format!("You mentioned you're from {}.", fact.fact),
        "hobby" => format!("I recall you enjoy {}.", fact.fact),
        "occupation" => format!("You work as {}, right?", fact.fact),
        "age" => format!("You told me you're {}.", fact.fact),
        s => match s.strip_prefix("preference_") {
            Some(category) => format!("I remember your favorite {} is {}.", category.replace('_', " "), fact.fact),
            None => format!("I remember that {}.", fact.fact.trim_end_matches(['.', '!', '?'])),
        },
    }
}
