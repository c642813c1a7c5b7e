//! Reply generation from learned material.
//!
//! Strategies are tried in [`Strategy::ORDER`]; the first whose candidate
//! clears that strategy's own bar wins.

use rand::rngs::StdRng;
use rand::RngExt;
use serde::Serialize;
use std::collections::HashSet;

use crate::db::{MemoryFact, PatternDB, PatternKind, Scope};
use crate::error::MimicError;
use crate::nlp::{Analysis, PosTag};
use crate::similarity;
use crate::thresholds::{
    MEMORY_ANSWER_CONFIDENCE, MEMORY_ANSWER_EMPTY_CONFIDENCE, MEMORY_ANSWER_MIN, NGRAM_MIN, NGRAM_PER_TOKEN,
    POS_MATCH_MIN_SCORE, POS_SEQUENCE_MIN, POS_SEQUENCE_POOL, TEMPLATE_MIN, TEMPLATE_POOL, TEMPLATE_VOCAB_POOL,
};
use crate::util::capitalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    MemoryAnswer,
    Template,
    PosSequence,
    NGram,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [Strategy::MemoryAnswer, Strategy::Template, Strategy::PosSequence, Strategy::NGram];

    /// Minimum confidence for this strategy's candidate to be used.
    pub fn threshold(self) -> f64 {
        match self {
            Strategy::MemoryAnswer => MEMORY_ANSWER_MIN,
            Strategy::Template => TEMPLATE_MIN,
            Strategy::PosSequence => POS_SEQUENCE_MIN,
            Strategy::NGram => NGRAM_MIN,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::MemoryAnswer => "memory_answer",
            Strategy::Template => "template",
            Strategy::PosSequence => "pos_sequence",
            Strategy::NGram => "ngram",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub text: String,
    pub confidence: f64,
    pub strategy: Strategy,
}

impl Candidate {
    fn new(text: impl Into<String>, confidence: f64, strategy: Strategy) -> Self {
        Self { text: text.into(), confidence: confidence.clamp(0.0, 1.0), strategy }
    }
}

const QUESTION_STARTERS: [&str; 18] = [
    "what", "who", "where", "when", "why", "how", "is", "are", "can", "could", "would", "will", "do", "does", "did",
    "tell me", "i want to know", "please tell",
];

const RECALL_PHRASES: [&str; 3] = ["what do you know", "what do you remember", "what have i told you"];

const NOTHING_YET: &str = "I don't know much about you yet. Tell me about yourself!";

const FAVORITE_CATEGORIES: [&str; 8] = ["color", "colour", "food", "movie", "book", "music", "song", "place"];

fn is_question(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    if t.ends_with('?') {
        return true;
    }
    QUESTION_STARTERS.iter().any(|q| t == *q || t.starts_with(&format!("{q} ")))
}

fn has_word(words: &[&str], w: &str) -> bool {
    words.contains(&w)
}

/// Topic of a question about the partner, as a fact subject.
fn question_subject(lower: &str) -> Option<String> {
    let words: Vec<&str> =
        lower.split(|c: char| !c.is_alphanumeric() && c != '\'').filter(|w| !w.is_empty()).collect();
    if !["my", "i", "me", "i'm"].iter().any(|w| has_word(&words, w)) {
        return None;
    }
    if let Some(i) = words.iter().position(|w| *w == "favorite" || *w == "favourite") {
        let category = words
            .get(i + 1)
            .copied()
            .filter(|c| FAVORITE_CATEGORIES.contains(c))
            .map_or("any", |c| if c == "colour" { "color" } else { c });
        return Some(format!("preference_{category}"));
    }
    if has_word(&words, "name") || lower.contains("call me") || lower.contains("who am i") {
        return Some("name".into());
    }
    if has_word(&words, "age") || lower.contains("how old") {
        return Some("age".into());
    }
    if ["live", "location", "city", "country", "where"].iter().any(|w| has_word(&words, w)) {
        return Some("location".into());
    }
    if ["job", "work", "profession", "occupation"].iter().any(|w| has_word(&words, w)) {
        return Some("occupation".into());
    }
    if ["hobby", "hobbies", "enjoy"].iter().any(|w| has_word(&words, w)) || lower.contains("like to") {
        return Some("hobby".into());
    }
    None
}

fn answer_clause(fact: &MemoryFact) -> String {
    match fact.subject.as_str() {
        "name" => format!("your name is {}", fact.fact),
        "age" => format!("you are {} years old", fact.fact),
        "location" => format!("you live in {}", fact.fact),
        "occupation" => format!("you work as {}", fact.fact),
        "hobby" => format!("you enjoy {}", fact.fact),
        s => match s.strip_prefix("preference_") {
            Some(c) => format!("your favorite {} is {}", c.replace('_', " "), fact.fact),
            None => fact.fact.trim_end_matches(['.', '!', '?']).to_string(),
        },
    }
}

/// Text that repeats the whole input, or one of its sentences.
fn echoes(input: &Analysis, text: &str) -> bool {
    similarity::compare(text, &input.text) == 1.0
        || input.sentences.iter().any(|s| similarity::compare(text, &s.text) == 1.0)
}

/// Frequency-weighted choice; every item weighs at least 1.
fn weighted_pick<'a, T>(items: &'a [T], weight: impl Fn(&T) -> i64, rng: &mut StdRng) -> Option<&'a T> {
    let total: u64 = items.iter().map(|i| weight(i).max(1) as u64).sum();
    if total == 0 {
        return None;
    }
    let mut r = rng.random_range(0..total);
    for item in items {
        let w = weight(item).max(1) as u64;
        if r < w {
            return Some(item);
        }
        r -= w;
    }
    items.last()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseGenerator;

impl ResponseGenerator {
    pub fn new() -> Self {
        Self
    }

    /// First strategy whose candidate clears its bar, skipping any candidate
    /// that just repeats the input.
    pub fn generate(&self, db: &PatternDB, input: &Analysis, scope: &Scope, rng: &mut StdRng) -> Option<Candidate> {
        for strategy in Strategy::ORDER {
            let Some(c) = self.run(strategy, db, input, scope, rng) else {
                continue;
            };
            if echoes(input, &c.text) {
                tracing::debug!(strategy = strategy.as_str(), "candidate echoes input, skipped");
                continue;
            }
            if c.confidence >= strategy.threshold() {
                tracing::debug!(strategy = strategy.as_str(), confidence = c.confidence, "candidate accepted");
                return Some(c);
            }
            tracing::debug!(strategy = strategy.as_str(), confidence = c.confidence, "candidate below bar");
        }
        None
    }

    /// One strategy, no threshold. Storage errors yield `None`.
    pub fn run(
        &self,
        strategy: Strategy,
        db: &PatternDB,
        input: &Analysis,
        scope: &Scope,
        rng: &mut StdRng,
    ) -> Option<Candidate> {
        let result = match strategy {
            Strategy::MemoryAnswer => self.memory_answer(db, input, scope),
            Strategy::Template => self.template(db, scope, rng),
            Strategy::PosSequence => self.pos_sequence(db, input, scope),
            Strategy::NGram => self.ngram(db, input, scope, rng),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(strategy = strategy.as_str(), error = %e, "strategy failed");
            None
        })
    }

    fn memory_answer(&self, db: &PatternDB, input: &Analysis, scope: &Scope) -> Result<Option<Candidate>, MimicError> {
        if !is_question(&input.text) {
            return Ok(None);
        }
        let lower = input.text.trim().to_lowercase().replace('’', "'");
        let conv = scope.conversation_id.as_str();

        if RECALL_PHRASES.iter().any(|p| lower.contains(p)) {
            let facts = db.facts(conv, None, 5)?;
            if facts.is_empty() {
                return Ok(Some(Candidate::new(NOTHING_YET, MEMORY_ANSWER_EMPTY_CONFIDENCE, Strategy::MemoryAnswer)));
            }
            let clauses: Vec<String> = facts.iter().map(answer_clause).collect();
            let joined = match clauses.as_slice() {
                [one] => one.clone(),
                [init @ .., last] => format!("{}, and {}", init.join(", "), last),
                [] => return Ok(None),
            };
            let text = format!("I remember that {joined}.");
            return Ok(Some(Candidate::new(text, MEMORY_ANSWER_CONFIDENCE, Strategy::MemoryAnswer)));
        }

        let Some(subject) = question_subject(&lower) else {
            return Ok(None);
        };
        let fact = if subject == "preference_any" {
            db.facts(conv, None, 50)?.into_iter().find(|f| f.subject.starts_with("preference_"))
        } else {
            db.fact(conv, &subject)?
        };
        Ok(fact.map(|f| {
            let text = format!("{}.", capitalize(&answer_clause(&f)));
            Candidate::new(text, MEMORY_ANSWER_CONFIDENCE, Strategy::MemoryAnswer)
        }))
    }

    fn template(&self, db: &PatternDB, scope: &Scope, rng: &mut StdRng) -> Result<Option<Candidate>, MimicError> {
        let templates = db.top_templates(scope, TEMPLATE_POOL)?;
        let Some(chosen) = weighted_pick(&templates, |t| t.frequency, rng) else {
            return Ok(None);
        };

        let mut pools: Vec<(PosTag, Vec<String>)> = Vec::with_capacity(PosTag::CONTENT.len());
        for tag in PosTag::CONTENT {
            let words = db.top_vocab(scope, Some(tag), TEMPLATE_VOCAB_POOL)?.into_iter().map(|v| v.word).collect();
            pools.push((tag, words));
        }
        let pool_size: usize = pools.iter().map(|(_, w)| w.len()).sum();

        let text = fill_template(&chosen.template, &pools, rng);
        let confidence = 0.1 + (0.1 * chosen.frequency.min(4) as f64).min(0.4) + (0.01 * pool_size as f64).min(0.5);
        Ok(Some(Candidate::new(text, confidence, Strategy::Template)))
    }

    fn pos_sequence(&self, db: &PatternDB, input: &Analysis, scope: &Scope) -> Result<Option<Candidate>, MimicError> {
        let input_tags = input.tag_sequence();
        if input_tags.is_empty() {
            return Ok(None);
        }
        let patterns = db.top_patterns(scope, Some(PatternKind::PosSequence), POS_SEQUENCE_POOL)?;
        let mut best: Option<(f64, &crate::db::PatternEntry)> = None;
        for p in &patterns {
            let tags = p.tags();
            if tags.is_empty() || p.example.as_deref().is_some_and(|e| echoes(input, e)) {
                continue;
            }
            let score = similarity::lcs_len(&input_tags, &tags) as f64 / input_tags.len().max(tags.len()) as f64;
            // first of equal scores stays
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, p));
            }
        }
        let Some((score, pattern)) = best.filter(|(s, _)| *s >= POS_MATCH_MIN_SCORE) else {
            return Ok(None);
        };
        let Some(example) = pattern.example.clone() else {
            return Ok(None);
        };
        let confidence = 0.1 + (0.1 * pattern.frequency as f64).min(0.5) + score;
        Ok(Some(Candidate::new(example, confidence, Strategy::PosSequence)))
    }

    fn ngram(
        &self,
        db: &PatternDB,
        input: &Analysis,
        scope: &Scope,
        rng: &mut StdRng,
    ) -> Result<Option<Candidate>, MimicError> {
        let mut seen: HashSet<i64> = HashSet::new();
        let mut found = Vec::new();
        let words: Vec<&str> = input.sentences.iter().flat_map(|s| s.words()).map(|t| t.lower.as_str()).collect();
        for word in words {
            for p in db.patterns_containing(scope, word, NGRAM_PER_TOKEN)? {
                let parrot = echoes(input, p.example.as_deref().unwrap_or(&p.pattern));
                if !parrot && seen.insert(p.id) {
                    found.push(p);
                }
            }
        }
        let Some(chosen) = weighted_pick(&found, |p| p.frequency, rng) else {
            return Ok(None);
        };
        let text = chosen.example.clone().unwrap_or_else(|| chosen.pattern.clone());
        let confidence = 0.1 + (0.1 * chosen.frequency as f64).min(0.5);
        Ok(Some(Candidate::new(text, confidence, Strategy::NGram)))
    }
}

/// Replace each `{TAG}` left to right with a uniformly sampled word of that
/// tag, or the lowercase tag name when none are known.
fn fill_template(template: &str, pools: &[(PosTag, Vec<String>)], rng: &mut StdRng) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        let Some(close) = after.find('}') else {
            out.push_str(after);
            return out;
        };
        let name = &after[1..close];
        match PosTag::parse(name).filter(|t| t.is_content()) {
            Some(tag) => {
                let words = pools.iter().find(|(t, _)| *t == tag).map(|(_, w)| w.as_slice()).unwrap_or(&[]);
                let word = if words.is_empty() {
                    name.to_lowercase()
                } else {
                    words[rng.random_range(0..words.len())].clone()
                };
                if out.is_empty() {
                    out.push_str(&capitalize(&word));
                } else {
                    out.push_str(&word);
                }
            }
            None => out.push_str(&after[..=close]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
