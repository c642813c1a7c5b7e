//! Turns tagged sentences into vocabulary, n-gram, POS-sequence and template
//! rows.
//!
//! Extraction is pure ([`LearnPlan::from_sentence`]); applying a plan is one
//! write transaction.

use crate::db::{PatternDB, PatternKind, Scope, Writer};
use crate::error::MimicError;
use crate::nlp::{Analyzer, PosTag, Sentence};
use crate::thresholds::{MIN_NGRAM_CHARS, MIN_POS_SEQUENCE_LEN, MIN_TEMPLATE_TOKENS};

/// Every upsert one sentence produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearnPlan {
    pub example: String,
    pub ngrams: Vec<(PatternKind, String)>,
    pub pos_sequence: Option<String>,
    pub template: Option<(String, Vec<PosTag>)>,
    pub vocabulary: Vec<(String, PosTag)>,
}

impl LearnPlan {
    pub fn from_sentence(sentence: &Sentence) -> Self {
        Self {
            example: sentence.text.trim().to_string(),
            ngrams: ngrams(sentence),
            pos_sequence: pos_sequence(sentence),
            template: template(sentence),
            vocabulary: vocabulary(sentence),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty() && self.pos_sequence.is_none() && self.template.is_none() && self.vocabulary.is_empty()
    }

    fn apply(&self, w: &Writer<'_>, scope: &Scope) -> Result<(), MimicError> {
        let example = (!self.example.is_empty()).then_some(self.example.as_str());
        for (kind, gram) in &self.ngrams {
            w.upsert_pattern(scope, *kind, gram, example)?;
        }
        if let Some(seq) = &self.pos_sequence {
            w.upsert_pattern(scope, PatternKind::PosSequence, seq, example)?;
        }
        if let Some((text, tags)) = &self.template {
            w.upsert_template(scope, text, tags, example)?;
        }
        for (word, pos) in &self.vocabulary {
            w.upsert_vocab(scope, word, Some(*pos))?;
        }
        Ok(())
    }
}

fn ngrams(sentence: &Sentence) -> Vec<(PatternKind, String)> {
    let words: Vec<&str> = sentence.words().map(|t| t.lower.as_str()).collect();
    let mut out = Vec::new();
    for n in 2..=3 {
        let Some(kind) = PatternKind::ngram(n) else { continue };
        for window in words.windows(n) {
            let gram = window.join(" ");
            if gram.chars().count() < MIN_NGRAM_CHARS {
                continue;
            }
            out.push((kind, gram));
        }
    }
    out
}

fn pos_sequence(sentence: &Sentence) -> Option<String> {
    let tags = sentence.tag_sequence();
    if tags.len() < MIN_POS_SEQUENCE_LEN {
        return None;
    }
    Some(tags.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(" "))
}

fn template(sentence: &Sentence) -> Option<(String, Vec<PosTag>)> {
    if sentence.tag_sequence().len() < MIN_TEMPLATE_TOKENS {
        return None;
    }
    let mut text = String::new();
    let mut tags = Vec::new();
    for t in &sentence.tokens {
        if t.is_content() {
            text.push_str(&t.pos.placeholder());
            tags.push(t.pos);
        } else {
            text.push_str(&t.text);
            // structure records words only
            if !t.is_space && !t.is_punct {
                tags.push(t.pos);
            }
        }
        text.push_str(&t.whitespace);
    }
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some((text, tags))
}

fn vocabulary(sentence: &Sentence) -> Vec<(String, PosTag)> {
    sentence
        .words()
        .filter(|t| !t.is_stop)
        .map(|t| (t.lower.trim().to_string(), t.pos))
        .filter(|(w, _)| !w.is_empty())
        .collect()
}

/// Learns from the partner's sentences.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternLearner;

impl PatternLearner {
    pub fn new() -> Self {
        Self
    }

    /// All upserts for `sentence` commit together or not at all.
    pub fn learn(&self, db: &PatternDB, sentence: &Sentence, scope: &Scope) -> Result<LearnPlan, MimicError> {
        let plan = LearnPlan::from_sentence(sentence);
        if plan.is_empty() {
            return Ok(plan);
        }
        db.write_tx(|w| plan.apply(w, scope))?;
        tracing::debug!(
            conversation = %scope.conversation_id,
            ngrams = plan.ngrams.len(),
            words = plan.vocabulary.len(),
            "learned sentence"
        );
        Ok(plan)
    }

    /// Analyze free text and learn each sentence. Returns how many sentences
    /// were learned.
    pub fn learn_text(
        &self,
        db: &PatternDB,
        analyzer: &dyn Analyzer,
        text: &str,
        scope: &Scope,
    ) -> Result<usize, MimicError> {
        let analysis = analyzer.analyze(text);
        let mut learned = 0;
        for sentence in &analysis.sentences {
            if !self.learn(db, sentence, scope)?.is_empty() {
                learned += 1;
            }
        }
        Ok(learned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::PosTag::*;

    #[test]
    fn short_ngrams_are_dropped() {
        let s = Sentence::tagged(&[("ok", Intj), ("a", Det)]);
        assert!(ngrams(&s).is_empty());
        let s = Sentence::tagged(&[("ok", Intj), ("ok", Intj)]);
        assert_eq!(ngrams(&s), vec![(PatternKind::Bigram, "ok ok".to_string())]);
    }

    #[test]
    fn punctuation_is_skipped_in_ngrams_but_tagged() {
        let s = Sentence::tagged(&[("I", Pron), ("like", Verb), ("cats", Noun), ("!", Punct)]);
        let grams: Vec<String> = ngrams(&s).into_iter().map(|(_, g)| g).collect();
        assert_eq!(grams, vec!["i like", "like cats", "i like cats"]);
        assert_eq!(pos_sequence(&s).as_deref(), Some("PRON VERB NOUN PUNCT"));
    }

    #[test]
    fn template_keeps_function_words_and_spacing() {
        let s = Sentence::tagged(&[("I", Pron), ("like", Verb), ("the", Det), ("cat", Noun), (".", Punct)]);
        let (text, tags) = template(&s).unwrap();
        assert_eq!(text, "I {VERB} the {NOUN}.");
        assert_eq!(tags, vec![Pron, Verb, Det, Noun]);
    }

    #[test]
    fn template_structure_skips_inner_punctuation() {
        let s = Sentence::tagged(&[("Well", Intj), (",", Punct), ("I", Pron), ("love", Verb), ("rain", Noun), ("!", Punct)]);
        let (text, tags) = template(&s).unwrap();
        assert_eq!(text, "Well, I {VERB} {NOUN}!");
        assert_eq!(tags, vec![Intj, Pron, Verb, Noun]);
    }

    #[test]
    fn short_sentences_make_no_template() {
        let s = Sentence::tagged(&[("I", Pron), ("like", Verb), ("cats", Noun)]);
        assert!(template(&s).is_none());
        assert!(pos_sequence(&s).is_some());
    }

    #[test]
    fn vocabulary_skips_stopwords_and_punctuation() {
        let s = Sentence::tagged(&[("I", Pron), ("like", Verb), ("the", Det), ("Cat", Noun), ("!", Punct)]);
        assert_eq!(vocabulary(&s), vec![("like".to_string(), Verb), ("cat".to_string(), Noun)]);
    }
}
