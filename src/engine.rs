//! One utterance in, one reply out: learn, generate, recall or fall back,
//! style, persist.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::{
    now_ms, Counts, EmotionInput, EmotionSample, MemoryFact, PatternDB, PatternEntry, PatternKind, PhraseTemplate,
    Scope, Sender, VocabEntry,
};
use crate::emotion::{self, DominantEmotion, Emotion, EmotionReading, EmotionTimeline, EmotionalPatterns};
use crate::error::MimicError;
use crate::facts::{fact_phrase, relevant_facts, FactExtractor};
use crate::generate::{ResponseGenerator, Strategy};
use crate::learn::PatternLearner;
use crate::maturity::{self, MaturityReport, Stage};
use crate::nlp::{Analysis, Analyzer, PosTag};
use crate::similarity;
use crate::thresholds::{EMOTION_SAMPLE_CHARS, RECALL_SCAN_LIMIT, SPLICE_MAX_CHARS, SPLICE_MIN_CONFIDENCE};
use crate::util::clip_chars;

/// Where a reply's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    MemoryAnswer,
    Template,
    PosSequence,
    NGram,
    /// The reply that followed a near-identical earlier utterance.
    Recall,
    /// Stage phrase bank.
    Fallback,
}

impl From<Strategy> for ReplySource {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::MemoryAnswer => Self::MemoryAnswer,
            Strategy::Template => Self::Template,
            Strategy::PosSequence => Self::PosSequence,
            Strategy::NGram => Self::NGram,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionSummary {
    pub primary: Emotion,
    pub confidence: f64,
    pub intensity: f64,
}

impl From<&EmotionReading> for EmotionSummary {
    fn from(r: &EmotionReading) -> Self {
        Self { primary: r.primary, confidence: r.confidence, intensity: r.intensity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub confidence: f64,
    pub emotion: EmotionSummary,
    pub source: ReplySource,
    /// Stage of the conversation after this utterance.
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosCount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<PosTag>,
    pub words: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VocabularyStats {
    pub total_words: i64,
    pub total_occurrences: i64,
    pub by_pos: Vec<PosCount>,
    pub top_words: Vec<VocabEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStats {
    pub bigrams: i64,
    pub trigrams: i64,
    pub pos_sequences: i64,
    pub templates: i64,
    pub top_patterns: Vec<PatternEntry>,
    pub top_templates: Vec<PhraseTemplate>,
}

const TOP_N: usize = 10;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub struct Engine {
    db: Arc<PatternDB>,
    analyzer: Arc<dyn Analyzer>,
    config: EngineConfig,
    learner: PatternLearner,
    extractor: FactExtractor,
    generator: ResponseGenerator,
    rng: Mutex<StdRng>,
}

impl Engine {
    pub fn new(db: Arc<PatternDB>, analyzer: Arc<dyn Analyzer>, config: EngineConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| now_ms() as u64);
        Self {
            db,
            analyzer,
            learner: PatternLearner::new(),
            extractor: FactExtractor::new(),
            generator: ResponseGenerator::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn db(&self) -> &Arc<PatternDB> {
        &self.db
    }

    fn scope(&self, conversation_id: &str) -> Scope {
        Scope::new(conversation_id, self.config.mode.as_str())
    }

    /// Answer `utterance` in the configured mode. Always produces a reply.
    pub fn handle(&self, utterance: &str, conversation_id: &str) -> Reply {
        self.handle_in(utterance, &self.scope(conversation_id))
    }

    pub fn handle_in(&self, utterance: &str, scope: &Scope) -> Reply {
        let utterance = match validate(utterance) {
            Ok(u) => u,
            Err(e) => {
                tracing::debug!(conversation = %scope.conversation_id, error = %e, "rejected utterance");
                return self.empty_reply();
            }
        };

        let before = self.stage_or_infant(scope);
        let analysis = self.analyzer.analyze(utterance);
        self.learn(&analysis, scope);

        let reading = emotion::classify(utterance);
        let mut rng = self.call_rng();
        let (text, confidence, source) = self.compose(utterance, &analysis, scope, before, &mut rng);
        let text = if reading.primary != Emotion::Neutral && rng.random::<f64>() < self.config.style_rate {
            emotion::style(&text, reading.primary, reading.intensity)
        } else {
            text
        };

        let stage = self.persist(scope, utterance, &text, &reading, before);
        Reply { text, confidence, emotion: EmotionSummary::from(&reading), source, stage }
    }

    fn empty_reply(&self) -> Reply {
        let (text, confidence) = maturity::fallback(Stage::Infant, &mut self.call_rng());
        Reply {
            text: text.to_string(),
            confidence,
            emotion: EmotionSummary { primary: Emotion::Neutral, confidence: 1.0, intensity: 0.5 },
            source: ReplySource::Fallback,
            stage: Stage::Infant,
        }
    }

    /// Per-call generator seeded from the engine's. The shared lock is held
    /// only for the draw, never across store reads.
    fn call_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.rng.lock().random())
    }

    fn learn(&self, analysis: &Analysis, scope: &Scope) {
        for sentence in &analysis.sentences {
            if let Err(e) = self.learner.learn(&self.db, sentence, scope) {
                tracing::warn!(conversation = %scope.conversation_id, error = %e, "learning skipped");
            }
        }
        if let Err(e) = self.extractor.extract(&self.db, analysis, &scope.conversation_id) {
            tracing::warn!(conversation = %scope.conversation_id, error = %e, "fact extraction skipped");
        }
    }

    /// Generated reply, else recalled reply, else the stage fallback.
    fn compose(
        &self,
        utterance: &str,
        analysis: &Analysis,
        scope: &Scope,
        stage: Stage,
        rng: &mut StdRng,
    ) -> (String, f64, ReplySource) {
        if let Some(c) = self.generator.generate(&self.db, analysis, scope, rng) {
            if c.confidence > self.config.acceptance_bar {
                let text = self.splice_fact(&c.text, utterance, scope);
                return (text, c.confidence, c.strategy.into());
            }
            tracing::debug!(strategy = c.strategy.as_str(), confidence = c.confidence, "below acceptance bar");
        }
        if let Some((reply, sim)) = self.recall(utterance, scope) {
            let text = self.splice_fact(&reply, utterance, scope);
            return (text, sim, ReplySource::Recall);
        }
        let (text, confidence) = maturity::fallback(stage, rng);
        (text.to_string(), confidence, ReplySource::Fallback)
    }

    /// Best earlier engine reply to a near-identical partner utterance.
    fn recall(&self, utterance: &str, scope: &Scope) -> Option<(String, f64)> {
        let pairs = match self.db.answered_exchanges(scope, RECALL_SCAN_LIMIT) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(conversation = %scope.conversation_id, error = %e, "exchange recall failed");
                return None;
            }
        };
        let mut best: Option<(String, f64)> = None;
        for pair in pairs {
            let sim = similarity::compare(utterance, &pair.partner.content);
            if sim <= self.config.recall_similarity || best.as_ref().is_some_and(|(_, b)| sim <= *b) {
                continue;
            }
            best = Some((pair.reply.content, sim));
        }
        best
    }

    /// Append the most relevant confident fact when it fits and isn't
    /// already mentioned.
    fn splice_fact(&self, reply: &str, utterance: &str, scope: &Scope) -> String {
        let facts = match self.db.facts(&scope.conversation_id, None, 50) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(conversation = %scope.conversation_id, error = %e, "fact lookup failed");
                return reply.to_string();
            }
        };
        let confident: Vec<MemoryFact> =
            facts.into_iter().filter(|f| f.confidence >= SPLICE_MIN_CONFIDENCE).collect();
        let Some(fact) = relevant_facts(&confident, &format!("{utterance} {reply}"), 1).into_iter().next() else {
            return reply.to_string();
        };
        if reply.to_lowercase().contains(&fact.fact.to_lowercase()) {
            return reply.to_string();
        }
        let combined = format!("{} {}", reply.trim_end(), fact_phrase(&fact));
        if combined.chars().count() < SPLICE_MAX_CHARS {
            combined
        } else {
            reply.to_string()
        }
    }

    /// Store both sides and the emotion sample, then raise the stage mark.
    fn persist(&self, scope: &Scope, utterance: &str, reply: &str, reading: &EmotionReading, before: Stage) -> Stage {
        let reached = match self.db.counts(scope) {
            Ok(c) => maturity::stage_for(maturity::weighted_total(&c)),
            Err(e) => {
                tracing::warn!(conversation = %scope.conversation_id, error = %e, "counts unavailable");
                before
            }
        };
        let stage = reached.max(before);
        let result = self.db.write_tx(|w| {
            let partner_id = w.append_exchange(scope, Sender::Partner, utterance)?;
            w.append_exchange(scope, Sender::Engine, reply)?;
            w.append_emotion(
                &scope.conversation_id,
                &EmotionInput {
                    message_id: partner_id.to_string(),
                    primary: reading.primary,
                    confidence: reading.confidence,
                    intensity: reading.intensity,
                    scores: reading.scores,
                    text_sample: clip_chars(utterance, EMOTION_SAMPLE_CHARS),
                },
            )?;
            w.raise_stage(scope, stage)
        });
        match result {
            Ok(true) if stage > before => {
                tracing::info!(conversation = %scope.conversation_id, stage = %stage, "stage advanced");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(conversation = %scope.conversation_id, error = %e, "exchange not persisted"),
        }
        stage
    }

    fn stage_or_infant(&self, scope: &Scope) -> Stage {
        self.stage_in(scope).unwrap_or_else(|e| {
            tracing::warn!(conversation = %scope.conversation_id, error = %e, "stage unavailable");
            Stage::Infant
        })
    }

    fn stage_in(&self, scope: &Scope) -> Result<Stage, MimicError> {
        let counted = maturity::stage_for(maturity::weighted_total(&self.db.counts(scope)?));
        let marked = self.db.stage_mark(scope)?.unwrap_or(Stage::Infant);
        Ok(counted.max(marked))
    }

    pub fn maturity_stage(&self, conversation_id: &str) -> Result<Stage, MimicError> {
        self.stage_in(&self.scope(conversation_id))
    }

    pub fn maturity_report(&self, conversation_id: &str) -> Result<MaturityReport, MimicError> {
        let scope = self.scope(conversation_id);
        let counts: Counts = self.db.counts(&scope)?;
        Ok(maturity::report(self.stage_in(&scope)?, counts))
    }

    pub fn vocabulary_stats(&self, conversation_id: &str) -> Result<VocabularyStats, MimicError> {
        let scope = self.scope(conversation_id);
        Ok(VocabularyStats {
            total_words: self.db.count_vocab(&scope, None)?,
            total_occurrences: self.db.vocab_occurrences(&scope)?,
            by_pos: self
                .db
                .vocab_by_pos(&scope)?
                .into_iter()
                .map(|(pos, words)| PosCount { pos, words })
                .collect(),
            top_words: self.db.top_vocab(&scope, None, TOP_N)?,
        })
    }

    pub fn pattern_stats(&self, conversation_id: &str) -> Result<PatternStats, MimicError> {
        let scope = self.scope(conversation_id);
        Ok(PatternStats {
            bigrams: self.db.count_patterns(&scope, Some(PatternKind::Bigram))?,
            trigrams: self.db.count_patterns(&scope, Some(PatternKind::Trigram))?,
            pos_sequences: self.db.count_patterns(&scope, Some(PatternKind::PosSequence))?,
            templates: self.db.count_templates(&scope)?,
            top_patterns: self.db.top_patterns(&scope, None, TOP_N)?,
            top_templates: self.db.top_templates(&scope, TOP_N)?,
        })
    }

    pub fn fact_list(
        &self,
        conversation_id: &str,
        context_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryFact>, MimicError> {
        self.db.facts(conversation_id, context_tag, limit)
    }

    pub fn emotion_timeline(&self, conversation_id: &str, days: u32) -> Result<EmotionTimeline, MimicError> {
        let since = now_ms() - i64::from(days) * DAY_MS;
        Ok(emotion::timeline(&self.db.emotion_samples_since(conversation_id, since)?))
    }

    pub fn dominant_emotion(
        &self,
        conversation_id: &str,
        window_minutes: u32,
    ) -> Result<Option<DominantEmotion>, MimicError> {
        let since = now_ms() - i64::from(window_minutes) * 60_000;
        Ok(emotion::dominant(&self.db.emotion_samples_since(conversation_id, since)?))
    }

    pub fn emotional_patterns(&self, conversation_id: &str) -> Result<EmotionalPatterns, MimicError> {
        Ok(emotion::emotional_patterns(&self.db.emotion_samples_since(conversation_id, 0)?))
    }

    /// Newest first.
    pub fn recent_emotions(&self, conversation_id: &str, limit: usize) -> Result<Vec<EmotionSample>, MimicError> {
        self.db.recent_emotion_samples(conversation_id, limit)
    }
}

fn validate(utterance: &str) -> Result<&str, MimicError> {
    let trimmed = utterance.trim();
    if trimmed.is_empty() {
        return Err(MimicError::MalformedInput);
    }
    Ok(trimmed)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
