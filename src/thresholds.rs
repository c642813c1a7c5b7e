//! Tunable constants shared across learning, generation and orchestration.
//!
//! Confidences and similarities are all on a 0..=1 scale.

/// N-grams (joined with single spaces) shorter than this are noise
pub const MIN_NGRAM_CHARS: usize = 5;

/// POS sequences need at least this many tags to count as a fingerprint
pub const MIN_POS_SEQUENCE_LEN: usize = 3;

/// Sentences with fewer (non-space) tokens don't yield a phrase template
pub const MIN_TEMPLATE_TOKENS: usize = 4;

/// Memory answers: question about a stored fact
pub const MEMORY_ANSWER_MIN: f64 = 0.5;
pub const MEMORY_ANSWER_CONFIDENCE: f64 = 0.9;
pub const MEMORY_ANSWER_EMPTY_CONFIDENCE: f64 = 0.7;

/// Template fill: needs frequent templates and a decent vocabulary pool
pub const TEMPLATE_MIN: f64 = 0.7;
pub const TEMPLATE_POOL: usize = 10;
pub const TEMPLATE_VOCAB_POOL: usize = 50;

/// POS-sequence match: LCS ratio against the input's tag sequence
pub const POS_SEQUENCE_MIN: f64 = 0.6;
pub const POS_SEQUENCE_POOL: usize = 20;
pub const POS_MATCH_MIN_SCORE: f64 = 0.3;

/// N-gram retrieval: per-token containment lookups
pub const NGRAM_MIN: f64 = 0.5;
pub const NGRAM_PER_TOKEN: usize = 5;

/// Orchestrator: a generated response must beat this to be used
pub const ACCEPTANCE_BAR: f64 = 0.6;

/// Orchestrator: near-duplicate partner utterance replay
pub const RECALL_SIM: f64 = 0.6;
pub const RECALL_SCAN_LIMIT: usize = 500;

/// Orchestrator: chance of styling a reply with the partner's emotion
pub const STYLE_RATE: f64 = 0.5;

/// Fact splice: only confident facts, only into short replies
pub const SPLICE_MIN_CONFIDENCE: f64 = 0.7;
pub const SPLICE_MAX_CHARS: usize = 100;

/// Facts: direct statements beat inferred self-disclosures
pub const DIRECT_FACT_CONFIDENCE: f64 = 0.8;
pub const NAME_DISCLOSURE_CONFIDENCE: f64 = 0.7;
pub const PLACE_DISCLOSURE_CONFIDENCE: f64 = 0.7;
pub const DISCLOSURE_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_FACT_PRIORITY: u8 = 5;
pub const MIN_FACT_TEXT_CHARS: usize = 10;

/// Emotion: neutral bucket never scores below this
pub const NEUTRAL_FLOOR: f64 = 0.3;

/// Emotion samples keep a short excerpt of the utterance
pub const EMOTION_SAMPLE_CHARS: usize = 255;

/// Store: attempts for a write transaction that keeps hitting busy/locked
pub const WRITE_CONFLICT_ATTEMPTS: u32 = 3;
