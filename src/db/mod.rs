//! SQLite-backed pattern store, scoped per conversation and mode.

mod exchanges;
mod facts;
mod patterns;
mod vocab;

pub use exchanges::ExchangePair;

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::emotion::{Emotion, EmotionScores};
use crate::error::MimicError;
use crate::maturity::Stage;
use crate::nlp::PosTag;
use crate::thresholds::WRITE_CONFLICT_ATTEMPTS;

/// Set busy_timeout on every connection handed out by the pool.
#[derive(Debug)]
struct BusyTimeoutCustomizer(Duration);

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for BusyTimeoutCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(self.0)?;
        Ok(())
    }
}

type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Which partner and which persona a row belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub conversation_id: String,
    pub mode: String,
}

impl Scope {
    pub fn new(conversation_id: impl Into<String>, mode: impl Into<String>) -> Self {
        Self { conversation_id: conversation_id.into(), mode: mode.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "2-gram")]
    Bigram,
    #[serde(rename = "3-gram")]
    Trigram,
    #[serde(rename = "pos_sequence")]
    PosSequence,
}

impl PatternKind {
    /// Only 2- and 3-grams are tracked.
    pub fn ngram(n: usize) -> Option<Self> {
        match n {
            2 => Some(Self::Bigram),
            3 => Some(Self::Trigram),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bigram => "2-gram",
            Self::Trigram => "3-gram",
            Self::PosSequence => "pos_sequence",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "2-gram" => Some(Self::Bigram),
            "3-gram" => Some(Self::Trigram),
            "pos_sequence" => Some(Self::PosSequence),
            _ => None,
        }
    }

    pub fn is_ngram(self) -> bool {
        !matches!(self, Self::PosSequence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub conversation_id: String,
    pub mode: String,
    pub word: String,
    pub frequency: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<PosTag>,
    pub first_seen: i64,
    pub last_seen: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub id: i64,
    pub conversation_id: String,
    pub mode: String,
    pub kind: PatternKind,
    pub pattern: String,
    pub frequency: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub first_seen: i64,
    pub last_seen: i64,
}

impl PatternEntry {
    /// POS tags of a `pos_sequence` pattern; empty for n-grams.
    pub fn tags(&self) -> Vec<PosTag> {
        if self.kind.is_ngram() {
            return Vec::new();
        }
        self.pattern.split(' ').filter_map(PosTag::parse).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseTemplate {
    pub id: i64,
    pub conversation_id: String,
    pub mode: String,
    pub template: String,
    pub pos_structure: Vec<PosTag>,
    pub frequency: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub first_seen: i64,
    pub last_seen: i64,
}

/// A durable fact about the partner, one row per subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub conversation_id: String,
    pub subject: String,
    pub fact: String,
    pub confidence: f64,
    pub priority: u8,
    pub mentioned_count: i64,
    pub context_tags: Vec<String>,
    pub source_text: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactInput {
    pub subject: String,
    pub fact: String,
    pub confidence: f64,
    pub priority: u8,
    #[serde(default)]
    pub context_tags: Vec<String>,
    #[serde(default)]
    pub source_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Partner,
    Engine,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Partner => "partner",
            Self::Engine => "engine",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "partner" => Some(Self::Partner),
            "engine" => Some(Self::Engine),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: i64,
    pub conversation_id: String,
    pub mode: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSample {
    pub id: i64,
    pub conversation_id: String,
    pub message_id: String,
    pub primary: Emotion,
    pub confidence: f64,
    pub intensity: f64,
    pub scores: EmotionScores,
    pub text_sample: String,
    pub created_at: i64,
}

/// What gets appended for one emotion reading.
#[derive(Debug, Clone)]
pub struct EmotionInput {
    pub message_id: String,
    pub primary: Emotion,
    pub confidence: f64,
    pub intensity: f64,
    pub scores: EmotionScores,
    pub text_sample: String,
}

/// Row counts that drive the maturity stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub vocabulary: i64,
    pub patterns: i64,
    pub templates: i64,
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vocabulary (
    conversation_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    word TEXT NOT NULL,
    frequency INTEGER NOT NULL DEFAULT 1,
    pos TEXT,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    PRIMARY KEY (conversation_id, mode, word)
);
CREATE INDEX IF NOT EXISTS idx_vocab_freq ON vocabulary(conversation_id, mode, frequency);
CREATE INDEX IF NOT EXISTS idx_vocab_pos ON vocabulary(conversation_id, mode, pos, frequency);

CREATE TABLE IF NOT EXISTS patterns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    kind TEXT NOT NULL,
    pattern TEXT NOT NULL,
    frequency INTEGER NOT NULL DEFAULT 1,
    example TEXT,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    UNIQUE (conversation_id, mode, pattern)
);
CREATE INDEX IF NOT EXISTS idx_patterns_freq ON patterns(conversation_id, mode, kind, frequency);

CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    template TEXT NOT NULL,
    pos_structure TEXT NOT NULL DEFAULT '[]',
    frequency INTEGER NOT NULL DEFAULT 1,
    example TEXT,
    first_seen INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    UNIQUE (conversation_id, mode, template)
);
CREATE INDEX IF NOT EXISTS idx_templates_freq ON templates(conversation_id, mode, frequency);

CREATE TABLE IF NOT EXISTS facts (
    conversation_id TEXT NOT NULL,
    subject TEXT NOT NULL,
    fact TEXT NOT NULL,
    confidence REAL NOT NULL,
    priority INTEGER NOT NULL DEFAULT 5,
    mentioned_count INTEGER NOT NULL DEFAULT 1,
    context_tags TEXT NOT NULL DEFAULT '[]',
    source_text TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (conversation_id, subject)
);

CREATE TABLE IF NOT EXISTS exchanges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    sender TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exchanges_conv ON exchanges(conversation_id, sender, id);

CREATE TABLE IF NOT EXISTS emotion_samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL,
    message_id TEXT NOT NULL,
    primary_emotion TEXT NOT NULL,
    confidence REAL NOT NULL,
    intensity REAL NOT NULL,
    scores TEXT NOT NULL DEFAULT '{}',
    text_sample TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_emotion_conv ON emotion_samples(conversation_id, created_at);

CREATE TABLE IF NOT EXISTS conversation_stage (
    conversation_id TEXT NOT NULL,
    mode TEXT NOT NULL,
    stage INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (conversation_id, mode)
);
"#;

/// SQLite-backed pattern store.
pub struct PatternDB {
    pool: Pool<SqliteConnectionManager>,
}

/// Handle passed to [`PatternDB::write_tx`] closures. Everything done through
/// it commits or rolls back together.
pub struct Writer<'c> {
    conn: &'c Connection,
}

impl PatternDB {
    fn conn(&self) -> Result<PooledConn, MimicError> {
        Ok(self.pool.get()?)
    }

    /// Open (or create) a database with default pool settings.
    pub fn open(path: &str) -> Result<Self, MimicError> {
        Self::open_with(path, &StoreConfig::default())
    }

    pub fn open_with(path: &str, cfg: &StoreConfig) -> Result<Self, MimicError> {
        let in_memory = path == ":memory:";
        let manager = if in_memory {
            // shared cache so all pool connections see one database; unique per open
            let name = uuid::Uuid::new_v4().to_string();
            SqliteConnectionManager::file(format!("file:{name}?mode=memory&cache=shared"))
        } else {
            SqliteConnectionManager::file(path)
        };
        let pool_size = if in_memory { 2 } else { cfg.pool_size.max(1) };
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_timeout(cfg.busy_timeout.max(Duration::from_millis(100)))
            .connection_customizer(Box::new(BusyTimeoutCustomizer(cfg.busy_timeout)))
            .build(manager)?;

        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);
        tracing::debug!(path, pool_size, "pattern store ready");
        Ok(Self { pool })
    }

    /// Run `f` inside `BEGIN IMMEDIATE`. Busy/locked/unique races are retried
    /// a few times; any other error rolls back and is returned.
    pub fn write_tx<T>(
        &self,
        mut f: impl FnMut(&Writer<'_>) -> Result<T, MimicError>,
    ) -> Result<T, MimicError> {
        let mut attempt = 1;
        loop {
            match self.try_write(&mut f) {
                Err(e) if e.is_conflict() && attempt < WRITE_CONFLICT_ATTEMPTS => {
                    tracing::debug!(attempt, error = %e, "write conflict, retrying");
                    std::thread::sleep(Duration::from_millis(20 * u64::from(attempt)));
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn try_write<T>(
        &self,
        f: &mut impl FnMut(&Writer<'_>) -> Result<T, MimicError>,
    ) -> Result<T, MimicError> {
        let conn = self.conn()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        let result = f(&Writer { conn: &conn });
        match result {
            Ok(v) => match conn.execute_batch("COMMIT") {
                Ok(()) => Ok(v),
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Weighted counts for the maturity stage, in one read.
    pub fn counts(&self, scope: &Scope) -> Result<Counts, MimicError> {
        let c = self.conn()?;
        let counts = c.query_row(
            "SELECT \
               (SELECT COUNT(*) FROM vocabulary WHERE conversation_id = ?1 AND mode = ?2), \
               (SELECT COUNT(*) FROM patterns WHERE conversation_id = ?1 AND mode = ?2), \
               (SELECT COUNT(*) FROM templates WHERE conversation_id = ?1 AND mode = ?2)",
            rusqlite::params![scope.conversation_id, scope.mode],
            |r| Ok(Counts { vocabulary: r.get(0)?, patterns: r.get(1)?, templates: r.get(2)? }),
        )?;
        Ok(counts)
    }

    /// Raw connection for tests that need to break things on purpose.
    #[doc(hidden)]
    pub fn execute_raw(&self, sql: &str) -> Result<(), MimicError> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }
}

fn pos_column(pos: Option<&str>) -> Option<PosTag> {
    pos.and_then(PosTag::parse)
}

fn tags_from_json(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn stage_from_row(v: i64) -> Stage {
    u8::try_from(v).ok().and_then(Stage::from_index).unwrap_or(Stage::Infant)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
