//! Append-only logs (exchanges, emotion samples) and the stage high-water mark.

use rusqlite::{params, OptionalExtension};

use super::*;

/// A partner utterance and the engine reply that followed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangePair {
    pub partner: Exchange,
    pub reply: Exchange,
}

fn row_to_exchange(row: &rusqlite::Row) -> rusqlite::Result<Exchange> {
    let sender: String = row.get("sender")?;
    Ok(Exchange {
        id: row.get("id")?,
        conversation_id: row.get("conversation_id")?,
        mode: row.get("mode")?,
        sender: Sender::parse(&sender).unwrap_or(Sender::Partner),
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_sample(row: &rusqlite::Row) -> rusqlite::Result<EmotionSample> {
    let primary: String = row.get("primary_emotion")?;
    let scores: String = row.get("scores")?;
    Ok(EmotionSample {
        id: row.get("id")?,
        conversation_id: row.get("conversation_id")?,
        message_id: row.get("message_id")?,
        primary: Emotion::parse(&primary).unwrap_or(Emotion::Neutral),
        confidence: row.get("confidence")?,
        intensity: row.get("intensity")?,
        scores: serde_json::from_str(&scores).unwrap_or_default(),
        text_sample: row.get("text_sample")?,
        created_at: row.get("created_at")?,
    })
}

const EXCHANGE_COLS: &str = "id, conversation_id, mode, sender, content, created_at";
const SAMPLE_COLS: &str = "id, conversation_id, message_id, primary_emotion, confidence, intensity, \
                           scores, text_sample, created_at";

impl Writer<'_> {
    pub fn append_exchange(&self, scope: &Scope, sender: Sender, content: &str) -> Result<i64, MimicError> {
        self.conn.execute(
            "INSERT INTO exchanges (conversation_id, mode, sender, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![scope.conversation_id, scope.mode, sender.as_str(), content, now_ms()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn append_emotion(&self, conversation_id: &str, sample: &EmotionInput) -> Result<i64, MimicError> {
        let scores = serde_json::to_string(&sample.scores).map_err(|e| MimicError::Internal(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO emotion_samples \
             (conversation_id, message_id, primary_emotion, confidence, intensity, scores, text_sample, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                conversation_id,
                sample.message_id,
                sample.primary.as_str(),
                sample.confidence,
                sample.intensity,
                scores,
                sample.text_sample,
                now_ms()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Move the stored stage up to `stage`. Returns true if it changed.
    pub fn raise_stage(&self, scope: &Scope, stage: Stage) -> Result<bool, MimicError> {
        let n = self.conn.execute(
            "INSERT INTO conversation_stage (conversation_id, mode, stage, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(conversation_id, mode) DO UPDATE SET \
               stage = excluded.stage, updated_at = excluded.updated_at \
             WHERE excluded.stage > conversation_stage.stage",
            params![scope.conversation_id, scope.mode, i64::from(stage.index()), now_ms()],
        )?;
        Ok(n > 0)
    }
}

impl PatternDB {
    pub fn append_exchange(&self, scope: &Scope, sender: Sender, content: &str) -> Result<i64, MimicError> {
        self.write_tx(|w| w.append_exchange(scope, sender, content))
    }

    /// Most recent exchanges first.
    pub fn recent_exchanges(&self, scope: &Scope, limit: usize) -> Result<Vec<Exchange>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {EXCHANGE_COLS} FROM exchanges WHERE conversation_id = ?1 AND mode = ?2 \
             ORDER BY id DESC LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![scope.conversation_id, scope.mode, limit as i64], row_to_exchange)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Partner utterances that got an engine reply, newest first.
    pub fn answered_exchanges(&self, scope: &Scope, limit: usize) -> Result<Vec<ExchangePair>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(
            "SELECT p.id, p.conversation_id, p.mode, p.content, p.created_at, \
                    r.id, r.content, r.created_at \
             FROM exchanges p \
             JOIN exchanges r ON r.id = ( \
                 SELECT MIN(e.id) FROM exchanges e \
                 WHERE e.conversation_id = p.conversation_id AND e.mode = p.mode \
                   AND e.sender = 'engine' AND e.id > p.id) \
             WHERE p.conversation_id = ?1 AND p.mode = ?2 AND p.sender = 'partner' \
             ORDER BY p.id DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![scope.conversation_id, scope.mode, limit as i64], |r| {
                let conversation_id: String = r.get(1)?;
                let mode: String = r.get(2)?;
                Ok(ExchangePair {
                    partner: Exchange {
                        id: r.get(0)?,
                        conversation_id: conversation_id.clone(),
                        mode: mode.clone(),
                        sender: Sender::Partner,
                        content: r.get(3)?,
                        created_at: r.get(4)?,
                    },
                    reply: Exchange {
                        id: r.get(5)?,
                        conversation_id,
                        mode,
                        sender: Sender::Engine,
                        content: r.get(6)?,
                        created_at: r.get(7)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_exchanges(&self, scope: &Scope) -> Result<i64, MimicError> {
        let c = self.conn()?;
        let n = c.query_row(
            "SELECT COUNT(*) FROM exchanges WHERE conversation_id = ?1 AND mode = ?2",
            params![scope.conversation_id, scope.mode],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Samples at or after `since_ms`, oldest first.
    pub fn emotion_samples_since(&self, conversation_id: &str, since_ms: i64) -> Result<Vec<EmotionSample>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {SAMPLE_COLS} FROM emotion_samples WHERE conversation_id = ?1 AND created_at >= ?2 \
             ORDER BY created_at ASC, id ASC"
        ))?;
        let rows = stmt
            .query_map(params![conversation_id, since_ms], row_to_sample)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Newest samples first.
    pub fn recent_emotion_samples(&self, conversation_id: &str, limit: usize) -> Result<Vec<EmotionSample>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {SAMPLE_COLS} FROM emotion_samples WHERE conversation_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![conversation_id, limit as i64], row_to_sample)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn stage_mark(&self, scope: &Scope) -> Result<Option<Stage>, MimicError> {
        let c = self.conn()?;
        let stage = c
            .query_row(
                "SELECT stage FROM conversation_stage WHERE conversation_id = ?1 AND mode = ?2",
                params![scope.conversation_id, scope.mode],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(stage.map(stage_from_row))
    }

    pub fn raise_stage(&self, scope: &Scope, stage: Stage) -> Result<bool, MimicError> {
        self.write_tx(|w| w.raise_stage(scope, stage))
    }
}
