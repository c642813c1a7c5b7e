//! Per-conversation vocabulary with frequencies and back-filled POS.

use rusqlite::{params, OptionalExtension};

use super::*;

const VOCAB_COLS: &str = "conversation_id, mode, word, frequency, pos, first_seen, last_seen";

fn row_to_vocab(row: &rusqlite::Row) -> rusqlite::Result<VocabEntry> {
    let pos: Option<String> = row.get("pos")?;
    Ok(VocabEntry {
        conversation_id: row.get("conversation_id")?,
        mode: row.get("mode")?,
        word: row.get("word")?,
        frequency: row.get("frequency")?,
        pos: pos_column(pos.as_deref()),
        first_seen: row.get("first_seen")?,
        last_seen: row.get("last_seen")?,
    })
}

impl Writer<'_> {
    /// Insert at frequency 1 or bump the frequency. A missing POS is filled
    /// on the first occurrence that carries one; `X` counts as missing.
    pub fn upsert_vocab(&self, scope: &Scope, word: &str, pos: Option<PosTag>) -> Result<(), MimicError> {
        let pos = pos.filter(|p| *p != PosTag::X).map(PosTag::as_str);
        self.conn.execute(
            "INSERT INTO vocabulary (conversation_id, mode, word, frequency, pos, first_seen, last_seen) \
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5) \
             ON CONFLICT(conversation_id, mode, word) DO UPDATE SET \
               frequency = vocabulary.frequency + 1, \
               pos = COALESCE(vocabulary.pos, excluded.pos), \
               last_seen = excluded.last_seen",
            params![scope.conversation_id, scope.mode, word, pos, now_ms()],
        )?;
        Ok(())
    }
}

impl PatternDB {
    pub fn upsert_vocab(&self, scope: &Scope, word: &str, pos: Option<PosTag>) -> Result<(), MimicError> {
        self.write_tx(|w| w.upsert_vocab(scope, word, pos))
    }

    pub fn vocab_entry(&self, scope: &Scope, word: &str) -> Result<Option<VocabEntry>, MimicError> {
        let c = self.conn()?;
        let entry = c
            .query_row(
                &format!("SELECT {VOCAB_COLS} FROM vocabulary WHERE conversation_id = ?1 AND mode = ?2 AND word = ?3"),
                params![scope.conversation_id, scope.mode, word],
                row_to_vocab,
            )
            .optional()?;
        Ok(entry)
    }

    /// Highest-frequency words, optionally restricted to one POS tag.
    pub fn top_vocab(&self, scope: &Scope, pos: Option<PosTag>, limit: usize) -> Result<Vec<VocabEntry>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {VOCAB_COLS} FROM vocabulary \
             WHERE conversation_id = ?1 AND mode = ?2 AND (?3 IS NULL OR pos = ?3) \
             ORDER BY frequency DESC, last_seen DESC, word ASC LIMIT ?4"
        ))?;
        let rows = stmt
            .query_map(
                params![scope.conversation_id, scope.mode, pos.map(PosTag::as_str), limit as i64],
                row_to_vocab,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_vocab(&self, scope: &Scope, pos: Option<PosTag>) -> Result<i64, MimicError> {
        let c = self.conn()?;
        let n = c.query_row(
            "SELECT COUNT(*) FROM vocabulary \
             WHERE conversation_id = ?1 AND mode = ?2 AND (?3 IS NULL OR pos = ?3)",
            params![scope.conversation_id, scope.mode, pos.map(PosTag::as_str)],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Sum of all word frequencies.
    pub fn vocab_occurrences(&self, scope: &Scope) -> Result<i64, MimicError> {
        let c = self.conn()?;
        let n = c.query_row(
            "SELECT COALESCE(SUM(frequency), 0) FROM vocabulary WHERE conversation_id = ?1 AND mode = ?2",
            params![scope.conversation_id, scope.mode],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Distinct words per POS tag, untagged words under `None`.
    pub fn vocab_by_pos(&self, scope: &Scope) -> Result<Vec<(Option<PosTag>, i64)>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(
            "SELECT pos, COUNT(*) AS n FROM vocabulary WHERE conversation_id = ?1 AND mode = ?2 \
             GROUP BY pos ORDER BY n DESC, pos ASC",
        )?;
        let rows = stmt
            .query_map(params![scope.conversation_id, scope.mode], |r| {
                let pos: Option<String> = r.get(0)?;
                Ok((pos_column(pos.as_deref()), r.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
