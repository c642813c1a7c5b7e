//! N-gram / POS-sequence patterns and phrase templates.

use rusqlite::{params, OptionalExtension};

use super::*;
use crate::util::like_contains;

const PATTERN_COLS: &str = "id, conversation_id, mode, kind, pattern, frequency, example, first_seen, last_seen";
const TEMPLATE_COLS: &str =
    "id, conversation_id, mode, template, pos_structure, frequency, example, first_seen, last_seen";

fn row_to_pattern(row: &rusqlite::Row) -> rusqlite::Result<PatternEntry> {
    let kind: String = row.get("kind")?;
    Ok(PatternEntry {
        id: row.get("id")?,
        conversation_id: row.get("conversation_id")?,
        mode: row.get("mode")?,
        kind: PatternKind::parse(&kind).unwrap_or(PatternKind::Bigram),
        pattern: row.get("pattern")?,
        frequency: row.get("frequency")?,
        example: row.get("example")?,
        first_seen: row.get("first_seen")?,
        last_seen: row.get("last_seen")?,
    })
}

fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<PhraseTemplate> {
    let structure: String = row.get("pos_structure")?;
    Ok(PhraseTemplate {
        id: row.get("id")?,
        conversation_id: row.get("conversation_id")?,
        mode: row.get("mode")?,
        template: row.get("template")?,
        pos_structure: serde_json::from_str(&structure).unwrap_or_default(),
        frequency: row.get("frequency")?,
        example: row.get("example")?,
        first_seen: row.get("first_seen")?,
        last_seen: row.get("last_seen")?,
    })
}

impl Writer<'_> {
    /// Insert at frequency 1 or bump it. The first example text sticks.
    pub fn upsert_pattern(
        &self,
        scope: &Scope,
        kind: PatternKind,
        pattern: &str,
        example: Option<&str>,
    ) -> Result<(), MimicError> {
        self.conn.execute(
            "INSERT INTO patterns (conversation_id, mode, kind, pattern, frequency, example, first_seen, last_seen) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6) \
             ON CONFLICT(conversation_id, mode, pattern) DO UPDATE SET \
               frequency = patterns.frequency + 1, \
               example = COALESCE(patterns.example, excluded.example), \
               last_seen = excluded.last_seen",
            params![scope.conversation_id, scope.mode, kind.as_str(), pattern, example, now_ms()],
        )?;
        Ok(())
    }

    pub fn upsert_template(
        &self,
        scope: &Scope,
        template: &str,
        pos_structure: &[PosTag],
        example: Option<&str>,
    ) -> Result<(), MimicError> {
        let structure = serde_json::to_string(pos_structure).map_err(|e| MimicError::Internal(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO templates (conversation_id, mode, template, pos_structure, frequency, example, first_seen, last_seen) \
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6) \
             ON CONFLICT(conversation_id, mode, template) DO UPDATE SET \
               frequency = templates.frequency + 1, \
               example = COALESCE(templates.example, excluded.example), \
               last_seen = excluded.last_seen",
            params![scope.conversation_id, scope.mode, template, structure, example, now_ms()],
        )?;
        Ok(())
    }
}

impl PatternDB {
    pub fn upsert_pattern(
        &self,
        scope: &Scope,
        kind: PatternKind,
        pattern: &str,
        example: Option<&str>,
    ) -> Result<(), MimicError> {
        self.write_tx(|w| w.upsert_pattern(scope, kind, pattern, example))
    }

    pub fn upsert_template(
        &self,
        scope: &Scope,
        template: &str,
        pos_structure: &[PosTag],
        example: Option<&str>,
    ) -> Result<(), MimicError> {
        self.write_tx(|w| w.upsert_template(scope, template, pos_structure, example))
    }

    pub fn pattern(&self, scope: &Scope, pattern: &str) -> Result<Option<PatternEntry>, MimicError> {
        let c = self.conn()?;
        let entry = c
            .query_row(
                &format!("SELECT {PATTERN_COLS} FROM patterns WHERE conversation_id = ?1 AND mode = ?2 AND pattern = ?3"),
                params![scope.conversation_id, scope.mode, pattern],
                row_to_pattern,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn top_patterns(
        &self,
        scope: &Scope,
        kind: Option<PatternKind>,
        limit: usize,
    ) -> Result<Vec<PatternEntry>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {PATTERN_COLS} FROM patterns \
             WHERE conversation_id = ?1 AND mode = ?2 AND (?3 IS NULL OR kind = ?3) \
             ORDER BY frequency DESC, last_seen DESC, id ASC LIMIT ?4"
        ))?;
        let rows = stmt
            .query_map(
                params![scope.conversation_id, scope.mode, kind.map(PatternKind::as_str), limit as i64],
                row_to_pattern,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_patterns(&self, scope: &Scope, kind: Option<PatternKind>) -> Result<i64, MimicError> {
        let c = self.conn()?;
        let n = c.query_row(
            "SELECT COUNT(*) FROM patterns \
             WHERE conversation_id = ?1 AND mode = ?2 AND (?3 IS NULL OR kind = ?3)",
            params![scope.conversation_id, scope.mode, kind.map(PatternKind::as_str)],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// N-grams whose text contains `needle` (wildcards in it are literal),
    /// most frequent first.
    pub fn patterns_containing(
        &self,
        scope: &Scope,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<PatternEntry>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {PATTERN_COLS} FROM patterns \
             WHERE conversation_id = ?1 AND mode = ?2 AND kind <> 'pos_sequence' \
               AND pattern LIKE ?3 ESCAPE '\\' \
             ORDER BY frequency DESC, id ASC LIMIT ?4"
        ))?;
        let rows = stmt
            .query_map(
                params![scope.conversation_id, scope.mode, like_contains(needle), limit as i64],
                row_to_pattern,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn template(&self, scope: &Scope, template: &str) -> Result<Option<PhraseTemplate>, MimicError> {
        let c = self.conn()?;
        let entry = c
            .query_row(
                &format!("SELECT {TEMPLATE_COLS} FROM templates WHERE conversation_id = ?1 AND mode = ?2 AND template = ?3"),
                params![scope.conversation_id, scope.mode, template],
                row_to_template,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn top_templates(&self, scope: &Scope, limit: usize) -> Result<Vec<PhraseTemplate>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {TEMPLATE_COLS} FROM templates WHERE conversation_id = ?1 AND mode = ?2 \
             ORDER BY frequency DESC, last_seen DESC, id ASC LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![scope.conversation_id, scope.mode, limit as i64], row_to_template)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_templates(&self, scope: &Scope) -> Result<i64, MimicError> {
        let c = self.conn()?;
        let n = c.query_row(
            "SELECT COUNT(*) FROM templates WHERE conversation_id = ?1 AND mode = ?2",
            params![scope.conversation_id, scope.mode],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}
