//! Memory facts: one row per (conversation, subject).

use rusqlite::{params, OptionalExtension};

use super::*;

const FACT_COLS: &str = "conversation_id, subject, fact, confidence, priority, mentioned_count, \
                         context_tags, source_text, created_at, updated_at";

fn row_to_fact(row: &rusqlite::Row) -> rusqlite::Result<MemoryFact> {
    let tags: String = row.get("context_tags")?;
    let priority: i64 = row.get("priority")?;
    Ok(MemoryFact {
        conversation_id: row.get("conversation_id")?,
        subject: row.get("subject")?,
        fact: row.get("fact")?,
        confidence: row.get("confidence")?,
        priority: priority.clamp(1, 10) as u8,
        mentioned_count: row.get("mentioned_count")?,
        context_tags: tags_from_json(&tags),
        source_text: row.get("source_text")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn validate_fact(input: &FactInput) -> Result<(), MimicError> {
    if input.subject.trim().is_empty() {
        return Err(MimicError::Validation("fact subject must not be empty".into()));
    }
    if input.fact.trim().is_empty() {
        return Err(MimicError::Validation("fact text must not be empty".into()));
    }
    Ok(())
}

/// Fold a re-extracted fact into the stored one.
///
/// Text is replaced only by an at-least-as-confident (or higher priority)
/// reading; confidence and priority never drop; every call is a mention.
pub(crate) fn merge_fact(old: &MemoryFact, input: &FactInput, now: i64) -> MemoryFact {
    let confidence = input.confidence.clamp(0.0, 1.0);
    let priority = input.priority.clamp(1, 10);
    let replace = confidence >= old.confidence || priority > old.priority;
    let mut tags = old.context_tags.clone();
    for t in &input.context_tags {
        if !tags.contains(t) {
            tags.push(t.clone());
        }
    }
    MemoryFact {
        conversation_id: old.conversation_id.clone(),
        subject: old.subject.clone(),
        fact: if replace { input.fact.clone() } else { old.fact.clone() },
        confidence: old.confidence.max(confidence),
        priority: old.priority.max(priority),
        mentioned_count: old.mentioned_count + 1,
        context_tags: tags,
        source_text: if replace { input.source_text.clone() } else { old.source_text.clone() },
        created_at: old.created_at,
        updated_at: now,
    }
}

impl Writer<'_> {
    /// Read-modify-write under the caller's immediate transaction.
    pub fn upsert_fact(&self, conversation_id: &str, input: &FactInput) -> Result<MemoryFact, MimicError> {
        validate_fact(input)?;
        let now = now_ms();
        let existing = self
            .conn
            .query_row(
                &format!("SELECT {FACT_COLS} FROM facts WHERE conversation_id = ?1 AND subject = ?2"),
                params![conversation_id, input.subject],
                row_to_fact,
            )
            .optional()?;
        let fact = match existing {
            Some(old) => merge_fact(&old, input, now),
            None => MemoryFact {
                conversation_id: conversation_id.to_string(),
                subject: input.subject.clone(),
                fact: input.fact.clone(),
                confidence: input.confidence.clamp(0.0, 1.0),
                priority: input.priority.clamp(1, 10),
                mentioned_count: 1,
                context_tags: input.context_tags.clone(),
                source_text: input.source_text.clone(),
                created_at: now,
                updated_at: now,
            },
        };
        let tags = serde_json::to_string(&fact.context_tags).unwrap_or_else(|_| "[]".into());
        self.conn.execute(
            "INSERT INTO facts (conversation_id, subject, fact, confidence, priority, mentioned_count, \
                                context_tags, source_text, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(conversation_id, subject) DO UPDATE SET \
               fact = excluded.fact, confidence = excluded.confidence, priority = excluded.priority, \
               mentioned_count = excluded.mentioned_count, context_tags = excluded.context_tags, \
               source_text = excluded.source_text, updated_at = excluded.updated_at",
            params![
                fact.conversation_id, fact.subject, fact.fact, fact.confidence, fact.priority,
                fact.mentioned_count, tags, fact.source_text, fact.created_at, fact.updated_at
            ],
        )?;
        Ok(fact)
    }
}

impl PatternDB {
    pub fn upsert_fact(&self, conversation_id: &str, input: &FactInput) -> Result<MemoryFact, MimicError> {
        self.write_tx(|w| w.upsert_fact(conversation_id, input))
    }

    pub fn fact(&self, conversation_id: &str, subject: &str) -> Result<Option<MemoryFact>, MimicError> {
        let c = self.conn()?;
        let fact = c
            .query_row(
                &format!("SELECT {FACT_COLS} FROM facts WHERE conversation_id = ?1 AND subject = ?2"),
                params![conversation_id, subject],
                row_to_fact,
            )
            .optional()?;
        Ok(fact)
    }

    /// Facts by priority, then mention count. `context_tag` filters after the limit.
    pub fn facts(
        &self,
        conversation_id: &str,
        context_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryFact>, MimicError> {
        let c = self.conn()?;
        let mut stmt = c.prepare(&format!(
            "SELECT {FACT_COLS} FROM facts WHERE conversation_id = ?1 \
             ORDER BY priority DESC, mentioned_count DESC, updated_at DESC LIMIT ?2"
        ))?;
        let mut rows = stmt
            .query_map(params![conversation_id, limit as i64], row_to_fact)?
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(tag) = context_tag {
            rows.retain(|f| f.context_tags.iter().any(|t| t == tag));
        }
        Ok(rows)
    }

    pub fn count_facts(&self, conversation_id: &str) -> Result<i64, MimicError> {
        let c = self.conn()?;
        let n = c.query_row(
            "SELECT COUNT(*) FROM facts WHERE conversation_id = ?1",
            [conversation_id],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}

#[cfg(test)]
#[path = "facts_tests.rs"]
mod tests;
