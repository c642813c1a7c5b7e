//! Conversation handlers: talk, and read back what has been learned.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::body::JsonBody;
use crate::db::{EmotionSample, MemoryFact, Scope};
use crate::emotion::{DominantEmotion, EmotionTimeline, EmotionalPatterns};
use crate::engine::{PatternStats, Reply, VocabularyStats};
use crate::error::MimicError;
use crate::maturity::MaturityReport;
use crate::{blocking, AppState};

#[derive(Deserialize)]
pub(super) struct ConverseBody {
    conversation_id: String,
    text: String,
    /// Overrides the engine's configured mode for this call.
    #[serde(default)]
    mode: Option<String>,
}

fn conversation(id: &str) -> Result<String, MimicError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(MimicError::Validation("conversation_id is required".into()));
    }
    Ok(id.to_string())
}

pub(super) async fn converse(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ConverseBody>,
) -> Result<Json<Reply>, MimicError> {
    let conv = conversation(&body.conversation_id)?;
    if body.text.trim().is_empty() {
        return Err(MimicError::MalformedInput);
    }
    let reply = blocking(&state.engine, move |engine| {
        let mode = body.mode.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| engine.config().mode.clone());
        engine.handle_in(&body.text, &Scope::new(conv, mode))
    })
    .await?;
    Ok(Json(reply))
}

pub(super) async fn vocabulary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VocabularyStats>, MimicError> {
    let conv = conversation(&id)?;
    let stats = blocking(&state.engine, move |e| e.vocabulary_stats(&conv)).await??;
    Ok(Json(stats))
}

pub(super) async fn patterns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatternStats>, MimicError> {
    let conv = conversation(&id)?;
    let stats = blocking(&state.engine, move |e| e.pattern_stats(&conv)).await??;
    Ok(Json(stats))
}

#[derive(Deserialize)]
pub(super) struct FactQuery {
    tag: Option<String>,
    limit: Option<usize>,
}

pub(super) async fn facts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<FactQuery>,
) -> Result<Json<Vec<MemoryFact>>, MimicError> {
    let conv = conversation(&id)?;
    let limit = q.limit.unwrap_or(50).clamp(1, 500);
    let facts = blocking(&state.engine, move |e| e.fact_list(&conv, q.tag.as_deref(), limit)).await??;
    Ok(Json(facts))
}

pub(super) async fn stage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MaturityReport>, MimicError> {
    let conv = conversation(&id)?;
    let report = blocking(&state.engine, move |e| e.maturity_report(&conv)).await??;
    Ok(Json(report))
}

#[derive(Deserialize)]
pub(super) struct EmotionQuery {
    days: Option<u32>,
    window_minutes: Option<u32>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub(super) struct EmotionReport {
    timeline: EmotionTimeline,
    dominant: Option<DominantEmotion>,
    patterns: EmotionalPatterns,
    recent: Vec<EmotionSample>,
}

pub(super) async fn emotions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<EmotionQuery>,
) -> Result<Json<EmotionReport>, MimicError> {
    let conv = conversation(&id)?;
    let days = q.days.unwrap_or(7).min(3650);
    let window = q.window_minutes.unwrap_or(30);
    let limit = q.limit.unwrap_or(5).clamp(1, 100);
    let report = blocking(&state.engine, move |e| -> Result<EmotionReport, MimicError> {
        Ok(EmotionReport {
            timeline: e.emotion_timeline(&conv, days)?,
            dominant: e.dominant_emotion(&conv, window)?,
            patterns: e.emotional_patterns(&conv)?,
            recent: e.recent_emotions(&conv, limit)?,
        })
    })
    .await??;
    Ok(Json(report))
}
