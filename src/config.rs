//! Runtime knobs, read from `MIMICRY_*` environment variables.

use std::time::Duration;

use crate::thresholds::{ACCEPTANCE_BAR, RECALL_SIM, STYLE_RATE};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Persona tag every learned row is scoped under.
    pub mode: String,
    /// A generated candidate must score strictly above this.
    pub acceptance_bar: f64,
    /// Minimum similarity for replaying an earlier reply.
    pub recall_similarity: f64,
    /// Probability of styling a reply with the partner's emotion.
    pub style_rate: f64,
    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: "imitation".into(),
            acceptance_bar: ACCEPTANCE_BAR,
            recall_similarity: RECALL_SIM,
            style_rate: STYLE_RATE,
            seed: None,
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    let v = std::env::var(key).ok()?;
    match v.trim().parse::<f64>() {
        Ok(x) if x.is_finite() => Some(x.clamp(0.0, 1.0)),
        _ => {
            tracing::warn!(key, value = %v, "ignoring invalid number");
            None
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            mode: std::env::var("MIMICRY_MODE")
                .ok()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or(d.mode),
            acceptance_bar: env_f64("MIMICRY_ACCEPT").unwrap_or(d.acceptance_bar),
            recall_similarity: env_f64("MIMICRY_RECALL_SIM").unwrap_or(d.recall_similarity),
            style_rate: env_f64("MIMICRY_STYLE_RATE").unwrap_or(d.style_rate),
            seed: std::env::var("MIMICRY_SEED").ok().and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_style_rate(mut self, rate: f64) -> Self {
        self.style_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// File databases only; `:memory:` always uses 2.
    pub pool_size: u32,
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { pool_size: 8, busy_timeout: Duration::from_secs(5) }
    }
}
