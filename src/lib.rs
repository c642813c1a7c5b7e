//! mimicry: a dialogue engine that learns its partner's vocabulary, phrasing
//! and facts per conversation, and answers in kind.

pub mod api;
pub mod config;
pub mod db;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod facts;
pub mod generate;
pub mod learn;
pub mod maturity;
pub mod nlp;
pub mod similarity;
pub mod thresholds;
pub mod util;

use std::sync::Arc;

pub use config::{EngineConfig, StoreConfig};
pub use db::{PatternDB, Scope};
pub use engine::{Engine, Reply, ReplySource};
pub use error::MimicError;

pub type SharedEngine = Arc<engine::Engine>;

/// Run a synchronous engine call on tokio's blocking pool.
///
/// Every store access from async code goes through here so worker threads
/// never wait on SQLite.
pub async fn blocking<F, T>(engine: &SharedEngine, f: F) -> Result<T, MimicError>
where
    F: FnOnce(&engine::Engine) -> T + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| MimicError::Internal(e.to_string()))
}

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub api_key: Option<String>,
    pub started_at: std::time::Instant,
}
