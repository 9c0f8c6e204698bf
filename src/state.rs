//! Application state shared by every connection: the question bank, the
//! results store, the optional assistant client and the prompts.
//!
//! Nothing quiz-specific per player lives here; each WebSocket connection
//! owns its own `QuizSession` (see `new_session`).

use std::{sync::Arc, time::Duration};

use tracing::{info, instrument};

use crate::assistant::ChatAssistant;
use crate::bank::QuestionBank;
use crate::config::{AppConfig, Prompts, QuizSettings};
use crate::engine::QuizSession;
use crate::store::{JsonFileResultsStore, MemoryResultsStore, ResultsStore};
use crate::timer::QuestionTimer;

#[derive(Clone)]
pub struct AppState {
    pub bank: Arc<QuestionBank>,
    pub store: Arc<dyn ResultsStore>,
    pub assistant: Option<ChatAssistant>,
    pub prompts: Prompts,
    pub settings: QuizSettings,
}

impl AppState {
    /// Build state from env: load config, build the bank, pick the store,
    /// init the assistant client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = AppConfig::from_env();

        let store: Arc<dyn ResultsStore> = match &cfg.quiz.results_path {
            Some(path) => {
                info!(target: "quiz_backend", %path, "Results persisted to JSON file");
                Arc::new(JsonFileResultsStore::new(path))
            }
            None => {
                info!(target: "quiz_backend", "No results path configured; results kept in memory");
                Arc::new(MemoryResultsStore::new())
            }
        };

        let assistant = ChatAssistant::from_env();
        if let Some(a) = &assistant {
            info!(target: "quiz_backend", base_url = %a.base_url, model = %a.model, "Assistant enabled.");
        } else {
            info!(target: "quiz_backend", "Assistant disabled (no GROQ_API_KEY).");
        }

        Self::with_parts(cfg, store, assistant)
    }

    /// Explicit construction (tests, console mode).
    pub fn with_parts(cfg: AppConfig, store: Arc<dyn ResultsStore>, assistant: Option<ChatAssistant>) -> Self {
        let bank = Arc::new(QuestionBank::new(&cfg.categories));
        Self { bank, store, assistant, prompts: cfg.prompts, settings: cfg.quiz }
    }

    pub fn timer(&self) -> QuestionTimer {
        QuestionTimer::new(Duration::from_secs(self.settings.question_seconds))
    }

    /// Fresh per-connection session.
    pub fn new_session(&self) -> QuizSession {
        QuizSession::new(self.bank.clone(), self.timer(), self.settings.require_email)
    }
}
