//! Quiz Championship · Backend
//!
//! - Axum HTTP + WebSocket API (one quiz session per WebSocket connection)
//! - Optional AI assistant (OpenAI-compatible chat completions, Groq by default)
//! - Static SPA fallback (./static/index.html)
//! - `console` subcommand: the same quiz in the terminal
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   QUIZ_CONFIG_PATH      : path to TOML config (quiz settings, prompts, extra categories)
//!   QUIZ_QUESTION_SECONDS : per-question time limit (default 10)
//!   QUIZ_RESULTS_PATH     : JSON results file (default: in-memory)
//!   GROQ_API_KEY          : enables the assistant if present
//!   GROQ_BASE_URL         : default "https://api.groq.com/openai/v1"
//!   GROQ_MODEL            : default "llama-3.1-8b-instant"
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod seeds;
mod bank;
mod timer;
mod session;
mod engine;
mod store;
mod state;
mod protocol;
mod logic;
mod assistant;
mod routes;
mod console;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::console::{spawn_stdin_reader, Console};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  match std::env::args().nth(1).as_deref() {
    Some("console") => run_console().await,
    None | Some("serve") => serve().await,
    Some(other) => Err(format!("unknown command '{}' (expected 'serve' or 'console')", other).into()),
  }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: question bank, results store, assistant client, prompts.
  let state = Arc::new(AppState::new());
  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_backend", %addr, question_seconds = state.settings.question_seconds, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "quiz_backend", "Shutdown signal received");
    })
    .await?;
  Ok(())
}

async fn run_console() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_console_tracing();
  let mut console = Console::new(AppConfig::from_env(), spawn_stdin_reader(), std::io::stdout());
  console.run().await?;
  Ok(())
}
