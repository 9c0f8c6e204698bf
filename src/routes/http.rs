//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::{QuizError, StoreError};
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::{ask_assistant, generate_questions, leaderboard};

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, assistant: state.assistant.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(CategoriesOut { categories: state.bank.categories() })
}

#[instrument(level = "info", skip(state), fields(limit = ?q.limit))]
pub async fn http_get_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardOut>, StoreError> {
  let limit = q.limit.unwrap_or(state.settings.leaderboard_size).min(100);
  let entries = leaderboard(&state, limit).await?;
  info!(target: "leaderboard", rows = entries.len(), "HTTP leaderboard served");
  Ok(Json(LeaderboardOut { entries }))
}

#[instrument(level = "info", skip(state, body), fields(prompt_len = body.prompt.len()))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CompleteIn>,
) -> Result<Json<CompleteOut>, QuizError> {
  let text = ask_assistant(&state, &body.prompt).await?;
  Ok(Json(CompleteOut { text }))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), count = body.count))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<GenerateOut>, QuizError> {
  let questions = generate_questions(&state, &body.text, body.count).await?;
  info!(target: "quiz_backend", generated = questions.len(), "HTTP questions generated");
  Ok(Json(GenerateOut { questions: questions.into_iter().map(Into::into).collect() }))
}
