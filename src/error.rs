//! Error types for the quiz engine and the results store.
//!
//! `QuizError` doubles as the HTTP error (JSON `{"error": ...}` body).

use std::fmt;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
  /// Empty name/email, malformed question, blank prompt.
  Validation(String),
  UnknownCategory(String),
  NotRegistered,
  NoActiveQuestion,
  /// Event not allowed in the current phase.
  InvalidTransition(String),
}

impl fmt::Display for QuizError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QuizError::Validation(msg) => write!(f, "{}", msg),
      QuizError::UnknownCategory(c) => write!(f, "Unknown category: {}", c),
      QuizError::NotRegistered => write!(f, "Please register with your name first"),
      QuizError::NoActiveQuestion => write!(f, "There is no question waiting for an answer"),
      QuizError::InvalidTransition(msg) => write!(f, "{}", msg),
    }
  }
}

impl std::error::Error for QuizError {}

impl IntoResponse for QuizError {
  fn into_response(self) -> Response {
    let status = match self {
      QuizError::UnknownCategory(_) => StatusCode::NOT_FOUND,
      QuizError::InvalidTransition(_) => StatusCode::CONFLICT,
      _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[derive(Debug)]
pub enum StoreError {
  Io(std::io::Error),
  Serde(serde_json::Error),
}

impl fmt::Display for StoreError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StoreError::Io(e) => write!(f, "results store I/O error: {}", e),
      StoreError::Serde(e) => write!(f, "results store encoding error: {}", e),
    }
  }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
  fn from(err: std::io::Error) -> Self {
    StoreError::Io(err)
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(err: serde_json::Error) -> Self {
    StoreError::Serde(err)
  }
}

impl IntoResponse for StoreError {
  fn into_response(self) -> Response {
    tracing::error!(target: "leaderboard", error = %self, "Results store failure");
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "Leaderboard is temporarily unavailable" }))).into_response()
  }
}
