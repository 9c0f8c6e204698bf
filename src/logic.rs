//! Core behaviors shared by the WebSocket loop, the HTTP handlers and the
//! console front-end.
//!
//! This includes:
//!   - Mapping client events to engine transitions and building the replies
//!   - Persisting a completed attempt exactly once
//!   - Leaderboard queries
//!   - Assistant calls (free-form answers, question generation)
//!
//! External failures never escape as errors here: they turn into messages
//! and the session stays playable.

use tracing::{debug, error, info, instrument, warn};

use crate::domain::{LeaderboardEntry, Question};
use crate::engine::{Phase, QuizSession};
use crate::error::{QuizError, StoreError};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::store::top_n;

pub const ASSISTANT_DISABLED: &str = "The AI assistant is not configured on this server.";

/// Write the completed attempt if it has not been stored yet. Returns a
/// user-facing message when the store refuses; the flag then stays unset so
/// a later event retries.
#[instrument(level = "info", skip_all)]
pub async fn persist_pending_result(state: &AppState, session: &mut QuizSession) -> Result<bool, String> {
  let Some(record) = session.pending_result() else { return Ok(false) };
  match state.store.append_result(&record).await {
    Ok(()) => {
      let played_secs = session.attempt().map(|a| (record.timestamp - a.started_at()).num_seconds());
      session.mark_persisted();
      info!(target: "leaderboard", name = %record.name, played_secs = ?played_secs, category = %record.category, score = record.score, total = record.total, "Result saved");
      Ok(true)
    }
    Err(e) => {
      error!(target: "leaderboard", error = %e, "Saving result failed");
      Err(format!("Error saving score: {}", e))
    }
  }
}

#[instrument(level = "debug", skip(state))]
pub async fn leaderboard(state: &AppState, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
  Ok(top_n(state.store.list_results().await?, limit))
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn ask_assistant(state: &AppState, text: &str) -> Result<String, QuizError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(QuizError::Validation("Please type a question.".into()));
  }
  match &state.assistant {
    Some(a) => Ok(a.complete(&state.prompts, text).await),
    None => {
      debug!(target: "quiz_backend", "Assistant request while disabled");
      Ok(ASSISTANT_DISABLED.to_string())
    }
  }
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len(), %count))]
pub async fn generate_questions(state: &AppState, text: &str, count: usize) -> Result<Vec<Question>, QuizError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(QuizError::Validation("Source text is empty".into()));
  }
  match &state.assistant {
    Some(a) => Ok(a.generate_questions(&state.prompts, text, count).await),
    None => {
      warn!(target: "quiz_backend", "Question generation requested while assistant disabled");
      Ok(Vec::new())
    }
  }
}

/// Apply one client event to the session and build the replies.
#[instrument(level = "debug", skip(state, session))]
pub async fn handle_client_message(
  state: &AppState,
  session: &mut QuizSession,
  msg: ClientWsMessage,
) -> Vec<ServerWsMessage> {
  let mut out = Vec::new();
  let is_tick = matches!(msg, ClientWsMessage::Tick);

  // A completed attempt must be stored before an event can replace it.
  let replaces_attempt = matches!(
    msg,
    ClientWsMessage::Register { .. }
      | ClientWsMessage::SelectCategory { .. }
      | ClientWsMessage::PlayAgain
      | ClientWsMessage::Logout
  );
  if replaces_attempt {
    if let Err(message) = persist_pending_result(state, session).await {
      out.push(ServerWsMessage::Error { message });
      out.push(ServerWsMessage::View { view: session.view(), feedback: None });
      return out;
    }
  }

  let result = match msg {
    ClientWsMessage::Ping => return vec![ServerWsMessage::Pong],
    ClientWsMessage::Leaderboard => {
      out.push(leaderboard_message(state).await);
      return out;
    }
    ClientWsMessage::AskAssistant { text } => {
      let reply = match ask_assistant(state, &text).await {
        Ok(reply) => {
          session.push_chat(text.trim(), &reply);
          ServerWsMessage::AssistantReply { text: reply, history: session.chat_history().to_vec() }
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      };
      return vec![reply];
    }
    ClientWsMessage::ClearChat => {
      session.clear_chat();
      return vec![ServerWsMessage::AssistantReply { text: String::new(), history: Vec::new() }];
    }
    ClientWsMessage::Register { name, email } => session.register(&name, email.as_deref()),
    ClientWsMessage::SelectCategory { category } => session.select_category(&category),
    ClientWsMessage::Tick => Ok(()),
    ClientWsMessage::SubmitAnswer { option } => session.submit_answer(&option).map(|_| ()),
    ClientWsMessage::PlayAgain => session.play_again(),
    ClientWsMessage::Logout => {
      session.logout();
      Ok(())
    }
  };

  if let Err(e) = result {
    debug!(target: "quiz", error = %e, "Event rejected");
    out.push(ServerWsMessage::Error { message: e.to_string() });
  }

  out.extend(after_event(state, session, is_tick).await);
  out
}

/// Timer-driven redraw from the server side. Only produces output while a
/// question is on screen or a completed result still waits to be stored.
pub async fn handle_tick(state: &AppState, session: &mut QuizSession) -> Vec<ServerWsMessage> {
  let retry_save = session.phase() == Phase::Completed && session.pending_result().is_some();
  if session.phase() != Phase::QuestionActive && !retry_save {
    return Vec::new();
  }
  after_event(state, session, true).await
}

/// Shared tail of every quiz event: redraw (start/expire the countdown),
/// surface feedback once, persist once, attach the leaderboard when done.
async fn after_event(state: &AppState, session: &mut QuizSession, is_tick: bool) -> Vec<ServerWsMessage> {
  let mut out = Vec::new();
  // A timeout advances; the follow-up refresh starts the next question's clock.
  while session.refresh() {}
  let feedback = session.take_feedback();

  let persisted_now = match persist_pending_result(state, session).await {
    Ok(saved) => saved,
    Err(message) => {
      out.push(ServerWsMessage::Error { message });
      false
    }
  };

  out.push(ServerWsMessage::View { view: session.view(), feedback });

  if session.phase() == Phase::Completed && (persisted_now || !is_tick) {
    out.push(leaderboard_message(state).await);
  }
  out
}

async fn leaderboard_message(state: &AppState) -> ServerWsMessage {
  match leaderboard(state, state.settings.leaderboard_size).await {
    Ok(entries) => ServerWsMessage::Leaderboard { entries },
    Err(e) => {
      error!(target: "leaderboard", error = %e, "Loading leaderboard failed");
      ServerWsMessage::Error { message: format!("Error loading leaderboard: {}", e) }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::domain::{FeedbackKind, ResultRecord};
  use crate::store::{MemoryResultsStore, ResultsStore};
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  /// Counts appends and can be switched to fail.
  #[derive(Default)]
  struct FlakyStore {
    inner: MemoryResultsStore,
    appends: AtomicUsize,
    failing: AtomicBool,
  }

  #[async_trait]
  impl ResultsStore for FlakyStore {
    async fn append_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
      if self.failing.load(Ordering::SeqCst) {
        return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "sheet unreachable")));
      }
      self.appends.fetch_add(1, Ordering::SeqCst);
      self.inner.append_result(record).await
    }

    async fn list_results(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
      self.inner.list_results().await
    }
  }

  fn app(store: Arc<FlakyStore>) -> AppState {
    AppState::with_parts(AppConfig::default(), store, None)
  }

  async fn send(state: &AppState, s: &mut QuizSession, msg: ClientWsMessage) -> Vec<ServerWsMessage> {
    handle_client_message(state, s, msg).await
  }

  fn feedback_of(out: &[ServerWsMessage]) -> Option<FeedbackKind> {
    out.iter().find_map(|m| match m {
      ServerWsMessage::View { feedback, .. } => feedback.as_ref().map(|f| f.kind),
      _ => None,
    })
  }

  async fn register(state: &AppState, s: &mut QuizSession, name: &str) {
    send(state, s, ClientWsMessage::Register { name: name.into(), email: Some(format!("{name}@example.com")) }).await;
  }

  async fn answer_current(state: &AppState, s: &mut QuizSession) -> Vec<ServerWsMessage> {
    let option = s.attempt().unwrap().current_question().unwrap().correct_answer.clone();
    send(state, s, ClientWsMessage::SubmitAnswer { option }).await
  }

  #[tokio::test(start_paused = true)]
  async fn sam_answers_everything_and_is_saved_once() {
    let store = Arc::new(FlakyStore::default());
    let state = app(store.clone());
    let mut s = state.new_session();

    store.inner.append_result(&ResultRecord {
      name: "Ana".into(),
      email: String::new(),
      category: "Math".into(),
      score: 3,
      total: 5,
      timestamp: chrono::Utc::now(),
    }).await.unwrap();

    register(&state, &mut s, "Sam").await;
    send(&state, &mut s, ClientWsMessage::SelectCategory { category: "Math".into() }).await;
    let mut last = Vec::new();
    while s.phase() == Phase::QuestionActive {
      tokio::time::advance(Duration::from_secs(2)).await;
      last = answer_current(&state, &mut s).await;
      assert_eq!(feedback_of(&last), Some(FeedbackKind::Success));
    }
    assert_eq!(s.attempt().unwrap().score(), 5);

    for _ in 0..10 {
      send(&state, &mut s, ClientWsMessage::Tick).await;
      handle_tick(&state, &mut s).await;
    }
    assert_eq!(store.appends.load(Ordering::SeqCst), 1);

    let board = last.iter().find_map(|m| match m {
      ServerWsMessage::Leaderboard { entries } => Some(entries.clone()),
      _ => None,
    }).expect("leaderboard after completion");
    assert_eq!(board[0].name, "Sam");
    assert_eq!(board[0].score, 5);
    assert_eq!(board[1].name, "Ana");
  }

  #[tokio::test(start_paused = true)]
  async fn timing_out_every_question_saves_zero() {
    let store = Arc::new(FlakyStore::default());
    let state = app(store.clone());
    let mut s = state.new_session();
    register(&state, &mut s, "Sam").await;
    send(&state, &mut s, ClientWsMessage::SelectCategory { category: "Math".into() }).await;

    let mut warnings = 0;
    while s.phase() == Phase::QuestionActive {
      tokio::time::advance(Duration::from_secs(10)).await;
      let out = handle_tick(&state, &mut s).await;
      if feedback_of(&out) == Some(FeedbackKind::Warning) {
        warnings += 1;
      }
    }
    assert_eq!(warnings, 5);
    assert_eq!(store.appends.load(Ordering::SeqCst), 1);
    let rows = store.list_results().await.unwrap();
    assert_eq!(rows[0].score, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn store_failure_keeps_the_session_playable() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let state = app(store.clone());
    let mut s = state.new_session();
    register(&state, &mut s, "Sam").await;
    send(&state, &mut s, ClientWsMessage::SelectCategory { category: "English".into() }).await;
    let mut out = Vec::new();
    while s.phase() == Phase::QuestionActive {
      out = answer_current(&state, &mut s).await;
    }
    assert!(out.iter().any(|m| matches!(m, ServerWsMessage::Error { message } if message.starts_with("Error saving score"))));
    assert_eq!(s.attempt().unwrap().score(), 4);
    assert!(!s.view().result_saved);

    store.failing.store(false, Ordering::SeqCst);
    send(&state, &mut s, ClientWsMessage::Tick).await;
    assert_eq!(store.appends.load(Ordering::SeqCst), 1);
    assert!(s.view().result_saved);

    let out = send(&state, &mut s, ClientWsMessage::PlayAgain).await;
    assert!(out.iter().all(|m| !matches!(m, ServerWsMessage::Error { .. })));
    assert_eq!(s.phase(), Phase::CategorySelected);
  }

  async fn complete_with_failing_store(state: &AppState, store: &FlakyStore, s: &mut QuizSession) {
    store.failing.store(true, Ordering::SeqCst);
    register(state, s, "Sam").await;
    send(state, s, ClientWsMessage::SelectCategory { category: "Science".into() }).await;
    while s.phase() == Phase::QuestionActive {
      answer_current(state, s).await;
    }
    assert!(s.pending_result().is_some());
    store.failing.store(false, Ordering::SeqCst);
  }

  #[tokio::test(start_paused = true)]
  async fn play_again_stores_an_unsaved_result_first() {
    let store = Arc::new(FlakyStore::default());
    let state = app(store.clone());
    let mut s = state.new_session();
    complete_with_failing_store(&state, &store, &mut s).await;

    let out = send(&state, &mut s, ClientWsMessage::PlayAgain).await;
    assert!(out.iter().all(|m| !matches!(m, ServerWsMessage::Error { .. })));
    assert_eq!(s.phase(), Phase::CategorySelected);
    assert_eq!(store.appends.load(Ordering::SeqCst), 1);
    assert_eq!(store.list_results().await.unwrap()[0].score, 5);
  }

  #[tokio::test(start_paused = true)]
  async fn new_category_or_logout_do_not_drop_an_unsaved_result() {
    for msg in [
      ClientWsMessage::SelectCategory { category: "Math".into() },
      ClientWsMessage::Register { name: "Ana".into(), email: Some("ana@example.com".into()) },
      ClientWsMessage::Logout,
    ] {
      let store = Arc::new(FlakyStore::default());
      let state = app(store.clone());
      let mut s = state.new_session();
      complete_with_failing_store(&state, &store, &mut s).await;
      send(&state, &mut s, msg).await;
      assert_eq!(store.appends.load(Ordering::SeqCst), 1);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn unsaved_result_blocks_play_again_while_the_store_is_down() {
    let store = Arc::new(FlakyStore::default());
    let state = app(store.clone());
    let mut s = state.new_session();
    complete_with_failing_store(&state, &store, &mut s).await;
    store.failing.store(true, Ordering::SeqCst);

    let out = send(&state, &mut s, ClientWsMessage::PlayAgain).await;
    assert!(matches!(&out[0], ServerWsMessage::Error { message } if message.starts_with("Error saving score")));
    assert_eq!(s.phase(), Phase::Completed);
    assert!(s.pending_result().is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn server_tick_retries_an_unsaved_result() {
    let store = Arc::new(FlakyStore::default());
    let state = app(store.clone());
    let mut s = state.new_session();
    complete_with_failing_store(&state, &store, &mut s).await;

    let out = handle_tick(&state, &mut s).await;
    assert!(out.iter().any(|m| matches!(m, ServerWsMessage::Leaderboard { .. })));
    assert_eq!(store.appends.load(Ordering::SeqCst), 1);
    assert!(handle_tick(&state, &mut s).await.is_empty());
  }

  #[tokio::test]
  async fn validation_errors_come_back_with_the_view() {
    let state = app(Arc::new(FlakyStore::default()));
    let mut s = state.new_session();
    let out = send(&state, &mut s, ClientWsMessage::Register { name: "Sam".into(), email: None }).await;
    assert!(matches!(&out[0], ServerWsMessage::Error { .. }));
    assert!(matches!(&out[1], ServerWsMessage::View { view, .. } if view.phase == Phase::Unregistered));
  }

  #[tokio::test]
  async fn assistant_requests_without_a_backend() {
    let state = app(Arc::new(FlakyStore::default()));
    let mut s = state.new_session();
    let out = send(&state, &mut s, ClientWsMessage::AskAssistant { text: "  ".into() }).await;
    assert!(matches!(&out[0], ServerWsMessage::Error { .. }));

    let out = send(&state, &mut s, ClientWsMessage::AskAssistant { text: "Why is the sky blue?".into() }).await;
    match &out[0] {
      ServerWsMessage::AssistantReply { text, history } => {
        assert_eq!(text, ASSISTANT_DISABLED);
        assert_eq!(history.len(), 2);
      }
      other => panic!("unexpected {other:?}"),
    }
    assert!(generate_questions(&state, "planets", 3).await.unwrap().is_empty());
    send(&state, &mut s, ClientWsMessage::ClearChat).await;
    assert!(s.chat_history().is_empty());
  }

  #[tokio::test]
  async fn server_ticks_are_silent_outside_questions() {
    let state = app(Arc::new(FlakyStore::default()));
    let mut s = state.new_session();
    assert!(handle_tick(&state, &mut s).await.is_empty());
  }
}
