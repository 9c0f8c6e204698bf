//! Quiz engine: the state machine over one player's session.
//!
//! Phases: Unregistered -> CategorySelected -> QuestionActive -> Completed.
//! External events (register, select, tick, submit, play again) each map to
//! one method here. `view()` is a pure projection and never mutates.
//!
//! A failed operation leaves the session untouched.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::bank::QuestionBank;
use crate::domain::{grade, CategoryChoice, Feedback, Player, ResultRecord};
use crate::error::QuizError;
use crate::protocol::{QuestionOut, QuizView};
use crate::session::Attempt;
use crate::timer::QuestionTimer;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Unregistered,
  CategorySelected,
  QuestionActive,
  Completed,
}

/// One entry of the assistant side panel.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChatTurn {
  pub sender: String,
  pub text: String,
}

/// Per-connection session: player identity, the current attempt and the
/// assistant chat history.
pub struct QuizSession {
  bank: Arc<QuestionBank>,
  timer: QuestionTimer,
  require_email: bool,
  player: Option<Player>,
  attempt: Option<Attempt>,
  chat_history: Vec<ChatTurn>,
}

impl QuizSession {
  pub fn new(bank: Arc<QuestionBank>, timer: QuestionTimer, require_email: bool) -> Self {
    Self { bank, timer, require_email, player: None, attempt: None, chat_history: Vec::new() }
  }

  pub fn phase(&self) -> Phase {
    match (&self.player, &self.attempt) {
      (None, _) => Phase::Unregistered,
      (Some(_), None) => Phase::CategorySelected,
      (Some(_), Some(a)) if a.completed() => Phase::Completed,
      (Some(_), Some(_)) => Phase::QuestionActive,
    }
  }

  pub fn player(&self) -> Option<&Player> {
    self.player.as_ref()
  }

  pub fn attempt(&self) -> Option<&Attempt> {
    self.attempt.as_ref()
  }

  pub fn categories(&self) -> Vec<String> {
    self.bank.categories()
  }

  /// Register the player. Re-registering replaces the identity and drops any
  /// attempt in progress.
  #[instrument(level = "debug", skip(self, email), fields(has_email = email.is_some()))]
  pub fn register(&mut self, name: &str, email: Option<&str>) -> Result<(), QuizError> {
    let name = name.trim();
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    if name.is_empty() {
      return Err(QuizError::Validation("Please provide your name".into()));
    }
    if self.require_email && email.is_none() {
      return Err(QuizError::Validation("Please provide both name and email".into()));
    }
    self.player = Some(Player { name: name.to_string(), email: email.map(String::from) });
    self.attempt = None;
    info!(target: "quiz", player = %name, "Player registered");
    Ok(())
  }

  /// Choose a category. The same category as the current attempt keeps its
  /// progress; any other category draws a fresh shuffle and resets the score.
  #[instrument(level = "debug", skip(self))]
  pub fn select_category(&mut self, raw: &str) -> Result<(), QuizError> {
    let player = self.player.clone().ok_or(QuizError::NotRegistered)?;
    let choice = CategoryChoice::parse(raw);

    if self.attempt.as_ref().is_some_and(|a| *a.category() == choice) {
      debug!(target: "quiz", category = %choice.label(), "Same category re-selected; progress kept");
      return Ok(());
    }

    let questions = self.bank.resolve(&choice)?;
    if questions.is_empty() {
      return Err(QuizError::Validation(format!("Category '{}' has no questions", choice.label())));
    }
    let attempt = Attempt::new(player, choice, questions);
    info!(target: "quiz", attempt = %attempt.id(), category = %attempt.category().label(), total = attempt.total(), "Attempt started");
    self.attempt = Some(attempt);
    Ok(())
  }

  /// Redraw/tick: starts the countdown of a freshly shown question and
  /// applies the timeout once it has expired. Returns true if it advanced.
  pub fn refresh(&mut self) -> bool {
    let timer = self.timer;
    let Some(attempt) = self.attempt.as_mut() else { return false };
    if attempt.completed() {
      return false;
    }
    match attempt.question_deadline() {
      None => {
        attempt.start_deadline(timer.start());
        false
      }
      Some(d) if timer.expired(&d) => {
        attempt.advance(Feedback::times_up(), false);
        info!(target: "quiz", attempt = %attempt.id(), index = attempt.current_index(), "Question timed out");
        true
      }
      Some(_) => false,
    }
  }

  /// Evaluate an answer for the current question. An answer arriving after
  /// the deadline scores nothing, even if correct.
  #[instrument(level = "debug", skip(self, option))]
  pub fn submit_answer(&mut self, option: &str) -> Result<Feedback, QuizError> {
    let timer = self.timer;
    let attempt = self.active_attempt_mut()?;

    if attempt.question_deadline().is_some_and(|d| timer.expired(&d)) {
      attempt.advance(Feedback::times_up(), false);
      info!(target: "quiz", attempt = %attempt.id(), "Late answer rejected");
      return Ok(Feedback::times_up());
    }

    let question = attempt.current_question().cloned().ok_or(QuizError::NoActiveQuestion)?;
    let correct = question.is_correct(option);
    let feedback = if correct { Feedback::correct() } else { Feedback::wrong(&question.correct_answer) };
    attempt.advance(feedback.clone(), correct);
    info!(target: "quiz", attempt = %attempt.id(), %correct, score = attempt.score(), index = attempt.current_index(), "Answer evaluated");
    Ok(feedback)
  }

  /// Malformed input (console): skip the question like a wrong answer.
  pub fn submit_invalid(&mut self) -> Result<Feedback, QuizError> {
    let attempt = self.active_attempt_mut()?;
    attempt.advance(Feedback::invalid_input(), false);
    Ok(Feedback::invalid_input())
  }

  /// Return and clear the feedback of the previous transition.
  pub fn take_feedback(&mut self) -> Option<Feedback> {
    self.attempt.as_mut().and_then(Attempt::take_feedback)
  }

  /// Record to persist, present only between completion and the first
  /// successful write.
  pub fn pending_result(&self) -> Option<ResultRecord> {
    self.attempt.as_ref().and_then(Attempt::pending_result)
  }

  pub fn mark_persisted(&mut self) {
    if let Some(a) = self.attempt.as_mut() {
      a.mark_persisted();
    }
  }

  /// Restart after completion. The player is kept; the next category
  /// selection draws a new question order.
  pub fn play_again(&mut self) -> Result<(), QuizError> {
    if self.phase() != Phase::Completed {
      return Err(QuizError::InvalidTransition("Play again is available once the quiz is over".into()));
    }
    self.attempt = None;
    info!(target: "quiz", "Play again");
    Ok(())
  }

  /// Drop an unfinished attempt (console "quit"); nothing is recorded.
  pub fn abandon(&mut self) {
    if let Some(a) = self.attempt.take() {
      info!(target: "quiz", attempt = %a.id(), index = a.current_index(), "Attempt abandoned");
    }
  }

  /// Time left on the current question, if its countdown has started.
  pub fn time_left(&self) -> Option<Duration> {
    let attempt = self.attempt.as_ref().filter(|a| !a.completed())?;
    attempt.question_deadline().map(|d| self.timer.remaining(&d))
  }

  /// Forget the player entirely (back to registration).
  pub fn logout(&mut self) {
    self.player = None;
    self.attempt = None;
  }

  pub fn chat_history(&self) -> &[ChatTurn] {
    &self.chat_history
  }

  pub fn push_chat(&mut self, question: &str, answer: &str) {
    self.chat_history.push(ChatTurn { sender: "You".into(), text: question.to_string() });
    self.chat_history.push(ChatTurn { sender: "AI".into(), text: answer.to_string() });
  }

  pub fn clear_chat(&mut self) {
    self.chat_history.clear();
  }

  pub fn view(&self) -> QuizView {
    let phase = self.phase();
    let attempt = self.attempt.as_ref();
    let question = attempt.and_then(|a| {
      a.current_question().map(|q| QuestionOut { text: q.text.clone(), options: q.options.clone() })
    });
    let remaining_secs = attempt.filter(|a| !a.completed()).map(|a| match a.question_deadline() {
      Some(d) => self.timer.remaining(&d).as_secs_f32().ceil() as u64,
      None => self.timer.duration().as_secs(),
    });
    let (percentage, grade) = match attempt.filter(|a| a.completed()) {
      Some(a) => {
        let (pct, g) = grade(a.score(), a.total() as u32);
        (Some(pct), Some(g))
      }
      None => (None, None),
    };

    QuizView {
      phase,
      player: self.player.as_ref().map(|p| p.name.clone()),
      categories: self.bank.categories(),
      category: attempt.map(|a| a.category().label().to_string()),
      index: attempt.map(Attempt::current_index).unwrap_or(0),
      total: attempt.map(Attempt::total).unwrap_or(0),
      score: attempt.map(Attempt::score).unwrap_or(0),
      question,
      remaining_secs,
      percentage,
      grade,
      result_saved: attempt.is_some_and(Attempt::result_persisted),
    }
  }

  fn active_attempt_mut(&mut self) -> Result<&mut Attempt, QuizError> {
    if self.player.is_none() {
      return Err(QuizError::NotRegistered);
    }
    match self.attempt.as_mut() {
      Some(a) if !a.completed() => Ok(a),
      _ => Err(QuizError::NoActiveQuestion),
    }
  }
}
