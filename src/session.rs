//! Attempt: the mutable record of one player's run through a question set.
//!
//! Only the engine mutates an attempt. Every advance goes through
//! `Attempt::advance`, which keeps `score <= current_index <= len`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::domain::{CategoryChoice, Feedback, Player, Question, ResultRecord};
use crate::timer::Deadline;

#[derive(Clone, Debug)]
pub struct Attempt {
  id: Uuid,
  player: Player,
  category: CategoryChoice,
  question_order: Vec<Arc<Question>>,
  current_index: usize,
  score: u32,
  question_deadline: Option<Deadline>,
  pending_feedback: Option<Feedback>,
  result_persisted: bool,
  started_at: DateTime<Utc>,
}

impl Attempt {
  /// Fresh attempt over a uniformly shuffled copy of `questions`.
  pub fn new(player: Player, category: CategoryChoice, questions: Vec<Arc<Question>>) -> Self {
    let mut question_order = questions;
    question_order.shuffle(&mut rand::thread_rng());
    Self {
      id: Uuid::new_v4(),
      player,
      category,
      question_order,
      current_index: 0,
      score: 0,
      question_deadline: None,
      pending_feedback: None,
      result_persisted: false,
      started_at: Utc::now(),
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn category(&self) -> &CategoryChoice {
    &self.category
  }

  pub fn question_order(&self) -> &[Arc<Question>] {
    &self.question_order
  }

  pub fn current_index(&self) -> usize {
    self.current_index
  }

  pub fn score(&self) -> u32 {
    self.score
  }

  pub fn question_deadline(&self) -> Option<Deadline> {
    self.question_deadline
  }

  pub fn result_persisted(&self) -> bool {
    self.result_persisted
  }

  pub fn started_at(&self) -> DateTime<Utc> {
    self.started_at
  }

  pub fn total(&self) -> usize {
    self.question_order.len()
  }

  pub fn completed(&self) -> bool {
    self.current_index == self.question_order.len()
  }

  pub fn current_question(&self) -> Option<&Arc<Question>> {
    self.question_order.get(self.current_index)
  }

  /// Start the countdown of the current question. Ignored once completed.
  pub(crate) fn start_deadline(&mut self, deadline: Deadline) {
    if !self.completed() {
      self.question_deadline = Some(deadline);
    }
  }

  pub(crate) fn take_feedback(&mut self) -> Option<Feedback> {
    self.pending_feedback.take()
  }

  pub(crate) fn mark_persisted(&mut self) {
    if self.completed() {
      self.result_persisted = true;
    }
  }

  /// Resolve the current question: record feedback, award at most one
  /// point, move on and clear the deadline. No-op once completed.
  pub(crate) fn advance(&mut self, feedback: Feedback, award_point: bool) {
    if self.completed() {
      return;
    }
    if award_point {
      self.score += 1;
    }
    self.current_index += 1;
    self.question_deadline = None;
    self.pending_feedback = Some(feedback);
    debug_assert!(self.score as usize <= self.current_index);
  }

  /// The record to write once this attempt is complete and not yet stored.
  pub fn pending_result(&self) -> Option<ResultRecord> {
    if !self.completed() || self.result_persisted {
      return None;
    }
    Some(ResultRecord {
      name: self.player.name.clone(),
      email: self.player.email.clone().unwrap_or_default(),
      category: self.category.label().to_string(),
      score: self.score,
      total: self.total() as u32,
      timestamp: Utc::now(),
    })
  }
}
