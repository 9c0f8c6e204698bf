//! Per-question countdown driven by wall-clock time.
//!
//! A deadline captures its start instant once; `remaining` is always derived
//! from elapsed time, so it does not matter how often a view is redrawn.
//! `tokio::time::Instant` lets tests pause and advance the clock.

use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_QUESTION_SECONDS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
  pub started_at: Instant,
  pub duration: Duration,
}

#[derive(Clone, Copy, Debug)]
pub struct QuestionTimer {
  duration: Duration,
}

impl Default for QuestionTimer {
  fn default() -> Self {
    Self::new(Duration::from_secs(DEFAULT_QUESTION_SECONDS))
  }
}

impl QuestionTimer {
  pub fn new(duration: Duration) -> Self {
    Self { duration }
  }

  pub fn duration(&self) -> Duration {
    self.duration
  }

  pub fn start(&self) -> Deadline {
    Deadline { started_at: Instant::now(), duration: self.duration }
  }

  pub fn remaining(&self, deadline: &Deadline) -> Duration {
    deadline.duration.saturating_sub(deadline.started_at.elapsed())
  }

  pub fn expired(&self, deadline: &Deadline) -> bool {
    self.remaining(deadline).is_zero()
  }
}
