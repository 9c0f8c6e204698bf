//! Domain models: questions, players, feedback, stored results and grading.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QuizError;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// A multiple-choice question. Construct through `Question::new` so the
/// option list is always valid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
  pub text: String,
  pub options: Vec<String>,
  pub correct_answer: String,
}

impl Question {
  /// Validates: non-empty text, 2..=6 unique options, answer is one of them.
  pub fn new(
    text: impl Into<String>,
    options: Vec<String>,
    correct_answer: impl Into<String>,
  ) -> Result<Self, QuizError> {
    let text = text.into().trim().to_string();
    let correct_answer = correct_answer.into().trim().to_string();
    let options: Vec<String> = options.into_iter().map(|o| o.trim().to_string()).collect();

    if text.is_empty() {
      return Err(QuizError::Validation("question text is empty".into()));
    }
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
      return Err(QuizError::Validation(format!(
        "question '{}' has {} options (expected {}..={})",
        text,
        options.len(),
        MIN_OPTIONS,
        MAX_OPTIONS
      )));
    }
    let unique: HashSet<&str> = options.iter().map(String::as_str).collect();
    if unique.len() != options.len() || options.iter().any(|o| o.is_empty()) {
      return Err(QuizError::Validation(format!("question '{}' has blank or repeated options", text)));
    }
    if !options.contains(&correct_answer) {
      return Err(QuizError::Validation(format!(
        "question '{}': answer '{}' is not one of the options",
        text, correct_answer
      )));
    }
    Ok(Self { text, options, correct_answer })
  }

  pub fn is_correct(&self, submitted: &str) -> bool {
    submitted.trim() == self.correct_answer
  }
}

/// Raw question shape used by TOML config and model output
/// (`question`/`options`/`answer`, the field names players see in the sheet).
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  pub question: String,
  pub options: Vec<String>,
  pub answer: String,
}

impl TryFrom<QuestionCfg> for Question {
  type Error = QuizError;

  fn try_from(c: QuestionCfg) -> Result<Self, Self::Error> {
    Question::new(c.question, c.options, c.answer)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// Which question set an attempt draws from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CategoryChoice {
  Named(String),
  /// "All subjects": union of every category.
  All,
}

impl CategoryChoice {
  pub const ALL_ID: &'static str = "all";

  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case(Self::ALL_ID) {
      CategoryChoice::All
    } else {
      CategoryChoice::Named(raw.to_string())
    }
  }

  pub fn label(&self) -> &str {
    match self {
      CategoryChoice::Named(name) => name,
      CategoryChoice::All => "All subjects",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
  Success,
  Warning,
  Error,
}

/// Outcome of the previous transition, shown once.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feedback {
  pub message: String,
  pub kind: FeedbackKind,
}

impl Feedback {
  pub fn correct() -> Self {
    Self { message: "Correct".into(), kind: FeedbackKind::Success }
  }

  pub fn wrong(correct_answer: &str) -> Self {
    Self { message: format!("Wrong, correct answer was {}", correct_answer), kind: FeedbackKind::Error }
  }

  pub fn times_up() -> Self {
    Self { message: "Time's up, no points awarded".into(), kind: FeedbackKind::Warning }
  }

  pub fn invalid_input() -> Self {
    Self { message: "Invalid input, question skipped".into(), kind: FeedbackKind::Error }
  }
}

/// One completed attempt as written to the results store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
  pub name: String,
  #[serde(default)]
  pub email: String,
  pub category: String,
  pub score: u32,
  #[serde(default)]
  pub total: u32,
  pub timestamp: DateTime<Utc>,
}

/// Public leaderboard row. Email never leaves the store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
  pub name: String,
  pub score: u32,
  pub category: String,
  pub timestamp: DateTime<Utc>,
}

impl From<&ResultRecord> for LeaderboardEntry {
  fn from(r: &ResultRecord) -> Self {
    Self { name: r.name.clone(), score: r.score, category: r.category.clone(), timestamp: r.timestamp }
  }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum Grade {
  A,
  B,
  C,
  Fail,
}

/// Percentage plus letter grade. An empty quiz counts as 0%.
pub fn grade(score: u32, total: u32) -> (f32, Grade) {
  let pct = if total == 0 { 0.0 } else { score as f32 / total as f32 * 100.0 };
  let g = if pct >= 90.0 {
    Grade::A
  } else if pct >= 80.0 {
    Grade::B
  } else if pct >= 50.0 {
    Grade::C
  } else {
    Grade::Fail
  };
  (pct, g)
}
