//! Loading app configuration (quiz settings, prompts, extra question
//! categories) from TOML, with a few env overrides.
//!
//! See `AppConfig` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::QuestionCfg;
use crate::timer::DEFAULT_QUESTION_SECONDS;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub quiz: QuizSettings,
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub categories: Vec<CategoryCfg>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
  pub question_seconds: u64,
  pub leaderboard_size: usize,
  pub require_email: bool,
  /// Results file for the web mode; `None` keeps results in memory.
  pub results_path: Option<String>,
  pub scoreboard_path: String,
  pub console_top: usize,
}

impl Default for QuizSettings {
  fn default() -> Self {
    Self {
      question_seconds: DEFAULT_QUESTION_SECONDS,
      leaderboard_size: 5,
      require_email: true,
      results_path: None,
      scoreboard_path: "scoreboard.json".into(),
      console_top: 3,
    }
  }
}

/// Extra category entry accepted in TOML; merged into the seed bank.
#[derive(Clone, Debug, Deserialize)]
pub struct CategoryCfg {
  pub name: String,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

/// Prompts used by the chat assistant.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub assistant_system: String,
  pub questions_system: String,
  pub questions_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      assistant_system: "You are a friendly quiz assistant. Answer clearly and concisely.".into(),
      questions_system: "You write multiple-choice quiz questions. Respond ONLY with strict JSON.".into(),
      questions_user_template: "Write {count} multiple-choice questions based on the text below. Return JSON {\"questions\": [{\"question\": string, \"options\": [string, ...], \"answer\": string}]}. Each question has 4 distinct options and `answer` must equal one of them.\n\nText:\n{text}".into(),
    }
  }
}

impl AppConfig {
  /// TOML from QUIZ_CONFIG_PATH (if set and valid), then env overrides.
  pub fn from_env() -> Self {
    let mut cfg = load_config_from_env().unwrap_or_default();
    cfg.apply_env_overrides();
    cfg
  }

  fn apply_env_overrides(&mut self) {
    if let Some(secs) = std::env::var("QUIZ_QUESTION_SECONDS").ok().and_then(|s| s.parse::<u64>().ok()) {
      self.quiz.question_seconds = secs;
    }
    if let Ok(path) = std::env::var("QUIZ_RESULTS_PATH") {
      self.quiz.results_path = Some(path).filter(|p| !p.trim().is_empty());
    }
    if self.quiz.question_seconds == 0 {
      error!(target: "quiz_backend", "question_seconds must be positive; using default");
      self.quiz.question_seconds = DEFAULT_QUESTION_SECONDS;
    }
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => parse_config(&s, &path),
    Err(e) => {
      error!(target: "quiz_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

fn parse_config(s: &str, path: &str) -> Option<AppConfig> {
  match toml::from_str::<AppConfig>(s) {
    Ok(cfg) => {
      info!(target: "quiz_backend", %path, categories = cfg.categories.len(), "Loaded app config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "quiz_backend", %path, error = %e, "Failed to parse TOML config");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_toml_gives_defaults() {
    let cfg = parse_config("", "inline").unwrap();
    assert_eq!(cfg.quiz.question_seconds, 10);
    assert_eq!(cfg.quiz.leaderboard_size, 5);
    assert!(cfg.quiz.require_email);
    assert!(cfg.quiz.results_path.is_none());
    assert!(cfg.prompts.questions_user_template.contains("{count}"));
  }

  #[test]
  fn parses_settings_and_categories() {
    let toml = r#"
      [quiz]
      question_seconds = 30
      results_path = "data/results.json"

      [[categories]]
      name = "History"
      [[categories.questions]]
      question = "First man on the moon?"
      options = ["Armstrong", "Gagarin"]
      answer = "Armstrong"
    "#;
    let cfg = parse_config(toml, "inline").unwrap();
    assert_eq!(cfg.quiz.question_seconds, 30);
    assert_eq!(cfg.quiz.results_path.as_deref(), Some("data/results.json"));
    assert_eq!(cfg.quiz.console_top, 3);
    assert_eq!(cfg.categories[0].questions[0].answer, "Armstrong");
  }

  #[test]
  fn invalid_toml_is_rejected() {
    assert!(parse_config("[quiz\nquestion_seconds = ", "inline").is_none());
  }
}
