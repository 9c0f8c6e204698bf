//! Question bank: categorized, read-only question sets.
//!
//! Built once at startup from the built-in seeds plus any `[[categories]]`
//! found in the TOML config. Questions are shared behind `Arc` so attempts
//! reference them instead of copying.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{error, info};

use crate::config::CategoryCfg;
use crate::domain::{CategoryChoice, Question};
use crate::error::QuizError;
use crate::seeds::seed_categories;

#[derive(Debug, Default)]
pub struct QuestionBank {
  categories: BTreeMap<String, Vec<Arc<Question>>>,
}

impl QuestionBank {
  /// Seeds first, then config categories (extending seeds of the same name).
  pub fn new(extra: &[CategoryCfg]) -> Self {
    let mut bank = Self::default();
    for (name, questions) in seed_categories() {
      bank.extend(&name, questions);
    }

    for cat in extra {
      let mut valid = Vec::with_capacity(cat.questions.len());
      for raw in &cat.questions {
        match Question::try_from(raw.clone()) {
          Ok(q) => valid.push(q),
          Err(e) => error!(target: "quiz", category = %cat.name, error = %e, "Skipping bank question"),
        }
      }
      bank.extend(&cat.name, valid);
    }

    for (name, qs) in &bank.categories {
      info!(target: "quiz", category = %name, questions = qs.len(), "Question bank category loaded");
    }
    bank
  }

  /// Build directly from (name, questions) pairs.
  #[cfg(test)]
  pub fn from_categories(sets: Vec<(String, Vec<Question>)>) -> Self {
    let mut bank = Self::default();
    for (name, qs) in sets {
      bank.extend(&name, qs);
    }
    bank
  }

  /// Adds questions to a category, skipping texts already present there.
  /// Empty categories are never created.
  fn extend(&mut self, name: &str, questions: Vec<Question>) {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case(CategoryChoice::ALL_ID) {
      error!(target: "quiz", %name, "Reserved or empty category name; skipped");
      return;
    }
    if questions.is_empty() && !self.categories.contains_key(name) {
      return;
    }
    let entry = self.categories.entry(name.to_string()).or_default();
    let mut seen: HashSet<String> = entry.iter().map(|q| q.text.clone()).collect();
    for q in questions {
      if seen.insert(q.text.clone()) {
        entry.push(Arc::new(q));
      }
    }
  }

  pub fn categories(&self) -> Vec<String> {
    self.categories.keys().cloned().collect()
  }

  pub fn questions_for(&self, category: &str) -> Result<&[Arc<Question>], QuizError> {
    self
      .categories
      .get(category)
      .map(Vec::as_slice)
      .ok_or_else(|| QuizError::UnknownCategory(category.to_string()))
  }

  /// Union across categories; a question shared by two categories (same
  /// text) appears once.
  pub fn all_questions(&self) -> Vec<Arc<Question>> {
    let mut seen = HashSet::new();
    self
      .categories
      .values()
      .flatten()
      .filter(|q| seen.insert(q.text.clone()))
      .cloned()
      .collect()
  }

  pub fn resolve(&self, choice: &CategoryChoice) -> Result<Vec<Arc<Question>>, QuizError> {
    match choice {
      CategoryChoice::Named(name) => self.questions_for(name).map(<[_]>::to_vec),
      CategoryChoice::All => Ok(self.all_questions()),
    }
  }
}
