//! Terminal quiz: the same engine driven by typed lines instead of
//! WebSocket events.
//!
//! Stdin is read on a dedicated thread and forwarded over a channel, so a
//! question can wait for a line with a timeout without blocking the runtime.
//! The scoreboard is a local JSON file (a `JsonFileResultsStore`).

use std::io::{self, Write};
use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::{grade, CategoryChoice, Feedback, FeedbackKind};
use crate::engine::{Phase, QuizSession};
use crate::logic::{leaderboard, persist_pending_result};
use crate::state::AppState;
use crate::store::JsonFileResultsStore;

const QUIT: &str = "q";

enum RoundEnd {
  Finished,
  Quit,
  /// Input closed.
  Eof,
}

pub struct Console<W: Write> {
  state: AppState,
  session: QuizSession,
  input: UnboundedReceiver<String>,
  out: W,
}

/// Forward stdin lines to a channel from a plain thread.
pub fn spawn_stdin_reader() -> UnboundedReceiver<String> {
  let (tx, rx) = mpsc::unbounded_channel();
  std::thread::spawn(move || {
    for line in io::stdin().lines() {
      let Ok(line) = line else { break };
      if tx.send(line).is_err() {
        break;
      }
    }
  });
  rx
}

impl<W: Write> Console<W> {
  pub fn new(mut cfg: AppConfig, input: UnboundedReceiver<String>, out: W) -> Self {
    cfg.quiz.require_email = false;
    let store = Arc::new(JsonFileResultsStore::new(&cfg.quiz.scoreboard_path));
    let state = AppState::with_parts(cfg, store, None);
    let session = state.new_session();
    Self { state, session, input, out }
  }

  pub async fn run(&mut self) -> io::Result<()> {
    writeln!(self.out, "Welcome to the Quiz Game!")?;
    let Some(name) = self.prompt("Enter your name: ").await? else { return Ok(()) };
    let name = if name.trim().is_empty() { "Anonymous".to_string() } else { name };
    if let Err(e) = self.session.register(&name, None) {
      writeln!(self.out, "{}", e)?;
      return Ok(());
    }

    loop {
      match self.play_round().await? {
        RoundEnd::Eof => break,
        RoundEnd::Quit => {
          writeln!(self.out, "Exiting quiz early.")?;
          self.session.abandon();
        }
        RoundEnd::Finished => {
          self.finish_round().await?;
          if let Err(e) = self.session.play_again() {
            warn!(target: "quiz", error = %e, "Restart refused");
          }
        }
      }

      let again = self.prompt("\nPlay again? (y/n): ").await?;
      if !again.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")) {
        break;
      }
    }
    writeln!(self.out, "Thanks for playing!")?;
    Ok(())
  }

  async fn play_round(&mut self) -> io::Result<RoundEnd> {
    let categories = self.session.categories();
    loop {
      let line = self
        .prompt(&format!("\nChoose a category: {} / {}\nEnter category: ", categories.join(" / "), CategoryChoice::ALL_ID))
        .await?;
      let Some(line) = line else { return Ok(RoundEnd::Eof) };
      match self.session.select_category(&normalize_category(&line, &categories)) {
        Ok(()) => break,
        Err(e) => writeln!(self.out, "Invalid category! {}", e)?,
      }
    }

    while self.session.phase() == Phase::QuestionActive {
      self.session.refresh();
      let view = self.session.view();
      let Some(question) = view.question else { break };
      let mut options = question.options;
      options.shuffle(&mut rand::thread_rng());
      writeln!(self.out, "\nQuestion {} of {}: {}", view.index + 1, view.total, question.text)?;
      for (i, opt) in options.iter().enumerate() {
        writeln!(self.out, "{}. {}", i + 1, opt)?;
      }
      write!(self.out, "Enter option number (1-{}) or '{}' to quit: ", options.len(), QUIT)?;
      self.out.flush()?;

      let asked_at = Instant::now();
      let left = self.session.time_left().unwrap_or_default();
      match tokio::time::timeout(left, self.input.recv()).await {
        Err(_) => {
          writeln!(self.out)?;
          self.session.refresh();
        }
        Ok(None) => return Ok(RoundEnd::Eof),
        Ok(Some(line)) => {
          let line = line.trim();
          if line.eq_ignore_ascii_case(QUIT) {
            return Ok(RoundEnd::Quit);
          }
          let picked = pick_option(line, &options);
          let result = match picked {
            Some(option) => self.session.submit_answer(option),
            None => self.session.submit_invalid(),
          };
          if let Err(e) = result {
            warn!(target: "quiz", error = %e, "Answer rejected");
          }
        }
      }

      if let Some(fb) = self.session.take_feedback() {
        self.print_feedback(&fb, asked_at)?;
      }
    }
    Ok(RoundEnd::Finished)
  }

  async fn finish_round(&mut self) -> io::Result<()> {
    let view = self.session.view();
    let (pct, g) = grade(view.score, view.total as u32);
    writeln!(self.out, "\nYour final score: {}/{}", view.score, view.total)?;
    writeln!(self.out, "Percentage: {:.2}%", pct)?;
    writeln!(self.out, "Grade: {:?}", g)?;

    if let Err(message) = persist_pending_result(&self.state, &mut self.session).await {
      writeln!(self.out, "{}", message)?;
    }

    match leaderboard(&self.state, self.state.settings.console_top).await {
      Ok(top) => {
        writeln!(self.out, "\nTop Players:")?;
        for (i, e) in top.iter().enumerate() {
          writeln!(self.out, "{}. {} - {}", i + 1, e.name, e.score)?;
        }
      }
      Err(e) => writeln!(self.out, "Error loading scoreboard: {}", e)?,
    }
    info!(target: "quiz", score = view.score, total = view.total, "Console round finished");
    Ok(())
  }

  fn print_feedback(&mut self, fb: &Feedback, asked_at: Instant) -> io::Result<()> {
    match fb.kind {
      FeedbackKind::Success => {
        writeln!(self.out, "{}! ({:.2} seconds)", fb.message, asked_at.elapsed().as_secs_f32())
      }
      _ => writeln!(self.out, "{}.", fb.message),
    }
  }

  /// Print a prompt and wait for one line. `None` once input is closed.
  async fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
    write!(self.out, "{}", text)?;
    self.out.flush()?;
    Ok(self.input.recv().await.map(|l| l.trim().to_string()))
  }
}

/// A 1-based number in displayed order, or the option text itself.
fn pick_option<'a>(line: &str, options: &'a [String]) -> Option<&'a String> {
  match line.parse::<usize>() {
    Ok(n) => n.checked_sub(1).and_then(|i| options.get(i)),
    Err(_) => options.iter().find(|o| o.eq_ignore_ascii_case(line)),
  }
}

/// Match typed category names case-insensitively ("math" -> "Math").
fn normalize_category(line: &str, categories: &[String]) -> String {
  let line = line.trim();
  categories
    .iter()
    .find(|c| c.eq_ignore_ascii_case(line))
    .cloned()
    .unwrap_or_else(|| line.to_string())
}
