//! Minimal chat-completions client for the quiz assistant.
//!
//! Talks to any OpenAI-compatible endpoint (Groq by default). Only two
//! capabilities are exposed, and neither ever fails loudly:
//!   - `complete`: free-form answer; errors come back as "Error: ..." text
//!   - `generate_questions`: structured questions from free text; any failure
//!     yields an empty list
//!
//! NOTE: We never log the API key, and prompt/response bodies only as short
//! truncations.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Question, QuestionCfg};
use crate::util::{fill_template, trunc_for_log};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const MAX_GENERATED_QUESTIONS: usize = 20;

#[derive(Clone)]
pub struct ChatAssistant {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl ChatAssistant {
  /// Construct the client if we find GROQ_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    match Self::new(api_key, base_url, model) {
      Ok(a) => Some(a),
      Err(e) => {
        error!(target: "quiz_backend", error = %e, "Failed to build assistant HTTP client");
        None
      }
    }
  }

  pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, String> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .map_err(|e| e.to_string())?;
    Ok(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }

  async fn chat(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    response_format: Option<ResponseFormat>,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let mut messages = Vec::with_capacity(2);
    if !system.trim().is_empty() {
      messages.push(ChatMessageReq { role: "system".into(), content: system.into() });
    }
    messages.push(ChatMessageReq { role: "user".into(), content: user.into() });
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages,
      temperature,
      response_format,
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "quiz-championship-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(format!("HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Assistant usage");
    }
    Ok(body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default()
      .trim()
      .to_string())
  }

  /// Plain-text answer to a user prompt.
  #[instrument(level = "info", skip(self, prompts, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  pub async fn complete(&self, prompts: &Prompts, prompt: &str) -> String {
    let start = std::time::Instant::now();
    match self.chat(&prompts.assistant_system, prompt, 0.7, None).await {
      Ok(text) => {
        info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Assistant reply received");
        text
      }
      Err(e) => {
        error!(elapsed = ?start.elapsed(), error = %e, "Assistant call failed");
        format!("Error: {}", e)
      }
    }
  }

  /// Ask the model for `count` questions about `source_text`. Malformed
  /// output, or individual invalid questions, are dropped.
  #[instrument(level = "info", skip(self, prompts, source_text), fields(model = %self.model, text_len = source_text.len(), %count))]
  pub async fn generate_questions(&self, prompts: &Prompts, source_text: &str, count: usize) -> Vec<Question> {
    let count = count.clamp(1, MAX_GENERATED_QUESTIONS);
    let user = fill_template(
      &prompts.questions_user_template,
      &[("count", count.to_string().as_str()), ("text", source_text)],
    );
    let format = Some(ResponseFormat { r#type: "json_object".into() });
    match self.chat(&prompts.questions_system, &user, 0.4, format).await {
      Ok(raw) => {
        let qs = parse_generated_questions(&raw, count);
        info!(generated = qs.len(), "Questions generated");
        qs
      }
      Err(e) => {
        error!(error = %e, "Question generation failed");
        Vec::new()
      }
    }
  }
}

#[derive(Deserialize)]
struct GeneratedQuestions {
  #[serde(default)]
  questions: Vec<QuestionCfg>,
}

/// Parse `{"questions": [...]}` (or a bare array), keep valid questions only.
pub fn parse_generated_questions(raw: &str, count: usize) -> Vec<Question> {
  let raw = strip_code_fence(raw);
  let parsed = serde_json::from_str::<GeneratedQuestions>(raw)
    .map(|g| g.questions)
    .or_else(|_| serde_json::from_str::<Vec<QuestionCfg>>(raw));
  let items = match parsed {
    Ok(items) => items,
    Err(e) => {
      warn!(error = %e, raw = %trunc_for_log(raw, 200), "Model output is not a question list");
      return Vec::new();
    }
  };
  items
    .into_iter()
    .filter_map(|c| match Question::try_from(c) {
      Ok(q) => Some(q),
      Err(e) => {
        warn!(error = %e, "Dropping generated question");
        None
      }
    })
    .take(count)
    .collect()
}

fn strip_code_fence(raw: &str) -> &str {
  let t = raw.trim();
  match t.strip_prefix("```") {
    Some(rest) => {
      let rest = rest.strip_prefix("json").unwrap_or(rest);
      rest.strip_suffix("```").unwrap_or(rest).trim()
    }
    None => t,
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
