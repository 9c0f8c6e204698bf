//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Feedback, Grade, LeaderboardEntry, Question};
use crate::engine::{ChatTurn, Phase};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Register {
        name: String,
        #[serde(default)]
        email: Option<String>,
    },
    SelectCategory {
        category: String,
    },
    Tick,
    SubmitAnswer {
        option: String,
    },
    PlayAgain,
    Logout,
    Leaderboard,
    AskAssistant {
        text: String,
    },
    ClearChat,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: QuizView,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<Feedback>,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    /// A slow external call is in flight.
    Busy,
    AssistantReply {
        text: String,
        history: Vec<ChatTurn>,
    },
    Error {
        message: String,
    },
}

/// Question as shown to the player (no answer).
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct QuestionOut {
    pub text: String,
    pub options: Vec<String>,
}

/// Everything the page needs to draw the quiz. Built by `QuizSession::view`.
#[derive(Debug, Serialize, Clone)]
pub struct QuizView {
    pub phase: Phase,
    pub player: Option<String>,
    pub categories: Vec<String>,
    pub category: Option<String>,
    pub index: usize,
    pub total: usize,
    pub score: u32,
    pub question: Option<QuestionOut>,
    pub remaining_secs: Option<u64>,
    pub percentage: Option<f32>,
    pub grade: Option<Grade>,
    pub result_saved: bool,
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub assistant: bool,
}

#[derive(Serialize)]
pub struct CategoriesOut {
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}
#[derive(Serialize)]
pub struct LeaderboardOut {
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Deserialize)]
pub struct CompleteIn {
    pub prompt: String,
}
#[derive(Serialize)]
pub struct CompleteOut {
    pub text: String,
}

#[derive(Deserialize)]
pub struct GenerateIn {
    pub text: String,
    #[serde(default = "default_generate_count")]
    pub count: usize,
}
fn default_generate_count() -> usize {
    5
}
#[derive(Serialize)]
pub struct GenerateOut {
    pub questions: Vec<GeneratedQuestionOut>,
}

/// Generated questions do include the answer: they are material for a new
/// bank, not a live quiz.
#[derive(Serialize)]
pub struct GeneratedQuestionOut {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl From<Question> for GeneratedQuestionOut {
    fn from(q: Question) -> Self {
        Self { question: q.text, options: q.options, answer: q.correct_answer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"register","name":"Sam"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::Register { ref name, email: None } if name == "Sam"));
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"select_category","category":"Math"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SelectCategory { .. }));
        assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn server_messages_are_tagged() {
        let out = serde_json::to_value(ServerWsMessage::Busy).unwrap();
        assert_eq!(out["type"], "busy");
        let err = serde_json::to_value(ServerWsMessage::Error { message: "x".into() }).unwrap();
        assert_eq!(err["message"], "x");
    }
}
