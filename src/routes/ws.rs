//! WebSocket upgrade + per-connection event loop.
//!
//! Each connection owns one `QuizSession`. Client messages and a 1-second
//! ticker are the only event sources; every event goes through core logic and
//! the resulting messages are sent back in order.

use std::{sync::Arc, time::Duration};
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::time::MissedTickBehavior;
use tracing::{info, error, instrument, debug};
use uuid::Uuid;

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::{handle_client_message, handle_tick};
use crate::state::AppState;

const TICK_EVERY: Duration = Duration::from_secs(1);

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quiz_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state), fields(conn = %Uuid::new_v4()))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quiz_backend", "WebSocket connected");
  let mut session = state.new_session();
  let mut ticker = tokio::time::interval(TICK_EVERY);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  // Initial view so the page can draw the registration form.
  let hello = ServerWsMessage::View { view: session.view(), feedback: None };
  if send_json(&mut socket, &hello).await.is_err() {
    return;
  }

  loop {
    let replies = tokio::select! {
      _ = ticker.tick() => handle_tick(&state, &mut session).await,
      msg = socket.recv() => {
        let Some(Ok(msg)) = msg else { break };
        match msg {
          Message::Text(txt) => match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(incoming) => {
              debug!(target: "quiz_backend", "WS received: {:?}", &incoming);
              if matches!(incoming, ClientWsMessage::AskAssistant { .. })
                && send_json(&mut socket, &ServerWsMessage::Busy).await.is_err()
              {
                break;
              }
              handle_client_message(&state, &mut session, incoming).await
            }
            Err(e) => vec![ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }],
          },
          Message::Ping(payload) => {
            let _ = socket.send(Message::Pong(payload)).await;
            Vec::new()
          }
          Message::Close(_) => break,
          _ => Vec::new(),
        }
      }
    };

    let mut failed = false;
    for reply in &replies {
      if send_json(&mut socket, reply).await.is_err() {
        failed = true;
        break;
      }
    }
    if failed {
      break;
    }
  }
  info!(target: "quiz_backend", phase = ?session.phase(), player = ?session.player().map(|p| p.name.as_str()), "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "quiz_backend", error = %e, "WS send error");
    e
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::routes::build_router;
  use crate::store::MemoryResultsStore;
  use futures_util::{SinkExt, StreamExt};
  use serde_json::Value;
  use tokio_tungstenite::{connect_async, tungstenite::Message as ClientMessage, MaybeTlsStream, WebSocketStream};

  type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

  async fn connect() -> Client {
    let state = Arc::new(AppState::with_parts(AppConfig::default(), Arc::new(MemoryResultsStore::new()), None));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, build_router(state)).await.unwrap();
    });
    let (ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    ws
  }

  async fn send_text(ws: &mut Client, text: &str) {
    ws.send(ClientMessage::Text(text.to_string())).await.unwrap();
  }

  async fn next_json(ws: &mut Client) -> Value {
    loop {
      if let ClientMessage::Text(t) = ws.next().await.unwrap().unwrap() {
        return serde_json::from_str(&t).unwrap();
      }
    }
  }

  #[tokio::test]
  async fn connection_starts_with_the_registration_view() {
    let mut ws = connect().await;
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "view");
    assert_eq!(hello["view"]["phase"], "unregistered");
  }

  #[tokio::test]
  async fn invalid_json_is_reported_and_the_connection_survives() {
    let mut ws = connect().await;
    next_json(&mut ws).await;
    send_text(&mut ws, "{ nope").await;
    let err = next_json(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert!(err["message"].as_str().unwrap().starts_with("Invalid JSON"));

    send_text(&mut ws, r#"{"type":"ping"}"#).await;
    assert_eq!(next_json(&mut ws).await["type"], "pong");
  }

  #[tokio::test]
  async fn assistant_questions_are_preceded_by_busy() {
    let mut ws = connect().await;
    next_json(&mut ws).await;
    send_text(&mut ws, r#"{"type":"ask_assistant","text":"Why is the sky blue?"}"#).await;
    assert_eq!(next_json(&mut ws).await["type"], "busy");
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "assistant_reply");
    assert_eq!(reply["text"], crate::logic::ASSISTANT_DISABLED);
    assert_eq!(reply["history"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn registration_errors_come_back_with_the_view() {
    let mut ws = connect().await;
    next_json(&mut ws).await;
    send_text(&mut ws, r#"{"type":"register","name":"Sam"}"#).await;
    assert_eq!(next_json(&mut ws).await["type"], "error");
    let view = next_json(&mut ws).await;
    assert_eq!(view["view"]["phase"], "unregistered");

    send_text(&mut ws, r#"{"type":"register","name":"Sam","email":"sam@example.com"}"#).await;
    let view = next_json(&mut ws).await;
    assert_eq!(view["view"]["phase"], "category_selected");
    assert_eq!(view["view"]["player"], "Sam");
  }
}
