//! Gemini session client.
//!
//! Wraps one conversational session with the Gemini API. The session is
//! created lazily when a send is prepared, carries the turn transcript
//! client-side, and is discarded by [`GeminiClient::reset`]. A turn is
//! committed to the transcript only after a successful reply, so a failed
//! send leaves the session exactly as it was before the attempt.
//!
//! A send runs in three steps so the HTTP await never borrows the client:
//! [`GeminiClient::prepare_send`] snapshots the transcript into a
//! [`PendingSend`], [`PendingSend::execute`] performs the request, and
//! [`GeminiClient::commit_reply`] records the completed turn.

use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;

/// Errors surfaced by a send. All three are caught at the send boundary
/// and become one error-role message each; none is fatal.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// No API credential was configured at startup.
    #[error("Gemini API key is not configured. Set GEMINI_API_KEY and restart.")]
    Uninitialized,

    /// The credential was rejected by the remote service.
    #[error(
        "Invalid or unauthorized Gemini API key. Please check your configuration and ensure the key has correct permissions."
    )]
    Unauthorized,

    /// Any other remote error, with the underlying detail.
    #[error("Failed to get response from Gemini: {0}")]
    RemoteFailure(String),
}

/// One piece of turn content on the wire.
#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

/// A single turn entry in the Gemini `contents` array.
#[derive(Debug, Clone, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.to_string() }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

/// Opaque handle for the ongoing multi-turn context.
#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    contents: Vec<Content>,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            contents: Vec::new(),
        }
    }

    fn commit_turn(&mut self, user_text: &str, reply: &str) {
        self.contents.push(Content::user(user_text));
        self.contents.push(Content::model(reply));
    }

    fn turn_count(&self) -> usize {
        self.contents.len() / 2
    }
}

/// A prepared request, detached from the client. Owns everything the HTTP
/// call needs, so executing it cannot contend with a concurrent reset.
#[derive(Debug)]
pub struct PendingSend {
    http: reqwest::Client,
    url: String,
    contents: Vec<Content>,
}

impl PendingSend {
    /// Perform the HTTP call and return the reply text.
    pub async fn execute(self) -> Result<String, ChatError> {
        let payload = json!({ "contents": self.contents });

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_remote_error(&e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Gemini API request failed");
            return Err(map_remote_error(&format!(
                "Gemini API error ({status}): {detail}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| map_remote_error(&e.to_string()))?;
        extract_reply(&body)
            .ok_or_else(|| ChatError::RemoteFailure("response contained no candidate text".to_string()))
    }
}

/// Client for the Gemini conversational API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    session: Option<ChatSession>,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            session: None,
        }
    }

    /// Id of the live session handle, if one exists.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Prepare one user turn for sending.
    ///
    /// Checks the credential, lazily creates the session handle if absent,
    /// and snapshots the transcript plus the new turn into a [`PendingSend`].
    /// The session persists across successful and failed sends alike; only
    /// [`reset`](Self::reset) discards it.
    pub fn prepare_send(&mut self, text: &str) -> Result<PendingSend, ChatError> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(ChatError::Uninitialized);
        };

        self.ensure_session();
        let mut contents: Vec<Content> = self
            .session
            .as_ref()
            .map(|s| s.contents.clone())
            .unwrap_or_default();
        contents.push(Content::user(text));

        tracing::debug!(model = %self.model, turns = contents.len(), "sending chat turn");

        Ok(PendingSend {
            http: self.http.clone(),
            url: format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, self.model, api_key
            ),
            contents,
        })
    }

    /// Record a completed turn in the live session transcript.
    ///
    /// Called only after a successful reply; on any failure the transcript
    /// is untouched and a manual resend repeats the turn cleanly.
    pub fn commit_reply(&mut self, user_text: &str, reply: &str) {
        if let Some(session) = self.session.as_mut() {
            session.commit_turn(user_text, reply);
        }
    }

    /// Discard the session handle. The next send creates a fresh one with
    /// no memory of prior turns. Never fails.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(session_id = %session.id, turns = session.turn_count(), "chat session reset");
        }
    }

    fn ensure_session(&mut self) {
        if self.session.is_none() {
            let session = ChatSession::new();
            tracing::debug!(session_id = %session.id, "starting new chat session");
            self.session = Some(session);
        }
    }
}

/// Classify a remote error by its detail text. Credential rejections get a
/// stable user-facing message instead of the raw detail.
fn map_remote_error(detail: &str) -> ChatError {
    let lowered = detail.to_lowercase();
    if lowered.contains("permission denied") || lowered.contains("api key not valid") {
        ChatError::Unauthorized
    } else {
        ChatError::RemoteFailure(detail.to_string())
    }
}

/// Pull the first candidate's text out of a generateContent response.
fn extract_reply(body: &serde_json::Value) -> Option<String> {
    let text = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?;
    Some(text.to_string())
}
