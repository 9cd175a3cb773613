//! Talking back: one reply per chat message, canned lines when the server fails.
//!
//! Requests run on a worker thread so the frame loop never blocks; the app
//! polls [`ReplyPump::poll`] once per frame. Only one request is in flight at
//! a time and each one yields exactly one line.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("no chat endpoint configured")]
    NoEndpoint,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("server sent an empty reply")]
    Empty,
    #[error("reply worker stopped without answering")]
    WorkerGone,
}

/// Anything that can answer a chat message.
pub trait ReplySource: Send + Sync {
    fn reply(&self, message: &str) -> Result<String, ChatError>;
}

impl<F> ReplySource for F
where
    F: Fn(&str) -> Result<String, ChatError> + Send + Sync,
{
    fn reply(&self, message: &str) -> Result<String, ChatError> { self(message) }
}

/// Answers nothing; every message falls back to the canned pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl ReplySource for Offline {
    fn reply(&self, _message: &str) -> Result<String, ChatError> { Err(ChatError::NoEndpoint) }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    reply: Option<String>,
}

/// Extracts `reply` from a `{"reply": "..."}` body. Blank replies are errors.
pub fn parse_reply(body: &str) -> Result<String, ChatError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| ChatError::Malformed(e.to_string()))?;
    match parsed.reply.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => Ok(r.to_string()),
        _ => Err(ChatError::Empty),
    }
}

#[cfg(feature = "http")]
pub use http::HttpReplySource;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use super::{parse_reply, ChatError, ChatRequest, ReplySource};
    use crate::config::schema::ChatConfig;

    /// Single JSON POST per message.
    #[derive(Debug, Clone)]
    pub struct HttpReplySource {
        client: reqwest::blocking::Client,
        endpoint: String,
    }

    impl HttpReplySource {
        pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ChatError::Transport(e.to_string()))?;
            Ok(Self { client, endpoint: endpoint.into() })
        }

        /// `None` when no endpoint is configured.
        pub fn from_config(cfg: &ChatConfig) -> Result<Option<Self>, ChatError> {
            match cfg.endpoint.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() => Self::new(url, Duration::from_secs(cfg.timeout_secs)).map(Some),
                _ => Ok(None),
            }
        }

        pub fn endpoint(&self) -> &str { &self.endpoint }
    }

    impl ReplySource for HttpReplySource {
        fn reply(&self, message: &str) -> Result<String, ChatError> {
            let resp = self
                .client
                .post(&self.endpoint)
                .json(&ChatRequest { message })
                .send()
                .map_err(|e| ChatError::Transport(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(ChatError::Status(status.as_u16()));
            }
            let body = resp.text().map_err(|e| ChatError::Transport(e.to_string()))?;
            parse_reply(&body)
        }
    }
}

/// Non-empty list of canned lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    lines: Vec<String>,
}

impl Pool {
    /// Blank lines are dropped; `None` if nothing is left.
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Option<Self> {
        let lines: Vec<String> = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        (!lines.is_empty()).then_some(Self { lines })
    }

    /// Like [`Pool::new`], falling back to `default` when `lines` has nothing usable.
    pub fn or_default<S: AsRef<str>, D: AsRef<str>>(lines: &[S], default: &[D]) -> Self {
        Self::new(lines).or_else(|| Self::new(default)).unwrap_or_else(|| Self { lines: vec!["……".to_string()] })
    }

    pub fn lines(&self) -> &[String] { &self.lines }
    pub fn len(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn pick<R: Rng>(&self, rng: &mut R) -> &str { &self.lines[rng.gen_range(0..self.lines.len())] }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    /// True when the text came from the canned pool.
    pub fallback: bool,
}

pub struct ReplyPump {
    source: Arc<dyn ReplySource>,
    fallbacks: Pool,
    pending: Option<Receiver<Result<String, ChatError>>>,
}

impl std::fmt::Debug for ReplyPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyPump").field("fallbacks", &self.fallbacks.len()).field("busy", &self.is_busy()).finish()
    }
}

impl ReplyPump {
    pub fn new(source: Arc<dyn ReplySource>, fallbacks: Pool) -> Self { Self { source, fallbacks, pending: None } }

    pub fn offline(fallbacks: Pool) -> Self { Self::new(Arc::new(Offline), fallbacks) }

    pub fn is_busy(&self) -> bool { self.pending.is_some() }

    /// Sends `message` unless it is blank or another request is still out.
    pub fn submit(&mut self, message: &str) -> bool {
        let message = message.trim();
        if message.is_empty() {
            return false;
        }
        if self.is_busy() {
            debug!("chat request already in flight");
            return false;
        }
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let message = message.to_string();
        let spawned = std::thread::Builder::new().name("chat-reply".into()).spawn(move || {
            let _ = tx.send(source.reply(&message));
        });
        if let Err(e) = spawned {
            // The sender went down with the closure; the next poll falls back.
            warn!("could not start chat worker: {e}");
        }
        self.pending = Some(rx);
        true
    }

    /// The finished reply, if any. Never more than one per submit.
    pub fn poll<R: Rng>(&mut self, rng: &mut R) -> Option<ChatReply> {
        let rx = self.pending.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ChatError::WorkerGone),
        };
        self.pending = None;
        Some(self.settle(result, rng))
    }

    /// Blocks until the in-flight request finishes.
    pub fn wait<R: Rng>(&mut self, rng: &mut R) -> Option<ChatReply> {
        let rx = self.pending.take()?;
        let result = rx.recv().unwrap_or(Err(ChatError::WorkerGone));
        Some(self.settle(result, rng))
    }

    fn settle<R: Rng>(&self, result: Result<String, ChatError>, rng: &mut R) -> ChatReply {
        match result {
            Ok(text) => ChatReply { text, fallback: false },
            Err(e) => {
                warn!("chat reply failed: {e}");
                ChatReply { text: self.fallbacks.pick(rng).to_string(), fallback: true }
            }
        }
    }
}
