//! Taunt generator backed by an OpenAI-compatible chat-completions endpoint.
//!
//! Independent from the 3D toy: a session counts how badly the punching bag
//! has been treated and asks the model for a one-line comeback in character.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::schema::CompletionConfig;

const SYSTEM_PROMPT: &str = "\
# Role
你是一个减压游戏里的“贱萌受气包”。
你必须根据【当前动作】和【挨揍状态】做出反应。

# 状态定义
1. **healthy (健康/嚣张)**: 嘲讽用户，嘴欠，看不起用户的攻击。
2. **hurt (受伤/恼火)**: 气急败坏，抱怨疼，抱怨衣服脏了。
3. **dying (濒死/求饶)**: 彻底认怂，无底线跪舔，求爸爸放过。

# 约束
- 回复必须**极短**（15字以内）。
- 风格要**口语化**、贱兮兮。
- 只输出台词，不要输出动作描述。
";

/// Hit count a flush jumps to.
pub const FLUSHED_HITS: u32 = 999;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API error: {0}")]
    Status(u16),
    #[error("malformed completion: {0}")]
    Malformed(String),
    #[error("completion had no choices")]
    NoChoices,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Speech(String),
    Egg,
    Paint,
    Flush,
    Idle,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Speech(_) => "speech",
            Action::Egg => "egg",
            Action::Paint => "paint",
            Action::Flush => "flush",
            Action::Idle => "idle",
        }
    }

    /// Event line handed to the model.
    pub fn describe(&self) -> String {
        match self {
            Action::Speech(text) => format!("用户对你说: \"{text}\""),
            Action::Egg => "用户拿鸡蛋狠狠砸在了你脸上，黏糊糊的。".to_string(),
            Action::Paint => "用户往你身上泼了一桶油漆，脏死了。".to_string(),
            Action::Flush => {
                "用户按下了马桶冲水键，你正在旋转着被吸入下水道！(这是处决技)".to_string()
            }
            Action::Idle => "用户一直盯着你，但是什么都没做，气氛突然安静。".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Mood {
    Healthy,
    Hurt,
    Dying,
}

impl Mood {
    pub fn from_hits(hits: u32) -> Self {
        match hits {
            h if h > 10 => Mood::Dying,
            h if h > 5 => Mood::Hurt,
            _ => Mood::Healthy,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Healthy => "healthy",
            Mood::Hurt => "hurt",
            Mood::Dying => "dying",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self { Self { role: "system".into(), content: content.into() } }
    pub fn user(content: impl Into<String>) -> Self { Self { role: "user".into(), content: content.into() } }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub fn build_messages(action: &Action, mood: Mood) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "【当前事件】: {}\n【当前身体状态】: {}",
            action.describe(),
            mood.label()
        )),
    ]
}

/// `choices[0].message.content`, trimmed.
pub fn parse_completion(body: &str) -> Result<String, CompletionError> {
    let resp: CompletionResponse = serde_json::from_str(body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
    let first = resp.choices.into_iter().next().ok_or(CompletionError::NoChoices)?;
    Ok(first.message.content.trim().to_string())
}

/// Sends a finished request somewhere and returns the model's line.
pub trait Completer {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

impl<F> Completer for F
where
    F: Fn(&CompletionRequest) -> Result<String, CompletionError>,
{
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> { self(request) }
}

#[cfg(feature = "http")]
pub use http::HttpCompleter;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use super::{parse_completion, Completer, CompletionError, CompletionRequest};

    #[derive(Debug, Clone)]
    pub struct HttpCompleter {
        client: reqwest::blocking::Client,
        url: String,
        api_key: String,
    }

    impl HttpCompleter {
        pub fn new(
            url: impl Into<String>,
            api_key: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self, CompletionError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| CompletionError::Transport(e.to_string()))?;
            Ok(Self { client, url: url.into(), api_key: api_key.into() })
        }
    }

    impl Completer for HttpCompleter {
        fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            let resp = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .map_err(|e| CompletionError::Transport(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(CompletionError::Status(status.as_u16()));
            }
            let body = resp.text().map_err(|e| CompletionError::Transport(e.to_string()))?;
            parse_completion(&body)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Taunt {
    pub mood: Mood,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TauntSession {
    cfg: CompletionConfig,
    hits: u32,
}

impl TauntSession {
    pub fn new(cfg: CompletionConfig) -> Self { Self { cfg, hits: 0 } }

    pub fn hits(&self) -> u32 { self.hits }
    pub fn mood(&self) -> Mood { Mood::from_hits(self.hits) }

    /// Applies the action to the hit counter.
    pub fn record(&mut self, action: &Action) {
        match action {
            Action::Egg | Action::Paint => self.hits = self.hits.saturating_add(1),
            Action::Flush => self.hits = FLUSHED_HITS,
            Action::Speech(_) | Action::Idle => {}
        }
    }

    pub fn request(&self, action: &Action) -> CompletionRequest {
        CompletionRequest {
            model: self.cfg.model.clone(),
            messages: build_messages(action, self.mood()),
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        }
    }

    /// Records `action` and asks for a comeback. The counter moves even if
    /// the request fails.
    pub fn act(&mut self, action: &Action, completer: &dyn Completer) -> Result<Taunt, CompletionError> {
        self.record(action);
        let mood = self.mood();
        debug!(action = action.label(), mood = mood.label(), "taunt request");
        let text = completer.complete(&self.request(action))?;
        Ok(Taunt { mood, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn mood_thresholds() {
        assert_eq!(Mood::from_hits(0), Mood::Healthy);
        assert_eq!(Mood::from_hits(5), Mood::Healthy);
        assert_eq!(Mood::from_hits(6), Mood::Hurt);
        assert_eq!(Mood::from_hits(10), Mood::Hurt);
        assert_eq!(Mood::from_hits(11), Mood::Dying);
    }

    #[test]
    fn actions_move_the_counter() {
        let mut s = TauntSession::new(CompletionConfig::default());
        s.record(&Action::Egg);
        s.record(&Action::Paint);
        assert_eq!(s.hits(), 2);
        s.record(&Action::Speech("滚".into()));
        s.record(&Action::Idle);
        assert_eq!(s.hits(), 2);
        s.record(&Action::Flush);
        assert_eq!(s.hits(), FLUSHED_HITS);
        assert_eq!(s.mood(), Mood::Dying);
    }

    #[test]
    fn request_carries_model_settings_and_state() {
        let mut s = TauntSession::new(CompletionConfig::default());
        for _ in 0..6 {
            s.record(&Action::Egg);
        }
        let req = s.request(&Action::Speech("你好菜".into()));
        assert_eq!(req.model, "Qwen/Qwen3-8B");
        assert_eq!(req.temperature, 1.3);
        assert_eq!(req.max_tokens, 50);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(
            req.messages[1].content,
            "【当前事件】: 用户对你说: \"你好菜\"\n【当前身体状态】: hurt"
        );

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("max_tokens").is_some());
    }

    #[test]
    fn parse_completion_takes_first_choice() {
        let body = r#"{"choices":[
            {"message":{"role":"assistant","content":"  就这？ "}},
            {"message":{"role":"assistant","content":"no"}}
        ]}"#;
        assert_eq!(parse_completion(body).unwrap(), "就这？");
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(CompletionError::NoChoices)));
        assert!(matches!(parse_completion("nope"), Err(CompletionError::Malformed(_))));
    }

    #[test]
    fn act_uses_the_updated_mood() {
        let seen = RefCell::new(Vec::new());
        let completer = |req: &CompletionRequest| -> Result<String, CompletionError> {
            seen.borrow_mut().push(req.messages[1].content.clone());
            Ok("饶命".into())
        };
        let mut s = TauntSession::new(CompletionConfig::default());
        let taunt = s.act(&Action::Flush, &completer).unwrap();
        assert_eq!(taunt, Taunt { mood: Mood::Dying, text: "饶命".into() });
        assert!(seen.borrow()[0].ends_with("dying"));
    }

    #[test]
    fn failed_request_still_counts_the_hit() {
        let failing = |_: &CompletionRequest| -> Result<String, CompletionError> { Err(CompletionError::Status(500)) };
        let mut s = TauntSession::new(CompletionConfig::default());
        assert!(s.act(&Action::Egg, &failing).is_err());
        assert_eq!(s.hits(), 1);
    }
}
