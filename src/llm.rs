//! Optional LLM access for summaries, advice and chat replies.
//!
//! Every caller treats the LLM as best effort: a `None` from [`Llm`] means
//! "fall back to the heuristic answer".

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, LlmMode};

/// Failure classes the retry loop cares about.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("request failed: {message}")]
    Transient { message: String },

    #[error("failed to parse LLM response: {message}")]
    Parse { message: String },
}

impl LlmError {
    /// Classify a provider failure. Auth-like failures are never retried.
    pub fn classify(status: Option<u16>, message: String) -> Self {
        let lower = message.to_lowercase();
        let auth_like = matches!(status, Some(401) | Some(403))
            || ["invalid api key", "authentication", "invalid request"]
                .iter()
                .any(|needle| lower.contains(needle));
        if auth_like {
            Self::Auth { message }
        } else {
            Self::Transient { message }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

pub trait Llm {
    fn available(&self) -> bool;
    fn summarize(&self, text: &str) -> Option<String>;
    fn chat(&self, messages: &[ChatMessage]) -> Option<String>;
}

fn first_words(text: &str, n: usize) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    (words.iter().take(n).copied().collect::<Vec<_>>().join(" "), words.len() > n)
}

fn last_user_message(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

/// No credential: never available.
pub struct NoLlm;

impl Llm for NoLlm {
    fn available(&self) -> bool {
        false
    }

    fn summarize(&self, _text: &str) -> Option<String> {
        None
    }

    fn chat(&self, _messages: &[ChatMessage]) -> Option<String> {
        None
    }
}

/// A key is configured but no network call is made; output is a truncation
/// tagged `[llm]`.
pub struct KeyStub;

impl Llm for KeyStub {
    fn available(&self) -> bool {
        true
    }

    fn summarize(&self, text: &str) -> Option<String> {
        let (head, more) = first_words(text, 12);
        Some(format!("{head}{}", if more { " ...[llm]" } else { " [llm]" }))
    }

    fn chat(&self, messages: &[ChatMessage]) -> Option<String> {
        self.summarize(last_user_message(messages))
    }
}

/// Deterministic adapter for demos and tests.
pub struct MockLlm;

impl Llm for MockLlm {
    fn available(&self) -> bool {
        true
    }

    fn summarize(&self, text: &str) -> Option<String> {
        let (head, more) = first_words(text, 10);
        Some(format!("[mock-llm] {head}{}", if more { " ..." } else { "" }))
    }

    fn chat(&self, messages: &[ChatMessage]) -> Option<String> {
        self.summarize(last_user_message(messages))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => anyhow::bail!("unknown provider '{s}': must be openai or anthropic"),
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    /// Base seconds for exponential backoff.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_factor: 1.0,
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_factor * 2f64.powi(attempt.saturating_sub(1) as i32);
        let jitter = rand::thread_rng().gen_range(0.0..0.5);
        Duration::from_secs_f64(base + jitter)
    }

    /// Run `call` until it succeeds, an auth error occurs, or attempts run out.
    pub fn run<T>(
        &self,
        mut call: impl FnMut() -> Result<T, LlmError>,
        mut sleep: impl FnMut(Duration),
    ) -> Option<T> {
        for attempt in 1..=self.retries {
            match call() {
                Ok(value) => return Some(value),
                Err(LlmError::Auth { message }) => {
                    tracing::warn!(%message, "LLM authentication failed, not retrying");
                    return None;
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "LLM call failed");
                    if attempt >= self.retries {
                        break;
                    }
                    sleep(self.delay(attempt));
                }
            }
        }
        None
    }
}

/// Real HTTP provider.
pub struct HttpLlm {
    provider: Provider,
    key: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpLlm {
    pub fn new(provider: Provider, key: String) -> Self {
        let model = std::env::var("PKMS_LLM_MODEL")
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());
        Self {
            provider,
            key,
            model,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    fn request(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, LlmError> {
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let result = match self.provider {
            Provider::OpenAi => agent
                .post("https://api.openai.com/v1/chat/completions")
                .set("Authorization", &format!("Bearer {}", self.key))
                .send_json(serde_json::json!({
                    "model": self.model,
                    "messages": messages,
                    "max_tokens": max_tokens,
                    "temperature": 0.2,
                })),
            Provider::Anthropic => {
                let system: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == "system")
                    .map(|m| m.content.as_str())
                    .collect();
                let rest: Vec<&ChatMessage> =
                    messages.iter().filter(|m| m.role != "system").collect();
                agent
                    .post("https://api.anthropic.com/v1/messages")
                    .set("x-api-key", &self.key)
                    .set("anthropic-version", "2023-06-01")
                    .send_json(serde_json::json!({
                        "model": self.model,
                        "system": system.join("\n"),
                        "messages": rest,
                        "max_tokens": max_tokens,
                    }))
            }
        };

        let resp = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                return Err(LlmError::classify(Some(code), format!("HTTP {code}: {body}")));
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(LlmError::classify(None, t.to_string()));
            }
        };

        let json: serde_json::Value = resp.into_json().map_err(|e| LlmError::Parse {
            message: e.to_string(),
        })?;
        extract_text(&json).ok_or_else(|| LlmError::Parse {
            message: "no text in response".into(),
        })
    }
}

/// Pull the reply text out of either provider's response shape.
pub fn extract_text(json: &serde_json::Value) -> Option<String> {
    let choice = &json["choices"][0];
    choice["message"]["content"]
        .as_str()
        .or_else(|| choice["text"].as_str())
        .or_else(|| json["content"][0]["text"].as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Llm for HttpLlm {
    fn available(&self) -> bool {
        true
    }

    fn summarize(&self, text: &str) -> Option<String> {
        let messages = [
            ChatMessage::new("system", "You are a concise summarizer."),
            ChatMessage::new(
                "user",
                format!("Summarize the following text in one short sentence:\n\n{text}"),
            ),
        ];
        self.retry
            .run(|| self.request(&messages, 60), std::thread::sleep)
    }

    fn chat(&self, messages: &[ChatMessage]) -> Option<String> {
        self.retry
            .run(|| self.request(messages, 256), std::thread::sleep)
    }
}

/// A key saved by `setup-llm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKey {
    pub provider: Provider,
    pub api_key: String,
}

pub fn store_key(path: &Path, key: &StoredKey) -> Result<()> {
    crate::store::write_json_atomic(path, key)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }
    Ok(())
}

pub fn load_key(path: &Path) -> Option<StoredKey> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable key file");
            None
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Find a credential: environment first, then the saved key file.
pub fn detect_key(key_file: &Path) -> Option<(Provider, String)> {
    if let Some(key) = env_key("OPENAI_API_KEY").or_else(|| env_key("OPENAI_KEY")) {
        return Some((Provider::OpenAi, key));
    }
    if let Some(key) = env_key("ANTHROPIC_KEY") {
        return Some((Provider::Anthropic, key));
    }
    load_key(key_file).map(|k| (k.provider, k.api_key))
}

/// Build the adapter the configuration asks for.
pub fn from_config(config: &Config) -> Box<dyn Llm> {
    if config.llm_mode == LlmMode::Mock {
        return Box::new(MockLlm);
    }
    if config.llm_mode == LlmMode::Off {
        return Box::new(NoLlm);
    }
    let Some((provider, key)) = detect_key(&config.paths().llm_json()) else {
        tracing::info!("LLM adapter inactive (no key found)");
        return Box::new(NoLlm);
    };
    tracing::info!(?provider, "LLM adapter active (key detected)");
    match config.llm_mode {
        LlmMode::Stub => Box::new(KeyStub),
        _ => Box::new(HttpLlm::new(provider, key)),
    }
}
