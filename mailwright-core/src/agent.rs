//! The conversational agent seam.
//!
//! Command handlers only need "send a prompt, get text back". [`HttpAgent`]
//! talks to an OpenAI-compatible chat completion endpoint; tool execution
//! and planning happen behind that endpoint, not here.

use crate::config::LlmConfig;
use crate::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Accepts a prompt and returns the agent's text response.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn input(&self, prompt: &str) -> Result<String, AgentError>;
}

/// How an agent instance is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    pub system_prompt: String,
    pub tools: Vec<&'static str>,
    pub plugins: Vec<&'static str>,
    /// Upper bound on completion rounds per input.
    pub max_iterations: usize,
    /// Carry earlier turns into later prompts.
    pub keep_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

const CONTINUE_PROMPT: &str = "Continue exactly where you left off.";
/// Conversation turns (user plus assistant) carried into the next request.
const MAX_HISTORY_TURNS: usize = 20;

/// Record a finished turn, keeping only the most recent `max_turns`.
fn push_turn(history: &mut Vec<ChatMessage>, prompt: &str, reply: &str, max_turns: usize) {
    history.push(ChatMessage::new("user", prompt));
    history.push(ChatMessage::new("assistant", reply));
    let keep = max_turns * 2;
    if history.len() > keep {
        history.drain(..history.len() - keep);
    }
}

/// Agent backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpAgent {
    spec: AgentSpec,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_retries: u32,
    history: Mutex<Vec<ChatMessage>>,
}

impl HttpAgent {
    pub fn new(spec: AgentSpec, llm: &LlmConfig, api_key: String) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()
            .map_err(|e| AgentError::Network {
                message: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self {
            spec,
            client,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            api_key,
            max_retries: llm.max_retries,
            history: Mutex::new(Vec::new()),
        })
    }

    fn system_message(&self) -> ChatMessage {
        let mut system = self.spec.system_prompt.clone();
        if !self.spec.tools.is_empty() {
            system.push_str("\n\nAvailable tools: ");
            system.push_str(&self.spec.tools.join(", "));
        }
        ChatMessage::new("system", system)
    }

    /// One completion request, retrying transport failures.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<(String, String), AgentError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(messages).await {
                Err(AgentError::Network { message }) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(agent = %self.spec.name, attempt, error = %message, "retrying LLM request");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> Result<(String, String), AgentError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        debug!(url = %url, model = %self.model, agent = %self.spec.name, "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Network {
                message: if e.is_timeout() {
                    format!("request timeout: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| AgentError::Network {
            message: format!("failed to read response body: {e}"),
        })?;

        match status.as_u16() {
            401 | 403 => return Err(AgentError::AuthFailed { status: status.as_u16() }),
            s if !status.is_success() => {
                return Err(AgentError::Request {
                    status: s,
                    message: text,
                });
            }
            _ => {}
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| AgentError::Response {
            message: format!("invalid JSON: {e}"),
        })?;
        parse_choice(&json)
    }
}

/// Extract `(content, finish_reason)` from the first choice.
fn parse_choice(json: &Value) -> Result<(String, String), AgentError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| AgentError::Response {
            message: "no choices in response".to_string(),
        })?;
    let content = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let finish = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("stop")
        .to_string();
    Ok((content, finish))
}

#[async_trait]
impl Agent for HttpAgent {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn input(&self, prompt: &str) -> Result<String, AgentError> {
        let mut history = self.history.lock().await;
        let mut messages = vec![self.system_message()];
        if self.spec.keep_history {
            messages.extend(history.iter().cloned());
        }
        messages.push(ChatMessage::new("user", prompt));

        let mut output = String::new();
        let rounds = self.spec.max_iterations.max(1);
        for round in 1..=rounds {
            let (content, finish) = self.complete(&messages).await?;
            output.push_str(&content);
            if finish != "length" {
                break;
            }
            debug!(agent = %self.spec.name, round, "completion truncated, continuing");
            messages.push(ChatMessage::new("assistant", content));
            messages.push(ChatMessage::new("user", CONTINUE_PROMPT));
        }

        if self.spec.keep_history {
            push_turn(&mut history, prompt, &output, MAX_HISTORY_TURNS);
        }
        Ok(output)
    }
}

/// Stand-in used when no API key is configured; every call fails with a
/// credential error so the session can explain how to fix it.
pub struct UnconfiguredAgent {
    name: String,
    api_key_env: String,
}

impl UnconfiguredAgent {
    pub fn new(name: impl Into<String>, api_key_env: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_key_env: api_key_env.into(),
        }
    }
}

#[async_trait]
impl Agent for UnconfiguredAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn input(&self, _prompt: &str) -> Result<String, AgentError> {
        Err(AgentError::NotConfigured {
            var: self.api_key_env.clone(),
        })
    }
}

/// Build an agent for `spec`, falling back to [`UnconfiguredAgent`] when the
/// API key variable is unset.
pub fn build_agent(spec: AgentSpec, llm: &LlmConfig) -> Arc<dyn Agent> {
    let key = std::env::var(&llm.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());
    let Some(api_key) = key else {
        warn!(var = %llm.api_key_env, agent = %spec.name, "LLM API key not set; agent calls will fail");
        return Arc::new(UnconfiguredAgent::new(spec.name, llm.api_key_env.clone()));
    };
    let name = spec.name.clone();
    match HttpAgent::new(spec, llm, api_key) {
        Ok(agent) => Arc::new(agent),
        Err(e) => {
            warn!(agent = %name, error = %e, "LLM client init failed");
            Arc::new(UnconfiguredAgent::new(name, llm.api_key_env.clone()))
        }
    }
}

/// Agent that records prompts and replies from a script. Useful for tests
/// and dry runs.
pub struct RecordingAgent {
    name: String,
    replies: std::sync::Mutex<Vec<Result<String, String>>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl RecordingAgent {
    /// Always answer with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(reply.into())])
    }

    /// Answer from `replies` in order; the last entry repeats. `Err(msg)`
    /// entries fail with a request error carrying `msg`.
    pub fn scripted(replies: Vec<Result<String, String>>) -> Self {
        Self {
            name: "recording".to_string(),
            replies: std::sync::Mutex::new(replies),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Agent for RecordingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn input(&self, prompt: &str) -> Result<String, AgentError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = match self.replies.lock() {
            Ok(mut replies) if replies.len() > 1 => replies.remove(0),
            Ok(replies) => replies
                .first()
                .cloned()
                .unwrap_or_else(|| Ok(String::new())),
            Err(_) => Ok(String::new()),
        };
        reply.map_err(|message| AgentError::Request {
            status: 500,
            message,
        })
    }
}
