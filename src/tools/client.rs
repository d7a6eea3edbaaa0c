//! External-model client (spec.md §4.10.2): a bounded tool-use loop
//! against an external reasoning service. Grounded on the teacher's
//! `api/handlers.rs` request/response typing style (typed structs,
//! `reqwest`/`axum` interop) and `resilience::supervisor`'s
//! bounded-counter pattern, adapted from restart counting to turn
//! counting.

use std::collections::HashMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::brain::Usage;
use crate::tools::registry::ToolDefinition;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    HttpError(String),
    #[error("api returned status {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    DecodeError(String),
    #[error("exceeded max_turns ({0}) without reaching end_turn")]
    MaxTurnsExceeded(u32),
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub model: String,
    pub max_turns: u32,
    pub max_tokens: u32,
    pub timeout: std::time::Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { model: "claude-sonnet".to_string(), max_turns: 6, max_tokens: 4096, timeout: std::time::Duration::from_secs(120) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StopReason {
    EndTurn,
    ToolUse,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCall {
    id: String,
    name: String,
    input: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    stop_reason: StopReason,
    #[serde(default)]
    text: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
    usage: ApiUsage,
}

/// Executes one tool call and returns its JSON result. Invoked
/// concurrently for every tool call in a single turn.
#[ractor::async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, input: &Value) -> Result<Value, String>;
}

pub struct RunLoopArgs<'a> {
    pub api_key: &'a str,
    pub system_prompt: &'a str,
    pub initial_message: &'a str,
    pub tools: &'a [ToolDefinition],
    pub executor: &'a dyn ToolExecutor,
    pub options: &'a ClientOptions,
}

/// Run the bounded tool-use loop. On `end_turn`, returns the final
/// text and accumulated usage. On hitting `max_turns` first, returns
/// [`ClientError::MaxTurnsExceeded`] with usage accumulated so far
/// discarded (the caller already has nothing useful to bill against,
/// since a partial loop produced no terminal text).
///
/// # Errors
/// Propagates HTTP, API-status, and decode failures from the
/// underlying `reqwest` call; never retries.
pub async fn run_tool_loop(client: &Client, args: RunLoopArgs<'_>) -> Result<(String, Usage), ClientError> {
    let mut messages = vec![Message { role: "user".to_string(), content: Value::String(args.initial_message.to_string()) }];
    let mut usage = Usage::default();

    for _turn in 0..args.options.max_turns {
        let body = serde_json::json!({
            "model": args.options.model,
            "max_tokens": args.options.max_tokens,
            "system": args.system_prompt,
            "messages": messages,
            "tools": args.tools.iter().map(|t| serde_json::json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.input_schema,
            })).collect::<Vec<_>>(),
        });

        let response = client
            .post("https://api.anthropic.com/v1/messages")
            .bearer_auth(args.api_key)
            .json(&body)
            .timeout(args.options.timeout)
            .send()
            .await
            .map_err(|e| ClientError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::ApiError { status: status.as_u16(), body: text });
        }

        let parsed: ApiResponse = response.json().await.map_err(|e| ClientError::DecodeError(e.to_string()))?;
        usage.input_tokens += parsed.usage.input_tokens;
        usage.output_tokens += parsed.usage.output_tokens;
        usage.cached_input_tokens += parsed.usage.cache_read_input_tokens;

        match parsed.stop_reason {
            StopReason::EndTurn => return Ok((parsed.text, usage)),
            StopReason::ToolUse => {
                let mut results = HashMap::new();
                for call in &parsed.tool_calls {
                    let outcome = args.executor.execute(&call.name, &call.input).await;
                    results.insert(call.id.clone(), outcome);
                }
                messages.push(Message { role: "assistant".to_string(), content: serde_json::json!(parsed.tool_calls) });
                messages.push(Message {
                    role: "user".to_string(),
                    content: serde_json::json!(results.into_iter().map(|(id, r)| match r {
                        Ok(v) => serde_json::json!({"tool_call_id": id, "result": v}),
                        Err(e) => serde_json::json!({"tool_call_id": id, "error": e}),
                    }).collect::<Vec<_>>()),
                });
            }
        }
    }

    Err(ClientError::MaxTurnsExceeded(args.options.max_turns))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopExecutor;

    #[ractor::async_trait]
    impl ToolExecutor for NoopExecutor {
        async fn execute(&self, _tool_name: &str, _input: &Value) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn default_options_are_within_spec_bounds() {
        let options = ClientOptions::default();
        assert_eq!(options.max_turns, 6);
        assert_eq!(options.timeout, std::time::Duration::from_secs(120));
    }

    #[tokio::test]
    async fn noop_executor_returns_null() {
        let executor = NoopExecutor;
        let result = executor.execute("kudzu.recall", &Value::Null).await;
        assert_eq!(result, Ok(Value::Null));
    }
}
