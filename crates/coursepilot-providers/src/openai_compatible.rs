//! Unified chat-completions provider.
//!
//! A single struct handles all supported backends; entries in the
//! registry differ only by endpoint URL and auth style. Anthropic's
//! native Messages API diverges from the OpenAI dialect in request and
//! response shape, so both mappings live here behind one [`Provider`]
//! implementation.
//!
//! Transport and API errors are reported to the caller as-is. There is
//! no silent retry: a failed generation surfaces as an error so the
//! caller never mistakes a degraded answer for a normal one.

use async_trait::async_trait;
use coursepilot_core::config::CoursePilotConfig;
use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::provider::{GenerateParams, Provider};
use coursepilot_core::types::{
    FunctionCall, Message, ProviderResponse, Role, ToolCall, ToolDefinition, Usage,
};
use serde_json::{Value, json};

use crate::registry::{AuthStyle, ProviderConfig};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: String,
    base_url: String,
    chat_path: String,
    auth_style: AuthStyle,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a registry entry + loaded config.
    ///
    /// API key resolution: `config.api_key` > env vars listed in the
    /// registry entry > empty. Base URL: env override > registry default.
    pub fn from_registry(entry: &ProviderConfig, config: &CoursePilotConfig) -> Self {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            entry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = entry
            .base_url_env
            .and_then(|env_key| {
                let val = std::env::var(env_key).ok()?;
                if val.ends_with("/v1") {
                    Some(val)
                } else {
                    Some(format!("{}/v1", val.trim_end_matches('/')))
                }
            })
            .unwrap_or_else(|| entry.base_url.to_string());

        // Transport-level bound; the generation loop enforces its own
        // per-call timeout on top.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.generation.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            name: entry.name.to_string(),
            api_key,
            base_url,
            chat_path: entry.chat_path.to_string(),
            auth_style: entry.auth_style,
            client,
        }
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer => req.header("Authorization", format!("Bearer {}", self.api_key)),
            AuthStyle::AnthropicNative => req
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            AuthStyle::None => req,
        }
    }

    /// Build an Anthropic Messages API body. System prompt is a top-level
    /// field; tool calls and results travel as content blocks.
    fn anthropic_body(
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Value {
        let msgs: Vec<Value> = messages
            .iter()
            .map(|msg| match msg.role {
                Role::Assistant if msg.tool_calls.is_some() => {
                    let mut blocks: Vec<Value> = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(json!({ "type": "text", "text": msg.content }));
                    }
                    for call in msg.tool_calls.as_deref().unwrap_or_default() {
                        let input: Value = serde_json::from_str(&call.function.arguments)
                            .unwrap_or_else(|_| json!({}));
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.function.name,
                            "input": input,
                        }));
                    }
                    json!({ "role": "assistant", "content": blocks })
                }
                Role::Tool => json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": msg.tool_call_id,
                        "content": msg.content,
                    }]
                }),
                _ => json!({ "role": msg.role, "content": msg.content }),
            })
            .collect();

        let mut body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "system": system,
            "messages": msgs,
        });
        if !tools.is_empty() {
            let defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            body["tools"] = Value::Array(defs);
        }
        body
    }

    /// Build an OpenAI chat-completions body. System prompt becomes the
    /// leading message.
    fn openai_body(
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Value {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(Message::system(system));
        all.extend_from_slice(messages);

        let mut body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "messages": all,
        });
        if !tools.is_empty() {
            let defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(defs);
        }
        body
    }

    fn parse_anthropic(json: &Value) -> Result<ProviderResponse> {
        let blocks = json["content"]
            .as_array()
            .ok_or_else(|| CoursePilotError::Provider("no content in response".into()))?;

        let mut text_parts: Vec<&str> = Vec::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(t) = block["text"].as_str() {
                        text_parts.push(t);
                    }
                }
                Some("tool_use") => {
                    tool_calls.push(ToolCall {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: block["name"].as_str().unwrap_or_default().to_string(),
                            arguments: block["input"].to_string(),
                        },
                    });
                }
                _ => {}
            }
        }

        let usage = json["usage"].as_object().map(|u| {
            let prompt = u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
            let completion = u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
            Usage { prompt_tokens: prompt, completion_tokens: completion, total_tokens: prompt + completion }
        });

        Ok(ProviderResponse {
            content: (!text_parts.is_empty()).then(|| text_parts.join("")),
            tool_calls,
            finish_reason: json["stop_reason"].as_str().map(String::from),
            usage,
        })
    }

    fn parse_openai(json: &Value) -> Result<ProviderResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| CoursePilotError::Provider("no choices in response".into()))?;

        let tool_calls = choice["message"]["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|t| {
                        Some(ToolCall {
                            id: t["id"].as_str().unwrap_or_default().to_string(),
                            call_type: "function".to_string(),
                            function: FunctionCall {
                                name: t["function"]["name"].as_str()?.to_string(),
                                arguments: t["function"]["arguments"].as_str()?.to_string(),
                            },
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = json["usage"].as_object().map(|u| Usage {
            prompt_tokens: u.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
            completion_tokens: u.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
            total_tokens: u.get("total_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        });

        Ok(ProviderResponse {
            content: choice["message"]["content"].as_str().map(String::from),
            tool_calls,
            finish_reason: choice["finish_reason"].as_str().map(String::from),
            usage,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<ProviderResponse> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(CoursePilotError::ApiKeyMissing(self.name.clone()));
        }

        let is_anthropic = self.auth_style == AuthStyle::AnthropicNative;
        let body = if is_anthropic {
            Self::anthropic_body(system, messages, tools, params)
        } else {
            Self::openai_body(system, messages, tools, params)
        };

        let url = format!("{}{}", self.base_url, self.chat_path);
        tracing::debug!(provider = %self.name, model = %params.model, tools = tools.len(), "chat request");

        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        let resp = self.apply_auth(req).send().await.map_err(|e| {
            CoursePilotError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CoursePilotError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| CoursePilotError::Http(e.to_string()))?;

        if is_anthropic {
            Self::parse_anthropic(&json)
        } else {
            Self::parse_openai(&json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GenerateParams {
        GenerateParams { model: "m".into(), temperature: 0.0, max_tokens: 800 }
    }

    #[test]
    fn test_anthropic_body_shape() {
        let messages = vec![Message::user("What is MCP?")];
        let tools = vec![ToolDefinition {
            name: "search_course_content".into(),
            description: "Search".into(),
            parameters: json!({"type": "object"}),
        }];
        let body = OpenAiCompatibleProvider::anthropic_body("sys", &messages, &tools, &params());
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        // OpenAI-style function wrapper must not leak in
        assert!(body["tools"][0].get("function").is_none());
    }

    #[test]
    fn test_anthropic_body_maps_tool_turns() {
        let call = ToolCall {
            id: "toolu_1".into(),
            call_type: "function".into(),
            function: FunctionCall {
                name: "search_course_content".into(),
                arguments: r#"{"query":"mcp"}"#.into(),
            },
        };
        let messages = vec![
            Message::user("q"),
            Message::assistant_tool_calls("", vec![call]),
            Message::tool("[result text]", "toolu_1"),
        ];
        let body = OpenAiCompatibleProvider::anthropic_body("sys", &messages, &[], &params());
        assert_eq!(body["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(body["messages"][1]["content"][0]["input"]["query"], "mcp");
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["messages"][2]["content"][0]["type"], "tool_result");
        assert_eq!(body["messages"][2]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_openai_body_prepends_system() {
        let messages = vec![Message::user("hello")];
        let body = OpenAiCompatibleProvider::openai_body("sys", &messages, &[], &params());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_anthropic_tool_use() {
        let json = json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "search_course_content",
                 "input": {"query": "mcp"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let resp = OpenAiCompatibleProvider::parse_anthropic(&json).unwrap();
        assert_eq!(resp.content.as_deref(), Some("Let me check."));
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].function.name, "search_course_content");
        let args: Value = serde_json::from_str(&resp.tool_calls[0].function.arguments).unwrap();
        assert_eq!(args["query"], "mcp");
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_openai_direct_answer() {
        let json = json!({
            "choices": [{
                "message": {"content": "An answer."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
        });
        let resp = OpenAiCompatibleProvider::parse_openai(&json).unwrap();
        assert_eq!(resp.content.as_deref(), Some("An answer."));
        assert!(resp.tool_calls.is_empty());
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_empty_body_is_provider_error() {
        assert!(OpenAiCompatibleProvider::parse_openai(&json!({})).is_err());
        assert!(OpenAiCompatibleProvider::parse_anthropic(&json!({})).is_err());
    }
}
