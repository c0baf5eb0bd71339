//! Tool-calling generation loop.
//!
//! The model is offered tools for at most `max_tool_rounds` rounds. On
//! the forced final call no tool schemas are sent, so the model must
//! produce an answer from what it has. Every provider call is bounded by
//! a timeout; an elapsed timeout or transport failure surfaces as an
//! error to the caller — never a degraded answer.

use std::sync::Arc;
use std::time::Duration;

use coursepilot_core::config::GenerationConfig;
use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::provider::{GenerateParams, Provider};
use coursepilot_core::types::Message;
use coursepilot_tools::ToolRegistry;

const SYSTEM_PROMPT: &str = "\
You are an AI assistant specialized in course materials and educational content, \
with tools for searching course content and retrieving course outlines.

Tool usage:
- Use the content search tool for questions about specific course content or detailed educational materials
- Use the outline tool for questions about a course's structure, lesson list, or links
- Synthesize tool results into accurate, fact-based responses
- If a tool yields no results, state this clearly without offering alternatives

Response requirements:
- Be brief, concise and focused
- Answer general knowledge questions directly without tools
- Do not mention the tools or your search process in the answer";

pub struct Generator {
    provider: Arc<dyn Provider>,
    params: GenerateParams,
    max_tool_rounds: usize,
    timeout: Duration,
}

impl Generator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: String,
        temperature: f32,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            provider,
            params: GenerateParams { model, temperature, max_tokens: config.max_tokens },
            max_tool_rounds: config.max_tool_rounds,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Answer one query, invoking tools as the model requests, within the
    /// round cap. Makes at most `max_tool_rounds + 1` provider calls.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: &ToolRegistry,
    ) -> Result<String> {
        let system = match history {
            Some(h) => format!("{SYSTEM_PROMPT}\n\nPrevious conversation:\n{h}"),
            None => SYSTEM_PROMPT.to_string(),
        };
        let definitions = tools.definitions();
        let mut messages = vec![Message::user(query)];

        for round in 0..=self.max_tool_rounds {
            // Final round withholds tool schemas to force an answer
            let offered = if round < self.max_tool_rounds { &definitions[..] } else { &[] };

            let response = tokio::time::timeout(
                self.timeout,
                self.provider.chat(&system, &messages, offered, &self.params),
            )
            .await
            .map_err(|_| {
                CoursePilotError::Generation(format!(
                    "model call timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

            if response.tool_calls.is_empty() || offered.is_empty() {
                return response
                    .content
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        CoursePilotError::Generation("model returned no answer text".into())
                    });
            }

            tracing::debug!(round, calls = response.tool_calls.len(), "executing tool round");
            let calls = response.tool_calls.clone();
            messages.push(Message::assistant_tool_calls(
                response.content.unwrap_or_default(),
                response.tool_calls,
            ));

            for call in &calls {
                // Tool failures feed back to the model as result text so
                // it can still answer; they are not fatal to the query.
                let output = match tools.execute(&call.function.name, &call.function.arguments).await
                {
                    Ok(result) => result.output,
                    Err(e) => {
                        tracing::warn!(tool = %call.function.name, error = %e, "tool failed");
                        format!("Tool execution failed: {e}")
                    }
                };
                messages.push(Message::tool(output, &call.id));
            }
        }

        // Every path above returns by the final round.
        unreachable!("generation loop exits on the forced final round")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coursepilot_core::types::{
        FunctionCall, ProviderResponse, Role, ToolCall, ToolDefinition, ToolResult,
    };
    use std::sync::Mutex;

    /// Replays a fixed script of responses and records every request.
    struct ScriptedProvider {
        responses: Mutex<Vec<ProviderResponse>>,
        requests: Mutex<Vec<(String, Vec<Message>, usize)>>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<ProviderResponse>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), requests: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(
            &self,
            system: &str,
            messages: &[Message],
            tools: &[ToolDefinition],
            _params: &GenerateParams,
        ) -> Result<ProviderResponse> {
            self.requests.lock().unwrap().push((
                system.to_string(),
                messages.to_vec(),
                tools.len(),
            ));
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CoursePilotError::Provider("script exhausted".into()))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl Provider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn chat(
            &self,
            _system: &str,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _params: &GenerateParams,
        ) -> Result<ProviderResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ProviderResponse::default())
        }
    }

    struct StaticTool {
        fail: bool,
    }

    #[async_trait]
    impl coursepilot_core::traits::Tool for StaticTool {
        fn name(&self) -> &str {
            "search_course_content"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "search_course_content".into(),
                description: "Search".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "query": { "type": "string" } },
                    "required": ["query"]
                }),
            }
        }

        async fn execute(&self, _arguments: &str) -> Result<ToolResult> {
            if self.fail {
                Err(CoursePilotError::Tool("index unavailable".into()))
            } else {
                Ok(ToolResult {
                    output: "[Course A - Lesson 1]\nrelevant text".into(),
                    sources: Vec::new(),
                })
            }
        }
    }

    fn registry(fail: bool) -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(Arc::new(StaticTool { fail }));
        r
    }

    fn tool_call_response() -> ProviderResponse {
        ProviderResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                call_type: "function".into(),
                function: FunctionCall {
                    name: "search_course_content".into(),
                    arguments: r#"{"query":"mcp"}"#.into(),
                },
            }],
            finish_reason: Some("tool_calls".into()),
            usage: None,
        }
    }

    fn answer_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: Some(text.into()),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".into()),
            usage: None,
        }
    }

    fn generator(provider: Arc<dyn Provider>, config: &GenerationConfig) -> Generator {
        Generator::new(provider, "test-model".into(), 0.0, config)
    }

    #[tokio::test]
    async fn test_direct_answer_needs_one_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_response("Paris.")]));
        let g = generator(provider.clone(), &GenerationConfig::default());
        let answer = g.generate("Capital of France?", None, &registry(false)).await.unwrap();
        assert_eq!(answer, "Paris.");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(),
            answer_response("MCP is a protocol."),
        ]));
        let g = generator(provider.clone(), &GenerationConfig::default());
        let answer = g.generate("What is MCP?", None, &registry(false)).await.unwrap();
        assert_eq!(answer, "MCP is a protocol.");
        assert_eq!(provider.calls(), 2);

        // Second request carries the assistant tool-call turn and the result
        let requests = provider.requests.lock().unwrap();
        let (_, messages, tool_count) = &requests[1];
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[2].role, Role::Tool);
        assert!(messages[2].content.contains("relevant text"));
        // Round cap of 1 means the second call offers no tools
        assert_eq!(*tool_count, 0);
    }

    #[tokio::test]
    async fn test_round_cap_bounds_provider_calls() {
        // The model wants tools every time; with max_tool_rounds = 2 the
        // loop still terminates in exactly 3 calls.
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(),
            tool_call_response(),
            answer_response("Done."),
        ]));
        let config = GenerationConfig { max_tool_rounds: 2, ..Default::default() };
        let g = generator(provider.clone(), &config);
        let answer = g.generate("q", None, &registry(false)).await.unwrap();
        assert_eq!(answer, "Done.");
        assert_eq!(provider.calls(), 3);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].2, 1);
        assert_eq!(requests[1].2, 1);
        assert_eq!(requests[2].2, 0);
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_result_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(),
            answer_response("I could not search the materials."),
        ]));
        let g = generator(provider.clone(), &GenerationConfig::default());
        let answer = g.generate("q", None, &registry(true)).await.unwrap();
        assert_eq!(answer, "I could not search the materials.");

        let requests = provider.requests.lock().unwrap();
        let (_, messages, _) = &requests[1];
        assert!(messages[2].content.starts_with("Tool execution failed:"));
    }

    #[tokio::test]
    async fn test_history_lands_in_system_prompt() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_response("ok")]));
        let g = generator(provider.clone(), &GenerationConfig::default());
        g.generate("q", Some("User: hi\nAssistant: hello"), &registry(false))
            .await
            .unwrap();

        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].0.contains("Previous conversation:\nUser: hi\nAssistant: hello"));
    }

    #[tokio::test]
    async fn test_no_history_no_conversation_block() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_response("ok")]));
        let g = generator(provider.clone(), &GenerationConfig::default());
        g.generate("q", None, &registry(false)).await.unwrap();
        assert!(!provider.requests.lock().unwrap()[0].0.contains("Previous conversation"));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let g = generator(provider, &GenerationConfig::default());
        assert!(g.generate("q", None, &registry(false)).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_generation_error() {
        let config = GenerationConfig { timeout_secs: 0, ..Default::default() };
        let g = generator(Arc::new(SlowProvider), &config);
        let err = g.generate("q", None, &registry(false)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![answer_response("")]));
        let g = generator(provider, &GenerationConfig::default());
        assert!(g.generate("q", None, &registry(false)).await.is_err());
    }
}
