//! Agent Turn
//!
//! Runs one user turn against the reasoning service: send the message, and
//! while the model asks for a registered tool (up to `max_tool_hops` times)
//! run it and send the result back in the same session.

use std::sync::Arc;

use crate::error::{ChatError, Result};
use crate::message::Conversation;
use crate::provider::{ChatResponse, GenerationOptions, LlmProvider};
use crate::session::ChatSession;
use crate::tool::{Tool, ToolCall, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Generation options
    pub generation: GenerationOptions,

    /// Tool round-trips allowed per user turn
    pub max_tool_hops: usize,

    /// Character budget for a single function-response payload
    pub tool_output_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::default(),
            max_tool_hops: 1,
            tool_output_limit: 20_000,
        }
    }
}

/// Final answer for one user turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    /// Natural-language answer to persist
    pub text: String,

    /// Tools that actually ran, in order
    pub tools_used: Vec<String>,

    /// Tool the model asked for that is not registered
    pub unrecognized_tool: Option<String>,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Answer `message` given replayed `history` and a system instruction
    pub async fn respond(
        &self,
        history: &Conversation,
        system_instruction: &str,
        message: &str,
    ) -> Result<AgentReply> {
        let mut session = ChatSession::new(self.provider.clone(), self.config.generation.clone())
            .with_system_instruction(system_instruction)
            .with_tools(self.tools.schemas())
            .with_history(history.to_contents());

        tracing::debug!(
            session = %session.id,
            provider = self.provider.name(),
            history = history.len(),
            "First dispatch"
        );
        let mut response = session.send_message(message).await?;

        let mut tools_used = Vec::new();
        let mut unrecognized_tool = None;

        while let Some(call) = response.function_call().cloned() {
            if tools_used.len() >= self.config.max_tool_hops {
                tracing::debug!(tool = %call.name, "Tool hop limit reached");
                break;
            }
            if !self.tools.contains(&call.name) {
                tracing::warn!(tool = %call.name, "Model requested an unregistered tool");
                unrecognized_tool = Some(call.name);
                break;
            }

            let payload = self.invoke(&call).await?;
            response = session.send_function_response(&call.name, payload).await?;
            tools_used.push(call.name);
        }

        Ok(AgentReply {
            text: final_text(&response)?,
            tools_used,
            unrecognized_tool,
        })
    }

    /// Run a call and package the outcome as a function-response payload.
    ///
    /// Tool faults go back to the model as `{"error": ...}`; anything else
    /// (store or network failures) aborts the turn.
    async fn invoke(&self, call: &ToolCall) -> Result<serde_json::Value> {
        match self.tools.dispatch(call).await {
            Ok(output) => {
                tracing::info!(tool = %call.name, results = output.len(), "Tool returned");
                Ok(output.to_payload(self.config.tool_output_limit))
            }
            Err(e) if e.is_tool_fault() => {
                tracing::info!(tool = %call.name, error = %e, "Tool reported a fault");
                Ok(serde_json::json!({ "error": e.to_string() }))
            }
            Err(e) => Err(e),
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

fn final_text(response: &ChatResponse) -> Result<String> {
    let text = response.text();
    if text.trim().is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(text)
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Result<Self> {
        self.tools.register(tool)?;
        Ok(self)
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub const fn max_tool_hops(mut self, max: usize) -> Self {
        self.config.max_tool_hops = max;
        self
    }

    pub const fn tool_output_limit(mut self, limit: usize) -> Self {
        self.config.tool_output_limit = limit;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| ChatError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Part, Role};
    use crate::provider::ChatRequest;
    use crate::tool::{ParameterSchema, ToolOutput, ToolSchema};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and keeps every request
    struct Script {
        responses: Mutex<VecDeque<ChatResponse>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl Script {
        fn new(responses: Vec<ChatResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for Script {
        fn name(&self) -> &str {
            "script"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ChatError::ProviderUnavailable("script exhausted".into()))
        }
    }

    struct Providers;

    #[async_trait]
    impl Tool for Providers {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "get_providers_by_category".into(),
                description: "Providers offering a category".into(),
                parameters: vec![ParameterSchema::string("tag", "category")],
                category: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
            match call.str_arg("tag") {
                Some("plomeria") => Ok(ToolOutput::List(vec!["Juan Perez".into()])),
                Some("store-down") => Err(ChatError::Store("unavailable".into())),
                other => Err(ChatError::NotFound(format!("category {other:?}"))),
            }
        }
    }

    fn agent(script: Arc<Script>, hops: usize) -> Agent {
        AgentBuilder::new()
            .provider(script)
            .tool(Providers)
            .unwrap()
            .max_tool_hops(hops)
            .build()
            .unwrap()
    }

    fn providers_call(tag: &str) -> ChatResponse {
        ChatResponse::tool_request(
            "m",
            ToolCall::new("get_providers_by_category").with_argument("tag", tag),
        )
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let script = Script::new(vec![ChatResponse::text_reply("m", "¡Hola!")]);
        let reply = agent(script.clone(), 1)
            .respond(&Conversation::new(), "sys", "hola")
            .await
            .unwrap();

        assert_eq!(reply.text, "¡Hola!");
        assert!(reply.tools_used.is_empty());
        let requests = script.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system_instruction.as_deref(), Some("sys"));
        assert_eq!(requests[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn test_single_tool_hop() {
        let script = Script::new(vec![
            providers_call("plomeria"),
            ChatResponse::text_reply("m", "Te recomiendo a Juan Perez."),
        ]);
        let history =
            Conversation::interleave(vec!["hola".to_string()], vec!["¡Hola!".to_string()]);
        let reply = agent(script.clone(), 1)
            .respond(&history, "sys", "busco un plomero")
            .await
            .unwrap();

        assert_eq!(reply.text, "Te recomiendo a Juan Perez.");
        assert_eq!(reply.tools_used, vec!["get_providers_by_category"]);

        let requests = script.requests.lock().unwrap();
        let follow_up = &requests[1].contents;
        // hola, ¡Hola!, busco un plomero, call, response
        assert_eq!(follow_up.len(), 5);
        let last = follow_up.last().unwrap();
        assert_eq!(last.role, Role::User);
        match &last.parts[0] {
            Part::FunctionResponse { name, response } => {
                assert_eq!(name, "get_providers_by_category");
                assert_eq!(response["content"][0], "Juan Perez");
            }
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hop_limit_keeps_follow_up_text() {
        let mut chained = providers_call("plomeria");
        chained.candidates[0].content.parts.push(Part::Text("Buscando...".into()));
        let script = Script::new(vec![providers_call("plomeria"), chained]);

        let reply = agent(script.clone(), 1)
            .respond(&Conversation::new(), "sys", "plomero")
            .await
            .unwrap();
        assert_eq!(reply.text, "Buscando...");
        assert_eq!(script.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_multi_hop_when_configured() {
        let script = Script::new(vec![
            providers_call("plomeria"),
            providers_call("plomeria"),
            ChatResponse::text_reply("m", "Listo"),
        ]);
        let reply = agent(script, 2)
            .respond(&Conversation::new(), "sys", "plomero")
            .await
            .unwrap();
        assert_eq!(reply.tools_used.len(), 2);
        assert_eq!(reply.text, "Listo");
    }

    #[tokio::test]
    async fn test_unrecognized_tool_keeps_original_text() {
        let mut response = ChatResponse::tool_request("m", ToolCall::new("book_appointment"));
        response.candidates[0].content.parts.push(Part::Text("No puedo agendar citas.".into()));
        let script = Script::new(vec![response]);

        let reply = agent(script.clone(), 1)
            .respond(&Conversation::new(), "sys", "agenda")
            .await
            .unwrap();
        assert_eq!(reply.text, "No puedo agendar citas.");
        assert_eq!(reply.unrecognized_tool.as_deref(), Some("book_appointment"));
        assert!(reply.tools_used.is_empty());
        assert_eq!(script.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_call_without_text_is_empty_response() {
        let script = Script::new(vec![ChatResponse::tool_request(
            "m",
            ToolCall::new("book_appointment"),
        )]);
        let err = agent(script, 1)
            .respond(&Conversation::new(), "sys", "agenda")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_tool_fault_is_reported_to_model() {
        let script = Script::new(vec![
            providers_call("carpinteria"),
            ChatResponse::text_reply("m", "No encontré proveedores."),
        ]);
        let reply = agent(script.clone(), 1)
            .respond(&Conversation::new(), "sys", "carpintero")
            .await
            .unwrap();
        assert_eq!(reply.text, "No encontré proveedores.");

        let requests = script.requests.lock().unwrap();
        match &requests[1].contents.last().unwrap().parts[0] {
            Part::FunctionResponse { response, .. } => assert!(response.get("error").is_some()),
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_aborts_turn() {
        let script = Script::new(vec![providers_call("store-down")]);
        let err = agent(script, 1)
            .respond(&Conversation::new(), "sys", "plomero")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Store(_)));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(AgentBuilder::new().build().is_err());
    }
}
