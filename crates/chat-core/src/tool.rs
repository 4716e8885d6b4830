//! Tool System
//!
//! Declared callables the reasoning service may request by name.
//! Tools are registered once at startup and dispatched by the agent turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ChatError, Result};

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs, copied verbatim from the model
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,

    /// Optional call ID for tracking
    #[serde(default)]
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            id: None,
        }
    }

    pub fn with_argument(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// String argument, if present and a string
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// What a handler hands back to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    /// Ordered list of labels or names
    List(Vec<String>),
    /// Structured record
    Record(serde_json::Value),
}

impl ToolOutput {
    /// Package as a function-response payload of at most `limit` characters.
    ///
    /// Lists keep whole leading entries while they fit; an oversized record
    /// is replaced by a prefix of its JSON text.
    pub fn to_payload(&self, limit: usize) -> serde_json::Value {
        let content = match self {
            Self::List(items) => serde_json::Value::from(bounded_list(items, limit)),
            Self::Record(record) => {
                let text = record.to_string();
                if text.chars().count() <= limit {
                    record.clone()
                } else {
                    serde_json::Value::String(text.chars().take(limit).collect())
                }
            }
        };
        serde_json::json!({ "content": content })
    }

    pub const fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Record(_) => 1,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::List(items) if items.is_empty())
    }
}

fn bounded_list(items: &[String], limit: usize) -> Vec<String> {
    // "[" + "]"
    let mut used = 2;
    let mut kept = Vec::new();
    for item in items {
        let quoted = serde_json::Value::from(item.as_str()).to_string();
        let cost = quoted.chars().count() + usize::from(!kept.is_empty());
        if used + cost > limit {
            break;
        }
        used += cost;
        kept.push(item.clone());
    }
    kept
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: "string".into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool definition schema (function declaration offered to the model)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,
}

impl ToolSchema {
    /// JSON Schema object for the parameters, `None` for parameterless tools
    pub fn to_json_schema(&self) -> Option<serde_json::Value> {
        if self.parameters.is_empty() {
            return None;
        }

        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({ "type": p.param_type, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        Some(serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }))
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's declaration
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput>;

    /// Validate arguments before execution
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            match call.arguments.get(&param.name) {
                None if param.required => {
                    return Err(ChatError::ToolValidation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                Some(value) if param.param_type == "string" && !value.is_string() => {
                    return Err(ChatError::ToolValidation(format!(
                        "Parameter {} must be a string",
                        param.name
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Check a declaration name against what function-calling APIs accept
pub fn is_valid_tool_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 64
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, rejecting invalid or duplicate names
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_boxed(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();

        if !is_valid_tool_name(&schema.name) {
            return Err(ChatError::ToolValidation(format!(
                "Invalid tool name: {:?}",
                schema.name
            )));
        }
        if self.tools.contains_key(&schema.name) {
            return Err(ChatError::ToolValidation(format!(
                "Duplicate tool name: {}",
                schema.name
            )));
        }

        self.tools.insert(schema.name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Dispatch a call to its handler; unknown names are never invoked
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolOutput> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ChatError::ToolNotFound(call.name.clone()))?;

        tool.validate(call)?;

        tracing::debug!(tool = %call.name, args = call.arguments.len(), "Dispatching tool call");
        tool.execute(call).await
    }

    /// All declarations, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call it receives
    struct RecordingTool {
        name: &'static str,
        params: Vec<ParameterSchema>,
        calls: Arc<Mutex<Vec<ToolCall>>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name.into(),
                description: "test tool".into(),
                parameters: self.params.clone(),
                category: None,
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(call.clone());
            Ok(ToolOutput::List(vec![self.name.to_string()]))
        }
    }

    type Calls = Arc<Mutex<Vec<ToolCall>>>;

    fn recording(name: &'static str, params: Vec<ParameterSchema>) -> (RecordingTool, Calls) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingTool { name, params, calls: calls.clone() },
            calls,
        )
    }

    #[tokio::test]
    async fn test_dispatch_invokes_only_named_handler() {
        let (providers, provider_calls) = recording(
            "get_providers_by_category",
            vec![ParameterSchema::string("tag", "category")],
        );
        let (categories, category_calls) = recording("get_service_categories", vec![]);

        let mut registry = ToolRegistry::new();
        registry.register(providers).unwrap();
        registry.register(categories).unwrap();

        let call = ToolCall::new("get_providers_by_category").with_argument("tag", "plumbing");
        let output = registry.dispatch(&call).await.unwrap();

        assert_eq!(output, ToolOutput::List(vec!["get_providers_by_category".into()]));
        let seen = provider_calls.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].str_arg("tag"), Some("plumbing"));
        assert_eq!(seen[0].arguments.len(), 1);
        assert!(category_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_closed() {
        let (tool, calls) = recording("get_service_categories", vec![]);
        let mut registry = ToolRegistry::new();
        registry.register(tool).unwrap();

        let err = registry.dispatch(&ToolCall::new("drop_tables")).await.unwrap_err();
        assert!(matches!(err, ChatError::ToolNotFound(name) if name == "drop_tables"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let (tool, calls) = recording(
            "get_profile_by_name",
            vec![ParameterSchema::string("name", "display name")],
        );
        let mut registry = ToolRegistry::new();
        registry.register(tool).unwrap();

        let err = registry.dispatch(&ToolCall::new("get_profile_by_name")).await.unwrap_err();
        assert!(matches!(err, ChatError::ToolValidation(_)));

        let wrong_type = ToolCall::new("get_profile_by_name").with_argument("name", 42);
        assert!(registry.dispatch(&wrong_type).await.is_err());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_registry_rejects_bad_declarations() {
        let mut registry = ToolRegistry::new();
        registry.register(recording("get_service_categories", vec![]).0).unwrap();

        assert!(registry.register(recording("get_service_categories", vec![]).0).is_err());
        assert!(registry.register(recording("9lives", vec![]).0).is_err());
        assert!(registry.register(recording("has space", vec![]).0).is_err());
        assert_eq!(registry.names(), vec!["get_service_categories"]);
    }

    #[test]
    fn test_json_schema() {
        let schema = ToolSchema {
            name: "get_providers_by_category".into(),
            description: "providers".into(),
            parameters: vec![ParameterSchema::string("tag", "category label")],
            category: None,
        };
        let json = schema.to_json_schema().unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["tag"]["type"], "string");
        assert_eq!(json["required"][0], "tag");

        let bare = ToolSchema { parameters: vec![], ..schema };
        assert!(bare.to_json_schema().is_none());
    }

    #[test]
    fn test_payload_truncation() {
        let names: Vec<String> = (0..50).map(|i| format!("Proveedor numero {i}")).collect();
        let payload = ToolOutput::List(names).to_payload(200);
        let kept = payload["content"].as_array().unwrap();

        assert!(!kept.is_empty());
        assert!(kept.len() < 50);
        assert!(payload["content"].to_string().chars().count() <= 200);
        assert_eq!(kept[0], "Proveedor numero 0");
    }

    #[test]
    fn test_record_payload() {
        let record = serde_json::json!({ "displayName": "Juan Perez" });
        let payload = ToolOutput::Record(record.clone()).to_payload(20_000);
        assert_eq!(payload["content"], record);

        let clipped = ToolOutput::Record(record).to_payload(5);
        assert_eq!(clipped["content"].as_str().unwrap().chars().count(), 5);
    }
}
