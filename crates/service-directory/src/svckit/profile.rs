//! Profile Lookup Tool

use async_trait::async_trait;

use chat_core::{
    ChatError, ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolOutput, ToolSchema,
};

use crate::directory::ProviderDirectory;

pub const NAME: &str = "get_profile_by_name";

/// Full profile of a provider, looked up by display name
pub struct ProfileLookupTool {
    directory: ProviderDirectory,
}

impl ProfileLookupTool {
    pub const fn new(directory: ProviderDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for ProfileLookupTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Get a provider's profile (service, location and details) \
                          by exact display name"
                .into(),
            parameters: vec![ParameterSchema::string(
                "name",
                "Provider display name, e.g. 'Juan Perez'",
            )],
            category: Some("directory".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolOutput> {
        let name = call
            .str_arg("name")
            .ok_or_else(|| ChatError::ToolValidation("Missing required parameter: name".into()))?;

        let profile = self.directory.find_profile_by_name(name).await?;
        Ok(ToolOutput::Record(serde_json::to_value(profile)?))
    }
}
