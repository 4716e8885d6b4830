//! Providers By Category Tool

use async_trait::async_trait;

use chat_core::{
    ChatError, ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolOutput, ToolSchema,
};

use crate::directory::ProviderDirectory;

pub const NAME: &str = "get_providers_by_category";

/// Names of providers offering a category
pub struct ProvidersByCategoryTool {
    directory: ProviderDirectory,
}

impl ProvidersByCategoryTool {
    pub const fn new(directory: ProviderDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for ProvidersByCategoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Get the names of service providers for a category. \
                          The tag must be one of the service categories exactly as listed."
                .into(),
            parameters: vec![ParameterSchema::string("tag", "Service category, e.g. 'plomeria'")],
            category: Some("directory".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolOutput> {
        let tag = call
            .str_arg("tag")
            .ok_or_else(|| ChatError::ToolValidation("Missing required parameter: tag".into()))?;

        Ok(ToolOutput::List(self.directory.find_providers_by_category(tag).await?))
    }
}
