//! Category Catalog Tool

use async_trait::async_trait;

use chat_core::{Result as CoreResult, Tool, ToolCall, ToolOutput, ToolSchema};

use crate::directory::ProviderDirectory;

pub const NAME: &str = "get_category_catalog";

/// Lists the curated category catalog
pub struct CategoryCatalogTool {
    directory: ProviderDirectory,
}

impl CategoryCatalogTool {
    pub const fn new(directory: ProviderDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for CategoryCatalogTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Get the full catalog of service category names".into(),
            parameters: vec![],
            category: Some("directory".into()),
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolOutput> {
        Ok(ToolOutput::List(self.directory.catalog_categories().await?))
    }
}
