//! Service Categories Tool
//!
//! Offers the model the most used category labels.

use async_trait::async_trait;

use chat_core::{Result as CoreResult, Tool, ToolCall, ToolOutput, ToolSchema};

use crate::directory::ProviderDirectory;

pub const NAME: &str = "get_service_categories";

/// Lists service categories ranked by usage
pub struct ServiceCategoriesTool {
    directory: ProviderDirectory,
}

impl ServiceCategoriesTool {
    pub const fn new(directory: ProviderDirectory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for ServiceCategoriesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Get service categories from the database, most used last".into(),
            parameters: vec![],
            category: Some("directory".into()),
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolOutput> {
        Ok(ToolOutput::List(self.directory.list_categories().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fixtures::add_tag;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_lists_categories_without_arguments() {
        let store = Arc::new(MemoryStore::new());
        add_tag(&store, "a", Some("plomeria"), 3).await;
        add_tag(&store, "b", Some("electricidad"), 8).await;

        let tool = ServiceCategoriesTool::new(ProviderDirectory::new(store));
        let call = ToolCall::new(NAME);
        assert!(tool.validate(&call).is_ok());
        assert_eq!(
            tool.execute(&call).await.unwrap(),
            ToolOutput::List(vec!["plomeria".into(), "electricidad".into()])
        );
    }
}
