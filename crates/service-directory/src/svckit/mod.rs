//! Service Kit - Directory Tools
//!
//! Tools that implement `chat_core::Tool` over the provider directory.

mod catalog;
mod categories;
mod profile;
mod providers;

pub use catalog::CategoryCatalogTool;
pub use categories::ServiceCategoriesTool;
pub use profile::ProfileLookupTool;
pub use providers::ProvidersByCategoryTool;

use chat_core::{Result as CoreResult, ToolRegistry};

use crate::directory::ProviderDirectory;

/// Registry holding every directory tool; fails on a bad declaration
pub fn registry(directory: &ProviderDirectory) -> CoreResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(ServiceCategoriesTool::new(directory.clone()))?;
    registry.register(ProvidersByCategoryTool::new(directory.clone()))?;
    registry.register(ProfileLookupTool::new(directory.clone()))?;
    registry.register(CategoryCatalogTool::new(directory.clone()))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_registry_declares_all_tools() {
        let directory = ProviderDirectory::new(Arc::new(MemoryStore::new()));
        let registry = registry(&directory).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "get_category_catalog",
                "get_profile_by_name",
                "get_providers_by_category",
                "get_service_categories",
            ]
        );
    }
}
