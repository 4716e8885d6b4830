//! # service-directory
//!
//! Chat assistant for a service-provider marketplace. When a user writes in a
//! room the assistant shares, it looks up categories and providers through
//! tool calls and answers in the same room.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────────────────────────────────┐
//! │ message      │   │ TurnController                                 │
//! │ created      │──▶│  eligibility ─▶ categories + history ─▶ Agent  │
//! │ event        │   │                       │                  │     │
//! └──────────────┘   │               ProviderDirectory ◀── tools│     │
//!                    │                       │                  ▼     │
//!                    │                 DocumentStore ◀── ReplyPersister│
//!                    └────────────────────────────────────────────────┘
//! ```
//!
//! The document store is a trait with an in-memory and a Firestore
//! implementation; the reasoning service is any `chat_core::LlmProvider`.

pub mod controller;
pub mod directory;
pub mod error;
pub mod history;
pub mod model;
pub mod persist;
pub mod store;
pub mod svckit;

pub use controller::{ControllerConfig, SkipReason, TurnController, TurnOutcome, TurnState};
pub use directory::ProviderDirectory;
pub use error::{DirectoryError, Result};
pub use history::HistoryLoader;
pub use model::{Message, MessageCreated, Profile, Room, Tag};
pub use persist::ReplyPersister;
pub use store::{DocumentStore, FirestoreConfig, FirestoreStore, MemoryStore};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        CategoryCatalogTool, ProfileLookupTool, ProvidersByCategoryTool, ServiceCategoriesTool,
    };
}

/// System instruction for the directory assistant; `{categories}` is
/// replaced with the current category list
pub const DIRECTORY_ASSISTANT_PROMPT: &str = "Eres un asistente que responde cualquier pregunta \
que te hagan los usuarios de una aplicación de servicios.

Las categorías de servicio disponibles son: {categories}.

Si la pregunta está relacionada con alguna de las tools disponibles, usa siempre la tool primero. \
Nunca respondas preguntas sobre servicios o proveedores usando solo la conversación anterior: \
consulta siempre las tools, aunque la respuesta parezca estar en el historial. \
Para buscar proveedores usa una de las categorías exactamente como aparece en la lista. \
Caso contrario puedes responder usando tu propia información.

Cuando sea posible organiza la respuesta en bulletpoints. \
Responde en no más de 50 palabras de ser posible.";

/// Fill the category list into the system instruction
pub fn render_system_prompt(categories: &[String]) -> String {
    let listed = if categories.is_empty() {
        "(ninguna)".to_string()
    } else {
        categories.join(", ")
    };
    DIRECTORY_ASSISTANT_PROMPT.replace("{categories}", &listed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_system_prompt() {
        let prompt = render_system_prompt(&["electricidad".into(), "plomeria".into()]);
        assert!(prompt.contains("disponibles son: electricidad, plomeria."));
        assert!(!prompt.contains("{categories}"));
        assert!(render_system_prompt(&[]).contains("(ninguna)"));
    }
}
