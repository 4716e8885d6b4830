//! Agent Turn Controller
//!
//! Handles one message-created event end to end:
//!
//! ```text
//! AwaitEligibility ─▶ ContextBuild ─▶ FirstDispatch ─▶ (ToolInvoke ─▶) FinalResponse
//!        │                                                                │
//!        │ not eligible                                                   ▼
//!        └─────────────────────────────────────▶ Done ◀─────────────── Persist
//! ```
//!
//! Every step runs sequentially inside the invocation. Nothing is cached
//! between invocations; the category list and history are read fresh.

use std::sync::Arc;

use chat_core::{Agent, AgentConfig, ChatError, LlmProvider, Result as CoreResult};

use crate::directory::{DEFAULT_CATEGORY_LIMIT, ProviderDirectory};
use crate::history::{DEFAULT_HISTORY_WINDOW, HistoryLoader};
use crate::model::{MessageCreated, Room};
use crate::persist::ReplyPersister;
use crate::store::DocumentStore;
use crate::svckit;

/// Identity the assistant writes under unless configured otherwise
pub const DEFAULT_ASSISTANT_ID: &str = "bcYT3imwF7QY6OdRnRyAY19K3Zz1";

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Author id of the assistant's own messages
    pub assistant_id: String,

    /// Messages read when rebuilding history
    pub history_window: usize,

    /// Categories offered in the system instruction
    pub category_limit: usize,

    /// Model, hop limit and tool payload budget
    pub agent: AgentConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            assistant_id: DEFAULT_ASSISTANT_ID.into(),
            history_window: DEFAULT_HISTORY_WINDOW,
            category_limit: DEFAULT_CATEGORY_LIMIT,
            agent: AgentConfig::default(),
        }
    }
}

/// Controller lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    AwaitEligibility,
    ContextBuild,
    FirstDispatch,
    ToolInvoke,
    FinalResponse,
    Persist,
    Done,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AwaitEligibility => "await_eligibility",
            Self::ContextBuild => "context_build",
            Self::FirstDispatch => "first_dispatch",
            Self::ToolInvoke => "tool_invoke",
            Self::FinalResponse => "final_response",
            Self::Persist => "persist",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why an event produced no reply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Event carried no document data
    MissingData,
    RoomNotFound,
    /// Room has no `userIds`
    MissingParticipants,
    AssistantNotParticipant,
    MissingAuthor,
    /// Message written by the assistant itself
    OwnMessage,
    MissingText,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::MissingData => "missing_data",
            Self::RoomNotFound => "room_not_found",
            Self::MissingParticipants => "missing_participants",
            Self::AssistantNotParticipant => "assistant_not_participant",
            Self::MissingAuthor => "missing_author",
            Self::OwnMessage => "own_message",
            Self::MissingText => "missing_text",
        };
        f.write_str(reason)
    }
}

/// Result of one handled event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Skipped(SkipReason),
    Replied {
        /// Id of the persisted reply
        message_id: String,
        tools_used: Vec<String>,
        unrecognized_tool: Option<String>,
    },
}

/// Drives a message-created event through the turn lifecycle
pub struct TurnController {
    store: Arc<dyn DocumentStore>,
    directory: ProviderDirectory,
    history: HistoryLoader,
    persister: ReplyPersister,
    agent: Agent,
    config: ControllerConfig,
}

impl TurnController {
    /// Wire the directory tools and the agent over `store` and `provider`
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn LlmProvider>,
        config: ControllerConfig,
    ) -> CoreResult<Self> {
        let directory =
            ProviderDirectory::new(store.clone()).with_category_limit(config.category_limit);

        let agent = Agent::new(
            provider,
            Arc::new(svckit::registry(&directory)?),
            config.agent.clone(),
        );

        Ok(Self {
            history: HistoryLoader::new(store.clone(), config.assistant_id.clone())
                .with_window(config.history_window),
            persister: ReplyPersister::new(store.clone(), config.assistant_id.clone()),
            store,
            directory,
            agent,
            config,
        })
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Handle one event; a skipped event is a success with no side effects
    pub async fn handle(&self, event: &MessageCreated) -> CoreResult<TurnOutcome> {
        let room = event.room_id.as_str();
        let text = match self.eligible_text(event).await? {
            Ok(text) => text,
            Err(reason) => {
                tracing::debug!(
                    room,
                    message = %event.message_id,
                    %reason,
                    state = %TurnState::Done,
                    "Event skipped"
                );
                return Ok(TurnOutcome::Skipped(reason));
            }
        };

        tracing::debug!(room, state = %TurnState::ContextBuild);
        let categories = self.directory.list_categories().await?;
        let system_instruction = crate::render_system_prompt(&categories);
        let history = self.history.load_excluding(room, &event.message_id).await?;

        tracing::debug!(room, state = %TurnState::FirstDispatch, history = history.len());
        let reply = self.agent.respond(&history, &system_instruction, &text).await?;
        for tool in &reply.tools_used {
            tracing::debug!(room, state = %TurnState::ToolInvoke, %tool);
        }
        tracing::debug!(
            room,
            state = %TurnState::FinalResponse,
            chars = reply.text.chars().count()
        );

        tracing::debug!(room, state = %TurnState::Persist);
        let message_id = self.persister.persist(room, &reply.text).await?;

        tracing::info!(
            room,
            trigger = %event.message_id,
            reply = %message_id,
            tools = ?reply.tools_used,
            state = %TurnState::Done,
            "Turn complete"
        );
        Ok(TurnOutcome::Replied {
            message_id,
            tools_used: reply.tools_used,
            unrecognized_tool: reply.unrecognized_tool,
        })
    }

    /// The text to answer, or why the event is not ours to answer
    async fn eligible_text(
        &self,
        event: &MessageCreated,
    ) -> CoreResult<std::result::Result<String, SkipReason>> {
        tracing::debug!(room = %event.room_id, state = %TurnState::AwaitEligibility);

        let Some(message) = event.message() else {
            return Ok(Err(SkipReason::MissingData));
        };

        let Some(room_doc) = self
            .store
            .get("rooms", &event.room_id)
            .await
            .map_err(ChatError::from)?
        else {
            return Ok(Err(SkipReason::RoomNotFound));
        };
        let Some(room) = Room::from_document(&room_doc) else {
            return Ok(Err(SkipReason::MissingParticipants));
        };
        if !room.has_participant(&self.config.assistant_id) {
            return Ok(Err(SkipReason::AssistantNotParticipant));
        }

        if message.author_id.is_none() {
            return Ok(Err(SkipReason::MissingAuthor));
        }
        if message.is_authored_by(&self.config.assistant_id) {
            return Ok(Err(SkipReason::OwnMessage));
        }

        Ok(message
            .body()
            .map(str::to_string)
            .ok_or(SkipReason::MissingText))
    }
}
