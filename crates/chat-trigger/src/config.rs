//! Receiver Configuration
//!
//! Read from the environment (optionally seeded from `.env`).

use std::str::FromStr;

use anyhow::{Context, bail};
use service_directory::ControllerConfig;

/// Where documents live
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local, for offline runs
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown STORE_BACKEND {other:?} (expected firestore or memory)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TriggerConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub controller: ControllerConfig,
}

impl TriggerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut controller = ControllerConfig::default();

        if let Some(id) = lookup("ASSISTANT_ID").filter(|id| !id.is_empty()) {
            controller.assistant_id = id;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            controller.agent.generation.model = model;
        }
        controller.history_window = parse(&lookup, "HISTORY_WINDOW", controller.history_window)?;
        controller.category_limit = parse(&lookup, "CATEGORY_LIMIT", controller.category_limit)?;
        controller.agent.max_tool_hops =
            parse(&lookup, "MAX_TOOL_HOPS", controller.agent.max_tool_hops)?;
        controller.agent.tool_output_limit =
            parse(&lookup, "TOOL_OUTPUT_LIMIT", controller.agent.tool_output_limit)?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            store_backend: parse(&lookup, "STORE_BACKEND", StoreBackend::Firestore)?,
            controller,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {key}: {raw:?}")),
    }
}
