//! Domain Models
//!
//! Typed views over the documents the assistant reads and writes: room
//! messages, rooms, category tags and provider profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, Result};
use crate::store::{Document, FieldValue, Fields};

/// `type` of every message the assistant writes
pub const TEXT_MESSAGE: &str = "text";

/// A chat message in `rooms/{roomId}/messages`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,

    /// Message body; media messages may have none
    pub text: Option<String>,

    pub author_id: Option<String>,

    /// Message kind, e.g. `text`
    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub created_at: Option<DateTime<Utc>>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Build from the fields of a message document
    pub fn from_fields(id: impl Into<String>, fields: &Fields) -> Self {
        let text = |key: &str| fields.get(key).and_then(FieldValue::as_str).map(str::to_string);
        let time = |key: &str| fields.get(key).and_then(FieldValue::as_timestamp);

        Self {
            id: id.into(),
            text: text("text"),
            author_id: text("authorId"),
            kind: text("type"),
            created_at: time("createdAt"),
            updated_at: time("updatedAt"),
        }
    }

    pub fn from_document(doc: &Document) -> Self {
        Self::from_fields(doc.id.clone(), &doc.fields)
    }

    /// New assistant text message stamped at `at`
    pub fn assistant_text(
        author_id: impl Into<String>,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            text: Some(text.into()),
            author_id: Some(author_id.into()),
            kind: Some(TEXT_MESSAGE.into()),
            created_at: Some(at),
            updated_at: Some(at),
        }
    }

    /// Non-empty text, if any
    pub fn body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn is_authored_by(&self, author_id: &str) -> bool {
        self.author_id.as_deref() == Some(author_id)
    }

    /// Document fields for persistence; the id is not stored
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(text) = &self.text {
            fields.insert("text".into(), text.as_str().into());
        }
        if let Some(author_id) = &self.author_id {
            fields.insert("authorId".into(), author_id.as_str().into());
        }
        if let Some(kind) = &self.kind {
            fields.insert("type".into(), kind.as_str().into());
        }
        if let Some(at) = self.created_at {
            fields.insert("createdAt".into(), at.into());
        }
        if let Some(at) = self.updated_at {
            fields.insert("updatedAt".into(), at.into());
        }
        fields
    }
}

/// A chat room; only its participants matter here
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub user_ids: Vec<String>,
}

impl Room {
    /// `None` when the document carries no `userIds` array
    pub fn from_document(doc: &Document) -> Option<Self> {
        let user_ids = doc
            .get("userIds")?
            .as_array()?
            .iter()
            .filter_map(FieldValue::as_str)
            .map(str::to_string)
            .collect();
        Some(Self {
            id: doc.id.clone(),
            user_ids,
        })
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
    }
}

/// A service category ranked by usage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub text: String,
    pub used_by: Option<i64>,
}

impl Tag {
    /// `None` for tags without a usable label
    pub fn from_document(doc: &Document) -> Option<Self> {
        let text = doc.get_str("text").filter(|t| !t.is_empty())?;
        Some(Self {
            text: text.to_string(),
            used_by: doc.get("usedBy").and_then(FieldValue::as_i64),
        })
    }
}

/// Service offered by a provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub text: String,
}

/// Plain coordinates as handed to the model
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

/// A service provider's public profile
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Remaining document fields, rendered as plain JSON
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let display_name = doc
            .get_str("displayName")
            .ok_or_else(|| DirectoryError::InvalidDocument {
                path: format!("profiles/{}", doc.id),
                reason: "missing displayName".into(),
            })?
            .to_string();

        let service = doc.get_str("service.text").map(|text| Service {
            text: text.to_string(),
        });
        let location = doc
            .get("location")
            .and_then(FieldValue::as_geo_point)
            .map(|p| Location {
                lat: p.latitude,
                long: p.longitude,
            });

        let details = doc
            .fields
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "displayName" | "service" | "location"))
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();

        Ok(Self {
            display_name,
            service,
            location,
            details,
        })
    }
}

/// A document-created event for `rooms/{roomId}/messages/{messageId}`
#[derive(Clone, Debug, PartialEq)]
pub struct MessageCreated {
    pub room_id: String,
    pub message_id: String,

    /// Fields of the created document; absent when the platform sent none
    pub data: Option<Fields>,
}

impl MessageCreated {
    pub fn new(
        room_id: impl Into<String>,
        message_id: impl Into<String>,
        data: Option<Fields>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            message_id: message_id.into(),
            data,
        }
    }

    /// The created message, if the event carried its data
    pub fn message(&self) -> Option<Message> {
        self.data
            .as_ref()
            .map(|fields| Message::from_fields(self.message_id.clone(), fields))
    }
}
