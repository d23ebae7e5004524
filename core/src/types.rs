//! Domain types for synchronized entities and their wire mappings.
//!
//! # Design
//! `RemoteRecord` is what the server sends; `Entity` is what the store
//! keeps. The two are bridged by free functions so the default-fill rules
//! can be tested without a store or a network. Ids are opaque strings
//! assigned by the server; numeric ids on the wire are accepted and kept
//! in their decimal form.

use serde::{Deserialize, Deserializer, Serialize};

/// Icon used when the server sends none.
pub const DEFAULT_ICON: &str = "📁";

/// Color used when the server sends none.
pub const DEFAULT_COLOR: &str = "#6B7280";

/// Discriminator between income and expense entities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Income,
    Expense,
}

/// An entity as held in the local collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub icon: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Entity {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// An entity as returned by the remote API, before defaults are applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        default,
        deserialize_with = "opaque_parent_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
}

/// Fields for an entity that does not exist yet. The id comes from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDraft {
    pub name: String,
    pub kind: EntityKind,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
}

impl EntityDraft {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            icon: None,
            color: None,
            parent_id: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Request body for the create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Request body for the update endpoint. Omitted fields stay unchanged on
/// the server.
///
/// `parent_id` is doubly optional: `None` leaves the parent alone,
/// `Some(None)` is sent as `null` and detaches the entity.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<String>>,
}

impl EntityPatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Apply the default-fill rules to a server record.
pub fn entity_from_record(record: RemoteRecord) -> Entity {
    Entity {
        id: record.id,
        name: record.name,
        kind: record.kind,
        icon: non_empty(record.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
        color: non_empty(record.color).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        parent_id: non_empty(record.parent_id),
    }
}

/// Build the create payload from a draft. Fields pass through verbatim.
pub fn payload_from_draft(draft: &EntityDraft) -> EntityPayload {
    EntityPayload {
        name: draft.name.clone(),
        kind: draft.kind,
        icon: draft.icon.clone(),
        color: draft.color.clone(),
        parent_id: draft.parent_id.clone(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Unsigned(n) => n.to_string(),
            RawId::Signed(n) => n.to_string(),
        }
    }
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn opaque_parent_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}
