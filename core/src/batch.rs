//! # Batch Data Model
//!
//! Items submitted to the bulk engine: which component kind they target,
//! whether they create or delete, and where they land.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of calendar component an item operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// VEVENT
    Event,
    /// VTODO
    Task,
    /// VJOURNAL
    Journal,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Event => "event",
            ComponentKind::Task => "task",
            ComponentKind::Journal => "journal",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The requested operation, carrying its own input.
///
/// A create owns the opaque component payload; a delete owns the identifier
/// of the component to remove. The payload contents are never interpreted
/// by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ItemAction {
    Create { payload: Value },
    Delete { target_uid: String },
}

impl ItemAction {
    pub fn is_create(&self) -> bool {
        matches!(self, ItemAction::Create { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemAction::Create { .. } => "create",
            ItemAction::Delete { .. } => "delete",
        }
    }
}

/// One requested operation within a batch.
///
/// `index` is the item's position in the submitted sequence and is the
/// stable key used by the ledger, the rollback coordinator and the final
/// result. Items are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Position in the submitted batch.
    pub index: usize,
    /// Component kind the operation targets.
    pub kind: ComponentKind,
    /// Create-with-payload or delete-by-identifier.
    pub action: ItemAction,
    /// Calendar the operation applies to.
    pub target_calendar: String,
}

impl BatchItem {
    /// Build a create item.
    pub fn create(
        index: usize,
        kind: ComponentKind,
        payload: Value,
        target_calendar: impl Into<String>,
    ) -> Self {
        Self {
            index,
            kind,
            action: ItemAction::Create { payload },
            target_calendar: target_calendar.into(),
        }
    }

    /// Build a delete item.
    pub fn delete(
        index: usize,
        kind: ComponentKind,
        target_uid: impl Into<String>,
        target_calendar: impl Into<String>,
    ) -> Self {
        Self {
            index,
            kind,
            action: ItemAction::Delete {
                target_uid: target_uid.into(),
            },
            target_calendar: target_calendar.into(),
        }
    }

    pub fn is_create(&self) -> bool {
        self.action.is_create()
    }
}

/// A component to be created, before it is assigned a batch position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDraft {
    pub kind: ComponentKind,
    pub payload: Value,
}

impl ComponentDraft {
    pub fn new(kind: ComponentKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    pub fn event(payload: Value) -> Self {
        Self::new(ComponentKind::Event, payload)
    }

    pub fn task(payload: Value) -> Self {
        Self::new(ComponentKind::Task, payload)
    }

    pub fn journal(payload: Value) -> Self {
        Self::new(ComponentKind::Journal, payload)
    }
}

/// A reference to an existing component, used for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub kind: ComponentKind,
    pub uid: String,
}

impl ComponentRef {
    pub fn new(kind: ComponentKind, uid: impl Into<String>) -> Self {
        Self {
            kind,
            uid: uid.into(),
        }
    }

    pub fn event(uid: impl Into<String>) -> Self {
        Self::new(ComponentKind::Event, uid)
    }

    pub fn task(uid: impl Into<String>) -> Self {
        Self::new(ComponentKind::Task, uid)
    }

    pub fn journal(uid: impl Into<String>) -> Self {
        Self::new(ComponentKind::Journal, uid)
    }
}
