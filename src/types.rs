//! Result types exchanged with the engine.

use serde::{Deserialize, Serialize};

use crate::schema::Diagnostic;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation (null when destroying).
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
    /// Plan-time diagnostics (validation errors abort the apply).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }

    /// Attach diagnostics.
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Whether the plan changes anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// The result of refreshing a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// Refreshed state, or `None` when the resource is gone and must be removed from state.
    pub state: Option<serde_json::Value>,
    /// Warnings raised while reading.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ReadResult {
    /// The resource still exists.
    pub fn found(state: serde_json::Value) -> Self {
        Self {
            state: Some(state),
            diagnostics: Vec::new(),
        }
    }

    /// The resource is gone; the engine will plan a create.
    pub fn removed(diagnostic: Diagnostic) -> Self {
        Self {
            state: None,
            diagnostics: vec![diagnostic],
        }
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata: every registered type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}
