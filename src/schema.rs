//! Schema types for describing provider, resource and data source structure.
//!
//! Schemas describe the engine-facing shape of every entity: attribute names,
//! types, whether they are required/optional/computed, sensitivity and the
//! plan modifiers that drive replacement and unknown handling.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A 64-bit floating point number.
    Float64,
    /// A boolean value.
    Bool,
    /// An ordered list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(BTreeMap<String, AttributeType>),
    /// A dynamic type that can hold any value (use sparingly).
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create an object type from `(name, type)` pairs.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(
            attributes
                .into_iter()
                .map(|(name, ty)| (name.into(), ty))
                .collect(),
        )
    }

    /// Short name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Create flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Create flags for a computed attribute (read-only, set by the upstream).
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional+computed attribute (can be set, but has a default from the upstream).
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Changing this attribute forces resource replacement (RequiresReplace).
    #[serde(default)]
    pub force_new: bool,
    /// Keep the prior state value instead of planning an unknown (UseStateForUnknown).
    #[serde(default)]
    pub use_state_for_unknown: bool,
    /// Default value applied at plan time when configuration leaves the attribute null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            use_state_for_unknown: false,
            default: None,
        }
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create a required int64 attribute.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create a computed int64 attribute.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// Create a required bool attribute.
    pub fn required_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::required())
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Create a computed bool attribute.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// The server-assigned integer id every managed entity carries.
    pub fn id() -> Self {
        Self::computed_int64()
            .with_use_state_for_unknown()
            .with_description("Server-assigned identifier.")
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Keep the prior state value when the configuration leaves this attribute unset.
    pub fn with_use_state_for_unknown(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    /// Set a default value for this attribute.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark this attribute as computed as well (optional attributes become optional+computed).
    pub fn computed(mut self) -> Self {
        self.flags.computed = true;
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Whether configuration may set this attribute.
    pub fn is_configurable(&self) -> bool {
        self.flags.required || self.flags.optional
    }
}

/// A group of attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// The attributes within this block, ordered by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    /// Human-readable description of the block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Create a new empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to this block.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description for this block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The object type equivalent to this block's attributes.
    pub fn object_type(&self) -> AttributeType {
        AttributeType::Object(
            self.attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.attr_type.clone()))
                .collect(),
        )
    }
}

/// Schema for a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// The root block containing all attributes.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Set the schema description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Iterate attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Attribute)> {
        self.block.attributes.iter()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schema for the provider configuration and every registered type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
    /// Schemas for each data source type.
    #[serde(default)]
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A diagnostic message from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        matches!(self.severity, DiagnosticSeverity::Error)
    }
}

/// Whether any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
