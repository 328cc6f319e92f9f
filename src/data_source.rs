//! Read-only data sources.
//!
//! Most data sources are derived from a resource adapter: a lookup by the
//! adapter's natural key, a list of every entity, or the singleton object
//! itself. A few (series search, system status) implement
//! [`DataSourceAdapter`] directly.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::Api;
use crate::error::ProviderError;
use crate::resource::{select_one, ResourceAdapter};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::value::{State, Value};

/// A read-only view onto upstream data.
#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    /// Engine type name, e.g. `sonarr_tags`.
    fn type_name(&self) -> &str;

    /// Engine schema.
    fn schema(&self) -> Schema;

    /// Configuration checks beyond the schema.
    fn validate(&self, _config: &State) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Fetch the data.
    async fn read(&self, api: &Api, config: &State) -> Result<State, ProviderError>;
}

/// Turn a resource schema into a read-only one: `key` (if any) becomes the
/// only required attribute, everything else is computed.
pub(crate) fn read_only_schema(schema: Schema, key: Option<&str>) -> Schema {
    let mut out = Schema::new(schema.version);
    out.block.description = schema.block.description.clone();
    for (name, attr) in schema.block.attributes {
        let mut flags = if Some(name.as_str()) == key {
            AttributeFlags::required()
        } else {
            AttributeFlags::computed()
        };
        flags.sensitive = attr.flags.sensitive;
        let mut read_only = Attribute::new(attr.attr_type, flags);
        read_only.description = attr.description;
        out = out.with_attribute(name, read_only);
    }
    out
}

/// Single entity selected by the adapter's natural key.
pub struct LookupDataSource {
    adapter: Arc<dyn ResourceAdapter>,
    key: &'static str,
}

impl LookupDataSource {
    /// Derive from an adapter; `None` if it has no natural key.
    pub fn new(adapter: Arc<dyn ResourceAdapter>) -> Option<Self> {
        let key = adapter.natural_key()?;
        Some(Self { adapter, key })
    }
}

#[async_trait]
impl DataSourceAdapter for LookupDataSource {
    fn type_name(&self) -> &str {
        self.adapter.type_name()
    }

    fn schema(&self) -> Schema {
        read_only_schema(self.adapter.schema(), Some(self.key))
    }

    async fn read(&self, api: &Api, config: &State) -> Result<State, ProviderError> {
        let key = match config.get(self.key) {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            _ => return Err(ProviderError::validation(self.key, "must be set")),
        };
        let items = api.list(self.adapter.endpoint().path).await?;
        debug!(data_source = %self.type_name(), candidates = items.len(), "lookup");
        select_one(self.adapter.as_ref(), &items, self.key, &key)
    }
}

/// Every entity of a kind, as a set of objects.
pub struct ListDataSource {
    adapter: Arc<dyn ResourceAdapter>,
    type_name: String,
    attribute: String,
}

impl ListDataSource {
    /// Derive from an adapter. `attribute` names the set, e.g. `tags`.
    pub fn new(adapter: Arc<dyn ResourceAdapter>, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            type_name: format!("sonarr_{}", attribute),
            adapter,
            attribute,
        }
    }

    /// Use a type name other than `sonarr_<attribute>`.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}

#[async_trait]
impl DataSourceAdapter for ListDataSource {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn schema(&self) -> Schema {
        let element = self.adapter.schema().block.object_type();
        Schema::v0()
            .with_description(format!("List all {}.", self.adapter.kind()))
            .with_attribute(
                self.attribute.clone(),
                Attribute::new(AttributeType::set(element), AttributeFlags::computed()),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    async fn read(&self, api: &Api, _config: &State) -> Result<State, ProviderError> {
        let empty = State::new();
        let mut elements = Vec::new();
        for item in api.list(self.adapter.endpoint().path).await? {
            let state = self.adapter.from_api(&item, &empty)?;
            elements.push(state.into_object());
        }
        Ok(State::new()
            .with("id", self.attribute.clone())
            .with(self.attribute.clone(), Value::Set(elements)))
    }
}

/// The current value of a configuration singleton.
pub struct SingletonDataSource {
    adapter: Arc<dyn ResourceAdapter>,
}

impl SingletonDataSource {
    /// Derive from a singleton adapter.
    pub fn new(adapter: Arc<dyn ResourceAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl DataSourceAdapter for SingletonDataSource {
    fn type_name(&self) -> &str {
        self.adapter.type_name()
    }

    fn schema(&self) -> Schema {
        read_only_schema(self.adapter.schema(), None)
    }

    async fn read(&self, api: &Api, _config: &State) -> Result<State, ProviderError> {
        let body = api.get(self.adapter.endpoint().path).await?;
        self.adapter.from_api(&body, &State::new())
    }
}

/// Complete a data source result: every schema attribute present, key
/// attributes echoed from configuration.
pub fn complete(schema: &Schema, config: &State, state: State) -> State {
    schema
        .attributes()
        .map(|(name, attr)| {
            let mut value = state.get(name).clone();
            if value.is_null() && attr.flags.required {
                value = config.get(name).clone();
            }
            (name.clone(), value)
        })
        .collect()
}

/// Validate, read and complete a data source.
pub async fn read_data_source(
    api: &Api,
    data_source: &dyn DataSourceAdapter,
    config: &State,
) -> Result<State, ProviderError> {
    let schema = data_source.schema();
    let state = data_source.read(api, config).await?;
    Ok(complete(&schema, config, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::simple;
    use crate::testing::FakeSonarr;
    use serde_json::json;

    #[test]
    fn test_lookup_schema_makes_key_required() {
        let lookup = LookupDataSource::new(Arc::new(simple::tag())).unwrap();
        let schema = lookup.schema();
        assert!(schema.attribute("label").unwrap().flags.required);
        assert!(schema.attribute("id").unwrap().flags.computed);
        assert!(!schema.attribute("id").unwrap().is_configurable());
    }

    #[tokio::test]
    async fn test_lookup_by_natural_key() {
        let fake = FakeSonarr::new();
        fake.put_entity("/api/v3/tag", json!({"id": 1, "label": "eng"}));
        fake.put_entity("/api/v3/tag", json!({"id": 2, "label": "1080p"}));
        let lookup = LookupDataSource::new(Arc::new(simple::tag())).unwrap();

        let state = read_data_source(&fake.api(), &lookup, &State::new().with("label", "1080p"))
            .await
            .unwrap();
        assert_eq!(state.id(), Some(2));

        let err = read_data_source(&fake.api(), &lookup, &State::new().with("label", "missing"))
            .await
            .unwrap_err();
        assert_eq!(err.to_diagnostic().summary, "Unable to find tag");
    }

    #[tokio::test]
    async fn test_list_returns_set() {
        let fake = FakeSonarr::new();
        fake.put_entity("/api/v3/tag", json!({"id": 1, "label": "eng"}));
        fake.put_entity("/api/v3/tag", json!({"id": 2, "label": "1080p"}));
        let list = ListDataSource::new(Arc::new(simple::tag()), "tags");
        assert_eq!(list.type_name(), "sonarr_tags");

        let state = read_data_source(&fake.api(), &list, &State::new()).await.unwrap();
        let tags = state.get("tags").as_elements().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.iter().any(|t| t.member("label") == &Value::from("eng")));
    }
}
