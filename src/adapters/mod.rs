//! Entity adapters and the type registry.
//!
//! Almost every upstream entity is a flat JSON object whose keys are the
//! lowerCamelCase spelling of the engine attribute names, so adapters are
//! declared as tables: a [`TableAdapter`] lists its [`Column`]s, optionally
//! a polymorphic [`Family`] whose fields it flattens, and hooks for
//! validation and tolerated responses. Columns whose JSON shape differs from
//! the engine shape carry a [`Codec`].

use std::collections::BTreeMap;
use std::sync::Arc;

use heck::ToLowerCamelCase;
use serde_json::{Map, Value as Json};

use crate::client::ApiResponse;
use crate::data_source::{DataSourceAdapter, ListDataSource, LookupDataSource, SingletonDataSource};
use crate::error::ProviderError;
use crate::fields::{
    decode_fields, decode_specifications, encode_fields, encode_specifications, specification_type,
    validate_fields, validate_specifications, Family,
};
use crate::resource::{Endpoint, ImportKey, Operation, ResourceAdapter};
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use crate::value::{from_plain, to_plain, State, Value};

pub mod config;
pub mod download_client;
pub mod import_list;
pub mod indexer;
pub mod metadata;
pub mod notification;
pub mod profiles;
pub mod quality_profile;
pub mod series;
pub mod simple;
pub mod specifications;

/// Encodes a column value; `None` omits the key.
pub type Encode = fn(&Value, &str) -> Result<Option<Json>, ProviderError>;
/// Decodes a column from its upstream JSON.
pub type Decode = fn(Option<&Json>, &str) -> Result<Value, ProviderError>;
/// Adapter-specific configuration checks.
pub type Validator = fn(&State) -> Vec<Diagnostic>;
/// Decides whether a failed response may be ignored.
pub type Tolerance = fn(Operation, &State, &ApiResponse) -> bool;

/// Custom JSON shape for a column.
#[derive(Clone, Copy)]
pub struct Codec {
    /// Engine value to upstream JSON.
    pub encode: Encode,
    /// Upstream JSON to engine value.
    pub decode: Decode,
}

/// One engine attribute mapped to one upstream key.
#[derive(Clone)]
pub struct Column {
    /// Engine attribute name.
    pub attr: &'static str,
    /// Upstream key.
    pub key: String,
    /// Engine schema entry.
    pub attribute: Attribute,
    /// Custom shape, if any.
    pub codec: Option<Codec>,
    /// The upstream never returns this value; state keeps what was written.
    pub write_only: bool,
    /// Sent on create only.
    pub create_only: bool,
}

impl Column {
    /// Map `attr` to its lowerCamelCase key.
    ///
    /// Optional+computed columns are settings the server defaults and every
    /// update sends back, so their prior value survives an update plan.
    pub fn new(attr: &'static str, mut attribute: Attribute) -> Self {
        if attribute.flags.optional && attribute.flags.computed {
            attribute.use_state_for_unknown = true;
        }
        Self {
            attr,
            key: attr.to_lower_camel_case(),
            attribute,
            codec: None,
            write_only: false,
            create_only: false,
        }
    }

    /// Use an explicit upstream key.
    pub fn key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    /// Use a custom codec.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Keep the written value on read.
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// The server derives this value from other attributes; plan it as
    /// unknown whenever an update goes out.
    pub fn recomputed(mut self) -> Self {
        self.attribute.use_state_for_unknown = false;
        self
    }

    /// Send only when creating; implies write-only.
    pub fn create_only(mut self) -> Self {
        self.create_only = true;
        self.write_only = true;
        self
    }

    fn encode(&self, value: &Value) -> Result<Option<Json>, ProviderError> {
        match &self.codec {
            Some(codec) => (codec.encode)(value, self.attr),
            None => to_plain(value, self.attr),
        }
    }

    fn decode(&self, raw: Option<&Json>) -> Result<Value, ProviderError> {
        match &self.codec {
            Some(codec) => (codec.decode)(raw, self.attr),
            None => from_plain(raw, &self.attribute.attr_type, self.attr),
        }
    }
}

/// A declarative adapter.
#[derive(Clone)]
pub struct TableAdapter {
    type_name: &'static str,
    description: &'static str,
    endpoint: Endpoint,
    id: Attribute,
    columns: Vec<Column>,
    family: Option<&'static Family>,
    specifications: Option<&'static Family>,
    import_key: ImportKey,
    natural_key: Option<&'static str>,
    validator: Option<Validator>,
    tolerance: Option<Tolerance>,
}

impl TableAdapter {
    /// Start a table for `type_name` at `endpoint`.
    pub fn new(type_name: &'static str, endpoint: Endpoint, description: &'static str) -> Self {
        Self {
            type_name,
            description,
            endpoint,
            id: Attribute::id(),
            columns: Vec::new(),
            family: None,
            specifications: None,
            import_key: ImportKey::Id,
            natural_key: None,
            validator: None,
            tolerance: None,
        }
    }

    /// Add a column keyed by the lowerCamelCase attribute name.
    pub fn column(self, attr: &'static str, attribute: Attribute) -> Self {
        self.with_column(Column::new(attr, attribute))
    }

    /// Add a prepared column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Replace the default computed `id` attribute.
    pub fn id_attribute(mut self, attribute: Attribute) -> Self {
        self.id = attribute;
        self
    }

    /// Flatten a polymorphic family's fields.
    pub fn family(mut self, family: &'static Family) -> Self {
        self.family = Some(family);
        self
    }

    /// Own a `specifications` list of the given family.
    pub fn specifications(mut self, family: &'static Family) -> Self {
        self.specifications = Some(family);
        self
    }

    /// Attribute naming an entity uniquely.
    pub fn keyed_by(mut self, attr: &'static str) -> Self {
        self.natural_key = Some(attr);
        self
    }

    /// Import by a natural key instead of the id.
    pub fn import_by(mut self, attr: &'static str) -> Self {
        self.import_key = ImportKey::Natural(attr);
        self
    }

    /// Extra configuration checks.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Tolerated failure responses.
    pub fn tolerate(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    fn payload(&self, state: &State, creating: bool) -> Result<Json, ProviderError> {
        let mut payload = Map::new();
        if let Some(id) = state.id() {
            payload.insert("id".to_string(), Json::from(id));
        }
        for column in &self.columns {
            if column.create_only && !creating {
                continue;
            }
            if let Some(json) = column.encode(state.get(column.attr))? {
                payload.insert(column.key.clone(), json);
            }
        }

        if let Some(family) = self.family {
            let implementation = state
                .str("implementation")
                .ok_or_else(|| ProviderError::validation("implementation", "must be set"))?;
            let contract = match state.str("config_contract") {
                Some(contract) => contract.to_string(),
                None => family
                    .implementation(implementation)
                    .map(|imp| imp.config_contract.to_string())
                    .unwrap_or_default(),
            };
            payload.insert("implementation".to_string(), Json::from(implementation));
            payload.insert("configContract".to_string(), Json::from(contract));
            payload.insert("fields".to_string(), encode_fields(family, implementation, state, "")?);
        }

        if let Some(family) = self.specifications {
            payload.insert(
                "specifications".to_string(),
                encode_specifications(family, state.get("specifications"), "specifications")?,
            );
        }
        Ok(Json::Object(payload))
    }
}

impl ResourceAdapter for TableAdapter {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::v0()
            .with_description(self.description)
            .with_attribute("id", self.id.clone());
        for column in &self.columns {
            schema = schema.with_attribute(column.attr, column.attribute.clone());
        }
        if let Some(family) = self.family {
            schema = schema
                .with_attribute(
                    "implementation",
                    Attribute::required_string().with_description(format!(
                        "{} implementation, e.g. {}.",
                        family.kind,
                        family.implementations.first().map(|imp| imp.name).unwrap_or("")
                    )),
                )
                .with_attribute(
                    "config_contract",
                    Attribute::optional_string()
                        .computed()
                        .with_use_state_for_unknown()
                        .with_description("Settings contract; derived from the implementation when unset."),
                );
            for attr in family.attributes {
                schema = schema.with_attribute(attr.attr, attr.schema_attribute());
            }
        }
        if let Some(family) = self.specifications {
            schema = schema.with_attribute(
                "specifications",
                Attribute::new(specification_type(family), crate::schema::AttributeFlags::required())
                    .with_description("Ordered specifications."),
            );
        }
        schema
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    fn import_key(&self) -> ImportKey {
        self.import_key
    }

    fn natural_key(&self) -> Option<&'static str> {
        self.natural_key
    }

    fn validate(&self, config: &State) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(family) = self.family {
            diagnostics.extend(validate_fields(family, config.get("implementation"), config, ""));
        }
        if let Some(family) = self.specifications {
            diagnostics.extend(validate_specifications(family, config.get("specifications"), "specifications"));
        }
        if let Some(validator) = self.validator {
            diagnostics.extend(validator(config));
        }
        diagnostics
    }

    fn to_api(&self, state: &State) -> Result<Json, ProviderError> {
        self.payload(state, false)
    }

    fn to_api_create(&self, state: &State) -> Result<Json, ProviderError> {
        self.payload(state, true)
    }

    fn from_api(&self, payload: &Json, prior: &State) -> Result<State, ProviderError> {
        let mut state = State::new();
        state.set("id", from_plain(payload.get("id"), &AttributeType::Int64, "id")?);
        for column in &self.columns {
            let value = if column.write_only {
                prior.get(column.attr).clone()
            } else {
                column.decode(payload.get(column.key.as_str()))?
            };
            state.set(column.attr, value);
        }

        if let Some(family) = self.family {
            let implementation = payload.get("implementation").and_then(Json::as_str);
            state.set("implementation", implementation.map(str::to_string));
            state.set(
                "config_contract",
                payload.get("configContract").and_then(Json::as_str).map(str::to_string),
            );
            for (attr, value) in decode_fields(family, implementation, payload.get("fields"), "")? {
                state.set(attr, value);
            }
        }

        if let Some(family) = self.specifications {
            state.set(
                "specifications",
                decode_specifications(family, payload.get("specifications"), "specifications")?,
            );
        }
        Ok(state)
    }

    fn tolerates(&self, operation: Operation, state: &State, response: &ApiResponse) -> bool {
        self.tolerance
            .map(|tolerance| tolerance(operation, state, response))
            .unwrap_or(false)
    }

    /// A switched implementation owns none of the prior field values: fields
    /// it does not accept are planned null, the rest unknown, and the
    /// contract follows the new implementation.
    fn revise_plan(&self, config: &State, prior: &State, planned: &mut State) {
        let family = match self.family {
            Some(family) => family,
            None => return,
        };
        if planned.get("implementation") == prior.get("implementation") {
            return;
        }
        let target = match planned.get("implementation") {
            Value::String(name) => family.implementation(name),
            _ => None,
        };

        if config.get("config_contract").is_null() {
            let contract = match target {
                Some(imp) => Value::String(imp.config_contract.to_string()),
                None => Value::Unknown,
            };
            planned.set("config_contract", contract);
        }
        for attr in family.attributes {
            if !config.get(attr.attr).is_null() {
                continue;
            }
            let value = match target {
                Some(imp) if imp.field(attr.attr).is_none() => Value::Null,
                _ => Value::Unknown,
            };
            planned.set(attr.attr, value);
        }
    }
}

/// Every resource and data source the provider exposes.
#[derive(Clone, Default)]
pub struct Registry {
    resources: BTreeMap<String, Arc<dyn ResourceAdapter>>,
    data_sources: BTreeMap<String, Arc<dyn DataSourceAdapter>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full Sonarr catalog.
    pub fn sonarr() -> Self {
        let mut registry = Self::new();

        registry.managed(simple::tag(), Some("tags"));
        registry.managed(simple::root_folder(), Some("root_folders"));
        registry.managed(simple::remote_path_mapping(), Some("remote_path_mappings"));
        registry.managed(simple::import_list_exclusion(), Some("import_list_exclusions"));

        registry.managed(profiles::delay_profile(), Some("delay_profiles"));
        registry.managed(profiles::release_profile(), Some("release_profiles"));
        registry.managed(profiles::language_profile(), Some("language_profiles"));
        registry.managed(profiles::quality_definition(), Some("quality_definitions"));
        registry.managed(quality_profile::quality_profile(), Some("quality_profiles"));

        registry.singleton(config::host());
        registry.singleton(config::naming());
        registry.singleton(config::media_management());
        registry.singleton(config::indexer_config());
        registry.singleton(config::download_client_config());
        registry.data_source(SingletonDataSource::new(Arc::new(config::system_status())));

        let series: Arc<dyn ResourceAdapter> = Arc::new(series::series());
        registry.managed_arc(series.clone(), None);
        registry.data_source(ListDataSource::new(series, "series").with_type_name("sonarr_all_series"));
        registry.data_source(series::SearchSeries);
        let language: Arc<dyn ResourceAdapter> = Arc::new(series::language());
        registry.lookups(language, Some("languages"));

        registry.managed(indexer::indexer(), Some("indexers"));
        registry.managed(download_client::download_client(), Some("download_clients"));
        registry.managed(notification::notification(), Some("notifications"));
        registry.managed(metadata::metadata(), Some("metadata_consumers"));
        registry.managed(import_list::import_list(), Some("import_lists"));

        registry.managed(specifications::custom_format(), Some("custom_formats"));
        registry.managed(specifications::auto_tag(), Some("auto_tags"));
        registry
    }

    /// Register a resource with its derived lookup and list data sources.
    pub fn managed(&mut self, adapter: impl ResourceAdapter + 'static, plural: Option<&str>) {
        self.managed_arc(Arc::new(adapter), plural);
    }

    fn managed_arc(&mut self, adapter: Arc<dyn ResourceAdapter>, plural: Option<&str>) {
        self.resources.insert(adapter.type_name().to_string(), adapter.clone());
        self.lookups(adapter, plural);
    }

    /// Register only the derived data sources of an adapter.
    pub fn lookups(&mut self, adapter: Arc<dyn ResourceAdapter>, plural: Option<&str>) {
        if let Some(lookup) = LookupDataSource::new(adapter.clone()) {
            self.data_source(lookup);
        }
        if let Some(plural) = plural {
            self.data_source(ListDataSource::new(adapter, plural));
        }
    }

    /// Register a configuration singleton as resource and data source.
    pub fn singleton(&mut self, adapter: impl ResourceAdapter + 'static) {
        let adapter: Arc<dyn ResourceAdapter> = Arc::new(adapter);
        self.resources.insert(adapter.type_name().to_string(), adapter.clone());
        self.data_source(SingletonDataSource::new(adapter));
    }

    /// Register a data source.
    pub fn data_source(&mut self, data_source: impl DataSourceAdapter + 'static) {
        self.data_sources
            .insert(data_source.type_name().to_string(), Arc::new(data_source));
    }

    /// Look up a resource adapter.
    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn ResourceAdapter>, ProviderError> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Look up a data source adapter.
    pub fn data_source_adapter(&self, type_name: &str) -> Result<&Arc<dyn DataSourceAdapter>, ProviderError> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Every resource adapter by type name.
    pub fn resources(&self) -> impl Iterator<Item = (&String, &Arc<dyn ResourceAdapter>)> {
        self.resources.iter()
    }

    /// Every data source adapter by type name.
    pub fn data_sources(&self) -> impl Iterator<Item = (&String, &Arc<dyn DataSourceAdapter>)> {
        self.data_sources.iter()
    }
}

/// Codec for `{ "id": n }` references stored as a bare integer.
pub const ID_REFERENCE: Codec = Codec {
    encode: encode_id_reference,
    decode: decode_id_reference,
};

fn encode_id_reference(value: &Value, path: &str) -> Result<Option<Json>, ProviderError> {
    Ok(to_plain(value, path)?.map(|id| serde_json::json!({ "id": id })))
}

fn decode_id_reference(raw: Option<&Json>, path: &str) -> Result<Value, ProviderError> {
    from_plain(raw.and_then(|r| r.get("id")), &AttributeType::Int64, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_names_are_prefixed() {
        let registry = Registry::sonarr();
        for (name, adapter) in registry.resources() {
            assert!(name.starts_with("sonarr_"), "{}", name);
            assert_eq!(adapter.type_name(), name);
        }
        for (name, _) in registry.data_sources() {
            assert!(name.starts_with("sonarr_"), "{}", name);
        }
    }

    #[test]
    fn test_registry_catalog() {
        let registry = Registry::sonarr();
        for name in [
            "sonarr_tag",
            "sonarr_series",
            "sonarr_auto_tag",
            "sonarr_custom_format",
            "sonarr_indexer",
            "sonarr_host",
            "sonarr_quality_profile",
        ] {
            assert!(registry.resource(name).is_ok(), "{}", name);
        }
        for name in [
            "sonarr_tags",
            "sonarr_quality_profile",
            "sonarr_search_series",
            "sonarr_all_series",
            "sonarr_language",
            "sonarr_languages",
            "sonarr_system_status",
            "sonarr_naming",
        ] {
            assert!(registry.data_source_adapter(name).is_ok(), "{}", name);
        }
        assert!(matches!(
            registry.resource("sonarr_nope"),
            Err(ProviderError::UnknownResource(_))
        ));
    }

    #[test]
    fn test_id_reference_codec() {
        let json = (ID_REFERENCE.encode)(&Value::Int(4), "cutoff").unwrap();
        assert_eq!(json, Some(json!({"id": 4})));
        let value = (ID_REFERENCE.decode)(Some(&json!({"id": 4, "name": "English"})), "cutoff").unwrap();
        assert_eq!(value, Value::Int(4));
        assert_eq!((ID_REFERENCE.decode)(None, "cutoff").unwrap(), Value::Null);
    }

    #[test]
    fn test_write_only_column_keeps_prior() {
        let adapter = TableAdapter::new("sonarr_thing", Endpoint::managed("/api/v3/thing"), "")
            .column("name", Attribute::required_string())
            .with_column(Column::new("secret_option", Attribute::optional_string()).create_only());
        let prior = State::new().with("secret_option", "x");
        let state = adapter.from_api(&json!({"id": 1, "name": "a"}), &prior).unwrap();
        assert_eq!(state.str("secret_option"), Some("x"));

        let create = adapter.to_api_create(&prior.clone().with("name", "a")).unwrap();
        assert_eq!(create["secretOption"], "x");
        let update = adapter.to_api(&prior.with("name", "a")).unwrap();
        assert!(update.get("secretOption").is_none());
    }
}
