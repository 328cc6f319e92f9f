//! The Sonarr provider: configuration, the type registry and the
//! [`ProviderService`] implementation that routes engine calls to the
//! resource and data source kernels.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as Json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapters::Registry;
use crate::client::{Api, ClientConfig, HttpUpstream, Upstream, DEFAULT_TIMEOUT};
use crate::data_source;
use crate::error::ProviderError;
use crate::resource;
use crate::schema::{has_errors, Attribute, AttributeFlags, AttributeType, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ReadResult};
use crate::validation;
use crate::value::{State, UNKNOWN_VALUE};

/// Environment fallback for `url`.
pub const ENV_URL: &str = "SONARR_URL";
/// Environment fallback for `api_key`.
pub const ENV_API_KEY: &str = "SONARR_API_KEY";

/// Builds the transport once the provider is configured.
pub type Connector =
    Arc<dyn Fn(&ClientConfig, CancellationToken) -> Result<Arc<dyn Upstream>, ProviderError> + Send + Sync>;

/// The provider block as the engine sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Sonarr server.
    #[serde(default)]
    pub url: Option<String>,
    /// Sonarr API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub extra_headers: Option<BTreeMap<String, String>>,
    /// Per-request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<i64>,
}

impl ProviderConfig {
    /// Engine schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Sonarr connection settings.")
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_description(format!("Base URL of the Sonarr server; falls back to {}.", ENV_URL)),
            )
            .with_attribute(
                "api_key",
                Attribute::new(AttributeType::String, AttributeFlags::optional().sensitive())
                    .with_description(format!("Sonarr API key; falls back to {}.", ENV_API_KEY)),
            )
            .with_attribute(
                "extra_headers",
                Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::optional())
                    .with_description("Extra headers sent with every request."),
            )
            .with_attribute(
                "request_timeout",
                Attribute::optional_int64().with_description("Per-request timeout in seconds; defaults to 60."),
            )
    }

    /// Deserialize the provider block; null means an empty block.
    pub fn from_json(config: &Json) -> Result<Self, ProviderError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(config.clone())?)
    }

    /// Resolve into connection settings, reading fallbacks through `env`.
    ///
    /// A non-empty attribute wins over its environment variable.
    pub fn resolve(self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        let pick = |attr: Option<String>, var: &str| {
            attr.filter(|v| !v.is_empty())
                .or_else(|| env(var).filter(|v| !v.is_empty()))
        };

        let url = pick(self.url, ENV_URL);
        if url.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing Sonarr URL")
                    .with_detail(format!("Set url in the provider block or {}.", ENV_URL))
                    .with_attribute("url"),
            );
        }
        let api_key = pick(self.api_key, ENV_API_KEY);
        if api_key.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing Sonarr API key")
                    .with_detail(format!("Set api_key in the provider block or {}.", ENV_API_KEY))
                    .with_attribute("api_key"),
            );
        }
        let timeout = match self.request_timeout {
            None => DEFAULT_TIMEOUT,
            Some(secs) if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
            Some(secs) => {
                diagnostics.push(
                    Diagnostic::error("Invalid request_timeout")
                        .with_detail(format!("expected a positive number of seconds, got {}", secs))
                        .with_attribute("request_timeout"),
                );
                DEFAULT_TIMEOUT
            },
        };

        let (url, api_key) = match (url, api_key) {
            (Some(url), Some(api_key)) if diagnostics.is_empty() => (url, api_key),
            _ => return Err(diagnostics),
        };
        let mut config = ClientConfig::new(url, api_key);
        config.extra_headers = self.extra_headers.unwrap_or_default();
        config.timeout = timeout;
        if let Err(err) = config.base_url() {
            return Err(vec![Diagnostic::error("Invalid Sonarr URL")
                .with_detail(err.message())
                .with_attribute("url")]);
        }
        Ok(config)
    }
}

fn http_connector() -> Connector {
    Arc::new(
        |config: &ClientConfig, cancel: CancellationToken| -> Result<Arc<dyn Upstream>, ProviderError> {
            Ok(Arc::new(HttpUpstream::new(config, cancel)?))
        },
    )
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Sonarr provider.
pub struct SonarrProvider {
    registry: Registry,
    api: RwLock<Option<Arc<Api>>>,
    cancel: CancellationToken,
    connector: Connector,
}

impl Default for SonarrProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SonarrProvider {
    /// A provider talking HTTP to a real server.
    pub fn new() -> Self {
        Self::with_connector(http_connector())
    }

    /// A provider whose transport is built by `connector`.
    pub fn with_connector(connector: Connector) -> Self {
        Self {
            registry: Registry::sonarr(),
            api: RwLock::new(None),
            cancel: CancellationToken::new(),
            connector,
        }
    }

    /// Every registered type.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn api(&self) -> Result<Arc<Api>, ProviderError> {
        self.api
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for SonarrProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, adapter) in self.registry.resources() {
            schema = schema.with_resource(name.clone(), adapter.schema());
        }
        for (name, data_source) in self.registry.data_sources() {
            schema = schema.with_data_source(name.clone(), data_source.schema());
        }
        schema
    }

    async fn validate_provider_config(&self, config: Json) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&ProviderConfig::schema(), &config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }
        // unresolved values fail to deserialize; their types were checked above
        let url = ProviderConfig::from_json(&config).ok().and_then(|parsed| parsed.url);
        if let Some(url) = url.filter(|u| !u.is_empty() && u != UNKNOWN_VALUE) {
            if let Err(err) = ClientConfig::new(url, "").base_url() {
                diagnostics.push(
                    Diagnostic::error("Invalid Sonarr URL")
                        .with_detail(err.message())
                        .with_attribute("url"),
                );
            }
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Json) -> Result<Vec<Diagnostic>, ProviderError> {
        let client = match ProviderConfig::from_json(&config)?.resolve(process_env) {
            Ok(client) => client,
            Err(diagnostics) => return Ok(diagnostics),
        };
        let upstream = match (self.connector)(&client, self.cancel.child_token()) {
            Ok(upstream) => upstream,
            Err(err) => return Ok(vec![err.to_diagnostic()]),
        };
        *self.api.write().await = Some(Arc::new(Api::new(upstream)));
        info!(url = %client.url, timeout_secs = client.timeout.as_secs(), "provider configured");
        Ok(Vec::new())
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("stopping, aborting in-flight requests");
        self.cancel.cancel();
        Ok(())
    }

    async fn validate_resource_config(&self, resource_type: &str, config: Json) -> Result<Vec<Diagnostic>, ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let schema = adapter.schema();
        let mut diagnostics = validation::validate(&schema, &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(adapter.validate(&State::from_json(&config, &schema)?));
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Json>,
        proposed_state: Json,
        _config: Json,
    ) -> Result<PlanResult, ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let schema = adapter.schema();
        let prior = match prior_state.filter(|s| !s.is_null()) {
            Some(json) => Some(State::from_json(&json, &schema)?),
            None => None,
        };
        let proposed = match proposed_state {
            Json::Null => None,
            json => Some(State::from_json(&json, &schema)?),
        };
        let result = resource::plan(adapter.as_ref(), prior.as_ref(), proposed.as_ref())?;
        debug!(resource_type, changes = result.changes.len(), requires_replace = result.requires_replace, "planned");
        Ok(result)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Json) -> Result<Json, ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let planned = State::from_json(&planned_state, &adapter.schema())?;
        let api = self.api().await?;
        Ok(resource::create(&api, adapter.as_ref(), &planned).await?.to_json())
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Json) -> Result<ReadResult, ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let current = State::from_json(&current_state, &adapter.schema())?;
        let api = self.api().await?;
        match resource::read(&api, adapter.as_ref(), &current).await? {
            Some(state) => Ok(ReadResult::found(state.to_json())),
            None => {
                warn!(resource_type, id = ?current.id(), "resource removed outside of configuration");
                Ok(ReadResult::removed(
                    Diagnostic::warning(format!("{} no longer exists", adapter.kind()))
                        .with_detail("It was removed from state; the next plan creates it again."),
                ))
            },
        }
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(&self, resource_type: &str, prior_state: Json, planned_state: Json) -> Result<Json, ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let schema = adapter.schema();
        let prior = State::from_json(&prior_state, &schema)?;
        let planned = State::from_json(&planned_state, &schema)?;
        let api = self.api().await?;
        Ok(resource::update(&api, adapter.as_ref(), &prior, &planned).await?.to_json())
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Json) -> Result<(), ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let current = State::from_json(&current_state, &adapter.schema())?;
        let api = self.api().await?;
        resource::delete(&api, adapter.as_ref(), &current).await
    }

    #[instrument(skip(self), name = "provider.import")]
    async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        let adapter = self.registry.resource(resource_type)?;
        let api = self.api().await?;
        let state = resource::import(&api, adapter.as_ref(), id).await?;
        info!(resource_type, id = ?state.id(), "imported");
        Ok(vec![ImportedResource::new(resource_type, state.to_json())])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Json,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.registry.data_source_adapter(data_source_type)?;
        let schema = data_source.schema();
        let mut diagnostics = validation::validate(&schema, &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(data_source.validate(&State::from_json(&config, &schema)?));
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.read_data_source")]
    async fn read_data_source(&self, data_source_type: &str, config: Json) -> Result<Json, ProviderError> {
        let data_source = self.registry.data_source_adapter(data_source_type)?;
        let config = State::from_json(&config, &data_source.schema())?;
        let api = self.api().await?;
        Ok(data_source::read_data_source(&api, data_source.as_ref(), &config)
            .await?
            .to_json())
    }
}
