//! The engine-facing provider API.
//!
//! [`ProviderService`] is what the engine's plugin transport calls into. It
//! speaks plain JSON documents keyed by attribute name; the transport is
//! responsible for framing, and for turning every returned
//! [`ProviderError`] into diagnostics with [`error_diagnostics`].

use tracing::error;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ReadResult};

/// Trait the provider implements for the engine.
///
/// # Example
///
/// ```ignore
/// use sonarr_provider::{ProviderService, SonarrProvider};
///
/// let provider = SonarrProvider::new();
/// provider
///     .configure(serde_json::json!({"url": "http://localhost:8989", "api_key": "..."}))
///     .await?;
/// let state = provider
///     .create("sonarr_tag", serde_json::json!({"label": "eng"}))
///     .await?;
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider; in-flight requests are aborted.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource. `proposed_state` is null when destroying.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<serde_json::Value>,
        proposed_state: serde_json::Value,
        config: serde_json::Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: serde_json::Value)
        -> Result<serde_json::Value, ProviderError>;

    /// Refresh a resource; a resource that is gone comes back without state.
    async fn read(&self, resource_type: &str, current_state: serde_json::Value) -> Result<ReadResult, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: serde_json::Value) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(&self, resource_type: &str, _id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "import not supported for resource type: {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read data from the upstream.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

/// Log a failed operation and convert it to the diagnostics shown to the operator.
pub fn error_diagnostics(operation: &str, type_name: &str, err: &ProviderError) -> Vec<Diagnostic> {
    error!(operation, type_name, error = %err, "operation failed");
    vec![err.to_diagnostic()]
}
