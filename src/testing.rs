//! Testing utilities for the provider.
//!
//! [`FakeSonarr`] is an in-memory Sonarr speaking the v3 REST API closely
//! enough for the kernel: collections with server-assigned ids, the
//! configuration singletons, series lookup, secret masking and API key
//! checks. [`ProviderTester`] drives a [`ProviderService`] the way the
//! engine would.
//!
//! # Example
//!
//! ```ignore
//! use sonarr_provider::testing::{FakeSonarr, ProviderTester};
//! use sonarr_provider::SonarrProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_tag() {
//!     let fake = FakeSonarr::new();
//!     let tester = ProviderTester::new(SonarrProvider::with_connector(fake.connector()));
//!     tester.configure(fake.provider_config()).await.unwrap();
//!
//!     let state = tester.lifecycle_create("sonarr_tag", json!({"label": "eng"})).await.unwrap();
//!     assert_eq!(state["label"], "eng");
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::client::{Api, ApiResponse, ClientConfig, Upstream};
use crate::error::ProviderError;
use crate::provider::Connector;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ReadResult};

const MASK: &str = "********";
const LOOKUP_PATH: &str = "/api/v3/series/lookup";
const DEFAULT_DELAY_PROFILE: &str = "/api/v3/delayprofile";

/// A request the fake received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Path including any query string.
    pub path: String,
    /// JSON body, if one was sent.
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    api_key: String,
    singletons: BTreeMap<String, Value>,
    collections: BTreeMap<String, Vec<Value>>,
    lookups: Vec<Value>,
    masked: BTreeSet<String>,
    requests: Vec<RecordedRequest>,
}

/// In-memory Sonarr.
///
/// Clones share one store; each clone authenticates with its own key.
#[derive(Clone)]
pub struct FakeSonarr {
    state: Arc<Mutex<FakeState>>,
    sent_key: String,
    cancel: CancellationToken,
}

impl Default for FakeSonarr {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSonarr {
    /// The key the fake accepts unless changed with [`FakeSonarr::with_api_key`].
    pub const API_KEY: &'static str = "fake-api-key";

    /// A fake seeded like a fresh Sonarr install.
    pub fn new() -> Self {
        let mut state = FakeState {
            api_key: Self::API_KEY.to_string(),
            ..Default::default()
        };
        let singletons = [
            (
                "/api/v3/config/host",
                json!({"id": 1, "bindAddress": "*", "port": 8989, "urlBase": "", "instanceName": "Sonarr",
                       "authenticationMethod": "none", "branch": "main", "logLevel": "info"}),
            ),
            (
                "/api/v3/config/naming",
                json!({"id": 1, "renameEpisodes": false, "replaceIllegalCharacters": true,
                       "seriesFolderFormat": "{Series Title}", "seasonFolderFormat": "Season {season}"}),
            ),
            (
                "/api/v3/config/mediamanagement",
                json!({"id": 1, "autoUnmonitorPreviouslyDownloadedEpisodes": false, "createEmptySeriesFolders": false,
                       "deleteEmptyFolders": false, "recycleBin": "", "recycleBinCleanupDays": 7}),
            ),
            (
                "/api/v3/config/indexer",
                json!({"id": 1, "minimumAge": 0, "retention": 0, "maximumSize": 0, "rssSyncInterval": 60}),
            ),
            (
                "/api/v3/config/downloadclient",
                json!({"id": 1, "downloadClientWorkingFolders": "_UNPACK_|_FAILED_",
                       "enableCompletedDownloadHandling": true, "autoRedownloadFailed": true}),
            ),
            (
                "/api/v3/system/status",
                json!({"appName": "Sonarr", "instanceName": "Sonarr", "version": "4.0.0.0",
                       "isDebug": false, "isProduction": true, "isAdmin": false}),
            ),
        ];
        for (path, body) in singletons {
            state.singletons.insert(path.to_string(), body);
        }
        state.collections.insert(
            DEFAULT_DELAY_PROFILE.to_string(),
            vec![json!({"id": 1, "enableUsenet": true, "enableTorrent": true, "preferredProtocol": "usenet",
                        "usenetDelay": 0, "torrentDelay": 0, "bypassIfHighestQuality": true,
                        "order": 2147483647, "tags": []})],
        );
        state.collections.insert(
            "/api/v3/language".to_string(),
            vec![
                json!({"id": 1, "name": "English", "nameLower": "english"}),
                json!({"id": 2, "name": "French", "nameLower": "french"}),
            ],
        );
        state.collections.insert(
            "/api/v3/qualitydefinition".to_string(),
            vec![
                json!({"id": 1, "title": "SDTV", "minSize": 0.0, "maxSize": 100.0, "preferredSize": 95.0,
                       "quality": {"id": 1, "name": "SDTV", "source": "television", "resolution": 480}}),
                json!({"id": 18, "title": "WEBDL-2160p", "minSize": 0.0, "maxSize": 400.0, "preferredSize": 395.0,
                       "quality": {"id": 18, "name": "WEBDL-2160p", "source": "web", "resolution": 2160}}),
            ],
        );

        Self {
            state: Arc::new(Mutex::new(state)),
            sent_key: Self::API_KEY.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Require a different API key.
    pub fn with_api_key(self, key: impl Into<String>) -> Self {
        self.lock().api_key = key.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// An authenticated [`Api`] over this fake.
    pub fn api(&self) -> Api {
        let key = self.lock().api_key.clone();
        let handle = Self {
            sent_key: key,
            ..self.clone()
        };
        Api::new(Arc::new(handle))
    }

    /// A connector for [`crate::SonarrProvider::with_connector`]; requests
    /// carry whatever key the provider was configured with.
    pub fn connector(&self) -> Connector {
        let fake = self.clone();
        Arc::new(
            move |config: &ClientConfig, cancel: CancellationToken| -> Result<Arc<dyn Upstream>, ProviderError> {
                config.base_url()?;
                Ok(Arc::new(FakeSonarr {
                    state: fake.state.clone(),
                    sent_key: config.api_key.clone(),
                    cancel,
                }))
            },
        )
    }

    /// A provider block that authenticates against this fake.
    pub fn provider_config(&self) -> Value {
        json!({"url": "http://sonarr.test:8989", "api_key": self.lock().api_key})
    }

    /// Insert or replace an entity of a collection, keyed by its `id`.
    pub fn put_entity(&self, collection: &str, entity: Value) {
        let mut state = self.lock();
        let items = state.collections.entry(collection.to_string()).or_default();
        let id = entity.get("id").and_then(Value::as_i64);
        match items.iter_mut().find(|item| item.get("id").and_then(Value::as_i64) == id) {
            Some(existing) => *existing = entity,
            None => items.push(entity),
        }
    }

    /// Every entity of a collection.
    pub fn entities(&self, collection: &str) -> Vec<Value> {
        self.lock().collections.get(collection).cloned().unwrap_or_default()
    }

    /// Add a series to the lookup catalog.
    pub fn add_lookup(&self, series: Value) {
        self.lock().lookups.push(series);
    }

    /// Answer this provider-specific field with the mask, like Sonarr does for secrets.
    pub fn mask_field(&self, name: impl Into<String>) {
        self.lock().masked.insert(name.into());
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn handle(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResponse {
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });
        if self.sent_key != state.api_key {
            return ApiResponse::new(401, json!({"message": "Unauthorized"}));
        }

        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let response = if route == LOOKUP_PATH {
            lookup(&state.lookups, query)
        } else if let Some(current) = state.singletons.get(route).cloned() {
            match method {
                Method::GET => ApiResponse::new(200, current),
                _ => method_not_allowed(),
            }
        } else {
            let (collection, id) = split_item(route);
            if let Some(id) = id.filter(|_| state.singletons.contains_key(collection)) {
                singleton_item(&mut state, method, collection, id, body)
            } else {
                collection_request(&mut state, method, collection, id, body)
            }
        };
        mask(response, &state.masked)
    }
}

#[async_trait]
impl Upstream for FakeSonarr {
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse, ProviderError> {
        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled(format!("{} {}", method, path)));
        }
        Ok(self.handle(method, path, body))
    }
}

fn split_item(route: &str) -> (&str, Option<i64>) {
    match route.rsplit_once('/') {
        Some((collection, last)) => match last.parse::<i64>() {
            Ok(id) => (collection, Some(id)),
            Err(_) => (route, None),
        },
        None => (route, None),
    }
}

fn method_not_allowed() -> ApiResponse {
    ApiResponse::new(405, json!({"message": "Method not allowed"}))
}

fn not_found(collection: &str, id: i64) -> ApiResponse {
    ApiResponse::new(404, json!({"message": format!("{}/{} not found", collection, id)}))
}

fn with_id(mut body: Value, id: i64) -> Value {
    if let Value::Object(members) = &mut body {
        members.insert("id".to_string(), json!(id));
    }
    body
}

fn lookup(catalog: &[Value], query: &str) -> ApiResponse {
    let tvdb_id = query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("term="))
        .filter_map(|term| term.strip_prefix("tvdb:").or_else(|| term.strip_prefix("tvdb%3A")))
        .find_map(|id| id.parse::<i64>().ok());
    let found: Vec<Value> = catalog
        .iter()
        .filter(|series| tvdb_id.is_none() || series.get("tvdbId").and_then(Value::as_i64) == tvdb_id)
        .cloned()
        .collect();
    ApiResponse::new(200, Value::Array(found))
}

fn singleton_item(state: &mut FakeState, method: Method, path: &str, id: i64, body: Option<&Value>) -> ApiResponse {
    match (method, body) {
        (Method::GET, _) => state
            .singletons
            .get(path)
            .cloned()
            .map(|current| ApiResponse::new(200, current))
            .unwrap_or_else(|| not_found(path, id)),
        (Method::PUT, Some(body)) => {
            let stored = with_id(body.clone(), id);
            state.singletons.insert(path.to_string(), stored.clone());
            ApiResponse::new(202, stored)
        },
        _ => method_not_allowed(),
    }
}

fn collection_request(
    state: &mut FakeState,
    method: Method,
    collection: &str,
    id: Option<i64>,
    body: Option<&Value>,
) -> ApiResponse {
    let items = state.collections.entry(collection.to_string()).or_default();
    let position = |items: &[Value], id: i64| {
        items
            .iter()
            .position(|item| item.get("id").and_then(Value::as_i64) == Some(id))
    };

    match (method, id, body) {
        (Method::GET, None, _) => ApiResponse::new(200, Value::Array(items.clone())),
        (Method::GET, Some(id), _) => match position(items, id) {
            Some(at) => ApiResponse::new(200, items[at].clone()),
            None => not_found(collection, id),
        },
        (Method::POST, None, Some(body)) => {
            let next = items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            let stored = with_id(body.clone(), next);
            items.push(stored.clone());
            ApiResponse::new(201, stored)
        },
        (Method::PUT, Some(id), Some(body)) => match position(items, id) {
            Some(at) => {
                items[at] = with_id(body.clone(), id);
                ApiResponse::new(202, items[at].clone())
            },
            None => not_found(collection, id),
        },
        (Method::DELETE, Some(1), _) if collection == DEFAULT_DELAY_PROFILE => ApiResponse::new(
            500,
            json!({"message": "Cannot delete global delay profile"}),
        ),
        (Method::DELETE, Some(id), _) => match position(items, id) {
            Some(at) => {
                items.remove(at);
                ApiResponse::new(200, Value::Null)
            },
            None => not_found(collection, id),
        },
        _ => method_not_allowed(),
    }
}

fn mask(mut response: ApiResponse, masked: &BTreeSet<String>) -> ApiResponse {
    if masked.is_empty() {
        return response;
    }
    match &mut response.body {
        Value::Array(items) => items.iter_mut().for_each(|item| mask_entity(item, masked)),
        entity => mask_entity(entity, masked),
    }
    response
}

fn mask_entity(entity: &mut Value, masked: &BTreeSet<String>) {
    let fields = match entity.get_mut("fields").and_then(Value::as_array_mut) {
        Some(fields) => fields,
        None => return,
    };
    for field in fields {
        let secret = field
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| masked.contains(name));
        if secret && field.get("value").is_some_and(|v| !v.is_null()) {
            field["value"] = json!(MASK);
        }
    }
}

/// A test harness for provider implementations.
///
/// This wraps a `ProviderService` implementation and provides the
/// engine's call sequences as single methods.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_resource_config(resource_type, config).await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(&self, resource_type: &str, proposed_state: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(&self, resource_type: &str, prior_state: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a resource.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<ReadResult, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Refresh a resource that must still exist.
    pub async fn read_existing(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.read(resource_type, current_state)
            .await?
            .state
            .ok_or_else(|| ProviderError::NotFound(resource_type.to_string()))
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.update(resource_type, prior_state, planned_state).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(&self, resource_type: &str, id: &str) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(&self, data_source_type: &str, config: Value) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan, create, read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self.create(resource_type, plan_result.planned_state).await?;
        self.read_existing(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan, update, read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read_existing(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan, delete.
    pub async fn lifecycle_delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let _ = self.plan_delete(resource_type, current_state.clone()).await?;
        self.delete(resource_type, current_state).await
    }

    /// Run a full CRUD lifecycle: create, read, update, read, delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated_state.clone()).await?;
        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(plan.requires_replace, "Expected plan to require replacement, but it does not");
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Registry;
    use crate::provider::SonarrProvider;
    use crate::service::error_diagnostics;
    use crate::resource::ResourceAdapter;
    use crate::value::State;

    async fn configured(fake: &FakeSonarr) -> ProviderTester<SonarrProvider> {
        let tester = ProviderTester::new(SonarrProvider::with_connector(fake.connector()));
        tester.configure(fake.provider_config()).await.unwrap();
        tester
    }

    fn qpdata() -> Value {
        json!({
            "name": "qpdata",
            "upgrade_allowed": true,
            "cutoff": 1100,
            "quality_groups": [{
                "id": 1100,
                "name": "4k",
                "qualities": [
                    {"id": 18, "name": "WEBDL-2160p", "source": "web", "resolution": 2160},
                    {"id": 19, "name": "Bluray-2160p", "source": "bluray", "resolution": 2160}
                ]
            }]
        })
    }

    #[tokio::test]
    async fn test_tag_lifecycle() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;

        let plan = tester.plan_create("sonarr_tag", json!({"label": "eng"})).await.unwrap();
        assert_plan_creates(&plan);

        let state = tester
            .lifecycle_crud("sonarr_tag", json!({"label": "eng"}), json!({"label": "1080p"}))
            .await
            .unwrap();
        assert_eq!(state["label"], "1080p");
        assert!(fake.entities("/api/v3/tag").is_empty());
    }

    #[tokio::test]
    async fn test_plan_is_stable_after_create() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;
        let state = tester.lifecycle_create("sonarr_tag", json!({"label": "eng"})).await.unwrap();

        let plan = tester
            .plan_update("sonarr_tag", state.clone(), json!({"label": "eng", "id": state["id"]}))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let plan = tester
            .plan_update("sonarr_tag", state.clone(), json!({"label": "anime", "id": state["id"]}))
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "label");
    }

    fn representative_configs() -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("sonarr_tag", json!({"label": "eng"})),
            ("sonarr_root_folder", json!({"path": "/tv"})),
            (
                "sonarr_remote_path_mapping",
                json!({"host": "transmission", "remote_path": "/downloads/", "local_path": "/data/"}),
            ),
            ("sonarr_import_list_exclusion", json!({"tvdb_id": 81189, "title": "Breaking Bad"})),
            (
                "sonarr_delay_profile",
                json!({"enable_usenet": true, "enable_torrent": false, "preferred_protocol": "usenet",
                       "usenet_delay": 60, "torrent_delay": 0, "tags": [1, 2]}),
            ),
            ("sonarr_release_profile", json!({"name": "x265", "required": ["x265", "HEVC"], "tags": [1]})),
            (
                "sonarr_language_profile",
                json!({"name": "english", "upgrade_allowed": true, "cutoff": 1, "languages": [1, 2]}),
            ),
            (
                "sonarr_quality_definition",
                json!({"id": 1, "title": "SDTV", "min_size": 1.0, "max_size": 90.0, "preferred_size": 85.0}),
            ),
            ("sonarr_quality_profile", qpdata()),
            ("sonarr_host", json!({"instance_name": "Sonarr4K", "port": 8990})),
            ("sonarr_naming", json!({"rename_episodes": true, "season_folder_format": "S{season:00}"})),
            ("sonarr_media_management", json!({"recycle_bin": "/trash", "recycle_bin_cleanup_days": 14})),
            ("sonarr_indexer_config", json!({"rss_sync_interval": 25})),
            ("sonarr_download_client_config", json!({"auto_redownload_failed": false})),
            (
                "sonarr_series",
                json!({"title": "Breaking Bad", "title_slug": "breaking-bad", "tvdb_id": 81189,
                       "quality_profile_id": 1, "monitored": true, "path": "/tv/Breaking Bad",
                       "add_options": {"monitor": "all", "search_for_missing_episodes": true}}),
            ),
            (
                "sonarr_indexer",
                json!({"name": "lolo", "implementation": "Newznab", "base_url": "https://lolo.sickbeard.com",
                       "api_path": "/api", "categories": [5030, 5040], "protocol": "usenet"}),
            ),
            (
                "sonarr_download_client",
                json!({"name": "transmission", "implementation": "Transmission", "protocol": "torrent",
                       "host": "transmission", "port": 9091, "tv_category": "tv-sonarr", "tags": [1]}),
            ),
            (
                "sonarr_notification",
                json!({"name": "hook", "implementation": "Webhook", "url": "https://hooks.example/sonarr",
                       "method": 1, "on_grab": true, "on_download": false}),
            ),
            (
                "sonarr_metadata",
                json!({"name": "Kodi", "implementation": "XbmcMetadata", "enable": true,
                       "series_metadata": true, "series_images": false}),
            ),
            (
                "sonarr_import_list",
                json!({"name": "imdb", "implementation": "ImdbListImport", "quality_profile_id": 1,
                       "root_folder_path": "/tv", "list_id": "ls123456"}),
            ),
            (
                "sonarr_custom_format",
                json!({"name": "x265", "include_custom_format_when_renaming": false, "specifications": [
                    {"implementation": "ReleaseTitleSpecification", "name": "x265", "negate": false,
                     "required": true, "value": "(x|h)\\.?265"},
                    {"implementation": "SizeSpecification", "name": "size", "negate": false,
                     "required": false, "min": 1.0, "max": 9.5}
                ]}),
            ),
            (
                "sonarr_auto_tag",
                json!({"name": "anime", "tags": [1], "specifications": [
                    {"implementation": "SeriesTypeSpecification", "name": "type", "negate": false,
                     "required": false, "value": "2"}
                ]}),
            ),
        ])
    }

    #[tokio::test]
    async fn test_every_resource_is_stable_after_create() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;
        let registry = Registry::sonarr();
        let configs = representative_configs();

        for resource_type in tester.resource_types() {
            let config = configs
                .get(resource_type.as_str())
                .unwrap_or_else(|| panic!("no representative config for {}", resource_type))
                .clone();
            let state = tester
                .lifecycle_create(&resource_type, config.clone())
                .await
                .unwrap_or_else(|e| panic!("{}: {}", resource_type, e));

            let plan = tester
                .plan_update(&resource_type, state.clone(), config)
                .await
                .unwrap_or_else(|e| panic!("{}: {}", resource_type, e));
            assert!(
                !plan.has_changes(),
                "{} plans changes right after create: {:?}",
                resource_type,
                plan.changes
            );

            let adapter = registry.resource(&resource_type).unwrap();
            let schema = adapter.schema();
            let decoded = State::from_json(&state, &schema).unwrap();
            let payload = adapter.to_api(&decoded).unwrap();
            let back = adapter.from_api(&payload, &decoded).unwrap();
            for (name, _) in schema.attributes() {
                assert_eq!(back.get(name), decoded.get(name), "{}.{}", resource_type, name);
            }
        }
    }

    #[tokio::test]
    async fn test_quality_profile_and_lookup() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;
        tester
            .validate_resource_config("sonarr_quality_profile", qpdata())
            .await
            .unwrap();

        let state = tester.lifecycle_create("sonarr_quality_profile", qpdata()).await.unwrap();
        assert_eq!(state["cutoff"], 1100);
        assert_eq!(state["quality_groups"], qpdata()["quality_groups"]);

        let found = tester
            .read_data_source("sonarr_quality_profile", json!({"name": "qpdata"}))
            .await
            .unwrap();
        assert_eq!(found["cutoff"], 1100);
        assert_eq!(found["id"], state["id"]);
    }

    #[tokio::test]
    async fn test_bad_cutoff_is_rejected() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;
        let mut config = qpdata();
        config["cutoff"] = json!(7);

        match tester.validate_resource_config("sonarr_quality_profile", config).await {
            Err(TestError::Diagnostics(diags)) => assert_error_contains(&diags, "cutoff"),
            other => panic!("expected diagnostics, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_a_client_error() {
        let fake = FakeSonarr::new().with_api_key("secret");
        let tester = ProviderTester::new(SonarrProvider::with_connector(fake.connector()));
        tester
            .configure(json!({"url": "http://sonarr.test:8989", "api_key": "guess"}))
            .await
            .unwrap();

        let err = tester.create("sonarr_tag", json!({"label": "eng"})).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthFailure { .. }));
        let diags = error_diagnostics("create", "sonarr_tag", &err);
        assert_error_contains(&diags, "Client Error");
    }

    #[tokio::test]
    async fn test_import_root_folder() {
        let fake = FakeSonarr::new();
        fake.put_entity("/api/v3/rootfolder", json!({"id": 4, "path": "/tmp", "accessible": true}));
        let tester = configured(&fake).await;

        let imported = tester.import_resource("sonarr_root_folder", "/tmp").await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, "sonarr_root_folder");
        assert_eq!(imported[0].state["id"], 4);

        let err = tokio_test::assert_err!(tester.import_resource("sonarr_root_folder", "/nope").await);
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_default_delay_profile_destroy() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;

        let imported = tester.import_resource("sonarr_delay_profile", "1").await.unwrap();
        tester
            .lifecycle_delete("sonarr_delay_profile", imported[0].state.clone())
            .await
            .unwrap();
        assert_eq!(fake.entities("/api/v3/delayprofile").len(), 1);
    }

    #[tokio::test]
    async fn test_singleton_adopts_and_survives_destroy() {
        let fake = FakeSonarr::new();
        let tester = configured(&fake).await;

        let plan = tester
            .plan_create("sonarr_indexer_config", json!({"rss_sync_interval": 25}))
            .await
            .unwrap();
        let state = tester
            .create("sonarr_indexer_config", plan.planned_state)
            .await
            .unwrap();
        assert_eq!(state["id"], 1);
        assert_eq!(state["rss_sync_interval"], 25);

        tester.delete("sonarr_indexer_config", state.clone()).await.unwrap();
        let still = tester.read_existing("sonarr_indexer_config", state).await.unwrap();
        assert_eq!(still["rss_sync_interval"], 25);
    }

    #[tokio::test]
    async fn test_lookup_filters_by_tvdb_id() {
        let fake = FakeSonarr::new();
        fake.add_lookup(json!({"title": "A", "tvdbId": 1}));
        fake.add_lookup(json!({"title": "B", "tvdbId": 2}));
        let found = tokio_test::assert_ok!(fake.api().list("/api/v3/series/lookup?term=tvdb:2").await);
        assert_eq!(found, vec![json!({"title": "B", "tvdbId": 2})]);
    }

    #[tokio::test]
    async fn test_masking_and_recording() {
        let fake = FakeSonarr::new();
        fake.mask_field("apiKey");
        let api = fake.api();
        let created = api
            .post(
                "/api/v3/indexer",
                &json!({"name": "n", "fields": [{"name": "apiKey", "value": "k"}, {"name": "baseUrl", "value": "u"}]}),
            )
            .await
            .unwrap();
        assert_eq!(created["fields"][0]["value"], MASK);
        assert_eq!(created["fields"][1]["value"], "u");
        assert_eq!(fake.entities("/api/v3/indexer")[0]["fields"][0]["value"], "k");

        let requests = fake.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/api/v3/indexer");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
    }

    #[test]
    #[should_panic(expected = "Expected no changes")]
    fn test_assert_plan_no_changes_fails() {
        let plan = PlanResult::with_changes(
            json!({"label": "eng"}),
            vec![crate::types::AttributeChange::added("label", json!("eng"))],
            false,
        );
        assert_plan_no_changes(&plan);
    }

    #[test]
    fn test_assert_plan_replaces() {
        assert_plan_replaces(&PlanResult::with_changes(json!({}), vec![], true));
    }
}
