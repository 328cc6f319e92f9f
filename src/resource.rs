//! Generic resource lifecycle.
//!
//! A [`ResourceAdapter`] knows one entity kind: its schema, its endpoint and
//! how to map state to and from upstream payloads. The kernel functions in
//! this module drive plan, create, read, update, delete and import for any
//! adapter, so adapters never talk HTTP themselves.

use reqwest::Method;
use serde_json::{Map, Value as Json};
use tracing::{debug, info, warn};

use crate::client::{classify, Api, ApiResponse};
use crate::error::ProviderError;
use crate::fields::merge_masked;
use crate::schema::{Diagnostic, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::value::{State, Value};

/// How the kernel routes an entity's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// POST to create, GET/PUT/DELETE by id.
    Managed,
    /// Configuration singleton at a fixed path; create and update are PUTs
    /// of the merged object, delete only drops state.
    Singleton,
    /// Entities that always exist upstream (chosen by id); create adopts
    /// and updates, delete only drops state.
    Existing,
}

/// Where an entity lives upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Collection or singleton path, e.g. `/api/v3/tag`.
    pub path: &'static str,
    /// Lifecycle routing.
    pub lifecycle: Lifecycle,
    /// Query string appended to DELETE requests.
    pub delete_query: Option<&'static str>,
}

impl Endpoint {
    /// A managed collection.
    pub const fn managed(path: &'static str) -> Self {
        Self {
            path,
            lifecycle: Lifecycle::Managed,
            delete_query: None,
        }
    }

    /// A configuration singleton.
    pub const fn singleton(path: &'static str) -> Self {
        Self {
            path,
            lifecycle: Lifecycle::Singleton,
            delete_query: None,
        }
    }

    /// A collection of pre-existing entities.
    pub const fn existing(path: &'static str) -> Self {
        Self {
            path,
            lifecycle: Lifecycle::Existing,
            delete_query: None,
        }
    }

    /// Append a query to DELETE requests.
    pub const fn with_delete_query(mut self, query: &'static str) -> Self {
        self.delete_query = Some(query);
        self
    }

    /// Path of one entity.
    pub fn item_path(&self, id: i64) -> String {
        format!("{}/{}", self.path, id)
    }
}

/// How an import identifier is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKey {
    /// The server-assigned integer id.
    Id,
    /// A natural key attribute, matched against the listed collection.
    Natural(&'static str),
}

/// Kernel operations, as seen by [`ResourceAdapter::tolerates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// POST or adopting PUT.
    Create,
    /// GET.
    Read,
    /// PUT.
    Update,
    /// DELETE.
    Delete,
}

/// Per-entity schema and mapping.
pub trait ResourceAdapter: Send + Sync {
    /// Engine type name, e.g. `sonarr_tag`.
    fn type_name(&self) -> &str;

    /// Human readable kind used in messages, e.g. `root folder`.
    fn kind(&self) -> String {
        self.type_name()
            .trim_start_matches("sonarr_")
            .replace('_', " ")
    }

    /// Engine schema.
    fn schema(&self) -> Schema;

    /// Upstream binding.
    fn endpoint(&self) -> Endpoint;

    /// How import identifiers are read.
    fn import_key(&self) -> ImportKey {
        ImportKey::Id
    }

    /// Attribute that uniquely names an entity, for lookup data sources.
    fn natural_key(&self) -> Option<&'static str> {
        None
    }

    /// Pre-write checks on configuration; unknown values must pass.
    fn validate(&self, _config: &State) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Build the full upstream representation.
    fn to_api(&self, state: &State) -> Result<Json, ProviderError>;

    /// Build the POST payload; defaults to [`ResourceAdapter::to_api`].
    fn to_api_create(&self, state: &State) -> Result<Json, ProviderError> {
        self.to_api(state)
    }

    /// Decode an upstream payload. `prior` is the plan or last known state,
    /// for attributes the upstream never echoes back.
    fn from_api(&self, payload: &Json, prior: &State) -> Result<State, ProviderError>;

    /// Whether a non-success response is acceptable for an operation.
    fn tolerates(&self, _operation: Operation, _state: &State, _response: &ApiResponse) -> bool {
        false
    }

    /// Revise an update plan once prior values have been carried into it.
    ///
    /// `planned` starts as the configuration with defaults applied and
    /// computed attributes taken from `prior`.
    fn revise_plan(&self, _config: &State, _prior: &State, _planned: &mut State) {}
}

/// Compute the planned state and change list.
///
/// `proposed` is `None` when the resource is being destroyed.
pub fn plan(
    adapter: &dyn ResourceAdapter,
    prior: Option<&State>,
    proposed: Option<&State>,
) -> Result<PlanResult, ProviderError> {
    let schema = adapter.schema();
    let proposed = match proposed {
        Some(proposed) => proposed,
        None => return Ok(plan_destroy(prior)),
    };

    let diagnostics = adapter.validate(proposed);
    let mut planned = fill(&schema, proposed, prior)?;
    let mut requires_replace = false;
    if let Some(prior) = prior {
        adapter.revise_plan(proposed, prior, &mut planned);
        requires_replace = schema
            .attributes()
            .any(|(name, attr)| attr.force_new && planned.get(name) != prior.get(name));
        if requires_replace {
            planned = fill(&schema, proposed, None)?;
        } else if schema.attributes().any(|(name, _)| planned.get(name) != prior.get(name)) {
            recompute(&schema, proposed, &mut planned);
        }
    }

    let empty = State::new();
    let before = prior.unwrap_or(&empty);
    let changes = diff(&schema, before, &planned);
    Ok(PlanResult::with_changes(planned.to_json(), changes, requires_replace)
        .with_diagnostics(diagnostics))
}

fn plan_destroy(prior: Option<&State>) -> PlanResult {
    let changes = prior
        .map(|prior| {
            prior
                .iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(name, value)| AttributeChange::removed(name.clone(), value.to_state()))
                .collect()
        })
        .unwrap_or_default();
    PlanResult::with_changes(Json::Null, changes, false)
}

/// Apply defaults, then resolve computed attributes the configuration left
/// null: the prior value when the resource is kept, unknown otherwise.
fn fill(schema: &Schema, proposed: &State, prior: Option<&State>) -> Result<State, ProviderError> {
    let mut planned = State::new();
    for (name, attr) in schema.attributes() {
        let mut value = proposed.get(name).clone();
        if value.is_null() {
            if let Some(default) = &attr.default {
                value = Value::from_state(default, &attr.attr_type, name)?;
            } else if attr.flags.computed {
                value = match prior {
                    Some(prior) => prior.get(name).clone(),
                    None => Value::Unknown,
                };
            }
        }
        planned.set(name.clone(), value);
    }
    Ok(planned)
}

/// An update is going out: computed attributes the configuration leaves
/// null become unknown unless they keep their prior value across writes.
fn recompute(schema: &Schema, proposed: &State, planned: &mut State) {
    for (name, attr) in schema.attributes() {
        if attr.flags.computed
            && !attr.use_state_for_unknown
            && attr.default.is_none()
            && proposed.get(name).is_null()
        {
            planned.set(name.clone(), Value::Unknown);
        }
    }
}

fn diff(schema: &Schema, before: &State, after: &State) -> Vec<AttributeChange> {
    schema
        .attributes()
        .filter_map(|(name, _)| {
            let old = before.get(name);
            let new = after.get(name);
            if old == new {
                return None;
            }
            Some(match (old.is_null(), new.is_null()) {
                (true, _) => AttributeChange::added(name.clone(), new.to_state()),
                (_, true) => AttributeChange::removed(name.clone(), old.to_state()),
                _ => AttributeChange::modified(name.clone(), old.to_state(), new.to_state()),
            })
        })
        .collect()
}

/// Resolve leftover unknowns to null so they are omitted from the payload.
fn prepare(schema: &Schema, state: &State) -> State {
    let mut out = state.clone();
    for (name, _) in schema.attributes() {
        if state.get(name).is_unknown() {
            out.set(name.clone(), Value::Null);
        }
    }
    out
}

/// Make a decoded state complete: every schema attribute present, masked
/// secrets replaced by the last known value, no unknowns.
fn finalize(schema: &Schema, decoded: State, prior: &State) -> State {
    let mut state = decoded;
    for (name, attr) in schema.attributes() {
        let mut value = state.get(name).clone();
        if attr.flags.sensitive {
            merge_masked(&mut value, prior.get(name));
        }
        if value.is_unknown() {
            value = Value::Null;
        }
        state.set(name.clone(), value);
    }
    state
}

fn require_id(adapter: &dyn ResourceAdapter, state: &State) -> Result<i64, ProviderError> {
    state
        .id()
        .ok_or_else(|| ProviderError::validation("id", format!("{} has no known id", adapter.kind())))
}

/// Overlay a partial payload on the current upstream object.
fn merge_payload(current: Json, ours: Json) -> Json {
    match (current, ours) {
        (Json::Object(mut base), Json::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Json::Object(base)
        },
        (_, ours) => ours,
    }
}

fn with_id(payload: Json, id: i64) -> Json {
    match payload {
        Json::Object(mut members) => {
            members.insert("id".to_string(), Json::from(id));
            Json::Object(members)
        },
        other => {
            let mut members = Map::new();
            members.insert("id".to_string(), Json::from(id));
            merge_payload(Json::Object(members), other)
        },
    }
}

async fn send_checked(
    api: &Api,
    adapter: &dyn ResourceAdapter,
    operation: Operation,
    state: &State,
    method: Method,
    path: &str,
    body: Option<&Json>,
) -> Result<Option<Json>, ProviderError> {
    let response = api.send(method.clone(), path, body).await?;
    if response.is_success() {
        return Ok(Some(response.body));
    }
    if adapter.tolerates(operation, state, &response) {
        debug!(resource_type = %adapter.type_name(), status = response.status, "tolerated upstream response");
        return Ok(None);
    }
    Err(classify(&method, path, &response))
}

/// Write the planned state through an adopting PUT: read the current
/// object, overlay our payload, PUT it back.
async fn adopt(
    api: &Api,
    adapter: &dyn ResourceAdapter,
    operation: Operation,
    planned: &State,
) -> Result<State, ProviderError> {
    let schema = adapter.schema();
    let endpoint = adapter.endpoint();
    let prepared = prepare(&schema, planned);
    let (current, id) = match endpoint.lifecycle {
        Lifecycle::Singleton => {
            let current = api.get(endpoint.path).await?;
            let id = current.get("id").and_then(Json::as_i64).unwrap_or(1);
            (current, id)
        },
        _ => {
            let id = require_id(adapter, &prepared)?;
            let current = api
                .get_opt(&endpoint.item_path(id))
                .await?
                .ok_or_else(|| ProviderError::NotFound(format!("{} {}", adapter.kind(), id)))?;
            (current, id)
        },
    };

    let payload = with_id(merge_payload(current, adapter.to_api(&prepared)?), id);
    let path = endpoint.item_path(id);
    let body = send_checked(api, adapter, operation, &prepared, Method::PUT, &path, Some(&payload))
        .await?
        .filter(|body| !body.is_null())
        .unwrap_or(payload);
    let decoded = adapter.from_api(&body, &prepared)?;
    Ok(finalize(&schema, decoded, &prepared))
}

/// Create the entity and return its authoritative state.
pub async fn create(api: &Api, adapter: &dyn ResourceAdapter, planned: &State) -> Result<State, ProviderError> {
    let endpoint = adapter.endpoint();
    if endpoint.lifecycle != Lifecycle::Managed {
        let state = adopt(api, adapter, Operation::Create, planned).await?;
        info!(resource_type = %adapter.type_name(), id = ?state.id(), "adopted upstream entity");
        return Ok(state);
    }

    let schema = adapter.schema();
    let prepared = prepare(&schema, planned);
    let payload = adapter.to_api_create(&prepared)?;
    let body = send_checked(api, adapter, Operation::Create, &prepared, Method::POST, endpoint.path, Some(&payload))
        .await?
        .unwrap_or(payload);
    let state = finalize(&schema, adapter.from_api(&body, &prepared)?, &prepared);
    info!(resource_type = %adapter.type_name(), id = ?state.id(), "created");
    Ok(state)
}

/// Refresh the entity. `Ok(None)` means it is gone upstream.
pub async fn read(api: &Api, adapter: &dyn ResourceAdapter, current: &State) -> Result<Option<State>, ProviderError> {
    let endpoint = adapter.endpoint();
    let body = match endpoint.lifecycle {
        Lifecycle::Singleton => Some(api.get(endpoint.path).await?),
        _ => {
            let id = require_id(adapter, current)?;
            api.get_opt(&endpoint.item_path(id)).await?
        },
    };
    match body {
        Some(body) => {
            let decoded = adapter.from_api(&body, current)?;
            Ok(Some(finalize(&adapter.schema(), decoded, current)))
        },
        None => {
            warn!(resource_type = %adapter.type_name(), id = ?current.id(), "not found upstream, removing from state");
            Ok(None)
        },
    }
}

/// Update the entity in place.
///
/// Attributes that force replacement keep their prior value: the upstream
/// treats them as immutable.
pub async fn update(
    api: &Api,
    adapter: &dyn ResourceAdapter,
    prior: &State,
    planned: &State,
) -> Result<State, ProviderError> {
    let schema = adapter.schema();
    let mut carried = planned.clone();
    for (name, attr) in schema.attributes() {
        let old = prior.get(name);
        if (attr.force_new || name == "id") && !old.is_null() {
            carried.set(name.clone(), old.clone());
        }
    }

    let endpoint = adapter.endpoint();
    if endpoint.lifecycle != Lifecycle::Managed {
        return adopt(api, adapter, Operation::Update, &carried).await;
    }

    let prepared = prepare(&schema, &carried);
    let id = require_id(adapter, &prepared)?;
    let payload = with_id(adapter.to_api(&prepared)?, id);
    let path = endpoint.item_path(id);
    let body = send_checked(api, adapter, Operation::Update, &prepared, Method::PUT, &path, Some(&payload))
        .await?
        .filter(|body| !body.is_null())
        .unwrap_or(payload);
    let state = finalize(&schema, adapter.from_api(&body, &prepared)?, &prepared);
    info!(resource_type = %adapter.type_name(), id, "updated");
    Ok(state)
}

/// Delete the entity. Missing entities count as deleted.
pub async fn delete(api: &Api, adapter: &dyn ResourceAdapter, current: &State) -> Result<(), ProviderError> {
    let endpoint = adapter.endpoint();
    if endpoint.lifecycle != Lifecycle::Managed {
        debug!(resource_type = %adapter.type_name(), "removing from state only");
        return Ok(());
    }
    let id = require_id(adapter, current)?;
    let mut path = endpoint.item_path(id);
    if let Some(query) = endpoint.delete_query {
        path = format!("{}?{}", path, query);
    }
    let response = api.send(Method::DELETE, &path, None).await?;
    if response.is_success() || response.status == 404 {
        info!(resource_type = %adapter.type_name(), id, "deleted");
        return Ok(());
    }
    if adapter.tolerates(Operation::Delete, current, &response) {
        info!(resource_type = %adapter.type_name(), id, status = response.status, "delete refused upstream, removing from state");
        return Ok(());
    }
    Err(classify(&Method::DELETE, &path, &response))
}

/// Hydrate full state from an import identifier.
pub async fn import(api: &Api, adapter: &dyn ResourceAdapter, key: &str) -> Result<State, ProviderError> {
    let schema = adapter.schema();
    let endpoint = adapter.endpoint();
    let empty = State::new();

    if endpoint.lifecycle == Lifecycle::Singleton {
        let body = api.get(endpoint.path).await?;
        return Ok(finalize(&schema, adapter.from_api(&body, &empty)?, &empty));
    }

    match adapter.import_key() {
        ImportKey::Id => {
            let id: i64 = key.trim().parse().map_err(|_| {
                ProviderError::validation("id", format!("import id must be an integer, got '{}'", key))
            })?;
            let body = api
                .get_opt(&endpoint.item_path(id))
                .await?
                .ok_or_else(|| ProviderError::NotFound(adapter.kind()))?;
            Ok(finalize(&schema, adapter.from_api(&body, &empty)?, &empty))
        },
        ImportKey::Natural(attr) => {
            let items = api.list(endpoint.path).await?;
            let state = select_one(adapter, &items, attr, key)?;
            Ok(finalize(&schema, state, &empty))
        },
    }
}

/// Decode every listed entity and keep the one whose `attr` equals `key`.
pub(crate) fn select_one(
    adapter: &dyn ResourceAdapter,
    items: &[Json],
    attr: &str,
    key: &str,
) -> Result<State, ProviderError> {
    let empty = State::new();
    let mut matches = Vec::new();
    for item in items {
        let state = adapter.from_api(item, &empty)?;
        if key_matches(state.get(attr), key) {
            matches.push(state);
        }
    }
    match matches.len() {
        0 => Err(ProviderError::NotFound(adapter.kind())),
        1 => Ok(matches.remove(0)),
        _ => Err(ProviderError::Ambiguous {
            kind: adapter.kind(),
            candidates: matches
                .iter()
                .map(|state| state.id().map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()))
                .collect(),
        }),
    }
}

fn key_matches(value: &Value, key: &str) -> bool {
    match value {
        Value::String(s) => s == key,
        Value::Int(i) => key.trim().parse::<i64>().map(|k| k == *i).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{simple, TableAdapter};
    use crate::schema::Attribute;
    use crate::testing::FakeSonarr;
    use serde_json::json;
    use std::sync::Arc;

    fn tag_adapter() -> Arc<dyn ResourceAdapter> {
        Arc::new(simple::tag())
    }

    #[test]
    fn test_plan_create_marks_computed_unknown() {
        let adapter = tag_adapter();
        let proposed = State::new().with("label", "eng");
        let result = plan(adapter.as_ref(), None, Some(&proposed)).unwrap();
        assert_eq!(result.planned_state["label"], "eng");
        assert_eq!(result.planned_state["id"], crate::value::UNKNOWN_VALUE);
        assert!(!result.requires_replace);
        assert!(result.changes.iter().any(|c| c.path == "label"));
    }

    #[test]
    fn test_plan_update_keeps_id() {
        let adapter = tag_adapter();
        let prior = State::new().with("id", 3).with("label", "eng");
        let proposed = State::new().with("label", "1080p");
        let result = plan(adapter.as_ref(), Some(&prior), Some(&proposed)).unwrap();
        assert_eq!(result.planned_state["id"], 3);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "label");
    }

    #[test]
    fn test_plan_no_change() {
        let adapter = tag_adapter();
        let prior = State::new().with("id", 3).with("label", "eng");
        let proposed = State::new().with("label", "eng");
        let result = plan(adapter.as_ref(), Some(&prior), Some(&proposed)).unwrap();
        assert!(!result.has_changes());
    }

    #[test]
    fn test_plan_force_new_requires_replace() {
        let adapter: Arc<dyn ResourceAdapter> = Arc::new(simple::root_folder());
        let prior = State::new().with("id", 1).with("path", "/tv");
        let proposed = State::new().with("path", "/media/tv");
        let result = plan(adapter.as_ref(), Some(&prior), Some(&proposed)).unwrap();
        assert!(result.requires_replace);
        assert_eq!(result.planned_state["id"], crate::value::UNKNOWN_VALUE);
    }

    #[test]
    fn test_plan_destroy() {
        let adapter = tag_adapter();
        let prior = State::new().with("id", 3).with("label", "eng");
        let result = plan(adapter.as_ref(), Some(&prior), None).unwrap();
        assert!(result.planned_state.is_null());
        assert_eq!(result.changes.len(), 2);
        assert!(result.changes.iter().all(|c| c.after.is_none()));
    }

    #[tokio::test]
    async fn test_tag_lifecycle() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let adapter = tag_adapter();

        let created = create(&api, adapter.as_ref(), &State::new().with("label", "eng").with("id", Value::Unknown))
            .await
            .unwrap();
        let id = created.id().unwrap();
        assert_eq!(created.str("label"), Some("eng"));

        let updated = update(&api, adapter.as_ref(), &created, &State::new().with("id", id).with("label", "1080p"))
            .await
            .unwrap();
        assert_eq!(updated.id(), Some(id));
        assert_eq!(updated.str("label"), Some("1080p"));

        delete(&api, adapter.as_ref(), &updated).await.unwrap();
        assert!(read(&api, adapter.as_ref(), &updated).await.unwrap().is_none());

        // deleting again is silent
        delete(&api, adapter.as_ref(), &updated).await.unwrap();
    }

    #[tokio::test]
    async fn test_writes_use_collection_and_item_paths() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let adapter = tag_adapter();

        let created = create(&api, adapter.as_ref(), &State::new().with("label", "eng")).await.unwrap();
        let id = created.id().unwrap();
        let updated = update(&api, adapter.as_ref(), &created, &created.clone().with("label", "anime"))
            .await
            .unwrap();
        delete(&api, adapter.as_ref(), &updated).await.unwrap();

        let calls: Vec<_> = fake
            .requests()
            .into_iter()
            .map(|request| (request.method, request.path))
            .collect();
        assert_eq!(
            calls,
            vec![
                (Method::POST, "/api/v3/tag".to_string()),
                (Method::PUT, format!("/api/v3/tag/{}", id)),
                (Method::DELETE, format!("/api/v3/tag/{}", id)),
            ]
        );
    }

    #[test]
    fn test_update_plan_unknowns_only_unflagged_computed() {
        let adapter = TableAdapter::new("sonarr_thing", Endpoint::managed("/api/v3/thing"), "")
            .column("name", Attribute::required_string())
            .column("level", Attribute::optional_int64().computed())
            .column("derived", Attribute::computed_string());
        let prior = State::new()
            .with("id", 4)
            .with("name", "a")
            .with("level", 3)
            .with("derived", "x");

        let kept = plan(&adapter, Some(&prior), Some(&State::new().with("name", "a"))).unwrap();
        assert!(!kept.has_changes());
        assert_eq!(kept.planned_state["derived"], "x");

        let renamed = plan(&adapter, Some(&prior), Some(&State::new().with("name", "b"))).unwrap();
        assert_eq!(renamed.planned_state["id"], 4);
        assert_eq!(renamed.planned_state["level"], 3);
        assert_eq!(renamed.planned_state["derived"], crate::value::UNKNOWN_VALUE);
    }

    #[tokio::test]
    async fn test_read_detects_drift() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let adapter = tag_adapter();
        let created = create(&api, adapter.as_ref(), &State::new().with("label", "eng")).await.unwrap();
        let id = created.id().unwrap();

        fake.put_entity("/api/v3/tag", json!({"id": id, "label": "changed"}));
        let refreshed = read(&api, adapter.as_ref(), &created).await.unwrap().unwrap();
        assert_eq!(refreshed.str("label"), Some("changed"));

        let replan = plan(adapter.as_ref(), Some(&refreshed), Some(&State::new().with("label", "eng"))).unwrap();
        assert!(replan.has_changes());
    }

    #[tokio::test]
    async fn test_import_by_natural_key() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        fake.put_entity("/api/v3/rootfolder", json!({"id": 7, "path": "/tmp", "accessible": true}));
        let adapter = simple::root_folder();

        let state = import(&api, &adapter, "/tmp").await.unwrap();
        assert_eq!(state.str("path"), Some("/tmp"));
        assert_eq!(state.id(), Some(7));

        let err = import(&api, &adapter, "/nope").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_import_ambiguous() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        fake.put_entity("/api/v3/rootfolder", json!({"id": 1, "path": "/tv"}));
        fake.put_entity("/api/v3/rootfolder", json!({"id": 2, "path": "/tv"}));
        let err = import(&api, &simple::root_folder(), "/tv").await.unwrap_err();
        match err {
            ProviderError::Ambiguous { candidates, .. } => assert_eq!(candidates, vec!["1", "2"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_import_by_id_requires_integer() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let err = import(&api, tag_adapter().as_ref(), "eng").await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
    }
}
