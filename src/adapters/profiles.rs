//! Delay, release and language profiles, plus quality definitions.

use serde_json::{json, Value as Json};

use crate::client::ApiResponse;
use crate::error::ProviderError;
use crate::resource::{Endpoint, Operation};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic};
use crate::value::{State, Value};

use super::{Codec, Column, TableAdapter, ID_REFERENCE};

const PROTOCOLS: &[&str] = &["usenet", "torrent"];

fn tags() -> Attribute {
    Attribute::new(
        AttributeType::set(AttributeType::Int64),
        AttributeFlags::optional_computed(),
    )
    .with_description("List of associated tags.")
}

fn optional_computed(ty: AttributeType) -> Attribute {
    Attribute::new(ty, AttributeFlags::optional_computed())
}

/// `sonarr_delay_profile`.
///
/// The default profile (id 1) cannot be deleted upstream; destroying it only
/// removes it from state.
pub fn delay_profile() -> TableAdapter {
    TableAdapter::new(
        "sonarr_delay_profile",
        Endpoint::managed("/api/v3/delayprofile"),
        "Delay profile resource.",
    )
    .column("enable_usenet", optional_computed(AttributeType::Bool))
    .column("enable_torrent", optional_computed(AttributeType::Bool))
    .column(
        "preferred_protocol",
        optional_computed(AttributeType::String).with_description("Preferred protocol: usenet or torrent."),
    )
    .column("usenet_delay", optional_computed(AttributeType::Int64))
    .column("torrent_delay", optional_computed(AttributeType::Int64))
    .column("bypass_if_highest_quality", optional_computed(AttributeType::Bool))
    .column("order", optional_computed(AttributeType::Int64))
    .column("tags", tags())
    .validator(validate_delay_profile)
    .tolerate(tolerate_default_profile_delete)
}

fn validate_delay_profile(config: &State) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if let Some(protocol) = config.str("preferred_protocol") {
        if !PROTOCOLS.contains(&protocol) {
            diagnostics.push(
                Diagnostic::error("Invalid attribute 'preferred_protocol'")
                    .with_detail(format!("'{}' is not one of {}", protocol, PROTOCOLS.join(", ")))
                    .with_attribute("preferred_protocol"),
            );
        }
    }
    if config.bool("enable_usenet") == Some(false) && config.bool("enable_torrent") == Some(false) {
        diagnostics.push(
            Diagnostic::error("No protocol enabled")
                .with_detail("at least one of enable_usenet and enable_torrent must be true")
                .with_attribute("enable_usenet"),
        );
    }
    diagnostics
}

fn tolerate_default_profile_delete(operation: Operation, state: &State, _response: &ApiResponse) -> bool {
    operation == Operation::Delete && state.id() == Some(1)
}

/// `sonarr_release_profile`.
pub fn release_profile() -> TableAdapter {
    TableAdapter::new(
        "sonarr_release_profile",
        Endpoint::managed("/api/v3/releaseprofile"),
        "Release profile resource.",
    )
    .column("name", Attribute::optional_string().with_description("Release profile name."))
    .column(
        "enabled",
        Attribute::optional_bool()
            .computed()
            .with_default(json!(true)),
    )
    .column(
        "required",
        optional_computed(AttributeType::set(AttributeType::String))
            .with_description("Terms a release must contain."),
    )
    .column(
        "ignored",
        optional_computed(AttributeType::set(AttributeType::String))
            .with_description("Terms a release must not contain."),
    )
    .column("indexer_id", optional_computed(AttributeType::Int64))
    .column("tags", tags())
    .keyed_by("name")
    .validator(validate_release_profile)
}

fn validate_release_profile(config: &State) -> Vec<Diagnostic> {
    let required = config.get("required");
    let ignored = config.get("ignored");
    if required.is_unknown() || ignored.is_unknown() {
        return Vec::new();
    }
    if required.is_empty_collection() && ignored.is_empty_collection() {
        return vec![Diagnostic::error("Missing release profile terms")
            .with_detail("at least one of required and ignored must be non-empty")
            .with_attribute("required")];
    }
    Vec::new()
}

/// Allowed languages as an ordered list of language ids.
const ALLOWED_LANGUAGES: Codec = Codec {
    encode: encode_languages,
    decode: decode_languages,
};

fn encode_languages(value: &Value, path: &str) -> Result<Option<Json>, ProviderError> {
    let ids = match crate::value::to_plain(value, path)? {
        Some(Json::Array(ids)) => ids,
        Some(_) | None => return Ok(None),
    };
    Ok(Some(Json::Array(
        ids.into_iter()
            .map(|id| json!({ "language": { "id": id }, "allowed": true }))
            .collect(),
    )))
}

fn decode_languages(raw: Option<&Json>, path: &str) -> Result<Value, ProviderError> {
    let items = match raw {
        Some(Json::Array(items)) => items,
        _ => return Ok(Value::Null),
    };
    let mut ids = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if item.get("allowed").and_then(Json::as_bool) != Some(true) {
            continue;
        }
        let id = crate::value::from_plain(
            item.get("language").and_then(|l| l.get("id")),
            &AttributeType::Int64,
            &format!("{}.{}", path, i),
        )?;
        ids.push(id);
    }
    Ok(Value::List(ids))
}

/// `sonarr_language_profile`.
pub fn language_profile() -> TableAdapter {
    TableAdapter::new(
        "sonarr_language_profile",
        Endpoint::managed("/api/v3/languageprofile"),
        "Language profile resource.",
    )
    .column("name", Attribute::required_string())
    .column("upgrade_allowed", optional_computed(AttributeType::Bool))
    .with_column(
        Column::new(
            "cutoff",
            Attribute::required_int64().with_description("Cutoff language id."),
        )
        .codec(ID_REFERENCE),
    )
    .with_column(
        Column::new(
            "languages",
            Attribute::new(AttributeType::list(AttributeType::Int64), AttributeFlags::required())
                .with_description("Allowed language ids."),
        )
        .codec(ALLOWED_LANGUAGES),
    )
    .keyed_by("name")
    .validator(validate_language_profile)
}

fn validate_language_profile(config: &State) -> Vec<Diagnostic> {
    let (cutoff, languages) = match (config.int("cutoff"), config.get("languages").as_elements()) {
        (Some(cutoff), Some(languages)) => (cutoff, languages),
        _ => return Vec::new(),
    };
    if languages.iter().any(Value::is_unknown) || languages.iter().any(|l| l.as_i64() == Some(cutoff)) {
        return Vec::new();
    }
    vec![Diagnostic::error("Invalid attribute 'cutoff'")
        .with_detail(format!("cutoff {} is not one of the allowed languages", cutoff))
        .with_attribute("cutoff")]
}

/// `sonarr_quality_definition`; quality definitions always exist, the id selects one.
pub fn quality_definition() -> TableAdapter {
    let quality = AttributeType::object([
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("source", AttributeType::String),
        ("resolution", AttributeType::Int64),
    ]);
    TableAdapter::new(
        "sonarr_quality_definition",
        Endpoint::existing("/api/v3/qualitydefinition"),
        "Quality definition resource.",
    )
    .id_attribute(Attribute::required_int64().with_description("Quality definition id."))
    .column("title", optional_computed(AttributeType::String))
    .column("min_size", optional_computed(AttributeType::Float64))
    .column("max_size", optional_computed(AttributeType::Float64))
    .column("preferred_size", optional_computed(AttributeType::Float64))
    .column(
        "quality",
        Attribute::new(quality, AttributeFlags::computed()).with_use_state_for_unknown(),
    )
    .keyed_by("title")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceAdapter;
    use crate::schema::has_errors;

    #[test]
    fn test_delay_profile_validation() {
        let adapter = delay_profile();
        let bad = State::new()
            .with("preferred_protocol", "ftp")
            .with("enable_usenet", false)
            .with("enable_torrent", false);
        assert_eq!(adapter.validate(&bad).len(), 2);

        let good = State::new().with("preferred_protocol", "torrent");
        assert!(!has_errors(&adapter.validate(&good)));
    }

    #[test]
    fn test_default_delay_profile_delete_is_tolerated() {
        let adapter = delay_profile();
        let refused = ApiResponse::new(500, Json::Null);
        assert!(adapter.tolerates(Operation::Delete, &State::new().with("id", 1), &refused));
        assert!(!adapter.tolerates(Operation::Delete, &State::new().with("id", 2), &refused));
        assert!(!adapter.tolerates(Operation::Update, &State::new().with("id", 1), &refused));
    }

    #[test]
    fn test_release_profile_requires_terms() {
        let adapter = release_profile();
        assert!(has_errors(&adapter.validate(&State::new().with("name", "x"))));
        assert!(!has_errors(&adapter.validate(
            &State::new().with("ignored", Value::Set(vec![Value::from("cam")]))
        )));
        assert!(!has_errors(&adapter.validate(&State::new().with("required", Value::Unknown))));
    }

    #[test]
    fn test_language_profile_codecs() {
        let adapter = language_profile();
        let state = State::new()
            .with("name", "English")
            .with("cutoff", 1)
            .with("languages", Value::List(vec![Value::Int(1), Value::Int(3)]));
        let payload = adapter.to_api(&state).unwrap();
        assert_eq!(payload["cutoff"], json!({"id": 1}));
        assert_eq!(payload["languages"][1], json!({"language": {"id": 3}, "allowed": true}));

        let upstream = json!({
            "id": 4,
            "name": "English",
            "upgradeAllowed": false,
            "cutoff": {"id": 1, "name": "English"},
            "languages": [
                {"language": {"id": 1, "name": "English"}, "allowed": true},
                {"language": {"id": 2, "name": "French"}, "allowed": false},
                {"language": {"id": 3, "name": "Spanish"}, "allowed": true}
            ]
        });
        let back = adapter.from_api(&upstream, &State::new()).unwrap();
        assert_eq!(back.int("cutoff"), Some(1));
        assert_eq!(back.get("languages"), &Value::List(vec![Value::Int(1), Value::Int(3)]));
    }

    #[test]
    fn test_language_profile_cutoff_must_be_allowed() {
        let state = State::new()
            .with("cutoff", 2)
            .with("languages", Value::List(vec![Value::Int(1)]));
        let diags = language_profile().validate(&state);
        assert_eq!(diags[0].attribute.as_deref(), Some("cutoff"));
    }

    #[test]
    fn test_quality_definition_id_is_configurable() {
        let schema = quality_definition().schema();
        assert!(schema.attribute("id").unwrap().flags.required);
    }
}
