//! Quality profiles.
//!
//! The engine sees `quality_groups`, an ordered list of groups each holding
//! its qualities. Upstream, the same data is an `items` tree where a lone
//! quality is a plain item and a group is a named item with children; only
//! allowed items are managed.
//!
//! A group holding exactly one quality under that quality's own id is sent
//! as a plain item and read back named after the quality, so its name must
//! be the quality's name.

use serde_json::{json, Value as Json};

use crate::error::ProviderError;
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic};
use crate::value::{from_plain, index_path, join_path, to_plain, State, Value};

use super::{Codec, Column, TableAdapter};

fn quality_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("source", AttributeType::String),
        ("resolution", AttributeType::Int64),
    ])
}

fn group_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::Int64),
        ("name", AttributeType::String),
        ("qualities", AttributeType::list(quality_type())),
    ])
}

/// `sonarr_quality_profile`.
pub fn quality_profile() -> TableAdapter {
    let format_item = AttributeType::object([
        ("format", AttributeType::Int64),
        ("name", AttributeType::String),
        ("score", AttributeType::Int64),
    ]);
    TableAdapter::new(
        "sonarr_quality_profile",
        Endpoint::managed("/api/v3/qualityprofile"),
        "Quality profile resource.",
    )
    .column("name", Attribute::required_string().with_description("Quality profile name."))
    .column("upgrade_allowed", Attribute::optional_bool().computed())
    .column(
        "cutoff",
        Attribute::required_int64().with_description("Id of the quality or group upgrades stop at."),
    )
    .column("min_format_score", Attribute::optional_int64().computed())
    .column("cutoff_format_score", Attribute::optional_int64().computed())
    .with_column(
        Column::new(
            "quality_groups",
            Attribute::new(AttributeType::list(group_type()), AttributeFlags::required())
                .with_description("Allowed quality groups, lowest first."),
        )
        .key("items")
        .codec(QUALITY_ITEMS),
    )
    .column(
        "format_items",
        Attribute::new(AttributeType::set(format_item), AttributeFlags::optional_computed()),
    )
    .keyed_by("name")
    .validator(validate_quality_profile)
}

const QUALITY_ITEMS: Codec = Codec {
    encode: encode_items,
    decode: decode_items,
};

fn quality_item(quality: Json) -> Json {
    json!({ "quality": quality, "items": [], "allowed": true })
}

fn encode_items(value: &Value, path: &str) -> Result<Option<Json>, ProviderError> {
    let groups = match value {
        Value::Unknown => return Err(ProviderError::EncodeUnknown(path.to_string())),
        Value::Null => return Ok(None),
        other => other.as_elements().unwrap_or_default(),
    };

    let mut items = Vec::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        let group_path = index_path(path, i);
        let qualities = group.member("qualities").as_elements().unwrap_or_default();
        let group_id = group.member("id").as_i64();

        if qualities.len() == 1 && qualities[0].member("id").as_i64() == group_id {
            let quality = to_plain(&qualities[0], &index_path(&join_path(&group_path, "qualities"), 0))?;
            items.push(quality_item(quality.unwrap_or(Json::Null)));
            continue;
        }

        let mut children = Vec::with_capacity(qualities.len());
        for (j, quality) in qualities.iter().enumerate() {
            let quality_path = index_path(&join_path(&group_path, "qualities"), j);
            children.push(quality_item(to_plain(quality, &quality_path)?.unwrap_or(Json::Null)));
        }
        let mut item = json!({ "items": children, "allowed": true });
        if let Some(id) = to_plain(group.member("id"), &join_path(&group_path, "id"))? {
            item["id"] = id;
        }
        if let Some(name) = to_plain(group.member("name"), &join_path(&group_path, "name"))? {
            item["name"] = name;
        }
        items.push(item);
    }
    Ok(Some(Json::Array(items)))
}

fn decode_items(raw: Option<&Json>, path: &str) -> Result<Value, ProviderError> {
    let items = match raw {
        Some(Json::Array(items)) => items,
        _ => return Ok(Value::Null),
    };
    let quality_ty = quality_type();

    let mut groups = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if item.get("allowed").and_then(Json::as_bool) != Some(true) {
            continue;
        }
        let item_path = index_path(path, i);
        let group = match item.get("quality").filter(|q| !q.is_null()) {
            Some(quality) => {
                let quality = from_plain(Some(quality), &quality_ty, &join_path(&item_path, "quality"))?;
                [
                    ("id".to_string(), quality.member("id").clone()),
                    ("name".to_string(), quality.member("name").clone()),
                    ("qualities".to_string(), Value::List(vec![quality])),
                ]
            },
            None => {
                let mut qualities = Vec::new();
                if let Some(Json::Array(children)) = item.get("items") {
                    for (j, child) in children.iter().enumerate() {
                        qualities.push(from_plain(
                            child.get("quality"),
                            &quality_ty,
                            &index_path(&join_path(&item_path, "items"), j),
                        )?);
                    }
                }
                [
                    ("id".to_string(), from_plain(item.get("id"), &AttributeType::Int64, &item_path)?),
                    ("name".to_string(), from_plain(item.get("name"), &AttributeType::String, &item_path)?),
                    ("qualities".to_string(), Value::List(qualities)),
                ]
            },
        };
        groups.push(Value::Object(group.into_iter().collect()));
    }
    Ok(Value::List(groups))
}

fn validate_quality_profile(config: &State) -> Vec<Diagnostic> {
    let groups = match config.get("quality_groups") {
        Value::List(groups) if groups.iter().all(Value::is_wholly_known) => groups,
        _ => return Vec::new(),
    };
    let mut diagnostics = validate_plain_item_names(groups);
    if let Some(cutoff) = config.int("cutoff") {
        diagnostics.extend(validate_cutoff(cutoff, groups));
    }
    diagnostics
}

fn validate_plain_item_names(groups: &[Value]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        let qualities = group.member("qualities").as_elements().unwrap_or_default();
        if qualities.len() != 1 || qualities[0].member("id").as_i64() != group.member("id").as_i64() {
            continue;
        }
        let (name, quality_name) = (group.member("name"), qualities[0].member("name"));
        if name != quality_name {
            diagnostics.push(
                Diagnostic::error("Invalid attribute 'name'")
                    .with_detail(format!(
                        "a group holding only quality {} must be named {}",
                        qualities[0].member("id").as_i64().unwrap_or_default(),
                        quality_name.as_str().unwrap_or("after that quality")
                    ))
                    .with_attribute(join_path(&index_path("quality_groups", i), "name")),
            );
        }
    }
    diagnostics
}

fn validate_cutoff(cutoff: i64, groups: &[Value]) -> Vec<Diagnostic> {
    let matches = groups.iter().any(|group| {
        group.member("id").as_i64() == Some(cutoff)
            || group
                .member("qualities")
                .as_elements()
                .unwrap_or_default()
                .iter()
                .any(|quality| quality.member("id").as_i64() == Some(cutoff))
    });
    if matches {
        Vec::new()
    } else {
        vec![Diagnostic::error("Invalid attribute 'cutoff'")
            .with_detail(format!(
                "cutoff {} must equal the id of a quality group or one of its qualities",
                cutoff
            ))
            .with_attribute("cutoff")]
    }
}
