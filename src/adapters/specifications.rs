//! Custom formats and auto tags.
//!
//! Both own an ordered `specifications` list whose elements are
//! polymorphic the same way indexers are; the upstream order is kept on
//! read.

use crate::fields::{Family, FieldAttr, FieldDef, FieldType, Implementation, Wire};
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

const NUMERIC_VALUE: FieldDef = FieldDef::new("value", "value").required().wire(Wire::IntAsString);
const TEXT_VALUE: FieldDef = FieldDef::new("value", "value").required();
const WORDS_VALUE: FieldDef = FieldDef::new("value", "value").required().wire(Wire::WordList);

/// Custom format specification implementations.
pub static CUSTOM_FORMAT_SPECIFICATIONS: Family = Family {
    kind: "custom format specification",
    attributes: &[
        FieldAttr::new("value", FieldType::String),
        FieldAttr::new("min", FieldType::Float),
        FieldAttr::new("max", FieldType::Float),
        FieldAttr::new("except_language", FieldType::Bool),
    ],
    implementations: &[
        Implementation {
            name: "ReleaseTitleSpecification",
            config_contract: "ReleaseTitleSpecification",
            fields: &[TEXT_VALUE],
        },
        Implementation {
            name: "LanguageSpecification",
            config_contract: "LanguageSpecification",
            fields: &[NUMERIC_VALUE, FieldDef::new("except_language", "exceptLanguage")],
        },
        Implementation {
            name: "ResolutionSpecification",
            config_contract: "ResolutionSpecification",
            fields: &[NUMERIC_VALUE],
        },
        Implementation {
            name: "SourceSpecification",
            config_contract: "SourceSpecification",
            fields: &[NUMERIC_VALUE],
        },
        Implementation {
            name: "SizeSpecification",
            config_contract: "SizeSpecification",
            fields: &[FieldDef::new("min", "min"), FieldDef::new("max", "max")],
        },
        Implementation {
            name: "ReleaseGroupSpecification",
            config_contract: "ReleaseGroupSpecification",
            fields: &[TEXT_VALUE],
        },
        Implementation {
            name: "IndexerFlagSpecification",
            config_contract: "IndexerFlagSpecification",
            fields: &[NUMERIC_VALUE],
        },
        Implementation {
            name: "ReleaseTypeSpecification",
            config_contract: "ReleaseTypeSpecification",
            fields: &[NUMERIC_VALUE],
        },
    ],
};

/// Auto tag specification implementations.
pub static AUTO_TAG_SPECIFICATIONS: Family = Family {
    kind: "auto tag specification",
    attributes: &[FieldAttr::new("value", FieldType::String)],
    implementations: &[
        Implementation {
            name: "SeriesTypeSpecification",
            config_contract: "SeriesTypeSpecification",
            fields: &[NUMERIC_VALUE],
        },
        Implementation {
            name: "GenreSpecification",
            config_contract: "GenreSpecification",
            fields: &[WORDS_VALUE],
        },
        Implementation {
            name: "RootFolderSpecification",
            config_contract: "RootFolderSpecification",
            fields: &[TEXT_VALUE],
        },
        Implementation {
            name: "QualityProfileSpecification",
            config_contract: "QualityProfileSpecification",
            fields: &[NUMERIC_VALUE],
        },
        Implementation {
            name: "OriginalLanguageSpecification",
            config_contract: "OriginalLanguageSpecification",
            fields: &[NUMERIC_VALUE],
        },
        Implementation {
            name: "NetworkSpecification",
            config_contract: "NetworkSpecification",
            fields: &[WORDS_VALUE],
        },
        Implementation {
            name: "StatusSpecification",
            config_contract: "StatusSpecification",
            fields: &[NUMERIC_VALUE],
        },
    ],
};

/// `sonarr_custom_format`.
pub fn custom_format() -> TableAdapter {
    TableAdapter::new(
        "sonarr_custom_format",
        Endpoint::managed("/api/v3/customformat"),
        "Custom format resource.",
    )
    .column("name", Attribute::required_string().with_description("Custom format name."))
    .column("include_custom_format_when_renaming", Attribute::optional_bool().computed())
    .specifications(&CUSTOM_FORMAT_SPECIFICATIONS)
    .keyed_by("name")
}

/// `sonarr_auto_tag`.
pub fn auto_tag() -> TableAdapter {
    TableAdapter::new("sonarr_auto_tag", Endpoint::managed("/api/v3/autotagging"), "Auto tag resource.")
        .column("name", Attribute::required_string().with_description("Auto tag name."))
        .column("remove_tags_automatically", Attribute::optional_bool().computed())
        .column(
            "tags",
            Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::required())
                .with_description("Tags applied to matching series."),
        )
        .specifications(&AUTO_TAG_SPECIFICATIONS)
        .keyed_by("name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{self, ResourceAdapter};
    use crate::schema::has_errors;
    use crate::testing::FakeSonarr;
    use crate::value::{State, Value};
    use serde_json::json;

    fn spec(implementation: &str, name: &str, negate: bool, value: &str) -> Value {
        Value::Object(
            [
                ("implementation".to_string(), Value::from(implementation)),
                ("name".to_string(), Value::from(name)),
                ("negate".to_string(), Value::Bool(negate)),
                ("required".to_string(), Value::Bool(false)),
                ("value".to_string(), Value::from(value)),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn three_specs() -> State {
        State::new()
            .with("name", "Example")
            .with("tags", Value::Set(vec![Value::Int(1)]))
            .with(
                "specifications",
                Value::List(vec![
                    spec("RootFolderSpecification", "folder", true, "/config"),
                    spec("SeriesTypeSpecification", "type", false, "2"),
                    spec("GenreSpecification", "genre", false, "horror comedy"),
                ]),
            )
    }

    #[test]
    fn test_specification_values_on_the_wire() {
        let payload = auto_tag().to_api(&three_specs()).unwrap();
        let specs = payload["specifications"].as_array().unwrap();
        assert_eq!(specs[0]["negate"], true);
        assert_eq!(specs[0]["fields"], json!([{"name": "value", "value": "/config"}]));
        assert_eq!(specs[1]["fields"], json!([{"name": "value", "value": 2}]));
        assert_eq!(specs[2]["fields"], json!([{"name": "value", "value": ["horror", "comedy"]}]));
    }

    #[tokio::test]
    async fn test_auto_tag_round_trip() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let adapter = auto_tag();

        let created = resource::create(&api, &adapter, &three_specs()).await.unwrap();
        let refreshed = resource::read(&api, &adapter, &created).await.unwrap().unwrap();
        let specs = refreshed.get("specifications").as_elements().unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].member("negate"), &Value::Bool(true));
        assert_eq!(specs[0].member("value"), &Value::from("/config"));
        assert_eq!(specs[1].member("value"), &Value::from("2"));
        assert_eq!(specs[2].member("value"), &Value::from("horror comedy"));
        assert_eq!(refreshed.get("specifications"), three_specs().get("specifications"));
    }

    #[test]
    fn test_specification_validation() {
        let adapter = custom_format();
        let bad = State::new().with("name", "x265").with(
            "specifications",
            Value::List(vec![spec("ResolutionSpecification", "res", false, "1080p")]),
        );
        let diags = adapter.validate(&bad);
        assert!(has_errors(&diags));
        assert_eq!(diags[0].attribute.as_deref(), Some("specifications.0.value"));

        let good = State::new().with(
            "specifications",
            Value::List(vec![spec("ResolutionSpecification", "res", false, "1080")]),
        );
        assert!(!has_errors(&adapter.validate(&good)));
    }

    #[test]
    fn test_size_specification_has_no_value() {
        let size = Value::Object(
            [
                ("implementation".to_string(), Value::from("SizeSpecification")),
                ("name".to_string(), Value::from("size")),
                ("min".to_string(), Value::Float(1.0)),
                ("max".to_string(), Value::Float(9.5)),
            ]
            .into_iter()
            .collect(),
        );
        let state = State::new()
            .with("name", "sized")
            .with("specifications", Value::List(vec![size]));
        let payload = custom_format().to_api(&state).unwrap();
        assert_eq!(
            payload["specifications"][0]["fields"],
            json!([{"name": "min", "value": 1.0}, {"name": "max", "value": 9.5}])
        );
    }
}
