//! Indexers.

use crate::fields::{Family, FieldAttr, FieldDef, FieldType, Implementation};
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

const ATTRIBUTES: &[FieldAttr] = &[
    FieldAttr::new("base_url", FieldType::String),
    FieldAttr::new("api_path", FieldType::String),
    FieldAttr::new("api_key", FieldType::String).sensitive(),
    FieldAttr::new("passkey", FieldType::String).sensitive(),
    FieldAttr::new("cookie", FieldType::String).sensitive(),
    FieldAttr::new("username", FieldType::String),
    FieldAttr::new("categories", FieldType::IntSet),
    FieldAttr::new("anime_categories", FieldType::IntSet),
    FieldAttr::new("codecs", FieldType::IntSet),
    FieldAttr::new("mediums", FieldType::IntSet),
    FieldAttr::new("additional_parameters", FieldType::String),
    FieldAttr::new("anime_standard_format_search", FieldType::Bool),
    FieldAttr::new("allow_zero_size", FieldType::Bool),
    FieldAttr::new("minimum_seeders", FieldType::Int),
    FieldAttr::new("seed_ratio", FieldType::Float),
    FieldAttr::new("seed_time", FieldType::Int),
    FieldAttr::new("season_pack_seed_time", FieldType::Int),
];

/// Indexer implementations.
pub static INDEXERS: Family = Family {
    kind: "indexer",
    attributes: ATTRIBUTES,
    implementations: &[
        Implementation {
            name: "Newznab",
            config_contract: "NewznabSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl").required(),
                FieldDef::new("api_path", "apiPath"),
                FieldDef::new("api_key", "apiKey"),
                FieldDef::new("categories", "categories"),
                FieldDef::new("anime_categories", "animeCategories"),
                FieldDef::new("anime_standard_format_search", "animeStandardFormatSearch"),
                FieldDef::new("additional_parameters", "additionalParameters"),
            ],
        },
        Implementation {
            name: "Torznab",
            config_contract: "TorznabSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl").required(),
                FieldDef::new("api_path", "apiPath"),
                FieldDef::new("api_key", "apiKey"),
                FieldDef::new("categories", "categories"),
                FieldDef::new("anime_categories", "animeCategories"),
                FieldDef::new("anime_standard_format_search", "animeStandardFormatSearch"),
                FieldDef::new("additional_parameters", "additionalParameters"),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "BroadcastheNet",
            config_contract: "BroadcastheNetSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl"),
                FieldDef::new("api_key", "apiKey").required(),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "FileList",
            config_contract: "FileListSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl"),
                FieldDef::new("username", "username").required(),
                FieldDef::new("passkey", "passKey").required(),
                FieldDef::new("categories", "categories"),
                FieldDef::new("anime_categories", "animeCategories"),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "HDBits",
            config_contract: "HDBitsSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl"),
                FieldDef::new("username", "username").required(),
                FieldDef::new("api_key", "apiKey").required(),
                FieldDef::new("codecs", "codecs"),
                FieldDef::new("mediums", "mediums"),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "IPTorrents",
            config_contract: "IPTorrentsSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl").required(),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "Nyaa",
            config_contract: "NyaaSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl"),
                FieldDef::new("additional_parameters", "additionalParameters"),
                FieldDef::new("anime_standard_format_search", "animeStandardFormatSearch"),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "TorrentRssIndexer",
            config_contract: "TorrentRssIndexerSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl").required(),
                FieldDef::new("cookie", "cookie"),
                FieldDef::new("allow_zero_size", "allowZeroSize"),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
        Implementation {
            name: "TorrentleechIndexer",
            config_contract: "TorrentleechSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl"),
                FieldDef::new("api_key", "apiKey").required(),
                FieldDef::new("minimum_seeders", "minimumSeeders"),
                FieldDef::new("seed_ratio", "seedCriteria.seedRatio"),
                FieldDef::new("seed_time", "seedCriteria.seedTime"),
                FieldDef::new("season_pack_seed_time", "seedCriteria.seasonPackSeedTime"),
            ],
        },
    ],
};

/// `sonarr_indexer`.
pub fn indexer() -> TableAdapter {
    TableAdapter::new("sonarr_indexer", Endpoint::managed("/api/v3/indexer"), "Indexer resource.")
        .column("name", Attribute::required_string().with_description("Indexer name."))
        .column("enable_automatic_search", Attribute::optional_bool().computed())
        .column("enable_interactive_search", Attribute::optional_bool().computed())
        .column("enable_rss", Attribute::optional_bool().computed())
        .column("priority", Attribute::optional_int64().computed())
        .column("download_client_id", Attribute::optional_int64().computed())
        .column(
            "protocol",
            Attribute::optional_string()
                .computed()
                .with_description("Protocol: usenet or torrent."),
        )
        .column(
            "tags",
            Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional_computed()),
        )
        .family(&INDEXERS)
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

    fn newznab() -> State {
        State::new()
            .with("name", "lolo")
            .with("implementation", "Newznab")
            .with("config_contract", "NewznabSettings")
            .with("base_url", "https://lolo.sickbeard.com")
            .with("api_path", "/api")
            .with("categories", Value::Set(vec![Value::Int(5030), Value::Int(5040)]))
            .with("protocol", "usenet")
    }

    #[test]
    fn test_newznab_fields_are_exact() {
        let payload = indexer().to_api(&newznab()).unwrap();
        let names: Vec<_> = payload["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|field| field["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["baseUrl", "apiPath", "categories"]);
        assert_eq!(payload["configContract"], "NewznabSettings");
        assert_eq!(payload["protocol"], "usenet");
    }

    #[test]
    fn test_unused_fields_absent_on_read() {
        let upstream = json!({
            "id": 2,
            "name": "rss",
            "implementation": "TorrentRssIndexer",
            "configContract": "TorrentRssIndexerSettings",
            "fields": [
                {"name": "baseUrl", "value": "https://rss.example/feed"},
                {"name": "allowZeroSize", "value": true},
                {"name": "seedCriteria.seedRatio", "value": 1.5},
                {"name": "apiPath", "value": "/api"}
            ]
        });
        let state = indexer().from_api(&upstream, &State::new()).unwrap();
        assert_eq!(state.str("base_url"), Some("https://rss.example/feed"));
        assert_eq!(state.get("seed_ratio"), &Value::Float(1.5));
        assert!(state.get("api_path").is_null());
        assert!(state.get("categories").is_null());
    }

    #[test]
    fn test_inapplicable_field_rejected_at_plan() {
        let adapter = indexer();
        assert!(!has_errors(&adapter.validate(&newznab())));

        let diags = adapter.validate(&newznab().with("seed_ratio", 2.0));
        assert!(diags.iter().any(|d| d.attribute.as_deref() == Some("seed_ratio")));

        let diags = adapter.validate(&newznab().with("implementation", "newznab"));
        assert!(diags.iter().any(|d| d.attribute.as_deref() == Some("implementation")));
    }

    #[tokio::test]
    async fn test_switching_implementation_drops_stale_fields() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let adapter = indexer();

        let torznab = State::new()
            .with("name", "lolo")
            .with("implementation", "Torznab")
            .with("base_url", "https://torznab.example")
            .with("seed_ratio", 1.5)
            .with("protocol", "torrent");
        let created = resource::create(&api, &adapter, &torznab).await.unwrap();
        assert_eq!(created.str("config_contract"), Some("TorznabSettings"));

        let config = State::new()
            .with("name", "lolo")
            .with("implementation", "Newznab")
            .with("base_url", "https://lolo.sickbeard.com")
            .with("protocol", "usenet");
        let result = resource::plan(&adapter, Some(&created), Some(&config)).unwrap();
        assert!(!result.requires_replace);
        assert!(result.planned_state["seed_ratio"].is_null());
        assert_eq!(result.planned_state["config_contract"], "NewznabSettings");
        assert_eq!(result.planned_state["api_path"], crate::value::UNKNOWN_VALUE);
        assert_eq!(result.planned_state["id"], created.id().unwrap());

        let planned = State::from_json(&result.planned_state, &adapter.schema()).unwrap();
        assert!(!has_errors(&adapter.validate(&planned)));
        let updated = resource::update(&api, &adapter, &created, &planned).await.unwrap();
        assert_eq!(updated.str("implementation"), Some("Newznab"));
        assert_eq!(updated.str("config_contract"), Some("NewznabSettings"));
        assert!(updated.get("seed_ratio").is_null());

        let unknown = config.clone().with("implementation", Value::Unknown);
        let result = resource::plan(&adapter, Some(&created), Some(&unknown)).unwrap();
        assert_eq!(result.planned_state["config_contract"], crate::value::UNKNOWN_VALUE);
        assert_eq!(result.planned_state["seed_ratio"], crate::value::UNKNOWN_VALUE);
    }

    #[tokio::test]
    async fn test_masked_api_key_keeps_state() {
        let fake = FakeSonarr::new();
        fake.mask_field("apiKey");
        let api = fake.api();
        let adapter = indexer();

        let planned = newznab().with("api_key", "s3cret");
        let created = resource::create(&api, &adapter, &planned).await.unwrap();
        assert_eq!(created.str("api_key"), Some("s3cret"));

        let refreshed = resource::read(&api, &adapter, &created).await.unwrap().unwrap();
        assert_eq!(refreshed.str("api_key"), Some("s3cret"));
        assert_eq!(refreshed, created);
    }
}
