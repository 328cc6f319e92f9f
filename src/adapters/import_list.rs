//! Import lists.

use crate::fields::{Family, FieldAttr, FieldDef, FieldType, Implementation};
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

const ATTRIBUTES: &[FieldAttr] = &[
    FieldAttr::new("base_url", FieldType::String),
    FieldAttr::new("url", FieldType::String),
    FieldAttr::new("api_key", FieldType::String).sensitive(),
    FieldAttr::new("access_token", FieldType::String).sensitive(),
    FieldAttr::new("refresh_token", FieldType::String).sensitive(),
    FieldAttr::new("expires", FieldType::String),
    FieldAttr::new("auth_user", FieldType::String),
    FieldAttr::new("username", FieldType::String),
    FieldAttr::new("listname", FieldType::String),
    FieldAttr::new("list_id", FieldType::String),
    FieldAttr::new("limit", FieldType::Int),
    FieldAttr::new("trakt_list_type", FieldType::Int),
    FieldAttr::new("trakt_additional_parameters", FieldType::String),
    FieldAttr::new("genres", FieldType::String),
    FieldAttr::new("years", FieldType::String),
    FieldAttr::new("rating", FieldType::String),
    FieldAttr::new("certification", FieldType::String),
    FieldAttr::new("profile_ids", FieldType::IntSet),
    FieldAttr::new("tag_ids", FieldType::IntSet),
    FieldAttr::new("language_profile_ids", FieldType::IntSet),
    FieldAttr::new("root_folder_paths", FieldType::StringSet),
];

/// Import list implementations.
pub static IMPORT_LISTS: Family = Family {
    kind: "import list",
    attributes: ATTRIBUTES,
    implementations: &[
        Implementation {
            name: "SonarrImport",
            config_contract: "SonarrSettings",
            fields: &[
                FieldDef::new("base_url", "baseUrl").required(),
                FieldDef::new("api_key", "apiKey").required(),
                FieldDef::new("profile_ids", "profileIds"),
                FieldDef::new("tag_ids", "tagIds"),
                FieldDef::new("language_profile_ids", "languageProfileIds"),
                FieldDef::new("root_folder_paths", "rootFolderPaths"),
            ],
        },
        Implementation {
            name: "PlexImport",
            config_contract: "PlexListSettings",
            fields: &[FieldDef::new("access_token", "accessToken").required()],
        },
        Implementation {
            name: "TraktListImport",
            config_contract: "TraktListSettings",
            fields: &[
                FieldDef::new("access_token", "accessToken"),
                FieldDef::new("refresh_token", "refreshToken"),
                FieldDef::new("expires", "expires"),
                FieldDef::new("auth_user", "authUser"),
                FieldDef::new("username", "username").required(),
                FieldDef::new("listname", "listname").required(),
                FieldDef::new("limit", "limit"),
                FieldDef::new("trakt_additional_parameters", "traktAdditionalParameters"),
            ],
        },
        Implementation {
            name: "TraktUserImport",
            config_contract: "TraktUserSettings",
            fields: &[
                FieldDef::new("access_token", "accessToken"),
                FieldDef::new("refresh_token", "refreshToken"),
                FieldDef::new("expires", "expires"),
                FieldDef::new("auth_user", "authUser"),
                FieldDef::new("trakt_list_type", "traktListType"),
                FieldDef::new("username", "username"),
                FieldDef::new("limit", "limit"),
                FieldDef::new("trakt_additional_parameters", "traktAdditionalParameters"),
            ],
        },
        Implementation {
            name: "TraktPopularImport",
            config_contract: "TraktPopularSettings",
            fields: &[
                FieldDef::new("access_token", "accessToken"),
                FieldDef::new("refresh_token", "refreshToken"),
                FieldDef::new("expires", "expires"),
                FieldDef::new("auth_user", "authUser"),
                FieldDef::new("trakt_list_type", "traktListType"),
                FieldDef::new("genres", "genres"),
                FieldDef::new("years", "years"),
                FieldDef::new("rating", "rating"),
                FieldDef::new("certification", "certification"),
                FieldDef::new("limit", "limit"),
                FieldDef::new("trakt_additional_parameters", "traktAdditionalParameters"),
            ],
        },
        Implementation {
            name: "ImdbListImport",
            config_contract: "ImdbSettings",
            fields: &[FieldDef::new("list_id", "listId").required()],
        },
        Implementation {
            name: "CustomImport",
            config_contract: "CustomSettings",
            fields: &[FieldDef::new("base_url", "baseUrl").required()],
        },
        Implementation {
            name: "PlexRssImport",
            config_contract: "PlexRssImportSettings",
            fields: &[FieldDef::new("url", "url").required()],
        },
    ],
};

/// `sonarr_import_list`.
pub fn import_list() -> TableAdapter {
    TableAdapter::new(
        "sonarr_import_list",
        Endpoint::managed("/api/v3/importlist"),
        "Import list resource.",
    )
    .column("name", Attribute::required_string().with_description("Import list name."))
    .column("enable_automatic_add", Attribute::optional_bool().computed())
    .column("search_for_missing_episodes", Attribute::optional_bool().computed())
    .column(
        "should_monitor",
        Attribute::optional_string()
            .computed()
            .with_description("Which episodes to monitor, e.g. all, future or none."),
    )
    .column("season_folder", Attribute::optional_bool().computed())
    .column("series_type", Attribute::optional_string().computed())
    .column("quality_profile_id", Attribute::required_int64())
    .column("root_folder_path", Attribute::required_string())
    .column("list_type", Attribute::computed_string())
    .column("list_order", Attribute::computed_int64())
    .column(
        "tags",
        Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional_computed()),
    )
    .family(&IMPORT_LISTS)
    .keyed_by("name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceAdapter;
    use crate::value::{State, Value};

    #[test]
    fn test_sonarr_import_requires_api_key() {
        let state = State::new()
            .with("name", "upstream")
            .with("implementation", "SonarrImport")
            .with("quality_profile_id", 1)
            .with("root_folder_path", "/tv")
            .with("base_url", "http://other:8989");
        let diags = import_list().validate(&state);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("api_key"));

        // a key that is not known yet passes
        assert!(import_list().validate(&state.with("api_key", Value::Unknown)).is_empty());
    }
}
