//! Download clients.
//!
//! `field_tags` carries Flood's own `tags` field; the top-level `tags`
//! attribute is the Sonarr tag set every download client has.

use crate::fields::{Family, FieldAttr, FieldDef, FieldType, Implementation};
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

const ATTRIBUTES: &[FieldAttr] = &[
    FieldAttr::new("host", FieldType::String),
    FieldAttr::new("port", FieldType::Int),
    FieldAttr::new("use_ssl", FieldType::Bool),
    FieldAttr::new("url_base", FieldType::String),
    FieldAttr::new("rpc_path", FieldType::String),
    FieldAttr::new("username", FieldType::String),
    FieldAttr::new("password", FieldType::String).sensitive(),
    FieldAttr::new("api_key", FieldType::String).sensitive(),
    FieldAttr::new("secret_token", FieldType::String).sensitive(),
    FieldAttr::new("tv_category", FieldType::String),
    FieldAttr::new("tv_imported_category", FieldType::String),
    FieldAttr::new("tv_directory", FieldType::String),
    FieldAttr::new("recent_tv_priority", FieldType::Int),
    FieldAttr::new("older_tv_priority", FieldType::Int),
    FieldAttr::new("initial_state", FieldType::Int),
    FieldAttr::new("add_paused", FieldType::Bool),
    FieldAttr::new("sequential_order", FieldType::Bool),
    FieldAttr::new("first_and_last", FieldType::Bool),
    FieldAttr::new("destination", FieldType::String),
    FieldAttr::new("field_tags", FieldType::StringSet),
    FieldAttr::new("additional_tags", FieldType::IntSet),
    FieldAttr::new("start_on_add", FieldType::Bool),
    FieldAttr::new("torrent_folder", FieldType::String),
    FieldAttr::new("nzb_folder", FieldType::String),
    FieldAttr::new("watch_folder", FieldType::String),
    FieldAttr::new("save_magnet_files", FieldType::Bool),
    FieldAttr::new("magnet_file_extension", FieldType::String),
    FieldAttr::new("read_only", FieldType::Bool),
];

/// Download client implementations.
pub static DOWNLOAD_CLIENTS: Family = Family {
    kind: "download client",
    attributes: ATTRIBUTES,
    implementations: &[
        Implementation {
            name: "Transmission",
            config_contract: "TransmissionSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("tv_category", "tvCategory"),
                FieldDef::new("tv_directory", "tvDirectory"),
                FieldDef::new("recent_tv_priority", "recentTvPriority"),
                FieldDef::new("older_tv_priority", "olderTvPriority"),
                FieldDef::new("add_paused", "addPaused"),
            ],
        },
        Implementation {
            name: "QBittorrent",
            config_contract: "QBittorrentSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("tv_category", "tvCategory"),
                FieldDef::new("tv_imported_category", "tvImportedCategory"),
                FieldDef::new("recent_tv_priority", "recentTvPriority"),
                FieldDef::new("older_tv_priority", "olderTvPriority"),
                FieldDef::new("initial_state", "initialState"),
                FieldDef::new("sequential_order", "sequentialOrder"),
                FieldDef::new("first_and_last", "firstAndLast"),
            ],
        },
        Implementation {
            name: "Deluge",
            config_contract: "DelugeSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("password", "password"),
                FieldDef::new("tv_category", "tvCategory"),
                FieldDef::new("tv_imported_category", "tvImportedCategory"),
                FieldDef::new("recent_tv_priority", "recentTvPriority"),
                FieldDef::new("older_tv_priority", "olderTvPriority"),
                FieldDef::new("add_paused", "addPaused"),
            ],
        },
        Implementation {
            name: "Sabnzbd",
            config_contract: "SabnzbdSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("api_key", "apiKey"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("tv_category", "tvCategory"),
                FieldDef::new("recent_tv_priority", "recentTvPriority"),
                FieldDef::new("older_tv_priority", "olderTvPriority"),
            ],
        },
        Implementation {
            name: "Nzbget",
            config_contract: "NzbgetSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("tv_category", "tvCategory"),
                FieldDef::new("recent_tv_priority", "recentTvPriority"),
                FieldDef::new("older_tv_priority", "olderTvPriority"),
                FieldDef::new("add_paused", "addPaused"),
            ],
        },
        Implementation {
            name: "RTorrent",
            config_contract: "RTorrentSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("tv_category", "tvCategory"),
                FieldDef::new("tv_imported_category", "tvImportedCategory"),
                FieldDef::new("tv_directory", "tvDirectory"),
                FieldDef::new("recent_tv_priority", "recentTvPriority"),
                FieldDef::new("older_tv_priority", "olderTvPriority"),
                FieldDef::new("add_paused", "addStopped"),
            ],
        },
        Implementation {
            name: "Aria2",
            config_contract: "Aria2Settings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("rpc_path", "rpcPath"),
                FieldDef::new("secret_token", "secretToken"),
            ],
        },
        Implementation {
            name: "Flood",
            config_contract: "FloodSettings",
            fields: &[
                FieldDef::new("host", "host").required(),
                FieldDef::new("port", "port"),
                FieldDef::new("use_ssl", "useSsl"),
                FieldDef::new("url_base", "urlBase"),
                FieldDef::new("username", "username"),
                FieldDef::new("password", "password"),
                FieldDef::new("destination", "destination"),
                FieldDef::new("field_tags", "tags"),
                FieldDef::new("additional_tags", "additionalTags"),
                FieldDef::new("start_on_add", "startOnAdd"),
            ],
        },
        Implementation {
            name: "TorrentBlackhole",
            config_contract: "TorrentBlackholeSettings",
            fields: &[
                FieldDef::new("torrent_folder", "torrentFolder").required(),
                FieldDef::new("watch_folder", "watchFolder").required(),
                FieldDef::new("save_magnet_files", "saveMagnetFiles"),
                FieldDef::new("magnet_file_extension", "magnetFileExtension"),
                FieldDef::new("read_only", "readOnly"),
            ],
        },
        Implementation {
            name: "UsenetBlackhole",
            config_contract: "UsenetBlackholeSettings",
            fields: &[
                FieldDef::new("nzb_folder", "nzbFolder").required(),
                FieldDef::new("watch_folder", "watchFolder").required(),
            ],
        },
    ],
};

/// `sonarr_download_client`.
pub fn download_client() -> TableAdapter {
    TableAdapter::new(
        "sonarr_download_client",
        Endpoint::managed("/api/v3/downloadclient"),
        "Download client resource.",
    )
    .column("name", Attribute::required_string().with_description("Download client name."))
    .column("enable", Attribute::optional_bool().computed())
    .column("priority", Attribute::optional_int64().computed())
    .column("protocol", Attribute::optional_string().computed())
    .column("remove_completed_downloads", Attribute::optional_bool().computed())
    .column("remove_failed_downloads", Attribute::optional_bool().computed())
    .column(
        "tags",
        Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional_computed()),
    )
    .family(&DOWNLOAD_CLIENTS)
    .keyed_by("name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceAdapter;
    use crate::value::{State, Value};
    use serde_json::json;

    #[test]
    fn test_flood_tags_do_not_collide() {
        let state = State::new()
            .with("name", "flood")
            .with("implementation", "Flood")
            .with("host", "flood")
            .with("tags", Value::Set(vec![Value::Int(3)]))
            .with("field_tags", Value::Set(vec![Value::from("sonarr")]));
        let payload = download_client().to_api(&state).unwrap();
        assert_eq!(payload["tags"], json!([3]));
        assert!(payload["fields"]
            .as_array()
            .unwrap()
            .contains(&json!({"name": "tags", "value": ["sonarr"]})));
        assert_eq!(payload["configContract"], "FloodSettings");

        let back = download_client().from_api(&payload, &State::new()).unwrap();
        assert_eq!(back.get("field_tags"), &Value::Set(vec![Value::from("sonarr")]));
        assert_eq!(back.get("tags"), &Value::Set(vec![Value::Int(3)]));
    }

    #[test]
    fn test_rtorrent_add_paused_travels_as_add_stopped() {
        let state = State::new()
            .with("name", "rt")
            .with("implementation", "RTorrent")
            .with("host", "rtorrent")
            .with("add_paused", true);
        let payload = download_client().to_api(&state).unwrap();
        assert!(payload["fields"]
            .as_array()
            .unwrap()
            .contains(&json!({"name": "addStopped", "value": true})));
    }

    #[test]
    fn test_blackhole_requires_folders() {
        let state = State::new()
            .with("name", "hole")
            .with("implementation", "UsenetBlackhole")
            .with("nzb_folder", "/nzb");
        let diags = download_client().validate(&state);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("watch_folder"));
    }
}
