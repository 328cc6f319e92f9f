//! Simple records: tags, root folders, remote path mappings and import list exclusions.

use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

/// `sonarr_tag`.
pub fn tag() -> TableAdapter {
    TableAdapter::new("sonarr_tag", Endpoint::managed("/api/v3/tag"), "Tag resource.")
        .column("label", Attribute::required_string().with_description("Tag label."))
        .keyed_by("label")
}

/// `sonarr_root_folder`; imported by path.
pub fn root_folder() -> TableAdapter {
    let unmapped = AttributeType::set(AttributeType::object([
        ("name", AttributeType::String),
        ("path", AttributeType::String),
    ]));
    TableAdapter::new(
        "sonarr_root_folder",
        Endpoint::managed("/api/v3/rootfolder"),
        "Root folder resource.",
    )
    .column(
        "path",
        Attribute::required_string()
            .with_force_new()
            .with_description("Root folder absolute path."),
    )
    .column("accessible", Attribute::computed_bool())
    .column("free_space", Attribute::computed_int64())
    .column(
        "unmapped_folders",
        Attribute::new(unmapped, AttributeFlags::computed()),
    )
    .keyed_by("path")
    .import_by("path")
}

/// `sonarr_remote_path_mapping`.
pub fn remote_path_mapping() -> TableAdapter {
    TableAdapter::new(
        "sonarr_remote_path_mapping",
        Endpoint::managed("/api/v3/remotepathmapping"),
        "Remote path mapping resource.",
    )
    .column("host", Attribute::required_string().with_description("Download client host."))
    .column("remote_path", Attribute::required_string().with_description("Path as the download client sees it."))
    .column("local_path", Attribute::required_string().with_description("Path as Sonarr sees it."))
}

/// `sonarr_import_list_exclusion`.
pub fn import_list_exclusion() -> TableAdapter {
    TableAdapter::new(
        "sonarr_import_list_exclusion",
        Endpoint::managed("/api/v3/importlistexclusion"),
        "Import list exclusion resource.",
    )
    .column("tvdb_id", Attribute::required_int64().with_description("Series TVDB ID."))
    .column("title", Attribute::required_string().with_description("Series title."))
    .keyed_by("tvdb_id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ImportKey, ResourceAdapter};
    use crate::value::State;
    use serde_json::json;

    #[test]
    fn test_tag_payload() {
        let payload = tag().to_api(&State::new().with("id", 3).with("label", "eng")).unwrap();
        assert_eq!(payload, json!({"id": 3, "label": "eng"}));
    }

    #[test]
    fn test_root_folder_decodes_computed_attributes() {
        let state = root_folder()
            .from_api(
                &json!({
                    "id": 1,
                    "path": "/tv",
                    "accessible": true,
                    "freeSpace": 1024,
                    "unmappedFolders": [{"name": "x", "path": "/tv/x"}]
                }),
                &State::new(),
            )
            .unwrap();
        assert_eq!(state.bool("accessible"), Some(true));
        assert_eq!(state.int("free_space"), Some(1024));
        assert_eq!(state.get("unmapped_folders").as_elements().map(<[_]>::len), Some(1));
        assert_eq!(root_folder().import_key(), ImportKey::Natural("path"));
        assert!(root_folder().schema().attribute("path").unwrap().force_new);
    }

    #[test]
    fn test_remote_path_mapping_keys() {
        let payload = remote_path_mapping()
            .to_api(
                &State::new()
                    .with("host", "transmission")
                    .with("remote_path", "/downloads/")
                    .with("local_path", "/data/downloads/"),
            )
            .unwrap();
        assert_eq!(payload["remotePath"], "/downloads/");
        assert_eq!(payload["localPath"], "/data/downloads/");
    }

    #[test]
    fn test_import_list_exclusion_natural_key() {
        assert_eq!(import_list_exclusion().natural_key(), Some("tvdb_id"));
    }
}
