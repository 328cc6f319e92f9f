//! Configuration singletons and system status.
//!
//! Every attribute of a singleton is optional and computed: whatever the
//! configuration leaves out keeps its current upstream value.

use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

fn settings<const N: usize>(
    type_name: &'static str,
    path: &'static str,
    description: &'static str,
    columns: [(&'static str, AttributeType); N],
) -> TableAdapter {
    columns.into_iter().fold(
        TableAdapter::new(type_name, Endpoint::singleton(path), description),
        |adapter, (attr, ty)| adapter.column(attr, Attribute::new(ty, AttributeFlags::optional_computed())),
    )
}

/// `sonarr_host`.
pub fn host() -> TableAdapter {
    settings(
        "sonarr_host",
        "/api/v3/config/host",
        "Host configuration.",
        [
            ("bind_address", AttributeType::String),
            ("port", AttributeType::Int64),
            ("ssl_port", AttributeType::Int64),
            ("enable_ssl", AttributeType::Bool),
            ("ssl_cert_path", AttributeType::String),
            ("url_base", AttributeType::String),
            ("instance_name", AttributeType::String),
            ("application_url", AttributeType::String),
            ("launch_browser", AttributeType::Bool),
            ("authentication_method", AttributeType::String),
            ("authentication_required", AttributeType::String),
            ("username", AttributeType::String),
            ("log_level", AttributeType::String),
            ("branch", AttributeType::String),
            ("update_automatically", AttributeType::Bool),
            ("update_mechanism", AttributeType::String),
            ("update_script_path", AttributeType::String),
            ("proxy_enabled", AttributeType::Bool),
            ("proxy_type", AttributeType::String),
            ("proxy_hostname", AttributeType::String),
            ("proxy_port", AttributeType::Int64),
            ("proxy_username", AttributeType::String),
            ("proxy_bypass_filter", AttributeType::String),
            ("proxy_bypass_local_addresses", AttributeType::Bool),
            ("certificate_validation", AttributeType::String),
            ("backup_folder", AttributeType::String),
            ("backup_interval", AttributeType::Int64),
            ("backup_retention", AttributeType::Int64),
            ("analytics_enabled", AttributeType::Bool),
        ],
    )
    .column("password", Attribute::optional_string().computed().sensitive())
    .column("proxy_password", Attribute::optional_string().computed().sensitive())
    .column("ssl_cert_password", Attribute::optional_string().computed().sensitive())
}

/// `sonarr_naming`.
pub fn naming() -> TableAdapter {
    settings(
        "sonarr_naming",
        "/api/v3/config/naming",
        "Naming configuration.",
        [
            ("rename_episodes", AttributeType::Bool),
            ("replace_illegal_characters", AttributeType::Bool),
            ("colon_replacement_format", AttributeType::Int64),
            ("multi_episode_style", AttributeType::Int64),
            ("standard_episode_format", AttributeType::String),
            ("daily_episode_format", AttributeType::String),
            ("anime_episode_format", AttributeType::String),
            ("series_folder_format", AttributeType::String),
            ("season_folder_format", AttributeType::String),
            ("specials_folder_format", AttributeType::String),
        ],
    )
}

/// `sonarr_media_management`.
pub fn media_management() -> TableAdapter {
    settings(
        "sonarr_media_management",
        "/api/v3/config/mediamanagement",
        "Media management configuration.",
        [
            ("auto_unmonitor_previously_downloaded_episodes", AttributeType::Bool),
            ("recycle_bin", AttributeType::String),
            ("recycle_bin_cleanup_days", AttributeType::Int64),
            ("download_propers_and_repacks", AttributeType::String),
            ("create_empty_series_folders", AttributeType::Bool),
            ("delete_empty_folders", AttributeType::Bool),
            ("file_date", AttributeType::String),
            ("rescan_after_refresh", AttributeType::String),
            ("set_permissions_linux", AttributeType::Bool),
            ("chmod_folder", AttributeType::String),
            ("chown_group", AttributeType::String),
            ("episode_title_required", AttributeType::String),
            ("skip_free_space_check_when_importing", AttributeType::Bool),
            ("minimum_free_space_when_importing", AttributeType::Int64),
            ("copy_using_hardlinks", AttributeType::Bool),
            ("import_extra_files", AttributeType::Bool),
            ("extra_file_extensions", AttributeType::String),
            ("enable_media_info", AttributeType::Bool),
        ],
    )
}

/// `sonarr_indexer_config`.
pub fn indexer_config() -> TableAdapter {
    settings(
        "sonarr_indexer_config",
        "/api/v3/config/indexer",
        "Indexer configuration.",
        [
            ("minimum_age", AttributeType::Int64),
            ("retention", AttributeType::Int64),
            ("maximum_size", AttributeType::Int64),
            ("rss_sync_interval", AttributeType::Int64),
        ],
    )
}

/// `sonarr_download_client_config`.
pub fn download_client_config() -> TableAdapter {
    settings(
        "sonarr_download_client_config",
        "/api/v3/config/downloadclient",
        "Download client configuration.",
        [
            ("download_client_working_folders", AttributeType::String),
            ("enable_completed_download_handling", AttributeType::Bool),
            ("auto_redownload_failed", AttributeType::Bool),
        ],
    )
}

/// `sonarr_system_status`; read-only.
pub fn system_status() -> TableAdapter {
    settings(
        "sonarr_system_status",
        "/api/v3/system/status",
        "System status.",
        [
            ("app_name", AttributeType::String),
            ("instance_name", AttributeType::String),
            ("version", AttributeType::String),
            ("build_time", AttributeType::String),
            ("start_time", AttributeType::String),
            ("is_debug", AttributeType::Bool),
            ("is_production", AttributeType::Bool),
            ("is_admin", AttributeType::Bool),
            ("is_user_interactive", AttributeType::Bool),
            ("startup_path", AttributeType::String),
            ("app_data", AttributeType::String),
            ("os_name", AttributeType::String),
            ("os_version", AttributeType::String),
            ("is_net_core", AttributeType::Bool),
            ("is_linux", AttributeType::Bool),
            ("is_osx", AttributeType::Bool),
            ("is_windows", AttributeType::Bool),
            ("is_docker", AttributeType::Bool),
            ("mode", AttributeType::String),
            ("branch", AttributeType::String),
            ("authentication", AttributeType::String),
            ("sqlite_version", AttributeType::String),
            ("url_base", AttributeType::String),
            ("runtime_version", AttributeType::String),
            ("runtime_name", AttributeType::String),
            ("package_version", AttributeType::String),
            ("package_author", AttributeType::String),
            ("package_update_mechanism", AttributeType::String),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{read_data_source, SingletonDataSource};
    use crate::resource::{self, Lifecycle, ResourceAdapter};
    use crate::testing::FakeSonarr;
    use crate::value::State;
    use std::sync::Arc;

    #[test]
    fn test_singletons_route_without_create() {
        for adapter in [host(), naming(), media_management(), indexer_config(), download_client_config()] {
            assert_eq!(adapter.endpoint().lifecycle, Lifecycle::Singleton);
            assert!(adapter.schema().attributes().all(|(_, attr)| attr.flags.computed));
        }
    }

    #[tokio::test]
    async fn test_singleton_update_merges_current_object() {
        let fake = FakeSonarr::new();
        let api = fake.api();
        let adapter = indexer_config();

        let planned = State::new().with("retention", 3000);
        let state = resource::create(&api, &adapter, &planned).await.unwrap();
        assert_eq!(state.id(), Some(1));
        assert_eq!(state.int("retention"), Some(3000));
        // untouched values come back from the current object
        assert!(state.int("rss_sync_interval").is_some());

        resource::delete(&api, &adapter, &state).await.unwrap();
        let still = resource::read(&api, &adapter, &state).await.unwrap().unwrap();
        assert_eq!(still.int("retention"), Some(3000));
    }

    #[tokio::test]
    async fn test_system_status_data_source() {
        let fake = FakeSonarr::new();
        let status = SingletonDataSource::new(Arc::new(system_status()));
        let state = read_data_source(&fake.api(), &status, &State::new()).await.unwrap();
        assert_eq!(state.str("app_name"), Some("Sonarr"));
    }
}
