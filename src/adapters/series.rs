//! Series, series search and languages.

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::client::Api;
use crate::data_source::{read_only_schema, DataSourceAdapter};
use crate::error::ProviderError;
use crate::resource::{Endpoint, ResourceAdapter};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::value::State;

use super::{Column, TableAdapter};

/// `sonarr_series`.
///
/// `add_options` is only sent on create; the upstream never returns it.
/// Deleting keeps the files on disk and does not add an import list exclusion.
pub fn series() -> TableAdapter {
    let image = AttributeType::object([
        ("cover_type", AttributeType::String),
        ("remote_url", AttributeType::String),
        ("url", AttributeType::String),
    ]);
    let season = AttributeType::object([
        ("season_number", AttributeType::Int64),
        ("monitored", AttributeType::Bool),
    ]);
    let add_options = AttributeType::object([
        ("monitor", AttributeType::String),
        ("search_for_missing_episodes", AttributeType::Bool),
        ("search_for_cutoff_unmet_episodes", AttributeType::Bool),
    ]);

    TableAdapter::new(
        "sonarr_series",
        Endpoint::managed("/api/v3/series").with_delete_query("deleteFiles=false&addImportListExclusion=false"),
        "Series resource.",
    )
    .column("title", Attribute::required_string().with_description("Series title."))
    .column("title_slug", Attribute::required_string().with_description("Series slug."))
    .column(
        "tvdb_id",
        Attribute::required_int64()
            .with_force_new()
            .with_description("TVDB ID; changing it replaces the series."),
    )
    .column("quality_profile_id", Attribute::required_int64())
    .column(
        "language_profile_id",
        Attribute::optional_int64()
            .computed()
            .with_description("Language profile id; only used by servers that still have language profiles."),
    )
    .column("monitored", Attribute::required_bool())
    .column("season_folder", Attribute::optional_bool().computed())
    .column("use_scene_numbering", Attribute::optional_bool().computed())
    .column("path", Attribute::required_string().with_description("Full path of the series folder."))
    .with_column(Column::new("root_folder_path", Attribute::optional_string().computed()).recomputed())
    .column("series_type", Attribute::optional_string().computed())
    .column(
        "tags",
        Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional_computed()),
    )
    .column("year", Attribute::computed_int64())
    .column("status", Attribute::computed_string())
    .column("network", Attribute::computed_string())
    .column("overview", Attribute::computed_string())
    .column("images", Attribute::new(AttributeType::set(image), AttributeFlags::computed()))
    .column(
        "seasons",
        Attribute::new(AttributeType::list(season), AttributeFlags::optional_computed()),
    )
    .with_column(
        Column::new("add_options", Attribute::new(add_options, AttributeFlags::optional()))
            .create_only(),
    )
    .keyed_by("title")
}

/// `sonarr_language` and `sonarr_languages`; read-only.
pub fn language() -> TableAdapter {
    TableAdapter::new("sonarr_language", Endpoint::managed("/api/v3/language"), "Language.")
        .column("name", Attribute::required_string())
        .column("name_lower", Attribute::computed_string())
        .keyed_by("name")
}

/// `sonarr_search_series`: look a series up on TVDB through the upstream.
pub struct SearchSeries;

#[async_trait]
impl DataSourceAdapter for SearchSeries {
    fn type_name(&self) -> &str {
        "sonarr_search_series"
    }

    fn schema(&self) -> Schema {
        let mut schema = read_only_schema(series().schema(), Some("tvdb_id"))
            .with_description("Search a series by TVDB ID.");
        schema.block.attributes.remove("add_options");
        schema
    }

    async fn read(&self, api: &Api, config: &State) -> Result<State, ProviderError> {
        let tvdb_id = config
            .int("tvdb_id")
            .ok_or_else(|| ProviderError::validation("tvdb_id", "must be set"))?;
        let adapter = series();
        let items = api
            .list(&format!("/api/v3/series/lookup?term=tvdb:{}", tvdb_id))
            .await?;
        let found = items
            .iter()
            .find(|item| item.get("tvdbId").and_then(Json::as_i64) == Some(tvdb_id))
            .ok_or_else(|| ProviderError::NotFound("series".to_string()))?;
        adapter.from_api(found, &State::new())
    }
}
