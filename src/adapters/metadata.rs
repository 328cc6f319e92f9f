//! Metadata consumers.

use crate::fields::{Family, FieldAttr, FieldDef, FieldType, Implementation};
use crate::resource::Endpoint;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

use super::TableAdapter;

const ATTRIBUTES: &[FieldAttr] = &[
    FieldAttr::new("series_metadata", FieldType::Bool),
    FieldAttr::new("series_metadata_episode_guide", FieldType::Bool),
    FieldAttr::new("series_metadata_url", FieldType::Bool),
    FieldAttr::new("episode_metadata", FieldType::Bool),
    FieldAttr::new("series_images", FieldType::Bool),
    FieldAttr::new("season_images", FieldType::Bool),
    FieldAttr::new("episode_images", FieldType::Bool),
];

const IMAGES: [FieldDef; 4] = [
    FieldDef::new("episode_metadata", "episodeMetadata"),
    FieldDef::new("series_images", "seriesImages"),
    FieldDef::new("season_images", "seasonImages"),
    FieldDef::new("episode_images", "episodeImages"),
];

/// Metadata implementations.
pub static METADATA: Family = Family {
    kind: "metadata",
    attributes: ATTRIBUTES,
    implementations: &[
        Implementation {
            name: "XbmcMetadata",
            config_contract: "XbmcMetadataSettings",
            fields: &[
                FieldDef::new("series_metadata", "seriesMetadata"),
                FieldDef::new("series_metadata_episode_guide", "seriesMetadataEpisodeGuide"),
                FieldDef::new("series_metadata_url", "seriesMetadataUrl"),
                IMAGES[0],
                IMAGES[1],
                IMAGES[2],
                IMAGES[3],
            ],
        },
        Implementation {
            name: "RoksboxMetadata",
            config_contract: "RoksboxMetadataSettings",
            fields: &IMAGES,
        },
        Implementation {
            name: "WdtvMetadata",
            config_contract: "WdtvMetadataSettings",
            fields: &IMAGES,
        },
        Implementation {
            name: "MediaBrowserMetadata",
            config_contract: "MediaBrowserMetadataSettings",
            fields: &[FieldDef::new("series_metadata", "seriesMetadata")],
        },
    ],
};

/// `sonarr_metadata`.
pub fn metadata() -> TableAdapter {
    TableAdapter::new(
        "sonarr_metadata",
        Endpoint::managed("/api/v3/metadata"),
        "Metadata consumer resource.",
    )
    .column("name", Attribute::required_string())
    .column("enable", Attribute::optional_bool().computed())
    .column(
        "tags",
        Attribute::new(AttributeType::set(AttributeType::Int64), AttributeFlags::optional_computed()),
    )
    .family(&METADATA)
    .keyed_by("name")
}
