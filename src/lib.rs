//! Sonarr Provider
//!
//! An infrastructure-as-code provider that manages a Sonarr server through
//! its v3 HTTP API. The engine declares desired entities (tags, profiles,
//! indexers, download clients, series and more); the provider plans the
//! difference against the server and converges it.
//!
//! # Overview
//!
//! - **ProviderService trait**: The operations the engine calls, speaking JSON state documents
//! - **SonarrProvider**: The implementation, routing every type through a [`adapters::Registry`]
//! - **Resource kernel**: Plan, create, read, update, delete and import shared by all types
//! - **Field codec**: Maps the polymorphic `fields` arrays of indexers, clients and friends
//! - **Schema types**: Types for describing provider, resource, and data source schemas
//! - **Error types**: [`ProviderError`] and its conversion to operator diagnostics
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use sonarr_provider::{ProviderService, SonarrProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     sonarr_provider::init_logging();
//!
//!     let provider = SonarrProvider::new();
//!     provider
//!         .configure(json!({"url": "http://localhost:8989", "api_key": "0123456789abcdef"}))
//!         .await?;
//!
//!     let plan = provider
//!         .plan("sonarr_tag", None, json!({"label": "anime"}), json!({"label": "anime"}))
//!         .await?;
//!     let state = provider.create("sonarr_tag", plan.planned_state).await?;
//!     println!("created tag {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Provider Configuration
//!
//! | Attribute         | Fallback          | Notes                               |
//! |-------------------|-------------------|-------------------------------------|
//! | `url`             | `SONARR_URL`      | http or https base URL              |
//! | `api_key`         | `SONARR_API_KEY`  | sent as `X-Api-Key`; sensitive      |
//! | `extra_headers`   |                   | merged into every request           |
//! | `request_timeout` |                   | seconds, defaults to 60             |
//!
//! # Provider Protocol
//!
//! [`ProviderService`] mirrors the engine's plugin protocol:
//!
//! - **GetMetadata / GetSchema**: Every `sonarr_*` resource and data source
//! - **ValidateProviderConfig / Configure**: Connection settings
//! - **Stop**: Aborts in-flight requests
//! - **ValidateResourceConfig / Plan**: Schema and adapter checks, planned state
//! - **Create/Read/Update/Delete**: CRUD against the Sonarr API
//! - **ImportResourceState**: By id or by natural key
//! - **ValidateDataSourceConfig / ReadDataSource**: Lookups, lists and singletons

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod client;
pub mod data_source;
pub mod error;
pub mod fields;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

// Re-export main types at crate root
pub use client::{Api, ClientConfig, HttpUpstream, Upstream};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{ProviderConfig, SonarrProvider};
pub use schema::ProviderSchema;
pub use service::{error_diagnostics, ProviderService};
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ReadResult, ServerCapabilities};
pub use validation::{is_valid, validate, validate_result};
pub use value::{State, Value, UNKNOWN_VALUE};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
