//! Client and strict validator for JSR registry metadata
//!
//! ```text
//! ┌─────────────────┐  GET   ┌─────────────┐
//! │  PackageClient  │───────▶│   Fetcher   │
//! │ (cache, state)  │◀───────│  (reqwest)  │
//! └─────────────────┘  body  └─────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Validator    │──▶ PackageMeta / VersionMeta
//! └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: client options and defaults
//! - [`registry`]: HTTP transport and the package client
//! - [`schema`]: metadata records, validators and derived views

pub mod config;
pub mod registry;
pub mod schema;

pub use config::ClientOptions;
pub use registry::{ClientError, FetchError, PackageClient};
pub use schema::{PackageMeta, SchemaError, VersionMeta, validate_package_meta, validate_version_meta};
