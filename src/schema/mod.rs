//! Registry metadata schema
//!
//! Typed records for JSR package and version metadata, and the strict
//! validators that build them from untrusted JSON.
//!
//! ```text
//! bytes ──▶ JsonNode ──▶ validate_*_meta ──▶ PackageMeta / VersionMeta
//!                              │
//!                              ▼
//!                         SchemaError
//! ```
//!
//! # Modules
//!
//! - [`json`]: `JsonNode`, a JSON tree that keeps repeated object keys
//! - [`types`]: metadata records (`PackageMeta`, `VersionMeta`, ...)
//! - [`validator`]: `validate_package_meta` and `validate_version_meta`
//! - [`views`]: derived accessors (yanked / unyanked versions)
//! - [`error`]: `SchemaError`

pub mod error;
pub mod json;
pub mod types;
pub mod validator;
pub mod views;

pub use error::SchemaError;
pub use json::JsonNode;
pub use types::{
    Dependency, DependencyKind, DependencyType, ManifestEntry, ModuleEntry, ModuleGraph,
    PackageIdentity, PackageMeta, Position, SpecifierRange, VersionEntry, VersionMeta,
};
pub use validator::{validate_package_meta, validate_version_meta};
pub use views::{
    VersionsByYanked, latest_unyanked, unyanked_versions, versions_by_yanked, yanked_versions,
};
