use thiserror::Error;

/// Structural validation failure for registry metadata.
///
/// `path` fields locate the offending node, e.g. `manifest["/mod.ts"].size`.
/// The root object is `$`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{path}: expected an object, found {found}")]
    NotAnObject { path: String, found: &'static str },

    #[error("{path}: expected {expected} fields, found {found}")]
    WrongFieldCount {
        path: String,
        expected: &'static str,
        found: usize,
    },

    #[error("{path}: duplicate key \"{key}\"")]
    DuplicateKey { path: String, key: String },

    #[error("{path}: unknown field \"{key}\"")]
    UnknownField { path: String, key: String },

    #[error("{path}: missing required field \"{field}\"")]
    MissingField { path: String, field: &'static str },

    #[error("{path}: expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path}: must contain at least one entry")]
    Empty { path: String },

    #[error("{field} mismatch: expected \"{expected}\", found \"{found}\"")]
    IdentityMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("versions[\"{version}\"]: {reason}")]
    BadVersionEntry { version: String, reason: String },

    #[error("latest version \"{0}\" is not listed in versions")]
    LatestNotInVersions(String),

    #[error("{path}: \"{value}\" must {rule}")]
    InvalidPath {
        path: String,
        value: String,
        rule: &'static str,
    },

    #[error("{path}: checksum \"{value}\" must start with \"sha256-\"")]
    InvalidChecksum { path: String, value: String },

    #[error("{path}: \"{value}\" is not one of {allowed}")]
    InvalidEnumValue {
        path: String,
        value: String,
        allowed: &'static str,
    },

    #[error("{path}: expected [[line, column], [line, column]]: {reason}")]
    InvalidSpecifierRange { path: String, reason: String },

    #[error("moduleGraph1 and moduleGraph2 cannot both be present")]
    ConflictingModuleGraphVersions,
}
