//! Validator for package-level metadata (`meta.json`)

use indexmap::IndexMap;

use super::{
    KeySet, ROOT, entry_path, expect_non_empty_object, expect_object, expect_str, missing,
    unknown,
};
use crate::schema::error::SchemaError;
use crate::schema::json::JsonNode;
use crate::schema::types::{PackageIdentity, PackageMeta, VersionEntry};

const FIELDS: [&str; 4] = ["scope", "name", "latest", "versions"];

/// Validates a `meta.json` payload for the package `identity`.
///
/// The payload must contain exactly `scope`, `name`, `latest` and `versions`.
/// `latest` may be `null`, but when it names a version that version must be
/// listed. Empty version entries normalize to `{ "yanked": false }`.
pub fn validate_package_meta(
    raw: &JsonNode,
    identity: &PackageIdentity,
) -> Result<PackageMeta, SchemaError> {
    let members = expect_object(raw, ROOT)?;

    let mut keys = KeySet::new(ROOT);
    for (key, _) in members {
        keys.insert(key)?;
        if !FIELDS.contains(&key.as_str()) {
            return Err(unknown(ROOT, key));
        }
    }

    if members.len() != FIELDS.len() {
        return Err(SchemaError::WrongFieldCount {
            path: ROOT.to_string(),
            expected: "exactly 4 (scope, name, latest, versions)",
            found: members.len(),
        });
    }

    let mut scope = None;
    let mut name = None;
    let mut latest = None;
    let mut versions = None;

    for (key, value) in members {
        match key.as_str() {
            "scope" => scope = Some(validate_identity_field("scope", value, &identity.scope)?),
            "name" => name = Some(validate_identity_field("name", value, &identity.name)?),
            "latest" => latest = Some(validate_latest(value)?),
            "versions" => versions = Some(validate_versions(value)?),
            _ => return Err(unknown(ROOT, key)),
        }
    }

    let scope = scope.ok_or_else(|| missing(ROOT, "scope"))?;
    let name = name.ok_or_else(|| missing(ROOT, "name"))?;
    let latest = latest.ok_or_else(|| missing(ROOT, "latest"))?;
    let versions = versions.ok_or_else(|| missing(ROOT, "versions"))?;

    if let Some(latest) = &latest {
        if !versions.contains_key(latest) {
            return Err(SchemaError::LatestNotInVersions(latest.clone()));
        }
    }

    Ok(PackageMeta {
        scope,
        name,
        latest,
        versions,
    })
}

fn validate_identity_field(
    field: &'static str,
    value: &JsonNode,
    expected: &str,
) -> Result<String, SchemaError> {
    let found = expect_str(value, field)?;
    if found != expected {
        return Err(SchemaError::IdentityMismatch {
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(found.to_string())
}

fn validate_latest(value: &JsonNode) -> Result<Option<String>, SchemaError> {
    match value {
        JsonNode::Null => Ok(None),
        JsonNode::String(latest) => Ok(Some(latest.clone())),
        other => Err(SchemaError::WrongType {
            path: "latest".to_string(),
            expected: "a string or null",
            found: other.type_name(),
        }),
    }
}

fn validate_versions(value: &JsonNode) -> Result<IndexMap<String, VersionEntry>, SchemaError> {
    let path = "versions";
    let members = expect_non_empty_object(value, path)?;

    let mut keys = KeySet::new(path);
    let mut versions = IndexMap::with_capacity(members.len());
    for (version, entry) in members {
        keys.insert(version)?;
        let entry = validate_version_entry(version, entry)?;
        versions.insert(version.clone(), entry);
    }

    Ok(versions)
}

fn validate_version_entry(version: &str, value: &JsonNode) -> Result<VersionEntry, SchemaError> {
    let members = expect_object(value, &entry_path("versions", version))?;

    let bad = |reason: String| SchemaError::BadVersionEntry {
        version: version.to_string(),
        reason,
    };

    match members {
        [] => Ok(VersionEntry::default()),
        [(key, flag)] if key == "yanked" => match flag.as_bool() {
            Some(yanked) => Ok(VersionEntry { yanked }),
            None => Err(bad(format!(
                "\"yanked\" must be a boolean, found {}",
                flag.type_name()
            ))),
        },
        [(key, _)] => Err(bad(format!("unexpected field \"{key}\""))),
        _ => Err(bad(format!(
            "expected only \"yanked\", found {} fields",
            members.len()
        ))),
    }
}
