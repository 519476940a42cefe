//! Validator for version metadata (`{version}_meta.json`)

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{
    KeySet, ROOT, entry_path, expect_non_empty_object, expect_object, expect_number, expect_str,
    field_path, index_path, missing, unknown, wrong_type,
};
use crate::schema::error::SchemaError;
use crate::schema::json::JsonNode;
use crate::schema::types::{
    CHECKSUM_PREFIX, Dependency, DependencyKind, DependencyType, ManifestEntry, ModuleEntry,
    ModuleGraph, Position, SpecifierRange, VersionMeta,
};

const MANIFEST: &str = "manifest";
const EXPORTS: &str = "exports";
const MODULE_GRAPH_1: &str = "moduleGraph1";
const MODULE_GRAPH_2: &str = "moduleGraph2";

/// Validates a `{version}_meta.json` payload.
///
/// `manifest` and `exports` are required. At most one of `moduleGraph1` and
/// `moduleGraph2` may be present; a payload carrying both is rejected no
/// matter which comes first.
pub fn validate_version_meta(raw: &JsonNode) -> Result<VersionMeta, SchemaError> {
    let members = expect_object(raw, ROOT)?;

    let mut keys = KeySet::new(ROOT);
    let mut graphs = 0;
    for (key, _) in members {
        keys.insert(key)?;
        match key.as_str() {
            MANIFEST | EXPORTS => {}
            MODULE_GRAPH_1 | MODULE_GRAPH_2 => {
                graphs += 1;
                if graphs > 1 {
                    return Err(SchemaError::ConflictingModuleGraphVersions);
                }
            }
            _ => return Err(unknown(ROOT, key)),
        }
    }

    if !(2..=3).contains(&members.len()) {
        return Err(SchemaError::WrongFieldCount {
            path: ROOT.to_string(),
            expected: "2 or 3 (manifest, exports and at most one module graph)",
            found: members.len(),
        });
    }

    let mut manifest = None;
    let mut exports = None;
    let mut module_graph = ModuleGraph::Absent;

    for (key, value) in members {
        match key.as_str() {
            MANIFEST => manifest = Some(validate_manifest(value)?),
            EXPORTS => exports = Some(validate_exports(value)?),
            MODULE_GRAPH_1 => module_graph = ModuleGraph::Legacy(validate_module_graph1(value)?),
            MODULE_GRAPH_2 => module_graph = ModuleGraph::V2(validate_module_graph2(value)?),
            _ => return Err(unknown(ROOT, key)),
        }
    }

    Ok(VersionMeta {
        manifest: manifest.ok_or_else(|| missing(ROOT, MANIFEST))?,
        exports: exports.ok_or_else(|| missing(ROOT, EXPORTS))?,
        module_graph,
    })
}

fn validate_manifest(value: &JsonNode) -> Result<IndexMap<String, ManifestEntry>, SchemaError> {
    let members = expect_non_empty_object(value, MANIFEST)?;

    let mut keys = KeySet::new(MANIFEST);
    let mut manifest = IndexMap::with_capacity(members.len());
    for (file, entry) in members {
        keys.insert(file)?;
        if !file.starts_with('/') {
            return Err(SchemaError::InvalidPath {
                path: MANIFEST.to_string(),
                value: file.clone(),
                rule: "start with \"/\"",
            });
        }
        let entry = validate_manifest_entry(entry, &entry_path(MANIFEST, file))?;
        manifest.insert(file.clone(), entry);
    }

    Ok(manifest)
}

fn validate_manifest_entry(value: &JsonNode, path: &str) -> Result<ManifestEntry, SchemaError> {
    let members = expect_object(value, path)?;

    let mut keys = KeySet::new(path);
    let mut size = None;
    let mut checksum = None;
    for (key, value) in members {
        keys.insert(key)?;
        match key.as_str() {
            "size" => size = Some(expect_number(value, &field_path(path, "size"))?),
            "checksum" => {
                let checksum_path = field_path(path, "checksum");
                let found = expect_str(value, &checksum_path)?;
                if !found.starts_with(CHECKSUM_PREFIX) {
                    return Err(SchemaError::InvalidChecksum {
                        path: checksum_path,
                        value: found.to_string(),
                    });
                }
                checksum = Some(found.to_string());
            }
            _ => return Err(unknown(path, key)),
        }
    }

    Ok(ManifestEntry {
        size: size.ok_or_else(|| missing(path, "size"))?,
        checksum: checksum.ok_or_else(|| missing(path, "checksum"))?,
    })
}

fn is_export_path(path: &str) -> bool {
    path == "." || path.starts_with("./")
}

fn validate_exports(value: &JsonNode) -> Result<IndexMap<String, String>, SchemaError> {
    const RULE: &str = "be \".\" or start with \"./\"";

    let members = expect_non_empty_object(value, EXPORTS)?;

    let mut keys = KeySet::new(EXPORTS);
    let mut exports = IndexMap::with_capacity(members.len());
    for (name, target) in members {
        keys.insert(name)?;
        if !is_export_path(name) {
            return Err(SchemaError::InvalidPath {
                path: EXPORTS.to_string(),
                value: name.clone(),
                rule: RULE,
            });
        }

        let target_path = entry_path(EXPORTS, name);
        let target = expect_str(target, &target_path)?;
        if !is_export_path(target) {
            return Err(SchemaError::InvalidPath {
                path: target_path,
                value: target.to_string(),
                rule: RULE,
            });
        }
        exports.insert(name.clone(), target.to_string());
    }

    if !exports.contains_key(".") {
        return Err(missing(EXPORTS, "."));
    }

    Ok(exports)
}

fn validate_module_graph1(value: &JsonNode) -> Result<Map<String, Value>, SchemaError> {
    let members = expect_object(value, MODULE_GRAPH_1)?;
    Ok(members
        .iter()
        .map(|(key, value)| (key.clone(), value.clone().into_value()))
        .collect())
}

fn validate_module_graph2(value: &JsonNode) -> Result<IndexMap<String, ModuleEntry>, SchemaError> {
    let members = expect_non_empty_object(value, MODULE_GRAPH_2)?;

    let mut keys = KeySet::new(MODULE_GRAPH_2);
    let mut graph = IndexMap::with_capacity(members.len());
    for (module, entry) in members {
        keys.insert(module)?;
        if !module.starts_with('/') {
            return Err(SchemaError::InvalidPath {
                path: MODULE_GRAPH_2.to_string(),
                value: module.clone(),
                rule: "start with \"/\"",
            });
        }
        let entry = validate_module_entry(entry, &entry_path(MODULE_GRAPH_2, module))?;
        graph.insert(module.clone(), entry);
    }

    Ok(graph)
}

fn validate_module_entry(value: &JsonNode, path: &str) -> Result<ModuleEntry, SchemaError> {
    let members = expect_object(value, path)?;

    let mut keys = KeySet::new(path);
    let mut dependencies = Vec::new();
    for (key, value) in members {
        keys.insert(key)?;
        match key.as_str() {
            "dependencies" => {
                dependencies = validate_dependencies(value, &field_path(path, "dependencies"))?
            }
            _ => return Err(unknown(path, key)),
        }
    }

    Ok(ModuleEntry { dependencies })
}

fn validate_dependencies(value: &JsonNode, path: &str) -> Result<Vec<Dependency>, SchemaError> {
    let items = value
        .as_array()
        .ok_or_else(|| wrong_type(path, "an array", value))?;
    if items.is_empty() {
        return Err(SchemaError::Empty {
            path: path.to_string(),
        });
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_dependency(item, &index_path(path, index)))
        .collect()
}

fn validate_dependency(value: &JsonNode, path: &str) -> Result<Dependency, SchemaError> {
    let members = expect_object(value, path)?;

    let mut keys = KeySet::new(path);
    let mut dependency_type = None;
    let mut kind = None;
    let mut specifier = None;
    let mut specifier_range = None;

    for (key, value) in members {
        keys.insert(key)?;
        let value_path = field_path(path, key);
        match key.as_str() {
            "type" => {
                let found = expect_str(value, &value_path)?;
                dependency_type = Some(DependencyType::parse(found).ok_or_else(|| {
                    SchemaError::InvalidEnumValue {
                        path: value_path.clone(),
                        value: found.to_string(),
                        allowed: DependencyType::ALLOWED,
                    }
                })?);
            }
            "kind" => {
                let found = expect_str(value, &value_path)?;
                kind = Some(DependencyKind::parse(found).ok_or_else(|| {
                    SchemaError::InvalidEnumValue {
                        path: value_path.clone(),
                        value: found.to_string(),
                        allowed: DependencyKind::ALLOWED,
                    }
                })?);
            }
            "specifier" => specifier = Some(expect_str(value, &value_path)?.to_string()),
            "specifierRange" => specifier_range = Some(validate_specifier_range(value, &value_path)?),
            _ => return Err(unknown(path, key)),
        }
    }

    Ok(Dependency {
        dependency_type: dependency_type.ok_or_else(|| missing(path, "type"))?,
        kind: kind.ok_or_else(|| missing(path, "kind"))?,
        specifier: specifier.ok_or_else(|| missing(path, "specifier"))?,
        specifier_range: specifier_range.ok_or_else(|| missing(path, "specifierRange"))?,
    })
}

fn validate_specifier_range(value: &JsonNode, path: &str) -> Result<SpecifierRange, SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidSpecifierRange {
        path: path.to_string(),
        reason,
    };

    match value.as_array() {
        Some([start, end]) => Ok(SpecifierRange {
            start: validate_position(start, "start").map_err(invalid)?,
            end: validate_position(end, "end").map_err(invalid)?,
        }),
        Some(items) => Err(invalid(format!("found {} positions", items.len()))),
        None => Err(invalid(format!("found {}", value.type_name()))),
    }
}

fn validate_position(value: &JsonNode, which: &str) -> Result<Position, String> {
    let Some([line, column]) = value.as_array() else {
        return Err(format!("{which} must be an array of 2 numbers"));
    };

    let coordinate = |node: &JsonNode, name: &str| {
        node.as_number().cloned().ok_or_else(|| {
            format!("{which} {name} must be a number, found {}", node.type_name())
        })
    };

    Ok(Position {
        line: coordinate(line, "line")?,
        column: coordinate(column, "column")?,
    })
}
