//! Strict structural validators for registry metadata
//!
//! Each validator walks an untrusted [`JsonNode`] and either returns a fully
//! typed record or the first [`SchemaError`] it encounters. Every schema node
//! has its own decoding function; nesting is plain recursion.

mod package;
mod version;

pub use package::validate_package_meta;
pub use version::validate_version_meta;

use std::collections::HashSet;

use serde_json::Number;

use crate::schema::error::SchemaError;
use crate::schema::json::JsonNode;

/// Path of the payload root in error messages
const ROOT: &str = "$";

type Members = [(String, JsonNode)];

/// Tracks keys of one object so repeated keys are rejected
struct KeySet<'k> {
    path: String,
    seen: HashSet<&'k str>,
}

impl<'k> KeySet<'k> {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            seen: HashSet::new(),
        }
    }

    fn insert(&mut self, key: &'k str) -> Result<(), SchemaError> {
        if !self.seen.insert(key) {
            return Err(SchemaError::DuplicateKey {
                path: self.path.clone(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

/// `manifest`, `manifest.size` (fields of the root are not prefixed)
fn field_path(parent: &str, field: &str) -> String {
    if parent == ROOT {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// `versions["1.0.0"]`
fn entry_path(parent: &str, key: &str) -> String {
    format!("{parent}[\"{key}\"]")
}

/// `dependencies[0]`
fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn wrong_type(path: &str, expected: &'static str, found: &JsonNode) -> SchemaError {
    SchemaError::WrongType {
        path: path.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn missing(path: &str, field: &'static str) -> SchemaError {
    SchemaError::MissingField {
        path: path.to_string(),
        field,
    }
}

fn unknown(path: &str, key: &str) -> SchemaError {
    SchemaError::UnknownField {
        path: path.to_string(),
        key: key.to_string(),
    }
}

fn expect_object<'a>(node: &'a JsonNode, path: &str) -> Result<&'a Members, SchemaError> {
    node.as_object().ok_or_else(|| SchemaError::NotAnObject {
        path: path.to_string(),
        found: node.type_name(),
    })
}

fn expect_non_empty_object<'a>(node: &'a JsonNode, path: &str) -> Result<&'a Members, SchemaError> {
    let members = expect_object(node, path)?;
    if members.is_empty() {
        return Err(SchemaError::Empty {
            path: path.to_string(),
        });
    }
    Ok(members)
}

fn expect_str<'a>(node: &'a JsonNode, path: &str) -> Result<&'a str, SchemaError> {
    node.as_str().ok_or_else(|| wrong_type(path, "a string", node))
}

fn expect_number(node: &JsonNode, path: &str) -> Result<Number, SchemaError> {
    node.as_number()
        .cloned()
        .ok_or_else(|| wrong_type(path, "a number", node))
}
