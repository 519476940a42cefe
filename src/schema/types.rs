//! Typed registry metadata records
//!
//! Every record serializes back into the wire format the validators accept,
//! so a validated value can be re-encoded and validated again unchanged.
//! The `Deserialize` impls are lenient (unknown fields ignored) and back the
//! client's unvalidated decoding mode.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Prefix every manifest checksum carries
pub const CHECKSUM_PREFIX: &str = "sha256-";

/// Package identity on the registry (`@scope/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub scope: String,
    pub name: String,
}

impl PackageIdentity {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}/{}", self.scope, self.name)
    }
}

/// Package-level metadata from `meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMeta {
    pub scope: String,
    pub name: String,
    /// Latest version pointer; always a key of `versions` when validated
    #[serde(default)]
    pub latest: Option<String>,
    pub versions: IndexMap<String, VersionEntry>,
}

/// Per-version state inside [`PackageMeta::versions`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(default)]
    pub yanked: bool,
}

impl VersionEntry {
    pub fn to_yanked(self) -> Self {
        Self { yanked: true }
    }

    pub fn to_unyanked(self) -> Self {
        Self { yanked: false }
    }
}

/// Version-specific metadata from `{version}_meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VersionMetaRepr", into = "VersionMetaRepr")]
pub struct VersionMeta {
    /// Published files keyed by absolute path (`/mod.ts`)
    pub manifest: IndexMap<String, ManifestEntry>,
    /// Export map; always contains `.`
    pub exports: IndexMap<String, String>,
    pub module_graph: ModuleGraph,
}

impl VersionMeta {
    /// Target of the default (`.`) export
    pub fn default_export(&self) -> Option<&str> {
        self.exports.get(".").map(String::as_str)
    }
}

/// Module dependency graph in one of the two formats the registry has served
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModuleGraph {
    /// `moduleGraph1`: early packages only, contents are not interpreted
    Legacy(Map<String, Value>),
    /// `moduleGraph2`
    V2(IndexMap<String, ModuleEntry>),
    #[default]
    Absent,
}

impl ModuleGraph {
    /// Dependencies of a module in a v2 graph
    pub fn dependencies(&self, path: &str) -> Option<&[Dependency]> {
        match self {
            ModuleGraph::V2(modules) => modules.get(path).map(|m| m.dependencies.as_slice()),
            _ => None,
        }
    }
}

/// Size and checksum of a published file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Size in bytes, kept as the registry sent it
    pub size: Number,
    pub checksum: String,
}

impl ManifestEntry {
    /// Checksum with the `sha256-` prefix removed
    pub fn digest(&self) -> &str {
        self.checksum
            .strip_prefix(CHECKSUM_PREFIX)
            .unwrap_or(&self.checksum)
    }
}

/// A module in a v2 graph; no dependencies is the empty record `{}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
    pub kind: DependencyKind,
    pub specifier: String,
    pub specifier_range: SpecifierRange,
}

impl Dependency {
    /// Specifier points at a file (relative, absolute or `file:` URL)
    pub fn is_file(&self) -> bool {
        ["./", "../", "/", "file:"]
            .iter()
            .any(|prefix| self.specifier.starts_with(prefix))
    }

    /// Specifier points at another registry package
    pub fn is_package(&self) -> bool {
        ["jsr:", "npm:", "node:"]
            .iter()
            .any(|prefix| self.specifier.starts_with(prefix))
    }
}

/// `import x from "..."` is static, `import("...")` is dynamic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Static,
    Dynamic,
}

impl DependencyType {
    pub const ALLOWED: &'static str = "\"static\", \"dynamic\"";

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(DependencyType::Static),
            "dynamic" => Some(DependencyType::Dynamic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Export,
    Import,
}

impl DependencyKind {
    pub const ALLOWED: &'static str = "\"export\", \"import\"";

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "export" => Some(DependencyKind::Export),
            "import" => Some(DependencyKind::Import),
            _ => None,
        }
    }
}

/// Source location of a specifier, encoded as `[line, column]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[Number; 2]", into = "[Number; 2]")]
pub struct Position {
    pub line: Number,
    pub column: Number,
}

impl Position {
    pub fn new(line: u64, column: u64) -> Self {
        Self {
            line: line.into(),
            column: column.into(),
        }
    }
}

impl From<[Number; 2]> for Position {
    fn from([line, column]: [Number; 2]) -> Self {
        Self { line, column }
    }
}

impl From<Position> for [Number; 2] {
    fn from(position: Position) -> Self {
        [position.line, position.column]
    }
}

/// Start and end of a specifier, encoded as `[[line, column], [line, column]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[Position; 2]", into = "[Position; 2]")]
pub struct SpecifierRange {
    pub start: Position,
    pub end: Position,
}

impl From<[Position; 2]> for SpecifierRange {
    fn from([start, end]: [Position; 2]) -> Self {
        Self { start, end }
    }
}

impl From<SpecifierRange> for [Position; 2] {
    fn from(range: SpecifierRange) -> Self {
        [range.start, range.end]
    }
}

/// Wire shape of [`VersionMeta`]
#[derive(Serialize, Deserialize)]
struct VersionMetaRepr {
    #[serde(default)]
    manifest: IndexMap<String, ManifestEntry>,
    #[serde(default)]
    exports: IndexMap<String, String>,
    #[serde(
        rename = "moduleGraph1",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    module_graph1: Option<Map<String, Value>>,
    #[serde(
        rename = "moduleGraph2",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    module_graph2: Option<IndexMap<String, ModuleEntry>>,
}

impl From<VersionMetaRepr> for VersionMeta {
    fn from(repr: VersionMetaRepr) -> Self {
        // Lenient decoding prefers the newer graph if a payload carries both.
        let module_graph = match (repr.module_graph2, repr.module_graph1) {
            (Some(v2), _) => ModuleGraph::V2(v2),
            (None, Some(v1)) => ModuleGraph::Legacy(v1),
            (None, None) => ModuleGraph::Absent,
        };
        Self {
            manifest: repr.manifest,
            exports: repr.exports,
            module_graph,
        }
    }
}

impl From<VersionMeta> for VersionMetaRepr {
    fn from(meta: VersionMeta) -> Self {
        let (module_graph1, module_graph2) = match meta.module_graph {
            ModuleGraph::Legacy(v1) => (Some(v1), None),
            ModuleGraph::V2(v2) => (None, Some(v2)),
            ModuleGraph::Absent => (None, None),
        };
        Self {
            manifest: meta.manifest,
            exports: meta.exports,
            module_graph1,
            module_graph2,
        }
    }
}
