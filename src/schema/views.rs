//! Derived views over package metadata

use semver::Version;
use serde::Serialize;

use crate::schema::types::PackageMeta;

/// Versions split by yanked state, each list in registry order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionsByYanked {
    pub yanked: Vec<String>,
    pub unyanked: Vec<String>,
}

pub fn yanked_versions(meta: &PackageMeta) -> Vec<&str> {
    filter_versions(meta, true)
}

pub fn unyanked_versions(meta: &PackageMeta) -> Vec<&str> {
    filter_versions(meta, false)
}

pub fn versions_by_yanked(meta: &PackageMeta) -> VersionsByYanked {
    let (yanked, unyanked) = meta
        .versions
        .iter()
        .partition::<Vec<_>, _>(|(_, entry)| entry.yanked);

    VersionsByYanked {
        yanked: yanked.into_iter().map(|(v, _)| v.clone()).collect(),
        unyanked: unyanked.into_iter().map(|(v, _)| v.clone()).collect(),
    }
}

/// Semantically greatest version that is not yanked.
///
/// Versions that are not valid semver are skipped.
pub fn latest_unyanked(meta: &PackageMeta) -> Option<&str> {
    unyanked_versions(meta)
        .into_iter()
        .filter_map(|v| Version::parse(v).ok().map(|parsed| (v, parsed)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original)
}

fn filter_versions(meta: &PackageMeta, yanked: bool) -> Vec<&str> {
    meta.versions
        .iter()
        .filter(|(_, entry)| entry.yanked == yanked)
        .map(|(version, _)| version.as_str())
        .collect()
}
