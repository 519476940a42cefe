//! JSR package metadata client

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{ClientOptions, normalize_host};
use crate::registry::error::{ClientError, FetchError};
use crate::registry::fetcher::{Fetcher, ReqwestFetcher};
use crate::schema::error::SchemaError;
use crate::schema::json::JsonNode;
use crate::schema::types::{PackageIdentity, PackageMeta, VersionMeta};
use crate::schema::validator::{validate_package_meta, validate_version_meta};
use crate::schema::views::{VersionsByYanked, versions_by_yanked};

/// Package metadata from the last successful refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSnapshot {
    pub meta: PackageMeta,
    pub by_yanked: VersionsByYanked,
}

impl PackageSnapshot {
    fn new(meta: PackageMeta) -> Self {
        let by_yanked = versions_by_yanked(&meta);
        Self { meta, by_yanked }
    }
}

/// Client for a single JSR package.
///
/// Construction does not touch the network; call [`PackageClient::refresh`]
/// or use [`PackageClient::find`]. Methods take `&self` and may run
/// concurrently. Concurrent writes to the same cache slot are last-writer-wins.
pub struct PackageClient {
    fetcher: Arc<dyn Fetcher>,
    identity: PackageIdentity,
    host: String,
    no_cache: bool,
    no_serializer: bool,
    first_fetch: AtomicBool,
    meta: RwLock<Option<Arc<PackageSnapshot>>>,
    version_meta: RwLock<HashMap<String, Arc<VersionMeta>>>,
}

impl PackageClient {
    /// Creates a client that talks to the registry over HTTP
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let fetcher = ReqwestFetcher::new()?;
        Ok(Self::with_fetcher(options, Arc::new(fetcher)))
    }

    /// Creates a client with a custom transport
    pub fn with_fetcher(options: ClientOptions, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            identity: PackageIdentity::new(options.scope, options.name),
            host: normalize_host(&options.host),
            no_cache: options.no_cache,
            no_serializer: options.no_serializer,
            first_fetch: AtomicBool::new(false),
            meta: RwLock::new(None),
            version_meta: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a client and fetches the package metadata
    pub async fn find(options: ClientOptions) -> Result<Self, ClientError> {
        let client = Self::new(options)?;
        client.refresh().await?;
        Ok(client)
    }

    /// Like [`PackageClient::find`], with a custom transport
    pub async fn find_with_fetcher(
        options: ClientOptions,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ClientError> {
        let client = Self::with_fetcher(options, fetcher);
        client.refresh().await?;
        Ok(client)
    }

    /// Like [`PackageClient::find`], but any failure yields `None`
    pub async fn try_find(options: ClientOptions) -> Option<Self> {
        Self::find(options)
            .await
            .inspect_err(|e| debug!("Package lookup failed: {}", e))
            .ok()
    }

    /// Like [`PackageClient::try_find`], with a custom transport
    pub async fn try_find_with_fetcher(
        options: ClientOptions,
        fetcher: Arc<dyn Fetcher>,
    ) -> Option<Self> {
        Self::find_with_fetcher(options, fetcher)
            .await
            .inspect_err(|e| debug!("Package lookup failed: {}", e))
            .ok()
    }

    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    pub fn scope(&self) -> &str {
        &self.identity.scope
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// True once a refresh has succeeded
    pub fn first_fetch(&self) -> bool {
        self.first_fetch.load(Ordering::Acquire)
    }

    /// URL of the package metadata: `{host}/@{scope}/{name}/meta.json`
    pub fn meta_url(&self) -> String {
        format!("{}/{}/meta.json", self.host, self.identity)
    }

    /// URL of a version's metadata: `{host}/@{scope}/{name}/{version}_meta.json`
    pub fn version_meta_url(&self, version: &str) -> String {
        format!("{}/{}/{}_meta.json", self.host, self.identity, version)
    }

    /// Metadata from the last successful refresh
    pub fn meta(&self) -> Result<Option<Arc<PackageSnapshot>>, ClientError> {
        Ok(read_lock(&self.meta)?.clone())
    }

    pub fn cached_version_meta(&self, version: &str) -> Result<Option<Arc<VersionMeta>>, ClientError> {
        Ok(read_lock(&self.version_meta)?.get(version).cloned())
    }

    /// Versions currently held in the cache, sorted
    pub fn cached_versions(&self) -> Result<Vec<String>, ClientError> {
        let mut versions: Vec<String> = read_lock(&self.version_meta)?.keys().cloned().collect();
        versions.sort();
        Ok(versions)
    }

    /// Fetches the package metadata and replaces the current snapshot
    pub async fn refresh(&self) -> Result<Arc<PackageSnapshot>, ClientError> {
        let body = self.fetch(&self.meta_url()).await?;
        let meta = self.decode(&body, |raw| validate_package_meta(raw, &self.identity))?;

        let snapshot = Arc::new(PackageSnapshot::new(meta));
        *write_lock(&self.meta)? = Some(snapshot.clone());

        if !self.first_fetch.swap(true, Ordering::AcqRel) {
            info!(
                "Fetched {} ({} versions)",
                self.identity,
                snapshot.meta.versions.len()
            );
        }

        Ok(snapshot)
    }

    /// Fetches the metadata of `version`, caching it unless caching is disabled
    pub async fn get_version_meta(&self, version: &str) -> Result<Arc<VersionMeta>, ClientError> {
        check_version(version)?;
        let body = self.fetch(&self.version_meta_url(version)).await?;
        let meta = Arc::new(self.decode(&body, validate_version_meta)?);

        if !self.no_cache {
            write_lock(&self.version_meta)?.insert(version.to_string(), meta.clone());
            debug!("Cached version metadata for {}@{}", self.identity, version);
        }

        Ok(meta)
    }

    /// Like [`PackageClient::get_version_meta`], but any failure yields `None`
    pub async fn try_get_version_meta(&self, version: &str) -> Option<Arc<VersionMeta>> {
        self.get_version_meta(version)
            .await
            .inspect_err(|e| debug!("Version lookup for {} failed: {}", version, e))
            .ok()
    }

    /// Fetches several versions concurrently; results keep the input order
    pub async fn get_version_metas(
        &self,
        versions: &[&str],
    ) -> Vec<Result<Arc<VersionMeta>, ClientError>> {
        join_all(versions.iter().map(|version| self.get_version_meta(version))).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        debug!("GET {}", url);
        let response = self.fetcher.get(url).await?;

        if response.status != 200 {
            warn!(
                "JSR registry returned status {} {}: {}",
                response.status, response.reason, url
            );
            return Err(FetchError::Status {
                status: response.status,
                reason: response.reason,
                url: url.to_string(),
            }
            .into());
        }

        Ok(response.body)
    }

    /// Strictly validates `body`, or decodes it leniently when validation is off
    fn decode<T, F>(&self, body: &[u8], validate: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: FnOnce(&JsonNode) -> Result<T, SchemaError>,
    {
        if self.no_serializer {
            return serde_json::from_slice(body).map_err(|e| {
                warn!("Failed to decode JSR registry response: {}", e);
                e.into()
            });
        }

        let raw: JsonNode = serde_json::from_slice(body).map_err(|e| {
            warn!("Failed to parse JSR registry response: {}", e);
            ClientError::from(e)
        })?;

        validate(&raw).map_err(|e| {
            warn!("JSR registry response failed validation: {}", e);
            e.into()
        })
    }
}

/// A version must stay a single path segment of the metadata URL
fn check_version(version: &str) -> Result<(), ClientError> {
    if version.is_empty() || version.contains(['/', '\\', '?', '#', '%']) {
        return Err(ClientError::InvalidVersion(version.to_string()));
    }
    Ok(())
}

fn read_lock<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, ClientError> {
    lock.read().map_err(|_| ClientError::LockPoisoned)
}

fn write_lock<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, ClientError> {
    lock.write().map_err(|_| ClientError::LockPoisoned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fetcher::{HttpResponse, MockFetcher};
    use crate::schema::types::ModuleGraph;
    use rstest::rstest;

    const META_URL: &str = "https://jsr.io/@luca/flag/meta.json";
    const VERSION_URL: &str = "https://jsr.io/@luca/flag/1.0.0_meta.json";

    const META_BODY: &str = r#"{
        "scope": "luca",
        "name": "flag",
        "latest": "1.0.1",
        "versions": {
            "1.0.0": {"yanked": true},
            "1.0.1": {}
        }
    }"#;

    const VERSION_BODY: &str = r#"{
        "manifest": {"/mod.ts": {"size": 120, "checksum": "sha256-abc"}},
        "exports": {".": "./mod.ts"},
        "moduleGraph2": {"/mod.ts": {}}
    }"#;

    fn options() -> ClientOptions {
        ClientOptions::new("luca", "flag").with_host("https://jsr.io")
    }

    fn ok(body: &'static str) -> Result<HttpResponse, FetchError> {
        Ok(HttpResponse::new(200, "OK", body))
    }

    fn not_found() -> Result<HttpResponse, FetchError> {
        Ok(HttpResponse::new(404, "Not Found", r#"{"code":"packageNotFound"}"#))
    }

    fn client_with(fetcher: MockFetcher, options: ClientOptions) -> PackageClient {
        PackageClient::with_fetcher(options, Arc::new(fetcher))
    }

    #[test]
    fn urls_follow_registry_layout() {
        let client = client_with(
            MockFetcher::new(),
            ClientOptions::new("std", "path").with_host("http://localhost:8000/"),
        );

        assert_eq!(client.host(), "http://localhost:8000");
        assert_eq!(client.meta_url(), "http://localhost:8000/@std/path/meta.json");
        assert_eq!(
            client.version_meta_url("1.0.0"),
            "http://localhost:8000/@std/path/1.0.0_meta.json"
        );
    }

    #[tokio::test]
    async fn refresh_stores_validated_meta_with_yanked_view() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_get()
            .withf(|url| url == META_URL)
            .times(1)
            .returning(|_| ok(META_BODY));

        let client = client_with(fetcher, options());
        assert!(!client.first_fetch());
        assert!(client.meta().unwrap().is_none());

        let snapshot = client.refresh().await.unwrap();

        assert!(client.first_fetch());
        assert_eq!(snapshot.meta.latest.as_deref(), Some("1.0.1"));
        assert_eq!(snapshot.by_yanked.yanked, vec!["1.0.0".to_string()]);
        assert_eq!(snapshot.by_yanked.unyanked, vec!["1.0.1".to_string()]);
        assert_eq!(client.meta().unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn repeated_refresh_replaces_snapshot_and_keeps_first_fetch() {
        let mut fetcher = MockFetcher::new();
        let mut seq = mockall::Sequence::new();
        fetcher
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(META_BODY));
        fetcher
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                ok(r#"{"scope": "luca", "name": "flag", "latest": "1.0.2",
                       "versions": {"1.0.2": {}}}"#)
            });

        let client = client_with(fetcher, options());
        client.refresh().await.unwrap();
        client.refresh().await.unwrap();

        assert!(client.first_fetch());
        let snapshot = client.meta().unwrap().unwrap();
        assert_eq!(snapshot.meta.latest.as_deref(), Some("1.0.2"));
    }

    #[tokio::test]
    async fn refresh_rejects_meta_for_another_package() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| {
            ok(r#"{"scope": "std", "name": "flag", "latest": null, "versions": {"1.0.0": {}}}"#)
        });

        let client = client_with(fetcher, options());
        let result = client.refresh().await;

        assert!(matches!(
            result,
            Err(ClientError::Schema(SchemaError::IdentityMismatch { field: "scope", .. }))
        ));
        assert!(!client.first_fetch());
        assert!(client.meta().unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_without_serializer_decodes_leniently() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| {
            ok(r#"{
                "scope": "luca",
                "name": "flag",
                "latest": "1.0.1",
                "versions": {
                    "1.0.0": {"createdAt": "2024-01-01T00:00:00.000Z", "yanked": true},
                    "1.0.1": {"createdAt": "2024-02-01T00:00:00.000Z"}
                },
                "description": "unvalidated field"
            }"#)
        });

        let client = client_with(fetcher, options().with_no_serializer(true));
        let snapshot = client.refresh().await.unwrap();

        assert_eq!(snapshot.by_yanked.yanked, vec!["1.0.0".to_string()]);
        assert_eq!(snapshot.by_yanked.unyanked, vec!["1.0.1".to_string()]);
    }

    #[tokio::test]
    async fn refresh_reports_status_for_non_200_response() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| not_found());

        let client = client_with(fetcher, options());
        let err = client.refresh().await.unwrap_err();

        match err {
            ClientError::Fetch(FetchError::Status {
                status,
                reason,
                url,
            }) => {
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
                assert_eq!(url, META_URL);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_200_success_status_is_still_an_error() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_get()
            .returning(|_| Ok(HttpResponse::new(204, "No Content", "")));

        let client = client_with(fetcher, options());
        let err = client.get_version_meta("1.0.0").await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Fetch(FetchError::Status { status: 204, .. })
        ));
    }

    #[tokio::test]
    async fn get_version_meta_validates_and_caches() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_get()
            .withf(|url| url == VERSION_URL)
            .times(1)
            .returning(|_| ok(VERSION_BODY));

        let client = client_with(fetcher, options());
        let meta = client.get_version_meta("1.0.0").await.unwrap();

        assert_eq!(meta.default_export(), Some("./mod.ts"));
        assert!(matches!(meta.module_graph, ModuleGraph::V2(_)));
        assert_eq!(client.cached_version_meta("1.0.0").unwrap(), Some(meta));
        assert_eq!(client.cached_versions().unwrap(), vec!["1.0.0".to_string()]);
    }

    #[tokio::test]
    async fn get_version_meta_overwrites_previous_cache_entry() {
        let mut fetcher = MockFetcher::new();
        let mut seq = mockall::Sequence::new();
        fetcher
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(VERSION_BODY));
        fetcher
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                ok(r#"{
                    "manifest": {"/main.ts": {"size": 7, "checksum": "sha256-def"}},
                    "exports": {".": "./main.ts"}
                }"#)
            });

        let client = client_with(fetcher, options());
        client.get_version_meta("1.0.0").await.unwrap();
        client.get_version_meta("1.0.0").await.unwrap();

        let cached = client.cached_version_meta("1.0.0").unwrap().unwrap();
        assert_eq!(cached.default_export(), Some("./main.ts"));
        assert_eq!(client.cached_versions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_version_meta_skips_cache_when_disabled() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| ok(VERSION_BODY));

        let client = client_with(fetcher, options().with_no_cache(true));
        let meta = client.get_version_meta("1.0.0").await.unwrap();

        assert_eq!(meta.default_export(), Some("./mod.ts"));
        assert_eq!(client.cached_version_meta("1.0.0").unwrap(), None);
    }

    #[tokio::test]
    async fn get_version_meta_does_not_cache_invalid_payload() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| {
            ok(r#"{"manifest": {"/mod.ts": {"size": 1, "checksum": "md5-abc"}},
                   "exports": {".": "./mod.ts"}}"#)
        });

        let client = client_with(fetcher, options());
        let result = client.get_version_meta("1.0.0").await;

        assert!(matches!(
            result,
            Err(ClientError::Schema(SchemaError::InvalidChecksum { .. }))
        ));
        assert!(client.cached_versions().unwrap().is_empty());
    }

    #[rstest]
    #[case("../other/x")]
    #[case("1.0.0/../../@evil/pkg/meta.json?")]
    #[case("1.0.0#frag")]
    #[case("%2e%2e")]
    #[case("")]
    #[tokio::test]
    async fn get_version_meta_rejects_versions_that_leave_the_package_path(
        #[case] version: &str,
    ) {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().never();

        let client = client_with(fetcher, options());
        let result = client.get_version_meta(version).await;

        assert!(matches!(result, Err(ClientError::InvalidVersion(v)) if v == version));
        assert!(client.try_get_version_meta(version).await.is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| ok("{not json"));

        let client = client_with(fetcher, options());
        let result = client.get_version_meta("1.0.0").await;

        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn try_get_version_meta_returns_none_on_404() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_get()
            .withf(|url| url == VERSION_URL)
            .returning(|_| not_found());

        let client = client_with(fetcher, options());

        assert!(client.try_get_version_meta("1.0.0").await.is_none());
    }

    #[tokio::test]
    async fn get_version_metas_keeps_input_order() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|url| {
            if url.ends_with("/2.0.0_meta.json") {
                not_found()
            } else {
                ok(VERSION_BODY)
            }
        });

        let client = client_with(fetcher, options());
        let results = client.get_version_metas(&["1.0.0", "2.0.0", "3.0.0"]).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ClientError::Fetch(FetchError::Status { status: 404, .. }))
        ));
        assert!(results[2].is_ok());
        assert_eq!(
            client.cached_versions().unwrap(),
            vec!["1.0.0".to_string(), "3.0.0".to_string()]
        );
    }

    #[tokio::test]
    async fn find_with_fetcher_refreshes_before_returning() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().times(1).returning(|_| ok(META_BODY));

        let client = PackageClient::find_with_fetcher(options(), Arc::new(fetcher))
            .await
            .unwrap();

        assert!(client.first_fetch());
        assert_eq!(client.scope(), "luca");
        assert_eq!(client.name(), "flag");
    }

    #[tokio::test]
    async fn find_with_fetcher_propagates_failure() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| not_found());

        let result = PackageClient::find_with_fetcher(options(), Arc::new(fetcher)).await;

        assert!(matches!(
            result,
            Err(ClientError::Fetch(FetchError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn try_find_with_fetcher_returns_none_on_failure() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().returning(|_| not_found());

        let client = PackageClient::try_find_with_fetcher(options(), Arc::new(fetcher)).await;

        assert!(client.is_none());
    }
}
