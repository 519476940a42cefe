use serde::Deserialize;

/// Default JSR registry host
pub const DEFAULT_HOST: &str = "https://jsr.io";

/// Environment variable that overrides the default host for new clients
pub const HOST_ENV_VAR: &str = "JSR_META_HOST";

/// User agent sent with every registry request
pub const USER_AGENT: &str = "jsr-meta";

/// Options for constructing a [`PackageClient`](crate::registry::PackageClient)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Package scope, without the leading `@`
    pub scope: String,
    /// Package name
    pub name: String,
    /// Do not keep fetched version metadata in memory
    pub no_cache: bool,
    /// Skip strict validation and decode payloads leniently
    pub no_serializer: bool,
    /// Registry host, e.g. `https://jsr.io`
    pub host: String,
}

impl ClientOptions {
    /// Options for `@scope/name` with every other field at its default
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn with_no_serializer(mut self, no_serializer: bool) -> Self {
        self.no_serializer = no_serializer;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            scope: String::new(),
            name: String::new(),
            no_cache: false,
            no_serializer: false,
            host: default_host(),
        }
    }
}

/// Returns the registry host new clients use.
/// Uses $JSR_META_HOST if it is set and non-empty, otherwise https://jsr.io.
pub fn default_host() -> String {
    host_with_env(std::env::var(HOST_ENV_VAR).ok())
}

/// Strips trailing slashes so request URLs never contain `//`.
pub(crate) fn normalize_host(host: &str) -> String {
    host.trim_end_matches('/').to_string()
}

fn host_with_env(env_host: Option<String>) -> String {
    env_host
        .filter(|host| !host.trim().is_empty())
        .map(|host| normalize_host(host.trim()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}
