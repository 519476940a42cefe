//! Registry test utilities

use jsr_meta::ClientOptions;
use mockito::{Mock, ServerGuard};

/// Client options for `@scope/name` pointed at a mock server
pub fn options_for(server: &ServerGuard, scope: &str, name: &str) -> ClientOptions {
    ClientOptions::new(scope, name).with_host(server.url())
}

/// Serve `body` as JSON with status 200 at `path`
pub async fn mock_json(server: &mut ServerGuard, path: &str, body: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

/// Answer `path` with `status` and a JSON error body
pub async fn mock_status(server: &mut ServerGuard, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": "notFound", "message": "not found"}"#)
        .create_async()
        .await
}
