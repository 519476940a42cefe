//! Registry access layer
//!
//! # Modules
//!
//! - [`client`]: `PackageClient`, fetching and caching metadata for one package
//! - [`fetcher`]: `Fetcher` trait and its reqwest implementation
//! - [`error`]: transport and client error types

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::{PackageClient, PackageSnapshot};
pub use error::{ClientError, FetchError};
pub use fetcher::{Fetcher, HttpResponse, ReqwestFetcher};
