use async_trait::async_trait;
use citescope_core::FetchOutcome;

pub mod openalex;

/// A metadata lookup for a single identifier.
///
/// Implementations must never fail past this boundary: every transport,
/// status or parse failure is returned as `FetchOutcome::Error` naming the
/// identifier and the reason.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, identifier: &str) -> FetchOutcome;
}
