use citescope_core::FetchOutcome;
use futures::future::join_all;

use crate::sources::MetadataFetcher;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Fetch every identifier, `batch_size` at a time.
///
/// Fetches inside a batch run concurrently; the next batch starts only once
/// every fetch of the current one has settled. The output has the same
/// length and order as `identifiers`, one outcome per input, failures
/// included.
pub async fn fetch_all<F, S>(fetcher: &F, identifiers: &[S], batch_size: usize) -> Vec<FetchOutcome>
where
    F: MetadataFetcher + ?Sized,
    S: AsRef<str>,
{
    let batch_size = batch_size.max(1);
    let total_batches = identifiers.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(identifiers.len());

    for (n, batch) in identifiers.chunks(batch_size).enumerate() {
        tracing::debug!(
            batch = n + 1,
            of = total_batches,
            size = batch.len(),
            source = fetcher.name(),
            "fetching batch"
        );
        let outcomes = join_all(batch.iter().map(|id| fetcher.fetch(id.as_ref()))).await;
        results.extend(outcomes);
    }

    results
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::crawl::fake::FakeFetcher;

    fn ids(outcomes: &[FetchOutcome]) -> Vec<String> {
        outcomes
            .iter()
            .map(|o| match o {
                FetchOutcome::Work(w) => w.id.clone(),
                FetchOutcome::Error(e) => e.identifier.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn output_order_matches_input_despite_slow_fetch() {
        let fetcher = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .fold(FakeFetcher::new(), |f, id| f.work(id, &[]))
            .delayed("c", Duration::from_millis(80));

        let input = ["a", "b", "c", "d", "e", "f"];
        let out = fetch_all(&fetcher, &input, 5).await;

        assert_eq!(ids(&out), vec!["a", "b", "c", "d", "e", "f"]);
        assert!(out.iter().all(FetchOutcome::is_ok));
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() {
        let fetcher = FakeFetcher::new()
            .work("a", &[])
            .work("b", &[])
            .work("c", &[])
            .failing("b");

        let out = fetch_all(&fetcher, &["a", "b", "c"], 5).await;

        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert_eq!(out[1].as_error().unwrap().identifier, "b");
        assert!(out[2].is_ok());
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_batch_size() {
        let names: Vec<String> = (0..12).map(|i| format!("w{i}")).collect();
        let fetcher = names
            .iter()
            .fold(FakeFetcher::new(), |f, id| f.delayed(id, Duration::from_millis(20)));

        let out = fetch_all(&fetcher, &names, 4).await;

        assert_eq!(out.len(), 12);
        assert!(fetcher.peak_in_flight() <= 4);
        assert!(fetcher.peak_in_flight() >= 2);
    }

    #[tokio::test]
    async fn every_input_yields_exactly_one_output() {
        let fetcher = FakeFetcher::new().work("a", &[]);
        let out = fetch_all(&fetcher, &["a", "missing", "a"], 2).await;
        assert_eq!(ids(&out), vec!["a", "missing", "a"]);
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn empty_input_and_zero_batch_size() {
        let fetcher = FakeFetcher::new().work("a", &[]);
        let none: [&str; 0] = [];
        assert!(fetch_all(&fetcher, &none, 5).await.is_empty());

        let out = fetch_all(&fetcher, &["a", "a"], 0).await;
        assert_eq!(out.len(), 2);
        assert_eq!(fetcher.peak_in_flight(), 1);
    }
}
