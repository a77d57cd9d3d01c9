use std::collections::{BTreeSet, HashSet};

use citescope_core::{ErrorResult, FetchOutcome, RecordStore, WorkRecord};
use serde::Serialize;

use crate::crawl::batch::{DEFAULT_BATCH_SIZE, fetch_all};
use crate::error::{Result, ScienceError};
use crate::sources::MetadataFetcher;

// ─── CrawlState ───────────────────────────────────────────────────────────────

/// Visited set and current frontier of one crawl run.
///
/// `visited` only grows. Every identifier that was ever put on a frontier is
/// in it, so nothing is fetched twice and citation cycles terminate.
#[derive(Debug, Clone)]
pub struct CrawlState {
    visited: HashSet<String>,
    frontier: Vec<String>,
    depth: u32,
}

impl CrawlState {
    pub fn new(seed: &str) -> Self {
        Self {
            visited: HashSet::from([seed.to_string()]),
            frontier: vec![seed.to_string()],
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn frontier(&self) -> &[String] {
        &self.frontier
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Mark an id (e.g. the canonical id a lookup resolved to) as seen.
    pub fn mark_visited(&mut self, id: &str) -> bool {
        self.visited.insert(id.to_string())
    }

    /// Move to the next depth: the new frontier is every reference emitted by
    /// `parents`, minus everything visited, in first-seen order.
    pub fn advance<'a, I>(&mut self, parents: I) -> &[String]
    where
        I: IntoIterator<Item = &'a WorkRecord>,
    {
        let mut next = Vec::new();
        for parent in parents {
            for reference in &parent.referenced_work_ids {
                if self.visited.insert(reference.clone()) {
                    next.push(reference.clone());
                }
            }
        }
        self.frontier = next;
        self.depth += 1;
        &self.frontier
    }

    pub fn into_visited(self) -> BTreeSet<String> {
        self.visited.into_iter().collect()
    }
}

// ─── CrawlReport ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CrawlEntry {
    pub identifier: String,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlLevel {
    pub depth: u32,
    pub entries: Vec<CrawlEntry>,
}

impl CrawlLevel {
    pub fn records(&self) -> impl Iterator<Item = &WorkRecord> {
        self.entries.iter().filter_map(|e| e.outcome.as_work())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorResult> {
        self.entries.iter().filter_map(|e| e.outcome.as_error())
    }
}

/// Everything one crawl produced, partitioned by depth.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub levels: Vec<CrawlLevel>,
    pub visited: BTreeSet<String>,
    /// Records that were fetched but could not be persisted.
    pub storage_failures: Vec<ErrorResult>,
}

impl CrawlReport {
    pub fn seed_record(&self) -> Option<&WorkRecord> {
        self.levels.first().and_then(|l| l.records().next())
    }

    pub fn records(&self) -> impl Iterator<Item = &WorkRecord> {
        self.levels.iter().flat_map(CrawlLevel::records)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorResult> {
        self.levels.iter().flat_map(CrawlLevel::errors)
    }

    /// Outcome for a requested identifier, at whatever depth it was fetched.
    pub fn outcome(&self, identifier: &str) -> Option<&FetchOutcome> {
        self.levels
            .iter()
            .flat_map(|l| l.entries.iter())
            .find(|e| e.identifier == identifier)
            .map(|e| &e.outcome)
    }

    pub fn fetch_count(&self) -> usize {
        self.levels.iter().map(|l| l.entries.len()).sum()
    }

    pub fn max_depth_reached(&self) -> u32 {
        self.levels.last().map(|l| l.depth).unwrap_or(0)
    }
}

// ─── Crawler ──────────────────────────────────────────────────────────────────

/// Bounded-depth breadth-first expansion over reference lists.
pub struct Crawler<'a, F: ?Sized, S: ?Sized> {
    fetcher: &'a F,
    store: &'a S,
    batch_size: usize,
}

impl<'a, F, S> Crawler<'a, F, S>
where
    F: MetadataFetcher + ?Sized,
    S: RecordStore + ?Sized,
{
    pub fn new(fetcher: &'a F, store: &'a S) -> Self {
        Self {
            fetcher,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Crawl from `seed` down to `max_depth` (0 fetches the seed only).
    ///
    /// A failed seed aborts the run with `ScienceError::SeedFailed` before
    /// any other fetch. Any other failure is kept in the report and simply
    /// contributes no references to the next frontier.
    pub async fn crawl(&self, seed: &str, max_depth: u32) -> Result<CrawlReport> {
        let seed = seed.trim();
        let mut state = CrawlState::new(seed);
        let mut stored: HashSet<String> = HashSet::new();
        let mut storage_failures = Vec::new();

        tracing::info!(seed, max_depth, "crawl started");

        let seed_record = match self.fetcher.fetch(seed).await {
            FetchOutcome::Work(record) => record,
            FetchOutcome::Error(err) => {
                tracing::error!(seed, "seed fetch failed: {}", err.error_message);
                return Err(ScienceError::SeedFailed {
                    identifier: seed.to_string(),
                    reason: err.error_message,
                });
            }
        };
        state.mark_visited(&seed_record.id);
        self.persist(0, &seed_record, &mut stored, &mut storage_failures);

        let mut levels = vec![CrawlLevel {
            depth: 0,
            entries: vec![CrawlEntry {
                identifier: seed.to_string(),
                outcome: FetchOutcome::Work(seed_record),
            }],
        }];

        for depth in 1..=max_depth {
            let parents = levels.last().map(|l| l.records().collect::<Vec<_>>()).unwrap_or_default();
            let frontier = state.advance(parents).to_vec();
            if frontier.is_empty() {
                tracing::info!(depth, "frontier empty, stopping");
                break;
            }

            tracing::info!(depth, works = frontier.len(), "fetching depth");
            let outcomes = fetch_all(self.fetcher, &frontier, self.batch_size).await;

            let mut entries = Vec::with_capacity(frontier.len());
            for (identifier, outcome) in frontier.into_iter().zip(outcomes) {
                match &outcome {
                    FetchOutcome::Work(record) => {
                        state.mark_visited(&record.id);
                        self.persist(depth, record, &mut stored, &mut storage_failures);
                    }
                    FetchOutcome::Error(err) => {
                        tracing::warn!(depth, identifier = %err.identifier, "{}", err.error_message);
                    }
                }
                entries.push(CrawlEntry {
                    identifier,
                    outcome,
                });
            }

            let level = CrawlLevel { depth, entries };
            tracing::info!(
                depth,
                fetched = level.records().count(),
                failed = level.errors().count(),
                "depth complete"
            );
            levels.push(level);
        }

        let report = CrawlReport {
            seed: seed.to_string(),
            levels,
            visited: state.into_visited(),
            storage_failures,
        };
        tracing::info!(
            fetched = report.fetch_count(),
            visited = report.visited.len(),
            "crawl finished"
        );
        Ok(report)
    }

    fn persist(
        &self,
        depth: u32,
        record: &WorkRecord,
        stored: &mut HashSet<String>,
        failures: &mut Vec<ErrorResult>,
    ) {
        if !stored.insert(record.id.clone()) {
            tracing::debug!(id = %record.id, "already stored under another identifier");
            return;
        }
        if let Err(e) = self.store.put(depth, record) {
            tracing::warn!(id = %record.id, depth, "failed to store record: {e}");
            failures.push(ErrorResult::new(
                record.id.clone(),
                format!("failed to store {}: {e}", record.id),
            ));
        }
    }
}
