pub mod batch;
pub mod frontier;

pub use batch::{DEFAULT_BATCH_SIZE, fetch_all};
pub use frontier::{CrawlEntry, CrawlLevel, CrawlReport, CrawlState, Crawler};
