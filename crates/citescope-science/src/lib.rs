//! Citescope science: OpenAlex lookups, citation crawling, similarity networks.

pub mod crawl;
pub mod error;
pub mod http;
pub mod identifiers;
pub mod network;
pub mod sources;

pub use crawl::{CrawlReport, Crawler, fetch_all};
pub use error::{Result, ScienceError};
pub use network::{KeyTermExtractor, NetworkBuilder, RuleBasedAnnotator, WorkText};
pub use sources::MetadataFetcher;
pub use sources::openalex::OpenAlexSource;
