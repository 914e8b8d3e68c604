//! Resolution core
//!
//! Tier accessors, the boundaries to external collaborators, and the
//! orchestrator that walks them.

pub mod artist_directory;
pub mod blob_store;
pub mod in_flight;
pub mod normalizer;
pub mod orchestrator;
pub mod page_fetcher;
pub mod query_cache;
pub mod record_store;
pub mod remote_tier;
pub mod scraper_client;

pub use artist_directory::{ArtistDirectory, SqliteArtistDirectory};
pub use blob_store::{BlobStore, BlobStoreError, FilesystemBlobStore};
pub use in_flight::InFlight;
pub use orchestrator::{NewChordSheet, ResolutionOrchestrator, ResolveError, ResolveResult, TierSet};
pub use page_fetcher::{HttpPageFetcher, PageFetcher, RawLink, SearchKind};
pub use query_cache::QueryCache;
pub use record_store::RecordStore;
pub use remote_tier::RemoteTierClient;
pub use scraper_client::{FallbackError, ScraperClient, ScrapingFallback};
