pub mod cached_fetcher;
pub mod config;
pub mod error;
pub mod extractor;
pub mod json_path;
pub mod mapping;
pub mod metrics_consts;
pub mod normalizer;
pub mod record;
pub mod refresh;
pub mod source;
pub mod store;
pub mod transport;

pub use cached_fetcher::{CachedFetcher, FetchResult, FetchSource};
pub use error::{FetchError, StoreError, TransportError};
pub use mapping::{CanonicalField, MappingSpec, PathSpec};
pub use normalizer::normalize;
pub use record::CanonicalRecord;
pub use source::{RequestMethod, SourceDescriptor};
