pub mod error;
pub mod fetch;
pub mod storage;
pub mod types;

pub use error::{Discard, Error, FetchError, Result, StorageError};
pub use fetch::{FetchedPage, Fetcher};
pub use storage::ArticleStorage;
pub use types::{ArticleCandidate, ArticleRecord, PageRange, Source};
