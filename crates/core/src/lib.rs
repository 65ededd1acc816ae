pub mod adapter;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod http;
pub mod retry;
pub mod types;

pub use adapter::{MergeEngine, SourceAdapter, StagingHandle, StagingLoader, WatermarkStore};
pub use config::{
    AppConfig, CsvConfig, CsvFileConfig, DatabaseConfig, FredConfig, IngestConfig, PolygonConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{SourceError, SourceResult};
pub use http::{HttpClientConfig, RetryingHttpClient};
pub use retry::{retry_with_backoff, BackoffPolicy};
pub use types::{
    FetchWindow, Observation, ObservationBatch, SeriesDescriptor, SeriesKind, SeriesMetadata,
};
