pub mod catalog;
pub mod client;
pub mod error;
pub mod merge;
pub mod observations;
pub mod schema;
pub mod staging;

pub use catalog::SeriesCatalog;
pub use client::WarehouseClient;
pub use error::WarehouseError;
pub use merge::InsertOnlyMerger;
pub use observations::ObservationReader;
pub use staging::StagingArea;
