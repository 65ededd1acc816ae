pub mod adapter;

pub use adapter::{CsvAdapter, CSV_ORIGIN};
