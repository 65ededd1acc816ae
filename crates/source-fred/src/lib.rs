pub mod adapter;

pub use adapter::{FredAdapter, FRED_ORIGIN};
