pub mod adapter;

pub use adapter::{PolygonAdapter, POLYGON_ORIGIN};
