//! Data acquisition: provider adapters, fixed schemas and atomic persistence.

pub mod frame;
mod http;
pub mod persist;
pub mod polygon;
pub mod provider;
pub mod schema;
pub mod stocktwits;
pub mod synthetic;
pub mod trends;
pub mod universe;
pub mod yahoo;

pub use frame::{Field, RawFrame};
pub use http::build_client;
pub use persist::{output_path, write_atomic, write_lines_atomic};
pub use polygon::PolygonAdapter;
pub use provider::{DataError, DateRange, FailureKind, SourceAdapter, SourceKind};
pub use schema::{RecordSet, Schema, INTEREST, MESSAGES, PRICE};
pub use stocktwits::StockTwitsAdapter;
pub use synthetic::SyntheticAdapter;
pub use trends::TrendsAdapter;
pub use universe::{Universe, UniverseError};
pub use yahoo::YahooAdapter;
