//! TickerLab Core: data model, schemas, source adapters and persistence.
//!
//! This crate contains everything a single collection task needs:
//! - `DateRange`, `RawFrame` and the normalized `RecordSet`
//! - The three output schemas (price, search interest, messages)
//! - The `SourceAdapter` trait and the failure taxonomy
//! - Adapters for Yahoo Finance, Polygon, Google Trends, StockTwits and a synthetic walk
//! - Atomic CSV persistence and the ticker `Universe`

pub mod data;
