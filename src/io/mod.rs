//! Table ingestion and CSV export.

pub mod export;
pub mod table;
