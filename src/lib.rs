/// Stat Block Importer
///
/// Extracts D&D creature stat blocks from structured generator output and
/// normalizes them into canonical creature records with derived action and
/// spell items.

pub mod config;
pub mod core;
pub mod ingestion;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
