//! Document ingestion.

pub mod statblock;
