//! Stat Block Import Module
//!
//! Turns a structured stat block document (the output of an upstream
//! text-to-fields converter) into a canonical creature record plus derived
//! action and spell items.
//!
//! # Components
//!
//! - `taxonomy`: closed key ↔ label tables (abilities, skills, sizes, types,
//!   damage types, conditions, languages)
//! - `fields`: independent per-field extraction rules with declared defaults
//! - `ability_text`: combat semantics from one ability entry
//! - `normalizer`: taxonomy resolution and merge policy
//! - `builder`: assembly of the `CreatureRecord`
//! - `items`: one `ActionRecord` per ability entry, with back-inference
//! - `spells`: spell-list scanning into `SpellUseDeclaration`s
//! - `catalog`: spell catalog and entity store seams with JSON adapters
//! - `pipeline`: `StatBlockImporter` orchestration
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::ingestion::statblock::{
//!     InMemorySpellCatalog, JsonFileStore, StatBlockImporter, StatBlockInput,
//! };
//!
//! let input = StatBlockInput::from_json(&text)?;
//! let importer = StatBlockImporter::new(config.import.clone());
//! let report = importer
//!     .import_into(&input, &catalog, &JsonFileStore::new("out"))
//!     .await?;
//! ```

pub mod ability_text;
pub mod builder;
pub mod catalog;
pub mod defaults;
pub mod description;
pub mod dice;
pub mod error;
pub mod fields;
pub mod input;
pub mod items;
pub mod normalizer;
pub mod pipeline;
pub mod record;
pub mod spells;
pub mod taxonomy;

// Pipeline entry points
pub use pipeline::{resolve_spells, ImportOutcome, ImportReport, PreparedImport, StatBlockImporter};

// Input and output types
pub use input::{AbilityEntry, StatBlockInput};
pub use record::{
    ActionCategory, ActionRecord, ActionType, CreatureRecord, GoverningAbility, SpellUsage,
    SpellUseDeclaration,
};

// Collaborators
pub use catalog::{
    CreaturePayload, EntityStore, InMemorySpellCatalog, ItemPayload, JsonFileStore, SpellCatalog,
    SpellItem, SpellStub,
};

// Errors
pub use error::{CatalogError, ImportError, ImportWarning, Result, StoreError};

pub use taxonomy::{AbilityKey, Taxonomies};
