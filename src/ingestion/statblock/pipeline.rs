//! Import Pipeline
//!
//! Drives one document through extraction, normalisation and assembly, then
//! synthesises action items and resolves spell declarations through the
//! catalog. Each import owns its own records; nothing is shared between
//! concurrent imports except the read-only taxonomy tables.
//!
//! # Example
//!
//! ```ignore
//! let importer = StatBlockImporter::new(ImportConfig::default());
//! let input = StatBlockInput::from_json(&text)?;
//! let outcome = importer.import(&input, &catalog).await;
//! for warning in &outcome.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```

use futures::future::join_all;
use tracing::{info, warn};

use super::ability_text::AbilityTextParser;
use super::builder::CreatureRecordBuilder;
use super::catalog::{CreaturePayload, EntityStore, ItemPayload, SpellCatalog, SpellItem};
use super::description::DescriptionFormatter;
use super::error::{ImportWarning, Result};
use super::fields;
use super::input::StatBlockInput;
use super::items::ItemSynthesizer;
use super::normalizer::normalize;
use super::record::{ActionRecord, CreatureRecord, SpellUseDeclaration};
use super::spells::scan_features;
use super::taxonomy::Taxonomies;
use crate::config::ImportConfig;

/// Everything that can be derived without the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImport {
    pub record: CreatureRecord,
    pub actions: Vec<ActionRecord>,
    pub spells: Vec<SpellUseDeclaration>,
}

/// A finished payload plus any non-fatal warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub payload: CreaturePayload,
    pub warnings: Vec<ImportWarning>,
}

/// Result of handing a payload to the entity store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub id: String,
    pub item_count: usize,
    pub warnings: Vec<ImportWarning>,
}

/// Stat block importer.
#[derive(Debug, Clone)]
pub struct StatBlockImporter {
    config: ImportConfig,
    taxonomies: &'static Taxonomies,
}

impl StatBlockImporter {
    pub fn new(config: ImportConfig) -> Self {
        Self::with_taxonomies(config, Taxonomies::dnd5e())
    }

    pub fn with_taxonomies(config: ImportConfig, taxonomies: &'static Taxonomies) -> Self {
        Self { config, taxonomies }
    }

    /// Build the creature record, its action items and its spell
    /// declarations. Never fails: unparsable fields take their defaults.
    pub fn prepare(&self, input: &StatBlockInput) -> PreparedImport {
        let extracted = fields::extract(input);
        let normalized = normalize(&extracted, &input.abilities, self.taxonomies, &self.config);
        let record = CreatureRecordBuilder::new(self.taxonomies).build(normalized);

        let formatter = DescriptionFormatter::new(
            &record.abilities,
            record.proficiency,
            self.config.inline_rolls,
            &self.config.emphasis_tag,
        );
        let synthesizer = ItemSynthesizer::new(
            AbilityTextParser::new(self.taxonomies),
            &record.abilities,
            record.proficiency,
            formatter,
        );
        let actions = synthesizer.synthesize(input);
        let spells = scan_features(&input.abilities);

        PreparedImport {
            record,
            actions,
            spells,
        }
    }

    /// Prepare and resolve spells. Catalog misses and failures become
    /// warnings; the affected spells are left out.
    pub async fn import(&self, input: &StatBlockInput, catalog: &dyn SpellCatalog) -> ImportOutcome {
        let prepared = self.prepare(input);
        let (spells, warnings) = resolve_spells(catalog, &prepared.spells).await;

        let items: Vec<ItemPayload> = prepared
            .actions
            .into_iter()
            .map(ItemPayload::Action)
            .chain(spells.into_iter().map(ItemPayload::Spell))
            .collect();

        info!(
            name = %prepared.record.name,
            items = items.len(),
            warnings = warnings.len(),
            "imported stat block"
        );

        ImportOutcome {
            payload: CreaturePayload {
                record: prepared.record,
                items,
            },
            warnings,
        }
    }

    /// Import and hand the payload to the store.
    pub async fn import_into(
        &self,
        input: &StatBlockInput,
        catalog: &dyn SpellCatalog,
        store: &dyn EntityStore,
    ) -> Result<ImportReport> {
        let outcome = self.import(input, catalog).await;
        let item_count = outcome.payload.items.len();
        let id = store.create(outcome.payload).await?;
        Ok(ImportReport {
            id,
            item_count,
            warnings: outcome.warnings,
        })
    }
}

/// Resolve all declarations concurrently, keeping declaration order.
pub async fn resolve_spells(
    catalog: &dyn SpellCatalog,
    declarations: &[SpellUseDeclaration],
) -> (Vec<SpellItem>, Vec<ImportWarning>) {
    let lookups = declarations
        .iter()
        .map(|declaration| catalog.resolve(&declaration.name));
    let results = join_all(lookups).await;

    let mut items = Vec::new();
    let mut warnings = Vec::new();
    for (declaration, result) in declarations.iter().zip(results) {
        match result {
            Ok(Some(spell)) => items.push(SpellItem::from_usage(spell, declaration.usage)),
            Ok(None) => {
                warn!(spell = %declaration.name, "spell not found in catalog");
                warnings.push(ImportWarning::SpellNotFound {
                    name: declaration.name.clone(),
                });
            }
            Err(err) => {
                warn!(spell = %declaration.name, error = %err, "spell lookup failed");
                warnings.push(ImportWarning::CatalogFailure {
                    name: declaration.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    (items, warnings)
}
