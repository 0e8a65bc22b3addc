//! Collaborator Seams
//!
//! The pipeline never resolves spells or persists creatures itself. It talks
//! to a [`SpellCatalog`] for spell-name lookups and hands the finished
//! [`CreaturePayload`] to an [`EntityStore`]. JSON-backed adapters for both
//! are provided for the command-line host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{CatalogError, ImportError, StoreError};
use super::record::{ActionRecord, CreatureRecord, SpellUsage, UsePeriod};

// ============================================================================
// Payload Types
// ============================================================================

/// A resolvable spell definition as the catalog stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellStub {
    pub name: String,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub description: String,
    /// Catalog fields this crate does not interpret, passed through as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SpellStub {
    pub fn new(name: impl Into<String>, level: u8) -> Self {
        Self {
            name: name.into(),
            level,
            school: String::new(),
            description: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// How the creature casts a resolved spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpellPreparation {
    Prepared,
    AtWill,
    Innate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellUses {
    pub value: u32,
    pub max: u32,
    pub per: UsePeriod,
}

/// A resolved spell ready to embed on the creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellItem {
    pub spell: SpellStub,
    pub preparation: SpellPreparation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<SpellUses>,
}

impl SpellItem {
    /// Slot spells keep the catalog's level and are prepared; at-will and
    /// per-day spells become innate casting.
    pub fn from_usage(spell: SpellStub, usage: SpellUsage) -> Self {
        let (preparation, uses) = match usage {
            SpellUsage::Slot { .. } => (SpellPreparation::Prepared, None),
            SpellUsage::AtWill => (SpellPreparation::AtWill, None),
            SpellUsage::PerPeriod { count, period } => (
                SpellPreparation::Innate,
                Some(SpellUses {
                    value: count,
                    max: count,
                    per: period,
                }),
            ),
        };
        Self {
            spell,
            preparation,
            uses,
        }
    }
}

/// One embedded item of the creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "lowercase")]
pub enum ItemPayload {
    Action(ActionRecord),
    Spell(SpellItem),
}

impl ItemPayload {
    pub fn name(&self) -> &str {
        match self {
            ItemPayload::Action(action) => &action.name,
            ItemPayload::Spell(spell) => &spell.spell.name,
        }
    }
}

/// The creature and its embedded items, submitted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreaturePayload {
    pub record: CreatureRecord,
    pub items: Vec<ItemPayload>,
}

// ============================================================================
// Spell Catalog
// ============================================================================

/// Resolves spell names to catalog entries.
#[async_trait]
pub trait SpellCatalog: Send + Sync {
    /// `Ok(None)` is a plain miss; `Err` is a catalog-side failure.
    async fn resolve(&self, name: &str) -> Result<Option<SpellStub>, CatalogError>;
}

/// Catalog held in memory, matched case-insensitively on trimmed names.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpellCatalog {
    spells: HashMap<String, SpellStub>,
}

impl InMemorySpellCatalog {
    pub fn new(spells: impl IntoIterator<Item = SpellStub>) -> Self {
        let spells = spells
            .into_iter()
            .map(|spell| (catalog_key(&spell.name), spell))
            .collect();
        Self { spells }
    }

    /// Load a JSON array of spell entries.
    pub async fn from_json_file(path: &Path) -> Result<Self, ImportError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ImportError::io(path, e))?;
        let spells: Vec<SpellStub> =
            serde_json::from_str(&contents).map_err(|source| ImportError::CatalogLoad {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), count = spells.len(), "loaded spell catalog");
        Ok(Self::new(spells))
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

#[async_trait]
impl SpellCatalog for InMemorySpellCatalog {
    async fn resolve(&self, name: &str) -> Result<Option<SpellStub>, CatalogError> {
        Ok(self.spells.get(&catalog_key(name)).cloned())
    }
}

fn catalog_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// Entity Store
// ============================================================================

/// Accepts finished creatures. Returns the new entity's id.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create(&self, payload: CreaturePayload) -> Result<String, StoreError>;
}

/// Writes each creature as `<uuid>.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn create(&self, payload: CreaturePayload) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Write {
                path: self.dir.clone(),
                source,
            })?;

        let id = Uuid::new_v4().to_string();
        let path = self.dir.join(format!("{id}.json"));
        let body = serde_json::to_vec_pretty(&payload)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), items = payload.items.len(), "wrote creature");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_catalog_is_case_insensitive() {
        let catalog = InMemorySpellCatalog::new([SpellStub::new("Fire Bolt", 0)]);
        let hit = catalog.resolve("  fire BOLT ").await.unwrap();
        assert_eq!(hit.map(|s| s.name), Some("Fire Bolt".to_string()));
        assert_eq!(catalog.resolve("wish").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_catalog_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spells.json");
        std::fs::write(
            &path,
            r#"[{"name": "Shield", "level": 1, "school": "abj", "components": ["V", "S"]}]"#,
        )
        .unwrap();

        let catalog = InMemorySpellCatalog::from_json_file(&path).await.unwrap();
        assert_eq!(catalog.len(), 1);
        let shield = catalog.resolve("shield").await.unwrap().unwrap();
        assert_eq!(shield.level, 1);
        assert!(shield.extra.contains_key("components"));
    }

    #[tokio::test]
    async fn test_catalog_from_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spells.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            InMemorySpellCatalog::from_json_file(&path).await,
            Err(ImportError::CatalogLoad { .. })
        ));
    }

    #[test]
    fn test_spell_item_preparation() {
        let item = SpellItem::from_usage(SpellStub::new("Wish", 9), SpellUsage::PerPeriod {
            count: 1,
            period: UsePeriod::Day,
        });
        assert_eq!(item.preparation, SpellPreparation::Innate);
        assert_eq!(item.uses, Some(SpellUses { value: 1, max: 1, per: UsePeriod::Day }));

        let item = SpellItem::from_usage(SpellStub::new("Light", 0), SpellUsage::AtWill);
        assert_eq!(item.preparation, SpellPreparation::AtWill);
        assert!(item.uses.is_none());

        let json = serde_json::to_value(SpellItem::from_usage(
            SpellStub::new("Shield", 1),
            SpellUsage::Slot { level: 1 },
        ))
        .unwrap();
        assert_eq!(json["preparation"], "prepared");
        assert_eq!(json["spell"]["level"], 1);
    }
}
