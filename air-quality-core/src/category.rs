//! Registry of per-country severity bands.
//!
//! A [`CategoryMapping`] is an immutable table built once (normally from the
//! bundled dataset via [`CategoryMapping::builtin`]) and shared by reference
//! or `Arc` with everything that needs to resolve categories.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AirQualityError, Result};

const BUILTIN_TABLE: &str = include_str!("../data/aqi_categories.toml");

/// One country-specific label and the shared category it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AqiCategoryEntry {
    pub original: String,
    pub normalized: String,
}

impl AqiCategoryEntry {
    pub fn new(original: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            normalized: normalized.into(),
        }
    }
}

/// Everything known about one index code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub code: String,
    pub display_name: String,

    /// Regions in which this index may be requested as a custom local AQI.
    /// Empty means unrestricted.
    #[serde(default)]
    pub regions: Vec<String>,

    /// Pollutant codes the service can report alongside this index.
    #[serde(default)]
    pub pollutants: Vec<String>,

    /// Ordered from least to most severe.
    pub categories: Vec<AqiCategoryEntry>,
}

impl IndexDefinition {
    pub fn supports_region(&self, region_code: &str) -> bool {
        self.regions.is_empty()
            || self
                .regions
                .iter()
                .any(|r| r.eq_ignore_ascii_case(region_code))
    }
}

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(rename = "index", default)]
    indexes: Vec<IndexDefinition>,
}

/// Index code -> ordered severity bands.
#[derive(Debug, Clone)]
pub struct CategoryMapping {
    indexes: Vec<IndexDefinition>,
    by_code: HashMap<String, usize>,
}

impl CategoryMapping {
    /// Build a table from definitions, checking that codes are unique, every
    /// index has at least one category, and `original` labels are unique
    /// within an index.
    pub fn from_definitions(indexes: Vec<IndexDefinition>) -> Result<Self> {
        let mut by_code = HashMap::with_capacity(indexes.len());

        for (pos, def) in indexes.iter().enumerate() {
            if def.code.is_empty() {
                return Err(AirQualityError::InvalidCategoryTable(format!(
                    "index #{pos} has an empty code"
                )));
            }
            if by_code.insert(def.code.clone(), pos).is_some() {
                return Err(AirQualityError::InvalidCategoryTable(format!(
                    "index '{}' is defined more than once",
                    def.code
                )));
            }
            if def.categories.is_empty() {
                return Err(AirQualityError::InvalidCategoryTable(format!(
                    "index '{}' has no categories",
                    def.code
                )));
            }

            let mut seen = HashSet::new();
            for entry in &def.categories {
                if !seen.insert(entry.original.as_str()) {
                    return Err(AirQualityError::InvalidCategoryTable(format!(
                        "index '{}' lists category '{}' more than once",
                        def.code, entry.original
                    )));
                }
            }
        }

        Ok(Self { indexes, by_code })
    }

    /// Parse a dataset in the bundled TOML format.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let dataset: Dataset = toml::from_str(contents)
            .map_err(|e| AirQualityError::InvalidCategoryTable(e.to_string()))?;
        Self::from_definitions(dataset.indexes)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AirQualityError::InvalidCategoryTable(format!("{}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// The table shipped with the library.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    pub fn get(&self, index_code: &str) -> Result<&[AqiCategoryEntry]> {
        self.index(index_code).map(|def| def.categories.as_slice())
    }

    pub fn index(&self, index_code: &str) -> Result<&IndexDefinition> {
        self.lookup(index_code)
            .ok_or_else(|| AirQualityError::UnknownIndex(index_code.to_string()))
    }

    pub(crate) fn lookup(&self, index_code: &str) -> Option<&IndexDefinition> {
        self.by_code.get(index_code).map(|&pos| &self.indexes[pos])
    }

    pub fn contains(&self, index_code: &str) -> bool {
        self.by_code.contains_key(index_code)
    }

    /// All entries of all indexes, in table order.
    ///
    /// The same `normalized` value appears once per index that uses it;
    /// deduplication is left to the caller.
    pub fn get_all(&self) -> impl Iterator<Item = &AqiCategoryEntry> + '_ {
        self.indexes.iter().flat_map(|def| def.categories.iter())
    }

    pub fn get_all_index_codes(&self) -> BTreeSet<&str> {
        self.indexes.iter().map(|def| def.code.as_str()).collect()
    }

    pub fn definitions(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Position of the first band with this normalized value, counted from
    /// the least severe.
    pub fn severity(&self, index_code: &str, normalized: &str) -> Result<usize> {
        self.get(index_code)?
            .iter()
            .position(|e| e.normalized == normalized)
            .ok_or_else(|| AirQualityError::UnknownCategory {
                index: index_code.to_string(),
                category: normalized.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
