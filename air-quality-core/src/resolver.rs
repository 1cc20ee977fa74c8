use std::sync::Arc;

use crate::{
    category::{AqiCategoryEntry, CategoryMapping},
    error::{AirQualityError, Result},
};

/// Translates between the labels a given index uses and the shared
/// normalized vocabulary.
///
/// Matching is exact and case-sensitive. A label the table does not know is
/// an error, never a default.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    mapping: Arc<CategoryMapping>,
}

impl CategoryResolver {
    pub fn new(mapping: Arc<CategoryMapping>) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &CategoryMapping {
        &self.mapping
    }

    pub fn normalize(&self, index_code: &str, raw_category: &str) -> Result<&str> {
        self.find(index_code, |e| e.original == raw_category, raw_category)
            .map(|e| e.normalized.as_str())
    }

    /// First original label (in table order) that maps to `normalized`.
    pub fn denormalize(&self, index_code: &str, normalized: &str) -> Result<&str> {
        self.find(index_code, |e| e.normalized == normalized, normalized)
            .map(|e| e.original.as_str())
    }

    fn find(
        &self,
        index_code: &str,
        pred: impl Fn(&AqiCategoryEntry) -> bool,
        category: &str,
    ) -> Result<&AqiCategoryEntry> {
        self.mapping.get(index_code)?.iter().find(|&e| pred(e)).ok_or_else(|| {
            AirQualityError::UnknownCategory {
                index: index_code.to_string(),
                category: category.to_string(),
            }
        })
    }
}
