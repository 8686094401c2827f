//! Extension-to-category lookup.
//!
//! The table starts from the built-in extension lists and can be overridden
//! per category from a TOML file:
//!
//! ```toml
//! [categories]
//! image = ["jpg", "png", "avif"]
//! document = ["pdf", "epub"]
//! ```
//!
//! A category listed in the file replaces its built-in list entirely. When two
//! categories claim the same extension, the one earlier in [`Category::ALL`]
//! wins.

use crate::classify::category::Category;
use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Raw per-category extension lists as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryOverrides {
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl CategoryOverrides {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| TidyError::Config(format!("Failed to parse category table: {}", e)))
    }
}

/// Resolved lookup table. Keys are lowercase extensions without the dot.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    lists: BTreeMap<Category, Vec<String>>,
    lookup: HashMap<String, Category>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        let lists = Category::ALL
            .iter()
            .map(|c| {
                let exts = c.default_extensions().iter().map(|e| e.to_string()).collect();
                (*c, exts)
            })
            .collect();
        Self::from_lists(lists)
    }
}

impl ExtensionTable {
    pub fn with_overrides(overrides: &CategoryOverrides) -> Result<Self> {
        let mut table = Self::default();
        let mut lists = std::mem::take(&mut table.lists);

        for (name, extensions) in &overrides.categories {
            let category = Category::from_str(name)?;
            if category == Category::Misc && !extensions.is_empty() {
                return Err(TidyError::Config(
                    "The misc category cannot list extensions".to_string(),
                ));
            }
            let normalized = extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
            lists.insert(category, normalized);
        }

        Ok(Self::from_lists(lists))
    }

    fn from_lists(lists: BTreeMap<Category, Vec<String>>) -> Self {
        let mut lookup = HashMap::new();
        for category in Category::ALL {
            if let Some(exts) = lists.get(&category) {
                for ext in exts {
                    lookup.entry(ext.clone()).or_insert(category);
                }
            }
        }
        Self { lists, lookup }
    }

    /// Unmatched extensions map to [`Category::Misc`].
    pub fn classify(&self, extension: &str) -> Category {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.lookup.get(&ext).copied().unwrap_or(Category::Misc)
    }

    pub fn extensions(&self, category: Category) -> &[String] {
        self.lists.get(&category).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Holds the current table; a reload swaps it wholesale.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: ExtensionTable,
}

impl Classifier {
    pub fn new(table: ExtensionTable) -> Self {
        Self { table }
    }

    /// Falls back to the built-in table when `path` does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => {
                let overrides = CategoryOverrides::from_file(p)?;
                Ok(Self::new(ExtensionTable::with_overrides(&overrides)?))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn reload(&mut self, table: ExtensionTable) {
        self.table = table;
    }

    pub fn table(&self) -> &ExtensionTable {
        &self.table
    }

    pub fn classify(&self, extension: &str) -> Category {
        self.table.classify(extension)
    }
}
