/*! Sensitive-API catalog.
 *
 * The catalog ships as JSON: categories, each with fine-grained subcategories, each listing the
 * signatures it covers. Loading flattens that hierarchy into one immutable signature-to-metadata
 * map that every slicing run shares.
 */

use std::fs;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ir::Stmt;
use crate::sig::Signature;
use crate::{PdgError, Result};

/// Metadata attached to one sensitive signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub category: String,
    pub subcategory: String,
    /// Short code used in node labels and report tables.
    pub short_code: String,
}

/// One catalog category as serialized on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCategory {
    #[serde(rename = "categoryName")]
    pub category_name: String,
    #[serde(rename = "fine-grainedType")]
    pub subcategories: Vec<ApiSubcategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSubcategory {
    #[serde(rename = "subcategoryName")]
    pub subcategory_name: String,
    #[serde(rename = "short")]
    pub short_code: String,
    #[serde(rename = "apiNames")]
    pub api_names: Vec<String>,
}

/// Flattened signature lookup. The first catalog entry naming a signature wins; later
/// duplicates are ignored.
#[derive(Debug, Clone, Default)]
pub struct ApiCatalog {
    entries: IndexMap<Signature, ApiInfo>,
}

impl ApiCatalog {
    pub fn from_categories(categories: Vec<ApiCategory>) -> Result<ApiCatalog> {
        let mut entries = IndexMap::new();
        for category in categories {
            let category_name = category.category_name;
            for sub in category.subcategories {
                for name in sub.api_names {
                    let sig = Signature::parse(&name)?;
                    entries.entry(sig).or_insert_with(|| ApiInfo {
                        category: category_name.clone(),
                        subcategory: sub.subcategory_name.clone(),
                        short_code: sub.short_code.clone(),
                    });
                }
            }
        }
        Ok(ApiCatalog { entries })
    }

    pub fn from_json(json: &str) -> Result<ApiCatalog> {
        let categories: Vec<ApiCategory> =
            serde_json::from_str(json).map_err(|e| PdgError::Catalog(e.to_string()))?;
        ApiCatalog::from_categories(categories)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<ApiCatalog> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let catalog = ApiCatalog::from_json(&json)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        Ok(catalog)
    }

    pub fn is_sensitive(&self, sig: &Signature) -> bool {
        self.entries.contains_key(sig)
    }

    pub fn info(&self, sig: &Signature) -> Option<&ApiInfo> {
        self.entries.get(sig)
    }

    /// Catalog metadata for a statement, when it is a sensitive call site.
    pub fn match_stmt(&self, stmt: &Stmt) -> Option<&ApiInfo> {
        let call = stmt.call_expr()?;
        self.info(call.resolved_target())
    }

    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"[
        {
            "categoryName": "Database",
            "fine-grainedType": [
                {
                    "subcategoryName": "SQL execution",
                    "short": "sql",
                    "apiNames": [
                        "<java.sql.Statement: executeQuery(java.lang.String)>",
                        "<java.sql.Statement: execute(java.lang.String)>"
                    ]
                }
            ]
        },
        {
            "categoryName": "Filesystem",
            "fine-grainedType": [
                {
                    "subcategoryName": "File read",
                    "short": "fread",
                    "apiNames": [
                        "<java.io.FileInputStream: read()>",
                        "<java.sql.Statement: executeQuery(java.lang.String)>"
                    ]
                }
            ]
        }
    ]"#;

    #[test]
    fn flattens_categories() {
        let catalog = ApiCatalog::from_json(CATALOG).expect("catalog parses");
        assert_eq!(catalog.len(), 3);
        let sig = Signature::parse("<java.io.FileInputStream: read()>").expect("parses");
        let info = catalog.info(&sig).expect("present");
        assert_eq!(info.category, "Filesystem");
        assert_eq!(info.short_code, "fread");
    }

    #[test]
    fn first_entry_wins_on_duplicates() {
        let catalog = ApiCatalog::from_json(CATALOG).expect("catalog parses");
        let sig = Signature::parse("<java.sql.Statement: executeQuery(java.lang.String)>")
            .expect("parses");
        let info = catalog.info(&sig).expect("present");
        assert_eq!(info.category, "Database");
        assert_eq!(info.short_code, "sql");
    }

    #[test]
    fn unknown_signature_is_not_sensitive() {
        let catalog = ApiCatalog::from_json(CATALOG).expect("catalog parses");
        let sig = Signature::parse("<com.app.Main: main()>").expect("parses");
        assert!(!catalog.is_sensitive(&sig));
    }

    #[test]
    fn bad_json_is_rejected() {
        assert!(ApiCatalog::from_json("{not json").is_err());
    }

    #[test]
    fn loads_catalog_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = ApiCatalog::load(&path).expect("loads");
        assert_eq!(catalog.len(), 3);
        assert!(ApiCatalog::load(dir.path().join("missing.json")).is_err());
    }
}
