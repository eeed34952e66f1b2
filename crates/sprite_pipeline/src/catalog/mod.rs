//! # Catalog Walker
//!
//! Enumerates the models of a category from the source tree and resolves the
//! paths every later stage works with:
//!
//! ```text
//! models/<category>/<id>/<id>.<ext>        source artifact
//! sprites/<category>/<id>/<label>.png      rendered output
//! static/img/sprites/<category>/<id>       published alias
//! ```
//!
//! Model identifiers are the names of the immediate subdirectories of
//! `models/<category>/`, returned in lexicographic order so runs (and their
//! logs) are reproducible.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::core::config::ResolvedLayout;
use crate::error::FilesystemError;

/// Named bucket of the model catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelCategory(String);

impl ModelCategory {
    /// Create a category from its directory name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Directory name of the category
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a model, unique within its category
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelId(String);

impl ModelId {
    /// Create an identifier from its directory name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Directory name of the model
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every path the pipeline touches for one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    /// Category the model belongs to
    pub category: ModelCategory,
    /// Model identifier
    pub id: ModelId,
    /// `models/<category>/<id>/<id>.<ext>`
    pub source_artifact: PathBuf,
    /// `sprites/<category>/<id>`
    pub output_dir: PathBuf,
    /// `sprites/<category>/.<id>.staging`, where a render lands before it is swapped in
    pub staging_dir: PathBuf,
    /// `static/img/sprites/<category>/<id>`
    pub alias_path: PathBuf,
}

/// Walks the source catalog of a resolved layout
#[derive(Debug, Clone)]
pub struct CatalogWalker {
    layout: ResolvedLayout,
}

impl CatalogWalker {
    /// Create a walker over `layout`
    pub fn new(layout: ResolvedLayout) -> Self {
        Self { layout }
    }

    /// Layout the walker resolves paths against
    pub fn layout(&self) -> &ResolvedLayout {
        &self.layout
    }

    /// Directory holding the models of `category`
    pub fn category_dir(&self, category: &ModelCategory) -> PathBuf {
        self.layout.models_root.join(category.as_str())
    }

    /// List the models of `category`, sorted lexicographically
    ///
    /// Only directories count; stray files and hidden entries next to the
    /// model directories are ignored. A missing category directory is an
    /// error, since nothing could be rendered or published for it.
    pub fn list_models(&self, category: &ModelCategory) -> Result<Vec<ModelId>, FilesystemError> {
        let dir = self.category_dir(category);
        if !dir.is_dir() {
            return Err(FilesystemError::MissingDirectory(dir));
        }

        let entries = fs::read_dir(&dir).map_err(|e| FilesystemError::io("list", &dir, e))?;

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FilesystemError::io("list", &dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                // Hidden entries include the pipeline's own staging directories
                Ok(name) if name.starts_with('.') => {
                    log::debug!("Skipping hidden entry '{}'", path.display());
                }
                Ok(name) => models.push(ModelId::new(name)),
                Err(name) => {
                    log::warn!("Skipping model directory with non UTF-8 name: {:?}", name);
                }
            }
        }

        models.sort();
        log::debug!("Category '{}': {} models", category, models.len());
        Ok(models)
    }

    /// Resolve every path of one model
    pub fn model_entry(&self, category: &ModelCategory, id: &ModelId) -> ModelEntry {
        let source_artifact = self
            .layout
            .models_root
            .join(category.as_str())
            .join(id.as_str())
            .join(format!("{}.{}", id, self.layout.source_extension));
        let sprites_category = self.layout.sprites_root.join(category.as_str());

        ModelEntry {
            category: category.clone(),
            id: id.clone(),
            source_artifact,
            output_dir: sprites_category.join(id.as_str()),
            staging_dir: sprites_category.join(format!(".{}.staging", id)),
            alias_path: self.layout.publish_root.join(category.as_str()).join(id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LayoutConfig;
    use std::path::Path;

    fn walker(root: &Path) -> CatalogWalker {
        CatalogWalker::new(LayoutConfig::default().resolve(root))
    }

    #[test]
    fn test_lists_sorted_directories_only() {
        let root = tempfile::tempdir().unwrap();
        let items = root.path().join("models/items");
        for name in ["sword", "axe_old", "axe", "Zeppelin"] {
            fs::create_dir_all(items.join(name)).unwrap();
        }
        fs::write(items.join("README.txt"), "not a model").unwrap();

        let walker = walker(root.path());
        let category = ModelCategory::new("items");
        let models = walker.list_models(&category).unwrap();

        let names: Vec<&str> = models.iter().map(ModelId::as_str).collect();
        assert_eq!(names, vec!["Zeppelin", "axe", "axe_old", "sword"]);

        // Repeated calls see the same order
        assert_eq!(walker.list_models(&category).unwrap(), models);
    }

    #[test]
    fn test_hidden_directories_are_not_models() {
        let root = tempfile::tempdir().unwrap();
        let items = root.path().join("models/items");
        for name in ["axe", ".axe.staging", ".git"] {
            fs::create_dir_all(items.join(name)).unwrap();
        }

        let models = walker(root.path()).list_models(&ModelCategory::new("items")).unwrap();
        assert_eq!(models, vec![ModelId::new("axe")]);
    }

    #[test]
    fn test_missing_category_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let result = walker(root.path()).list_models(&ModelCategory::new("organisms"));
        assert!(matches!(result, Err(FilesystemError::MissingDirectory(_))));
    }

    #[test]
    fn test_empty_category_lists_nothing() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("models/structures")).unwrap();
        let models = walker(root.path())
            .list_models(&ModelCategory::new("structures"))
            .unwrap();
        assert!(models.is_empty());
    }

    #[test]
    fn test_model_entry_paths() {
        let walker = walker(Path::new("/project"));
        let entry = walker.model_entry(&ModelCategory::new("items"), &ModelId::new("axe"));

        assert_eq!(entry.source_artifact, PathBuf::from("/project/models/items/axe/axe.blend"));
        assert_eq!(entry.output_dir, PathBuf::from("/project/sprites/items/axe"));
        assert_eq!(entry.staging_dir, PathBuf::from("/project/sprites/items/.axe.staging"));
        assert_eq!(entry.alias_path, PathBuf::from("/project/static/img/sprites/items/axe"));
    }
}
