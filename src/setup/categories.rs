// Default category seeding
//
// Seeds only into an empty category store. Any existing category, however
// few, suppresses seeding. Creation stops at the first failure; categories
// created before it are kept.

use super::{SetupStep, StepOutcome};
use crate::error::{Result, SetupError};
use crate::models::records::CategoryDef;
use crate::store::CategoryStore;
use crate::utils::path_resolver::DEFAULT_CATEGORIES_FILE;
use async_trait::async_trait;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BUNDLED_CATEGORIES: &str = include_str!("../../install/data/categories.json");

/// Where the default categories come from.
#[derive(Debug, Clone, Default)]
pub enum CategoryDataset {
    /// `install/data/categories.json`, compiled in
    #[default]
    Bundled,
    File(PathBuf),
}

impl CategoryDataset {
    /// The installation's own `install/data/categories.json` when it exists,
    /// otherwise the compiled-in copy.
    pub fn for_install_root(install_root: &Path) -> Self {
        let path = install_root.join(DEFAULT_CATEGORIES_FILE);
        if path.is_file() {
            CategoryDataset::File(path)
        } else {
            CategoryDataset::Bundled
        }
    }

    pub async fn load(&self) -> Result<Vec<CategoryDef>> {
        match self {
            CategoryDataset::Bundled => parse_dataset("bundled categories.json", BUNDLED_CATEGORIES),
            CategoryDataset::File(path) => {
                let origin = format!("{:?}", path);
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    SetupError::DatasetUnavailable {
                        origin: origin.clone(),
                        reason: e.to_string(),
                    }
                })?;
                parse_dataset(&origin, &text)
            }
        }
    }
}

fn parse_dataset(origin: &str, text: &str) -> Result<Vec<CategoryDef>> {
    serde_json::from_str(text).map_err(|e| SetupError::DatasetUnavailable {
        origin: origin.to_string(),
        reason: e.to_string(),
    })
}

pub struct DefaultDataSeeder {
    categories: Arc<dyn CategoryStore>,
    dataset: CategoryDataset,
}

impl DefaultDataSeeder {
    pub fn new(categories: Arc<dyn CategoryStore>, dataset: CategoryDataset) -> Self {
        Self {
            categories,
            dataset,
        }
    }

    pub async fn seed_if_empty(&self) -> Result<StepOutcome> {
        let existing = self
            .categories
            .get_all()
            .await
            .map_err(|e| SetupError::store("categories.get_all", e))?;

        if !existing.is_empty() {
            info!(
                "[PHASE: setup] [STEP: categories] Categories OK. Found {} categories.",
                existing.len()
            );
            return Ok(StepOutcome::Skipped(format!(
                "found {} existing categories",
                existing.len()
            )));
        }

        warn!("[PHASE: setup] [STEP: categories] No categories found, populating instance with default categories");
        let defs = self.dataset.load().await?;

        for (created, def) in defs.iter().enumerate() {
            if let Err(e) = self.categories.create(def).await {
                error!(
                    "[PHASE: setup] [STEP: categories] Could not set up categories: '{}' failed after {} created: {}",
                    def.name, created, e
                );
                return Err(SetupError::store(format!("categories.create({})", def.name), e));
            }
        }

        info!(
            "[PHASE: setup] [STEP: categories] Created {} default categories",
            defs.len()
        );
        Ok(StepOutcome::Completed(format!(
            "created {} default categories",
            defs.len()
        )))
    }
}

#[async_trait]
impl SetupStep for DefaultDataSeeder {
    fn name(&self) -> &'static str {
        "categories"
    }

    async fn run(&self) -> Result<StepOutcome> {
        self.seed_if_empty().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn bundled_dataset_parses_in_order() {
        let defs = CategoryDataset::Bundled.load().await.unwrap();
        assert!(!defs.is_empty());
        assert_eq!(defs[0].name, "Announcements");
        let orders: Vec<u32> = defs.iter().map(|d| d.order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
    }

    #[tokio::test]
    async fn empty_store_is_seeded_in_dataset_order() {
        let store = Arc::new(MemoryStore::new());
        let seeder = DefaultDataSeeder::new(store.clone(), CategoryDataset::Bundled);
        let outcome = seeder.seed_if_empty().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Completed(_)));

        let expected: Vec<String> = CategoryDataset::Bundled
            .load()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(store.category_names().await, expected);
    }

    #[tokio::test]
    async fn any_existing_category_suppresses_seeding() {
        for count in [1, 1000] {
            let store = Arc::new(MemoryStore::new());
            store.seed_categories(count).await;
            let seeder = DefaultDataSeeder::new(store.clone(), CategoryDataset::Bundled);
            let outcome = seeder.seed_if_empty().await.unwrap();
            assert!(matches!(outcome, StepOutcome::Skipped(_)));
            assert!(store.journal().await.is_empty(), "count={}", count);
        }
    }

    #[tokio::test]
    async fn first_failure_stops_and_keeps_earlier_categories() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on("categories.create:Feedback").await;
        let seeder = DefaultDataSeeder::new(store.clone(), CategoryDataset::Bundled);

        let err = seeder.seed_if_empty().await.unwrap_err();
        assert!(matches!(err, SetupError::StoreUnavailable { .. }));
        assert_eq!(
            store.category_names().await,
            vec!["Announcements", "General Discussion"]
        );
    }

    #[tokio::test]
    async fn missing_dataset_file_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let seeder = DefaultDataSeeder::new(
            store.clone(),
            CategoryDataset::File(PathBuf::from("/nonexistent/categories.json")),
        );
        let err = seeder.seed_if_empty().await.unwrap_err();
        assert!(matches!(err, SetupError::DatasetUnavailable { .. }));
    }

    #[tokio::test]
    async fn install_root_dataset_is_preferred_when_present() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CategoryDataset::for_install_root(dir.path()),
            CategoryDataset::Bundled
        ));

        let path = dir.path().join(DEFAULT_CATEGORIES_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"[{"name": "Local"}]"#).unwrap();

        let dataset = CategoryDataset::for_install_root(dir.path());
        assert!(matches!(dataset, CategoryDataset::File(ref p) if p == &path));
        let defs = dataset.load().await.unwrap();
        assert_eq!(defs[0].name, "Local");
    }

    #[tokio::test]
    async fn dataset_file_overrides_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"[{"name": "Only One"}]"#).unwrap();

        let store = Arc::new(MemoryStore::new());
        let seeder = DefaultDataSeeder::new(store.clone(), CategoryDataset::File(path));
        seeder.seed_if_empty().await.unwrap();
        assert_eq!(store.category_names().await, vec!["Only One"]);
    }
}
