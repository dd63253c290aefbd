use std::sync::Arc;

use domains::{Category, CategoryId, ChangeSet, Result, UnitOfWork};
use tracing::info;

/// The categories a fresh board starts with.
pub const CATEGORY_NAMES: [&str; 5] = [
    "Développement web",
    "Développement mobile",
    "Graphisme",
    "Intégration",
    "Réseau",
];

/// Loads the starting categories. Running it twice stores them twice.
pub struct CategorySeeder {
    unit_of_work: Arc<dyn UnitOfWork>,
}

impl CategorySeeder {
    pub fn new(unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        Self { unit_of_work }
    }

    pub async fn seed(&self) -> Result<Vec<CategoryId>> {
        let mut changes = ChangeSet::new();
        for name in CATEGORY_NAMES {
            changes.save_category(Category::new(name));
        }
        let receipt = self.unit_of_work.commit(changes).await?;
        info!(count = receipt.categories.len(), "categories seeded");
        Ok(receipt.categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Change, CommitReceipt, MockUnitOfWork};

    #[tokio::test]
    async fn seeds_every_category_in_one_commit() {
        let mut unit_of_work = MockUnitOfWork::new();
        unit_of_work
            .expect_commit()
            .withf(|changes| {
                let names: Vec<&str> = changes
                    .changes()
                    .iter()
                    .filter_map(|c| match c {
                        Change::SaveCategory(category) if category.id.is_none() => {
                            Some(category.name.as_str())
                        }
                        _ => None,
                    })
                    .collect();
                names == CATEGORY_NAMES
            })
            .times(1)
            .returning(|_| {
                Ok(CommitReceipt {
                    adverts: Vec::new(),
                    categories: (1..=5).map(CategoryId).collect(),
                })
            });

        let ids = CategorySeeder::new(Arc::new(unit_of_work)).seed().await.unwrap();
        assert_eq!(ids.len(), 5);
    }
}
