//! # In-memory store
//!
//! A table-shaped store behind a `tokio` lock. It enforces the same
//! constraints as the SQL schema (unique columns, foreign keys, image
//! cascade) so services behave identically on either backend.
//!
//! A commit works on a copy of the tables and swaps it in only when every
//! staged change applied cleanly.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Advert, AdvertId, AdvertParts, AdvertRepository, Application, ApplicationId,
    ApplicationRepository, Category, CategoryId, CategoryRepository, Change, ChangeSet,
    CommitReceipt, Image, ImageId, RepositoryError, UnitOfWork,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct AdvertRow {
    date: DateTime<Utc>,
    title: String,
    author: String,
    content: String,
    published: bool,
    image_id: Option<ImageId>,
    updated_at: Option<DateTime<Utc>>,
    application_count: u32,
    slug: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    adverts: BTreeMap<AdvertId, AdvertRow>,
    images: BTreeMap<ImageId, Image>,
    categories: BTreeMap<CategoryId, Category>,
    advert_categories: BTreeSet<(AdvertId, CategoryId)>,
    applications: BTreeMap<ApplicationId, Application>,
    next_advert: i64,
    next_image: i64,
    next_category: i64,
}

/// Which relations to load alongside an advert row.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Depth {
    Listing,
    Full,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored image records, orphans included.
    pub async fn image_count(&self) -> usize {
        self.tables.read().await.images.len()
    }
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

fn missing(entity: &str, id: impl ToString) -> RepositoryError {
    RepositoryError::Missing {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

impl Tables {
    fn hydrate(&self, id: AdvertId, row: &AdvertRow, depth: Depth) -> Advert {
        let image = row.image_id.and_then(|iid| self.images.get(&iid).cloned());
        let mut categories: Vec<Category> = self
            .advert_categories
            .range((id, CategoryId(i64::MIN))..=(id, CategoryId(i64::MAX)))
            .filter_map(|(_, cid)| self.categories.get(cid).cloned())
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        let applications = match depth {
            Depth::Full => self.applications_of(id),
            Depth::Listing => Vec::new(),
        };

        Advert::restore(AdvertParts {
            id,
            date: row.date,
            title: row.title.clone(),
            author: row.author.clone(),
            content: row.content.clone(),
            published: row.published,
            image,
            categories,
            applications,
            updated_at: row.updated_at,
            application_count: row.application_count,
            slug: row.slug.clone(),
        })
    }

    fn applications_of(&self, advert: AdvertId) -> Vec<Application> {
        self.applications
            .values()
            .filter(|a| a.advert() == Some(advert))
            .cloned()
            .collect()
    }

    fn find_where(&self, matches: impl Fn(&AdvertRow) -> bool) -> Option<Advert> {
        self.adverts
            .iter()
            .find(|(_, row)| matches(row))
            .map(|(id, row)| self.hydrate(*id, row, Depth::Listing))
    }

    fn apply(&mut self, change: Change, receipt: &mut CommitReceipt) -> Result<(), RepositoryError> {
        match change {
            Change::SaveAdvert(advert) => {
                let id = self.save_advert(*advert)?;
                receipt.adverts.push(id);
            }
            Change::RemoveAdvert(id) => self.remove_advert(id)?,
            Change::SaveApplication(application) => self.save_application(application)?,
            Change::RemoveApplication(id) => {
                self.applications
                    .remove(&id)
                    .ok_or_else(|| missing("Application", id))?;
            }
            Change::SaveCategory(category) => {
                let id = self.save_category(category)?;
                receipt.categories.push(id);
            }
        }
        Ok(())
    }

    fn check_unique(&self, id: Option<AdvertId>, advert: &Advert) -> Result<(), RepositoryError> {
        for (other, row) in &self.adverts {
            if Some(*other) == id {
                continue;
            }
            let column = if row.title == advert.title() {
                "title"
            } else if row.author == advert.author() {
                "author"
            } else if row.slug == advert.slug() {
                "slug"
            } else {
                continue;
            };
            return Err(RepositoryError::UniqueViolation {
                column: column.to_string(),
            });
        }
        Ok(())
    }

    fn save_advert(&mut self, advert: Advert) -> Result<AdvertId, RepositoryError> {
        let previous_image = match advert.id() {
            Some(id) => {
                let row = self.adverts.get(&id).ok_or_else(|| missing("Advert", id))?;
                row.image_id
            }
            None => None,
        };
        self.check_unique(advert.id(), &advert)?;

        let category_ids = advert
            .categories()
            .iter()
            .map(|c| match c.id {
                Some(cid) if self.categories.contains_key(&cid) => Ok(cid),
                _ => Err(RepositoryError::ForeignKeyViolation(format!(
                    "category `{}` is not stored",
                    c.name
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let id = match advert.id() {
            Some(id) => id,
            None => AdvertId(bump(&mut self.next_advert)),
        };

        let image_id = match advert.image() {
            Some(image) => Some(self.save_image(image.clone())),
            None => None,
        };
        if let Some(old) = previous_image.filter(|old| Some(*old) != image_id) {
            self.images.remove(&old);
        }

        self.advert_categories.retain(|(aid, _)| *aid != id);
        self.advert_categories
            .extend(category_ids.into_iter().map(|cid| (id, cid)));

        self.adverts.insert(
            id,
            AdvertRow {
                date: advert.date(),
                title: advert.title().to_string(),
                author: advert.author().to_string(),
                content: advert.content().to_string(),
                published: advert.published(),
                image_id,
                updated_at: advert.updated_at(),
                application_count: advert.application_count(),
                slug: advert.slug().to_string(),
            },
        );
        Ok(id)
    }

    fn save_image(&mut self, mut image: Image) -> ImageId {
        let id = match image.id.filter(|iid| self.images.contains_key(iid)) {
            Some(iid) => iid,
            None => ImageId(bump(&mut self.next_image)),
        };
        image.id = Some(id);
        self.images.insert(id, image);
        id
    }

    fn remove_advert(&mut self, id: AdvertId) -> Result<(), RepositoryError> {
        if !self.adverts.contains_key(&id) {
            return Err(missing("Advert", id));
        }
        let referencing = self
            .applications
            .values()
            .filter(|a| a.advert() == Some(id))
            .count();
        if referencing > 0 {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "advert {id} is referenced by {referencing} application(s)"
            )));
        }

        if let Some(row) = self.adverts.remove(&id) {
            if let Some(image_id) = row.image_id {
                self.images.remove(&image_id);
            }
        }
        self.advert_categories.retain(|(aid, _)| *aid != id);
        Ok(())
    }

    fn save_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        match application.advert() {
            Some(advert) if self.adverts.contains_key(&advert) => {
                self.applications.insert(application.id(), application);
                Ok(())
            }
            Some(advert) => Err(RepositoryError::ForeignKeyViolation(format!(
                "advert {advert} does not exist"
            ))),
            None => Err(RepositoryError::ForeignKeyViolation(
                "application is not attached to an advert".into(),
            )),
        }
    }

    fn save_category(&mut self, mut category: Category) -> Result<CategoryId, RepositoryError> {
        let id = match category.id {
            Some(id) if self.categories.contains_key(&id) => id,
            Some(id) => return Err(missing("Category", id)),
            None => CategoryId(bump(&mut self.next_category)),
        };
        category.id = Some(id);
        self.categories.insert(id, category);
        Ok(id)
    }
}

#[async_trait]
impl AdvertRepository for InMemoryStore {
    async fn find(&self, id: AdvertId) -> Result<Option<Advert>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .adverts
            .get(&id)
            .map(|row| tables.hydrate(id, row, Depth::Full)))
    }

    async fn find_all(&self) -> Result<Vec<Advert>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .adverts
            .iter()
            .map(|(id, row)| tables.hydrate(*id, row, Depth::Listing))
            .collect())
    }

    async fn find_ordered_by_date_desc(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Advert>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<_> = tables.adverts.iter().collect();
        rows.sort_by(|(a_id, a), (b_id, b)| b.date.cmp(&a.date).then(b_id.cmp(a_id)));
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(id, row)| tables.hydrate(*id, row, Depth::Listing))
            .collect())
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        Ok(self.tables.read().await.adverts.len() as u64)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Advert>, RepositoryError> {
        Ok(self.tables.read().await.find_where(|row| row.title == title))
    }

    async fn find_by_author(&self, author: &str) -> Result<Option<Advert>, RepositoryError> {
        Ok(self.tables.read().await.find_where(|row| row.author == author))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Advert>, RepositoryError> {
        Ok(self.tables.read().await.find_where(|row| row.slug == slug))
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryStore {
    async fn find(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn find_by_advert(&self, advert: AdvertId) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.tables.read().await.applications_of(advert))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> =
            self.tables.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, RepositoryError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let mut receipt = CommitReceipt::default();
        let count = changes.len();

        for change in changes.into_changes() {
            if let Err(e) = staged.apply(change, &mut receipt) {
                debug!(error = %e, "commit rolled back");
                return Err(e);
            }
        }

        *tables = staged;
        debug!(changes = count, "commit applied");
        Ok(receipt)
    }
}
