//! # Ports
//!
//! Any adapter must implement these traits to be used by the binary.
//! Reads go through the repositories; every write is staged in a
//! [`ChangeSet`] and applied atomically by [`UnitOfWork::commit`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::advert::Advert;
use crate::error::AppError;
use crate::identity::{Capability, Identity};
use crate::models::{AdvertId, Application, ApplicationId, Category, CategoryId};

/// Failures reported by storage adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A unique column already holds this value.
    #[error("duplicate value for unique column `{column}`")]
    UniqueViolation { column: String },

    /// A referenced row is missing, or a row is still referenced.
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A row targeted by an update or delete does not exist.
    #[error("{entity} {id} does not exist")]
    Missing { entity: String, id: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation { .. } | RepositoryError::ForeignKeyViolation(_) => {
                AppError::Conflict(err.to_string())
            }
            RepositoryError::Missing { entity, id } => AppError::NotFound(entity, id),
            RepositoryError::Backend(message) => AppError::Internal(message),
        }
    }
}

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Inserts or updates the advert, its image, its category links and any
    /// of its applications not stored yet.
    SaveAdvert(Box<Advert>),
    /// Deletes the advert and its image. Fails while applications reference it.
    RemoveAdvert(AdvertId),
    SaveApplication(Application),
    RemoveApplication(ApplicationId),
    SaveCategory(Category),
}

/// Writes staged for a single atomic commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_advert(&mut self, advert: Advert) -> &mut Self {
        self.changes.push(Change::SaveAdvert(Box::new(advert)));
        self
    }

    pub fn remove_advert(&mut self, id: AdvertId) -> &mut Self {
        self.changes.push(Change::RemoveAdvert(id));
        self
    }

    pub fn save_application(&mut self, application: Application) -> &mut Self {
        self.changes.push(Change::SaveApplication(application));
        self
    }

    pub fn remove_application(&mut self, id: ApplicationId) -> &mut Self {
        self.changes.push(Change::RemoveApplication(id));
        self
    }

    pub fn save_category(&mut self, category: Category) -> &mut Self {
        self.changes.push(Change::SaveCategory(category));
        self
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Ids assigned during a commit, in staging order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub adverts: Vec<AdvertId>,
    pub categories: Vec<CategoryId>,
}

/// Advert queries. Listing queries eager-load image and categories;
/// [`find`](AdvertRepository::find) also loads the applications.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AdvertRepository: Send + Sync {
    async fn find(&self, id: AdvertId) -> Result<Option<Advert>, RepositoryError>;
    async fn find_all(&self) -> Result<Vec<Advert>, RepositoryError>;
    /// Newest first; equal dates are ordered by descending id.
    async fn find_ordered_by_date_desc(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Advert>, RepositoryError>;
    async fn count_all(&self) -> Result<u64, RepositoryError>;
    async fn find_by_title(&self, title: &str) -> Result<Option<Advert>, RepositoryError>;
    async fn find_by_author(&self, author: &str) -> Result<Option<Advert>, RepositoryError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Advert>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn find(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    async fn find_by_advert(&self, advert: AdvertId) -> Result<Vec<Application>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Ordered by name.
    async fn find_all(&self) -> Result<Vec<Category>, RepositoryError>;
}

/// Applies a [`ChangeSet`] atomically: either every change becomes visible
/// or none does.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, RepositoryError>;
}

/// Last submission time per author, backing the antiflood rule.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SubmissionLog: Send + Sync {
    async fn last_submission_at(&self, author: &str) -> Option<DateTime<Utc>>;
    async fn record(&self, author: &str, at: DateTime<Utc>);
}

/// A plain-text notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("mail transport failed: {0}")]
pub struct TransportError(pub String);

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError>;
}

/// Capability checks, evaluated before any business logic runs.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AccessControl: Send + Sync {
    fn is_granted(&self, identity: &Identity, capability: Capability) -> bool;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_set_keeps_staging_order() {
        let mut changes = ChangeSet::new();
        changes
            .save_category(Category::new("Graphisme"))
            .remove_advert(AdvertId(3));
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes.changes()[1], Change::RemoveAdvert(AdvertId(3))));
    }

    #[test]
    fn repository_errors_map_to_app_errors() {
        let conflict: AppError = RepositoryError::UniqueViolation {
            column: "title".into(),
        }
        .into();
        assert!(matches!(conflict, AppError::Conflict(_)));

        let missing: AppError = RepositoryError::Missing {
            entity: "Advert".into(),
            id: "4".into(),
        }
        .into();
        assert!(missing.is_not_found());
    }
}
