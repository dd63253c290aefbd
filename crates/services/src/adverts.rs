//! # Advert use-cases
//!
//! Listing, viewing, creating, editing and deleting adverts. Every write is
//! checked (access, binding, validation) before anything is staged, so a
//! rejected request never reaches the commit.

use std::collections::BTreeSet;

use domains::form::{self, AdvertSubmission};
use domains::slug;
use domains::validation::{self, Antiflood, Uniqueness, ValidationContext};
use domains::{
    Advert, AdvertId, AppError, Application, Capability, Category, ChangeSet, Field, FieldError,
    Identity, Page, Pagination, Result,
};
use tracing::{debug, info};

use crate::Ports;

/// Slug suffixes tried before giving up and letting validation report the
/// collision.
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// An advert with the applications submitted to it.
#[derive(Debug, Clone)]
pub struct AdvertDetails {
    pub advert: Advert,
    pub applications: Vec<Application>,
}

/// Everything needed to render the add/edit form.
#[derive(Debug, Clone)]
pub struct AdvertForm {
    pub advert_id: Option<AdvertId>,
    pub fields: BTreeSet<Field>,
    pub values: AdvertSubmission,
    pub errors: Vec<FieldError>,
    pub choices: Vec<Category>,
}

impl AdvertForm {
    pub fn shows(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Re-presents the form with what the user typed and why it was refused.
    pub fn rejected(mut self, values: AdvertSubmission, errors: Vec<FieldError>) -> Self {
        self.values = values;
        self.errors = errors;
        self
    }

    pub fn errors_for(&self, field: Field) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().filter(move |e| e.field == field)
    }
}

#[derive(Clone)]
pub struct AdvertService {
    ports: Ports,
    antiflood: Antiflood,
}

impl AdvertService {
    pub fn new(ports: Ports, antiflood: Antiflood) -> Self {
        Self { ports, antiflood }
    }

    /// One page of adverts, newest first.
    pub async fn list_page(&self, page: i64, page_size: u32) -> Result<Page<Advert>> {
        if page < 1 {
            return Err(AppError::InvalidPage(page));
        }
        let total = self.ports.adverts.count_all().await?;
        let pagination = Pagination::resolve(page, page_size, total)?;
        let items = if total == 0 {
            Vec::new()
        } else {
            self.ports
                .adverts
                .find_ordered_by_date_desc(pagination.offset(), pagination.limit())
                .await?
        };
        debug!(page, total, returned = items.len(), "advert page loaded");
        Ok(Page::new(items, &pagination))
    }

    /// The `limit` newest adverts, for the menu.
    pub async fn recent_adverts(&self, limit: u32) -> Result<Vec<Advert>> {
        Ok(self
            .ports
            .adverts
            .find_ordered_by_date_desc(0, u64::from(limit))
            .await?)
    }

    pub async fn view(&self, id: AdvertId) -> Result<AdvertDetails> {
        let advert = self.load(id).await?;
        let applications = self.ports.applications.find_by_advert(id).await?;
        Ok(AdvertDetails {
            advert,
            applications,
        })
    }

    /// A blank creation form.
    pub async fn new_form(&self, identity: Option<&Identity>) -> Result<AdvertForm> {
        self.ports.authorize(identity, Capability::ManageAdverts)?;
        let advert = Advert::new();
        self.form_for(&advert).await
    }

    /// The edit form of an existing advert.
    pub async fn edit_form(&self, identity: Option<&Identity>, id: AdvertId) -> Result<AdvertForm> {
        self.ports.authorize(identity, Capability::ManageAdverts)?;
        let advert = self.load(id).await?;
        self.form_for(&advert).await
    }

    pub async fn create(
        &self,
        identity: Option<&Identity>,
        submission: &AdvertSubmission,
    ) -> Result<AdvertId> {
        let identity = self.ports.authorize(identity, Capability::ManageAdverts)?;
        let choices = self.ports.categories.find_all().await?;

        let mut advert = Advert::new();
        let mut errors = form::bind(&mut advert, submission, &choices);
        self.assign_slug(&mut advert).await?;
        errors.extend(self.validate(&advert, identity).await?);
        if !errors.is_empty() {
            debug!(user = identity.name(), failures = errors.len(), "advert rejected");
            return Err(AppError::Validation(errors));
        }

        let mut changes = ChangeSet::new();
        changes.save_advert(advert);
        let receipt = self.ports.unit_of_work.commit(changes).await?;
        let id = receipt
            .adverts
            .first()
            .copied()
            .ok_or_else(|| AppError::Internal("commit did not assign an advert id".into()))?;

        self.record_submission(identity).await;
        info!(advert_id = %id, user = identity.name(), "advert created");
        Ok(id)
    }

    pub async fn update(
        &self,
        identity: Option<&Identity>,
        id: AdvertId,
        submission: &AdvertSubmission,
    ) -> Result<AdvertId> {
        let identity = self.ports.authorize(identity, Capability::ManageAdverts)?;
        let mut advert = self.load(id).await?;
        let choices = self.ports.categories.find_all().await?;

        let previous_title = advert.title().to_string();
        let mut errors = form::bind(&mut advert, submission, &choices);
        if advert.title() != previous_title {
            self.assign_slug(&mut advert).await?;
        }
        errors.extend(self.validate(&advert, identity).await?);
        if !errors.is_empty() {
            debug!(advert_id = %id, failures = errors.len(), "advert edit rejected");
            return Err(AppError::Validation(errors));
        }

        advert.refresh_updated_at();
        let mut changes = ChangeSet::new();
        changes.save_advert(advert);
        self.ports.unit_of_work.commit(changes).await?;

        self.record_submission(identity).await;
        info!(advert_id = %id, user = identity.name(), "advert updated");
        Ok(id)
    }

    /// The advert a delete confirmation page is about.
    pub async fn delete_form(&self, identity: Option<&Identity>, id: AdvertId) -> Result<Advert> {
        self.ports.authorize(identity, Capability::ManageAdverts)?;
        self.load(id).await
    }

    /// Deletes the advert and its image. Applications are never removed
    /// implicitly, so an advert that still has some cannot be deleted.
    pub async fn delete(&self, identity: Option<&Identity>, id: AdvertId) -> Result<Advert> {
        let identity = self.ports.authorize(identity, Capability::ManageAdverts)?;
        let advert = self.load(id).await?;

        let pending = self.ports.applications.find_by_advert(id).await?;
        if !pending.is_empty() {
            return Err(AppError::Conflict(format!(
                "advert {id} still has {} application(s)",
                pending.len()
            )));
        }

        let mut changes = ChangeSet::new();
        changes.remove_advert(id);
        self.ports.unit_of_work.commit(changes).await?;
        info!(advert_id = %id, user = identity.name(), "advert deleted");
        Ok(advert)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.ports.categories.find_all().await?)
    }

    async fn load(&self, id: AdvertId) -> Result<Advert> {
        self.ports
            .adverts
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Advert", id))
    }

    async fn form_for(&self, advert: &Advert) -> Result<AdvertForm> {
        Ok(AdvertForm {
            advert_id: advert.id(),
            fields: form::editable_fields(Some(advert)),
            values: AdvertSubmission::from_advert(advert),
            errors: Vec::new(),
            choices: self.ports.categories.find_all().await?,
        })
    }

    /// Picks the first free slug among `base`, `base-1`, `base-2`, ...
    async fn assign_slug(&self, advert: &mut Advert) -> Result<()> {
        let base = slug::slugify(advert.title());
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let candidate = slug::candidate(&base, attempt);
            let owner = self.ports.adverts.find_by_slug(&candidate).await?;
            if owner.is_none_or(|other| other.id() == advert.id()) {
                advert.set_slug(candidate);
                return Ok(());
            }
        }
        advert.set_slug(base);
        Ok(())
    }

    async fn validate(&self, advert: &Advert, identity: &Identity) -> Result<Vec<FieldError>> {
        let ctx = ValidationContext {
            now: self.ports.clock.now(),
            last_submission: self.ports.submissions.last_submission_at(identity.name()).await,
            antiflood: self.antiflood,
            uniqueness: self.uniqueness(advert).await?,
        };
        Ok(validation::validate_advert(advert, &ctx))
    }

    async fn uniqueness(&self, advert: &Advert) -> Result<Uniqueness> {
        let repo = &self.ports.adverts;
        let taken = |found: Option<Advert>| found.is_some_and(|other| other.id() != advert.id());
        Ok(Uniqueness {
            title_taken: taken(repo.find_by_title(advert.title()).await?),
            author_taken: taken(repo.find_by_author(advert.author()).await?),
            slug_taken: taken(repo.find_by_slug(advert.slug()).await?),
        })
    }

    async fn record_submission(&self, identity: &Identity) {
        let now = self.ports.clock.now();
        self.ports.submissions.record(identity.name(), now).await;
    }
}
