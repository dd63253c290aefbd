//! # Advert aggregate
//!
//! The job posting record and the entry point to its image, categories and
//! applications. Uniqueness of title, author and slug is a collection-wide
//! invariant and is therefore enforced by the storage write path, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Field, FieldError};
use crate::models::{AdvertId, Application, Category, Image};
use crate::validation;

/// A job advert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advert {
    id: Option<AdvertId>,
    date: DateTime<Utc>,
    title: String,
    author: String,
    content: String,
    published: bool,
    image: Option<Image>,
    categories: Vec<Category>,
    applications: Vec<Application>,
    updated_at: Option<DateTime<Utc>>,
    application_count: u32,
    slug: String,
}

/// Every stored column of an advert, used by storage adapters to rebuild the
/// aggregate.
#[derive(Debug, Clone)]
pub struct AdvertParts {
    pub id: AdvertId,
    pub date: DateTime<Utc>,
    pub title: String,
    pub author: String,
    pub content: String,
    pub published: bool,
    pub image: Option<Image>,
    pub categories: Vec<Category>,
    pub applications: Vec<Application>,
    pub updated_at: Option<DateTime<Utc>>,
    pub application_count: u32,
    pub slug: String,
}

impl Default for Advert {
    fn default() -> Self {
        Self::new()
    }
}

impl Advert {
    /// A blank, unsaved advert dated now and published by default.
    pub fn new() -> Self {
        Self {
            id: None,
            date: Utc::now(),
            title: String::new(),
            author: String::new(),
            content: String::new(),
            published: true,
            image: None,
            categories: Vec::new(),
            applications: Vec::new(),
            updated_at: None,
            application_count: 0,
            slug: String::new(),
        }
    }

    pub fn restore(parts: AdvertParts) -> Self {
        Self {
            id: Some(parts.id),
            date: parts.date,
            title: parts.title,
            author: parts.author,
            content: parts.content,
            published: parts.published,
            image: parts.image,
            categories: parts.categories,
            applications: parts.applications,
            updated_at: parts.updated_at,
            application_count: parts.application_count,
            slug: parts.slug,
        }
    }

    pub fn id(&self) -> Option<AdvertId> {
        self.id
    }

    /// Assigns the storage id. The id never changes once set.
    pub fn assign_id(&mut self, id: AdvertId) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    /// True until the advert has been committed.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = date;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn published(&self) -> bool {
        self.published
    }

    pub fn set_published(&mut self, published: bool) {
        self.published = published;
    }

    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// Replaces the image. The storage layer removes the previous record.
    pub fn set_image(&mut self, image: Option<Image>) {
        self.image = image;
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Adds the category unless it is already linked.
    pub fn add_category(&mut self, category: Category) -> bool {
        if self.has_category(&category) {
            return false;
        }
        self.categories.push(category);
        true
    }

    /// Unlinks the category if it is linked.
    pub fn remove_category(&mut self, category: &Category) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| !same_category(c, category));
        before != self.categories.len()
    }

    pub fn has_category(&self, category: &Category) -> bool {
        self.categories.iter().any(|c| same_category(c, category))
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    /// Links the application and points it back at this advert. Adding the
    /// same application twice is a no-op.
    pub fn add_application(&mut self, application: &mut Application) -> bool {
        if self.has_application(application) {
            return false;
        }
        application.set_advert(self.id);
        self.applications.push(application.clone());
        true
    }

    /// Unlinks the application. Its back-reference is left untouched.
    pub fn remove_application(&mut self, application: &Application) -> bool {
        let before = self.applications.len();
        self.applications.retain(|a| a.id() != application.id());
        before != self.applications.len()
    }

    pub fn has_application(&self, application: &Application) -> bool {
        self.applications.iter().any(|a| a.id() == application.id())
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn set_updated_at(&mut self, updated_at: Option<DateTime<Utc>>) {
        self.updated_at = updated_at;
    }

    /// Stamps the advert as edited now.
    pub fn refresh_updated_at(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn application_count(&self) -> u32 {
        self.application_count
    }

    pub fn set_application_count(&mut self, count: u32) {
        self.application_count = count;
    }

    pub fn increase_application_count(&mut self) {
        self.application_count = self.application_count.saturating_add(1);
    }

    /// Never drops below zero.
    pub fn decrease_application_count(&mut self) {
        self.application_count = self.application_count.saturating_sub(1);
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn set_slug(&mut self, slug: impl Into<String>) {
        self.slug = slug.into();
    }

    /// Rejects content containing a banned word.
    pub fn validate_content(&self) -> Option<FieldError> {
        validation::find_banned_word(&self.content)
            .map(|_| FieldError::new(Field::Content, validation::BANNED_WORD_MESSAGE))
    }
}

fn same_category(a: &Category, b: &Category) -> bool {
    match (a.id, b.id) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryId;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: Some(CategoryId(id)),
            name: name.to_string(),
        }
    }

    fn persisted() -> Advert {
        let mut advert = Advert::new();
        advert.assign_id(AdvertId(42));
        advert
    }

    #[test]
    fn new_advert_defaults() {
        let before = Utc::now();
        let advert = Advert::new();
        assert!(advert.is_new());
        assert!(advert.published());
        assert_eq!(advert.application_count(), 0);
        assert!(advert.updated_at().is_none());
        assert!(advert.date() >= before && advert.date() <= Utc::now());
    }

    #[test]
    fn id_is_assigned_once() {
        let mut advert = persisted();
        advert.assign_id(AdvertId(7));
        assert_eq!(advert.id(), Some(AdvertId(42)));
    }

    #[test]
    fn categories_behave_as_a_set() {
        let mut advert = Advert::new();
        assert!(advert.add_category(category(1, "Graphisme")));
        assert!(!advert.add_category(category(1, "Graphisme")));
        assert_eq!(advert.categories().len(), 1);

        assert!(advert.remove_category(&category(1, "Graphisme")));
        assert!(!advert.remove_category(&category(1, "Graphisme")));
        assert!(advert.categories().is_empty());
    }

    #[test]
    fn adding_an_application_twice_keeps_one_and_sets_back_reference() {
        let mut advert = persisted();
        let mut application = Application::new("Pierre", "Je suis très motivé.");

        assert!(advert.add_application(&mut application));
        assert!(!advert.add_application(&mut application));

        assert_eq!(advert.applications().len(), 1);
        assert_eq!(application.advert(), Some(AdvertId(42)));
    }

    #[test]
    fn removing_an_application_keeps_its_back_reference() {
        let mut advert = persisted();
        let mut application = Application::new("Pierre", "Je suis très motivé.");
        advert.add_application(&mut application);

        assert!(advert.remove_application(&application));
        assert!(!advert.remove_application(&application));
        assert!(advert.applications().is_empty());
        assert_eq!(application.advert(), Some(AdvertId(42)));
    }

    #[test]
    fn application_count_never_goes_negative() {
        let mut advert = Advert::new();
        advert.decrease_application_count();
        assert_eq!(advert.application_count(), 0);

        advert.increase_application_count();
        advert.increase_application_count();
        advert.decrease_application_count();
        assert_eq!(advert.application_count(), 1);
    }

    #[test]
    fn refresh_updated_at_stamps_now() {
        let mut advert = persisted();
        advert.refresh_updated_at();
        assert!(advert.updated_at().is_some());
    }

    #[test]
    fn banned_word_is_reported_on_content() {
        let mut advert = Advert::new();
        advert.set_content("Pas d'abandon possible ici");
        let error = advert.validate_content().expect("banned word");
        assert_eq!(error.field, Field::Content);

        advert.set_content("Nous recherchons un développeur Rust.");
        assert!(advert.validate_content().is_none());
    }
}
