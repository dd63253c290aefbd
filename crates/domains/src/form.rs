//! # Advert form
//!
//! Which advert fields a form exposes, and how a submission is bound onto an
//! advert. The field set is recomputed on every bind: `published` disappears
//! once an advert is both published and persisted, and a hidden field keeps
//! its stored value.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::advert::Advert;
use crate::error::{Field, FieldError};
use crate::models::{Category, CategoryId, Image};

/// Format of the `date` input (HTML `datetime-local`).
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

const ALWAYS_EDITABLE: [Field; 6] = [
    Field::Date,
    Field::Title,
    Field::Author,
    Field::Content,
    Field::Image,
    Field::Categories,
];

/// Fields a form bound to `advert` lets the user change.
pub fn editable_fields(advert: Option<&Advert>) -> BTreeSet<Field> {
    let mut fields: BTreeSet<Field> = ALWAYS_EDITABLE.into_iter().collect();
    let show_published = match advert {
        None => true,
        Some(advert) => !advert.published() || advert.is_new(),
    };
    if show_published {
        fields.insert(Field::Published);
    }
    fields
}

/// Raw values of a submitted advert form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertSubmission {
    pub date: Option<String>,
    pub title: String,
    pub author: String,
    pub content: String,
    /// Checkbox semantics: absent means unchecked.
    pub published: bool,
    pub image_url: String,
    pub image_alt: String,
    pub categories: Vec<CategoryId>,
    /// Category values that were not numeric ids.
    pub rejected_categories: Vec<String>,
}

impl AdvertSubmission {
    /// Prefills a form from the current state of `advert`.
    pub fn from_advert(advert: &Advert) -> Self {
        let (image_url, image_alt) = advert
            .image()
            .map(|image| (image.url.clone(), image.alt.clone()))
            .unwrap_or_default();
        Self {
            date: Some(advert.date().format(DATE_FORMAT).to_string()),
            title: advert.title().to_string(),
            author: advert.author().to_string(),
            content: advert.content().to_string(),
            published: advert.published(),
            image_url,
            image_alt,
            categories: advert.categories().iter().filter_map(|c| c.id).collect(),
            rejected_categories: Vec::new(),
        }
    }

    /// Reads urlencoded key/value pairs. Repeated `categories` keys select
    /// several categories.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut submission = Self::default();
        for (key, value) in pairs {
            let value: String = value.into();
            match key.as_ref() {
                "date" => submission.date = Some(value),
                "title" => submission.title = value,
                "author" => submission.author = value,
                "content" => submission.content = value,
                "published" => submission.published = value != "0" && value != "false",
                "image[url]" | "image_url" => submission.image_url = value,
                "image[alt]" | "image_alt" => submission.image_alt = value,
                "categories" | "categories[]" => match value.trim().parse::<i64>() {
                    Ok(id) => submission.categories.push(CategoryId(id)),
                    Err(_) => submission.rejected_categories.push(value),
                },
                _ => {}
            }
        }
        submission
    }

    pub fn selects(&self, id: Option<CategoryId>) -> bool {
        id.is_some_and(|id| self.categories.contains(&id))
    }
}

/// Binds `submission` onto `advert`, touching only the editable fields.
///
/// `choices` are the categories the form offers; selecting anything else is
/// a field error. Returns the binding errors (parse failures, bad choices),
/// not the business validation failures.
pub fn bind(
    advert: &mut Advert,
    submission: &AdvertSubmission,
    choices: &[Category],
) -> Vec<FieldError> {
    let fields = editable_fields(Some(advert));
    let mut errors = Vec::new();

    if fields.contains(&Field::Date) {
        if let Some(raw) = submission.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            match parse_date(raw) {
                Some(date) => advert.set_date(date),
                None => errors.push(FieldError::new(
                    Field::Date,
                    "This value is not a valid datetime.",
                )),
            }
        }
    }
    if fields.contains(&Field::Title) {
        advert.set_title(submission.title.trim());
    }
    if fields.contains(&Field::Author) {
        advert.set_author(submission.author.trim());
    }
    if fields.contains(&Field::Content) {
        advert.set_content(submission.content.trim());
    }
    if fields.contains(&Field::Published) {
        advert.set_published(submission.published);
    }
    if fields.contains(&Field::Image) {
        advert.set_image(bind_image(advert.image(), submission));
    }
    if fields.contains(&Field::Categories) {
        errors.extend(bind_categories(advert, submission, choices));
    }

    errors
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

// An empty URL means "no image"; otherwise the existing record is updated in
// place so it keeps its id.
fn bind_image(current: Option<&Image>, submission: &AdvertSubmission) -> Option<Image> {
    let url = submission.image_url.trim();
    if url.is_empty() {
        return None;
    }
    let mut image = current
        .cloned()
        .unwrap_or_else(|| Image::new(String::new(), String::new()));
    image.url = url.to_string();
    image.alt = submission.image_alt.trim().to_string();
    Some(image)
}

fn bind_categories(
    advert: &mut Advert,
    submission: &AdvertSubmission,
    choices: &[Category],
) -> Vec<FieldError> {
    let invalid_choice = || FieldError::new(Field::Categories, "The selected choice is invalid.");

    if !submission.rejected_categories.is_empty() {
        return vec![invalid_choice()];
    }
    let unknown = submission
        .categories
        .iter()
        .any(|id| !choices.iter().any(|c| c.id == Some(*id)));
    if unknown {
        return vec![invalid_choice()];
    }

    let deselected: Vec<Category> = advert
        .categories()
        .iter()
        .filter(|c| !submission.selects(c.id))
        .cloned()
        .collect();
    for category in &deselected {
        advert.remove_category(category);
    }
    for category in choices.iter().filter(|c| submission.selects(c.id)) {
        advert.add_category(category.clone());
    }
    Vec::new()
}

/// Raw values of a submitted application form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}
