//! # Validation rules
//!
//! Pure checks over adverts and applications. Everything that needs the
//! outside world (last submission time, uniqueness lookups, the current
//! time) arrives through [`ValidationContext`].

use chrono::{DateTime, Duration, Utc};

use crate::advert::Advert;
use crate::error::{Field, FieldError};
use crate::models::Application;

/// Substrings rejected in advert content. Matching is case-sensitive.
pub const BANNED_WORDS: &[&str] = &["démotivation", "abandon"];

pub const BANNED_WORD_MESSAGE: &str = "Invalid content: it contains a banned word.";

pub const TITLE_MIN_LENGTH: usize = 10;
pub const AUTHOR_MIN_LENGTH: usize = 2;

// Column widths of the persisted schema.
pub const TITLE_MAX_LENGTH: usize = 255;
pub const AUTHOR_MAX_LENGTH: usize = 191;
pub const IMAGE_FIELD_MAX_LENGTH: usize = 255;
pub const APPLICATION_AUTHOR_MAX_LENGTH: usize = 255;

/// Returns the first banned word found in `content`.
pub fn find_banned_word(content: &str) -> Option<&'static str> {
    BANNED_WORDS.iter().copied().find(|word| content.contains(word))
}

/// Cooldown between two submissions of the same author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Antiflood {
    cooldown: Duration,
}

impl Default for Antiflood {
    fn default() -> Self {
        Self::from_secs(Self::DEFAULT_COOLDOWN_SECS)
    }
}

impl Antiflood {
    pub const DEFAULT_COOLDOWN_SECS: u64 = 15;

    pub fn from_secs(secs: u64) -> Self {
        let secs = u32::try_from(secs).unwrap_or(u32::MAX);
        Self {
            cooldown: Duration::seconds(i64::from(secs)),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn message(&self) -> String {
        format!(
            "You already posted a message less than {} seconds ago, please wait a little.",
            self.cooldown.num_seconds()
        )
    }

    /// Rejects a submission made less than the cooldown after `last`.
    pub fn check(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<FieldError> {
        let last = last?;
        if now.signed_duration_since(last) < self.cooldown {
            Some(FieldError::new(Field::Content, self.message()))
        } else {
            None
        }
    }
}

/// Which unique columns are already used by *another* advert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uniqueness {
    pub title_taken: bool,
    pub author_taken: bool,
    pub slug_taken: bool,
}

/// External facts a validation run depends on.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    pub now: DateTime<Utc>,
    pub last_submission: Option<DateTime<Utc>>,
    pub antiflood: Antiflood,
    pub uniqueness: Uniqueness,
}

impl ValidationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            last_submission: None,
            antiflood: Antiflood::default(),
            uniqueness: Uniqueness::default(),
        }
    }
}

fn too_short(min: usize) -> String {
    format!("This value is too short. It should have {min} characters or more.")
}

fn too_long(max: usize) -> String {
    format!("This value is too long. It should have {max} characters or less.")
}

const NOT_BLANK: &str = "This value should not be blank.";

/// Runs every advert rule and returns all failures, in field order.
pub fn validate_advert(advert: &Advert, ctx: &ValidationContext) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if advert.title().chars().count() < TITLE_MIN_LENGTH {
        errors.push(FieldError::new(Field::Title, too_short(TITLE_MIN_LENGTH)));
    }
    if advert.title().chars().count() > TITLE_MAX_LENGTH {
        errors.push(FieldError::new(Field::Title, too_long(TITLE_MAX_LENGTH)));
    }
    if ctx.uniqueness.title_taken {
        errors.push(FieldError::new(
            Field::Title,
            "An advert with this title already exists.",
        ));
    } else if ctx.uniqueness.slug_taken {
        errors.push(FieldError::new(
            Field::Title,
            "An advert with this slug already exists.",
        ));
    }

    if advert.author().chars().count() < AUTHOR_MIN_LENGTH {
        errors.push(FieldError::new(Field::Author, too_short(AUTHOR_MIN_LENGTH)));
    }
    if advert.author().chars().count() > AUTHOR_MAX_LENGTH {
        errors.push(FieldError::new(Field::Author, too_long(AUTHOR_MAX_LENGTH)));
    }
    if ctx.uniqueness.author_taken {
        errors.push(FieldError::new(
            Field::Author,
            "An advert by this author already exists.",
        ));
    }

    if advert.content().trim().is_empty() {
        errors.push(FieldError::new(Field::Content, NOT_BLANK));
    }
    if let Some(error) = advert.validate_content() {
        errors.push(error);
    }
    if let Some(error) = ctx.antiflood.check(ctx.last_submission, ctx.now) {
        errors.push(error);
    }

    if let Some(image) = advert.image() {
        if image.url.trim().is_empty() {
            errors.push(FieldError::new(Field::Image, "The image URL should not be blank."));
        }
        let longest = image.url.chars().count().max(image.alt.chars().count());
        if longest > IMAGE_FIELD_MAX_LENGTH {
            errors.push(FieldError::new(Field::Image, too_long(IMAGE_FIELD_MAX_LENGTH)));
        }
    }

    errors
}

/// Application rules: both fields filled in, and the antiflood cooldown.
pub fn validate_application(
    application: &Application,
    ctx: &ValidationContext,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if application.author().trim().is_empty() {
        errors.push(FieldError::new(Field::Author, NOT_BLANK));
    }
    if application.author().chars().count() > APPLICATION_AUTHOR_MAX_LENGTH {
        errors.push(FieldError::new(
            Field::Author,
            too_long(APPLICATION_AUTHOR_MAX_LENGTH),
        ));
    }
    if application.content().trim().is_empty() {
        errors.push(FieldError::new(Field::Content, NOT_BLANK));
    }
    if let Some(error) = ctx.antiflood.check(ctx.last_submission, ctx.now) {
        errors.push(error);
    }
    errors
}
