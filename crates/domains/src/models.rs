//! # Domain Models
//!
//! The entities surrounding the [`Advert`](crate::advert::Advert) aggregate.
//! Storage-assigned records use 64-bit integer ids; applications use UUID v7
//! so a freshly built application already has a stable identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a persisted advert.
    AdvertId
);
numeric_id!(
    /// Identifier of a persisted image.
    ImageId
);
numeric_id!(
    /// Identifier of a persisted category.
    CategoryId
);

/// Identifier of an application, generated when the application is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Cover image of an advert. Owned by exactly one advert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: Option<ImageId>,
    pub url: String,
    pub alt: String,
}

impl Image {
    pub fn new(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            alt: alt.into(),
        }
    }

    /// Same picture, ignoring the storage id.
    pub fn same_content(&self, other: &Image) -> bool {
        self.url == other.url && self.alt == other.alt
    }
}

/// A job category (e.g. "Graphisme"). Lives independently of adverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<CategoryId>,
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A response submitted against a specific advert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    id: ApplicationId,
    author: String,
    content: String,
    /// Owning side of the advert relation; `None` only while the advert it
    /// was attached to has not been committed yet.
    advert: Option<AdvertId>,
}

impl Application {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ApplicationId::generate(),
            author: author.into(),
            content: content.into(),
            advert: None,
        }
    }

    /// Rebuilds a stored application.
    pub fn restore(
        id: ApplicationId,
        author: String,
        content: String,
        advert: Option<AdvertId>,
    ) -> Self {
        Self {
            id,
            author,
            content,
            advert,
        }
    }

    pub fn id(&self) -> ApplicationId {
        self.id
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

    pub fn advert(&self) -> Option<AdvertId> {
        self.advert
    }

    pub fn set_advert(&mut self, advert: Option<AdvertId>) {
        self.advert = advert;
    }
}
