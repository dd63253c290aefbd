//! advert-board/crates/domains/src/lib.rs
//!
//! The central domain logic and interface definitions for the advert board:
//! the advert aggregate, its validation and form rules, pagination, and the
//! ports adapters implement.

pub mod advert;
pub mod error;
pub mod form;
pub mod identity;
pub mod models;
pub mod pagination;
pub mod ports;
pub mod slug;
pub mod validation;

// Re-exporting for easier access in other crates
pub use advert::{Advert, AdvertParts};
pub use error::*;
pub use identity::{Capability, Identity, Role};
pub use models::*;
pub use pagination::{Page, Pagination};
pub use ports::*;
