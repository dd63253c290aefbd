//! # storage-adapters
//!
//! Implementations of the persistence-side ports: the in-memory store used
//! by tests and development, the Postgres store (`db-postgres`), the
//! submission log behind the antiflood rule, and the mail transport.

pub mod mail;
pub mod memory;
pub mod migrations;
pub mod submissions;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use mail::TracingMailTransport;
pub use memory::InMemoryStore;
pub use submissions::DashMapSubmissionLog;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
