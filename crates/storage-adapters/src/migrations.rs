//! Reversible schema migrations.
//!
//! The SQL lives in `migrations/`; with `db-postgres` it is embedded into
//! [`MIGRATOR`] for `sqlx`.

/// One reversible migration, as shipped in `migrations/`.
#[derive(Debug, Clone, Copy)]
pub struct MigrationScript {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Every migration, oldest first.
pub const SCRIPTS: [MigrationScript; 2] = [
    MigrationScript {
        version: 20190701000000,
        description: "initial schema",
        up: include_str!("../migrations/20190701000000_initial_schema.up.sql"),
        down: include_str!("../migrations/20190701000000_initial_schema.down.sql"),
    },
    MigrationScript {
        version: 20190716103206,
        description: "retire advert skill",
        up: include_str!("../migrations/20190716103206_retire_advert_skill.up.sql"),
        down: include_str!("../migrations/20190716103206_retire_advert_skill.down.sql"),
    },
];

/// The most recent schema version.
pub fn latest_version() -> i64 {
    SCRIPTS.iter().map(|s| s.version).max().unwrap_or_default()
}

/// The version just before the newest one, or 0 when only one exists.
pub fn previous_version() -> i64 {
    SCRIPTS
        .iter()
        .map(|s| s.version)
        .filter(|v| *v < latest_version())
        .max()
        .unwrap_or_default()
}

#[cfg(feature = "db-postgres")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
