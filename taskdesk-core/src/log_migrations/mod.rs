//! Event log schema, embedded at compile time
//!
//! `(file name, sql)` pairs applied in order by the logging service. The
//! bootstrap file creates the bookkeeping table and is always first; new
//! migrations are appended as `NNN_description.sql`.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
