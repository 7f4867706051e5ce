//! Persistence core for the Anthology reading journal.
//! Entities and relations are mapped onto a single SQLite store.

pub mod config;
pub mod db;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod service;

pub use config::{load_config, AnthologyConfig, ConfigError, DatabaseConfig, LoggingConfig};
pub use db::{open_store, open_store_in_memory, DbError, DbResult, Store};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use mapper::{
    Entity, FieldKind, FieldSpec, MapperError, MapperResult, Record, Relation, SaveOutcome, Side,
    UpdatePolicy, Value, WriteFailure, WriteFailureKind,
};
pub use model::book::{Book, BookAuthor, BookGenre};
pub use model::category::{Genre, SubGenre, Subject};
pub use model::creator::Author;
pub use model::session::{Quote, Reading};
pub use service::catalog_service::CatalogService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
