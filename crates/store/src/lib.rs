//! PostgreSQL adapters for the repository ports of the `domain` crate.
//!
//! Each service owns its tables: the counter stores `orders` and
//! `line_items`, the barista `barista_orders` and the kitchen
//! `kitchen_orders`. Migrations live under `migrations/<service>` at the
//! workspace root and are embedded at compile time.

pub mod error;
pub mod orders;
pub mod preparations;

pub use error::{Result, StoreError};
pub use orders::PostgresOrderRepository;
pub use preparations::PostgresPreparationRepository;

/// Maps a unique-key violation on insert to `Duplicate`.
fn insert_error(err: sqlx::Error, entity: &'static str, id: String) -> domain::RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return domain::RepositoryError::Duplicate { entity, id };
    }
    StoreError::Database(err).into()
}
