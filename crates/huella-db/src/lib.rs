//! Persistence layer for sighting posts.
//!
//! Postgres via sqlx; the repository exposes the single atomic
//! "post + N ordered image rows" write behind a trait seam so the
//! ingestion coordinator can be tested without a database.

pub mod repository;
pub mod transaction;

pub use repository::{PostgresSightingRepository, SightingRepository};
pub use transaction::TransactionGuard;

/// Apply pending schema migrations.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
