//! PostgreSQL pool setup and schema migrations.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub type DbPool = PgPool;

/// Open the connection pool used by [`crate::store::PgStorage`].
///
/// Each unit of work pins one connection until it commits or rolls back,
/// so `max_connections` bounds how many money movements run at once.
/// Waiting for a free connection is capped by `acquire_timeout`.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Apply the embedded `migrations/` directory.
pub async fn migrate(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
