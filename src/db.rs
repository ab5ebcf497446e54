// flow-backend/src/db.rs
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};

// Type alias for the connection pool
pub type DbPool = Pool<AsyncPgConnection>;

/// DDL for every table; each statement is `IF NOT EXISTS`, so applying it on
/// every start is harmless.
const SCHEMA_SQL: &str =
    include_str!("../migrations/2025-06-01-000000_create_flow_tables/up.sql");

pub async fn create_pool(
    database_url: &str,
    max_size: u32,
) -> Result<DbPool, Box<dyn std::error::Error>> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder().max_size(max_size).build(config).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = pool.get().await?;
    conn.batch_execute(SCHEMA_SQL).await?;
    log::info!("Database schema is up to date");
    Ok(())
}
