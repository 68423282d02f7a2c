/// Database utilities
///
/// This module provides the PostgreSQL connection pool and migration helpers.
///
/// # Modules
///
/// - `pool`: Connection pool creation and health checks
/// - `migrations`: Migration runner built on `sqlx::migrate!`

pub mod migrations;
pub mod pool;
