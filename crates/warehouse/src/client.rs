//! Warehouse connection handle.
//!
//! The pool is constructed explicitly and passed into each component; the
//! pipeline owns its lifetime. No module-level singletons.

use crate::schema::{CREATE_CATALOG, CREATE_ECONOMIC, CREATE_FINANCIAL};
use anyhow::{Context, Result};
use econ_ingest_core::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct WarehouseClient {
    pool: PgPool,
}

impl WarehouseClient {
    /// Connects to the warehouse database.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .context("Failed to connect to warehouse database")?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool (tests, shared pools).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the catalog and observation tables if they do not exist.
    ///
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in [CREATE_CATALOG, CREATE_ECONOMIC, CREATE_FINANCIAL] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .context("Failed to create warehouse table")?;
        }
        Ok(())
    }
}
