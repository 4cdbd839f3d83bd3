//! Database schema and migrations.
//!
//! Migrations are plain SQL batches applied in order. The last applied
//! version is kept in the one-row `schema_version` table.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::Result;

/// A single schema step.
struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "settings and catalog tables",
    sql: "
        -- Key-value settings, values stored as JSON
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            slug TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        );

        -- Product membership; position keeps the catalog's category order
        CREATE TABLE IF NOT EXISTS product_categories (
            product_id INTEGER NOT NULL,
            slug TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (product_id, slug)
        );

        CREATE INDEX IF NOT EXISTS idx_product_categories_product
            ON product_categories (product_id, position);
    ",
}];

/// Latest schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Applies every migration newer than the stored version.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = schema_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            version = migration.version,
            "Applying migration: {}", migration.description
        );
        conn.execute_batch(&format!(
            "BEGIN;
             {}
             DELETE FROM schema_version;
             INSERT INTO schema_version (version) VALUES ({});
             COMMIT;",
            migration.sql, migration.version
        ))?;
    }

    Ok(())
}

/// Stored schema version, 0 for a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
    )?;

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}
