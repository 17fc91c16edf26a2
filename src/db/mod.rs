//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for wishlists, items, reservations and
//! contributions. Amounts are stored in cents.

mod contributions;
mod repository;
mod reservations;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wishlists (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            cover_emoji TEXT,
            slug TEXT NOT NULL UNIQUE,
            is_public INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            wishlist_id TEXT NOT NULL REFERENCES wishlists(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            url TEXT,
            price_cents INTEGER,
            image_url TEXT,
            description TEXT,
            priority INTEGER NOT NULL DEFAULT 2,
            is_group_gift INTEGER NOT NULL DEFAULT 0,
            target_cents INTEGER,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL UNIQUE REFERENCES items(id) ON DELETE CASCADE,
            reserver_name TEXT NOT NULL,
            reserver_email TEXT,
            reserver_user_id TEXT,
            is_cancelled INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contributions (
            id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            contributor_name TEXT NOT NULL,
            contributor_email TEXT,
            contributor_user_id TEXT,
            amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_wishlists_owner ON wishlists(owner_id);
        CREATE INDEX IF NOT EXISTS idx_items_wishlist ON items(wishlist_id, is_deleted);
        CREATE INDEX IF NOT EXISTS idx_contributions_item ON contributions(item_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
