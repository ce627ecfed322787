use std::{str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

pub type DbPool = SqlitePool;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
pub mod testing {
    use super::{init_pool, DbPool};
    use tempfile::TempDir;

    /// Fresh migrated database backed by a temp file. Keep the TempDir
    /// alive for the duration of the test.
    pub async fn test_pool() -> (TempDir, DbPool) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("staffhub.sqlite");
        let url = format!("sqlite://{}", db_path.to_string_lossy());
        let pool = init_pool(&url).await.unwrap();
        (dir, pool)
    }

    pub async fn seed_company(pool: &DbPool, name: &str) -> i64 {
        let result = sqlx::query("INSERT INTO companies (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
        result.last_insert_rowid()
    }

    pub async fn seed_user(
        pool: &DbPool,
        company_id: i64,
        first_name: &str,
        last_name: &str,
        email: &str,
        role: &str,
    ) -> i64 {
        let result = sqlx::query(
            "INSERT INTO users (company_id, first_name, last_name, email, password_hash, role) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(company_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind("x")
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    pub async fn seed_project(pool: &DbPool, company_id: i64, name: &str) -> i64 {
        let result = sqlx::query(
            "INSERT INTO projects (company_id, name, status, created_at) \
             VALUES (?, ?, 'planned', datetime('now'))",
        )
        .bind(company_id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
        result.last_insert_rowid()
    }
}
