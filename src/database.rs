// src/database.rs
use chrono::{Datelike, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool};

use crate::domain::numbering::{format_number, DocumentKind};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Draws the next document number for `kind` in the current year.
///
/// The per-(kind, year) counter row is bumped with a single upsert, so two
/// concurrent creations always see different sequence values. Naive
/// count()+1 numbering is exactly the race this replaces.
pub async fn next_document_number<'c, E>(
    executor: E,
    kind: DocumentKind,
) -> Result<String, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    let year = Utc::now().year();
    let seq = sqlx::query_scalar::<_, i64>(
        "INSERT INTO document_counters (kind, year, last_seq)
         VALUES ($1, $2, 1)
         ON CONFLICT (kind, year)
         DO UPDATE SET last_seq = document_counters.last_seq + 1
         RETURNING last_seq",
    )
    .bind(kind.as_str())
    .bind(year)
    .fetch_one(executor)
    .await?;

    Ok(format_number(kind, year, seq))
}
