use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::models::FileReference;

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const REFERENCE_COLUMNS: &str = "id, title, file_name, web_link, reference_id, created_at";

pub async fn insert_reference(
    db_pool: &DbPool,
    title: Option<&str>,
    file_name: Option<&str>,
    web_link: Option<&str>,
    reference_id: &str,
) -> Result<FileReference, sqlx::Error> {
    sqlx::query_as::<_, FileReference>(&format!(
        "INSERT INTO file_references (title, file_name, web_link, reference_id, created_at)
         VALUES ($1, $2, $3, $4, NOW())
         RETURNING {REFERENCE_COLUMNS}"
    ))
    .bind(title)
    .bind(file_name)
    .bind(web_link)
    .bind(reference_id)
    .fetch_one(db_pool)
    .await
}

pub async fn list_references(db_pool: &DbPool) -> Result<Vec<FileReference>, sqlx::Error> {
    sqlx::query_as::<_, FileReference>(&format!(
        "SELECT {REFERENCE_COLUMNS} FROM file_references ORDER BY id"
    ))
    .fetch_all(db_pool)
    .await
}

pub async fn get_reference(db_pool: &DbPool, id: i32) -> Result<Option<FileReference>, sqlx::Error> {
    sqlx::query_as::<_, FileReference>(&format!(
        "SELECT {REFERENCE_COLUMNS} FROM file_references WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await
}

pub async fn delete_reference(db_pool: &DbPool, id: i32) -> Result<Option<FileReference>, sqlx::Error> {
    sqlx::query_as::<_, FileReference>(&format!(
        "DELETE FROM file_references WHERE id = $1 RETURNING {REFERENCE_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await
}

pub async fn reset_references(db_pool: &DbPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM file_references")
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn reference_ids(db_pool: &DbPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT reference_id FROM file_references ORDER BY id")
        .fetch_all(db_pool)
        .await
}
