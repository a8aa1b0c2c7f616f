use sqlx::PgPool;

use crate::db::models::Student;

const COLUMNS: &str = "tg_id, name";

pub(crate) async fn find_by_id(pool: &PgPool, tg_id: i64) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE tg_id = $1"))
        .bind(tg_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students ORDER BY tg_id"))
        .fetch_all(pool)
        .await
}

/// Re-registration replaces the stored name.
pub(crate) async fn upsert(pool: &PgPool, tg_id: i64, name: &str) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (tg_id, name) VALUES ($1, $2)
         ON CONFLICT (tg_id) DO UPDATE SET name = EXCLUDED.name
         RETURNING {COLUMNS}"
    ))
    .bind(tg_id)
    .bind(name)
    .fetch_one(pool)
    .await
}
