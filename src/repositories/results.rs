use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{QuizResult, ResultExportRow};
use crate::services::answers::AnswerSheet;
use crate::services::grading::ScoreRecord;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_tg_id, raw_answers, correct_count, wrong_count, percent, grade, timestamp";

pub(crate) struct CreateResult<'a> {
    pub(crate) test_id: i64,
    pub(crate) student_tg_id: i64,
    pub(crate) raw_answers: &'a AnswerSheet,
    pub(crate) score: ScoreRecord,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateResult<'_>,
) -> Result<QuizResult, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "INSERT INTO results (
            test_id, student_tg_id, raw_answers, correct_count, wrong_count, percent, grade
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.test_id)
    .bind(params.student_tg_id)
    .bind(Json(params.raw_answers))
    .bind(i64::from(params.score.correct))
    .bind(i64::from(params.score.wrong))
    .bind(params.score.percent)
    .bind(params.score.grade)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_tg_id: i64,
    limit: i64,
) -> Result<Vec<QuizResult>, sqlx::Error> {
    sqlx::query_as::<_, QuizResult>(&format!(
        "SELECT {COLUMNS}
         FROM results
         WHERE student_tg_id = $1
         ORDER BY id DESC
         LIMIT $2"
    ))
    .bind(student_tg_id)
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_export(pool: &PgPool) -> Result<Vec<ResultExportRow>, sqlx::Error> {
    sqlx::query_as::<_, ResultExportRow>(
        "SELECT s.name,
                r.test_id,
                r.raw_answers,
                r.correct_count,
                r.wrong_count,
                r.percent,
                r.grade,
                r.timestamp
         FROM results r
         JOIN students s ON r.student_tg_id = s.tg_id
         ORDER BY r.timestamp DESC, r.id DESC",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn delete_all(executor: impl sqlx::PgExecutor<'_>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM results").execute(executor).await?;
    Ok(result.rows_affected())
}
