//! Persistence boundary for students, tests and results.
//!
//! Query functions live in one module per table and take a `PgPool`
//! directly. The conversation layer talks to storage only through
//! [`QuizRepository`], so flows can run against Postgres or an in-memory
//! store. Lookups return `Ok(None)` / empty vectors when nothing matches.

pub(crate) mod results;
pub(crate) mod students;
pub(crate) mod telegram_offsets;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::models::{QuizResult, QuizTest, ResultExportRow, Student};

pub(crate) use quiz_tests::CreateTest;
pub(crate) use results::CreateResult;

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored {0} could not be decoded")]
    Corrupt(&'static str),
}

#[async_trait]
pub(crate) trait QuizRepository: Send + Sync {
    async fn insert_or_replace_student(
        &self,
        tg_id: i64,
        name: &str,
    ) -> Result<Student, StorageError>;

    async fn get_student(&self, tg_id: i64) -> Result<Option<Student>, StorageError>;

    async fn list_students(&self) -> Result<Vec<Student>, StorageError>;

    async fn insert_test(&self, params: CreateTest<'_>) -> Result<QuizTest, StorageError>;

    async fn get_latest_test(&self) -> Result<Option<QuizTest>, StorageError>;

    async fn list_recent_tests(&self, limit: i64) -> Result<Vec<QuizTest>, StorageError>;

    async fn get_test(&self, id: i64) -> Result<Option<QuizTest>, StorageError>;

    async fn insert_result(&self, params: CreateResult<'_>) -> Result<QuizResult, StorageError>;

    async fn list_results_for_student(
        &self,
        student_tg_id: i64,
        limit: i64,
    ) -> Result<Vec<QuizResult>, StorageError>;

    /// Results joined with student names, newest first.
    async fn list_all_results_joined_with_students(
        &self,
    ) -> Result<Vec<ResultExportRow>, StorageError>;

    /// Removes every result and every test as one unit, returning the
    /// `(tests, results)` counts. Either both tables are emptied or neither is.
    async fn delete_all_tests_and_results(&self) -> Result<(u64, u64), StorageError>;
}

#[derive(Clone)]
pub(crate) struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps row decode failures on JSON answer columns to `Corrupt`.
fn classify(err: sqlx::Error, what: &'static str) -> StorageError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StorageError::Corrupt(what),
        other => StorageError::Database(other),
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn insert_or_replace_student(
        &self,
        tg_id: i64,
        name: &str,
    ) -> Result<Student, StorageError> {
        Ok(students::upsert(&self.pool, tg_id, name).await?)
    }

    async fn get_student(&self, tg_id: i64) -> Result<Option<Student>, StorageError> {
        Ok(students::find_by_id(&self.pool, tg_id).await?)
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        Ok(students::list_all(&self.pool).await?)
    }

    async fn insert_test(&self, params: CreateTest<'_>) -> Result<QuizTest, StorageError> {
        quiz_tests::create(&self.pool, params).await.map_err(|err| classify(err, "test"))
    }

    async fn get_latest_test(&self) -> Result<Option<QuizTest>, StorageError> {
        quiz_tests::find_latest(&self.pool).await.map_err(|err| classify(err, "test"))
    }

    async fn list_recent_tests(&self, limit: i64) -> Result<Vec<QuizTest>, StorageError> {
        quiz_tests::list_recent(&self.pool, limit).await.map_err(|err| classify(err, "test"))
    }

    async fn get_test(&self, id: i64) -> Result<Option<QuizTest>, StorageError> {
        quiz_tests::find_by_id(&self.pool, id).await.map_err(|err| classify(err, "test"))
    }

    async fn insert_result(&self, params: CreateResult<'_>) -> Result<QuizResult, StorageError> {
        results::create(&self.pool, params).await.map_err(|err| classify(err, "result"))
    }

    async fn list_results_for_student(
        &self,
        student_tg_id: i64,
        limit: i64,
    ) -> Result<Vec<QuizResult>, StorageError> {
        results::list_by_student(&self.pool, student_tg_id, limit)
            .await
            .map_err(|err| classify(err, "result"))
    }

    async fn list_all_results_joined_with_students(
        &self,
    ) -> Result<Vec<ResultExportRow>, StorageError> {
        results::list_for_export(&self.pool).await.map_err(|err| classify(err, "result"))
    }

    async fn delete_all_tests_and_results(&self) -> Result<(u64, u64), StorageError> {
        Ok(quiz_tests::delete_all_with_results(&self.pool).await?)
    }
}
