use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::AttachmentKind;
use crate::services::answers::{AnswerKey, AnswerSheet};
use crate::services::grading::Grade;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub(crate) struct Student {
    pub(crate) tg_id: i64,
    pub(crate) name: String,
}

/// Reference to a file already uploaded to the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) struct Attachment {
    pub(crate) file_id: String,
    pub(crate) kind: AttachmentKind,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizTest {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) file_id: String,
    pub(crate) file_type: AttachmentKind,
    pub(crate) correct_answers: Json<AnswerKey>,
    pub(crate) created_by: i64,
}

impl QuizTest {
    pub(crate) fn attachment(&self) -> Attachment {
        Attachment { file_id: self.file_id.clone(), kind: self.file_type }
    }

    pub(crate) fn answer_key(&self) -> &AnswerKey {
        &self.correct_answers.0
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizResult {
    pub(crate) id: i64,
    pub(crate) test_id: i64,
    pub(crate) student_tg_id: i64,
    pub(crate) raw_answers: Json<AnswerSheet>,
    pub(crate) correct_count: i64,
    pub(crate) wrong_count: i64,
    pub(crate) percent: f64,
    pub(crate) grade: Grade,
    pub(crate) timestamp: PrimitiveDateTime,
}

/// One line of the teacher's result export (results joined with students).
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ResultExportRow {
    pub(crate) name: String,
    pub(crate) test_id: i64,
    pub(crate) raw_answers: Json<AnswerSheet>,
    pub(crate) correct_count: i64,
    pub(crate) wrong_count: i64,
    pub(crate) percent: f64,
    pub(crate) grade: Grade,
    pub(crate) timestamp: PrimitiveDateTime,
}
