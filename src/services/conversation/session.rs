use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::redis::RedisHandle;
use crate::db::models::Attachment;

const REDIS_KEY_PREFIX: &str = "mathbot:session";

/// Where a user is inside a multi-step flow. No session means idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub(crate) enum Session {
    AwaitingName,
    AwaitingTitle,
    AwaitingFile { title: String },
    AwaitingAnswerKey { title: String, attachment: Attachment },
    AwaitingAnswers { test_id: i64 },
    AwaitingConfirmation,
}

impl Session {
    pub(crate) fn is_teacher_flow(&self) -> bool {
        matches!(
            self,
            Session::AwaitingTitle
                | Session::AwaitingFile { .. }
                | Session::AwaitingAnswerKey { .. }
                | Session::AwaitingConfirmation
        )
    }

    pub(crate) fn state_name(&self) -> &'static str {
        match self {
            Session::AwaitingName => "awaiting_name",
            Session::AwaitingTitle => "awaiting_title",
            Session::AwaitingFile { .. } => "awaiting_file",
            Session::AwaitingAnswerKey { .. } => "awaiting_answer_key",
            Session::AwaitingAnswers { .. } => "awaiting_answers",
            Session::AwaitingConfirmation => "awaiting_confirmation",
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("session backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("stored session could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub(crate) trait SessionStore: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<Session>, SessionError>;

    async fn put(&self, user_id: i64, session: Session) -> Result<(), SessionError>;

    async fn clear(&self, user_id: i64) -> Result<(), SessionError>;
}

/// Process-local sessions, lost on restart.
#[derive(Clone, Default)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<i64, Session>>>,
}

impl InMemorySessionStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: i64) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.lock().await.get(&user_id).cloned())
    }

    async fn put(&self, user_id: i64, session: Session) -> Result<(), SessionError> {
        self.sessions.lock().await.insert(user_id, session);
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> Result<(), SessionError> {
        self.sessions.lock().await.remove(&user_id);
        Ok(())
    }
}

/// Sessions kept in Redis as JSON, shared by every bot process.
#[derive(Clone)]
pub(crate) struct RedisSessionStore {
    redis: RedisHandle,
}

impl RedisSessionStore {
    pub(crate) fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }
}

fn session_key(user_id: i64) -> String {
    format!("{REDIS_KEY_PREFIX}:{user_id}")
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, user_id: i64) -> Result<Option<Session>, SessionError> {
        let Some(raw) = self.redis.get_string(&session_key(user_id)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn put(&self, user_id: i64, session: Session) -> Result<(), SessionError> {
        let raw = serde_json::to_string(&session)?;
        self.redis.set_string(&session_key(user_id), &raw).await?;
        Ok(())
    }

    async fn clear(&self, user_id: i64) -> Result<(), SessionError> {
        self.redis.delete(&session_key(user_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::AttachmentKind;

    #[tokio::test]
    async fn in_memory_store_keeps_users_apart() {
        let store = InMemorySessionStore::new();
        store.put(1, Session::AwaitingTitle).await.expect("put");
        store.put(2, Session::AwaitingAnswers { test_id: 7 }).await.expect("put");

        assert_eq!(store.get(1).await.expect("get"), Some(Session::AwaitingTitle));
        assert_eq!(
            store.get(2).await.expect("get"),
            Some(Session::AwaitingAnswers { test_id: 7 })
        );

        store.clear(1).await.expect("clear");
        assert_eq!(store.get(1).await.expect("get"), None);
        assert!(store.get(2).await.expect("get").is_some());
    }

    #[test]
    fn session_json_is_tagged_by_state() {
        let session = Session::AwaitingAnswerKey {
            title: "Algebra 1".to_string(),
            attachment: Attachment { file_id: "F1".to_string(), kind: AttachmentKind::Photo },
        };
        let value = serde_json::to_value(&session).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "state": "awaiting_answer_key",
                "title": "Algebra 1",
                "attachment": {"file_id": "F1", "kind": "photo"}
            })
        );

        let decoded: Session = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, session);
    }

    #[test]
    fn redis_keys_are_namespaced() {
        assert_eq!(session_key(42), "mathbot:session:42");
    }

    #[test]
    fn teacher_flows_are_flagged() {
        assert!(Session::AwaitingTitle.is_teacher_flow());
        assert!(Session::AwaitingConfirmation.is_teacher_flow());
        assert!(!Session::AwaitingName.is_teacher_flow());
        assert!(!Session::AwaitingAnswers { test_id: 1 }.is_teacher_flow());
    }
}
