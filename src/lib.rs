pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;

use crate::core::config::{SessionBackend, Settings};
use crate::core::{redis::RedisHandle, state::AppState, telemetry};
use crate::repositories::PgQuizRepository;
use crate::services::conversation::session::{
    InMemorySessionStore, RedisSessionStore, SessionStore,
};
use crate::services::conversation::ConversationEngine;
use crate::services::role_policy::RolePolicy;
use crate::services::telegram_bot::{TelegramBotRuntime, TelegramClient};

pub async fn run_telegram_bot() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await.context("Failed to connect to Postgres")?;
    db::run_migrations(&db_pool).await.context("Failed to run database migrations")?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    let session_backend = settings.session().backend;
    match redis.connect().await {
        Ok(()) => tracing::info!("Redis connected successfully"),
        Err(err) if session_backend == SessionBackend::Redis => {
            return Err(err).context("Redis is required by SESSION_BACKEND=redis");
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to connect to Redis; sessions stay in memory");
        }
    }

    let roles = RolePolicy::new(settings.telegram().teacher_ids.iter().copied());
    if roles.teacher_count() == 0 {
        tracing::warn!("TEACHER_IDS is empty; nobody can upload tests");
    }

    let state = AppState::new(settings, db_pool, redis);
    let sessions: Arc<dyn SessionStore> = match session_backend {
        SessionBackend::Memory => Arc::new(InMemorySessionStore::new()),
        SessionBackend::Redis => Arc::new(RedisSessionStore::new(state.redis().clone())),
    };

    let client = TelegramClient::new(state.settings().telegram().token.clone());
    let engine = ConversationEngine::new(
        Arc::new(PgQuizRepository::new(state.db().clone())),
        sessions,
        Arc::new(client.clone()),
        roles,
        state.settings().quiz().clone(),
    );

    let redis_connected = state.redis().is_connected().await;
    tracing::info!(
        environment = state.settings().runtime().environment.as_str(),
        session_backend = session_backend.as_str(),
        redis_connected,
        "Math quiz bot starting"
    );

    let result = TelegramBotRuntime::new(state.clone(), client, engine).run().await;

    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");

    result
}
