mod client;
mod types;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::core::shutdown::shutdown_signal;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::conversation::ConversationEngine;

pub(crate) use client::TelegramClient;
use types::TgUpdate;

const BOT_OFFSET_KEY: &str = "default";
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Long-polling loop feeding Telegram updates into the conversation engine,
/// one update at a time.
pub(crate) struct TelegramBotRuntime {
    state: AppState,
    client: TelegramClient,
    engine: ConversationEngine,
}

impl TelegramBotRuntime {
    pub(crate) fn new(state: AppState, client: TelegramClient, engine: ConversationEngine) -> Self {
        Self { state, client, engine }
    }

    pub(crate) async fn run(&self) -> Result<()> {
        if self.state.settings().telegram().token.is_empty() {
            return Err(anyhow!("BOT_TOKEN is empty, the bot cannot start"));
        }

        let mut offset = repositories::telegram_offsets::load(self.state.db(), BOT_OFFSET_KEY)
            .await
            .context("Failed to load persisted Telegram updates offset")?
            .unwrap_or(0);

        tracing::info!(offset, "Telegram bot runtime started");

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            let timeout = self.state.settings().telegram().poll_timeout_seconds;
            let updates = tokio::select! {
                _ = &mut shutdown => break,
                updates = self.client.get_updates(offset, timeout) => updates,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(error) => {
                    tracing::error!(error = %error, "Failed to fetch Telegram updates");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => continue,
                    }
                }
            };

            for update in updates {
                offset = update.update_id + 1;
                self.handle_update(update).await;
                if let Err(error) = repositories::telegram_offsets::store(
                    self.state.db(),
                    BOT_OFFSET_KEY,
                    offset,
                    primitive_now_utc(),
                )
                .await
                {
                    tracing::error!(
                        error = %error,
                        offset,
                        "Failed to persist Telegram updates offset"
                    );
                }
            }
        }

        tracing::info!(offset, "Telegram bot runtime stopped");
        Ok(())
    }

    async fn handle_update(&self, update: TgUpdate) {
        metrics::counter!("telegram_updates_total").increment(1);

        if let Some(query) = update.callback_query {
            if let Err(error) = self.client.answer_callback_query(&query.id).await {
                tracing::warn!(error = %error, "Failed to acknowledge Telegram callback query");
            }
            if let Some(incoming) = query.to_incoming() {
                self.engine.handle(incoming).await;
            }
            return;
        }

        if let Some(incoming) = update.message.as_ref().and_then(|message| message.to_incoming()) {
            self.engine.handle(incoming).await;
        } else {
            tracing::debug!(update_id = update.update_id, "Skipping Telegram update");
        }
    }
}
