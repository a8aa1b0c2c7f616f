use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::types::AttachmentKind;
use crate::services::conversation::texts::{STUDENT_MENU, TEACHER_MENU};
use crate::services::conversation::{Keyboard, Messenger, Outbound, OutboundBody, Role};

use super::types::TgUpdate;

const API_BASE: &str = "https://api.telegram.org";
const MENU_ROW_WIDTH: usize = 2;

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

/// Thin Bot API client. Every call checks the `ok` flag of the envelope.
#[derive(Clone)]
pub(crate) struct TelegramClient {
    client: Client,
    token: String,
}

impl TelegramClient {
    pub(crate) fn new(token: String) -> Self {
        Self { client: Client::new(), token }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.token)
    }

    pub(crate) async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<TgUpdate>> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("timeout", timeout.to_string()),
                ("offset", offset.to_string()),
                ("allowed_updates", r#"["message","callback_query"]"#.to_string()),
            ])
            .send()
            .await
            .context("Telegram getUpdates request failed")?;

        let parsed: TgResponse<Vec<TgUpdate>> =
            response.json().await.context("Failed to decode Telegram getUpdates payload")?;
        unwrap_envelope("getUpdates", parsed)
    }

    pub(crate) async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        self.call("answerCallbackQuery", json!({ "callback_query_id": callback_query_id })).await
    }

    async fn call(&self, method: &str, payload: Value) -> Result<()> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;

        let parsed: TgResponse<Value> = response
            .json()
            .await
            .with_context(|| format!("Failed to decode Telegram {method} payload"))?;
        unwrap_envelope(method, parsed).map(|_| ())
    }

    async fn upload_document(
        &self,
        chat_id: i64,
        filename: &str,
        content: Vec<u8>,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let part = Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .context("Invalid upload mime type")?;
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);
        if let Some(keyboard) = keyboard {
            form = form.text("reply_markup", reply_markup(keyboard).to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .context("Telegram sendDocument upload failed")?;

        let parsed: TgResponse<Value> =
            response.json().await.context("Failed to decode Telegram sendDocument payload")?;
        unwrap_envelope("sendDocument", parsed).map(|_| ())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn deliver(&self, message: &Outbound) -> Result<()> {
        if let OutboundBody::Upload { filename, content, caption } = &message.body {
            return self
                .upload_document(
                    message.chat_id,
                    filename,
                    content.clone(),
                    caption,
                    message.keyboard.as_ref(),
                )
                .await;
        }

        let (method, payload) = outbound_payload(message);
        self.call(method, payload).await
    }
}

fn unwrap_envelope<T>(method: &str, response: TgResponse<T>) -> Result<T> {
    if !response.ok {
        let description =
            response.description.unwrap_or_else(|| "unknown Telegram API error".to_string());
        return Err(anyhow!("Telegram {method} returned ok=false: {description}"));
    }
    response.result.ok_or_else(|| anyhow!("Telegram {method} returned no result"))
}

/// Bot API method and JSON body for messages that reference existing files
/// or carry plain text.
fn outbound_payload(message: &Outbound) -> (&'static str, Value) {
    let (method, mut payload) = match &message.body {
        OutboundBody::Text(text) => {
            ("sendMessage", json!({ "chat_id": message.chat_id, "text": text }))
        }
        OutboundBody::Attachment { attachment, caption } => match attachment.kind {
            AttachmentKind::Photo => (
                "sendPhoto",
                json!({
                    "chat_id": message.chat_id,
                    "photo": attachment.file_id,
                    "caption": caption,
                }),
            ),
            AttachmentKind::Document => (
                "sendDocument",
                json!({
                    "chat_id": message.chat_id,
                    "document": attachment.file_id,
                    "caption": caption,
                }),
            ),
        },
        OutboundBody::Upload { caption, .. } => {
            ("sendMessage", json!({ "chat_id": message.chat_id, "text": caption }))
        }
    };

    if let Some(keyboard) = &message.keyboard {
        payload["reply_markup"] = reply_markup(keyboard);
    }
    (method, payload)
}

fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::MainMenu(role) => {
            let labels = match role {
                Role::Teacher => TEACHER_MENU,
                Role::Student => STUDENT_MENU,
            };
            let rows = labels
                .chunks(MENU_ROW_WIDTH)
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            json!({ "keyboard": rows, "resize_keyboard": true })
        }
        Keyboard::Inline(rows) => {
            let rows = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| {
                            json!({
                                "text": button.text,
                                "callback_data": button.action.callback_data(),
                            })
                        })
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();
            json!({ "inline_keyboard": rows })
        }
    }
}
