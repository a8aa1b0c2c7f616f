use async_trait::async_trait;

use crate::db::models::Attachment;

/// One inbound event from a user, already stripped of transport details.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Incoming {
    pub(crate) user_id: i64,
    pub(crate) payload: Inbound,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    Text(String),
    Attachment(Attachment),
    Button(ButtonAction),
    /// Stickers, voice notes, unknown buttons and the like.
    Unsupported,
}

#[cfg(test)]
impl Incoming {
    pub(crate) fn text(user_id: i64, text: impl Into<String>) -> Self {
        Self { user_id, payload: Inbound::Text(text.into()) }
    }

    pub(crate) fn attachment(user_id: i64, attachment: Attachment) -> Self {
        Self { user_id, payload: Inbound::Attachment(attachment) }
    }

    pub(crate) fn button(user_id: i64, action: ButtonAction) -> Self {
        Self { user_id, payload: Inbound::Button(action) }
    }
}

/// Inline button payloads. The wire form is what Telegram echoes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ButtonAction {
    Answer(i64),
    Broadcast(i64),
    ConfirmClean,
    CancelClean,
}

impl ButtonAction {
    pub(crate) fn parse(data: &str) -> Option<Self> {
        match data {
            "confirm_clean" => return Some(ButtonAction::ConfirmClean),
            "cancel_clean" => return Some(ButtonAction::CancelClean),
            _ => {}
        }

        if let Some(id) = data.strip_prefix("answer_") {
            return id.parse().ok().map(ButtonAction::Answer);
        }
        if let Some(id) = data.strip_prefix("send_") {
            return id.parse().ok().map(ButtonAction::Broadcast);
        }
        None
    }

    pub(crate) fn callback_data(self) -> String {
        match self {
            ButtonAction::Answer(id) => format!("answer_{id}"),
            ButtonAction::Broadcast(id) => format!("send_{id}"),
            ButtonAction::ConfirmClean => "confirm_clean".to_string(),
            ButtonAction::CancelClean => "cancel_clean".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Teacher,
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InlineButton {
    pub(crate) text: String,
    pub(crate) action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Keyboard {
    MainMenu(Role),
    /// Rows of inline buttons attached to the message.
    Inline(Vec<Vec<InlineButton>>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutboundBody {
    Text(String),
    Attachment { attachment: Attachment, caption: String },
    /// A freshly generated file, e.g. the results export.
    Upload { filename: String, content: Vec<u8>, caption: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outbound {
    pub(crate) chat_id: i64,
    pub(crate) body: OutboundBody,
    pub(crate) keyboard: Option<Keyboard>,
}

impl Outbound {
    pub(crate) fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self { chat_id, body: OutboundBody::Text(text.into()), keyboard: None }
    }

    pub(crate) fn attachment(chat_id: i64, attachment: Attachment, caption: String) -> Self {
        Self { chat_id, body: OutboundBody::Attachment { attachment, caption }, keyboard: None }
    }

    pub(crate) fn upload(chat_id: i64, filename: &str, content: Vec<u8>, caption: &str) -> Self {
        Self {
            chat_id,
            body: OutboundBody::Upload {
                filename: filename.to_string(),
                content,
                caption: caption.to_string(),
            },
            keyboard: None,
        }
    }

    pub(crate) fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Text or caption, whichever the message carries.
    #[cfg(test)]
    pub(crate) fn text_content(&self) -> &str {
        match &self.body {
            OutboundBody::Text(text) => text,
            OutboundBody::Attachment { caption, .. } | OutboundBody::Upload { caption, .. } => {
                caption
            }
        }
    }
}

/// Delivers outbound messages over whatever transport the bot runs on.
#[async_trait]
pub(crate) trait Messenger: Send + Sync {
    async fn deliver(&self, message: &Outbound) -> anyhow::Result<()>;
}
