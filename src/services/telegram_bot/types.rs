use serde::Deserialize;

use crate::db::models::Attachment;
use crate::db::types::AttachmentKind;
use crate::services::conversation::{ButtonAction, Inbound, Incoming};

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub(crate) update_id: i64,
    pub(crate) message: Option<TgMessage>,
    pub(crate) callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
    photo: Option<Vec<TgPhotoSize>>,
    document: Option<TgDocument>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgCallbackQuery {
    pub(crate) id: String,
    from: TgUser,
    message: Option<TgMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    #[serde(rename = "type")]
    chat_type: String,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgPhotoSize {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct TgDocument {
    file_id: String,
}

impl TgChat {
    fn is_private(&self) -> bool {
        self.chat_type == "private"
    }
}

impl TgMessage {
    /// Private-chat messages only; group traffic is dropped.
    pub(crate) fn to_incoming(&self) -> Option<Incoming> {
        let from = self.from.as_ref()?;
        if !self.chat.is_private() {
            return None;
        }

        let payload = if let Some(text) = &self.text {
            Inbound::Text(text.clone())
        } else if let Some(largest) = self.photo.as_ref().and_then(|sizes| sizes.last()) {
            Inbound::Attachment(Attachment {
                file_id: largest.file_id.clone(),
                kind: AttachmentKind::Photo,
            })
        } else if let Some(document) = &self.document {
            Inbound::Attachment(Attachment {
                file_id: document.file_id.clone(),
                kind: AttachmentKind::Document,
            })
        } else {
            Inbound::Unsupported
        };

        Some(Incoming { user_id: from.id, payload })
    }
}

impl TgCallbackQuery {
    pub(crate) fn to_incoming(&self) -> Option<Incoming> {
        if let Some(message) = &self.message {
            if !message.chat.is_private() {
                return None;
            }
        }

        let payload = self
            .data
            .as_deref()
            .and_then(ButtonAction::parse)
            .map(Inbound::Button)
            .unwrap_or(Inbound::Unsupported);
        Some(Incoming { user_id: self.from.id, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(value: serde_json::Value) -> TgUpdate {
        serde_json::from_value(value).expect("update")
    }

    #[test]
    fn private_text_becomes_incoming_text() {
        let update = update(json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42, "is_bot": false, "first_name": "Aziz"},
                "text": "1a2b"
            }
        }));
        let incoming = update.message.expect("message").to_incoming();
        assert_eq!(incoming, Some(Incoming::text(42, "1a2b")));
    }

    #[test]
    fn largest_photo_is_used() {
        let update = update(json!({
            "update_id": 11,
            "message": {
                "message_id": 2,
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42},
                "photo": [{"file_id": "small"}, {"file_id": "large"}],
                "caption": "test"
            }
        }));
        let incoming = update.message.expect("message").to_incoming().expect("incoming");
        assert_eq!(
            incoming.payload,
            Inbound::Attachment(Attachment {
                file_id: "large".to_string(),
                kind: AttachmentKind::Photo
            })
        );
    }

    #[test]
    fn documents_are_attachments() {
        let update = update(json!({
            "update_id": 12,
            "message": {
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42},
                "document": {"file_id": "doc-1", "file_name": "test.pdf"}
            }
        }));
        let incoming = update.message.expect("message").to_incoming().expect("incoming");
        assert_eq!(
            incoming.payload,
            Inbound::Attachment(Attachment {
                file_id: "doc-1".to_string(),
                kind: AttachmentKind::Document
            })
        );
    }

    #[test]
    fn group_messages_are_ignored() {
        let update = update(json!({
            "update_id": 13,
            "message": {
                "chat": {"id": -100, "type": "supergroup"},
                "from": {"id": 42},
                "text": "/start"
            }
        }));
        assert_eq!(update.message.expect("message").to_incoming(), None);
    }

    #[test]
    fn stickers_are_unsupported() {
        let update = update(json!({
            "update_id": 14,
            "message": {
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42},
                "sticker": {"file_id": "s"}
            }
        }));
        let incoming = update.message.expect("message").to_incoming().expect("incoming");
        assert_eq!(incoming.payload, Inbound::Unsupported);
    }

    #[test]
    fn callback_data_maps_to_button() {
        let update = update(json!({
            "update_id": 15,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 42},
                "message": {"chat": {"id": 42, "type": "private"}},
                "data": "answer_7"
            }
        }));
        let query = update.callback_query.expect("callback");
        assert_eq!(query.id, "cb-1");
        assert_eq!(query.to_incoming(), Some(Incoming::button(42, ButtonAction::Answer(7))));
    }

    #[test]
    fn unknown_callback_data_is_unsupported() {
        let update = update(json!({
            "update_id": 16,
            "callback_query": {"id": "cb-2", "from": {"id": 42}, "data": "legacy_button"}
        }));
        let incoming = update.callback_query.expect("callback").to_incoming().expect("incoming");
        assert_eq!(incoming.payload, Inbound::Unsupported);
    }
}
