use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, Message as TgMessage, MessageId, MessageKind, ReplyMarkup, Update,
};
use tokio::sync::mpsc;

use crate::bus::{InboundEvent, Payload};
use crate::channels::{KeyButton, Keyboard, Messenger};
use crate::config::TelegramConfig;

/// Telegram transport: feeds decoded updates into the inbound queue and
/// implements [`Messenger`] for outbound delivery.
pub struct TelegramChannel {
    bot: Bot,
    inbound_tx: mpsc::UnboundedSender<InboundEvent>,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig, inbound_tx: mpsc::UnboundedSender<InboundEvent>) -> Self {
        let bot = Bot::new(&config.token);
        Self { bot, inbound_tx }
    }

    /// Spawn the long-polling dispatcher in a background task.
    pub fn start(&self) {
        tracing::info!("Starting Telegram dispatcher...");
        let bot = self.bot.clone();
        let message_tx = self.inbound_tx.clone();
        let action_tx = self.inbound_tx.clone();

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(move |msg: TgMessage| {
                let tx = message_tx.clone();
                async move {
                    if let MessageKind::Common(_) = &msg.kind {
                        if let Some(event) = decode_message(&msg) {
                            let _ = tx.send(event);
                        }
                    }
                    Ok::<(), anyhow::Error>(())
                }
            }))
            .branch(Update::filter_callback_query().endpoint(move |q: CallbackQuery| {
                let tx = action_tx.clone();
                async move {
                    if let Some(data) = q.data.clone() {
                        let event = InboundEvent {
                            chat_id: q.from.id.to_string(),
                            sender_name: q.from.full_name(),
                            username: q.from.username.clone(),
                            payload: Payload::Action { data },
                            timestamp: Utc::now(),
                        };
                        let _ = tx.send(event);
                    }
                    Ok::<(), anyhow::Error>(())
                }
            }));

        let mut dispatcher = Dispatcher::builder(bot, handler).build();
        tokio::spawn(async move {
            dispatcher.dispatch().await;
        });
        tracing::info!("Telegram channel started");
    }
}

fn decode_message(msg: &TgMessage) -> Option<InboundEvent> {
    let payload = if let Some(text) = msg.text() {
        Payload::Text(text.to_string())
    } else if let Some(contact) = msg.contact() {
        Payload::Contact {
            phone: contact.phone_number.clone(),
        }
    } else if let Some(location) = msg.location() {
        Payload::Location {
            lat: location.latitude,
            lon: location.longitude,
        }
    } else {
        return None;
    };

    let sender = msg.from();
    Some(InboundEvent {
        chat_id: msg.chat.id.to_string(),
        sender_name: sender.map(|u| u.full_name()).unwrap_or_default(),
        username: sender.and_then(|u| u.username.clone()),
        payload,
        timestamp: Utc::now(),
    })
}

fn to_reply_markup(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        Keyboard::Reply(rows) => {
            let rows: Vec<Vec<KeyboardButton>> = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|button| match button {
                            KeyButton::Text(label) => KeyboardButton::new(label),
                            KeyButton::RequestContact(label) => {
                                KeyboardButton::new(label).request(ButtonRequest::Contact)
                            }
                            KeyButton::RequestLocation(label) => {
                                KeyboardButton::new(label).request(ButtonRequest::Location)
                            }
                        })
                        .collect()
                })
                .collect();
            let mut markup = KeyboardMarkup::new(rows);
            markup.resize_keyboard = true;
            Some(ReplyMarkup::Keyboard(markup))
        }
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<InlineKeyboardButton>> = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|button| InlineKeyboardButton::callback(button.label, button.data))
                        .collect()
                })
                .collect();
            Some(ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(rows)))
        }
    }
}

fn parse_chat_id(chat_id: &str) -> Result<ChatId> {
    let id = chat_id
        .parse::<i64>()
        .with_context(|| format!("Invalid chat id: {chat_id}"))?;
    Ok(ChatId(id))
}

#[async_trait]
impl Messenger for TelegramChannel {
    async fn send(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<Option<String>> {
        let chat = parse_chat_id(chat_id)?;
        let request = self.bot.send_message(chat, text);
        let sent = match to_reply_markup(keyboard) {
            Some(markup) => request.reply_markup(markup).await?,
            None => request.await?,
        };
        Ok(Some(sent.id.0.to_string()))
    }

    async fn edit_text(&self, chat_id: &str, message_id: &str, text: &str) -> Result<()> {
        let chat = parse_chat_id(chat_id)?;
        let id = message_id
            .parse::<i32>()
            .with_context(|| format!("Invalid message id: {message_id}"))?;
        self.bot.edit_message_text(chat, MessageId(id), text).await?;
        Ok(())
    }

    async fn send_venue(
        &self,
        chat_id: &str,
        lat: f64,
        lon: f64,
        title: &str,
        address: &str,
    ) -> Result<()> {
        let chat = parse_chat_id(chat_id)?;
        self.bot.send_venue(chat, lat, lon, title, address).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_none_maps_to_no_markup() {
        assert!(to_reply_markup(Keyboard::None).is_none());
    }

    #[test]
    fn reply_keyboard_preserves_row_shape() {
        let markup = to_reply_markup(Keyboard::reply_rows(vec![
            vec!["a".into()],
            vec!["b".into(), "c".into()],
        ]));
        let Some(ReplyMarkup::Keyboard(kb)) = markup else {
            panic!("expected reply keyboard");
        };
        assert_eq!(kb.keyboard.len(), 2);
        assert_eq!(kb.keyboard[1].len(), 2);
        assert!(kb.resize_keyboard);
    }

    #[test]
    fn inline_keyboard_carries_callback_data() {
        let markup = to_reply_markup(Keyboard::Inline(vec![vec![
            crate::channels::InlineButton::new("✅ Accept", "accept:1:#2"),
        ]]));
        assert!(matches!(markup, Some(ReplyMarkup::InlineKeyboard(_))));
    }

    #[test]
    fn chat_ids_parse_including_channel_ids() {
        assert!(parse_chat_id("123456").is_ok());
        assert!(parse_chat_id("-1001234567890").is_ok());
        assert!(parse_chat_id("not-a-number").is_err());
    }
}
