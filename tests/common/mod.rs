// Shared test helpers — not all items used by every test binary.
#![allow(unused)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use dabo::bus::{InboundEvent, Payload};
use dabo::channels::{Keyboard, Messenger};
use dabo::config::{Config, PaymentConfig, TelegramConfig};
use dabo::errors::BotError;
use dabo::payment::{PaymentGateway, PaymentInit};
use dabo::schedule::ServiceMode;

pub const MERCHANT_CHANNEL: &str = "-1001234567890";
pub const ADMIN: &str = "selam";

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub keyboard: Keyboard,
}

/// Records every outbound message, edit and venue pin.
pub struct MockMessenger {
    pub sent: Mutex<Vec<SentMessage>>,
    pub edits: Mutex<Vec<(String, String, String)>>,
    pub venues: Mutex<Vec<(String, f64, f64)>>,
}

impl MockMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            venues: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_to(&self, chat_id: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn last_text(&self, chat_id: &str) -> String {
        self.sent_to(chat_id)
            .last()
            .map(|m| m.text.clone())
            .unwrap_or_default()
    }

    /// Callback data of the first inline button whose label contains
    /// `label_part`, searching the most recent message first.
    pub fn inline_data(&self, chat_id: &str, label_part: &str) -> Option<String> {
        for message in self.sent_to(chat_id).into_iter().rev() {
            if let Keyboard::Inline(rows) = &message.keyboard {
                for button in rows.iter().flatten() {
                    if button.label.contains(label_part) {
                        return Some(button.data.clone());
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Keyboard,
    ) -> anyhow::Result<Option<String>> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            keyboard,
        });
        Ok(Some(format!("msg-{}", sent.len())))
    }

    async fn edit_text(&self, chat_id: &str, message_id: &str, text: &str) -> anyhow::Result<()> {
        self.edits.lock().unwrap().push((
            chat_id.to_string(),
            message_id.to_string(),
            text.to_string(),
        ));
        Ok(())
    }

    async fn send_venue(
        &self,
        chat_id: &str,
        lat: f64,
        lon: f64,
        _title: &str,
        _address: &str,
    ) -> anyhow::Result<()> {
        self.venues.lock().unwrap().push((chat_id.to_string(), lat, lon));
        Ok(())
    }
}

/// Gateway fake whose settlement answer can be flipped mid-test.
pub struct FakeGateway {
    pub settled: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            settled: AtomicBool::new(false),
        })
    }

    pub fn settle(&self) {
        self.settled.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize(
        &self,
        _amount: u32,
        _currency: &str,
        _phone: &str,
        tx_ref: &str,
        _customer_name: &str,
    ) -> Result<PaymentInit, BotError> {
        Ok(PaymentInit {
            tx_ref: tx_ref.to_string(),
            checkout_url: Some("https://checkout.example/pay".to_string()),
            instructions: None,
        })
    }

    async fn verify(&self, _tx_ref: &str) -> Result<bool, BotError> {
        Ok(self.settled.load(Ordering::SeqCst))
    }
}

/// Config with a two-cafe catalog and the gate forced open, so tests do
/// not depend on the wall clock.
pub fn test_config(payments_enabled: bool) -> Config {
    let mut cafe_a = BTreeMap::new();
    cafe_a.insert("☕ Hot Drinks".to_string(), None);
    cafe_a.insert("Coffee".to_string(), Some(50));
    cafe_a.insert("Cake".to_string(), Some(100));
    let mut cafe_b = BTreeMap::new();
    cafe_b.insert("Burger".to_string(), Some(180));
    let mut catalog = BTreeMap::new();
    catalog.insert("Cafe A".to_string(), cafe_a);
    catalog.insert("Cafe B".to_string(), cafe_b);

    let mut config = Config::default();
    config.telegram = TelegramConfig {
        token: "123:test".to_string(),
        merchant_channel: MERCHANT_CHANNEL.to_string(),
        admins: vec![ADMIN.to_string()],
    };
    config.catalog = catalog;
    config.schedule.mode = ServiceMode::ForcedOpen;
    config.payments = PaymentConfig {
        enabled: payments_enabled,
        base_url: "https://gw.example/v1".to_string(),
        secret_key: "CHASECK_TEST".to_string(),
        currency: "ETB".to_string(),
    };
    config
}

pub fn text_event(chat_id: &str, content: &str) -> InboundEvent {
    InboundEvent {
        chat_id: chat_id.to_string(),
        sender_name: "Abebe".to_string(),
        username: Some("abebe".to_string()),
        payload: Payload::Text(content.to_string()),
        timestamp: Utc::now(),
    }
}

pub fn contact_event(chat_id: &str, phone: &str) -> InboundEvent {
    InboundEvent {
        payload: Payload::Contact {
            phone: phone.to_string(),
        },
        ..text_event(chat_id, "")
    }
}

pub fn location_event(chat_id: &str, lat: f64, lon: f64) -> InboundEvent {
    InboundEvent {
        payload: Payload::Location { lat, lon },
        ..text_event(chat_id, "")
    }
}

pub fn action_event(chat_id: &str, username: &str, data: &str) -> InboundEvent {
    InboundEvent {
        chat_id: chat_id.to_string(),
        sender_name: String::new(),
        username: Some(username.to_string()),
        payload: Payload::Action {
            data: data.to_string(),
        },
        timestamp: Utc::now(),
    }
}
