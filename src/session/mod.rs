pub mod store;

pub use store::SessionStore;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::catalog::MenuKey;
use crate::texts::Lang;

/// A delivery location as reported by the messaging channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Per-customer conversational state.
///
/// Created on first contact with all optional fields empty, mutated
/// throughout the conversation, never explicitly destroyed — sessions live
/// for the process lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque customer identity (the chat id of the messaging channel).
    pub chat_id: String,
    pub lang: Option<Lang>,
    pub phone: Option<String>,
    /// Customer display name as reported by the channel, for merchant cards.
    pub display_name: Option<String>,
    pub username: Option<String>,
    /// At most one active cafe at a time; cleared by "back" and "cancel".
    pub current_cafe: Option<String>,
    /// (cafe, item) → quantity. Keys are unique by construction.
    pub cart: BTreeMap<MenuKey, u32>,
    pub location: Option<GeoPoint>,
    /// Set when checkout has requested a location and the next location
    /// payload should be consumed; location payloads are otherwise ignored.
    pub awaiting_location: bool,
    /// Correlation to an in-flight payment attempt, if any.
    pub pending_tx: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conversation position derived from session fields. Terminal resolution
/// (accepted/declined) is a property of the order, not the session — the
/// session returns to browsing once an order is out the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    LanguageSelect,
    PhoneCollect,
    MenuBrowse,
    ItemSelect,
    Checkout,
    PaymentPending,
}

impl Session {
    pub fn new(chat_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            chat_id: chat_id.into(),
            lang: None,
            phone: None,
            display_name: None,
            username: None,
            current_cafe: None,
            cart: BTreeMap::new(),
            location: None,
            awaiting_location: false,
            pending_tx: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lang(&self) -> Lang {
        self.lang.unwrap_or_default()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn state(&self) -> ConversationState {
        if self.lang.is_none() {
            ConversationState::LanguageSelect
        } else if self.phone.is_none() {
            ConversationState::PhoneCollect
        } else if self.pending_tx.is_some() {
            ConversationState::PaymentPending
        } else if self.awaiting_location {
            ConversationState::Checkout
        } else if self.current_cafe.is_some() {
            ConversationState::ItemSelect
        } else {
            ConversationState::MenuBrowse
        }
    }
}
