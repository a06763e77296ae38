use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::bus::Action;
use crate::channels::{InlineButton, Keyboard, Messenger};
use crate::errors::BotError;
use crate::order::{Order, OrderStatus};
use crate::session::Session;
use crate::texts::{Lang, Text, fill, text};

/// A merchant decision on a published order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: Decision,
    pub actor: String,
}

struct PublishedOrder {
    order: Order,
    customer_chat: String,
    lang: Lang,
    message_id: Option<String>,
    card_text: String,
    resolution: Option<Resolution>,
}

/// Presents orders to the merchant channel and resolves each exactly once.
///
/// The published-orders map is the decision gate: the check-and-set of the
/// resolution marker happens in a single lock scope, so concurrent merchant
/// clicks cannot both win. Message editing and customer notification happen
/// after the gate and do not affect at-most-once semantics.
pub struct ArbitrationHandler {
    messenger: Arc<dyn Messenger>,
    merchant_channel: String,
    currency: String,
    authorized: HashSet<String>,
    published: Mutex<HashMap<String, PublishedOrder>>,
}

impl ArbitrationHandler {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        merchant_channel: impl Into<String>,
        currency: impl Into<String>,
        authorized: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            messenger,
            merchant_channel: merchant_channel.into(),
            currency: currency.into(),
            authorized: authorized.into_iter().map(|a| a.to_lowercase()).collect(),
            published: Mutex::new(HashMap::new()),
        }
    }

    /// Whether this actor identity may resolve orders or drive admin
    /// commands.
    pub fn is_authorized(&self, username: Option<&str>) -> bool {
        username.is_some_and(|name| self.authorized.contains(&name.to_lowercase()))
    }

    /// Publish a Pending order to the merchant channel: a map pin plus an
    /// order card with mutually exclusive Accept/Decline buttons.
    ///
    /// Nothing is recorded unless both sends succeed, so a failed publish
    /// leaves no half-published order behind.
    pub async fn publish(&self, order: Order, session: &Session) -> Result<(), BotError> {
        let customer_name = session.display_name.clone().unwrap_or_default();
        self.messenger
            .send_venue(
                &self.merchant_channel,
                order.location.lat,
                order.location.lon,
                &format!("Order {}", order.id),
                &format!("Customer: {customer_name}"),
            )
            .await?;

        let card_text = format!(
            "📦 ORDER {id}\n\n👤 {name}\n📞 {phone}\n@{username}\n\n🛒 ITEMS:\n{items}\n\n💵 Total: {total} {currency}",
            id = order.id,
            name = customer_name,
            phone = session.phone.as_deref().unwrap_or("No Phone"),
            username = session.username.as_deref().unwrap_or("NoUsername"),
            items = order.summary(),
            total = order.total,
            currency = self.currency,
        );
        let buttons = Keyboard::Inline(vec![vec![
            InlineButton::new(
                "✅ Accept",
                Action::Accept {
                    chat_id: session.chat_id.clone(),
                    order_id: order.id.clone(),
                }
                .encode(),
            ),
            InlineButton::new(
                "❌ Decline",
                Action::Decline {
                    chat_id: session.chat_id.clone(),
                    order_id: order.id.clone(),
                }
                .encode(),
            ),
        ]]);
        let message_id = self
            .messenger
            .send(&self.merchant_channel, &card_text, buttons)
            .await?;

        info!(order = %order.id, "Order published to merchant channel");
        let mut published = self.published.lock().await;
        published.insert(
            order.id.clone(),
            PublishedOrder {
                customer_chat: session.chat_id.clone(),
                lang: session.lang(),
                message_id,
                card_text,
                order,
                resolution: None,
            },
        );
        Ok(())
    }

    /// Resolve an order at most once. The first call transitions the status
    /// out of Pending, edits the published card and notifies the customer;
    /// any later call (or a call for an unknown order) is a no-op returning
    /// `None`.
    pub async fn resolve(
        &self,
        order_id: &str,
        decision: Decision,
        actor: &str,
    ) -> Option<Resolution> {
        let resolution = Resolution {
            decision,
            actor: actor.to_string(),
        };

        // Check-and-set of the decision marker in one lock scope; this is
        // the entire mutual exclusion for concurrent clicks.
        let (customer_chat, lang, message_id, card_text, order_label) = {
            let mut published = self.published.lock().await;
            let entry = published.get_mut(order_id)?;
            if entry.resolution.is_some() {
                info!(order = %order_id, "Order already resolved, ignoring");
                return None;
            }
            entry.resolution = Some(resolution.clone());
            entry.order.status = match decision {
                Decision::Accept => OrderStatus::Accepted,
                Decision::Decline => OrderStatus::Declined,
            };
            (
                entry.customer_chat.clone(),
                entry.lang,
                entry.message_id.clone(),
                entry.card_text.clone(),
                entry.order.id.clone(),
            )
        };

        let marker = match decision {
            Decision::Accept => format!("✅ Accepted by {actor}"),
            Decision::Decline => format!("❌ Declined by {actor}"),
        };
        if let Some(message_id) = message_id {
            let edited = format!("{card_text}\n\n{marker}");
            if let Err(e) = self
                .messenger
                .edit_text(&self.merchant_channel, &message_id, &edited)
                .await
            {
                error!(order = %order_id, "Failed to edit merchant card: {e:#}");
            }
        }

        let outcome_key = match decision {
            Decision::Accept => Text::OrderAccepted,
            Decision::Decline => Text::OrderDeclined,
        };
        let notice = fill(text(lang, outcome_key), &[&order_label]);
        if let Err(e) = self
            .messenger
            .send(&customer_chat, &notice, Keyboard::None)
            .await
        {
            error!(order = %order_id, "Failed to notify customer of decision: {e:#}");
        }

        info!(order = %order_id, actor = %actor, ?decision, "Order resolved");
        Some(resolution)
    }

    /// Status of a published order, if known.
    pub async fn status(&self, order_id: &str) -> Option<OrderStatus> {
        self.published
            .lock()
            .await
            .get(order_id)
            .map(|p| p.order.status)
    }

    pub async fn published_count(&self) -> usize {
        self.published.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartManager;
    use crate::catalog::test_fixtures::sample_catalog;
    use crate::geofence::GeofenceBounds;
    use crate::order::OrderIssuer;
    use crate::session::GeoPoint;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingMessenger {
        sends: StdMutex<Vec<(String, String)>>,
        edits: StdMutex<Vec<(String, String)>>,
        venues: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(
            &self,
            chat_id: &str,
            text: &str,
            _keyboard: Keyboard,
        ) -> anyhow::Result<Option<String>> {
            let mut sends = self.sends.lock().unwrap();
            sends.push((chat_id.to_string(), text.to_string()));
            Ok(Some(sends.len().to_string()))
        }

        async fn edit_text(
            &self,
            _chat_id: &str,
            message_id: &str,
            text: &str,
        ) -> anyhow::Result<()> {
            self.edits
                .lock()
                .unwrap()
                .push((message_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn send_venue(
            &self,
            chat_id: &str,
            _lat: f64,
            _lon: f64,
            title: &str,
            _address: &str,
        ) -> anyhow::Result<()> {
            self.venues
                .lock()
                .unwrap()
                .push(format!("{chat_id}:{title}"));
            Ok(())
        }
    }

    fn customer_session() -> Session {
        let mut session = Session::new("777");
        session.lang = Some(Lang::En);
        session.phone = Some("0911000000".into());
        session.display_name = Some("Abebe".into());
        session.username = Some("abebe".into());
        session.location = Some(GeoPoint { lat: 7.9, lon: 38.1 });
        session
    }

    fn published_order(messenger: Arc<RecordingMessenger>) -> (Arc<ArbitrationHandler>, Order) {
        let catalog = sample_catalog();
        let geofence = GeofenceBounds {
            min_lat: 7.85,
            max_lat: 8.0,
            min_lon: 38.0,
            max_lon: 38.2,
        };
        let mut session = customer_session();
        CartManager::new(&catalog, 39)
            .add_item(&mut session, "Cafe A", "Coffee")
            .unwrap();
        let order = OrderIssuer::new(&catalog, &geofence, 39)
            .issue(&session)
            .unwrap();

        let handler = Arc::new(ArbitrationHandler::new(
            messenger,
            "-100999",
            "ETB",
            vec!["merchant".to_string()],
        ));
        (handler, order)
    }

    async fn publish(handler: &ArbitrationHandler, order: &Order) {
        handler
            .publish(order.clone(), &customer_session())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_sends_venue_and_card_with_buttons() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (handler, order) = published_order(messenger.clone());
        publish(&handler, &order).await;

        assert_eq!(messenger.venues.lock().unwrap().len(), 1);
        let sends = messenger.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, "-100999");
        assert!(sends[0].1.contains(&order.id));
        assert!(sends[0].1.contains("Total: 89 ETB"));
    }

    #[tokio::test]
    async fn first_resolution_wins_and_second_is_a_noop() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (handler, order) = published_order(messenger.clone());
        publish(&handler, &order).await;

        let first = handler.resolve(&order.id, Decision::Accept, "Merchant A").await;
        let second = handler.resolve(&order.id, Decision::Decline, "Merchant B").await;
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(handler.status(&order.id).await, Some(OrderStatus::Accepted));

        // One publish card + exactly one customer notification.
        let sends = messenger.sends.lock().unwrap();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[1].0, "777");
        assert!(sends[1].1.contains(&order.id));

        // The card was edited once, carrying the decision marker and actor.
        let edits = messenger.edits.lock().unwrap();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.contains("✅ Accepted by Merchant A"));
    }

    #[tokio::test]
    async fn concurrent_accept_and_decline_produce_one_transition() {
        let messenger = Arc::new(RecordingMessenger::default());
        let (handler, order) = published_order(messenger.clone());
        publish(&handler, &order).await;

        let accept = {
            let h = handler.clone();
            let id = order.id.clone();
            tokio::spawn(async move { h.resolve(&id, Decision::Accept, "A").await })
        };
        let decline = {
            let h = handler.clone();
            let id = order.id.clone();
            tokio::spawn(async move { h.resolve(&id, Decision::Decline, "B").await })
        };

        let (ra, rb) = (accept.await.unwrap(), decline.await.unwrap());
        assert_eq!(
            usize::from(ra.is_some()) + usize::from(rb.is_some()),
            1,
            "exactly one click must win"
        );
        let status = handler.status(&order.id).await.unwrap();
        assert_ne!(status, OrderStatus::Pending);

        // One publish + exactly one customer notification, never two.
        assert_eq!(messenger.sends.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn resolving_an_unknown_order_is_a_noop() {
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = ArbitrationHandler::new(messenger.clone(), "-100999", "ETB", vec![]);
        assert!(handler.resolve("#404", Decision::Accept, "A").await.is_none());
        assert!(messenger.sends.lock().unwrap().is_empty());
    }

    #[test]
    fn authorization_is_case_insensitive_over_the_configured_set() {
        let messenger = Arc::new(RecordingMessenger::default());
        let handler = ArbitrationHandler::new(
            messenger,
            "-100999",
            "ETB",
            vec!["Kanzedin".to_string(), "backup_admin".to_string()],
        );
        assert!(handler.is_authorized(Some("kanzedin")));
        assert!(handler.is_authorized(Some("BACKUP_ADMIN")));
        assert!(!handler.is_authorized(Some("stranger")));
        assert!(!handler.is_authorized(None));
    }
}
