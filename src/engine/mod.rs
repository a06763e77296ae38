use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::arbitration::{ArbitrationHandler, Decision};
use crate::broadcast::BroadcastNotifier;
use crate::bus::{Action, InboundEvent, Payload};
use crate::cart::CartManager;
use crate::catalog::Catalog;
use crate::channels::{KeyButton, Keyboard, Messenger};
use crate::config::Config;
use crate::errors::{BotError, Precondition};
use crate::geofence::GeofenceBounds;
use crate::order::{Order, OrderIssuer};
use crate::payment::{PaymentCoordinator, PaymentGateway, PaymentInit};
use crate::schedule::{ServiceGate, ServiceMode};
use crate::session::{GeoPoint, Session, SessionStore};
use crate::texts::{self, Lang, Text, fill, text};

/// The conversation state machine.
///
/// Drives session transitions from inbound events, delegating to the cart,
/// geofence, order issuer, payment coordinator and arbitration handler.
/// Events for the same session are serialized by holding the session's
/// lock for the duration of handling; events for different sessions run
/// concurrently.
pub struct Engine {
    catalog: Catalog,
    geofence: GeofenceBounds,
    gate: ServiceGate,
    delivery_fee: u32,
    currency: String,
    payments_enabled: bool,
    sessions: Arc<SessionStore>,
    messenger: Arc<dyn Messenger>,
    payments: PaymentCoordinator,
    arbitration: ArbitrationHandler,
}

impl Engine {
    pub fn new(
        config: Config,
        messenger: Arc<dyn Messenger>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, BotError> {
        let gate = ServiceGate::new(config.schedule.hours, config.schedule.mode)?;
        let currency = config.payments.currency.clone();
        let arbitration = ArbitrationHandler::new(
            messenger.clone(),
            config.telegram.merchant_channel.clone(),
            currency.clone(),
            config.telegram.admins.clone(),
        );
        let payments = PaymentCoordinator::new(gateway, currency.clone());
        Ok(Self {
            catalog: Catalog::new(config.catalog),
            geofence: config.geofence,
            gate,
            delivery_fee: config.delivery.fee,
            currency,
            payments_enabled: config.payments.enabled,
            sessions: Arc::new(SessionStore::new()),
            messenger,
            payments,
            arbitration,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn service_mode(&self) -> ServiceMode {
        self.gate.mode()
    }

    /// Entry point for one inbound event. Failures are logged here; a
    /// failed send is retried only by the user re-issuing their action.
    pub async fn handle(&self, event: InboundEvent) {
        if let Err(e) = self.dispatch(event).await {
            error!("Failed to handle inbound event: {e:#}");
        }
    }

    async fn dispatch(&self, event: InboundEvent) -> Result<(), BotError> {
        // Button actions and admin commands never touch the sender's own
        // session state, so they are handled before taking any session
        // lock (broadcast fan-out locks every session in turn).
        if let Payload::Action { data } = &event.payload {
            return self.handle_action(&event, data).await;
        }
        if let Payload::Text(content) = &event.payload {
            let trimmed = content.trim();
            if trimmed.starts_with('/') && trimmed != "/start" {
                return self.handle_admin_command(&event, trimmed).await;
            }
        }

        let entry = self.sessions.get_or_create(&event.chat_id).await;
        let mut session = entry.lock().await;
        note_identity(&mut session, &event);

        match event.payload {
            Payload::Text(content) => self.handle_text(&mut session, content.trim()).await,
            Payload::Contact { phone } => self.handle_contact(&mut session, &phone).await,
            Payload::Location { lat, lon } => self.handle_location(&mut session, lat, lon).await,
            Payload::Action { .. } => Ok(()),
        }
    }

    // --- Text conversation ---

    async fn handle_text(&self, session: &mut Session, content: &str) -> Result<(), BotError> {
        if content == "/start" {
            return self.start(session).await;
        }

        if let Some(lang) = texts::parse_lang_choice(content) {
            session.lang = Some(lang);
            session.touch();
            self.say(session, Text::Welcome).await?;
            return self.show_main_menu(session).await;
        }

        // Nothing else proceeds until a language is on file.
        let Some(lang) = session.lang else {
            return self.ask_language(session).await;
        };

        if content == text(lang, Text::BtnBack) {
            return self.show_main_menu(session).await;
        }
        if content == text(lang, Text::BtnProfile) {
            return self.show_profile(session).await;
        }
        if content == text(lang, Text::BtnSwitchLang) {
            session.lang = None;
            session.touch();
            return self.ask_language(session).await;
        }
        if content == text(lang, Text::BtnEditPhone) {
            session.phone = None;
            session.touch();
            return self.ask_phone(session).await;
        }
        if content == text(lang, Text::BtnCancel) {
            self.cart().clear(session);
            session.awaiting_location = false;
            self.say(session, Text::OrderCancelled).await?;
            return self.show_main_menu(session).await;
        }

        // Ordering actions progress the conversation and sit behind the
        // service-availability gate.
        if !self.gate.is_open() {
            return self.say(session, Text::Closed).await;
        }
        if session.phone.is_none() {
            return self.ask_phone(session).await;
        }

        let Some(cafe) = session.current_cafe.clone() else {
            if self.catalog.has_cafe(content) {
                session.current_cafe = Some(content.to_string());
                session.touch();
                return self.show_cafe_menu(session, content).await;
            }
            // Out-of-context input: no state change, no error surfaced.
            debug!(input = %content, "Ignoring text outside any flow");
            return Ok(());
        };

        if content == text(lang, Text::BtnDone) {
            if session.cart.is_empty() {
                return self.say(session, Text::CartEmpty).await;
            }
            return self.request_location(session).await;
        }

        // Menu selections look like "Item — 50 ETB"; category headers have
        // no price suffix and fall through as no-ops.
        let Some(item) = parse_item_label(content) else {
            return Ok(());
        };
        match self.cart().add_item(session, &cafe, item) {
            Ok(quantity) => {
                let line = fill(
                    text(lang, Text::AddedToCart),
                    &[item, &quantity.to_string()],
                );
                self.send(session, &line, Keyboard::None).await
            }
            // Ignore-and-continue policy for invalid selections.
            Err(BotError::InvalidSelection) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn start(&self, session: &mut Session) -> Result<(), BotError> {
        if session.lang.is_none() {
            return self.ask_language(session).await;
        }
        if !self.gate.is_open() {
            return self.say(session, Text::Closed).await;
        }
        if session.phone.is_none() {
            return self.ask_phone(session).await;
        }
        self.show_main_menu(session).await
    }

    async fn handle_contact(&self, session: &mut Session, phone: &str) -> Result<(), BotError> {
        if session.lang.is_none() {
            return self.ask_language(session).await;
        }
        session.phone = Some(phone.to_string());
        session.touch();
        self.say(session, Text::PhoneSaved).await?;
        self.show_main_menu(session).await
    }

    // --- Checkout ---

    async fn handle_location(
        &self,
        session: &mut Session,
        lat: f64,
        lon: f64,
    ) -> Result<(), BotError> {
        if !session.awaiting_location {
            debug!(chat = %session.chat_id, "Location received outside checkout, ignoring");
            return Ok(());
        }
        if !self.gate.is_open() {
            return self.say(session, Text::Closed).await;
        }
        if !self.geofence.in_service_area(lat, lon) {
            // State unchanged: the customer can share another location.
            return self.say(session, Text::LocationError).await;
        }

        session.location = Some(GeoPoint { lat, lon });
        session.awaiting_location = false;
        session.touch();

        let issuer = OrderIssuer::new(&self.catalog, &self.geofence, self.delivery_fee);
        let order = match issuer.issue(session) {
            Ok(order) => order,
            Err(BotError::PreconditionNotMet(missing)) => {
                return self.reprompt(session, missing).await;
            }
            Err(e) => return Err(e),
        };

        if self.payments_enabled {
            self.begin_payment(session, order).await
        } else {
            self.dispatch_order(session, order).await
        }
    }

    /// Re-prompt for exactly the failed precondition; the session is never
    /// corrupted by a failed issuance.
    async fn reprompt(&self, session: &mut Session, missing: Precondition) -> Result<(), BotError> {
        match missing {
            Precondition::EmptyCart => {
                self.say(session, Text::CartEmpty).await?;
                self.show_main_menu(session).await
            }
            Precondition::MissingPhone => self.ask_phone(session).await,
            Precondition::MissingLocation | Precondition::OutsideServiceArea => {
                session.awaiting_location = true;
                self.say(session, Text::AskLocation).await
            }
        }
    }

    async fn begin_payment(&self, session: &mut Session, order: Order) -> Result<(), BotError> {
        let order_id = order.id.clone();
        match self.payments.initiate(session, order).await {
            Ok(init) => self.send_payment_prompt(session, &init).await,
            Err(e) => {
                // No PendingPayment was recorded; the cart stays intact so
                // the customer can retry.
                error!(order = %order_id, "Payment initialization failed: {e}");
                self.say(session, Text::PaymentFailed).await
            }
        }
    }

    async fn send_payment_prompt(
        &self,
        session: &Session,
        init: &PaymentInit,
    ) -> Result<(), BotError> {
        let lang = session.lang();
        let prompt = match (&init.checkout_url, &init.instructions) {
            (Some(url), _) => fill(text(lang, Text::PayPrompt), &[url]),
            (None, Some(instructions)) => fill(text(lang, Text::PayInstructions), &[instructions]),
            (None, None) => text(lang, Text::PayCheckStatus).to_string(),
        };
        let buttons = Keyboard::Inline(vec![vec![
            crate::channels::InlineButton::new(
                text(lang, Text::BtnCheckPayment),
                Action::CheckPayment {
                    chat_id: session.chat_id.clone(),
                    tx_ref: init.tx_ref.clone(),
                }
                .encode(),
            ),
            crate::channels::InlineButton::new(
                text(lang, Text::BtnCancelPayment),
                Action::CancelPayment {
                    chat_id: session.chat_id.clone(),
                    tx_ref: init.tx_ref.clone(),
                }
                .encode(),
            ),
        ]]);
        self.send(session, &prompt, buttons).await
    }

    /// Publish an issued order to the merchant channel and reset the cart.
    /// On publish failure the cart is deliberately left as-is so no order
    /// is lost without a trace.
    async fn dispatch_order(&self, session: &mut Session, order: Order) -> Result<(), BotError> {
        let order_id = order.id.clone();
        match self.arbitration.publish(order, session).await {
            Ok(()) => {
                self.cart().clear(session);
                session.location = None;
                let lang = session.lang();
                let sent = fill(text(lang, Text::OrderSent), &[&order_id]);
                self.send(session, &sent, Keyboard::None).await?;
                self.show_main_menu(session).await
            }
            Err(e) => {
                error!(order = %order_id, "Failed to publish order: {e}");
                self.say(session, Text::SystemError).await
            }
        }
    }

    // --- Payment settlement ---

    /// Verify a transaction and, if settled, finalize it. Safe to call
    /// from both the gateway webhook and the customer's manual status
    /// check: [`PaymentCoordinator::complete`] is the idempotency gate.
    ///
    /// Returns whether the transaction is settled (regardless of which
    /// caller performed the finalization).
    pub async fn confirm_payment(&self, tx_ref: &str) -> Result<bool, BotError> {
        if !self.payments.verify(tx_ref).await? {
            return Ok(false);
        }
        let Some(pending) = self.payments.complete(tx_ref).await else {
            // The other completion path already won; nothing to do.
            return Ok(true);
        };

        let entry = self.sessions.get_or_create(&pending.chat_id).await;
        let mut session = entry.lock().await;
        session.pending_tx = None;
        session.touch();
        info!(tx_ref = %tx_ref, order = %pending.order.id, "Payment settled, dispatching order");
        self.dispatch_order(&mut session, pending.order).await?;
        Ok(true)
    }

    // --- Button actions ---

    async fn handle_action(&self, event: &InboundEvent, data: &str) -> Result<(), BotError> {
        let Some(action) = Action::parse(data) else {
            // Malformed payloads are silently ignored.
            debug!(data = %data, "Unparseable action payload");
            return Ok(());
        };

        match action {
            Action::Accept { order_id, .. } => {
                self.resolve_order(event, &order_id, Decision::Accept).await
            }
            Action::Decline { order_id, .. } => {
                self.resolve_order(event, &order_id, Decision::Decline).await
            }
            Action::CheckPayment { chat_id, tx_ref } => {
                if chat_id != event.chat_id {
                    debug!("Payment check for a foreign session, ignoring");
                    return Ok(());
                }
                match self.confirm_payment(&tx_ref).await {
                    Ok(true) => Ok(()),
                    Ok(false) => self.notify(&chat_id, Text::PayNotConfirmed).await,
                    Err(e) => {
                        error!(tx_ref = %tx_ref, "Payment verification failed: {e}");
                        self.notify(&chat_id, Text::PayNotConfirmed).await
                    }
                }
            }
            Action::CancelPayment { chat_id, tx_ref } => {
                if chat_id != event.chat_id {
                    return Ok(());
                }
                if self.payments.cancel(&tx_ref).await.is_none() {
                    return Ok(());
                }
                let entry = self.sessions.get_or_create(&chat_id).await;
                let mut session = entry.lock().await;
                session.pending_tx = None;
                self.cart().clear(&mut session);
                self.say(&session, Text::PayCancelled).await?;
                self.show_main_menu(&mut session).await
            }
        }
    }

    async fn resolve_order(
        &self,
        event: &InboundEvent,
        order_id: &str,
        decision: Decision,
    ) -> Result<(), BotError> {
        if !self.arbitration.is_authorized(event.username.as_deref()) {
            warn!(
                actor = event.username.as_deref().unwrap_or("<none>"),
                order = %order_id,
                "Unauthorized arbitration attempt"
            );
            return Ok(());
        }
        let actor = if event.sender_name.is_empty() {
            event.username.clone().unwrap_or_default()
        } else {
            event.sender_name.clone()
        };
        self.arbitration.resolve(order_id, decision, &actor).await;
        Ok(())
    }

    // --- Administrative surface ---

    async fn handle_admin_command(
        &self,
        event: &InboundEvent,
        command: &str,
    ) -> Result<(), BotError> {
        if !self.arbitration.is_authorized(event.username.as_deref()) {
            debug!(command = %command, "Ignoring command from non-admin");
            return Ok(());
        }

        let (verb, rest) = match command.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };
        match verb {
            "/open" | "/close" | "/auto" => {
                let mode = match verb {
                    "/open" => ServiceMode::ForcedOpen,
                    "/close" => ServiceMode::ForcedClosed,
                    _ => ServiceMode::Auto,
                };
                self.gate.set_mode(mode);
                info!(?mode, actor = ?event.username, "Service mode changed");
                let reply = format!("Service mode: {mode:?}");
                self.messenger
                    .send(&event.chat_id, &reply, Keyboard::None)
                    .await?;
                Ok(())
            }
            "/broadcast" => {
                if rest.is_empty() {
                    return Ok(());
                }
                let notifier =
                    BroadcastNotifier::new(self.messenger.clone(), self.sessions.clone());
                let delivered = notifier.broadcast(rest).await;
                let reply = format!("Sent to {delivered} users.");
                self.messenger
                    .send(&event.chat_id, &reply, Keyboard::None)
                    .await?;
                Ok(())
            }
            "/dm" => {
                let Some((target, message)) = rest.split_once(char::is_whitespace) else {
                    return Ok(());
                };
                let notifier =
                    BroadcastNotifier::new(self.messenger.clone(), self.sessions.clone());
                notifier.direct(target, message.trim()).await?;
                Ok(())
            }
            _ => {
                debug!(command = %command, "Unknown admin command, ignoring");
                Ok(())
            }
        }
    }

    // --- Prompts and menus ---

    fn cart(&self) -> CartManager<'_> {
        CartManager::new(&self.catalog, self.delivery_fee)
    }

    async fn ask_language(&self, session: &Session) -> Result<(), BotError> {
        // Both labels are shown regardless of the current language.
        let keyboard = Keyboard::reply_rows(vec![vec![
            texts::LANG_CHOICE_EN.to_string(),
            texts::LANG_CHOICE_AM.to_string(),
        ]]);
        self.send(session, text(session.lang(), Text::ChooseLang), keyboard)
            .await
    }

    async fn ask_phone(&self, session: &Session) -> Result<(), BotError> {
        let lang = session.lang();
        let keyboard = Keyboard::Reply(vec![vec![KeyButton::RequestContact(
            text(lang, Text::BtnPhone).to_string(),
        )]]);
        self.send(session, text(lang, Text::AskPhone), keyboard).await
    }

    async fn show_main_menu(&self, session: &mut Session) -> Result<(), BotError> {
        session.current_cafe = None;
        session.awaiting_location = false;
        session.touch();

        let lang = session.lang();
        let mut rows: Vec<Vec<String>> = self
            .catalog
            .cafe_names()
            .map(|name| vec![name.to_string()])
            .collect();
        rows.push(vec![text(lang, Text::BtnProfile).to_string()]);
        self.send(
            session,
            text(lang, Text::ChooseCafe),
            Keyboard::reply_rows(rows),
        )
        .await
    }

    async fn show_profile(&self, session: &Session) -> Result<(), BotError> {
        let lang = session.lang();
        let location_status = if session.location.is_some() {
            text(lang, Text::LocationSet)
        } else {
            text(lang, Text::LocationNotSet)
        };
        let body = fill(
            text(lang, Text::ProfileHeader),
            &[session.phone.as_deref().unwrap_or("N/A"), location_status],
        );
        let keyboard = Keyboard::reply_rows(vec![
            vec![
                text(lang, Text::BtnSwitchLang).to_string(),
                text(lang, Text::BtnEditPhone).to_string(),
            ],
            vec![text(lang, Text::BtnBack).to_string()],
        ]);
        self.send(session, &body, keyboard).await
    }

    async fn show_cafe_menu(&self, session: &Session, cafe: &str) -> Result<(), BotError> {
        let lang = session.lang();
        let Some(menu) = self.catalog.items(cafe) else {
            return Ok(());
        };
        let mut rows: Vec<Vec<String>> = menu
            .iter()
            .map(|(item, price)| match price {
                Some(price) => vec![format!("{item} — {price} {}", self.currency)],
                None => vec![item.clone()],
            })
            .collect();
        rows.push(vec![text(lang, Text::BtnDone).to_string()]);
        rows.push(vec![
            text(lang, Text::BtnCancel).to_string(),
            text(lang, Text::BtnBack).to_string(),
        ]);
        let header = fill(text(lang, Text::MenuHeader), &[cafe]);
        self.send(session, &header, Keyboard::reply_rows(rows)).await
    }

    async fn request_location(&self, session: &mut Session) -> Result<(), BotError> {
        let lang = session.lang();
        let cart = self.cart();
        let total = cart.compute_total(session);
        let mut lines = cart.summary_lines(session);
        lines.push(String::new());
        lines.push(format!(
            "{}: {} {}",
            text(lang, Text::DeliveryFee),
            self.delivery_fee,
            self.currency
        ));
        lines.push(format!(
            "{}: {} {}",
            text(lang, Text::Total),
            total,
            self.currency
        ));
        lines.push(String::new());
        lines.push(text(lang, Text::AskLocation).to_string());

        let keyboard = Keyboard::Reply(vec![
            vec![KeyButton::RequestLocation(
                text(lang, Text::BtnLocation).to_string(),
            )],
            vec![
                KeyButton::Text(text(lang, Text::BtnCancel).to_string()),
                KeyButton::Text(text(lang, Text::BtnBack).to_string()),
            ],
        ]);
        session.awaiting_location = true;
        session.touch();
        self.send(session, &lines.join("\n"), keyboard).await
    }

    // --- Send helpers ---

    async fn say(&self, session: &Session, key: Text) -> Result<(), BotError> {
        self.send(session, text(session.lang(), key), Keyboard::None)
            .await
    }

    async fn send(
        &self,
        session: &Session,
        content: &str,
        keyboard: Keyboard,
    ) -> Result<(), BotError> {
        self.messenger
            .send(&session.chat_id, content, keyboard)
            .await?;
        Ok(())
    }

    /// Localized one-off notice to a chat, using the session's language
    /// when the session is known.
    async fn notify(&self, chat_id: &str, key: Text) -> Result<(), BotError> {
        let lang = match self.sessions.get(chat_id).await {
            Some(entry) => entry.lock().await.lang(),
            None => Lang::En,
        };
        self.messenger
            .send(chat_id, text(lang, key), Keyboard::None)
            .await?;
        Ok(())
    }
}

fn note_identity(session: &mut Session, event: &InboundEvent) {
    if !event.sender_name.is_empty() {
        session.display_name = Some(event.sender_name.clone());
    }
    if event.username.is_some() {
        session.username = event.username.clone();
    }
}

/// Extract the item name from a menu button label ("Item — 50 ETB").
/// Labels without the price separator are not selections.
fn parse_item_label(label: &str) -> Option<&str> {
    label.split_once(" — ").map(|(item, _)| item.trim())
}
