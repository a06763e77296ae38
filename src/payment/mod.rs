pub mod chapa;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::BotError;
use crate::order::Order;
use crate::session::Session;

/// Result of a successful payment initialization: either a hosted checkout
/// URL or on-device instructions, depending on the gateway flow.
#[derive(Debug, Clone)]
pub struct PaymentInit {
    pub tx_ref: String,
    pub checkout_url: Option<String>,
    pub instructions: Option<String>,
}

/// Payment gateway seam. The HTTP implementation lives in [`chapa`]; tests
/// use recording fakes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        amount: u32,
        currency: &str,
        phone: &str,
        tx_ref: &str,
        customer_name: &str,
    ) -> Result<PaymentInit, BotError>;

    /// Query settlement status for a transaction reference.
    async fn verify(&self, tx_ref: &str) -> Result<bool, BotError>;
}

/// A payment attempt awaiting settlement. Holds the order snapshot taken at
/// initiation; destroyed on completion or explicit cancellation.
#[derive(Debug, Clone)]
pub struct PendingPayment {
    pub tx_ref: String,
    pub chat_id: String,
    pub order: Order,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

/// Correlates payment attempts to orders and settles them exactly once.
///
/// Completion can be triggered from two independent paths — the gateway
/// webhook and a customer-initiated status check — racing into
/// [`Self::complete`]. The single `HashMap::remove` under one lock guard is
/// the gate: whichever path wins takes the snapshot, the loser sees an
/// empty slot and no-ops.
pub struct PaymentCoordinator {
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    pending: Mutex<HashMap<String, PendingPayment>>,
}

/// Normalize a phone number to the gateway's expected local format:
/// digits only, country code stripped, ten digits starting with `0`.
pub fn normalize_phone(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with("00251") && digits.len() > 10 {
        digits.replace_range(..5, "");
    } else if digits.starts_with("251") && digits.len() > 10 {
        digits.replace_range(..3, "");
    }

    if digits.len() == 9 {
        return format!("0{digits}");
    }
    if digits.len() == 10 {
        return digits;
    }

    // Leave anything else for the gateway to validate.
    warn!(phone = %digits, "Phone number format may be invalid");
    digits
}

fn new_tx_ref() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("TXN-{}", hex[..12].to_uppercase())
}

impl PaymentCoordinator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>) -> Self {
        Self {
            gateway,
            currency: currency.into(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize a payment for an issued order. On gateway success a
    /// `PendingPayment` is recorded and the session is tagged with the
    /// transaction reference; on failure nothing is recorded and the cart
    /// stays intact so the customer can retry.
    pub async fn initiate(
        &self,
        session: &mut Session,
        order: Order,
    ) -> Result<PaymentInit, BotError> {
        let phone = session
            .phone
            .as_deref()
            .map(normalize_phone)
            .ok_or_else(|| BotError::Config("Cannot pay without a phone on file".into()))?;
        let name = session.display_name.clone().unwrap_or_default();
        let tx_ref = new_tx_ref();

        let init = self
            .gateway
            .initialize(order.total, &self.currency, &phone, &tx_ref, &name)
            .await?;

        info!(tx_ref = %init.tx_ref, order = %order.id, amount = order.total, "Payment initiated");
        let mut pending = self.pending.lock().await;
        pending.insert(
            init.tx_ref.clone(),
            PendingPayment {
                tx_ref: init.tx_ref.clone(),
                chat_id: session.chat_id.clone(),
                order,
                created_at: Utc::now(),
                verified: false,
            },
        );
        session.pending_tx = Some(init.tx_ref.clone());
        session.touch();
        Ok(init)
    }

    /// Query the gateway for settlement status.
    pub async fn verify(&self, tx_ref: &str) -> Result<bool, BotError> {
        self.gateway.verify(tx_ref).await
    }

    /// Idempotent finalization: take the pending entry if it still exists.
    ///
    /// Returns the order snapshot for the first caller; `None` for anyone
    /// arriving after the entry is gone (already completed or cancelled).
    /// The caller clears the session cart and hands the order to
    /// arbitration.
    pub async fn complete(&self, tx_ref: &str) -> Option<PendingPayment> {
        let taken = self.pending.lock().await.remove(tx_ref);
        match &taken {
            Some(p) => info!(tx_ref = %tx_ref, order = %p.order.id, "Payment completed"),
            None => info!(tx_ref = %tx_ref, "Completion for unknown/settled tx_ref, ignoring"),
        }
        taken
    }

    /// Discard a pending payment, if present. The caller resets the
    /// session's cart; a missing entry is a no-op.
    pub async fn cancel(&self, tx_ref: &str) -> Option<PendingPayment> {
        let taken = self.pending.lock().await.remove(tx_ref);
        if taken.is_some() {
            info!(tx_ref = %tx_ref, "Payment cancelled");
        }
        taken
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
