use chrono::{DateTime, Utc};

use crate::cart::CartManager;
use crate::catalog::Catalog;
use crate::errors::{BotError, Precondition};
use crate::geofence::GeofenceBounds;
use crate::session::{GeoPoint, Session};

/// Merchant decision state. Set exactly once out of `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Accepted,
    Declined,
}

/// One snapshotted cart position at issuance time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub cafe: String,
    pub item: String,
    pub unit_price: u32,
    pub quantity: u32,
}

/// An immutable, issued purchase request.
///
/// Lines and total are snapshotted at issuance; later cart mutations do not
/// affect an order that is already out.
#[derive(Debug, Clone)]
pub struct Order {
    /// Human-shareable id, `#` plus eight digits.
    pub id: String,
    /// Owning session identity.
    pub chat_id: String,
    pub lines: Vec<OrderLine>,
    pub total: u32,
    pub location: GeoPoint,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Multi-line cart summary for merchant cards and receipts.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("• {} x{} ({})", l.item, l.quantity, l.cafe))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Draws from a space of 9×10⁷ ids; short enough to read out over the
/// phone, large enough that collisions are not a practical concern for a
/// single merchant's order volume.
fn new_order_id() -> String {
    format!("#{}", fastrand::u32(10_000_000..100_000_000))
}

/// Turns a validated cart + location into an immutable order.
pub struct OrderIssuer<'a> {
    catalog: &'a Catalog,
    geofence: &'a GeofenceBounds,
    delivery_fee: u32,
}

impl<'a> OrderIssuer<'a> {
    pub fn new(catalog: &'a Catalog, geofence: &'a GeofenceBounds, delivery_fee: u32) -> Self {
        Self {
            catalog,
            geofence,
            delivery_fee,
        }
    }

    /// Preconditions: non-empty cart, phone on file, location present and
    /// inside the geofence. On failure the session is untouched and the
    /// caller re-prompts for the named missing piece.
    pub fn issue(&self, session: &Session) -> Result<Order, BotError> {
        if session.cart.is_empty() {
            return Err(BotError::PreconditionNotMet(Precondition::EmptyCart));
        }
        if session.phone.is_none() {
            return Err(BotError::PreconditionNotMet(Precondition::MissingPhone));
        }
        let Some(location) = session.location else {
            return Err(BotError::PreconditionNotMet(Precondition::MissingLocation));
        };
        if !self.geofence.in_service_area(location.lat, location.lon) {
            return Err(BotError::PreconditionNotMet(Precondition::OutsideServiceArea));
        }

        let lines: Vec<OrderLine> = session
            .cart
            .iter()
            .filter_map(|(key, qty)| {
                self.catalog.price(&key.cafe, &key.item).map(|price| OrderLine {
                    cafe: key.cafe.clone(),
                    item: key.item.clone(),
                    unit_price: price,
                    quantity: *qty,
                })
            })
            .collect();
        let total = CartManager::new(self.catalog, self.delivery_fee).compute_total(session);

        Ok(Order {
            id: new_order_id(),
            chat_id: session.chat_id.clone(),
            lines,
            total,
            location,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }
}
