use tracing::warn;

use crate::catalog::{Catalog, MenuKey};
use crate::errors::BotError;
use crate::session::Session;

/// Cart operations over a session, validated against the catalog.
///
/// Borrowing the catalog keeps this a pure view: the manager owns no state
/// of its own and can be constructed per call site.
pub struct CartManager<'a> {
    catalog: &'a Catalog,
    delivery_fee: u32,
}

impl<'a> CartManager<'a> {
    pub fn new(catalog: &'a Catalog, delivery_fee: u32) -> Self {
        Self {
            catalog,
            delivery_fee,
        }
    }

    /// Validate that (cafe, item) is an orderable catalog entry and
    /// increment its quantity. Returns the new quantity.
    ///
    /// Category headers and entries outside the catalog yield
    /// `InvalidSelection`; the conversational caller ignores that error and
    /// continues — ignore-and-continue is the documented policy, not a
    /// silent catch.
    pub fn add_item(&self, session: &mut Session, cafe: &str, item: &str) -> Result<u32, BotError> {
        let Some(_price) = self.catalog.price(cafe, item) else {
            return Err(BotError::InvalidSelection);
        };
        let qty = *session
            .cart
            .entry(MenuKey::new(cafe, item))
            .and_modify(|q| *q += 1)
            .or_insert(1);
        session.touch();
        Ok(qty)
    }

    /// Empty the cart and drop the active-cafe selector.
    pub fn clear(&self, session: &mut Session) {
        session.cart.clear();
        session.current_cafe = None;
        session.touch();
    }

    /// Fixed delivery fee plus Σ(price × quantity), with prices resolved
    /// from the catalog at computation time rather than cached. An entry
    /// whose price can no longer be resolved contributes zero — logged,
    /// not an error.
    pub fn compute_total(&self, session: &Session) -> u32 {
        let mut total = self.delivery_fee;
        for (key, qty) in &session.cart {
            match self.catalog.price(&key.cafe, &key.item) {
                Some(price) => total += price * qty,
                None => {
                    warn!(
                        cafe = %key.cafe,
                        item = %key.item,
                        "Cart entry no longer resolvable in catalog, skipping"
                    );
                }
            }
        }
        total
    }

    /// One display line per cart entry, for order summaries.
    pub fn summary_lines(&self, session: &Session) -> Vec<String> {
        session
            .cart
            .iter()
            .map(|(key, qty)| format!("• {} x{} ({})", key.item, qty, key.cafe))
            .collect()
    }
}
