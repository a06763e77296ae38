use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A cart/menu key: one orderable position in one cafe's menu.
/// Structural equality and ordering so it can key a `BTreeMap` cart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MenuKey {
    pub cafe: String,
    pub item: String,
}

impl MenuKey {
    pub fn new(cafe: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            cafe: cafe.into(),
            item: item.into(),
        }
    }
}

/// Read-only view of the static catalog: cafe → item → price.
///
/// A `None` price marks a non-orderable category header that is rendered
/// in menus but must never enter a cart. The catalog is supplied by
/// configuration and consumed here, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cafes: BTreeMap<String, BTreeMap<String, Option<u32>>>,
}

impl Catalog {
    pub fn new(cafes: BTreeMap<String, BTreeMap<String, Option<u32>>>) -> Self {
        Self { cafes }
    }

    pub fn cafe_names(&self) -> impl Iterator<Item = &str> {
        self.cafes.keys().map(String::as_str)
    }

    pub fn cafe_count(&self) -> usize {
        self.cafes.len()
    }

    pub fn has_cafe(&self, name: &str) -> bool {
        self.cafes.contains_key(name)
    }

    /// All entries of one cafe's menu, headers included, in display order.
    pub fn items(&self, cafe: &str) -> Option<&BTreeMap<String, Option<u32>>> {
        self.cafes.get(cafe)
    }

    /// Price of an orderable item. `None` both for unknown entries and for
    /// category headers; callers that need to distinguish use [`Self::is_listed`].
    pub fn price(&self, cafe: &str, item: &str) -> Option<u32> {
        self.cafes.get(cafe)?.get(item).copied()?
    }

    /// Whether the entry appears in the menu at all (header or item).
    pub fn is_listed(&self, cafe: &str, item: &str) -> bool {
        self.cafes
            .get(cafe)
            .is_some_and(|menu| menu.contains_key(item))
    }
}
