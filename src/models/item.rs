//! Item model and the viewer-facing item projection.

use serde::{Deserialize, Serialize};

use super::{Amount, ContributorInfo, LedgerSummary, ReservationState};
use crate::errors::AppError;

pub const DEFAULT_PRIORITY: i32 = 2;
pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 3;

/// A wishlist item as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub wishlist_id: String,
    pub name: String,
    pub url: Option<String>,
    pub price: Option<Amount>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub priority: i32,
    pub is_group_gift: bool,
    pub target_amount: Option<Amount>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
}

/// Item as shown to viewers and carried in `item_added` / `item_updated` events.
///
/// Contributor names are withheld from the wishlist owner; reservers are never named.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemView {
    pub id: String,
    pub wishlist_id: String,
    pub name: String,
    pub url: Option<String>,
    pub price: Option<Amount>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub priority: i32,
    pub is_group_gift: bool,
    pub target_amount: Option<Amount>,
    pub is_deleted: bool,
    pub created_at: String,
    pub is_reserved: bool,
    pub total_contributed: Amount,
    pub contributors_count: i64,
    pub contributors: Vec<ContributorInfo>,
}

impl ItemView {
    pub fn project(
        item: Item,
        reservation: &ReservationState,
        ledger: LedgerSummary,
        contributors: Vec<ContributorInfo>,
        viewer_is_owner: bool,
    ) -> Self {
        Self {
            id: item.id,
            wishlist_id: item.wishlist_id,
            name: item.name,
            url: item.url,
            price: item.price,
            image_url: item.image_url,
            description: item.description,
            priority: item.priority,
            is_group_gift: item.is_group_gift,
            target_amount: item.target_amount,
            is_deleted: item.is_deleted,
            created_at: item.created_at,
            is_reserved: reservation.is_active(),
            total_contributed: ledger.total,
            contributors_count: ledger.count,
            contributors: if viewer_is_owner {
                Vec::new()
            } else {
                contributors
            },
        }
    }

    /// Projection of an item that has no reservation or contributions yet.
    pub fn fresh(item: Item) -> Self {
        Self::project(
            item,
            &ReservationState::Vacant,
            LedgerSummary::default(),
            Vec::new(),
            true,
        )
    }
}

/// Request body for adding an item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<Amount>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub is_group_gift: bool,
    #[serde(default)]
    pub target_amount: Option<Amount>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl CreateItemRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Item name is required".to_string()));
        }
        validate_fields(Some(self.priority), self.price, self.target_amount)
    }
}

/// Request body for updating an item. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<Amount>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub is_group_gift: Option<bool>,
    #[serde(default)]
    pub target_amount: Option<Amount>,
}

impl UpdateItemRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::Validation("Item name cannot be empty".to_string()));
        }
        validate_fields(self.priority, self.price, self.target_amount)
    }

    /// Check that applying this update keeps the group-gift invariant:
    /// group gifts carry no reservation, single gifts carry no contributions.
    pub fn check_mode_change(
        &self,
        item: &Item,
        reservation: &ReservationState,
        ledger: &LedgerSummary,
    ) -> Result<(), AppError> {
        match self.is_group_gift {
            Some(true) if !item.is_group_gift && reservation.is_active() => Err(
                AppError::Conflict("Reserved items cannot become group gifts".to_string()),
            ),
            Some(false) if item.is_group_gift && ledger.count > 0 => Err(AppError::Conflict(
                "Group gifts with contributions cannot be converted".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn validate_fields(
    priority: Option<i32>,
    price: Option<Amount>,
    target_amount: Option<Amount>,
) -> Result<(), AppError> {
    if let Some(p) = priority {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&p) {
            return Err(AppError::Validation(format!(
                "Priority must be between {} and {}",
                MIN_PRIORITY, MAX_PRIORITY
            )));
        }
    }
    if matches!(price, Some(p) if p.cents() < 0) {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if matches!(target_amount, Some(t) if !t.is_positive()) {
        return Err(AppError::Validation(
            "Target amount must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_item(is_group_gift: bool, target_cents: Option<i64>) -> Item {
    Item {
        id: "item-1".to_string(),
        wishlist_id: "wl-1".to_string(),
        name: "Espresso machine".to_string(),
        url: None,
        price: Some(Amount::from_cents(29_900)),
        image_url: None,
        description: None,
        priority: DEFAULT_PRIORITY,
        is_group_gift,
        target_amount: target_cents.map(Amount::from_cents),
        is_deleted: false,
        deleted_at: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}
