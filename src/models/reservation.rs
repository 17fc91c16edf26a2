//! Reservation model and the per-item reservation state machine.
//!
//! ```text
//! Vacant ──reserve──> Active ──cancel──> Cancelled ──reserve──> Active ...
//! ```
//!
//! One reservation row exists per item. Cancelling flips the row's state
//! instead of deleting it, and reserving again reactivates the same row,
//! keeping its id.

use serde::{Deserialize, Serialize};

use super::Item;
use crate::auth::Requester;
use crate::errors::AppError;

/// A claim on a single-recipient item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub item_id: String,
    pub reserver_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserver_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserver_user_id: Option<String>,
    pub created_at: String,
}

/// Current reservation state of one item.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationState {
    /// No reservation row exists yet.
    Vacant,
    Active(Reservation),
    /// Claimant fields are retained for the owner's history.
    Cancelled(Reservation),
}

/// How a permitted `reserve` is written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservePlan {
    /// First reservation for the item: insert a new row.
    Insert,
    /// Reactivate the cancelled row, overwriting its claimant.
    Reactivate { reservation_id: String },
}

impl ReservationState {
    pub fn from_row(row: Option<(Reservation, bool)>) -> Self {
        match row {
            None => ReservationState::Vacant,
            Some((reservation, true)) => ReservationState::Cancelled(reservation),
            Some((reservation, false)) => ReservationState::Active(reservation),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ReservationState::Active(_))
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            ReservationState::Vacant => None,
            ReservationState::Active(r) | ReservationState::Cancelled(r) => Some(r),
        }
    }

    /// Decide whether `requester` may reserve `item` of a wishlist owned by `owner_id`.
    pub fn plan_reserve(
        &self,
        item: &Item,
        owner_id: &str,
        requester: &Requester,
    ) -> Result<ReservePlan, AppError> {
        if requester.is(owner_id) {
            return Err(AppError::Forbidden(
                "Cannot reserve items in your own wishlist".to_string(),
            ));
        }
        if item.is_deleted {
            return Err(AppError::Conflict(
                "This item has been removed from the wishlist".to_string(),
            ));
        }
        if item.is_group_gift {
            return Err(AppError::Conflict(
                "This is a group gift, use contributions instead".to_string(),
            ));
        }
        match self {
            ReservationState::Vacant => Ok(ReservePlan::Insert),
            ReservationState::Active(_) => Err(AppError::Conflict(
                "This item is already reserved".to_string(),
            )),
            ReservationState::Cancelled(r) => Ok(ReservePlan::Reactivate {
                reservation_id: r.id.clone(),
            }),
        }
    }

    /// The reservation a `cancel` would deactivate.
    pub fn plan_cancel(&self) -> Result<&Reservation, AppError> {
        match self {
            ReservationState::Active(r) => Ok(r),
            _ => Err(AppError::NotFound("No active reservation found".to_string())),
        }
    }
}

/// Request body for reserving an item.
#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub reserver_name: String,
    #[serde(default)]
    pub reserver_email: Option<String>,
}

impl ReserveRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.reserver_name.trim().is_empty() {
            return Err(AppError::Validation("Reserver name is required".to_string()));
        }
        Ok(())
    }
}

/// Reservation as returned to the claimant.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationOut {
    pub id: String,
    pub item_id: String,
    pub reserver_name: String,
    pub created_at: String,
}

impl From<Reservation> for ReservationOut {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            item_id: r.item_id,
            reserver_name: r.reserver_name,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::sample_item;

    fn reservation(id: &str) -> Reservation {
        Reservation {
            id: id.to_string(),
            item_id: "item-1".to_string(),
            reserver_name: "Bob".to_string(),
            reserver_email: None,
            reserver_user_id: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_vacant_item_is_inserted() {
        let plan = ReservationState::Vacant
            .plan_reserve(&sample_item(false, None), "owner", &Requester::anonymous())
            .unwrap();
        assert_eq!(plan, ReservePlan::Insert);
    }

    #[test]
    fn test_active_reservation_conflicts() {
        let state = ReservationState::Active(reservation("r1"));
        let err = state
            .plan_reserve(&sample_item(false, None), "owner", &Requester::user("guest"))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_cancelled_row_is_reactivated_with_same_id() {
        let state = ReservationState::Cancelled(reservation("r1"));
        let plan = state
            .plan_reserve(&sample_item(false, None), "owner", &Requester::anonymous())
            .unwrap();
        assert_eq!(
            plan,
            ReservePlan::Reactivate {
                reservation_id: "r1".to_string()
            }
        );
    }

    #[test]
    fn test_owner_cannot_reserve() {
        let err = ReservationState::Vacant
            .plan_reserve(&sample_item(false, None), "owner", &Requester::user("owner"))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_group_gift_and_deleted_items_conflict() {
        let group = sample_item(true, None);
        assert!(matches!(
            ReservationState::Vacant.plan_reserve(&group, "owner", &Requester::anonymous()),
            Err(AppError::Conflict(_))
        ));

        let mut deleted = sample_item(false, None);
        deleted.is_deleted = true;
        assert!(matches!(
            ReservationState::Vacant.plan_reserve(&deleted, "owner", &Requester::anonymous()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_cancel_requires_active_row() {
        assert!(matches!(
            ReservationState::Vacant.plan_cancel(),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ReservationState::Cancelled(reservation("r1")).plan_cancel(),
            Err(AppError::NotFound(_))
        ));
        let active = ReservationState::Active(reservation("r1"));
        assert_eq!(active.plan_cancel().unwrap().id, "r1");
    }

    #[test]
    fn test_from_row() {
        assert_eq!(ReservationState::from_row(None), ReservationState::Vacant);
        assert!(ReservationState::from_row(Some((reservation("r1"), false))).is_active());
        assert!(matches!(
            ReservationState::from_row(Some((reservation("r1"), true))),
            ReservationState::Cancelled(_)
        ));
    }
}
