//! Reservation persistence.
//!
//! Each item has at most one reservation row. Reserving is a single
//! conditional upsert so that two concurrent attempts on the same item
//! resolve to exactly one winner.

use chrono::Utc;
use sqlx::Row;

use super::Repository;
use crate::auth::Requester;
use crate::errors::AppError;
use crate::models::{ReservationState, ReservePlan, Reservation, ReserveRequest, Wishlist};

pub(super) const RESERVATION_COLUMNS: &str = "r.id, r.item_id, r.reserver_name, r.reserver_email, r.reserver_user_id, r.is_cancelled, r.created_at";

impl Repository {
    /// Current reservation state of an item.
    pub async fn reservation_state(&self, item_id: &str) -> Result<ReservationState, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reservations r WHERE r.item_id = ?",
            RESERVATION_COLUMNS
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ReservationState::from_row(
            row.as_ref().map(reservation_from_row),
        ))
    }

    /// Reserve an item for `requester`.
    ///
    /// A cancelled row is reactivated in place and keeps its id.
    pub async fn reserve_item(
        &self,
        wishlist: &Wishlist,
        item_id: &str,
        requester: &Requester,
        request: &ReserveRequest,
    ) -> Result<Reservation, AppError> {
        let item = self.require_item(item_id, &wishlist.id).await?;
        let state = self.reservation_state(&item.id).await?;
        if let ReservePlan::Reactivate { reservation_id } =
            state.plan_reserve(&item, &wishlist.owner_id, requester)?
        {
            tracing::debug!(item_id = %item.id, reservation_id = %reservation_id, "Reactivating cancelled reservation");
        }

        let now = Utc::now().to_rfc3339();
        let new_id = uuid::Uuid::new_v4().to_string();

        // Inserts when no row exists, reactivates a cancelled row, and touches
        // nothing when the item is taken or no longer reservable.
        let result = sqlx::query(
            r#"INSERT INTO reservations
                   (id, item_id, reserver_name, reserver_email, reserver_user_id, is_cancelled, created_at)
               SELECT ?, i.id, ?, ?, ?, 0, ?
               FROM items i
               WHERE i.id = ? AND i.is_deleted = 0 AND i.is_group_gift = 0
               ON CONFLICT(item_id) DO UPDATE SET
                   reserver_name = excluded.reserver_name,
                   reserver_email = excluded.reserver_email,
                   reserver_user_id = excluded.reserver_user_id,
                   is_cancelled = 0
               WHERE reservations.is_cancelled = 1"#,
        )
        .bind(&new_id)
        .bind(&request.reserver_name)
        .bind(&request.reserver_email)
        .bind(requester.user_id())
        .bind(&now)
        .bind(&item.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(item_id = %item.id, "Reservation lost to a concurrent write");
            return Err(self.explain_rejected_reserve(wishlist, item_id, requester).await);
        }

        self.reservation_state(&item.id)
            .await?
            .reservation()
            .cloned()
            .ok_or_else(|| AppError::Internal("Reservation missing after write".to_string()))
    }

    /// Re-run the state checks after a conditional write matched nothing.
    async fn explain_rejected_reserve(
        &self,
        wishlist: &Wishlist,
        item_id: &str,
        requester: &Requester,
    ) -> AppError {
        let checked = async {
            let item = self.require_item(item_id, &wishlist.id).await?;
            let state = self.reservation_state(&item.id).await?;
            state.plan_reserve(&item, &wishlist.owner_id, requester)
        };
        match checked.await {
            Err(e) => e,
            Ok(_) => AppError::Conflict("This item is already reserved".to_string()),
        }
    }

    /// Cancel an item's active reservation. The row is kept, flagged cancelled.
    pub async fn cancel_reservation(
        &self,
        wishlist: &Wishlist,
        item_id: &str,
    ) -> Result<Reservation, AppError> {
        let Some(item) = self.find_item(item_id, &wishlist.id).await? else {
            return Err(AppError::NotFound("No active reservation found".to_string()));
        };
        let state = self.reservation_state(&item.id).await?;
        let reservation = state.plan_cancel()?.clone();

        let result = sqlx::query(
            "UPDATE reservations SET is_cancelled = 1 WHERE id = ? AND is_cancelled = 0",
        )
        .bind(&reservation.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("No active reservation found".to_string()));
        }
        Ok(reservation)
    }
}

/// Row to reservation plus its cancelled flag.
pub(super) fn reservation_from_row(row: &sqlx::sqlite::SqliteRow) -> (Reservation, bool) {
    let is_cancelled: i32 = row.get("is_cancelled");
    (
        Reservation {
            id: row.get("id"),
            item_id: row.get("item_id"),
            reserver_name: row.get("reserver_name"),
            reserver_email: row.get("reserver_email"),
            reserver_user_id: row.get("reserver_user_id"),
            created_at: row.get("created_at"),
        },
        is_cancelled != 0,
    )
}
