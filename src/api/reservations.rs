//! Reservation API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiResult};
use crate::auth::Requester;
use crate::hub::BroadcastEvent;
use crate::models::{ReservationOut, ReserveRequest};
use crate::AppState;

/// POST /api/wishlists/:slug/items/:item_id/reserve - Claim a single-recipient item.
pub async fn reserve_item(
    State(state): State<AppState>,
    Path((slug, item_id)): Path<(String, String)>,
    requester: Requester,
    ApiJson(request): ApiJson<ReserveRequest>,
) -> ApiResult<ReservationOut> {
    request.validate()?;
    let wishlist = state.repo.require_wishlist(&slug).await?;

    let reservation = state
        .repo
        .reserve_item(&wishlist, &item_id, &requester, &request)
        .await?;
    state.events.emit(
        &wishlist.slug,
        BroadcastEvent::ItemReserved {
            item_id: reservation.item_id.clone(),
            reserver_name: reservation.reserver_name.clone(),
        },
    );
    success(reservation.into())
}

/// DELETE /api/wishlists/:slug/items/:item_id/reserve - Release the active reservation.
///
/// Any requester may cancel. Reservations can be made anonymously, so there is
/// no claimant identity to check against.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path((slug, item_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let wishlist = state.repo.require_wishlist(&slug).await?;

    state.repo.cancel_reservation(&wishlist, &item_id).await?;
    state
        .events
        .emit(&wishlist.slug, BroadcastEvent::ItemUnreserved { item_id });
    success(())
}
