//! Item API endpoints. Only the wishlist owner may change items.

use axum::extract::{Path, State};

use super::{owned_wishlist, success, ApiJson, ApiResult};
use crate::auth::Requester;
use crate::hub::BroadcastEvent;
use crate::models::{CreateItemRequest, ItemView, UpdateItemRequest};
use crate::AppState;

/// POST /api/wishlists/:slug/items - Add an item.
pub async fn create_item(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    requester: Requester,
    ApiJson(request): ApiJson<CreateItemRequest>,
) -> ApiResult<ItemView> {
    request.validate()?;
    let wishlist = owned_wishlist(&state, &slug, &requester).await?;

    let item = state.repo.create_item(&wishlist.id, &request).await?;
    let view = ItemView::fresh(item);
    state.events.emit(
        &wishlist.slug,
        BroadcastEvent::ItemAdded { item: view.clone() },
    );
    success(view)
}

/// PATCH /api/wishlists/:slug/items/:item_id - Update an item.
pub async fn update_item(
    State(state): State<AppState>,
    Path((slug, item_id)): Path<(String, String)>,
    requester: Requester,
    ApiJson(request): ApiJson<UpdateItemRequest>,
) -> ApiResult<ItemView> {
    request.validate()?;
    let wishlist = owned_wishlist(&state, &slug, &requester).await?;

    let existing = state.repo.require_item(&item_id, &wishlist.id).await?;
    let item = state.repo.update_item(&existing, &request).await?;
    let view = state.repo.item_view(item, true).await?;
    state.events.emit(
        &wishlist.slug,
        BroadcastEvent::ItemUpdated { item: view.clone() },
    );
    success(view)
}

/// DELETE /api/wishlists/:slug/items/:item_id - Soft-delete an item.
pub async fn delete_item(
    State(state): State<AppState>,
    Path((slug, item_id)): Path<(String, String)>,
    requester: Requester,
) -> ApiResult<()> {
    let wishlist = owned_wishlist(&state, &slug, &requester).await?;

    let item = state.repo.require_item(&item_id, &wishlist.id).await?;
    state.repo.soft_delete_item(&item).await?;
    state
        .events
        .emit(&wishlist.slug, BroadcastEvent::ItemDeleted { item_id });
    success(())
}
