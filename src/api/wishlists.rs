//! Wishlist API endpoints.

use axum::extract::{Path, State};

use super::{owned_wishlist, success, ApiJson, ApiResult};
use crate::auth::Requester;
use crate::errors::AppError;
use crate::models::{
    CreateWishlistRequest, UpdateWishlistRequest, Wishlist, WishlistSummary, WishlistWithItems,
};
use crate::slug;
use crate::AppState;

/// GET /api/wishlists - List the requester's own wishlists.
pub async fn list_wishlists(
    State(state): State<AppState>,
    requester: Requester,
) -> ApiResult<Vec<WishlistSummary>> {
    let owner_id = requester.require()?;
    success(state.repo.list_wishlists_for_owner(owner_id).await?)
}

/// POST /api/wishlists - Create a wishlist, deriving its slug from the title.
pub async fn create_wishlist(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(request): ApiJson<CreateWishlistRequest>,
) -> ApiResult<Wishlist> {
    let owner_id = requester.require()?;
    request.validate()?;

    let slug = slug::allocate(&state.repo, &request.title).await?;
    let wishlist = state.repo.create_wishlist(owner_id, &request, &slug).await?;
    tracing::info!(slug = %wishlist.slug, owner = %owner_id, "Wishlist created");
    success(wishlist)
}

/// GET /api/wishlists/:slug - Wishlist page with live items.
pub async fn get_wishlist(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    requester: Requester,
) -> ApiResult<WishlistWithItems> {
    let wishlist = state.repo.require_wishlist(&slug).await?;
    let is_owner = requester.is(&wishlist.owner_id);
    if !wishlist.is_public && !is_owner {
        return Err(AppError::Forbidden("This wishlist is private".to_string()));
    }

    let items = state.repo.list_item_views(&wishlist.id, is_owner).await?;
    success(WishlistWithItems {
        item_count: items.len(),
        wishlist,
        is_owner,
        items,
    })
}

/// PATCH /api/wishlists/:slug - Update title, description, emoji or visibility.
pub async fn update_wishlist(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    requester: Requester,
    ApiJson(request): ApiJson<UpdateWishlistRequest>,
) -> ApiResult<Wishlist> {
    request.validate()?;
    let wishlist = owned_wishlist(&state, &slug, &requester).await?;
    success(state.repo.update_wishlist(&wishlist, &request).await?)
}

/// DELETE /api/wishlists/:slug - Delete a wishlist and everything in it.
pub async fn delete_wishlist(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    requester: Requester,
) -> ApiResult<()> {
    let wishlist = owned_wishlist(&state, &slug, &requester).await?;
    state.repo.delete_wishlist(&wishlist.id).await?;
    tracing::info!(slug = %slug, "Wishlist deleted");
    success(())
}
