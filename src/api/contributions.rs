//! Group gift contribution endpoint.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiResult};
use crate::auth::Requester;
use crate::hub::BroadcastEvent;
use crate::models::{ContributeRequest, ContributionOut};
use crate::AppState;

/// POST /api/wishlists/:slug/items/:item_id/contribute - Add money toward a group gift.
pub async fn contribute(
    State(state): State<AppState>,
    Path((slug, item_id)): Path<(String, String)>,
    requester: Requester,
    ApiJson(request): ApiJson<ContributeRequest>,
) -> ApiResult<ContributionOut> {
    request.validate()?;
    let wishlist = state.repo.require_wishlist(&slug).await?;

    let (contribution, ledger) = state
        .repo
        .contribute(&wishlist, &item_id, &requester, &request)
        .await?;
    state.events.emit(
        &wishlist.slug,
        BroadcastEvent::ContributionAdded {
            item_id: contribution.item_id.clone(),
            total_contributed: ledger.total,
            contributors_count: ledger.count,
            contributor_name: contribution.contributor_name.clone(),
        },
    );
    success(contribution.into())
}
