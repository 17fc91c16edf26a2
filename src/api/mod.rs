//! REST API module.
//!
//! Handlers validate input, apply the mutation through the repository and,
//! once it is committed, emit the matching event to the wishlist's viewers.

mod contributions;
mod items;
mod reservations;
mod wishlists;
mod ws;

pub use contributions::*;
pub use items::*;
pub use reservations::*;
pub use wishlists::*;
pub use ws::*;

use axum::{
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::Requester;
use crate::errors::AppError;
use crate::models::Wishlist;
use crate::AppState;

/// JSON request body whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Load a wishlist the requester owns. Anonymous callers get `Unauthorized`,
/// other accounts `Forbidden`.
async fn owned_wishlist(
    state: &AppState,
    slug: &str,
    requester: &Requester,
) -> Result<Wishlist, AppError> {
    let user_id = requester.require()?;
    let wishlist = state.repo.require_wishlist(slug).await?;
    if wishlist.owner_id != user_id {
        return Err(AppError::Forbidden(
            "Only the wishlist owner can do this".to_string(),
        ));
    }
    Ok(wishlist)
}
