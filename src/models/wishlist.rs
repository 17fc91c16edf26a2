//! Wishlist model.

use serde::{Deserialize, Serialize};

use super::ItemView;
use crate::errors::AppError;

pub const DEFAULT_COVER_EMOJI: &str = "🎁";

/// A published wishlist. Its slug is the push topic for live viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wishlist {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_emoji: Option<String>,
    pub slug: String,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Wishlist as listed on the owner's dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistSummary {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub item_count: i64,
}

/// Wishlist page with its visible items.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistWithItems {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub item_count: usize,
    pub is_owner: bool,
    pub items: Vec<ItemView>,
}

/// Request body for creating a new wishlist.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWishlistRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_emoji: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

impl CreateWishlistRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)
    }
}

/// Request body for updating an existing wishlist. The slug never changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWishlistRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_emoji: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl UpdateWishlistRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_to_public() {
        let request: CreateWishlistRequest =
            serde_json::from_str(r#"{"title": "Birthday"}"#).unwrap();
        assert!(request.is_public);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_blank_titles_rejected() {
        let request: CreateWishlistRequest = serde_json::from_str(r#"{"title": "  "}"#).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));

        let update = UpdateWishlistRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateWishlistRequest::default().validate().is_ok());
    }

    #[test]
    fn test_summary_flattens_wishlist() {
        let summary = WishlistSummary {
            wishlist: Wishlist {
                id: "w".to_string(),
                owner_id: "o".to_string(),
                title: "T".to_string(),
                description: None,
                cover_emoji: Some(DEFAULT_COVER_EMOJI.to_string()),
                slug: "t".to_string(),
                is_public: true,
                created_at: "now".to_string(),
                updated_at: "now".to_string(),
            },
            item_count: 2,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["slug"], "t");
        assert_eq!(value["item_count"], 2);
        assert!(value.get("description").is_none());
    }
}
