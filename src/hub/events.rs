//! Events pushed to wishlist viewers.

use serde::{Deserialize, Serialize};

use crate::models::{Amount, ItemView};

/// A confirmed change to a wishlist, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    ItemAdded {
        item: ItemView,
    },
    ItemUpdated {
        item: ItemView,
    },
    ItemDeleted {
        item_id: String,
    },
    ItemReserved {
        item_id: String,
        reserver_name: String,
    },
    ItemUnreserved {
        item_id: String,
    },
    ContributionAdded {
        item_id: String,
        total_contributed: Amount,
        contributors_count: i64,
        contributor_name: String,
    },
}

impl BroadcastEvent {
    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "item_added",
            Self::ItemUpdated { .. } => "item_updated",
            Self::ItemDeleted { .. } => "item_deleted",
            Self::ItemReserved { .. } => "item_reserved",
            Self::ItemUnreserved { .. } => "item_unreserved",
            Self::ContributionAdded { .. } => "contribution_added",
        }
    }
}
