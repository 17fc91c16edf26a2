//! Contribution ledger model.
//!
//! Contributions are append-only. An item's running total is always the sum
//! of its entries, computed when read and never stored.

use serde::{Deserialize, Serialize};

use super::{Amount, Item};
use crate::auth::Requester;
use crate::errors::AppError;

/// A single monetary entry toward a group gift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    pub id: String,
    pub item_id: String,
    pub contributor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_user_id: Option<String>,
    pub amount: Amount,
    pub created_at: String,
}

/// Contributor shown to non-owner viewers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContributorInfo {
    pub contributor_name: String,
    pub created_at: String,
}

/// Aggregate of an item's ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    pub total: Amount,
    pub count: i64,
}

impl LedgerSummary {
    pub fn from_amounts<I: IntoIterator<Item = Amount>>(amounts: I) -> Self {
        amounts.into_iter().fold(Self::default(), Self::with)
    }

    /// Summary after appending one more entry.
    pub fn with(self, amount: Amount) -> Self {
        Self {
            total: self.total + amount,
            count: self.count + 1,
        }
    }

    /// Whether the ledger still accepts entries. Only the prior total is
    /// compared, so the accepted entry may overshoot the target.
    pub fn is_open(&self, target: Option<Amount>) -> bool {
        match target {
            Some(t) => self.total < t,
            None => true,
        }
    }
}

/// Check that `requester` may add `amount` to `item` given its current ledger.
pub fn check_contribution(
    item: &Item,
    owner_id: &str,
    requester: &Requester,
    ledger: &LedgerSummary,
    amount: Amount,
) -> Result<(), AppError> {
    if !amount.is_positive() {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }
    if requester.is(owner_id) {
        return Err(AppError::Forbidden(
            "Cannot contribute to your own wishlist items".to_string(),
        ));
    }
    if item.is_deleted {
        return Err(AppError::Conflict(
            "This item has been removed. Contributors should coordinate a refund outside the app."
                .to_string(),
        ));
    }
    if !item.is_group_gift {
        return Err(AppError::Conflict(
            "This item doesn't accept group contributions".to_string(),
        ));
    }
    if !ledger.is_open(item.target_amount) {
        return Err(AppError::Conflict("Target amount already reached".to_string()));
    }
    Ok(())
}

/// Request body for contributing to a group gift.
#[derive(Debug, Clone, Deserialize)]
pub struct ContributeRequest {
    pub contributor_name: String,
    #[serde(default)]
    pub contributor_email: Option<String>,
    pub amount: Amount,
}

impl ContributeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.contributor_name.trim().is_empty() {
            return Err(AppError::Validation(
                "Contributor name is required".to_string(),
            ));
        }
        if !self.amount.is_positive() {
            return Err(AppError::Validation("Amount must be positive".to_string()));
        }
        Ok(())
    }
}

/// Contribution as returned to the contributor.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionOut {
    pub id: String,
    pub item_id: String,
    pub contributor_name: String,
    pub amount: Amount,
    pub created_at: String,
}

impl From<Contribution> for ContributionOut {
    fn from(c: Contribution) -> Self {
        Self {
            id: c.id,
            item_id: c.item_id,
            contributor_name: c.contributor_name,
            amount: c.amount,
            created_at: c.created_at,
        }
    }
}
