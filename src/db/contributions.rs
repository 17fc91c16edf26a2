//! Contribution ledger persistence.
//!
//! Entries are append-only. Totals are summed from the entries on every read.

use chrono::Utc;
use sqlx::Row;

use super::Repository;
use crate::auth::Requester;
use crate::errors::AppError;
use crate::models::{
    check_contribution, Amount, ContributeRequest, Contribution, ContributorInfo, LedgerSummary,
    Wishlist,
};

impl Repository {
    /// Total and entry count of an item's ledger.
    pub async fn ledger_summary(&self, item_id: &str) -> Result<LedgerSummary, AppError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS count FROM contributions WHERE item_id = ?",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerSummary {
            total: Amount::from_cents(row.get("total")),
            count: row.get("count"),
        })
    }

    /// All ledger entries of an item in insertion order.
    pub async fn list_contributions(&self, item_id: &str) -> Result<Vec<Contribution>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, item_id, contributor_name, contributor_email, contributor_user_id,
                      amount_cents, created_at
               FROM contributions WHERE item_id = ? ORDER BY rowid"#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Contribution {
                id: row.get("id"),
                item_id: row.get("item_id"),
                contributor_name: row.get("contributor_name"),
                contributor_email: row.get("contributor_email"),
                contributor_user_id: row.get("contributor_user_id"),
                amount: Amount::from_cents(row.get("amount_cents")),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Contributor names shown to non-owner viewers.
    pub async fn list_contributors(&self, item_id: &str) -> Result<Vec<ContributorInfo>, AppError> {
        Ok(self
            .list_contributions(item_id)
            .await?
            .into_iter()
            .map(|c| ContributorInfo {
                contributor_name: c.contributor_name,
                created_at: c.created_at,
            })
            .collect())
    }

    /// Append a contribution to a group gift.
    ///
    /// Returns the entry and the ledger summary as of that entry.
    pub async fn contribute(
        &self,
        wishlist: &Wishlist,
        item_id: &str,
        requester: &Requester,
        request: &ContributeRequest,
    ) -> Result<(Contribution, LedgerSummary), AppError> {
        let item = self.require_item(item_id, &wishlist.id).await?;
        let ledger = self.ledger_summary(&item.id).await?;
        check_contribution(&item, &wishlist.owner_id, requester, &ledger, request.amount)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        // The target check reads the prior total inside the writing statement.
        let result = sqlx::query(
            r#"INSERT INTO contributions
                   (id, item_id, contributor_name, contributor_email, contributor_user_id,
                    amount_cents, created_at)
               SELECT ?, i.id, ?, ?, ?, ?, ?
               FROM items i
               WHERE i.id = ? AND i.is_deleted = 0 AND i.is_group_gift = 1
                 AND (i.target_cents IS NULL
                      OR (SELECT COALESCE(SUM(c.amount_cents), 0)
                          FROM contributions c WHERE c.item_id = i.id) < i.target_cents)"#,
        )
        .bind(&id)
        .bind(&request.contributor_name)
        .bind(&request.contributor_email)
        .bind(requester.user_id())
        .bind(request.amount.cents())
        .bind(&now)
        .bind(&item.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(item_id = %item.id, "Contribution rejected by concurrent ledger change");
            let item = self.require_item(item_id, &wishlist.id).await?;
            let ledger = self.ledger_summary(&item.id).await?;
            check_contribution(&item, &wishlist.owner_id, requester, &ledger, request.amount)?;
            return Err(AppError::Conflict(
                "Item changed concurrently, reload and retry".to_string(),
            ));
        }

        // Summary up to and including this entry, unaffected by later ones.
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount_cents), 0) AS total, COUNT(*) AS count FROM contributions WHERE item_id = ? AND rowid <= ?",
        )
        .bind(&item.id)
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await?;
        let summary = LedgerSummary {
            total: Amount::from_cents(row.get("total")),
            count: row.get("count"),
        };

        let contribution = Contribution {
            id,
            item_id: item.id,
            contributor_name: request.contributor_name.clone(),
            contributor_email: request.contributor_email.clone(),
            contributor_user_id: requester.user_id().map(str::to_string),
            amount: request.amount,
            created_at: now,
        };
        Ok((contribution, summary))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::fixtures::{test_repository, wishlist_with_item};
    use crate::models::UpdateItemRequest;

    fn entry(name: &str, dollars: i64) -> ContributeRequest {
        ContributeRequest {
            contributor_name: name.to_string(),
            contributor_email: None,
            amount: Amount::from_cents(dollars * 100),
        }
    }

    #[tokio::test]
    async fn test_overshoot_then_closed() {
        let (repo, _dir) = test_repository().await;
        let (wl, item) = wishlist_with_item(&repo, "owner", true, Some(100 * 100)).await;
        let guest = Requester::anonymous();

        let mut totals = Vec::new();
        for name in ["Ann", "Ben", "Cat"] {
            let (_, summary) = repo
                .contribute(&wl, &item.id, &guest, &entry(name, 40))
                .await
                .unwrap();
            totals.push(summary.total.cents());
        }
        assert_eq!(totals, vec![4000, 8000, 12000]);

        let err = repo
            .contribute(&wl, &item.id, &guest, &entry("Dee", 40))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let summary = repo.ledger_summary(&item.id).await.unwrap();
        assert_eq!(summary.total.cents(), 12000);
        assert_eq!(summary.count, 3);
    }

    #[tokio::test]
    async fn test_total_matches_recomputation() {
        let (repo, _dir) = test_repository().await;
        let (wl, item) = wishlist_with_item(&repo, "owner", true, None).await;

        for (name, dollars) in [("Ann", 12), ("Ben", 7), ("Cat", 30)] {
            repo.contribute(&wl, &item.id, &Requester::user(name), &entry(name, dollars))
                .await
                .unwrap();
        }

        let entries = repo.list_contributions(&item.id).await.unwrap();
        let recomputed: Amount = entries.iter().map(|c| c.amount).sum();
        assert_eq!(repo.ledger_summary(&item.id).await.unwrap().total, recomputed);
        assert_eq!(recomputed.cents(), 4900);
        assert_eq!(entries[1].contributor_user_id.as_deref(), Some("Ben"));

        let names: Vec<String> = repo
            .list_contributors(&item.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.contributor_name)
            .collect();
        assert_eq!(names, vec!["Ann", "Ben", "Cat"]);
    }

    #[tokio::test]
    async fn test_rejections() {
        let (repo, _dir) = test_repository().await;
        let (wl, item) = wishlist_with_item(&repo, "owner", true, None).await;

        let err = repo
            .contribute(&wl, &item.id, &Requester::user("owner"), &entry("Me", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let (single_wl, single) = wishlist_with_item(&repo, "owner", false, None).await;
        let err = repo
            .contribute(&single_wl, &single.id, &Requester::anonymous(), &entry("Bob", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        repo.contribute(&wl, &item.id, &Requester::anonymous(), &entry("Bob", 5))
            .await
            .unwrap();
        let err = repo
            .update_item(
                &item,
                &UpdateItemRequest {
                    is_group_gift: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        repo.soft_delete_item(&item).await.unwrap();
        let err = repo
            .contribute(&wl, &item.id, &Requester::anonymous(), &entry("Bob", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_contributions_respect_prior_total() {
        let (repo, _dir) = test_repository().await;
        let repo = Arc::new(repo);
        // Target is reached by the first entry, so only one may land.
        let (wl, item) = wishlist_with_item(&repo, "owner", true, Some(50 * 100)).await;
        let wl = Arc::new(wl);

        let mut handles = Vec::new();
        for n in 0..8 {
            let repo = Arc::clone(&repo);
            let wl = Arc::clone(&wl);
            let item_id = item.id.clone();
            handles.push(tokio::spawn(async move {
                repo.contribute(
                    &wl,
                    &item_id,
                    &Requester::anonymous(),
                    &entry(&format!("guest-{}", n), 60),
                )
                .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(AppError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(repo.ledger_summary(&item.id).await.unwrap().count, 1);
    }
}
