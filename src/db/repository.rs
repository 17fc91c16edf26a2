//! Database repository for wishlist and item operations.
//!
//! Reservation and contribution writes live in sibling modules as further
//! `impl Repository` blocks.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::reservations::{reservation_from_row, RESERVATION_COLUMNS};
use crate::errors::AppError;
use crate::models::{
    Amount, ContributorInfo, CreateItemRequest, CreateWishlistRequest, Item, ItemView,
    LedgerSummary, ReservationState, UpdateItemRequest, UpdateWishlistRequest,
    Wishlist, WishlistSummary, DEFAULT_COVER_EMOJI,
};

pub(super) const ITEM_COLUMNS: &str = "id, wishlist_id, name, url, price_cents, image_url, description, priority, is_group_gift, target_cents, is_deleted, deleted_at, created_at";

const WISHLIST_COLUMNS: &str =
    "id, owner_id, title, description, cover_emoji, slug, is_public, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== WISHLIST OPERATIONS ====================

    /// Whether any wishlist already uses `slug`.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM wishlists WHERE slug = ?) AS taken")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        let taken: i64 = row.get("taken");
        Ok(taken != 0)
    }

    /// Get a wishlist by slug.
    pub async fn find_wishlist_by_slug(&self, slug: &str) -> Result<Option<Wishlist>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wishlists WHERE slug = ?",
            WISHLIST_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(wishlist_from_row))
    }

    /// Get a wishlist by slug or fail with `NotFound`.
    pub async fn require_wishlist(&self, slug: &str) -> Result<Wishlist, AppError> {
        self.find_wishlist_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Wishlist not found".to_string()))
    }

    /// List an owner's wishlists, newest first, with their visible item counts.
    pub async fn list_wishlists_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<WishlistSummary>, AppError> {
        let rows = sqlx::query(
            r#"SELECT w.id, w.owner_id, w.title, w.description, w.cover_emoji, w.slug,
                      w.is_public, w.created_at, w.updated_at,
                      (SELECT COUNT(*) FROM items i
                       WHERE i.wishlist_id = w.id AND i.is_deleted = 0) AS item_count
               FROM wishlists w
               WHERE w.owner_id = ?
               ORDER BY w.created_at DESC"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| WishlistSummary {
                wishlist: wishlist_from_row(row),
                item_count: row.get("item_count"),
            })
            .collect())
    }

    /// Create a wishlist under an already allocated slug.
    ///
    /// A slug taken concurrently surfaces as `Conflict` from the unique constraint.
    pub async fn create_wishlist(
        &self,
        owner_id: &str,
        request: &CreateWishlistRequest,
        slug: &str,
    ) -> Result<Wishlist, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let cover_emoji = request
            .cover_emoji
            .clone()
            .unwrap_or_else(|| DEFAULT_COVER_EMOJI.to_string());

        sqlx::query(
            "INSERT INTO wishlists (id, owner_id, title, description, cover_emoji, slug, is_public, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&cover_emoji)
        .bind(slug)
        .bind(request.is_public as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Wishlist {
            id,
            owner_id: owner_id.to_string(),
            title: request.title.clone(),
            description: request.description.clone(),
            cover_emoji: Some(cover_emoji),
            slug: slug.to_string(),
            is_public: request.is_public,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update a wishlist's descriptive fields. The slug is left untouched.
    pub async fn update_wishlist(
        &self,
        existing: &Wishlist,
        request: &UpdateWishlistRequest,
    ) -> Result<Wishlist, AppError> {
        let now = Utc::now().to_rfc3339();
        let title = request.title.clone().unwrap_or(existing.title.clone());
        let description = request.description.clone().or(existing.description.clone());
        let cover_emoji = request.cover_emoji.clone().or(existing.cover_emoji.clone());
        let is_public = request.is_public.unwrap_or(existing.is_public);

        let result = sqlx::query(
            "UPDATE wishlists SET title = ?, description = ?, cover_emoji = ?, is_public = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&title)
        .bind(&description)
        .bind(&cover_emoji)
        .bind(is_public as i32)
        .bind(&now)
        .bind(&existing.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Wishlist not found".to_string()));
        }

        Ok(Wishlist {
            title,
            description,
            cover_emoji,
            is_public,
            updated_at: now,
            ..existing.clone()
        })
    }

    /// Delete a wishlist together with its items, reservations and contributions.
    pub async fn delete_wishlist(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM wishlists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Wishlist not found".to_string()));
        }
        Ok(())
    }

    // ==================== ITEM OPERATIONS ====================

    /// Get an item of a wishlist, including soft-deleted ones.
    pub async fn find_item(
        &self,
        item_id: &str,
        wishlist_id: &str,
    ) -> Result<Option<Item>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM items WHERE id = ? AND wishlist_id = ?",
            ITEM_COLUMNS
        ))
        .bind(item_id)
        .bind(wishlist_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(item_from_row))
    }

    /// Get an item of a wishlist or fail with `NotFound`.
    pub async fn require_item(&self, item_id: &str, wishlist_id: &str) -> Result<Item, AppError> {
        self.find_item(item_id, wishlist_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    /// Add an item to a wishlist.
    pub async fn create_item(
        &self,
        wishlist_id: &str,
        request: &CreateItemRequest,
    ) -> Result<Item, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(&format!(
            "INSERT INTO items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL, ?)",
            ITEM_COLUMNS
        ))
        .bind(&id)
        .bind(wishlist_id)
        .bind(&request.name)
        .bind(&request.url)
        .bind(request.price.map(Amount::cents))
        .bind(&request.image_url)
        .bind(&request.description)
        .bind(request.priority)
        .bind(request.is_group_gift as i32)
        .bind(request.target_amount.map(Amount::cents))
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Item {
            id,
            wishlist_id: wishlist_id.to_string(),
            name: request.name.clone(),
            url: request.url.clone(),
            price: request.price,
            image_url: request.image_url.clone(),
            description: request.description.clone(),
            priority: request.priority,
            is_group_gift: request.is_group_gift,
            target_amount: request.target_amount,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
        })
    }

    /// Update a live item, guarding the group-gift invariant.
    pub async fn update_item(
        &self,
        existing: &Item,
        request: &UpdateItemRequest,
    ) -> Result<Item, AppError> {
        if existing.is_deleted {
            return Err(AppError::NotFound("Item not found".to_string()));
        }
        let reservation = self.reservation_state(&existing.id).await?;
        let ledger = self.ledger_summary(&existing.id).await?;
        request.check_mode_change(existing, &reservation, &ledger)?;

        let updated = Item {
            name: request.name.clone().unwrap_or(existing.name.clone()),
            url: request.url.clone().or(existing.url.clone()),
            price: request.price.or(existing.price),
            image_url: request.image_url.clone().or(existing.image_url.clone()),
            description: request.description.clone().or(existing.description.clone()),
            priority: request.priority.unwrap_or(existing.priority),
            is_group_gift: request.is_group_gift.unwrap_or(existing.is_group_gift),
            target_amount: request.target_amount.or(existing.target_amount),
            ..existing.clone()
        };

        // Conditional on the mode the guard above saw, so a reservation or
        // contribution cannot slip in between check and write.
        let mode_guard = if updated.is_group_gift == existing.is_group_gift {
            ""
        } else if updated.is_group_gift {
            " AND NOT EXISTS (SELECT 1 FROM reservations r WHERE r.item_id = items.id AND r.is_cancelled = 0)"
        } else {
            " AND NOT EXISTS (SELECT 1 FROM contributions c WHERE c.item_id = items.id)"
        };

        let result = sqlx::query(&format!(
            "UPDATE items SET name = ?, url = ?, price_cents = ?, image_url = ?, description = ?, priority = ?, is_group_gift = ?, target_cents = ? WHERE id = ? AND is_deleted = 0 AND is_group_gift = ?{}",
            mode_guard
        ))
        .bind(&updated.name)
        .bind(&updated.url)
        .bind(updated.price.map(Amount::cents))
        .bind(&updated.image_url)
        .bind(&updated.description)
        .bind(updated.priority)
        .bind(updated.is_group_gift as i32)
        .bind(updated.target_amount.map(Amount::cents))
        .bind(&existing.id)
        .bind(existing.is_group_gift as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Item changed concurrently, reload and retry".to_string(),
            ));
        }

        Ok(updated)
    }

    /// Soft-delete an item. Its reservation and contributions are kept.
    pub async fn soft_delete_item(&self, item: &Item) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE items SET is_deleted = 1, deleted_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(&now)
        .bind(&item.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item not found".to_string()));
        }
        Ok(())
    }

    /// Project one item with its current reservation and ledger state.
    pub async fn item_view(&self, item: Item, viewer_is_owner: bool) -> Result<ItemView, AppError> {
        let reservation = self.reservation_state(&item.id).await?;
        let ledger = self.ledger_summary(&item.id).await?;
        let contributors = if viewer_is_owner {
            Vec::new()
        } else {
            self.list_contributors(&item.id).await?
        };
        Ok(ItemView::project(
            item,
            &reservation,
            ledger,
            contributors,
            viewer_is_owner,
        ))
    }

    /// Project all live items of a wishlist, highest priority first.
    ///
    /// Loads reservations and ledger aggregates with one query each rather
    /// than per item.
    pub async fn list_item_views(
        &self,
        wishlist_id: &str,
        viewer_is_owner: bool,
    ) -> Result<Vec<ItemView>, AppError> {
        let item_rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE wishlist_id = ? AND is_deleted = 0 ORDER BY priority DESC, created_at ASC",
            ITEM_COLUMNS
        ))
        .bind(wishlist_id)
        .fetch_all(&self.pool)
        .await?;

        let reservation_rows = sqlx::query(&format!(
            "SELECT {} FROM reservations r JOIN items i ON i.id = r.item_id WHERE i.wishlist_id = ?",
            RESERVATION_COLUMNS
        ))
        .bind(wishlist_id)
        .fetch_all(&self.pool)
        .await?;
        let mut reservations: HashMap<String, ReservationState> = reservation_rows
            .iter()
            .map(|row| {
                let (reservation, is_cancelled) = reservation_from_row(row);
                (
                    reservation.item_id.clone(),
                    ReservationState::from_row(Some((reservation, is_cancelled))),
                )
            })
            .collect();

        let contribution_rows = sqlx::query(
            r#"SELECT c.item_id, c.contributor_name, c.amount_cents, c.created_at
               FROM contributions c
               JOIN items i ON i.id = c.item_id
               WHERE i.wishlist_id = ?
               ORDER BY c.rowid"#,
        )
        .bind(wishlist_id)
        .fetch_all(&self.pool)
        .await?;

        let mut ledgers: HashMap<String, (Vec<Amount>, Vec<ContributorInfo>)> = HashMap::new();
        for row in &contribution_rows {
            let entry = ledgers.entry(row.get("item_id")).or_default();
            entry.0.push(Amount::from_cents(row.get("amount_cents")));
            entry.1.push(ContributorInfo {
                contributor_name: row.get("contributor_name"),
                created_at: row.get("created_at"),
            });
        }

        Ok(item_rows
            .iter()
            .map(|row| {
                let item = item_from_row(row);
                let reservation = reservations
                    .remove(&item.id)
                    .unwrap_or(ReservationState::Vacant);
                let (amounts, contributors) = ledgers.remove(&item.id).unwrap_or_default();
                ItemView::project(
                    item,
                    &reservation,
                    LedgerSummary::from_amounts(amounts),
                    contributors,
                    viewer_is_owner,
                )
            })
            .collect())
    }
}

// Helper functions for row conversion

fn wishlist_from_row(row: &sqlx::sqlite::SqliteRow) -> Wishlist {
    let is_public: i32 = row.get("is_public");
    Wishlist {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        cover_emoji: row.get("cover_emoji"),
        slug: row.get("slug"),
        is_public: is_public != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> Item {
    let is_group_gift: i32 = row.get("is_group_gift");
    let is_deleted: i32 = row.get("is_deleted");
    let price_cents: Option<i64> = row.get("price_cents");
    let target_cents: Option<i64> = row.get("target_cents");
    Item {
        id: row.get("id"),
        wishlist_id: row.get("wishlist_id"),
        name: row.get("name"),
        url: row.get("url"),
        price: price_cents.map(Amount::from_cents),
        image_url: row.get("image_url"),
        description: row.get("description"),
        priority: row.get("priority"),
        is_group_gift: is_group_gift != 0,
        target_amount: target_cents.map(Amount::from_cents),
        is_deleted: is_deleted != 0,
        deleted_at: row.get("deleted_at"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{item_request, test_repository, wishlist_request};
    use crate::models::DEFAULT_PRIORITY;

    #[tokio::test]
    async fn test_wishlist_lifecycle() {
        let (repo, _dir) = test_repository().await;
        let wl = repo
            .create_wishlist("owner", &wishlist_request("Birthday"), "birthday")
            .await
            .unwrap();
        assert_eq!(wl.cover_emoji.as_deref(), Some(DEFAULT_COVER_EMOJI));
        assert!(repo.slug_exists("birthday").await.unwrap());

        let updated = repo
            .update_wishlist(
                &wl,
                &UpdateWishlistRequest {
                    title: Some("Big Birthday".to_string()),
                    is_public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "birthday");
        assert!(!updated.is_public);

        let found = repo.find_wishlist_by_slug("birthday").await.unwrap().unwrap();
        assert_eq!(found.title, "Big Birthday");

        repo.delete_wishlist(&wl.id).await.unwrap();
        assert!(repo.find_wishlist_by_slug("birthday").await.unwrap().is_none());
        assert!(matches!(
            repo.delete_wishlist(&wl.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_item_listing_order_and_soft_delete() {
        let (repo, _dir) = test_repository().await;
        let wl = repo
            .create_wishlist("owner", &wishlist_request("List"), "list")
            .await
            .unwrap();

        let low = repo.create_item(&wl.id, &item_request("Socks", 1)).await.unwrap();
        repo.create_item(&wl.id, &item_request("Bike", 3)).await.unwrap();
        repo.create_item(&wl.id, &item_request("Book", DEFAULT_PRIORITY))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list_item_views(&wl.id, false)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Bike", "Book", "Socks"]);

        repo.soft_delete_item(&low).await.unwrap();
        assert_eq!(repo.list_item_views(&wl.id, false).await.unwrap().len(), 2);

        // The row survives with its flag and timestamp set.
        let deleted = repo.require_item(&low.id, &wl.id).await.unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());
        assert!(matches!(
            repo.soft_delete_item(&deleted).await,
            Err(AppError::NotFound(_))
        ));

        let summaries = repo.list_wishlists_for_owner("owner").await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].item_count, 2);
    }

    #[tokio::test]
    async fn test_update_item_merges_fields() {
        let (repo, _dir) = test_repository().await;
        let wl = repo
            .create_wishlist("owner", &wishlist_request("Merge"), "merge")
            .await
            .unwrap();
        let item = repo.create_item(&wl.id, &item_request("Lamp", 2)).await.unwrap();

        let updated = repo
            .update_item(
                &item,
                &UpdateItemRequest {
                    price: Some(Amount::from_cents(1999)),
                    is_group_gift: Some(true),
                    target_amount: Some(Amount::from_cents(5000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Lamp");
        assert!(updated.is_group_gift);

        let stored = repo.require_item(&item.id, &wl.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_find_item_is_scoped_to_wishlist() {
        let (repo, _dir) = test_repository().await;
        let a = repo
            .create_wishlist("owner", &wishlist_request("A"), "a")
            .await
            .unwrap();
        let b = repo
            .create_wishlist("owner", &wishlist_request("B"), "b")
            .await
            .unwrap();
        let item = repo.create_item(&a.id, &item_request("Pen", 2)).await.unwrap();

        assert!(repo.find_item(&item.id, &a.id).await.unwrap().is_some());
        assert!(repo.find_item(&item.id, &b.id).await.unwrap().is_none());
    }
}
