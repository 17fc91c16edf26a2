//! Wishlist slug allocation.
//!
//! Titles become URL-safe slugs: Cyrillic letters are transliterated, anything
//! outside `[a-z0-9]` and whitespace is dropped, whitespace runs become single
//! hyphens, and the result is capped at [`MAX_SLUG_LEN`] characters. Uniqueness
//! is probed against the store with `-1`, `-2`, ... suffixes. Concurrent
//! creations can still pick the same candidate; the `UNIQUE` constraint on
//! `wishlists.slug` rejects the loser with a conflict.

use crate::db::Repository;
use crate::errors::AppError;

pub const MAX_SLUG_LEN: usize = 50;
pub const DEFAULT_SLUG: &str = "wishlist";

/// Latin spelling of a lowercase Cyrillic letter.
fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Derive the base slug for a title, without uniqueness suffix.
pub fn slugify(title: &str) -> String {
    let mut cleaned = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if let Some(latin) = transliterate(c) {
            cleaned.push_str(latin);
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            cleaned.push(c);
        } else if c.is_whitespace() {
            cleaned.push(' ');
        }
    }

    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    let truncated: String = joined.chars().take(MAX_SLUG_LEN).collect();
    let slug = truncated.trim_matches('-');

    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Allocate a slug for `title` that no existing wishlist uses.
pub async fn allocate(repo: &Repository, title: &str) -> Result<String, AppError> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut counter = 1u32;

    while repo.slug_exists(&candidate).await? {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }

    if counter > 1 {
        tracing::debug!(base = %base, slug = %candidate, "Slug collided, using suffix");
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{test_repository, wishlist_request as request};

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Gift Box"), "gift-box");
        assert_eq!(slugify("  My   Birthday  2026 "), "my-birthday-2026");
        assert_eq!(slugify("Wow!!! Such, gifts?"), "wow-such-gifts");
    }

    #[test]
    fn test_slugify_drops_hyphens_and_symbols() {
        assert_eq!(slugify("Gift-Box"), "giftbox");
        assert_eq!(slugify("🎁 party 🎉"), "party");
    }

    #[test]
    fn test_slugify_transliterates_cyrillic() {
        assert_eq!(slugify("День рождения"), "den-rozhdeniya");
        assert_eq!(slugify("Ёлка Щука"), "yolka-shchuka");
        assert_eq!(slugify("Подъезд"), "podezd");
    }

    #[test]
    fn test_slugify_fallback_and_truncation() {
        assert_eq!(slugify("!!!"), DEFAULT_SLUG);
        assert_eq!(slugify(""), DEFAULT_SLUG);
        assert_eq!(slugify("日本語"), DEFAULT_SLUG);

        let long = "a".repeat(80);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);

        // A cut landing on a separator does not leave a trailing hyphen.
        let title = format!("{} tail", "b".repeat(MAX_SLUG_LEN - 1));
        let slug = slugify(&title);
        assert!(!slug.ends_with('-'));
        assert_eq!(slug.len(), MAX_SLUG_LEN - 1);
    }

    #[tokio::test]
    async fn test_allocate_appends_suffix_on_collision() {
        let (repo, _dir) = test_repository().await;

        let first = allocate(&repo, "Gift Box").await.unwrap();
        assert_eq!(first, "gift-box");
        repo.create_wishlist("owner-1", &request("Gift Box"), &first)
            .await
            .unwrap();

        let second = allocate(&repo, "Gift Box").await.unwrap();
        assert_eq!(second, "gift-box-1");
        repo.create_wishlist("owner-2", &request("Gift Box"), &second)
            .await
            .unwrap();

        assert_eq!(allocate(&repo, "gift box").await.unwrap(), "gift-box-2");
    }

    #[tokio::test]
    async fn test_store_rejects_duplicate_slug_with_conflict() {
        let (repo, _dir) = test_repository().await;
        repo.create_wishlist("owner-1", &request("Gift Box"), "gift-box")
            .await
            .unwrap();
        let err = repo
            .create_wishlist("owner-2", &request("Gift Box"), "gift-box")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
