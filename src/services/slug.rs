//! URL slugs.

use crate::store::{SlugKind, Store};

/// Romanize and hyphenate `text`. Never empty: falls back to `untitled`.
pub fn slugify(text: &str) -> String {
    let slug = ::slug::slugify(text);
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Whether `slug` is an acceptable user-supplied slug (`^[a-z0-9-]+$`).
pub fn is_valid(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Slug derived from `text` that is not yet taken in `kind`'s table:
/// `base`, then `base-2`, `base-3`, ...
pub async fn unique_slug(store: &Store, kind: SlugKind, text: &str) -> String {
    unique_slug_except(store, kind, text, None).await
}

/// [`unique_slug`] for a record being renamed: its current slug `own` counts
/// as free.
pub async fn unique_slug_except(
    store: &Store,
    kind: SlugKind,
    text: &str,
    own: Option<&str>,
) -> String {
    let base = slugify(text);
    let mut candidate = base.clone();
    let mut counter = 2u32;
    while own != Some(candidate.as_str()) && store.slug_exists(kind, &candidate).await {
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust  2024 "), "rust-2024");
        assert_eq!(slugify("!!!"), "untitled");
        assert_eq!(slugify(""), "untitled");
        assert!(is_valid(&slugify("Ünïcödé Tïtle")));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("my-post-2"));
        assert!(!is_valid("My-Post"));
        assert!(!is_valid("a b"));
        assert!(!is_valid(""));
    }

    #[tokio::test]
    async fn test_unique_suffixes() {
        let store = Store::in_memory();
        assert_eq!(unique_slug(&store, SlugKind::Tag, "Rust").await, "rust");
        store.create_tag("Rust", "rust").await.unwrap();
        assert_eq!(unique_slug(&store, SlugKind::Tag, "Rust").await, "rust-2");
        store.create_tag("Rust 2", "rust-2").await.unwrap();
        assert_eq!(unique_slug(&store, SlugKind::Tag, "rust").await, "rust-3");
        // Other tables are independent.
        assert_eq!(unique_slug(&store, SlugKind::Post, "Rust").await, "rust");
    }

    #[tokio::test]
    async fn test_own_slug_counts_as_free() {
        let store = Store::in_memory();
        store.create_tag("Hello", "hello").await.unwrap();
        store.create_tag("Hello again", "hello-2").await.unwrap();
        assert_eq!(
            unique_slug_except(&store, SlugKind::Tag, "Hello", Some("hello-2")).await,
            "hello-2"
        );
        assert_eq!(
            unique_slug_except(&store, SlugKind::Tag, "Hello", Some("other")).await,
            "hello-3"
        );
    }
}
