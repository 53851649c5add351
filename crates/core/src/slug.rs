//! Slug normalization and draft-store uniqueness.
//!
//! Normalization is pure. Uniqueness is a best-effort pre-check against the
//! draft store; the store's unique constraint is the final arbiter, and the
//! save path re-runs [`resolve_unique`] whenever a write loses that race.

use crate::config::StagingConfig;
use crate::extensions::ExtensionRegistry;
use crate::item::ContentItem;
use crate::store::{StagingStore, StoreError};
use crate::types::DbId;

/// Map a Latin-1 letter with diacritics onto its ASCII base letter.
fn transliterate(c: char) -> Option<&'static str> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(base)
}

/// Normalize `source` into a URL-safe token.
///
/// Lowercases, transliterates common accented letters, replaces every run of
/// characters outside `[a-z0-9]` with a single hyphen and trims hyphens from
/// both ends. May return an empty string.
pub fn normalize(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut prev_hyphen = true;
    for c in source.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if let Some(base) = transliterate(c) {
            result.push_str(base);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }
    result.trim_end_matches('-').to_string()
}

/// Whether a normalized token is unusable as a slug on its own.
fn is_placeholder(token: &str) -> bool {
    token.is_empty() || token == "-" || token.chars().all(|c| c.is_ascii_digit())
}

/// The deterministic `<prefix>-<id>` slug.
pub fn fallback_slug(id: DbId, config: &StagingConfig) -> String {
    format!("{}-{id}", config.fallback_slug_prefix)
}

/// Normalize `source`, falling back to `<prefix>-<id>` for placeholder results.
pub fn sanitize(source: &str, id: DbId, config: &StagingConfig) -> String {
    let token = normalize(source);
    if is_placeholder(&token) {
        fallback_slug(id, config)
    } else {
        token
    }
}

/// Generate a slug from a title, then let extensions rewrite it.
pub fn generate_from_title(
    title: &str,
    id: DbId,
    config: &StagingConfig,
    extensions: &ExtensionRegistry,
) -> String {
    let mut slug = sanitize(title, id, config);
    extensions.update_slug(&mut slug, title);
    slug
}

/// Pick the slug `item` should be saved with, before uniqueness checks.
///
/// `persisted_slug` is the slug of the stored draft, or `None` for an item
/// that has never been saved.
///
/// - An empty or default slug is regenerated from the title, unless the title
///   is itself still the default.
/// - A slug edited since the last save is sanitized.
/// - Anything else is kept, so edits to unrelated fields never move the slug.
pub fn candidate_slug(
    item: &ContentItem,
    persisted_slug: Option<&str>,
    config: &StagingConfig,
    extensions: &ExtensionRegistry,
) -> String {
    let slug_unset = item.slug.is_empty() || item.slug == config.default_slug;
    if slug_unset && item.title != config.default_title {
        return generate_from_title(&item.title, item.id, config, extensions);
    }

    let edited = match persisted_slug {
        Some(previous) => previous != item.slug,
        None => item.slug != config.default_slug,
    };
    if edited {
        sanitize(&item.slug, item.id, config)
    } else {
        item.slug.clone()
    }
}

/// Strip one trailing `-<digits>` suffix, if present.
pub fn strip_numeric_suffix(slug: &str) -> &str {
    match slug.rsplit_once('-') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => slug,
    }
}

/// Find the first free slug starting at `candidate`.
///
/// Conflicts are resolved by replacing any trailing numeric suffix with
/// `-2`, `-3`, and so on. Records with `id` are ignored, so an item never
/// conflicts with its own slug.
pub async fn resolve_unique(
    store: &dyn StagingStore,
    candidate: &str,
    id: DbId,
) -> Result<String, StoreError> {
    let mut slug = candidate.to_string();
    let mut count: u64 = 2;
    while let Some(holder) = store.find_draft_by_slug(&slug, id).await? {
        tracing::debug!(item_id = id, holder_id = holder.id, slug = %slug, "Slug taken, trying next suffix");
        slug = format!("{}-{count}", strip_numeric_suffix(&slug));
        count += 1;
    }
    Ok(slug)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
