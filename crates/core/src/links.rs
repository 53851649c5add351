//! Canonical and absolute links for items shown on a listing page.

use crate::config::StagingConfig;
use crate::item::ContentItem;

/// The listing container that displays items.
pub trait ListingPage: Send + Sync {
    /// Site-relative link, e.g. `/news/`.
    fn link(&self) -> String;

    /// Absolute link, e.g. `https://example.com/news/`.
    fn absolute_link(&self) -> String;
}

/// Join URL fragments with exactly one `/` between them.
///
/// Empty fragments are skipped. Query strings found in any fragment are moved
/// to the end and merged with `&`.
pub fn join_links(parts: &[&str]) -> String {
    let mut path = String::new();
    let mut queries: Vec<&str> = Vec::new();

    for part in parts {
        let (segment, query) = match part.split_once('?') {
            Some((segment, query)) => (segment, Some(query)),
            None => (*part, None),
        };
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            queries.push(query);
        }
        if segment.is_empty() {
            continue;
        }
        if path.is_empty() {
            path.push_str(segment);
        } else {
            let trimmed = path.trim_end_matches('/').len();
            path.truncate(trimmed);
            path.push('/');
            path.push_str(segment.trim_start_matches('/'));
        }
    }

    if !queries.is_empty() {
        path.push('?');
        path.push_str(&queries.join("&"));
    }
    path
}

/// Site-relative link to `item` on `listing`, with an optional action.
pub fn item_link(
    listing: &dyn ListingPage,
    item: &ContentItem,
    action: Option<&str>,
    config: &StagingConfig,
) -> String {
    join_links(&[
        listing.link().as_str(),
        config.show_action.as_str(),
        item.slug.as_str(),
        action.unwrap_or_default(),
    ])
}

/// Absolute link to `item` on `listing`, with an optional action.
pub fn absolute_item_link(
    listing: &dyn ListingPage,
    item: &ContentItem,
    action: Option<&str>,
    config: &StagingConfig,
) -> String {
    join_links(&[
        listing.absolute_link().as_str(),
        config.show_action.as_str(),
        item.slug.as_str(),
        action.unwrap_or_default(),
    ])
}
