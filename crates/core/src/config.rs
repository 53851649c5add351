//! Staging configuration: default field values and naming conventions.

/// Default title given to freshly created items.
pub const DEFAULT_TITLE: &str = "New Item";

/// Default slug paired with [`DEFAULT_TITLE`].
pub const DEFAULT_SLUG: &str = "new-item";

/// Prefix used when a slug cannot be derived from its source (`item-<id>`).
pub const DEFAULT_FALLBACK_SLUG_PREFIX: &str = "item";

/// Prefix prepended to the title of duplicated items.
pub const DEFAULT_COPY_TITLE_PREFIX: &str = "Copy of ";

/// URL action segment placed between the listing link and the slug.
pub const DEFAULT_SHOW_ACTION: &str = "show";

/// Behavioural knobs for the staging core.
///
/// All fields have sensible defaults. Hosts can
/// override them via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingConfig {
    /// Title sentinel used to detect "never customised" items.
    pub default_title: String,
    /// Slug assigned to items still carrying the default title.
    pub default_slug: String,
    /// Prefix of the `<prefix>-<id>` fallback slug.
    pub fallback_slug_prefix: String,
    /// Marker prepended to duplicated titles.
    pub copy_title_prefix: String,
    /// Action segment used by link resolution.
    pub show_action: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            default_slug: DEFAULT_SLUG.to_string(),
            fallback_slug_prefix: DEFAULT_FALLBACK_SLUG_PREFIX.to_string(),
            copy_title_prefix: DEFAULT_COPY_TITLE_PREFIX.to_string(),
            show_action: DEFAULT_SHOW_ACTION.to_string(),
        }
    }
}

impl StagingConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default     |
    /// |----------------------------------|-------------|
    /// | `PAGESTAGE_DEFAULT_TITLE`        | `New Item`  |
    /// | `PAGESTAGE_DEFAULT_SLUG`         | `new-item`  |
    /// | `PAGESTAGE_FALLBACK_SLUG_PREFIX` | `item`      |
    /// | `PAGESTAGE_COPY_TITLE_PREFIX`    | `Copy of `  |
    /// | `PAGESTAGE_SHOW_ACTION`          | `show`      |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_title: env_or("PAGESTAGE_DEFAULT_TITLE", defaults.default_title),
            default_slug: env_or("PAGESTAGE_DEFAULT_SLUG", defaults.default_slug),
            fallback_slug_prefix: env_or(
                "PAGESTAGE_FALLBACK_SLUG_PREFIX",
                defaults.fallback_slug_prefix,
            ),
            copy_title_prefix: env_or("PAGESTAGE_COPY_TITLE_PREFIX", defaults.copy_title_prefix),
            show_action: env_or("PAGESTAGE_SHOW_ACTION", defaults.show_action),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}
