//! Per-category scraping configuration.

use serde::{Deserialize, Serialize};

/// How a category's page is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Single GET; the server renders the whole catalog.
    #[default]
    Static,
    /// Browser session that clicks "load more" until exhausted.
    Dynamic,
}

impl LoadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

/// How a card's rating is derived from the DOM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingMode {
    /// Integer read from the rating element's attribute.
    #[default]
    Attribute,
    /// Number of star markers inside the card.
    StarCount,
}

impl RatingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::StarCount => "star_count",
        }
    }
}

/// One category to scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Name used for reporting and the output file.
    pub name: String,
    /// Path relative to the site's base URL. Absolute URLs are used as-is.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub strategy: LoadStrategy,
    #[serde(default)]
    pub rating_mode: RatingMode,
}

impl CategoryConfig {
    pub fn new(name: &str, path: &str, strategy: LoadStrategy, rating_mode: RatingMode) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            strategy,
            rating_mode,
        }
    }
}

/// CSS selectors locating card fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub card: String,
    /// Element carrying the full title in its `title` attribute.
    pub title: String,
    pub description: String,
    pub price: String,
    /// Element carrying the rating attribute (attribute mode).
    pub rating: String,
    pub rating_attribute: String,
    /// Star icon repeated once per rating point (star-count mode).
    pub star: String,
    pub reviews: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            card: ".thumbnail".to_string(),
            title: ".title".to_string(),
            description: ".description".to_string(),
            price: ".price".to_string(),
            rating: "p[data-rating]".to_string(),
            rating_attribute: "data-rating".to_string(),
            star: ".ws-icon-star".to_string(),
            reviews: ".review-count".to_string(),
        }
    }
}

/// Agent sent with static fetches unless `[http].user_agent` overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!("shopscrape/", env!("CARGO_PKG_VERSION"));

/// HTTP client settings for static fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sent verbatim when set and non-blank.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn user_agent(&self) -> &str {
        match self.user_agent.as_deref().map(str::trim) {
            Some(agent) if !agent.is_empty() => agent,
            _ => DEFAULT_USER_AGENT,
        }
    }
}
