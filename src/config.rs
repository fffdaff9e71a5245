//! Configuration management for shopscrape.
//!
//! Settings come from a config file discovered by prefer (or given with
//! `--config`); every field has a default so an empty or missing file
//! scrapes the whole test site.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::scrapers::{
    BrowserEngineConfig, Category, CategoryConfig, HttpConfig, LoadMoreConfig, LoadStrategy,
    RatingMode, SelectorConfig,
};
use crate::storage::file_stem;

/// Name prefer uses to discover `shopscrape.{toml,json,..}` config files.
pub const CONFIG_NAME: &str = "shopscrape";

pub const DEFAULT_BASE_URL: &str = "https://webscraper.io/test-sites/e-commerce/more/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid URL for category {category}: {source}")]
    Url {
        category: String,
        source: url::ParseError,
    },

    #[error("categories {first:?} and {second:?} would both write {stem}.csv")]
    CategoryCollision {
        first: String,
        second: String,
        stem: String,
    },

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(String),
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Site root that category paths are resolved against.
    pub base_url: String,
    /// Directory receiving one CSV file per category.
    pub output_dir: PathBuf,
    /// Field delimiter for output files.
    pub delimiter: String,
    pub http: HttpConfig,
    pub browser: BrowserEngineConfig,
    pub load_more: LoadMoreConfig,
    pub selectors: SelectorConfig,
    pub categories: Vec<CategoryConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("data"),
            delimiter: ",".to_string(),
            http: HttpConfig::default(),
            browser: BrowserEngineConfig::default(),
            load_more: LoadMoreConfig::default(),
            selectors: SelectorConfig::default(),
            categories: default_categories(),
        }
    }
}

/// Every page of the test site. Server-rendered pages read the rating
/// attribute; "load more" pages count star icons.
pub fn default_categories() -> Vec<CategoryConfig> {
    use LoadStrategy::{Dynamic, Static};
    use RatingMode::{Attribute, StarCount};

    vec![
        CategoryConfig::new("home", "", Static, Attribute),
        CategoryConfig::new("computers", "computers", Static, Attribute),
        CategoryConfig::new("laptops", "computers/laptops", Dynamic, StarCount),
        CategoryConfig::new("tablets", "computers/tablets", Dynamic, StarCount),
        CategoryConfig::new("phones", "phones", Static, Attribute),
        CategoryConfig::new("touch", "phones/touch", Dynamic, StarCount),
    ]
}

impl Settings {
    /// Load settings from `path` when given. Otherwise let prefer discover a
    /// `shopscrape` config file in the standard locations, falling back to
    /// defaults when there is none.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path).await;
        }

        match prefer::load(CONFIG_NAME).await {
            Ok(discovered) => match discovered.source_path() {
                Some(path) => {
                    debug!("Using config file {}", path.display());
                    Self::from_file(path).await
                }
                None => Ok(Self::default()),
            },
            Err(e) => {
                debug!("No config file discovered ({}), using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Parse a config file by extension: `.json` as JSON, anything else as TOML.
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            _ => toml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(ConfigError::Delimiter(self.delimiter.clone())),
        }
    }

    pub fn has_dynamic_categories(&self) -> bool {
        self.categories
            .iter()
            .any(|category| category.strategy == LoadStrategy::Dynamic)
    }

    /// Resolve configured categories to absolute URLs, keeping only those in
    /// `only` when it is non-empty.
    ///
    /// Names must stay distinct once turned into file names, otherwise one
    /// category's output would replace another's.
    pub fn resolve_categories(&self, only: &[String]) -> Result<Vec<Category>, ConfigError> {
        let base = Url::parse(&self.base_url).map_err(|source| ConfigError::Url {
            category: "base_url".to_string(),
            source,
        })?;

        let mut stems: HashMap<String, &str> = HashMap::new();
        for category in &self.categories {
            let stem = file_stem(&category.name);
            if let Some(first) = stems.insert(stem.clone(), &category.name) {
                return Err(ConfigError::CategoryCollision {
                    first: first.to_string(),
                    second: category.name.clone(),
                    stem,
                });
            }
        }

        self.categories
            .iter()
            .filter(|category| only.is_empty() || only.contains(&category.name))
            .map(|category| {
                let url = base
                    .join(&category.path)
                    .map_err(|source| ConfigError::Url {
                        category: category.name.clone(),
                        source,
                    })?;
                Ok(Category {
                    name: category.name.clone(),
                    url: url.to_string(),
                    strategy: category.strategy,
                    rating_mode: category.rating_mode,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.categories.len(), 6);
        assert!(settings.has_dynamic_categories());
    }

    #[test]
    fn test_resolve_default_categories() {
        let categories = Settings::default().resolve_categories(&[]).unwrap();

        let urls: Vec<&str> = categories.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://webscraper.io/test-sites/e-commerce/more/",
                "https://webscraper.io/test-sites/e-commerce/more/computers",
                "https://webscraper.io/test-sites/e-commerce/more/computers/laptops",
                "https://webscraper.io/test-sites/e-commerce/more/computers/tablets",
                "https://webscraper.io/test-sites/e-commerce/more/phones",
                "https://webscraper.io/test-sites/e-commerce/more/phones/touch",
            ]
        );
        assert_eq!(categories[2].strategy, LoadStrategy::Dynamic);
        assert_eq!(categories[2].rating_mode, RatingMode::StarCount);
    }

    #[test]
    fn test_resolve_filters_by_name() {
        let only = vec!["touch".to_string(), "home".to_string()];
        let categories = Settings::default().resolve_categories(&only).unwrap();

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["home", "touch"]);
    }

    #[tokio::test]
    async fn test_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.toml");
        fs::write(
            &path,
            r#"
            base_url = "http://localhost:8080/shop/"
            delimiter = ";"

            [load_more]
            max_clicks = 3

            [[categories]]
            name = "all"
            path = "catalog"
            strategy = "dynamic"
            "#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).await.unwrap();

        assert_eq!(settings.delimiter_byte().unwrap(), b';');
        assert_eq!(settings.load_more.max_clicks, 3);
        assert_eq!(settings.load_more.poll_delay_ms, 500);
        let categories = settings.resolve_categories(&[]).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].url, "http://localhost:8080/shop/catalog");
        assert_eq!(categories[0].rating_mode, RatingMode::Attribute);
    }

    #[tokio::test]
    async fn test_bad_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Settings::load(Some(&missing)).await,
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "categories = 5").unwrap();
        assert!(matches!(
            Settings::load(Some(&broken)).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_json_config_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shopscrape.json");
        fs::write(&path, r#"{"delimiter": "\t", "output_dir": "out"}"#).unwrap();

        let settings = Settings::load(Some(&path)).await.unwrap();

        assert_eq!(settings.delimiter_byte().unwrap(), b'\t');
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert_eq!(settings.categories.len(), 6);
    }

    #[test]
    fn test_duplicate_category_names_rejected() {
        let mut settings = Settings::default();
        settings.categories.push(CategoryConfig::new(
            "laptops",
            "other/laptops",
            LoadStrategy::Static,
            RatingMode::Attribute,
        ));

        let err = settings.resolve_categories(&[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::CategoryCollision { ref first, ref second, .. }
                if first == "laptops" && second == "laptops"
        ));
    }

    #[test]
    fn test_names_sharing_an_output_file_rejected() {
        let settings = Settings {
            categories: vec![
                CategoryConfig::new(
                    "phones/touch",
                    "phones/touch",
                    LoadStrategy::Dynamic,
                    RatingMode::StarCount,
                ),
                CategoryConfig::new(
                    "phones_touch",
                    "phones",
                    LoadStrategy::Static,
                    RatingMode::Attribute,
                ),
            ],
            ..Default::default()
        };

        // Rejected even when only one of them is selected.
        let only = vec!["phones_touch".to_string()];
        match settings.resolve_categories(&only).unwrap_err() {
            ConfigError::CategoryCollision { stem, .. } => assert_eq!(stem, "phones_touch"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_delimiter_and_base_url() {
        let settings = Settings {
            delimiter: "||".to_string(),
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.delimiter_byte(),
            Err(ConfigError::Delimiter(_))
        ));
        assert!(matches!(
            settings.resolve_categories(&[]),
            Err(ConfigError::Url { .. })
        ));
    }

    #[test]
    fn test_settings_toml_round_trip() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
