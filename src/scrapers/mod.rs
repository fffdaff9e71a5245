//! Page acquisition and product extraction.

pub mod acquire;
pub mod browser;
pub mod config;
mod error;
pub mod extract;
mod http_client;
pub mod orchestrator;

pub use acquire::{PageAcquirer, PageLoadResult, PageLoader};
pub use browser::{BrowserEngineConfig, BrowserSession, ChromeSession, DynamicLoader, LoadMoreConfig};
pub use config::{CategoryConfig, HttpConfig, LoadStrategy, RatingMode, SelectorConfig};
pub use error::ScrapeError;
pub use extract::{extract, CardFailure, CardRules, Extraction};
pub use http_client::HttpClient;
pub use orchestrator::{
    run, run_observed, Category, CategoryOutcome, CategoryReport, RunObserver, RunReport,
};
