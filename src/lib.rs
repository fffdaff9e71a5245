//! shopscrape - product catalog scraper.
//!
//! Loads category pages from the webscraper.io e-commerce test site, either
//! with a plain GET or by driving a browser through "load more" pagination,
//! extracts product cards and writes one CSV file per category.

pub mod config;
pub mod models;
pub mod scrapers;
pub mod storage;
