//! Runs every configured category through load, extract and persist.
//!
//! Categories are independent: a failure is recorded against its category
//! and the run moves on to the next one.

use tracing::{error, info, info_span, Instrument};

use super::acquire::PageLoader;
use super::config::{LoadStrategy, RatingMode, SelectorConfig};
use super::extract::{extract, CardFailure, CardRules};
use super::ScrapeError;
use crate::models::Product;
use crate::storage::ProductStore;

/// A category resolved to a concrete URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub url: String,
    pub strategy: LoadStrategy,
    pub rating_mode: RatingMode,
}

/// What happened to one category.
#[derive(Debug)]
pub enum CategoryOutcome {
    Succeeded {
        products: Vec<Product>,
        failures: Vec<CardFailure>,
        fully_expanded: bool,
    },
    Failed {
        error: ScrapeError,
    },
}

impl CategoryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn products(&self) -> &[Product] {
        match self {
            Self::Succeeded { products, .. } => products,
            Self::Failed { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&ScrapeError> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Succeeded { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct CategoryReport {
    pub name: String,
    pub outcome: CategoryOutcome,
}

/// Per-category outcomes in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn get(&self, name: &str) -> Option<&CategoryOutcome> {
        self.categories
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.categories
            .iter()
            .filter(|report| report.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.categories.len() - self.succeeded()
    }

    pub fn total_products(&self) -> usize {
        self.categories
            .iter()
            .map(|report| report.outcome.products().len())
            .sum()
    }
}

/// Progress hooks called by [`run_observed`] around each category.
pub trait RunObserver {
    fn category_started(&mut self, _index: usize, _category: &Category) {}

    fn category_finished(&mut self, _index: usize, _report: &CategoryReport) {}
}

impl RunObserver for () {}

/// Process `categories` one at a time.
///
/// The loader is released right after the last dynamic category, and once
/// more when the run ends, so the browser session never outlives its use.
pub async fn run<L, P>(
    categories: &[Category],
    selectors: &SelectorConfig,
    loader: &mut L,
    store: &mut P,
) -> RunReport
where
    L: PageLoader,
    P: ProductStore,
{
    run_observed(categories, selectors, loader, store, &mut ()).await
}

/// [`run`], reporting each category's start and finish to `observer`.
pub async fn run_observed<L, P, O>(
    categories: &[Category],
    selectors: &SelectorConfig,
    loader: &mut L,
    store: &mut P,
    observer: &mut O,
) -> RunReport
where
    L: PageLoader,
    P: ProductStore,
    O: RunObserver + ?Sized,
{
    let last_dynamic = categories
        .iter()
        .rposition(|category| category.strategy == LoadStrategy::Dynamic);
    let mut report = RunReport::default();

    for (index, category) in categories.iter().enumerate() {
        observer.category_started(index, category);
        info!(
            "Scraping category {} ({}, {})",
            category.name,
            category.strategy.as_str(),
            category.url
        );

        let span = info_span!("category", name = %category.name);
        let outcome = match scrape_category(category, selectors, loader, store)
            .instrument(span)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                error!("Category {} failed: {}", category.name, error);
                CategoryOutcome::Failed { error }
            }
        };

        if Some(index) == last_dynamic {
            loader.release().await;
        }

        let category_report = CategoryReport {
            name: category.name.clone(),
            outcome,
        };
        observer.category_finished(index, &category_report);
        report.categories.push(category_report);
    }

    loader.release().await;
    report
}

async fn scrape_category<L, P>(
    category: &Category,
    selectors: &SelectorConfig,
    loader: &mut L,
    store: &mut P,
) -> Result<CategoryOutcome, ScrapeError>
where
    L: PageLoader,
    P: ProductStore,
{
    let rules = CardRules::compile(selectors, category.rating_mode)?;
    let page = loader.load(&category.url, category.strategy).await?;

    let extraction = extract(&page.document(), &rules);
    info!(
        "Category {}: {} products, {} skipped cards",
        category.name,
        extraction.products.len(),
        extraction.failures.len()
    );

    store.persist(&category.name, &extraction.products)?;

    Ok(CategoryOutcome::Succeeded {
        products: extraction.products,
        failures: extraction.failures,
        fully_expanded: page.fully_expanded,
    })
}
