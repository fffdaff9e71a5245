//! The scrape command: wire up loaders and storage, run, report.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use shopscrape::config::Settings;
use shopscrape::scrapers::{
    run_observed, Category, CategoryOutcome, CategoryReport, ChromeSession, DynamicLoader,
    HttpClient, LoadStrategy, PageAcquirer, RunObserver, RunReport,
};
use shopscrape::storage::CsvStore;

pub async fn cmd_scrape(
    settings: &Settings,
    only: &[String],
    verbose: bool,
) -> anyhow::Result<()> {
    let categories = settings.resolve_categories(only)?;
    if categories.is_empty() {
        anyhow::bail!("No configured category matches {:?}", only);
    }
    let delimiter = settings.delimiter_byte()?;

    // One browser session serves every dynamic category
    let needs_browser = categories
        .iter()
        .any(|category| category.strategy == LoadStrategy::Dynamic);
    let session = if needs_browser {
        match ChromeSession::launch(&settings.browser).await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Browser unavailable, dynamic categories will fail: {}", e);
                None
            }
        }
    } else {
        None
    };

    let dynamic = DynamicLoader::new(session, settings.load_more.clone(), &settings.selectors.card);
    let mut loader = PageAcquirer::new(HttpClient::from_config(&settings.http)?, dynamic);
    let mut store = CsvStore::new(&settings.output_dir, delimiter);

    let mut progress = CategoryProgress::new(categories.len(), verbose);
    let report = run_observed(
        &categories,
        &settings.selectors,
        &mut loader,
        &mut store,
        &mut progress,
    )
    .await;
    progress.bar.finish_and_clear();

    print_report(&report, &store);

    if report.succeeded() == 0 {
        anyhow::bail!("All {} categories failed", report.failed());
    }
    Ok(())
}

/// Progress bar advanced once per finished category.
struct CategoryProgress {
    bar: ProgressBar,
}

impl CategoryProgress {
    /// Hidden in verbose mode so it does not interleave with log lines.
    fn new(total: usize, verbose: bool) -> Self {
        let bar = if verbose {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };
        Self { bar }
    }
}

impl RunObserver for CategoryProgress {
    fn category_started(&mut self, _index: usize, category: &Category) {
        self.bar
            .set_message(format!("{} ({})", category.name, category.strategy.as_str()));
    }

    fn category_finished(&mut self, _index: usize, _report: &CategoryReport) {
        self.bar.inc(1);
    }
}

fn print_report(report: &RunReport, store: &CsvStore) {
    for category in &report.categories {
        match &category.outcome {
            CategoryOutcome::Succeeded {
                products,
                failures,
                fully_expanded,
            } => {
                let mut line = format!(
                    "✓ {}: {} products -> {}",
                    category.name,
                    products.len(),
                    store.path_for(&category.name).display()
                );
                if !failures.is_empty() {
                    line.push_str(&format!(" ({} cards skipped)", failures.len()));
                }
                if !fully_expanded {
                    line.push_str(" (load-more limit reached)");
                }
                println!("{}", line);
                for failure in failures {
                    println!(
                        "    card {} ({}): {}",
                        failure.index,
                        failure.title.as_deref().unwrap_or("untitled"),
                        failure.error
                    );
                }
            }
            CategoryOutcome::Failed { error } => {
                println!("✗ {}: {}", category.name, error);
            }
        }
    }

    println!(
        "{} products from {} categories ({} failed)",
        report.total_products(),
        report.succeeded(),
        report.failed()
    );
}
