//! Commands that inspect the effective configuration.

use shopscrape::config::Settings;

/// Print each category with its strategy, rating mode and URL.
pub fn cmd_categories(settings: &Settings) -> anyhow::Result<()> {
    let categories = settings.resolve_categories(&[])?;
    let width = categories
        .iter()
        .map(|category| category.name.len())
        .max()
        .unwrap_or(0);

    for category in &categories {
        println!(
            "{:<width$}  {:<7}  {:<10}  {}",
            category.name,
            category.strategy.as_str(),
            category.rating_mode.as_str(),
            category.url,
            width = width
        );
    }
    Ok(())
}

pub fn cmd_config(settings: &Settings) -> anyhow::Result<()> {
    print!("{}", settings.to_toml()?);
    Ok(())
}
