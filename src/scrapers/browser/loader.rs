//! Progressive "load more" expansion of a category page.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::config::LoadMoreConfig;
use super::session::{BrowserSession, SessionError};
use crate::scrapers::acquire::PageLoadResult;
use crate::scrapers::config::LoadStrategy;
use crate::scrapers::ScrapeError;

/// Loads pages through an owned browser session, clicking the load-more
/// control until the catalog is exhausted or a bound is reached.
pub struct DynamicLoader<S> {
    session: Option<S>,
    config: LoadMoreConfig,
    card_selector: String,
}

impl<S: BrowserSession> DynamicLoader<S> {
    /// `session` is `None` when no browser could be opened; every dynamic
    /// load then fails with a session error.
    pub fn new(session: Option<S>, config: LoadMoreConfig, card_selector: &str) -> Self {
        Self {
            session,
            config,
            card_selector: card_selector.to_string(),
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Navigate to `url`, dismiss the consent banner, expand the catalog and
    /// return the resulting markup.
    pub async fn fetch_dynamic(&mut self, url: &str) -> Result<PageLoadResult, ScrapeError> {
        let session = self.session.as_mut().ok_or_else(|| {
            ScrapeError::BrowserSession("no browser session available".to_string())
        })?;
        let config = &self.config;

        session.navigate(url).await?;
        tokio::time::sleep(config.settle_delay()).await;

        dismiss_consent(session, &config.consent_selector).await?;

        if !session.has_element(&config.control_selector).await? {
            return Err(ScrapeError::LoadControlNotFound {
                url: url.to_string(),
                selector: config.control_selector.clone(),
            });
        }

        let fully_expanded = expand(session, config, &self.card_selector).await?;
        if !fully_expanded {
            warn!(
                "Stopped expanding {} before the load-more control was hidden",
                url
            );
        }

        let markup = session.content().await?;
        Ok(PageLoadResult {
            url: url.to_string(),
            markup,
            strategy: LoadStrategy::Dynamic,
            fully_expanded,
        })
    }

    /// Close and drop the session. Safe to call repeatedly.
    pub async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("Browser session did not close cleanly: {}", e);
            }
        }
    }
}

/// Click the consent control once if it is on the page.
async fn dismiss_consent<S: BrowserSession>(
    session: &mut S,
    selector: &str,
) -> Result<(), SessionError> {
    if !session.has_element(selector).await? {
        debug!("No consent overlay present");
        return Ok(());
    }

    match session.script_click(selector).await {
        Ok(()) => debug!("Dismissed consent overlay"),
        Err(SessionError::ElementNotFound(_)) => debug!("Consent overlay vanished before click"),
        Err(e @ SessionError::Timeout { .. }) => return Err(e),
        Err(e) => warn!("Could not dismiss consent overlay: {}", e),
    }
    Ok(())
}

/// Poll-and-click loop. Returns whether the control reported hidden (or was
/// removed) before `max_clicks` or `max_duration` ran out.
async fn expand<S: BrowserSession>(
    session: &mut S,
    config: &LoadMoreConfig,
    card_selector: &str,
) -> Result<bool, SessionError> {
    let started = Instant::now();
    let mut clicks: u32 = 0;

    loop {
        tokio::time::sleep(config.poll_delay()).await;

        let style = match session.attribute(&config.control_selector, "style").await {
            Ok(style) => style,
            Err(SessionError::ElementNotFound(_)) => {
                debug!("Load-more control removed after {} clicks", clicks);
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        if style
            .as_deref()
            .is_some_and(|style| is_hidden(style, &config.hidden_style))
        {
            info!("Catalog fully expanded after {} clicks", clicks);
            return Ok(true);
        }

        if clicks >= config.max_clicks || started.elapsed() >= config.max_duration() {
            warn!(
                "Load-more bound reached ({} clicks, {:?} elapsed)",
                clicks,
                started.elapsed()
            );
            return Ok(false);
        }

        session.script_click(&config.control_selector).await?;
        clicks += 1;

        match session.count_elements(card_selector).await {
            Ok(cards) => debug!("Load-more click {}: {} cards visible", clicks, cards),
            Err(e) => debug!("Load-more click {}: card count unavailable: {}", clicks, e),
        }
    }
}

/// Whether an inline style contains the hidden declaration, ignoring case
/// and whitespace (`display:none;` matches `display: none`).
pub fn is_hidden(style: &str, hidden_style: &str) -> bool {
    let normalize = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    };
    let needle = normalize(hidden_style);
    !needle.is_empty() && normalize(style).contains(&needle)
}
