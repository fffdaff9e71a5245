//! Choosing between static and browser-driven page loads.

use async_trait::async_trait;
use scraper::Html;

use super::browser::{BrowserSession, DynamicLoader};
use super::config::LoadStrategy;
use super::http_client::HttpClient;
use super::ScrapeError;

/// Markup for one category page, produced by exactly one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLoadResult {
    pub url: String,
    pub markup: String,
    pub strategy: LoadStrategy,
    /// False when dynamic expansion stopped at its bound with the
    /// load-more control still visible. Always true for static loads.
    pub fully_expanded: bool,
}

impl PageLoadResult {
    pub fn from_static(url: &str, markup: String) -> Self {
        Self {
            url: url.to_string(),
            markup,
            strategy: LoadStrategy::Static,
            fully_expanded: true,
        }
    }

    /// Parse the markup into a queryable document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.markup)
    }
}

/// Something that can turn a URL into page markup.
#[async_trait]
pub trait PageLoader: Send {
    async fn load(&mut self, url: &str, strategy: LoadStrategy)
        -> Result<PageLoadResult, ScrapeError>;

    /// Give back any browser session; called once dynamic loading is over.
    async fn release(&mut self) {}
}

/// Static fetches over HTTP, dynamic loads through an owned browser session.
pub struct PageAcquirer<S> {
    http: HttpClient,
    dynamic: DynamicLoader<S>,
}

impl<S: BrowserSession> PageAcquirer<S> {
    pub fn new(http: HttpClient, dynamic: DynamicLoader<S>) -> Self {
        Self { http, dynamic }
    }
}

#[async_trait]
impl<S: BrowserSession> PageLoader for PageAcquirer<S> {
    async fn load(
        &mut self,
        url: &str,
        strategy: LoadStrategy,
    ) -> Result<PageLoadResult, ScrapeError> {
        match strategy {
            LoadStrategy::Static => {
                let markup = self.http.fetch_static(url).await?;
                Ok(PageLoadResult::from_static(url, markup))
            }
            LoadStrategy::Dynamic => self.dynamic.fetch_dynamic(url).await,
        }
    }

    async fn release(&mut self) {
        self.dynamic.release().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use reqwest::Client;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::scrapers::browser::{LoadMoreConfig, SessionError};

    const CONTROL: &str = ".ecomerce-items-scroll-more";
    const BROWSER_MARKUP: &str = "<div class=\"thumbnail\">rendered</div>";

    /// Tab that hides the load-more control after a fixed number of clicks.
    struct StubTab {
        hidden_after: Option<u32>,
        clicks: u32,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl StubTab {
        fn new(hidden_after: Option<u32>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let tab = Self {
                hidden_after,
                clicks: 0,
                log: Arc::clone(&log),
            };
            (tab, log)
        }
    }

    #[async_trait]
    impl BrowserSession for StubTab {
        async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
            self.log.lock().unwrap().push(format!("navigate:{}", url));
            Ok(())
        }

        async fn has_element(&mut self, selector: &str) -> Result<bool, SessionError> {
            Ok(selector == CONTROL)
        }

        async fn count_elements(&mut self, _selector: &str) -> Result<usize, SessionError> {
            Ok(1)
        }

        async fn attribute(
            &mut self,
            _selector: &str,
            _name: &str,
        ) -> Result<Option<String>, SessionError> {
            let hidden = self.hidden_after.is_some_and(|n| self.clicks >= n);
            Ok(Some(if hidden { "display: none" } else { "" }.to_string()))
        }

        async fn script_click(&mut self, _selector: &str) -> Result<(), SessionError> {
            self.clicks += 1;
            Ok(())
        }

        async fn content(&mut self) -> Result<String, SessionError> {
            Ok(BROWSER_MARKUP.to_string())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            self.log.lock().unwrap().push("close".to_string());
            Ok(())
        }
    }

    async fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{}/computers", addr)
    }

    fn acquirer(tab: StubTab, max_clicks: u32) -> PageAcquirer<StubTab> {
        let http = HttpClient::from_client(Client::builder().no_proxy().build().unwrap());
        let config = LoadMoreConfig {
            settle_delay_ms: 0,
            poll_delay_ms: 0,
            max_clicks,
            ..Default::default()
        };
        PageAcquirer::new(http, DynamicLoader::new(Some(tab), config, ".thumbnail"))
    }

    #[tokio::test]
    async fn test_static_strategy_uses_http() {
        let url = serve_once("<div class=\"thumbnail\">served</div>").await;
        let (tab, log) = StubTab::new(Some(0));
        let mut acquirer = acquirer(tab, 10);

        let page = acquirer.load(&url, LoadStrategy::Static).await.unwrap();

        assert_eq!(page.strategy, LoadStrategy::Static);
        assert!(page.fully_expanded);
        assert_eq!(page.markup, "<div class=\"thumbnail\">served</div>");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_strategy_uses_browser() {
        let (tab, log) = StubTab::new(Some(2));
        let mut acquirer = acquirer(tab, 10);

        let page = acquirer
            .load("https://shop.test/laptops", LoadStrategy::Dynamic)
            .await
            .unwrap();

        assert_eq!(page.strategy, LoadStrategy::Dynamic);
        assert!(page.fully_expanded);
        assert_eq!(page.markup, BROWSER_MARKUP);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["navigate:https://shop.test/laptops"]
        );
    }

    #[tokio::test]
    async fn test_dynamic_bound_marks_page_partial() {
        let (tab, _log) = StubTab::new(None);
        let mut acquirer = acquirer(tab, 3);

        let page = acquirer
            .load("https://shop.test/tablets", LoadStrategy::Dynamic)
            .await
            .unwrap();

        assert_eq!(page.strategy, LoadStrategy::Dynamic);
        assert!(!page.fully_expanded);
    }

    #[tokio::test]
    async fn test_release_closes_the_browser_session() {
        let (tab, log) = StubTab::new(Some(0));
        let mut acquirer = acquirer(tab, 10);

        acquirer.release().await;
        acquirer.release().await;

        assert_eq!(*log.lock().unwrap(), vec!["close"]);
        let err = acquirer
            .load("https://shop.test/touch", LoadStrategy::Dynamic)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::BrowserSession(_)));
    }
}
