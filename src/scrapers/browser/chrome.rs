//! Chromium session over the DevTools protocol.

#[cfg(feature = "browser")]
use std::future::Future;
#[cfg(feature = "browser")]
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::info;
use tracing::{debug, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::error::CdpError;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;

use super::config::BrowserEngineConfig;
use super::session::{BrowserSession, SessionError};

/// JavaScript to wait for page ready state.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

#[cfg(feature = "browser")]
const CLICK_FUNCTION: &str = "function() { this.click(); }";

/// A single Chrome tab owned for the lifetime of the dynamic loads.
#[cfg(feature = "browser")]
pub struct ChromeSession {
    browser: Browser,
    ownership: Ownership,
    page: Option<Page>,
    handler: JoinHandle<()>,
    timeout: Duration,
}

#[cfg(feature = "browser")]
impl ChromeSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Launch a local browser, or connect to `remote_url` when configured,
    /// and open one blank tab.
    pub async fn launch(config: &BrowserEngineConfig) -> Result<Self, SessionError> {
        let (browser, mut handler, ownership) = match config.remote_url.as_deref() {
            Some(remote_url) => {
                let (browser, handler) = Self::connect_remote(remote_url, config).await?;
                (browser, handler, Ownership::Remote)
            }
            None => {
                let (browser, handler) = Self::launch_local(config).await?;
                (browser, handler, Ownership::Launched)
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Protocol(format!("Failed to open tab: {}", e)))?;

        Ok(Self {
            browser,
            ownership,
            page: Some(page),
            handler,
            timeout: Duration::from_secs(config.timeout),
        })
    }

    fn find_chrome() -> Result<PathBuf, SessionError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(SessionError::Protocol(
            "Chrome/Chromium not found. Install chromium or set [browser].remote_url".to_string(),
        ))
    }

    async fn launch_local(
        config: &BrowserEngineConfig,
    ) -> Result<(Browser, chromiumoxide::Handler), SessionError> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox") // Often needed for headless in containers
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| SessionError::Protocol(format!("Failed to build browser config: {}", e)))?;

        Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Protocol(format!("Failed to launch browser: {}", e)))
    }

    async fn connect_remote(
        url: &str,
        config: &BrowserEngineConfig,
    ) -> Result<(Browser, chromiumoxide::Handler), SessionError> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, config.timeout
        );

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| SessionError::Protocol(format!("Failed to reach remote browser: {}", e)))?
            .json()
            .await
            .map_err(|e| SessionError::Protocol(format!("Bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                SessionError::Protocol("No webSocketDebuggerUrl in response".to_string())
            })?;

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(config.timeout),
            ..Default::default()
        };

        Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| SessionError::Protocol(format!("Failed to connect to browser: {}", e)))
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }

    /// Run one CDP call under the session timeout.
    async fn guarded<T, F>(&self, operation: &str, call: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, CdpError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(SessionError::Protocol(format!("{} failed: {}", operation, e))),
            Err(_) => Err(SessionError::Timeout {
                operation: operation.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }

    async fn first_element(&self, selector: &str) -> Result<Element, SessionError> {
        let page = self.page()?;
        let mut elements = self
            .guarded("query", page.find_elements(selector))
            .await?;
        if elements.is_empty() {
            return Err(SessionError::ElementNotFound(selector.to_string()));
        }
        Ok(elements.swap_remove(0))
    }

    async fn wait_for_page_ready(&self) {
        let Ok(page) = self.page() else { return };
        match tokio::time::timeout(self.timeout, page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| SessionError::Protocol(format!("Invalid URL {}: {}", url, e)))?;

        let page = self.page()?;
        self.guarded("navigation", page.execute(nav_params)).await?;
        self.wait_for_page_ready().await;
        Ok(())
    }

    async fn has_element(&mut self, selector: &str) -> Result<bool, SessionError> {
        Ok(self.count_elements(selector).await? > 0)
    }

    async fn count_elements(&mut self, selector: &str) -> Result<usize, SessionError> {
        let page = self.page()?;
        let elements = self
            .guarded("query", page.find_elements(selector))
            .await?;
        Ok(elements.len())
    }

    async fn attribute(
        &mut self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let element = self.first_element(selector).await?;
        self.guarded("attribute read", element.attribute(name))
            .await
    }

    async fn script_click(&mut self, selector: &str) -> Result<(), SessionError> {
        let element = self.first_element(selector).await?;
        self.guarded("click", element.call_js_fn(CLICK_FUNCTION, false))
            .await?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        let page = self.page()?;
        self.guarded("content", page.content()).await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        info!("Closing browser session");

        match tokio::time::timeout(self.timeout, page.close()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!("Tab close failed: {}", e),
            Err(_) => debug!("Tab close timed out"),
        }

        let result = release_browser(&mut self.browser, self.ownership, self.timeout).await;
        self.handler.abort();
        result
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<(), String> {
        self.close().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn wait_exit(&mut self) -> Result<(), String> {
        self.wait().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = Browser::kill(self).await {
            warn!("Could not kill browser process: {}", e);
        }
    }
}

#[cfg(feature = "browser")]
impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Whether this session started the browser or attached to someone else's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
enum Ownership {
    Launched,
    Remote,
}

/// Shutdown primitives of a browser process.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[async_trait]
trait BrowserProcess: Send {
    async fn request_close(&mut self) -> Result<(), String>;

    async fn wait_exit(&mut self) -> Result<(), String>;

    async fn kill(&mut self);
}

/// Shut down a launched browser: ask it to close, wait for the process, and
/// kill it when either step outlives `timeout`. Remote browsers are left
/// running; only the connection goes away.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
async fn release_browser<P: BrowserProcess>(
    process: &mut P,
    ownership: Ownership,
    timeout: Duration,
) -> Result<(), SessionError> {
    if ownership == Ownership::Remote {
        return Ok(());
    }

    let closed = match tokio::time::timeout(timeout, process.request_close()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(SessionError::Protocol(format!("close failed: {}", e))),
        Err(_) => Err(SessionError::Timeout {
            operation: "close".to_string(),
            secs: timeout.as_secs(),
        }),
    };

    match tokio::time::timeout(timeout, process.wait_exit()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Waiting for browser exit failed: {}", e),
        Err(_) => {
            warn!("Browser did not exit within {:?}, killing it", timeout);
            process.kill().await;
        }
    }

    closed
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct ChromeSession {
    _private: (),
}

#[cfg(not(feature = "browser"))]
impl ChromeSession {
    pub async fn launch(_config: &BrowserEngineConfig) -> Result<Self, SessionError> {
        Err(SessionError::Protocol(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&mut self, _url: &str) -> Result<(), SessionError> {
        Err(SessionError::Closed)
    }

    async fn has_element(&mut self, _selector: &str) -> Result<bool, SessionError> {
        Err(SessionError::Closed)
    }

    async fn count_elements(&mut self, _selector: &str) -> Result<usize, SessionError> {
        Err(SessionError::Closed)
    }

    async fn attribute(
        &mut self,
        _selector: &str,
        _name: &str,
    ) -> Result<Option<String>, SessionError> {
        Err(SessionError::Closed)
    }

    async fn script_click(&mut self, _selector: &str) -> Result<(), SessionError> {
        Err(SessionError::Closed)
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        Err(SessionError::Closed)
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}
