//! Scoped headless-browser session.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::handler::{Handler, HandlerConfig};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserEngineConfig, BrowserError};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
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

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// A launched or connected browser plus its CDP handler task.
///
/// Dropping the session aborts the handler; a launched browser process is
/// killed when its [`Browser`] is dropped. [`BrowserSession::close`] is the
/// orderly path.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    /// False for remote browsers, which are left running.
    owned: bool,
}

impl BrowserSession {
    /// Launch a local browser, or connect to `remote_url` when configured.
    pub async fn open(config: &BrowserEngineConfig) -> Result<Self, BrowserError> {
        match config.remote_url.as_deref() {
            Some(remote_url) => Self::connect_remote(config, remote_url).await,
            None => Self::launch(config).await,
        }
    }

    async fn launch(config: &BrowserEngineConfig) -> Result<Self, BrowserError> {
        info!("Launching browser (headless={})", config.headless);
        let chrome_path = find_chrome()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(config.navigation_timeout());

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg.as_str());
        }

        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let launch = async {
            Browser::launch(browser_config)
                .await
                .map_err(|e| BrowserError::Launch(e.to_string()))
        };
        let (browser, handler) = bounded(config.navigation_timeout(), "launch", launch).await?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
            owned: true,
        })
    }

    async fn connect_remote(
        config: &BrowserEngineConfig,
        remote_url: &str,
    ) -> Result<Self, BrowserError> {
        info!("Connecting to remote browser at {}", remote_url);

        let ws_url = if remote_url.contains("/devtools/browser/") {
            remote_url.to_string()
        } else {
            debugger_url(remote_url).await?
        };
        debug!("Connecting to WebSocket: {}", ws_url);

        let handler_config = HandlerConfig {
            request_timeout: config.navigation_timeout(),
            ..Default::default()
        };

        let connect = async {
            Browser::connect_with_config(ws_url, handler_config)
                .await
                .map_err(|e| BrowserError::Launch(e.to_string()))
        };
        let (browser, handler) = bounded(config.navigation_timeout(), "connect", connect).await?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
            owned: false,
        })
    }

    /// Open a blank tab.
    pub async fn new_page(&self) -> Result<Page, BrowserError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))
    }

    /// Shut the browser down. Remote browsers are only disconnected.
    pub async fn close(mut self) {
        if !self.owned {
            return;
        }
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
            return;
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process did not exit cleanly: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Run a startup step under `timeout`.
async fn bounded<T>(
    timeout: Duration,
    step: &'static str,
    fut: impl std::future::Future<Output = Result<T, BrowserError>>,
) -> Result<T, BrowserError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| BrowserError::Timeout(step))?
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// Find a Chrome executable at a known location or on `PATH`.
fn find_chrome() -> Result<PathBuf, BrowserError> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            debug!("Found Chrome at: {}", path);
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(path) = which::which(cmd) {
            debug!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    Err(BrowserError::Unavailable(
        "Chrome/Chromium not found; install it or set BROWSER_URL".to_string(),
    ))
}

/// Resolve the WebSocket debugger URL from a DevTools HTTP endpoint.
async fn debugger_url(remote_url: &str) -> Result<String, BrowserError> {
    let http_url = remote_url
        .replace("ws://", "http://")
        .replace("wss://", "https://");
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| BrowserError::Launch(e.to_string()))?;

    let resp: serde_json::Value = client
        .get(&version_url)
        .send()
        .await
        .map_err(|e| BrowserError::Launch(format!("Failed to reach remote browser: {}", e)))?
        .json()
        .await
        .map_err(|e| BrowserError::Launch(format!("Bad browser version info: {}", e)))?;

    resp.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| BrowserError::Launch("No webSocketDebuggerUrl in response".to_string()))
}
