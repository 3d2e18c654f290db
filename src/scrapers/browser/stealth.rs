//! Evasion scripts for pages that fingerprint headless Chrome.

use chromiumoxide::Page;
use tracing::debug;

/// Applied once the page has a document.
const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Portuguese first, like a local visitor
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['pt-BR', 'pt', 'en-US', 'en'],
        configurable: true
    });
    "#,
];

/// Inject every script. Failures are only logged.
pub async fn apply(page: &Page) {
    debug!("Applying stealth scripts");
    for script in STEALTH_SCRIPTS {
        if let Err(e) = page.evaluate(script.to_string()).await {
            debug!("Stealth script injection skipped: {}", e);
        }
    }
}
