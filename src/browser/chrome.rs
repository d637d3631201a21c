// spider_chrome re-exports chromiumoxide API
use crate::driver::{Driver, PageScript};
use crate::error::{BrowserError, Result};
use crate::selector::{Locator, Selector};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::{
    CallFunctionOnParams, EvaluateParams, ExceptionDetails, ReleaseObjectParams, RemoteObjectId,
    RemoteObjectSubtype,
};
use chromiumoxide::page::Page;
use chromiumoxide_fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Object group for every node handed out by `locate`
pub const ELEMENT_OBJECT_GROUP: &str = "webdriver-marker";

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Launch a Chrome installation with a throwaway profile
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Attach to a Chrome already listening on this debug port
    DebugPort(u16),
}

/// A DOM node located by [`ChromeDriver`]
///
/// Holds the remote object id of the node, so it stays valid until the page
/// navigates away. The remote object is released once the last clone of the
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct ChromeElement {
    node: Arc<RemoteNode>,
    description: Option<String>,
}

#[derive(Debug)]
struct RemoteNode {
    page: Page,
    object_id: RemoteObjectId,
}

impl Drop for RemoteNode {
    fn drop(&mut self) {
        // Release needs a round trip to the page; without a runtime the
        // object lives until the page navigates.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let page = self.page.clone();
        let params = ReleaseObjectParams::new(self.object_id.clone());
        runtime.spawn(async move {
            if let Err(e) = page.execute(params).await {
                log::debug!("Failed to release remote element: {}", e);
            }
        });
    }
}

impl ChromeElement {
    pub fn object_id(&self) -> &RemoteObjectId {
        &self.node.object_id
    }

    /// Chrome's short description of the node, e.g. `input#q.search`
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn page(&self) -> &Page {
        &self.node.page
    }
}

impl ChromeDriver {
    /// First page that is not one of Chrome's internal pages, creating one if needed
    async fn get_active_page(&self) -> Result<Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create page: {}", e)))
    }

    /// Launch Chrome headless with auto-detection for CI environments
    pub async fn launch_auto() -> Result<Self> {
        let is_ci = std::env::var("CI").is_ok()
            || std::env::var("GITHUB_ACTIONS").is_ok()
            || std::env::var("GITLAB_CI").is_ok()
            || std::env::var("JENKINS_HOME").is_ok()
            || std::env::var("CIRCLECI").is_ok();

        Self::new(ConnectionMode::Sandboxed {
            chrome_path: None,
            no_sandbox: is_ci,
            headless: is_ci,
        })
        .await
    }

    /// Connect to existing Chrome on debug port
    pub async fn connect_debug_port(port: u16) -> Result<Self> {
        Self::new(ConnectionMode::DebugPort(port)).await
    }

    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // One profile directory per instance so parallel sessions never share state
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
                    .as_nanos();
                let temp_dir = std::env::temp_dir().join(format!("webdriver-marker-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    BrowserError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };
                config = config.user_data_dir(&temp_dir);

                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                // Without an explicit path, fall back to a cached Chrome for Testing
                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                } else {
                    match Self::ensure_chrome_installed().await {
                        Ok(path) => config = config.chrome_executable(path),
                        Err(e) => {
                            log::warn!("Chrome download failed ({}), trying system Chrome", e)
                        }
                    }
                }

                let config = config.build().map_err(|e| {
                    BrowserError::LaunchFailed(format!(
                        "{}. Install Chrome or pass its path with --chrome-path \
                         (Linux sandbox issue? try --no-sandbox)",
                        e
                    ))
                })?;

                log::info!("Launching Chrome (headless: {})", headless);
                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {}
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                log::info!("Connecting to Chrome at {}", url);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    BrowserError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {}
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Navigate the active page, adding `https://` when the URL has no scheme
    pub async fn navigate(&self, url: &str) -> Result<()> {
        use chromiumoxide::cdp::browser_protocol::page::NavigateParams;

        let url = normalize_url(url);
        let page = self.get_active_page().await?;

        log::info!("Navigating to {}", url);

        let params = NavigateParams::builder()
            .url(&url)
            .build()
            .map_err(|e| BrowserError::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        let response = page.execute(params).await.map_err(|e| {
            BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(BrowserError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(NAVIGATION_TIMEOUT, page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                log::warn!("Could not wait for load of {}: {}", url, e);
                Ok(())
            }
            Err(_) => Err(BrowserError::NavigationFailed(format!(
                "Timed out after {}s waiting for {} to load",
                NAVIGATION_TIMEOUT.as_secs(),
                url
            ))),
        }
    }

    pub async fn current_url(&self) -> Result<String> {
        let page = self.get_active_page().await?;

        page.url()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?
            .ok_or(BrowserError::NoPage)
    }

    /// Current page for direct chromiumoxide access
    pub async fn current_page(&self) -> Result<Page> {
        self.get_active_page().await
    }

    /// Check if the browser is still alive and responsive
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => match pages.first() {
                Some(page) => matches!(
                    tokio::time::timeout(Duration::from_secs(2), page.url()).await,
                    Ok(Ok(_))
                ),
                None => true,
            },
            Err(_) => false,
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?;
        Ok(())
    }

    /// Release every element handle located so far on the active page
    ///
    /// Handles already handed out stop working after this.
    pub async fn release_elements(&self) -> Result<()> {
        use chromiumoxide::cdp::js_protocol::runtime::ReleaseObjectGroupParams;

        let page = self.get_active_page().await?;
        page.execute(ReleaseObjectGroupParams::new(ELEMENT_OBJECT_GROUP))
            .await?;
        Ok(())
    }

    /// Chrome for Testing in the user cache dir, downloaded on first use
    async fn ensure_chrome_installed() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| BrowserError::Other("Cannot determine cache directory".to_string()))?
            .join("webdriver-marker")
            .join("chrome");

        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create cache dir: {}", e)))?;

        // The marker holds the executable path of the last download
        let marker_file = cache_dir.join(".downloaded");
        if let Ok(recorded) = tokio::fs::read_to_string(&marker_file).await {
            let recorded = PathBuf::from(recorded.trim());
            if recorded.is_file() {
                return Ok(recorded);
            }
            if let Some(executable) = find_chrome_in_cache(&cache_dir) {
                return Ok(executable);
            }
        }

        log::info!(
            "Downloading Chrome for Testing into {} (first run only)",
            cache_dir.display()
        );
        let options = BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .map_err(|e| BrowserError::Other(format!("Fetcher config failed: {}", e)))?;

        let info = BrowserFetcher::new(options)
            .fetch()
            .await
            .map_err(|e| BrowserError::Other(format!("Chrome download failed: {}", e)))?;

        tokio::fs::write(&marker_file, info.executable_path.to_string_lossy().as_bytes())
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to write marker: {}", e)))?;

        Ok(info.executable_path)
    }
}

fn find_chrome_in_cache(cache_dir: &Path) -> Option<PathBuf> {
    [
        "chrome",
        "chrome.exe",
        "Google Chrome.app/Contents/MacOS/Google Chrome",
        "chrome-linux/chrome",
        "chrome-mac/Chromium.app/Contents/MacOS/Chromium",
        "chrome-win/chrome.exe",
    ]
    .iter()
    .map(|relative| cache_dir.join(relative))
    .find(|path| path.exists())
}

#[async_trait]
impl Driver for ChromeDriver {
    type Element = ChromeElement;

    async fn locate(&self, selector: &Selector) -> Result<ChromeElement> {
        let locator = selector.resolve()?;
        let page = self.get_active_page().await?;

        let params: EvaluateParams = serde_json::from_value(json!({
            "expression": lookup_expression(&locator),
            "objectGroup": ELEMENT_OBJECT_GROUP,
            "returnByValue": false,
        }))
        .map_err(|e| BrowserError::Other(format!("Failed to build lookup: {}", e)))?;

        let response = page.execute(params).await?;

        if let Some(details) = &response.result.exception_details {
            // A lookup that throws (bad css, bad xpath) finds nothing
            log::warn!("Lookup for {} threw: {}", locator, exception_message(details));
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }

        let remote = &response.result.result;
        match (&remote.object_id, &remote.subtype) {
            (Some(object_id), Some(RemoteObjectSubtype::Node)) => Ok(ChromeElement {
                node: Arc::new(RemoteNode {
                    page,
                    object_id: object_id.clone(),
                }),
                description: remote.description.clone(),
            }),
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn run_in_page(
        &self,
        script: &PageScript,
        element: &ChromeElement,
        args: Vec<Value>,
    ) -> Result<Value> {
        let mut arguments = vec![json!({ "objectId": element.object_id() })];
        arguments.extend(args.into_iter().map(|value| json!({ "value": value })));

        let params: CallFunctionOnParams = serde_json::from_value(json!({
            "functionDeclaration": script.source,
            "objectId": element.object_id(),
            "arguments": arguments,
            "returnByValue": true,
        }))
        .map_err(|e| BrowserError::Other(format!("Failed to build call for {}: {}", script, e)))?;

        log::debug!("Running {} on {:?}", script, element.description);

        let response = element
            .page()
            .execute(params)
            .await
            .map_err(|e| BrowserError::ScriptFailed {
                script: script.name.to_string(),
                message: e.to_string(),
            })?;

        if let Some(details) = &response.result.exception_details {
            return Err(BrowserError::ScriptFailed {
                script: script.name.to_string(),
                message: exception_message(details),
            });
        }

        Ok(response.result.result.value.clone().unwrap_or(Value::Null))
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

fn normalize_url(url: &str) -> String {
    const SCHEMES: [&str; 5] = ["http://", "https://", "file://", "about:", "data:"];
    if SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn exception_message(details: &ExceptionDetails) -> String {
    details
        .exception
        .as_ref()
        .and_then(|e| e.description.clone())
        .unwrap_or_else(|| details.text.clone())
}

/// JavaScript expression that evaluates to the first matching node or `null`
pub(crate) fn lookup_expression(locator: &Locator) -> String {
    let quoted = Value::String(locator.value().to_string()).to_string();
    match locator {
        Locator::Css(_) => format!("document.querySelector({})", quoted),
        Locator::Id(_) => format!("document.getElementById({})", quoted),
        Locator::Name(_) => format!("document.getElementsByName({})[0] || null", quoted),
        Locator::ClassName(_) => {
            format!("document.getElementsByClassName({})[0] || null", quoted)
        }
        Locator::TagName(_) => format!("document.getElementsByTagName({})[0] || null", quoted),
        Locator::XPath(_) => format!(
            "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
            quoted
        ),
        Locator::LinkText(_) => format!(
            "Array.from(document.querySelectorAll('a')).find(function(a) {{ return a.textContent.trim() === {}; }}) || null",
            quoted
        ),
        Locator::PartialLinkText(_) => format!(
            "Array.from(document.querySelectorAll('a')).find(function(a) {{ return a.textContent.indexOf({}) !== -1; }}) || null",
            quoted
        ),
        Locator::Js(body) => format!("(function() {{ {} }})()", body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("http://localhost:1"), "http://localhost:1");
        assert_eq!(normalize_url("about:blank"), "about:blank");
    }

    #[test]
    fn test_lookup_expression_quotes_values() {
        let expr = lookup_expression(&Locator::Css(r#"input[name="q"]"#.to_string()));
        assert_eq!(expr, r#"document.querySelector("input[name=\"q\"]")"#);

        let expr = lookup_expression(&Locator::Name("btnG".to_string()));
        assert_eq!(expr, r#"document.getElementsByName("btnG")[0] || null"#);
    }

    #[test]
    fn test_find_chrome_in_cache() {
        let cache_dir = std::env::temp_dir().join(format!(
            "webdriver-marker-cache-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(cache_dir.join("chrome-linux")).unwrap();
        assert_eq!(find_chrome_in_cache(&cache_dir), None);

        let executable = cache_dir.join("chrome-linux/chrome");
        std::fs::write(&executable, "").unwrap();
        assert_eq!(find_chrome_in_cache(&cache_dir), Some(executable));

        std::fs::remove_dir_all(&cache_dir).unwrap();
    }

    #[test]
    fn test_lookup_expression_xpath_and_js() {
        let expr = lookup_expression(&Locator::XPath("//h1".to_string()));
        assert!(expr.starts_with(r#"document.evaluate("//h1", document"#));

        let expr = lookup_expression(&Locator::Js("return document.body;".to_string()));
        assert_eq!(expr, "(function() { return document.body; })()");
    }
}
