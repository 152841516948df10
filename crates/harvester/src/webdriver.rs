//! WebDriver-backed form driver
//!
//! Talks to chromedriver (or any W3C WebDriver endpoint) through
//! `fantoccini`. Waits are implemented by polling the page.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator as By};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::driver::{class_selector, name_selector, FormDriver, Locator};
use crate::error::{DriverError, DriverResult};

/// Live browser session
pub struct WebDriverForm {
    client: Client,
    poll_interval: Duration,
}

impl WebDriverForm {
    /// Start a Chrome session on the WebDriver endpoint
    pub async fn connect(webdriver_url: &str, headless: bool, poll_interval: Duration) -> DriverResult<Self> {
        info!("Connecting to WebDriver at {}", webdriver_url);

        let mut args = vec!["--no-sandbox".to_string(), "--window-size=1366,900".to_string()];
        if headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
            args.push("--disable-dev-shm-usage".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| DriverError::Session(format!("cannot start session at {}: {}", webdriver_url, e)))?;

        Ok(Self {
            client,
            poll_interval,
        })
    }

    /// End the browser session
    pub async fn close(self) -> DriverResult<()> {
        self.client
            .close()
            .await
            .map_err(|e| DriverError::Session(e.to_string()))
    }

    async fn find(&self, locator: &Locator) -> Result<Element, CmdError> {
        match locator {
            Locator::Id(id) => self.client.find(By::Id(id)).await,
            Locator::Name(name) => self.client.find(By::Css(&name_selector(name))).await,
            Locator::XPath(xpath) => self.client.find(By::XPath(xpath)).await,
            Locator::LinkText(text) => self.client.find(By::LinkText(text)).await,
            Locator::ClassName(classes) => self.client.find(By::Css(&class_selector(classes))).await,
            Locator::Css(css) => self.client.find(By::Css(css)).await,
        }
    }

    /// Poll `probe` until it yields a value or `timeout` runs out.
    ///
    /// Misses and stale references keep the poll going; any other failure
    /// ends it.
    async fn poll<T, F, Fut>(&self, locator: &Locator, timeout: Duration, mut probe: F) -> DriverResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DriverResult<Option<T>>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            match probe().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) | Err(DriverError::NotFound(_)) | Err(DriverError::Stale(_)) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                debug!("Gave up on {} after {:?}", locator, timeout);
                return Err(DriverError::NotFound(locator.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn script_on(&self, script: &str, element: &Element) -> DriverResult<()> {
        let arg = serde_json::to_value(element).map_err(|e| DriverError::Session(e.to_string()))?;
        self.client
            .execute(script, vec![arg])
            .await
            .map(|_| ())
            .map_err(|e| classify("script", e))
    }
}

/// Map a WebDriver failure onto the driver signal set
fn classify(what: &str, err: CmdError) -> DriverError {
    if err.is_miss() {
        return DriverError::NotFound(what.to_string());
    }

    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("stale element") {
        DriverError::Stale(format!("{}: {}", what, message))
    } else if lower.contains("not interactable")
        || lower.contains("click intercepted")
        || lower.contains("not clickable")
    {
        DriverError::NotInteractable(format!("{}: {}", what, message))
    } else if lower.contains("no such element") {
        DriverError::NotFound(what.to_string())
    } else {
        DriverError::Session(format!("{}: {}", what, message))
    }
}

#[async_trait]
impl FormDriver for WebDriverForm {
    type Element = Element;

    async fn open(&self, url: &str) -> DriverResult<()> {
        self.client.goto(url).await.map_err(|e| classify(url, e))
    }

    async fn page_ready(&self) -> DriverResult<bool> {
        let state = self
            .client
            .execute("return document.readyState", vec![])
            .await
            .map_err(|e| classify("document.readyState", e))?;
        Ok(state.as_str() == Some("complete"))
    }

    async fn wait_present(&self, locator: &Locator, timeout: Duration) -> DriverResult<Element> {
        self.poll(locator, timeout, || async move {
            match self.find(locator).await {
                Ok(element) => Ok(Some(element)),
                Err(e) => Err(classify(&locator.to_string(), e)),
            }
        })
        .await
    }

    async fn wait_clickable(&self, locator: &Locator, timeout: Duration) -> DriverResult<Element> {
        self.poll(locator, timeout, || async move {
            let what = locator.to_string();
            let element = self.find(locator).await.map_err(|e| classify(&what, e))?;
            let displayed = element.is_displayed().await.map_err(|e| classify(&what, e))?;
            let enabled = element.is_enabled().await.map_err(|e| classify(&what, e))?;
            Ok((displayed && enabled).then_some(element))
        })
        .await
    }

    async fn wait_invisible(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
        self.poll(locator, timeout, || async move {
            let what = locator.to_string();
            let element = match self.find(locator).await.map_err(|e| classify(&what, e)) {
                Ok(element) => element,
                Err(DriverError::NotFound(_)) => return Ok(Some(())),
                Err(e) => return Err(e),
            };
            match element.is_displayed().await.map_err(|e| classify(&what, e)) {
                Ok(true) => Ok(None),
                Ok(false) | Err(DriverError::Stale(_)) => Ok(Some(())),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        element.click().await.map_err(|e| classify("click", e))
    }

    async fn force_click(&self, element: &Element) -> DriverResult<()> {
        self.script_on("arguments[0].click();", element).await
    }

    async fn scroll_into_view(&self, element: &Element) -> DriverResult<()> {
        self.script_on("arguments[0].scrollIntoView({block: 'center'});", element)
            .await
    }

    async fn type_text(&self, element: &Element, text: &str) -> DriverResult<()> {
        element.send_keys(text).await.map_err(|e| classify("type", e))
    }

    async fn read_attribute(&self, element: &Element, name: &str) -> DriverResult<Option<String>> {
        element.attr(name).await.map_err(|e| classify(name, e))
    }

    async fn is_displayed(&self, element: &Element) -> DriverResult<bool> {
        element.is_displayed().await.map_err(|e| classify("is_displayed", e))
    }

    async fn reload_page(&self) -> DriverResult<()> {
        self.client.refresh().await.map_err(|e| classify("reload", e))
    }
}
