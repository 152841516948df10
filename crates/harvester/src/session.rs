//! Session controller
//!
//! Gets the browser onto the authenticated baseline screen and clears the
//! modal interruptions the form throws up between steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, HarvestConfig};
use crate::driver::{FormDriver, Locator};
use crate::error::{DriverError, HarvestError, HarvestResult};
use crate::retry::RetryPolicy;

/// Owns login and interruption dismissal for one browser session
pub struct SessionController<D: FormDriver> {
    driver: Arc<D>,
    config: Arc<HarvestConfig>,
    credentials: Credentials,
    entry_opened: AtomicBool,
}

impl<D: FormDriver> SessionController<D> {
    pub fn new(driver: Arc<D>, config: Arc<HarvestConfig>, credentials: Credentials) -> Self {
        Self {
            driver,
            config,
            credentials,
            entry_opened: AtomicBool::new(false),
        }
    }

    /// Block until the authenticated baseline screen is reached.
    ///
    /// Fails with [`HarvestError::LoginTimeout`] once the login budget is
    /// spent; callers treat that as fatal.
    pub async fn establish_session(&self) -> HarvestResult<()> {
        let policy = RetryPolicy::login(&self.config.timeouts);

        match policy.retry("login", |attempt| self.login_attempt(attempt)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(
                    "Login did not complete within {} attempts: {}",
                    policy.max_attempts, e
                );
                Err(HarvestError::LoginTimeout {
                    attempts: policy.max_attempts,
                })
            }
        }
    }

    async fn login_attempt(&self, attempt: u32) -> HarvestResult<()> {
        if self.is_authenticated().await {
            debug!("Already authenticated (attempt {})", attempt);
            return Ok(());
        }

        self.open_entry_page().await?;
        self.wait_page_ready().await?;

        let login = &self.config.selectors.login;
        self.fill_if_empty(&login.username, &self.credentials.username).await?;
        self.fill_if_empty(&login.password, &self.credentials.password).await?;

        if let Some(submit) = &login.submit {
            let probe = self.config.timeouts.short_probe();
            let button = self
                .driver
                .wait_clickable(submit, probe)
                .await
                .map_err(|e| HarvestError::wait_failed("submit login", submit, probe, e))?;
            self.driver
                .click(&button)
                .await
                .map_err(|e| HarvestError::transient("submit login", e))?;
        }

        tokio::time::sleep(self.config.timeouts.settle()).await;

        if self.is_authenticated().await {
            info!("Session established (attempt {})", attempt);
            Ok(())
        } else {
            Err(HarvestError::NotAuthenticated)
        }
    }

    /// Navigate to the entry URL, once per controller
    async fn open_entry_page(&self) -> HarvestResult<()> {
        if self.entry_opened.load(Ordering::SeqCst) {
            return Ok(());
        }

        info!("Opening {}", self.config.entry_url);
        self.driver
            .open(&self.config.entry_url)
            .await
            .map_err(|e| HarvestError::transient("open entry page", e))?;
        self.entry_opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        let marker = &self.config.selectors.login.authenticated_marker;
        self.driver
            .wait_present(marker, self.config.timeouts.short_probe())
            .await
            .is_ok()
    }

    async fn wait_page_ready(&self) -> HarvestResult<()> {
        let timeouts = &self.config.timeouts;
        let deadline = Instant::now() + timeouts.long_wait();

        loop {
            if self
                .driver
                .page_ready()
                .await
                .map_err(|e| HarvestError::transient("page ready", e))?
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HarvestError::NavigationTimeout {
                    step: "page ready",
                    locator: "document.readyState".to_string(),
                    timeout_ms: timeouts.long_wait_ms,
                });
            }
            tokio::time::sleep(timeouts.poll_interval()).await;
        }
    }

    /// Type into a credential field unless it already holds a value
    async fn fill_if_empty(&self, locator: &Locator, value: &str) -> HarvestResult<()> {
        let probe = self.config.timeouts.short_probe();
        let field = self
            .driver
            .wait_present(locator, probe)
            .await
            .map_err(|e| HarvestError::wait_failed("fill credentials", locator, probe, e))?;

        let current = self
            .driver
            .read_attribute(&field, "value")
            .await
            .map_err(|e| HarvestError::transient("fill credentials", e))?;

        if current.as_deref().map_or(true, str::is_empty) {
            debug!("Filling {}", locator);
            self.driver
                .type_text(&field, value)
                .await
                .map_err(|e| HarvestError::transient("fill credentials", e))?;
        }
        Ok(())
    }

    /// Best-effort dismissal of a blocking interruption.
    ///
    /// Returns whether one was dismissed. Finding nothing is the common case
    /// and never an error.
    pub async fn dismiss_interruption(&self) -> bool {
        let policy = RetryPolicy::dismissal(&self.config.timeouts);

        for attempt in 1..=policy.max_attempts {
            match self.dismiss_once().await {
                Ok(()) => {
                    debug!("Interruption dismissed (attempt {})", attempt);
                    return true;
                }
                Err(DriverError::NotFound(_)) => {
                    debug!("No interruption present (attempt {}/{})", attempt, policy.max_attempts);
                }
                Err(e) => {
                    warn!("Interruption dismissal failed (attempt {}/{}): {}", attempt, policy.max_attempts, e);
                }
            }
            if attempt < policy.max_attempts && !policy.backoff.is_zero() {
                tokio::time::sleep(policy.backoff).await;
            }
        }
        false
    }

    async fn dismiss_once(&self) -> Result<(), DriverError> {
        let interruption = &self.config.selectors.interruption;
        let probe = self.config.timeouts.short_probe();

        for candidate in &interruption.dismiss_candidates {
            let control = match self.driver.wait_present(candidate, probe).await {
                Ok(control) => control,
                Err(DriverError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if !self.driver.is_displayed(&control).await? {
                continue;
            }

            self.driver.scroll_into_view(&control).await?;
            match self.driver.click(&control).await {
                Ok(()) => {}
                Err(e) if e.is_not_interactable() => {
                    debug!("Direct click on {} rejected, clicking programmatically", candidate);
                    self.driver.force_click(&control).await?;
                }
                Err(e) => return Err(e),
            }

            // A miss here means the overlay outlived the click, not that
            // there was nothing to dismiss
            return self
                .driver
                .wait_invisible(&interruption.overlay, probe)
                .await
                .map_err(|e| match e {
                    DriverError::NotFound(_) => DriverError::NotInteractable(format!(
                        "{} still shown after clicking {}",
                        interruption.overlay, candidate
                    )),
                    other => other,
                });
        }

        Err(DriverError::NotFound("no dismiss control visible".to_string()))
    }
}
