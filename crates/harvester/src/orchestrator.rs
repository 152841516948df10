//! Harvest orchestrator
//!
//! Walks every (product, plan, age) combination in configuration order,
//! retries each one as a whole and persists its outcome before moving on.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use quoteharvest_common::{ExportReport, PersistedRecord, QuoteResult, QuoteStore};

use crate::config::{Credentials, HarvestConfig};
use crate::driver::FormDriver;
use crate::error::HarvestResult;
use crate::extraction::Extractor;
use crate::model::QuoteRequest;
use crate::navigation::{FormState, Navigator};
use crate::retry::RetryPolicy;
use crate::session::SessionController;

/// Outcome of a full harvest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Combinations attempted
    pub requests: usize,
    pub populated: usize,
    /// Combinations whose retries were exhausted
    pub empty: usize,
    /// Records that could not be stored
    pub persist_failures: usize,
    pub export: ExportReport,
    pub duration_ms: u64,
}

/// Runs the whole harvest against one driver and one store
pub struct Harvester<D: FormDriver, S: QuoteStore> {
    config: Arc<HarvestConfig>,
    session: Arc<SessionController<D>>,
    navigator: Navigator<D>,
    extractor: Extractor<D>,
    store: S,
}

impl<D: FormDriver, S: QuoteStore> Harvester<D, S> {
    pub fn new(driver: Arc<D>, config: HarvestConfig, credentials: Credentials, store: S) -> Self {
        let config = Arc::new(config);
        let session = Arc::new(SessionController::new(
            driver.clone(),
            config.clone(),
            credentials,
        ));
        let navigator = Navigator::new(driver.clone(), session.clone(), config.clone());
        let extractor = Extractor::new(driver, config.clone());

        Self {
            config,
            session,
            navigator,
            extractor,
            store,
        }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Attempt every combination once, then export.
    ///
    /// Only a failed login or a failed export escape; per-combination
    /// failures end up as empty rows.
    pub async fn run(&self) -> HarvestResult<HarvestReport> {
        self.config.validate()?;
        let started = Instant::now();

        info!(
            "Harvesting {} combination(s) across {} product(s), ages {}..={}",
            self.config.request_count(),
            self.config.products.len(),
            self.config.min_age,
            self.config.max_age
        );

        self.session.establish_session().await?;

        // The first request reuses this applicant instead of creating its own
        let mut positioned = match self.navigator.start_new_applicant(self.config.min_age).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Initial applicant could not be created: {}", e);
                false
            }
        };

        let mut requests = 0;
        let mut populated = 0;
        let mut empty = 0;
        let mut persist_failures = 0;

        for product in &self.config.products {
            info!("Processing product {}", product.name);

            for plan in &product.plans {
                info!("Processing plan {} ({})", plan.name, plan.category);

                for age in self.config.ages() {
                    let request = QuoteRequest::new(product, plan, age);
                    let result = self.quote(request, positioned).await;
                    positioned = false;

                    requests += 1;
                    if result.is_empty() {
                        empty += 1;
                    } else {
                        populated += 1;
                    }

                    if !self.persist(&request, result) {
                        persist_failures += 1;
                    }
                }
            }
        }

        let export = self.store.export(&self.config.export_dir)?;
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            "Harvest finished: {} request(s), {} populated, {} empty, exported to {}",
            requests,
            populated,
            empty,
            export.location.display()
        );

        Ok(HarvestReport {
            requests,
            populated,
            empty,
            persist_failures,
            export,
            duration_ms,
        })
    }

    /// Quote one combination under the request retry budget. Exhaustion
    /// yields an empty result.
    async fn quote(&self, request: QuoteRequest<'_>, positioned: bool) -> QuoteResult {
        let policy = RetryPolicy::request();
        let span = info_span!(
            "quote",
            product = %request.product.name,
            plan = %request.plan.name,
            age = request.age
        );

        let outcome = policy
            .run(
                "quote",
                |attempt| {
                    debug!(attempt, "Quoting {}", request);
                    self.walk(request, positioned && attempt == 1)
                },
                || async move {
                    if let Err(e) = self.navigator.recover().await {
                        warn!("Recovery failed: {}", e);
                    }
                },
            )
            .instrument(span.clone())
            .await;

        match outcome {
            Ok(result) => result,
            Err(e) => {
                span.in_scope(|| {
                    error!(
                        attempts = policy.max_attempts,
                        "Giving up, storing empty row: {}", e
                    )
                });
                QuoteResult::empty()
            }
        }
    }

    async fn walk(&self, request: QuoteRequest<'_>, positioned: bool) -> HarvestResult<QuoteResult> {
        if !positioned {
            self.navigator.start_new_applicant(request.age).await?;
        }
        self.navigator.select_product(request.product).await?;
        self.navigator
            .select_plan(&self.config.selectors.plan.dropdown, &request.plan.value)
            .await?;

        self.navigator.enter_plan_fields(request.plan.category).await?;
        self.navigator.switch_to_result().await?;

        let result = self.extractor.extract().await?;
        self.navigator.transition(FormState::Extracted);

        self.navigator.return_to_baseline().await?;
        Ok(result)
    }

    /// Store the outcome; a storage failure is logged and the run continues
    fn persist(&self, request: &QuoteRequest<'_>, result: QuoteResult) -> bool {
        let record = PersistedRecord::new(
            request.product.name.clone(),
            request.plan.name.clone(),
            request.age,
            result,
        );

        match self.store.append_record(&record) {
            Ok(id) => {
                debug!(record = id, "Stored {}", request);
                true
            }
            Err(e) => {
                error!(
                    product = %request.product.name,
                    plan = %request.plan.name,
                    age = request.age,
                    "Failed to store record: {}", e
                );
                false
            }
        }
    }
}
