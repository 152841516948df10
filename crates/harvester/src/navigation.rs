//! Navigation state machine
//!
//! Moves the form from the baseline screen through product and plan
//! selection, applicant entry, calculation and the result view, then back.
//! Every operation waits for its target control with a bounded timeout and
//! re-resolves elements instead of holding them across steps.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::HarvestConfig;
use crate::driver::{FormDriver, Locator};
use crate::error::{HarvestError, HarvestResult};
use crate::model::{FieldAction, PlanCategory, Product};
use crate::retry::RetryPolicy;
use crate::session::SessionController;

/// Where the form is believed to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Unknown,
    Baseline,
    ApplicantStarted,
    ProductSelected,
    PlanSelected,
    FieldsEntered,
    Calculated,
    ResultVisible,
    Extracted,
    BackAtBaseline,
}

impl std::fmt::Display for FormState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FormState::Unknown => "unknown",
            FormState::Baseline => "baseline",
            FormState::ApplicantStarted => "applicant-started",
            FormState::ProductSelected => "product-selected",
            FormState::PlanSelected => "plan-selected",
            FormState::FieldsEntered => "fields-entered",
            FormState::Calculated => "calculated",
            FormState::ResultVisible => "result-visible",
            FormState::Extracted => "extracted",
            FormState::BackAtBaseline => "back-at-baseline",
        };
        write!(f, "{}", name)
    }
}

/// Drives the form one screen at a time
pub struct Navigator<D: FormDriver> {
    driver: Arc<D>,
    session: Arc<SessionController<D>>,
    config: Arc<HarvestConfig>,
    state: Mutex<FormState>,
}

impl<D: FormDriver> Navigator<D> {
    pub fn new(driver: Arc<D>, session: Arc<SessionController<D>>, config: Arc<HarvestConfig>) -> Self {
        Self {
            driver,
            session,
            config,
            state: Mutex::new(FormState::Unknown),
        }
    }

    pub fn state(&self) -> FormState {
        *self.state.lock()
    }

    /// Record a state change. Unexpected origins are logged, not rejected:
    /// the form can be reset underneath us.
    pub fn transition(&self, to: FormState) {
        let mut state = self.state.lock();
        debug!("Form state {} -> {}", *state, to);
        *state = to;
    }

    fn expect_state(&self, operation: &str, allowed: &[FormState]) {
        let current = self.state();
        if !allowed.contains(&current) {
            debug!("{} called from unexpected state {}", operation, current);
        }
    }

    fn long_wait(&self) -> Duration {
        self.config.timeouts.long_wait()
    }

    async fn present(&self, step: &'static str, locator: &Locator) -> HarvestResult<D::Element> {
        let timeout = self.long_wait();
        self.driver
            .wait_present(locator, timeout)
            .await
            .map_err(|e| HarvestError::wait_failed(step, locator, timeout, e))
    }

    async fn clickable(&self, step: &'static str, locator: &Locator) -> HarvestResult<D::Element> {
        let timeout = self.long_wait();
        self.driver
            .wait_clickable(locator, timeout)
            .await
            .map_err(|e| HarvestError::wait_failed(step, locator, timeout, e))
    }

    async fn click(&self, step: &'static str, element: &D::Element) -> HarvestResult<()> {
        self.driver
            .click(element)
            .await
            .map_err(|e| HarvestError::transient(step, e))
    }

    async fn click_when_clickable(&self, step: &'static str, locator: &Locator) -> HarvestResult<()> {
        let element = self.clickable(step, locator).await?;
        self.click(step, &element).await
    }

    async fn click_when_present(&self, step: &'static str, locator: &Locator) -> HarvestResult<()> {
        let element = self.present(step, locator).await?;
        self.click(step, &element).await
    }

    async fn type_into(&self, step: &'static str, locator: &Locator, text: &str) -> HarvestResult<()> {
        let element = self.present(step, locator).await?;
        self.driver
            .type_text(&element, text)
            .await
            .map_err(|e| HarvestError::transient(step, e))
    }

    async fn wait_overlay_gone(&self, step: &'static str) -> HarvestResult<()> {
        let overlay = &self.config.selectors.interruption.overlay;
        let timeout = self.long_wait();
        self.driver
            .wait_invisible(overlay, timeout)
            .await
            .map_err(|e| HarvestError::wait_failed(step, overlay, timeout, e))
    }

    /// Create the placeholder applicant at `age` and start quoting by
    /// product. A stale age field is re-resolved once.
    pub async fn start_new_applicant(&self, age: u32) -> HarvestResult<()> {
        self.expect_state(
            "start_new_applicant",
            &[FormState::Unknown, FormState::Baseline, FormState::BackAtBaseline],
        );
        let applicant = &self.config.selectors.applicant;
        let placeholder = &self.config.applicant;

        self.click_when_clickable("new applicant", &applicant.new_applicant).await?;
        self.type_into("applicant name", &applicant.first_name, &placeholder.first_name)
            .await?;
        self.type_into("applicant last name", &applicant.last_name, &placeholder.last_name)
            .await?;
        self.click_when_clickable("applicant sex", &applicant.sex_option).await?;

        let age_text = age.to_string();
        let field = self.present("enter age", &applicant.age).await?;
        match self.driver.type_text(&field, &age_text).await {
            Ok(()) => {}
            Err(e) if e.is_stale() => {
                debug!("Age field went stale, re-resolving");
                self.type_into("enter age", &applicant.age, &age_text).await?;
            }
            Err(e) => return Err(HarvestError::transient("enter age", e)),
        }

        self.click_when_clickable("quote by product", &applicant.quote_by_product)
            .await?;

        debug!("Applicant started at age {}", age);
        self.transition(FormState::ApplicantStarted);
        Ok(())
    }

    /// Open a product and confirm its plan-type trigger is reachable
    pub async fn select_product(&self, product: &Product) -> HarvestResult<()> {
        self.expect_state("select_product", &[FormState::ApplicantStarted]);
        let plan = &self.config.selectors.plan;

        self.click_when_clickable("select product", &product.selector).await?;
        self.session.dismiss_interruption().await;

        self.click_when_clickable("plan type", &plan.plan_type_trigger).await?;
        self.session.dismiss_interruption().await;

        debug!("Product {} selected", product.name);
        self.transition(FormState::ProductSelected);
        Ok(())
    }

    /// Pick the plan whose option carries `value`. The form pre-selects the
    /// default plans, so those are left alone.
    pub async fn select_plan(&self, dropdown: &Locator, value: &str) -> HarvestResult<()> {
        self.expect_state("select_plan", &[FormState::ProductSelected]);

        if self.config.is_default_plan(value) {
            debug!("Plan {} is pre-selected", value);
        } else {
            self.click_when_present("open plan dropdown", dropdown).await?;
            self.click_when_present("select plan", &Locator::option_with_value(value))
                .await?;
            self.session.dismiss_interruption().await;
            self.wait_overlay_gone("select plan").await?;
            debug!("Plan {} selected", value);
        }

        self.transition(FormState::PlanSelected);
        Ok(())
    }

    /// Fill the category's plan fields, then trigger the calculation
    pub async fn enter_plan_fields(&self, category: PlanCategory) -> HarvestResult<()> {
        self.expect_state("enter_plan_fields", &[FormState::PlanSelected]);

        for step in category.field_steps(&self.config.selectors) {
            match &step.action {
                FieldAction::Select { dropdown, option } => {
                    self.click_when_present(step.label, dropdown).await?;
                    self.click_when_present(step.label, option).await?;
                }
                FieldAction::Check(checkbox) => {
                    self.click_when_clickable(step.label, checkbox).await?;
                }
            }
            debug!("Set {}", step.label);

            if step.dismiss_after {
                self.session.dismiss_interruption().await;
                self.wait_overlay_gone(step.label).await?;
            }
        }
        self.transition(FormState::FieldsEntered);

        self.click_when_clickable("calculate", &self.config.selectors.navigation.calculate)
            .await?;
        self.transition(FormState::Calculated);
        Ok(())
    }

    /// Activate the result view, clearing any interruption first
    pub async fn switch_to_result(&self) -> HarvestResult<()> {
        self.expect_state("switch_to_result", &[FormState::Calculated]);
        let policy = RetryPolicy::result_tab(&self.config.timeouts);
        let tab = &self.config.selectors.navigation.result_tab;

        policy
            .retry("switch to result", |_| async move {
                self.session.dismiss_interruption().await;
                self.click_when_clickable("switch to result", tab).await
            })
            .await?;

        self.transition(FormState::ResultVisible);
        Ok(())
    }

    /// Click the two back controls leading to the baseline screen
    pub async fn return_to_baseline(&self) -> HarvestResult<()> {
        let navigation = &self.config.selectors.navigation;
        self.click_when_clickable("back to applicant", &navigation.back_to_applicant)
            .await?;
        self.click_when_clickable("back to baseline", &navigation.back_to_baseline)
            .await?;
        self.transition(FormState::BackAtBaseline);
        Ok(())
    }

    /// Reload the page and wait for the minimal baseline marker
    pub async fn recover(&self) -> HarvestResult<()> {
        info!("Reloading form");
        self.transition(FormState::Unknown);
        self.driver
            .reload_page()
            .await
            .map_err(|e| HarvestError::transient("reload", e))?;
        self.present("recover", &self.config.selectors.applicant.age).await?;
        self.transition(FormState::Baseline);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(FormState::ResultVisible.to_string(), "result-visible");
        assert_eq!(FormState::BackAtBaseline.to_string(), "back-at-baseline");
    }
}
