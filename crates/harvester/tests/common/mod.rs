//! Scriptable in-memory form used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use quoteharvest_common::{Database, ExportReport, PersistedRecord, QuoteStore};
use quoteharvest_harvester::{
    DriverError, DriverResult, FormDriver, FormSelectors, HarvestConfig, Locator, Plan,
    PlanCategory, Product, Timeouts,
};

/// Figure shown in every result field
pub const FIGURE: &str = "$1,000.00";

/// One call made against the stub
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Open(String),
    WaitPresent(Locator),
    WaitClickable(Locator),
    WaitInvisible(Locator),
    Click(Locator),
    ForceClick(Locator),
    Scroll(Locator),
    Type(Locator, String),
    Read(Locator),
    Reload,
}

#[derive(Debug, Clone)]
pub struct StubElement {
    locator: Locator,
    generation: u64,
}

struct StubState {
    log: Vec<Interaction>,
    values: HashMap<Locator, String>,
    authenticated: bool,
    generation: u64,
    current_age: Option<u32>,
    interruption_pending: bool,
    invisible_timeouts: Vec<Duration>,
}

/// In-memory stand-in for the remote form.
///
/// Logging in succeeds as soon as both credential fields hold a value
/// (unless `auto_login` is off). While the applicant's typed age is in
/// `fail_ages`, every control outside applicant creation is missing; while
/// it is in `unclickable_ages`, those controls resolve but refuse clicks.
pub struct StubForm {
    state: Mutex<StubState>,
    marker: Locator,
    username: Locator,
    password: Locator,
    age: Locator,
    applicant: HashSet<Locator>,
    candidates: HashSet<Locator>,
    overlay: Locator,
    results: HashSet<Locator>,
    result_tab: Locator,
    result_tab_misses: Mutex<u32>,
    interrupt_after: Mutex<Option<Locator>>,
    sticky_interruption: bool,
    auto_login: bool,
    stale_age_once: Mutex<bool>,
    reject_direct_click: bool,
    fail_ages: HashSet<u32>,
    unclickable_ages: HashSet<u32>,
}

impl StubForm {
    pub fn new(selectors: &FormSelectors) -> Self {
        let applicant = &selectors.applicant;
        Self {
            state: Mutex::new(StubState {
                log: Vec::new(),
                values: HashMap::new(),
                authenticated: false,
                generation: 0,
                current_age: None,
                interruption_pending: false,
                invisible_timeouts: Vec::new(),
            }),
            marker: selectors.login.authenticated_marker.clone(),
            username: selectors.login.username.clone(),
            password: selectors.login.password.clone(),
            age: applicant.age.clone(),
            applicant: [
                &applicant.new_applicant,
                &applicant.first_name,
                &applicant.last_name,
                &applicant.sex_option,
                &applicant.age,
                &applicant.quote_by_product,
            ]
            .into_iter()
            .cloned()
            .collect(),
            candidates: selectors.interruption.dismiss_candidates.iter().cloned().collect(),
            overlay: selectors.interruption.overlay.clone(),
            results: quoteharvest_common::QuoteField::ALL
                .iter()
                .map(|f| selectors.results.locator(*f).clone())
                .collect(),
            result_tab: selectors.navigation.result_tab.clone(),
            result_tab_misses: Mutex::new(0),
            interrupt_after: Mutex::new(None),
            sticky_interruption: false,
            auto_login: true,
            stale_age_once: Mutex::new(false),
            reject_direct_click: false,
            fail_ages: HashSet::new(),
            unclickable_ages: HashSet::new(),
        }
    }

    pub fn without_auto_login(mut self) -> Self {
        self.auto_login = false;
        self
    }

    pub fn with_stale_age_once(self) -> Self {
        *self.stale_age_once.lock() = true;
        self
    }

    pub fn rejecting_direct_clicks(mut self) -> Self {
        self.reject_direct_click = true;
        self
    }

    pub fn failing_at_ages(mut self, ages: &[u32]) -> Self {
        self.fail_ages = ages.iter().copied().collect();
        self
    }

    pub fn unclickable_at_ages(mut self, ages: &[u32]) -> Self {
        self.unclickable_ages = ages.iter().copied().collect();
        self
    }

    /// The result tab is missing for the next `misses` lookups
    pub fn missing_result_tab(self, misses: u32) -> Self {
        *self.result_tab_misses.lock() = misses;
        self
    }

    /// Raise an interruption the first time `locator` is clicked
    pub fn interrupting_after(self, locator: Locator) -> Self {
        *self.interrupt_after.lock() = Some(locator);
        self
    }

    /// Clicking a dismiss control leaves the overlay up
    pub fn with_sticky_interruption(mut self) -> Self {
        self.sticky_interruption = true;
        self
    }

    pub fn logged_in(self) -> Self {
        self.state.lock().authenticated = true;
        self
    }

    pub fn raise_interruption(&self) {
        self.state.lock().interruption_pending = true;
    }

    pub fn interruption_pending(&self) -> bool {
        self.state.lock().interruption_pending
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().log.clone()
    }

    pub fn count(&self, wanted: &Interaction) -> usize {
        self.state.lock().log.iter().filter(|i| *i == wanted).count()
    }

    pub fn clicks(&self) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|i| matches!(i, Interaction::Click(_) | Interaction::ForceClick(_)))
            .count()
    }

    pub fn typed_into(&self, locator: &Locator) -> Vec<String> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|i| match i {
                Interaction::Type(l, text) if l == locator => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn invisible_timeouts(&self) -> Vec<Duration> {
        self.state.lock().invisible_timeouts.clone()
    }

    pub fn reloads(&self) -> usize {
        self.count(&Interaction::Reload)
    }

    fn record(&self, interaction: Interaction) {
        self.state.lock().log.push(interaction);
    }

    /// Whether the form currently refuses this control
    fn failing(&self, locator: &Locator) -> bool {
        if self.applicant.contains(locator) {
            return false;
        }
        let state = self.state.lock();
        state
            .current_age
            .map_or(false, |age| self.fail_ages.contains(&age))
    }

    fn unclickable(&self, locator: &Locator) -> bool {
        if self.applicant.contains(locator) || self.candidates.contains(locator) {
            return false;
        }
        let state = self.state.lock();
        state
            .current_age
            .map_or(false, |age| self.unclickable_ages.contains(&age))
    }

    /// Clicking a dismiss control clears the interruption unless it is sticky
    fn dismiss(&self, locator: &Locator) {
        if self.candidates.contains(locator) && !self.sticky_interruption {
            self.state.lock().interruption_pending = false;
        }
    }

    fn resolve(&self, locator: &Locator) -> DriverResult<StubElement> {
        let state = self.state.lock();
        if *locator == self.marker && !state.authenticated {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        if self.candidates.contains(locator) && !state.interruption_pending {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        drop(state);

        if self.failing(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }

        Ok(StubElement {
            locator: locator.clone(),
            generation: self.state.lock().generation,
        })
    }

    fn check_fresh(&self, element: &StubElement) -> DriverResult<()> {
        if element.generation != self.state.lock().generation {
            return Err(DriverError::Stale(element.locator.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FormDriver for StubForm {
    type Element = StubElement;

    async fn open(&self, url: &str) -> DriverResult<()> {
        self.record(Interaction::Open(url.to_string()));
        Ok(())
    }

    async fn page_ready(&self) -> DriverResult<bool> {
        Ok(true)
    }

    async fn wait_present(&self, locator: &Locator, _timeout: Duration) -> DriverResult<StubElement> {
        self.record(Interaction::WaitPresent(locator.clone()));
        self.resolve(locator)
    }

    async fn wait_clickable(&self, locator: &Locator, _timeout: Duration) -> DriverResult<StubElement> {
        self.record(Interaction::WaitClickable(locator.clone()));
        if *locator == self.result_tab {
            let mut misses = self.result_tab_misses.lock();
            if *misses > 0 {
                *misses -= 1;
                return Err(DriverError::NotFound(locator.to_string()));
            }
        }
        self.resolve(locator)
    }

    async fn wait_invisible(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
        self.record(Interaction::WaitInvisible(locator.clone()));
        self.state.lock().invisible_timeouts.push(timeout);
        if self.failing(locator) {
            return Err(DriverError::NotFound(locator.to_string()));
        }
        if *locator == self.overlay && self.state.lock().interruption_pending {
            return Err(DriverError::NotFound(format!("{} still visible", locator)));
        }
        Ok(())
    }

    async fn click(&self, element: &StubElement) -> DriverResult<()> {
        self.record(Interaction::Click(element.locator.clone()));
        self.check_fresh(element)?;
        if self.failing(&element.locator) || self.unclickable(&element.locator) {
            return Err(DriverError::NotInteractable(element.locator.to_string()));
        }
        if self.candidates.contains(&element.locator) && self.reject_direct_click {
            return Err(DriverError::NotInteractable(element.locator.to_string()));
        }
        self.dismiss(&element.locator);

        let mut trigger = self.interrupt_after.lock();
        if trigger.as_ref() == Some(&element.locator) {
            *trigger = None;
            self.state.lock().interruption_pending = true;
        }
        Ok(())
    }

    async fn force_click(&self, element: &StubElement) -> DriverResult<()> {
        self.record(Interaction::ForceClick(element.locator.clone()));
        self.check_fresh(element)?;
        self.dismiss(&element.locator);
        Ok(())
    }

    async fn scroll_into_view(&self, element: &StubElement) -> DriverResult<()> {
        self.record(Interaction::Scroll(element.locator.clone()));
        self.check_fresh(element)
    }

    async fn type_text(&self, element: &StubElement, text: &str) -> DriverResult<()> {
        self.record(Interaction::Type(element.locator.clone(), text.to_string()));
        self.check_fresh(element)?;

        if element.locator == self.age {
            let mut stale = self.stale_age_once.lock();
            if *stale {
                *stale = false;
                return Err(DriverError::Stale(element.locator.to_string()));
            }
        }

        let mut state = self.state.lock();
        state
            .values
            .entry(element.locator.clone())
            .or_default()
            .push_str(text);

        if element.locator == self.age {
            state.current_age = text.parse().ok();
        }
        if self.auto_login
            && state.values.contains_key(&self.username)
            && state.values.contains_key(&self.password)
        {
            state.authenticated = true;
        }
        Ok(())
    }

    async fn read_attribute(&self, element: &StubElement, name: &str) -> DriverResult<Option<String>> {
        self.record(Interaction::Read(element.locator.clone()));
        self.check_fresh(element)?;
        if name != "value" {
            return Ok(None);
        }
        if self.results.contains(&element.locator) {
            return Ok(Some(FIGURE.to_string()));
        }
        Ok(Some(
            self.state
                .lock()
                .values
                .get(&element.locator)
                .cloned()
                .unwrap_or_default(),
        ))
    }

    async fn is_displayed(&self, element: &StubElement) -> DriverResult<bool> {
        self.check_fresh(element)?;
        Ok(true)
    }

    async fn reload_page(&self) -> DriverResult<()> {
        self.record(Interaction::Reload);
        let mut state = self.state.lock();
        state.generation += 1;
        state.interruption_pending = false;
        Ok(())
    }
}

/// Store whose appends or export can be made to fail
pub struct FlakyStore {
    pub inner: Database,
    pub fail_appends: bool,
    pub fail_export: bool,
}

impl FlakyStore {
    pub fn new(fail_appends: bool, fail_export: bool) -> Self {
        Self {
            inner: Database::open_memory().unwrap(),
            fail_appends,
            fail_export,
        }
    }
}

impl QuoteStore for FlakyStore {
    fn append_record(&self, record: &PersistedRecord) -> quoteharvest_common::Result<i64> {
        if self.fail_appends {
            return Err(quoteharvest_common::Error::Export("disk full".to_string()));
        }
        self.inner.append_record(record)
    }

    fn export(&self, dir: &Path) -> quoteharvest_common::Result<ExportReport> {
        if self.fail_export {
            return Err(quoteharvest_common::Error::Export("read-only directory".to_string()));
        }
        self.inner.export(dir)
    }
}

/// One product with one standard plan, ages `min..=max`, no waiting
pub fn single_plan_config(min_age: u32, max_age: u32, export_dir: &Path) -> HarvestConfig {
    HarvestConfig {
        min_age,
        max_age,
        timeouts: Timeouts::zero(),
        database_path: export_dir.join("quotes.db"),
        export_dir: export_dir.to_path_buf(),
        products: vec![Product {
            name: "Alfa Medical".to_string(),
            selector: Locator::id("60"),
            plans: vec![Plan {
                name: "Pleno".to_string(),
                value: "060001001213".to_string(),
                category: PlanCategory::Standard,
            }],
        }],
        ..HarvestConfig::default()
    }
}
