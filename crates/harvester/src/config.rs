//! Harvest configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use quoteharvest_common::{MAX_AGE, MIN_AGE};

use crate::driver::Locator;
use crate::error::{HarvestError, HarvestResult};
use crate::model::{Plan, PlanCategory, Product};
use crate::selectors::FormSelectors;

/// Harvest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Remote form URL
    pub entry_url: String,

    /// WebDriver endpoint (chromedriver, geckodriver, ...)
    pub webdriver_url: String,

    /// Run the browser without a window
    pub headless: bool,

    /// First age quoted for every plan
    pub min_age: u32,

    /// Last age quoted for every plan
    pub max_age: u32,

    /// Plan values the form pre-selects; selecting them is a no-op
    pub default_plan_values: Vec<String>,

    /// SQLite database path
    pub database_path: PathBuf,

    /// Directory receiving the exported workbook
    pub export_dir: PathBuf,

    /// Placeholder applicant
    pub applicant: ApplicantConfig,

    /// Wait budgets
    pub timeouts: Timeouts,

    /// Locator overrides
    pub selectors: FormSelectors,

    /// Products, in harvest order
    pub products: Vec<Product>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            entry_url: "https://www.solucionlinemonterrey.mx/CotizadorWebApp/Forms/Firma.aspx".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            min_age: MIN_AGE,
            max_age: MAX_AGE,
            default_plan_values: vec!["060001001213".to_string(), "060001001217".to_string()],
            database_path: quoteharvest_common::default_db_path(),
            export_dir: quoteharvest_common::default_export_dir(),
            applicant: ApplicantConfig::default(),
            timeouts: Timeouts::default(),
            selectors: FormSelectors::default(),
            products: default_products(),
        }
    }
}

fn default_products() -> Vec<Product> {
    let plan = |name: &str, value: &str, category| Plan {
        name: name.to_string(),
        value: value.to_string(),
        category,
    };

    vec![
        Product {
            name: "Alfa Medical".to_string(),
            selector: Locator::id("60"),
            plans: vec![
                plan("Pleno", "060001001213", PlanCategory::Standard),
                plan("Integro", "060001001214", PlanCategory::Standard),
            ],
        },
        Product {
            name: "Alfa Medical Flex".to_string(),
            selector: Locator::id("72"),
            plans: vec![
                plan("Flex A", "060001001217", PlanCategory::Flex),
                plan("Flex B", "060001001219", PlanCategory::Flex),
            ],
        },
    ]
}

/// Placeholder applicant typed into the form for every quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantConfig {
    pub first_name: String,
    pub last_name: String,
}

impl Default for ApplicantConfig {
    fn default() -> Self {
        Self {
            first_name: "Prospecto".to_string(),
            last_name: "Nuevo".to_string(),
        }
    }
}

/// Wait budgets, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Major page transitions
    pub long_wait_ms: u64,

    /// Probes for elements that are likely absent
    pub short_probe_ms: u64,

    /// Pause after actions the form reacts to asynchronously
    pub settle_ms: u64,

    pub login_backoff_ms: u64,
    pub dismiss_backoff_ms: u64,
    pub result_tab_pause_ms: u64,

    /// Driver polling granularity inside a wait
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            long_wait_ms: 90_000,
            short_probe_ms: 2_000,
            settle_ms: 1_000,
            login_backoff_ms: 1_000,
            dismiss_backoff_ms: 1_000,
            result_tab_pause_ms: 1_000,
            poll_interval_ms: 250,
        }
    }
}

impl Timeouts {
    /// No waiting at all (tests)
    pub fn zero() -> Self {
        Self {
            long_wait_ms: 0,
            short_probe_ms: 0,
            settle_ms: 0,
            login_backoff_ms: 0,
            dismiss_backoff_ms: 0,
            result_tab_pause_ms: 0,
            poll_interval_ms: 0,
        }
    }

    pub fn long_wait(&self) -> Duration {
        Duration::from_millis(self.long_wait_ms)
    }

    pub fn short_probe(&self) -> Duration {
        Duration::from_millis(self.short_probe_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn login_backoff(&self) -> Duration {
        Duration::from_millis(self.login_backoff_ms)
    }

    pub fn dismiss_backoff(&self) -> Duration {
        Duration::from_millis(self.dismiss_backoff_ms)
    }

    pub fn result_tab_pause(&self) -> Duration {
        Duration::from_millis(self.result_tab_pause_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Login credentials; never read from or written to the config file
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl HarvestConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations that cannot produce a gap-free harvest
    pub fn validate(&self) -> HarvestResult<()> {
        if self.min_age > self.max_age {
            return Err(HarvestError::Config(format!(
                "min_age {} is greater than max_age {}",
                self.min_age, self.max_age
            )));
        }
        for age in [self.min_age, self.max_age] {
            quoteharvest_common::check_age(age).map_err(|e| HarvestError::Config(e.to_string()))?;
        }

        if self.products.is_empty() {
            return Err(HarvestError::Config("no products configured".to_string()));
        }

        let mut plan_names = HashSet::new();
        for product in &self.products {
            if product.plans.is_empty() {
                return Err(HarvestError::Config(format!(
                    "product '{}' has no plans",
                    product.name
                )));
            }
            for plan in &product.plans {
                // Export sheets are keyed by plan name
                if !plan_names.insert(plan.name.as_str()) {
                    return Err(HarvestError::Config(format!(
                        "plan name '{}' is used more than once",
                        plan.name
                    )));
                }
            }
        }

        for category in [PlanCategory::Standard, PlanCategory::Flex] {
            for locator in category.duplicate_coverages(&self.selectors) {
                warn!(
                    "{} coverage {} is listed more than once; it will be ticked once",
                    category, locator
                );
            }
        }

        Ok(())
    }

    /// Ages quoted for every plan, ascending
    pub fn ages(&self) -> std::ops::RangeInclusive<u32> {
        self.min_age..=self.max_age
    }

    /// Whether the form already shows this plan value after product selection
    pub fn is_default_plan(&self, value: &str) -> bool {
        self.default_plan_values.iter().any(|v| v == value)
    }

    /// Number of (product, plan, age) combinations in one pass
    pub fn request_count(&self) -> usize {
        let plans: usize = self.products.iter().map(|p| p.plans.len()).sum();
        plans * self.ages().count()
    }
}
