//! QuoteHarvest harvester
//!
//! Drives the remote quoting form through every configured (product, plan,
//! age) combination and hands each result to a [`QuoteStore`].
//!
//! [`QuoteStore`]: quoteharvest_common::QuoteStore

pub mod config;
pub mod driver;
pub mod error;
pub mod extraction;
pub mod model;
pub mod navigation;
pub mod orchestrator;
pub mod retry;
pub mod selectors;
pub mod session;
pub mod webdriver;

pub use config::{Credentials, HarvestConfig, Timeouts};
pub use driver::{FormDriver, Locator};
pub use error::{DriverError, DriverResult, HarvestError, HarvestResult};
pub use extraction::Extractor;
pub use model::{Plan, PlanCategory, Product, QuoteRequest};
pub use navigation::{FormState, Navigator};
pub use orchestrator::{HarvestReport, Harvester};
pub use retry::RetryPolicy;
pub use selectors::FormSelectors;
pub use session::SessionController;
pub use webdriver::WebDriverForm;
