//! Error types for the harvester

use quoteharvest_common::QuoteField;
use std::time::Duration;
use thiserror::Error;

use crate::driver::Locator;

/// Failure signals raised by a form driver.
///
/// Every driver operation reports one of these; the retry logic above the
/// driver only ever distinguishes between them, never between transports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("element not interactable: {0}")]
    NotInteractable(String),

    #[error("stale element reference: {0}")]
    Stale(String),

    #[error("driver session error: {0}")]
    Session(String),
}

impl DriverError {
    pub fn is_stale(&self) -> bool {
        matches!(self, DriverError::Stale(_))
    }

    pub fn is_not_interactable(&self) -> bool {
        matches!(self, DriverError::NotInteractable(_))
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Harvest error types
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Transient UI error during {step}: {source}")]
    Transient {
        step: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("Timed out after {timeout_ms} ms waiting for {locator} during {step}")]
    NavigationTimeout {
        step: &'static str,
        locator: String,
        timeout_ms: u64,
    },

    #[error("Login did not complete after {attempts} attempts")]
    LoginTimeout { attempts: u32 },

    #[error("Result field {field} ({locator}) never rendered")]
    ExtractionIncomplete { field: QuoteField, locator: String },

    #[error("Authenticated marker not present yet")]
    NotAuthenticated,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] quoteharvest_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Errors that must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarvestError::LoginTimeout { .. })
    }

    pub fn transient(step: &'static str, source: DriverError) -> Self {
        HarvestError::Transient { step, source }
    }

    /// Classify a failed wait: an element that never showed up is a
    /// navigation timeout, anything else stays transient.
    pub fn wait_failed(step: &'static str, locator: &Locator, timeout: Duration, source: DriverError) -> Self {
        match source {
            DriverError::NotFound(_) => HarvestError::NavigationTimeout {
                step,
                locator: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            },
            other => HarvestError::Transient { step, source: other },
        }
    }
}

pub type HarvestResult<T> = Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_login_timeout_is_fatal() {
        assert!(HarvestError::LoginTimeout { attempts: 30 }.is_fatal());
        assert!(!HarvestError::NavigationTimeout {
            step: "select product",
            locator: "id=60".into(),
            timeout_ms: 90_000,
        }
        .is_fatal());
        assert!(!HarvestError::transient("click", DriverError::Stale("x".into())).is_fatal());
    }

    #[test]
    fn test_wait_failed_classification() {
        let locator = Locator::id("btn_nvo");
        let timeout = Duration::from_secs(90);

        let err = HarvestError::wait_failed("select product", &locator, timeout, DriverError::NotFound("btn_nvo".into()));
        assert!(matches!(
            err,
            HarvestError::NavigationTimeout { timeout_ms: 90_000, ref locator, .. } if locator == "id=btn_nvo"
        ));

        let err = HarvestError::wait_failed("select product", &locator, timeout, DriverError::Stale("btn_nvo".into()));
        assert!(matches!(err, HarvestError::Transient { step: "select product", .. }));
    }

    #[test]
    fn test_transient_message_names_step() {
        let err = HarvestError::transient("calculate", DriverError::NotInteractable("id=btnCalcular".into()));
        assert_eq!(
            err.to_string(),
            "Transient UI error during calculate: element not interactable: id=btnCalcular"
        );
    }
}
