//! Result extraction

use std::sync::Arc;
use tracing::debug;

use quoteharvest_common::{QuoteField, QuoteResult};

use crate::config::HarvestConfig;
use crate::driver::FormDriver;
use crate::error::{DriverError, HarvestError, HarvestResult};

/// Reads the seven figures off the result view
pub struct Extractor<D: FormDriver> {
    driver: Arc<D>,
    config: Arc<HarvestConfig>,
}

impl<D: FormDriver> Extractor<D> {
    pub fn new(driver: Arc<D>, config: Arc<HarvestConfig>) -> Self {
        Self { driver, config }
    }

    /// Read every field's raw `value` attribute.
    ///
    /// All or nothing: a field that never renders fails the whole call with
    /// [`HarvestError::ExtractionIncomplete`]. Blank values are kept.
    pub async fn extract(&self) -> HarvestResult<QuoteResult> {
        let timeout = self.config.timeouts.long_wait();
        let mut result = QuoteResult::empty();

        for field in QuoteField::ALL {
            let locator = self.config.selectors.results.locator(field);
            let control = match self.driver.wait_present(locator, timeout).await {
                Ok(control) => control,
                Err(DriverError::NotFound(_)) => {
                    return Err(HarvestError::ExtractionIncomplete {
                        field,
                        locator: locator.to_string(),
                    })
                }
                Err(e) => return Err(HarvestError::transient("extract", e)),
            };

            let value = self
                .driver
                .read_attribute(&control, "value")
                .await
                .map_err(|e| HarvestError::transient("extract", e))?
                .unwrap_or_default();
            debug!("{} = {:?}", field.column(), value);
            result.insert(field, value);
        }

        Ok(result)
    }
}
