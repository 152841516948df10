//! Products, plans and the unit of work

use serde::{Deserialize, Serialize};

use crate::driver::Locator;
use crate::selectors::FormSelectors;

/// Insurance product offered on the baseline screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Entry clicked to open the product
    pub selector: Locator,
    pub plans: Vec<Plan>,
}

/// Plan within a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    /// Option value in the plan dropdown
    pub value: String,
    pub category: PlanCategory,
}

/// Which plan-specific fields apply while quoting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Standard,
    Flex,
}

impl std::fmt::Display for PlanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanCategory::Standard => write!(f, "standard"),
            PlanCategory::Flex => write!(f, "flex"),
        }
    }
}

/// Single interaction with a plan field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction {
    /// Open a dropdown and click one of its options
    Select { dropdown: Locator, option: Locator },
    /// Tick a checkbox
    Check(Locator),
}

/// One plan field to fill, and whether the form raises an interruption
/// after it that must be dismissed before continuing.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStep {
    pub label: &'static str,
    pub action: FieldAction,
    pub dismiss_after: bool,
}

impl FieldStep {
    fn new(label: &'static str, action: FieldAction, dismiss_after: bool) -> Self {
        Self {
            label,
            action,
            dismiss_after,
        }
    }
}

impl PlanCategory {
    /// Ordered field entries for this category.
    ///
    /// Repeated coverage locators are entered once: ticking the same
    /// checkbox twice would clear it again.
    pub fn field_steps(&self, selectors: &FormSelectors) -> Vec<FieldStep> {
        let mut steps = Vec::new();
        let coverages = match self {
            PlanCategory::Standard => {
                let fields = &selectors.standard;
                steps.push(FieldStep::new(
                    "state of residence",
                    FieldAction::Select {
                        dropdown: fields.residence.clone(),
                        option: fields.residence_option.clone(),
                    },
                    true,
                ));
                steps.push(FieldStep::new(
                    "deductible",
                    FieldAction::Select {
                        dropdown: fields.deductible.clone(),
                        option: fields.deductible_option.clone(),
                    },
                    false,
                ));
                steps.push(FieldStep::new(
                    "unique deductible",
                    FieldAction::Check(fields.unique_deductible.clone()),
                    true,
                ));
                &fields.coverages
            }
            PlanCategory::Flex => {
                let fields = &selectors.flex;
                steps.push(FieldStep::new(
                    "state of residence",
                    FieldAction::Select {
                        dropdown: fields.residence.clone(),
                        option: fields.residence_option.clone(),
                    },
                    true,
                ));
                &fields.coverages
            }
        };

        let mut seen: Vec<&Locator> = Vec::new();
        for coverage in coverages {
            if seen.contains(&coverage) {
                continue;
            }
            seen.push(coverage);
            steps.push(FieldStep::new(
                "coverage",
                FieldAction::Check(coverage.clone()),
                false,
            ));
        }

        steps
    }

    /// Coverage locators configured more than once for this category
    pub fn duplicate_coverages<'a>(&self, selectors: &'a FormSelectors) -> Vec<&'a Locator> {
        let coverages = match self {
            PlanCategory::Standard => &selectors.standard.coverages,
            PlanCategory::Flex => &selectors.flex.coverages,
        };
        coverages
            .iter()
            .enumerate()
            .filter(|(i, locator)| coverages[..*i].contains(locator))
            .map(|(_, locator)| locator)
            .collect()
    }
}

/// One (product, plan, age) unit of work
#[derive(Debug, Clone, Copy)]
pub struct QuoteRequest<'a> {
    pub product: &'a Product,
    pub plan: &'a Plan,
    pub age: u32,
}

impl<'a> QuoteRequest<'a> {
    pub fn new(product: &'a Product, plan: &'a Plan, age: u32) -> Self {
        Self { product, plan, age }
    }
}

impl std::fmt::Display for QuoteRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / age {}", self.product.name, self.plan.name, self.age)
    }
}
