//! Core types for QuoteHarvest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{Error, Result};

/// Youngest applicant age the remote form accepts
pub const MIN_AGE: u32 = 0;

/// Oldest applicant age the remote form accepts
pub const MAX_AGE: u32 = 75;

/// Check that an age is inside the quotable range
pub fn check_age(age: u32) -> Result<u32> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(Error::AgeOutOfRange {
            age,
            min: MIN_AGE,
            max: MAX_AGE,
        })
    }
}

/// One of the seven figures shown on the result view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteField {
    InsuredSum,
    AnnualBasicPremium,
    AnnualBenefitsPremium,
    PolicyFee,
    Vat,
    AnnualNetPremium,
    FirstPayment,
}

impl QuoteField {
    /// All fields in result-view order
    pub const ALL: [QuoteField; 7] = [
        QuoteField::InsuredSum,
        QuoteField::AnnualBasicPremium,
        QuoteField::AnnualBenefitsPremium,
        QuoteField::PolicyFee,
        QuoteField::Vat,
        QuoteField::AnnualNetPremium,
        QuoteField::FirstPayment,
    ];

    /// Stable column name used in the database and in exported sheets
    pub fn column(&self) -> &'static str {
        match self {
            QuoteField::InsuredSum => "insured_sum",
            QuoteField::AnnualBasicPremium => "annual_basic_premium",
            QuoteField::AnnualBenefitsPremium => "annual_benefits_premium",
            QuoteField::PolicyFee => "policy_fee",
            QuoteField::Vat => "vat",
            QuoteField::AnnualNetPremium => "annual_net_premium",
            QuoteField::FirstPayment => "first_payment",
        }
    }
}

impl std::fmt::Display for QuoteField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for QuoteField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        QuoteField::ALL
            .iter()
            .copied()
            .find(|field| field.column() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// Raw figures read from the result view.
///
/// Values are kept exactly as displayed (currency symbols, separators).
/// An empty result marks a combination whose retries were exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteResult {
    fields: BTreeMap<QuoteField, String>,
}

impl QuoteResult {
    /// Result with no fields, persisted when a combination could not be quoted
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: QuoteField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn with(mut self, field: QuoteField, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: QuoteField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Value for a field, or an empty string when it was not captured
    pub fn value_or_blank(&self, field: QuoteField) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every field was captured with a non-blank value
    pub fn is_complete(&self) -> bool {
        QuoteField::ALL
            .iter()
            .all(|field| self.get(*field).map_or(false, |v| !v.trim().is_empty()))
    }
}

/// Durable output row for one quote request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Row id, assigned once stored
    pub id: Option<i64>,
    pub product_name: String,
    pub plan_name: String,
    pub age: u32,
    pub result: QuoteResult,
    pub captured_at: DateTime<Utc>,
}

impl PersistedRecord {
    /// Stamp a result with the current time
    pub fn new(
        product_name: impl Into<String>,
        plan_name: impl Into<String>,
        age: u32,
        result: QuoteResult,
    ) -> Self {
        Self {
            id: None,
            product_name: product_name.into(),
            plan_name: plan_name.into(),
            age,
            result,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}
