//! Locators for every control the harvester touches on the remote form
//!
//! Defaults match the live quoting form; any of them can be overridden from
//! the `[selectors]` table of the configuration file.

use quoteharvest_common::QuoteField;
use serde::{Deserialize, Serialize};

use crate::driver::Locator;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSelectors {
    pub login: LoginSelectors,
    pub applicant: ApplicantSelectors,
    pub interruption: InterruptionSelectors,
    pub plan: PlanSelectors,
    pub standard: StandardFieldSelectors,
    pub flex: FlexFieldSelectors,
    pub navigation: NavigationSelectors,
    pub results: ResultSelectors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub username: Locator,
    pub password: Locator,
    /// Clicked after credentials are filled; when unset an external actor
    /// completes the login (challenge, human).
    pub submit: Option<Locator>,
    /// Present only once authenticated
    pub authenticated_marker: Locator,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: Locator::id("Login1_UserName"),
            password: Locator::id("Login1_Password"),
            submit: None,
            authenticated_marker: Locator::link_text("Nuevo Prospecto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantSelectors {
    pub new_applicant: Locator,
    pub first_name: Locator,
    pub last_name: Locator,
    pub sex_option: Locator,
    /// Also the minimal marker waited for after a reload
    pub age: Locator,
    pub quote_by_product: Locator,
}

impl Default for ApplicantSelectors {
    fn default() -> Self {
        Self {
            new_applicant: Locator::link_text("Nuevo Prospecto"),
            first_name: Locator::name("Nombre"),
            last_name: Locator::name("Paterno"),
            sex_option: Locator::xpath(r#"//input[@name="Sexo" and @value="1"]"#),
            age: Locator::name("Edad"),
            quote_by_product: Locator::id("cmdCotizarProducto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptionSelectors {
    /// Dismiss controls, most specific first
    pub dismiss_candidates: Vec<Locator>,
    /// Blocking overlay that must be gone before the form accepts input
    pub overlay: Locator,
}

impl Default for InterruptionSelectors {
    fn default() -> Self {
        Self {
            dismiss_candidates: vec![
                Locator::css("#modal .btn-success"),
                Locator::class_name("btn-success"),
                Locator::xpath("//button[normalize-space()='Aceptar']"),
            ],
            overlay: Locator::id("modal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSelectors {
    /// Plan-type trigger shown once a product is open
    pub plan_type_trigger: Locator,
    pub dropdown: Locator,
}

impl Default for PlanSelectors {
    fn default() -> Self {
        Self {
            plan_type_trigger: Locator::id("btn_nvo"),
            dropdown: Locator::id("ddlPlan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardFieldSelectors {
    pub residence: Locator,
    pub residence_option: Locator,
    pub deductible: Locator,
    pub deductible_option: Locator,
    pub unique_deductible: Locator,
    pub coverages: Vec<Locator>,
}

impl Default for StandardFieldSelectors {
    fn default() -> Self {
        Self {
            residence: Locator::id("ddlResidencia"),
            residence_option: Locator::xpath(r#"//*[@id="ddlResidencia"]/option[30]"#),
            deductible: Locator::id("ddlDeducible"),
            deductible_option: Locator::xpath(r#"//*[@id="ddlDeducible"]/option[5]"#),
            unique_deductible: Locator::id("chbDeducibleUnico"),
            coverages: vec![
                coverage_checkbox("ctl03"),
                coverage_checkbox("ctl05"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlexFieldSelectors {
    pub residence: Locator,
    pub residence_option: Locator,
    pub coverages: Vec<Locator>,
}

impl Default for FlexFieldSelectors {
    fn default() -> Self {
        // Both coverages resolve to the same row on the observed form.
        Self {
            residence: Locator::id("ctl00_ContentPlaceHolder1_ddlResidencia"),
            residence_option: Locator::xpath(r#"//*[@id="ddlResidencia"]/option[30]"#),
            coverages: vec![
                coverage_checkbox("ctl05"),
                coverage_checkbox("ctl05"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationSelectors {
    pub calculate: Locator,
    pub result_tab: Locator,
    pub back_to_applicant: Locator,
    pub back_to_baseline: Locator,
}

impl Default for NavigationSelectors {
    fn default() -> Self {
        Self {
            calculate: Locator::id("btnCalcular"),
            result_tab: Locator::link_text("Resultado"),
            back_to_applicant: Locator::id("ctl00_ContentPlaceHolder1_btnRegresar"),
            back_to_baseline: Locator::id("RegresarDP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSelectors {
    pub insured_sum: Locator,
    pub annual_basic_premium: Locator,
    pub annual_benefits_premium: Locator,
    pub policy_fee: Locator,
    pub vat: Locator,
    pub annual_net_premium: Locator,
    pub first_payment: Locator,
}

impl ResultSelectors {
    pub fn locator(&self, field: QuoteField) -> &Locator {
        match field {
            QuoteField::InsuredSum => &self.insured_sum,
            QuoteField::AnnualBasicPremium => &self.annual_basic_premium,
            QuoteField::AnnualBenefitsPremium => &self.annual_benefits_premium,
            QuoteField::PolicyFee => &self.policy_fee,
            QuoteField::Vat => &self.vat,
            QuoteField::AnnualNetPremium => &self.annual_net_premium,
            QuoteField::FirstPayment => &self.first_payment,
        }
    }
}

impl Default for ResultSelectors {
    fn default() -> Self {
        let text_box = |suffix: &str| Locator::id(format!("ctl00_ContentPlaceHolder1_txb{}", suffix));
        Self {
            insured_sum: text_box("SumaAsegurada"),
            annual_basic_premium: text_box("PrimaBasicaAnual"),
            annual_benefits_premium: text_box("PrimaBeneficiosA"),
            policy_fee: text_box("DerechoDePoliza"),
            vat: text_box("Iva"),
            annual_net_premium: text_box("PrimaNetaAnual"),
            first_payment: text_box("PrimerPago"),
        }
    }
}

/// Checkbox of one row in the coverage grid
fn coverage_checkbox(row: &str) -> Locator {
    Locator::xpath(format!(
        "//input[@name='ctl00$ContentPlaceHolder1$grvCoberturas${}$chkseleccion']",
        row
    ))
}
