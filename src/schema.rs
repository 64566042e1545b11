use crate::classification::{ASSETS, CLASSIFICATION_SEPARATOR, EQUITY, LIABILITIES};
use crate::error::{EtbError, Result};
use crate::ingestion::{lenient_amount, lenient_id, lenient_string};
use crate::utils::validate_fiscal_year_end_month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EtbRow {
    #[serde(default, deserialize_with = "lenient_id")]
    #[schemars(
        with = "String",
        description = "Opaque row identifier, unique within the trial balance. Numbers are accepted and kept as their decimal text."
    )]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_string")]
    #[schemars(
        with = "String",
        description = "Hierarchy path of one to four segments separated by ' > ' (e.g. 'Assets > Current Assets > Cash > Bank')"
    )]
    pub classification: String,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(with = "f64", description = "Current year balance as recorded by the ledger")]
    pub current_year: f64,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(with = "f64", description = "Prior year comparison balance as recorded by the ledger")]
    pub prior_year: f64,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(with = "f64", description = "Audit adjustments posted against the current year")]
    pub adjustments: f64,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(with = "f64", description = "Reclassification entries posted against the current year")]
    pub reclassification: f64,

    #[serde(default, deserialize_with = "lenient_amount")]
    #[schemars(
        with = "f64",
        description = "Ignored on input. Always recomputed as currentYear + adjustments + reclassification."
    )]
    pub final_balance: f64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EtbRow {
    pub fn new(id: impl Into<String>, classification: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            classification: classification.into(),
            ..Self::default()
        }
    }

    pub fn with_current_year(mut self, value: f64) -> Self {
        self.current_year = value;
        self
    }

    pub fn with_prior_year(mut self, value: f64) -> Self {
        self.prior_year = value;
        self
    }

    pub fn with_adjustments(mut self, value: f64) -> Self {
        self.adjustments = value;
        self
    }

    pub fn with_reclassification(mut self, value: f64) -> Self {
        self.reclassification = value;
        self
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<EtbRow>)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum NormalBalance {
    #[schemars(description = "Debit-normal class (assets). Amounts keep the ledger sign.")]
    Debit,

    #[schemars(description = "Credit-normal class (liabilities, equity). Amounts are negated for presentation.")]
    Credit,
}

impl NormalBalance {
    pub fn multiplier(self) -> f64 {
        match self {
            NormalBalance::Debit => 1.0,
            NormalBalance::Credit => -1.0,
        }
    }
}

/// Normal balance per grouping1 label. Labels that are not listed are
/// treated as debit-normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SignConventions(BTreeMap<String, NormalBalance>);

impl Default for SignConventions {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(ASSETS.to_string(), NormalBalance::Debit);
        table.insert(LIABILITIES.to_string(), NormalBalance::Credit);
        table.insert(EQUITY.to_string(), NormalBalance::Credit);
        Self(table)
    }
}

impl SignConventions {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, grouping1: impl Into<String>, balance: NormalBalance) -> Self {
        self.0.insert(grouping1.into(), balance);
        self
    }

    pub fn normal_balance(&self, grouping1: Option<&str>) -> NormalBalance {
        grouping1
            .and_then(|label| self.0.get(label))
            .copied()
            .unwrap_or(NormalBalance::Debit)
    }

    pub fn multiplier(&self, grouping1: Option<&str>) -> f64 {
        self.normal_balance(grouping1).multiplier()
    }

    pub fn validate(&self) -> Result<()> {
        for label in self.0.keys() {
            if label.is_empty() {
                return Err(EtbError::InvalidSignConvention(
                    "grouping1 label must not be empty".to_string(),
                ));
            }
            if label.contains(CLASSIFICATION_SEPARATOR) {
                return Err(EtbError::InvalidSignConvention(format!(
                    "grouping1 label '{}' must not contain the classification separator",
                    label
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountIndexScope {
    #[default]
    #[schemars(
        description = "Resolve income statement breakdown accounts from every grouping3 node in the tree. A later node with the same name shadows an earlier one."
    )]
    TreeWide,

    #[schemars(description = "Resolve income statement breakdown accounts only from the Current Year Profits & Losses subtree.")]
    ProfitAndLoss,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionConfig {
    #[serde(default = "default_fiscal_year_end_month")]
    #[schemars(
        description = "The month when the fiscal year ends (1 = January, 12 = December). Used to date each statement."
    )]
    pub fiscal_year_end_month: u32,

    #[serde(default = "default_balance_tolerance")]
    #[schemars(
        description = "A balance sheet is balanced when |assets - (liabilities + equity)| is strictly below this value. Defaults to one unit of account."
    )]
    pub balance_tolerance: f64,

    #[serde(default)]
    #[schemars(description = "Normal balance per grouping1 label. Credit-normal classes are sign flipped.")]
    pub sign_conventions: SignConventions,

    #[serde(default)]
    #[schemars(description = "Where income statement breakdowns look up their lead sheet ids")]
    pub account_index_scope: AccountIndexScope,
}

fn default_fiscal_year_end_month() -> u32 {
    12
}

fn default_balance_tolerance() -> f64 {
    1.0
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fiscal_year_end_month: default_fiscal_year_end_month(),
            balance_tolerance: default_balance_tolerance(),
            sign_conventions: SignConventions::default(),
            account_index_scope: AccountIndexScope::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<()> {
        validate_fiscal_year_end_month(self.fiscal_year_end_month)?;

        if !self.balance_tolerance.is_finite() || self.balance_tolerance <= 0.0 {
            return Err(EtbError::InvalidBalanceTolerance(self.balance_tolerance));
        }

        self.sign_conventions.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractionConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
