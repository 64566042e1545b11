//! # ETB Statements
//!
//! A library for turning an extended trial balance (ETB) into lead sheets and
//! financial statements, with the balance sheet identity checked on the way.
//!
//! ## Core Concepts
//!
//! - **ETB rows**: Flat account balances tagged with a `" > "` classification path
//! - **Sign conventions**: Credit-normal classes (Equity, Liabilities) are negated so
//!   every figure reads in presentation sign
//! - **Lead sheets**: A four-level rollup tree; every node carries the sum of its children
//! - **Income statement**: Gross, operating and net profit derived from the
//!   Equity > Current Year Profits & Losses subtree
//! - **Retained earnings**: The stored opening balance rolled forward by the year's result
//! - **Balance sheet**: Assets = Liabilities + Equity, within one unit of account
//!
//! ## Example
//!
//! ```rust,ignore
//! use etb_statements::*;
//!
//! let rows = vec![
//!     EtbRow::new("1", "Assets > Current Assets > Cash > Bank").with_current_year(1000.0),
//!     EtbRow::new("2", "Liabilities > Current Liabilities > Payables > Trade").with_current_year(-400.0),
//!     EtbRow::new("3", "Equity > Equity > Retained earnings").with_prior_year(-600.0),
//! ];
//!
//! let result = extract_etb_data(&rows, 2024);
//! assert!(result.balance_sheet.current_year.balanced);
//! ```

pub mod balancer;
pub mod classification;
pub mod error;
pub mod income_statement;
pub mod ingestion;
pub mod lead_sheet;
pub mod schema;
pub mod utils;

pub use balancer::{
    collect_group_accounts, derive_balance_sheet, verify_accounting_equation, AccountingBalancer,
    BalanceSheet, BalanceSheetSection, BalanceSheetTotals,
};
pub use classification::{parse_classification, Classification, GroupLevel, GroupName, LineItem};
pub use error::{EtbError, Result};
pub use income_statement::{
    derive_income_statement, derive_retained_earnings, AccountIndex, AccountSummary,
    IncomeStatement, ProfitFigures, ResultType, RetainedEarnings,
};
pub use ingestion::{coerce_amount, normalize_etb, normalize_row, parse_etb_json};
pub use lead_sheet::{
    build_lead_sheets, LeadSheetBuilder, LeadSheetNode, LeadSheetTree, Totals, TotalsField,
};
pub use schema::*;
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// A fiscal year and the dates it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub year: i32,
    /// `None` only when the year is outside chrono's range
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

impl FiscalPeriod {
    pub fn new(year: i32, fiscal_year_end_month: u32) -> Self {
        let period_end = fiscal_year_end_date(year, fiscal_year_end_month);
        Self {
            year,
            period_start: period_end.and_then(fiscal_year_start),
            period_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearPair<T> {
    pub prior_year: T,
    pub current_year: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Normalized rows, including the ones left out of the lead sheets
    pub etb: Vec<EtbRow>,
    /// Lead sheets with the derived current year result shown under
    /// Equity > Current Year Profits & Losses
    pub lead_sheets: LeadSheetTree,
    pub income_statement: YearPair<IncomeStatement>,
    pub balance_sheet: YearPair<BalanceSheet>,
    pub retained_earnings: YearPair<RetainedEarnings>,
}

impl ExtractionResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EtbExtractor {
    config: ExtractionConfig,
}

impl EtbExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn periods(&self, year: i32) -> YearPair<FiscalPeriod> {
        YearPair {
            prior_year: FiscalPeriod::new(year.saturating_sub(1), self.config.fiscal_year_end_month),
            current_year: FiscalPeriod::new(year, self.config.fiscal_year_end_month),
        }
    }

    /// Runs the whole derivation for `year` (prior year is `year - 1`). Never
    /// fails: missing data degrades to zero figures and an unbalanced balance
    /// sheet is reported through `balanced`.
    pub fn extract(&self, rows: &[EtbRow], year: i32) -> ExtractionResult {
        info!(
            "Extracting statements for {} from {} trial balance rows",
            year,
            rows.len()
        );

        let etb = normalize_etb(rows, &self.config.sign_conventions);
        let tree = build_lead_sheets(&etb);

        let periods = self.periods(year);
        let income_statement =
            derive_income_statement(&tree, &periods, self.config.account_index_scope);
        let retained_earnings = derive_retained_earnings(&tree, &income_statement);
        let balance_sheet =
            derive_balance_sheet(&tree, &retained_earnings, self.config.balance_tolerance);

        let lead_sheets = tree.with_current_year_result(
            income_statement.prior_year.net_result,
            income_statement.current_year.net_result,
        );

        debug!(
            "Extraction for {} complete: net result {}, balanced {}",
            year, income_statement.current_year.net_result, balance_sheet.current_year.balanced
        );

        ExtractionResult {
            etb,
            lead_sheets,
            income_statement,
            balance_sheet,
            retained_earnings,
        }
    }

    /// Like [`EtbExtractor::extract`], but an unbalanced balance sheet in
    /// either year is an error.
    pub fn extract_with_verification(&self, rows: &[EtbRow], year: i32) -> Result<ExtractionResult> {
        let result = self.extract(rows, year);
        verify_accounting_equation(&result.balance_sheet, self.config.balance_tolerance)?;
        Ok(result)
    }
}

/// Extracts with the default configuration: Equity and Liabilities credit
/// normal, December year end, one unit balance tolerance.
pub fn extract_etb_data(rows: &[EtbRow], year: i32) -> ExtractionResult {
    EtbExtractor::default().extract(rows, year)
}

pub fn extract_with_verification(rows: &[EtbRow], year: i32) -> Result<ExtractionResult> {
    EtbExtractor::default().extract_with_verification(rows, year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<EtbRow> {
        vec![
            EtbRow::new("1", "Assets > Current Assets > Cash > Bank")
                .with_current_year(1250.0)
                .with_prior_year(1000.0),
            EtbRow::new("2", "Liabilities > Current Liabilities > Payables > Trade")
                .with_current_year(-400.0)
                .with_prior_year(-400.0),
            EtbRow::new("3", "Equity > Equity > Retained earnings")
                .with_current_year(-600.0)
                .with_prior_year(-600.0),
            EtbRow::new("4", "Equity > Current Year Profits & Losses > Revenue > Fees")
                .with_current_year(-500.0),
            EtbRow::new("5", "Equity > Current Year Profits & Losses > Cost of sales")
                .with_current_year(250.0),
        ]
    }

    #[test]
    fn test_end_to_end_extraction() {
        let result = extract_etb_data(&sample_rows(), 2024);

        assert_eq!(result.etb.len(), 5);
        assert_eq!(result.income_statement.current_year.net_result, 250.0);
        assert_eq!(
            result.income_statement.current_year.result_type,
            ResultType::NetProfit
        );
        assert_eq!(result.retained_earnings.prior_year.value, 600.0);
        assert_eq!(result.retained_earnings.current_year.value, 850.0);

        let current = &result.balance_sheet.current_year;
        assert_eq!(current.totals.assets.value, 1250.0);
        assert_eq!(current.totals.liabilities.value, 400.0);
        assert_eq!(current.totals.equity.value, 850.0);
        assert!(current.balanced);
        assert!(result.balance_sheet.prior_year.balanced);

        assert_eq!(
            current.period.period_end,
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        assert_eq!(
            result.balance_sheet.prior_year.period.period_end,
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[test]
    fn test_lead_sheets_show_current_year_result() {
        let result = extract_etb_data(&sample_rows(), 2024);

        let node = result
            .lead_sheets
            .find(&[
                GroupName::Equity,
                GroupName::ProfitsAndLosses,
                GroupName::CurrentYearResult,
            ])
            .unwrap();
        assert_eq!(node.totals.final_balance, 250.0);
        assert_eq!(node.totals.prior_year, 0.0);
    }

    #[test]
    fn test_fiscal_year_end_month_dates_statements() {
        let config = ExtractionConfig {
            fiscal_year_end_month: 6,
            ..ExtractionConfig::default()
        };
        let extractor = EtbExtractor::new(config).unwrap();
        let result = extractor.extract(&sample_rows(), 2024);

        let period = &result.income_statement.current_year.period;
        assert_eq!(period.period_start, NaiveDate::from_ymd_opt(2023, 7, 1));
        assert_eq!(period.period_end, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExtractionConfig {
            fiscal_year_end_month: 0,
            ..ExtractionConfig::default()
        };
        assert!(matches!(
            EtbExtractor::new(config),
            Err(EtbError::InvalidFiscalYearEndMonth(0))
        ));
    }

    #[test]
    fn test_extract_with_verification() {
        assert!(extract_with_verification(&sample_rows(), 2024).is_ok());

        let mut rows = sample_rows();
        rows.push(EtbRow::new("6", "Assets > Current Assets > Cash > Float").with_current_year(10.0));

        let result = extract_with_verification(&rows, 2024);
        assert!(matches!(
            result,
            Err(EtbError::AccountingEquationViolation { year: 2024, .. })
        ));
    }

    #[test]
    fn test_result_serializes_to_json() {
        let json = extract_etb_data(&sample_rows(), 2024).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["income_statement"]["current_year"]["resultType"], "net_profit");
        assert_eq!(value["balance_sheet"]["current_year"]["balanced"], true);
        assert_eq!(value["retained_earnings"]["current_year"]["value"], 850.0);
        assert_eq!(value["etb"][1]["currentYear"], 400.0);
        assert_eq!(value["lead_sheets"][0]["group"], "Assets");
    }
}
