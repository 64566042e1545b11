use crate::classification::{GroupLevel, GroupName};
use crate::error::{EtbError, Result};
use crate::income_statement::{AccountSummary, RetainedEarnings};
use crate::lead_sheet::{LeadSheetNode, LeadSheetTree, TotalsField};
use crate::{FiscalPeriod, YearPair};
use log::{debug, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSheetSection {
    Assets,
    Liabilities,
    Equity,
}

impl BalanceSheetSection {
    pub fn group(self) -> GroupName {
        match self {
            BalanceSheetSection::Assets => GroupName::Assets,
            BalanceSheetSection::Liabilities => GroupName::Liabilities,
            BalanceSheetSection::Equity => GroupName::Equity,
        }
    }

    /// Equity leaves out the in-year profit and loss and the ledger's
    /// retained earnings; both are replaced by the derived roll-forward.
    fn excludes(self, node: &LeadSheetNode) -> bool {
        match self {
            BalanceSheetSection::Equity => matches!(
                (node.level, &node.group),
                (GroupLevel::Grouping2, GroupName::ProfitsAndLosses)
                    | (GroupLevel::Grouping3, GroupName::RetainedEarnings)
            ),
            _ => false,
        }
    }

    fn collect_leaves<'a>(self, node: &'a LeadSheetNode, out: &mut Vec<&'a LeadSheetNode>) {
        if self.excludes(node) {
            return;
        }
        if node.is_leaf() {
            out.push(node);
            return;
        }
        for child in &node.children {
            self.collect_leaves(child, out);
        }
    }

    pub fn leaves(self, tree: &LeadSheetTree) -> Vec<&LeadSheetNode> {
        let mut leaves = Vec::new();
        if let Some(statement) = tree.statement(&self.group()) {
            self.collect_leaves(statement, &mut leaves);
        }
        leaves
    }
}

/// Ids of the grouping4 leaves that feed a balance sheet section.
pub fn collect_group_accounts(tree: &LeadSheetTree, section: BalanceSheetSection) -> Vec<String> {
    section
        .leaves(tree)
        .into_iter()
        .filter_map(|leaf| leaf.id.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSheetTotals {
    pub assets: AccountSummary,
    pub liabilities: AccountSummary,
    pub equity: AccountSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSheet {
    #[serde(flatten)]
    pub period: FiscalPeriod,
    pub totals: BalanceSheetTotals,
    /// assets - (liabilities + equity)
    pub difference: f64,
    pub balanced: bool,
}

pub struct AccountingBalancer<'a> {
    tree: &'a LeadSheetTree,
    tolerance: f64,
}

impl<'a> AccountingBalancer<'a> {
    pub fn new(tree: &'a LeadSheetTree, tolerance: f64) -> Self {
        Self { tree, tolerance }
    }

    fn section_total(&self, section: BalanceSheetSection, field: TotalsField) -> f64 {
        section
            .leaves(self.tree)
            .into_iter()
            .map(|leaf| leaf.totals.get(field))
            .sum()
    }

    /// Raw section sums for one totals field. Equity excludes the profit and
    /// loss subtree and retained earnings.
    pub fn calculate_balances(&self, field: TotalsField) -> (f64, f64, f64) {
        (
            self.section_total(BalanceSheetSection::Assets, field),
            self.section_total(BalanceSheetSection::Liabilities, field),
            self.section_total(BalanceSheetSection::Equity, field),
        )
    }

    fn balance_sheet_for(&self, field: TotalsField, retained: &RetainedEarnings) -> BalanceSheet {
        let (assets, liabilities, equity_excluding_retained) = self.calculate_balances(field);
        let equity = equity_excluding_retained + retained.value;
        let difference = assets - (liabilities + equity);
        let balanced = difference.abs() < self.tolerance;

        if !balanced {
            warn!(
                "Balance sheet for {} does not balance: assets {} vs liabilities {} + equity {} (difference {})",
                retained.period.year, assets, liabilities, equity, difference
            );
        }

        BalanceSheet {
            period: retained.period.clone(),
            totals: BalanceSheetTotals {
                assets: AccountSummary {
                    value: assets,
                    accounts: collect_group_accounts(self.tree, BalanceSheetSection::Assets),
                },
                liabilities: AccountSummary {
                    value: liabilities,
                    accounts: collect_group_accounts(self.tree, BalanceSheetSection::Liabilities),
                },
                equity: AccountSummary {
                    value: equity,
                    accounts: collect_group_accounts(self.tree, BalanceSheetSection::Equity),
                },
            },
            difference,
            balanced,
        }
    }

    pub fn derive(&self, retained: &YearPair<RetainedEarnings>) -> YearPair<BalanceSheet> {
        let sheets = YearPair {
            prior_year: self.balance_sheet_for(TotalsField::PriorYear, &retained.prior_year),
            current_year: self.balance_sheet_for(TotalsField::FinalBalance, &retained.current_year),
        };

        debug!(
            "Balance sheet: prior year balanced {}, current year balanced {}",
            sheets.prior_year.balanced, sheets.current_year.balanced
        );

        sheets
    }
}

pub fn derive_balance_sheet(
    tree: &LeadSheetTree,
    retained: &YearPair<RetainedEarnings>,
    tolerance: f64,
) -> YearPair<BalanceSheet> {
    AccountingBalancer::new(tree, tolerance).derive(retained)
}

/// Fails on the first year whose balance sheet is off by `tolerance` or more.
pub fn verify_accounting_equation(sheets: &YearPair<BalanceSheet>, tolerance: f64) -> Result<()> {
    for sheet in [&sheets.prior_year, &sheets.current_year] {
        if sheet.difference.abs() >= tolerance {
            return Err(EtbError::AccountingEquationViolation {
                year: sheet.period.year,
                assets: sheet.totals.assets.value,
                liabilities: sheet.totals.liabilities.value,
                equity: sheet.totals.equity.value,
                difference: sheet.difference,
            });
        }
    }

    Ok(())
}
