use crate::classification::{GroupName, LineItem};
use crate::lead_sheet::{LeadSheetNode, LeadSheetTree, TotalsField};
use crate::schema::AccountIndexScope;
use crate::{FiscalPeriod, YearPair};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    NetProfit,
    NetLoss,
}

impl ResultType {
    pub fn from_net_result(net_result: f64) -> Self {
        if net_result >= 0.0 {
            ResultType::NetProfit
        } else {
            ResultType::NetLoss
        }
    }
}

/// A figure together with the lead-sheet leaves it was drawn from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSummary {
    pub value: f64,
    pub accounts: Vec<String>,
}

/// The profit waterfall. Expenses and losses are expected to arrive negative
/// after sign normalization, so every step is a plain sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProfitFigures {
    pub gross_profit: f64,
    pub operating_profit: f64,
    pub profit_before_tax: f64,
    pub net_result: f64,
}

impl ProfitFigures {
    pub fn compute(amount: impl Fn(LineItem) -> f64) -> Self {
        let gross_profit = amount(LineItem::Revenue) + amount(LineItem::CostOfSales);
        let operating_profit = gross_profit
            + amount(LineItem::SalesAndMarketingExpenses)
            + amount(LineItem::AdministrativeExpenses)
            + amount(LineItem::OtherOperatingIncome);
        let profit_before_tax = operating_profit
            + amount(LineItem::InvestmentIncome)
            + amount(LineItem::InvestmentLosses)
            + amount(LineItem::FinanceCosts)
            + amount(LineItem::ShareOfProfitOfSubsidiary)
            + amount(LineItem::PbtExpenses);
        let net_result = profit_before_tax + amount(LineItem::IncomeTaxExpense);

        Self {
            gross_profit,
            operating_profit,
            profit_before_tax,
            net_result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeStatement {
    #[serde(flatten)]
    pub period: FiscalPeriod,
    pub gross_profit: f64,
    pub operating_profit: f64,
    pub profit_before_tax: f64,
    pub net_result: f64,
    #[serde(rename = "resultType")]
    pub result_type: ResultType,
    pub breakdowns: BTreeMap<String, AccountSummary>,
}

impl IncomeStatement {
    pub fn empty(period: FiscalPeriod) -> Self {
        Self::from_figures(period, ProfitFigures::default(), BTreeMap::new())
    }

    fn from_figures(
        period: FiscalPeriod,
        figures: ProfitFigures,
        breakdowns: BTreeMap<String, AccountSummary>,
    ) -> Self {
        Self {
            period,
            gross_profit: figures.gross_profit,
            operating_profit: figures.operating_profit,
            profit_before_tax: figures.profit_before_tax,
            net_result: figures.net_result,
            result_type: ResultType::from_net_result(figures.net_result),
            breakdowns,
        }
    }
}

/// grouping3 name → ids of the leaves beneath it.
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    entries: HashMap<GroupName, Vec<String>>,
}

impl AccountIndex {
    /// With [`AccountIndexScope::TreeWide`] every grouping3 node in the tree
    /// is indexed in tree order, so a later node sharing a name replaces an
    /// earlier one even when it sits outside the profit and loss subtree.
    pub fn build(tree: &LeadSheetTree, scope: AccountIndexScope) -> Self {
        let mut index = Self::default();
        match scope {
            AccountIndexScope::TreeWide => {
                for grouping1 in tree.nodes() {
                    for grouping2 in &grouping1.children {
                        index.insert_children(grouping2);
                    }
                }
            }
            AccountIndexScope::ProfitAndLoss => {
                if let Some(pnl) = profit_and_loss(tree) {
                    index.insert_children(pnl);
                }
            }
        }
        index
    }

    fn insert_children(&mut self, grouping2: &LeadSheetNode) {
        for grouping3 in &grouping2.children {
            self.entries
                .insert(grouping3.group.clone(), grouping3.leaf_ids());
        }
    }

    pub fn accounts(&self, group: &GroupName) -> Vec<String> {
        self.entries.get(group).cloned().unwrap_or_default()
    }
}

pub fn profit_and_loss(tree: &LeadSheetTree) -> Option<&LeadSheetNode> {
    tree.find(&[GroupName::Equity, GroupName::ProfitsAndLosses])
}

fn statement_for(
    pnl: &LeadSheetNode,
    field: TotalsField,
    period: FiscalPeriod,
    index: &AccountIndex,
) -> IncomeStatement {
    let amount = |item: LineItem| {
        pnl.child(&GroupName::LineItem(item))
            .map(|node| node.totals.get(field))
            .unwrap_or(0.0)
    };
    let figures = ProfitFigures::compute(amount);

    let breakdowns = pnl
        .children
        .iter()
        .map(|node| {
            (
                node.group.to_string(),
                AccountSummary {
                    value: node.totals.get(field).abs(),
                    accounts: index.accounts(&node.group),
                },
            )
        })
        .collect();

    IncomeStatement::from_figures(period, figures, breakdowns)
}

/// Prior year figures come from `priorYear` totals, current year figures from
/// `finalBalance`. Without an Equity > Current Year Profits & Losses subtree
/// both years report a zero result.
pub fn derive_income_statement(
    tree: &LeadSheetTree,
    periods: &YearPair<FiscalPeriod>,
    scope: AccountIndexScope,
) -> YearPair<IncomeStatement> {
    let Some(pnl) = profit_and_loss(tree) else {
        debug!("No current year profit and loss subtree; income statement is empty");
        return YearPair {
            prior_year: IncomeStatement::empty(periods.prior_year.clone()),
            current_year: IncomeStatement::empty(periods.current_year.clone()),
        };
    };

    for node in &pnl.children {
        if let GroupName::Other(name) = &node.group {
            warn!(
                "Profit and loss category '{}' is not a recognised line item and is left out of the result",
                name
            );
        }
    }

    let index = AccountIndex::build(tree, scope);
    let statements = YearPair {
        prior_year: statement_for(pnl, TotalsField::PriorYear, periods.prior_year.clone(), &index),
        current_year: statement_for(
            pnl,
            TotalsField::FinalBalance,
            periods.current_year.clone(),
            &index,
        ),
    };

    debug!(
        "Income statement: prior year {:?} {}, current year {:?} {}",
        statements.prior_year.result_type,
        statements.prior_year.net_result,
        statements.current_year.result_type,
        statements.current_year.net_result
    );

    statements
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetainedEarnings {
    #[serde(flatten)]
    pub period: FiscalPeriod,
    pub value: f64,
    pub accounts: Vec<String>,
}

pub fn retained_earnings_node(tree: &LeadSheetTree) -> Option<&LeadSheetNode> {
    tree.find(&[
        GroupName::Equity,
        GroupName::Equity,
        GroupName::RetainedEarnings,
    ])
}

/// Rolls the stored retained earnings balance forward: the prior year is the
/// ledger's prior year balance, the current year adds the current net result.
pub fn derive_retained_earnings(
    tree: &LeadSheetTree,
    income: &YearPair<IncomeStatement>,
) -> YearPair<RetainedEarnings> {
    let node = retained_earnings_node(tree);
    let opening = node.map(|n| n.totals.prior_year).unwrap_or(0.0);
    let accounts = node.map(|n| n.leaf_ids()).unwrap_or_default();

    YearPair {
        prior_year: RetainedEarnings {
            period: income.prior_year.period.clone(),
            value: opening,
            accounts: accounts.clone(),
        },
        current_year: RetainedEarnings {
            period: income.current_year.period.clone(),
            value: opening + income.current_year.net_result,
            accounts,
        },
    }
}
