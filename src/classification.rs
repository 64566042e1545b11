//! Classification paths and the grouping names they resolve to.
//!
//! A row's classification is a `" > "` separated path such as
//! `"Assets > Current Assets > Cash > Bank"`. The first three levels are
//! resolved into [`GroupName`] so the statement derivations can match on the
//! categories they care about instead of comparing raw strings. The fourth
//! level stays free-form.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const CLASSIFICATION_SEPARATOR: &str = " > ";

/// Placeholder grouping4 name for rows classified to only three levels.
pub const DIRECT_LEAF: &str = "_direct_";

pub const ASSETS: &str = "Assets";
pub const LIABILITIES: &str = "Liabilities";
pub const EQUITY: &str = "Equity";
pub const PROFITS_AND_LOSSES: &str = "Current Year Profits & Losses";
pub const RETAINED_EARNINGS: &str = "Retained earnings";
pub const CURRENT_YEAR_RESULT: &str = "Current Year Profit / (Loss)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupLevel {
    Grouping1,
    Grouping2,
    Grouping3,
    Grouping4,
}

/// The grouping3 line items the income statement formula knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineItem {
    Revenue,
    CostOfSales,
    SalesAndMarketingExpenses,
    AdministrativeExpenses,
    OtherOperatingIncome,
    InvestmentIncome,
    InvestmentLosses,
    FinanceCosts,
    ShareOfProfitOfSubsidiary,
    PbtExpenses,
    IncomeTaxExpense,
}

impl LineItem {
    pub const ALL: [LineItem; 11] = [
        LineItem::Revenue,
        LineItem::CostOfSales,
        LineItem::SalesAndMarketingExpenses,
        LineItem::AdministrativeExpenses,
        LineItem::OtherOperatingIncome,
        LineItem::InvestmentIncome,
        LineItem::InvestmentLosses,
        LineItem::FinanceCosts,
        LineItem::ShareOfProfitOfSubsidiary,
        LineItem::PbtExpenses,
        LineItem::IncomeTaxExpense,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LineItem::Revenue => "Revenue",
            LineItem::CostOfSales => "Cost of sales",
            LineItem::SalesAndMarketingExpenses => "Sales and marketing expenses",
            LineItem::AdministrativeExpenses => "Administrative expenses",
            LineItem::OtherOperatingIncome => "Other operating income",
            LineItem::InvestmentIncome => "Investment income",
            LineItem::InvestmentLosses => "Investment losses",
            LineItem::FinanceCosts => "Finance costs",
            LineItem::ShareOfProfitOfSubsidiary => "Share of profit of subsidiary",
            LineItem::PbtExpenses => "PBT expenses",
            LineItem::IncomeTaxExpense => "Income tax expense",
        }
    }

    pub fn from_label(label: &str) -> Option<LineItem> {
        Self::ALL.into_iter().find(|item| item.label() == label)
    }
}

/// A resolved grouping segment.
///
/// Known categories get their own variant; everything else is carried as
/// [`GroupName::Other`]. Matching is exact, so `"retained earnings"` (lower
/// case) is an `Other`, not [`GroupName::RetainedEarnings`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupName {
    Assets,
    Liabilities,
    Equity,
    ProfitsAndLosses,
    RetainedEarnings,
    LineItem(LineItem),
    CurrentYearResult,
    Direct,
    Other(String),
}

impl GroupName {
    pub fn parse(level: GroupLevel, label: &str) -> Self {
        match (level, label) {
            (GroupLevel::Grouping1, ASSETS) => GroupName::Assets,
            (GroupLevel::Grouping1, LIABILITIES) => GroupName::Liabilities,
            (GroupLevel::Grouping1 | GroupLevel::Grouping2, EQUITY) => GroupName::Equity,
            (GroupLevel::Grouping2, PROFITS_AND_LOSSES) => GroupName::ProfitsAndLosses,
            (GroupLevel::Grouping3, RETAINED_EARNINGS) => GroupName::RetainedEarnings,
            (GroupLevel::Grouping3, CURRENT_YEAR_RESULT) => GroupName::CurrentYearResult,
            (GroupLevel::Grouping3, other) => match LineItem::from_label(other) {
                Some(item) => GroupName::LineItem(item),
                None => GroupName::Other(other.to_string()),
            },
            (_, other) => GroupName::Other(other.to_string()),
        }
    }

    /// Grouping4 names are never resolved; a missing segment becomes the
    /// `_direct_` placeholder, the same key as a literal `_direct_` segment.
    pub fn leaf(label: Option<&str>) -> Self {
        match label {
            None | Some(DIRECT_LEAF) => GroupName::Direct,
            Some(name) => GroupName::Other(name.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GroupName::Assets => ASSETS,
            GroupName::Liabilities => LIABILITIES,
            GroupName::Equity => EQUITY,
            GroupName::ProfitsAndLosses => PROFITS_AND_LOSSES,
            GroupName::RetainedEarnings => RETAINED_EARNINGS,
            GroupName::LineItem(item) => item.label(),
            GroupName::CurrentYearResult => CURRENT_YEAR_RESULT,
            GroupName::Direct => DIRECT_LEAF,
            GroupName::Other(name) => name,
        }
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for GroupName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// The raw segments of a classification string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub grouping1: Option<String>,
    pub grouping2: Option<String>,
    pub grouping3: Option<String>,
    pub grouping4: Option<String>,
}

/// Where a row lands in the lead-sheet tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSheetPath {
    pub grouping1: GroupName,
    pub grouping2: GroupName,
    pub grouping3: GroupName,
    pub grouping4: GroupName,
}

impl Classification {
    /// Resolves the segments into a tree path. Rows without at least three
    /// levels have no place in the tree.
    pub fn lead_sheet_path(&self) -> Option<LeadSheetPath> {
        Some(LeadSheetPath {
            grouping1: GroupName::parse(GroupLevel::Grouping1, self.grouping1.as_deref()?),
            grouping2: GroupName::parse(GroupLevel::Grouping2, self.grouping2.as_deref()?),
            grouping3: GroupName::parse(GroupLevel::Grouping3, self.grouping3.as_deref()?),
            grouping4: GroupName::leaf(self.grouping4.as_deref()),
        })
    }
}

/// Splits a classification string on `" > "`. Segments past the fourth are
/// ignored and empty segments count as missing. Never fails.
pub fn parse_classification(raw: &str) -> Classification {
    if raw.is_empty() {
        return Classification::default();
    }

    let mut segments = raw.split(CLASSIFICATION_SEPARATOR).map(|segment| {
        if segment.is_empty() {
            None
        } else {
            Some(segment.to_string())
        }
    });

    Classification {
        grouping1: segments.next().flatten(),
        grouping2: segments.next().flatten(),
        grouping3: segments.next().flatten(),
        grouping4: segments.next().flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_path() {
        let parsed = parse_classification("Assets > Current Assets > Cash > Bank");
        assert_eq!(parsed.grouping1.as_deref(), Some("Assets"));
        assert_eq!(parsed.grouping2.as_deref(), Some("Current Assets"));
        assert_eq!(parsed.grouping3.as_deref(), Some("Cash"));
        assert_eq!(parsed.grouping4.as_deref(), Some("Bank"));
    }

    #[test]
    fn test_parse_short_and_empty_paths() {
        let parsed = parse_classification("Assets > OnlyTwoLevels");
        assert_eq!(parsed.grouping2.as_deref(), Some("OnlyTwoLevels"));
        assert!(parsed.grouping3.is_none());
        assert!(parsed.lead_sheet_path().is_none());

        assert_eq!(parse_classification(""), Classification::default());
    }

    #[test]
    fn test_parse_ignores_extra_segments() {
        let parsed = parse_classification("Assets > A > B > C > D > E");
        assert_eq!(parsed.grouping4.as_deref(), Some("C"));
    }

    #[test]
    fn test_separator_requires_spaces() {
        let parsed = parse_classification("Assets>Current Assets>Cash");
        assert_eq!(parsed.grouping1.as_deref(), Some("Assets>Current Assets>Cash"));
        assert!(parsed.grouping2.is_none());
    }

    #[test]
    fn test_empty_segment_counts_as_missing() {
        let parsed = parse_classification("Assets >  > Cash");
        assert_eq!(parsed.grouping2, None);
        assert!(parsed.lead_sheet_path().is_none());
    }

    #[test]
    fn test_group_names_resolve_per_level() {
        let path = parse_classification("Equity > Equity > Retained earnings")
            .lead_sheet_path()
            .unwrap();
        assert_eq!(path.grouping1, GroupName::Equity);
        assert_eq!(path.grouping2, GroupName::Equity);
        assert_eq!(path.grouping3, GroupName::RetainedEarnings);
        assert_eq!(path.grouping4, GroupName::Direct);
        assert_eq!(path.grouping4.label(), "_direct_");

        let pnl = parse_classification("Equity > Current Year Profits & Losses > Cost of sales > Materials")
            .lead_sheet_path()
            .unwrap();
        assert_eq!(pnl.grouping2, GroupName::ProfitsAndLosses);
        assert_eq!(pnl.grouping3, GroupName::LineItem(LineItem::CostOfSales));
        assert_eq!(pnl.grouping4, GroupName::Other("Materials".to_string()));
    }

    #[test]
    fn test_known_labels_only_match_at_their_level() {
        assert_eq!(
            GroupName::parse(GroupLevel::Grouping2, "Assets"),
            GroupName::Other("Assets".to_string())
        );
        assert_eq!(
            GroupName::parse(GroupLevel::Grouping3, "retained earnings"),
            GroupName::Other("retained earnings".to_string())
        );
    }

    #[test]
    fn test_line_item_labels_round_trip() {
        for item in LineItem::ALL {
            assert_eq!(LineItem::from_label(item.label()), Some(item));
        }
    }

    #[test]
    fn test_group_name_serializes_as_label() {
        let json = serde_json::to_string(&GroupName::ProfitsAndLosses).unwrap();
        assert_eq!(json, "\"Current Year Profits & Losses\"");
    }
}
