use crate::classification::{parse_classification, GroupLevel, GroupName};
use crate::schema::EtbRow;
use log::debug;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TotalsField {
    CurrentYear,
    PriorYear,
    Adjustments,
    Reclassification,
    FinalBalance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub current_year: f64,
    pub prior_year: f64,
    pub adjustments: f64,
    pub reclassification: f64,
    pub final_balance: f64,
}

impl Totals {
    pub fn from_row(row: &EtbRow) -> Self {
        Self {
            current_year: row.current_year,
            prior_year: row.prior_year,
            adjustments: row.adjustments,
            reclassification: row.reclassification,
            final_balance: row.final_balance,
        }
    }

    pub fn get(&self, field: TotalsField) -> f64 {
        match field {
            TotalsField::CurrentYear => self.current_year,
            TotalsField::PriorYear => self.prior_year,
            TotalsField::Adjustments => self.adjustments,
            TotalsField::Reclassification => self.reclassification,
            TotalsField::FinalBalance => self.final_balance,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Totals) {
        self.current_year += other.current_year;
        self.prior_year += other.prior_year;
        self.adjustments += other.adjustments;
        self.reclassification += other.reclassification;
        self.final_balance += other.final_balance;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Self {
        iter.fold(Totals::default(), |mut acc, totals| {
            acc += totals;
            acc
        })
    }
}

/// One node of the lead-sheet tree. Only grouping4 leaves carry an `id` and
/// the ids of the rows that fed them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadSheetNode {
    pub level: GroupLevel,
    pub group: GroupName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LeadSheetNode>,
    pub totals: Totals,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<String>,
}

impl LeadSheetNode {
    pub fn new(level: GroupLevel, group: GroupName) -> Self {
        Self {
            level,
            group,
            id: None,
            children: Vec::new(),
            totals: Totals::default(),
            rows: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.level == GroupLevel::Grouping4
    }

    pub fn child(&self, group: &GroupName) -> Option<&LeadSheetNode> {
        self.children.iter().find(|child| child.group == *group)
    }

    /// Grouping4 leaves beneath this node, in tree order.
    pub fn leaves(&self) -> Vec<&LeadSheetNode> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeadSheetNode>) {
        if self.is_leaf() {
            out.push(self);
            return;
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }

    pub fn leaf_ids(&self) -> Vec<String> {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| leaf.id.clone())
            .collect()
    }

    fn rollup(&mut self) -> Totals {
        if self.is_leaf() {
            return self.totals;
        }
        self.totals = self.children.iter_mut().map(|child| child.rollup()).sum();
        self.totals
    }
}

fn find_or_insert<'a>(
    nodes: &'a mut Vec<LeadSheetNode>,
    level: GroupLevel,
    group: &GroupName,
) -> (&'a mut LeadSheetNode, bool) {
    match nodes.iter().position(|node| node.group == *group) {
        Some(index) => (&mut nodes[index], false),
        None => {
            nodes.push(LeadSheetNode::new(level, group.clone()));
            let index = nodes.len() - 1;
            (&mut nodes[index], true)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LeadSheetTree {
    nodes: Vec<LeadSheetNode>,
}

impl LeadSheetTree {
    pub fn nodes(&self) -> &[LeadSheetNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn statement(&self, group: &GroupName) -> Option<&LeadSheetNode> {
        self.nodes.iter().find(|node| node.group == *group)
    }

    /// Follows `path` from grouping1 downwards.
    pub fn find(&self, path: &[GroupName]) -> Option<&LeadSheetNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.statement(first)?, |node, group| node.child(group))
    }

    pub fn leaves(&self) -> Vec<&LeadSheetNode> {
        self.nodes.iter().flat_map(|node| node.leaves()).collect()
    }

    pub fn leaf(&self, id: &str) -> Option<&LeadSheetNode> {
        self.leaves()
            .into_iter()
            .find(|leaf| leaf.id.as_deref() == Some(id))
    }

    /// A copy of the tree with a synthetic `Current Year Profit / (Loss)`
    /// grouping3 node under Equity > Current Year Profits & Losses carrying
    /// the derived net results. Ancestor totals are left as they were.
    pub fn with_current_year_result(&self, prior_net: f64, current_net: f64) -> LeadSheetTree {
        let mut view = self.clone();

        let (equity, _) = find_or_insert(&mut view.nodes, GroupLevel::Grouping1, &GroupName::Equity);
        let (pnl, _) = find_or_insert(
            &mut equity.children,
            GroupLevel::Grouping2,
            &GroupName::ProfitsAndLosses,
        );
        let (result, _) = find_or_insert(
            &mut pnl.children,
            GroupLevel::Grouping3,
            &GroupName::CurrentYearResult,
        );

        result.totals = Totals {
            current_year: current_net,
            prior_year: prior_net,
            adjustments: 0.0,
            reclassification: 0.0,
            final_balance: current_net,
        };

        view
    }
}

/// Folds normalized rows into the four-level lead-sheet tree.
#[derive(Debug, Default)]
pub struct LeadSheetBuilder {
    nodes: Vec<LeadSheetNode>,
    next_id: usize,
    skipped: usize,
}

impl LeadSheetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row to its leaf. Returns `false` when the classification has
    /// fewer than three levels and the row was left out.
    pub fn add_row(&mut self, row: &EtbRow) -> bool {
        let Some(path) = parse_classification(&row.classification).lead_sheet_path() else {
            debug!(
                "Row '{}' left out of lead sheets: classification '{}' has fewer than three levels",
                row.id, row.classification
            );
            self.skipped += 1;
            return false;
        };

        let (grouping1, _) = find_or_insert(&mut self.nodes, GroupLevel::Grouping1, &path.grouping1);
        let (grouping2, _) =
            find_or_insert(&mut grouping1.children, GroupLevel::Grouping2, &path.grouping2);
        let (grouping3, _) =
            find_or_insert(&mut grouping2.children, GroupLevel::Grouping3, &path.grouping3);
        let (leaf, created) =
            find_or_insert(&mut grouping3.children, GroupLevel::Grouping4, &path.grouping4);

        if created {
            self.next_id += 1;
            leaf.id = Some(format!("LS_{}", self.next_id));
        }

        leaf.totals += Totals::from_row(row);
        leaf.rows.push(row.id.clone());
        true
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn build(mut self) -> LeadSheetTree {
        for node in &mut self.nodes {
            node.rollup();
        }
        debug!(
            "Built lead sheets: {} grouping1 nodes, {} leaves, {} rows left out",
            self.nodes.len(),
            self.next_id,
            self.skipped
        );
        LeadSheetTree { nodes: self.nodes }
    }
}

pub fn build_lead_sheets(rows: &[EtbRow]) -> LeadSheetTree {
    let mut builder = LeadSheetBuilder::new();
    for row in rows {
        builder.add_row(row);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::LineItem;

    const FIELDS: [TotalsField; 5] = [
        TotalsField::CurrentYear,
        TotalsField::PriorYear,
        TotalsField::Adjustments,
        TotalsField::Reclassification,
        TotalsField::FinalBalance,
    ];

    fn row(id: &str, classification: &str, current_year: f64) -> EtbRow {
        let mut row = EtbRow::new(id, classification).with_current_year(current_year);
        row.final_balance = current_year;
        row
    }

    fn assert_rolled_up(node: &LeadSheetNode) {
        if node.is_leaf() {
            return;
        }
        for field in FIELDS {
            let sum: f64 = node.children.iter().map(|c| c.totals.get(field)).sum();
            assert!(
                (node.totals.get(field) - sum).abs() < 1e-9,
                "{} {:?} should be {}, got {}",
                node.group,
                field,
                sum,
                node.totals.get(field)
            );
        }
        for child in &node.children {
            assert_rolled_up(child);
        }
    }

    #[test]
    fn test_ids_follow_first_appearance() {
        let rows = vec![
            row("1", "Liabilities > Current > Payables > Zeta", 1.0),
            row("2", "Assets > Current > Cash > Alpha", 1.0),
            row("3", "Liabilities > Current > Payables > Zeta", 1.0),
            row("4", "Assets > Current > Cash > 10", 1.0),
            row("5", "Assets > Current > Cash > 2", 1.0),
        ];

        let tree = build_lead_sheets(&rows);
        let ids: Vec<(String, String)> = tree
            .leaves()
            .into_iter()
            .map(|leaf| (leaf.group.to_string(), leaf.id.clone().unwrap()))
            .collect();

        assert_eq!(tree.nodes()[0].group, GroupName::Liabilities);
        assert_eq!(
            ids,
            vec![
                ("Zeta".to_string(), "LS_1".to_string()),
                ("Alpha".to_string(), "LS_2".to_string()),
                ("10".to_string(), "LS_3".to_string()),
                ("2".to_string(), "LS_4".to_string()),
            ]
        );
    }

    #[test]
    fn test_rollup_sums_every_field() {
        let rows = vec![
            EtbRow {
                id: "1".to_string(),
                classification: "Assets > Current Assets > Cash > Bank".to_string(),
                current_year: 100.0,
                prior_year: 90.0,
                adjustments: 5.0,
                reclassification: -2.0,
                final_balance: 103.0,
                ..EtbRow::default()
            },
            EtbRow {
                id: "2".to_string(),
                classification: "Assets > Current Assets > Cash > Petty".to_string(),
                current_year: 7.0,
                prior_year: 3.0,
                adjustments: 0.0,
                reclassification: 1.0,
                final_balance: 8.0,
                ..EtbRow::default()
            },
            EtbRow {
                id: "3".to_string(),
                classification: "Assets > Non-current Assets > Equipment".to_string(),
                current_year: 50.0,
                prior_year: 60.0,
                adjustments: -10.0,
                reclassification: 0.0,
                final_balance: 40.0,
                ..EtbRow::default()
            },
        ];

        let tree = build_lead_sheets(&rows);
        for node in tree.nodes() {
            assert_rolled_up(node);
        }

        let assets = tree.statement(&GroupName::Assets).unwrap();
        assert_eq!(assets.totals.current_year, 157.0);
        assert_eq!(assets.totals.prior_year, 153.0);
        assert_eq!(assets.totals.adjustments, -5.0);
        assert_eq!(assets.totals.reclassification, -1.0);
        assert_eq!(assets.totals.final_balance, 151.0);
    }

    #[test]
    fn test_duplicate_classification_accumulates() {
        let rows = vec![
            row("a", "Assets > Current Assets > Cash > Bank", 10.0),
            row("b", "Assets > Current Assets > Cash > Bank", 15.0),
        ];

        let tree = build_lead_sheets(&rows);
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].totals.current_year, 25.0);
        assert_eq!(leaves[0].rows, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_three_level_rows_use_direct_leaf() {
        let tree = build_lead_sheets(&[row("1", "Equity > Equity > Retained earnings", 5.0)]);
        let node = tree
            .find(&[GroupName::Equity, GroupName::Equity, GroupName::RetainedEarnings])
            .unwrap();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].group, GroupName::Direct);
        assert_eq!(node.children[0].id.as_deref(), Some("LS_1"));
    }

    #[test]
    fn test_literal_direct_segment_shares_the_direct_leaf() {
        let tree = build_lead_sheets(&[
            row("a", "Assets > Current Assets > Cash", 5.0),
            row("b", "Assets > Current Assets > Cash > _direct_", 7.0),
        ]);

        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].group, GroupName::Direct);
        assert_eq!(leaves[0].id.as_deref(), Some("LS_1"));
        assert_eq!(leaves[0].rows, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(leaves[0].totals.final_balance, 12.0);
    }

    #[test]
    fn test_short_classifications_are_skipped() {
        let mut builder = LeadSheetBuilder::new();
        assert!(!builder.add_row(&row("x", "Assets > OnlyTwoLevels", 5.0)));
        assert!(!builder.add_row(&row("y", "", 5.0)));
        assert!(builder.add_row(&row("z", "Assets > Current Assets > Cash", 5.0)));
        assert_eq!(builder.skipped(), 2);

        let tree = builder.build();
        let all_rows: Vec<&String> = tree.leaves().into_iter().flat_map(|l| l.rows.iter()).collect();
        assert_eq!(all_rows, vec!["z"]);
    }

    #[test]
    fn test_find_and_leaf_lookup() {
        let tree = build_lead_sheets(&[
            row("1", "Equity > Current Year Profits & Losses > Revenue > Sales", 500.0),
            row("2", "Equity > Current Year Profits & Losses > Cost of sales", -200.0),
        ]);

        let revenue = tree
            .find(&[
                GroupName::Equity,
                GroupName::ProfitsAndLosses,
                GroupName::LineItem(LineItem::Revenue),
            ])
            .unwrap();
        assert_eq!(revenue.totals.final_balance, 500.0);
        assert_eq!(revenue.leaf_ids(), vec!["LS_1".to_string()]);

        assert_eq!(tree.leaf("LS_2").unwrap().totals.final_balance, -200.0);
        assert!(tree.leaf("LS_3").is_none());
        assert!(tree.find(&[]).is_none());
        assert!(tree.find(&[GroupName::Assets]).is_none());
    }

    #[test]
    fn test_current_year_result_view_leaves_tree_untouched() {
        let tree = build_lead_sheets(&[row("1", "Assets > Current Assets > Cash", 5.0)]);
        let view = tree.with_current_year_result(-20.0, 30.0);

        assert!(tree.statement(&GroupName::Equity).is_none());

        let node = view
            .find(&[
                GroupName::Equity,
                GroupName::ProfitsAndLosses,
                GroupName::CurrentYearResult,
            ])
            .unwrap();
        assert_eq!(node.level, GroupLevel::Grouping3);
        assert_eq!(node.totals.final_balance, 30.0);
        assert_eq!(node.totals.current_year, 30.0);
        assert_eq!(node.totals.prior_year, -20.0);
        assert!(node.children.is_empty());
        assert!(node.id.is_none());

        let equity = view.statement(&GroupName::Equity).unwrap();
        assert_eq!(equity.totals, Totals::default());
    }

    #[test]
    fn test_tree_serialization_shape() {
        let tree = build_lead_sheets(&[row("r1", "Assets > Current Assets > Cash", 5.0)]);
        let json = serde_json::to_value(&tree).unwrap();

        assert_eq!(json[0]["level"], "grouping1");
        assert_eq!(json[0]["group"], "Assets");
        assert!(json[0].get("id").is_none());
        let leaf = &json[0]["children"][0]["children"][0]["children"][0];
        assert_eq!(leaf["level"], "grouping4");
        assert_eq!(leaf["group"], "_direct_");
        assert_eq!(leaf["id"], "LS_1");
        assert_eq!(leaf["rows"][0], "r1");
        assert_eq!(leaf["totals"]["finalBalance"], 5.0);
    }
}
