use etb_statements::{extract_etb_data, EtbRow, LeadSheetNode};
use serde::Deserialize;

const TRIAL_BALANCE_CSV: &str = "\
id,classification,currentYear,priorYear,adjustments,reclassification
1000,Assets > Current Assets > Cash and cash equivalents > Bank,182340,100210,-1200,
1100,Assets > Current Assets > Trade receivables,64500,58450,,-4000
1500,Assets > Non-current Assets > Property plant and equipment > Computers,22000,25000,,
2000,Liabilities > Current Liabilities > Trade payables,-31000,-28500,,
2100,Liabilities > Current Liabilities > Accruals,-6000,-5000,,4000
3000,Equity > Equity > Share capital,-10000,-10000,,
3100,Equity > Equity > Retained earnings,-140160,-140160,,
4000,Equity > Current Year Profits & Losses > Revenue > Professional fees,-240000,-210000,,
5000,Equity > Current Year Profits & Losses > Cost of sales > Subcontractors,95000,80000,,
6000,Equity > Current Year Profits & Losses > Administrative expenses > Rent,36000,36000,,
6100,Equity > Current Year Profits & Losses > Administrative expenses > Software,8820,7000,1200,
7000,Equity > Current Year Profits & Losses > Finance costs,1500,1700,,
8000,Equity > Current Year Profits & Losses > Income tax expense,17000,14000,,
9999,Suspense,123,,,
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    id: String,
    classification: String,
    current_year: Option<f64>,
    prior_year: Option<f64>,
    adjustments: Option<f64>,
    reclassification: Option<f64>,
}

impl From<CsvRow> for EtbRow {
    fn from(row: CsvRow) -> Self {
        EtbRow::new(row.id, row.classification)
            .with_current_year(row.current_year.unwrap_or(0.0))
            .with_prior_year(row.prior_year.unwrap_or(0.0))
            .with_adjustments(row.adjustments.unwrap_or(0.0))
            .with_reclassification(row.reclassification.unwrap_or(0.0))
    }
}

fn print_node(node: &LeadSheetNode, depth: usize) {
    let id = node.id.as_deref().unwrap_or("");
    println!(
        "{:indent$}{:<40} {:>6} {:>14.0} {:>14.0}",
        "",
        node.group.label(),
        id,
        node.totals.final_balance,
        node.totals.prior_year,
        indent = depth * 2
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = csv::Reader::from_reader(TRIAL_BALANCE_CSV.as_bytes());
    let rows = reader
        .deserialize::<CsvRow>()
        .map(|record| record.map(EtbRow::from))
        .collect::<Result<Vec<_>, _>>()?;

    let result = extract_etb_data(&rows, 2024);

    println!("Lead sheets (current, prior):");
    for node in result.lead_sheets.nodes() {
        print_node(node, 0);
    }

    for statement in [
        &result.income_statement.prior_year,
        &result.income_statement.current_year,
    ] {
        println!(
            "\nIncome statement {}: gross {:.0}, operating {:.0}, before tax {:.0}, {:?} {:.0}",
            statement.period.year,
            statement.gross_profit,
            statement.operating_profit,
            statement.profit_before_tax,
            statement.result_type,
            statement.net_result
        );
        for (line, summary) in &statement.breakdowns {
            println!("  {:<35} {:>12.0} {:?}", line, summary.value, summary.accounts);
        }
    }

    for sheet in [
        &result.balance_sheet.prior_year,
        &result.balance_sheet.current_year,
    ] {
        println!(
            "\nBalance sheet {}: assets {:.0} = liabilities {:.0} + equity {:.0} -> balanced: {}",
            sheet.period.year,
            sheet.totals.assets.value,
            sheet.totals.liabilities.value,
            sheet.totals.equity.value,
            sheet.balanced
        );
    }

    println!(
        "\nRetained earnings carried forward: {:.0}",
        result.retained_earnings.current_year.value
    );

    Ok(())
}
