use crate::classification::parse_classification;
use crate::error::Result;
use crate::schema::{EtbRow, SignConventions};
use log::debug;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts numbers and numeric strings; anything else is worth 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_amount).unwrap_or(0.0))
}

pub(crate) fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text,
        _ => String::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EtbPayload {
    Rows(Vec<EtbRow>),
    Wrapped {
        #[serde(alias = "etb")]
        rows: Vec<EtbRow>,
    },
}

/// Parses trial balance rows from either a bare JSON array or an object
/// holding the array under `rows` (or `etb`).
pub fn parse_etb_json(json: &str) -> Result<Vec<EtbRow>> {
    let rows = match serde_json::from_str::<EtbPayload>(json)? {
        EtbPayload::Rows(rows) => rows,
        EtbPayload::Wrapped { rows } => rows,
    };
    debug!("Parsed {} trial balance rows", rows.len());
    Ok(rows)
}

/// Whole units, halves rounded toward positive infinity (-2.5 becomes -2).
fn round_amount(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn apply_sign(value: f64, sign: f64) -> f64 {
    // + 0.0 folds -0.0 into 0.0
    round_amount(value) * sign + 0.0
}

/// Rounds the amounts, applies the normal-balance sign of the row's grouping1
/// and recomputes `final_balance`. Not idempotent: every call flips
/// credit-normal rows again.
pub fn normalize_row(row: &EtbRow, conventions: &SignConventions) -> EtbRow {
    let classification = parse_classification(&row.classification);
    let sign = conventions.multiplier(classification.grouping1.as_deref());

    let current_year = apply_sign(row.current_year, sign);
    let prior_year = apply_sign(row.prior_year, sign);
    let adjustments = apply_sign(row.adjustments, sign);
    let reclassification = apply_sign(row.reclassification, sign);

    EtbRow {
        current_year,
        prior_year,
        adjustments,
        reclassification,
        final_balance: current_year + adjustments + reclassification,
        ..row.clone()
    }
}

pub fn normalize_etb(rows: &[EtbRow], conventions: &SignConventions) -> Vec<EtbRow> {
    rows.iter()
        .map(|row| normalize_row(row, conventions))
        .collect()
}
