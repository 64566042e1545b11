use crate::error::{EtbError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Last calendar day of the month, or `None` when the year is outside the
/// range chrono can represent.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year.checked_add(1)? } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(EtbError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// The date a fiscal year's statements are drawn up to.
pub fn fiscal_year_end_date(year: i32, fiscal_year_end_month: u32) -> Option<NaiveDate> {
    last_day_of_month(year, fiscal_year_end_month)
}

/// Start of the fiscal year that ends on `fiscal_year_end`.
pub fn fiscal_year_start(fiscal_year_end: NaiveDate) -> Option<NaiveDate> {
    let start_month = if fiscal_year_end.month() == 12 {
        1
    } else {
        fiscal_year_end.month() + 1
    };
    let start_year = if fiscal_year_end.month() == 12 {
        fiscal_year_end.year()
    } else {
        fiscal_year_end.year() - 1
    };

    NaiveDate::from_ymd_opt(start_year, start_month, 1)
}
