use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtbError {
    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Invalid balance tolerance {0}: must be a finite number greater than 0.0")]
    InvalidBalanceTolerance(f64),

    #[error("Invalid sign convention: {0}")]
    InvalidSignConvention(String),

    #[error("Accounting equation violation for {year}: Assets ({assets}) != Liabilities ({liabilities}) + Equity ({equity}), difference {difference}")]
    AccountingEquationViolation {
        year: i32,
        assets: f64,
        liabilities: f64,
        equity: f64,
        difference: f64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EtbError>;
