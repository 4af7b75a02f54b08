use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolarPanelError {
    #[error("Readings could not be read: {0}")]
    MalformedInput(#[from] MalformedInputError),
    #[error("Sampling interval could not be derived: {0}")]
    IrregularSampling(#[from] IrregularSamplingError),
    #[error("Derived energy flows were not finite: {0}")]
    NonFiniteFlow(#[from] NonFiniteFlowError),
    #[error("Payback could not be calculated: {0}")]
    Payback(#[from] PaybackError),
    #[error("Parameter set was rejected: {0}")]
    InvalidParameter(#[from] InvalidParameterError),
    #[error("Tariff schedule was rejected: {0}")]
    InvalidSchedule(#[from] InvalidScheduleError),
}

/// Raised while turning raw spreadsheet cells into typed readings.
///
/// Row numbers are 1-based and count data rows only (the header row is not counted).
#[derive(Debug, Error)]
pub enum MalformedInputError {
    #[error("Required column '{column}' was not found in the header")]
    MissingColumn { column: String },
    #[error("Row {row} has {found} cells but the header has {expected} columns")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    UnparsableNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Row {row}, column '{column}': readings must not be negative (got {value})")]
    NegativeReading {
        row: usize,
        column: String,
        value: f64,
    },
    #[error("Row {row}, column '{column}': '{value}' is not a timestamp in day/month/year hour:minute:second format")]
    UnparsableTimestamp {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Reading CSV failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum IrregularSamplingError {
    #[error("At least two readings are needed to derive a sampling interval, but {rows} were given")]
    TooFewRows { rows: usize },
    #[error("The first two readings are not in increasing time order ({minutes} minutes apart)")]
    NonIncreasing { minutes: f64 },
}

/// A reading so large that scaling it up to the installed area overflows.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error(
    "Row {row}: solar reading {solar_generated} gives non-finite flows for an installed area of {installed_area}"
)]
pub struct NonFiniteFlowError {
    pub row: usize,
    pub solar_generated: f64,
    pub installed_area: f64,
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum PaybackError {
    #[error(transparent)]
    NonPositiveSavings(#[from] NonPositiveSavingsError),
    #[error("Installation cost must be a finite, non-negative amount (got {total_cost})")]
    InvalidCost { total_cost: f64 },
    #[error("Annual savings must be finite (got {annual_savings})")]
    NonFiniteSavings { annual_savings: f64 },
    #[error("A payback of {years} years is too long to express")]
    TooLong { years: f64 },
}

#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("Annual savings of {annual_savings} do not pay back an installation costing {total_cost}")]
pub struct NonPositiveSavingsError {
    pub total_cost: f64,
    pub annual_savings: f64,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidParameterError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must be a number (got '{raw}')")]
    NotNumeric { field: &'static str, raw: String },
    #[error("installation cost of {installed_area} m2 at {panel_cost_per_area} per m2 is not a finite amount")]
    InstallationCostNotFinite {
        installed_area: f64,
        panel_cost_per_area: f64,
    },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidScheduleError {
    #[error("Rule {index} covers hours {start_hour}..{end_hour}, which is not a range within 0..24")]
    BadHours {
        index: usize,
        start_hour: u32,
        end_hour: u32,
    },
    #[error("Rule {index} does not apply to any day of the week")]
    NoDays { index: usize },
}
