use crate::core::units::MONTHS_PER_YEAR;
use crate::errors::{NonPositiveSavingsError, PaybackError};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Time for cumulative bill savings to cover the installation cost.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PaybackEstimate {
    pub years: u64,
    /// Remaining fraction of a year, expressed in months.
    pub months: f64,
    pub total_cost: f64,
    pub annual_savings: f64,
}

impl PaybackEstimate {
    /// Payback duration as a (fractional) number of years.
    pub fn total_years(&self) -> f64 {
        self.years as f64 + self.months / MONTHS_PER_YEAR as f64
    }
}

pub fn installation_cost(installed_area: f64, panel_cost_per_area: f64) -> f64 {
    installed_area * panel_cost_per_area
}

/// Years needed for `annual_savings` to cover `total_cost`.
///
/// Refuses, rather than returning an infinite, NaN or truncated duration,
/// when savings are not positive, either amount is not finite, the cost is
/// negative, or the whole number of years would not fit in a `u64`.
pub fn estimate_payback(
    total_cost: f64,
    annual_savings: f64,
) -> Result<PaybackEstimate, PaybackError> {
    if !total_cost.is_finite() || total_cost < 0. {
        return Err(PaybackError::InvalidCost { total_cost });
    }
    // also rejects NaN savings
    if !(annual_savings > 0.) {
        return Err(NonPositiveSavingsError {
            total_cost,
            annual_savings,
        }
        .into());
    }
    if !annual_savings.is_finite() {
        return Err(PaybackError::NonFiniteSavings { annual_savings });
    }

    let payback = total_cost / annual_savings;
    // u64::MAX as f64 rounds up to 2^64, so anything below it converts exactly
    if !payback.is_finite() || payback >= u64::MAX as f64 {
        return Err(PaybackError::TooLong { years: payback });
    }
    let years = payback.floor();

    Ok(PaybackEstimate {
        years: years as u64,
        months: (payback - years) * MONTHS_PER_YEAR as f64,
        total_cost,
        annual_savings,
    })
}

impl Display for PaybackEstimate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The payback period is {} years and {:.0} month(s), with annual savings of ${}",
            self.years,
            self.months,
            format_currency(self.annual_savings)
        )
    }
}

/// Two decimal places with comma thousands separators, e.g. 12,345.68
pub fn format_currency(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let digits = whole.len();
    let grouped = whole
        .chars()
        .enumerate()
        .fold(String::with_capacity(digits + digits / 3), |mut acc, (idx, digit)| {
            if idx > 0 && (digits - idx) % 3 == 0 {
                acc.push(',');
            }
            acc.push(digit);
            acc
        });
    let sign = if amount < 0. { "-" } else { "" };

    format!("{sign}{grouped}.{fraction}")
}
