use crate::core::energy_flow::{EnergyFlows, FlowSeries};
use crate::core::tariff::{DayType, TariffPeriod, TariffSchedule};
use crate::core::units::{cents_to_currency, energy_over_interval};
use crate::reading_table::{Reading, ReadingTable};
use crate::sampling::SamplingInterval;
use chrono::{Datelike, NaiveDateTime};
use fsum::FSum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Grid import rates in cents/kWh for each tariff period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TariffRates {
    pub offpeak: f64,
    pub shoulder: f64,
    pub peak: f64,
}

impl TariffRates {
    pub fn rate_for(&self, period: TariffPeriod) -> f64 {
        match period {
            TariffPeriod::Offpeak => self.offpeak,
            TariffPeriod::Shoulder => self.shoulder,
            TariffPeriod::Peak => self.peak,
        }
    }
}

/// Value in currency of a power flow (kW) held for one interval at a rate in cents/kWh.
pub fn interval_value(power_kw: f64, interval: SamplingInterval, rate_cents: f64) -> f64 {
    cents_to_currency(energy_over_interval(power_kw, interval.minutes()) * rate_cents)
}

/// A reading together with everything computed from it.
///
/// Flow fields are in kW (as measured over the interval), monetary fields in currency units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedRow {
    pub timestamp: NaiveDateTime,
    pub solar_generated: f64,
    pub house_consumption: f64,
    pub generation_density: f64,
    pub generation: f64,
    pub self_consumed: f64,
    pub exported: f64,
    pub grid_drawn: f64,
    pub day_type: DayType,
    pub tariff_period: TariffPeriod,
    pub tariff_rate: f64,
    pub feed_in_revenue: f64,
    pub solar_savings: f64,
    pub bill_reduction: f64,
}

impl DerivedRow {
    pub fn new(
        reading: &Reading,
        flows: &EnergyFlows,
        schedule: &TariffSchedule,
        rates: &TariffRates,
        feed_in_tariff: f64,
        interval: SamplingInterval,
    ) -> Self {
        let tariff_period = schedule.classify(reading.timestamp);
        let tariff_rate = rates.rate_for(tariff_period);
        let feed_in_revenue = interval_value(flows.exported, interval, feed_in_tariff);
        let solar_savings = interval_value(flows.self_consumed, interval, tariff_rate);

        Self {
            timestamp: reading.timestamp,
            solar_generated: reading.solar_generated,
            house_consumption: reading.house_consumption,
            generation_density: flows.generation_density,
            generation: flows.generation,
            self_consumed: flows.self_consumed,
            exported: flows.exported,
            grid_drawn: flows.grid_drawn,
            day_type: DayType::of(reading.timestamp),
            tariff_period,
            tariff_rate,
            feed_in_revenue,
            solar_savings,
            bill_reduction: feed_in_revenue + solar_savings,
        }
    }
}

/// Join readings with their flows and price every interval.
pub fn derive_rows(
    table: &ReadingTable,
    series: &FlowSeries,
    schedule: &TariffSchedule,
    rates: &TariffRates,
    feed_in_tariff: f64,
) -> Vec<DerivedRow> {
    table
        .readings()
        .iter()
        .zip(series.flows.iter())
        .map(|(reading, flows)| {
            DerivedRow::new(
                reading,
                flows,
                schedule,
                rates,
                feed_in_tariff,
                series.interval,
            )
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthGrouping {
    /// Separate summaries for the same month in different years.
    #[default]
    YearMonth,
    /// Merge every row with the same month number regardless of year (legacy
    /// behaviour). Only meaningful for single-year datasets.
    MonthOnly,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MonthKey {
    pub year: Option<i32>,
    pub month: u32,
}

impl MonthKey {
    pub fn of(timestamp: NaiveDateTime, grouping: MonthGrouping) -> Self {
        Self {
            year: match grouping {
                MonthGrouping::YearMonth => Some(timestamp.year()),
                MonthGrouping::MonthOnly => None,
            },
            month: timestamp.month(),
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{year}-{:02}", self.month),
            None => write!(f, "{}", self.month),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: MonthKey,
    pub rows: usize,
    pub generation: f64,
    pub self_consumed: f64,
    pub exported: f64,
    pub grid_drawn: f64,
    pub feed_in_revenue: f64,
    pub solar_savings: f64,
    pub bill_reduction: f64,
}

impl MonthlySummary {
    fn from_rows(month: MonthKey, rows: &[&DerivedRow]) -> Self {
        // exactly rounded sums, so the result does not depend on row order
        let sum = |field: fn(&DerivedRow) -> f64| {
            FSum::with_all(rows.iter().map(|row| field(row))).value()
        };

        Self {
            month,
            rows: rows.len(),
            generation: sum(|row| row.generation),
            self_consumed: sum(|row| row.self_consumed),
            exported: sum(|row| row.exported),
            grid_drawn: sum(|row| row.grid_drawn),
            feed_in_revenue: sum(|row| row.feed_in_revenue),
            solar_savings: sum(|row| row.solar_savings),
            bill_reduction: sum(|row| row.bill_reduction),
        }
    }
}

/// One summary per month present in `rows`, ordered by month.
pub fn aggregate_monthly(rows: &[DerivedRow], grouping: MonthGrouping) -> Vec<MonthlySummary> {
    rows.iter()
        .into_group_map_by(|row| MonthKey::of(row.timestamp, grouping))
        .into_iter()
        .sorted_by_key(|(month, _)| *month)
        .map(|(month, rows)| MonthlySummary::from_rows(month, &rows))
        .collect()
}

pub fn total_bill_reduction(rows: &[DerivedRow]) -> f64 {
    FSum::with_all(rows.iter().map(|row| row.bill_reduction)).value()
}
