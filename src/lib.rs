#[macro_use]
extern crate is_close;

mod compare_floats;
pub mod core;
pub mod errors;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod reading_table;
pub mod sampling;
#[cfg(test)]
mod tests;

pub use crate::core::billing::{DerivedRow, MonthGrouping, MonthKey, MonthlySummary};
pub use crate::core::payback::PaybackEstimate;
pub use crate::core::tariff::{classify, DayType, TariffPeriod, TariffSchedule};
pub use crate::errors::SolarPanelError;
pub use crate::input::{ParameterSet, PipelineOptions, SolarPanelConfig};
pub use crate::pipeline::{evaluate_batch, run_pipeline, MemoizedPipeline, PipelineResults};
pub use crate::reading_table::{ColumnMapping, ReadingTable};
use crate::input::ingest_config;
use crate::output::{write_results, Output};
use std::io::Read;
use tracing::info;

/// Read a CSV export of the readings sheet, run the calculation with the
/// given configuration and write the result tables to `output`.
pub fn run_project(
    readings: impl Read,
    config: Option<impl Read>,
    overrides: impl FnOnce(&mut SolarPanelConfig) -> anyhow::Result<()>,
    output: impl Output,
) -> Result<PipelineResults, anyhow::Error> {
    let mut config = match config {
        Some(json) => ingest_config(json)?,
        None => SolarPanelConfig::default(),
    };
    overrides(&mut config)?;

    let table = ReadingTable::from_csv(readings, &config.columns)?;
    info!("read {} readings", table.len());
    let recent = table.recent(config.recent_readings);
    if let (Some(first), Some(last)) = (recent.first(), recent.last()) {
        info!(
            "latest {} readings run from {} to {}",
            recent.len(),
            first.timestamp,
            last.timestamp
        );
    }

    let results = run_pipeline(&table, &config.parameters, &config.pipeline_options())?;
    write_results(&output, &results)?;

    Ok(results)
}
