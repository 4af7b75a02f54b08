use crate::pipeline::PipelineResults;
use anyhow::anyhow;
use csv::WriterBuilder;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

pub const DERIVED_ROWS_KEY: &str = "derived_rows";
pub const MONTHLY_SUMMARY_KEY: &str = "monthly_summary";

const OUTPUT_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub trait Output: Debug {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write>;
    /// Whether this output can be considered a no-op, so that code which only
    /// writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    /// `file_template` has a single `{}` placeholder which receives the location key.
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        let file_name = formatx!(&self.file_template, location_key)
            .map_err(|err| anyhow!("Output file template could not be filled: {err:?}"))?;
        Ok(BufWriter::new(File::create(
            self.directory_path.join(file_name),
        )?))
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Write the derived rows (restricted to the requested date range) and the monthly summary.
pub fn write_results(output: &impl Output, results: &PipelineResults) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    write_derived_rows(output, results)?;
    write_monthly_summary(output, results)?;

    Ok(())
}

fn write_derived_rows(output: &impl Output, results: &PipelineResults) -> anyhow::Result<()> {
    info!("writing out to {DERIVED_ROWS_KEY}");
    let writer = output.writer_for_location_key(DERIVED_ROWS_KEY)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record([
        "Timestamp",
        "Solar generated",
        "House consumption",
        "Generation density",
        "Generation",
        "Solar consumed",
        "Solar exported",
        "Grid consumed",
        "Day type",
        "Tariff period",
        "Tariff",
        "Revenue feed-in",
        "Savings solar",
        "Bill reduction",
    ])?;
    writer.write_record([
        "[datetime]", "[W]", "[kW]", "[W/m2]", "[kW]", "[kW]", "[kW]", "[kW]", "", "",
        "[c/kWh]", "[$]", "[$]", "[$]",
    ])?;

    for row in results.rows_in_range() {
        writer.write_record([
            row.timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            row.solar_generated.to_string(),
            row.house_consumption.to_string(),
            row.generation_density.to_string(),
            row.generation.to_string(),
            row.self_consumed.to_string(),
            row.exported.to_string(),
            row.grid_drawn.to_string(),
            row.day_type.to_string(),
            row.tariff_period.to_string(),
            row.tariff_rate.to_string(),
            row.feed_in_revenue.to_string(),
            row.solar_savings.to_string(),
            row.bill_reduction.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_monthly_summary(output: &impl Output, results: &PipelineResults) -> anyhow::Result<()> {
    info!("writing out to {MONTHLY_SUMMARY_KEY}");
    let writer = output.writer_for_location_key(MONTHLY_SUMMARY_KEY)?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record([
        "Month",
        "Intervals",
        "Generation",
        "Solar consumed",
        "Solar exported",
        "Grid consumed",
        "Revenue feed-in",
        "Savings solar",
        "Bill reduction",
    ])?;
    writer.write_record([
        "", "[count]", "[kW]", "[kW]", "[kW]", "[kW]", "[$]", "[$]", "[$]",
    ])?;

    for summary in &results.monthly {
        writer.write_record([
            summary.month.to_string(),
            summary.rows.to_string(),
            summary.generation.to_string(),
            summary.self_consumed.to_string(),
            summary.exported.to_string(),
            summary.grid_drawn.to_string(),
            summary.feed_in_revenue.to_string(),
            summary.solar_savings.to_string(),
            summary.bill_reduction.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
