extern crate solarpanel;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use clap::Parser;
use solarpanel::core::billing::MonthGrouping;
use solarpanel::input::{DateRange, ParameterField, SolarPanelConfig};
use solarpanel::output::FileOutput;
use solarpanel::reading_table::TIMESTAMP_FORMAT;
use solarpanel::run_project;
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct SolarPanelArgs {
    /// CSV export of the readings sheet
    readings_file: String,
    /// JSON configuration file
    #[arg(long, short)]
    config: Option<String>,
    /// Installed panel area in m2
    #[arg(long)]
    area: Option<String>,
    /// Panel cost per m2
    #[arg(long)]
    panel_cost: Option<String>,
    /// Feed-in tariff in c/kWh
    #[arg(long)]
    feed_in: Option<String>,
    #[arg(long)]
    offpeak: Option<String>,
    #[arg(long)]
    shoulder: Option<String>,
    #[arg(long)]
    peak: Option<String>,
    /// First reading to include in the derived rows output, as dd/mm/yyyy HH:MM:SS
    #[arg(long, value_parser = parse_timestamp_arg, requires = "end")]
    start: Option<NaiveDateTime>,
    /// Last reading to include in the derived rows output, as dd/mm/yyyy HH:MM:SS
    #[arg(long, value_parser = parse_timestamp_arg, requires = "start")]
    end: Option<NaiveDateTime>,
    /// Group the monthly summary by month number only, merging years
    #[clap(long, default_value_t = false)]
    legacy_months: bool,
    /// Directory for the result CSV files; defaults to the readings file's directory
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
    #[clap(long, default_value_t = false)]
    log_spans: bool,
}

fn parse_timestamp_arg(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|err| err.to_string())
}

fn main() -> anyhow::Result<()> {
    let args = SolarPanelArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(tracing::Level::DEBUG);

        if args.log_spans {
            builder = builder.with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)
        .map_err(|err| anyhow!("setting tracing subscriber failed: {err}"))?;

    let readings_file = Path::new(args.readings_file.as_str());
    let file_stem = readings_file
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("readings");
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => readings_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let output = FileOutput::new(output_dir, format!("{file_stem}_{{}}.csv"));
    debug!("writing results with {output:?}");

    let config_file = args
        .config
        .as_deref()
        .map(File::open)
        .transpose()?
        .map(BufReader::new);

    let results = run_project(
        BufReader::new(File::open(readings_file)?),
        config_file,
        |config| apply_overrides(config, &args),
        output,
    )?;

    println!("Sampling interval: {} minutes", results.interval.minutes());
    for summary in &results.monthly {
        println!(
            "{:>7}  generation {:.3} kW  exported {:.3} kW  grid {:.3} kW  bill reduction ${:.2}",
            summary.month.to_string(),
            summary.generation,
            summary.exported,
            summary.grid_drawn,
            summary.bill_reduction
        );
    }
    match &results.payback {
        Ok(payback) => println!("{payback}"),
        Err(err) => println!("Payback not calculable: {err}"),
    }

    Ok(())
}

fn apply_overrides(config: &mut SolarPanelConfig, args: &SolarPanelArgs) -> anyhow::Result<()> {
    let overrides = [
        (ParameterField::InstalledArea, &args.area),
        (ParameterField::PanelCostPerArea, &args.panel_cost),
        (ParameterField::FeedInTariff, &args.feed_in),
        (ParameterField::OffpeakRate, &args.offpeak),
        (ParameterField::ShoulderRate, &args.shoulder),
        (ParameterField::PeakRate, &args.peak),
    ];
    for (field, raw) in overrides {
        if let Some(raw) = raw {
            config.parameters.set_from_str(field, raw)?;
        }
    }

    if let (Some(start), Some(end)) = (args.start, args.end) {
        config.date_range = Some(DateRange { start, end });
    }
    if args.legacy_months {
        config.month_grouping = MonthGrouping::MonthOnly;
    }

    Ok(())
}
