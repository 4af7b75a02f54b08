use crate::errors::MalformedInputError;
use chrono::NaiveDateTime;
use csv::ReaderBuilder as CsvReaderBuilder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{debug, warn};

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
/// Only this many leading characters of a timestamp cell are significant.
pub const TIMESTAMP_SIGNIFICANT_CHARS: usize = 19;

/// The columns the calculation refers to, independently of what the source sheet calls them.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SemanticColumn {
    #[strum(serialize = "timestamp")]
    Timestamp,
    #[strum(serialize = "solar generated")]
    SolarGenerated,
    #[strum(serialize = "house consumption")]
    HouseConsumption,
}

/// Source header names for each semantic column.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub timestamp: String,
    pub solar_generated: String,
    pub house_consumption: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp: "Timestamp".into(),
            solar_generated: "Solar power generated (W)".into(),
            house_consumption: "House(kW)".into(),
        }
    }
}

impl ColumnMapping {
    pub fn source_name(&self, column: SemanticColumn) -> &str {
        match column {
            SemanticColumn::Timestamp => &self.timestamp,
            SemanticColumn::SolarGenerated => &self.solar_generated,
            SemanticColumn::HouseConsumption => &self.house_consumption,
        }
    }

    fn to_map(&self) -> IndexMap<SemanticColumn, String> {
        SemanticColumn::iter()
            .map(|column| (column, self.source_name(column).to_owned()))
            .collect()
    }

    /// Position of every semantic column in the given header row.
    fn locate<H: AsRef<str>>(
        &self,
        header: &[H],
    ) -> Result<IndexMap<SemanticColumn, usize>, MalformedInputError> {
        SemanticColumn::iter()
            .map(|column| {
                let source_name = self.source_name(column);
                header
                    .iter()
                    .position(|heading| heading.as_ref().trim() == source_name)
                    .map(|idx| (column, idx))
                    .ok_or_else(|| MalformedInputError::MissingColumn {
                        column: source_name.to_owned(),
                    })
            })
            .collect()
    }
}

/// One sampled interval.
///
/// `solar_generated` is the power (W) measured on the reference panel and
/// `house_consumption` is household demand in kW.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub solar_generated: f64,
    pub house_consumption: f64,
}

impl Reading {
    /// Measured generation per unit of panel area, in W/m2.
    pub fn generation_density(&self, panel_reference_area: f64) -> f64 {
        self.solar_generated / panel_reference_area
    }
}

/// Typed readings built once per data fetch; never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadingTable {
    readings: Vec<Reading>,
    columns: IndexMap<SemanticColumn, String>,
}

impl ReadingTable {
    /// Build a table from a header row and data rows of raw cells.
    pub fn from_rows<H, R, S>(
        header: &[H],
        rows: impl IntoIterator<Item = R>,
        mapping: &ColumnMapping,
    ) -> Result<Self, MalformedInputError>
    where
        H: AsRef<str>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut rows = rows.into_iter().peekable();
        if rows.peek().is_none() {
            warn!("No data found.");
            return Ok(Self::empty(mapping));
        }

        let positions = mapping.locate(header)?;

        let readings = rows
            .enumerate()
            .map(|(idx, row)| {
                let row = row.as_ref();
                let row_number = idx + 1;
                if row.len() < header.len() {
                    return Err(MalformedInputError::ShortRow {
                        row: row_number,
                        expected: header.len(),
                        found: row.len(),
                    });
                }
                Ok(Reading {
                    timestamp: parse_timestamp(
                        row[positions[&SemanticColumn::Timestamp]].as_ref(),
                        row_number,
                        mapping.source_name(SemanticColumn::Timestamp),
                    )?,
                    solar_generated: parse_reading(
                        row[positions[&SemanticColumn::SolarGenerated]].as_ref(),
                        row_number,
                        mapping.source_name(SemanticColumn::SolarGenerated),
                    )?,
                    house_consumption: parse_reading(
                        row[positions[&SemanticColumn::HouseConsumption]].as_ref(),
                        row_number,
                        mapping.source_name(SemanticColumn::HouseConsumption),
                    )?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("parsed {} readings", readings.len());

        Ok(Self {
            readings,
            columns: mapping.to_map(),
        })
    }

    /// Build a table from sheet values where the first row holds the headers.
    ///
    /// A sheet with no rows at all is the data source's "no rows" signal and gives an empty table.
    pub fn from_sheet<S: AsRef<str>>(
        values: &[Vec<S>],
        mapping: &ColumnMapping,
    ) -> Result<Self, MalformedInputError> {
        match values.split_first() {
            Some((header, rows)) => Self::from_rows(header.as_slice(), rows, mapping),
            None => {
                warn!("No data found.");
                Ok(Self::empty(mapping))
            }
        }
    }

    /// Build a table from a CSV export of the sheet, header row first.
    pub fn from_csv(csv: impl Read, mapping: &ColumnMapping) -> Result<Self, MalformedInputError> {
        let mut reader = CsvReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(csv);
        let records = reader
            .records()
            .collect::<Result<Vec<csv::StringRecord>, _>>()?;
        let values = records
            .iter()
            .map(|record| record.iter().collect::<Vec<&str>>())
            .collect::<Vec<_>>();

        Self::from_sheet(&values, mapping)
    }

    fn empty(mapping: &ColumnMapping) -> Self {
        Self {
            readings: vec![],
            columns: mapping.to_map(),
        }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Semantic column name to the source header it was read from.
    pub fn column_mapping(&self) -> &IndexMap<SemanticColumn, String> {
        &self.columns
    }

    /// The latest `count` readings, oldest first.
    pub fn recent(&self, count: usize) -> &[Reading] {
        &self.readings[self.readings.len().saturating_sub(count)..]
    }

    /// Readings with `start <= timestamp <= end`.
    pub fn in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Iterator<Item = &Reading> + '_ {
        self.readings
            .iter()
            .filter(move |reading| (start..=end).contains(&reading.timestamp))
    }
}

pub fn parse_timestamp(
    cell: &str,
    row: usize,
    column: &str,
) -> Result<NaiveDateTime, MalformedInputError> {
    let significant = match cell.char_indices().nth(TIMESTAMP_SIGNIFICANT_CHARS) {
        Some((byte_idx, _)) => &cell[..byte_idx],
        None => cell,
    };
    NaiveDateTime::parse_from_str(significant.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        MalformedInputError::UnparsableTimestamp {
            row,
            column: column.to_owned(),
            value: cell.to_owned(),
        }
    })
}

fn parse_reading(cell: &str, row: usize, column: &str) -> Result<f64, MalformedInputError> {
    let value = cell
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| MalformedInputError::UnparsableNumber {
            row,
            column: column.to_owned(),
            value: cell.to_owned(),
        })?;
    if value < 0. {
        return Err(MalformedInputError::NegativeReading {
            row,
            column: column.to_owned(),
            value,
        });
    }
    Ok(value)
}
