use crate::core::billing::{
    aggregate_monthly, derive_rows, total_bill_reduction, DerivedRow, MonthlySummary,
};
use crate::core::energy_flow::calculate_flows;
use crate::core::payback::{estimate_payback, PaybackEstimate};
use crate::errors::{PaybackError, SolarPanelError};
use crate::input::{DateRange, ParameterField, ParameterSet, PipelineOptions};
use crate::reading_table::ReadingTable;
use crate::sampling::SamplingInterval;
use indexmap::IndexMap;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

/// Everything one recomputation produces for the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineResults {
    pub parameters: ParameterSet,
    pub interval: SamplingInterval,
    /// One row per reading, in the table's order.
    pub rows: Vec<DerivedRow>,
    pub monthly: Vec<MonthlySummary>,
    /// Total bill reduction over the whole table, which is taken to span one year.
    pub annual_savings: f64,
    pub payback: Result<PaybackEstimate, PaybackError>,
    date_range: Option<DateRange>,
}

impl PipelineResults {
    /// Derived rows restricted to the requested date range, or all rows when none was given.
    pub fn rows_in_range(&self) -> impl Iterator<Item = &DerivedRow> + '_ {
        self.rows.iter().filter(move |row| {
            self.date_range
                .map_or(true, |range| range.contains(row.timestamp))
        })
    }

    pub fn date_range(&self) -> Option<DateRange> {
        self.date_range
    }
}

/// Run the whole calculation for one parameter set.
///
/// Fails without partial results when the parameters are invalid, the table
/// is too short to derive a sampling interval, or a reading overflows once
/// scaled to the installed area. A payback that cannot be
/// calculated is reported inside the results instead.
#[instrument(skip_all)]
pub fn run_pipeline(
    table: &ReadingTable,
    parameters: &ParameterSet,
    options: &PipelineOptions,
) -> Result<PipelineResults, SolarPanelError> {
    let parameters = parameters.validated()?;
    debug!("running pipeline over {} readings", table.len());

    let series = calculate_flows(
        table,
        parameters.installed_area,
        options.panel_reference_area,
    )?;
    let rows = derive_rows(
        table,
        &series,
        &options.schedule,
        &parameters.rates(),
        parameters.feed_in_tariff,
    );
    let monthly = aggregate_monthly(&rows, options.month_grouping);
    let annual_savings = total_bill_reduction(&rows);
    let payback = estimate_payback(parameters.installation_cost(), annual_savings);

    Ok(PipelineResults {
        parameters,
        interval: series.interval,
        rows,
        monthly,
        annual_savings,
        payback,
        date_range: options.date_range,
    })
}

/// Evaluate several parameter sets against one table in parallel; results come back in input order.
#[instrument(skip_all, fields(scenarios = parameter_sets.len()))]
pub fn evaluate_batch(
    table: &ReadingTable,
    parameter_sets: &[ParameterSet],
    options: &PipelineOptions,
) -> Vec<Result<PipelineResults, SolarPanelError>> {
    parameter_sets
        .par_iter()
        .map(|parameters| run_pipeline(table, parameters, options))
        .collect()
}

/// Bit patterns of the six parameters, so that `0.0` and `-0.0` are cached apart.
type ParameterKey = [u64; 6];

fn parameter_key(parameters: &ParameterSet) -> ParameterKey {
    let mut key = [0; 6];
    for (slot, field) in key.iter_mut().zip(ParameterField::iter()) {
        *slot = parameters.get(field).to_bits();
    }
    key
}

/// Caches results per parameter set for one shared table and fixed options.
///
/// Oldest entries are evicted first once `capacity` is reached. Failed runs are not cached.
#[derive(Debug)]
pub struct MemoizedPipeline {
    table: Arc<ReadingTable>,
    options: PipelineOptions,
    capacity: usize,
    cache: RwLock<IndexMap<ParameterKey, Arc<PipelineResults>>>,
}

impl MemoizedPipeline {
    pub fn new(table: Arc<ReadingTable>, options: PipelineOptions, capacity: usize) -> Self {
        Self {
            table,
            options,
            capacity,
            cache: Default::default(),
        }
    }

    pub fn table(&self) -> &Arc<ReadingTable> {
        &self.table
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.read().len()
    }

    pub fn run(&self, parameters: &ParameterSet) -> Result<Arc<PipelineResults>, SolarPanelError> {
        let key = parameter_key(parameters);
        if let Some(results) = self.cache.read().get(&key) {
            debug!("pipeline cache hit");
            return Ok(results.clone());
        }

        debug!("pipeline cache miss");
        let results = Arc::new(run_pipeline(&self.table, parameters, &self.options)?);
        if self.capacity > 0 {
            let mut cache = self.cache.write();
            while cache.len() >= self.capacity {
                cache.shift_remove_index(0);
            }
            cache.insert(key, results.clone());
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InvalidParameterError;
    use crate::reading_table::ColumnMapping;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn table() -> ReadingTable {
        let header = ["Timestamp", "Solar power generated (W)", "House(kW)"];
        let rows = [
            ["29/01/2018 08:00:00", "0.385", "1.0"],
            ["29/01/2018 08:30:00", "1.54", "0.5"],
            ["29/01/2018 09:00:00", "0.77", "1.0"],
            ["01/02/2018 22:00:00", "0", "0.2"],
        ];
        ReadingTable::from_rows(&header, &rows, &ColumnMapping::default()).unwrap()
    }

    #[rstest]
    fn should_run_whole_pipeline(table: ReadingTable) {
        let results = run_pipeline(&table, &ParameterSet::default(), &Default::default()).unwrap();

        assert_eq!(results.interval.minutes(), 30.);
        assert_eq!(results.rows.len(), 4);
        assert_eq!(results.monthly.len(), 2);
        assert_eq!(results.monthly[0].rows, 3);
        assert!(results.annual_savings > 0.);
        assert!(results.payback.is_ok());
        assert_eq!(results.rows_in_range().count(), 4);
    }

    #[rstest]
    fn should_reject_invalid_parameters_before_calculating(table: ReadingTable) {
        let parameters = ParameterSet {
            installed_area: -1.,
            ..Default::default()
        };
        assert!(matches!(
            run_pipeline(&table, &parameters, &Default::default()),
            Err(SolarPanelError::InvalidParameter(_))
        ));
    }

    #[rstest]
    fn should_reject_parameters_with_overflowing_cost(table: ReadingTable) {
        let parameters = ParameterSet {
            installed_area: 2.,
            panel_cost_per_area: f64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            run_pipeline(&table, &parameters, &Default::default()),
            Err(SolarPanelError::InvalidParameter(
                InvalidParameterError::InstallationCostNotFinite { .. }
            ))
        ));
    }

    #[rstest]
    fn should_report_insufficient_data_for_empty_table() {
        let header = ["Timestamp", "Solar power generated (W)", "House(kW)"];
        let rows: [[&str; 3]; 0] = [];
        let table = ReadingTable::from_rows(&header, &rows, &ColumnMapping::default()).unwrap();

        assert!(matches!(
            run_pipeline(&table, &ParameterSet::default(), &Default::default()),
            Err(SolarPanelError::IrregularSampling(_))
        ));
    }

    #[rstest]
    fn should_report_payback_not_calculable_without_savings(table: ReadingTable) {
        let parameters = ParameterSet {
            installed_area: 0.,
            ..Default::default()
        };
        let results = run_pipeline(&table, &parameters, &Default::default()).unwrap();
        assert_eq!(results.annual_savings, 0.);
        assert!(results.payback.is_err());
    }

    #[rstest]
    fn should_filter_rows_by_date_range_only(table: ReadingTable) {
        let options = PipelineOptions {
            date_range: Some(DateRange {
                start: "2018-01-29T08:30:00".parse().unwrap(),
                end: "2018-01-29T09:00:00".parse().unwrap(),
            }),
            ..Default::default()
        };
        let results = run_pipeline(&table, &ParameterSet::default(), &options).unwrap();

        assert_eq!(results.rows_in_range().count(), 2);
        assert_eq!(results.rows.len(), 4);
        assert_eq!(results.monthly.iter().map(|m| m.rows).sum::<usize>(), 4);
    }

    #[rstest]
    fn should_evaluate_batch_in_input_order(table: ReadingTable) {
        let parameter_sets = (1..=8)
            .map(|area| ParameterSet {
                installed_area: area as f64,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let options = PipelineOptions::default();
        let results = evaluate_batch(&table, &parameter_sets, &options);

        assert_eq!(results.len(), 8);
        for (parameters, result) in parameter_sets.iter().zip(results) {
            assert_eq!(
                result.unwrap(),
                run_pipeline(&table, parameters, &options).unwrap()
            );
        }
    }

    #[rstest]
    fn should_reuse_cached_results(table: ReadingTable) {
        let pipeline = MemoizedPipeline::new(Arc::new(table), Default::default(), 2);
        let parameters = ParameterSet::default();

        let first = pipeline.run(&parameters).unwrap();
        let second = pipeline.run(&parameters).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            *first,
            run_pipeline(pipeline.table(), &parameters, pipeline.options()).unwrap()
        );
    }

    #[rstest]
    fn should_evict_oldest_cached_results(table: ReadingTable) {
        let pipeline = MemoizedPipeline::new(Arc::new(table), Default::default(), 2);
        let parameters = |area: f64| ParameterSet {
            installed_area: area,
            ..Default::default()
        };

        let first = pipeline.run(&parameters(1.)).unwrap();
        pipeline.run(&parameters(2.)).unwrap();
        pipeline.run(&parameters(3.)).unwrap();
        assert_eq!(pipeline.cached_entries(), 2);
        assert!(!Arc::ptr_eq(&first, &pipeline.run(&parameters(1.)).unwrap()));
    }

    #[rstest]
    fn should_cache_signed_zero_parameters_separately(table: ReadingTable) {
        let pipeline = MemoizedPipeline::new(Arc::new(table), Default::default(), 4);
        let parameters = |installed_area: f64| ParameterSet {
            installed_area,
            ..Default::default()
        };

        let positive = pipeline.run(&parameters(0.)).unwrap();
        let negative = pipeline.run(&parameters(-0.)).unwrap();
        assert!(!Arc::ptr_eq(&positive, &negative));
        assert_eq!(pipeline.cached_entries(), 2);
        assert!(negative.parameters.installed_area.is_sign_negative());
        assert!(positive.parameters.installed_area.is_sign_positive());
    }

    #[rstest]
    fn should_not_cache_failures(table: ReadingTable) {
        let pipeline = MemoizedPipeline::new(Arc::new(table), Default::default(), 2);
        let parameters = ParameterSet {
            peak_rate: f64::NAN,
            ..Default::default()
        };
        assert!(pipeline.run(&parameters).is_err());
        assert_eq!(pipeline.cached_entries(), 0);
    }
}
