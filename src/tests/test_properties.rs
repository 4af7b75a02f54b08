mod test_properties {
    use crate::core::billing::{aggregate_monthly, MonthGrouping};
    use crate::core::energy_flow::EnergyFlows;
    use crate::core::tariff::{classify, TariffPeriod, TariffSchedule, DAYS_IN_WEEK, HOURS_IN_DAY};
    use crate::input::{ParameterSet, PipelineOptions};
    use crate::pipeline::{evaluate_batch, run_pipeline};
    use crate::reading_table::{ColumnMapping, Reading, ReadingTable, TIMESTAMP_FORMAT};
    use chrono::{Duration, NaiveDate};
    use itertools::iproduct;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use strum::IntoEnumIterator;

    const PANEL_REFERENCE_AREA: f64 = 0.07 * 0.055;

    /// A week of half-hourly readings straddling the end of January.
    #[fixture]
    fn week_of_readings() -> ReadingTable {
        let header = ["Timestamp", "Solar power generated (W)", "House(kW)"];
        let start = NaiveDate::from_ymd_opt(2018, 1, 28)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = (0..7 * 48)
            .map(|idx: i64| {
                let timestamp = start + Duration::minutes(30 * idx);
                [
                    timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    (((idx * 7) % 13) as f64 * 0.0625).to_string(),
                    (((idx * 5) % 11) as f64 * 0.125).to_string(),
                ]
            })
            .collect::<Vec<_>>();
        ReadingTable::from_rows(&header, &rows, &ColumnMapping::default()).unwrap()
    }

    const SAMPLE_VALUES: [f64; 8] = [0., 1e-9, 0.1, 0.2, 0.5, 1., 3.7, 250.];

    #[rstest]
    fn flows_balance_for_non_negative_inputs() {
        for (solar_generated, house_consumption, installed_area) in
            iproduct!(SAMPLE_VALUES, SAMPLE_VALUES, [0., 1., 5., 42.5])
        {
            let reading = Reading {
                timestamp: Default::default(),
                solar_generated,
                house_consumption,
            };
            let flows = EnergyFlows::calculate(&reading, installed_area, PANEL_REFERENCE_AREA);

            assert!(
                flows.is_balanced(house_consumption),
                "unbalanced flows {flows:?} for {reading:?} over {installed_area} m2"
            );
            assert!(flows.exported >= 0.);
            assert!(flows.grid_drawn >= 0.);
            assert!(flows.self_consumed >= 0.);
        }
    }

    #[rstest]
    fn derived_rows_never_go_negative(week_of_readings: ReadingTable) {
        let results = run_pipeline(
            &week_of_readings,
            &ParameterSet::default(),
            &PipelineOptions::default(),
        )
        .unwrap();

        for row in &results.rows {
            assert!(row.exported >= 0. && row.grid_drawn >= 0.);
            assert!(row.feed_in_revenue >= 0. && row.solar_savings >= 0.);
        }
    }

    #[rstest]
    fn monthly_aggregation_ignores_row_order(week_of_readings: ReadingTable) {
        let results = run_pipeline(
            &week_of_readings,
            &ParameterSet::default(),
            &PipelineOptions::default(),
        )
        .unwrap();

        let mut reversed = results.rows.clone();
        reversed.reverse();
        let mut interleaved = results.rows.clone();
        interleaved.sort_by_key(|row| (row.timestamp.format("%M").to_string(), row.timestamp));

        for grouping in [MonthGrouping::YearMonth, MonthGrouping::MonthOnly] {
            let expected = aggregate_monthly(&results.rows, grouping);
            assert_eq!(aggregate_monthly(&reversed, grouping), expected);
            assert_eq!(aggregate_monthly(&interleaved, grouping), expected);
        }
        assert_eq!(results.monthly.len(), 2);
    }

    #[rstest]
    fn pipeline_is_idempotent(week_of_readings: ReadingTable) {
        let parameters = ParameterSet {
            installed_area: 12.,
            ..Default::default()
        };
        let options = PipelineOptions::default();

        let first = run_pipeline(&week_of_readings, &parameters, &options).unwrap();
        let second = run_pipeline(&week_of_readings, &parameters, &options).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    fn table_is_unchanged_across_parameter_sets(week_of_readings: ReadingTable) {
        let before = week_of_readings.clone();
        let parameter_sets = [0., 2.5, 5., 40.]
            .into_iter()
            .map(|installed_area| ParameterSet {
                installed_area,
                ..Default::default()
            })
            .collect::<Vec<_>>();

        let results = evaluate_batch(
            &week_of_readings,
            &parameter_sets,
            &PipelineOptions::default(),
        );

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(week_of_readings, before);
    }

    #[rstest]
    fn every_slot_of_the_week_has_exactly_one_period() {
        let schedule = TariffSchedule::legacy();
        let monday = NaiveDate::from_ymd_opt(2018, 1, 29)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        for (weekday, hour) in iproduct!(0..DAYS_IN_WEEK, 0..HOURS_IN_DAY) {
            let period = schedule.period_for(weekday, hour);
            assert_eq!(
                TariffPeriod::iter().filter(|candidate| *candidate == period).count(),
                1
            );

            let timestamp = monday
                + Duration::days(weekday as i64)
                + Duration::hours(hour as i64)
                + Duration::minutes(59);
            assert_eq!(classify(timestamp), period);
            assert_eq!(schedule.classify(timestamp), period);
        }
    }

    #[rstest]
    fn only_monday_and_tuesday_leave_offpeak() {
        let schedule = TariffSchedule::legacy();
        for (weekday, hour) in iproduct!(2..DAYS_IN_WEEK, 0..HOURS_IN_DAY) {
            assert_eq!(schedule.period_for(weekday, hour), TariffPeriod::Offpeak);
        }
    }
}
