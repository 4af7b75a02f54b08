//! Splits generation from a hypothetical installation into the part used on
//! site, the part exported and the demand left for the grid.

use crate::compare_floats::{clip_at_zero, energies_match, min_of_2};
use crate::core::units::watts_to_kilowatts;
use crate::errors::{NonFiniteFlowError, SolarPanelError};
use crate::reading_table::{Reading, ReadingTable};
use crate::sampling::SamplingInterval;
use serde::Serialize;

/// Flows for one interval. Power values are in kW, density in W/m2.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EnergyFlows {
    pub generation_density: f64,
    pub generation: f64,
    pub self_consumed: f64,
    pub exported: f64,
    pub grid_drawn: f64,
}

impl EnergyFlows {
    /// Scale the reference panel measurement up to `installed_area` (m2) and
    /// balance it against household demand.
    pub fn calculate(reading: &Reading, installed_area: f64, panel_reference_area: f64) -> Self {
        let generation_density = reading.generation_density(panel_reference_area);
        let generation = watts_to_kilowatts(generation_density * installed_area);
        let house_consumption = reading.house_consumption;

        Self {
            generation_density,
            generation,
            self_consumed: min_of_2(house_consumption, generation),
            exported: clip_at_zero(generation - house_consumption),
            grid_drawn: clip_at_zero(house_consumption - generation),
        }
    }

    /// Whether self-consumption plus export accounts for all generation and
    /// self-consumption plus grid draw accounts for all demand.
    pub fn is_balanced(&self, house_consumption: f64) -> bool {
        energies_match(self.self_consumed + self.exported, self.generation)
            && energies_match(self.self_consumed + self.grid_drawn, house_consumption)
    }

    pub fn is_finite(&self) -> bool {
        [
            self.generation_density,
            self.generation,
            self.self_consumed,
            self.exported,
            self.grid_drawn,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

/// Flows for a whole table, together with the interval they were sampled at.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowSeries {
    pub interval: SamplingInterval,
    pub flows: Vec<EnergyFlows>,
}

/// Flows for every reading in `table`.
///
/// Fails when the table is too short to derive an interval, or when a reading
/// is large enough that scaling it to `installed_area` overflows.
pub fn calculate_flows(
    table: &ReadingTable,
    installed_area: f64,
    panel_reference_area: f64,
) -> Result<FlowSeries, SolarPanelError> {
    let interval = SamplingInterval::derive(table.readings())?;
    let flows = table
        .readings()
        .iter()
        .enumerate()
        .map(|(idx, reading)| {
            let flows = EnergyFlows::calculate(reading, installed_area, panel_reference_area);
            if flows.is_finite() {
                Ok(flows)
            } else {
                Err(NonFiniteFlowError {
                    row: idx + 1,
                    solar_generated: reading.solar_generated,
                    installed_area,
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FlowSeries { interval, flows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IrregularSamplingError;
    use crate::reading_table::ColumnMapping;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::*;

    const PANEL_REFERENCE_AREA: f64 = 0.07 * 0.055;

    fn reading(solar_generated: f64, house_consumption: f64) -> Reading {
        Reading {
            timestamp: NaiveDate::from_ymd_opt(2018, 1, 29)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            solar_generated,
            house_consumption,
        }
    }

    #[rstest]
    fn should_scale_generation_to_installed_area() {
        // 0.385 W on 0.00385 m2 is 100 W/m2, so 5 m2 gives 0.5 kW
        let flows = EnergyFlows::calculate(&reading(0.385, 1.0), 5., PANEL_REFERENCE_AREA);
        assert_relative_eq!(flows.generation_density, 100., max_relative = 1e-12);
        assert_relative_eq!(flows.generation, 0.5, max_relative = 1e-12);
    }

    #[rstest]
    fn should_draw_from_grid_when_demand_exceeds_generation() {
        let flows = EnergyFlows::calculate(&reading(0.385, 1.0), 5., PANEL_REFERENCE_AREA);
        assert_relative_eq!(flows.self_consumed, 0.5, max_relative = 1e-12);
        assert_relative_eq!(flows.grid_drawn, 0.5, max_relative = 1e-12);
        assert_eq!(flows.exported, 0.);
        assert!(flows.is_balanced(1.0));
    }

    #[rstest]
    fn should_export_surplus_generation() {
        let flows = EnergyFlows::calculate(&reading(1.54, 0.5), 5., PANEL_REFERENCE_AREA);
        assert_relative_eq!(flows.generation, 2.0, max_relative = 1e-12);
        assert_relative_eq!(flows.self_consumed, 0.5, max_relative = 1e-12);
        assert_relative_eq!(flows.exported, 1.5, max_relative = 1e-12);
        assert_eq!(flows.grid_drawn, 0.);
        assert!(flows.is_balanced(0.5));
    }

    #[rstest]
    fn should_generate_nothing_without_installed_area() {
        let flows = EnergyFlows::calculate(&reading(1.54, 0.5), 0., PANEL_REFERENCE_AREA);
        assert_eq!(flows.generation, 0.);
        assert_eq!(flows.self_consumed, 0.);
        assert_eq!(flows.exported, 0.);
        assert_eq!(flows.grid_drawn, 0.5);
    }

    #[rstest]
    fn should_need_two_readings_for_a_series() {
        let header = ["Timestamp", "Solar power generated (W)", "House(kW)"];
        let rows = [["29/01/2018 08:00:00", "1", "1"]];
        let table = ReadingTable::from_rows(&header, &rows, &ColumnMapping::default()).unwrap();

        assert!(matches!(
            calculate_flows(&table, 5., PANEL_REFERENCE_AREA),
            Err(SolarPanelError::IrregularSampling(
                IrregularSamplingError::TooFewRows { rows: 1 }
            ))
        ));
    }

    #[rstest]
    #[case(0.)]
    #[case(5.)]
    fn should_fail_when_reading_overflows_flows(#[case] installed_area: f64) {
        let flows =
            EnergyFlows::calculate(&reading(1e307, 1.0), installed_area, PANEL_REFERENCE_AREA);
        assert!(!flows.is_finite());

        let header = ["Timestamp", "Solar power generated (W)", "House(kW)"];
        let rows = [
            ["29/01/2018 08:00:00", "1", "1"],
            ["29/01/2018 08:30:00", "1e307", "1"],
        ];
        let table = ReadingTable::from_rows(&header, &rows, &ColumnMapping::default()).unwrap();

        assert!(matches!(
            calculate_flows(&table, installed_area, PANEL_REFERENCE_AREA),
            Err(SolarPanelError::NonFiniteFlow(NonFiniteFlowError { row: 2, .. }))
        ));
    }

    #[rstest]
    fn should_keep_large_finite_readings_balanced() {
        let flows = EnergyFlows::calculate(&reading(1e300, 1.0), 5., PANEL_REFERENCE_AREA);
        assert!(flows.is_finite());
        assert!(flows.is_balanced(1.0));
    }
}
