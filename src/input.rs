use crate::core::billing::{MonthGrouping, TariffRates};
use crate::core::payback::installation_cost;
use crate::core::tariff::TariffSchedule;
use crate::core::units::area_from_millimetres;
use crate::errors::InvalidParameterError;
use crate::reading_table::ColumnMapping;
use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::Read;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

pub fn ingest_config(json: impl Read) -> anyhow::Result<SolarPanelConfig> {
    SolarPanelConfig::from_json(json)
}

#[derive(
    Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, IntoStaticStr, PartialEq,
)]
#[strum(serialize_all = "snake_case")]
pub enum ParameterField {
    InstalledArea,
    PanelCostPerArea,
    FeedInTariff,
    OffpeakRate,
    ShoulderRate,
    PeakRate,
}

/// The user-adjustable economic inputs.
///
/// Areas are in m2, panel cost in currency/m2 and every tariff in cents/kWh.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterSet {
    pub installed_area: f64,
    pub panel_cost_per_area: f64,
    pub feed_in_tariff: f64,
    pub offpeak_rate: f64,
    pub shoulder_rate: f64,
    pub peak_rate: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            installed_area: 5.,
            panel_cost_per_area: 1500.,
            feed_in_tariff: 7.135,
            offpeak_rate: 15.1002,
            shoulder_rate: 28.7076,
            peak_rate: 54.8142,
        }
    }
}

impl ParameterSet {
    pub fn get(&self, field: ParameterField) -> f64 {
        match field {
            ParameterField::InstalledArea => self.installed_area,
            ParameterField::PanelCostPerArea => self.panel_cost_per_area,
            ParameterField::FeedInTariff => self.feed_in_tariff,
            ParameterField::OffpeakRate => self.offpeak_rate,
            ParameterField::ShoulderRate => self.shoulder_rate,
            ParameterField::PeakRate => self.peak_rate,
        }
    }

    fn field_mut(&mut self, field: ParameterField) -> &mut f64 {
        match field {
            ParameterField::InstalledArea => &mut self.installed_area,
            ParameterField::PanelCostPerArea => &mut self.panel_cost_per_area,
            ParameterField::FeedInTariff => &mut self.feed_in_tariff,
            ParameterField::OffpeakRate => &mut self.offpeak_rate,
            ParameterField::ShoulderRate => &mut self.shoulder_rate,
            ParameterField::PeakRate => &mut self.peak_rate,
        }
    }

    /// Check every field is a finite, non-negative number and that together
    /// they give a finite installation cost.
    pub fn validated(self) -> Result<Self, InvalidParameterError> {
        for field in ParameterField::iter() {
            check_value(field, self.get(field))?;
        }
        if !self.installation_cost().is_finite() {
            return Err(InvalidParameterError::InstallationCostNotFinite {
                installed_area: self.installed_area,
                panel_cost_per_area: self.panel_cost_per_area,
            });
        }
        Ok(self)
    }

    /// Replace one field from text entered by the user.
    pub fn set_from_str(
        &mut self,
        field: ParameterField,
        raw: &str,
    ) -> Result<(), InvalidParameterError> {
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| InvalidParameterError::NotNumeric {
                field: field.into(),
                raw: raw.to_owned(),
            })?;
        *self.field_mut(field) = check_value(field, value)?;
        Ok(())
    }

    pub fn rates(&self) -> TariffRates {
        TariffRates {
            offpeak: self.offpeak_rate,
            shoulder: self.shoulder_rate,
            peak: self.peak_rate,
        }
    }

    pub fn installation_cost(&self) -> f64 {
        installation_cost(self.installed_area, self.panel_cost_per_area)
    }
}

fn check_value(field: ParameterField, value: f64) -> Result<f64, InvalidParameterError> {
    if !value.is_finite() {
        return Err(InvalidParameterError::NotFinite {
            field: field.into(),
            value,
        });
    }
    if value < 0. {
        return Err(InvalidParameterError::Negative {
            field: field.into(),
            value,
        });
    }
    Ok(value)
}

/// Physical size of the panel the sensor readings were taken from.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct PanelDimensions {
    #[validate(exclusive_minimum = 0.)]
    pub width_mm: f64,
    #[validate(exclusive_minimum = 0.)]
    pub length_mm: f64,
}

impl Default for PanelDimensions {
    fn default() -> Self {
        Self {
            width_mm: 70.,
            length_mm: 55.,
        }
    }
}

impl PanelDimensions {
    /// Reference area in m2.
    pub fn area(&self) -> f64 {
        area_from_millimetres(self.width_mm, self.length_mm)
    }
}

/// Inclusive on both ends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        (self.start..=self.end).contains(&timestamp)
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct SolarPanelConfig {
    #[validate]
    pub panel: PanelDimensions,
    pub columns: ColumnMapping,
    pub parameters: ParameterSet,
    pub tariff_schedule: Option<TariffSchedule>,
    pub month_grouping: MonthGrouping,
    pub date_range: Option<DateRange>,
    #[validate(minimum = 1)]
    pub recent_readings: usize,
}

impl Default for SolarPanelConfig {
    fn default() -> Self {
        Self {
            panel: Default::default(),
            columns: Default::default(),
            parameters: Default::default(),
            tariff_schedule: None,
            month_grouping: Default::default(),
            date_range: None,
            recent_readings: 100,
        }
    }
}

impl SolarPanelConfig {
    pub fn from_json(json: impl Read) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_reader(json)?;
        config
            .validate()
            .map_err(|errors| anyhow!("Configuration was invalid: {errors}"))?;
        if let Some(schedule) = &config.tariff_schedule {
            schedule.check()?;
        }
        config.parameters.validated()?;

        Ok(config)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            panel_reference_area: self.panel.area(),
            schedule: self.tariff_schedule.clone().unwrap_or_default(),
            month_grouping: self.month_grouping,
            date_range: self.date_range,
        }
    }
}

/// Everything besides the parameter set that shapes one pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOptions {
    pub panel_reference_area: f64,
    pub schedule: TariffSchedule,
    pub month_grouping: MonthGrouping,
    pub date_range: Option<DateRange>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        SolarPanelConfig::default().pipeline_options()
    }
}
