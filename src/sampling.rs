use crate::core::units::{MINUTES_PER_HOUR, SECONDS_PER_MINUTE};
use crate::errors::IrregularSamplingError;
use crate::reading_table::Reading;
use tracing::debug;

/// The fixed gap between consecutive readings, taken from the first two
/// readings and assumed to hold for the rest of the series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingInterval {
    minutes: f64,
}

impl SamplingInterval {
    pub fn from_minutes(minutes: f64) -> Result<Self, IrregularSamplingError> {
        if minutes > 0. && minutes.is_finite() {
            Ok(Self { minutes })
        } else {
            Err(IrregularSamplingError::NonIncreasing { minutes })
        }
    }

    pub fn derive(readings: &[Reading]) -> Result<Self, IrregularSamplingError> {
        let [first, second, ..] = readings else {
            return Err(IrregularSamplingError::TooFewRows {
                rows: readings.len(),
            });
        };
        let seconds = (second.timestamp - first.timestamp).num_seconds();
        let interval = Self::from_minutes(seconds as f64 / SECONDS_PER_MINUTE as f64)?;
        debug!("sampling interval is {} minutes", interval.minutes);

        Ok(interval)
    }

    pub fn minutes(&self) -> f64 {
        self.minutes
    }

    /// Fraction of an hour covered by one interval.
    pub fn hours(&self) -> f64 {
        self.minutes / MINUTES_PER_HOUR as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn reading_at(hour: u32, minute: u32, second: u32) -> Reading {
        let timestamp: NaiveDateTime = NaiveDate::from_ymd_opt(2018, 1, 29)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap();
        Reading {
            timestamp,
            solar_generated: 0.,
            house_consumption: 0.,
        }
    }

    #[rstest]
    fn should_derive_interval_from_first_two_readings() {
        let readings = [reading_at(8, 0, 0), reading_at(8, 5, 0), reading_at(9, 0, 0)];
        let interval = SamplingInterval::derive(&readings).unwrap();
        assert_eq!(interval.minutes(), 5.);
        assert_eq!(interval.hours(), 5. / 60.);
    }

    #[rstest]
    fn should_keep_fractional_minutes() {
        let readings = [reading_at(8, 0, 0), reading_at(8, 0, 30)];
        assert_eq!(SamplingInterval::derive(&readings).unwrap().minutes(), 0.5);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn should_fail_with_fewer_than_two_readings(#[case] rows: usize) {
        let readings = vec![reading_at(8, 0, 0); rows];
        assert_eq!(
            SamplingInterval::derive(&readings),
            Err(IrregularSamplingError::TooFewRows { rows })
        );
    }

    #[rstest]
    fn should_fail_when_first_two_readings_do_not_increase() {
        let readings = [reading_at(8, 5, 0), reading_at(8, 0, 0)];
        assert_eq!(
            SamplingInterval::derive(&readings),
            Err(IrregularSamplingError::NonIncreasing { minutes: -5. })
        );
    }
}
