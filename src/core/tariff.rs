//! Classifies each interval of the week into a grid tariff period.

use crate::errors::InvalidScheduleError;
use bitflags::bitflags;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum::{Display, EnumIter, EnumString};

pub const HOURS_IN_DAY: u32 = 24;
pub const DAYS_IN_WEEK: u32 = 7;

#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TariffPeriod {
    Offpeak,
    Shoulder,
    Peak,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// Day type for a weekday index where Monday = 0 and Sunday = 6.
    pub fn from_weekday_index(weekday: u32) -> Self {
        match weekday {
            0..=4 => DayType::Weekday,
            _ => DayType::Weekend,
        }
    }

    pub fn of(timestamp: NaiveDateTime) -> Self {
        Self::from_weekday_index(timestamp.weekday().num_days_from_monday())
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Weekdays: u8 {
        const MONDAY = 1;
        const TUESDAY = 1 << 1;
        const WEDNESDAY = 1 << 2;
        const THURSDAY = 1 << 3;
        const FRIDAY = 1 << 4;
        const SATURDAY = 1 << 5;
        const SUNDAY = 1 << 6;
    }
}

impl Weekdays {
    /// Flag for a weekday index where Monday = 0 and Sunday = 6.
    pub fn from_index(weekday: u32) -> Self {
        Self::from_bits_truncate(1 << (weekday % DAYS_IN_WEEK))
    }
}

/// One row of the tariff decision table: applies `period` on any of `days`
/// for hours in `start_hour..end_hour`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TariffRule {
    pub days: Weekdays,
    pub start_hour: u32,
    pub end_hour: u32,
    pub period: TariffPeriod,
}

impl TariffRule {
    fn applies(&self, weekday: u32, hour: u32) -> bool {
        self.days.contains(Weekdays::from_index(weekday))
            && (self.start_hour..self.end_hour).contains(&hour)
    }
}

// The legacy schedule only fires its shoulder/peak rules on Monday (both) and
// Tuesday (shoulder all day), so every other day from 07:00 to 20:59 falls
// through to the off-peak fallback. Kept as-is for compatibility; substitute a
// configured schedule to change the policy.
const LEGACY_RULES: [TariffRule; 5] = [
    TariffRule {
        days: Weekdays::all(),
        start_hour: 0,
        end_hour: 7,
        period: TariffPeriod::Offpeak,
    },
    TariffRule {
        days: Weekdays::all(),
        start_hour: 21,
        end_hour: HOURS_IN_DAY,
        period: TariffPeriod::Offpeak,
    },
    TariffRule {
        days: Weekdays::MONDAY,
        start_hour: 7,
        end_hour: 15,
        period: TariffPeriod::Shoulder,
    },
    TariffRule {
        days: Weekdays::TUESDAY,
        start_hour: 7,
        end_hour: 21,
        period: TariffPeriod::Shoulder,
    },
    TariffRule {
        days: Weekdays::MONDAY,
        start_hour: 15,
        end_hour: 21,
        period: TariffPeriod::Peak,
    },
];

const LEGACY_FALLBACK: TariffPeriod = TariffPeriod::Offpeak;

static LEGACY_SCHEDULE: LazyLock<TariffSchedule> = LazyLock::new(TariffSchedule::legacy);

/// An ordered decision table resolved by first match.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TariffSchedule {
    rules: Vec<TariffRule>,
    #[serde(default = "default_fallback")]
    fallback: TariffPeriod,
}

fn default_fallback() -> TariffPeriod {
    LEGACY_FALLBACK
}

impl TariffSchedule {
    pub fn new(
        rules: Vec<TariffRule>,
        fallback: TariffPeriod,
    ) -> Result<Self, InvalidScheduleError> {
        let schedule = Self { rules, fallback };
        schedule.check()?;
        Ok(schedule)
    }

    /// The fixed weekly schedule used before schedules became configurable.
    pub fn legacy() -> Self {
        Self {
            rules: LEGACY_RULES.to_vec(),
            fallback: LEGACY_FALLBACK,
        }
    }

    /// Validate a schedule that has come in through deserialization.
    pub fn check(&self) -> Result<(), InvalidScheduleError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.start_hour >= rule.end_hour || rule.end_hour > HOURS_IN_DAY {
                return Err(InvalidScheduleError::BadHours {
                    index,
                    start_hour: rule.start_hour,
                    end_hour: rule.end_hour,
                });
            }
            if rule.days.is_empty() {
                return Err(InvalidScheduleError::NoDays { index });
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[TariffRule] {
        &self.rules
    }

    pub fn fallback(&self) -> TariffPeriod {
        self.fallback
    }

    /// Index of the first rule matching the given weekday (Monday = 0) and hour,
    /// or None when the slot falls through to the fallback.
    pub fn matching_rule(&self, weekday: u32, hour: u32) -> Option<usize> {
        self.rules
            .iter()
            .position(|rule| rule.applies(weekday, hour))
    }

    pub fn period_for(&self, weekday: u32, hour: u32) -> TariffPeriod {
        self.matching_rule(weekday, hour)
            .map(|index| self.rules[index].period)
            .unwrap_or(self.fallback)
    }

    pub fn classify(&self, timestamp: NaiveDateTime) -> TariffPeriod {
        self.period_for(timestamp.weekday().num_days_from_monday(), timestamp.hour())
    }
}

impl Default for TariffSchedule {
    fn default() -> Self {
        Self::legacy()
    }
}

/// Classify a timestamp under the legacy schedule.
pub fn classify(timestamp: NaiveDateTime) -> TariffPeriod {
    LEGACY_SCHEDULE.classify(timestamp)
}
