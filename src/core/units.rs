pub const WATTS_PER_KILOWATT: u32 = 1_000;
pub const MINUTES_PER_HOUR: u32 = 60;
pub const SECONDS_PER_MINUTE: u32 = 60;
pub const CENTS_PER_UNIT: u32 = 100;
pub const MILLIMETRES_IN_METRE: u32 = 1_000;
pub const MONTHS_PER_YEAR: u32 = 12;

pub fn watts_to_kilowatts(watts: f64) -> f64 {
    watts / WATTS_PER_KILOWATT as f64
}

/// Energy in kWh delivered by a constant power (kW) held over an interval given in minutes.
pub fn energy_over_interval(power_kw: f64, interval_minutes: f64) -> f64 {
    power_kw / (MINUTES_PER_HOUR as f64 / interval_minutes)
}

/// Convert an amount in cents into whole currency units.
pub fn cents_to_currency(cents: f64) -> f64 {
    cents / CENTS_PER_UNIT as f64
}

/// Area in m2 of a rectangle measured in millimetres.
pub fn area_from_millimetres(width_mm: f64, length_mm: f64) -> f64 {
    (width_mm / MILLIMETRES_IN_METRE as f64) * (length_mm / MILLIMETRES_IN_METRE as f64)
}
