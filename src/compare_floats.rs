pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Clip a value from below at zero, so that a surplus or deficit never comes out negative.
pub(crate) fn clip_at_zero(value: f64) -> f64 {
    max_of_2(value, 0.)
}

/// Whether two energy quantities agree within the tolerance used for flow balance checks.
pub(crate) fn energies_match(first: f64, second: f64) -> bool {
    is_close!(first, second, rel_tol = 1e-09, abs_tol = 1e-12)
}
