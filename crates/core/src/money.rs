//! Prices are stored in minor currency units; the API speaks display units.

pub fn to_minor(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn to_display(minor: i64) -> f64 {
    minor as f64 / 100.0
}
