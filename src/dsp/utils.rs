//! Small numeric helpers shared by the local engine stages.

/// Floor used before taking logarithms.
pub const DB_EPS: f32 = 1e-9;

#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    20.0 * lin.max(DB_EPS).log10()
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
#[inline]
pub fn time_constant_coeff(ms: f32, sample_rate: f32) -> f32 {
    let samples = (ms * 0.001 * sample_rate).max(1.0);
    (-1.0 / samples).exp()
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversions_invert() {
        for db in [-24.0f32, -6.0, 0.0, 6.0, 12.0] {
            assert!((lin_to_db(db_to_lin(db)) - db).abs() < 1e-3);
        }
    }

    #[test]
    fn test_time_constant_is_a_decay() {
        let c = time_constant_coeff(10.0, 48000.0);
        assert!(c > 0.0 && c < 1.0);
        assert!(time_constant_coeff(100.0, 48000.0) > c);
    }
}
