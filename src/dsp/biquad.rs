//! Biquad filter (IIR 2nd order)
//!
//! Used by the local engine for the speech band-limiting stage.
//! All operations are audio-thread safe (no allocations).

use std::f32::consts::PI;

#[inline]
fn clamp_cutoff(cutoff: f32, sr: f32) -> f32 {
    cutoff.clamp(1.0, sr * 0.45)
}

/// Biquad filter implementation (IIR 2nd order)
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
    z1: f32,
    z2: f32,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Biquad {
    pub fn new() -> Self {
        Self {
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = input * self.a0 + self.z1;

        // Anti-denormal: tiny DC offset
        self.z1 = input * self.a1 + self.z2 - self.b1 * out + 1e-25;
        self.z2 = input * self.a2 - self.b2 * out + 1e-25;

        out
    }

    /// Clear the delay state. Coefficient updates never do this implicitly.
    #[inline]
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    // RBJ cookbook designs. Cutoff is clamped below Nyquist so low-rate
    // models (8 kHz) never produce an unstable filter.

    pub fn update_hpf(&mut self, cutoff: f32, q: f32, sr: f32) {
        let w0 = 2.0 * PI * clamp_cutoff(cutoff, sr) / sr;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let a0 = 1.0 + alpha;
        let inv_a0 = 1.0 / a0;

        self.a0 = ((1.0 + cw0) * 0.5) * inv_a0;
        self.a1 = -(1.0 + cw0) * inv_a0;
        self.a2 = ((1.0 + cw0) * 0.5) * inv_a0;
        self.b1 = (-2.0 * cw0) * inv_a0;
        self.b2 = (1.0 - alpha) * inv_a0;
    }

    pub fn update_lpf(&mut self, cutoff: f32, q: f32, sr: f32) {
        let w0 = 2.0 * PI * clamp_cutoff(cutoff, sr) / sr;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();

        let a0 = 1.0 + alpha;
        let inv_a0 = 1.0 / a0;

        self.a0 = ((1.0 - cw0) * 0.5) * inv_a0;
        self.a1 = (1.0 - cw0) * inv_a0;
        self.a2 = ((1.0 - cw0) * 0.5) * inv_a0;
        self.b1 = (-2.0 * cw0) * inv_a0;
        self.b2 = (1.0 - alpha) * inv_a0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_default() {
        let mut f = Biquad::new();
        for &x in &[0.5f32, -0.25, 0.125, 0.0] {
            assert!((f.process(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hpf_removes_dc() {
        let mut f = Biquad::new();
        f.update_hpf(80.0, 0.707, 48000.0);
        let mut out = 0.0;
        for _ in 0..48000 {
            out = f.process(1.0);
        }
        assert!(out.abs() < 1e-3);
    }

    #[test]
    fn test_lpf_above_nyquist_stays_stable() {
        let mut f = Biquad::new();
        f.update_lpf(7600.0, 0.707, 8000.0);
        let mut peak = 0.0f32;
        for i in 0..8000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            peak = peak.max(f.process(x).abs());
        }
        assert!(peak.is_finite());
        assert!(peak < 2.0);
    }
}
