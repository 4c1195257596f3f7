//! Stereo-linked downward noise gate
//!
//! Attenuates the signal while its RMS envelope sits below a fixed threshold.
//! Expansion is soft (ratio based, bounded depth) with a hold stage so word
//! tails and breaths are not chopped.
//!
//! ## Audio Thread Safety
//! - No allocations during `process()`
//! - All state pre-initialized in `new()`

use super::utils::{db_to_lin, lin_to_db, time_constant_coeff};

/// Gate opens above this level.
const THRESHOLD_DB: f32 = -50.0;

/// 3:1 below threshold.
const EXPANSION_RATIO: f32 = 3.0;

const MAX_ATTENUATION_DB: f32 = 30.0;

const RMS_MS: f32 = 20.0;
const ATTACK_MS: f32 = 5.0;
const RELEASE_MS: f32 = 120.0;
const HOLD_MS: f32 = 60.0;

pub struct NoiseGate {
    rms_coeff: f32,
    attack_coeff: f32,
    release_coeff: f32,
    hold_samples: usize,

    env_sq: f32,
    gain_env: f32,
    hold_counter: usize,
}

impl NoiseGate {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            rms_coeff: time_constant_coeff(RMS_MS, sample_rate),
            attack_coeff: time_constant_coeff(ATTACK_MS, sample_rate),
            release_coeff: time_constant_coeff(RELEASE_MS, sample_rate),
            hold_samples: ((HOLD_MS * 0.001 * sample_rate) as usize).max(1),
            env_sq: 0.0,
            gain_env: 1.0,
            hold_counter: 0,
        }
    }

    /// Compute the linked gain for one frame. `level` is the max absolute
    /// sample across channels.
    #[inline]
    pub fn next_gain(&mut self, level: f32) -> f32 {
        self.env_sq = self.rms_coeff * self.env_sq + (1.0 - self.rms_coeff) * level * level;
        let rms_db = lin_to_db(self.env_sq.sqrt());

        let target = if rms_db < THRESHOLD_DB {
            let reduction_db =
                ((THRESHOLD_DB - rms_db) * (EXPANSION_RATIO - 1.0)).min(MAX_ATTENUATION_DB);
            db_to_lin(-reduction_db)
        } else {
            1.0
        };

        if target >= self.gain_env * 0.99 {
            self.hold_counter = self.hold_samples;
        }

        // Closing uses the release constant, opening the attack constant.
        self.gain_env = if target < self.gain_env {
            if self.hold_counter > 0 {
                self.hold_counter -= 1;
                self.gain_env
            } else {
                self.release_coeff * self.gain_env + (1.0 - self.release_coeff) * target
            }
        } else {
            self.attack_coeff * self.gain_env + (1.0 - self.attack_coeff) * target
        };

        self.gain_env = self.gain_env.clamp(db_to_lin(-MAX_ATTENUATION_DB), 1.0);
        self.gain_env
    }

    pub fn reset(&mut self) {
        self.env_sq = 0.0;
        self.gain_env = 1.0;
        self.hold_counter = 0;
    }
}
