//! Per-block handoff of host parameters into the active model.

use crate::error::LifecycleError;
use crate::lifecycle::ModelSlot;
use crate::sdk::Parameter;

/// Control values sampled from the host parameters for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    /// 0.0 to 1.0
    pub enhancement: f32,
    pub voice_gain_db: f32,
    pub noise_gate: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            enhancement: 1.0,
            voice_gain_db: 1.0,
            noise_gate: false,
        }
    }
}

impl Controls {
    pub fn voice_gain_linear(&self) -> f32 {
        nih_plug::util::db_to_gain(self.voice_gain_db)
    }
}

/// Push `controls` into the active model and enhance `channels` in place.
///
/// When no model is ready the buffer is not touched and the reason is
/// returned. Allocation free.
pub fn process_block(
    slot: &mut ModelSlot,
    channels: &mut [&mut [f32]],
    controls: &Controls,
) -> Result<(), LifecycleError> {
    let model = slot.ready_model()?;

    model
        .set_parameter(Parameter::EnhancementLevel, controls.enhancement.clamp(0.0, 1.0))
        .map_err(LifecycleError::Processing)?;
    model
        .set_parameter(Parameter::VoiceGain, controls.voice_gain_linear())
        .map_err(LifecycleError::Processing)?;
    model
        .set_parameter(
            Parameter::NoiseGateEnable,
            if controls.noise_gate { 1.0 } else { 0.0 },
        )
        .map_err(LifecycleError::Processing)?;

    model
        .process_planar(channels)
        .map_err(LifecycleError::Processing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::LicenseStore;
    use crate::lifecycle;
    use crate::sdk::AudioConfig;
    use crate::testing::{wait_for, MockFactory, BAD_KEY, GOOD_KEY};
    use std::sync::Arc;
    use std::time::Duration;

    fn signal() -> Vec<f32> {
        (0..256).map(|i| (i as f32 * 0.013).sin() * 0.8).collect()
    }

    fn run(slot: &mut ModelSlot, controls: &Controls) -> (Vec<f32>, Vec<f32>, Result<(), LifecycleError>) {
        let mut l = signal();
        let mut r = signal();
        let res = {
            let mut chans: [&mut [f32]; 2] = [&mut l, &mut r];
            process_block(slot, &mut chans, controls)
        };
        (l, r, res)
    }

    #[test]
    fn test_voice_gain_db_to_linear() {
        let c = Controls {
            voice_gain_db: 0.0,
            ..Controls::default()
        };
        assert!((c.voice_gain_linear() - 1.0).abs() < 1e-6);
        let c = Controls {
            voice_gain_db: -12.0,
            ..Controls::default()
        };
        assert!((c.voice_gain_linear() - 0.251_188_6).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_license_is_bit_identical_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let store = LicenseStore::at(dir.path().join("license.txt"));
        store.save(BAD_KEY).unwrap();
        let (_controller, mut slot) = lifecycle::start(Arc::new(MockFactory::new()), store, 0);
        slot.prepare(AudioConfig::new(48_000, 2, 256), 0);
        slot.sync(0);

        let (l, r, res) = run(&mut slot, &Controls::default());
        assert!(matches!(res, Err(LifecycleError::LicenseInactive)));
        let input = signal();
        assert!(l.iter().zip(&input).all(|(a, b)| a.to_bits() == b.to_bits()));
        assert!(r.iter().zip(&input).all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn test_ready_model_processes_with_controls() {
        let dir = tempfile::tempdir().unwrap();
        let store = LicenseStore::at(dir.path().join("license.txt"));
        store.save(GOOD_KEY).unwrap();
        let (_controller, mut slot) = lifecycle::start(Arc::new(MockFactory::new()), store, 0);
        slot.prepare(AudioConfig::new(48_000, 2, 256), 0);
        assert!(wait_for(Duration::from_secs(2), || {
            slot.sync(0);
            slot.ready_model().is_ok()
        }));

        let controls = Controls {
            voice_gain_db: 0.0,
            ..Controls::default()
        };
        let (l, _r, res) = run(&mut slot, &controls);
        assert!(res.is_ok());
        // The mock halves its input at unity voice gain.
        let input = signal();
        assert!(l.iter().zip(&input).all(|(a, b)| (a - b * 0.5).abs() < 1e-6));
    }
}
