//! Local enhancement engine
//!
//! A self-contained implementation of the SDK boundary so the plugin runs
//! without the proprietary library. Keys are checked offline for shape only.
//!
//! Processing per frame:
//! - band-limit to the model's native bandwidth (speech HPF + LPF)
//! - optional stereo-linked noise gate
//! - voice gain on the enhanced path
//! - wet/dry mix by the enhancement level
//!
//! The engine adds no latency.

use super::{AudioConfig, EnhancementModel, ModelFactory, ModelType, Parameter, SdkError};
use crate::dsp::utils::lerp;
use crate::dsp::{Biquad, NoiseGate};

const MIN_KEY_LEN: usize = 16;
const MAX_CHANNELS: u16 = 2;
const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 192_000;
const MAX_FRAMES: usize = 8192;

const SPEECH_HPF_HZ: f32 = 80.0;
const FILTER_Q: f32 = 0.707;

/// Offline license check used by [`LocalFactory`].
pub fn check_license_key(key: &str) -> Result<(), SdkError> {
    let key = key.trim();
    let well_formed = key.len() >= MIN_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'+' | b'/' | b'='));
    if well_formed {
        Ok(())
    } else {
        Err(SdkError::LicenseFormatInvalid)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFactory;

impl ModelFactory for LocalFactory {
    fn create(
        &self,
        model_type: ModelType,
        license_key: &str,
    ) -> Result<Box<dyn EnhancementModel>, SdkError> {
        check_license_key(license_key)?;
        Ok(Box::new(LocalModel::new(model_type)))
    }
}

struct ChannelState {
    hpf: Biquad,
    lpf: Biquad,
}

pub struct LocalModel {
    model_type: ModelType,
    config: Option<AudioConfig>,
    channels: [ChannelState; MAX_CHANNELS as usize],
    gate: NoiseGate,

    enhancement: f32,
    voice_gain: f32,
    gate_enabled: bool,
}

impl LocalModel {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            config: None,
            channels: [
                ChannelState {
                    hpf: Biquad::new(),
                    lpf: Biquad::new(),
                },
                ChannelState {
                    hpf: Biquad::new(),
                    lpf: Biquad::new(),
                },
            ],
            gate: NoiseGate::new(48_000.0),
            enhancement: 1.0,
            voice_gain: 1.0,
            gate_enabled: false,
        }
    }

    fn supports(config: &AudioConfig) -> bool {
        (1..=MAX_CHANNELS).contains(&config.num_channels)
            && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&config.sample_rate)
            && (1..=MAX_FRAMES).contains(&config.num_frames)
    }
}

impl EnhancementModel for LocalModel {
    fn initialize(&mut self, config: &AudioConfig) -> Result<(), SdkError> {
        if !Self::supports(config) {
            self.config = None;
            return Err(SdkError::UnsupportedAudioConfig(*config));
        }

        let sr = config.sample_rate as f32;
        let bandwidth = self.model_type.native_sample_rate() as f32 * 0.475;
        for ch in self.channels.iter_mut() {
            ch.hpf.update_hpf(SPEECH_HPF_HZ, FILTER_Q, sr);
            ch.lpf.update_lpf(bandwidth, FILTER_Q, sr);
            ch.hpf.reset();
            ch.lpf.reset();
        }
        self.gate = NoiseGate::new(sr);
        self.config = Some(*config);
        Ok(())
    }

    fn process_planar(&mut self, channels: &mut [&mut [f32]]) -> Result<(), SdkError> {
        let config = self.config.ok_or(SdkError::NotInitialized)?;
        if channels.len() != config.num_channels as usize {
            return Err(SdkError::BufferMismatch);
        }
        let frames = channels.first().map_or(0, |c| c.len());
        if frames > config.num_frames || channels.iter().any(|c| c.len() != frames) {
            return Err(SdkError::BufferMismatch);
        }

        for i in 0..frames {
            let gate_gain = if self.gate_enabled {
                let level = channels.iter().fold(0.0f32, |m, c| m.max(c[i].abs()));
                self.gate.next_gain(level)
            } else {
                1.0
            };

            for (ch, state) in channels.iter_mut().zip(self.channels.iter_mut()) {
                let dry = ch[i];
                let wet = state.lpf.process(state.hpf.process(dry)) * gate_gain * self.voice_gain;
                ch[i] = lerp(dry, wet, self.enhancement);
            }
        }

        Ok(())
    }

    fn set_parameter(&mut self, parameter: Parameter, value: f32) -> Result<(), SdkError> {
        match parameter {
            Parameter::EnhancementLevel => self.enhancement = value.clamp(0.0, 1.0),
            Parameter::VoiceGain => self.voice_gain = value.clamp(0.0, 4.0),
            Parameter::NoiseGateEnable => {
                let enabled = value >= 0.5;
                if enabled && !self.gate_enabled {
                    self.gate.reset();
                }
                self.gate_enabled = enabled;
            }
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SdkError> {
        if self.config.is_none() {
            return Err(SdkError::NotInitialized);
        }
        for ch in self.channels.iter_mut() {
            ch.hpf.reset();
            ch.lpf.reset();
        }
        self.gate.reset();
        Ok(())
    }

    fn output_delay(&self) -> usize {
        0
    }

    fn optimal_sample_rate(&self) -> u32 {
        self.model_type.native_sample_rate()
    }

    fn optimal_num_frames(&self) -> usize {
        // One 10 ms window at the native rate.
        (self.model_type.native_sample_rate() / 100) as usize
    }
}
