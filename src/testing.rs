//! Scripted SDK stand-in for lifecycle tests.

use crate::sdk::{AudioConfig, EnhancementModel, ModelFactory, ModelType, Parameter, SdkError};
use nih_plug::prelude::Enum;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const GOOD_KEY: &str = "GOODKEY";
pub const BAD_KEY: &str = "BADKEY";
pub const MOCK_DELAY: usize = 64;

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

struct Counters {
    creations: AtomicUsize,
    per_index: [AtomicUsize; 8],
    live: AtomicUsize,
    resets: AtomicUsize,
    fail: AtomicBool,
    /// Index whose creation takes `slow_ms`, `usize::MAX` for none
    slow_index: AtomicUsize,
    slow_ms: AtomicUsize,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            creations: AtomicUsize::new(0),
            per_index: Default::default(),
            live: AtomicUsize::new(0),
            resets: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            slow_index: AtomicUsize::new(usize::MAX),
            slow_ms: AtomicUsize::new(0),
        }
    }
}

/// Accepts only [`GOOD_KEY`]. Counts creations and live handles.
#[derive(Default, Clone)]
pub struct MockFactory {
    counters: Arc<Counters>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> usize {
        self.counters.resets.load(Ordering::SeqCst)
    }

    /// Make creation of `index` take `delay` after the key check.
    pub fn slow_down(&self, index: usize, delay: Duration) {
        self.counters
            .slow_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
        self.counters.slow_index.store(index, Ordering::SeqCst);
    }

    pub fn creations(&self) -> usize {
        self.counters.creations.load(Ordering::SeqCst)
    }

    pub fn creations_for(&self, index: usize) -> usize {
        self.counters.per_index[index].load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Make every subsequent `create` fail as if the server disallowed processing.
    pub fn fail_creations(&self, fail: bool) {
        self.counters.fail.store(fail, Ordering::SeqCst);
    }

    /// Build a handle without going through license checks or counters.
    pub fn create_direct(&self) -> Box<dyn EnhancementModel> {
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        Box::new(MockModel {
            config: None,
            gain: 0.5,
            counters: self.counters.clone(),
        })
    }
}

impl ModelFactory for MockFactory {
    fn create(
        &self,
        model_type: ModelType,
        license_key: &str,
    ) -> Result<Box<dyn EnhancementModel>, SdkError> {
        if license_key.trim() != GOOD_KEY {
            return Err(SdkError::LicenseRejected);
        }
        if self.counters.fail.load(Ordering::SeqCst) {
            return Err(SdkError::ProcessingNotAllowed);
        }
        let index = model_type.to_index();
        if self.counters.slow_index.load(Ordering::SeqCst) == index {
            let ms = self.counters.slow_ms.load(Ordering::SeqCst);
            thread::sleep(Duration::from_millis(ms as u64));
        }
        self.counters.creations.fetch_add(1, Ordering::SeqCst);
        self.counters.per_index[index].fetch_add(1, Ordering::SeqCst);
        Ok(self.create_direct())
    }
}

/// Halves its input (times the voice gain) so processed output is
/// distinguishable from pass-through.
pub struct MockModel {
    config: Option<AudioConfig>,
    gain: f32,
    counters: Arc<Counters>,
}

impl Drop for MockModel {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EnhancementModel for MockModel {
    fn initialize(&mut self, config: &AudioConfig) -> Result<(), SdkError> {
        if config.is_degenerate() || config.num_channels > 2 {
            self.config = None;
            return Err(SdkError::UnsupportedAudioConfig(*config));
        }
        self.config = Some(*config);
        Ok(())
    }

    fn process_planar(&mut self, channels: &mut [&mut [f32]]) -> Result<(), SdkError> {
        if self.config.is_none() {
            return Err(SdkError::NotInitialized);
        }
        for ch in channels.iter_mut() {
            for s in ch.iter_mut() {
                *s *= self.gain;
            }
        }
        Ok(())
    }

    fn set_parameter(&mut self, parameter: Parameter, value: f32) -> Result<(), SdkError> {
        if parameter == Parameter::VoiceGain {
            self.gain = 0.5 * value;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SdkError> {
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn output_delay(&self) -> usize {
        MOCK_DELAY
    }

    fn optimal_sample_rate(&self) -> u32 {
        48_000
    }

    fn optimal_num_frames(&self) -> usize {
        480
    }
}
