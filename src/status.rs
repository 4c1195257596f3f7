//! Lock-free state shared between the audio thread, the loader thread and the UI.
//!
//! Writers per field:
//! - license validity: the controller opens a new license generation on every
//!   accept or reject; the loader may only touch the generation it was handed
//! - `model_changed`: audio side only (when a new model is swapped in)
//! - `prepare_called`: prepare step only
//! - model metadata: whoever activates or re-initializes the model
//!
//! Notifications are one-shot: the UI consumes them with `take_*`. Several
//! changes between two UI polls coalesce into one notification.

use crate::models::{ModelState, ModelUiInfo};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Sentinel for "no model active".
const NO_MODEL: usize = usize::MAX;

/// Low bit of the packed license word.
const VALID_BIT: u64 = 1;

#[derive(Debug)]
pub struct SharedStatus {
    /// `generation << 1 | valid`
    license: AtomicU64,
    model_changed: AtomicBool,
    prepare_called: AtomicBool,

    model_state: AtomicU8,
    active_index: AtomicUsize,
    latency_samples: AtomicU32,

    optimal_sample_rate: AtomicU32,
    optimal_num_frames: AtomicUsize,
    output_delay_ms: AtomicU32,
    window_ms: AtomicU32,
    model_delay_ms: AtomicU32,
}

impl Default for SharedStatus {
    fn default() -> Self {
        Self {
            license: AtomicU64::new(0),
            model_changed: AtomicBool::new(false),
            prepare_called: AtomicBool::new(false),
            model_state: AtomicU8::new(ModelState::LicenseInactive as u8),
            active_index: AtomicUsize::new(NO_MODEL),
            latency_samples: AtomicU32::new(0),
            optimal_sample_rate: AtomicU32::new(0),
            optimal_num_frames: AtomicUsize::new(0),
            output_delay_ms: AtomicU32::new(0),
            window_ms: AtomicU32::new(0),
            model_delay_ms: AtomicU32::new(0),
        }
    }
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // License
    // -------------------------------------------------------------------------

    pub fn is_license_valid(&self) -> bool {
        self.license.load(Ordering::Acquire) & VALID_BIT != 0
    }

    pub fn license_generation(&self) -> u64 {
        self.license.load(Ordering::Acquire) >> 1
    }

    /// A key was accepted. Returns the generation the loader must present
    /// when it later reports on builds made with that key.
    pub(crate) fn accept_license(&self) -> u64 {
        self.open_generation(true)
    }

    /// A key was rejected or is missing. Invalidates every earlier generation.
    pub(crate) fn revoke_license(&self) {
        self.open_generation(false);
    }

    /// Loader report for a build made with the key of `generation`. Ignored,
    /// returning false, once the controller has moved on to a newer generation.
    pub(crate) fn report_build(&self, generation: u64, succeeded: bool) -> bool {
        let word = (generation << 1) | u64::from(succeeded);
        self.license
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur >> 1 == generation).then_some(word)
            })
            .is_ok()
    }

    fn open_generation(&self, valid: bool) -> u64 {
        let prev = self
            .license
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                Some((((cur >> 1) + 1) << 1) | u64::from(valid))
            })
            .unwrap_or_else(|cur| cur);
        (prev >> 1) + 1
    }

    // -------------------------------------------------------------------------
    // One-shot notifications
    // -------------------------------------------------------------------------

    pub(crate) fn notify_model_changed(&self) {
        self.model_changed.store(true, Ordering::Release);
    }

    /// Returns true once per model change (or burst of changes).
    pub fn take_model_changed(&self) -> bool {
        self.model_changed.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn notify_prepare_called(&self) {
        self.prepare_called.store(true, Ordering::Release);
    }

    pub fn was_prepare_called(&self) -> bool {
        self.prepare_called.load(Ordering::Acquire)
    }

    pub fn acknowledge_prepare_call(&self) {
        self.prepare_called.store(false, Ordering::Release);
    }

    // -------------------------------------------------------------------------
    // Model metadata
    // -------------------------------------------------------------------------

    pub fn model_state(&self) -> ModelState {
        ModelState::from_u8(self.model_state.load(Ordering::Acquire))
    }

    pub(crate) fn set_model_state(&self, state: ModelState) {
        self.model_state.store(state as u8, Ordering::Release);
    }

    /// Selector index of the model currently owned by the audio thread.
    pub fn active_index(&self) -> Option<usize> {
        match self.active_index.load(Ordering::Acquire) {
            NO_MODEL => None,
            i => Some(i),
        }
    }

    pub(crate) fn set_active_index(&self, index: Option<usize>) {
        self.active_index
            .store(index.unwrap_or(NO_MODEL), Ordering::Release);
    }

    pub fn latency_samples(&self) -> u32 {
        self.latency_samples.load(Ordering::Relaxed)
    }

    pub(crate) fn set_latency_samples(&self, samples: u32) {
        self.latency_samples.store(samples, Ordering::Relaxed);
    }

    pub(crate) fn set_model_info(&self, info: &ModelUiInfo) {
        self.optimal_sample_rate
            .store(info.optimal_sample_rate, Ordering::Relaxed);
        self.optimal_num_frames
            .store(info.optimal_num_frames, Ordering::Relaxed);
        self.window_ms.store(info.window_ms, Ordering::Relaxed);
        self.model_delay_ms
            .store(info.model_delay_ms, Ordering::Relaxed);
        self.output_delay_ms
            .store(info.output_delay_ms, Ordering::Relaxed);
    }

    pub fn model_info(&self) -> ModelUiInfo {
        ModelUiInfo {
            optimal_sample_rate: self.optimal_sample_rate.load(Ordering::Relaxed),
            optimal_num_frames: self.optimal_num_frames.load(Ordering::Relaxed),
            window_ms: self.window_ms.load(Ordering::Relaxed),
            model_delay_ms: self.model_delay_ms.load(Ordering::Relaxed),
            output_delay_ms: self.output_delay_ms.load(Ordering::Relaxed),
        }
    }
}
