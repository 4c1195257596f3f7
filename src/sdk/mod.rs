//! Enhancement model SDK boundary
//!
//! The enhancement engine is an opaque library. Everything the plugin needs
//! from it goes through the two traits in this module:
//! - [`ModelFactory`] constructs a model for a model type and a license key
//! - [`EnhancementModel`] is the live handle (initialize / process / reset / parameters)
//!
//! # Threading contract
//! - `ModelFactory::create` and `EnhancementModel::initialize` may allocate, block
//!   or contact license infrastructure. They are never called from the audio callback.
//! - `set_parameter`, `process_planar` and the getters are called once per block
//!   from the audio callback and must be allocation free in implementations.

pub mod local;

pub use local::LocalFactory;

use nih_plug::prelude::Enum;
use thiserror::Error;

/// Model variants understood by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[repr(usize)]
pub enum ModelType {
    #[name = "Quail L48"]
    QuailL48,
    #[name = "Quail L16"]
    QuailL16,
    #[name = "Quail L8"]
    QuailL8,
    #[name = "Quail S48"]
    QuailS48,
    #[name = "Quail S16"]
    QuailS16,
    #[name = "Quail S8"]
    QuailS8,
    #[name = "Quail XS"]
    QuailXs,
    #[name = "Quail XXS"]
    QuailXxs,
}

impl ModelType {
    /// Native sample rate the model was trained for.
    pub fn native_sample_rate(&self) -> u32 {
        match self {
            ModelType::QuailL48 | ModelType::QuailS48 => 48_000,
            ModelType::QuailL16 | ModelType::QuailS16 => 16_000,
            ModelType::QuailL8 | ModelType::QuailS8 => 8_000,
            ModelType::QuailXs | ModelType::QuailXxs => 48_000,
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::QuailL48
    }
}

/// Runtime parameters exposed by every model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    /// Wet amount, 0.0 (bypass) to 1.0 (full enhancement)
    EnhancementLevel,
    /// Linear gain applied to the enhanced voice
    VoiceGain,
    /// 0.0 disables, 1.0 enables the noise gate
    NoiseGateEnable,
}

/// Host audio configuration a model is initialized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub num_channels: u16,
    pub num_frames: usize,
}

impl AudioConfig {
    pub fn new(sample_rate: u32, num_channels: u16, num_frames: usize) -> Self {
        Self {
            sample_rate,
            num_channels,
            num_frames,
        }
    }

    /// A configuration the host could never legitimately hand us.
    pub fn is_degenerate(&self) -> bool {
        self.sample_rate == 0 || self.num_channels == 0 || self.num_frames == 0
    }
}

/// Error codes reported by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error("license key is empty or malformed")]
    LicenseFormatInvalid,
    #[error("license key was rejected")]
    LicenseRejected,
    #[error("license server disallowed processing")]
    ProcessingNotAllowed,
    #[error("unsupported audio configuration: {0:?}")]
    UnsupportedAudioConfig(AudioConfig),
    #[error("model has not been initialized")]
    NotInitialized,
    #[error("audio buffer does not match the initialized configuration")]
    BufferMismatch,
    #[error("model creation failed: {0}")]
    CreationFailed(String),
}

/// A live enhancement model instance.
pub trait EnhancementModel: Send {
    /// Prepare the model for the given audio configuration. Not real-time safe.
    fn initialize(&mut self, config: &AudioConfig) -> Result<(), SdkError>;

    /// Enhance planar audio in place.
    fn process_planar(&mut self, channels: &mut [&mut [f32]]) -> Result<(), SdkError>;

    fn set_parameter(&mut self, parameter: Parameter, value: f32) -> Result<(), SdkError>;

    /// Clear internal state without re-initializing.
    fn reset(&mut self) -> Result<(), SdkError>;

    /// Delay introduced by the model, in samples at the initialized sample rate.
    fn output_delay(&self) -> usize;

    fn optimal_sample_rate(&self) -> u32;

    fn optimal_num_frames(&self) -> usize;
}

/// Constructs model handles. Implementations must be shareable between the
/// control thread (license probes) and the loader thread (model builds).
pub trait ModelFactory: Send + Sync {
    fn create(
        &self,
        model_type: ModelType,
        license_key: &str,
    ) -> Result<Box<dyn EnhancementModel>, SdkError>;
}
