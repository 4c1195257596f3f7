use crate::sdk::ModelType;
use nih_plug::prelude::Enum;

// =============================================================================
// MODEL DESCRIPTORS
// =============================================================================

/// Static metadata for one selectable model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub model_type: ModelType,
    /// Nominal analysis window in milliseconds
    pub window_ms: u32,
    /// Nominal algorithmic delay in milliseconds
    pub model_delay_ms: u32,
}

/// All selectable models, in selector order. Index `i` corresponds to
/// `ModelType::from_index(i)`.
pub const MODELS: [ModelDescriptor; 8] = [
    ModelDescriptor {
        name: "Quail L48",
        model_type: ModelType::QuailL48,
        window_ms: 10,
        model_delay_ms: 30,
    },
    ModelDescriptor {
        name: "Quail L16",
        model_type: ModelType::QuailL16,
        window_ms: 10,
        model_delay_ms: 30,
    },
    ModelDescriptor {
        name: "Quail L8",
        model_type: ModelType::QuailL8,
        window_ms: 10,
        model_delay_ms: 30,
    },
    ModelDescriptor {
        name: "Quail S48",
        model_type: ModelType::QuailS48,
        window_ms: 10,
        model_delay_ms: 30,
    },
    ModelDescriptor {
        name: "Quail S16",
        model_type: ModelType::QuailS16,
        window_ms: 10,
        model_delay_ms: 30,
    },
    ModelDescriptor {
        name: "Quail S8",
        model_type: ModelType::QuailS8,
        window_ms: 10,
        model_delay_ms: 30,
    },
    ModelDescriptor {
        name: "Quail XS",
        model_type: ModelType::QuailXs,
        window_ms: 10,
        model_delay_ms: 10,
    },
    ModelDescriptor {
        name: "Quail XXS",
        model_type: ModelType::QuailXxs,
        window_ms: 10,
        model_delay_ms: 10,
    },
];

/// Descriptor for a selector index. Out-of-range indices fall back to the first model.
pub fn descriptor(index: usize) -> &'static ModelDescriptor {
    MODELS.get(index).unwrap_or(&MODELS[0])
}

// =============================================================================
// UI-FACING MODEL STATE
// =============================================================================

/// What the info panel should show for the active model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModelState {
    Initialized = 0,
    Loading = 1,
    WrongAudioSettings = 2,
    LicenseInactive = 3,
    ProcessingNotAllowed = 4,
}

impl ModelState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => ModelState::Initialized,
            1 => ModelState::Loading,
            2 => ModelState::WrongAudioSettings,
            4 => ModelState::ProcessingNotAllowed,
            _ => ModelState::LicenseInactive,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ModelState::Initialized => "",
            ModelState::Loading => "Loading model...",
            ModelState::WrongAudioSettings => "Unsupported audio settings...",
            ModelState::LicenseInactive => {
                "No license found, open the license panel at the top right..."
            }
            ModelState::ProcessingNotAllowed => {
                "License server disallowed processing or could not be reached, \
                 check the dev portal and your internet connection..."
            }
        }
    }
}

/// Metadata rows for an initialized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelUiInfo {
    pub optimal_sample_rate: u32,
    pub optimal_num_frames: usize,
    pub window_ms: u32,
    pub model_delay_ms: u32,
    pub output_delay_ms: u32,
}

impl ModelUiInfo {
    /// `output_delay` is in samples at `sample_rate`.
    pub fn new(
        descriptor: &ModelDescriptor,
        optimal_sample_rate: u32,
        optimal_num_frames: usize,
        output_delay: usize,
        sample_rate: u32,
    ) -> Self {
        let output_delay_ms = if sample_rate > 0 {
            ((output_delay as f64 * 1000.0) / sample_rate as f64) as u32
        } else {
            0
        };
        Self {
            optimal_sample_rate,
            optimal_num_frames,
            window_ms: descriptor.window_ms,
            model_delay_ms: descriptor.model_delay_ms,
            output_delay_ms,
        }
    }

    /// Label/value pairs in display order.
    pub fn rows(&self) -> [(&'static str, String); 5] {
        [
            (
                "Optimal Sample Rate",
                format!("{} Hz", self.optimal_sample_rate),
            ),
            ("Optimal Num Frames", self.optimal_num_frames.to_string()),
            ("Window Length", format!("{} ms", self.window_ms)),
            ("Model Delay", format!("{} ms", self.model_delay_ms)),
            ("Total Output Delay", format!("{} ms", self.output_delay_ms)),
        ]
    }
}
