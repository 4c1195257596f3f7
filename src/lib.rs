pub mod bridge;
mod debug;
pub mod dsp;
pub mod error;
pub mod license;
pub mod lifecycle;
mod loader;
pub mod models;
pub mod sdk;
pub mod status;
#[cfg(test)]
mod testing;
mod ui;

use crate::bridge::Controls;
use crate::license::LicenseStore;
use crate::lifecycle::{ModelController, ModelSlot};
use crate::sdk::{AudioConfig, LocalFactory, ModelType};
use assert_no_alloc::permit_alloc;
use nih_plug::prelude::*;
use nih_plug_vizia::{create_vizia_editor, ViziaState, ViziaTheming};
use std::sync::Arc;
use ui::build_ui;

const DEFAULT_CHANNELS: u16 = 2;

// -----------------------------------------------------------------------------
// PARAMETERS
// -----------------------------------------------------------------------------
#[derive(Params)]
pub struct AicParams {
    #[id = "model"]
    pub model: EnumParam<ModelType>,

    /// Wet amount of the enhancement, 0..1
    #[id = "enhancement"]
    pub enhancement: FloatParam,

    #[id = "voicegain"]
    pub voice_gain: FloatParam,

    #[id = "noisegateenable"]
    pub noise_gate: BoolParam,
}

fn format_percent(v: f32) -> String {
    format!("{:.0}%", v * 100.0)
}

fn format_db(v: f32) -> String {
    format!("{:.1} dB", v)
}

impl Default for AicParams {
    fn default() -> Self {
        Self {
            model: EnumParam::new("Model", ModelType::QuailL48),

            enhancement: FloatParam::new(
                "Enhancement",
                1.0,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_value_to_string(Arc::new(format_percent)),

            voice_gain: FloatParam::new(
                "Voice Gain",
                1.0,
                FloatRange::Linear {
                    min: -12.0,
                    max: 12.0,
                },
            )
            .with_step_size(0.1)
            .with_value_to_string(Arc::new(format_db)),

            noise_gate: BoolParam::new("Noise Gate", false),
        }
    }
}

impl AicParams {
    pub fn model_index(&self) -> usize {
        self.model.value().to_index()
    }

    pub fn controls(&self) -> Controls {
        Controls {
            enhancement: self.enhancement.value(),
            voice_gain_db: self.voice_gain.value(),
            noise_gate: self.noise_gate.value(),
        }
    }
}

// -----------------------------------------------------------------------------
// PLUGIN STRUCT
// -----------------------------------------------------------------------------
pub struct AicEnhancePlugin {
    params: Arc<AicParams>,
    editor_state: Arc<ViziaState>,
    controller: Arc<ModelController>,
    slot: ModelSlot,
}

impl Default for AicEnhancePlugin {
    fn default() -> Self {
        let params = Arc::new(AicParams::default());
        let (controller, slot) = lifecycle::start(
            Arc::new(LocalFactory),
            LicenseStore::default(),
            params.model_index(),
        );

        Self {
            params,
            editor_state: ViziaState::new(|| (420, 520)),
            controller,
            slot,
        }
    }
}

impl Plugin for AicEnhancePlugin {
    const NAME: &'static str = "aic Enhance";
    const VENDOR: &'static str = "ai-coustics";
    const URL: &'static str = "https://ai-coustics.com";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        #[cfg(feature = "debug")]
        crate::debug::logger::init_logger();

        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let channels = audio_io_layout
                .main_output_channels
                .map(|c| c.get() as u16)
                .unwrap_or(DEFAULT_CHANNELS);
            let config = AudioConfig::new(
                buffer_config.sample_rate as u32,
                channels,
                buffer_config.max_buffer_size as usize,
            );
            if config.is_degenerate() {
                log::warn!("Host handed us a degenerate configuration: {:?}", config);
            }

            let index = self.params.model_index();
            let latency = permit_alloc(|| self.slot.prepare(config, index));
            context.set_latency_samples(latency);

            crate::debug::drain();
            true
        }))
        .unwrap_or(false)
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        let params = self.params.clone();
        let controller = self.controller.clone();
        create_vizia_editor(
            self.editor_state.clone(),
            ViziaTheming::default(),
            move |cx, gui_context| {
                build_ui(cx, params.clone(), controller.clone(), gui_context);
            },
        )
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.process_internal(buffer, context)
        }))
        .unwrap_or(ProcessStatus::Normal)
    }

    fn reset(&mut self) {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.slot.reset();
        }))
        .unwrap_or(());
    }
}

impl AicEnhancePlugin {
    fn process_internal(
        &mut self,
        buffer: &mut Buffer,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        if self.slot.sync(self.params.model_index()) {
            context.set_latency_samples(self.slot.latency_samples());
        }

        let controls = self.params.controls();
        if let Err(e) = bridge::process_block(&mut self.slot, buffer.as_slice(), &controls) {
            if !e.is_pass_through() {
                aic_log!("block passed through: {}", e);
            }
        }

        ProcessStatus::Normal
    }
}

impl ClapPlugin for AicEnhancePlugin {
    const CLAP_ID: &'static str = "com.ai-coustics.aic-enhance";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("Real-time speech enhancement");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Restoration,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for AicEnhancePlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"AicEnhanceSpeech";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Restoration];
}

nih_export_clap!(AicEnhancePlugin);
nih_export_vst3!(AicEnhancePlugin);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_defaults() {
        let p = AicParams::default();
        assert_eq!(p.model.value(), ModelType::QuailL48);
        assert_eq!(p.enhancement.value(), 1.0);
        assert_eq!(p.voice_gain.value(), 1.0);
        assert!(!p.noise_gate.value());
        assert_eq!(p.model_index(), 0);
    }

    #[test]
    fn test_controls_snapshot() {
        let c = AicParams::default().controls();
        assert_eq!(c, Controls::default());
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_percent(0.5), "50%");
        assert_eq!(format_db(-3.0), "-3.0 dB");
    }
}
