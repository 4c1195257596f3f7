pub mod biquad;
pub mod noise_gate;
pub mod utils;

pub use biquad::Biquad;
pub use noise_gate::NoiseGate;
