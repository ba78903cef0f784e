pub mod backend;
pub mod headless;
pub mod pipeline;

pub use backend::{AudioContext, AudioDevices, AudioPlayback, AudioRecorder, Visualizer};
pub use headless::HeadlessDevices;
pub use pipeline::AudioPipeline;
