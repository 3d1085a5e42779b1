mod buffer;
mod components;
pub mod config;
pub mod error;
mod info;
mod ports;
mod snapshot;
mod traits;
pub mod transport;
mod utils;

pub use buffer::{db_to_linear, linear_to_db, SampleBuffer, SILENCE_DB};
pub use components::channel_strip::{ChannelStrip, ChannelStripState, SubgroupPair};
pub use components::controls::{
    ControlRange, AUX_GAIN, EQ_AMOUNT, FADER_GAIN, INPUT_GAIN, LOW_FREQUENCY, MID_FREQUENCY,
    PANORAMA,
};
pub use components::equalizer::{EqualizerSettings, ThreeBandEqualizer};
pub use components::gain::GainStage;
pub use components::mixer::{
    mixer, MainChannel, MainSide, MainState, MixBusEngine, Mixer, MixerState, Subgroup,
    SubgroupState,
};
pub use config::MixerConfig;
pub use info::Info;
pub use ports::{MemoryPorts, PortBuffers, PortDirection, PortKey, PortRegistry};
pub use snapshot::{with_state_extension, STATE_FILE_EXTENSION};
pub use traits::Stage;
pub use transport::Transport;

/// Internally used sample format.
pub type Sample = f32;
/// Number of subgroup buses.
pub const SUBGROUPS: usize = 8;
/// Number of main bus channels (left and right).
pub const MAIN_CHANNELS: usize = 2;
/// Biggest block size used when none is configured.
pub const MAX_BLOCK_SIZE_DEFAULT: usize = 1024;
// SUBGROUPS, MAIN_CHANNELS and MAX_BLOCK_SIZE_DEFAULT are all usize, because they are mostly used for sizing and indexing Vec's.
