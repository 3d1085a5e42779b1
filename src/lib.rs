//! Headless software mixing console.
//!
//! Channel strips are summed into eight subgroup buses and a stereo main bus, once per audio block.
//! Every mixer component comes as a pair: a control handle (e.g. [`ChannelStrip`]) living wherever the
//! user interface lives, and a processor (e.g. [`MixBusEngine`]) living on the audio thread.
//! The two halves share their parameters through atomics, so the audio thread never waits on the controls.

#[cfg(any(feature = "test_alloc", test))]
#[macro_use]
mod test_alloc;
#[cfg(not(any(feature = "test_alloc", test)))]
macro_rules! no_heap {
    ($body:block) => {
        $body
    };
}

#[cfg(feature = "record_output")]
mod wav_recorder;

mod engine;
pub use engine::*;
