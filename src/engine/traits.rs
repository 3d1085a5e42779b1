use std::fmt::Debug;

use super::{Info, Sample};

/// An in-place processor sitting somewhere in a signal chain, like a gain stage or an equalizer.
///
/// Runs on the audio thread, so implementations must not block or allocate.
pub trait Stage: Send + Debug {
    fn process(&mut self, info: &Info, buffer: &mut [Sample]);
}
