use crate::engine::traits::Stage;
use crate::engine::{db_to_linear, Info, Sample, SampleBuffer};

/// Scalar amplifier, one per amplification point of a channel or bus.
///
/// Gain is given in dB: `0.0` passes the signal unchanged,
/// and anything at or below [`crate::SILENCE_DB`] silences it.
///
/// When the gain changes between two blocks, the next block ramps linearly from the old to the new factor,
/// to avoid zipper noise. The very first block processed starts directly at the set gain.
#[derive(Debug, Clone)]
pub struct GainStage {
    gain_db: f32,
    target: f32,
    current: f32,
    primed: bool,
}
impl GainStage {
    pub fn new(gain_db: f32) -> Self {
        let factor = db_to_linear(gain_db);
        Self {
            gain_db,
            target: factor,
            current: factor,
            primed: false,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain_db
    }

    pub fn set_gain(&mut self, gain_db: f32) {
        if gain_db != self.gain_db {
            self.gain_db = gain_db;
            self.target = db_to_linear(gain_db);
        }
    }

    /// Apply the gain in place.
    pub fn process(&mut self, buffer: &mut [Sample]) {
        if !self.primed {
            self.current = self.target;
            self.primed = true;
        }

        if self.current == self.target || buffer.is_empty() {
            buffer.apply_gain(self.target);
        } else {
            let step = (self.target - self.current) / buffer.len() as f32;
            for (i, sample) in buffer.iter_mut().enumerate() {
                *sample *= self.current + step * (i + 1) as f32;
            }
        }
        self.current = self.target;
    }
}
impl Default for GainStage {
    fn default() -> Self {
        Self::new(0.0)
    }
}
impl Stage for GainStage {
    fn process(&mut self, _info: &Info, buffer: &mut [Sample]) {
        GainStage::process(self, buffer);
    }
}
