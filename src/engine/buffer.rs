use super::Sample;

/// Lowest level the console distinguishes from silence, in dB.
///
/// Gains at or below this are treated as silence, and the peak of a silent buffer is reported as this.
pub const SILENCE_DB: f32 = -96.0;

/// Converts a linear magnitude to decibels, flooring at [`SILENCE_DB`].
pub fn linear_to_db(value: f32) -> f32 {
    let value = value.abs();
    if value <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * value.log10()).max(SILENCE_DB)
}

/// Converts decibels to a linear factor. Anything at or below [`SILENCE_DB`] becomes `0.0`.
pub fn db_to_linear(db: f32) -> f32 {
    if db <= SILENCE_DB {
        return 0.0;
    }
    10.0_f32.powf(db / 20.0)
}

/// Block operations on a slice of samples.
///
/// Implemented for `[Sample]`, so port buffers and pooled scratch buffers work the same.
/// Operations between two buffers panic in debug mode if their lengths differ.
pub trait SampleBuffer {
    /// Overwrite `other` with the contents of this buffer.
    fn copy_to(&self, other: &mut [Sample]);
    /// Zero-fill.
    fn clear(&mut self);
    /// Add this buffer, multiplied by `scale`, onto `other`.
    fn add_to(&self, other: &mut [Sample], scale: f32);
    /// Multiply every sample by `factor`.
    fn apply_gain(&mut self, factor: f32);
    /// Largest absolute sample value.
    fn peak(&self) -> f32;
    /// [`Self::peak`] in dB.
    fn peak_db(&self) -> f32 {
        linear_to_db(self.peak())
    }
}

impl SampleBuffer for [Sample] {
    fn copy_to(&self, other: &mut [Sample]) {
        debug_assert_eq!(self.len(), other.len(), "Buffers of different sizes");
        other.copy_from_slice(self);
    }

    fn clear(&mut self) {
        self.fill(0.0);
    }

    fn add_to(&self, other: &mut [Sample], scale: f32) {
        debug_assert_eq!(self.len(), other.len(), "Buffers of different sizes");
        if scale == 0.0 {
            return;
        }
        for (out, &sample) in other.iter_mut().zip(self) {
            *out += sample * scale;
        }
    }

    fn apply_gain(&mut self, factor: f32) {
        if factor == 1.0 {
            return;
        }
        for sample in self.iter_mut() {
            *sample *= factor;
        }
    }

    fn peak(&self) -> f32 {
        self.iter().fold(0.0, |max, &sample| sample.abs().max(max))
    }
}
