// Only compiled with the `record_output` feature
#![allow(dead_code)]

use std::{fs, io};

use crate::engine::Sample;

/// Writes the interleaved main bus to `recorded.wav` in the crate root, for debugging by ear.
pub struct WavRecorder {
    writer: hound::WavWriter<io::BufWriter<fs::File>>,
}
impl WavRecorder {
    pub fn new(sample_rate: u32) -> Result<Self, hound::Error> {
        const PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/recorded.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        Ok(WavRecorder {
            writer: hound::WavWriter::create(PATH, spec)?,
        })
    }

    /// Records one block of the stereo main bus.
    ///
    /// Failures are dropped silently, since this runs on the audio thread.
    pub fn record(&mut self, left: &[Sample], right: &[Sample]) {
        for (&l, &r) in left.iter().zip(right) {
            let _ = self.writer.write_sample(l);
            let _ = self.writer.write_sample(r);
        }
    }
}
