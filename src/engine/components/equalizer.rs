use std::fmt::Debug;

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use crate::engine::traits::Stage;
use crate::engine::{Info, Sample};

/// Q of the low shelf.
const LOW_SHELF_Q: f32 = 1.2;
/// Width of the mid band, in Hz.
const MID_BANDWIDTH: f32 = 500.0;
/// Fixed corner of the high shelf, in Hz.
const HIGH_SHELF_FREQUENCY: f32 = 12_000.0;
/// Q of the high shelf.
const HIGH_SHELF_Q: f32 = 0.5;

/// Controls of a [`ThreeBandEqualizer`]. Amounts in dB, frequencies in Hz.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EqualizerSettings {
    pub low_amount: f32,
    pub low_frequency: f32,
    pub mid_amount: f32,
    pub mid_frequency: f32,
    pub high_amount: f32,
}
impl Default for EqualizerSettings {
    fn default() -> Self {
        Self {
            low_amount: 0.0,
            low_frequency: 200.0,
            mid_amount: 0.0,
            mid_frequency: 4000.0,
            high_amount: 0.0,
        }
    }
}

/// One biquad section, bypassed when flat or when its frequency can't be represented.
struct Band {
    filter: DirectForm2Transposed<f32>,
    active: bool,
}
impl Band {
    fn new() -> Self {
        Self {
            filter: DirectForm2Transposed::<f32>::new(Coefficients {
                a1: 0.0,
                a2: 0.0,
                b0: 1.0,
                b1: 0.0,
                b2: 0.0,
            }),
            active: false,
        }
    }

    fn configure(
        &mut self,
        filter: Type<f32>,
        amount: f32,
        sample_rate: u32,
        frequency: f32,
        q: f32,
    ) {
        if amount == 0.0 {
            self.active = false;
            return;
        }

        let coefficients =
            Coefficients::<f32>::from_params(filter, (sample_rate as f32).hz(), frequency.hz(), q);
        match coefficients {
            Ok(coefficients) => {
                if self.active {
                    self.filter.update_coefficients(coefficients);
                } else {
                    // Start from clean filter memory.
                    self.filter = DirectForm2Transposed::<f32>::new(coefficients);
                }
                self.active = true;
            }
            // Frequency at or above Nyquist, or a degenerate Q.
            Err(_) => self.active = false,
        }
    }

    fn run(&mut self, sample: Sample) -> Sample {
        if self.active {
            self.filter.run(sample)
        } else {
            sample
        }
    }
}

/// Low shelf, mid band and high shelf in series.
///
/// Coefficients are only recalculated when the settings or the sample rate change,
/// and filter memory carries over between blocks.
pub struct ThreeBandEqualizer {
    settings: EqualizerSettings,
    sample_rate: u32,

    low: Band,
    mid: Band,
    high: Band,
}
impl ThreeBandEqualizer {
    pub fn new(settings: EqualizerSettings, sample_rate: u32) -> Self {
        let mut equalizer = Self {
            settings,
            sample_rate,

            low: Band::new(),
            mid: Band::new(),
            high: Band::new(),
        };
        equalizer.configure();
        equalizer
    }

    pub fn settings(&self) -> EqualizerSettings {
        self.settings
    }

    pub fn set(&mut self, settings: EqualizerSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.configure();
        }
    }

    /// Whether any band currently alters the signal.
    pub fn is_active(&self) -> bool {
        self.low.active || self.mid.active || self.high.active
    }

    fn configure(&mut self) {
        let EqualizerSettings {
            low_amount,
            low_frequency,
            mid_amount,
            mid_frequency,
            high_amount,
        } = self.settings;
        let sample_rate = self.sample_rate;

        self.low.configure(
            Type::LowShelf(low_amount),
            low_amount,
            sample_rate,
            low_frequency,
            LOW_SHELF_Q,
        );
        self.mid.configure(
            Type::PeakingEQ(mid_amount),
            mid_amount,
            sample_rate,
            mid_frequency,
            mid_frequency / MID_BANDWIDTH,
        );
        self.high.configure(
            Type::HighShelf(high_amount),
            high_amount,
            sample_rate,
            HIGH_SHELF_FREQUENCY,
            HIGH_SHELF_Q,
        );
    }
}
impl Stage for ThreeBandEqualizer {
    fn process(&mut self, info: &Info, buffer: &mut [Sample]) {
        if info.sample_rate != self.sample_rate {
            self.sample_rate = info.sample_rate;
            self.configure();
        }
        if !self.is_active() {
            return;
        }

        for sample in buffer.iter_mut() {
            let low = self.low.run(*sample);
            let mid = self.mid.run(low);
            *sample = self.high.run(mid);
        }
    }
}
impl Debug for ThreeBandEqualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreeBandEqualizer")
            .field("settings", &self.settings)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}
