/// Range and rest position of a control, in its native integer units (dB, Hz or pan units).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlRange {
    pub min: i32,
    pub max: i32,
    /// The value the control returns to on reset.
    pub rest: i32,
}
impl ControlRange {
    pub const fn new(min: i32, max: i32, rest: i32) -> Self {
        Self { min, max, rest }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Rounds a number read from a state document to control units.
    ///
    /// Returns `None` for values outside the range, so they can be skipped instead of clamped.
    pub fn from_document(&self, value: f64) -> Option<i32> {
        if !value.is_finite() {
            return None;
        }
        let rounded = value.round();
        if rounded < self.min as f64 || rounded > self.max as f64 {
            return None;
        }
        Some(rounded as i32)
    }
}

/// Channel input gain, in dB.
pub const INPUT_GAIN: ControlRange = ControlRange::new(-96, 24, 0);
/// Channel, subgroup and main faders, in dB.
pub const FADER_GAIN: ControlRange = ControlRange::new(-96, 12, 0);
/// Aux send and aux return gain, in dB.
pub const AUX_GAIN: ControlRange = ControlRange::new(-96, 12, 0);
/// Boost or cut of each equalizer band, in dB.
pub const EQ_AMOUNT: ControlRange = ControlRange::new(-15, 15, 0);
/// Corner frequency of the low shelf, in Hz.
pub const LOW_FREQUENCY: ControlRange = ControlRange::new(20, 1000, 200);
/// Center frequency of the mid band, in Hz.
pub const MID_FREQUENCY: ControlRange = ControlRange::new(200, 8000, 4000);
/// Raw pan position, from full left to full right.
pub const PANORAMA: ControlRange = ControlRange::new(-100, 100, 0);

/// Maps a raw [`PANORAMA`] position to `0.0` (full left) ..= `1.0` (full right).
pub fn normalize_panorama(raw: i32) -> f32 {
    let span = (PANORAMA.max - PANORAMA.min) as f32;
    (PANORAMA.clamp(raw) - PANORAMA.min) as f32 / span
}
