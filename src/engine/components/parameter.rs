use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use super::controls::ControlRange;
use crate::engine::utils::AtomicF32;
use crate::engine::SILENCE_DB;

/// Represents a numeric value controlled by the user, by a knob or slider for example.
///
/// Stored in the control's native integer units, and shared between the control handle and the audio thread.
/// Writes from the control side never block the reader.
pub struct IntParameter {
    value: AtomicI32,
    range: ControlRange,
}
impl IntParameter {
    pub fn new(range: ControlRange) -> Self {
        Self {
            value: AtomicI32::new(range.rest),
            range,
        }
    }

    pub fn get(&self) -> i32 {
        self.value.load(Ordering::Relaxed)
    }

    /// Sets the value, clamped to the parameter's range.
    pub fn set(&self, value: i32) {
        self.value.store(self.range.clamp(value), Ordering::Relaxed);
    }
}
impl Debug for IntParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.get(), f)
    }
}

/// An on/off button, shared like [`IntParameter`].
pub struct Flag {
    value: AtomicBool,
}
impl Flag {
    pub fn new(initial: bool) -> Self {
        Self {
            value: AtomicBool::new(initial),
        }
    }

    pub fn get(&self) -> bool {
        self.value.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Relaxed);
    }
}
impl Debug for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.get(), f)
    }
}

/// Last peak level in dB, written by the audio thread once per block and polled by metering.
pub struct PeakLevel {
    db: AtomicF32,
}
impl PeakLevel {
    pub fn new() -> Self {
        Self {
            db: AtomicF32::new(SILENCE_DB),
        }
    }

    pub fn report(&self, db: f32) {
        self.db.store(db, Ordering::Relaxed);
    }

    pub fn read(&self) -> f32 {
        self.db.load(Ordering::Relaxed)
    }
}
impl Default for PeakLevel {
    fn default() -> Self {
        Self::new()
    }
}
impl Debug for PeakLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.read(), f)
    }
}
