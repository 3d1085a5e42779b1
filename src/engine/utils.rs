use std::fmt::Debug;
use std::sync::atomic::{AtomicU32, Ordering};

/// Macro for conveniently initializing a static array of a given size, of a type that is not [`Copy`].
///
/// The `initial` expression is evaluated for each element in the array.
#[doc(hidden)]
#[macro_export]
macro_rules! non_copy_array {
    ($initial:expr; $size:expr) => {
        [(); $size].map(|_| $initial)
    };
}

/// Atomic supporting storing and loading of an f32, via the raw bits of a u32.
pub struct AtomicF32 {
    inner: AtomicU32,
}
impl AtomicF32 {
    pub fn new(v: f32) -> Self {
        Self {
            inner: AtomicU32::new(v.to_bits()),
        }
    }

    pub fn store(&self, val: f32, order: Ordering) {
        self.inner.store(val.to_bits(), order);
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.inner.load(order))
    }
}
impl Debug for AtomicF32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.load(Ordering::Relaxed), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_copy_array_macro() {
        let arrays: [Vec<u8>; 3] = non_copy_array![Vec::with_capacity(4); 3];
        assert!(arrays.iter().all(|v| v.is_empty() && v.capacity() >= 4));
    }

    // Just a surface-level test, no concurrency or anything.
    #[test]
    fn atomic_f32() {
        let a_f32 = AtomicF32::new(0.0);

        a_f32.store(-3.5, Ordering::Relaxed);

        assert_eq!(a_f32.load(Ordering::Relaxed), -3.5);
    }
}
