//! Global allocator that can forbid heap traffic on the current thread.
//!
//! The audio callback must never allocate, so every call into [`crate::MixBusEngine::process`]
//! made by tests and by the transports is wrapped in `no_heap!`.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
    marker::PhantomData,
    thread,
};

use backtrace::Backtrace;

#[cfg(not(test))]
#[global_allocator]
static GLOBAL: GuardedAlloc<PrintError> = GuardedAlloc {
    inner: System,
    error: PhantomData,
};
#[cfg(test)]
#[global_allocator]
static GLOBAL: GuardedAlloc<PanicError> = GuardedAlloc {
    inner: System,
    error: PhantomData,
};

thread_local!(static HEAP_ALLOWED: Cell<bool> = const { Cell::new(true) });

macro_rules! no_heap {
    {$body:block} => {{
        let _g = crate::test_alloc::HeapGuard::new(false);
        let _r = $body;
        drop(_g);
        _r
    }}
}

#[allow(unused_macros)]
macro_rules! allow_heap {
    {$body:block} => {{
        let _g = crate::test_alloc::HeapGuard::new(true);
        let _r = $body;
        drop(_g);
        _r
    }}
}

pub fn is_allowed() -> bool {
    HEAP_ALLOWED.with(|a| a.get())
}
pub fn set_allowed(allowed: bool) {
    HEAP_ALLOWED.with(|a| a.set(allowed));
}

pub struct GuardedAlloc<E: ErrorHandler> {
    inner: System,
    error: PhantomData<E>,
}
impl<E: ErrorHandler> GuardedAlloc<E> {
    fn check(&self, action: &str) {
        if !is_allowed() {
            // Reporting may itself allocate.
            set_allowed(true);
            E::error(action);
            set_allowed(false);
        }
    }
}
unsafe impl<E> GlobalAlloc for GuardedAlloc<E>
where
    E: ErrorHandler,
{
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.check("Heap allocation on the audio thread");
        self.inner.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.check("Heap deallocation on the audio thread");
        self.inner.dealloc(ptr, layout)
    }
}
unsafe impl<E> Send for GuardedAlloc<E> where E: ErrorHandler {}
unsafe impl<E> Sync for GuardedAlloc<E> where E: ErrorHandler {}

/// Sets whether heap traffic is allowed, restoring the previous setting when dropped.
pub struct HeapGuard(bool);
impl HeapGuard {
    pub fn new(allowed: bool) -> Self {
        let before = is_allowed();
        set_allowed(allowed);
        Self(before)
    }
}
impl Drop for HeapGuard {
    fn drop(&mut self) {
        set_allowed(self.0);
    }
}

pub trait ErrorHandler {
    fn error(msg: &str);
}

pub struct PrintError;
impl ErrorHandler for PrintError {
    fn error(msg: &str) {
        eprintln!("{}\n{:?}", msg, Backtrace::new());
    }
}

pub struct PanicError;
impl ErrorHandler for PanicError {
    fn error(msg: &str) {
        if !thread::panicking() {
            panic!("{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn allowed_by_default() {
        let v = vec![1.0_f32; 16];
        drop(v);
    }

    #[test]
    #[should_panic]
    fn allocation_disallowed() {
        let v = no_heap! {{ vec![0.0_f32; 16] }};
        drop(v);
    }

    #[test]
    #[should_panic]
    fn deallocation_disallowed() {
        let v = vec![0.0_f32; 16];
        no_heap! {{ drop(v); }}
    }

    #[test]
    fn in_place_work_is_fine() {
        let mut v = vec![1.0_f32; 16];
        no_heap! {{
            for sample in v.iter_mut() {
                *sample *= 0.5;
            }
        }}
        assert!(v.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn allow_inside() {
        let mut v = vec![0.0_f32; 4];
        no_heap! {{
            allow_heap! {{
                v = vec![2.0; 8];
            }}
            v[0] += 1.0;
        }}
        assert_eq!(v[0], 3.0);
        assert_eq!(v.len(), 8);
    }
}
