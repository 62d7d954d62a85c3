// Single-slot position hand-off from the playback worker to the controller

use std::sync::atomic::{AtomicU64, Ordering};

// NaN bit pattern; a published position is never NaN.
const EMPTY: u64 = u64::MAX;

/// Latest-value-wins slot holding one playback position in seconds.
///
/// Publishing overwrites whatever is unread and taking empties the slot.
/// Neither side ever blocks or allocates, so the worker can publish from
/// inside the audio callback.
#[derive(Debug)]
pub struct PositionRelay {
    slot: AtomicU64,
}

impl PositionRelay {
    pub fn new() -> Self {
        Self {
            slot: AtomicU64::new(EMPTY),
        }
    }

    pub fn publish(&self, seconds: f64) {
        debug_assert!(!seconds.is_nan());
        self.slot.store(seconds.to_bits(), Ordering::Release);
    }

    /// Take the unread position, if any
    pub fn take(&self) -> Option<f64> {
        match self.slot.swap(EMPTY, Ordering::AcqRel) {
            EMPTY => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    pub fn clear(&self) {
        self.slot.store(EMPTY, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.slot.load(Ordering::Acquire) == EMPTY
    }
}

impl Default for PositionRelay {
    fn default() -> Self {
        Self::new()
    }
}
