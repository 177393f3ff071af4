// SPDX-License-Identifier: Apache-2.0

//! State shared between interrupt handlers and the tick context.

use portable_atomic::{AtomicBool, Ordering};

/// Signals that the DMA transfer in flight has filled its block.
///
/// Written only by the DMA interrupt handler, read and cleared only by the
/// [`AcquisitionEngine`](crate::acquisition::AcquisitionEngine). The handler touches nothing else.
pub struct CompletionFlag(AtomicBool);

impl CompletionFlag {
    /// Create a cleared flag, usable in a `static`
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark the current transfer as complete. Called from the interrupt handler.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag before a new transfer is started
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Read the flag and clear it in one step.
    ///
    /// Thumbv6m has no native swap; `portable-atomic` falls back to a critical section there.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}
