//! # Architecture Abstraction Layer
//!
//! The one non-portable seam of the scheduler: saving and restoring raw
//! execution state. A port exposes exactly two operations —
//! `seed_initial_frame` builds the synthetic frame that makes a context
//! startable, and the PendSV handler performs the live save/restore around
//! each rotation. Everything the control logic sees is an opaque [`Snapshot`].
//!
//! The Cortex-M4 port is the real one. On non-ARM hosts a stub port mirrors
//! its frame layout so the scheduler logic can be unit-tested off target.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;
#[cfg(not(target_arch = "arm"))]
pub mod host;

#[cfg(target_arch = "arm")]
pub(crate) use cortex_m4 as port;
#[cfg(not(target_arch = "arm"))]
pub(crate) use host as port;

/// Words in a full saved context: R4–R11 (software-stacked) followed by
/// R0–R3, R12, LR, PC, xPSR (hardware-stacked on exception entry).
pub const FRAME_WORDS: usize = 16;

/// Byte size of a full saved context frame.
pub const FRAME_BYTES: usize = FRAME_WORDS * 4;

/// Opaque saved execution state of a context: the process stack pointer
/// after the software-saved register block has been pushed.
///
/// Produced and consumed only by the port layer. The scheduler stores a
/// snapshot per context but never looks inside it; it is valid only while
/// the owning context is not Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot(usize);

impl Snapshot {
    /// Placeholder for a slot that has never been seeded.
    pub const fn empty() -> Self {
        Snapshot(0)
    }

    /// Wrap a raw stack-pointer value.
    pub const fn new(sp: usize) -> Self {
        Snapshot(sp)
    }

    /// The raw stack-pointer value.
    #[inline]
    pub const fn sp(self) -> usize {
        self.0
    }
}
