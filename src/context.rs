//! # Context Record
//!
//! The schedulable unit of Rondo. Each context owns a stack region, carries
//! the entry function and argument it will be started with, and moves through
//! a three-state lifecycle driven entirely by the dispatcher.
//!
//! Contexts live in a fixed array inside the [`Scheduler`](crate::scheduler::Scheduler)
//! and are linked into a circular chain by slot index — there is no heap and
//! no removal path, so a slot, once allocated, stays allocated forever.

use crate::arch::Snapshot;

/// Entry point type for a context body.
///
/// The body receives the single machine-word argument captured at creation.
/// Bodies are expected to run forever; returning from one is a fatal
/// scheduler condition (the core is parked with interrupts disabled).
pub type ContextEntry = extern "C" fn(usize);

// ---------------------------------------------------------------------------
// Context state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a context.
///
/// ```text
///   ┌───────┐  first dispatch   ┌─────────┐    tick fires    ┌───────────┐
///   │ Ready │ ────────────────► │ Running │ ───────────────► │ Suspended │
///   └───────┘                   └─────────┘                  └───────────┘
///                                    ▲        chain returns       │
///                                    └────────────────────────────┘
/// ```
///
/// `Ready` is transient: it occurs at most once per context, before its
/// first dispatch. There is no terminal state — contexts never exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but never dispatched. The saved snapshot points at the
    /// seeded first-run frame.
    Ready,
    /// Currently executing on the core. At most one context is ever in
    /// this state.
    Running,
    /// Preempted at a tick boundary; the snapshot holds the live stack
    /// pointer captured at the moment of interruption.
    Suspended,
}

// ---------------------------------------------------------------------------
// Context record
// ---------------------------------------------------------------------------

/// One schedulable unit: saved execution state, stack ownership, and the
/// circular-chain link.
///
/// The stack region is identified by an offset and length into the
/// scheduler's stack pool. Regions are carved monotonically and never
/// recycled, so no two contexts ever alias the same bytes.
pub struct Context {
    /// Slot index in the scheduler array. Kept for diagnostics.
    pub(crate) id: usize,

    /// Current lifecycle state.
    pub(crate) state: ContextState,

    /// Body invoked by the first-run trampoline, exactly once.
    pub(crate) entry: ContextEntry,

    /// Argument handed to `entry`, verbatim, on first dispatch.
    pub(crate) arg: usize,

    /// Saved execution state. Valid only while the context is not Running.
    pub(crate) snapshot: Snapshot,

    /// Byte offset of this context's stack region in the pool.
    pub(crate) stack_offset: usize,

    /// Length of the stack region in bytes.
    pub(crate) stack_len: usize,

    /// Index of the next context in the circular chain. Self-linked for a
    /// one-element chain.
    pub(crate) next: usize,
}

extern "C" fn unassigned(_arg: usize) {}

impl Context {
    /// An unallocated slot. Used to const-initialize the scheduler array;
    /// slots in this state are never linked into the chain.
    pub(crate) const EMPTY: Self = Self {
        id: 0,
        state: ContextState::Ready,
        entry: unassigned,
        arg: 0,
        snapshot: Snapshot::empty(),
        stack_offset: 0,
        stack_len: 0,
        next: 0,
    };

    /// Fill in a freshly allocated slot. The chain link is self-referential
    /// until the scheduler splices the context in.
    pub(crate) fn init(
        &mut self,
        id: usize,
        entry: ContextEntry,
        arg: usize,
        snapshot: Snapshot,
        stack_offset: usize,
        stack_len: usize,
    ) {
        self.id = id;
        self.state = ContextState::Ready;
        self.entry = entry;
        self.arg = arg;
        self.snapshot = snapshot;
        self.stack_offset = stack_offset;
        self.stack_len = stack_len;
        self.next = id;
    }

    /// Slot index of this context.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// The body this context was created with.
    #[inline]
    pub fn entry(&self) -> ContextEntry {
        self.entry
    }

    /// The argument captured at creation.
    #[inline]
    pub fn arg(&self) -> usize {
        self.arg
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn body(_arg: usize) {}

    #[test]
    fn init_sets_ready_and_captures_entry() {
        let mut ctx = Context::EMPTY;
        ctx.init(3, body, 0xBEEF, Snapshot::new(0x2000_0400), 256, 512);

        assert_eq!(ctx.id(), 3);
        assert_eq!(ctx.state(), ContextState::Ready);
        assert_eq!(ctx.arg(), 0xBEEF);
        assert_eq!(ctx.entry() as usize, body as usize);
        assert_eq!(ctx.snapshot, Snapshot::new(0x2000_0400));
    }

    #[test]
    fn init_self_links_the_chain() {
        let mut ctx = Context::EMPTY;
        ctx.init(5, body, 0, Snapshot::empty(), 0, 256);
        assert_eq!(ctx.next, 5);
    }
}
