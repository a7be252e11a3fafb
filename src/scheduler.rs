//! # Scheduler
//!
//! Core scheduling logic for Rondo: the circular ready chain, context
//! creation, and the rotation performed on every tick.
//!
//! ## Scheduling Algorithm
//!
//! Strict round robin over a circular, singly linked chain of contexts.
//! On each quantum the PendSV handler:
//! 1. records the outgoing context's snapshot and marks it Suspended
//!    ([`Scheduler::record_suspend`])
//! 2. advances `current` to the next context in chain order
//!    ([`Scheduler::rotate`]) — no skipping, no priorities, no weighting
//! 3. restores the incoming snapshot; a context on its first dispatch
//!    resumes into the first-run trampoline seeded at creation
//!
//! ## Chain Order
//!
//! A new context is spliced in immediately after `current` — "next to run",
//! not "last to run". Before the scheduler has started, `current` also
//! advances to each new context, so contexts created A, B, C before start
//! rotate as A, B, C. A context created while the rotation is live runs on
//! the very next tick after its creator's quantum expires.
//!
//! ## Mutual Exclusion
//!
//! There is one core and no locks. Thread-mode callers reach this module
//! through `kernel`'s critical sections; PendSV and SysTick run at the same
//! (lowest) exception priority and therefore serialize against each other.
//! Masking the tick source is the entire synchronization story.

use crate::arch::{self, Snapshot};
use crate::config::{MAX_CONTEXTS, MIN_STACK_SIZE, STACK_POOL_SIZE};
use crate::context::{Context, ContextEntry, ContextState};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported at the scheduler's API boundary.
///
/// All of these occur before ticking begins (or at creation time between
/// ticks). Once the rotation is live there is no caller left to report to;
/// fatal conditions halt the core instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// `stack_size` was zero.
    InvalidArgument,
    /// Context slots or stack pool exhausted. The chain is left untouched.
    AllocationError,
    /// `start()` was called with an empty chain — there is nothing to run.
    NoContexts,
}

// ---------------------------------------------------------------------------
// Dispatch outcome
// ---------------------------------------------------------------------------

/// Outcome of one rotation: which kind of hand-off the port must perform.
///
/// Both carry the incoming context's snapshot; the distinction matters only
/// for diagnostics and tests, because a first dispatch restores a seeded
/// frame whose PC is the first-run trampoline rather than a real save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The incoming context was Ready: this is its first-ever dispatch.
    FirstRun(Snapshot),
    /// The incoming context resumes exactly where it was last suspended.
    Resume(Snapshot),
}

impl Dispatch {
    /// The snapshot the port must restore.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        match *self {
            Dispatch::FirstRun(s) | Dispatch::Resume(s) => s,
        }
    }

    /// True for a context's first-ever dispatch.
    #[inline]
    pub fn is_first_run(&self) -> bool {
        matches!(self, Dispatch::FirstRun(_))
    }
}

// ---------------------------------------------------------------------------
// Stack pool
// ---------------------------------------------------------------------------

/// Backing storage for every context stack, aligned for AAPCS. Regions are
/// carved with a monotonic bump offset; nothing is ever freed.
#[repr(align(8))]
struct StackPool([u8; STACK_POOL_SIZE]);

const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The scheduler instance: context slots, the stack pool, and the chain
/// cursor. Stored as a single static in `kernel`; all process-wide state
/// lives here rather than in loose module globals.
pub struct Scheduler {
    /// Fixed array of context slots. Slots `0..count` are allocated.
    contexts: [Context; MAX_CONTEXTS],

    /// Backing memory for context stacks.
    pool: StackPool,

    /// Bump offset: bytes of the pool already handed out.
    pool_used: usize,

    /// Chain cursor. While the rotation is live this is the Running
    /// context; before start it is the most recently created one, so the
    /// first dispatch lands on the first-created. Meaningless while
    /// `count == 0`.
    current: usize,

    /// Number of allocated contexts.
    count: usize,

    /// Set by the first rotation; freezes the pre-start cursor behavior.
    started: bool,
}

impl Scheduler {
    /// A scheduler with an empty chain.
    pub const fn new() -> Self {
        Self {
            contexts: [Context::EMPTY; MAX_CONTEXTS],
            pool: StackPool([0; STACK_POOL_SIZE]),
            pool_used: 0,
            current: 0,
            count: 0,
            started: false,
        }
    }

    /// Number of contexts in the chain.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The context the cursor points at. Once the rotation is live this is
    /// the Running context.
    #[inline]
    pub fn current_context(&self) -> &Context {
        &self.contexts[self.current]
    }

    /// Allocate and chain a new context.
    ///
    /// Carves a `stack_size`-byte region from the pool (rounded up to
    /// [`MIN_STACK_SIZE`](crate::config::MIN_STACK_SIZE) and 8-byte
    /// alignment), seeds its first-run frame at the region top, and splices
    /// the context into the circular chain immediately after the cursor.
    ///
    /// Must run with the tick source masked for its whole duration: the
    /// splice touches the same links the dispatcher walks.
    ///
    /// # Errors
    /// - [`SchedulerError::InvalidArgument`] — `stack_size` is zero
    /// - [`SchedulerError::AllocationError`] — no free slot, or the pool
    ///   cannot fit the region
    ///
    /// On error the chain is left exactly as it was.
    pub fn create_context(
        &mut self,
        stack_size: usize,
        entry: ContextEntry,
        arg: usize,
    ) -> Result<usize, SchedulerError> {
        if stack_size == 0 {
            return Err(SchedulerError::InvalidArgument);
        }
        if self.count >= MAX_CONTEXTS {
            return Err(SchedulerError::AllocationError);
        }

        // Saturating: an absurd request must land in AllocationError below,
        // not overflow.
        let len = stack_size.max(MIN_STACK_SIZE).saturating_add(7) & !7;
        let offset = align_up(self.pool_used, 8);
        let end = match offset.checked_add(len) {
            Some(end) if end <= STACK_POOL_SIZE => end,
            _ => return Err(SchedulerError::AllocationError),
        };

        let id = self.count;
        let snapshot = arch::port::seed_initial_frame(&mut self.pool.0[offset..end]);
        self.contexts[id].init(id, entry, arg, snapshot, offset, len);

        // Splice next to the cursor: new contexts are "next to run".
        if self.count > 0 {
            let head = self.current;
            self.contexts[id].next = self.contexts[head].next;
            self.contexts[head].next = id;
        }
        // Until the first dispatch the cursor tracks the latest creation,
        // so the rotation enters the chain at the first-created context.
        if !self.started {
            self.current = id;
        }

        self.pool_used = end;
        self.count += 1;
        Ok(id)
    }

    /// Record the outgoing context's saved state.
    ///
    /// Called by the port after it has pushed the software-saved registers;
    /// `snapshot` captures exactly where execution was interrupted. A no-op
    /// if nothing is Running (the initial dispatch has no outgoing context).
    pub fn record_suspend(&mut self, snapshot: Snapshot) {
        let current = &mut self.contexts[self.current];
        if current.state == ContextState::Running {
            current.state = ContextState::Suspended;
            current.snapshot = snapshot;
        }
    }

    /// Advance the rotation by one tick and mark the incoming context
    /// Running.
    ///
    /// The incoming context is marked Running here, while the tick source
    /// is still masked, rather than in the first-run trampoline — closing
    /// the window in which a second tick could observe a dispatched but
    /// not-yet-started context.
    ///
    /// The chain must be non-empty; `start()` guarantees the dispatcher is
    /// never registered over an empty chain.
    pub fn rotate(&mut self) -> Dispatch {
        debug_assert!(self.count > 0, "rotation over an empty chain");

        // Outgoing context, if its save was not already recorded.
        let outgoing = &mut self.contexts[self.current];
        if outgoing.state == ContextState::Running {
            outgoing.state = ContextState::Suspended;
        }

        self.started = true;
        self.current = self.contexts[self.current].next;

        let incoming = &mut self.contexts[self.current];
        let first = incoming.state == ContextState::Ready;
        incoming.state = ContextState::Running;

        if first {
            Dispatch::FirstRun(incoming.snapshot)
        } else {
            Dispatch::Resume(incoming.snapshot)
        }
    }

    /// Perform the initial dispatch that enters the rotation.
    ///
    /// # Errors
    /// [`SchedulerError::NoContexts`] if the chain is empty — the caller
    /// must fail fast instead of registering the tick handler.
    pub fn start_dispatch(&mut self) -> Result<Dispatch, SchedulerError> {
        if self.count == 0 {
            return Err(SchedulerError::NoContexts);
        }
        Ok(self.rotate())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn body_a(_arg: usize) {}
    extern "C" fn body_b(_arg: usize) {}
    extern "C" fn body_c(_arg: usize) {}

    fn sched_with(bodies: &[(ContextEntry, usize)]) -> Scheduler {
        let mut sched = Scheduler::new();
        for &(entry, arg) in bodies {
            sched.create_context(256, entry, arg).unwrap();
        }
        sched
    }

    fn chain_order_from(sched: &Scheduler, start: usize) -> [usize; MAX_CONTEXTS] {
        let mut order = [usize::MAX; MAX_CONTEXTS];
        let mut at = start;
        for slot in order.iter_mut().take(sched.count) {
            *slot = at;
            at = sched.contexts[at].next;
        }
        order
    }

    #[test]
    fn three_contexts_rotate_in_creation_order() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1), (body_c, 2)]);

        let mut visits = [usize::MAX; 9];
        for slot in visits.iter_mut() {
            sched.rotate();
            *slot = sched.current_context().id();
        }
        assert_eq!(visits, [0, 1, 2, 0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn observation_log_is_abc_repeated() {
        // Three contexts whose activations append their label once; nine
        // ticks must produce A,B,C three times over.
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1), (body_c, 2)]);
        let labels = [b'A', b'B', b'C'];

        let mut log = [0u8; 9];
        for slot in log.iter_mut() {
            sched.rotate();
            *slot = labels[sched.current_context().id()];
        }
        assert_eq!(&log, b"ABCABCABC");
    }

    #[test]
    fn exactly_one_running_between_ticks() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1), (body_c, 2)]);

        for _ in 0..7 {
            sched.rotate();
            let running = sched.contexts[..sched.count]
                .iter()
                .filter(|c| c.state() == ContextState::Running)
                .count();
            assert_eq!(running, 1);
            for ctx in &sched.contexts[..sched.count] {
                assert!(matches!(
                    ctx.state(),
                    ContextState::Running | ContextState::Suspended | ContextState::Ready
                ));
            }
        }
        // After a full cycle every context has been dispatched once;
        // Ready is gone for good.
        let ready = sched.contexts[..sched.count]
            .iter()
            .filter(|c| c.state() == ContextState::Ready)
            .count();
        assert_eq!(ready, 0);
    }

    #[test]
    fn zero_stack_size_is_invalid_and_leaves_chain_intact() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1)]);
        let before = chain_order_from(&sched, sched.current);
        let pool_before = sched.pool_used;

        let err = sched.create_context(0, body_c, 2).unwrap_err();
        assert_eq!(err, SchedulerError::InvalidArgument);
        assert_eq!(sched.count(), 2);
        assert_eq!(sched.pool_used, pool_before);
        assert_eq!(chain_order_from(&sched, sched.current), before);
    }

    #[test]
    fn pool_exhaustion_is_allocation_error_and_leaves_chain_intact() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1)]);
        let before = chain_order_from(&sched, sched.current);

        let err = sched
            .create_context(STACK_POOL_SIZE, body_c, 2)
            .unwrap_err();
        assert_eq!(err, SchedulerError::AllocationError);
        assert_eq!(sched.count(), 2);
        assert_eq!(chain_order_from(&sched, sched.current), before);
    }

    #[test]
    fn slot_exhaustion_is_allocation_error() {
        let mut sched = Scheduler::new();
        for i in 0..MAX_CONTEXTS {
            sched.create_context(64, body_a, i).unwrap();
        }
        let err = sched.create_context(64, body_b, 99).unwrap_err();
        assert_eq!(err, SchedulerError::AllocationError);
        assert_eq!(sched.count(), MAX_CONTEXTS);
    }

    #[test]
    fn first_run_happens_exactly_once_with_the_exact_argument() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0xAA), (body_b, 0xBB)]);

        let mut first_runs = [0u32; 2];
        for _ in 0..6 {
            let dispatch = sched.rotate();
            let ctx = sched.current_context();
            if dispatch.is_first_run() {
                first_runs[ctx.id()] += 1;
                // The trampoline will hand the body exactly what was
                // captured at creation.
                let expected: (usize, usize) = match ctx.id() {
                    0 => (body_a as usize, 0xAA),
                    _ => (body_b as usize, 0xBB),
                };
                assert_eq!((ctx.entry() as usize, ctx.arg()), expected);
            }
        }
        assert_eq!(first_runs, [1, 1]);
    }

    #[test]
    fn context_created_mid_rotation_runs_next() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1)]);

        sched.rotate();
        assert_eq!(sched.current_context().id(), 0);

        // Created while A runs: spliced right after A, ahead of B.
        let id = sched.create_context(256, body_c, 2).unwrap();
        assert_eq!(id, 2);

        let mut visits = [usize::MAX; 4];
        for slot in visits.iter_mut() {
            sched.rotate();
            *slot = sched.current_context().id();
        }
        assert_eq!(visits, [2, 1, 0, 2]);
    }

    #[test]
    fn start_dispatch_fails_fast_on_empty_chain() {
        let mut sched = Scheduler::new();
        assert_eq!(
            sched.start_dispatch().unwrap_err(),
            SchedulerError::NoContexts
        );
    }

    #[test]
    fn start_dispatch_enters_at_the_first_created_context() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1), (body_c, 2)]);
        let dispatch = sched.start_dispatch().unwrap();
        assert!(dispatch.is_first_run());
        assert_eq!(sched.current_context().id(), 0);
        assert_eq!(sched.current_context().state(), ContextState::Running);
    }

    #[test]
    fn recorded_snapshot_comes_back_on_resume() {
        let mut sched = sched_with(&[(body_a as ContextEntry, 0), (body_b, 1)]);

        sched.rotate(); // A running
        let live = Snapshot::new(0x2000_1F40);
        sched.record_suspend(live);
        assert_eq!(sched.current_context().state(), ContextState::Suspended);

        sched.rotate(); // B
        let back = sched.rotate(); // A resumes
        assert_eq!(back, Dispatch::Resume(live));
    }

    #[test]
    fn seeded_snapshot_sits_at_the_stack_region_top() {
        let mut sched = Scheduler::new();
        sched.create_context(256, body_a, 0).unwrap();

        let ctx = &sched.contexts[0];
        let base = sched.pool.0.as_ptr() as usize;
        let top = (base + ctx.stack_offset + ctx.stack_len) & !0x07;
        assert_eq!(ctx.snapshot.sp(), top - crate::arch::FRAME_BYTES);
        assert_eq!(ctx.snapshot.sp() % 8, 0);
    }

    #[test]
    fn stack_regions_never_alias() {
        let mut sched = Scheduler::new();
        sched.create_context(100, body_a, 0).unwrap();
        sched.create_context(300, body_b, 1).unwrap();
        sched.create_context(1, body_c, 2).unwrap();

        for i in 0..sched.count {
            for j in i + 1..sched.count {
                let (a, b) = (&sched.contexts[i], &sched.contexts[j]);
                let a_end = a.stack_offset + a.stack_len;
                let b_end = b.stack_offset + b.stack_len;
                assert!(a_end <= b.stack_offset || b_end <= a.stack_offset);
            }
        }
        // The one-byte request was rounded up to hold the initial frame.
        assert!(sched.contexts[2].stack_len >= MIN_STACK_SIZE);
    }
}
