//! # Kernel
//!
//! Top-level public API for Rondo: the global scheduler instance, context
//! creation, and scheduler startup. All thread-mode entry points take a
//! critical section around their scheduler access; the ISR paths in the
//! port layer are serialized by exception priority instead.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()             ← Bind the global scheduler
//!         ├─► kernel::create_context()   ← Register contexts (×N)
//!         └─► kernel::start()            ← Enter the rotation (no return)
//!               ├─► Initial dispatch (fails fast with no contexts)
//!               ├─► Configure SysTick for the quantum
//!               ├─► PendSV/SysTick to lowest priority
//!               └─► Launch first context via arch::start_first_context()
//! ```

use core::convert::Infallible;

use crate::arch::cortex_m4;
use crate::context::ContextEntry;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sync;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The one scheduler instance. All process-wide scheduler state lives here.
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Pointer to the global scheduler, bound by `init()`. The port layer's
/// exception handlers reach the scheduler through this.
static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// Borrow the global scheduler.
///
/// # Safety
/// `init()` must have been called, and the caller must hold a critical
/// section or be running in PendSV/SysTick context (which serialize by
/// exception priority).
pub(crate) unsafe fn scheduler() -> &'static mut Scheduler {
    debug_assert!(!SCHEDULER_PTR.is_null(), "kernel::init() not called");
    &mut *SCHEDULER_PTR
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Bind the global scheduler. Must be called exactly once, from the main
/// thread, before any other kernel function.
pub fn init() {
    unsafe {
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
    }
}

/// Create a context and splice it into the round-robin chain.
///
/// May be called before `start()` or from a running context; creation runs
/// under a critical section for its full duration, since the splice touches
/// the same chain links the dispatcher walks.
///
/// # Parameters
/// - `stack_size`: bytes of stack to carve for this context (must be > 0;
///   [`DEFAULT_STACK_SIZE`](crate::config::DEFAULT_STACK_SIZE) is a safe
///   choice)
/// - `entry`: the context body, called exactly once on first dispatch
/// - `arg`: argument handed to `entry` verbatim
///
/// # Errors
/// - [`SchedulerError::InvalidArgument`] — `stack_size` is zero
/// - [`SchedulerError::AllocationError`] — context slots or stack pool
///   exhausted; the chain is left untouched
///
/// # Example
/// ```ignore
/// kernel::create_context(config::DEFAULT_STACK_SIZE, blink, 0)?;
/// ```
pub fn create_context(
    stack_size: usize,
    entry: ContextEntry,
    arg: usize,
) -> Result<usize, SchedulerError> {
    sync::critical_section(|_cs| unsafe {
        scheduler().create_context(stack_size, entry, arg)
    })
}

/// Start the scheduler. **Does not return on success.**
///
/// Performs the initial dispatch (failing fast before the timer is touched
/// if the chain is empty), configures SysTick for the quantum, drops PendSV
/// and SysTick to the lowest exception priority, and launches the first
/// context. From that point control lives permanently inside the rotation
/// of context bodies and tick handlers.
///
/// Interrupts are disabled across the launch window so the first tick
/// cannot fire before the process stack pointer is valid; the launch path
/// re-enables them as it enters the first context.
///
/// # Errors
/// [`SchedulerError::NoContexts`] — nothing has been created; there is
/// nothing to run.
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> Result<Infallible, SchedulerError> {
    cortex_m::interrupt::disable();

    let first = match unsafe { scheduler() }.start_dispatch() {
        Ok(dispatch) => dispatch,
        Err(e) => {
            // Nothing was armed; hand control back to the caller.
            unsafe { cortex_m::interrupt::enable() };
            return Err(e);
        }
    };

    cortex_m4::configure_systick(&mut core_peripherals.SYST);
    cortex_m4::set_exception_priorities();

    unsafe { cortex_m4::start_first_context(first.snapshot()) }
}
