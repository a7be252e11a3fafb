//! # Synchronization
//!
//! Interrupt masking is the scheduler's only mutual-exclusion mechanism:
//! one core, no locks, no atomics. Any thread-mode code that touches the
//! chain links, the cursor, or a context's state goes through
//! [`critical_section`]; the exception handlers need nothing extra because
//! PendSV and SysTick share the lowest priority and cannot nest.

use cortex_m::interrupt;

/// Execute a closure with the tick source (and every other interrupt)
/// masked. Delivery is restored on exit, so a tick that would have fired
/// inside the section lands immediately afterwards — mutations appear
/// atomic to the dispatcher.
///
/// Keep sections short: everything in this crate that runs under one is a
/// handful of pointer and state updates.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
