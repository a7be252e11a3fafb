//! # Rondo Configuration
//!
//! Compile-time constants governing the scheduler. All limits are fixed at
//! compile time — no dynamic allocation anywhere in the crate.

/// Maximum number of contexts the scheduler can manage simultaneously.
/// Bounds the static context array. Stacks come out of a shared pool of
/// `STACK_POOL_SIZE` bytes, so raising this alone does not add stack memory.
pub const MAX_CONTEXTS: usize = 8;

/// Scheduling quantum in milliseconds. SysTick fires once per quantum and
/// every tick forces a context switch — there is no time-slice accounting
/// beyond the rotation itself.
pub const QUANTUM_MS: u32 = 8;

/// Total bytes of stack memory available to `create_context`. Regions are
/// carved from this pool with a bump offset and are never freed — contexts
/// have no termination path.
pub const STACK_POOL_SIZE: usize = 16 * 1024;

/// Suggested per-context stack size for callers with no better estimate.
/// Eight contexts at this size fill the pool exactly.
pub const DEFAULT_STACK_SIZE: usize = 2048;

/// Smallest stack a context can be given: room for the 16-word initial
/// exception frame plus AAPCS 8-byte alignment. Requests below this are
/// rounded up rather than rejected — any positive size is a valid argument.
pub const MIN_STACK_SIZE: usize = 64;

/// System clock frequency in Hz (STM32F4-class part on the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
