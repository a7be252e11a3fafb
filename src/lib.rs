//! # Rondo — a preemptive round-robin context scheduler
//!
//! Rondo multiplexes a fixed set of logical tasks ("contexts"), each with
//! its own stack, onto a single ARM Cortex-M4 core. Scheduling is strict
//! round robin driven by a periodic SysTick interrupt: every quantum
//! (8 ms by default) the running context is suspended exactly where it
//! was interrupted and the next context in a circular chain takes over.
//! Contexts never block, never yield voluntarily, and never terminate.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Application Contexts                  │
//! ├────────────────────────────────────────────────────────┤
//! │               Kernel API (kernel.rs)                   │
//! │        init() · create_context() · start()             │
//! ├───────────────────────────────┬────────────────────────┤
//! │  Scheduler (scheduler.rs)     │  Sync (sync.rs)        │
//! │  ─ circular ready chain       │  ─ critical_section    │
//! │  ─ create_context()           │    (interrupt masking) │
//! │  ─ record_suspend() · rotate()│                        │
//! ├───────────────────────────────┴────────────────────────┤
//! │             Context Model (context.rs)                 │
//! │    Context · ContextState · ContextEntry               │
//! ├────────────────────────────────────────────────────────┤
//! │           Arch Port (arch/cortex_m4.rs)                │
//! │   PendSV · SysTick · frame seeding · first-run         │
//! │   trampoline · Snapshot                                │
//! ├────────────────────────────────────────────────────────┤
//! │        ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling Model
//!
//! - **Round robin, insertion order.** The ready queue is a circular,
//!   singly linked chain. No priorities, no weights, no skipping: N
//!   contexts created before start are visited `C1..CN` forever.
//! - **Preemption only.** Suspension happens exclusively at tick
//!   boundaries. Context bodies are ordinary routines that assume
//!   uninterrupted logical execution between ticks.
//! - **"Next to run" insertion.** A context created while the rotation is
//!   live is spliced immediately after the running context and gets the
//!   very next quantum.
//! - **No exit.** There is no termination or reclamation path. A body
//!   that returns is a fatal condition: the core parks with interrupts
//!   disabled.
//!
//! ## Lifecycle
//!
//! `Ready` (created, never run) → `Running` (first dispatch, via the
//! first-run trampoline) ⇄ `Suspended` (every tick thereafter). `Ready`
//! occurs at most once per context; no terminal state exists.
//!
//! ## Memory Model
//!
//! - **No heap, no `alloc`**: all state is statically allocated
//! - **Fixed context array**: `[Context; MAX_CONTEXTS]`
//! - **Shared stack pool**: per-context regions bump-carved from one
//!   `STACK_POOL_SIZE` buffer, never freed, never aliased
//! - **Critical sections**: `cortex_m::interrupt::free()` is the sole
//!   exclusion primitive
//!
//! ## Portability
//!
//! Raw register save/restore is confined to `arch/`: the scheduler's
//! control logic only ever handles an opaque `Snapshot`. Non-ARM builds
//! get a stub port so the chain and dispatch logic are unit-testable on
//! the host.

#![no_std]

pub mod arch;
pub mod config;
pub mod context;
pub mod scheduler;

#[cfg(target_arch = "arm")]
pub mod kernel;
#[cfg(target_arch = "arm")]
pub mod sync;
