//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! SysTick configuration for the scheduling quantum, the PendSV context
//! switch, first-run frame seeding, and the first-run trampoline.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by exception handlers
//! - **PSP** (Process Stack Pointer): used by contexts in Thread mode
//!
//! On exception entry the hardware automatically stacks R0–R3, R12, LR, PC
//! and xPSR onto the process stack. The PendSV handler pushes R4–R11 to
//! complete the save, records the resulting PSP into the outgoing context,
//! rotates the chain, and unwinds the same two layers for the incoming one.
//!
//! ## First run
//!
//! A context that has never run has no real saved state. `seed_initial_frame`
//! builds a synthetic frame whose PC is [`rondo_first_run`]: the exception
//! return "resumes" into the trampoline, which looks up the context's entry
//! and argument and calls the body with interrupts enabled.
//!
//! ## Exception priorities
//!
//! SysTick and PendSV both run at the lowest priority (0xFF), so the
//! context switch never preempts another ISR and the two never nest.

use core::arch::{asm, global_asm};

use cortex_m::peripheral::syst::SystClkSource;

use crate::arch::{Snapshot, FRAME_BYTES};
use crate::config::{QUANTUM_MS, SYSTEM_CLOCK_HZ};
use crate::sync;

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick to fire once per scheduling quantum.
///
/// Uses the processor clock; each expiry runs the `SysTick` handler below,
/// which pends a context switch.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / 1_000 * QUANTUM_MS - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Pend a PendSV exception to perform a context switch.
///
/// PendSV is the standard Cortex-M mechanism for deferred switching: it
/// fires at the lowest priority, so it only runs once no other ISR is
/// active. Sets PENDSVSET in the Interrupt Control and State Register.
#[inline]
pub fn trigger_pendsv() {
    // ICSR address: 0xE000_ED04, PENDSVSET = bit 28
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

// ---------------------------------------------------------------------------
// Exception priority configuration
// ---------------------------------------------------------------------------

/// Set PendSV and SysTick to the lowest exception priority (0xFF).
///
/// Keeps the context switch from ever preempting application ISRs and
/// guarantees SysTick and PendSV serialize against each other.
pub fn set_exception_priorities() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [23:16] = PendSV priority, bits [31:24] = SysTick priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = val | (0xFF << 16) | (0xFF << 24);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// First-run frame seeding
// ---------------------------------------------------------------------------

/// Build the synthetic saved-context frame for a context that has never run.
///
/// The frame sits at the top of the context's stack region (stacks grow
/// downward) and mimics exactly what PendSV would have saved: zeroed
/// R4–R11, a zeroed hardware frame with PC pointing at the first-run
/// trampoline, LR pointing at the return trap, and the Thumb bit set in
/// xPSR. The returned snapshot is what PendSV will later restore from.
///
/// ## Frame Layout (top = high address, growing down)
///
/// ```text
/// [Hardware-stacked frame]
///   xPSR  (Thumb bit set)
///   PC    (rondo_first_run)
///   LR    (rondo_context_return_trap)
///   R12, R3, R2, R1, R0  (0)
/// [Software-saved context]
///   R11 … R4  (0)          <- snapshot points here
/// ```
pub(crate) fn seed_initial_frame(stack: &mut [u8]) -> Snapshot {
    let top = stack.as_mut_ptr() as usize + stack.len();
    // AAPCS requires 8-byte stack alignment
    let top = top & !0x07;
    let frame = top - FRAME_BYTES;
    let p = frame as *mut u32;

    unsafe {
        // R4–R11, then R0–R3 and R12
        for i in 0..13 {
            p.add(i).write(0);
        }
        p.add(13).write(rondo_context_return_trap as usize as u32); // LR
        p.add(14).write(rondo_first_run as usize as u32); // PC
        p.add(15).write(0x0100_0000); // xPSR — Thumb bit
    }

    Snapshot::new(frame)
}

// ---------------------------------------------------------------------------
// First-run trampoline and return trap
// ---------------------------------------------------------------------------

/// First-run trampoline. A seeded frame's PC lands here on the context's
/// first dispatch; the dispatcher has already marked the context Running
/// with interrupts masked, so by the time the body starts the state machine
/// is consistent.
///
/// Reads the entry and argument under a critical section, then calls the
/// body with interrupts enabled. The body runs in place of the tick-return
/// path until the next quantum preempts it.
#[no_mangle]
extern "C" fn rondo_first_run() -> ! {
    let (entry, arg) = sync::critical_section(|_cs| {
        let ctx = unsafe { crate::kernel::scheduler() }.current_context();
        (ctx.entry(), ctx.arg())
    });
    entry(arg);
    fatal_context_return()
}

/// Seeded into the LR slot of every initial frame. Reached only if a
/// context body returns through a path that bypasses the trampoline.
#[no_mangle]
extern "C" fn rondo_context_return_trap() -> ! {
    fatal_context_return()
}

/// A context body returned. There is no termination path and no caller
/// left to report to, so this is fatal by policy: interrupts are disabled
/// and the core parks in `wfi` forever.
fn fatal_context_return() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// First context launch
// ---------------------------------------------------------------------------

/// Enter the rotation by launching the context selected by the initial
/// dispatch. Called once from `kernel::start()`; never returns.
///
/// Switches Thread mode onto the PSP, unwinds the seeded frame by hand
/// (there is no exception to return from yet), re-enables interrupts and
/// branches to the frame's PC — the first-run trampoline.
///
/// # Safety
/// `snapshot` must be a frame produced by [`seed_initial_frame`], and
/// interrupts must be disabled by the caller.
pub unsafe fn start_first_context(snapshot: Snapshot) -> ! {
    asm!(
        // Skip the 8 software-saved registers (8×4 = 32 bytes)
        "adds r0, #32",
        "msr psp, r0",
        // Thread mode uses PSP from here on (CONTROL.SPSEL = 1)
        "movs r0, #2",
        "msr control, r0",
        "isb",
        // Unwind the hardware half of the seeded frame
        "pop {{r0-r3, r12}}",
        "pop {{r4}}", // LR slot (return trap; the trampoline never returns)
        "pop {{r5}}", // PC — first-run trampoline
        "pop {{r6}}", // xPSR (discarded)
        "cpsie i",
        "bx r5",
        in("r0") snapshot.sp(),
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

// The context switch itself. Runs with the tick source serialized by
// exception priority:
//   1. push R4–R11 onto the outgoing process stack
//   2. record the resulting PSP into the outgoing context (rondo_record_suspend)
//   3. rotate the chain and fetch the incoming snapshot (rondo_switch_next)
//   4. pop R4–R11 from the incoming stack and exception-return; the hardware
//      unstacks the rest, resuming the context (or entering the trampoline
//      if the frame was seeded)
global_asm!(
    ".section .text.PendSV",
    ".global PendSV",
    ".type PendSV, %function",
    ".thumb_func",
    "PendSV:",
    "mrs r0, psp",
    "stmdb r0!, {{r4-r11}}",
    "bl rondo_record_suspend",
    "bl rondo_switch_next",
    "ldmia r0!, {{r4-r11}}",
    "msr psp, r0",
    // EXC_RETURN: Thread mode, PSP (0xFFFFFFFD)
    "mvn r0, #2",
    "bx r0",
);

/// Record the outgoing context's stack pointer. Called from PendSV after
/// R4–R11 have been pushed; `psp` points at the completed frame.
///
/// # Safety
/// Called only from PendSV, which is serialized against every other
/// scheduler mutation by exception priority.
#[no_mangle]
unsafe extern "C" fn rondo_record_suspend(psp: *mut u32) {
    crate::kernel::scheduler().record_suspend(Snapshot::new(psp as usize));
}

/// Rotate the chain and hand PendSV the incoming context's stack pointer.
///
/// # Safety
/// Called only from PendSV.
#[no_mangle]
unsafe extern "C" fn rondo_switch_next() -> *mut u32 {
    crate::kernel::scheduler().rotate().snapshot().sp() as *mut u32
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — fires once per quantum and pends the
/// context switch. All scheduler mutation happens in PendSV.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    trigger_pendsv();
}
