//! # Rondo Example Firmware
//!
//! Three contexts created before start, each in an endless counting loop.
//! None of them ever yields — the only thing that moves the rotation along
//! is the 8 ms quantum. Watching `ACTIVATIONS` in a debugger shows the
//! strict A,B,C,A,B,C,… visitation order: after any full cycle the three
//! counters differ by at most one.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod firmware {
    use core::sync::atomic::{AtomicU32, Ordering};

    use cortex_m_rt::entry;
    use panic_halt as _;

    use rondo::config::DEFAULT_STACK_SIZE;
    use rondo::kernel;

    /// One activation counter per context, indexed by the creation-time
    /// argument.
    static ACTIVATIONS: [AtomicU32; 3] =
        [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)];

    /// Context body shared by all three contexts. `lane` is the argument
    /// captured at creation; it arrives here exactly once, on first
    /// dispatch, and then lives in this frame across every preemption.
    /// Never returns.
    extern "C" fn counting_context(lane: usize) {
        let mut local: u32 = 0;
        loop {
            // Burn the whole quantum; preemption does the rest.
            local = local.wrapping_add(1);
            if local % 100_000 == 0 {
                ACTIVATIONS[lane].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        kernel::init();

        for lane in 0..ACTIVATIONS.len() {
            kernel::create_context(DEFAULT_STACK_SIZE, counting_context, lane)
                .expect("context creation failed");
        }

        // Enters the rotation; comes back only if no context exists.
        let _ = kernel::start(cp);
        loop {
            cortex_m::asm::wfi();
        }
    }
}

#[cfg(not(target_arch = "arm"))]
fn main() {}
