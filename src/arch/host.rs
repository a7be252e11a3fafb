//! # Host Stub Port
//!
//! Frame seeding for non-ARM builds, used by the host-side unit tests.
//! Mirrors the Cortex-M4 frame layout exactly — 16 words at the 8-byte
//! aligned top of the stack region — but seeds zeroed PC/LR slots, since
//! the trampoline and return trap only exist on the target. Nothing on the
//! host ever resumes from one of these frames.

use crate::arch::{Snapshot, FRAME_BYTES};

/// Build a synthetic saved-context frame at the top of `stack`, matching
/// the layout of the Cortex-M4 port.
pub(crate) fn seed_initial_frame(stack: &mut [u8]) -> Snapshot {
    let top = stack.as_mut_ptr() as usize + stack.len();
    let top = top & !0x07;
    let frame = top - FRAME_BYTES;
    let p = frame as *mut u32;

    unsafe {
        for i in 0..15 {
            p.add(i).write(0);
        }
        p.add(15).write(0x0100_0000); // xPSR — Thumb bit
    }

    Snapshot::new(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::FRAME_WORDS;

    #[test]
    fn frame_sits_below_the_aligned_region_top() {
        let mut region = [0u8; 256 + 8];
        // Deliberately hand the seeder a misaligned slice start
        let offset = (8 - (region.as_ptr() as usize % 8)) % 8 + 1;
        let len = 256;
        let slice = &mut region[offset..offset + len];
        let top = slice.as_ptr() as usize + slice.len();

        let snap = seed_initial_frame(slice);

        assert_eq!(snap.sp() % 8, 0);
        assert_eq!(snap.sp(), (top & !0x07) - FRAME_BYTES);
    }

    #[test]
    fn frame_seeds_thumb_bit_in_xpsr() {
        let mut region = [0u8; 128];
        let snap = seed_initial_frame(&mut region);

        let xpsr = unsafe { (snap.sp() as *const u32).add(FRAME_WORDS - 1).read() };
        assert_eq!(xpsr, 0x0100_0000);

        for i in 0..FRAME_WORDS - 1 {
            let word = unsafe { (snap.sp() as *const u32).add(i).read() };
            assert_eq!(word, 0);
        }
    }
}
