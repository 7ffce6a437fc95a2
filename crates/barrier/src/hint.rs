// SPDX-License-Identifier: Apache-2.0

//! CPU wait hints used inside the soft-wait paths.
//!
//! `monitorx`/`mwaitx` arm address-range monitoring on a cache line and stall
//! the core until the line is written or a cycle budget elapses. The pair is
//! an AMD extension; where it is unavailable (other architectures, or x86_64
//! parts without the MONITORX CPUID bit) the hints degrade to a plain spin
//! hint so the same binary stays runnable everywhere.

use std::sync::atomic::AtomicU32;

/// Pause-style hint emitted once per spin-loop iteration.
#[inline]
pub fn cpu_relax() {
    std::hint::spin_loop();
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        use once_cell::sync::Lazy;

        static MONITORX: Lazy<bool> = Lazy::new(detect_monitorx);

        #[allow(unsafe_code)]
        fn detect_monitorx() -> bool {
            // CPUID.8000_0001h:ECX bit 29 (MONITORX).
            // SAFETY: CPUID is unprivileged and side-effect free on x86_64.
            let max_extended = unsafe { core::arch::x86_64::__cpuid(0x8000_0000) }.eax;
            if max_extended < 0x8000_0001 {
                return false;
            }
            let ecx = unsafe { core::arch::x86_64::__cpuid(0x8000_0001) }.ecx;
            (ecx >> 29) & 1 == 1
        }

        /// Whether this CPU implements the `monitorx`/`mwaitx` pair.
        #[must_use]
        pub fn monitorx_supported() -> bool {
            *MONITORX
        }

        /// Arms hardware monitoring on the cache line holding `word`.
        #[inline]
        #[allow(unsafe_code)]
        pub fn monitor_arm(word: &AtomicU32) {
            if !monitorx_supported() {
                std::hint::spin_loop();
                return;
            }
            // SAFETY: monitorx only arms monitoring for the given address; it
            // performs no memory access through it.
            unsafe {
                core::arch::asm!(
                    "monitorx",
                    in("rax") word.as_ptr(),
                    in("ecx") 0u32,
                    in("edx") 0u32,
                    options(nostack, preserves_flags),
                );
            }
        }

        /// Stalls the core until the armed line is written or `cycles` TSC
        /// cycles elapse, whichever comes first.
        #[inline]
        #[allow(unsafe_code)]
        pub fn monitor_wait(cycles: u32) {
            if !monitorx_supported() {
                std::hint::spin_loop();
                return;
            }
            // ECX bit 1 enables the EBX cycle bound. EBX is reserved by LLVM,
            // so the bound is swapped in and out around the instruction.
            // SAFETY: mwaitx is a wait hint; it has no architectural side
            // effects beyond stalling the core.
            unsafe {
                core::arch::asm!(
                    "xchg {bound:e}, ebx",
                    "mwaitx",
                    "xchg {bound:e}, ebx",
                    bound = inout(reg) cycles => _,
                    in("eax") 0u32,
                    in("ecx") 2u32,
                    options(nostack, preserves_flags),
                );
            }
        }
    } else {
        /// Always false off x86_64; the monitor hints fall back to spinning.
        #[must_use]
        pub fn monitorx_supported() -> bool {
            false
        }

        /// Fallback arm: plain spin hint.
        #[inline]
        pub fn monitor_arm(_word: &AtomicU32) {
            std::hint::spin_loop();
        }

        /// Fallback wait: plain spin hint.
        #[inline]
        pub fn monitor_wait(_cycles: u32) {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn hints_return_regardless_of_cpu_support() {
        let word = AtomicU32::new(0);
        cpu_relax();
        monitor_arm(&word);
        // A bounded wait on a line nobody writes must still return.
        monitor_wait(10_000);
    }
}
