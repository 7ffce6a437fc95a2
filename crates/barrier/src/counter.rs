// SPDX-License-Identifier: Apache-2.0

//! Monotonic high-resolution cycle counter.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        /// Reads the CPU timestamp counter.
        ///
        /// The read is deliberately unserialized; the wakeup-latency metric
        /// only claims tick differences taken on a single core, and tolerates
        /// small out-of-order reads.
        #[allow(unsafe_code)]
        #[must_use]
        pub fn now() -> u64 {
            // SAFETY: RDTSC has no memory or alignment preconditions.
            unsafe { core::arch::x86_64::_rdtsc() }
        }
    } else {
        use once_cell::sync::Lazy;
        use std::time::Instant;

        static ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

        /// Nanoseconds since a process-local anchor; stands in for the
        /// timestamp counter on architectures without one.
        #[must_use]
        pub fn now() -> u64 {
            u64::try_from(ANCHOR.elapsed().as_nanos()).unwrap_or(u64::MAX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_do_not_run_backwards_on_one_thread() {
        let first = now();
        let mut acc = 0u64;
        for i in 0..10_000u64 {
            acc = acc.wrapping_add(i);
        }
        let _ = std::hint::black_box(acc);
        assert!(now() >= first);
    }

    #[test]
    fn ticks_advance() {
        let first = now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(now() > first);
    }
}
