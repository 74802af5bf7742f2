//! Sequence number allocation

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues strictly increasing, gap-free sequence numbers starting at 0
///
/// Safe to share between callers; every call to [`next`](Self::next) returns a
/// distinct number and the set of returned numbers is always `[0, issued)`.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next sequence number
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// How many numbers have been handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_at_zero_and_increments() {
        let allocator = SequenceAllocator::new();

        assert_eq!(allocator.next(), 0);
        assert_eq!(allocator.next(), 1);
        assert_eq!(allocator.next(), 2);
        assert_eq!(allocator.issued(), 3);
    }

    #[test]
    fn test_concurrent_callers_get_gap_free_numbers() {
        let allocator = Arc::new(SequenceAllocator::new());
        let threads = 8;
        let per_thread = 2_500;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    let mut seen = Vec::with_capacity(per_thread);
                    for _ in 0..per_thread {
                        seen.push(allocator.next());
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();

        let expected: Vec<u64> = (0..(threads * per_thread) as u64).collect();
        assert_eq!(all, expected, "Sorted numbers must be exactly [0, N)");
    }

    #[test]
    fn test_per_caller_numbers_are_strictly_increasing() {
        let allocator = Arc::new(SequenceAllocator::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || (0..1_000).map(|_| allocator.next()).collect::<Vec<_>>())
            })
            .collect();

        for handle in handles {
            let seen = handle.join().unwrap();
            assert!(seen.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
