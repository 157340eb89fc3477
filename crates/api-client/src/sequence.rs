//! Monotonic request-sequence guard.
//!
//! Lookup requests can overlap: a user can fire a second search before the
//! first answer lands, and nothing orders the responses. Applying whichever
//! arrives last would let a stale answer overwrite a fresh one. The guard
//! tags each request at issue time with a monotonically increasing sequence
//! number; a response is applied only while its tag is still the latest
//! issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// A tag handed out for one in-flight request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTag(u64);

/// Issues tags and answers whether a tag is still the latest.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    issued: AtomicU64,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a request at issue time. Invalidates all previously issued tags.
    pub fn issue(&self) -> RequestTag {
        RequestTag(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True while `tag` is the most recently issued one.
    pub fn is_current(&self, tag: RequestTag) -> bool {
        self.issued.load(Ordering::SeqCst) == tag.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_latest_tag_is_current() {
        let guard = SequenceGuard::new();
        let tag = guard.issue();
        assert!(guard.is_current(tag));
    }

    #[test]
    fn issuing_a_new_tag_invalidates_older_ones() {
        let guard = SequenceGuard::new();
        let first = guard.issue();
        let second = guard.issue();

        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
    }

    #[test]
    fn stale_responses_are_rejected_regardless_of_arrival_order() {
        let guard = SequenceGuard::new();
        let first = guard.issue();
        let second = guard.issue();
        let third = guard.issue();

        // responses arrive out of order: second, third, first
        assert!(!guard.is_current(second));
        assert!(guard.is_current(third));
        assert!(!guard.is_current(first));
    }
}
