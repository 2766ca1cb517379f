//! Exact-duplicate content detection

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Mutex;

/// Hex SHA-256 digest of a response body
pub fn fingerprint(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Process-wide set of content fingerprints
///
/// Fingerprints are only ever added. Membership test and insert happen under
/// one lock acquisition, so two workers racing on the same body cannot both
/// be told it is new.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: Mutex<HashSet<String>>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the fingerprint and reports whether it had been seen before
    ///
    /// Returns false exactly once per distinct fingerprint.
    pub fn seen(&self, fingerprint: &str) -> bool {
        // A panic elsewhere cannot leave the set half-updated, so a poisoned
        // lock is still safe to use
        let mut seen = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        !seen.insert(fingerprint.to_string())
    }

    /// Number of distinct fingerprints recorded
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = fingerprint(b"hello");
        assert_eq!(
            fp,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(fp, fingerprint(b"hello "));
    }

    #[test]
    fn test_first_sighting_is_not_duplicate() {
        let detector = DuplicateDetector::new();
        assert!(!detector.seen("abc"));
        assert!(detector.seen("abc"));
        assert!(detector.seen("abc"));
        assert!(!detector.seen("def"));
        assert_eq!(detector.len(), 2);
    }

    #[test]
    fn test_concurrent_first_insert_has_one_winner() {
        const THREADS: usize = 16;

        let detector = Arc::new(DuplicateDetector::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let detector = Arc::clone(&detector);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    detector.seen("same-body")
                })
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|duplicate| !duplicate)
            .count();

        assert_eq!(fresh, 1);
        assert_eq!(detector.len(), 1);
    }
}
