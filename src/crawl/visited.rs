// src/crawl/visited.rs
// =============================================================================
// The in-memory visited set for one run.
//
// It only ever grows. `claim` is the one place a URL becomes "visited", and
// the membership check plus insert happen under a single lock, so two
// workers that discover the same link at the same moment cannot both win.
// The driver claims a URL when it finds it, before making a task for it.
// =============================================================================

use crate::canonical::CanonicalUrl;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<CanonicalUrl>>,
}

impl VisitedSet {
    pub fn new(initial: HashSet<CanonicalUrl>) -> Self {
        Self {
            urls: Mutex::new(initial),
        }
    }

    /// Atomically inserts the URL, returning true only for the first caller
    pub fn claim(&self, url: &CanonicalUrl) -> bool {
        self.lock().insert(url.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Copy of the current contents, for flushing
    pub fn snapshot(&self) -> HashSet<CanonicalUrl> {
        self.lock().clone()
    }

    // A poisoned lock only means another worker panicked mid-insert;
    // the set itself is still valid, so keep using it.
    fn lock(&self) -> MutexGuard<'_, HashSet<CanonicalUrl>> {
        self.urls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_claim_only_once() {
        let visited = VisitedSet::default();
        let url = canonicalize("https://example.com/", None).unwrap();
        assert!(visited.claim(&url));
        assert!(!visited.claim(&url));
        assert!(visited.snapshot().contains(&url));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_seeded_urls_are_already_claimed() {
        let url = canonicalize("https://example.com/old", None).unwrap();
        let visited = VisitedSet::new([url.clone()].into_iter().collect());
        assert!(!visited.claim(&url));
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let visited = Arc::new(VisitedSet::default());
        let winners = Arc::new(AtomicUsize::new(0));
        let url = canonicalize("https://example.com/popular", None).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let winners = Arc::clone(&winners);
                let url = url.clone();
                std::thread::spawn(move || {
                    if visited.claim(&url) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
