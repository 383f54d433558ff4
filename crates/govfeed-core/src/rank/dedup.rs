use std::collections::HashSet;
use std::sync::Mutex;

/// Links already emitted during one search
///
/// Created per search and shared by that search's tasks only.
#[derive(Debug, Default)]
pub struct SeenSet {
    links: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `link` is offered, false afterwards
    pub fn admit(&self, link: &str) -> bool {
        let mut links = self.links.lock().unwrap_or_else(|e| e.into_inner());
        if links.contains(link) {
            return false;
        }
        links.insert(link.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_admit_once() {
        let seen = SeenSet::new();
        assert!(seen.admit("https://example.com/a"));
        assert!(!seen.admit("https://example.com/a"));
        assert!(seen.admit("https://example.com/b"));
        assert!(!seen.admit("https://example.com/b"));
    }

    #[tokio::test]
    async fn test_concurrent_admits_yield_single_winner() {
        let seen = Arc::new(SeenSet::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let seen = Arc::clone(&seen);
            handles.push(tokio::spawn(async move { seen.admit("https://example.com/same") }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }
}
