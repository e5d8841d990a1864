use crate::url::{extract_domain, is_allowed_domain};
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// A URL queued for crawling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: Url,
    /// BFS depth from the seed (seeds are depth 0)
    pub depth: u32,
}

/// BFS frontier with per-domain queues and a global visited-set
///
/// URLs are marked visited when PUSHED, not when popped, so the same URL
/// reached through two paths is queued exactly once. Pops round-robin
/// across domains, which keeps one link-heavy subdomain from starving the
/// rest of a level.
///
/// Push silently drops entries that are out of policy (already visited,
/// too deep, off the allow-list, or over the per-domain visit quota);
/// dropped URLs are not errors anywhere in the pipeline.
pub struct Frontier {
    queues: HashMap<String, VecDeque<FrontierEntry>>,
    rotation: VecDeque<String>,
    visited: HashSet<String>,
    domain_counts: HashMap<String, u32>,
    allowed_domains: Vec<String>,
    max_depth: u32,
    max_domain_requests: u32,
    queued: usize,
}

impl Frontier {
    pub fn new(allowed_domains: Vec<String>, max_depth: u32, max_domain_requests: u32) -> Self {
        Self {
            queues: HashMap::new(),
            rotation: VecDeque::new(),
            visited: HashSet::new(),
            domain_counts: HashMap::new(),
            allowed_domains,
            max_depth,
            max_domain_requests,
            queued: 0,
        }
    }

    /// Queues a URL if it passes the visit policy; returns whether it was queued
    pub fn push(&mut self, url: Url, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let domain = match extract_domain(&url) {
            Some(d) => d,
            None => return false,
        };

        if !is_allowed_domain(&domain, &self.allowed_domains) {
            return false;
        }

        let count = self.domain_counts.entry(domain.clone()).or_insert(0);
        if *count >= self.max_domain_requests {
            return false;
        }

        // Marking visited at push time guarantees no URL is ever queued or
        // popped twice, even when two pages link to it within one level.
        if !self.visited.insert(url.as_str().to_string()) {
            return false;
        }

        *count += 1;

        if !self.queues.contains_key(&domain) {
            self.rotation.push_back(domain.clone());
        }
        self.queues
            .entry(domain)
            .or_default()
            .push_back(FrontierEntry { url, depth });
        self.queued += 1;
        true
    }

    /// Pops the next URL, rotating across domains
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        while let Some(domain) = self.rotation.pop_front() {
            if let Some(queue) = self.queues.get_mut(&domain) {
                if let Some(entry) = queue.pop_front() {
                    if queue.is_empty() {
                        self.queues.remove(&domain);
                    } else {
                        self.rotation.push_back(domain);
                    }
                    self.queued -= 1;
                    return Some(entry);
                }
                self.queues.remove(&domain);
            }
        }
        None
    }

    /// Whether a normalized URL has already been queued or visited
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    pub fn len(&self) -> usize {
        self.queued
    }

    /// Number of URLs ever accepted into the frontier
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontier() -> Frontier {
        Frontier::new(
            vec!["payer.example".to_string(), "*.payer.example".to_string()],
            3,
            100,
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_push_and_pop() {
        let mut f = frontier();
        assert!(f.push(url("https://payer.example/providers"), 0));
        let entry = f.pop().unwrap();
        assert_eq!(entry.url.as_str(), "https://payer.example/providers");
        assert_eq!(entry.depth, 0);
        assert!(f.pop().is_none());
    }

    #[test]
    fn test_duplicate_push_dropped() {
        let mut f = frontier();
        assert!(f.push(url("https://payer.example/a"), 0));
        assert!(!f.push(url("https://payer.example/a"), 1));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_no_double_pop_for_cyclic_links() {
        let mut f = frontier();
        f.push(url("https://payer.example/a"), 0);
        f.pop().unwrap();
        // page A links back to itself and is re-pushed at depth 1
        assert!(!f.push(url("https://payer.example/a"), 1));
        assert!(f.pop().is_none());
    }

    #[test]
    fn test_depth_limit() {
        let mut f = frontier();
        assert!(f.push(url("https://payer.example/deep"), 3));
        assert!(!f.push(url("https://payer.example/deeper"), 4));
    }

    #[test]
    fn test_allow_list_enforced() {
        let mut f = frontier();
        assert!(f.push(url("https://docs.payer.example/a"), 0));
        assert!(!f.push(url("https://unrelated.example/a"), 0));
    }

    #[test]
    fn test_domain_quota() {
        let mut f = Frontier::new(vec!["payer.example".to_string()], 3, 2);
        assert!(f.push(url("https://payer.example/a"), 0));
        assert!(f.push(url("https://payer.example/b"), 0));
        assert!(!f.push(url("https://payer.example/c"), 0));
    }

    #[test]
    fn test_round_robin_across_domains() {
        let mut f = frontier();
        f.push(url("https://payer.example/a1"), 0);
        f.push(url("https://payer.example/a2"), 0);
        f.push(url("https://docs.payer.example/b1"), 0);

        let first = extract_domain_of(&f.pop().unwrap());
        let second = extract_domain_of(&f.pop().unwrap());
        assert_ne!(first, second);
    }

    fn extract_domain_of(entry: &FrontierEntry) -> String {
        entry.url.host_str().unwrap().to_string()
    }

    #[test]
    fn test_is_empty() {
        let mut f = frontier();
        assert!(f.is_empty());
        f.push(url("https://payer.example/a"), 0);
        assert!(!f.is_empty());
        f.pop();
        assert!(f.is_empty());
    }
}
