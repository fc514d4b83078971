//! Frontier for the crawl queue
//!
//! This module handles:
//! - The FIFO queue of canonical URLs waiting to be fetched
//! - The visited set, which a URL joins when it is queued

use std::collections::{HashSet, VecDeque};

/// FIFO work queue with global deduplication
///
/// A URL is marked visited the moment it is queued, so the same URL found
/// on several pages is only ever queued once, at first discovery.
#[derive(Debug, Default)]
pub struct Frontier {
    /// URLs waiting to be fetched, in discovery order
    queue: VecDeque<String>,

    /// Every URL ever queued
    visited: HashSet<String>,

    /// URLs handed out by `pop`
    dequeued: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a canonical URL unless it has been seen before
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and is now queued
    /// * `false` - The URL was already visited
    pub fn push(&mut self, url: String) -> bool {
        if self.visited.contains(&url) {
            return false;
        }

        self.visited.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Takes the oldest queued URL
    pub fn pop(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.dequeued += 1;
        Some(url)
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Number of URLs still waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of URLs ever queued
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of URLs taken from the queue
    pub fn dequeued_count(&self) -> usize {
        self.dequeued
    }
}
