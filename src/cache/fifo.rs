//! Insertion Order Module
//!
//! Tracks the order in which keys were first inserted, for FIFO eviction.

use std::collections::{HashMap, VecDeque};

/// Compaction runs once stale slots outnumber live keys by this much.
const COMPACT_SLACK: usize = 64;

// == Insertion Order ==
/// Tracks insertion order of keys.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion
///
/// Reads never reorder keys, and re-inserting a tracked key keeps its
/// original position. Removal is lazy: the key leaves `members` and its queue
/// slot goes stale, to be skipped when it reaches the front. Every slot carries
/// the generation it was pushed with, so a key removed and pushed again is not
/// confused with its stale slot.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    /// (key, generation) by insertion time, stale slots included
    order: VecDeque<(String, u64)>,
    /// Live keys and the generation of their slot
    members: HashMap<String, u64>,
    next_generation: u64,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(&self, key: &str, generation: u64) -> bool {
        self.members.get(key) == Some(&generation)
    }

    fn track(&mut self, key: &str) -> Option<u64> {
        if self.members.contains_key(key) {
            return None;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.members.insert(key.to_string(), generation);
        Some(generation)
    }

    // == Push ==
    /// Records a key as newest, unless it is already tracked.
    pub fn push(&mut self, key: &str) {
        if let Some(generation) = self.track(key) {
            self.order.push_back((key.to_string(), generation));
        }
    }

    // == Push Front ==
    /// Puts a key back as oldest (undoing a failed eviction).
    pub fn push_front(&mut self, key: String) {
        if let Some(generation) = self.track(&key) {
            self.order.push_front((key, generation));
        }
    }

    // == Remove ==
    /// Stops tracking a key; its queue slot is dropped lazily.
    pub fn remove(&mut self, key: &str) {
        if self.members.remove(key).is_some() {
            self.compact_if_sparse();
        }
    }

    /// Drops stale slots once they dominate the queue, keeping memory
    /// proportional to the live keys.
    fn compact_if_sparse(&mut self) {
        if self.order.len() > 2 * self.members.len() + COMPACT_SLACK {
            let members = &self.members;
            self.order
                .retain(|(key, generation)| members.get(key) == Some(generation));
        }
    }

    // == Pop Oldest ==
    /// Returns and removes the earliest inserted key.
    ///
    /// Returns None if tracker is empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        while let Some((key, generation)) = self.order.pop_front() {
            if self.is_live(&key, generation) {
                self.members.remove(&key);
                return Some(key);
            }
        }
        None
    }

    // == Peek Oldest ==
    /// Returns the earliest inserted key without removing it.
    pub fn peek_oldest(&self) -> Option<&String> {
        self.iter().next()
    }

    /// Live keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order
            .iter()
            .filter(move |(key, generation)| self.is_live(key, *generation))
            .map(|(key, _)| key)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    /// Queue slots held, stale ones included.
    #[cfg(test)]
    fn slots(&self) -> usize {
        self.order.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = InsertionOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
    }

    #[test]
    fn test_push_new_keys() {
        let mut order = InsertionOrder::new();

        order.push("key1");
        order.push("key2");
        order.push("key3");

        assert_eq!(order.len(), 3);
        assert_eq!(order.peek_oldest(), Some(&"key1".to_string()));
    }

    #[test]
    fn test_push_existing_key_keeps_position() {
        let mut order = InsertionOrder::new();

        order.push("key1");
        order.push("key2");
        order.push("key1");

        assert_eq!(order.len(), 2);
        assert_eq!(order.pop_oldest(), Some("key1".to_string()));
        assert_eq!(order.pop_oldest(), Some("key2".to_string()));
    }

    #[test]
    fn test_pop_oldest() {
        let mut order = InsertionOrder::new();

        order.push("a");
        order.push("b");
        order.push("c");

        assert_eq!(order.pop_oldest(), Some("a".to_string()));
        assert_eq!(order.pop_oldest(), Some("b".to_string()));
        assert!(!order.contains("a"));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_pop_empty() {
        let mut order = InsertionOrder::new();
        assert_eq!(order.pop_oldest(), None);
    }

    #[test]
    fn test_remove() {
        let mut order = InsertionOrder::new();

        order.push("key1");
        order.push("key2");
        order.push("key3");
        order.remove("key2");
        order.remove("nonexistent");

        assert_eq!(order.len(), 2);
        assert!(!order.contains("key2"));
        let keys: Vec<&String> = order.iter().collect();
        assert_eq!(keys, vec!["key1", "key3"]);
    }

    #[test]
    fn test_push_front_restores_oldest() {
        let mut order = InsertionOrder::new();

        order.push("a");
        order.push("b");
        let oldest = order.pop_oldest().unwrap();
        order.push_front(oldest);

        assert_eq!(order.peek_oldest(), Some(&"a".to_string()));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut order = InsertionOrder::new();
        order.push("a");
        order.clear();

        assert!(order.is_empty());
        assert!(!order.contains("a"));
    }

    #[test]
    fn test_remove_then_push_goes_to_back() {
        let mut order = InsertionOrder::new();

        order.push("a");
        order.push("b");
        order.remove("a");
        order.push("a");

        assert_eq!(order.pop_oldest(), Some("b".to_string()));
        assert_eq!(order.pop_oldest(), Some("a".to_string()));
        assert_eq!(order.pop_oldest(), None);
    }

    #[test]
    fn test_stale_slots_are_skipped_and_compacted() {
        let mut order = InsertionOrder::new();

        for i in 0..1_000 {
            order.push(&format!("k{}", i));
        }
        for i in 0..999 {
            order.remove(&format!("k{}", i));
        }

        assert_eq!(order.len(), 1);
        assert!(order.slots() <= 2 + COMPACT_SLACK);
        assert_eq!(order.peek_oldest(), Some(&"k999".to_string()));
        assert_eq!(order.pop_oldest(), Some("k999".to_string()));
        assert!(order.is_empty());
    }
}
