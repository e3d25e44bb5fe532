//! Generated-video URL cache.
//!
//! Exercise name → download URL, so repeated demo requests for the same
//! movement skip the (slow, expensive) generation round-trip. Keys are
//! folded to lowercase: "Goblet Squat" and "goblet squat" are one entry.
//! Last write wins; entries live for the process lifetime only.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct VideoUrlCache {
    entries: HashMap<String, String>,
}

impl VideoUrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&Self::fold(name)).map(String::as_str)
    }

    pub fn insert(&mut self, name: &str, url: String) {
        self.entries.insert(Self::fold(name), url);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut cache = VideoUrlCache::new();
        cache.insert("Goblet Squat", "https://v.example/1".into());
        assert_eq!(cache.get("goblet squat"), Some("https://v.example/1"));
        assert_eq!(cache.get("GOBLET SQUAT"), Some("https://v.example/1"));
        assert_eq!(cache.get("  goblet squat  "), Some("https://v.example/1"));
    }

    #[test]
    fn last_write_wins() {
        let mut cache = VideoUrlCache::new();
        cache.insert("deadlift", "https://v.example/old".into());
        cache.insert("Deadlift", "https://v.example/new".into());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("deadlift"), Some("https://v.example/new"));
    }

    #[test]
    fn miss_returns_none() {
        let cache = VideoUrlCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get("burpee"), None);
    }
}
