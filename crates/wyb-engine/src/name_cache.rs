//! Ring of barcode names.

use serde::Serialize;
use wyb_protocol::NAME_CACHE_CAPACITY;

/// A name and its barcode format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCacheEntry {
    /// Barcode name.
    pub name: String,
    /// Barcode format (e.g. `QR_CODE`).
    pub format: String,
}

/// Fixed-capacity ring of name/format pairs.
///
/// Names are written at the cursor, so catalog index `i` lands in slot
/// `i % 10` as long as the cursor restarts with each catalog read. Writes
/// overwrite the slot whether or not the previous occupant was ever read;
/// which indices are still resident is for the reader to know.
#[derive(Debug, Clone, Default)]
pub struct NameCache {
    slots: [Option<NameCacheEntry>; NAME_CACHE_CAPACITY],
    cursor: usize,
}

impl NameCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        NAME_CACHE_CAPACITY
    }

    /// Store the entry for catalog index `index` and move the cursor past it.
    pub fn put(&mut self, index: usize, name: String, format: String) {
        self.slots[index % NAME_CACHE_CAPACITY] = Some(NameCacheEntry { name, format });
        self.cursor = index + 1;
    }

    /// Store the next name at the cursor. Returns the catalog index the entry
    /// was stored as.
    pub fn push(&mut self, name: String, format: String) -> usize {
        let index = self.cursor;
        self.put(index, name, format);
        index
    }

    /// Entry currently resident in the slot of `index`.
    pub fn get(&self, index: usize) -> Option<&NameCacheEntry> {
        self.slots[index % NAME_CACHE_CAPACITY].as_ref()
    }

    /// Catalog index the next write goes to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Restart writing at index 0. Resident entries are kept.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(cache: &mut NameCache, count: usize) {
        for i in 0..count {
            cache.push(format!("name{}", i), format!("fmt{}", i));
        }
    }

    #[test]
    fn test_push_advances_cursor() {
        let mut cache = NameCache::new();
        fill(&mut cache, 3);

        assert_eq!(cache.push("Gym".to_string(), "QR_CODE".to_string()), 3);
        let entry = cache.get(3).expect("entry should be resident");
        assert_eq!(entry.name, "Gym");
        assert_eq!(entry.format, "QR_CODE");
        assert_eq!(cache.cursor(), 4);
    }

    #[test]
    fn test_latest_put_wins_regardless_of_order() {
        let mut cache = NameCache::new();
        cache.put(12, "twelve".to_string(), String::new());
        cache.put(2, "two".to_string(), String::new());
        assert_eq!(cache.get(12).unwrap().name, "two");
        assert_eq!(cache.cursor(), 3);

        cache.put(22, "twenty-two".to_string(), String::new());
        assert_eq!(cache.get(2).unwrap().name, "twenty-two");
    }

    #[test]
    fn test_wraparound_overwrites() {
        let mut cache = NameCache::new();
        fill(&mut cache, 25);

        // Slot 4 was written by 4, 14 and finally 24
        assert_eq!(cache.get(4).unwrap().name, "name24");
        assert_eq!(cache.get(14).unwrap().name, "name24");
        // Slot 7 last held 17
        assert_eq!(cache.get(7).unwrap().name, "name17");
    }

    #[test]
    fn test_reset_cursor_rewrites_from_first_slot() {
        let mut cache = NameCache::new();
        fill(&mut cache, 13);
        cache.reset_cursor();

        assert_eq!(cache.cursor(), 0);
        // Old entries stay until overwritten
        assert_eq!(cache.get(1).unwrap().name, "name1");

        assert_eq!(cache.push("fresh".to_string(), "EAN_13".to_string()), 0);
        assert_eq!(cache.get(0).unwrap().name, "fresh");
        assert_eq!(cache.get(2).unwrap().name, "name12");
    }

    #[test]
    fn test_empty_slot() {
        let cache = NameCache::new();
        assert!(cache.get(5).is_none());
        assert_eq!(cache.capacity(), 10);
    }
}
