//! Decode caching over a [`RafList`].
//!
//! Decoding an element means a seek, a read, and a payload parse; lookups
//! tend to revisit the same entries, so each bulk section is wrapped in a
//! bounded LRU cache. Small, hot sections (the indices) use the
//! fully-cached variant instead, which retains every decoded element.
//!
//! The cache is a pure memoization of the underlying list: evicting and
//! re-fetching always yields a value equal to the uncached decode.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek};
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::error::Result;
use super::raf::{RafCodec, RafList};

/// Default cache capacity for the bulk entry sections.
pub const CACHE_SIZE: usize = 5000;

enum Store<T> {
    Bounded(Mutex<LruCache<usize, T>>),
    Full(Mutex<HashMap<usize, T>>),
}

/// An index-addressable view over a [`RafList`] that memoizes decodes.
///
/// Safe to share across reader threads: the cache has its own lock and
/// the list's file handle is already mutex-guarded.
pub struct CachingList<F, T> {
    source: RafList<F, T>,
    store: Store<T>,
}

impl<F: Read + Seek, T: RafCodec + Clone> CachingList<F, T> {
    /// Wrap `source` with a fixed-capacity, least-recently-used cache.
    ///
    /// The capacity should be a small fraction of the expected element
    /// count so memory stays bounded regardless of dictionary size.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn bounded(source: RafList<F, T>, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).expect("capacity must be > 0");
        Self {
            source,
            store: Store::Bounded(Mutex::new(LruCache::new(cap))),
        }
    }

    /// Wrap `source` with an unbounded cache that never evicts.
    ///
    /// Only for sections whose total element count is small; memory is
    /// then bounded by section size rather than by a capacity.
    pub fn fully_cached(source: RafList<F, T>) -> Self {
        Self {
            source,
            store: Store::Full(Mutex::new(HashMap::new())),
        }
    }

    /// Return element `index`, decoding it through the underlying list on
    /// a cache miss.
    pub fn get(&self, index: usize) -> Result<T> {
        match &self.store {
            Store::Bounded(cache) => {
                if let Some(hit) = cache.lock().get(&index) {
                    return Ok(hit.clone());
                }
                // Two readers may race to decode the same element; both
                // decode the same immutable bytes, so the duplicate
                // insert is harmless.
                let value = self.source.get(index)?;
                cache.lock().put(index, value.clone());
                Ok(value)
            }
            Store::Full(cache) => {
                if let Some(hit) = cache.lock().get(&index) {
                    return Ok(hit.clone());
                }
                let value = self.source.get(index)?;
                cache.lock().insert(index, value.clone());
                Ok(value)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// The end offset of the underlying file region.
    pub fn end_offset(&self) -> u64 {
        self.source.end_offset()
    }

    /// Decode every element, front to back, through the cache.
    pub fn read_all(&self) -> Result<Vec<T>> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}

impl<F: Read + Seek, T: RafCodec + Clone> fmt::Debug for CachingList<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = match &self.store {
            Store::Bounded(_) => "bounded",
            Store::Full(_) => "fully-cached",
        };
        f.debug_struct("CachingList")
            .field("len", &self.len())
            .field("cache", &cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::raf;
    use std::io::Cursor;
    use std::sync::Arc;

    fn string_list(items: &[String]) -> RafList<Cursor<Vec<u8>>, String> {
        let mut cursor = Cursor::new(Vec::new());
        raf::write(&mut cursor, items).unwrap();
        RafList::attach(Arc::new(Mutex::new(cursor)), 0).unwrap()
    }

    fn sample() -> Vec<String> {
        (0..8).map(|i| format!("element-{}", i)).collect()
    }

    #[test]
    fn bounded_cache_is_transparent() {
        let items = sample();
        let cached = CachingList::bounded(string_list(&items), 3);
        // Access pattern designed to force evictions between repeats.
        for &i in &[0usize, 1, 2, 3, 4, 0, 5, 1, 6, 2, 7, 0] {
            assert_eq!(items[i], cached.get(i).unwrap(), "mismatch at index {}", i);
        }
    }

    #[test]
    fn fully_cached_is_transparent() {
        let items = sample();
        let cached = CachingList::fully_cached(string_list(&items));
        for i in (0..items.len()).rev() {
            assert_eq!(items[i], cached.get(i).unwrap());
        }
        for i in 0..items.len() {
            assert_eq!(items[i], cached.get(i).unwrap());
        }
    }

    #[test]
    fn out_of_range_get_fails() {
        let cached = CachingList::bounded(string_list(&sample()), 2);
        assert!(cached.get(99).is_err());
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ = CachingList::bounded(string_list(&sample()), 0);
    }

    // Counts decodes on the calling thread; each test runs on its own
    // thread, so counters never interleave across tests.
    thread_local! {
        static DECODES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
    }

    #[derive(Clone, PartialEq, Debug)]
    struct Counted(u32);

    impl RafCodec for Counted {
        fn read<R: std::io::Read + std::io::Seek>(
            reader: &mut R,
            _index: u32,
        ) -> Result<Self> {
            use byteorder::{BigEndian, ReadBytesExt};
            DECODES.with(|c| c.set(c.get() + 1));
            Ok(Counted(reader.read_u32::<BigEndian>()?))
        }

        fn write<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
            use byteorder::{BigEndian, WriteBytesExt};
            writer.write_u32::<BigEndian>(self.0)?;
            Ok(())
        }
    }

    fn counted_list(n: u32) -> RafList<Cursor<Vec<u8>>, Counted> {
        let items: Vec<Counted> = (0..n).map(Counted).collect();
        let mut cursor = Cursor::new(Vec::new());
        raf::write(&mut cursor, &items).unwrap();
        RafList::attach(Arc::new(Mutex::new(cursor)), 0).unwrap()
    }

    #[test]
    fn fully_cached_decodes_each_element_once() {
        let cached = CachingList::fully_cached(counted_list(5));
        DECODES.with(|c| c.set(0));
        for _ in 0..4 {
            for i in 0..5 {
                assert_eq!(Counted(i as u32), cached.get(i).unwrap());
            }
        }
        assert_eq!(5, DECODES.with(|c| c.get()));
    }

    #[test]
    fn bounded_cache_evicts_least_recently_used() {
        let cached = CachingList::bounded(counted_list(3), 2);
        DECODES.with(|c| c.set(0));
        cached.get(0).unwrap();
        cached.get(1).unwrap();
        cached.get(2).unwrap(); // evicts 0
        assert_eq!(3, DECODES.with(|c| c.get()));
        cached.get(1).unwrap(); // still cached
        assert_eq!(3, DECODES.with(|c| c.get()));
        cached.get(0).unwrap(); // was evicted, decoded again
        assert_eq!(4, DECODES.with(|c| c.get()));
    }
}
