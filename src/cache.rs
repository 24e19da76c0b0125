//! LRU cache for rendered page bitmaps
//!
//! Entries are tagged with the transform and generation that produced
//! them; a lookup hits only on an exact tag match, so a cached bitmap can
//! never be shown under a transform it was not rendered for.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::transform::{GlobalTransform, Rotation};
use crate::types::{Bitmap, Generation};

/// Scale stored as millionths for stable equality
fn scale_millionths(scale: f32) -> u32 {
    (scale * 1_000_000.0) as u32
}

#[derive(Debug)]
struct CacheEntry {
    scale_millionths: u32,
    rotation: Rotation,
    generation: Generation,
    bitmap: Arc<Bitmap>,
}

impl CacheEntry {
    fn matches(&self, transform: &GlobalTransform, generation: Generation) -> bool {
        self.scale_millionths == scale_millionths(transform.scale)
            && self.rotation == transform.rotation
            && self.generation == generation
    }
}

/// Bounded cache of the last bitmap rendered per page.
///
/// Naturally limited by the page count of one document, with an LRU cap
/// on top for very large documents. Fully cleared on transform mutation
/// and on document replacement.
pub struct RenderCache {
    entries: LruCache<usize, CacheEntry>,
}

impl RenderCache {
    /// Create a new cache with the given capacity (in pages)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached bitmap, promoting it in the LRU order. Misses when the
    /// entry was rendered under a different scale, rotation or generation.
    #[must_use]
    pub fn get(
        &mut self,
        page: usize,
        transform: &GlobalTransform,
        generation: Generation,
    ) -> Option<Arc<Bitmap>> {
        let entry = self.entries.get(&page)?;
        if entry.matches(transform, generation) {
            Some(Arc::clone(&entry.bitmap))
        } else {
            None
        }
    }

    /// Check for a current-transform entry without promoting it
    #[must_use]
    pub fn contains(&self, page: usize, transform: &GlobalTransform, generation: Generation) -> bool {
        self.entries
            .peek(&page)
            .is_some_and(|entry| entry.matches(transform, generation))
    }

    /// Insert a rendered bitmap tagged with what produced it
    pub fn put(
        &mut self,
        page: usize,
        bitmap: Arc<Bitmap>,
        scale: f32,
        rotation: Rotation,
        generation: Generation,
    ) {
        self.entries.put(
            page,
            CacheEntry {
                scale_millionths: scale_millionths(scale),
                rotation,
                generation,
                bitmap,
            },
        );
    }

    /// Drop every entry. Runs exactly once per transform mutation,
    /// synchronously, before any new render task is issued.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bitmap() -> Arc<Bitmap> {
        Arc::new(Bitmap {
            pixels: vec![0; 300],
            width: 10,
            height: 10,
        })
    }

    fn transform() -> GlobalTransform {
        GlobalTransform {
            scale: 1.0,
            rotation: Rotation::Deg0,
        }
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = RenderCache::new(10);
        let t = transform();
        let generation = Generation(1);

        cache.put(1, test_bitmap(), t.scale, t.rotation, generation);

        assert!(cache.contains(1, &t, generation));
        assert!(cache.get(1, &t, generation).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_misses_on_scale_mismatch() {
        let mut cache = RenderCache::new(10);
        let t = transform();
        let generation = Generation(1);
        cache.put(1, test_bitmap(), 1.0, t.rotation, generation);

        let zoomed = GlobalTransform {
            scale: 1.5,
            ..transform()
        };
        assert!(cache.get(1, &zoomed, generation).is_none());
    }

    #[test]
    fn cache_misses_on_rotation_mismatch() {
        let mut cache = RenderCache::new(10);
        let t = transform();
        let generation = Generation(1);
        cache.put(1, test_bitmap(), t.scale, Rotation::Deg0, generation);

        let rotated = GlobalTransform {
            rotation: Rotation::Deg90,
            ..transform()
        };
        assert!(cache.get(1, &rotated, generation).is_none());
    }

    #[test]
    fn cache_misses_on_stale_generation() {
        let mut cache = RenderCache::new(10);
        let t = transform();
        cache.put(1, test_bitmap(), t.scale, t.rotation, Generation(1));

        assert!(cache.get(1, &t, Generation(2)).is_none());
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = RenderCache::new(2);
        let t = transform();
        let generation = Generation(1);

        for page in 1..=3 {
            cache.put(page, test_bitmap(), t.scale, t.rotation, generation);
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(1, &t, generation));
        assert!(cache.contains(2, &t, generation));
        assert!(cache.contains(3, &t, generation));
    }

    #[test]
    fn cache_invalidate_all() {
        let mut cache = RenderCache::new(10);
        let t = transform();
        let generation = Generation(1);

        for page in 1..=5 {
            cache.put(page, test_bitmap(), t.scale, t.rotation, generation);
        }

        assert_eq!(cache.len(), 5);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
