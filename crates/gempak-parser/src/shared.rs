//! Grid reader shared between threads.
//!
//! The file handle sits behind a mutex that is held only while a record's
//! words are read. Unpacking, reorientation and resampling run after the
//! lock is released, so threads decoding different grids only contend on
//! I/O. Decoded grids are kept in an LRU cache keyed by grid number.

use std::io::{Read, Seek};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use grid_processor::CalibratedGrid;
use lru::LruCache;
use tracing::warn;

use crate::config::DecoderConfig;
use crate::error::{GempakError, RecordOutcome, Result};
use crate::grid::{GempakGridReader, GridHeader, NavBlock};

/// Statistics for the decoded grid cache.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecodedCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl DecodedCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct DecodedCache {
    grids: LruCache<usize, Arc<CalibratedGrid>>,
    stats: DecodedCacheStats,
}

/// Thread-safe grid reader over one open file.
pub struct SharedGridReader<R> {
    reader: Mutex<GempakGridReader<R>>,
    cache: Mutex<DecodedCache>,
    config: DecoderConfig,
    grids: Vec<GridHeader>,
    nav: NavBlock,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Poisoning is ignored; every read seeks before reading.
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl<R: Read + Seek> SharedGridReader<R> {
    pub fn new(reader: GempakGridReader<R>) -> Result<Self> {
        let config = reader.config().clone();
        let capacity = NonZeroUsize::new(config.decoded_cache_entries).ok_or_else(|| {
            GempakError::InvalidConfig("decoded_cache_entries must be > 0".to_string())
        })?;
        let grids = reader.grids().to_vec();
        let nav = reader.nav_block().clone();
        Ok(Self {
            reader: Mutex::new(reader),
            cache: Mutex::new(DecodedCache {
                grids: LruCache::new(capacity),
                stats: DecodedCacheStats::default(),
            }),
            config,
            grids,
            nav,
        })
    }

    pub fn grids(&self) -> &[GridHeader] {
        &self.grids
    }

    pub fn find_grid(&self, param: &str) -> Option<&GridHeader> {
        let param = param.trim();
        self.grids.iter().find(|g| g.param == param)
    }

    pub fn nav_block(&self) -> &NavBlock {
        &self.nav
    }

    /// Decode a grid, or return it from the cache.
    ///
    /// Returns `None` when the grid has no data.
    pub fn read_grid(&self, grid_number: usize) -> Result<Option<Arc<CalibratedGrid>>> {
        {
            let mut cache = lock(&self.cache);
            if let Some(grid) = cache.grids.get(&grid_number).cloned() {
                cache.stats.hits += 1;
                return Ok(Some(grid));
            }
            cache.stats.misses += 1;
        }

        let raw = {
            let mut reader = lock(&self.reader);
            reader.read_raw_grid(grid_number)?
        };
        let RecordOutcome::Decoded(raw) = raw else {
            return Ok(None);
        };

        let grid = match raw.decode(&self.config) {
            RecordOutcome::Decoded(grid) => Arc::new(grid),
            RecordOutcome::NoData(reason) => {
                warn!(grid = grid_number, reason = %reason, "No data for grid");
                return Ok(None);
            }
        };

        let mut cache = lock(&self.cache);
        cache.grids.put(grid_number, Arc::clone(&grid));
        let entries = cache.grids.len();
        cache.stats.entries = entries;
        Ok(Some(grid))
    }

    pub fn cache_stats(&self) -> DecodedCacheStats {
        let cache = lock(&self.cache);
        DecodedCacheStats {
            entries: cache.grids.len(),
            ..cache.stats.clone()
        }
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> GempakGridReader<R> {
        self.reader.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}
