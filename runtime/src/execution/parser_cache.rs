use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use promql_parser::ast::Expr;
use promql_parser::parser::{ParseError, ParseResult, QueryParser};

use crate::metrics::{GaugeDesc, GaugeRegistry};

pub const PARSE_CACHE_MAX_LEN: usize = 10_000;

const CACHE_TYPE: &str = "promql/parse";

/// The memoized outcome of parsing one query text: either the expression or the error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseCacheValue {
    result: Result<Expr, ParseError>,
}

impl ParseCacheValue {
    pub fn new(result: ParseResult<Expr>) -> Self {
        ParseCacheValue { result }
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.result.as_ref().ok()
    }

    pub fn err(&self) -> Option<&ParseError> {
        self.result.as_ref().err()
    }

    pub fn as_result(&self) -> Result<&Expr, &ParseError> {
        self.result.as_ref()
    }
}

impl From<ParseResult<Expr>> for ParseCacheValue {
    fn from(result: ParseResult<Expr>) -> Self {
        ParseCacheValue::new(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCacheResult {
    CacheHit,
    CacheMiss,
}

/// Size-bounded map from exact query text to its parse outcome.
///
/// Lookups share a read lock; only inserts, `resize` and `clear` take the write lock.
/// When an insert of a new key finds the cache full, roughly a tenth of the entries are
/// dropped in whatever order the map yields them. Counters are updated outside the lock.
pub struct ParseCache {
    requests: AtomicU64,
    misses: AtomicU64,
    max_entries: AtomicUsize,
    metrics_registered: AtomicBool,
    entries: RwLock<AHashMap<String, Arc<ParseCacheValue>>>,
}

impl Default for ParseCache {
    fn default() -> Self {
        ParseCache::new(PARSE_CACHE_MAX_LEN)
    }
}

impl ParseCache {
    pub fn new(max_entries: usize) -> Self {
        ParseCache {
            requests: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            max_entries: AtomicUsize::new(max_entries.max(1)),
            metrics_registered: AtomicBool::new(false),
            entries: RwLock::new(AHashMap::new()),
        }
    }

    /// Creates a cache and publishes its gauges to `registry`.
    pub fn with_metrics(max_entries: usize, registry: &mut dyn GaugeRegistry) -> Arc<Self> {
        let cache = Arc::new(ParseCache::new(max_entries));
        cache.register_metrics(registry);
        cache
    }

    /// Publishes `vm_cache_requests_total`, `vm_cache_misses_total` and `vm_cache_entries`
    /// for this cache. Only the first call registers anything; later calls return `false`.
    /// The gauges report 0 once the cache is dropped.
    pub fn register_metrics(self: &Arc<Self>, registry: &mut dyn GaugeRegistry) -> bool {
        if self.metrics_registered.swap(true, Ordering::AcqRel) {
            return false;
        }

        let gauges: [(&str, &str, fn(&ParseCache) -> f64); 3] = [
            (
                "vm_cache_requests_total",
                "Number of parse cache lookups",
                |pc: &ParseCache| pc.requests() as f64,
            ),
            (
                "vm_cache_misses_total",
                "Number of parse cache lookups which found no entry",
                |pc: &ParseCache| pc.misses() as f64,
            ),
            (
                "vm_cache_entries",
                "Number of entries in the parse cache",
                |pc: &ParseCache| pc.len() as f64,
            ),
        ];

        for (name, help, sample) in gauges {
            let weak: Weak<ParseCache> = Arc::downgrade(self);
            let desc = GaugeDesc::new(name, help).with_label("type", CACHE_TYPE);
            registry.register_gauge(
                desc,
                Box::new(move || weak.upgrade().map_or(0.0, |pc| sample(&pc))),
            );
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries.load(Ordering::Relaxed)
    }

    /// Changes the maximum entry count in place. Entries above the new maximum are
    /// evicted at once. Registered gauges keep reporting this cache.
    pub fn resize(&self, max_entries: usize) {
        let max_entries = max_entries.max(1);
        let mut entries = self.entries.write();
        self.max_entries.store(max_entries, Ordering::Relaxed);
        if entries.len() > max_entries {
            let excess = entries.len() - max_entries;
            evict(&mut entries, excess);
            debug!(evicted = excess, max_entries, "parse cache resized");
        }
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.write().clear()
    }

    pub fn get(&self, q: &str) -> Option<Arc<ParseCacheValue>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let found = self.entries.read().get(q).map(Arc::clone);
        if found.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn put(&self, q: &str, value: Arc<ParseCacheValue>) {
        let mut entries = self.entries.write();
        let max_entries = self.max_entries.load(Ordering::Relaxed);
        if entries.len() >= max_entries && !entries.contains_key(q) {
            let overflow = ((entries.len() as f64 * 0.1) as usize).max(1);
            evict(&mut entries, overflow);
            debug!(evicted = overflow, max_entries, "parse cache overflow");
        }
        entries.insert(q.to_string(), value);
    }

    /// Returns the cached outcome for `q`, parsing and storing it on a miss.
    ///
    /// Concurrent misses for the same text each invoke the parser; the last store wins.
    pub fn parse<P>(&self, parser: &P, q: &str) -> (Arc<ParseCacheValue>, ParseCacheResult)
    where
        P: QueryParser + ?Sized,
    {
        if let Some(value) = self.get(q) {
            return (value, ParseCacheResult::CacheHit);
        }
        let value = Arc::new(ParseCacheValue::new(parser.parse(q)));
        self.put(q, Arc::clone(&value));
        (value, ParseCacheResult::CacheMiss)
    }
}

/// Removes `count` entries in whatever order the map yields them.
fn evict(entries: &mut AHashMap<String, Arc<ParseCacheValue>>, count: usize) {
    let mut remaining = count;
    entries.retain(|_, _| {
        if remaining == 0 {
            return true;
        }
        remaining -= 1;
        false
    });
}
