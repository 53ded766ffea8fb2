use std::sync::Arc;

use tracing::{span_enabled, Level};

use promql_parser::parser::QueryParser;

use crate::execution::parser_cache::{
    ParseCache, ParseCacheResult, ParseCacheValue, PARSE_CACHE_MAX_LEN,
};
use crate::execution::Evaluator;
use crate::metrics::GaugeRegistry;
use crate::runtime_error::{RuntimeError, RuntimeResult};

const DEFAULT_MAX_QUERY_LEN: usize = 16 * 1024;
const DEFAULT_MAX_SERIES_TO_SORT: usize = 100;

/// Everything a query needs to run: configuration, the parse cache and the
/// collaborators that parse and evaluate expressions.
///
/// A single `Context` is meant to be shared by reference between request threads.
pub struct Context {
    pub config: SessionConfig,
    pub parse_cache: Arc<ParseCache>,
    pub parser: Arc<dyn QueryParser>,
    pub evaluator: Arc<dyn Evaluator>,
}

impl Context {
    pub fn new(parser: Arc<dyn QueryParser>, evaluator: Arc<dyn Evaluator>) -> Self {
        let config = SessionConfig::default();
        Self {
            parse_cache: Arc::new(ParseCache::new(config.parse_cache_max_entries)),
            config,
            parser,
            evaluator,
        }
    }

    /// Replaces the configuration. The parse cache is resized in place, so a cache shared
    /// with other contexts or registered for metrics stays the one in use.
    pub fn with_config(self, config: SessionConfig) -> Self {
        if config.parse_cache_max_entries != self.parse_cache.max_entries() {
            self.parse_cache.resize(config.parse_cache_max_entries);
        }
        Context { config, ..self }
    }

    /// Shares an existing parse cache, e.g. between several contexts.
    pub fn with_parse_cache(mut self, parse_cache: Arc<ParseCache>) -> Self {
        self.parse_cache = parse_cache;
        self
    }

    /// Publishes the statistics of the current parse cache to `registry`. A cache that is
    /// already registered is left as is.
    pub fn with_metrics_registry(self, registry: &mut dyn GaugeRegistry) -> Self {
        self.parse_cache.register_metrics(registry);
        self
    }

    pub fn parse_promql(&self, q: &str) -> RuntimeResult<(Arc<ParseCacheValue>, ParseCacheResult)> {
        let (res, cached) = self.parse_cache.parse(self.parser.as_ref(), q);
        if let Some(err) = res.err() {
            return Err(RuntimeError::ParseError(err.clone()));
        }
        Ok((res, cached))
    }

    pub(crate) fn validate_query(&self, q: &str) -> RuntimeResult<()> {
        let max_len = self.config.max_query_len;
        if max_len > 0 && q.len() > max_len {
            return Err(RuntimeError::ValidationError(format!(
                "too long query; got {} bytes; mustn't exceed {} bytes",
                q.len(),
                max_len
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn trace_enabled(&self) -> bool {
        self.config.trace_enabled && span_enabled!(Level::TRACE)
    }
}

/// Global configuration options for request context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// The maximum number of entries held by the parse cache.
    pub parse_cache_max_entries: usize,

    /// Results with more series than this are returned in evaluation order.
    pub max_series_to_sort: usize,

    /// The maximum query length in bytes. Zero means no limit.
    pub max_query_len: usize,

    /// Whether query tracing is enabled.
    pub trace_enabled: bool,
}

impl SessionConfig {
    /// Create an execution config with default setting
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_parse_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.parse_cache_max_entries = max_entries;
        self
    }

    pub fn with_max_series_to_sort(mut self, max_series: usize) -> Self {
        self.max_series_to_sort = max_series;
        self
    }

    pub fn with_max_query_len(mut self, max_query_len: usize) -> Self {
        self.max_query_len = max_query_len;
        self
    }

    pub fn with_trace_enabled(mut self, trace_enabled: bool) -> Self {
        self.trace_enabled = trace_enabled;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            parse_cache_max_entries: PARSE_CACHE_MAX_LEN,
            max_series_to_sort: DEFAULT_MAX_SERIES_TO_SORT,
            max_query_len: DEFAULT_MAX_QUERY_LEN,
            trace_enabled: false,
        }
    }
}
