use std::time::Duration;

use relbatch_core::ConfigurationError;

/// Largest number of tuple updates the service accepts in a single write.
pub const DEFAULT_MAX_TUPLES_PER_CHUNK: usize = 100;

/// Connection settings for [`GrpcTransport`](crate::GrpcTransport).
///
/// `timeout` bounds each write request, so it also bounds a single chunk attempt.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Controls how a batch of tuple operations is split, sent and retried.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Upper bound on chunks in flight at once. `1` sends chunks sequentially.
    pub max_parallel_requests: usize,
    pub max_tuples_per_chunk: usize,
    /// Retries per chunk after the first attempt.
    pub max_retries: u32,
    /// Base unit of the exponential backoff schedule.
    pub retry_delay_seconds: f64,
    /// Fixed wait after a rate-limit or maintenance response without a retry-after hint.
    pub rate_limit_delay: Duration,
    pub stop_on_first_error: bool,
    /// Send everything as one request; chunk-level options are ignored.
    pub transactional: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_parallel_requests: 1,
            max_tuples_per_chunk: DEFAULT_MAX_TUPLES_PER_CHUNK,
            max_retries: 3,
            retry_delay_seconds: 1.0,
            rate_limit_delay: Duration::from_secs(5),
            stop_on_first_error: false,
            transactional: true,
        }
    }
}

impl BatchOptions {
    /// Defaults with transactional mode switched off.
    pub fn non_transactional() -> Self {
        Self {
            transactional: false,
            ..Self::default()
        }
    }

    pub fn with_max_parallel_requests(mut self, n: usize) -> Self {
        self.max_parallel_requests = n;
        self
    }

    pub fn with_max_tuples_per_chunk(mut self, n: usize) -> Self {
        self.max_tuples_per_chunk = n;
        self
    }

    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn with_retry_delay_seconds(mut self, seconds: f64) -> Self {
        self.retry_delay_seconds = seconds;
        self
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_parallel_requests == 0 {
            return Err(ConfigurationError::InvalidParallelism(
                self.max_parallel_requests,
            ));
        }
        if self.max_tuples_per_chunk == 0 {
            return Err(ConfigurationError::InvalidChunkSize(
                self.max_tuples_per_chunk,
            ));
        }
        if Duration::try_from_secs_f64(self.retry_delay_seconds).is_err() {
            return Err(ConfigurationError::InvalidRetryDelay(
                self.retry_delay_seconds,
            ));
        }
        Ok(())
    }
}
