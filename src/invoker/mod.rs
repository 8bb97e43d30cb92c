//! Throttling-tolerant calls to hosted models.
//!
//! [`ThrottledInvoker`] retries only [`RagError::ProviderRateLimited`], waiting
//! `base_delay * 2^attempt` between attempts. Every other error is returned on
//! the spot. Waiting goes through a [`Sleeper`] and each retry is announced to
//! a [`ThrottleObserver`], which is how the terminal UI shows its warning.


use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::prompt::Message;
use crate::provider::ChatModel;
use crate::{RagError, Result};

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Blocks the calling thread between attempts
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    #[inline]
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Details of one throttled attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleNotice {
    /// Zero-based index of the attempt that was throttled
    pub attempt: u32,
    pub max_retries: u32,
    pub wait: Duration,
}

impl ThrottleNotice {
    #[inline]
    pub fn message(&self) -> String {
        format!(
            "Throttled by Bedrock. Retrying in {:.1} seconds...",
            self.wait.as_secs_f64()
        )
    }
}

/// Receives a notice before every backoff wait
pub trait ThrottleObserver: Send + Sync {
    fn on_throttle(&self, notice: &ThrottleNotice);
}

/// Observer that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ThrottleObserver for LogObserver {
    #[inline]
    fn on_throttle(&self, notice: &ThrottleNotice) {
        debug!("{}", notice.message());
    }
}

#[derive(Clone)]
pub struct ThrottledInvoker {
    max_retries: u32,
    base_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn ThrottleObserver>,
}

impl std::fmt::Debug for ThrottledInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledInvoker")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

impl Default for ThrottledInvoker {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

impl ThrottledInvoker {
    #[inline]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            sleeper: Arc::new(ThreadSleeper),
            observer: Arc::new(LogObserver),
        }
    }

    #[inline]
    pub fn from_config(retry: &RetryConfig) -> Self {
        Self::new(retry.max_retries, retry.base_delay())
    }

    #[inline]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[inline]
    pub fn with_observer(mut self, observer: Arc<dyn ThrottleObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[inline]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[inline]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait before retrying after the given zero-based attempt
    #[inline]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Upper bound on the total time spent waiting across all retries
    #[inline]
    pub fn max_total_wait(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Send `messages` to `model` and return its text, retrying throttles
    #[inline]
    pub fn invoke(&self, model: &dyn ChatModel, messages: &[Message]) -> Result<String> {
        self.run(|| model.chat(messages))
    }

    /// Run any provider call under the retry policy
    pub fn run<T, F>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        for attempt in 0..self.max_retries {
            match call() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Call succeeded after {} throttled attempts", attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_throttle() => {
                    let notice = ThrottleNotice {
                        attempt,
                        max_retries: self.max_retries,
                        wait: self.delay_for(attempt),
                    };
                    warn!(
                        "Throttled on attempt {}/{}, waiting {:?}",
                        attempt + 1,
                        self.max_retries,
                        notice.wait
                    );
                    self.observer.on_throttle(&notice);
                    self.sleeper.sleep(notice.wait);
                }
                Err(err) => return Err(err),
            }
        }

        error!(
            "Giving up after {} throttled attempts",
            self.max_retries
        );
        Err(RagError::RetriesExhausted {
            attempts: self.max_retries,
        })
    }
}
