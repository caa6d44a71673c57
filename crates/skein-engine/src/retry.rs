//! Retry policy: backoff schedules and per-node attempt budgets

use rand::Rng;
use serde::{Deserialize, Serialize};

use skein_model::{Graph, Node};

/// Configuration for exponential backoff between retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Multiplicative growth factor per attempt
    pub backoff_factor: f64,
    /// Delay cap in milliseconds
    pub max_delay_ms: u64,
    /// Multiply each delay by a uniform factor in [0.5, 1.5]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 200,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// A config with explicit initial delay and factor, default cap,
    /// no jitter adjustments beyond the default.
    pub fn new(initial_delay_ms: u64, backoff_factor: f64) -> Self {
        Self {
            initial_delay_ms,
            backoff_factor,
            ..Self::default()
        }
    }

    /// Disable jitter
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Retry policy for one node: `max_attempts == 1` means no retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Backoff schedule between attempts
    pub backoff: BackoffConfig,
}

impl RetryPolicy {
    /// Delay in seconds before the retry following `attempt`
    /// (1-indexed): `min(initial * factor^(attempt-1), max)`, jittered
    /// when enabled.
    pub fn delay_for_attempt(&self, attempt: u32) -> f64 {
        let exponent = attempt.saturating_sub(1) as i32;
        let raw = self.backoff.initial_delay_ms as f64 * self.backoff.backoff_factor.powi(exponent);
        let mut delay = raw.min(self.backoff.max_delay_ms as f64);
        if self.backoff.jitter {
            delay *= rand::thread_rng().gen_range(0.5..=1.5);
        }
        delay / 1000.0
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: BackoffConfig::default(),
        }
    }

    /// 5 attempts, 200 ms initial delay, doubling
    pub fn standard() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffConfig::new(200, 2.0),
        }
    }

    /// 5 attempts, 500 ms initial delay, doubling
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 5,
            backoff: BackoffConfig::new(500, 2.0),
        }
    }

    /// 3 attempts, constant 500 ms delay
    pub fn linear() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffConfig::new(500, 1.0),
        }
    }

    /// 3 attempts, 2 s initial delay, tripling
    pub fn patient() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffConfig::new(2000, 3.0),
        }
    }

    /// Look up a named preset
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::none()),
            "standard" => Some(Self::standard()),
            "aggressive" => Some(Self::aggressive()),
            "linear" => Some(Self::linear()),
            "patient" => Some(Self::patient()),
            _ => None,
        }
    }
}

/// Build the retry policy for a node.
///
/// A non-zero `node.max_retries` wins; otherwise the graph-level
/// `default_max_retry` attribute applies (0 on absence or parse
/// failure). `max_retries` counts extra attempts beyond the first.
pub fn build_retry_policy(node: &Node, graph: &Graph) -> RetryPolicy {
    let mut max_retries = node.max_retries;
    if max_retries == 0 {
        max_retries = graph
            .attributes
            .get("default_max_retry")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(0);
    }
    RetryPolicy {
        max_attempts: max_retries + 1,
        backoff: BackoffConfig::default(),
    }
}
