//! ============================================================================
//! Tool Call Retry - Deadline, Backoff & Error Classification
//! ============================================================================
//! Wraps a single tool execution with:
//! - One overall deadline covering every attempt and backoff sleep
//! - Exponential backoff with jitter between attempts
//! - Error classification (retryable vs permanent)
//! - Retries only when the tool declares itself idempotent
//! ============================================================================

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::types::{AssistError, AssistResult};

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorKind {
    /// Transient (connection reset, upstream briefly down), safe to retry
    Retryable,
    /// Validation or business failure, never retried
    Permanent,
    /// Upstream asked us to slow down, back off to the maximum delay
    RateLimited,
}

/// Classify a tool error to decide whether another attempt makes sense
pub fn classify_error(error: &AssistError) -> ErrorKind {
    match error {
        AssistError::InvalidArguments(_)
        | AssistError::CapabilityNotFound(_)
        | AssistError::TenantIsolation(_)
        | AssistError::Configuration(_) => ErrorKind::Permanent,
        AssistError::ProviderUnavailable(_) | AssistError::Timeout(_) => ErrorKind::Retryable,
        AssistError::CapabilityExecution { message, .. } => classify_message(message),
        AssistError::Storage(message) => classify_message(message),
    }
}

/// Classify a free-form upstream error message
pub fn classify_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429")
    {
        return ErrorKind::RateLimited;
    }

    if lower.contains("connection")
        || lower.contains("reset")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("temporar")
        || lower.contains("unavailable")
        || lower.contains("try again")
    {
        return ErrorKind::Retryable;
    }

    // Unknown failures are never retried
    ErrorKind::Permanent
}

/// Calculate delay with exponential backoff and optional jitter
pub fn calculate_delay(attempt: u32, config: &DispatchConfig) -> Duration {
    let multiplier = 2u64.saturating_pow(attempt.min(63));
    let base_delay = config.base_delay_ms.saturating_mul(multiplier);
    let capped_delay = base_delay.min(config.max_delay_ms);

    let final_delay = if config.jitter && capped_delay > 0 {
        // 0-50% extra
        let jitter_factor = 1.0 + rand::thread_rng().gen_range(0.0..0.5);
        (capped_delay as f64 * jitter_factor) as u64
    } else {
        capped_delay
    };

    Duration::from_millis(final_delay)
}

/// Run `op` under the dispatch deadline, retrying transient failures when
/// `idempotent` is set. Returns `AssistError::Timeout` when the deadline
/// elapses before any attempt settles.
pub async fn call_with_retry<T, F, Fut>(
    tool_name: &str,
    idempotent: bool,
    config: &DispatchConfig,
    mut op: F,
) -> AssistResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AssistResult<T>>,
{
    let attempts = async {
        let max_attempts = if idempotent { config.max_retries + 1 } else { 1 };
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    let kind = classify_error(&err);

                    if kind == ErrorKind::Permanent || attempt >= max_attempts {
                        return Err(err);
                    }

                    let delay = if kind == ErrorKind::RateLimited {
                        Duration::from_millis(config.max_delay_ms)
                    } else {
                        calculate_delay(attempt - 1, config)
                    };

                    warn!(
                        tool = tool_name,
                        attempt,
                        error = %err,
                        "Tool call failed ({:?}), retrying in {:?}",
                        kind,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    };

    match timeout(Duration::from_millis(config.call_timeout_ms), attempts).await {
        Ok(result) => result,
        Err(_) => {
            debug!(tool = tool_name, "Tool call exceeded {} ms", config.call_timeout_ms);
            Err(AssistError::Timeout(config.call_timeout_ms))
        }
    }
}
