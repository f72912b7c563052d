//! Configuration schema definitions.
//!
//! Every section derives Serde traits and defaults, so an empty file is a
//! valid configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::{BreakerPolicy, OperationName};
use crate::resilience::BreakerOptions;

/// Root configuration for the catalog service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// Listener configuration (bind address, backpressure).
    pub listener: ListenerConfig,

    /// Request timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Circuit breaker defaults and per-operation overrides.
    pub breaker: BreakerConfig,

    /// Read-through cache settings.
    pub cache: CacheConfig,

    /// Persistent store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4001").
    pub bind_address: String,

    /// Maximum requests in flight (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4001".to_string(),
            max_concurrent_requests: 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one HTTP request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client IP within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 900,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Per-call deadline in milliseconds.
    pub timeout_ms: u64,

    /// Consecutive counted failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a probe.
    pub reset_timeout_secs: u64,

    /// Overrides keyed by operation name (e.g. "createProduct").
    pub operations: BTreeMap<String, BreakerOverride>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            failure_threshold: 5,
            reset_timeout_secs: 30,
            operations: BTreeMap::new(),
        }
    }
}

/// Partial breaker settings for one operation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerOverride {
    pub timeout_ms: Option<u64>,
    pub failure_threshold: Option<u32>,
    pub reset_timeout_secs: Option<u64>,
}

impl BreakerConfig {
    pub fn defaults(&self) -> BreakerOptions {
        BreakerOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_secs),
        }
    }

    /// Resolve the per-operation policy. Unknown names are skipped here;
    /// validation reports them.
    pub fn policy(&self) -> BreakerPolicy {
        let defaults = self.defaults();
        self.operations
            .iter()
            .filter_map(|(name, o)| OperationName::parse(name).map(|op| (op, o)))
            .fold(BreakerPolicy::new(defaults), |policy, (op, o)| {
                let options = BreakerOptions {
                    timeout: o
                        .timeout_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.timeout),
                    failure_threshold: o.failure_threshold.unwrap_or(defaults.failure_threshold),
                    reset_timeout: o
                        .reset_timeout_secs
                        .map(Duration::from_secs)
                        .unwrap_or(defaults.reset_timeout),
                };
                policy.with_override(op, options)
            })
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of populated entries, in seconds.
    pub expiry_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { expiry_secs: 3600 }
    }
}

/// Persistent store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Insert the sample products before the listener binds.
    pub seed_sample_data: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}
