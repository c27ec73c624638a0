//! Integration tests for NodeConfig::from_env()
//!
//! These tests verify configuration loading from environment variables.

use offsetlog::cluster::{NodeConfig, StoreBackend};
use offsetlog::error::Error;
use std::env;
use std::sync::Mutex;
use std::time::Duration;

/// Global mutex to serialize all env-based tests.
/// Environment variables are process-global, so we must prevent concurrent access.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// All environment variables read by NodeConfig::from_env().
const ALL_CONFIG_ENV_VARS: &[&str] = &[
    "STORE_BACKEND",
    "STORE_SERVICE",
    "STORE_RPC_TIMEOUT_MS",
    "REQUEST_TIMEOUT_MS",
    "MAX_CONCURRENT_READS",
    "CAS_BACKOFF_MIN_MS",
    "CAS_BACKOFF_MAX_MS",
];

/// Run `f` with exactly `vars` set among the config variables.
///
/// Every config variable is saved, cleared, and restored afterwards.
fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let all_originals: Vec<_> = ALL_CONFIG_ENV_VARS
        .iter()
        .map(|k| (*k, env::var(*k).ok()))
        .collect();

    for key in ALL_CONFIG_ENV_VARS {
        unsafe { env::remove_var(key) };
    }

    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    for (key, original) in all_originals {
        match original {
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
    }

    result
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_from_env_defaults() {
    let config = with_env_vars(&[], || NodeConfig::from_env().unwrap());

    assert_eq!(config.store_backend, StoreBackend::LinKv);
    assert_eq!(config.store_service, "lin-kv");
    assert_eq!(config.store_rpc_timeout, Duration::from_millis(1000));
    assert_eq!(config.request_timeout, Duration::from_millis(5000));
    assert_eq!(config.max_concurrent_reads, 16);
    assert!(config.validate().is_ok());
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn test_from_env_memory_backend() {
    let config = with_env_vars(&[("STORE_BACKEND", "memory")], || {
        NodeConfig::from_env().unwrap()
    });
    assert_eq!(config.store_backend, StoreBackend::Memory);
}

#[test]
fn test_from_env_backend_is_case_insensitive() {
    let config = with_env_vars(&[("STORE_BACKEND", "LIN-KV")], || {
        NodeConfig::from_env().unwrap()
    });
    assert_eq!(config.store_backend, StoreBackend::LinKv);
}

#[test]
fn test_from_env_timeouts_and_limits() {
    let config = with_env_vars(
        &[
            ("STORE_SERVICE", "seq-kv"),
            ("STORE_RPC_TIMEOUT_MS", "250"),
            ("REQUEST_TIMEOUT_MS", "2000"),
            ("MAX_CONCURRENT_READS", "4"),
            ("CAS_BACKOFF_MIN_MS", "2"),
            ("CAS_BACKOFF_MAX_MS", "20"),
        ],
        || NodeConfig::from_env().unwrap(),
    );

    assert_eq!(config.store_service, "seq-kv");
    assert_eq!(config.store_rpc_timeout, Duration::from_millis(250));
    assert_eq!(config.request_timeout, Duration::from_millis(2000));
    assert_eq!(config.max_concurrent_reads, 4);
    assert_eq!(config.cas_backoff_min, Duration::from_millis(2));
    assert_eq!(config.cas_backoff_max, Duration::from_millis(20));
    assert!(config.validate().is_ok());
}

// ============================================================================
// Invalid values
// ============================================================================

#[test]
fn test_from_env_unknown_backend_fails() {
    let result = with_env_vars(&[("STORE_BACKEND", "etcd")], NodeConfig::from_env);
    let err = result.unwrap_err();
    assert!(matches!(&err, Error::Config(msg) if msg.contains("etcd")));
}

#[test]
fn test_from_env_non_numeric_timeout_fails() {
    let result = with_env_vars(&[("REQUEST_TIMEOUT_MS", "soon")], NodeConfig::from_env);
    let err = result.unwrap_err();
    assert!(matches!(&err, Error::Config(msg) if msg.contains("REQUEST_TIMEOUT_MS")));
}

#[test]
fn test_from_env_non_numeric_reads_fails() {
    let result = with_env_vars(&[("MAX_CONCURRENT_READS", "-3")], NodeConfig::from_env);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("MAX_CONCURRENT_READS"));
}

#[test]
fn test_from_env_loads_but_fails_validation() {
    let config = with_env_vars(
        &[
            ("STORE_RPC_TIMEOUT_MS", "3000"),
            ("REQUEST_TIMEOUT_MS", "1000"),
            ("MAX_CONCURRENT_READS", "0"),
        ],
        || NodeConfig::from_env().unwrap(),
    );

    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.contains("request_timeout")));
    assert!(errors.iter().any(|e| e.contains("max_concurrent_reads")));
}
