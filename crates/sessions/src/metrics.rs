//! Prometheus metrics for session issuance, validation, and cleanup.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

/// Sessions issued, by `kind` (`browser`, `service`).
pub static SESSIONS_ISSUED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sessions_issued_total",
        "Total number of sessions issued by kind",
        &["kind"]
    )
    .expect("Failed to register sessions_issued_total metric")
});

/// Validation attempts, by outcome (`ok`, `invalid`, `revoked`, `expired`,
/// `idle`, `key_unavailable`).
pub static SESSIONS_VALIDATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sessions_validated_total",
        "Total number of session validation attempts by outcome",
        &["outcome"]
    )
    .expect("Failed to register sessions_validated_total metric")
});

/// Total explicit `Revoke` calls.
pub static SESSIONS_REVOKED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "sessions_revoked_total",
        "Total number of sessions explicitly revoked"
    )
    .expect("Failed to register sessions_revoked_total metric")
});
