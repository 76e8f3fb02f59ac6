//! Prometheus metrics for the barrier service.

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

/// Total `EncryptContent` calls.
pub static BARRIER_ENCRYPT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "barrier_encrypt_total",
        "Total number of content encryption operations"
    )
    .expect("Failed to register barrier_encrypt_total metric")
});

/// Total `DecryptContent` calls.
pub static BARRIER_DECRYPT_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "barrier_decrypt_total",
        "Total number of content decryption operations"
    )
    .expect("Failed to register barrier_decrypt_total metric")
});

/// Rotation calls by tier (`root`, `intermediate`, `content`).
pub static BARRIER_ROTATE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "barrier_rotate_total",
        "Total number of barrier rotations by tier",
        &["tier"]
    )
    .expect("Failed to register barrier_rotate_total metric")
});

/// Bootstrap/unseal attempts by outcome (`success`, `mismatch`).
pub static BARRIER_UNSEAL_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "barrier_unseal_total",
        "Total number of unseal attempts by outcome",
        &["outcome"]
    )
    .expect("Failed to register barrier_unseal_total metric")
});
