//! `Config::from_env()`: the validated, process-wide configuration struct,
//! grounded on `token-service::config::Config` — `dotenvy` loads an optional
//! `.env` file, then every setting is read from the process environment with
//! a typed default, failing fast on anything malformed rather than limping
//! on with a half-parsed value.

use std::net::IpAddr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};

/// Which [`barrier::UnsealKeyProvider`] to construct at startup.
#[derive(Debug, Clone)]
pub enum UnsealMode {
    /// Derive the KEK from local system identity.
    System,
    /// Reconstruct the KEK from M-of-N Shamir shares.
    Shamir {
        /// `(x, y_bytes)` pairs decoded from `UNSEAL_SHAMIR_SHARES`.
        shares: Vec<(u8, [u8; 32])>,
        /// Minimum number of shares required to reconstruct.
        threshold: usize,
    },
    /// A fixed, operator-supplied KEK.
    Static {
        /// The 32-byte KEK decoded from `UNSEAL_STATIC_KEK`.
        kek: [u8; 32],
    },
}

/// The storage backend the core persists through. Only `Memory` is
/// implemented; `Postgres` exists as a named, rejected choice so the
/// configuration surface matches the trait boundary described in
/// `store::traits`, per `spec.md` §4.5+.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// The in-process `InMemoryStore`.
    Memory,
    /// Not implemented; selecting this at startup is a fatal configuration
    /// error.
    Postgres,
}

/// Human-readable or JSON log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, for production.
    Json,
    /// ANSI pretty-printed, for local development.
    Pretty,
}

/// The fully validated process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
    /// How the barrier's unseal KEK is obtained.
    pub unseal_mode: UnsealMode,
    /// Absolute session lifetime.
    pub session_access_ttl: chrono::Duration,
    /// Idle-expiry sliding window.
    pub session_idle_ttl: chrono::Duration,
    /// How often the cleanup sweep runs.
    pub session_cleanup_interval: Duration,
    /// Grace period past expiry/revocation before cleanup deletes a row.
    pub session_grace: chrono::Duration,
    /// The persistence backend to construct.
    pub store_backend: StoreBackend,
    /// Log output format.
    pub log_format: LogFormat,
}

/// Failure to load or validate configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable was present but could not be parsed.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// The offending variable's name.
        var: &'static str,
        /// Why parsing failed.
        reason: String,
    },
    /// A required variable was missing for the selected mode.
    #[error("{var} is required when UNSEAL_MODE={mode}")]
    MissingForMode {
        /// The missing variable's name.
        var: &'static str,
        /// The mode that requires it.
        mode: &'static str,
    },
    /// `STORE_BACKEND=postgres` was selected; the postgres backend is not
    /// implemented by this core.
    #[error("STORE_BACKEND=postgres is not implemented; database driver selection is out of scope")]
    PostgresUnsupported,
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parse_secs(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::Invalid { var, reason: format!("{e}") }),
    }
}

fn decode_kek(var: &'static str, raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = STANDARD
        .decode(raw)
        .map_err(|e| ConfigError::Invalid { var, reason: format!("not valid base64: {e}") })?;
    bytes
        .try_into()
        .map_err(|_| ConfigError::Invalid { var, reason: "must decode to exactly 32 bytes".to_string() })
}

fn parse_shamir_shares(raw: &str) -> Result<Vec<(u8, [u8; 32])>, ConfigError> {
    raw.split(',')
        .map(|entry| {
            let (x, y) = entry.split_once(':').ok_or_else(|| ConfigError::Invalid {
                var: "UNSEAL_SHAMIR_SHARES",
                reason: format!("share '{entry}' is not in 'x:base64y' form"),
            })?;
            let x: u8 = x
                .parse()
                .map_err(|e| ConfigError::Invalid { var: "UNSEAL_SHAMIR_SHARES", reason: format!("{e}") })?;
            let y = decode_kek("UNSEAL_SHAMIR_SHARES", y)?;
            Ok((x, y))
        })
        .collect()
}

impl Config {
    /// Load an optional `.env` file, then read and validate every setting
    /// from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host: IpAddr = env_or("HOST", "0.0.0.0")
            .parse()
            .map_err(|e| ConfigError::Invalid { var: "HOST", reason: format!("{e}") })?;
        let port: u16 = env_or("PORT", "8080")
            .parse()
            .map_err(|e| ConfigError::Invalid { var: "PORT", reason: format!("{e}") })?;

        let unseal_mode = match env_or("UNSEAL_MODE", "system").as_str() {
            "system" => UnsealMode::System,
            "static" => {
                let raw = std::env::var("UNSEAL_STATIC_KEK").map_err(|_| ConfigError::MissingForMode {
                    var: "UNSEAL_STATIC_KEK",
                    mode: "static",
                })?;
                UnsealMode::Static { kek: decode_kek("UNSEAL_STATIC_KEK", &raw)? }
            }
            "shamir" => {
                let raw = std::env::var("UNSEAL_SHAMIR_SHARES").map_err(|_| ConfigError::MissingForMode {
                    var: "UNSEAL_SHAMIR_SHARES",
                    mode: "shamir",
                })?;
                let shares = parse_shamir_shares(&raw)?;
                let threshold: usize = env_or("UNSEAL_SHAMIR_THRESHOLD", "0")
                    .parse()
                    .map_err(|e| ConfigError::Invalid { var: "UNSEAL_SHAMIR_THRESHOLD", reason: format!("{e}") })?;
                if threshold == 0 {
                    return Err(ConfigError::MissingForMode { var: "UNSEAL_SHAMIR_THRESHOLD", mode: "shamir" });
                }
                UnsealMode::Shamir { shares, threshold }
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "UNSEAL_MODE",
                    reason: format!("unknown mode '{other}', expected system|shamir|static"),
                })
            }
        };

        let store_backend = match env_or("STORE_BACKEND", "memory").as_str() {
            "memory" => StoreBackend::Memory,
            "postgres" => return Err(ConfigError::PostgresUnsupported),
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    reason: format!("unknown backend '{other}', expected memory|postgres"),
                })
            }
        };

        let log_format = match env_or("LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("unknown format '{other}', expected json|pretty"),
                })
            }
        };

        Ok(Self {
            host,
            port,
            unseal_mode,
            session_access_ttl: chrono::Duration::seconds(parse_secs("SESSION_ACCESS_TTL_SECS", 900)?),
            session_idle_ttl: chrono::Duration::seconds(parse_secs("SESSION_IDLE_TTL_SECS", 300)?),
            session_cleanup_interval: Duration::from_secs(
                parse_secs("SESSION_CLEANUP_INTERVAL_SECS", 60)?.max(1) as u64,
            ),
            session_grace: chrono::Duration::seconds(parse_secs("SESSION_GRACE_SECS", 30)?),
            store_backend,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_valid_static_kek() {
        let encoded = STANDARD.encode([9u8; 32]);
        assert_eq!(decode_kek("UNSEAL_STATIC_KEK", &encoded).unwrap(), [9u8; 32]);
    }

    #[test]
    fn rejects_wrong_length_kek() {
        let encoded = STANDARD.encode([9u8; 16]);
        assert!(decode_kek("UNSEAL_STATIC_KEK", &encoded).is_err());
    }

    #[test]
    fn parses_shamir_share_list() {
        let y = STANDARD.encode([1u8; 32]);
        let raw = format!("1:{y},2:{y}");
        let shares = parse_shamir_shares(&raw).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].0, 1);
    }
}
