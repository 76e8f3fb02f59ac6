//! `UnsealKeyProvider`: reconstitutes the KEK from external input at
//! startup. The core treats the provider as opaque — `spec.md` §6: "the
//! core does not know which variant is in use."

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::BarrierError;

/// A source of the unseal KEK. `GetKEK` is the only operation; the three
/// concrete variants below are deployment choices, not core concerns.
#[async_trait]
pub trait UnsealKeyProvider: Send + Sync {
    /// Derive or reconstruct the 32-byte KEK used to wrap the barrier root.
    async fn get_kek(&self) -> Result<[u8; 32], BarrierError>;
}

/// Derives the KEK from local system identity: hostname, a machine id, and
/// an operator-supplied fingerprint, hashed together. Reproducible across
/// restarts on the same host; not portable across hosts by design.
pub struct SystemDerivedProvider {
    hostname: String,
    machine_id: String,
    fingerprint: String,
}

impl SystemDerivedProvider {
    /// Build a provider from the three identity components directly,
    /// rather than reading them from the OS — keeps this crate free of
    /// platform-specific system calls, which belong to the binary wiring
    /// this provider up.
    #[must_use]
    pub fn new(
        hostname: impl Into<String>,
        machine_id: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            machine_id: machine_id.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

#[async_trait]
impl UnsealKeyProvider for SystemDerivedProvider {
    async fn get_kek(&self) -> Result<[u8; 32], BarrierError> {
        let mut hasher = Sha256::new();
        hasher.update(self.hostname.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.machine_id.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.fingerprint.as_bytes());
        Ok(hasher.finalize().into())
    }
}

/// A static, operator-supplied KEK. Used in development or where the
/// deployment's secret manager already protects the value at rest.
pub struct StaticProvider {
    kek: [u8; 32],
}

impl StaticProvider {
    /// Wrap a pre-derived 32-byte KEK.
    #[must_use]
    pub const fn new(kek: [u8; 32]) -> Self {
        Self { kek }
    }
}

#[async_trait]
impl UnsealKeyProvider for StaticProvider {
    async fn get_kek(&self) -> Result<[u8; 32], BarrierError> {
        Ok(self.kek)
    }
}

/// An M-of-N Shamir-split KEK, combined from operator-supplied shares at
/// startup. Reconstruction is Lagrange interpolation at `x=0` over
/// `GF(2^8)`, applied byte-by-byte across the 32-byte secret — the same
/// construction HashiCorp Vault's unseal mechanism uses.
pub struct ShamirProvider {
    shares: Vec<(u8, [u8; 32])>,
    threshold: usize,
}

impl ShamirProvider {
    /// `shares` are `(x, y_bytes)` pairs; at least `threshold` of them must
    /// be present and consistent for `get_kek` to succeed.
    #[must_use]
    pub fn new(shares: Vec<(u8, [u8; 32])>, threshold: usize) -> Self {
        Self { shares, threshold }
    }
}

#[async_trait]
impl UnsealKeyProvider for ShamirProvider {
    async fn get_kek(&self) -> Result<[u8; 32], BarrierError> {
        if self.shares.len() < self.threshold {
            return Err(BarrierError::Crypto(format!(
                "need {} shares to reconstruct the KEK, have {}",
                self.threshold,
                self.shares.len()
            )));
        }
        let used = &self.shares[..self.threshold];
        let mut secret = [0u8; 32];
        for (byte_index, out) in secret.iter_mut().enumerate() {
            let points: Vec<(u8, u8)> = used.iter().map(|(x, y)| (*x, y[byte_index])).collect();
            *out = gf256_interpolate_at_zero(&points);
        }
        Ok(secret)
    }
}

/// GF(2^8) multiplication using the AES reduction polynomial `0x11B`.
fn gf256_mul(mut a: u8, mut b: u8) -> u8 {
    let mut result = 0u8;
    for _ in 0..8 {
        if b & 1 != 0 {
            result ^= a;
        }
        let high_bit = a & 0x80;
        a <<= 1;
        if high_bit != 0 {
            a ^= 0x1B;
        }
        b >>= 1;
    }
    result
}

fn gf256_inv(a: u8) -> u8 {
    // GF(2^8)* has order 255; a^254 = a^-1 for a != 0.
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp > 0 {
        if exp & 1 != 0 {
            result = gf256_mul(result, base);
        }
        base = gf256_mul(base, base);
        exp >>= 1;
    }
    result
}

/// Lagrange interpolation of `points` evaluated at `x=0`, i.e. the Shamir
/// secret byte.
fn gf256_interpolate_at_zero(points: &[(u8, u8)]) -> u8 {
    let mut result = 0u8;
    for (i, &(xi, yi)) in points.iter().enumerate() {
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, &(xj, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            // term for x=0 is (0 - xj) = xj in GF(2) arithmetic (xor-based).
            numerator = gf256_mul(numerator, xj);
            denominator = gf256_mul(denominator, xi ^ xj);
        }
        let term = gf256_mul(yi, gf256_mul(numerator, gf256_inv(denominator)));
        result ^= term;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_derived_is_deterministic() {
        let a = SystemDerivedProvider::new("host", "machine", "fp");
        let b = SystemDerivedProvider::new("host", "machine", "fp");
        assert_eq!(a.get_kek().await.unwrap(), b.get_kek().await.unwrap());
    }

    #[tokio::test]
    async fn system_derived_differs_on_input_change() {
        let a = SystemDerivedProvider::new("host", "machine", "fp");
        let b = SystemDerivedProvider::new("host", "other-machine", "fp");
        assert_ne!(a.get_kek().await.unwrap(), b.get_kek().await.unwrap());
    }

    #[tokio::test]
    async fn static_provider_returns_fixed_kek() {
        let kek = [9u8; 32];
        let provider = StaticProvider::new(kek);
        assert_eq!(provider.get_kek().await.unwrap(), kek);
    }

    fn split_secret(secret: &[u8; 32], n: u8, threshold: usize) -> Vec<(u8, [u8; 32])> {
        use rand::RngCore;
        let mut rng = rand::thread_rng();
        let mut shares: Vec<(u8, [u8; 32])> = (1..=n).map(|x| (x, [0u8; 32])).collect();
        for byte_index in 0..32 {
            let mut coeffs = vec![secret[byte_index]];
            for _ in 1..threshold {
                let mut buf = [0u8; 1];
                rng.fill_bytes(&mut buf);
                coeffs.push(buf[0]);
            }
            for (x, share) in &mut shares {
                let mut y = 0u8;
                let mut x_pow = 1u8;
                for &coeff in &coeffs {
                    y ^= gf256_mul(coeff, x_pow);
                    x_pow = gf256_mul(x_pow, *x);
                }
                share[byte_index] = y;
            }
        }
        shares
    }

    #[tokio::test]
    async fn shamir_reconstructs_with_threshold_shares() {
        let secret = [42u8; 32];
        let shares = split_secret(&secret, 5, 3);
        let provider = ShamirProvider::new(shares[0..3].to_vec(), 3);
        assert_eq!(provider.get_kek().await.unwrap(), secret);
    }

    #[tokio::test]
    async fn shamir_refuses_below_threshold() {
        let secret = [7u8; 32];
        let shares = split_secret(&secret, 5, 3);
        let provider = ShamirProvider::new(shares[0..2].to_vec(), 3);
        assert!(provider.get_kek().await.is_err());
    }
}
