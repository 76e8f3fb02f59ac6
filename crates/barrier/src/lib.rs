//! The three-tier key-encryption-key barrier: root, intermediate, and
//! content keys, with an atomically-swapped active content key and a
//! bounded cache of unwrapped retired keys.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod metrics;
pub mod service;
pub mod snapshot;
pub mod unseal;

pub use error::BarrierError;
pub use format::{parse, serialize, SealedEnvelope};
pub use service::BarrierService;
pub use snapshot::{ActiveContentKey, ContentKeyMaterial, RetiredKeyCache};
pub use unseal::{ShamirProvider, StaticProvider, SystemDerivedProvider, UnsealKeyProvider};
