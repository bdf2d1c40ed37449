//! # Counter - hierarchical crash counters
//!
//! Turns one observed crash into atomic increments under two scope rows, the
//! OS scope and the signature scope, and reads those rows back.
//!
//! ```text
//! (scope, signature, Observation)
//!   |
//!   v
//! ┌──────────────────────────────────────────────────┐
//! │ aggregator.rs                                    │
//! │   markers once per new key (check-then-write)    │
//! │   os:count, arch[..], module[..], module_wv[..]  │
//! │   signature:count, arch[..], ...                 │
//! └──────────────────────────────────────────────────┘
//!   |
//!   v
//! CellStore (table crate)
//! ```
//!
//! | Module        | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | [`dimension`] | families, qualifiers, `Dimension`                |
//! | [`scope`]     | `OsScope`, `Observation`, `ScopeCounts`          |
//! | [`aggregator`]| `CounterAggregator`: record, increment, read     |
mod aggregator;
mod dimension;
mod scope;

use table::StoreError;
use thiserror::Error;

pub use aggregator::{CounterAggregator, RecordOutcome, SignatureScope};
pub use dimension::{
    Dimension, DimensionKind, FAMILY_ADDON, FAMILY_ADDON_WITH_VERSION, FAMILY_ARCH, FAMILY_MODULE,
    FAMILY_MODULE_WITH_VERSION, FAMILY_OS, FAMILY_PRODUCT, FAMILY_PRODUCT_VERSION,
    FAMILY_SIGNATURE, MARKER_FAMILIES, QUALIFIER_COUNT, QUALIFIER_NAME, VERSION_DELIMITER,
};
pub use scope::{clean_value, Observation, OsScope, ScopeCounts};

/// Errors raised while recording or reading counters.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The signature normalizes to nothing, so its key would collide with
    /// the OS key.
    #[error("signature {0:?} is empty after normalization")]
    EmptySignature(String),

    /// Two scopes map to one row key (an OS name that runs into the
    /// signature, like `Win` + `NT` and `WinNT`). Nothing is written.
    #[error("row {key:?} belongs to [{stored}], not [{requested}]")]
    ScopeCollision {
        key: String,
        stored: String,
        requested: String,
    },

    /// A counter cell that does not hold an 8-byte value.
    #[error("cell {family}:{qualifier} holds {len} bytes, not a counter")]
    MalformedCounter {
        family: String,
        qualifier: String,
        len: usize,
    },
}

impl CounterError {
    /// `true` when the underlying store failure may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, CounterError::Store(e) if e.is_transient())
    }
}

#[cfg(test)]
mod tests;
