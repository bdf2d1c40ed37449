//! # RowKey - composite, optionally salted row keys
//!
//! Every row in the counting table (and in the crash-report source table) is
//! addressed by a composite key built here. Keeping construction in one place
//! is what lets the write path and the scan planner agree on where data lives.
//!
//! ## Layout
//!
//! ```text
//! [salt?][dateBucket][productCode][version][os][signature?]
//!    1        8          2..n        ...    ...     ...
//! ```
//!
//! - `salt`: one lowercase hex character, present only when the
//!   [`SaltingPolicy`] salts keys.
//! - `dateBucket`: `yyyyMMdd`, always 8 bytes (see [`DateBucket`]).
//! - `productCode`: the product name mapped through [`product_code`].
//! - `version`, `os`, `signature`: [`normalize`]d, so punctuation, whitespace
//!   and control characters are removed.
//!
//! OS-scoped keys stop after `os`; signature-scoped keys append the
//! normalized signature. Keys are opaque: nothing parses them back. The
//! human-readable values live in marker cells written next to the counters.
//!
//! ## Example
//!
//! ```rust
//! use rowkey::{DateBucket, RowKeyCodec, SaltingPolicy};
//!
//! let codec = RowKeyCodec::new(SaltingPolicy::Unsalted);
//! let date = DateBucket::parse("20240101").unwrap();
//! let key = codec.os_key(&date, "Firefox", "1.0", "Windows NT");
//! assert_eq!(key, b"20240101FF10WindowsNT".to_vec());
//! ```

mod codec;
mod date;
mod salt;

pub use codec::{normalize, prefix_end, product_code, RowKeyCodec, PRODUCT_ALIASES};
pub use date::{DateBucket, DATE_BUCKET_FORMAT, DATE_BUCKET_WIDTH};
pub use salt::{SaltingPolicy, SALT_SYMBOLS};

use thiserror::Error;

/// Errors raised while building keys from caller input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowKeyError {
    /// The date string is not a valid `yyyyMMdd` calendar date.
    #[error("invalid date bucket '{0}' (expected yyyyMMdd)")]
    InvalidDate(String),

    /// The salting policy name is not recognised.
    #[error("unknown salting policy '{0}' (expected 'length' or 'none')")]
    UnknownPolicy(String),
}
