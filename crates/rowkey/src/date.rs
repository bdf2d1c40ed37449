use chrono::NaiveDate;
use std::fmt;

use crate::RowKeyError;

/// `chrono` format string of a date bucket.
pub const DATE_BUCKET_FORMAT: &str = "%Y%m%d";

/// Width in bytes of every encoded date bucket.
pub const DATE_BUCKET_WIDTH: usize = 8;

/// A calendar day in its fixed-width key form (`yyyyMMdd`).
///
/// Construction validates the date, so a `DateBucket` can always be encoded
/// and always sorts chronologically as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateBucket(NaiveDate);

impl DateBucket {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses a `yyyyMMdd` string.
    pub fn parse(s: &str) -> Result<Self, RowKeyError> {
        if s.len() != DATE_BUCKET_WIDTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RowKeyError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DATE_BUCKET_FORMAT)
            .map(Self)
            .map_err(|_| RowKeyError::InvalidDate(s.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following calendar day, or `None` at the end of chrono's range.
    pub fn next_day(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    /// Encoded key bytes (always [`DATE_BUCKET_WIDTH`] long).
    pub fn encode(&self) -> String {
        self.0.format(DATE_BUCKET_FORMAT).to_string()
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<NaiveDate> for DateBucket {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_encode() {
        let d = DateBucket::parse("20240229").unwrap();
        assert_eq!(d.encode(), "20240229");
        assert_eq!(d.to_string().len(), DATE_BUCKET_WIDTH);
    }

    #[test]
    fn rejects_malformed_dates() {
        for bad in ["", "2024011", "2024-01-01", "20241301", "20230229", "abcdefgh"] {
            assert!(
                matches!(DateBucket::parse(bad), Err(RowKeyError::InvalidDate(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn next_day_crosses_month_and_year() {
        let d = DateBucket::parse("20231231").unwrap();
        assert_eq!(d.next_day().unwrap().encode(), "20240101");
        let d = DateBucket::parse("20240131").unwrap();
        assert_eq!(d.next_day().unwrap().encode(), "20240201");
    }

    #[test]
    fn byte_order_is_chronological() {
        let a = DateBucket::parse("20240109").unwrap().encode();
        let b = DateBucket::parse("20240110").unwrap().encode();
        assert!(a.as_bytes() < b.as_bytes());
    }
}
