use std::fmt;
use std::str::FromStr;

use crate::RowKeyError;

/// The 16 salt symbols, in byte order.
pub static SALT_SYMBOLS: [u8; 16] = *b"0123456789abcdef";

/// How row keys are prefixed to spread sequential dates across regions.
///
/// One value of this type is chosen per deployment and handed to both the
/// write path ([`crate::RowKeyCodec`]) and the scan planner. A write that
/// lands under a prefix the planner never enumerates is silently invisible
/// to every backfill, so the policy must never be derived independently in
/// two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaltingPolicy {
    /// No prefix; keys start with the date bucket.
    Unsalted,
    /// Prefix is `hex(len(unsalted_key) % 16)`.
    ///
    /// Writers compute the salt from the key they are about to write. A scan
    /// cannot know the length of the keys it is looking for, so planners
    /// enumerate all 16 prefixes.
    #[default]
    LengthDerived,
}

impl SaltingPolicy {
    /// The salt byte for an unsalted key, or `None` when unsalted.
    pub fn salt_for(&self, unsalted_key: &[u8]) -> Option<u8> {
        match self {
            SaltingPolicy::Unsalted => None,
            SaltingPolicy::LengthDerived => Some(SALT_SYMBOLS[unsalted_key.len() % 16]),
        }
    }

    /// Every prefix a date-range scan has to visit under this policy.
    pub fn scan_prefixes(&self) -> Vec<&'static [u8]> {
        match self {
            SaltingPolicy::Unsalted => vec![b"".as_slice()],
            SaltingPolicy::LengthDerived => SALT_SYMBOLS.chunks(1).collect(),
        }
    }

    /// Number of distinct prefixes (1 when unsalted).
    pub fn salt_cardinality(&self) -> usize {
        match self {
            SaltingPolicy::Unsalted => 1,
            SaltingPolicy::LengthDerived => SALT_SYMBOLS.len(),
        }
    }

    pub fn is_salted(&self) -> bool {
        !matches!(self, SaltingPolicy::Unsalted)
    }
}

impl FromStr for SaltingPolicy {
    type Err = RowKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "unsalted" => Ok(SaltingPolicy::Unsalted),
            "length" | "length-derived" => Ok(SaltingPolicy::LengthDerived),
            _ => Err(RowKeyError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for SaltingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaltingPolicy::Unsalted => f.write_str("none"),
            SaltingPolicy::LengthDerived => f.write_str("length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_salt_wraps_at_sixteen() {
        let p = SaltingPolicy::LengthDerived;
        assert_eq!(p.salt_for(b""), Some(b'0'));
        assert_eq!(p.salt_for(&[0u8; 10]), Some(b'a'));
        assert_eq!(p.salt_for(&[0u8; 15]), Some(b'f'));
        assert_eq!(p.salt_for(&[0u8; 16]), Some(b'0'));
        assert_eq!(p.salt_for(&[0u8; 33]), Some(b'1'));
    }

    #[test]
    fn unsalted_has_single_empty_prefix() {
        let p = SaltingPolicy::Unsalted;
        assert_eq!(p.salt_for(b"anything"), None);
        assert_eq!(p.scan_prefixes(), vec![&b""[..]]);
        assert_eq!(p.salt_cardinality(), 1);
    }

    #[test]
    fn scan_prefixes_cover_every_written_salt() {
        let p = SaltingPolicy::LengthDerived;
        let prefixes = p.scan_prefixes();
        assert_eq!(prefixes.len(), 16);
        for len in 0..64 {
            let salt = p.salt_for(&vec![b'x'; len]).unwrap();
            assert!(prefixes.contains(&&[salt][..]));
        }
    }

    #[test]
    fn parse_round_trips_through_display() {
        for p in [SaltingPolicy::Unsalted, SaltingPolicy::LengthDerived] {
            assert_eq!(p.to_string().parse::<SaltingPolicy>().unwrap(), p);
        }
        assert!("random".parse::<SaltingPolicy>().is_err());
    }
}
