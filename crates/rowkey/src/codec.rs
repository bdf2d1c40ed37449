use std::borrow::Cow;

use crate::{DateBucket, SaltingPolicy};

/// Full product name to the two-letter code used inside keys.
pub const PRODUCT_ALIASES: &[(&str, &str)] = &[
    ("Firefox", "FF"),
    ("Thunderbird", "TB"),
    ("SeaMonkey", "SM"),
    ("Camino", "CM"),
];

/// Maps a product name through [`PRODUCT_ALIASES`]; unknown names pass through.
pub fn product_code(product: &str) -> Cow<'_, str> {
    PRODUCT_ALIASES
        .iter()
        .find(|(name, _)| *name == product)
        .map(|(_, code)| Cow::Borrowed(*code))
        .unwrap_or(Cow::Borrowed(product))
}

/// Strips ASCII punctuation, whitespace and control characters.
///
/// The control range covers the `\u{1}`..`\u{4}` bytes used as structural
/// delimiters in qualifiers, so a normalized value can never contain one.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !(c.is_ascii_punctuation() || c.is_whitespace() || c.is_control()))
        .collect()
}

/// Builds row keys under one [`SaltingPolicy`].
///
/// The codec is `Copy` and cheap; hand the same value to everything that
/// writes or plans scans for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowKeyCodec {
    policy: SaltingPolicy,
}

impl RowKeyCodec {
    pub fn new(policy: SaltingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SaltingPolicy {
        self.policy
    }

    /// `[dateBucket][productCode][version][os][signature?]`, without salt.
    pub fn unsalted_key(
        &self,
        date: &DateBucket,
        product: &str,
        version: &str,
        os: &str,
        signature: Option<&str>,
    ) -> Vec<u8> {
        let mut key = Vec::with_capacity(64);
        key.extend_from_slice(date.encode().as_bytes());
        key.extend_from_slice(product_code(product).as_bytes());
        key.extend_from_slice(normalize(version).as_bytes());
        key.extend_from_slice(normalize(os).as_bytes());
        if let Some(sig) = signature {
            key.extend_from_slice(normalize(sig).as_bytes());
        }
        key
    }

    /// Salts `unsalted` according to the policy.
    pub fn salt(&self, unsalted: Vec<u8>) -> Vec<u8> {
        match self.policy.salt_for(&unsalted) {
            Some(salt) => {
                let mut key = Vec::with_capacity(unsalted.len() + 1);
                key.push(salt);
                key.extend_from_slice(&unsalted);
                key
            }
            None => unsalted,
        }
    }

    /// Encodes a scope key: OS-scoped when `signature` is `None`,
    /// signature-scoped otherwise.
    pub fn encode(
        &self,
        date: &DateBucket,
        product: &str,
        version: &str,
        os: &str,
        signature: Option<&str>,
    ) -> Vec<u8> {
        self.salt(self.unsalted_key(date, product, version, os, signature))
    }

    pub fn os_key(&self, date: &DateBucket, product: &str, version: &str, os: &str) -> Vec<u8> {
        self.encode(date, product, version, os, None)
    }

    pub fn signature_key(
        &self,
        date: &DateBucket,
        product: &str,
        version: &str,
        os: &str,
        signature: &str,
    ) -> Vec<u8> {
        self.encode(date, product, version, os, Some(signature))
    }

    /// Row prefixes under which every signature row of one OS scope can live.
    ///
    /// With a length-derived salt each signature row carries its own salt, so
    /// this is one prefix per salt symbol. Rows found under these prefixes
    /// still need their markers checked: an OS name that is a prefix of
    /// another ("Win" / "WinNT") shares the byte prefix.
    pub fn signature_prefixes(
        &self,
        date: &DateBucket,
        product: &str,
        version: &str,
        os: &str,
    ) -> Vec<Vec<u8>> {
        let unsalted = self.unsalted_key(date, product, version, os, None);
        self.policy
            .scan_prefixes()
            .into_iter()
            .map(|salt| {
                let mut prefix = salt.to_vec();
                prefix.extend_from_slice(&unsalted);
                prefix
            })
            .collect()
    }

    /// Key of a raw crash report in the source table: `[salt?][dateBucket][crashId]`.
    pub fn report_key(&self, date: &DateBucket, crash_id: &str) -> Vec<u8> {
        let mut key = date.encode().into_bytes();
        key.extend_from_slice(crash_id.as_bytes());
        self.salt(key)
    }
}

/// Smallest key strictly greater than every key starting with `prefix`, or
/// empty (unbounded) when the prefix is all `0xff`.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return end;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> DateBucket {
        DateBucket::parse("20240101").unwrap()
    }

    #[test]
    fn product_alias_applies_to_known_names_only() {
        assert_eq!(product_code("Firefox"), "FF");
        assert_eq!(product_code("Camino"), "CM");
        assert_eq!(product_code("Fennec"), "Fennec");
    }

    #[test]
    fn normalize_strips_punctuation_whitespace_and_delimiters() {
        assert_eq!(normalize("Windows NT"), "WindowsNT");
        assert_eq!(normalize("3.6.13pre"), "3613pre");
        assert_eq!(normalize("nsFoo::Bar(int) | EXCEPTION"), "nsFooBarintEXCEPTION");
        assert_eq!(normalize("a\u{1}b\u{2}c\u{3}d\u{4}"), "abcd");
    }

    #[test]
    fn unsalted_os_and_signature_keys() {
        let codec = RowKeyCodec::new(SaltingPolicy::Unsalted);
        assert_eq!(
            codec.os_key(&day(), "Firefox", "v1", "WinNT"),
            b"20240101FFv1WinNT".to_vec()
        );
        assert_eq!(
            codec.signature_key(&day(), "Firefox", "v1", "WinNT", "js::Foo|crash"),
            b"20240101FFv1WinNTjsFoocrash".to_vec()
        );
    }

    #[test]
    fn length_salt_prefixes_key() {
        let codec = RowKeyCodec::new(SaltingPolicy::LengthDerived);
        let unsalted = b"20240101FFv1WinNT";
        let key = codec.os_key(&day(), "Firefox", "v1", "WinNT");
        assert_eq!(key[0], SaltingPolicy::LengthDerived.salt_for(unsalted).unwrap());
        assert_eq!(&key[1..], unsalted);
        // 17 bytes -> 17 % 16 == 1
        assert_eq!(key[0], b'1');
    }

    #[test]
    fn os_and_signature_scopes_differ() {
        for policy in [SaltingPolicy::Unsalted, SaltingPolicy::LengthDerived] {
            let codec = RowKeyCodec::new(policy);
            let os = codec.os_key(&day(), "Firefox", "4.0", "Linux");
            let sig = codec.signature_key(&day(), "Firefox", "4.0", "Linux", "abort");
            assert_ne!(os, sig);
        }
    }

    #[test]
    fn signature_rows_fall_under_a_signature_prefix() {
        let codec = RowKeyCodec::new(SaltingPolicy::LengthDerived);
        let prefixes = codec.signature_prefixes(&day(), "Firefox", "4.0", "Linux");
        assert_eq!(prefixes.len(), 16);
        for sig in ["a", "abc", "a much longer signature text", "x::y"] {
            let key = codec.signature_key(&day(), "Firefox", "4.0", "Linux", sig);
            assert!(prefixes.iter().any(|p| key.starts_with(p)), "{sig}");
        }
    }

    #[test]
    fn report_key_uses_same_policy() {
        let codec = RowKeyCodec::new(SaltingPolicy::LengthDerived);
        let key = codec.report_key(&day(), "abc123");
        assert_eq!(&key[1..], b"20240101abc123");
        assert_eq!(key[0], b'e'); // 14 bytes
    }

    #[test]
    fn prefix_end_bounds_prefix() {
        assert_eq!(prefix_end(b"ab"), b"ac".to_vec());
        assert_eq!(prefix_end(&[b'a', 0xff]), b"b".to_vec());
        assert!(prefix_end(&[0xff, 0xff]).is_empty());
    }
}
