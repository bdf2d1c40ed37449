//! Scope identities, observations and scope read-back.
use std::collections::BTreeMap;

use rowkey::{normalize, product_code, DateBucket};
use serde::{Deserialize, Serialize};

use crate::dimension::{
    Dimension, FAMILY_ADDON_WITH_VERSION, FAMILY_ARCH, FAMILY_MODULE_WITH_VERSION, FAMILY_OS,
    FAMILY_PRODUCT, FAMILY_PRODUCT_VERSION, FAMILY_SIGNATURE, QUALIFIER_COUNT,
};

/// The OS-wide aggregate a crash belongs to: `(date, product, version, os)`.
///
/// Fields hold the human-readable values; keys are derived from them by the
/// codec, and marker cells store them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OsScope {
    pub date: DateBucket,
    pub product: String,
    pub version: String,
    pub os: String,
}

impl OsScope {
    pub fn new(date: DateBucket, product: impl Into<String>, version: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            date,
            product: product.into(),
            version: version.into(),
            os: os.into(),
        }
    }

    /// Marker cells written once under the OS key.
    pub(crate) fn markers(&self) -> Vec<(&'static str, &str)> {
        vec![
            (FAMILY_PRODUCT, self.product.as_str()),
            (FAMILY_PRODUCT_VERSION, self.version.as_str()),
            (FAMILY_OS, self.os.as_str()),
        ]
    }

    /// `true` when `counts` carries markers naming this scope, compared the
    /// way keys are built (aliased product, normalized version and OS).
    pub fn matches_markers(&self, counts: &ScopeCounts) -> bool {
        let product = counts
            .marker(FAMILY_PRODUCT)
            .is_some_and(|p| product_code(p) == product_code(&self.product));
        let version = counts
            .marker(FAMILY_PRODUCT_VERSION)
            .is_some_and(|v| normalize(v) == normalize(&self.version));
        let os = counts
            .marker(FAMILY_OS)
            .is_some_and(|o| normalize(o) == normalize(&self.os));
        product && version && os
    }
}

impl std::fmt::Display for OsScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.date, self.product, self.version, self.os)
    }
}

/// The dimensions observed on one crash.
///
/// This is also the body of `POST /increment-count/...`:
/// `{"arch": "...", "modules": {name: version}, "addons": {name: version}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub arch: String,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    #[serde(default)]
    pub addons: BTreeMap<String, String>,
}

/// Trims and drops control characters. Stored names and versions never hold
/// [`VERSION_DELIMITER`](crate::VERSION_DELIMITER), so qualifiers stay
/// decodable whatever a caller sends.
pub fn clean_value(s: &str) -> String {
    s.trim().chars().filter(|c| !c.is_control()).collect()
}

impl Observation {
    /// The arch description as it is stored.
    pub fn cleaned_arch(&self) -> String {
        clean_value(&self.arch)
    }

    /// Every module and add-on as a versioned [`Dimension`], modules first.
    ///
    /// Names and versions are cleaned with [`clean_value`]; entries whose
    /// name is left empty are dropped.
    pub fn dimensions(&self) -> Vec<Dimension> {
        let cleaned = |items: &BTreeMap<String, String>| -> Vec<(String, String)> {
            items
                .iter()
                .map(|(name, version)| (clean_value(name), clean_value(version)))
                .filter(|(name, _)| !name.is_empty())
                .collect()
        };
        let modules = cleaned(&self.modules)
            .into_iter()
            .map(|(name, version)| Dimension::module(name, Some(version.as_str())));
        let addons = cleaned(&self.addons)
            .into_iter()
            .map(|(name, version)| Dimension::addon(name, Some(version.as_str())));
        modules.chain(addons).collect()
    }
}

/// Every cell of one scope row, split into counters and markers.
///
/// An absent row reads as an empty `ScopeCounts`: all totals are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeCounts {
    /// family → qualifier → count. Marker cells are not included.
    pub counters: BTreeMap<String, BTreeMap<String, u64>>,
    /// family → human-readable value, from the `name` marker cells.
    pub markers: BTreeMap<String, String>,
}

impl ScopeCounts {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.markers.is_empty()
    }

    /// A counter, or 0 when absent.
    pub fn count(&self, family: &str, qualifier: &str) -> u64 {
        self.counters
            .get(family)
            .and_then(|q| q.get(qualifier))
            .copied()
            .unwrap_or(0)
    }

    pub fn marker(&self, family: &str) -> Option<&str> {
        self.markers.get(family).map(String::as_str)
    }

    /// `os:count`.
    pub fn os_total(&self) -> u64 {
        self.count(FAMILY_OS, QUALIFIER_COUNT)
    }

    /// `signature:count`.
    pub fn signature_total(&self) -> u64 {
        self.count(FAMILY_SIGNATURE, QUALIFIER_COUNT)
    }

    /// Human-readable signature stored in the marker, if any.
    pub fn signature_name(&self) -> Option<&str> {
        self.marker(FAMILY_SIGNATURE)
    }

    /// Count of one dimension, 0 when the scope never saw it. An unversioned
    /// module or add-on reads its name-only counter, which covers every
    /// version.
    pub fn dimension_count(&self, dimension: &Dimension) -> u64 {
        self.count(dimension.family(), &dimension.qualifier())
    }

    /// Arch, per-version module and per-version add-on counters, in family
    /// then qualifier order.
    pub fn dimensions(&self) -> Vec<(Dimension, u64)> {
        [FAMILY_ARCH, FAMILY_MODULE_WITH_VERSION, FAMILY_ADDON_WITH_VERSION]
            .iter()
            .filter_map(|family| self.counters.get(*family).map(|q| (*family, q)))
            .flat_map(|(family, qualifiers)| {
                qualifiers
                    .iter()
                    .filter_map(move |(qualifier, count)| Dimension::decode(family, qualifier).map(|d| (d, *count)))
            })
            .collect()
    }
}
