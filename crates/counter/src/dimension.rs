//! Column families, qualifiers and the [`Dimension`] type that owns their
//! encoding.

pub const FAMILY_PRODUCT: &str = "product";
pub const FAMILY_PRODUCT_VERSION: &str = "product_version";
pub const FAMILY_OS: &str = "os";
pub const FAMILY_SIGNATURE: &str = "signature";
pub const FAMILY_ARCH: &str = "arch";
pub const FAMILY_MODULE: &str = "module";
pub const FAMILY_MODULE_WITH_VERSION: &str = "module_with_version";
pub const FAMILY_ADDON: &str = "addon";
pub const FAMILY_ADDON_WITH_VERSION: &str = "addon_with_version";

/// Families that carry an existence marker under [`QUALIFIER_NAME`].
pub const MARKER_FAMILIES: [&str; 4] = [FAMILY_PRODUCT, FAMILY_PRODUCT_VERSION, FAMILY_OS, FAMILY_SIGNATURE];

/// Qualifier of existence-marker cells.
pub const QUALIFIER_NAME: &str = "name";
/// Qualifier of the scope total (`os:count`, `signature:count`).
pub const QUALIFIER_COUNT: &str = "count";

/// Separates name from version in `*_with_version` qualifiers. Normalized
/// names never contain control characters.
pub const VERSION_DELIMITER: char = '\u{2}';

/// The axis a [`Dimension`] lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimensionKind {
    Arch,
    Module,
    Addon,
}

/// One correlatable value of a crash.
///
/// `Arch` holds the whole architecture description (`"x86 with 4 cores"`).
/// Modules and add-ons carry an optional version; a versioned dimension is
/// stored under the `*_with_version` family, an unversioned one under the
/// plain family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Arch(String),
    Module { name: String, version: Option<String> },
    Addon { name: String, version: Option<String> },
}

fn version_of(version: Option<&str>) -> Option<String> {
    version.filter(|v| !v.is_empty()).map(str::to_string)
}

impl Dimension {
    pub fn arch(arch: impl Into<String>) -> Self {
        Dimension::Arch(arch.into())
    }

    /// A module; an empty version is treated as absent.
    pub fn module(name: impl Into<String>, version: Option<&str>) -> Self {
        Dimension::Module {
            name: name.into(),
            version: version_of(version),
        }
    }

    pub fn addon(name: impl Into<String>, version: Option<&str>) -> Self {
        Dimension::Addon {
            name: name.into(),
            version: version_of(version),
        }
    }

    pub fn kind(&self) -> DimensionKind {
        match self {
            Dimension::Arch(_) => DimensionKind::Arch,
            Dimension::Module { .. } => DimensionKind::Module,
            Dimension::Addon { .. } => DimensionKind::Addon,
        }
    }

    /// Arch description, or module/add-on name.
    pub fn name(&self) -> &str {
        match self {
            Dimension::Arch(arch) => arch,
            Dimension::Module { name, .. } | Dimension::Addon { name, .. } => name,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Dimension::Arch(_) => None,
            Dimension::Module { version, .. } | Dimension::Addon { version, .. } => version.as_deref(),
        }
    }

    /// The same dimension with its version dropped.
    pub fn unversioned(&self) -> Dimension {
        match self {
            Dimension::Arch(arch) => Dimension::Arch(arch.clone()),
            Dimension::Module { name, .. } => Dimension::module(name.clone(), None),
            Dimension::Addon { name, .. } => Dimension::addon(name.clone(), None),
        }
    }

    /// The family a counter for exactly this dimension lives in.
    pub fn family(&self) -> &'static str {
        match self {
            Dimension::Arch(_) => FAMILY_ARCH,
            Dimension::Module { version: Some(_), .. } => FAMILY_MODULE_WITH_VERSION,
            Dimension::Module { version: None, .. } => FAMILY_MODULE,
            Dimension::Addon { version: Some(_), .. } => FAMILY_ADDON_WITH_VERSION,
            Dimension::Addon { version: None, .. } => FAMILY_ADDON,
        }
    }

    /// The per-version family of a module or add-on.
    ///
    /// Every observed module is counted here, including ones whose version
    /// was blank: those get a bare-name qualifier (see [`Dimension::decode`]).
    pub fn with_version_family(&self) -> Option<&'static str> {
        match self.kind() {
            DimensionKind::Arch => None,
            DimensionKind::Module => Some(FAMILY_MODULE_WITH_VERSION),
            DimensionKind::Addon => Some(FAMILY_ADDON_WITH_VERSION),
        }
    }

    /// `name` or `name + U+0002 + version`.
    pub fn qualifier(&self) -> String {
        match self.version() {
            Some(version) => format!("{}{}{}", self.name(), VERSION_DELIMITER, version),
            None => self.name().to_string(),
        }
    }

    /// Recovers a dimension from a counter cell address. Returns `None` for
    /// families that do not hold dimensions (markers, scope totals).
    ///
    /// A `*_with_version` qualifier without a delimiter is a module recorded
    /// with a blank version, so it decodes with `version: None`.
    pub fn decode(family: &str, qualifier: &str) -> Option<Dimension> {
        let split = || match qualifier.split_once(VERSION_DELIMITER) {
            Some((name, version)) => (name, Some(version)),
            None => (qualifier, None),
        };
        match family {
            FAMILY_ARCH => Some(Dimension::arch(qualifier)),
            FAMILY_MODULE => Some(Dimension::module(qualifier, None)),
            FAMILY_ADDON => Some(Dimension::addon(qualifier, None)),
            FAMILY_MODULE_WITH_VERSION => {
                let (name, version) = split();
                Some(Dimension::module(name, version))
            }
            FAMILY_ADDON_WITH_VERSION => {
                let (name, version) = split();
                Some(Dimension::addon(name, version))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.version() {
            Some(v) => write!(f, "{} {}", self.name(), v),
            None => f.write_str(self.name()),
        }
    }
}
