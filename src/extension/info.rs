//! Extension identity: type tag, name, version and rank.

use std::fmt;

/// Operation family an extension implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ExtensionType {
    /// Color space conversion between two buffers.
    ColorSpaceConverter = 0,
    /// Color space conversion on the display path.
    ColorSpaceConverterDisplay,
    /// HDR metadata generation.
    MetadataGenerator,
    /// Detail enhancement and scaling.
    DetailEnhancer,
    /// AI HDR enhancement.
    AihdrEnhancer,
    /// Contrast enhancement.
    ContrastEnhancer,
    /// Variable refresh rate decision.
    Vrr,
}

impl ExtensionType {
    /// Human-readable family name used in logs and errors.
    pub const fn family_name(&self) -> &'static str {
        match self {
            Self::ColorSpaceConverter => "color space converter",
            Self::ColorSpaceConverterDisplay => "display color space converter",
            Self::MetadataGenerator => "metadata generator",
            Self::DetailEnhancer => "detail enhancer",
            Self::AihdrEnhancer => "aihdr enhancer",
            Self::ContrastEnhancer => "contrast enhancer",
            Self::Vrr => "vrr",
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family_name())
    }
}

/// Self-description of an extension. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExtensionInfo {
    /// Operation family.
    pub extension_type: ExtensionType,
    /// Extension name, unique within a vendor.
    pub name: String,
    /// Extension version string.
    pub version: String,
}

impl ExtensionInfo {
    /// Create extension info.
    pub fn new(
        extension_type: ExtensionType,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            extension_type,
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Coarse priority tier used to break ties between extensions that claim
/// the same capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum Rank {
    /// Ordinary priority.
    #[default]
    Default = 0,
    /// Overrides any `Default` candidate for the same key.
    High = 1,
}
