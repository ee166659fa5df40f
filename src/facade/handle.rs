//! Closed set of façades stored in the instance table.

use super::{AihdrEnhancer, ColorSpaceConverter, DetailEnhancer, Facade, MetadataGenerator};
use std::sync::Arc;

/// A façade shared between the instance table and in-flight C calls.
#[derive(Clone, Debug)]
pub enum VpeHandle {
    /// Color space conversion.
    ColorSpaceConverter(Arc<ColorSpaceConverter>),
    /// HDR metadata generation.
    MetadataGenerator(Arc<MetadataGenerator>),
    /// Detail enhancement.
    DetailEnhancer(Arc<DetailEnhancer>),
    /// AI HDR enhancement.
    AihdrEnhancer(Arc<AihdrEnhancer>),
}

impl VpeHandle {
    /// The color space converter, if this handle holds one.
    pub fn as_color_space_converter(&self) -> Option<&Arc<ColorSpaceConverter>> {
        match self {
            Self::ColorSpaceConverter(facade) => Some(facade),
            _ => None,
        }
    }

    /// The metadata generator, if this handle holds one.
    pub fn as_metadata_generator(&self) -> Option<&Arc<MetadataGenerator>> {
        match self {
            Self::MetadataGenerator(facade) => Some(facade),
            _ => None,
        }
    }

    /// The detail enhancer, if this handle holds one.
    pub fn as_detail_enhancer(&self) -> Option<&Arc<DetailEnhancer>> {
        match self {
            Self::DetailEnhancer(facade) => Some(facade),
            _ => None,
        }
    }

    /// The AI HDR enhancer, if this handle holds one.
    pub fn as_aihdr_enhancer(&self) -> Option<&Arc<AihdrEnhancer>> {
        match self {
            Self::AihdrEnhancer(facade) => Some(facade),
            _ => None,
        }
    }

    fn facade(&self) -> &dyn Facade {
        match self {
            Self::ColorSpaceConverter(facade) => facade.as_ref(),
            Self::MetadataGenerator(facade) => facade.as_ref(),
            Self::DetailEnhancer(facade) => facade.as_ref(),
            Self::AihdrEnhancer(facade) => facade.as_ref(),
        }
    }
}

impl Facade for VpeHandle {
    fn family(&self) -> &'static str {
        self.facade().family()
    }

    fn cached_implementations(&self) -> usize {
        self.facade().cached_implementations()
    }
}

impl From<ColorSpaceConverter> for VpeHandle {
    fn from(facade: ColorSpaceConverter) -> Self {
        Self::ColorSpaceConverter(Arc::new(facade))
    }
}

impl From<MetadataGenerator> for VpeHandle {
    fn from(facade: MetadataGenerator) -> Self {
        Self::MetadataGenerator(Arc::new(facade))
    }
}

impl From<DetailEnhancer> for VpeHandle {
    fn from(facade: DetailEnhancer) -> Self {
        Self::DetailEnhancer(Arc::new(facade))
    }
}

impl From<AihdrEnhancer> for VpeHandle {
    fn from(facade: AihdrEnhancer) -> Self {
        Self::AihdrEnhancer(Arc::new(facade))
    }
}
