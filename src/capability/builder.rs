//! Per-family capability map builders.

use super::key::{ConversionKey, MetadataGenerationKey};
use super::map::{Candidate, CapabilityMap, LevelMap};
use super::Capability;
use crate::extension::{
    ContrastEnhancerType, DetailEnhancerLevel, ExtensionKind, ExtensionList, ExtensionType,
};
use crate::format::PixelFormat;

/// Walk `list` and feed one candidate per advertised key into `insert`.
///
/// Only descriptors tagged `extension_type` are visited. `capabilities`
/// extracts the family payload; a descriptor whose payload does not match
/// its tag is skipped.
fn collect<C, F, I>(
    list: &ExtensionList,
    extension_type: ExtensionType,
    capabilities: F,
    mut insert: I,
) where
    C: Capability,
    F: Fn(&ExtensionKind) -> Option<Vec<C>>,
    I: FnMut(C::Key, Candidate),
{
    for (index, descriptor) in list.iter().enumerate() {
        if descriptor.info.extension_type != extension_type {
            continue;
        }
        let Some(declared) = capabilities(&descriptor.kind) else {
            tracing::warn!(
                "extension '{}' is tagged {} but carries a different payload, skipping",
                descriptor.info.name,
                extension_type
            );
            continue;
        };
        for capability in declared {
            let candidate = Candidate::new(capability.rank(), capability.version(), index);
            for key in capability.keys() {
                insert(key, candidate);
            }
        }
    }
}

/// Build the conversion map for `extension_type`.
///
/// Serves [`ExtensionType::ColorSpaceConverter`] and
/// [`ExtensionType::ColorSpaceConverterDisplay`], and the compose/decompose
/// lists, which carry converter-tagged descriptors.
pub fn build_color_space_converter_map(
    list: &ExtensionList,
    extension_type: ExtensionType,
) -> CapabilityMap<ConversionKey> {
    let mut map = CapabilityMap::new();
    collect(
        list,
        extension_type,
        |kind| match kind {
            ExtensionKind::ColorSpaceConverter(ext) => Some(ext.capabilities()),
            _ => None,
        },
        |key, candidate| map.insert(key, candidate),
    );
    map
}

/// Build the metadata generation map.
pub fn build_metadata_generator_map(list: &ExtensionList) -> CapabilityMap<MetadataGenerationKey> {
    let mut map = CapabilityMap::new();
    collect(
        list,
        ExtensionType::MetadataGenerator,
        |kind| match kind {
            ExtensionKind::MetadataGenerator(ext) => Some(ext.capabilities()),
            _ => None,
        },
        |key, candidate| map.insert(key, candidate),
    );
    map
}

/// Build the detail enhancer level map.
pub fn build_detail_enhancer_map(list: &ExtensionList) -> LevelMap<DetailEnhancerLevel> {
    let mut map = LevelMap::new();
    collect(
        list,
        ExtensionType::DetailEnhancer,
        |kind| match kind {
            ExtensionKind::DetailEnhancer(ext) => Some(ext.capabilities()),
            _ => None,
        },
        |key, candidate| map.insert(key, candidate),
    );
    map
}

/// Build the AI HDR enhancer map, keyed by input pixel format.
pub fn build_aihdr_enhancer_map(list: &ExtensionList) -> CapabilityMap<PixelFormat> {
    let mut map = CapabilityMap::new();
    collect(
        list,
        ExtensionType::AihdrEnhancer,
        |kind| match kind {
            ExtensionKind::AihdrEnhancer(ext) => Some(ext.capabilities()),
            _ => None,
        },
        |key, candidate| map.insert(key, candidate),
    );
    map
}

/// Build the contrast enhancer map, keyed by algorithm type.
pub fn build_contrast_enhancer_map(list: &ExtensionList) -> CapabilityMap<ContrastEnhancerType> {
    let mut map = CapabilityMap::new();
    collect(
        list,
        ExtensionType::ContrastEnhancer,
        |kind| match kind {
            ExtensionKind::ContrastEnhancer(ext) => Some(ext.capabilities()),
            _ => None,
        },
        |key, candidate| map.insert(key, candidate),
    );
    map
}

/// Build the VRR map. VRR has a single unit key.
pub fn build_vrr_map(list: &ExtensionList) -> CapabilityMap<()> {
    let mut map = CapabilityMap::new();
    collect(
        list,
        ExtensionType::Vrr,
        |kind| match kind {
            ExtensionKind::Vrr(ext) => Some(ext.capabilities()),
            _ => None,
        },
        |key, candidate| map.insert(key, candidate),
    );
    map
}
