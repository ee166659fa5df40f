//! Extension descriptors and the extension list they are collected into.

use super::algorithm::{
    AihdrEnhancerAlgorithm, ColorSpaceConverterAlgorithm, ContrastEnhancerAlgorithm,
    DetailEnhancerAlgorithm, MetadataGeneratorAlgorithm, VrrAlgorithm,
};
use super::info::{ExtensionInfo, ExtensionType};
use crate::capability::{
    AihdrEnhancerCapability, ColorSpaceConverterCapability, ContrastEnhancerCapability,
    DetailEnhancerCapability, MetadataGeneratorCapability, VrrCapability,
};
use std::fmt;
use std::sync::Arc;

/// Zero-argument factory returning a fresh algorithm object, or `None` if
/// the extension cannot create one.
pub type Creator<A> = Arc<dyn Fn() -> Option<Arc<A>> + Send + Sync>;

/// Zero-argument builder describing everything an extension can do.
pub type CapabilitiesBuilder<C> = Arc<dyn Fn() -> Vec<C> + Send + Sync>;

/// Creator and capability builder of one extension.
pub struct FamilyExtension<A: ?Sized, C> {
    /// Algorithm factory.
    pub creator: Creator<A>,
    /// Capability builder.
    pub capabilities_builder: CapabilitiesBuilder<C>,
}

impl<A: ?Sized, C> FamilyExtension<A, C> {
    /// Create from a factory and a capability builder.
    pub fn new(
        creator: impl Fn() -> Option<Arc<A>> + Send + Sync + 'static,
        capabilities_builder: impl Fn() -> Vec<C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            creator: Arc::new(creator),
            capabilities_builder: Arc::new(capabilities_builder),
        }
    }

    /// Run the factory.
    pub fn create(&self) -> Option<Arc<A>> {
        (self.creator)()
    }

    /// Run the capability builder.
    pub fn capabilities(&self) -> Vec<C> {
        (self.capabilities_builder)()
    }
}

impl<A: ?Sized, C> Clone for FamilyExtension<A, C> {
    fn clone(&self) -> Self {
        Self {
            creator: Arc::clone(&self.creator),
            capabilities_builder: Arc::clone(&self.capabilities_builder),
        }
    }
}

/// Color space converter extension (also used for display, compose and
/// decompose).
pub type ColorSpaceConverterExtension =
    FamilyExtension<dyn ColorSpaceConverterAlgorithm, ColorSpaceConverterCapability>;
/// Metadata generator extension.
pub type MetadataGeneratorExtension =
    FamilyExtension<dyn MetadataGeneratorAlgorithm, MetadataGeneratorCapability>;
/// Detail enhancer extension.
pub type DetailEnhancerExtension =
    FamilyExtension<dyn DetailEnhancerAlgorithm, DetailEnhancerCapability>;
/// AI HDR enhancer extension.
pub type AihdrEnhancerExtension =
    FamilyExtension<dyn AihdrEnhancerAlgorithm, AihdrEnhancerCapability>;
/// Contrast enhancer extension.
pub type ContrastEnhancerExtension =
    FamilyExtension<dyn ContrastEnhancerAlgorithm, ContrastEnhancerCapability>;
/// VRR extension.
pub type VrrExtension = FamilyExtension<dyn VrrAlgorithm, VrrCapability>;

/// Family-specific payload of a descriptor.
#[derive(Clone)]
pub enum ExtensionKind {
    /// Color space converter (any converter-shaped family).
    ColorSpaceConverter(ColorSpaceConverterExtension),
    /// Metadata generator.
    MetadataGenerator(MetadataGeneratorExtension),
    /// Detail enhancer.
    DetailEnhancer(DetailEnhancerExtension),
    /// AI HDR enhancer.
    AihdrEnhancer(AihdrEnhancerExtension),
    /// Contrast enhancer.
    ContrastEnhancer(ContrastEnhancerExtension),
    /// VRR.
    Vrr(VrrExtension),
}

impl ExtensionKind {
    fn name(&self) -> &'static str {
        match self {
            Self::ColorSpaceConverter(_) => "ColorSpaceConverter",
            Self::MetadataGenerator(_) => "MetadataGenerator",
            Self::DetailEnhancer(_) => "DetailEnhancer",
            Self::AihdrEnhancer(_) => "AihdrEnhancer",
            Self::ContrastEnhancer(_) => "ContrastEnhancer",
            Self::Vrr(_) => "Vrr",
        }
    }
}

/// A plugin's self-description.
#[derive(Clone)]
pub struct ExtensionDescriptor {
    /// Type tag, name and version.
    pub info: ExtensionInfo,
    /// Creator and capability builder.
    pub kind: ExtensionKind,
}

impl ExtensionDescriptor {
    fn with_kind(
        extension_type: ExtensionType,
        name: impl Into<String>,
        version: impl Into<String>,
        kind: ExtensionKind,
    ) -> Self {
        Self {
            info: ExtensionInfo::new(extension_type, name, version),
            kind,
        }
    }

    /// Describe a color space converter.
    pub fn color_space_converter(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: ColorSpaceConverterExtension,
    ) -> Self {
        Self::with_kind(
            ExtensionType::ColorSpaceConverter,
            name,
            version,
            ExtensionKind::ColorSpaceConverter(extension),
        )
    }

    /// Describe a display-path color space converter.
    pub fn color_space_converter_display(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: ColorSpaceConverterExtension,
    ) -> Self {
        Self::with_kind(
            ExtensionType::ColorSpaceConverterDisplay,
            name,
            version,
            ExtensionKind::ColorSpaceConverter(extension),
        )
    }

    /// Describe a metadata generator.
    pub fn metadata_generator(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: MetadataGeneratorExtension,
    ) -> Self {
        Self::with_kind(
            ExtensionType::MetadataGenerator,
            name,
            version,
            ExtensionKind::MetadataGenerator(extension),
        )
    }

    /// Describe a detail enhancer.
    pub fn detail_enhancer(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: DetailEnhancerExtension,
    ) -> Self {
        Self::with_kind(
            ExtensionType::DetailEnhancer,
            name,
            version,
            ExtensionKind::DetailEnhancer(extension),
        )
    }

    /// Describe an AI HDR enhancer.
    pub fn aihdr_enhancer(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: AihdrEnhancerExtension,
    ) -> Self {
        Self::with_kind(
            ExtensionType::AihdrEnhancer,
            name,
            version,
            ExtensionKind::AihdrEnhancer(extension),
        )
    }

    /// Describe a contrast enhancer.
    pub fn contrast_enhancer(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: ContrastEnhancerExtension,
    ) -> Self {
        Self::with_kind(
            ExtensionType::ContrastEnhancer,
            name,
            version,
            ExtensionKind::ContrastEnhancer(extension),
        )
    }

    /// Describe a VRR extension.
    pub fn vrr(
        name: impl Into<String>,
        version: impl Into<String>,
        extension: VrrExtension,
    ) -> Self {
        Self::with_kind(ExtensionType::Vrr, name, version, ExtensionKind::Vrr(extension))
    }

    /// Operation family of this descriptor.
    pub fn extension_type(&self) -> ExtensionType {
        self.info.extension_type
    }
}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("info", &self.info)
            .field("kind", &self.kind.name())
            .finish()
    }
}

/// Ordered list of descriptors collected from every extension source.
///
/// Order is significant: it is the insertion order used by capability
/// selection (static sources first, then dynamic, registration order within
/// each).
#[derive(Clone, Debug, Default)]
pub struct ExtensionList {
    extensions: Vec<ExtensionDescriptor>,
}

impl ExtensionList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor.
    pub fn push(&mut self, descriptor: ExtensionDescriptor) {
        self.extensions.push(descriptor);
    }

    /// Descriptor at `index`.
    pub fn get(&self, index: usize) -> Option<&ExtensionDescriptor> {
        self.extensions.get(index)
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExtensionDescriptor> {
        self.extensions.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns true if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Extend<ExtensionDescriptor> for ExtensionList {
    fn extend<I: IntoIterator<Item = ExtensionDescriptor>>(&mut self, iter: I) {
        self.extensions.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ExtensionList {
    type Item = &'a ExtensionDescriptor;
    type IntoIter = std::slice::Iter<'a, ExtensionDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.extensions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SurfaceBuffer;
    use crate::error::Result;
    use crate::extension::{ExtensionAlgorithm, Rank};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Nop;

    impl ExtensionAlgorithm for Nop {}

    impl DetailEnhancerAlgorithm for Nop {
        fn process(&self, _input: &SurfaceBuffer, _output: &mut SurfaceBuffer) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_descriptor_type_tag() {
        let ext = DetailEnhancerExtension::new(
            || Some(Arc::new(Nop) as Arc<dyn DetailEnhancerAlgorithm>),
            Vec::new,
        );
        let desc = ExtensionDescriptor::detail_enhancer("nop", "1.0", ext);
        assert_eq!(desc.extension_type(), ExtensionType::DetailEnhancer);
        assert!(format!("{:?}", desc).contains("DetailEnhancer"));
    }

    #[test]
    fn test_creator_runs_each_call() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let ext = DetailEnhancerExtension::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(Arc::new(Nop) as Arc<dyn DetailEnhancerAlgorithm>)
            },
            || {
                vec![DetailEnhancerCapability {
                    levels: vec![],
                    rank: Rank::Default,
                    version: 1,
                }]
            },
        );
        let clone = ext.clone();
        assert!(ext.create().is_some());
        assert!(clone.create().is_some());
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(clone.capabilities().len(), 1);
    }

    #[test]
    fn test_extension_list_order() {
        let mut list = ExtensionList::new();
        for name in ["a", "b", "c"] {
            let ext = DetailEnhancerExtension::new(|| None, Vec::new);
            list.push(ExtensionDescriptor::detail_enhancer(name, "1", ext));
        }
        let names: Vec<_> = list.iter().map(|d| d.info.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(list.get(1).map(|d| d.info.name.as_str()), Some("b"));
    }
}
