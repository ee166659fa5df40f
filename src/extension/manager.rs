//! The extension manager: extension sources, capability queries and the
//! vendor library reference count.

use super::abi::ExtensionFamily;
use super::algorithm::{
    AihdrEnhancerAlgorithm, ColorSpaceConverterAlgorithm, ContrastEnhancerAlgorithm,
    DetailEnhancerAlgorithm, ExtensionAlgorithm, MetadataGeneratorAlgorithm, Resolved,
    VrrAlgorithm,
};
use super::descriptor::{
    AihdrEnhancerExtension, ColorSpaceConverterExtension, ContrastEnhancerExtension,
    DetailEnhancerExtension, ExtensionKind, ExtensionList, FamilyExtension,
    MetadataGeneratorExtension, VrrExtension,
};
use super::info::{ExtensionInfo, ExtensionType, Rank};
use super::params::{ContrastEnhancerType, DetailEnhancerLevel};
use super::provider::{ExtensionProvider, LoadError, VendorLibrary};
use crate::capability::{
    Candidate, ConversionKey, MetadataGenerationKey, build_aihdr_enhancer_map,
    build_color_space_converter_map, build_contrast_enhancer_map, build_detail_enhancer_map,
    build_metadata_generator_map, build_vrr_map,
};
use crate::config::VpeConfig;
use crate::error::{Error, Result};
use crate::format::PixelFormat;
use crate::observability::{
    TracingConfig, instrument_query, record_capability_query, record_extension_created,
    record_extension_init_failure, record_extensions_loaded, record_vendor_library_instances,
};
use crate::service::{AlgorithmService, NoopAlgorithmService};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Registration callback of a statically linked extension source.
pub type RegisterFn = Arc<dyn Fn(&mut ExtensionList) + Send + Sync>;

/// One entry of the static registration table.
#[derive(Clone)]
pub struct StaticRegistration {
    /// Human-readable name, for logs.
    pub name: String,
    /// Family list this entry contributes to.
    pub family: ExtensionFamily,
    /// Callback, or `None` for an entry that is compiled out.
    pub register: Option<RegisterFn>,
}

impl StaticRegistration {
    /// A general-family registration.
    pub fn new(
        name: impl Into<String>,
        register: impl Fn(&mut ExtensionList) + Send + Sync + 'static,
    ) -> Self {
        Self::for_family(name, ExtensionFamily::General, register)
    }

    /// A registration contributing to `family`.
    pub fn for_family(
        name: impl Into<String>,
        family: ExtensionFamily,
        register: impl Fn(&mut ExtensionList) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            register: Some(Arc::new(register)),
        }
    }

    /// A general-family entry without a callback. Logged and skipped at load.
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: ExtensionFamily::General,
            register: None,
        }
    }
}

impl fmt::Debug for StaticRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticRegistration")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("present", &self.register.is_some())
            .finish()
    }
}

/// The winning descriptor of a capability query.
#[derive(Clone)]
pub struct SelectedExtension<E> {
    /// Identity of the selected extension.
    pub info: ExtensionInfo,
    /// Rank of the winning capability.
    pub rank: Rank,
    /// Version of the winning capability.
    pub version: i32,
    /// Creator and capability builder.
    pub extension: E,
}

impl<E> fmt::Debug for SelectedExtension<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedExtension")
            .field("info", &self.info)
            .field("rank", &self.rank)
            .field("version", &self.version)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ExtensionManager`].
#[derive(Default)]
pub struct ExtensionManagerBuilder {
    config: VpeConfig,
    statics: Vec<StaticRegistration>,
    provider: Option<Arc<dyn ExtensionProvider>>,
    service: Option<Arc<dyn AlgorithmService>>,
}

impl ExtensionManagerBuilder {
    /// Use `config`.
    pub fn config(mut self, config: VpeConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a static registration. Order is preserved.
    pub fn register_static(mut self, registration: StaticRegistration) -> Self {
        self.statics.push(registration);
        self
    }

    /// Use `provider` as the dynamic source instead of the configured vendor
    /// library.
    pub fn provider(mut self, provider: Arc<dyn ExtensionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `service` as the bootstrap service client.
    pub fn algorithm_service(mut self, service: Arc<dyn AlgorithmService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Build the manager.
    pub fn build(self) -> Arc<ExtensionManager> {
        let provider = if self.config.dynamic_loading {
            self.provider.or_else(|| {
                self.config.vendor_library.as_ref().map(|path| {
                    Arc::new(VendorLibrary::new(path.clone())) as Arc<dyn ExtensionProvider>
                })
            })
        } else {
            None
        };
        Arc::new(ExtensionManager {
            config: self.config,
            statics: self.statics,
            provider,
            service: self
                .service
                .unwrap_or_else(|| Arc::new(NoopAlgorithmService)),
            instances: Mutex::new(0),
            queries: AtomicU64::new(0),
        })
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Collects extensions from every source and answers capability queries.
///
/// Constructed once and shared by `Arc` with every façade. Each query
/// rebuilds the extension list and capability map, so extensions contributed
/// by a provider opened after a previous query are always visible.
pub struct ExtensionManager {
    config: VpeConfig,
    statics: Vec<StaticRegistration>,
    provider: Option<Arc<dyn ExtensionProvider>>,
    service: Arc<dyn AlgorithmService>,
    /// Active façade count. Dedicated lock: never held with another.
    instances: Mutex<usize>,
    queries: AtomicU64,
}

impl ExtensionManager {
    /// Start building a manager.
    pub fn builder() -> ExtensionManagerBuilder {
        ExtensionManagerBuilder::default()
    }

    /// Manager with the given static registrations and no dynamic source.
    pub fn with_static(statics: impl IntoIterator<Item = StaticRegistration>) -> Arc<Self> {
        statics
            .into_iter()
            .fold(
                Self::builder().config(VpeConfig::static_only()),
                ExtensionManagerBuilder::register_static,
            )
            .build()
    }

    /// Active configuration.
    pub fn config(&self) -> &VpeConfig {
        &self.config
    }

    /// Bootstrap service client.
    pub fn algorithm_service(&self) -> Arc<dyn AlgorithmService> {
        Arc::clone(&self.service)
    }

    /// Number of capability queries answered so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Collect every descriptor of `family`: static sources first, then the
    /// dynamic provider.
    pub fn load_extensions(&self, family: ExtensionFamily) -> ExtensionList {
        let mut list = ExtensionList::new();
        self.append_static(family, &mut list);
        self.append_dynamic(family, &mut list);
        list
    }

    /// Collect the general-family static descriptors.
    pub fn load_static_extensions(&self) -> ExtensionList {
        let mut list = ExtensionList::new();
        self.append_static(ExtensionFamily::General, &mut list);
        list
    }

    /// Collect the general-family dynamic descriptors.
    pub fn load_dynamic_extensions(&self) -> ExtensionList {
        self.load_dynamic(ExtensionFamily::General)
    }

    /// Collect the dynamic metadata generator descriptors.
    pub fn load_dynamic_metadata_gen_extensions(&self) -> ExtensionList {
        self.load_dynamic(ExtensionFamily::MetadataGen)
    }

    /// Collect the dynamic composer descriptors.
    pub fn load_dynamic_compose_extensions(&self) -> ExtensionList {
        self.load_dynamic(ExtensionFamily::Compose)
    }

    /// Collect the dynamic decomposer descriptors.
    pub fn load_dynamic_decompose_extensions(&self) -> ExtensionList {
        self.load_dynamic(ExtensionFamily::Decompose)
    }

    fn load_dynamic(&self, family: ExtensionFamily) -> ExtensionList {
        let mut list = ExtensionList::new();
        self.append_dynamic(family, &mut list);
        list
    }

    fn append_static(&self, family: ExtensionFamily, list: &mut ExtensionList) {
        for registration in self.statics.iter().filter(|r| r.family == family) {
            match &registration.register {
                Some(register) => register(list),
                None => tracing::warn!(
                    "static registration '{}' is missing, skipping",
                    registration.name
                ),
            }
        }
    }

    fn append_dynamic(&self, family: ExtensionFamily, list: &mut ExtensionList) {
        let Some(provider) = &self.provider else {
            return;
        };
        match provider.register(family, list) {
            Ok(count) => tracing::trace!(
                "{} contributed {} {:?} extensions",
                provider.name(),
                count,
                family
            ),
            Err(LoadError::NotOpen) => tracing::trace!(
                "{} is not open, no dynamic {:?} extensions",
                provider.name(),
                family
            ),
            Err(e) => tracing::warn!(
                "{} contributed no {:?} extensions: {}",
                provider.name(),
                family,
                e
            ),
        }
    }

    /// Identity of every descriptor of `family`.
    pub fn extension_infos(&self, family: ExtensionFamily) -> Vec<ExtensionInfo> {
        self.load_extensions(family)
            .iter()
            .map(|d| d.info.clone())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Vendor library reference count
    // ------------------------------------------------------------------------

    /// Register an active façade. Opens the provider on the 0 -> 1
    /// transition.
    pub fn increase_instance(&self) {
        let mut count = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            if let Some(provider) = &self.provider {
                if let Err(e) = provider.open() {
                    tracing::warn!("dynamic extensions unavailable: {}", e);
                }
            }
        }
        *count += 1;
        record_vendor_library_instances(*count);
    }

    /// Unregister an active façade. Closes the provider on the 1 -> 0
    /// transition.
    pub fn decrease_instance(&self) {
        let mut count = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            tracing::error!("decrease_instance called with no active instances");
            return;
        }
        *count -= 1;
        if *count == 0 {
            if let Some(provider) = &self.provider {
                provider.close();
            }
        }
        record_vendor_library_instances(*count);
    }

    /// Number of active façades.
    pub fn instance_count(&self) -> usize {
        *self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an active façade for the lifetime of the returned lease.
    pub fn lease(self: &Arc<Self>) -> ExtensionLease {
        self.increase_instance();
        ExtensionLease {
            manager: Arc::clone(self),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    fn begin_query(&self, extension_type: ExtensionType) -> Option<tracing::span::EnteredSpan> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        record_capability_query(extension_type.family_name());
        instrument_query(&self.config.tracing, extension_type.family_name())
    }

    fn loaded(&self, family: ExtensionFamily, extension_type: ExtensionType) -> ExtensionList {
        let list = self.load_extensions(family);
        record_extensions_loaded(extension_type.family_name(), list.len());
        list
    }

    fn converter_query(
        &self,
        family: ExtensionFamily,
        extension_type: ExtensionType,
        key: &ConversionKey,
    ) -> Option<SelectedExtension<ColorSpaceConverterExtension>> {
        let _span = self.begin_query(extension_type);
        let list = self.loaded(family, extension_type);
        let map = build_color_space_converter_map(&list, extension_type);
        let selected = pick(&list, map.select(key), |kind| match kind {
            ExtensionKind::ColorSpaceConverter(ext) => Some(ext),
            _ => None,
        });
        log_outcome(extension_type, key, selected.as_ref());
        selected
    }

    /// Converter for `key`, if any.
    pub fn find_color_space_converter(
        &self,
        key: &ConversionKey,
    ) -> Option<SelectedExtension<ColorSpaceConverterExtension>> {
        self.converter_query(
            ExtensionFamily::General,
            ExtensionType::ColorSpaceConverter,
            key,
        )
    }

    /// Returns true if some converter supports `key`.
    pub fn is_color_space_conversion_supported(&self, key: &ConversionKey) -> bool {
        self.find_color_space_converter(key).is_some()
    }

    /// Display-path converter for `key`, if any.
    pub fn find_color_space_converter_display(
        &self,
        key: &ConversionKey,
    ) -> Option<SelectedExtension<ColorSpaceConverterExtension>> {
        self.converter_query(
            ExtensionFamily::General,
            ExtensionType::ColorSpaceConverterDisplay,
            key,
        )
    }

    /// Returns true if some display-path converter supports `key`.
    pub fn is_color_space_conversion_display_supported(&self, key: &ConversionKey) -> bool {
        self.find_color_space_converter_display(key).is_some()
    }

    /// Composer for `key` (SDR base layer in, HDR image out), if any.
    pub fn find_composer(
        &self,
        key: &ConversionKey,
    ) -> Option<SelectedExtension<ColorSpaceConverterExtension>> {
        self.converter_query(
            ExtensionFamily::Compose,
            ExtensionType::ColorSpaceConverter,
            key,
        )
    }

    /// Returns true if some composer supports `key`.
    pub fn is_composition_supported(&self, key: &ConversionKey) -> bool {
        self.find_composer(key).is_some()
    }

    /// Decomposer for `key` (HDR image in, SDR base layer out), if any.
    pub fn find_decomposer(
        &self,
        key: &ConversionKey,
    ) -> Option<SelectedExtension<ColorSpaceConverterExtension>> {
        self.converter_query(
            ExtensionFamily::Decompose,
            ExtensionType::ColorSpaceConverter,
            key,
        )
    }

    /// Returns true if some decomposer supports `key`.
    pub fn is_decomposition_supported(&self, key: &ConversionKey) -> bool {
        self.find_decomposer(key).is_some()
    }

    /// Metadata generator for `key`, if any.
    pub fn find_metadata_generator(
        &self,
        key: &MetadataGenerationKey,
    ) -> Option<SelectedExtension<MetadataGeneratorExtension>> {
        let extension_type = ExtensionType::MetadataGenerator;
        let _span = self.begin_query(extension_type);
        let list = self.loaded(ExtensionFamily::MetadataGen, extension_type);
        let map = build_metadata_generator_map(&list);
        let selected = pick(&list, map.select(key), |kind| match kind {
            ExtensionKind::MetadataGenerator(ext) => Some(ext),
            _ => None,
        });
        log_outcome(extension_type, key, selected.as_ref());
        selected
    }

    /// Returns true if some metadata generator supports `key`.
    pub fn is_metadata_generation_supported(&self, key: &MetadataGenerationKey) -> bool {
        self.find_metadata_generator(key).is_some()
    }

    /// Detail enhancer holding `level`, if any.
    pub fn find_detail_enhancer(
        &self,
        level: DetailEnhancerLevel,
    ) -> Option<SelectedExtension<DetailEnhancerExtension>> {
        let extension_type = ExtensionType::DetailEnhancer;
        let _span = self.begin_query(extension_type);
        let list = self.loaded(ExtensionFamily::General, extension_type);
        let map = build_detail_enhancer_map(&list);
        let selected = pick(&list, map.select(&level), |kind| match kind {
            ExtensionKind::DetailEnhancer(ext) => Some(ext),
            _ => None,
        });
        log_outcome(extension_type, &format_args!("{:?}", level), selected.as_ref());
        selected
    }

    /// Returns true if some detail enhancer holds `level`.
    pub fn is_detail_enhancement_supported(&self, level: DetailEnhancerLevel) -> bool {
        self.find_detail_enhancer(level).is_some()
    }

    /// AI HDR enhancer for `format`, if any.
    pub fn find_aihdr_enhancer(
        &self,
        format: PixelFormat,
    ) -> Option<SelectedExtension<AihdrEnhancerExtension>> {
        let extension_type = ExtensionType::AihdrEnhancer;
        let _span = self.begin_query(extension_type);
        let list = self.loaded(ExtensionFamily::General, extension_type);
        let map = build_aihdr_enhancer_map(&list);
        let selected = pick(&list, map.select(&format), |kind| match kind {
            ExtensionKind::AihdrEnhancer(ext) => Some(ext),
            _ => None,
        });
        log_outcome(extension_type, &format, selected.as_ref());
        selected
    }

    /// Returns true if some AI HDR enhancer supports `format`.
    pub fn is_aihdr_enhancement_supported(&self, format: PixelFormat) -> bool {
        self.find_aihdr_enhancer(format).is_some()
    }

    /// Contrast enhancer for `algo`, if any.
    pub fn find_contrast_enhancer(
        &self,
        algo: ContrastEnhancerType,
    ) -> Option<SelectedExtension<ContrastEnhancerExtension>> {
        let extension_type = ExtensionType::ContrastEnhancer;
        let _span = self.begin_query(extension_type);
        let list = self.loaded(ExtensionFamily::General, extension_type);
        let map = build_contrast_enhancer_map(&list);
        let selected = pick(&list, map.select(&algo), |kind| match kind {
            ExtensionKind::ContrastEnhancer(ext) => Some(ext),
            _ => None,
        });
        log_outcome(extension_type, &format_args!("{:?}", algo), selected.as_ref());
        selected
    }

    /// Returns true if some contrast enhancer supports `algo`.
    pub fn is_contrast_enhancement_supported(&self, algo: ContrastEnhancerType) -> bool {
        self.find_contrast_enhancer(algo).is_some()
    }

    /// The VRR extension, if any.
    pub fn find_vrr(&self) -> Option<SelectedExtension<VrrExtension>> {
        let extension_type = ExtensionType::Vrr;
        let _span = self.begin_query(extension_type);
        let list = self.loaded(ExtensionFamily::General, extension_type);
        let map = build_vrr_map(&list);
        let selected = pick(&list, map.select(&()), |kind| match kind {
            ExtensionKind::Vrr(ext) => Some(ext),
            _ => None,
        });
        log_outcome(extension_type, &"vrr", selected.as_ref());
        selected
    }

    /// Returns true if a VRR extension is registered.
    pub fn is_vrr_supported(&self) -> bool {
        self.find_vrr().is_some()
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Create and initialize the converter for `key`.
    pub fn create_color_space_converter(
        &self,
        key: &ConversionKey,
    ) -> Result<Arc<Resolved<dyn ColorSpaceConverterAlgorithm>>> {
        let selected = self
            .find_color_space_converter(key)
            .ok_or_else(|| not_found(ExtensionType::ColorSpaceConverter, key))?;
        instantiate(selected)
    }

    /// Create and initialize the display-path converter for `key`.
    pub fn create_color_space_converter_display(
        &self,
        key: &ConversionKey,
    ) -> Result<Arc<Resolved<dyn ColorSpaceConverterAlgorithm>>> {
        let selected = self
            .find_color_space_converter_display(key)
            .ok_or_else(|| not_found(ExtensionType::ColorSpaceConverterDisplay, key))?;
        instantiate(selected)
    }

    /// Create and initialize the composer for `key`.
    pub fn create_composer(
        &self,
        key: &ConversionKey,
    ) -> Result<Arc<Resolved<dyn ColorSpaceConverterAlgorithm>>> {
        let selected = self
            .find_composer(key)
            .ok_or_else(|| not_found(ExtensionType::ColorSpaceConverter, key))?;
        instantiate(selected)
    }

    /// Create and initialize the decomposer for `key`.
    pub fn create_decomposer(
        &self,
        key: &ConversionKey,
    ) -> Result<Arc<Resolved<dyn ColorSpaceConverterAlgorithm>>> {
        let selected = self
            .find_decomposer(key)
            .ok_or_else(|| not_found(ExtensionType::ColorSpaceConverter, key))?;
        instantiate(selected)
    }

    /// Create and initialize the metadata generator for `key`.
    pub fn create_metadata_generator(
        &self,
        key: &MetadataGenerationKey,
    ) -> Result<Arc<Resolved<dyn MetadataGeneratorAlgorithm>>> {
        let selected = self
            .find_metadata_generator(key)
            .ok_or_else(|| not_found(ExtensionType::MetadataGenerator, key))?;
        instantiate(selected)
    }

    /// Create and initialize the detail enhancer holding `level`.
    pub fn create_detail_enhancer(
        &self,
        level: DetailEnhancerLevel,
    ) -> Result<Arc<Resolved<dyn DetailEnhancerAlgorithm>>> {
        let selected = self
            .find_detail_enhancer(level)
            .ok_or_else(|| not_found(ExtensionType::DetailEnhancer, &format_args!("{:?}", level)))?;
        instantiate(selected)
    }

    /// Create and initialize the AI HDR enhancer for `format`.
    pub fn create_aihdr_enhancer(
        &self,
        format: PixelFormat,
    ) -> Result<Arc<Resolved<dyn AihdrEnhancerAlgorithm>>> {
        let selected = self
            .find_aihdr_enhancer(format)
            .ok_or_else(|| not_found(ExtensionType::AihdrEnhancer, &format))?;
        instantiate(selected)
    }

    /// Create and initialize the contrast enhancer for `algo`.
    pub fn create_contrast_enhancer(
        &self,
        algo: ContrastEnhancerType,
    ) -> Result<Arc<Resolved<dyn ContrastEnhancerAlgorithm>>> {
        let selected = self.find_contrast_enhancer(algo).ok_or_else(|| {
            not_found(ExtensionType::ContrastEnhancer, &format_args!("{:?}", algo))
        })?;
        instantiate(selected)
    }

    /// Create and initialize the VRR algorithm.
    pub fn create_vrr(&self) -> Result<Arc<Resolved<dyn VrrAlgorithm>>> {
        let selected = self
            .find_vrr()
            .ok_or_else(|| not_found(ExtensionType::Vrr, &"vrr"))?;
        instantiate(selected)
    }
}

impl fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionManager")
            .field("statics", &self.statics.len())
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .field("instances", &self.instance_count())
            .field("queries", &self.query_count())
            .finish()
    }
}

/// Keeps the vendor library open while alive.
///
/// Façades hold one lease each. Fields that own algorithm objects must be
/// declared before the lease so they drop first.
pub struct ExtensionLease {
    manager: Arc<ExtensionManager>,
}

impl ExtensionLease {
    /// The manager this lease belongs to.
    pub fn manager(&self) -> &Arc<ExtensionManager> {
        &self.manager
    }

    /// Span settings of the manager's configuration.
    pub fn tracing(&self) -> &TracingConfig {
        &self.manager.config.tracing
    }
}

impl Drop for ExtensionLease {
    fn drop(&mut self) {
        self.manager.decrease_instance();
    }
}

impl fmt::Debug for ExtensionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionLease").finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn pick<E: Clone>(
    list: &ExtensionList,
    candidate: Option<Candidate>,
    extract: impl Fn(&ExtensionKind) -> Option<&E>,
) -> Option<SelectedExtension<E>> {
    let candidate = candidate?;
    let descriptor = list.get(candidate.index)?;
    let extension = extract(&descriptor.kind)?;
    Some(SelectedExtension {
        info: descriptor.info.clone(),
        rank: candidate.rank,
        version: candidate.version,
        extension: extension.clone(),
    })
}

fn log_outcome<E>(
    extension_type: ExtensionType,
    key: &dyn fmt::Display,
    selected: Option<&SelectedExtension<E>>,
) {
    match selected {
        Some(selected) => tracing::debug!(
            "{} for {}: selected '{}' ({:?}, version {})",
            extension_type,
            key,
            selected.info.name,
            selected.rank,
            selected.version
        ),
        None => tracing::debug!("no {} extension supports {}", extension_type, key),
    }
}

fn not_found(extension_type: ExtensionType, key: &dyn fmt::Display) -> Error {
    Error::CapabilityNotFound {
        family: extension_type.family_name(),
        key: key.to_string(),
    }
}

/// Run the creator and `init` of a selected extension.
fn instantiate<A, C>(selected: SelectedExtension<FamilyExtension<A, C>>) -> Result<Arc<Resolved<A>>>
where
    A: ?Sized + ExtensionAlgorithm,
{
    let name = selected.info.name.clone();
    let Some(algorithm) = selected.extension.create() else {
        tracing::warn!("extension '{}' returned no algorithm", name);
        record_extension_init_failure(&name);
        return Err(Error::ExtensionCreateFailed { name });
    };
    if let Err(e) = algorithm.init() {
        tracing::warn!("extension '{}' failed to initialize: {}", name, e);
        record_extension_init_failure(&name);
        return Err(Error::ExtensionInitFailed {
            name,
            reason: e.to_string(),
        });
    }
    record_extension_created(&name);
    tracing::debug!("created extension '{}'", name);
    Ok(Arc::new(Resolved::new(selected.info, algorithm)))
}
