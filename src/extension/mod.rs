//! Extensions: descriptors, algorithm traits, extension sources and the
//! extension manager.
//!
//! # Architecture
//!
//! ```text
//! StaticRegistration table ─┐
//!                           ├─► ExtensionList ─► capability map ─► SelectedExtension
//! ExtensionProvider ────────┘     (ordered)                          │
//!   (VendorLibrary, libloading)                                       ▼
//!                                                        creator() + init() ─► Resolved<A>
//! ```
//!
//! Two sources feed the list: statically linked registration callbacks,
//! always available, and an [`ExtensionProvider`] that is open only while at
//! least one façade is alive. A provider failure contributes zero
//! extensions and is never fatal.
//!
//! # Vendor libraries
//!
//! ```ignore
//! use vpe::export_extension_registrations;
//! use vpe::extension::ExtensionList;
//!
//! fn register(list: &mut ExtensionList) {
//!     // list.push(ExtensionDescriptor::color_space_converter(...));
//! }
//!
//! export_extension_registrations! {
//!     general: ["my converters" => register]
//! }
//! ```

mod abi;
mod algorithm;
mod descriptor;
mod info;
mod manager;
mod params;
mod provider;

pub use abi::{
    ExtensionFamily, RegisterExtensionsFn, RegistrationEntry, RegistrationTable,
    RegistrationTableFn, VPE_EXTENSION_ABI_VERSION, list_from_raw, register_from_table,
};
pub use algorithm::{
    AihdrEnhancerAlgorithm, ColorSpaceConverterAlgorithm, ContrastEnhancerAlgorithm,
    DetailEnhancerAlgorithm, ExtensionAlgorithm, MetadataGeneratorAlgorithm, Resolved,
    VrrAlgorithm,
};
pub use descriptor::{
    AihdrEnhancerExtension, CapabilitiesBuilder, ColorSpaceConverterExtension,
    ContrastEnhancerExtension, Creator, DetailEnhancerExtension, ExtensionDescriptor,
    ExtensionKind, ExtensionList, FamilyExtension, MetadataGeneratorExtension, VrrExtension,
};
pub use info::{ExtensionInfo, ExtensionType, Rank};
pub use manager::{
    ExtensionLease, ExtensionManager, ExtensionManagerBuilder, RegisterFn, SelectedExtension,
    StaticRegistration,
};
pub use params::{
    AihdrEnhancerParameter, ColorSpaceConverterParameter, ContrastEnhancerParameters,
    ContrastEnhancerType, DetailEnhancerLevel, DetailEnhancerParameters,
    MetadataGeneratorAlgoType, MetadataGeneratorParameter, RenderIntent,
};
pub use provider::{ExtensionProvider, LoadError, VendorLibrary};
