//! Vendor extension ABI.
//!
//! A vendor library exports one symbol per [`ExtensionFamily`]. For the
//! general, compose and decompose families the symbol is a function
//! returning a [`RegistrationTable`]; for the metadata generation family it
//! is a single [`RegisterExtensionsFn`].
//!
//! Registration functions receive a `*mut ExtensionList` and append Rust
//! descriptors to it, so a vendor library must be built against the same
//! version of this crate. [`VPE_EXTENSION_ABI_VERSION`] guards the table
//! layout.

use super::descriptor::ExtensionList;
use super::provider::LoadError;
use std::ffi::{CStr, c_char};

/// Current ABI version. Registration tables must match it to be used.
pub const VPE_EXTENSION_ABI_VERSION: u32 = 1;

/// Appends descriptors to the list behind the pointer.
///
/// # Safety
///
/// The pointer must be a valid, exclusive `ExtensionList` for the duration
/// of the call.
pub type RegisterExtensionsFn = unsafe extern "C" fn(list: *mut ExtensionList);

/// Returns a pointer to a static registration table.
pub type RegistrationTableFn = unsafe extern "C" fn() -> *const RegistrationTable;

/// Dynamic symbol family. Each family is loaded independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExtensionFamily {
    /// Conversion, display, detail, AI HDR, contrast and VRR extensions.
    General = 0,
    /// Metadata generators.
    MetadataGen,
    /// HDR layer composers.
    Compose,
    /// HDR layer decomposers.
    Decompose,
}

impl ExtensionFamily {
    /// All families in load order.
    pub const ALL: [ExtensionFamily; 4] = [
        ExtensionFamily::General,
        ExtensionFamily::MetadataGen,
        ExtensionFamily::Compose,
        ExtensionFamily::Decompose,
    ];

    /// Exported symbol name.
    pub const fn symbol_name(&self) -> &'static str {
        match self {
            Self::General => "vpe_extension_registrations",
            Self::MetadataGen => "vpe_register_metadata_gen_extensions",
            Self::Compose => "vpe_compose_extension_registrations",
            Self::Decompose => "vpe_decompose_extension_registrations",
        }
    }

    /// Exported symbol name, nul-terminated for `dlsym`.
    pub const fn symbol(&self) -> &'static [u8] {
        match self {
            Self::General => b"vpe_extension_registrations\0",
            Self::MetadataGen => b"vpe_register_metadata_gen_extensions\0",
            Self::Compose => b"vpe_compose_extension_registrations\0",
            Self::Decompose => b"vpe_decompose_extension_registrations\0",
        }
    }

    /// Returns true if the symbol is a table rather than a single function.
    pub const fn uses_table(&self) -> bool {
        !matches!(self, Self::MetadataGen)
    }
}

/// A named registration callback.
///
/// This struct is `#[repr(C)]` for C ABI compatibility.
#[repr(C)]
pub struct RegistrationEntry {
    /// Null-terminated human-readable name.
    pub name: *const c_char,
    /// Registration callback, or null.
    pub register: Option<RegisterExtensionsFn>,
}

// SAFETY: RegistrationEntry contains only a pointer to static string data
// and a function pointer.
unsafe impl Send for RegistrationEntry {}
unsafe impl Sync for RegistrationEntry {}

impl RegistrationEntry {
    /// Get the entry name as a Rust string.
    ///
    /// # Safety
    ///
    /// `name` must be null or valid and null-terminated.
    pub unsafe fn name_str(&self) -> &str {
        if self.name.is_null() {
            return "unnamed";
        }
        // SAFETY: Caller guarantees `name` is valid and null-terminated.
        unsafe { CStr::from_ptr(self.name).to_str().unwrap_or("unnamed") }
    }
}

/// Table of registration callbacks returned by a family symbol.
///
/// This struct is `#[repr(C)]` for C ABI compatibility.
#[repr(C)]
pub struct RegistrationTable {
    /// ABI version, must match [`VPE_EXTENSION_ABI_VERSION`].
    pub abi_version: u32,
    /// Number of entries in `entries`.
    pub num_entries: u32,
    /// Array of entries.
    pub entries: *const RegistrationEntry,
}

// SAFETY: RegistrationTable contains only pointers to static data.
unsafe impl Send for RegistrationTable {}
unsafe impl Sync for RegistrationTable {}

impl RegistrationTable {
    /// Get the slice of entries.
    ///
    /// # Safety
    ///
    /// `entries` must point to `num_entries` valid items, or be null.
    pub unsafe fn entries(&self) -> &[RegistrationEntry] {
        if self.entries.is_null() || self.num_entries == 0 {
            &[]
        } else {
            // SAFETY: Caller guarantees `entries` points to a valid array.
            unsafe { std::slice::from_raw_parts(self.entries, self.num_entries as usize) }
        }
    }
}

/// Borrow the list behind a registration pointer.
///
/// # Safety
///
/// `list` must be null or a valid, exclusive `ExtensionList`.
pub unsafe fn list_from_raw<'a>(list: *mut ExtensionList) -> Option<&'a mut ExtensionList> {
    // SAFETY: Caller guarantees validity and exclusivity.
    unsafe { list.as_mut() }
}

/// Run every callback of `table`, appending to `list`.
///
/// Returns the number of descriptors appended. Null callbacks are logged and
/// skipped.
///
/// # Safety
///
/// `table` must be null or point to a valid table whose callbacks honor
/// [`RegisterExtensionsFn`].
pub unsafe fn register_from_table(
    table: *const RegistrationTable,
    list: &mut ExtensionList,
) -> Result<usize, LoadError> {
    if table.is_null() {
        return Err(LoadError::NullTable);
    }
    // SAFETY: Non-null, caller guarantees validity.
    let table = unsafe { &*table };
    if table.abi_version != VPE_EXTENSION_ABI_VERSION {
        return Err(LoadError::AbiMismatch {
            expected: VPE_EXTENSION_ABI_VERSION,
            actual: table.abi_version,
        });
    }

    let before = list.len();
    // SAFETY: Table validated above.
    for entry in unsafe { table.entries() } {
        // SAFETY: Entry names point to static strings in the table.
        let name = unsafe { entry.name_str() };
        match entry.register {
            Some(register) => {
                let start = list.len();
                // SAFETY: `list` is a live exclusive borrow.
                unsafe { register(list as *mut ExtensionList) };
                tracing::debug!(
                    "registration '{}' contributed {} extensions",
                    name,
                    list.len() - start
                );
            }
            None => tracing::warn!("registration '{}' has no callback, skipping", name),
        }
    }
    Ok(list.len() - before)
}

/// Export registration symbols from a vendor library.
///
/// Each registration function has the signature `fn(&mut ExtensionList)`.
///
/// # Example
///
/// ```ignore
/// use vpe::export_extension_registrations;
///
/// fn register_converters(list: &mut vpe::extension::ExtensionList) {
///     list.push(my_converter_descriptor());
/// }
///
/// export_extension_registrations! {
///     general: [
///         "converters" => register_converters,
///     ]
/// }
///
/// export_extension_registrations! {
///     metadata_gen: register_metadata_generators
/// }
/// ```
#[macro_export]
macro_rules! export_extension_registrations {
    (general: [ $( $name:literal => $register:path ),* $(,)? ]) => {
        $crate::export_extension_registrations!(
            @table vpe_extension_registrations, [ $( $name => $register ),* ]
        );
    };
    (compose: [ $( $name:literal => $register:path ),* $(,)? ]) => {
        $crate::export_extension_registrations!(
            @table vpe_compose_extension_registrations, [ $( $name => $register ),* ]
        );
    };
    (decompose: [ $( $name:literal => $register:path ),* $(,)? ]) => {
        $crate::export_extension_registrations!(
            @table vpe_decompose_extension_registrations, [ $( $name => $register ),* ]
        );
    };
    (metadata_gen: $register:path) => {
        /// Metadata generator registration entry point.
        ///
        /// # Safety
        ///
        /// `list` must be null or a valid, exclusive extension list.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn vpe_register_metadata_gen_extensions(
            list: *mut $crate::extension::ExtensionList,
        ) {
            // SAFETY: Caller guarantees validity.
            if let Some(list) = unsafe { $crate::extension::list_from_raw(list) } {
                $register(list);
            }
        }
    };
    (@table $symbol:ident, [ $( $name:literal => $register:path ),* ]) => {
        const _: () = {
            static ENTRIES: &[$crate::extension::RegistrationEntry] = &[
                $(
                    $crate::extension::RegistrationEntry {
                        name: concat!($name, "\0").as_ptr() as *const std::ffi::c_char,
                        register: Some({
                            unsafe extern "C" fn register(
                                list: *mut $crate::extension::ExtensionList,
                            ) {
                                // SAFETY: The loader passes a live exclusive list.
                                let list = unsafe { $crate::extension::list_from_raw(list) };
                                if let Some(list) = list {
                                    $register(list);
                                }
                            }
                            register
                        }),
                    },
                )*
            ];

            static TABLE: $crate::extension::RegistrationTable =
                $crate::extension::RegistrationTable {
                    abi_version: $crate::extension::VPE_EXTENSION_ABI_VERSION,
                    num_entries: ENTRIES.len() as u32,
                    entries: ENTRIES.as_ptr(),
                };

            /// Registration table entry point.
            #[unsafe(no_mangle)]
            pub extern "C" fn $symbol() -> *const $crate::extension::RegistrationTable {
                &TABLE
            }
        };
    };
}
