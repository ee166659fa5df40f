//! Runtime extension providers.

use super::abi::{ExtensionFamily, RegisterExtensionsFn, RegistrationTableFn, register_from_table};
use super::descriptor::ExtensionList;
use libloading::{Library, Symbol};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors that can occur when loading dynamic extensions.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to open the shared library.
    #[error("failed to open '{path}': {reason}")]
    LibraryOpen {
        /// Library path.
        path: PathBuf,
        /// Loader error text.
        reason: String,
    },

    /// The library does not export the family symbol.
    #[error("missing exported symbol: {0}")]
    SymbolNotFound(&'static str),

    /// The family symbol returned a null table.
    #[error("registration symbol returned a null table")]
    NullTable,

    /// ABI version mismatch.
    #[error("ABI version mismatch: expected {expected}, got {actual}")]
    AbiMismatch {
        /// Expected ABI version.
        expected: u32,
        /// Actual ABI version found.
        actual: u32,
    },

    /// The provider is not open.
    #[error("extension provider is not open")]
    NotOpen,
}

/// A source of dynamically registered extensions.
///
/// The extension manager opens a provider when the first façade is created
/// and closes it when the last one is destroyed. Between those points every
/// capability query asks it to register the requested family.
pub trait ExtensionProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Open the provider. Opening an open provider is a no-op.
    fn open(&self) -> Result<(), LoadError>;

    /// Close the provider. Closing a closed provider is a no-op.
    fn close(&self);

    /// Returns true if the provider is open.
    fn is_open(&self) -> bool;

    /// Append the descriptors of `family` to `list`.
    ///
    /// Returns the number of descriptors appended.
    fn register(&self, family: ExtensionFamily, list: &mut ExtensionList)
    -> Result<usize, LoadError>;
}

/// The vendor shared library, loaded with libloading.
///
/// The library handle is kept until [`ExtensionProvider::close`]. Algorithm
/// objects created by the library must be dropped before that point.
pub struct VendorLibrary {
    path: PathBuf,
    library: Mutex<Option<Library>>,
}

impl VendorLibrary {
    /// Create a closed provider for the library at `path`.
    ///
    /// A bare file name is resolved through the platform loader's search
    /// path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            library: Mutex::new(None),
        }
    }

    /// Library path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExtensionProvider for VendorLibrary {
    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("vendor library")
    }

    fn open(&self) -> Result<(), LoadError> {
        let mut library = self.library.lock().unwrap_or_else(PoisonError::into_inner);
        if library.is_some() {
            return Ok(());
        }
        // SAFETY: Loading the vendor library runs its initializers. The path
        // comes from trusted configuration.
        let opened = unsafe { Library::new(&self.path) }.map_err(|e| LoadError::LibraryOpen {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        tracing::info!("opened vendor extension library {}", self.path.display());
        *library = Some(opened);
        Ok(())
    }

    fn close(&self) {
        let mut library = self.library.lock().unwrap_or_else(PoisonError::into_inner);
        if library.take().is_some() {
            tracing::info!("closed vendor extension library {}", self.path.display());
        }
    }

    fn is_open(&self) -> bool {
        self.library
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn register(
        &self,
        family: ExtensionFamily,
        list: &mut ExtensionList,
    ) -> Result<usize, LoadError> {
        let guard = self.library.lock().unwrap_or_else(PoisonError::into_inner);
        let library = guard.as_ref().ok_or(LoadError::NotOpen)?;

        if family.uses_table() {
            // SAFETY: The symbol type is fixed by the extension ABI.
            let symbol: Symbol<RegistrationTableFn> = unsafe { library.get(family.symbol()) }
                .map_err(|_| LoadError::SymbolNotFound(family.symbol_name()))?;
            // SAFETY: The library is open for as long as `guard` lives.
            unsafe { register_from_table(symbol(), list) }
        } else {
            // SAFETY: The symbol type is fixed by the extension ABI.
            let symbol: Symbol<RegisterExtensionsFn> = unsafe { library.get(family.symbol()) }
                .map_err(|_| LoadError::SymbolNotFound(family.symbol_name()))?;
            let before = list.len();
            // SAFETY: `list` is a live exclusive borrow.
            unsafe { symbol(list as *mut ExtensionList) };
            Ok(list.len() - before)
        }
    }
}

impl std::fmt::Debug for VendorLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorLibrary")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let provider = VendorLibrary::new(dir.path().join("libmissing.so"));
        let result = provider.open();
        assert!(matches!(result, Err(LoadError::LibraryOpen { .. })));
        assert!(!provider.is_open());
    }

    #[test]
    fn test_register_requires_open() {
        let provider = VendorLibrary::new("libnot_opened.so");
        let mut list = ExtensionList::new();
        let result = provider.register(ExtensionFamily::General, &mut list);
        assert!(matches!(result, Err(LoadError::NotOpen)));
        provider.close();
        assert!(list.is_empty());
    }
}
