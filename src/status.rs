//! Status codes shared by every C entry point.

use crate::error::{Error, Result};

/// Algorithm status code returned across the C ABI.
///
/// The numeric values are part of the ABI and must not be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum VpeAlgoErrCode {
    /// Success.
    Ok = 0,
    /// Allocation failed or a fixed-capacity table is full.
    NoMemory = 1,
    /// Operation not valid for this object.
    InvalidOperation = 2,
    /// Invalid value (null pointer, bad id, out-of-range parameter).
    InvalidVal = 3,
    /// Unclassified failure.
    Unknown = 4,
    /// Invalid parameter object.
    InvalidParam = 5,
    /// Façade initialization failed.
    InitFailed = 6,
    /// No extension found.
    ExtensionNotFound = 7,
    /// Extension was found but failed to initialize.
    ExtensionInitFailed = 8,
    /// Extension failed while processing.
    ExtensionProcessFailed = 9,
    /// No extension implements the requested capability.
    NotImplemented = 10,
    /// Implementation rejected the format or parameter combination.
    OperationNotSupported = 11,
    /// Object is in the wrong state for the call.
    InvalidState = 12,
    /// Resource temporarily busy.
    TryAgain = 13,
}

impl VpeAlgoErrCode {
    /// Raw value as passed through the C ABI.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Returns true for [`VpeAlgoErrCode::Ok`].
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<&Error> for VpeAlgoErrCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidValue(_) | Error::InvalidInstance(_) => Self::InvalidVal,
            Error::CapabilityNotFound { .. } => Self::NotImplemented,
            Error::ExtensionCreateFailed { .. } | Error::ExtensionInitFailed { .. } => {
                Self::ExtensionInitFailed
            }
            Error::ProcessFailed { .. } => Self::ExtensionProcessFailed,
            Error::OperationNotSupported(_) | Error::CreationDisabled(_) => {
                Self::OperationNotSupported
            }
            Error::InstanceTableFull => Self::NoMemory,
            Error::InvalidState(_) => Self::InvalidState,
            Error::TryLater => Self::TryAgain,
            Error::Load(_) => Self::Unknown,
        }
    }
}

impl<T> From<&Result<T>> for VpeAlgoErrCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.into(),
        }
    }
}
