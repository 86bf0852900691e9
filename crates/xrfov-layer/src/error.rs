//! Protocol violations detected while talking to the loader.
//!
//! None of these cross the C ABI as-is: the loader only ever sees
//! `XR_ERROR_INITIALIZATION_FAILED`. The variants exist for the log.

use openxr_sys as xr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    #[error("invalid api layer name \"{0}\"")]
    LayerName(String),
    #[error("{0} is null")]
    NullPointer(&'static str),
    #[error("{name} has struct type {found}, expected {expected}")]
    StructType {
        name: &'static str,
        expected: u32,
        found: u32,
    },
    #[error("{name} has struct version {found}, expected {expected}")]
    StructVersion {
        name: &'static str,
        expected: u32,
        found: u32,
    },
    #[error("{name} has struct size {found}, expected {expected}")]
    StructSize {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("loader interface versions {min}..={max} do not include {current}")]
    InterfaceVersion { min: u32, max: u32, current: u32 },
    #[error("loader api versions {min}..={max} do not include {current}")]
    ApiVersion {
        min: String,
        max: String,
        current: String,
    },
    #[error("next layer provides no {0}")]
    MissingDelegate(&'static str),
    #[error("layer was not negotiated")]
    NotNegotiated,
}

impl LayerError {
    /// Every protocol violation is reported as the same generic status.
    pub fn to_xr(&self) -> xr::Result {
        xr::Result::ERROR_INITIALIZATION_FAILED
    }
}

/// Collapse a layer-side result into the status the loader sees.
pub fn into_xr(result: Result<(), LayerError>) -> xr::Result {
    match result {
        Ok(()) => xr::Result::SUCCESS,
        Err(err) => err.to_xr(),
    }
}
