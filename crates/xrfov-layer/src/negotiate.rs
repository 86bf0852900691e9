//! Loader negotiation.
//!
//! Pure validation plus registration: nothing here reads or writes the FOV
//! configuration.

use std::ffi::CStr;

use openxr_sys as xr;

use crate::error::LayerError;
use crate::instance::xr_create_api_layer_instance;
use crate::loader::{
    version_string, LoaderStruct, NegotiateApiLayerRequest, NegotiateLoaderInfo,
    CURRENT_LOADER_API_LAYER_VERSION,
};
use crate::resolve::xr_get_instance_proc_addr;
use crate::LAYER_NAME;

/// API version this layer is built against.
pub const LAYER_API_VERSION: xr::Version = xr::CURRENT_API_VERSION;

/// Validate the loader's offer and, if compatible, fill `request` with our
/// versions and entry points.
///
/// A null or empty `api_layer_name` accepts any caller; otherwise it must
/// name this layer.
pub fn negotiate(
    loader_info: Option<&NegotiateLoaderInfo>,
    api_layer_name: Option<&CStr>,
    request: Option<&mut NegotiateApiLayerRequest>,
) -> Result<(), LayerError> {
    if let Some(name) = api_layer_name {
        let name = name.to_string_lossy();
        if !name.is_empty() && name != LAYER_NAME {
            return Err(LayerError::LayerName(name.into_owned()));
        }
    }

    let loader_info = loader_info.ok_or(LayerError::NullPointer("loaderInfo"))?;
    let request = request.ok_or(LayerError::NullPointer("apiLayerRequest"))?;
    loader_info.validate_header()?;
    request.validate_header()?;
    check_versions(loader_info)?;

    request.layer_interface_version = CURRENT_LOADER_API_LAYER_VERSION;
    request.layer_api_version = LAYER_API_VERSION;
    request.get_instance_proc_addr = Some(xr_get_instance_proc_addr);
    request.create_api_layer_instance = Some(xr_create_api_layer_instance);
    Ok(())
}

/// Both advertised ranges must contain what this layer implements.
fn check_versions(loader_info: &NegotiateLoaderInfo) -> Result<(), LayerError> {
    let current = CURRENT_LOADER_API_LAYER_VERSION;
    if !(loader_info.min_interface_version..=loader_info.max_interface_version).contains(&current)
    {
        return Err(LayerError::InterfaceVersion {
            min: loader_info.min_interface_version,
            max: loader_info.max_interface_version,
            current,
        });
    }

    let api = LAYER_API_VERSION.into_raw();
    if !(loader_info.min_api_version.into_raw()..=loader_info.max_api_version.into_raw())
        .contains(&api)
    {
        return Err(LayerError::ApiVersion {
            min: version_string(loader_info.min_api_version),
            max: version_string(loader_info.max_api_version),
            current: version_string(LAYER_API_VERSION),
        });
    }
    Ok(())
}
