//! # xrfov-layer
//!
//! OpenXR API layer that rescales the field of view reported by
//! `xrLocateViews`, per application.
//!
//! The loader finds the layer through its JSON manifest and calls the one
//! exported symbol, `FOVModifier_xrNegotiateLoaderApiLayerInterface`. From
//! there the layer:
//!
//! 1. hands back its own `xrGetInstanceProcAddr` and `xrCreateApiLayerInstance`
//! 2. on instance creation, chains down and then loads `<application>.cfg`
//!    (or `<engine>.cfg`) from the directory holding the library
//! 3. on lookup of `xrLocateViews`, returns a wrapper that scales the four
//!    angles of each eye by the configured factors
//!
//! Every other function resolves straight to the next layer or runtime.
//!
//! ## Environment Variables
//!
//! - `XRFOV_HOME`: Directory holding the `.cfg` files (default: beside the library)
//! - `XRFOV_LOG_DIR`: Directory for the log file (default: per-user local data dir)
//! - `XRFOV_LOG`: Log filter directives (default: `info`)
//! - `XRFOV_DEBUG`: Mirror log lines to stderr if set

// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

use std::ffi::{c_char, CStr};

use openxr_sys as xr;

pub mod chain;
pub mod error;
pub mod instance;
pub mod loader;
pub mod negotiate;
pub mod path;
pub mod resolve;
pub mod state;
pub mod testing;
pub mod views;

pub use error::LayerError;
pub use loader::{NegotiateApiLayerRequest, NegotiateLoaderInfo};
pub use state::Layer;

/// Name the loader knows this layer by.
pub const LAYER_NAME: &str = "XR_APILAYER_NOVENDOR_fov_modifier";

/// Entry point for the loader.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn FOVModifier_xrNegotiateLoaderApiLayerInterface(
    loader_info: *const NegotiateLoaderInfo,
    api_layer_name: *const c_char,
    api_layer_request: *mut NegotiateApiLayerRequest,
) -> xr::Result {
    let layer = Layer::install();
    xrfov_config::log_negotiate_debug!(
        "--> xrNegotiateLoaderApiLayerInterface",
        home = tracing::field::display(layer.home().display())
    );

    let api_layer_name = (!api_layer_name.is_null()).then(|| CStr::from_ptr(api_layer_name));
    let result = negotiate::negotiate(
        loader_info.as_ref(),
        api_layer_name,
        api_layer_request.as_mut(),
    );

    match &result {
        Ok(()) => xrfov_config::log_negotiate_info!("Layer is active", layer = LAYER_NAME),
        Err(err) => xrfov_config::log_negotiate_error!(
            "xrNegotiateLoaderApiLayerInterface validation failed",
            reason = tracing::field::display(err),
        ),
    }
    error::into_xr(result)
}
