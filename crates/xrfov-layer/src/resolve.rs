//! `xrGetInstanceProcAddr` for this layer.
//!
//! Every lookup goes down the chain first. Only `xrLocateViews` is ever
//! swapped for our wrapper, and only once a configuration file was found:
//! with the identity transform there is nothing to do.

use std::ffi::{c_char, CStr};

use openxr_sys as xr;

use crate::state::Layer;

/// Handed to the loader during negotiation.
pub unsafe extern "system" fn xr_get_instance_proc_addr(
    instance: xr::Instance,
    name: *const c_char,
    function: *mut Option<xr::pfn::VoidFunction>,
) -> xr::Result {
    match Layer::global() {
        Some(layer) => layer.get_instance_proc_addr(instance, name, function),
        None => {
            if let Some(function) = function.as_mut() {
                *function = None;
            }
            xr::Result::ERROR_INITIALIZATION_FAILED
        }
    }
}

impl Layer {
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: xr::Instance,
        name: *const c_char,
        function: *mut Option<xr::pfn::VoidFunction>,
    ) -> xr::Result {
        let Some(next) = self.next() else {
            if let Some(function) = function.as_mut() {
                *function = None;
            }
            return xr::Result::ERROR_INITIALIZATION_FAILED;
        };

        // Null arguments go down unchecked; the next link owns validation.
        let result = next.get_instance_proc_addr(instance, name, function);
        if name.is_null() || function.is_null() {
            return result;
        }
        let name = CStr::from_ptr(name);
        xrfov_config::log_resolve_trace!(
            "--> xrGetInstanceProcAddr",
            name = tracing::field::debug(name)
        );

        if result == xr::Result::SUCCESS && self.config().loaded {
            let record = self.locate_views();
            if record.matches(name) {
                if let Some(original) = *function {
                    *function = Some(record.install(original));
                    xrfov_config::log_resolve_info!(
                        "Intercepting",
                        name = tracing::field::debug(name)
                    );
                }
            }
        }

        xrfov_config::log_resolve_trace!(
            "<-- xrGetInstanceProcAddr",
            result = tracing::field::debug(result)
        );
        result
    }
}
