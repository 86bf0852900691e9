//! Call chain registry.
//!
//! `NextDispatch` is what this layer knows about the layer (or runtime)
//! below it. `Interception` remembers the one function we wrapped: the
//! original we must forward to, and the wrapper handed out in its place.

use std::ffi::{c_char, c_void, CStr};
use std::sync::atomic::{AtomicPtr, Ordering};

use openxr_sys as xr;

use crate::error::LayerError;
use crate::loader::{ApiLayerCreateInfo, ApiLayerNextInfo, FnCreateApiLayerInstance};

/// Entry points of the next link in the chain.
#[derive(Clone, Copy)]
pub struct NextDispatch {
    get_instance_proc_addr: xr::pfn::GetInstanceProcAddr,
    create_api_layer_instance: FnCreateApiLayerInstance,
}

impl NextDispatch {
    pub fn new(
        get_instance_proc_addr: xr::pfn::GetInstanceProcAddr,
        create_api_layer_instance: FnCreateApiLayerInstance,
    ) -> Self {
        Self {
            get_instance_proc_addr,
            create_api_layer_instance,
        }
    }

    /// Both delegates of `next_info`, or which one is missing.
    pub fn from_next_info(next_info: &ApiLayerNextInfo) -> Result<Self, LayerError> {
        let get_instance_proc_addr = next_info
            .next_get_instance_proc_addr
            .ok_or(LayerError::MissingDelegate("xrGetInstanceProcAddr"))?;
        let create_api_layer_instance = next_info
            .next_create_api_layer_instance
            .ok_or(LayerError::MissingDelegate("xrCreateApiLayerInstance"))?;
        Ok(Self::new(get_instance_proc_addr, create_api_layer_instance))
    }

    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: xr::Instance,
        name: *const c_char,
        function: *mut Option<xr::pfn::VoidFunction>,
    ) -> xr::Result {
        (self.get_instance_proc_addr)(instance, name, function)
    }

    pub unsafe fn create_api_layer_instance(
        &self,
        info: *const xr::InstanceCreateInfo,
        api_layer_info: *const ApiLayerCreateInfo,
        instance: *mut xr::Instance,
    ) -> xr::Result {
        (self.create_api_layer_instance)(info, api_layer_info, instance)
    }
}

/// Original/wrapper pair for one intercepted function name.
pub struct Interception {
    name: &'static CStr,
    original: AtomicPtr<c_void>,
    wrapper: xr::pfn::VoidFunction,
}

impl Interception {
    pub const fn new(name: &'static CStr, wrapper: xr::pfn::VoidFunction) -> Self {
        Self {
            name,
            original: AtomicPtr::new(std::ptr::null_mut()),
            wrapper,
        }
    }

    pub fn name(&self) -> &'static CStr {
        self.name
    }

    pub fn matches(&self, name: &CStr) -> bool {
        self.name == name
    }

    pub fn wrapper(&self) -> xr::pfn::VoidFunction {
        self.wrapper
    }

    /// Remember `original` and return the wrapper to hand out instead.
    ///
    /// Our own wrapper is never recorded as the original: forwarding to it
    /// would recurse forever.
    pub fn install(&self, original: xr::pfn::VoidFunction) -> xr::pfn::VoidFunction {
        if original as usize != self.wrapper as usize {
            self.original
                .store(original as *mut c_void, Ordering::Release);
        }
        self.wrapper
    }

    pub fn original(&self) -> Option<xr::pfn::VoidFunction> {
        let p = self.original.load(Ordering::Acquire);
        if p.is_null() {
            return None;
        }
        // SAFETY: only ever stored from a `VoidFunction` in `install`.
        Some(unsafe { std::mem::transmute::<*mut c_void, xr::pfn::VoidFunction>(p) })
    }
}
