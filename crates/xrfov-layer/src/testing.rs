//! Test fixtures standing in for the loader and the runtime.
//!
//! Provides:
//! - builders for the loader interface structs and OpenXR inputs
//! - a fake next link (`fake_get_instance_proc_addr`,
//!   `fake_create_api_layer_instance`) that resolves `xrLocateViews` to
//!   `fake_locate_views`, which reports `FAKE_FOV`/`FAKE_POSE` for both eyes
//!
//! # Usage
//!
//! ```ignore
//! use xrfov_layer::testing::{self, LayerCreateChain};
//!
//! let chain = LayerCreateChain::new();
//! let info = testing::instance_create_info("MyGame", "Unity");
//! ```

use std::ffi::{c_char, CStr};
use std::ptr;

use openxr_sys as xr;

use crate::chain::NextDispatch;
use crate::loader::{
    fixed_str, write_fixed_str, ApiLayerCreateInfo, ApiLayerNextInfo, LoaderStruct,
    NegotiateApiLayerRequest, NegotiateLoaderInfo, API_LAYER_MAX_SETTINGS_PATH_SIZE,
    CURRENT_LOADER_API_LAYER_VERSION,
};
use crate::state::Layer;
use crate::LAYER_NAME;

pub const FAKE_INSTANCE_RAW: u64 = 42;

pub const FAKE_FOV: xr::Fovf = xr::Fovf {
    angle_left: -0.80,
    angle_right: 0.75,
    angle_up: 0.70,
    angle_down: -0.72,
};

pub const FAKE_POSE: xr::Posef = xr::Posef {
    orientation: xr::Quaternionf {
        x: 0.0,
        y: 0.1,
        z: 0.0,
        w: 0.995,
    },
    position: xr::Vector3f {
        x: 0.032,
        y: 1.6,
        z: -0.01,
    },
};

pub fn fake_instance() -> xr::Instance {
    xr::Instance::from_raw(FAKE_INSTANCE_RAW)
}

// === Loader side ===

/// Loader info a current loader would send.
pub fn loader_info() -> NegotiateLoaderInfo {
    let (struct_type, struct_version, struct_size) = NegotiateLoaderInfo::expected_header();
    NegotiateLoaderInfo {
        struct_type,
        struct_version,
        struct_size,
        min_interface_version: CURRENT_LOADER_API_LAYER_VERSION,
        max_interface_version: CURRENT_LOADER_API_LAYER_VERSION,
        min_api_version: xr::Version::new(1, 0, 0),
        max_api_version: xr::CURRENT_API_VERSION,
    }
}

/// Request as the loader hands it over: header set, nothing filled in.
pub fn blank_layer_request() -> NegotiateApiLayerRequest {
    let (struct_type, struct_version, struct_size) = NegotiateApiLayerRequest::expected_header();
    NegotiateApiLayerRequest {
        struct_type,
        struct_version,
        struct_size,
        layer_interface_version: 0,
        layer_api_version: xr::Version::new(0, 0, 0),
        get_instance_proc_addr: None,
        create_api_layer_instance: None,
    }
}

/// `XrApiLayerCreateInfo` linked to a single `XrApiLayerNextInfo` naming
/// this layer, with the fake runtime as next link. Boxed so the internal
/// `next_info` pointer stays valid.
pub struct LayerCreateChain {
    pub create_info: ApiLayerCreateInfo,
    pub next_info: ApiLayerNextInfo,
}

impl LayerCreateChain {
    pub fn new() -> Box<Self> {
        let (struct_type, struct_version, struct_size) = ApiLayerNextInfo::expected_header();
        let mut next_info = ApiLayerNextInfo {
            struct_type,
            struct_version,
            struct_size,
            layer_name: [0; xr::MAX_API_LAYER_NAME_SIZE],
            next_get_instance_proc_addr: Some(fake_get_instance_proc_addr),
            next_create_api_layer_instance: Some(fake_create_api_layer_instance),
            next: ptr::null_mut(),
        };
        write_fixed_str(&mut next_info.layer_name, LAYER_NAME);

        let (struct_type, struct_version, struct_size) = ApiLayerCreateInfo::expected_header();
        let create_info = ApiLayerCreateInfo {
            struct_type,
            struct_version,
            struct_size,
            loader_instance: ptr::null_mut(),
            settings_file_location: [0; API_LAYER_MAX_SETTINGS_PATH_SIZE],
            next_info: ptr::null_mut(),
        };

        let mut chain = Box::new(Self {
            create_info,
            next_info,
        });
        let next: *mut ApiLayerNextInfo = &mut chain.next_info;
        chain.create_info.next_info = next;
        chain
    }

    pub fn as_ptr(&self) -> *const ApiLayerCreateInfo {
        &self.create_info
    }
}

// === Application side ===

pub fn instance_create_info(application_name: &str, engine_name: &str) -> xr::InstanceCreateInfo {
    let mut application_info = xr::ApplicationInfo {
        application_name: [0; xr::MAX_APPLICATION_NAME_SIZE],
        application_version: 1,
        engine_name: [0; xr::MAX_ENGINE_NAME_SIZE],
        engine_version: 1,
        api_version: xr::CURRENT_API_VERSION,
    };
    write_fixed_str(&mut application_info.application_name, application_name);
    write_fixed_str(&mut application_info.engine_name, engine_name);

    xr::InstanceCreateInfo {
        ty: xr::StructureType::INSTANCE_CREATE_INFO,
        next: ptr::null(),
        create_flags: xr::InstanceCreateFlags::EMPTY,
        application_info,
        enabled_api_layer_count: 0,
        enabled_api_layer_names: ptr::null(),
        enabled_extension_count: 0,
        enabled_extension_names: ptr::null(),
    }
}

pub fn view_locate_info(kind: xr::ViewConfigurationType) -> xr::ViewLocateInfo {
    xr::ViewLocateInfo {
        ty: xr::StructureType::VIEW_LOCATE_INFO,
        next: ptr::null(),
        view_configuration_type: kind,
        display_time: xr::Time::from_nanos(1),
        space: xr::Space::NULL,
    }
}

pub fn blank_view_state() -> xr::ViewState {
    xr::ViewState {
        ty: xr::StructureType::VIEW_STATE,
        next: ptr::null_mut(),
        view_state_flags: xr::ViewStateFlags::EMPTY,
    }
}

pub fn blank_view() -> xr::View {
    xr::View {
        ty: xr::StructureType::VIEW,
        next: ptr::null_mut(),
        pose: xr::Posef {
            orientation: xr::Quaternionf {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            position: xr::Vector3f {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
        },
        fov: xr::Fovf {
            angle_left: 0.0,
            angle_right: 0.0,
            angle_up: 0.0,
            angle_down: 0.0,
        },
    }
}

pub fn blank_views<const N: usize>() -> [xr::View; N] {
    std::array::from_fn(|_| blank_view())
}

/// Call `layer`'s `xrLocateViews` with capacity `views.len()`.
/// Returns the status and the reported view count.
pub fn locate(
    layer: &Layer,
    kind: xr::ViewConfigurationType,
    views: &mut [xr::View],
) -> (xr::Result, u32) {
    let info = view_locate_info(kind);
    let mut state = blank_view_state();
    let mut count = 0u32;
    let result = unsafe {
        layer.locate_views_call(
            xr::Session::from_raw(1),
            &info,
            &mut state,
            views.len() as u32,
            &mut count,
            views.as_mut_ptr(),
        )
    };
    (result, count)
}

/// Bit-exact comparison.
pub fn same_fov(a: &xr::Fovf, b: &xr::Fovf) -> bool {
    a.angle_left.to_bits() == b.angle_left.to_bits()
        && a.angle_right.to_bits() == b.angle_right.to_bits()
        && a.angle_up.to_bits() == b.angle_up.to_bits()
        && a.angle_down.to_bits() == b.angle_down.to_bits()
}

/// Bit-exact comparison.
pub fn same_pose(a: &xr::Posef, b: &xr::Posef) -> bool {
    let o = |p: &xr::Posef| {
        [
            p.orientation.x,
            p.orientation.y,
            p.orientation.z,
            p.orientation.w,
            p.position.x,
            p.position.y,
            p.position.z,
        ]
        .map(f32::to_bits)
    };
    o(a) == o(b)
}

// === Fake next link ===

pub fn fake_next_dispatch() -> NextDispatch {
    NextDispatch::new(fake_get_instance_proc_addr, fake_create_api_layer_instance)
}

pub unsafe extern "system" fn fake_get_instance_proc_addr(
    _instance: xr::Instance,
    name: *const c_char,
    function: *mut Option<xr::pfn::VoidFunction>,
) -> xr::Result {
    if name.is_null() || function.is_null() {
        if let Some(function) = function.as_mut() {
            *function = None;
        }
        return xr::Result::ERROR_VALIDATION_FAILURE;
    }
    let name = CStr::from_ptr(name);
    let (resolved, result) = match name.to_bytes() {
        b"xrLocateViews" => (Some(fake_locate_views_void()), xr::Result::SUCCESS),
        b"xrDestroyInstance" => (Some(fake_destroy_instance_void()), xr::Result::SUCCESS),
        _ => (None, xr::Result::ERROR_FUNCTION_UNSUPPORTED),
    };
    *function = resolved;
    result
}

/// Resolves `xrLocateViews` but reports failure.
pub unsafe extern "system" fn failing_get_instance_proc_addr(
    _instance: xr::Instance,
    _name: *const c_char,
    function: *mut Option<xr::pfn::VoidFunction>,
) -> xr::Result {
    if let Some(function) = function.as_mut() {
        *function = Some(fake_locate_views_void());
    }
    xr::Result::ERROR_RUNTIME_FAILURE
}

pub unsafe extern "system" fn fake_create_api_layer_instance(
    _info: *const xr::InstanceCreateInfo,
    _api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result {
    *instance = fake_instance();
    xr::Result::SUCCESS
}

pub unsafe extern "system" fn failing_create_api_layer_instance(
    _info: *const xr::InstanceCreateInfo,
    _api_layer_info: *const ApiLayerCreateInfo,
    _instance: *mut xr::Instance,
) -> xr::Result {
    xr::Result::ERROR_RUNTIME_FAILURE
}

/// Succeeds only if it receives the chain exactly as `LayerCreateChain`
/// and `instance_create_info("MyGame", _)` built it.
pub unsafe extern "system" fn checking_create_api_layer_instance(
    info: *const xr::InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result {
    let Some(api_layer_info) = api_layer_info.as_ref() else {
        return xr::Result::ERROR_VALIDATION_FAILURE;
    };
    let Some(next_info) = api_layer_info.next_info.as_ref() else {
        return xr::Result::ERROR_VALIDATION_FAILURE;
    };
    let Some(info) = info.as_ref() else {
        return xr::Result::ERROR_VALIDATION_FAILURE;
    };
    let untouched = api_layer_info.validate_header().is_ok()
        && next_info.validate_header().is_ok()
        && fixed_str(&next_info.layer_name) == LAYER_NAME
        && fixed_str(&info.application_info.application_name) == "MyGame";
    if !untouched {
        return xr::Result::ERROR_VALIDATION_FAILURE;
    }
    *instance = fake_instance();
    xr::Result::SUCCESS
}

/// Reports two views at `FAKE_FOV`/`FAKE_POSE`, following the two-call
/// idiom: capacity 0 only reports the count.
pub unsafe extern "system" fn fake_locate_views(
    _session: xr::Session,
    _view_locate_info: *const xr::ViewLocateInfo,
    view_state: *mut xr::ViewState,
    view_capacity_input: u32,
    view_count_output: *mut u32,
    views: *mut xr::View,
) -> xr::Result {
    let Some(count) = view_count_output.as_mut() else {
        return xr::Result::ERROR_VALIDATION_FAILURE;
    };
    *count = 2;
    if view_capacity_input == 0 {
        return xr::Result::SUCCESS;
    }
    if view_capacity_input < 2 || views.is_null() {
        return xr::Result::ERROR_SIZE_INSUFFICIENT;
    }
    fill_fake_views(views);
    if let Some(state) = view_state.as_mut() {
        state.view_state_flags =
            xr::ViewStateFlags::ORIENTATION_VALID | xr::ViewStateFlags::POSITION_VALID;
    }
    xr::Result::SUCCESS
}

/// Writes the same output as `fake_locate_views`, then reports the session lost.
pub unsafe extern "system" fn failing_locate_views(
    _session: xr::Session,
    _view_locate_info: *const xr::ViewLocateInfo,
    _view_state: *mut xr::ViewState,
    view_capacity_input: u32,
    view_count_output: *mut u32,
    views: *mut xr::View,
) -> xr::Result {
    if let Some(count) = view_count_output.as_mut() {
        *count = 2;
    }
    if view_capacity_input >= 2 && !views.is_null() {
        fill_fake_views(views);
    }
    xr::Result::ERROR_SESSION_LOST
}

unsafe fn fill_fake_views(views: *mut xr::View) {
    for view in std::slice::from_raw_parts_mut(views, 2) {
        view.pose = FAKE_POSE;
        view.fov = FAKE_FOV;
    }
}

pub unsafe extern "system" fn fake_destroy_instance(_instance: xr::Instance) -> xr::Result {
    xr::Result::SUCCESS
}

pub fn fake_locate_views_void() -> xr::pfn::VoidFunction {
    let f: xr::pfn::LocateViews = fake_locate_views;
    unsafe { std::mem::transmute::<xr::pfn::LocateViews, xr::pfn::VoidFunction>(f) }
}

pub fn fake_destroy_instance_void() -> xr::pfn::VoidFunction {
    let f: xr::pfn::DestroyInstance = fake_destroy_instance;
    unsafe { std::mem::transmute::<xr::pfn::DestroyInstance, xr::pfn::VoidFunction>(f) }
}
