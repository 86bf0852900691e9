//! OpenXR loader <-> API layer interface (`loader_interfaces.h`).
//!
//! These structs are exchanged by pointer with the loader, so their layout
//! must match the C definitions exactly. The loader fills `struct_size`
//! with its own `sizeof`, and we refuse to talk to a loader whose idea of
//! the layout differs from ours.

use std::borrow::Cow;
use std::ffi::c_char;
use std::mem::size_of;

use openxr_sys as xr;

use crate::error::LayerError;

pub const CURRENT_LOADER_API_LAYER_VERSION: u32 = 1;

pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_CREATE_INFO_STRUCT_VERSION: u32 = 1;
pub const API_LAYER_NEXT_INFO_STRUCT_VERSION: u32 = 1;

pub const API_LAYER_MAX_SETTINGS_PATH_SIZE: usize = 512;

/// `XrLoaderInterfaceStructs`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderInterfaceStruct(pub u32);

impl LoaderInterfaceStruct {
    pub const UNINITIALIZED: Self = Self(0);
    pub const LOADER_INFO: Self = Self(1);
    pub const API_LAYER_REQUEST: Self = Self(2);
    pub const RUNTIME_REQUEST: Self = Self(3);
    pub const API_LAYER_CREATE_INFO: Self = Self(4);
    pub const API_LAYER_NEXT_INFO: Self = Self(5);
}

pub type FnCreateApiLayerInstance = unsafe extern "system" fn(
    info: *const xr::InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct NegotiateLoaderInfo {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: xr::Version,
    pub max_api_version: xr::Version,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct NegotiateApiLayerRequest {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_interface_version: u32,
    pub layer_api_version: xr::Version,
    pub get_instance_proc_addr: Option<xr::pfn::GetInstanceProcAddr>,
    pub create_api_layer_instance: Option<FnCreateApiLayerInstance>,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ApiLayerNextInfo {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub layer_name: [c_char; xr::MAX_API_LAYER_NAME_SIZE],
    pub next_get_instance_proc_addr: Option<xr::pfn::GetInstanceProcAddr>,
    pub next_create_api_layer_instance: Option<FnCreateApiLayerInstance>,
    pub next: *mut ApiLayerNextInfo,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ApiLayerCreateInfo {
    pub struct_type: LoaderInterfaceStruct,
    pub struct_version: u32,
    pub struct_size: usize,
    pub loader_instance: *mut std::ffi::c_void,
    pub settings_file_location: [c_char; API_LAYER_MAX_SETTINGS_PATH_SIZE],
    pub next_info: *mut ApiLayerNextInfo,
}

/// Common `(struct_type, struct_version, struct_size)` header of every
/// loader interface struct.
pub trait LoaderStruct: Sized {
    const NAME: &'static str;
    const TYPE: LoaderInterfaceStruct;
    const VERSION: u32;

    fn header(&self) -> (LoaderInterfaceStruct, u32, usize);

    /// Header initialized for the layout compiled into this crate.
    fn expected_header() -> (LoaderInterfaceStruct, u32, usize) {
        (Self::TYPE, Self::VERSION, size_of::<Self>())
    }

    /// Every header field must match the compiled contract exactly.
    fn validate_header(&self) -> Result<(), LayerError> {
        let (struct_type, version, size) = self.header();
        if struct_type != Self::TYPE {
            return Err(LayerError::StructType {
                name: Self::NAME,
                expected: Self::TYPE.0,
                found: struct_type.0,
            });
        }
        if version != Self::VERSION {
            return Err(LayerError::StructVersion {
                name: Self::NAME,
                expected: Self::VERSION,
                found: version,
            });
        }
        if size != size_of::<Self>() {
            return Err(LayerError::StructSize {
                name: Self::NAME,
                expected: size_of::<Self>(),
                found: size,
            });
        }
        Ok(())
    }
}

macro_rules! impl_loader_struct {
    ($ty:ty, $name:literal, $tag:expr, $version:expr) => {
        impl LoaderStruct for $ty {
            const NAME: &'static str = $name;
            const TYPE: LoaderInterfaceStruct = $tag;
            const VERSION: u32 = $version;

            fn header(&self) -> (LoaderInterfaceStruct, u32, usize) {
                (self.struct_type, self.struct_version, self.struct_size)
            }
        }
    };
}

impl_loader_struct!(
    NegotiateLoaderInfo,
    "XrNegotiateLoaderInfo",
    LoaderInterfaceStruct::LOADER_INFO,
    LOADER_INFO_STRUCT_VERSION
);
impl_loader_struct!(
    NegotiateApiLayerRequest,
    "XrNegotiateApiLayerRequest",
    LoaderInterfaceStruct::API_LAYER_REQUEST,
    API_LAYER_INFO_STRUCT_VERSION
);
impl_loader_struct!(
    ApiLayerCreateInfo,
    "XrApiLayerCreateInfo",
    LoaderInterfaceStruct::API_LAYER_CREATE_INFO,
    API_LAYER_CREATE_INFO_STRUCT_VERSION
);
impl_loader_struct!(
    ApiLayerNextInfo,
    "XrApiLayerNextInfo",
    LoaderInterfaceStruct::API_LAYER_NEXT_INFO,
    API_LAYER_NEXT_INFO_STRUCT_VERSION
);

/// Read a NUL-terminated string out of a fixed-size C char array. An array
/// without terminator is read to its end.
pub fn fixed_str(chars: &[c_char]) -> Cow<'_, str> {
    // SAFETY: c_char and u8 have the same size and alignment.
    let bytes = unsafe { std::slice::from_raw_parts(chars.as_ptr().cast::<u8>(), chars.len()) };
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len])
}

/// Copy `s` into a fixed-size C char array, truncating so that a NUL
/// terminator always fits.
pub fn write_fixed_str(dst: &mut [c_char], s: &str) {
    dst.fill(0);
    let max = dst.len().saturating_sub(1);
    for (slot, byte) in dst.iter_mut().zip(s.bytes().take(max)) {
        *slot = byte as c_char;
    }
}

pub fn version_string(version: xr::Version) -> String {
    format!(
        "{}.{}.{}",
        version.major(),
        version.minor(),
        version.patch()
    )
}
