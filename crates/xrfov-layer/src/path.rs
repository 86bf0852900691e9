//! Where the layer module lives on disk.
//!
//! Configuration files sit beside the loaded library. When the module path
//! cannot be determined we fall back to the current working directory.

use std::path::PathBuf;

/// Directory containing the loaded layer module.
pub fn module_home() -> PathBuf {
    module_path()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

/// Full path of the shared object this function was compiled into.
#[cfg(unix)]
pub fn module_path() -> Option<PathBuf> {
    use std::ffi::CStr;
    use std::os::unix::ffi::OsStrExt;

    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let addr = module_path as *const libc::c_void;
    // SAFETY: dladdr only inspects the address and fills `info`.
    if unsafe { libc::dladdr(addr, &mut info) } == 0 || info.dli_fname.is_null() {
        return None;
    }
    // SAFETY: dli_fname is a NUL-terminated string owned by the dynamic linker.
    let fname = unsafe { CStr::from_ptr(info.dli_fname) };
    let path = PathBuf::from(std::ffi::OsStr::from_bytes(fname.to_bytes()));
    if path.is_absolute() {
        Some(path)
    } else {
        std::env::current_dir().ok().map(|cwd| cwd.join(path))
    }
}

#[cfg(not(unix))]
pub fn module_path() -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_home_is_absolute() {
        assert!(module_home().is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn test_module_path_points_at_existing_file() {
        let path = module_path().expect("dladdr should resolve the test binary");
        assert!(path.exists());
    }
}
