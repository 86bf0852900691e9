//! `xrLocateViews` override.
//!
//! Forwards to the runtime, then scales the four FOV angles of each eye of
//! a primary stereo view configuration by the configured factors.

use openxr_sys as xr;
use xrfov_config::{EyeScale, FovConfig};

use crate::state::Layer;

/// Our `xrLocateViews`, typed for `xrGetInstanceProcAddr` output.
pub fn locate_views_wrapper() -> xr::pfn::VoidFunction {
    let wrapper: xr::pfn::LocateViews = xr_locate_views;
    // SAFETY: the loader and application cast it back to PFN_xrLocateViews
    // after resolving it by name.
    unsafe { std::mem::transmute::<xr::pfn::LocateViews, xr::pfn::VoidFunction>(wrapper) }
}

/// Exported to the application through the resolver.
pub unsafe extern "system" fn xr_locate_views(
    session: xr::Session,
    view_locate_info: *const xr::ViewLocateInfo,
    view_state: *mut xr::ViewState,
    view_capacity_input: u32,
    view_count_output: *mut u32,
    views: *mut xr::View,
) -> xr::Result {
    match Layer::global() {
        Some(layer) => layer.locate_views_call(
            session,
            view_locate_info,
            view_state,
            view_capacity_input,
            view_count_output,
            views,
        ),
        None => xr::Result::ERROR_FUNCTION_UNSUPPORTED,
    }
}

impl Layer {
    pub unsafe fn locate_views_call(
        &self,
        session: xr::Session,
        view_locate_info: *const xr::ViewLocateInfo,
        view_state: *mut xr::ViewState,
        view_capacity_input: u32,
        view_count_output: *mut u32,
        views: *mut xr::View,
    ) -> xr::Result {
        xrfov_config::log_views_trace!("--> xrLocateViews");

        let Some(original) = self.locate_views().original() else {
            xrfov_config::log_views_warn!("xrLocateViews called before it was resolved");
            return xr::Result::ERROR_FUNCTION_UNSUPPORTED;
        };
        let original =
            std::mem::transmute::<xr::pfn::VoidFunction, xr::pfn::LocateViews>(original);

        let result = original(
            session,
            view_locate_info,
            view_state,
            view_capacity_input,
            view_count_output,
            views,
        );

        if result == xr::Result::SUCCESS {
            if let Some(info) = view_locate_info.as_ref() {
                if info.view_configuration_type == xr::ViewConfigurationType::PRIMARY_STEREO {
                    let count = located_count(view_capacity_input, view_count_output.as_ref());
                    if !views.is_null() && count > 0 {
                        let located = std::slice::from_raw_parts_mut(views, count);
                        apply_stereo_scale(&self.config(), located);
                    }
                }
            }
        }

        xrfov_config::log_views_trace!(
            "<-- xrLocateViews",
            result = tracing::field::debug(result)
        );
        result
    }
}

/// Number of stereo views that were actually written and that we scale.
fn located_count(view_capacity_input: u32, view_count_output: Option<&u32>) -> usize {
    let written = view_count_output.map_or(view_capacity_input, |&count| {
        count.min(view_capacity_input)
    });
    (written as usize).min(2)
}

/// Scale view 0 by the left eye factors and view 1 by the right eye factors.
/// Poses and every other field are left alone.
pub fn apply_stereo_scale(config: &FovConfig, views: &mut [xr::View]) {
    for (view, scale) in views.iter_mut().zip([config.left, config.right]) {
        scale_fov(&mut view.fov, &scale);
    }
}

pub fn scale_fov(fov: &mut xr::Fovf, scale: &EyeScale) {
    fov.angle_up *= scale.up;
    fov.angle_down *= scale.down;
    fov.angle_left *= scale.left;
    fov.angle_right *= scale.right;
}
