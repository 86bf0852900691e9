//! Process-wide layer state.
//!
//! Everything the layer remembers between loader/application calls lives in
//! one `Layer`, created on the first negotiation and kept until the module is
//! unloaded. The exported entry points carry no context pointer, so they
//! reach it through `Layer::global()`.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use once_cell::sync::OnceCell;
use openxr_sys as xr;
use xrfov_config::{FovConfig, LayerSettings};

use crate::chain::{Interception, NextDispatch};
use crate::views;
use crate::LAYER_NAME;

static LAYER: OnceCell<Layer> = OnceCell::new();

pub struct Layer {
    home: PathBuf,
    next: RwLock<Option<NextDispatch>>,
    config: RwLock<FovConfig>,
    locate_views: Interception,
}

impl Layer {
    /// Fresh state reading configuration files from `home`.
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            next: RwLock::new(None),
            config: RwLock::new(FovConfig::default()),
            locate_views: Interception::new(c"xrLocateViews", views::locate_views_wrapper()),
        }
    }

    /// The installed state, if the loader has negotiated with us.
    pub fn global() -> Option<&'static Layer> {
        LAYER.get()
    }

    /// One-time process setup: settings, log sink, module home.
    /// Later calls return the existing state.
    pub fn install() -> &'static Layer {
        LAYER.get_or_init(|| {
            let settings = LayerSettings::from_env();
            let log_path = xrfov_config::logging::init_layer_logging(&settings, LAYER_NAME);

            let home = settings
                .home
                .clone()
                .unwrap_or_else(crate::path::module_home);
            match log_path {
                Ok(path) => xrfov_config::log_negotiate_info!(
                    "Layer state initialized",
                    home = tracing::field::display(home.display()),
                    log = tracing::field::debug(path),
                ),
                // The host may own the global subscriber; run without a file sink.
                Err(err) => xrfov_config::log_negotiate_debug!(
                    "Log sink not installed",
                    home = tracing::field::display(home.display()),
                    error = tracing::field::display(&err),
                ),
            }
            Layer::new(home)
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn next(&self) -> Option<NextDispatch> {
        *self.next.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_next(&self, next: NextDispatch) {
        *self.next.write().unwrap_or_else(PoisonError::into_inner) = Some(next);
    }

    pub fn config(&self) -> FovConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_config(&self, config: FovConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn locate_views(&self) -> &Interception {
        &self.locate_views
    }

    /// Resolve configuration for a freshly created instance.
    pub(crate) fn resolve_config(&self, create_info: &xr::InstanceCreateInfo) -> FovConfig {
        let app = &create_info.application_info;
        let application_name = crate::loader::fixed_str(&app.application_name);
        let engine_name = crate::loader::fixed_str(&app.engine_name);
        let config = FovConfig::resolve(&self.home, &application_name, &engine_name);
        self.set_config(config);
        config
    }
}
