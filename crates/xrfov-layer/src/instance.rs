//! `xrCreateApiLayerInstance` for this layer.

use openxr_sys as xr;

use crate::chain::NextDispatch;
use crate::error::LayerError;
use crate::loader::{fixed_str, ApiLayerCreateInfo, LoaderStruct};
use crate::state::Layer;
use crate::LAYER_NAME;

/// Handed to the loader during negotiation.
pub unsafe extern "system" fn xr_create_api_layer_instance(
    info: *const xr::InstanceCreateInfo,
    api_layer_info: *const ApiLayerCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result {
    match Layer::global() {
        Some(layer) => layer.create_api_layer_instance(info, api_layer_info, instance),
        None => {
            xrfov_config::log_instance_error!(
                "xrCreateApiLayerInstance validation failed",
                reason = tracing::field::display(LayerError::NotNegotiated),
            );
            LayerError::NotNegotiated.to_xr()
        }
    }
}

/// Validate the loader's layer creation info and extract our next link.
///
/// # Safety
/// `api_layer_info` and its `next_info` must be null or valid.
pub unsafe fn next_dispatch(
    api_layer_info: *const ApiLayerCreateInfo,
) -> Result<NextDispatch, LayerError> {
    let api_layer_info = api_layer_info
        .as_ref()
        .ok_or(LayerError::NullPointer("apiLayerInfo"))?;
    api_layer_info.validate_header()?;

    let next_info = api_layer_info
        .next_info
        .as_ref()
        .ok_or(LayerError::NullPointer("apiLayerInfo->nextInfo"))?;
    next_info.validate_header()?;

    let layer_name = fixed_str(&next_info.layer_name);
    if layer_name != LAYER_NAME {
        return Err(LayerError::LayerName(layer_name.into_owned()));
    }

    NextDispatch::from_next_info(next_info)
}

impl Layer {
    /// Store the next link, create the instance down the chain, then
    /// resolve the FOV configuration for the application.
    pub unsafe fn create_api_layer_instance(
        &self,
        info: *const xr::InstanceCreateInfo,
        api_layer_info: *const ApiLayerCreateInfo,
        instance: *mut xr::Instance,
    ) -> xr::Result {
        xrfov_config::log_instance_debug!("--> xrCreateApiLayerInstance");

        let next = match next_dispatch(api_layer_info) {
            Ok(next) => next,
            Err(err) => {
                xrfov_config::log_instance_error!(
                    "xrCreateApiLayerInstance validation failed",
                    reason = tracing::field::display(&err),
                );
                return err.to_xr();
            }
        };
        self.set_next(next);

        // The loader's structures go down unmodified.
        let result = next.create_api_layer_instance(info, api_layer_info, instance);
        if result == xr::Result::SUCCESS {
            if let Some(info) = info.as_ref() {
                self.resolve_config(info);
            }
        }

        xrfov_config::log_instance_debug!(
            "<-- xrCreateApiLayerInstance",
            result = tracing::field::debug(result)
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{write_fixed_str, LoaderInterfaceStruct};
    use crate::testing::{self, LayerCreateChain};
    use xrfov_config::testing::TestEnvironment;
    use xrfov_config::FovConfig;

    type Corrupt = fn(&mut LayerCreateChain);

    fn create(layer: &Layer, chain: &LayerCreateChain, app: &str, engine: &str) -> xr::Result {
        let info = testing::instance_create_info(app, engine);
        let mut instance = xr::Instance::NULL;
        unsafe { layer.create_api_layer_instance(&info, chain.as_ptr(), &mut instance) }
    }

    #[test]
    fn test_create_loads_application_config() {
        let env = TestEnvironment::new().unwrap();
        env.write_config("MyGame", "left.up=0.8\n").unwrap();
        let layer = Layer::new(env.home.clone());
        let chain = LayerCreateChain::new();

        let info = testing::instance_create_info("MyGame", "Unity");
        let mut instance = xr::Instance::NULL;
        let result =
            unsafe { layer.create_api_layer_instance(&info, chain.as_ptr(), &mut instance) };

        assert_eq!(result, xr::Result::SUCCESS);
        assert_eq!(instance, testing::fake_instance());
        assert!(layer.next().is_some());
        let config = layer.config();
        assert!(config.loaded);
        assert_eq!(config.left.up, 0.8);
    }

    #[test]
    fn test_create_falls_back_to_engine_config() {
        let env = TestEnvironment::new().unwrap();
        env.write_config("Unity", "right.left=0.6\n").unwrap();
        let layer = Layer::new(env.home.clone());
        let chain = LayerCreateChain::new();

        assert_eq!(create(&layer, &chain, "MyGame", "Unity"), xr::Result::SUCCESS);
        let config = layer.config();
        assert!(config.loaded);
        assert_eq!(config.right.left, 0.6);
    }

    #[test]
    fn test_create_without_config_uses_identity() {
        let env = TestEnvironment::new().unwrap();
        let layer = Layer::new(env.home.clone());
        let chain = LayerCreateChain::new();

        assert_eq!(create(&layer, &chain, "MyGame", "Unity"), xr::Result::SUCCESS);
        assert_eq!(layer.config(), FovConfig::default());
    }

    #[test]
    fn test_create_resets_previous_config() {
        let env = TestEnvironment::new().unwrap();
        env.write_config("First", "left.up=0.5\n").unwrap();
        let layer = Layer::new(env.home.clone());
        let chain = LayerCreateChain::new();

        assert_eq!(create(&layer, &chain, "First", ""), xr::Result::SUCCESS);
        assert!(layer.config().loaded);
        assert_eq!(create(&layer, &chain, "Second", ""), xr::Result::SUCCESS);
        assert_eq!(layer.config(), FovConfig::default());
    }

    #[test]
    fn test_downstream_failure_is_forwarded() {
        let env = TestEnvironment::new().unwrap();
        env.write_config("MyGame", "left.up=0.8\n").unwrap();
        let layer = Layer::new(env.home.clone());
        let mut chain = LayerCreateChain::new();
        chain.next_info.next_create_api_layer_instance =
            Some(testing::failing_create_api_layer_instance);

        assert_eq!(
            create(&layer, &chain, "MyGame", "Unity"),
            xr::Result::ERROR_RUNTIME_FAILURE
        );
        assert_eq!(layer.config(), FovConfig::default());
    }

    #[test]
    fn test_downstream_receives_unmodified_structures() {
        let layer = Layer::new(std::path::PathBuf::from("/nonexistent"));
        let mut chain = LayerCreateChain::new();
        chain.next_info.next_create_api_layer_instance =
            Some(testing::checking_create_api_layer_instance);

        assert_eq!(create(&layer, &chain, "MyGame", "Unity"), xr::Result::SUCCESS);
    }

    #[test]
    fn test_rejects_null_layer_info() {
        let layer = Layer::new(std::path::PathBuf::from("/nonexistent"));
        let info = testing::instance_create_info("MyGame", "Unity");
        let mut instance = xr::Instance::NULL;
        let result =
            unsafe { layer.create_api_layer_instance(&info, std::ptr::null(), &mut instance) };
        assert_eq!(result, xr::Result::ERROR_INITIALIZATION_FAILED);
        assert!(layer.next().is_none());
    }

    #[test]
    fn test_rejects_each_malformed_field() {
        let cases: [(&str, Corrupt, LayerError); 9] = [
            (
                "create info type",
                |c: &mut LayerCreateChain| {
                    c.create_info.struct_type = LoaderInterfaceStruct::API_LAYER_NEXT_INFO
                },
                LayerError::StructType {
                    name: "XrApiLayerCreateInfo",
                    expected: 4,
                    found: 5,
                },
            ),
            (
                "create info version",
                |c: &mut LayerCreateChain| c.create_info.struct_version = 2,
                LayerError::StructVersion {
                    name: "XrApiLayerCreateInfo",
                    expected: 1,
                    found: 2,
                },
            ),
            (
                "create info size",
                |c: &mut LayerCreateChain| c.create_info.struct_size -= 8,
                LayerError::StructSize {
                    name: "XrApiLayerCreateInfo",
                    expected: std::mem::size_of::<ApiLayerCreateInfo>(),
                    found: std::mem::size_of::<ApiLayerCreateInfo>() - 8,
                },
            ),
            (
                "next info type",
                |c: &mut LayerCreateChain| {
                    c.next_info.struct_type = LoaderInterfaceStruct::API_LAYER_CREATE_INFO
                },
                LayerError::StructType {
                    name: "XrApiLayerNextInfo",
                    expected: 5,
                    found: 4,
                },
            ),
            (
                "next info version",
                |c: &mut LayerCreateChain| c.next_info.struct_version = 0,
                LayerError::StructVersion {
                    name: "XrApiLayerNextInfo",
                    expected: 1,
                    found: 0,
                },
            ),
            (
                "next info size",
                |c: &mut LayerCreateChain| c.next_info.struct_size += 1,
                LayerError::StructSize {
                    name: "XrApiLayerNextInfo",
                    expected: std::mem::size_of::<crate::loader::ApiLayerNextInfo>(),
                    found: std::mem::size_of::<crate::loader::ApiLayerNextInfo>() + 1,
                },
            ),
            (
                "layer name",
                |c: &mut LayerCreateChain| {
                    write_fixed_str(&mut c.next_info.layer_name, "XR_APILAYER_other")
                },
                LayerError::LayerName("XR_APILAYER_other".to_string()),
            ),
            (
                "next xrGetInstanceProcAddr",
                |c: &mut LayerCreateChain| c.next_info.next_get_instance_proc_addr = None,
                LayerError::MissingDelegate("xrGetInstanceProcAddr"),
            ),
            (
                "next xrCreateApiLayerInstance",
                |c: &mut LayerCreateChain| c.next_info.next_create_api_layer_instance = None,
                LayerError::MissingDelegate("xrCreateApiLayerInstance"),
            ),
        ];

        for (label, corrupt, expected) in cases {
            let mut chain = LayerCreateChain::new();
            corrupt(&mut chain);
            let err = unsafe { next_dispatch(chain.as_ptr()) }.err();
            assert_eq!(err, Some(expected), "{}", label);

            let layer = Layer::new(std::path::PathBuf::from("/nonexistent"));
            assert_eq!(
                create(&layer, &chain, "MyGame", "Unity"),
                xr::Result::ERROR_INITIALIZATION_FAILED,
                "{}",
                label
            );
            assert!(layer.next().is_none(), "{}", label);
        }
    }

    #[test]
    fn test_rejects_missing_next_info() {
        let mut chain = LayerCreateChain::new();
        chain.create_info.next_info = std::ptr::null_mut();
        let err = unsafe { next_dispatch(chain.as_ptr()) }.err();
        assert_eq!(err, Some(LayerError::NullPointer("apiLayerInfo->nextInfo")));
    }
}
