//! Shader modules compiled in the background.

use std::io::Cursor;
use std::sync::Arc;

use ash::vk;

use crate::assets::{AssetError, AssetSource};
use crate::backend::GpuDevice;
use crate::error::{DeviceResultExt, RendererError, RendererResult};
use crate::task::{AsyncLoad, TaskPool};

/// A shader module whose bytecode is read and compiled on the task pool.
///
/// A failed load is logged and resolves to a null module.
#[derive(Clone)]
pub struct AsyncShaderModule {
    label: &'static str,
    load: AsyncLoad<vk::ShaderModule>,
}

impl AsyncShaderModule {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            load: AsyncLoad::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Start loading `path`. A module from an earlier load is destroyed.
    pub fn load(
        &self,
        pool: &TaskPool,
        device: Arc<dyn GpuDevice>,
        assets: Arc<dyn AssetSource>,
        path: String,
    ) {
        let label = self.label;
        let worker_device = Arc::clone(&device);
        let previous = self.load.start(pool, "shader load", move || {
            match compile(worker_device.as_ref(), assets.as_ref(), &path) {
                Ok(module) => {
                    log::debug!("Compiled {label} shader from {path}");
                    module
                }
                Err(e) => {
                    log::warn!("Failed to load {label} shader: {e}");
                    vk::ShaderModule::null()
                }
            }
        });
        if let Some(module) = previous.filter(|m| *m != vk::ShaderModule::null()) {
            device.destroy_shader_module(module);
        }
    }

    /// The compiled module, blocking until the load finishes.
    ///
    /// Null when nothing was loaded or the load failed.
    pub fn data(&self) -> vk::ShaderModule {
        self.load.get().unwrap_or_default()
    }

    /// True once a finished load produced a module. Never blocks.
    pub fn is_valid(&self) -> bool {
        self.load
            .try_get()
            .is_some_and(|module| module != vk::ShaderModule::null())
    }

    pub fn is_started(&self) -> bool {
        self.load.is_started()
    }

    /// Forget the module and hand it back for destruction.
    ///
    /// An in-flight load is waited on first.
    pub fn reset(&self) -> vk::ShaderModule {
        self.load.reset().unwrap_or_default()
    }

    /// Reset and destroy whatever module the handle held.
    pub fn release(&self, device: &dyn GpuDevice) {
        let module = self.reset();
        if module != vk::ShaderModule::null() {
            device.destroy_shader_module(module);
        }
    }

    /// The module for pipeline creation, or an error if it failed to load.
    pub(crate) fn require(&self) -> RendererResult<vk::ShaderModule> {
        let module = self.data();
        if module == vk::ShaderModule::null() {
            return Err(RendererError::InvalidShader(self.label));
        }
        Ok(module)
    }
}

fn compile(
    device: &dyn GpuDevice,
    assets: &dyn AssetSource,
    path: &str,
) -> RendererResult<vk::ShaderModule> {
    let bytes = assets.read(path)?;
    let code = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| AssetError::Malformed {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    device
        .create_shader_module(&code)
        .or_device("create shader module")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::backend::DummyDevice;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn spirv(words: usize) -> Vec<u8> {
        std::iter::once(SPIRV_MAGIC)
            .chain(1..words as u32)
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    fn setup() -> (TaskPool, Arc<DummyDevice>, MemoryAssets) {
        let assets = MemoryAssets::new();
        assets.insert("shaders/test.spv", spirv(8));
        (TaskPool::new(3).unwrap(), Arc::new(DummyDevice::new()), assets)
    }

    #[test]
    fn test_data_resolves_once() {
        let (pool, device, assets) = setup();
        let shader = AsyncShaderModule::new("test");
        assert!(!shader.is_started());
        shader.load(&pool, device.clone(), Arc::new(assets.clone()), "shaders/test.spv".into());

        let first = shader.data();
        let second = shader.data();
        assert_ne!(first, vk::ShaderModule::null());
        assert_eq!(first, second);
        assert!(shader.is_valid());
        assert_eq!(assets.read_count("shaders/test.spv"), 1);
        assert_eq!(device.call_count("create_shader_module"), 1);
    }

    #[test]
    fn test_missing_bytecode_is_invalid() {
        let (pool, device, assets) = setup();
        let shader = AsyncShaderModule::new("missing");
        shader.load(&pool, device.clone(), Arc::new(assets), "shaders/none.spv".into());
        assert_eq!(shader.data(), vk::ShaderModule::null());
        assert!(!shader.is_valid());
        assert!(matches!(shader.require(), Err(RendererError::InvalidShader("missing"))));
    }

    #[test]
    fn test_bad_magic_is_invalid() {
        let (pool, device, assets) = setup();
        assets.insert("shaders/bad.spv", vec![0u8; 16]);
        let shader = AsyncShaderModule::new("bad");
        shader.load(&pool, device.clone(), Arc::new(assets), "shaders/bad.spv".into());
        assert_eq!(shader.data(), vk::ShaderModule::null());
        assert_eq!(device.call_count("create_shader_module"), 0);
    }

    #[test]
    fn test_reload_destroys_previous_module() {
        let (pool, device, assets) = setup();
        let assets: Arc<dyn AssetSource> = Arc::new(assets);
        let shader = AsyncShaderModule::new("test");
        shader.load(&pool, device.clone(), assets.clone(), "shaders/test.spv".into());
        let first = shader.data();

        shader.load(&pool, device.clone(), assets, "shaders/test.spv".into());
        let second = shader.data();
        assert_ne!(first, second);
        assert!(!device.is_live(vk::Handle::as_raw(first)));
        assert!(device.is_live(vk::Handle::as_raw(second)));
    }

    #[test]
    fn test_release_resets_and_destroys() {
        let (pool, device, assets) = setup();
        let shader = AsyncShaderModule::new("test");
        shader.load(&pool, device.clone(), Arc::new(assets), "shaders/test.spv".into());
        let module = shader.data();
        shader.release(device.as_ref());
        assert!(!shader.is_started());
        assert!(!device.is_live(vk::Handle::as_raw(module)));
        assert_eq!(shader.data(), vk::ShaderModule::null());
    }
}
