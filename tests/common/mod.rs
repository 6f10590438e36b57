//! Shared fixtures for renderer integration tests.
//!
//! Every test drives a [`FrameRenderer`] through a [`DummySurface`] over a
//! [`DummyDevice`], with meshes and shader bytecode served from memory.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use instanced_renderer::assets::{MemoryAssets, MESH_FORMAT, VERTEX_STRIDE};
use instanced_renderer::backend::dummy::RecordedCommand;
use instanced_renderer::backend::{DummyDevice, DummySurface, SurfaceHost, SurfaceRenderer};
use instanced_renderer::{AssetPaths, FrameRenderer, RendererConfig};

pub const BLOCK_VERTICES: u32 = 36;
pub const LOGO_VERTICES: u32 = 12;
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialise logging for a test. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// A minimal SPIR-V blob: the magic number followed by a few header words.
pub fn fake_spirv() -> Vec<u8> {
    [0x0723_0203u32, 0x0001_0000, 0, 8, 0]
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect()
}

/// A `.buf` mesh whose vertex bytes are all `fill`.
pub fn fake_mesh(vertex_count: u32, fill: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MESH_FORMAT.to_le_bytes());
    bytes.extend_from_slice(&vertex_count.to_le_bytes());
    for bound in [-1.0f32, -1.0, -1.0, 1.0, 1.0, 1.0] {
        bytes.extend_from_slice(&bound.to_le_bytes());
    }
    bytes.resize(bytes.len() + vertex_count as usize * VERTEX_STRIDE, fill);
    bytes
}

/// In-memory assets for every path in `paths`.
pub fn fake_assets(paths: &AssetPaths) -> MemoryAssets {
    let assets = MemoryAssets::new();
    assets.insert(paths.block_mesh.clone(), fake_mesh(BLOCK_VERTICES, 0xb1));
    assets.insert(paths.logo_mesh.clone(), fake_mesh(LOGO_VERTICES, 0x10));
    for shader in [
        &paths.item_vertex_shader,
        &paths.item_fragment_shader,
        &paths.floor_vertex_shader,
        &paths.floor_fragment_shader,
    ] {
        assets.insert(shader.clone(), fake_spirv());
    }
    assets
}

pub fn test_config() -> RendererConfig {
    RendererConfig::new().with_instance_seed(42)
}

/// A renderer wired to a dummy surface and device.
pub struct TestContext {
    pub device: Arc<DummyDevice>,
    pub surface: Arc<DummySurface>,
    pub assets: MemoryAssets,
    pub renderer: FrameRenderer,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: RendererConfig) -> Self {
        let device = Arc::new(DummyDevice::new());
        let surface = Arc::new(DummySurface::new(device.clone()));
        Self::with_surface(device, surface, config)
    }

    pub fn with_surface(
        device: Arc<DummyDevice>,
        surface: Arc<DummySurface>,
        config: RendererConfig,
    ) -> Self {
        init_logging();
        let assets = fake_assets(&config.assets);
        Self::with_assets(device, surface, assets, config)
    }

    pub fn with_assets(
        device: Arc<DummyDevice>,
        surface: Arc<DummySurface>,
        assets: MemoryAssets,
        config: RendererConfig,
    ) -> Self {
        init_logging();
        let renderer = FrameRenderer::new(surface.clone(), Arc::new(assets.clone()), config)
            .expect("renderer construction");
        Self {
            device,
            surface,
            assets,
            renderer,
        }
    }

    /// Run the hooks a surface owner calls before its first frame.
    pub fn bring_up(&mut self) {
        self.renderer.pre_init_resources();
        self.renderer.init_resources();
        self.renderer.init_swapchain_resources();
    }

    /// Run the hooks a surface owner calls when tearing everything down.
    pub fn tear_down(&mut self) {
        self.renderer.release_swapchain_resources();
        self.renderer.release_resources();
    }

    /// Build one frame, wait for it, and return what it recorded.
    ///
    /// The surface is advanced to the next frame slot afterwards.
    pub fn render_frame(&mut self) -> Vec<RecordedCommand> {
        let ready = self.surface.frames_ready();
        let requests = self.surface.update_requests();
        self.renderer.start_next_frame();
        assert!(
            self.surface.wait_for_frames_ready(ready + 1, FRAME_TIMEOUT),
            "frame was not reported ready"
        );
        // The build asks for the next frame right after reporting this one.
        assert!(
            self.surface.wait_for_update_requests(requests + 1, FRAME_TIMEOUT),
            "no redraw requested after the frame"
        );
        let commands = self.device.commands(self.surface.current_command_buffer());
        self.surface.advance_frame();
        commands
    }
}

/// Decode native-endian floats.
pub fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn assert_floats_eq(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-4, "float {index}: {a} != {e}");
    }
}
