//! The instanced-mesh frame renderer.
//!
//! [`FrameRenderer`] is driven by the surface owner through
//! [`SurfaceRenderer`]. It owns every device object it creates and pairs each
//! creation with a destruction in the matching release hook:
//!
//! - `init_resources` computes the uniform layout, starts any shader loads
//!   that are not already done and spawns the pipeline creation task.
//! - `init_swapchain_resources` rebuilds the projection for the new surface
//!   size and marks every frame slot's uniforms stale.
//! - `start_next_frame` spawns one frame-build task. The task creates the
//!   vertex, uniform and instance buffers on first use, records the frame
//!   and reports it ready. At most one build is in flight.
//! - `release_swapchain_resources` drains the frame-build task.
//! - `release_resources` drains pipeline creation and destroys everything.
//!
//! Camera, instance count and animation are changed through
//! [`RendererControls`].

mod buffers;
mod controls;
mod frame;
mod pipelines;
mod shader;
mod state;

pub use controls::RendererControls;
pub use shader::AsyncShaderModule;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assets::AssetSource;
use crate::backend::{SurfaceHost, SurfaceRenderer};
use crate::config::RendererConfig;
use crate::error::{fatal, RendererResult};
use crate::scene::{projection_matrix, UniformLayout};
use crate::task::{Task, TaskPool};

use frame::{build_frame, FrameContext, MeshSet};
use pipelines::{PipelineTarget, Pipelines, ShaderSet};
use state::RenderState;

/// Where the renderer is in its resource lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, no device resources yet
    Unconfigured,
    /// Device resources initialized, no swapchain
    Initialized,
    /// Ready to build frames
    SwapchainReady,
    /// Swapchain gone, device resources still alive
    SwapchainReleased,
    /// All device resources destroyed. Can be initialized again.
    Released,
}

/// Renders a floor and an instanced item mesh.
pub struct FrameRenderer {
    host: Arc<dyn SurfaceHost>,
    assets: Arc<dyn AssetSource>,
    config: RendererConfig,
    pool: TaskPool,
    shaders: ShaderSet,
    context: Arc<FrameContext>,
    state: Arc<Mutex<RenderState>>,
    frame_pending: Arc<AtomicBool>,
    frame_task: Option<Task<()>>,
    lifecycle: Lifecycle,
}

impl FrameRenderer {
    /// Validate `config`, start the task pool and begin loading both meshes.
    pub fn new(
        host: Arc<dyn SurfaceHost>,
        assets: Arc<dyn AssetSource>,
        config: RendererConfig,
    ) -> RendererResult<Self> {
        config.validate()?;
        let pool = TaskPool::new(config.task_threads)?;

        let meshes = MeshSet::new();
        meshes
            .block
            .load(&pool, Arc::clone(&assets), config.assets.block_mesh.clone());
        meshes
            .logo
            .load(&pool, Arc::clone(&assets), config.assets.logo_mesh.clone());

        let context = Arc::new(FrameContext {
            host: Arc::clone(&host),
            meshes,
            light_position: config.light_position,
            rotation_step: config.rotation_step_degrees,
        });
        let state = Arc::new(Mutex::new(RenderState::new(&config)));

        Ok(Self {
            host,
            assets,
            config,
            pool,
            shaders: ShaderSet::new(),
            context,
            state,
            frame_pending: Arc::new(AtomicBool::new(false)),
            frame_task: None,
            lifecycle: Lifecycle::Unconfigured,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// True once the background pipeline task has finished.
    pub fn pipelines_ready(&self) -> bool {
        self.state.lock().gpu.pipelines_ready()
    }

    /// True between `start_next_frame` and the frame being reported ready.
    pub fn is_frame_pending(&self) -> bool {
        self.frame_pending.load(Ordering::Acquire)
    }

    pub fn controls(&self) -> RendererControls {
        RendererControls::new(
            Arc::clone(&self.state),
            Arc::clone(&self.host),
            self.config.instance_step,
        )
    }

    fn wait_for_frame(&mut self) {
        if let Some(task) = self.frame_task.take() {
            task.wait();
        }
    }

    fn load_shaders(&self) {
        let device = self.host.device();
        let paths = &self.config.assets;
        let shaders = [
            (&self.shaders.item_vertex, &paths.item_vertex_shader),
            (&self.shaders.item_fragment, &paths.item_fragment_shader),
            (&self.shaders.floor_vertex, &paths.floor_vertex_shader),
            (&self.shaders.floor_fragment, &paths.floor_fragment_shader),
        ];
        for (shader, path) in shaders {
            if !shader.is_valid() {
                shader.load(
                    &self.pool,
                    Arc::clone(&device),
                    Arc::clone(&self.assets),
                    path.clone(),
                );
            }
        }
    }

    fn try_release_resources(&mut self) -> RendererResult<()> {
        let device = self.host.device();
        self.state.lock().gpu.release(device.as_ref())?;
        for shader in self.shaders.iter() {
            shader.release(device.as_ref());
        }
        Ok(())
    }
}

impl SurfaceRenderer for FrameRenderer {
    fn pre_init_resources(&mut self) {
        let supported = self.host.supported_sample_counts();
        let chosen = self
            .config
            .preferred_sample_counts
            .iter()
            .copied()
            .filter(|count| supported.contains(count))
            .max();
        match chosen {
            Some(count) => {
                log::info!("Requesting {count}x MSAA");
                self.host.set_sample_count(count);
            }
            None => log::info!(
                "None of the preferred sample counts {:?} is supported (supported: {:?})",
                self.config.preferred_sample_counts,
                supported
            ),
        }
    }

    fn init_resources(&mut self) {
        assert!(
            matches!(self.lifecycle, Lifecycle::Unconfigured | Lifecycle::Released),
            "init_resources called in state {:?}",
            self.lifecycle
        );

        let uniforms = UniformLayout::new(
            self.host.uniform_buffer_offset_alignment(),
            self.host.concurrent_frame_count(),
        );
        log::debug!(
            "Uniform slot: vertex {} bytes, fragment {} bytes, {} slots",
            uniforms.vertex_size,
            uniforms.fragment_size,
            uniforms.frame_count
        );

        self.load_shaders();

        let device = self.host.device();
        let shaders = self.shaders.clone();
        let target = PipelineTarget {
            samples: self.host.sample_count_flags(),
            render_pass: self.host.default_render_pass(),
        };
        let pipeline_task = self.pool.spawn("pipeline creation", move || {
            Pipelines::create(device, shaders, target)
        });

        {
            let mut state = self.state.lock();
            state.animating = true;
            state.gpu.uniform_layout = Some(uniforms);
            state.gpu.pipeline_task = Some(pipeline_task);
        }

        self.lifecycle = Lifecycle::Initialized;
        log::debug!("Renderer resources initialized");
    }

    fn init_swapchain_resources(&mut self) {
        assert!(
            matches!(
                self.lifecycle,
                Lifecycle::Initialized | Lifecycle::SwapchainReleased
            ),
            "init_swapchain_resources called in state {:?}",
            self.lifecycle
        );

        let extent = self.host.swapchain_image_size();
        let projection = projection_matrix(self.host.clip_correction_matrix(), extent);
        let frame_count = self.host.concurrent_frame_count();
        {
            let mut state = self.state.lock();
            state.projection = projection;
            state.mark_view_projection_dirty(frame_count);
        }
        self.lifecycle = Lifecycle::SwapchainReady;
        log::debug!("Swapchain resources initialized for {}x{}", extent.width, extent.height);
    }

    fn release_swapchain_resources(&mut self) {
        self.wait_for_frame();
        if self.frame_pending.swap(false, Ordering::AcqRel) {
            self.host.frame_ready();
        }
        self.lifecycle = Lifecycle::SwapchainReleased;
        log::debug!("Swapchain resources released");
    }

    fn release_resources(&mut self) {
        self.wait_for_frame();
        if let Err(e) = self.try_release_resources() {
            fatal(e);
        }
        self.lifecycle = Lifecycle::Released;
        log::debug!("Renderer resources released");
    }

    fn start_next_frame(&mut self) {
        assert_eq!(
            self.lifecycle,
            Lifecycle::SwapchainReady,
            "start_next_frame called without a swapchain"
        );
        assert!(
            !self.frame_pending.swap(true, Ordering::AcqRel),
            "start_next_frame called while a frame build is pending"
        );

        let context = Arc::clone(&self.context);
        let state = Arc::clone(&self.state);
        let pending = Arc::clone(&self.frame_pending);
        self.frame_task = Some(self.pool.spawn("frame build", move || {
            {
                let mut state = state.lock();
                if let Err(e) = build_frame(&context, &mut state) {
                    fatal(e);
                }
            }
            if pending.swap(false, Ordering::AcqRel) {
                context.host.frame_ready();
                context.host.request_update();
            }
        }));
    }
}
