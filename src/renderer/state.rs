//! State shared between the control thread and frame building.

use glam::Mat4;

use super::buffers::{InstanceBuffer, StaticBuffers};
use super::pipelines::Pipelines;
use crate::backend::GpuDevice;
use crate::config::RendererConfig;
use crate::error::{RendererError, RendererResult};
use crate::scene::{Camera, InstanceDataGenerator, UniformLayout};
use crate::task::Task;

/// Everything the control layer and the frame-build task both touch.
///
/// Guarded by one lock, held for each control call and for a whole frame
/// build. Control calls therefore wait out an in-progress build.
pub(crate) struct RenderState {
    pub camera: Camera,
    pub instances: InstanceDataGenerator,
    pub animating: bool,
    pub use_logo: bool,
    /// Item rotation in degrees
    pub rotation: f32,
    /// Frame slots whose uniforms still have to be refreshed
    pub view_projection_dirty: u32,
    pub projection: Mat4,
    pub gpu: GpuResources,
}

impl RenderState {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            camera: Camera::new(config.camera_position),
            instances: InstanceDataGenerator::new(
                config.initial_instance_count,
                config.max_instances,
                config.instance_seed,
            ),
            animating: false,
            use_logo: false,
            rotation: 0.0,
            view_projection_dirty: 0,
            projection: Mat4::IDENTITY,
            gpu: GpuResources::default(),
        }
    }

    /// Refresh the uniforms of every frame slot before trusting them again.
    pub fn mark_view_projection_dirty(&mut self, frame_count: u32) {
        self.view_projection_dirty = frame_count;
    }
}

/// Device objects owned by the renderer between `init_resources` and
/// `release_resources`.
#[derive(Default)]
pub(crate) struct GpuResources {
    pub uniform_layout: Option<UniformLayout>,
    pub pipeline_task: Option<Task<RendererResult<Pipelines>>>,
    pub pipelines: Option<Pipelines>,
    pub static_buffers: Option<StaticBuffers>,
    pub instance_buffer: Option<InstanceBuffer>,
    pub descriptors_written: bool,
}

impl GpuResources {
    /// Block until the pipeline task, if any, has delivered.
    pub fn wait_for_pipelines(&mut self) -> RendererResult<()> {
        if let Some(task) = self.pipeline_task.take() {
            let pipelines = task.wait().ok_or_else(|| {
                RendererError::PipelineUnavailable("pipeline task ended without a result".into())
            })??;
            self.pipelines = Some(pipelines);
        }
        Ok(())
    }

    pub fn pipelines_ready(&mut self) -> bool {
        match &mut self.pipeline_task {
            Some(task) => task.is_finished(),
            None => self.pipelines.is_some(),
        }
    }

    /// Destroy every object in dependency order: descriptor objects,
    /// pipelines, layouts, cache, buffers, then memory.
    pub fn release(&mut self, device: &dyn GpuDevice) -> RendererResult<()> {
        self.wait_for_pipelines()?;
        if let Some(pipelines) = self.pipelines.take() {
            pipelines.destroy(device);
        }
        let static_buffers = self.static_buffers.take();
        let instance_buffer = self.instance_buffer.take();
        if let Some(buffers) = &static_buffers {
            buffers.destroy_buffers(device);
        }
        if let Some(buffer) = &instance_buffer {
            buffer.destroy_buffer(device);
        }
        if let Some(buffers) = static_buffers {
            buffers.free_memory(device);
        }
        if let Some(buffer) = instance_buffer {
            buffer.free_memory(device);
        }
        self.descriptors_written = false;
        self.uniform_layout = None;
        Ok(())
    }
}
