//! Core backend abstraction traits
//!
//! The renderer talks to the GPU only through [`GpuDevice`] and to the
//! window system only through [`SurfaceHost`]. The surface owner drives the
//! renderer through [`SurfaceRenderer`].

use std::sync::Arc;

use ash::vk;
use glam::Mat4;

use crate::backend::types::*;

/// Device function table used by the renderer.
///
/// Every creating call returns the raw Vulkan status on failure; callers
/// attach the operation name. Destroy calls cannot fail. Implementations
/// must be callable from any thread; the renderer guarantees that a given
/// object is never used concurrently with its destruction.
pub trait GpuDevice: Send + Sync {
    // Shaders and pipelines

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule, vk::Result>;
    fn destroy_shader_module(&self, module: vk::ShaderModule);

    fn create_pipeline_cache(&self) -> Result<vk::PipelineCache, vk::Result>;
    fn destroy_pipeline_cache(&self, cache: vk::PipelineCache);

    fn create_descriptor_pool(
        &self,
        desc: &DescriptorPoolDescriptor,
    ) -> Result<vk::DescriptorPool, vk::Result>;
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<vk::DescriptorSetLayout, vk::Result>;
    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    /// Allocate one set from `pool`. Sets are freed with their pool.
    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, vk::Result>;

    fn update_descriptor_sets(&self, writes: &[DescriptorBufferWrite]);

    fn create_pipeline_layout(
        &self,
        desc: &PipelineLayoutDescriptor,
    ) -> Result<vk::PipelineLayout, vk::Result>;
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        desc: &GraphicsPipelineDescriptor,
    ) -> Result<vk::Pipeline, vk::Result>;
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    // Buffers and memory

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<vk::Buffer, vk::Result>;
    fn destroy_buffer(&self, buffer: vk::Buffer);
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        memory_type_index: u32,
    ) -> Result<vk::DeviceMemory, vk::Result>;
    fn free_memory(&self, memory: vk::DeviceMemory);

    fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), vk::Result>;

    /// Map `data.len()` bytes of host-visible `memory` at `offset`, copy `data`
    /// in and unmap.
    fn write_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        data: &[u8],
    ) -> Result<(), vk::Result>;

    // Command recording

    fn cmd_begin_render_pass(&self, cb: vk::CommandBuffer, begin: &RenderPassBegin);
    fn cmd_end_render_pass(&self, cb: vk::CommandBuffer);
    fn cmd_set_viewport(&self, cb: vk::CommandBuffer, viewport: vk::Viewport);
    fn cmd_set_scissor(&self, cb: vk::CommandBuffer, scissor: vk::Rect2D);
    fn cmd_bind_pipeline(&self, cb: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_bind_vertex_buffer(
        &self,
        cb: vk::CommandBuffer,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    );
    fn cmd_bind_descriptor_set(
        &self,
        cb: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
        dynamic_offsets: &[u32],
    );
    fn cmd_push_constants(
        &self,
        cb: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    );
    fn cmd_draw(&self, cb: vk::CommandBuffer, vertex_count: u32, instance_count: u32);
}

/// The window-system side that owns the device, swapchain and frame pacing.
pub trait SurfaceHost: Send + Sync {
    fn device(&self) -> Arc<dyn GpuDevice>;

    /// Multisample counts the physical device supports for the surface.
    fn supported_sample_counts(&self) -> Vec<u32>;
    /// Request a sample count. Only honored before the swapchain exists.
    fn set_sample_count(&self, count: u32);
    /// Sample count of the active swapchain.
    fn sample_count_flags(&self) -> vk::SampleCountFlags;

    fn default_render_pass(&self) -> vk::RenderPass;
    fn uniform_buffer_offset_alignment(&self) -> vk::DeviceSize;
    fn host_visible_memory_index(&self) -> u32;

    fn concurrent_frame_count(&self) -> u32;
    fn current_frame(&self) -> u32;
    fn current_command_buffer(&self) -> vk::CommandBuffer;
    fn current_framebuffer(&self) -> vk::Framebuffer;
    fn swapchain_image_size(&self) -> vk::Extent2D;
    /// Correction from GL clip space to the surface's clip space.
    fn clip_correction_matrix(&self) -> Mat4;

    /// The frame started by the last `start_next_frame` is recorded.
    fn frame_ready(&self);
    /// Schedule another frame.
    fn request_update(&self);
}

/// Lifecycle hooks called by the surface owner.
///
/// Errors are not returned: every failure inside a hook is fatal.
pub trait SurfaceRenderer {
    /// Called before the device exists.
    fn pre_init_resources(&mut self) {}

    /// Called once the device exists.
    fn init_resources(&mut self);

    /// Called after the swapchain is (re)created.
    fn init_swapchain_resources(&mut self);

    /// Called before the swapchain is destroyed. Last point at which all
    /// resources are valid.
    fn release_swapchain_resources(&mut self);

    /// Called before the device is destroyed.
    fn release_resources(&mut self);

    /// Record the next frame into the current command buffer, then call
    /// [`SurfaceHost::frame_ready`].
    fn start_next_frame(&mut self);
}
