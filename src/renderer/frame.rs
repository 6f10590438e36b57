//! Per-frame command recording.

use std::sync::Arc;

use ash::vk;
use glam::Vec3;

use super::buffers::{InstanceBuffer, StaticBuffers};
use super::state::RenderState;
use crate::assets::Mesh;
use crate::backend::{GpuDevice, RenderPassBegin, SurfaceHost};
use crate::error::{command_u32, RendererError, RendererResult};
use crate::scene::{
    eye_position, floor_model, item_model, normal_matrix, FloorPushConstants, FragmentUniforms,
    ItemUniforms, PhongMaterial, PointLight, VertexUniforms, FLOOR_COLOR,
};

const CLEAR_COLOR: [f32; 4] = [0.67, 0.84, 0.9, 1.0];
const FLOOR_VERTEX_COUNT: u32 = 4;

/// The two item meshes.
#[derive(Clone)]
pub(crate) struct MeshSet {
    pub block: Mesh,
    pub logo: Mesh,
}

impl MeshSet {
    pub fn new() -> Self {
        Self {
            block: Mesh::new("block"),
            logo: Mesh::new("logo"),
        }
    }
}

/// Read-only inputs shared by every frame-build task.
pub(crate) struct FrameContext {
    pub host: Arc<dyn SurfaceHost>,
    pub meshes: MeshSet,
    pub light_position: Vec3,
    pub rotation_step: f32,
}

/// Record one frame into the surface's current command buffer.
///
/// Creates the static and instance buffers on first use, waits for the
/// pipelines, then records the floor draw followed by the instanced item
/// draw in a single render pass.
pub(crate) fn build_frame(ctx: &FrameContext, state: &mut RenderState) -> RendererResult<()> {
    let host = ctx.host.as_ref();
    let device = host.device();
    let device = device.as_ref();
    let uniforms = state.gpu.uniform_layout.ok_or(RendererError::NotInitialized)?;

    if state.gpu.static_buffers.is_none() {
        let block = ctx.meshes.block.data();
        let logo = ctx.meshes.logo.data();
        state.gpu.static_buffers = Some(StaticBuffers::create(
            device,
            host.host_visible_memory_index(),
            &block,
            &logo,
            &uniforms,
        )?);
    }

    if state.gpu.instance_buffer.is_none() {
        state.gpu.instance_buffer = Some(InstanceBuffer::create(
            device,
            host.host_visible_memory_index(),
            state.instances.max(),
        )?);
    }
    if let Some(instance_buffer) = state.gpu.instance_buffer.as_mut() {
        instance_buffer.sync(device, &mut state.instances)?;
    }

    state.gpu.wait_for_pipelines()?;

    let gpu = &mut state.gpu;
    let (Some(buffers), Some(instance_buffer), Some(pipelines)) =
        (&gpu.static_buffers, &gpu.instance_buffer, &gpu.pipelines)
    else {
        return Err(RendererError::NotInitialized);
    };

    if !gpu.descriptors_written {
        pipelines
            .item
            .write_descriptors(device, buffers.uniform, &uniforms);
        gpu.descriptors_written = true;
    }

    let cb = host.current_command_buffer();
    let extent = host.swapchain_image_size();
    let multisampled = host.sample_count_flags().as_raw() > 1;

    device.cmd_begin_render_pass(
        cb,
        &RenderPassBegin {
            render_pass: host.default_render_pass(),
            framebuffer: host.current_framebuffer(),
            extent,
            clear_color: CLEAR_COLOR,
            clear_depth: 1.0,
            clear_stencil: 0,
            clear_value_count: if multisampled { 3 } else { 2 },
        },
    );
    device.cmd_set_viewport(
        cb,
        vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        },
    );
    device.cmd_set_scissor(
        cb,
        vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        },
    );

    let view = state.camera.view_matrix();
    let view_projection = state.projection * view;

    // Floor
    let push = FloorPushConstants {
        mvp: view_projection * floor_model(),
        color: FLOOR_COLOR,
    };
    device.cmd_bind_pipeline(cb, pipelines.floor.pipeline);
    device.cmd_bind_vertex_buffer(cb, 0, buffers.floor, 0);
    device.cmd_push_constants(
        cb,
        pipelines.floor.layout,
        vk::ShaderStageFlags::VERTEX,
        FloorPushConstants::VERTEX_OFFSET,
        &push.vertex_bytes(),
    );
    device.cmd_push_constants(
        cb,
        pipelines.floor.layout,
        vk::ShaderStageFlags::FRAGMENT,
        FloorPushConstants::FRAGMENT_OFFSET,
        &push.fragment_bytes(),
    );
    device.cmd_draw(cb, FLOOR_VERTEX_COUNT, 1);

    // Items
    let mesh = buffers.mesh(state.use_logo);
    let slot_offset = uniforms.slot_offset(host.current_frame());
    let dynamic_offset = command_u32("dynamic uniform offset", slot_offset)?;
    device.cmd_bind_pipeline(cb, pipelines.item.pipeline);
    device.cmd_bind_vertex_buffer(cb, 0, mesh.buffer, 0);
    device.cmd_bind_vertex_buffer(cb, 1, instance_buffer.buffer, 0);
    device.cmd_bind_descriptor_set(
        cb,
        pipelines.item.layout,
        pipelines.item.descriptor_set,
        &[dynamic_offset, dynamic_offset],
    );

    if state.animating {
        state.rotation += ctx.rotation_step;
    }
    if state.animating || state.view_projection_dirty > 0 {
        state.view_projection_dirty = state.view_projection_dirty.saturating_sub(1);
        let model = item_model(state.use_logo, state.rotation);
        let slot = ItemUniforms {
            vertex: VertexUniforms {
                view_projection,
                model,
                model_normal: normal_matrix(&model),
            },
            fragment: FragmentUniforms {
                eye_position: eye_position(&view),
                material: PhongMaterial::default(),
                light: PointLight::new(ctx.light_position),
            },
        };
        buffers.write_uniforms(device, slot_offset, &slot.to_slot_bytes(&uniforms))?;
    }

    let instance_count = command_u32("instance count", state.instances.requested() as u64)?;
    device.cmd_draw(cb, mesh.vertex_count, instance_count);
    device.cmd_end_render_pass(cb);

    Ok(())
}
