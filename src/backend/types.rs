//! Backend-neutral descriptors passed to [`GpuDevice`](super::GpuDevice).
//!
//! These are owned, `Send` data. The Vulkan backend translates them into
//! `ash` create-info structs at the call site; the dummy backend records them
//! for inspection.

use ash::vk;

/// Buffer creation parameters
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: &'static str,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
}

/// Descriptor pool creation parameters
#[derive(Debug, Clone)]
pub struct DescriptorPoolDescriptor {
    pub max_sets: u32,
    pub pool_sizes: Vec<vk::DescriptorPoolSize>,
}

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub stages: vk::ShaderStageFlags,
}

/// A buffer range written into one descriptor set binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBufferWrite {
    pub set: vk::DescriptorSet,
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

/// Pipeline layout creation parameters
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutDescriptor {
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}

/// Graphics pipeline creation parameters.
///
/// Every pipeline uses entry point `main` for both stages, one dynamic
/// viewport and scissor, fill mode, depth test and write, and a single
/// opaque color attachment.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor {
    pub label: &'static str,
    pub vertex_module: vk::ShaderModule,
    pub fragment_module: vk::ShaderModule,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub samples: vk::SampleCountFlags,
    pub depth_compare: vk::CompareOp,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
}

/// Render pass begin parameters.
///
/// Attachments are cleared in order color, depth-stencil, then the color
/// resolve target when present; `clear_value_count` selects how many of
/// those three are supplied.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassBegin {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub clear_value_count: u32,
}

impl RenderPassBegin {
    pub(crate) fn clear_values(&self) -> [vk::ClearValue; 3] {
        let color = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        };
        let depth_stencil = vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: self.clear_depth,
                stencil: self.clear_stencil,
            },
        };
        [color, depth_stencil, color]
    }
}
