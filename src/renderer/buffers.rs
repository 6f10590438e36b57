//! Vertex, uniform and instance buffers.
//!
//! The block, logo, floor and uniform buffers share one host-visible
//! allocation, laid out in that order with each offset rounded up to the
//! buffer's memory alignment. The instance buffer gets its own allocation,
//! sized for the maximum instance count on first use and never resized.

use ash::vk;

use crate::assets::{MeshData, VERTEX_STRIDE};
use crate::backend::{BufferDescriptor, GpuDevice};
use crate::align::aligned;
use crate::error::{DeviceResultExt, RendererError, RendererResult};
use crate::scene::{InstanceDataGenerator, UniformLayout, FLOOR_VERTICES, INSTANCE_STRIDE};

/// A vertex buffer and the number of vertices it holds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MeshBuffer {
    pub buffer: vk::Buffer,
    pub vertex_count: u32,
}

/// Geometry and uniform buffers in one shared allocation.
#[derive(Debug)]
pub(crate) struct StaticBuffers {
    pub block: MeshBuffer,
    pub logo: MeshBuffer,
    pub floor: vk::Buffer,
    pub uniform: vk::Buffer,
    pub memory: vk::DeviceMemory,
    /// Offset of the uniform buffer within `memory`
    pub uniform_offset: vk::DeviceSize,
}

impl StaticBuffers {
    pub fn create(
        device: &dyn GpuDevice,
        memory_type_index: u32,
        block: &MeshData,
        logo: &MeshData,
        uniforms: &UniformLayout,
    ) -> RendererResult<Self> {
        for (name, mesh) in [("block", block), ("logo", logo)] {
            if !mesh.is_valid() {
                return Err(RendererError::MeshUnavailable(name.to_string()));
            }
        }

        let block_size = (block.vertex_count as usize * VERTEX_STRIDE) as vk::DeviceSize;
        let logo_size = (logo.vertex_count as usize * VERTEX_STRIDE) as vk::DeviceSize;
        let floor_bytes: &[u8] = bytemuck::cast_slice(&FLOOR_VERTICES);

        let block_buffer = device
            .create_buffer(&BufferDescriptor {
                label: "block vertices",
                size: block_size,
                usage: vk::BufferUsageFlags::VERTEX_BUFFER,
            })
            .or_device("create block vertex buffer")?;
        let logo_buffer = device
            .create_buffer(&BufferDescriptor {
                label: "logo vertices",
                size: logo_size,
                usage: vk::BufferUsageFlags::VERTEX_BUFFER,
            })
            .or_device("create logo vertex buffer")?;
        let floor_buffer = device
            .create_buffer(&BufferDescriptor {
                label: "floor vertices",
                size: floor_bytes.len() as vk::DeviceSize,
                usage: vk::BufferUsageFlags::VERTEX_BUFFER,
            })
            .or_device("create floor vertex buffer")?;
        let uniform_buffer = device
            .create_buffer(&BufferDescriptor {
                label: "item uniforms",
                size: uniforms.buffer_size(),
                usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            })
            .or_device("create uniform buffer")?;

        let block_req = device.buffer_memory_requirements(block_buffer);
        let logo_req = device.buffer_memory_requirements(logo_buffer);
        let floor_req = device.buffer_memory_requirements(floor_buffer);
        let uniform_req = device.buffer_memory_requirements(uniform_buffer);

        let logo_offset = aligned(block_req.size, logo_req.alignment);
        let floor_offset = aligned(logo_offset + logo_req.size, floor_req.alignment);
        let uniform_offset = aligned(floor_offset + floor_req.size, uniform_req.alignment);
        let total_size = uniform_offset + uniform_req.size;

        let memory = device
            .allocate_memory(total_size, memory_type_index)
            .or_device("allocate static buffer memory")?;
        log::debug!(
            "Static buffers: logo at {logo_offset}, floor at {floor_offset}, uniforms at {uniform_offset}, {total_size} bytes total"
        );

        device
            .bind_buffer_memory(block_buffer, memory, 0)
            .or_device("bind block vertex buffer memory")?;
        device
            .bind_buffer_memory(logo_buffer, memory, logo_offset)
            .or_device("bind logo vertex buffer memory")?;
        device
            .bind_buffer_memory(floor_buffer, memory, floor_offset)
            .or_device("bind floor vertex buffer memory")?;
        device
            .bind_buffer_memory(uniform_buffer, memory, uniform_offset)
            .or_device("bind uniform buffer memory")?;

        device
            .write_memory(memory, 0, &block.geometry)
            .or_device("write block vertices")?;
        device
            .write_memory(memory, logo_offset, &logo.geometry)
            .or_device("write logo vertices")?;
        device
            .write_memory(memory, floor_offset, floor_bytes)
            .or_device("write floor vertices")?;

        Ok(Self {
            block: MeshBuffer {
                buffer: block_buffer,
                vertex_count: block.vertex_count,
            },
            logo: MeshBuffer {
                buffer: logo_buffer,
                vertex_count: logo.vertex_count,
            },
            floor: floor_buffer,
            uniform: uniform_buffer,
            memory,
            uniform_offset,
        })
    }

    /// Write one frame slot of uniform data.
    pub fn write_uniforms(
        &self,
        device: &dyn GpuDevice,
        slot_offset: vk::DeviceSize,
        bytes: &[u8],
    ) -> RendererResult<()> {
        device
            .write_memory(self.memory, self.uniform_offset + slot_offset, bytes)
            .or_device("write uniform data")
    }

    pub fn mesh(&self, use_logo: bool) -> MeshBuffer {
        if use_logo {
            self.logo
        } else {
            self.block
        }
    }

    pub fn destroy_buffers(&self, device: &dyn GpuDevice) {
        device.destroy_buffer(self.block.buffer);
        device.destroy_buffer(self.logo.buffer);
        device.destroy_buffer(self.floor);
        device.destroy_buffer(self.uniform);
    }

    /// Free the shared allocation. The buffers must be destroyed first.
    pub fn free_memory(self, device: &dyn GpuDevice) {
        device.free_memory(self.memory);
    }
}

/// Per-instance vertex buffer.
#[derive(Debug)]
pub(crate) struct InstanceBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    /// Instance count of the last upload
    uploaded: usize,
}

impl InstanceBuffer {
    /// Allocate room for `capacity` instances.
    pub fn create(
        device: &dyn GpuDevice,
        memory_type_index: u32,
        capacity: usize,
    ) -> RendererResult<Self> {
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: "instances",
                size: (capacity * INSTANCE_STRIDE) as vk::DeviceSize,
                usage: vk::BufferUsageFlags::VERTEX_BUFFER,
            })
            .or_device("create instance buffer")?;
        let requirements = device.buffer_memory_requirements(buffer);
        let memory = device
            .allocate_memory(requirements.size, memory_type_index)
            .or_device("allocate instance buffer memory")?;
        device
            .bind_buffer_memory(buffer, memory, 0)
            .or_device("bind instance buffer memory")?;
        log::debug!("Instance buffer allocated for {capacity} instances");

        Ok(Self {
            buffer,
            memory,
            uploaded: 0,
        })
    }

    /// Bring the buffer up to the generator's requested count.
    ///
    /// No-op when that many instances are already uploaded. Otherwise any
    /// missing records are generated and the whole requested range is
    /// written.
    pub fn sync(
        &mut self,
        device: &dyn GpuDevice,
        instances: &mut InstanceDataGenerator,
    ) -> RendererResult<()> {
        if self.uploaded == instances.requested() {
            return Ok(());
        }
        instances.generate();
        device
            .write_memory(self.memory, 0, instances.as_bytes())
            .or_device("write instance data")?;
        self.uploaded = instances.requested();
        Ok(())
    }

    pub fn destroy_buffer(&self, device: &dyn GpuDevice) {
        device.destroy_buffer(self.buffer);
    }

    /// Free the backing allocation. The buffer must be destroyed first.
    pub fn free_memory(self, device: &dyn GpuDevice) {
        device.free_memory(self.memory);
    }
}
