//! Dummy GPU backend for testing and development.
//!
//! [`DummyDevice`] performs no GPU work. It hands out fabricated handles,
//! keeps a byte array for every allocated memory block, tracks which objects
//! are alive, logs every create/destroy call in order and records commands
//! per command buffer. Individual operations can be made to fail.

mod surface;

pub use surface::DummySurface;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;

use crate::align::aligned;
use crate::backend::traits::GpuDevice;
use crate::backend::types::*;

/// Kinds of objects tracked by the live-object ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    ShaderModule,
    PipelineCache,
    DescriptorPool,
    DescriptorSetLayout,
    PipelineLayout,
    Pipeline,
    Buffer,
    Memory,
}

/// One create or destroy call, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedCall {
    pub operation: &'static str,
    pub handle: u64,
}

/// A command recorded into a command buffer.
#[derive(Debug, Clone)]
pub enum RecordedCommand {
    BeginRenderPass(RenderPassBegin),
    EndRenderPass,
    SetViewport(vk::Viewport),
    SetScissor(vk::Rect2D),
    BindPipeline(vk::Pipeline),
    BindVertexBuffer {
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    },
    BindDescriptorSet {
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
        dynamic_offsets: Vec<u32>,
    },
    PushConstants {
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: Vec<u8>,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
}

/// What the dummy device knows about a buffer.
#[derive(Debug, Clone)]
pub struct BufferInfo {
    pub label: &'static str,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub requirements: vk::MemoryRequirements,
    /// Memory handle and offset once bound
    pub binding: Option<(vk::DeviceMemory, vk::DeviceSize)>,
}

#[derive(Default)]
struct DummyState {
    live: HashMap<u64, ObjectKind>,
    calls: Vec<LoggedCall>,
    /// Destroy calls on handles that were never created or already destroyed
    invalid_destroys: Vec<LoggedCall>,
    memory: HashMap<u64, Vec<u8>>,
    memory_types: HashMap<u64, u32>,
    buffers: HashMap<u64, BufferInfo>,
    pipelines: HashMap<u64, GraphicsPipelineDescriptor>,
    pipeline_layouts: HashMap<u64, PipelineLayoutDescriptor>,
    descriptor_pools: HashMap<u64, DescriptorPoolDescriptor>,
    descriptor_set_layouts: HashMap<u64, Vec<DescriptorBinding>>,
    descriptor_writes: Vec<DescriptorBufferWrite>,
    commands: HashMap<u64, Vec<RecordedCommand>>,
    failures: HashMap<&'static str, vk::Result>,
    buffer_alignment: vk::DeviceSize,
}

/// Dummy GPU device.
pub struct DummyDevice {
    state: Mutex<DummyState>,
    next_handle: AtomicU64,
}

impl DummyDevice {
    /// Create a dummy device reporting a 16-byte buffer memory alignment.
    pub fn new() -> Self {
        Self::with_buffer_alignment(16)
    }

    /// Create a dummy device whose buffers report `alignment` in their memory
    /// requirements, with sizes rounded up to it.
    pub fn with_buffer_alignment(alignment: vk::DeviceSize) -> Self {
        Self {
            state: Mutex::new(DummyState {
                buffer_alignment: alignment,
                ..Default::default()
            }),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    /// Fabricate a fresh non-null raw handle.
    pub fn next_raw_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Make every later call to `operation` fail with `result`.
    pub fn fail_on(&self, operation: &'static str, result: vk::Result) {
        self.state.lock().failures.insert(operation, result);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Number of live objects.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Number of live objects of one kind.
    pub fn live_count_of(&self, kind: ObjectKind) -> usize {
        self.state.lock().live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, raw: u64) -> bool {
        self.state.lock().live.contains_key(&raw)
    }

    /// Destroy calls that hit an unknown or already destroyed handle.
    pub fn invalid_destroys(&self) -> Vec<LoggedCall> {
        self.state.lock().invalid_destroys.clone()
    }

    pub fn invalid_destroy_count(&self) -> usize {
        self.state.lock().invalid_destroys.len()
    }

    /// Every create and destroy call made so far.
    pub fn calls(&self) -> Vec<LoggedCall> {
        self.state.lock().calls.clone()
    }

    /// Count of calls to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn buffer_info(&self, buffer: vk::Buffer) -> Option<BufferInfo> {
        self.state.lock().buffers.get(&buffer.as_raw()).cloned()
    }

    /// Buffers created with the given label, oldest first.
    pub fn buffers_labeled(&self, label: &str) -> Vec<vk::Buffer> {
        let mut raw: Vec<u64> = self
            .state
            .lock()
            .buffers
            .iter()
            .filter(|(_, info)| info.label == label)
            .map(|(raw, _)| *raw)
            .collect();
        raw.sort_unstable();
        raw.into_iter().map(vk::Buffer::from_raw).collect()
    }

    /// Size in bytes of an allocated memory block.
    pub fn memory_size(&self, memory: vk::DeviceMemory) -> Option<usize> {
        self.state.lock().memory.get(&memory.as_raw()).map(Vec::len)
    }

    pub fn memory_type_of(&self, memory: vk::DeviceMemory) -> Option<u32> {
        self.state.lock().memory_types.get(&memory.as_raw()).copied()
    }

    /// Copy `len` bytes of a memory block starting at `offset`.
    pub fn read_memory(&self, memory: vk::DeviceMemory, offset: usize, len: usize) -> Vec<u8> {
        let state = self.state.lock();
        state
            .memory
            .get(&memory.as_raw())
            .and_then(|bytes| bytes.get(offset..offset + len))
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// Bytes backing `buffer`, read through its memory binding.
    pub fn read_buffer(&self, buffer: vk::Buffer, offset: usize, len: usize) -> Vec<u8> {
        let binding = self
            .state
            .lock()
            .buffers
            .get(&buffer.as_raw())
            .and_then(|info| info.binding);
        match binding {
            Some((memory, base)) => self.read_memory(memory, base as usize + offset, len),
            None => Vec::new(),
        }
    }

    pub fn pipeline(&self, pipeline: vk::Pipeline) -> Option<GraphicsPipelineDescriptor> {
        self.state.lock().pipelines.get(&pipeline.as_raw()).cloned()
    }

    pub fn pipeline_layout(&self, layout: vk::PipelineLayout) -> Option<PipelineLayoutDescriptor> {
        self.state
            .lock()
            .pipeline_layouts
            .get(&layout.as_raw())
            .cloned()
    }

    pub fn descriptor_pool(&self, pool: vk::DescriptorPool) -> Option<DescriptorPoolDescriptor> {
        self.state
            .lock()
            .descriptor_pools
            .get(&pool.as_raw())
            .cloned()
    }

    pub fn descriptor_set_layout(
        &self,
        layout: vk::DescriptorSetLayout,
    ) -> Option<Vec<DescriptorBinding>> {
        self.state
            .lock()
            .descriptor_set_layouts
            .get(&layout.as_raw())
            .cloned()
    }

    pub fn descriptor_writes(&self) -> Vec<DescriptorBufferWrite> {
        self.state.lock().descriptor_writes.clone()
    }

    /// Commands recorded into `cb` since it was last reset.
    pub fn commands(&self, cb: vk::CommandBuffer) -> Vec<RecordedCommand> {
        self.state
            .lock()
            .commands
            .get(&cb.as_raw())
            .cloned()
            .unwrap_or_default()
    }

    pub fn reset_commands(&self, cb: vk::CommandBuffer) {
        self.state.lock().commands.remove(&cb.as_raw());
    }

    fn check(state: &DummyState, operation: &'static str) -> Result<(), vk::Result> {
        match state.failures.get(operation) {
            Some(result) => {
                log::trace!("DummyDevice: injected failure for {operation}: {result:?}");
                Err(*result)
            }
            None => Ok(()),
        }
    }

    fn create<H: Handle>(
        &self,
        state: &mut DummyState,
        operation: &'static str,
        kind: ObjectKind,
    ) -> Result<H, vk::Result> {
        Self::check(state, operation)?;
        let raw = self.next_raw_handle();
        state.live.insert(raw, kind);
        state.calls.push(LoggedCall {
            operation,
            handle: raw,
        });
        log::trace!("DummyDevice: {operation} -> {raw:#x}");
        Ok(H::from_raw(raw))
    }

    fn destroy<H: Handle>(&self, operation: &'static str, handle: H) {
        let raw = handle.as_raw();
        if raw == 0 {
            return;
        }
        let mut state = self.state.lock();
        let call = LoggedCall {
            operation,
            handle: raw,
        };
        if state.live.remove(&raw).is_none() {
            log::warn!("DummyDevice: {operation} on unknown or destroyed handle {raw:#x}");
            state.invalid_destroys.push(call);
        }
        state.calls.push(call);
        log::trace!("DummyDevice: {operation} {raw:#x}");
    }

    fn record(&self, cb: vk::CommandBuffer, command: RecordedCommand) {
        self.state
            .lock()
            .commands
            .entry(cb.as_raw())
            .or_default()
            .push(command);
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for DummyDevice {
    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule, vk::Result> {
        let mut state = self.state.lock();
        if code.is_empty() {
            return Err(vk::Result::ERROR_INVALID_SHADER_NV);
        }
        self.create(&mut state, "create_shader_module", ObjectKind::ShaderModule)
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.destroy("destroy_shader_module", module)
    }

    fn create_pipeline_cache(&self) -> Result<vk::PipelineCache, vk::Result> {
        let mut state = self.state.lock();
        self.create(&mut state, "create_pipeline_cache", ObjectKind::PipelineCache)
    }

    fn destroy_pipeline_cache(&self, cache: vk::PipelineCache) {
        self.destroy("destroy_pipeline_cache", cache)
    }

    fn create_descriptor_pool(
        &self,
        desc: &DescriptorPoolDescriptor,
    ) -> Result<vk::DescriptorPool, vk::Result> {
        let mut state = self.state.lock();
        let pool: vk::DescriptorPool =
            self.create(&mut state, "create_descriptor_pool", ObjectKind::DescriptorPool)?;
        state.descriptor_pools.insert(pool.as_raw(), desc.clone());
        Ok(pool)
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.destroy("destroy_descriptor_pool", pool)
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<vk::DescriptorSetLayout, vk::Result> {
        let mut state = self.state.lock();
        let layout: vk::DescriptorSetLayout = self.create(
            &mut state,
            "create_descriptor_set_layout",
            ObjectKind::DescriptorSetLayout,
        )?;
        state
            .descriptor_set_layouts
            .insert(layout.as_raw(), bindings.to_vec());
        Ok(layout)
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.destroy("destroy_descriptor_set_layout", layout)
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet, vk::Result> {
        let mut state = self.state.lock();
        Self::check(&state, "allocate_descriptor_set")?;
        if !state.live.contains_key(&pool.as_raw()) || !state.live.contains_key(&layout.as_raw())
        {
            return Err(vk::Result::ERROR_UNKNOWN);
        }
        let raw = self.next_raw_handle();
        state.calls.push(LoggedCall {
            operation: "allocate_descriptor_set",
            handle: raw,
        });
        Ok(vk::DescriptorSet::from_raw(raw))
    }

    fn update_descriptor_sets(&self, writes: &[DescriptorBufferWrite]) {
        let mut state = self.state.lock();
        state.calls.push(LoggedCall {
            operation: "update_descriptor_sets",
            handle: 0,
        });
        state.descriptor_writes.extend_from_slice(writes);
    }

    fn create_pipeline_layout(
        &self,
        desc: &PipelineLayoutDescriptor,
    ) -> Result<vk::PipelineLayout, vk::Result> {
        let mut state = self.state.lock();
        let layout: vk::PipelineLayout =
            self.create(&mut state, "create_pipeline_layout", ObjectKind::PipelineLayout)?;
        state.pipeline_layouts.insert(layout.as_raw(), desc.clone());
        Ok(layout)
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.destroy("destroy_pipeline_layout", layout)
    }

    fn create_graphics_pipeline(
        &self,
        cache: vk::PipelineCache,
        desc: &GraphicsPipelineDescriptor,
    ) -> Result<vk::Pipeline, vk::Result> {
        let mut state = self.state.lock();
        for raw in [
            cache.as_raw(),
            desc.vertex_module.as_raw(),
            desc.fragment_module.as_raw(),
            desc.layout.as_raw(),
        ] {
            if !state.live.contains_key(&raw) {
                log::trace!("DummyDevice: pipeline `{}` uses dead handle {raw:#x}", desc.label);
                return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
            }
        }
        let pipeline: vk::Pipeline =
            self.create(&mut state, "create_graphics_pipeline", ObjectKind::Pipeline)?;
        state.pipelines.insert(pipeline.as_raw(), desc.clone());
        Ok(pipeline)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.destroy("destroy_pipeline", pipeline)
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<vk::Buffer, vk::Result> {
        let mut state = self.state.lock();
        let buffer: vk::Buffer = self.create(&mut state, "create_buffer", ObjectKind::Buffer)?;
        let alignment = state.buffer_alignment;
        state.buffers.insert(
            buffer.as_raw(),
            BufferInfo {
                label: desc.label,
                size: desc.size,
                usage: desc.usage,
                requirements: vk::MemoryRequirements {
                    size: aligned(desc.size, alignment),
                    alignment,
                    memory_type_bits: !0,
                },
                binding: None,
            },
        );
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.destroy("destroy_buffer", buffer)
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        self.state
            .lock()
            .buffers
            .get(&buffer.as_raw())
            .map(|info| info.requirements)
            .unwrap_or_default()
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        memory_type_index: u32,
    ) -> Result<vk::DeviceMemory, vk::Result> {
        let mut state = self.state.lock();
        let memory: vk::DeviceMemory =
            self.create(&mut state, "allocate_memory", ObjectKind::Memory)?;
        state.memory.insert(memory.as_raw(), vec![0; size as usize]);
        state.memory_types.insert(memory.as_raw(), memory_type_index);
        Ok(memory)
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        self.destroy("free_memory", memory)
    }

    fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<(), vk::Result> {
        let mut state = self.state.lock();
        Self::check(&state, "bind_buffer_memory")?;
        let memory_size = state
            .memory
            .get(&memory.as_raw())
            .map(|bytes| bytes.len() as vk::DeviceSize)
            .ok_or(vk::Result::ERROR_UNKNOWN)?;
        let info = state
            .buffers
            .get_mut(&buffer.as_raw())
            .ok_or(vk::Result::ERROR_UNKNOWN)?;
        if info.binding.is_some()
            || offset % info.requirements.alignment != 0
            || offset + info.requirements.size > memory_size
        {
            return Err(vk::Result::ERROR_VALIDATION_FAILED_EXT);
        }
        info.binding = Some((memory, offset));
        state.calls.push(LoggedCall {
            operation: "bind_buffer_memory",
            handle: buffer.as_raw(),
        });
        Ok(())
    }

    fn write_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        data: &[u8],
    ) -> Result<(), vk::Result> {
        let mut state = self.state.lock();
        Self::check(&state, "write_memory")?;
        let bytes = state
            .memory
            .get_mut(&memory.as_raw())
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        let start = offset as usize;
        let end = start + data.len();
        let target = bytes
            .get_mut(start..end)
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        target.copy_from_slice(data);
        state.calls.push(LoggedCall {
            operation: "write_memory",
            handle: memory.as_raw(),
        });
        log::trace!("DummyDevice: write_memory offset={} len={}", offset, data.len());
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cb: vk::CommandBuffer, begin: &RenderPassBegin) {
        self.record(cb, RecordedCommand::BeginRenderPass(*begin))
    }

    fn cmd_end_render_pass(&self, cb: vk::CommandBuffer) {
        self.record(cb, RecordedCommand::EndRenderPass)
    }

    fn cmd_set_viewport(&self, cb: vk::CommandBuffer, viewport: vk::Viewport) {
        self.record(cb, RecordedCommand::SetViewport(viewport))
    }

    fn cmd_set_scissor(&self, cb: vk::CommandBuffer, scissor: vk::Rect2D) {
        self.record(cb, RecordedCommand::SetScissor(scissor))
    }

    fn cmd_bind_pipeline(&self, cb: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.record(cb, RecordedCommand::BindPipeline(pipeline))
    }

    fn cmd_bind_vertex_buffer(
        &self,
        cb: vk::CommandBuffer,
        binding: u32,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    ) {
        self.record(
            cb,
            RecordedCommand::BindVertexBuffer {
                binding,
                buffer,
                offset,
            },
        )
    }

    fn cmd_bind_descriptor_set(
        &self,
        cb: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
        dynamic_offsets: &[u32],
    ) {
        self.record(
            cb,
            RecordedCommand::BindDescriptorSet {
                layout,
                set,
                dynamic_offsets: dynamic_offsets.to_vec(),
            },
        )
    }

    fn cmd_push_constants(
        &self,
        cb: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        self.record(
            cb,
            RecordedCommand::PushConstants {
                layout,
                stages,
                offset,
                data: data.to_vec(),
            },
        )
    }

    fn cmd_draw(&self, cb: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        self.record(
            cb,
            RecordedCommand::Draw {
                vertex_count,
                instance_count,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_desc(size: vk::DeviceSize) -> BufferDescriptor {
        BufferDescriptor {
            label: "test",
            size,
            usage: vk::BufferUsageFlags::VERTEX_BUFFER,
        }
    }

    #[test]
    fn test_handles_are_unique_and_tracked() {
        let device = DummyDevice::new();
        let a = device.create_buffer(&buffer_desc(4)).unwrap();
        let b = device.create_buffer(&buffer_desc(4)).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, vk::Buffer::null());
        assert_eq!(device.live_count_of(ObjectKind::Buffer), 2);

        device.destroy_buffer(a);
        assert!(!device.is_live(a.as_raw()));
        assert_eq!(device.live_count(), 1);
        assert_eq!(device.call_count("destroy_buffer"), 1);
    }

    #[test]
    fn test_double_and_unknown_destroys_are_recorded() {
        let device = DummyDevice::new();
        let buffer = device.create_buffer(&buffer_desc(4)).unwrap();
        device.destroy_buffer(buffer);
        assert_eq!(device.invalid_destroy_count(), 0);

        device.destroy_buffer(buffer);
        device.free_memory(vk::DeviceMemory::from_raw(0xdead));
        // Null handles are ignored, as on a real device.
        device.destroy_pipeline(vk::Pipeline::null());

        assert_eq!(
            device.invalid_destroys(),
            vec![
                LoggedCall {
                    operation: "destroy_buffer",
                    handle: buffer.as_raw(),
                },
                LoggedCall {
                    operation: "free_memory",
                    handle: 0xdead,
                },
            ]
        );
    }

    #[test]
    fn test_memory_requirements_follow_alignment() {
        let device = DummyDevice::with_buffer_alignment(64);
        let buffer = device.create_buffer(&buffer_desc(100)).unwrap();
        let req = device.buffer_memory_requirements(buffer);
        assert_eq!(req.size, 128);
        assert_eq!(req.alignment, 64);
    }

    #[test]
    fn test_bind_checks_alignment_and_bounds() {
        let device = DummyDevice::with_buffer_alignment(64);
        let memory = device.allocate_memory(256, 0).unwrap();

        let misaligned = device.create_buffer(&buffer_desc(64)).unwrap();
        assert_eq!(
            device.bind_buffer_memory(misaligned, memory, 32),
            Err(vk::Result::ERROR_VALIDATION_FAILED_EXT)
        );

        let too_far = device.create_buffer(&buffer_desc(128)).unwrap();
        assert!(device.bind_buffer_memory(too_far, memory, 192).is_err());

        let ok = device.create_buffer(&buffer_desc(64)).unwrap();
        assert!(device.bind_buffer_memory(ok, memory, 128).is_ok());
        assert_eq!(device.buffer_info(ok).unwrap().binding, Some((memory, 128)));
    }

    #[test]
    fn test_write_and_read_memory() {
        let device = DummyDevice::new();
        let memory = device.allocate_memory(32, 3).unwrap();
        device.write_memory(memory, 8, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.read_memory(memory, 8, 4), vec![1, 2, 3, 4]);
        assert_eq!(device.memory_type_of(memory), Some(3));
        assert_eq!(
            device.write_memory(memory, 30, &[0; 4]),
            Err(vk::Result::ERROR_MEMORY_MAP_FAILED)
        );
    }

    #[test]
    fn test_failure_injection() {
        let device = DummyDevice::new();
        device.fail_on("create_pipeline_cache", vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        assert_eq!(
            device.create_pipeline_cache(),
            Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
        );
        assert_eq!(device.live_count(), 0);
        device.clear_failures();
        assert!(device.create_pipeline_cache().is_ok());
    }

    #[test]
    fn test_commands_recorded_per_buffer() {
        let device = DummyDevice::new();
        let cb = vk::CommandBuffer::from_raw(device.next_raw_handle());
        device.cmd_draw(cb, 3, 1);
        device.cmd_end_render_pass(cb);
        let commands = device.commands(cb);
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            commands[0],
            RecordedCommand::Draw {
                vertex_count: 3,
                instance_count: 1
            }
        ));
        device.reset_commands(cb);
        assert!(device.commands(cb).is_empty());
    }
}
