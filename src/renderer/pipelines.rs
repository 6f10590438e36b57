//! Pipeline cache, item pipeline and floor pipeline.
//!
//! All three are created on one background task, cache first. Each pipeline
//! waits for its own shader modules right before it is created, so shader
//! loads overlap with cache creation and with each other.

use std::sync::Arc;

use ash::vk;

use super::shader::AsyncShaderModule;
use crate::assets::VERTEX_STRIDE;
use crate::backend::{
    DescriptorBinding, DescriptorBufferWrite, DescriptorPoolDescriptor, GpuDevice,
    GraphicsPipelineDescriptor, PipelineLayoutDescriptor,
};
use crate::error::{DeviceResultExt, RendererResult};
use crate::scene::{FloorPushConstants, UniformLayout, INSTANCE_STRIDE};

const FLOAT3: vk::Format = vk::Format::R32G32B32_SFLOAT;
/// Byte offset of the normal in an interleaved mesh vertex
const NORMAL_OFFSET: u32 = 5 * 4;
const FLOOR_VERTEX_STRIDE: u32 = 3 * 4;

/// The four shader handles the pipelines are built from.
#[derive(Clone)]
pub(crate) struct ShaderSet {
    pub item_vertex: AsyncShaderModule,
    pub item_fragment: AsyncShaderModule,
    pub floor_vertex: AsyncShaderModule,
    pub floor_fragment: AsyncShaderModule,
}

impl ShaderSet {
    pub fn new() -> Self {
        Self {
            item_vertex: AsyncShaderModule::new("item vertex"),
            item_fragment: AsyncShaderModule::new("item fragment"),
            floor_vertex: AsyncShaderModule::new("floor vertex"),
            floor_fragment: AsyncShaderModule::new("floor fragment"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AsyncShaderModule> {
        [
            &self.item_vertex,
            &self.item_fragment,
            &self.floor_vertex,
            &self.floor_fragment,
        ]
        .into_iter()
    }
}

/// Surface state the pipelines are compiled against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineTarget {
    pub samples: vk::SampleCountFlags,
    pub render_pass: vk::RenderPass,
}

/// Instanced item pipeline with its dynamic uniform descriptor set.
#[derive(Debug)]
pub(crate) struct ItemPipeline {
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub descriptor_set: vk::DescriptorSet,
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl ItemPipeline {
    fn create(
        device: &dyn GpuDevice,
        cache: vk::PipelineCache,
        shaders: &ShaderSet,
        target: PipelineTarget,
    ) -> RendererResult<Self> {
        let descriptor_pool = device
            .create_descriptor_pool(&DescriptorPoolDescriptor {
                max_sets: 1,
                pool_sizes: vec![vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                    descriptor_count: 2,
                }],
            })
            .or_device("create descriptor pool")?;

        let descriptor_set_layout = device
            .create_descriptor_set_layout(&[
                DescriptorBinding {
                    binding: 0,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                    stages: vk::ShaderStageFlags::VERTEX,
                },
                DescriptorBinding {
                    binding: 1,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                    stages: vk::ShaderStageFlags::FRAGMENT,
                },
            ])
            .or_device("create descriptor set layout")?;

        let descriptor_set = device
            .allocate_descriptor_set(descriptor_pool, descriptor_set_layout)
            .or_device("allocate descriptor set")?;

        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                set_layouts: vec![descriptor_set_layout],
                push_constant_ranges: Vec::new(),
            })
            .or_device("create item pipeline layout")?;

        let vertex_module = shaders.item_vertex.require()?;
        let fragment_module = shaders.item_fragment.require()?;

        let desc = GraphicsPipelineDescriptor {
            label: "item",
            vertex_module,
            fragment_module,
            vertex_bindings: vec![
                vk::VertexInputBindingDescription {
                    binding: 0,
                    stride: VERTEX_STRIDE as u32,
                    input_rate: vk::VertexInputRate::VERTEX,
                },
                vk::VertexInputBindingDescription {
                    binding: 1,
                    stride: INSTANCE_STRIDE as u32,
                    input_rate: vk::VertexInputRate::INSTANCE,
                },
            ],
            vertex_attributes: vec![
                attribute(0, 0, 0),
                attribute(1, 0, NORMAL_OFFSET),
                attribute(2, 1, 0),
                attribute(3, 1, 12),
            ],
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            samples: target.samples,
            depth_compare: vk::CompareOp::LESS_OR_EQUAL,
            layout,
            render_pass: target.render_pass,
        };
        let pipeline = device
            .create_graphics_pipeline(cache, &desc)
            .or_device("create item pipeline")?;

        Ok(Self {
            descriptor_pool,
            descriptor_set_layout,
            descriptor_set,
            layout,
            pipeline,
        })
    }

    /// Point both uniform bindings at the start of the uniform buffer. The
    /// frame slot is selected with dynamic offsets at bind time.
    pub fn write_descriptors(
        &self,
        device: &dyn GpuDevice,
        uniform_buffer: vk::Buffer,
        uniforms: &UniformLayout,
    ) {
        device.update_descriptor_sets(&[
            DescriptorBufferWrite {
                set: self.descriptor_set,
                binding: 0,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                buffer: uniform_buffer,
                offset: 0,
                range: uniforms.vertex_size,
            },
            DescriptorBufferWrite {
                set: self.descriptor_set,
                binding: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                buffer: uniform_buffer,
                offset: uniforms.vertex_size,
                range: uniforms.fragment_size,
            },
        ]);
    }
}

/// Floor pipeline. Its data arrives entirely through push constants.
#[derive(Debug)]
pub(crate) struct FloorPipeline {
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl FloorPipeline {
    fn create(
        device: &dyn GpuDevice,
        cache: vk::PipelineCache,
        shaders: &ShaderSet,
        target: PipelineTarget,
    ) -> RendererResult<Self> {
        let layout = device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                set_layouts: Vec::new(),
                push_constant_ranges: vec![
                    vk::PushConstantRange {
                        stage_flags: vk::ShaderStageFlags::VERTEX,
                        offset: FloorPushConstants::VERTEX_OFFSET,
                        size: FloorPushConstants::VERTEX_SIZE,
                    },
                    vk::PushConstantRange {
                        stage_flags: vk::ShaderStageFlags::FRAGMENT,
                        offset: FloorPushConstants::FRAGMENT_OFFSET,
                        size: FloorPushConstants::FRAGMENT_SIZE,
                    },
                ],
            })
            .or_device("create floor pipeline layout")?;

        let vertex_module = shaders.floor_vertex.require()?;
        let fragment_module = shaders.floor_fragment.require()?;

        let desc = GraphicsPipelineDescriptor {
            label: "floor",
            vertex_module,
            fragment_module,
            vertex_bindings: vec![vk::VertexInputBindingDescription {
                binding: 0,
                stride: FLOOR_VERTEX_STRIDE,
                input_rate: vk::VertexInputRate::VERTEX,
            }],
            vertex_attributes: vec![attribute(0, 0, 0)],
            topology: vk::PrimitiveTopology::TRIANGLE_STRIP,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
            samples: target.samples,
            depth_compare: vk::CompareOp::LESS_OR_EQUAL,
            layout,
            render_pass: target.render_pass,
        };
        let pipeline = device
            .create_graphics_pipeline(cache, &desc)
            .or_device("create floor pipeline")?;

        Ok(Self { layout, pipeline })
    }
}

fn attribute(location: u32, binding: u32, offset: u32) -> vk::VertexInputAttributeDescription {
    vk::VertexInputAttributeDescription {
        location,
        binding,
        format: FLOAT3,
        offset,
    }
}

/// Everything the background pipeline task produces.
#[derive(Debug)]
pub(crate) struct Pipelines {
    pub cache: vk::PipelineCache,
    pub item: ItemPipeline,
    pub floor: FloorPipeline,
}

impl Pipelines {
    /// Body of the pipeline creation task.
    pub fn create(
        device: Arc<dyn GpuDevice>,
        shaders: ShaderSet,
        target: PipelineTarget,
    ) -> RendererResult<Self> {
        let device = device.as_ref();
        let cache = device
            .create_pipeline_cache()
            .or_device("create pipeline cache")?;
        let item = ItemPipeline::create(device, cache, &shaders, target)?;
        let floor = FloorPipeline::create(device, cache, &shaders, target)?;
        log::debug!("Pipelines created");
        Ok(Self { cache, item, floor })
    }

    /// Destroy descriptor objects, then pipelines, then layouts, then the cache.
    pub fn destroy(self, device: &dyn GpuDevice) {
        device.destroy_descriptor_set_layout(self.item.descriptor_set_layout);
        device.destroy_descriptor_pool(self.item.descriptor_pool);
        device.destroy_pipeline(self.item.pipeline);
        device.destroy_pipeline(self.floor.pipeline);
        device.destroy_pipeline_layout(self.item.layout);
        device.destroy_pipeline_layout(self.floor.layout);
        device.destroy_pipeline_cache(self.cache);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetSource, MemoryAssets};
    use crate::backend::dummy::ObjectKind;
    use crate::backend::DummyDevice;
    use crate::error::RendererError;
    use crate::task::TaskPool;
    use ash::vk::Handle;

    fn spirv() -> Vec<u8> {
        [0x0723_0203u32, 0x0001_0000, 0, 1, 0]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    fn loaded_shaders(device: &Arc<DummyDevice>, skip: Option<&str>) -> (TaskPool, ShaderSet) {
        let pool = TaskPool::new(3).unwrap();
        let assets = MemoryAssets::new();
        assets.insert("ok.spv", spirv());
        let assets: Arc<dyn AssetSource> = Arc::new(assets);
        let shaders = ShaderSet::new();
        for shader in shaders.iter() {
            let path = if Some(shader.label()) == skip {
                "missing.spv"
            } else {
                "ok.spv"
            };
            shader.load(&pool, device.clone(), assets.clone(), path.to_string());
        }
        (pool, shaders)
    }

    fn target() -> PipelineTarget {
        PipelineTarget {
            samples: vk::SampleCountFlags::TYPE_4,
            render_pass: vk::RenderPass::from_raw(0xabc),
        }
    }

    #[test]
    fn test_create_pipelines() {
        let device = Arc::new(DummyDevice::new());
        let (_pool, shaders) = loaded_shaders(&device, None);
        let pipelines = Pipelines::create(device.clone(), shaders, target()).unwrap();

        let item = device.pipeline(pipelines.item.pipeline).unwrap();
        assert_eq!(item.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(item.front_face, vk::FrontFace::COUNTER_CLOCKWISE);
        assert_eq!(item.samples, vk::SampleCountFlags::TYPE_4);
        assert_eq!(item.vertex_bindings[0].stride, 32);
        assert_eq!(item.vertex_bindings[1].stride, 24);
        assert_eq!(item.vertex_bindings[1].input_rate, vk::VertexInputRate::INSTANCE);
        assert_eq!(item.vertex_attributes[1].offset, 20);
        assert_eq!(item.vertex_attributes[3].offset, 12);

        let floor = device.pipeline(pipelines.floor.pipeline).unwrap();
        assert_eq!(floor.topology, vk::PrimitiveTopology::TRIANGLE_STRIP);
        assert_eq!(floor.front_face, vk::FrontFace::CLOCKWISE);
        let floor_layout = device.pipeline_layout(pipelines.floor.layout).unwrap();
        assert_eq!(floor_layout.push_constant_ranges[0].size, 64);
        assert_eq!(floor_layout.push_constant_ranges[1].offset, 64);
        assert_eq!(floor_layout.push_constant_ranges[1].size, 12);

        let pool = device.descriptor_pool(pipelines.item.descriptor_pool).unwrap();
        assert_eq!(pool.max_sets, 1);
        assert_eq!(pool.pool_sizes[0].descriptor_count, 2);

        // Cache comes first.
        let first = device
            .calls()
            .into_iter()
            .find(|c| c.operation != "create_shader_module")
            .unwrap();
        assert_eq!(first.operation, "create_pipeline_cache");
        assert_eq!(first.handle, pipelines.cache.as_raw());
    }

    #[test]
    fn test_invalid_shader_is_an_error() {
        let device = Arc::new(DummyDevice::new());
        let (_pool, shaders) = loaded_shaders(&device, Some("floor fragment"));
        let result = Pipelines::create(device.clone(), shaders, target());
        assert!(matches!(
            result,
            Err(RendererError::InvalidShader("floor fragment"))
        ));
    }

    #[test]
    fn test_device_failure_names_operation() {
        let device = Arc::new(DummyDevice::new());
        let (_pool, shaders) = loaded_shaders(&device, None);
        device.fail_on("create_descriptor_pool", vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        match Pipelines::create(device.clone(), shaders, target()) {
            Err(RendererError::Device { operation, result }) => {
                assert_eq!(operation, "create descriptor pool");
                assert_eq!(result, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_destroy_order() {
        let device = Arc::new(DummyDevice::new());
        let (_pool, shaders) = loaded_shaders(&device, None);
        let pipelines = Pipelines::create(device.clone(), shaders.clone(), target()).unwrap();
        device.clear_calls();
        pipelines.destroy(device.as_ref());

        let operations: Vec<_> = device.calls().iter().map(|c| c.operation).collect();
        assert_eq!(
            operations,
            [
                "destroy_descriptor_set_layout",
                "destroy_descriptor_pool",
                "destroy_pipeline",
                "destroy_pipeline",
                "destroy_pipeline_layout",
                "destroy_pipeline_layout",
                "destroy_pipeline_cache",
            ]
        );
        for shader in shaders.iter() {
            shader.release(device.as_ref());
        }
        assert_eq!(device.live_count_of(ObjectKind::Pipeline), 0);
        assert_eq!(device.live_count(), 0);
    }
}
