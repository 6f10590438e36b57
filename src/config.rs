//! Renderer configuration.

use glam::Vec3;

use crate::error::{RendererError, RendererResult};

/// Minimum worker count for the background task pool.
///
/// Pipeline creation blocks on shader loads and frame building blocks on
/// pipeline creation, so two workers may be parked at once and a third must
/// stay free for the loads they wait on.
pub const MIN_TASK_THREADS: usize = 3;

/// Logical asset paths for every mesh and shader the renderer loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub block_mesh: String,
    pub logo_mesh: String,
    /// Phong shader pair used for the instanced items
    pub item_vertex_shader: String,
    pub item_fragment_shader: String,
    /// Flat color shader pair used for the floor
    pub floor_vertex_shader: String,
    pub floor_fragment_shader: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            block_mesh: "meshes/block.buf".to_string(),
            logo_mesh: "meshes/logo.buf".to_string(),
            item_vertex_shader: "shaders/color_phong_vert.spv".to_string(),
            item_fragment_shader: "shaders/color_phong_frag.spv".to_string(),
            floor_vertex_shader: "shaders/color_vert.spv".to_string(),
            floor_fragment_shader: "shaders/color_frag.spv".to_string(),
        }
    }
}

/// Configuration for the frame renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Number of instances drawn before any are added
    pub initial_instance_count: usize,
    /// Hard cap on instances; the instance buffer is sized for this up front
    pub max_instances: usize,
    /// Instances added per `add_instances` call
    pub instance_step: usize,
    /// Multisample counts to request, highest supported one wins
    pub preferred_sample_counts: Vec<u32>,
    /// Starting camera position
    pub camera_position: Vec3,
    /// Position of the single point light
    pub light_position: Vec3,
    /// Item rotation advanced per built frame while animating, in degrees
    pub rotation_step_degrees: f32,
    /// Worker threads in the background task pool
    pub task_threads: usize,
    /// Seed for instance jitter; `None` draws a random seed
    pub instance_seed: Option<u64>,
    pub assets: AssetPaths,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            initial_instance_count: 128,
            max_instances: 16384,
            instance_step: 16,
            preferred_sample_counts: vec![4],
            // Light sits just behind the default camera, looking forward.
            camera_position: Vec3::new(0.0, 0.0, 20.0),
            light_position: Vec3::new(0.0, 0.0, 25.0),
            rotation_step_degrees: 0.5,
            task_threads: 4,
            instance_seed: None,
            assets: AssetPaths::default(),
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_instance_count(mut self, count: usize) -> Self {
        self.initial_instance_count = count;
        self
    }

    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances = max;
        self
    }

    pub fn with_instance_step(mut self, step: usize) -> Self {
        self.instance_step = step;
        self
    }

    pub fn with_preferred_sample_counts(mut self, counts: Vec<u32>) -> Self {
        self.preferred_sample_counts = counts;
        self
    }

    pub fn with_camera_position(mut self, position: Vec3) -> Self {
        self.camera_position = position;
        self
    }

    pub fn with_task_threads(mut self, threads: usize) -> Self {
        self.task_threads = threads;
        self
    }

    pub fn with_instance_seed(mut self, seed: u64) -> Self {
        self.instance_seed = Some(seed);
        self
    }

    pub fn with_assets(mut self, assets: AssetPaths) -> Self {
        self.assets = assets;
        self
    }

    /// Check the configuration for values the renderer cannot work with.
    pub fn validate(&self) -> RendererResult<()> {
        if self.max_instances == 0 {
            return Err(RendererError::InvalidConfig(
                "max_instances must be at least 1".into(),
            ));
        }
        if self.initial_instance_count > self.max_instances {
            return Err(RendererError::InvalidConfig(format!(
                "initial_instance_count {} exceeds max_instances {}",
                self.initial_instance_count, self.max_instances
            )));
        }
        if self.instance_step == 0 {
            return Err(RendererError::InvalidConfig(
                "instance_step must be at least 1".into(),
            ));
        }
        if self.task_threads < MIN_TASK_THREADS {
            return Err(RendererError::InvalidConfig(format!(
                "task_threads must be at least {MIN_TASK_THREADS}, got {}",
                self.task_threads
            )));
        }
        Ok(())
    }
}
