//! Instanced Renderer - a Vulkan renderer for thousands of instanced meshes
//!
//! Draws a floor plane and an instanced item mesh, each instance offset and
//! tinted by generated per-instance data. Device work is split across a
//! background task pool:
//! - shader modules load and compile asynchronously
//! - pipelines are created on one background task after the pipeline cache
//! - every frame is recorded on a worker while the surface owner paces frames
//!
//! The renderer talks to the device through [`backend::GpuDevice`] and to the
//! window system through [`backend::SurfaceHost`]. A Vulkan implementation
//! over `ash` and a dummy implementation for GPU-less testing are provided.

pub mod align;
pub mod assets;
pub mod backend;
pub mod config;
pub mod error;
pub mod input;
pub mod renderer;
pub mod scene;
pub mod task;

pub use config::{AssetPaths, RendererConfig};
pub use error::{RendererError, RendererResult};
pub use input::{CameraCommands, CameraInput};
pub use renderer::{AsyncShaderModule, FrameRenderer, Lifecycle, RendererControls};
