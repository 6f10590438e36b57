//! Backend abstraction layer
//!
//! Provides the device and surface traits the renderer is written against,
//! a Vulkan implementation over `ash`, and a dummy implementation for tests.

pub mod dummy;
pub mod traits;
pub mod types;
pub mod vulkan;

pub use dummy::{DummyDevice, DummySurface};
pub use traits::*;
pub use types::*;
pub use vulkan::VulkanDevice;
