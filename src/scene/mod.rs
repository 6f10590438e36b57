//! Scene state fed into frame building: the camera, per-instance data and
//! the uniform data layout.

mod camera;
mod instances;
mod uniforms;

pub use camera::*;
pub use instances::*;
pub use uniforms::*;
