//! Uniform block layout for the item pipeline and push constants for the
//! floor pipeline.
//!
//! The item shaders read two std140 blocks through dynamic uniform buffer
//! descriptors. One shared buffer holds a slot per concurrently rendered
//! frame; each slot is the vertex block followed by the fragment block, both
//! padded to the device's uniform offset alignment.
//!
//! Vertex block:
//!
//! | Offset | Contents |
//! |---|---|
//! | 0 | view-projection `mat4` |
//! | 64 | model `mat4` |
//! | 128, 144, 160 | model-normal `mat3` columns, 12 bytes each |
//!
//! Fragment block: eye position, ambient, diffuse, specular, light position
//! and attenuation as `vec3` at a 16-byte stride from offset 0, light color at
//! 96 (12 bytes), intensity at 108, specular exponent at 112.

use ash::vk;
use glam::{Mat3, Mat4, Vec3};

use crate::align::aligned;

/// Unpadded size of the vertex block: two `mat4` and one `mat3`.
pub const VERTEX_BLOCK_SIZE: vk::DeviceSize = 2 * 64 + 48;
/// Unpadded size of the fragment block: six `vec3`, one packed `vec3`, two floats.
///
/// 116 bytes: the two trailing floats follow the 12-byte light color with
/// no padding, so the block is not a multiple of 16. Shaders rely on this.
pub const FRAGMENT_BLOCK_SIZE: vk::DeviceSize = 6 * 16 + 12 + 2 * 4;

/// Vertical field of view of the projection, in degrees
pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 1000.0;

/// Placement of the per-frame uniform slots in the shared uniform buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLayout {
    /// Vertex block size, padded to the offset alignment
    pub vertex_size: vk::DeviceSize,
    /// Fragment block size, padded to the offset alignment
    pub fragment_size: vk::DeviceSize,
    pub frame_count: u32,
}

impl UniformLayout {
    pub fn new(offset_alignment: vk::DeviceSize, frame_count: u32) -> Self {
        Self {
            vertex_size: aligned(VERTEX_BLOCK_SIZE, offset_alignment),
            fragment_size: aligned(FRAGMENT_BLOCK_SIZE, offset_alignment),
            frame_count,
        }
    }

    /// Bytes per frame slot.
    pub fn slot_size(&self) -> vk::DeviceSize {
        self.vertex_size + self.fragment_size
    }

    /// Offset of `frame`'s slot from the start of the uniform buffer.
    pub fn slot_offset(&self, frame: u32) -> vk::DeviceSize {
        vk::DeviceSize::from(frame) * self.slot_size()
    }

    /// Size of the whole uniform buffer.
    pub fn buffer_size(&self) -> vk::DeviceSize {
        self.slot_offset(self.frame_count)
    }
}

#[inline]
fn put_f32(out: &mut [u8], offset: usize, value: f32) {
    out[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

#[inline]
fn put_vec3(out: &mut [u8], offset: usize, value: Vec3) {
    out[offset..offset + 12].copy_from_slice(bytemuck::cast_slice(&value.to_array()));
}

#[inline]
fn put_mat4(out: &mut [u8], offset: usize, value: &Mat4) {
    out[offset..offset + 64].copy_from_slice(bytemuck::cast_slice(&value.to_cols_array()));
}

/// Contents of the vertex block.
#[derive(Debug, Clone, Copy)]
pub struct VertexUniforms {
    pub view_projection: Mat4,
    pub model: Mat4,
    pub model_normal: Mat3,
}

impl VertexUniforms {
    /// Serialize into the first [`VERTEX_BLOCK_SIZE`] bytes of `out`.
    pub fn write(&self, out: &mut [u8]) {
        put_mat4(out, 0, &self.view_projection);
        put_mat4(out, 64, &self.model);
        put_vec3(out, 128, self.model_normal.x_axis);
        put_vec3(out, 144, self.model_normal.y_axis);
        put_vec3(out, 160, self.model_normal.z_axis);
    }
}

/// Fixed Phong material of the items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongMaterial {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub specular_exponent: f32,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.7),
            specular: Vec3::splat(0.66),
            specular_exponent: 150.0,
        }
    }
}

/// The scene's single point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Constant, linear and quadratic attenuation factors
    pub attenuation: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl PointLight {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            color: Vec3::ONE,
            intensity: 0.8,
        }
    }
}

/// Contents of the fragment block.
#[derive(Debug, Clone, Copy)]
pub struct FragmentUniforms {
    pub eye_position: Vec3,
    pub material: PhongMaterial,
    pub light: PointLight,
}

impl FragmentUniforms {
    /// Serialize into the first [`FRAGMENT_BLOCK_SIZE`] bytes of `out`.
    pub fn write(&self, out: &mut [u8]) {
        put_vec3(out, 0, self.eye_position);
        put_vec3(out, 16, self.material.ambient);
        put_vec3(out, 32, self.material.diffuse);
        put_vec3(out, 48, self.material.specular);
        put_vec3(out, 64, self.light.position);
        put_vec3(out, 80, self.light.attenuation);
        // Light color is followed directly by the two scalars.
        put_vec3(out, 96, self.light.color);
        put_f32(out, 108, self.light.intensity);
        put_f32(out, 112, self.material.specular_exponent);
    }
}

/// Both blocks for one frame slot.
#[derive(Debug, Clone, Copy)]
pub struct ItemUniforms {
    pub vertex: VertexUniforms,
    pub fragment: FragmentUniforms,
}

impl ItemUniforms {
    /// Serialize one frame slot laid out per `layout`.
    pub fn to_slot_bytes(&self, layout: &UniformLayout) -> Vec<u8> {
        let mut bytes = vec![0u8; layout.slot_size() as usize];
        let (vertex, fragment) = bytes.split_at_mut(layout.vertex_size as usize);
        self.vertex.write(vertex);
        self.fragment.write(fragment);
        bytes
    }
}

/// Projection for a surface of `extent`, corrected into the surface's clip space.
pub fn projection_matrix(clip_correction: Mat4, extent: vk::Extent2D) -> Mat4 {
    let aspect = extent.width as f32 / extent.height.max(1) as f32;
    clip_correction
        * Mat4::perspective_rh_gl(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        )
}

/// Model matrix of the items: spinning about (1, 1, 0), the logo mesh
/// stood upright first.
pub fn item_model(use_logo: bool, rotation_degrees: f32) -> Mat4 {
    let base = if use_logo {
        Mat4::from_rotation_x(90f32.to_radians())
    } else {
        Mat4::IDENTITY
    };
    base * Mat4::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), rotation_degrees.to_radians())
}

/// Inverse transpose of the model's upper 3x3.
pub fn normal_matrix(model: &Mat4) -> Mat3 {
    Mat3::from_mat4(*model).inverse().transpose()
}

/// Camera position in world space recovered from the view matrix.
pub fn eye_position(view: &Mat4) -> Vec3 {
    view.inverse().w_axis.truncate()
}

/// Floor color pushed to the fragment stage
pub const FLOOR_COLOR: Vec3 = Vec3::new(0.67, 1.0, 0.2);

/// Quad in the XY plane, drawn as a triangle strip.
pub const FLOOR_VERTICES: [f32; 12] = [
    -1.0, -1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    1.0, -1.0, 0.0, //
    1.0, 1.0, 0.0,
];

/// Lay the quad flat below the items and stretch it into the distance.
pub fn floor_model() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, -5.0, 0.0))
        * Mat4::from_rotation_x((-90f32).to_radians())
        * Mat4::from_scale(Vec3::new(20.0, 100.0, 1.0))
}

/// Floor push constants: `mat4` for the vertex stage at offset 0, `vec3`
/// color for the fragment stage at offset 64.
#[derive(Debug, Clone, Copy)]
pub struct FloorPushConstants {
    pub mvp: Mat4,
    pub color: Vec3,
}

impl FloorPushConstants {
    pub const VERTEX_OFFSET: u32 = 0;
    pub const VERTEX_SIZE: u32 = 64;
    pub const FRAGMENT_OFFSET: u32 = 64;
    pub const FRAGMENT_SIZE: u32 = 12;

    pub fn vertex_bytes(&self) -> [u8; 64] {
        bytemuck::cast(self.mvp.to_cols_array())
    }

    pub fn fragment_bytes(&self) -> [u8; 12] {
        bytemuck::cast(self.color.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_block_sizes() {
        assert_eq!(VERTEX_BLOCK_SIZE, 176);
        assert_eq!(FRAGMENT_BLOCK_SIZE, 116);
    }

    #[test]
    fn test_layout_alignment() {
        let layout = UniformLayout::new(256, 3);
        assert_eq!(layout.vertex_size, 256);
        assert_eq!(layout.fragment_size, 256);
        assert_eq!(layout.slot_size(), 512);
        assert_eq!(layout.slot_offset(2), 1024);
        assert_eq!(layout.buffer_size(), 1536);

        let layout = UniformLayout::new(16, 2);
        assert_eq!(layout.vertex_size, 176);
        assert_eq!(layout.fragment_size, 128);
        assert_eq!(layout.buffer_size(), 608);
    }

    #[test]
    fn test_slot_bytes() {
        let layout = UniformLayout::new(64, 2);
        let model = item_model(false, 30.0);
        let uniforms = ItemUniforms {
            vertex: VertexUniforms {
                view_projection: Mat4::from_scale(Vec3::splat(2.0)),
                model,
                model_normal: normal_matrix(&model),
            },
            fragment: FragmentUniforms {
                eye_position: Vec3::new(1.0, 2.0, 3.0),
                material: PhongMaterial::default(),
                light: PointLight::new(Vec3::new(0.0, 0.0, 25.0)),
            },
        };
        let bytes = uniforms.to_slot_bytes(&layout);
        assert_eq!(bytes.len(), 192 + 128);

        assert_eq!(f32_at(&bytes, 0), 2.0);
        assert_eq!(f32_at(&bytes, 64), model.x_axis.x);
        let normal = normal_matrix(&model);
        assert_eq!(f32_at(&bytes, 144), normal.y_axis.x);
        assert_eq!(f32_at(&bytes, 168), normal.z_axis.z);
        // Padding after each normal column stays zero.
        assert_eq!(f32_at(&bytes, 140), 0.0);

        let fragment = &bytes[192..];
        assert_eq!(f32_at(fragment, 8), 3.0);
        assert_eq!(f32_at(fragment, 16), 0.05);
        assert_eq!(f32_at(fragment, 32), 0.7);
        assert_eq!(f32_at(fragment, 48), 0.66);
        assert_eq!(f32_at(fragment, 72), 25.0);
        assert_eq!(f32_at(fragment, 80), 1.0);
        assert_eq!(f32_at(fragment, 104), 1.0);
        assert_eq!(f32_at(fragment, 108), 0.8);
        assert_eq!(f32_at(fragment, 112), 150.0);
    }

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        let model = item_model(true, 47.0);
        let normal = normal_matrix(&model);
        assert!(normal.abs_diff_eq(Mat3::from_mat4(model), 1e-5));
    }

    #[test]
    fn test_eye_position_from_view() {
        let view = Mat4::from_rotation_y(0.3) * Mat4::from_translation(Vec3::new(-1.0, -2.0, -3.0));
        assert!(eye_position(&view).abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn test_floor_model_lies_flat() {
        let model = floor_model();
        let corner = model.transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!(corner.abs_diff_eq(Vec3::new(20.0, -5.0, -100.0), 1e-4));
    }

    #[test]
    fn test_floor_push_constants() {
        let push = FloorPushConstants {
            mvp: Mat4::IDENTITY,
            color: FLOOR_COLOR,
        };
        let fragment = push.fragment_bytes();
        assert_eq!(f32_at(&fragment, 0), 0.67);
        assert_eq!(f32_at(&fragment, 4), 1.0);
        assert_eq!(f32_at(&push.vertex_bytes(), 60), 1.0);
    }

    #[test]
    fn test_projection_uses_clip_correction() {
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let proj = projection_matrix(Mat4::IDENTITY, extent);
        let expected = Mat4::perspective_rh_gl(45f32.to_radians(), 800.0 / 600.0, 0.01, 1000.0);
        assert!(proj.abs_diff_eq(expected, 1e-6));
    }
}
