//! Window input mapped to camera commands.
//!
//! Dragging with the left mouse button turns the camera: every ten pixels of
//! vertical motion pitch it one degree and every ten pixels of horizontal
//! motion yaw it one degree. W/S walk and A/D strafe, in steps of 0.1, or 1.0
//! while Shift is held.

use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::renderer::RendererControls;

const SLOW_STEP: f32 = 0.1;
const FAST_STEP: f32 = 1.0;
/// Pixels of drag per degree of rotation
const PIXELS_PER_DEGREE: f32 = 10.0;

/// Receiver of camera movement commands.
pub trait CameraCommands {
    fn yaw(&self, degrees: f32);
    fn pitch(&self, degrees: f32);
    fn walk(&self, amount: f32);
    fn strafe(&self, amount: f32);
}

impl CameraCommands for RendererControls {
    fn yaw(&self, degrees: f32) {
        RendererControls::yaw(self, degrees)
    }

    fn pitch(&self, degrees: f32) {
        RendererControls::pitch(self, degrees)
    }

    fn walk(&self, amount: f32) {
        RendererControls::walk(self, amount)
    }

    fn strafe(&self, amount: f32) {
        RendererControls::strafe(self, amount)
    }
}

/// Mouse and keyboard state for camera control.
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    cursor: Option<(i32, i32)>,
    dragging: bool,
    shift: bool,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a window event. Returns true if it was used.
    pub fn handle_window_event(
        &mut self,
        event: &WindowEvent,
        camera: &impl CameraCommands,
    ) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_button(*button, *state == ElementState::Pressed)
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as i32, position.y as i32, camera)
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.set_shift(modifiers.state().shift_key());
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return false;
                }
                match event.physical_key {
                    PhysicalKey::Code(code) => self.key_pressed(code, camera),
                    PhysicalKey::Unidentified(_) => false,
                }
            }
            _ => false,
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) -> bool {
        if button != MouseButton::Left {
            return false;
        }
        self.dragging = pressed;
        true
    }

    /// Cursor moved to `(x, y)` in physical pixels.
    pub fn cursor_moved(&mut self, x: i32, y: i32, camera: &impl CameraCommands) -> bool {
        let previous = self.cursor.replace((x, y));
        if !self.dragging {
            return false;
        }
        let Some((last_x, last_y)) = previous else {
            return false;
        };

        let dx = x - last_x;
        let dy = y - last_y;
        if dy != 0 {
            camera.pitch(dy as f32 / PIXELS_PER_DEGREE);
        }
        if dx != 0 {
            camera.yaw(dx as f32 / PIXELS_PER_DEGREE);
        }
        true
    }

    pub fn set_shift(&mut self, held: bool) {
        self.shift = held;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn key_pressed(&mut self, key: KeyCode, camera: &impl CameraCommands) -> bool {
        let amount = if self.shift { FAST_STEP } else { SLOW_STEP };
        match key {
            KeyCode::KeyW => camera.walk(amount),
            KeyCode::KeyS => camera.walk(-amount),
            KeyCode::KeyA => camera.strafe(-amount),
            KeyCode::KeyD => camera.strafe(amount),
            _ => return false,
        }
        true
    }
}
