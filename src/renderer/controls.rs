//! Control-layer handle to a running renderer.

use std::sync::Arc;

use parking_lot::Mutex;

use super::state::RenderState;
use crate::backend::SurfaceHost;
use crate::scene::Camera;

/// Camera and scene controls usable from the UI thread.
///
/// Clone is cheap. Every call takes the renderer's state lock, so it waits
/// for a frame build in progress.
#[derive(Clone)]
pub struct RendererControls {
    state: Arc<Mutex<RenderState>>,
    host: Arc<dyn SurfaceHost>,
    instance_step: usize,
}

impl RendererControls {
    pub(crate) fn new(
        state: Arc<Mutex<RenderState>>,
        host: Arc<dyn SurfaceHost>,
        instance_step: usize,
    ) -> Self {
        Self {
            state,
            host,
            instance_step,
        }
    }

    fn with_camera(&self, update: impl FnOnce(&mut Camera)) {
        let frame_count = self.host.concurrent_frame_count();
        let mut state = self.state.lock();
        update(&mut state.camera);
        state.mark_view_projection_dirty(frame_count);
    }

    pub fn yaw(&self, degrees: f32) {
        self.with_camera(|camera| camera.yaw(degrees));
    }

    pub fn pitch(&self, degrees: f32) {
        self.with_camera(|camera| camera.pitch(degrees));
    }

    pub fn walk(&self, amount: f32) {
        self.with_camera(|camera| camera.walk(amount));
    }

    pub fn strafe(&self, amount: f32) {
        self.with_camera(|camera| camera.strafe(amount));
    }

    /// Snapshot of the camera.
    pub fn camera(&self) -> Camera {
        self.state.lock().camera.clone()
    }

    /// Add one step of instances, up to the maximum. Returns the new count.
    pub fn add_instances(&self) -> usize {
        let count = self.state.lock().instances.grow(self.instance_step);
        log::debug!("Instance count is now {count}");
        count
    }

    pub fn instance_count(&self) -> usize {
        self.state.lock().instances.requested()
    }

    pub fn max_instances(&self) -> usize {
        self.state.lock().instances.max()
    }

    /// Flip the animation flag and return the new value.
    pub fn toggle_animation(&self) -> bool {
        let mut state = self.state.lock();
        state.animating = !state.animating;
        state.animating
    }

    pub fn set_animating(&self, animating: bool) {
        self.state.lock().animating = animating;
    }

    pub fn is_animating(&self) -> bool {
        self.state.lock().animating
    }

    /// Draw the logo mesh instead of the block.
    ///
    /// Without animation nothing else schedules a frame, so one is requested.
    pub fn set_use_logo(&self, use_logo: bool) {
        let frame_count = self.host.concurrent_frame_count();
        let animating = {
            let mut state = self.state.lock();
            state.use_logo = use_logo;
            state.mark_view_projection_dirty(frame_count);
            state.animating
        };
        if !animating {
            self.host.request_update();
        }
    }

    pub fn uses_logo(&self) -> bool {
        self.state.lock().use_logo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyDevice, DummySurface};
    use crate::config::RendererConfig;
    use glam::Vec3;

    fn controls() -> (RendererControls, Arc<DummySurface>) {
        let surface = Arc::new(DummySurface::new(Arc::new(DummyDevice::new())));
        let config = RendererConfig::new().with_instance_seed(1);
        let state = Arc::new(Mutex::new(RenderState::new(&config)));
        (
            RendererControls::new(state, surface.clone(), config.instance_step),
            surface,
        )
    }

    #[test]
    fn test_add_instances_steps_to_cap() {
        let (controls, _) = controls();
        assert_eq!(controls.instance_count(), 128);
        for _ in 0..4 {
            controls.add_instances();
        }
        assert_eq!(controls.instance_count(), 192);
        for _ in 0..2000 {
            controls.add_instances();
        }
        assert_eq!(controls.instance_count(), controls.max_instances());
    }

    #[test]
    fn test_camera_moves_mark_slots_dirty() {
        let (controls, _) = controls();
        controls.walk(1.0);
        assert!(controls
            .camera()
            .position()
            .abs_diff_eq(Vec3::new(0.0, 0.0, 19.0), 1e-5));
        assert_eq!(controls.state.lock().view_projection_dirty, 2);
    }

    #[test]
    fn test_logo_toggle_requests_update_when_idle() {
        let (controls, surface) = controls();
        controls.set_animating(false);
        controls.set_use_logo(true);
        assert!(controls.uses_logo());
        assert_eq!(surface.update_requests(), 1);

        controls.set_animating(true);
        controls.set_use_logo(false);
        assert_eq!(surface.update_requests(), 1);
        assert!(!controls.toggle_animation());
        assert!(!controls.is_animating());
    }
}
