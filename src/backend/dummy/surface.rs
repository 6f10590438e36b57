//! Window-less surface owner for driving a renderer in tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ash::vk;
use ash::vk::Handle;
use glam::{Mat4, Vec4};
use parking_lot::{Condvar, Mutex};

use super::DummyDevice;
use crate::backend::traits::{GpuDevice, SurfaceHost};

struct FrameState {
    current_frame: u32,
    extent: vk::Extent2D,
    sample_count: u32,
    frames_ready: usize,
    update_requests: usize,
    /// `frame_ready` and `request_update` calls in arrival order
    notifications: Vec<&'static str>,
}

struct Gate {
    held: bool,
    waiting: usize,
}

/// [`SurfaceHost`] over a [`DummyDevice`].
///
/// Frames advance only when the test calls [`advance_frame`](Self::advance_frame).
/// [`hold_frames`](Self::hold_frames) makes any thread that asks for the
/// current command buffer block until [`release_frames`](Self::release_frames),
/// which lets tests observe a frame build in flight.
pub struct DummySurface {
    device: Arc<DummyDevice>,
    supported_sample_counts: Vec<u32>,
    concurrent_frames: u32,
    uniform_alignment: vk::DeviceSize,
    host_visible_memory_index: u32,
    render_pass: vk::RenderPass,
    command_buffers: Vec<vk::CommandBuffer>,
    framebuffers: Vec<vk::Framebuffer>,
    frame: Mutex<FrameState>,
    frame_signal: Condvar,
    gate: Mutex<Gate>,
    gate_signal: Condvar,
}

impl DummySurface {
    /// Two frames in flight, 800x600, 256-byte uniform offset alignment,
    /// sample counts 1, 2, 4 and 8 supported.
    pub fn new(device: Arc<DummyDevice>) -> Self {
        Self::with_options(device, 2, 256)
    }

    pub fn with_options(
        device: Arc<DummyDevice>,
        concurrent_frames: u32,
        uniform_alignment: vk::DeviceSize,
    ) -> Self {
        let render_pass = vk::RenderPass::from_raw(device.next_raw_handle());
        let command_buffers = (0..concurrent_frames)
            .map(|_| vk::CommandBuffer::from_raw(device.next_raw_handle()))
            .collect();
        let framebuffers = (0..concurrent_frames)
            .map(|_| vk::Framebuffer::from_raw(device.next_raw_handle()))
            .collect();
        Self {
            device,
            supported_sample_counts: vec![1, 2, 4, 8],
            concurrent_frames,
            uniform_alignment,
            host_visible_memory_index: 1,
            render_pass,
            command_buffers,
            framebuffers,
            frame: Mutex::new(FrameState {
                current_frame: 0,
                extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                sample_count: 1,
                frames_ready: 0,
                update_requests: 0,
                notifications: Vec::new(),
            }),
            frame_signal: Condvar::new(),
            gate: Mutex::new(Gate {
                held: false,
                waiting: 0,
            }),
            gate_signal: Condvar::new(),
        }
    }

    pub fn with_supported_sample_counts(mut self, counts: Vec<u32>) -> Self {
        self.supported_sample_counts = counts;
        self
    }

    pub fn dummy_device(&self) -> &Arc<DummyDevice> {
        &self.device
    }

    /// Current sample count as a plain number.
    pub fn sample_count(&self) -> u32 {
        self.frame.lock().sample_count
    }

    pub fn set_extent(&self, width: u32, height: u32) {
        self.frame.lock().extent = vk::Extent2D { width, height };
    }

    /// Move to the next frame slot and reset its command buffer.
    pub fn advance_frame(&self) {
        let cb = {
            let mut frame = self.frame.lock();
            frame.current_frame = (frame.current_frame + 1) % self.concurrent_frames;
            self.command_buffers[frame.current_frame as usize]
        };
        self.device.reset_commands(cb);
    }

    pub fn frames_ready(&self) -> usize {
        self.frame.lock().frames_ready
    }

    /// Block until at least `count` frames were reported ready.
    pub fn wait_for_frames_ready(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut frame = self.frame.lock();
        while frame.frames_ready < count {
            if self.frame_signal.wait_until(&mut frame, deadline).timed_out() {
                return frame.frames_ready >= count;
            }
        }
        true
    }

    pub fn update_requests(&self) -> usize {
        self.frame.lock().update_requests
    }

    /// Every `frame_ready` and `request_update` call, oldest first.
    pub fn notifications(&self) -> Vec<&'static str> {
        self.frame.lock().notifications.clone()
    }

    /// Block until at least `count` redraws were requested.
    pub fn wait_for_update_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut frame = self.frame.lock();
        while frame.update_requests < count {
            if self.frame_signal.wait_until(&mut frame, deadline).timed_out() {
                return frame.update_requests >= count;
            }
        }
        true
    }

    /// Block frame builds at their first command buffer access.
    pub fn hold_frames(&self) {
        self.gate.lock().held = true;
    }

    pub fn release_frames(&self) {
        self.gate.lock().held = false;
        self.gate_signal.notify_all();
    }

    /// Block until `count` threads are parked at the frame gate.
    pub fn wait_for_held_builds(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut gate = self.gate.lock();
        while gate.waiting < count {
            if self.gate_signal.wait_until(&mut gate, deadline).timed_out() {
                return gate.waiting >= count;
            }
        }
        true
    }
}

impl SurfaceHost for DummySurface {
    fn device(&self) -> Arc<dyn GpuDevice> {
        self.device.clone()
    }

    fn supported_sample_counts(&self) -> Vec<u32> {
        self.supported_sample_counts.clone()
    }

    fn set_sample_count(&self, count: u32) {
        if self.supported_sample_counts.contains(&count) {
            self.frame.lock().sample_count = count;
        } else {
            log::warn!("DummySurface: sample count {count} not supported");
        }
    }

    fn sample_count_flags(&self) -> vk::SampleCountFlags {
        vk::SampleCountFlags::from_raw(self.sample_count())
    }

    fn default_render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    fn uniform_buffer_offset_alignment(&self) -> vk::DeviceSize {
        self.uniform_alignment
    }

    fn host_visible_memory_index(&self) -> u32 {
        self.host_visible_memory_index
    }

    fn concurrent_frame_count(&self) -> u32 {
        self.concurrent_frames
    }

    fn current_frame(&self) -> u32 {
        self.frame.lock().current_frame
    }

    fn current_command_buffer(&self) -> vk::CommandBuffer {
        {
            let mut gate = self.gate.lock();
            if gate.held {
                gate.waiting += 1;
                self.gate_signal.notify_all();
                while gate.held {
                    self.gate_signal.wait(&mut gate);
                }
                gate.waiting -= 1;
            }
        }
        self.command_buffers[self.current_frame() as usize]
    }

    fn current_framebuffer(&self) -> vk::Framebuffer {
        self.framebuffers[self.current_frame() as usize]
    }

    fn swapchain_image_size(&self) -> vk::Extent2D {
        self.frame.lock().extent
    }

    fn clip_correction_matrix(&self) -> Mat4 {
        // Flip Y and map depth from [-1, 1] to [0, 1].
        Mat4::from_cols(
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, -1.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 0.5, 0.0),
            Vec4::new(0.0, 0.0, 0.5, 1.0),
        )
    }

    fn frame_ready(&self) {
        let mut frame = self.frame.lock();
        frame.frames_ready += 1;
        frame.notifications.push("frame_ready");
        self.frame_signal.notify_all();
    }

    fn request_update(&self) {
        let mut frame = self.frame.lock();
        frame.update_requests += 1;
        frame.notifications.push("request_update");
        self.frame_signal.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_frame_wraps() {
        let surface = DummySurface::new(Arc::new(DummyDevice::new()));
        assert_eq!(surface.current_frame(), 0);
        let first = surface.current_command_buffer();
        surface.advance_frame();
        assert_eq!(surface.current_frame(), 1);
        assert_ne!(surface.current_command_buffer(), first);
        surface.advance_frame();
        assert_eq!(surface.current_frame(), 0);
        assert_eq!(surface.current_command_buffer(), first);
    }

    #[test]
    fn test_sample_count_request() {
        let surface = DummySurface::new(Arc::new(DummyDevice::new()))
            .with_supported_sample_counts(vec![1, 2]);
        surface.set_sample_count(4);
        assert_eq!(surface.sample_count_flags(), vk::SampleCountFlags::TYPE_1);
        surface.set_sample_count(2);
        assert_eq!(surface.sample_count_flags(), vk::SampleCountFlags::TYPE_2);
    }

    #[test]
    fn test_frame_gate_blocks_until_released() {
        let surface = Arc::new(DummySurface::new(Arc::new(DummyDevice::new())));
        surface.hold_frames();

        let worker = {
            let surface = Arc::clone(&surface);
            std::thread::spawn(move || surface.current_command_buffer())
        };
        assert!(surface.wait_for_held_builds(1, Duration::from_secs(5)));
        surface.release_frames();
        assert_ne!(worker.join().unwrap(), vk::CommandBuffer::null());
    }

    #[test]
    fn test_frames_ready_wait() {
        let surface = DummySurface::new(Arc::new(DummyDevice::new()));
        assert!(!surface.wait_for_frames_ready(1, Duration::from_millis(10)));
        surface.frame_ready();
        assert!(surface.wait_for_frames_ready(1, Duration::from_millis(10)));
        assert_eq!(surface.frames_ready(), 1);

        assert!(!surface.wait_for_update_requests(1, Duration::from_millis(10)));
        surface.request_update();
        assert!(surface.wait_for_update_requests(1, Duration::from_millis(10)));
    }
}
