use glam::{Mat4, Vec2};

use crate::context::VisContext;
use crate::render::buffer::UniformBuffer;
use crate::render::types::CameraUniform;

//2D orthographic camera. half_height fixes the visible world height; the
//width follows the surface aspect ratio.
pub struct OrthographicCamera {
    position: Vec2,
    half_height: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
    dirty: bool,
}

impl Default for OrthographicCamera {
    fn default() -> Self {
        OrthographicCamera {
            position: Vec2::ZERO,
            half_height: 10.0,
            aspect_ratio: 1280.0 / 720.0,
            near: -100.0,
            far: 100.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            dirty: true,
        }
    }
}

impl OrthographicCamera {
    pub fn view_projection(&mut self) -> Mat4 {
        if self.dirty {
            self.calc_view_projection();
        }

        self.projection * self.view
    }

    fn calc_view_projection(&mut self) {
        let half_width = self.half_height * self.aspect_ratio;

        self.projection = Mat4::orthographic_rh(
            -half_width,
            half_width,
            -self.half_height,
            self.half_height,
            self.near,
            self.far,
        );

        self.view =
            Mat4::from_translation(self.position.extend(0.0)).inverse();

        self.dirty = false;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.dirty = true;
    }

    pub fn inc_pos(&mut self, inc: Vec2) {
        self.position += inc;
        self.dirty = true;
    }

    pub fn half_height(&self) -> f32 {
        self.half_height
    }

    pub fn set_half_height(&mut self, half_height: f32) {
        self.half_height = half_height;
        self.dirty = true;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.dirty = true;
    }
}

pub struct CameraBuffer {
    uniform: UniformBuffer,
    group: wgpu::BindGroup,
}

impl CameraBuffer {
    pub fn new(context: &VisContext, layout: &wgpu::BindGroupLayout) -> CameraBuffer {
        let uniform =
            UniformBuffer::new(context, std::mem::size_of::<CameraUniform>());

        let group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera"),
            layout,
            entries: &[uniform.group_entry(0)],
        });

        CameraBuffer { uniform, group }
    }

    pub fn update_buffer(&mut self, context: &VisContext, view_projection: [[f32; 4]; 4]) {
        let uniform = CameraUniform { view_projection };
        self.uniform.update_buffer(context, bytemuck::cast_slice(&[uniform]));
    }

    pub fn group(&self) -> &wgpu::BindGroup {
        &self.group
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_viewport_corner_maps_to_clip_corner() {
        let mut camera = OrthographicCamera::default();
        camera.set_aspect_ratio(2.0);

        let vp = camera.view_projection();
        let corner = vp.project_point3(Vec3::new(20.0, 10.0, 0.0));

        assert!(close(corner, Vec3::new(1.0, 1.0, 0.5)));
    }

    #[test]
    fn test_camera_position_offsets_the_view() {
        let mut camera = OrthographicCamera::default();
        camera.set_aspect_ratio(2.0);
        camera.set_position(Vec2::new(5.0, 0.0));

        let vp = camera.view_projection();
        let center = vp.project_point3(Vec3::new(5.0, 0.0, 0.0));

        assert!(close(center, Vec3::new(0.0, 0.0, 0.5)));
    }

    #[test]
    fn test_origin_is_centered_by_default() {
        let mut camera = OrthographicCamera::default();
        let vp = camera.view_projection();

        assert!(close(vp.project_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, 0.5)));
    }
}
