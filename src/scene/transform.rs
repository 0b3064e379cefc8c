use glam::{Mat4, Quat, Vec3};

//Local position/scale/rotation of an entity, plus the cached global matrix the
//scene graph recomputes once per frame.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    scale: Vec3,
    rotation: f32,
    parent: Option<hecs::Entity>,
    global: Mat4,
    dirty: bool,
}

impl Transform {
    pub fn new() -> Transform {
        Transform {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: 0.0,
            parent: None,
            global: Mat4::IDENTITY,
            dirty: true,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.dirty = true;
    }

    pub fn add_pos(&mut self, inc: Vec3) {
        self.position += inc;
        self.dirty = true;
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dirty = true;
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.dirty = true;
    }

    pub fn add_rot(&mut self, inc: f32) {
        self.rotation += inc;
        self.dirty = true;
    }

    pub fn parent(&self) -> Option<hecs::Entity> {
        self.parent
    }

    //Parent links are managed through SceneGraph::set_parent, which refuses cycles.
    pub(crate) fn set_parent_raw(&mut self, parent: Option<hecs::Entity>) {
        self.parent = parent;
        self.dirty = true;
    }

    //Global matrix as of the last scene graph pass.
    pub fn global(&self) -> Mat4 {
        self.global
    }

    pub(crate) fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_rotation_z(self.rotation),
            self.position,
        )
    }

    pub(crate) fn write_global(&mut self, global: Mat4) {
        self.global = global;
        self.dirty = false;
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_identity() {
        let transform = Transform::new();
        assert_eq!(transform.position(), Vec3::ZERO);
        assert_eq!(transform.scale(), Vec3::ONE);
        assert_eq!(transform.rotation(), 0.0);
        assert_eq!(transform.global(), Mat4::IDENTITY);
        assert!(transform.parent().is_none());
    }

    #[test]
    fn test_local_matrix_applies_scale_and_translation() {
        let mut transform = Transform::new();
        transform.set_position(Vec3::new(2.0, 3.0, 0.0));
        transform.set_scale(Vec3::splat(10.0));

        let local = transform.local_matrix();
        let moved = local.transform_point3(Vec3::new(1.0, 0.0, 0.0));

        assert!((moved - Vec3::new(12.0, 3.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut transform = Transform::new();
        transform.write_global(Mat4::IDENTITY);
        assert!(!transform.is_dirty());

        transform.add_pos(Vec3::X);
        assert!(transform.is_dirty());
    }
}
