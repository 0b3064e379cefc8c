use glam::{Mat4, Quat, Vec2, Vec4};

use crate::assets::{Ptr, Texture2D};

//CPU-side drawable: a textured unit quad placed by position/scale/rotation.
//Submitted to the graphics system every frame it should be visible.
pub struct Sprite {
    texture: Ptr<Texture2D>,
    position: Vec2,
    scale: Vec2,
    rotation: f32,
    tint: Vec4,
}

impl Sprite {
    pub fn new(texture: Ptr<Texture2D>) -> Sprite {
        Sprite {
            texture,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            tint: Vec4::ONE,
        }
    }

    pub fn texture(&self) -> Ptr<Texture2D> {
        self.texture
    }

    pub fn set_texture(&mut self, texture: Ptr<Texture2D>) {
        self.texture = texture;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
    }

    pub fn tint(&self) -> Vec4 {
        self.tint
    }

    pub fn set_tint(&mut self, tint: Vec4) {
        self.tint = tint;
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale.extend(1.0),
            Quat::from_rotation_z(self.rotation),
            self.position.extend(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_new_sprite_is_untransformed() {
        let sprite = Sprite::new(Ptr::dead());
        assert_eq!(sprite.position(), Vec2::ZERO);
        assert_eq!(sprite.scale(), Vec2::ONE);
        assert_eq!(sprite.tint(), Vec4::ONE);
        assert!(sprite.texture().is_dead());
    }

    #[test]
    fn test_model_places_the_quad() {
        let mut sprite = Sprite::new(Ptr::dead());
        sprite.set_position(Vec2::new(3.0, 4.0));
        sprite.set_scale(Vec2::new(10.0, 10.0));

        //The quad spans [-1, 1], so a corner lands at position +- scale.
        let corner = sprite.model().transform_point3(Vec3::new(1.0, 1.0, 0.0));
        assert!((corner - Vec3::new(13.0, 14.0, 0.0)).length() < 1e-5);
    }
}
