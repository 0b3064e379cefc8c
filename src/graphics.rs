use std::sync::Arc;

use crate::assets::{Assets, Ptr, Texture2D};
use crate::context::{Context, VisContext};
use crate::environment::config::Config;
use crate::event::Event;
use crate::render::camera::OrthographicCamera;
use crate::render::render2d::Renderer2D;
use crate::render::sprite::Sprite;
use crate::systems::System;

//Rendering subsystem: owns the device handle, the texture cache, the camera
//and the sprite batcher. Modes talk to it through the systems registry.
pub struct Graphics {
    context: Arc<VisContext>,
    renderer: Renderer2D,
    assets: Assets,
    camera: OrthographicCamera,
}

impl Graphics {
    pub fn new(context: &Context, config: &Config) -> Graphics {
        let vis = context.graphics.clone();

        let renderer = Renderer2D::new(&vis, context.format());
        let assets = Assets::new(&vis, renderer.texture_layout(), config.asset_root());

        let mut camera = OrthographicCamera::default();
        let (width, height) = (context.surface_config.width, context.surface_config.height);
        if height > 0 {
            camera.set_aspect_ratio(width as f32 / height as f32);
        }

        Graphics { context: vis, renderer, assets, camera }
    }

    pub fn load_texture(&mut self, path: &str) -> Ptr<Texture2D> {
        self.assets.load_texture(&self.context, path)
    }

    //Queue a sprite for this frame.
    pub fn draw(&mut self, sprite: &Sprite) {
        self.renderer.submit(sprite.model(), sprite.tint(), sprite.texture());
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrthographicCamera {
        &mut self.camera
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn set_clear_color(&mut self, clear_color: wgpu::Color) {
        self.renderer.set_clear_color(clear_color);
    }

    //Draw everything queued since the last flush.
    pub fn flush(&mut self, view: &wgpu::TextureView) {
        let view_projection = self.camera.view_projection().to_cols_array_2d();
        self.renderer.update_camera_buffer(&self.context, view_projection);
        self.renderer.flush(&self.context, &self.assets, view);
    }
}

impl System for Graphics {
    fn on_event(&mut self, event: &Event) -> bool {
        if let Event::Resized { width, height } = event {
            if *height > 0 {
                self.camera.set_aspect_ratio(*width as f32 / *height as f32);
            }
        }

        false
    }
}
