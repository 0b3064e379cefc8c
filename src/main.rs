use std::path::Path;

use glam::{Vec2, Vec3};
use overture::assets::Ptr;
use overture::context::Context;
use overture::core::{GameMode, ModeContext};
use overture::engine::Engine;
use overture::environment::config::Config;
use overture::graphics::Graphics;
use overture::logging;
use overture::render::sprite::Sprite;
use overture::scene::{EntityHandle, SceneGraph};
use overture::utils::Timestep;
use overture::window::Window;

//One entity, one sprite mirroring its transform every frame.
pub struct OrbMode {
    entity: Option<EntityHandle>,
    sprite: Option<Sprite>,
}

impl OrbMode {
    pub fn new() -> OrbMode {
        OrbMode { entity: None, sprite: None }
    }
}

impl Default for OrbMode {
    fn default() -> Self {
        OrbMode::new()
    }
}

impl GameMode for OrbMode {
    fn on_start(&mut self, ctx: &mut ModeContext) {
        let Some(scene) = ctx.systems.get::<SceneGraph>() else {
            log::error!("OrbMode needs a scene graph.");
            return;
        };

        let mut scene = scene.borrow_mut();
        let entity = scene.create_entity();

        if let Some(mut transform) = scene.transform_mut(entity) {
            transform.set_position(Vec3::new(0.0, 0.0, 0.0));
            transform.set_scale(Vec3::new(10.0, 10.0, 10.0));
        }

        self.entity = Some(entity);

        let texture = ctx
            .systems
            .get::<Graphics>()
            .map(|graphics| graphics.borrow_mut().load_texture("./Assets/orb.png"))
            .unwrap_or_else(Ptr::dead);

        self.sprite = Some(Sprite::new(texture));
    }

    fn on_update(&mut self, delta: &Timestep, ctx: &mut ModeContext) {
        log::debug!("orb update ({:.2} ms)", delta.millis());

        let (Some(entity), Some(sprite)) = (self.entity, self.sprite.as_mut()) else {
            return;
        };

        if let Some(scene) = ctx.systems.get::<SceneGraph>() {
            let scene = scene.borrow();

            if let Some(transform) = scene.transform(entity) {
                let position = transform.position();
                let scale = transform.scale();

                sprite.set_position(Vec2::new(position.x, position.y));
                sprite.set_scale(Vec2::new(scale.x, scale.y));
            };
        }
    }

    fn on_render(&mut self, ctx: &mut ModeContext) {
        if let (Some(sprite), Some(graphics)) =
            (self.sprite.as_ref(), ctx.systems.get::<Graphics>())
        {
            graphics.borrow_mut().draw(sprite);
        }
    }
}

fn main() {
    logging::init();

    //Pick up the project file from the working directory, if there is one.
    let mut config = Config::new(None);
    if config.find_project(Path::new(".")).is_err() {
        log::warn!("No project file found. Using defaults.");
    }

    //Create the window from the config and create the context.
    let window = Window::new("{}");
    let context = pollster::block_on(Context::new(&window.native));

    //Boot the engine, register the built-in systems and seed the first mode.
    let mut engine = Engine::new(context, config);
    engine.add_system(SceneGraph::new());
    let graphics = Graphics::new(engine.context(), engine.config());
    engine.add_system(graphics);
    engine.modes().push(Box::new(OrbMode::new()));

    engine.run(window);
}

#[cfg(test)]
mod tests {
    use overture::core::{ModeCommands, ModeStack};
    use overture::systems::Systems;

    use super::*;

    fn scene_only() -> (Systems, ModeCommands) {
        let mut systems = Systems::new();
        systems.register(SceneGraph::new());
        (systems, ModeCommands::new())
    }

    #[test]
    fn test_start_places_the_entity_at_origin() {
        let (mut systems, mut commands) = scene_only();
        let mut mode = OrbMode::new();

        mode.on_start(&mut ModeContext { systems: &mut systems, commands: &mut commands });

        let scene = systems.get::<SceneGraph>().unwrap();
        let scene = scene.borrow();
        let transform = scene.transform(mode.entity.unwrap()).unwrap();

        assert_eq!(transform.position(), Vec3::ZERO);
        assert_eq!(transform.scale(), Vec3::splat(10.0));
    }

    #[test]
    fn test_update_mirrors_the_transform_into_the_sprite() {
        let (mut systems, mut commands) = scene_only();
        let mut mode = OrbMode::new();

        mode.on_start(&mut ModeContext { systems: &mut systems, commands: &mut commands });

        {
            let scene = systems.get::<SceneGraph>().unwrap();
            let scene = scene.borrow_mut();
            let mut transform = scene.transform_mut(mode.entity.unwrap()).unwrap();
            transform.set_position(Vec3::new(3.0, 4.0, 0.0));
        }

        let delta = Timestep::from(16.0);
        mode.on_update(&delta, &mut ModeContext { systems: &mut systems, commands: &mut commands });

        let sprite = mode.sprite.as_ref().unwrap();
        assert_eq!(sprite.position(), Vec2::new(3.0, 4.0));
        assert_eq!(sprite.scale(), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_mode_runs_headless_without_graphics() {
        let (mut systems, mut commands) = scene_only();
        let mut mode = OrbMode::new();

        mode.on_start(&mut ModeContext { systems: &mut systems, commands: &mut commands });
        let delta = Timestep::from(16.0);
        mode.on_update(&delta, &mut ModeContext { systems: &mut systems, commands: &mut commands });
        mode.on_render(&mut ModeContext { systems: &mut systems, commands: &mut commands });

        //No graphics system registered, so the sprite falls back to a dead handle.
        assert!(mode.sprite.as_ref().unwrap().texture().is_dead());
    }

    #[test]
    fn test_mode_lifecycle_through_the_stack() {
        let (mut systems, mut commands) = scene_only();
        let mut modes = ModeStack::new();

        modes.push(Box::new(OrbMode::new()));
        modes.pump(&mut systems, &mut commands);
        modes.update(&Timestep::from(16.0), &mut systems, &mut commands);

        let scene = systems.get::<SceneGraph>().unwrap();
        assert_eq!(scene.borrow().world().len(), 1);
    }
}
