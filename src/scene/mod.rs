pub mod transform;

use glam::Mat4;
use hashbrown::HashSet;

use crate::systems::System;
use crate::utils::Timestep;

pub use transform::Transform;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityHandle {
    entity: hecs::Entity,
}

impl EntityHandle {
    pub fn inner(&self) -> hecs::Entity {
        self.entity
    }
}

//Entity store plus the transform hierarchy pass. Every entity carries a
//Transform from birth; global matrices are recomputed parent-first each frame.
pub struct SceneGraph {
    world: hecs::World,
}

impl SceneGraph {
    pub fn new() -> SceneGraph {
        SceneGraph { world: hecs::World::new() }
    }

    pub fn create_entity(&mut self) -> EntityHandle {
        let entity = self.world.spawn((Transform::new(),));
        EntityHandle { entity }
    }

    pub fn destroy_entity(&mut self, handle: EntityHandle) {
        //Children of the despawned entity become roots.
        for (_, transform) in self.world.query::<&mut Transform>().iter() {
            if transform.parent() == Some(handle.entity) {
                transform.set_parent_raw(None);
            }
        }

        if self.world.despawn(handle.entity).is_err() {
            log::warn!("Tried to destroy an entity that no longer exists.");
        }
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.world.contains(handle.entity)
    }

    pub fn transform(&self, handle: EntityHandle) -> Option<hecs::Ref<'_, Transform>> {
        self.world.get::<&Transform>(handle.entity).ok()
    }

    pub fn transform_mut(&self, handle: EntityHandle) -> Option<hecs::RefMut<'_, Transform>> {
        self.world.get::<&mut Transform>(handle.entity).ok()
    }

    //Attach child under parent (or detach with None). Links that would close a
    //cycle are refused.
    pub fn set_parent(&mut self, child: EntityHandle, parent: Option<EntityHandle>) -> bool {
        if let Some(parent) = parent {
            let mut current = Some(parent.entity);

            while let Some(entity) = current {
                if entity == child.entity {
                    log::error!("Refusing parent link: it would create a cycle.");
                    return false;
                }

                current = self.world.get::<&Transform>(entity).ok().and_then(|t| t.parent());
            }
        }

        match self.world.get::<&mut Transform>(child.entity) {
            Ok(mut transform) => {
                transform.set_parent_raw(parent.map(|p| p.entity));
                true
            }
            Err(_) => false,
        }
    }

    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    fn depth_of(&self, entity: hecs::Entity) -> u32 {
        let mut depth = 0;
        let mut current = entity;

        loop {
            let parent = match self.world.get::<&Transform>(current) {
                Ok(transform) => transform.parent(),
                Err(_) => None,
            };

            match parent {
                Some(parent) if self.world.contains(parent) => {
                    depth += 1;
                    current = parent;
                }
                _ => return depth,
            }
        }
    }

    //Recompute global matrices. Parents are visited before their children, and
    //a clean transform is skipped unless an ancestor moved. A parent that was
    //despawned without detaching counts as the identity.
    fn propagate(&mut self) {
        let mut order: Vec<(hecs::Entity, u32)> = self
            .world
            .query::<&Transform>()
            .iter()
            .map(|(entity, _)| (entity, self.depth_of(entity)))
            .collect();

        order.sort_by_key(|(_, depth)| *depth);

        let mut moved: HashSet<hecs::Entity> = HashSet::new();

        for (entity, _) in order {
            let (parent_global, parent_moved) = {
                let parent = match self.world.get::<&Transform>(entity) {
                    Ok(transform) => transform.parent(),
                    Err(_) => continue,
                };

                match parent {
                    Some(parent) => match self.world.get::<&Transform>(parent) {
                        Ok(transform) => (transform.global(), moved.contains(&parent)),
                        Err(_) => (Mat4::IDENTITY, false),
                    },
                    None => (Mat4::IDENTITY, false),
                }
            };

            if let Ok(mut transform) = self.world.get::<&mut Transform>(entity) {
                if transform.is_dirty() || parent_moved {
                    let local_matrix = transform.local_matrix();
                    transform.write_global(parent_global * local_matrix);
                    moved.insert(entity);
                }
            }
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        SceneGraph::new()
    }
}

impl System for SceneGraph {
    fn on_update(&mut self, _delta: &Timestep) {
        self.propagate();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_created_entity_has_default_transform() {
        let mut scene = SceneGraph::new();
        let entity = scene.create_entity();

        let transform = scene.transform(entity).unwrap();
        assert_eq!(transform.position(), Vec3::ZERO);
        assert_eq!(transform.scale(), Vec3::ONE);
        assert!(scene.contains(entity));
    }

    #[test]
    fn test_missing_entity_has_no_transform() {
        let mut scene = SceneGraph::new();
        let entity = scene.create_entity();
        scene.destroy_entity(entity);

        assert!(scene.transform(entity).is_none());
        assert!(!scene.contains(entity));
    }

    #[test]
    fn test_propagate_writes_global_matrix() {
        let mut scene = SceneGraph::new();
        let entity = scene.create_entity();

        scene.transform_mut(entity).unwrap().set_position(Vec3::new(3.0, 4.0, 0.0));
        scene.transform_mut(entity).unwrap().set_scale(Vec3::splat(10.0));
        scene.propagate();

        let global = scene.transform(entity).unwrap().global();
        let origin = global.transform_point3(Vec3::ZERO);
        let unit = global.transform_point3(Vec3::X);

        assert!((origin - Vec3::new(3.0, 4.0, 0.0)).length() < 1e-5);
        assert!((unit - Vec3::new(13.0, 4.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_child_inherits_parent_motion() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_entity();
        let child = scene.create_entity();

        assert!(scene.set_parent(child, Some(parent)));
        scene.transform_mut(parent).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
        scene.transform_mut(child).unwrap().set_position(Vec3::new(1.0, 1.0, 0.0));
        scene.propagate();

        let child_origin =
            scene.transform(child).unwrap().global().transform_point3(Vec3::ZERO);
        assert!((child_origin - Vec3::new(6.0, 1.0, 0.0)).length() < 1e-5);

        //Moving only the parent drags the (clean) child along on the next pass.
        scene.transform_mut(parent).unwrap().set_position(Vec3::new(7.0, 0.0, 0.0));
        scene.propagate();

        let child_origin =
            scene.transform(child).unwrap().global().transform_point3(Vec3::ZERO);
        assert!((child_origin - Vec3::new(8.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_cycles_are_refused() {
        let mut scene = SceneGraph::new();
        let a = scene.create_entity();
        let b = scene.create_entity();

        assert!(scene.set_parent(b, Some(a)));
        assert!(!scene.set_parent(a, Some(b)));
        assert!(!scene.set_parent(a, Some(a)));

        //The refused links left the hierarchy untouched.
        assert_eq!(scene.transform(a).unwrap().parent(), None);
        assert_eq!(scene.transform(b).unwrap().parent(), Some(a.inner()));
    }

    #[test]
    fn test_despawned_parent_falls_back_to_identity() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_entity();
        let child = scene.create_entity();

        scene.set_parent(child, Some(parent));
        scene.transform_mut(child).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));
        scene.transform_mut(parent).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
        scene.propagate();

        scene.destroy_entity(parent);
        scene.transform_mut(child).unwrap().add_pos(Vec3::ZERO);
        scene.propagate();

        let child_origin =
            scene.transform(child).unwrap().global().transform_point3(Vec3::ZERO);
        assert!((child_origin - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        //destroy_entity detached the child.
        assert_eq!(scene.transform(child).unwrap().parent(), None);
    }
}
