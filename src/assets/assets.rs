use std::path::PathBuf;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::context::VisContext;
use crate::utils::{Guid, GuidGenerator};

use super::texture::Texture2D;

//Typed handle to a cached asset. Copyable, and safe to hold onto even when the
//load behind it failed: a dead handle resolves to the error texture.
#[derive(Debug)]
pub struct Ptr<T> {
    guid: Guid,
    phantom: std::marker::PhantomData<T>,
}

impl<T> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ptr<T> {}

impl<T> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
    }
}

impl<T> Eq for Ptr<T> {}

impl<T> std::hash::Hash for Ptr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.guid.hash(state);
    }
}

impl<T> Ptr<T> {
    pub(crate) fn new(guid: Guid) -> Self {
        Ptr { guid, phantom: std::marker::PhantomData }
    }

    pub fn dead() -> Self {
        Ptr::new(Guid::dead())
    }

    pub fn is_dead(&self) -> bool {
        self.guid.is_dead()
    }

    pub fn inner(&self) -> Guid {
        self.guid
    }
}

//Synchronous texture cache. Paths are resolved against the project's asset
//root and loaded at most once.
pub struct Assets {
    textures: HashMap<Guid, Texture2D>,
    paths: HashMap<String, Guid>,
    generator: GuidGenerator,
    error_texture: Texture2D,
    layout: Arc<wgpu::BindGroupLayout>,
    root: PathBuf,
}

impl Assets {
    pub fn new(context: &VisContext, layout: Arc<wgpu::BindGroupLayout>, root: PathBuf) -> Assets {
        let error_texture = Texture2D::error_texture(context, &layout);

        Assets {
            textures: HashMap::new(),
            paths: HashMap::new(),
            generator: GuidGenerator::new(),
            error_texture,
            layout,
            root,
        }
    }

    pub fn load_texture(&mut self, context: &VisContext, path: &str) -> Ptr<Texture2D> {
        if let Some(guid) = self.paths.get(path) {
            return Ptr::new(*guid);
        }

        let full_path = self.root.join(path);

        match Texture2D::from_file(context, &self.layout, &full_path) {
            Ok(texture) => {
                let guid = self.generator.generate();
                self.textures.insert(guid, texture);
                self.paths.insert(path.to_owned(), guid);
                log::info!("Loaded texture {}.", full_path.display());
                Ptr::new(guid)
            }
            Err(error) => {
                log::error!("Could not load texture {}. {:?}", full_path.display(), error);
                Ptr::dead()
            }
        }
    }

    //Dead or unknown handles resolve to the error texture.
    pub fn texture(&self, ptr: &Ptr<Texture2D>) -> &Texture2D {
        self.textures.get(&ptr.guid).unwrap_or(&self.error_texture)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
