pub mod assets;
pub mod texture;

pub use assets::{Assets, Ptr};
pub use texture::Texture2D;
