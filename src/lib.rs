#[macro_use]
pub mod core;
pub mod assets;
pub mod context;
pub mod engine;
pub mod environment;
pub mod event;
pub mod graphics;
pub mod logging;
pub mod render;
pub mod scene;
pub mod systems;
pub mod utils;
pub mod window;

//Re-exports
pub use glam;
pub use hecs;
pub use log;
pub use pollster;
pub use rccell;
pub use wgpu;
pub use winit;
