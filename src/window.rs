use serde::{Deserialize, Serialize};
use winit::dpi::{LogicalPosition, PhysicalSize};
use winit::event_loop::EventLoop;
use winit::window::{Fullscreen, WindowBuilder};

#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub size: (u32, u32),
    pub title: String,
    pub position: (f64, f64),
    pub resizeable: bool,
    pub fullscreen: bool,
    pub visible: bool,
    pub border: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: "Overture".to_string(),
            size: (1280, 720),
            position: (0.0, 0.0),
            resizeable: true,
            fullscreen: false,
            visible: true,
            border: true,
        }
    }
}

impl WindowConfig {
    pub fn from_json(config_json: &str) -> WindowConfig {
        match serde_json::from_str(config_json) {
            Ok(config) => config,
            Err(_) => {
                log::error!("Failed to parse window config. Defaulting...");
                WindowConfig::default()
            }
        }
    }
}

pub struct Window {
    pub native: winit::window::Window,
    pub event_loop: EventLoop<()>,
}

impl Window {
    pub fn new(config_json: &str) -> Window {
        let config = WindowConfig::from_json(config_json);

        let event_loop = EventLoop::new().unwrap();

        let native = WindowBuilder::new()
            .with_title(config.title)
            .with_inner_size(PhysicalSize { width: config.size.0, height: config.size.1 })
            .with_position(LogicalPosition { x: config.position.0, y: config.position.1 })
            .with_resizable(config.resizeable)
            .with_visible(config.visible)
            .with_decorations(config.border)
            .build(&event_loop)
            .unwrap();

        if config.fullscreen {
            native.set_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        Window { native, event_loop }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config = WindowConfig::from_json("{}");
        assert_eq!(config.size, (1280, 720));
        assert_eq!(config.title, "Overture");
        assert!(config.resizeable);
        assert!(!config.fullscreen);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let config = WindowConfig::from_json("not json");
        assert_eq!(config.size, (1280, 720));
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = WindowConfig::from_json(r#"{ "title": "orb" }"#);
        assert_eq!(config.title, "orb");
        assert_eq!(config.size, (1280, 720));
    }

    #[test]
    fn test_full_json_is_honored() {
        let json = r#"{
            "size": [640, 360],
            "title": "orb",
            "position": [10.0, 20.0],
            "resizeable": false,
            "fullscreen": false,
            "visible": true,
            "border": false
        }"#;

        let config = WindowConfig::from_json(json);
        assert_eq!(config.size, (640, 360));
        assert_eq!(config.title, "orb");
        assert_eq!(config.position, (10.0, 20.0));
        assert!(!config.resizeable);
        assert!(!config.border);
    }
}
