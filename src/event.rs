use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Resized { width: u32, height: u32 },
    Moved { x: i32, y: i32 },
    CloseRequested,
    Destroyed,
    Focused(bool),
    KeyboardInput { keycode: KeyCode, state: ElementState },
    CursorMoved { x: f64, y: f64 },
    MouseInput { button: MouseButton, state: ElementState },
}

//Translate the winit events the engine cares about. Everything else is dropped.
pub fn to_event(event: &WindowEvent) -> Option<Event> {
    match event {
        WindowEvent::Resized(size) => Some(Event::Resized { width: size.width, height: size.height }),
        WindowEvent::Moved(position) => Some(Event::Moved { x: position.x, y: position.y }),
        WindowEvent::CloseRequested => Some(Event::CloseRequested),
        WindowEvent::Destroyed => Some(Event::Destroyed),
        WindowEvent::Focused(focused) => Some(Event::Focused(*focused)),
        WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
            PhysicalKey::Code(keycode) => {
                Some(Event::KeyboardInput { keycode, state: event.state })
            }
            _ => None,
        },
        WindowEvent::CursorMoved { position, .. } => {
            Some(Event::CursorMoved { x: position.x, y: position.y })
        }
        WindowEvent::MouseInput { button, state, .. } => {
            Some(Event::MouseInput { button: *button, state: *state })
        }
        _ => None,
    }
}
