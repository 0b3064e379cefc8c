use std::any::{Any, TypeId};

use hashbrown::HashMap;
use rccell::RcCell;

use crate::event::Event;
use crate::utils::Timestep;

//A subsystem registered with the engine. Hooks are invoked in registration order.
pub trait System: 'static {
    fn on_attach(&mut self) {}
    fn on_update(&mut self, _delta: &Timestep) {}
    fn on_event(&mut self, _event: &Event) -> bool {
        false
    }
}

type UpdateFn = Box<dyn FnMut(&Timestep)>;
type EventFn = Box<dyn FnMut(&Event) -> bool>;

//Type-keyed registry of engine subsystems. Systems live behind RcCell handles,
//so the engine and the active game mode can each borrow one without aliasing.
pub struct Systems {
    cells: HashMap<TypeId, Box<dyn Any>>,
    update_fns: Vec<UpdateFn>,
    event_fns: Vec<EventFn>,
}

impl Systems {
    pub fn new() -> Systems {
        Systems { cells: HashMap::new(), update_fns: Vec::new(), event_fns: Vec::new() }
    }

    //Each system type registers once; a second registration keeps the first.
    pub fn register<T: System>(&mut self, system: T) -> RcCell<T> {
        if let Some(existing) = self.get::<T>() {
            log::warn!("System type already registered. Keeping the existing one.");
            return existing;
        }

        let cell = RcCell::new(system);
        cell.borrow_mut().on_attach();

        self.update_fns
            .push(Box::new(enclose! { (cell) move |delta: &Timestep| cell.borrow_mut().on_update(delta) }));

        self.event_fns
            .push(Box::new(enclose! { (cell) move |event: &Event| cell.borrow_mut().on_event(event) }));

        self.cells.insert(TypeId::of::<T>(), Box::new(cell.clone()));
        cell
    }

    pub fn get<T: System>(&self) -> Option<RcCell<T>> {
        self.cells.get(&TypeId::of::<T>()).and_then(|cell| cell.downcast_ref::<RcCell<T>>()).cloned()
    }

    pub fn contains<T: System>(&self) -> bool {
        self.cells.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn update(&mut self, delta: &Timestep) {
        for update in &mut self.update_fns {
            (update)(delta);
        }
    }

    //Returns true once a system reports the event consumed.
    pub fn dispatch_event(&mut self, event: &Event) -> bool {
        for dispatch in &mut self.event_fns {
            if (dispatch)(event) {
                return true;
            }
        }

        false
    }
}

impl Default for Systems {
    fn default() -> Self {
        Systems::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeScene {
        attached: bool,
        updates: usize,
    }

    impl FakeScene {
        fn new() -> FakeScene {
            FakeScene { attached: false, updates: 0 }
        }
    }

    impl System for FakeScene {
        fn on_attach(&mut self) {
            self.attached = true;
        }

        fn on_update(&mut self, _delta: &Timestep) {
            self.updates += 1;
        }
    }

    struct FakeRenderer {
        resizes: usize,
    }

    impl System for FakeRenderer {
        fn on_event(&mut self, event: &Event) -> bool {
            if let Event::Resized { .. } = event {
                self.resizes += 1;
            }
            false
        }
    }

    struct Greedy;

    impl System for Greedy {
        fn on_event(&mut self, _event: &Event) -> bool {
            true
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut systems = Systems::new();
        systems.register(FakeScene::new());

        let scene = systems.get::<FakeScene>().unwrap();
        assert!(scene.borrow().attached);
        assert!(systems.contains::<FakeScene>());
        assert!(!systems.contains::<FakeRenderer>());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let systems = Systems::new();
        assert!(systems.get::<FakeScene>().is_none());
        assert!(systems.is_empty());
    }

    #[test]
    fn test_update_reaches_every_system() {
        let mut systems = Systems::new();
        let scene = systems.register(FakeScene::new());

        systems.update(&Timestep::from(16.0));
        systems.update(&Timestep::from(16.0));

        assert_eq!(scene.borrow().updates, 2);
        assert_eq!(systems.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_keeps_the_first() {
        let mut systems = Systems::new();
        let first = systems.register(FakeScene::new());
        first.borrow_mut().updates = 3;

        let second = systems.register(FakeScene::new());

        assert_eq!(second.borrow().updates, 3);
        assert_eq!(systems.len(), 1);

        //Only one dispatch closure exists for the type.
        systems.update(&Timestep::from(16.0));
        assert_eq!(first.borrow().updates, 4);
    }

    #[test]
    fn test_handles_stay_shared() {
        let mut systems = Systems::new();
        systems.register(FakeScene::new());

        let first = systems.get::<FakeScene>().unwrap();
        first.borrow_mut().updates = 7;

        let second = systems.get::<FakeScene>().unwrap();
        assert_eq!(second.borrow().updates, 7);
    }

    #[test]
    fn test_event_consumption_stops_dispatch() {
        let mut systems = Systems::new();
        systems.register(Greedy);
        let renderer = systems.register(FakeRenderer { resizes: 0 });

        let consumed = systems.dispatch_event(&Event::Resized { width: 640, height: 480 });

        assert!(consumed);
        assert_eq!(renderer.borrow().resizes, 0);
    }

    #[test]
    fn test_event_reaches_later_systems_when_unconsumed() {
        let mut systems = Systems::new();
        systems.register(FakeScene::new());
        let renderer = systems.register(FakeRenderer { resizes: 0 });

        let consumed = systems.dispatch_event(&Event::Resized { width: 640, height: 480 });

        assert!(!consumed);
        assert_eq!(renderer.borrow().resizes, 1);
    }
}
