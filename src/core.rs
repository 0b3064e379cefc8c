use crate::event::Event;
use crate::systems::Systems;
use crate::utils::Timestep;

macro_rules! enclose {
    ( ($( $x:ident ),*) $y:expr ) => {
        {
            $(let $x = $x.clone();)*
            $y
        }
    };
}

//Lifecycle hooks of a unit of application behavior on the mode stack.
//Only the top mode receives update/fixed-update/render/event hooks.
pub trait GameMode {
    fn on_create(&mut self, _ctx: &mut ModeContext) {}
    fn on_start(&mut self, _ctx: &mut ModeContext) {}
    fn on_update(&mut self, _delta: &Timestep, _ctx: &mut ModeContext) {}
    fn on_fixed_update(&mut self, _delta: &Timestep, _ctx: &mut ModeContext) {}
    fn on_render(&mut self, _ctx: &mut ModeContext) {}
    fn on_event(&mut self, _event: &Event, _ctx: &mut ModeContext) -> bool {
        false
    }
    fn on_finish(&mut self, _ctx: &mut ModeContext) {}
    fn on_destroy(&mut self, _ctx: &mut ModeContext) {}
}

//What a mode sees of the engine while one of its hooks runs.
pub struct ModeContext<'a> {
    pub systems: &'a mut Systems,
    pub commands: &'a mut ModeCommands,
}

enum Command {
    Push(Box<dyn GameMode>),
    Pop,
    Quit,
}

//Stack mutations requested from inside a hook. Applied by the engine between
//frames, so hooks never observe a half-applied stack.
#[derive(Default)]
pub struct ModeCommands {
    commands: Vec<Command>,
}

impl ModeCommands {
    pub fn new() -> ModeCommands {
        ModeCommands::default()
    }

    pub fn push(&mut self, mode: Box<dyn GameMode>) {
        self.commands.push(Command::Push(mode));
    }

    pub fn pop(&mut self) {
        self.commands.push(Command::Pop);
    }

    pub fn quit(&mut self) {
        self.commands.push(Command::Quit);
    }

    fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

struct ModeEntry {
    mode: Box<dyn GameMode>,
    running: bool,
}

pub struct ModeStack {
    stack: Vec<ModeEntry>,
    pending: Vec<Box<dyn GameMode>>,
}

impl ModeStack {
    pub fn new() -> ModeStack {
        ModeStack { stack: Vec::new(), pending: Vec::new() }
    }

    //Modes pushed from outside a hook (e.g. the initial mode) are applied on
    //the next pump, before any queued commands.
    pub fn push(&mut self, mode: Box<dyn GameMode>) {
        self.pending.push(mode);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    //Apply pending pushes and queued commands. Returns true if quit was requested.
    pub fn pump(&mut self, systems: &mut Systems, commands: &mut ModeCommands) -> bool {
        let mut quit = false;

        for mode in std::mem::take(&mut self.pending) {
            self.apply_push(mode, systems, commands);
        }

        for command in commands.take() {
            match command {
                Command::Push(mode) => self.apply_push(mode, systems, commands),
                Command::Pop => self.apply_pop(systems, commands),
                Command::Quit => quit = true,
            }
        }

        quit
    }

    pub fn update(&mut self, delta: &Timestep, systems: &mut Systems, commands: &mut ModeCommands) {
        if let Some(top) = self.stack.last_mut() {
            top.mode.on_update(delta, &mut ModeContext { systems, commands });
        }
    }

    pub fn fixed_update(
        &mut self, delta: &Timestep, systems: &mut Systems, commands: &mut ModeCommands,
    ) {
        if let Some(top) = self.stack.last_mut() {
            top.mode.on_fixed_update(delta, &mut ModeContext { systems, commands });
        }
    }

    pub fn render(&mut self, systems: &mut Systems, commands: &mut ModeCommands) {
        if let Some(top) = self.stack.last_mut() {
            top.mode.on_render(&mut ModeContext { systems, commands });
        }
    }

    pub fn dispatch_event(
        &mut self, event: &Event, systems: &mut Systems, commands: &mut ModeCommands,
    ) -> bool {
        if let Some(top) = self.stack.last_mut() {
            return top.mode.on_event(event, &mut ModeContext { systems, commands });
        }

        false
    }

    //Teardown: unwind the whole stack, top first.
    pub fn clear(&mut self, systems: &mut Systems, commands: &mut ModeCommands) {
        let mut ctx = ModeContext { systems, commands };

        while let Some(mut entry) = self.stack.pop() {
            if entry.running {
                entry.mode.on_finish(&mut ctx);
            }
            entry.mode.on_destroy(&mut ctx);
        }

        self.pending.clear();
    }

    fn apply_push(
        &mut self, mode: Box<dyn GameMode>, systems: &mut Systems, commands: &mut ModeCommands,
    ) {
        let mut ctx = ModeContext { systems, commands };

        if let Some(top) = self.stack.last_mut() {
            if top.running {
                top.mode.on_finish(&mut ctx);
                top.running = false;
            }
        }

        let mut entry = ModeEntry { mode, running: false };
        entry.mode.on_create(&mut ctx);
        entry.mode.on_start(&mut ctx);
        entry.running = true;

        self.stack.push(entry);
        log::info!("Started game mode (stack depth {}).", self.stack.len());
    }

    fn apply_pop(&mut self, systems: &mut Systems, commands: &mut ModeCommands) {
        let mut ctx = ModeContext { systems, commands };

        if let Some(mut entry) = self.stack.pop() {
            if entry.running {
                entry.mode.on_finish(&mut ctx);
            }
            entry.mode.on_destroy(&mut ctx);
            log::info!("Finished game mode (stack depth {}).", self.stack.len());
        }

        //The newly exposed mode resumes.
        if let Some(top) = self.stack.last_mut() {
            top.mode.on_start(&mut ctx);
            top.running = true;
        }
    }
}

impl Default for ModeStack {
    fn default() -> Self {
        ModeStack::new()
    }
}

#[cfg(test)]
mod tests {
    use rccell::RcCell;

    use super::*;

    struct Recorder {
        tag: &'static str,
        journal: RcCell<Vec<String>>,
    }

    impl Recorder {
        fn new(tag: &'static str, journal: RcCell<Vec<String>>) -> Recorder {
            Recorder { tag, journal }
        }

        fn record(&self, hook: &str) {
            self.journal.borrow_mut().push(format!("{}:{}", self.tag, hook));
        }
    }

    impl GameMode for Recorder {
        fn on_create(&mut self, _ctx: &mut ModeContext) {
            self.record("create");
        }

        fn on_start(&mut self, _ctx: &mut ModeContext) {
            self.record("start");
        }

        fn on_update(&mut self, _delta: &Timestep, _ctx: &mut ModeContext) {
            self.record("update");
        }

        fn on_fixed_update(&mut self, _delta: &Timestep, _ctx: &mut ModeContext) {
            self.record("fixed");
        }

        fn on_render(&mut self, _ctx: &mut ModeContext) {
            self.record("render");
        }

        fn on_finish(&mut self, _ctx: &mut ModeContext) {
            self.record("finish");
        }

        fn on_destroy(&mut self, _ctx: &mut ModeContext) {
            self.record("destroy");
        }
    }

    fn harness() -> (ModeStack, Systems, ModeCommands, RcCell<Vec<String>>) {
        (ModeStack::new(), Systems::new(), ModeCommands::new(), RcCell::new(Vec::new()))
    }

    #[test]
    fn test_push_runs_create_then_start() {
        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Recorder::new("a", journal.clone())));
        assert!(stack.is_empty());

        let quit = stack.pump(&mut systems, &mut commands);

        assert!(!quit);
        assert_eq!(stack.len(), 1);
        assert_eq!(*journal.borrow(), vec!["a:create", "a:start"]);
    }

    #[test]
    fn test_only_top_mode_is_driven() {
        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Recorder::new("a", journal.clone())));
        stack.push(Box::new(Recorder::new("b", journal.clone())));
        stack.pump(&mut systems, &mut commands);
        journal.borrow_mut().clear();

        stack.update(&Timestep::from(16.0), &mut systems, &mut commands);
        stack.fixed_update(&Timestep::from(16.0), &mut systems, &mut commands);
        stack.render(&mut systems, &mut commands);

        assert_eq!(*journal.borrow(), vec!["b:update", "b:fixed", "b:render"]);
    }

    #[test]
    fn test_push_finishes_the_covered_mode() {
        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Recorder::new("a", journal.clone())));
        stack.push(Box::new(Recorder::new("b", journal.clone())));
        stack.pump(&mut systems, &mut commands);

        assert_eq!(
            *journal.borrow(),
            vec!["a:create", "a:start", "a:finish", "b:create", "b:start"]
        );
    }

    #[test]
    fn test_pop_destroys_top_and_resumes_below() {
        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Recorder::new("a", journal.clone())));
        stack.push(Box::new(Recorder::new("b", journal.clone())));
        stack.pump(&mut systems, &mut commands);
        journal.borrow_mut().clear();

        commands.pop();
        stack.pump(&mut systems, &mut commands);

        assert_eq!(stack.len(), 1);
        assert_eq!(*journal.borrow(), vec!["b:finish", "b:destroy", "a:start"]);
    }

    #[test]
    fn test_commands_queued_in_hooks_apply_next_pump() {
        struct Chainer {
            journal: RcCell<Vec<String>>,
        }

        impl GameMode for Chainer {
            fn on_update(&mut self, _delta: &Timestep, ctx: &mut ModeContext) {
                ctx.commands.push(Box::new(Recorder::new("child", self.journal.clone())));
            }
        }

        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Chainer { journal: journal.clone() }));
        stack.pump(&mut systems, &mut commands);
        stack.update(&Timestep::from(16.0), &mut systems, &mut commands);

        //Nothing applied until the next pump.
        assert_eq!(stack.len(), 1);

        stack.pump(&mut systems, &mut commands);
        assert_eq!(stack.len(), 2);
        assert_eq!(*journal.borrow(), vec!["child:create", "child:start"]);
    }

    #[test]
    fn test_quit_request_surfaces_from_pump() {
        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Recorder::new("a", journal.clone())));
        stack.pump(&mut systems, &mut commands);

        commands.quit();
        assert!(stack.pump(&mut systems, &mut commands));
    }

    #[test]
    fn test_clear_unwinds_top_first() {
        let (mut stack, mut systems, mut commands, journal) = harness();

        stack.push(Box::new(Recorder::new("a", journal.clone())));
        stack.push(Box::new(Recorder::new("b", journal.clone())));
        stack.pump(&mut systems, &mut commands);
        journal.borrow_mut().clear();

        stack.clear(&mut systems, &mut commands);

        assert!(stack.is_empty());
        //"a" was already finished when "b" covered it, so only destroy remains.
        assert_eq!(*journal.borrow(), vec!["b:finish", "b:destroy", "a:destroy"]);
    }
}
