use rccell::RcCell;
use winit::event::WindowEvent;
use winit::event_loop::{ControlFlow, EventLoopWindowTarget};

use crate::context::Context;
use crate::core::{ModeCommands, ModeStack};
use crate::environment::config::Config;
use crate::event;
use crate::graphics::Graphics;
use crate::systems::{System, Systems};
use crate::utils::Timestep;
use crate::window::Window;

//The engine proper: systems registry, mode stack, GPU context and the main
//loop. Constructed once in main and consumed by run.
//Field order matters for teardown: modes drop before the systems they borrow from.
pub struct Engine {
    modes: ModeStack,
    commands: ModeCommands,
    systems: Systems,
    config: Config,
    context: Context,
    timestep: Timestep,
    accumulator: f64,
}

impl Engine {
    pub fn new(context: Context, config: Config) -> Engine {
        log::info!("Init Engine.");

        Engine {
            context,
            config,
            systems: Systems::new(),
            modes: ModeStack::new(),
            commands: ModeCommands::new(),
            timestep: Timestep::new(),
            accumulator: 0.0,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn add_system<T: System>(&mut self, system: T) -> RcCell<T> {
        self.systems.register(system)
    }

    pub fn systems(&self) -> &Systems {
        &self.systems
    }

    pub fn modes(&mut self) -> &mut ModeStack {
        &mut self.modes
    }

    pub fn run(mut self, window: Window) {
        let Window { native: window, event_loop } = window;

        log::info!("Running main loop.");

        event_loop
            .run(move |event, elwt| {
                elwt.set_control_flow(ControlFlow::Poll);

                match event {
                    winit::event::Event::WindowEvent { window_id, ref event }
                        if window_id == window.id() =>
                    {
                        match event {
                            WindowEvent::Resized(size) => {
                                self.context.resize(size.width, size.height);
                            }
                            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                                elwt.exit();
                            }
                            WindowEvent::RedrawRequested => {
                                self.frame(elwt);
                            }
                            _ => {}
                        }

                        if let Some(event) = event::to_event(event) {
                            if !self.systems.dispatch_event(&event) {
                                self.modes.dispatch_event(
                                    &event,
                                    &mut self.systems,
                                    &mut self.commands,
                                );
                            }
                        }
                    }

                    winit::event::Event::AboutToWait => {
                        window.request_redraw();
                    }

                    winit::event::Event::LoopExiting => {
                        self.shutdown();
                    }

                    _ => {}
                }
            })
            .unwrap();
    }

    fn frame(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if self.modes.pump(&mut self.systems, &mut self.commands) {
            elwt.exit();
            return;
        }

        self.timestep.step_fwd();

        //Clamp long frames so the fixed-step loop cannot spiral.
        let frame_ms = self.timestep.millis().min(self.config.engine_config().max_frame_ms);
        let fixed_ms = self.config.engine_config().fixed_timestep_ms;

        self.accumulator += frame_ms;
        while fixed_ms > 0.0 && self.accumulator >= fixed_ms {
            self.modes.fixed_update(
                &Timestep::from(fixed_ms),
                &mut self.systems,
                &mut self.commands,
            );
            self.accumulator -= fixed_ms;
        }

        let delta = Timestep::from(frame_ms);
        self.modes.update(&delta, &mut self.systems, &mut self.commands);
        self.systems.update(&delta);

        self.render(elwt);
    }

    fn render(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if self.context.surface_config.width == 0 || self.context.surface_config.height == 0 {
            return;
        }

        let Some(graphics) = self.systems.get::<Graphics>() else {
            return;
        };

        let output = match self.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost) => {
                let (width, height) =
                    (self.context.surface_config.width, self.context.surface_config.height);
                self.context.resize(width, height);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of video memory. Exiting.");
                elwt.exit();
                return;
            }
            Err(error) => {
                log::error!("{:?}", error);
                return;
            }
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.modes.render(&mut self.systems, &mut self.commands);
        graphics.borrow_mut().flush(&view);

        output.present();
    }

    fn shutdown(&mut self) {
        log::info!("Shutting down.");
        self.modes.clear(&mut self.systems, &mut self.commands);
    }
}
