use std::sync::Arc;

use wgpu::PresentMode;

//Device and queue handle shared with everything that uploads GPU resources.
pub struct VisContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

pub struct Context {
    pub graphics: Arc<VisContext>,
    pub surface: wgpu::Surface,
    pub surface_config: wgpu::SurfaceConfiguration,
}

impl Context {
    pub async fn new(window: &winit::window::Window) -> Context {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        //Safety: the window is kept alive by the engine until the surface is dropped.
        let surface = unsafe { instance.create_surface(window) }.unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let capabilities = surface.get_capabilities(&adapter);

        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(capabilities.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: window.inner_size().width,
            height: window.inner_size().height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities.alpha_modes[0],
            view_formats: vec![],
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .unwrap();

        surface.configure(&device, &surface_config);

        log::info!("Created graphics context ({:?}).", adapter.get_info().backend);

        Context { graphics: Arc::new(VisContext { device, queue }), surface, surface_config }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.surface.configure(&self.graphics.device, &self.surface_config);
        }
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        match vsync {
            true => self.surface_config.present_mode = PresentMode::AutoVsync,
            false => self.surface_config.present_mode = PresentMode::AutoNoVsync,
        }

        self.surface.configure(&self.graphics.device, &self.surface_config);
    }

    pub fn vsync(&self) -> bool {
        self.surface_config.present_mode == PresentMode::AutoVsync
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }
}
