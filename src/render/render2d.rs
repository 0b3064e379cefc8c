use std::sync::Arc;

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::assets::{Assets, Ptr, Texture2D};
use crate::context::VisContext;
use crate::render::buffer::{Indices, UniformBuffer, Vertices};
use crate::render::camera::CameraBuffer;
use crate::render::types::{InstanceRaw, Vertex2D};

const QUAD_VERTICES: &[Vertex2D] = &[
    Vertex2D { position: [-1.0, -1.0, 0.0], texture_coords: [0.0, 1.0] },
    Vertex2D { position: [1.0, 1.0, 0.0], texture_coords: [1.0, 0.0] },
    Vertex2D { position: [-1.0, 1.0, 0.0], texture_coords: [0.0, 0.0] },
    Vertex2D { position: [1.0, -1.0, 0.0], texture_coords: [1.0, 1.0] },
];

const QUAD_INDICES: &[u16] = &[0, 1, 2, 0, 3, 1];

struct DrawCommand {
    model: Mat4,
    tint: Vec4,
    texture: Ptr<Texture2D>,
}

//Immediate-mode sprite batcher. Submissions are kept in painter's order and
//drawn as consecutive runs sharing a texture, one render pass per frame.
pub struct Renderer2D {
    pipeline: wgpu::RenderPipeline,
    quad_vertices: Vertices,
    quad_indices: Indices,
    camera_buffer: CameraBuffer,
    texture_layout: Arc<wgpu::BindGroupLayout>,
    clear_color: wgpu::Color,
    commands: Vec<DrawCommand>,
}

impl Renderer2D {
    pub fn new(context: &VisContext, surface_format: wgpu::TextureFormat) -> Renderer2D {
        let shader = context.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
        });

        let camera_layout =
            context.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera_layout"),
                entries: &[UniformBuffer::layout_entry(0)],
            });

        let texture_layout =
            Arc::new(context.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("texture_layout"),
                entries: &[Texture2D::layout_entry(0), Texture2D::sampler_layout_entry(1)],
            }));

        let pipeline_layout =
            context.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("sprite_pipeline_layout"),
                bind_group_layouts: &[&camera_layout, &texture_layout],
                push_constant_ranges: &[],
            });

        let pipeline = context.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex2D::layout(), InstanceRaw::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let quad_vertices = Vertices::new(context, bytemuck::cast_slice(QUAD_VERTICES));
        let quad_indices =
            Indices::new(context, bytemuck::cast_slice(QUAD_INDICES), wgpu::IndexFormat::Uint16);

        let camera_buffer = CameraBuffer::new(context, &camera_layout);

        Renderer2D {
            pipeline,
            quad_vertices,
            quad_indices,
            camera_buffer,
            texture_layout,
            clear_color: wgpu::Color { r: 0.02, g: 0.02, b: 0.03, a: 1.0 },
            commands: Vec::new(),
        }
    }

    pub fn texture_layout(&self) -> Arc<wgpu::BindGroupLayout> {
        self.texture_layout.clone()
    }

    pub fn set_clear_color(&mut self, clear_color: wgpu::Color) {
        self.clear_color = clear_color;
    }

    pub fn update_camera_buffer(&mut self, context: &VisContext, camera: [[f32; 4]; 4]) {
        self.camera_buffer.update_buffer(context, camera);
    }

    pub fn submit(&mut self, model: Mat4, tint: Vec4, texture: Ptr<Texture2D>) {
        self.commands.push(DrawCommand { model, tint, texture });
    }

    pub fn flush(&mut self, context: &VisContext, assets: &Assets, view: &wgpu::TextureView) {
        let instances: Vec<InstanceRaw> = self
            .commands
            .iter()
            .map(|command| InstanceRaw {
                model: command.model.to_cols_array_2d(),
                tint: command.tint.to_array(),
            })
            .collect();

        let instance_buffer = if instances.is_empty() {
            None
        } else {
            Some(context.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sprite_instances"),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            }))
        };

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("render2d") });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(instance_buffer) = &instance_buffer {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, self.camera_buffer.group(), &[]);
                pass.set_vertex_buffer(0, self.quad_vertices.buffer().slice(..));
                pass.set_vertex_buffer(1, instance_buffer.slice(..));
                pass.set_index_buffer(
                    self.quad_indices.buffer().slice(..),
                    self.quad_indices.format(),
                );

                let mut start = 0;
                for end in 1..=self.commands.len() {
                    let run_ends = end == self.commands.len()
                        || self.commands[end].texture != self.commands[start].texture;

                    if run_ends {
                        let texture = assets.texture(&self.commands[start].texture);
                        pass.set_bind_group(1, texture.group(), &[]);
                        pass.draw_indexed(
                            0..QUAD_INDICES.len() as u32,
                            0,
                            start as u32..end as u32,
                        );
                        start = end;
                    }
                }
            }
        }

        context.queue.submit(std::iter::once(encoder.finish()));
        self.commands.clear();
    }
}
