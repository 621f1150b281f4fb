// GPU submission for recorded sprite batch frames

use super::shader::{validate_link, Shader, ShaderError, UniformBlock, UniformLayout, UniformType, VertexLayout};
use super::{SpriteBatch, TextureHandle, TextureManager, Vertex};
use log::warn;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Indices for one quad, relative to its 4-vertex base
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Build the shared index buffer contents for `max_quads` quads
fn quad_index_data(max_quads: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(max_quads * 6);
    for quad in 0..max_quads {
        let base = (quad * 4) as u16;
        indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
    indices
}

/// One reusable combined-matrix uniform slot
struct MatrixSlot {
    block: UniformBlock,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Render pipeline that replays [`SpriteBatch`] frames
///
/// Owns the sprite shader pipeline, a prebuilt quad index buffer, a growable
/// frame vertex buffer, per-matrix-slot uniform blocks, and a bind group
/// cache keyed by texture handle. Each recorded flush becomes exactly one
/// indexed draw; the whole frame's vertex data goes up in a single write.
pub struct BatchPipeline {
    pipeline: wgpu::RenderPipeline,
    matrix_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    index_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    matrix_slots: Vec<MatrixSlot>,
    texture_bind_groups: HashMap<TextureHandle, wgpu::BindGroup>,
    max_quads: usize,
}

impl BatchPipeline {
    /// Create the pipeline for a surface format
    ///
    /// `max_quads` must be at least the paired batch's scratch capacity so
    /// the index buffer covers any single flush.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        max_quads: usize,
    ) -> Result<Self, ShaderError> {
        assert!(
            max_quads * 4 <= u16::MAX as usize + 1,
            "max_quads exceeds 16-bit index range"
        );

        let shader = Shader::compile(
            device,
            include_str!("shaders/sprite.wgsl"),
            "sprite shader",
        )?;

        let matrix_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Batch Matrix Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Batch Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Batch Pipeline Layout"),
            bind_group_layouts: &[&matrix_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = VertexLayout::new()
            .with_attribute("position", wgpu::VertexFormat::Float32x2)
            .with_attribute("color", wgpu::VertexFormat::Float32x4)
            .with_attribute("uv", wgpu::VertexFormat::Float32x2);
        debug_assert_eq!(vertex_layout.stride() as usize, std::mem::size_of::<Vertex>());

        let pipeline = validate_link(device, "sprite pipeline", || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Batch Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: shader.module(),
                    entry_point: "vs_main",
                    buffers: &[vertex_layout.buffer_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader.module(),
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        })?;

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Batch Index Buffer"),
            contents: bytemuck::cast_slice(&quad_index_data(max_quads)),
            usage: wgpu::BufferUsages::INDEX,
        });

        let vertex_capacity = max_quads * 4;
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Batch Vertex Buffer"),
            size: (vertex_capacity * std::mem::size_of::<Vertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            matrix_layout,
            texture_layout,
            index_buffer,
            vertex_buffer,
            vertex_capacity,
            matrix_slots: Vec::new(),
            texture_bind_groups: HashMap::new(),
            max_quads,
        })
    }

    /// Drop the cached bind group for a released texture
    pub fn invalidate_texture(&mut self, handle: TextureHandle) {
        self.texture_bind_groups.remove(&handle);
    }

    /// Upload a finished batch frame and replay its draw calls
    ///
    /// Draw calls whose texture has been released are skipped with a
    /// warning; everything else renders in recorded order.
    pub fn submit(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
        batch: &SpriteBatch,
        textures: &TextureManager,
    ) {
        debug_assert!(
            !batch.is_drawing(),
            "submit called before the batch frame was ended"
        );

        self.ensure_vertex_capacity(device, batch.vertices().len());
        if !batch.vertices().is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(batch.vertices()));
        }
        self.update_matrix_slots(device, queue, batch.matrices());
        self.cache_texture_bind_groups(device, batch, textures);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Batch Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Batch Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            for call in batch.calls() {
                debug_assert!(
                    (call.quad_count as usize) <= self.max_quads,
                    "draw call exceeds index buffer capacity"
                );
                let Some(texture_group) = self.texture_bind_groups.get(&call.texture) else {
                    continue; // released texture, already warned
                };

                render_pass.set_bind_group(
                    0,
                    &self.matrix_slots[call.matrix_slot as usize].bind_group,
                    &[],
                );
                render_pass.set_bind_group(1, texture_group, &[]);
                render_pass.draw_indexed(0..call.quad_count * 6, call.base_vertex as i32, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn ensure_vertex_capacity(&mut self, device: &wgpu::Device, vertices: usize) {
        if vertices <= self.vertex_capacity {
            return;
        }
        let capacity = vertices.next_power_of_two();
        self.vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Batch Vertex Buffer"),
            size: (capacity * std::mem::size_of::<Vertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.vertex_capacity = capacity;
    }

    fn update_matrix_slots(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        matrices: &[glam::Mat4],
    ) {
        while self.matrix_slots.len() < matrices.len() {
            let layout = UniformLayout::new().with_field("proj_trans", UniformType::Mat4);
            let block = UniformBlock::new(layout);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Batch Matrix Buffer"),
                size: block.bytes().len() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Batch Matrix Bind Group"),
                layout: &self.matrix_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.matrix_slots.push(MatrixSlot {
                block,
                buffer,
                bind_group,
            });
        }

        for (slot, matrix) in self.matrix_slots.iter_mut().zip(matrices) {
            slot.block.set_mat4("proj_trans", *matrix);
            slot.block.upload(queue, &slot.buffer);
        }
    }

    fn cache_texture_bind_groups(
        &mut self,
        device: &wgpu::Device,
        batch: &SpriteBatch,
        textures: &TextureManager,
    ) {
        for call in batch.calls() {
            if self.texture_bind_groups.contains_key(&call.texture) {
                continue;
            }
            let Some(texture) = textures.get(call.texture) else {
                warn!("skipping draw call for released texture {:?}", call.texture);
                continue;
            };

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Batch Texture Bind Group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ],
            });
            self.texture_bind_groups.insert(call.texture, bind_group);
        }
    }
}
