// Shader compilation and typed uniform/vertex-layout plumbing

use glam::{IVec2, IVec3, IVec4, Mat4, Vec2, Vec3, Vec4};
use log::warn;

/// Shader and pipeline validation errors
///
/// Validation output is collected into diagnostic strings and returned to
/// the caller; a broken shader is only as fatal as the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("shader compilation failed: {0}")]
    Compile(String),

    #[error("pipeline validation failed: {0}")]
    Link(String),
}

/// A validated WGSL shader module
pub struct Shader {
    module: wgpu::ShaderModule,
}

impl Shader {
    /// Compile WGSL source, capturing validation errors as diagnostics
    pub fn compile(device: &wgpu::Device, source: &str, label: &str) -> Result<Self, ShaderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            warn!("shader '{label}' failed to compile: {error}");
            return Err(ShaderError::Compile(format!("{label}: {error}")));
        }

        Ok(Self { module })
    }

    /// The underlying module, for pipeline construction
    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }
}

/// Run pipeline construction under an error scope, surfacing validation
/// failures as [`ShaderError::Link`] instead of a device panic
pub fn validate_link<T>(
    device: &wgpu::Device,
    label: &str,
    build: impl FnOnce() -> T,
) -> Result<T, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        warn!("pipeline '{label}' failed validation: {error}");
        return Err(ShaderError::Link(format!("{label}: {error}")));
    }

    Ok(value)
}

/// Field types supported in a [`UniformLayout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Mat4,
}

impl UniformType {
    /// Size in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 | Self::IVec2 => 8,
            Self::Vec3 | Self::IVec3 => 12,
            Self::Vec4 | Self::IVec4 => 16,
            Self::Mat4 => 64,
        }
    }

    /// Alignment under WGSL uniform address space rules
    pub fn align(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 | Self::IVec2 => 8,
            Self::Vec3 | Self::IVec3 | Self::Vec4 | Self::IVec4 | Self::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone)]
struct UniformField {
    name: String,
    ty: UniformType,
    offset: usize,
}

/// Named uniform fields with WGSL-compatible offsets
///
/// Offsets are assigned in declaration order with each field aligned to its
/// type, matching the layout of the equivalent WGSL struct.
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, padding to its alignment
    pub fn with_field(mut self, name: &str, ty: UniformType) -> Self {
        debug_assert!(
            self.field(name).is_none(),
            "duplicate uniform field '{name}'"
        );

        let offset = self.size.next_multiple_of(ty.align());
        self.fields.push(UniformField {
            name: name.to_string(),
            ty,
            offset,
        });
        self.size = offset + ty.size();
        self
    }

    /// Byte offset of a field
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.field(name).map(|f| f.offset)
    }

    /// Total size, rounded up to the 16-byte uniform struct stride
    pub fn size(&self) -> usize {
        self.size.next_multiple_of(16)
    }

    fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// CPU staging block for one uniform struct
///
/// Typed setters write into the staging bytes; [`upload`] pushes the block
/// to a GPU buffer in one transfer when anything changed. Setting an unknown
/// field or the wrong type is a programmer error caught by debug assertions.
///
/// [`upload`]: UniformBlock::upload
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let size = layout.size();
        Self {
            layout,
            data: vec![0; size],
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Staging bytes in GPU layout
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.write(name, UniformType::Float, &value.to_le_bytes());
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.write(name, UniformType::Vec2, bytemuck::bytes_of(&value));
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write(name, UniformType::Vec3, bytemuck::bytes_of(&value));
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.write(name, UniformType::Vec4, bytemuck::bytes_of(&value));
    }

    pub fn set_i32(&mut self, name: &str, value: i32) {
        self.write(name, UniformType::Int, &value.to_le_bytes());
    }

    pub fn set_ivec2(&mut self, name: &str, value: IVec2) {
        self.write(name, UniformType::IVec2, bytemuck::bytes_of(&value));
    }

    pub fn set_ivec3(&mut self, name: &str, value: IVec3) {
        self.write(name, UniformType::IVec3, bytemuck::bytes_of(&value));
    }

    pub fn set_ivec4(&mut self, name: &str, value: IVec4) {
        self.write(name, UniformType::IVec4, bytemuck::bytes_of(&value));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write(name, UniformType::Mat4, bytemuck::bytes_of(&value));
    }

    /// Write the staging block to `buffer` if any setter ran since the last
    /// upload
    pub fn upload(&mut self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        if self.dirty {
            queue.write_buffer(buffer, 0, &self.data);
            self.dirty = false;
        }
    }

    fn write(&mut self, name: &str, ty: UniformType, bytes: &[u8]) {
        let Some(field) = self.layout.field(name) else {
            debug_assert!(false, "unknown uniform field '{name}'");
            return;
        };
        debug_assert!(
            field.ty == ty,
            "uniform field '{name}' is {:?}, not {ty:?}",
            field.ty
        );

        let offset = field.offset;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
    }
}

/// Interleaved vertex attribute layout built by name
///
/// Attributes get sequential shader locations and offsets packed in
/// declaration order; the stride is the packed size of one vertex.
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    attributes: Vec<wgpu::VertexAttribute>,
    names: Vec<String>,
    stride: u64,
}

impl VertexLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute after the previous one
    pub fn with_attribute(mut self, name: &str, format: wgpu::VertexFormat) -> Self {
        self.attributes.push(wgpu::VertexAttribute {
            offset: self.stride,
            shader_location: self.attributes.len() as u32,
            format,
        });
        self.names.push(name.to_string());
        self.stride += format.size();
        self
    }

    /// Byte offset of a named attribute
    pub fn offset_of(&self, name: &str) -> Option<u64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.attributes[i].offset)
    }

    /// Bytes per vertex
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// The wgpu layout for pipeline construction
    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}
