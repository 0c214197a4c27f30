/// Declarative pipeline description
///
/// A pipeline variant describes what a pipeline needs (vertex layout, shader
/// stages, dynamic state, descriptor bindings, fixed-function overrides); the
/// backend compiles it into native objects and recompiles it after every
/// swapchain rebuild.

use std::path::PathBuf;
use bitflags::bitflags;

// ===== VERTEX INPUT =====

/// Vertex attribute format
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFormat {
    R32_SFLOAT,          // float (4 bytes)
    R32G32_SFLOAT,       // vec2 (8 bytes)
    R32G32B32_SFLOAT,    // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)
    R32_UINT,
    R8G8B8A8_UNORM,
}

impl BufferFormat {
    /// Size in bytes of one element
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
            BufferFormat::R32_UINT => 4,
            BufferFormat::R8G8B8A8_UNORM => 4,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    /// Data is per-vertex
    Vertex,
    /// Data is per-instance
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Binding index
    pub binding: u32,
    /// Format of the attribute (data type and component count)
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    /// Binding index
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    /// Input rate (per-vertex or per-instance)
    pub input_rate: VertexInputRate,
}

/// Vertex input layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexLayout {
    /// Vertex bindings
    pub bindings: Vec<VertexBinding>,
    /// Vertex attributes
    pub attributes: Vec<VertexAttribute>,
}

// ===== SHADERS =====

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment/Pixel shader
    Fragment,
}

bitflags! {
    /// Set of shader stages allowed to access a binding
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0b01;
        const FRAGMENT = 0b10;
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
        }
    }
}

/// Where the SPIR-V code of a stage comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// A `.spv` file on disk
    Path(PathBuf),
    /// In-memory SPIR-V words
    Spirv(Vec<u32>),
}

/// One shader stage of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    pub stage: ShaderStage,
    pub source: ShaderSource,
    /// Entry point function name
    pub entry_point: String,
}

impl ShaderStageDesc {
    /// Stage loaded from a file with the `main` entry point
    pub fn from_path(stage: ShaderStage, path: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            source: ShaderSource::Path(path.into()),
            entry_point: "main".to_string(),
        }
    }

    /// Stage built from in-memory words with the `main` entry point
    pub fn from_words(stage: ShaderStage, words: Vec<u32>) -> Self {
        Self {
            stage,
            source: ShaderSource::Spirv(words),
            entry_point: "main".to_string(),
        }
    }
}

/// Pipeline state that may be set while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicState {
    Viewport,
    Scissor,
    LineWidth,
}

// ===== DESCRIPTOR BINDINGS =====

/// Kind of resource behind a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// Uniform buffer
    UniformBuffer,
    /// Combined image + sampler
    CombinedImageSampler,
}

/// One descriptor binding of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingDeclaration {
    /// Binding group ("descriptor set") index
    pub set: u32,
    /// Binding slot inside the set
    pub binding: u32,
    pub kind: BindingKind,
    /// Stages that read the binding
    pub stages: ShaderStageFlags,
}

impl BindingDeclaration {
    /// Uniform buffer binding
    pub fn uniform(set: u32, binding: u32, stages: ShaderStageFlags) -> Self {
        Self { set, binding, kind: BindingKind::UniformBuffer, stages }
    }

    /// Combined image/sampler binding
    pub fn sampler(set: u32, binding: u32, stages: ShaderStageFlags) -> Self {
        Self { set, binding, kind: BindingKind::CombinedImageSampler, stages }
    }
}

/// Highest number of binding groups a pipeline may declare
///
/// Matches the `maxBoundDescriptorSets` guaranteed by common desktop drivers.
pub const MAX_BINDING_SETS: u32 = 32;

/// Group declarations by set, sorted by binding inside each set
///
/// The returned vector is indexed by set: entry `i` holds the bindings of set
/// `i`. Sets skipped by the declarations produce an empty entry, so the native
/// set index always equals the vector index.
///
/// # Panics
///
/// Panics when two declarations share the same (set, binding) pair, or when a
/// set id is not below `MAX_BINDING_SETS`.
pub fn group_declarations(declarations: &[BindingDeclaration]) -> Vec<Vec<BindingDeclaration>> {
    if let Some(bad) = declarations.iter().find(|d| d.set >= MAX_BINDING_SETS) {
        panic!(
            "binding (set {}, binding {}) uses a set id above the limit of {} sets",
            bad.set, bad.binding, MAX_BINDING_SETS
        );
    }

    let mut sorted = declarations.to_vec();
    sorted.sort_by_key(|d| (d.set, d.binding));

    for pair in sorted.windows(2) {
        if pair[0].set == pair[1].set && pair[0].binding == pair[1].binding {
            panic!(
                "binding (set {}, binding {}) declared twice",
                pair[0].set, pair[0].binding
            );
        }
    }

    let set_count = sorted.last().map_or(0, |d| d.set as usize + 1);
    let mut groups = vec![Vec::new(); set_count];
    for declaration in sorted {
        groups[declaration.set as usize].push(declaration);
    }
    groups
}

// ===== FIXED FUNCTION STATE =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    /// Fill polygons
    Fill,
    /// Draw edges only (wireframe)
    Line,
    /// Draw vertices only
    Point,
}

/// Comparison operator for depth tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    /// result = src * srcFactor + dst * dstFactor
    Add,
    /// result = src * srcFactor - dst * dstFactor
    Subtract,
    Min,
    Max,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    pub line_width: f32,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
        }
    }
}

/// Depth testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare_op: CompareOp,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enable: true,
            write_enable: true,
            compare_op: CompareOp::Less,
        }
    }
}

/// Color blending state of the single color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendState {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
}

impl Default for ColorBlendState {
    /// Standard alpha blending
    fn default() -> Self {
        Self {
            blend_enable: true,
            src_color_factor: BlendFactor::SrcAlpha,
            dst_color_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
        }
    }
}

/// Everything in a pipeline that is neither shaders, vertex input nor bindings
///
/// Viewport and scissor are not part of it: they always cover the current
/// swapchain extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFunctionState {
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub depth: DepthState,
    pub color_blend: ColorBlendState,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleList,
            rasterization: RasterizationState::default(),
            depth: DepthState::default(),
            color_blend: ColorBlendState::default(),
        }
    }
}

// ===== PIPELINE VARIANT =====

/// Capability trait implemented by every pipeline type
///
/// The backend only ever talks to a pipeline through this trait. All methods
/// are queried once at pipeline creation and again after each swapchain
/// rebuild, and must keep returning the same answers.
pub trait PipelineVariant: Send + Sync {
    /// Vertex bindings and attributes consumed by the vertex stage
    fn vertex_layout(&self) -> VertexLayout;

    /// Shader stages, at least one
    fn shader_stages(&self) -> Vec<ShaderStageDesc>;

    /// States left dynamic in the native pipeline
    fn dynamic_states(&self) -> Vec<DynamicState>;

    /// Descriptor bindings, in any order
    fn binding_declarations(&self) -> Vec<BindingDeclaration>;

    /// Fixed-function overrides
    fn fixed_function(&self) -> FixedFunctionState {
        FixedFunctionState::default()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
